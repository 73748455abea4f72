//! Content-Length framed JSON-RPC codec.
//!
//! The language server speaks LSP-style framing over its stdio: a block of
//! `Name: Value\r\n` header lines, a blank line, then exactly
//! `Content-Length` bytes of UTF-8 JSON. The reader tolerates unknown
//! headers, skips frames that arrive without a length, and discards a
//! partial final frame at EOF.

use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read the next JSON-RPC message from a framed stream.
///
/// Returns `Ok(None)` on clean EOF or when the stream ends mid-frame.
/// Frames without a `Content-Length` header are dropped with a warning and
/// the reader moves on to the next header block.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<Value>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut content_length: Option<usize> = None;

        // Header block: lines until the blank separator
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(None); // EOF
            }

            let line = line.trim();
            if line.is_empty() {
                break;
            }
            if let Some(value) = line.strip_prefix("Content-Length:") {
                content_length = Some(value.trim().parse().map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid Content-Length: {e}"),
                    )
                })?);
            }
            // Other headers (Content-Type, ...) are ignored
        }

        let Some(length) = content_length else {
            log::warn!(
                target: "adabridge::als::framing",
                "frame without Content-Length header, dropping"
            );
            continue;
        };

        let mut content = vec![0u8; length];
        match reader.read_exact(&mut content).await {
            Ok(_) => {}
            // Stream ended inside the body: the partial frame is discarded
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let message = serde_json::from_slice(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad JSON frame: {e}")))?;
        return Ok(Some(message));
    }
}

/// Write one JSON-RPC message with Content-Length framing and flush.
pub async fn write_message<W>(writer: &mut W, message: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let content = serde_json::to_string(message)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let header = format!("Content-Length: {}\r\n\r\n", content.len());

    writer.write_all(header.as_bytes()).await?;
    writer.write_all(content.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    async fn read_all(input: &[u8]) -> Vec<Value> {
        let mut reader = BufReader::new(input);
        let mut messages = Vec::new();
        while let Ok(Some(message)) = read_message(&mut reader).await {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn round_trips_a_message() {
        let message = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});
        let mut buffer = Vec::new();
        write_message(&mut buffer, &message).await.unwrap();

        let mut reader = BufReader::new(buffer.as_slice());
        let read = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(read, message);
    }

    #[tokio::test]
    async fn reads_consecutive_frames() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &json!({"id": 1})).await.unwrap();
        write_message(&mut buffer, &json!({"id": 2})).await.unwrap();

        let messages = read_all(&buffer).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["id"], 1);
        assert_eq!(messages[1]["id"], 2);
    }

    #[tokio::test]
    async fn ignores_unknown_headers() {
        let body = r#"{"id":7}"#;
        let input = format!(
            "Content-Type: application/vscode-jsonrpc; charset=utf-8\r\nContent-Length: {}\r\nX-Custom: yes\r\n\r\n{}",
            body.len(),
            body
        );
        let messages = read_all(input.as_bytes()).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["id"], 7);
    }

    #[tokio::test]
    async fn drops_frame_without_content_length_and_recovers() {
        let body = r#"{"id":9}"#;
        let input = format!(
            "X-Orphan: header\r\n\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let messages = read_all(input.as_bytes()).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["id"], 9);
    }

    #[tokio::test]
    async fn partial_final_frame_is_discarded() {
        let input = b"Content-Length: 100\r\n\r\n{\"id\":1";
        let mut reader = BufReader::new(input.as_slice());
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eof_returns_none() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let body = "not json";
        let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let mut reader = BufReader::new(input.as_bytes());
        assert!(read_message(&mut reader).await.is_err());
    }
}
