//! Async client for one Ada language-server subprocess.
//!
//! The client owns the framed stdio of the subprocess, correlates responses
//! to requests through a pending table of oneshot waiters, caches
//! diagnostics pushed by the server, and tracks which file URIs have been
//! announced with `textDocument/didOpen`.
//!
//! A single background reader task is the only consumer of the server's
//! stdout. It never awaits anything but the next frame and the stdin lock
//! for default replies, so translators can issue requests from any context
//! without stalling the reader.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::als::framing;
use crate::als::types::{Diagnostic, DiagnosticSeverity, PublishDiagnosticsParams};
use crate::error::{BridgeError, BridgeResult};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait after SIGTERM before resorting to SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

type PendingSender = oneshot::Sender<BridgeResult<Value>>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Async client for one language-server subprocess.
pub struct AlsClient {
    /// Stdin of the subprocess; the mutex serializes all writers
    stdin: Mutex<BoxWriter>,
    /// Subprocess handle; absent for stream-backed test clients
    child: Option<Mutex<Child>>,
    /// Pending requests awaiting responses, keyed by request id
    pending: Arc<DashMap<i64, PendingSender>>,
    /// Next request id (monotonically increasing per client lifetime)
    next_request_id: AtomicI64,
    /// Last published diagnostics per URI
    diagnostics: Arc<StdMutex<HashMap<String, Vec<Diagnostic>>>>,
    /// URIs already announced with `textDocument/didOpen`
    open_files: StdMutex<HashSet<String>>,
    /// Capabilities reported by the initialize response
    server_capabilities: StdMutex<Option<Value>>,
    /// Set once the reader observes EOF or a transport error
    connection_closed: Arc<AtomicBool>,
    /// Set when shutdown was requested, so the monitor does not treat the
    /// exit as a crash
    shutdown_requested: AtomicBool,
    reader_handle: StdMutex<Option<JoinHandle<()>>>,
    shutdown_tx: StdMutex<Option<oneshot::Sender<()>>>,
    request_timeout: Duration,
}

impl std::fmt::Debug for AlsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlsClient").finish_non_exhaustive()
    }
}

impl AlsClient {
    /// Spawn the language-server executable with piped stdio.
    ///
    /// The working directory is set to the project root so relative paths in
    /// the project definition resolve the way the server expects. Stderr is
    /// drained into the host log.
    pub async fn spawn(
        program: &Path,
        cwd: &Path,
        request_timeout: Duration,
    ) -> BridgeResult<Arc<Self>> {
        use std::process::Stdio;

        let mut child = Command::new(program)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::bootstrap(format!("failed to spawn '{}': {e}", program.display()))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::bootstrap("failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::bootstrap("failed to capture stdout"))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    log::debug!(target: "adabridge::als::stderr", "{line}");
                }
            });
        }

        Ok(Self::new_inner(
            Box::new(stdin),
            stdout,
            Some(child),
            request_timeout,
        ))
    }

    /// Build a client over arbitrary duplex streams.
    ///
    /// Used by tests to drive the protocol without a subprocess; liveness is
    /// then derived from the reader observing EOF.
    pub fn from_streams<W, R>(writer: W, reader: R, request_timeout: Duration) -> Arc<Self>
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::new_inner(Box::new(writer), reader, None, request_timeout)
    }

    fn new_inner<R>(
        writer: BoxWriter,
        reader: R,
        child: Option<Child>,
        request_timeout: Duration,
    ) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let client = Arc::new(Self {
            stdin: Mutex::new(writer),
            child: child.map(Mutex::new),
            pending: Arc::new(DashMap::new()),
            next_request_id: AtomicI64::new(1),
            diagnostics: Arc::new(StdMutex::new(HashMap::new())),
            open_files: StdMutex::new(HashSet::new()),
            server_capabilities: StdMutex::new(None),
            connection_closed: Arc::new(AtomicBool::new(false)),
            shutdown_requested: AtomicBool::new(false),
            reader_handle: StdMutex::new(None),
            shutdown_tx: StdMutex::new(None),
            request_timeout,
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let reader_client = Arc::clone(&client);
        let handle = tokio::spawn(async move {
            reader_client.reader_loop(BufReader::new(reader), shutdown_rx).await;
        });

        *lock(&client.reader_handle) = Some(handle);
        *lock(&client.shutdown_tx) = Some(shutdown_tx);
        client
    }

    /// Background reader: routes responses by id, applies notifications,
    /// and answers server-initiated requests with an empty result.
    async fn reader_loop<R>(
        self: Arc<Self>,
        mut reader: BufReader<R>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) where
        R: AsyncRead + Send + Unpin,
    {
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    log::debug!(target: "adabridge::als::client", "reader shutdown signal received");
                    break;
                }

                frame = framing::read_message(&mut reader) => {
                    match frame {
                        Ok(Some(message)) => self.dispatch_incoming(message).await,
                        Ok(None) => {
                            log::info!(target: "adabridge::als::client", "language server stdout closed");
                            break;
                        }
                        Err(e) => {
                            log::warn!(target: "adabridge::als::client", "transport error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        self.connection_closed.store(true, Ordering::SeqCst);
        self.fail_pending();
    }

    async fn dispatch_incoming(&self, message: Value) {
        let has_method = message.get("method").is_some();
        let id = message.get("id").cloned().filter(|id| !id.is_null());

        match (id, has_method) {
            // Response to one of our requests
            (Some(id), false) => {
                let Some(id) = id.as_i64() else {
                    log::warn!(target: "adabridge::als::client", "response with non-integer id: {id}");
                    return;
                };
                let Some((_, sender)) = self.pending.remove(&id) else {
                    log::warn!(target: "adabridge::als::client", "response for unknown request {id}");
                    return;
                };
                let outcome = if let Some(error) = message.get("error") {
                    Err(BridgeError::Protocol {
                        code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                        message: error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown error")
                            .to_string(),
                        data: error.get("data").cloned(),
                    })
                } else {
                    Ok(message.get("result").cloned().unwrap_or(Value::Null))
                };
                // Receiver may have timed out already; that is fine
                let _ = sender.send(outcome);
            }

            // Server-initiated request: we implement no server->client
            // capabilities, so answer with an empty result
            (Some(id), true) => {
                let method = message["method"].as_str().unwrap_or("").to_string();
                log::debug!(target: "adabridge::als::client", "answering server request {method} with empty result");
                let reply = json!({"jsonrpc": "2.0", "id": id, "result": Value::Null});
                if let Err(e) = self.write_message(&reply).await {
                    log::warn!(target: "adabridge::als::client", "failed to answer server request: {e}");
                }
            }

            // Notification
            (None, true) => self.handle_notification(&message),

            (None, false) => {
                log::debug!(target: "adabridge::als::client", "discarding frame without id or method");
            }
        }
    }

    fn handle_notification(&self, message: &Value) {
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        match method {
            "textDocument/publishDiagnostics" => {
                match serde_json::from_value::<PublishDiagnosticsParams>(params) {
                    Ok(update) => {
                        let count = update.diagnostics.len();
                        lock(&self.diagnostics).insert(update.uri.clone(), update.diagnostics);
                        log::debug!(
                            target: "adabridge::als::client",
                            "stored {count} diagnostics for {}",
                            update.uri
                        );
                    }
                    Err(e) => {
                        log::warn!(target: "adabridge::als::client", "bad publishDiagnostics payload: {e}");
                    }
                }
            }
            "window/logMessage" | "window/showMessage" => {
                let text = params.get("message").and_then(Value::as_str).unwrap_or("");
                match params.get("type").and_then(Value::as_u64).unwrap_or(4) {
                    1 => log::error!(target: "adabridge::als::server", "{text}"),
                    2 => log::warn!(target: "adabridge::als::server", "{text}"),
                    3 => log::info!(target: "adabridge::als::server", "{text}"),
                    _ => log::debug!(target: "adabridge::als::server", "{text}"),
                }
            }
            other => {
                log::debug!(target: "adabridge::als::client", "unhandled notification: {other}");
            }
        }
    }

    /// Send a request and await its response with the default timeout.
    pub async fn send_request(&self, method: &str, params: Value) -> BridgeResult<Value> {
        self.send_request_with_timeout(method, params, self.request_timeout)
            .await
    }

    /// Send a request and await its response with an explicit timeout.
    ///
    /// The pending entry is registered before the frame is written so the
    /// reader can never race the waiter. On timeout the entry is removed and
    /// the eventual late response will be discarded.
    pub async fn send_request_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> BridgeResult<Value> {
        if self.connection_closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionLost);
        }

        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(id, sender);

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        if let Err(e) = self.write_message(&request).await {
            self.pending.remove(&id);
            return Err(e);
        }
        log::debug!(target: "adabridge::als::client", "sent request id={id} method={method}");

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without a response: client shut down
            Ok(Err(_)) => Err(BridgeError::ConnectionLost),
            Err(_) => {
                self.pending.remove(&id);
                log::warn!(target: "adabridge::als::client", "request {method} (id={id}) timed out");
                Err(BridgeError::Timeout)
            }
        }
    }

    /// Fire-and-forget notification.
    pub async fn send_notification(&self, method: &str, params: Value) -> BridgeResult<()> {
        if self.connection_closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionLost);
        }
        let notification = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.write_message(&notification).await?;
        log::debug!(target: "adabridge::als::client", "sent notification method={method}");
        Ok(())
    }

    async fn write_message(&self, message: &Value) -> BridgeResult<()> {
        let mut stdin = self.stdin.lock().await;
        framing::write_message(&mut *stdin, message)
            .await
            .map_err(BridgeError::Io)
    }

    /// Snapshot the diagnostics store, optionally filtered by URI and severity.
    pub fn get_diagnostics(
        &self,
        uri: Option<&str>,
        severity: Option<DiagnosticSeverity>,
    ) -> HashMap<String, Vec<Diagnostic>> {
        let store = lock(&self.diagnostics);
        let mut snapshot: HashMap<String, Vec<Diagnostic>> = match uri {
            Some(uri) => store
                .get(uri)
                .map(|diags| HashMap::from([(uri.to_string(), diags.clone())]))
                .unwrap_or_default(),
            None => store.clone(),
        };
        drop(store);

        if let Some(wanted) = severity {
            for diags in snapshot.values_mut() {
                diags.retain(|d| d.severity == wanted);
            }
        }
        snapshot
    }

    /// Announce a file to the server if it has not been opened yet.
    ///
    /// One `didOpen` per URI per client lifetime; the set is cleared only by
    /// client replacement. Missing files are skipped with a warning so
    /// positional tools can still dispatch and get a server-side answer.
    pub async fn ensure_file_open(&self, path: &Path) {
        let Ok(uri) = crate::utils::uri::path_to_uri(path) else {
            log::warn!(target: "adabridge::als::client", "unrepresentable path: {}", path.display());
            return;
        };
        if lock(&self.open_files).contains(&uri) {
            return;
        }
        if !path.exists() {
            log::warn!(target: "adabridge::als::client", "file not found: {}", path.display());
            return;
        }

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    target: "adabridge::als::client",
                    "failed to read {}: {e}",
                    path.display()
                );
                return;
            }
        };

        let params = json!({
            "textDocument": {
                "uri": uri,
                "languageId": language_id_for_path(path),
                "version": 1,
                "text": text,
            }
        });
        match self.send_notification("textDocument/didOpen", params).await {
            Ok(()) => {
                lock(&self.open_files).insert(uri);
                log::debug!(target: "adabridge::als::client", "opened {}", path.display());
            }
            Err(e) => {
                log::warn!(
                    target: "adabridge::als::client",
                    "failed to open {}: {e}",
                    path.display()
                );
            }
        }
    }

    /// Whether a URI has already been announced with `didOpen`.
    pub fn is_file_open(&self, uri: &str) -> bool {
        lock(&self.open_files).contains(uri)
    }

    /// Record the capability set from the initialize response.
    pub fn set_server_capabilities(&self, capabilities: Option<Value>) {
        *lock(&self.server_capabilities) = capabilities;
    }

    /// Capabilities reported by the server, if initialization completed.
    pub fn server_capabilities(&self) -> Option<Value> {
        lock(&self.server_capabilities).clone()
    }

    /// Whether the subprocess is running and its stdout is still open.
    pub async fn is_alive(&self) -> bool {
        if self.connection_closed.load(Ordering::SeqCst) {
            return false;
        }
        match &self.child {
            Some(child) => matches!(child.lock().await.try_wait(), Ok(None)),
            None => true,
        }
    }

    /// OS process id of the subprocess, when one is attached.
    pub async fn process_id(&self) -> Option<u32> {
        match &self.child {
            Some(child) => child.lock().await.id(),
            None => None,
        }
    }

    /// Whether shutdown was requested on this client.
    pub fn shutdown_was_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Best-effort LSP shutdown sequence.
    ///
    /// Sends `shutdown` then `exit`, cancels the reader, and resolves every
    /// still-pending waiter with a connection-lost error.
    pub async fn shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);

        if self.is_alive().await {
            if let Err(e) = self
                .send_request_with_timeout("shutdown", Value::Null, TERMINATE_GRACE)
                .await
            {
                log::warn!(target: "adabridge::als::client", "shutdown request failed: {e}");
            }
            if let Err(e) = self.send_notification("exit", Value::Null).await {
                log::warn!(target: "adabridge::als::client", "exit notification failed: {e}");
            }
        }

        if let Some(tx) = lock(&self.shutdown_tx).take() {
            let _ = tx.send(());
        }
        if let Some(handle) = lock(&self.reader_handle).take() {
            handle.abort();
        }
        self.connection_closed.store(true, Ordering::SeqCst);
        self.fail_pending();
    }

    /// Two-stage subprocess termination: SIGTERM, a grace wait, then SIGKILL.
    pub async fn terminate(&self) {
        let Some(child) = &self.child else { return };
        let mut child = child.lock().await;

        if let Ok(Some(_)) = child.try_wait() {
            return;
        }

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                log::warn!(target: "adabridge::als::client", "language server ignored SIGTERM, killing");
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }

    /// Resolve all pending waiters with a connection-lost error.
    fn fail_pending(&self) {
        let ids: Vec<i64> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, sender)) = self.pending.remove(&id) {
                let _ = sender.send(Err(BridgeError::ConnectionLost));
            }
        }
    }
}

impl Drop for AlsClient {
    fn drop(&mut self) {
        if let Some(tx) = lock(&self.shutdown_tx).take() {
            let _ = tx.send(());
        }
        if let Some(handle) = lock(&self.reader_handle).take() {
            handle.abort();
        }
    }
}

/// Language id the server expects for a given file extension.
fn language_id_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("gpr") => "gpr",
        _ => "ada",
    }
}

/// Lock a std mutex, recovering the guard if a holder panicked.
fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{ReadHalf, WriteHalf};

    type ServerEnd = (
        BufReader<ReadHalf<tokio::io::DuplexStream>>,
        WriteHalf<tokio::io::DuplexStream>,
    );

    /// Client wired to an in-process fake server over duplex streams.
    fn stream_pair(timeout: Duration) -> (Arc<AlsClient>, ServerEnd) {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, server_write) = tokio::io::split(server_io);
        let client = AlsClient::from_streams(client_write, client_read, timeout);
        (client, (BufReader::new(server_read), server_write))
    }

    #[tokio::test]
    async fn correlates_responses_by_request_id() {
        let (client, (mut server_read, mut server_write)) = stream_pair(Duration::from_secs(5));

        let server = tokio::spawn(async move {
            // Answer the two requests in reverse order
            let first = framing::read_message(&mut server_read).await.unwrap().unwrap();
            let second = framing::read_message(&mut server_read).await.unwrap().unwrap();
            for request in [&second, &first] {
                let reply = json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "result": {"echo": request["method"]},
                });
                framing::write_message(&mut server_write, &reply).await.unwrap();
            }
        });

        let (a, b) = tokio::join!(
            client.send_request("alpha", json!({})),
            client.send_request("beta", json!({})),
        );
        assert_eq!(a.unwrap()["echo"], "alpha");
        assert_eq!(b.unwrap()["echo"], "beta");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn request_ids_are_monotonic() {
        let (client, (mut server_read, mut server_write)) = stream_pair(Duration::from_secs(5));

        let server = tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..3 {
                let request = framing::read_message(&mut server_read).await.unwrap().unwrap();
                ids.push(request["id"].as_i64().unwrap());
                let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": null});
                framing::write_message(&mut server_write, &reply).await.unwrap();
            }
            ids
        });

        for _ in 0..3 {
            client.send_request("ping", json!({})).await.unwrap();
        }
        let ids = server.await.unwrap();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not monotonic: {ids:?}");
    }

    #[tokio::test]
    async fn error_response_becomes_protocol_error() {
        let (client, (mut server_read, mut server_write)) = stream_pair(Duration::from_secs(5));

        tokio::spawn(async move {
            let request = framing::read_message(&mut server_read).await.unwrap().unwrap();
            let reply = json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32602, "message": "invalid position"},
            });
            framing::write_message(&mut server_write, &reply).await.unwrap();
        });

        let err = client.send_request("bad", json!({})).await.unwrap_err();
        match err {
            BridgeError::Protocol { code, message, .. } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "invalid position");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_removes_pending_entry() {
        let (client, _server_end) = stream_pair(Duration::from_millis(50));

        let err = client.send_request("never-answered", json!({})).await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout));
        assert!(client.pending.is_empty(), "pending entry leaked after timeout");
    }

    #[tokio::test]
    async fn eof_fails_pending_with_connection_lost() {
        let (client, (server_read, server_write)) = stream_pair(Duration::from_secs(5));

        let request = tokio::spawn({
            let client = Arc::clone(&client);
            async move { client.send_request("stalled", json!({})).await }
        });
        // Give the request time to register, then drop the server side
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(server_read);
        drop(server_write);

        let err = request.await.unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionLost));
        assert!(!client.is_alive().await);
    }

    #[tokio::test]
    async fn publish_diagnostics_replaces_store_entry() {
        let (client, (_server_read, mut server_write)) = stream_pair(Duration::from_secs(5));

        let push = |diags: Value| {
            json!({
                "jsonrpc": "2.0",
                "method": "textDocument/publishDiagnostics",
                "params": {"uri": "file:///p/m.adb", "diagnostics": diags},
            })
        };
        framing::write_message(
            &mut server_write,
            &push(json!([{
                "range": {"start": {"line": 9, "character": 4}, "end": {"line": 9, "character": 10}},
                "severity": 1,
                "message": "type mismatch"
            }])),
        )
        .await
        .unwrap();
        framing::write_message(
            &mut server_write,
            &push(json!([{
                "range": {"start": {"line": 2, "character": 0}, "end": {"line": 2, "character": 4}},
                "severity": 2,
                "message": "unused variable"
            }])),
        )
        .await
        .unwrap();

        // Let the reader process both notifications in order
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = client.get_diagnostics(None, None);
        let diags = &snapshot["file:///p/m.adb"];
        assert_eq!(diags.len(), 1, "old entry must be replaced, not appended");
        assert_eq!(diags[0].message, "unused variable");
        assert_eq!(diags[0].severity, DiagnosticSeverity::Warning);
    }

    #[tokio::test]
    async fn diagnostics_snapshot_filters_by_severity() {
        let (client, (_server_read, mut server_write)) = stream_pair(Duration::from_secs(5));

        framing::write_message(
            &mut server_write,
            &json!({
                "jsonrpc": "2.0",
                "method": "textDocument/publishDiagnostics",
                "params": {"uri": "file:///p/m.adb", "diagnostics": [
                    {"range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 1}},
                     "severity": 1, "message": "an error"},
                    {"range": {"start": {"line": 1, "character": 0}, "end": {"line": 1, "character": 1}},
                     "severity": 2, "message": "a warning"}
                ]},
            }),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let errors = client.get_diagnostics(None, Some(DiagnosticSeverity::Error));
        assert_eq!(errors["file:///p/m.adb"].len(), 1);
        assert_eq!(errors["file:///p/m.adb"][0].message, "an error");

        let missing = client.get_diagnostics(Some("file:///other.adb"), None);
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn server_request_gets_default_empty_reply() {
        let (client, (mut server_read, mut server_write)) = stream_pair(Duration::from_secs(5));

        framing::write_message(
            &mut server_write,
            &json!({
                "jsonrpc": "2.0",
                "id": 99,
                "method": "workspace/configuration",
                "params": {"items": []},
            }),
        )
        .await
        .unwrap();

        let reply = framing::read_message(&mut server_read).await.unwrap().unwrap();
        assert_eq!(reply["id"], 99);
        assert!(reply["result"].is_null());
        assert!(reply.get("error").is_none());
        drop(client);
    }

    #[tokio::test]
    async fn did_open_is_idempotent_per_client() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pkg.ads");
        std::fs::write(&file, "package Pkg is end Pkg;\n").unwrap();

        let (client, (mut server_read, _server_write)) = stream_pair(Duration::from_secs(5));

        client.ensure_file_open(&file).await;
        client.ensure_file_open(&file).await;
        client.ensure_file_open(&file).await;

        let first = framing::read_message(&mut server_read).await.unwrap().unwrap();
        assert_eq!(first["method"], "textDocument/didOpen");
        assert_eq!(first["params"]["textDocument"]["languageId"], "ada");
        assert_eq!(first["params"]["textDocument"]["version"], 1);

        let uri = first["params"]["textDocument"]["uri"].as_str().unwrap();
        assert!(client.is_file_open(uri));

        // No second didOpen may be in flight: send a ping and observe it as
        // the very next frame the server sees
        client.send_notification("ping", json!({})).await.unwrap();
        let next = framing::read_message(&mut server_read).await.unwrap().unwrap();
        assert_eq!(next["method"], "ping");
    }

    #[tokio::test]
    async fn missing_file_is_skipped_without_did_open() {
        let (client, (mut server_read, _server_write)) = stream_pair(Duration::from_secs(5));

        client
            .ensure_file_open(Path::new("/no/such/dir/absent.adb"))
            .await;
        client.send_notification("ping", json!({})).await.unwrap();

        let next = framing::read_message(&mut server_read).await.unwrap().unwrap();
        assert_eq!(next["method"], "ping", "no didOpen expected for a missing file");
    }

    #[tokio::test]
    async fn shutdown_sends_shutdown_then_exit() {
        let (client, (mut server_read, mut server_write)) = stream_pair(Duration::from_secs(5));

        let server = tokio::spawn(async move {
            let shutdown = framing::read_message(&mut server_read).await.unwrap().unwrap();
            assert_eq!(shutdown["method"], "shutdown");
            let reply = json!({"jsonrpc": "2.0", "id": shutdown["id"], "result": null});
            framing::write_message(&mut server_write, &reply).await.unwrap();

            let exit = framing::read_message(&mut server_read).await.unwrap().unwrap();
            assert_eq!(exit["method"], "exit");
            assert!(exit.get("id").is_none());
        });

        client.shutdown().await;
        assert!(client.shutdown_was_requested());
        assert!(!client.is_alive().await);
        server.await.unwrap();
    }

    #[test]
    fn language_ids_by_extension() {
        assert_eq!(language_id_for_path(Path::new("a/b/main.adb")), "ada");
        assert_eq!(language_id_for_path(Path::new("a/b/pkg.ads")), "ada");
        assert_eq!(language_id_for_path(Path::new("a/b/prj.gpr")), "gpr");
        assert_eq!(language_id_for_path(Path::new("a/b/notes.txt")), "ada");
    }
}
