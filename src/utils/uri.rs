//! File path ↔ `file://` URI conversion.
//!
//! The language server identifies documents by URI while tools speak in
//! absolute paths. `url::Url` handles percent-encoding and the Windows
//! drive-letter quirks; the only filesystem access here is canonicalization
//! of paths that exist.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{BridgeError, BridgeResult};

/// Convert a file path to a `file://` URI.
///
/// Existing paths are canonicalized (resolving symlinks) so that the same
/// file always maps to the same URI. Paths that do not exist yet are made
/// absolute against the working directory without touching the filesystem.
pub fn path_to_uri(path: impl AsRef<Path>) -> BridgeResult<String> {
    let path = path.as_ref();
    let absolute = match std::fs::canonicalize(path) {
        Ok(canonical) => canonical,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir()
            .map_err(BridgeError::Io)?
            .join(path),
    };

    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|_| BridgeError::Uri(format!("not a representable file path: {}", path.display())))
}

/// Convert a `file://` URI back to a filesystem path.
///
/// Rejects any other scheme. On drive-letter platforms `url` strips the
/// leading slash before `C:` itself.
pub fn uri_to_path(uri: &str) -> BridgeResult<PathBuf> {
    let url = Url::parse(uri).map_err(|e| BridgeError::Uri(format!("{uri}: {e}")))?;

    if url.scheme() != "file" {
        return Err(BridgeError::Uri(format!(
            "expected file:// URI, got: {uri}"
        )));
    }

    url.to_file_path()
        .map_err(|_| BridgeError::Uri(format!("no local path in URI: {uri}")))
}

/// Best-effort path rendering of a URI for tool payloads.
///
/// Falls back to the raw URI string when it is not a well-formed file URI
/// so translators never drop a location on a cosmetic failure.
pub fn uri_to_display_path(uri: &str) -> String {
    uri_to_path(uri)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_absolute_path_to_file_uri() {
        let uri = path_to_uri("/tmp").unwrap();
        assert!(uri.starts_with("file:///"), "unexpected uri: {uri}");
    }

    #[test]
    fn round_trips_canonical_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.adb");
        std::fs::write(&file, "procedure Main is begin null; end Main;\n").unwrap();

        let canonical = std::fs::canonicalize(&file).unwrap();
        let uri = path_to_uri(&canonical).unwrap();
        assert_eq!(uri_to_path(&uri).unwrap(), canonical);
        // And back again: uri -> path -> uri is the identity
        assert_eq!(path_to_uri(uri_to_path(&uri).unwrap()).unwrap(), uri);
    }

    #[test]
    fn percent_encodes_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("with space.ads");
        std::fs::write(&file, "").unwrap();

        let uri = path_to_uri(&file).unwrap();
        assert!(uri.contains("with%20space.ads"), "unexpected uri: {uri}");
        assert_eq!(
            uri_to_path(&uri).unwrap(),
            std::fs::canonicalize(&file).unwrap()
        );
    }

    #[test]
    fn nonexistent_absolute_path_converts_without_fs_access() {
        let uri = path_to_uri("/no/such/file.adb").unwrap();
        assert_eq!(uri, "file:///no/such/file.adb");
        assert_eq!(uri_to_path(&uri).unwrap(), PathBuf::from("/no/such/file.adb"));
    }

    #[test]
    fn rejects_non_file_schemes() {
        assert!(uri_to_path("https://example.com/x.adb").is_err());
        assert!(uri_to_path("not a uri").is_err());
    }

    #[test]
    fn display_path_falls_back_to_raw_uri() {
        assert_eq!(uri_to_display_path("untitled:Untitled-1"), "untitled:Untitled-1");
        assert_eq!(uri_to_display_path("file:///p/m.adb"), "/p/m.adb");
    }
}
