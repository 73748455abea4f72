//! Spawning and initializing a language-server instance for one project.
//!
//! Bootstrap resolves the executable and the project definition file,
//! spawns the subprocess with its working directory at the project root,
//! runs the `initialize`/`initialized` handshake, and opens the project
//! definition so the server starts indexing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use crate::als::client::{AlsClient, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{BridgeError, BridgeResult};
use crate::utils::uri::path_to_uri;

/// Default language-server binary name, looked up on PATH.
pub const DEFAULT_LS_EXECUTABLE: &str = "ada_language_server";

/// Environment variable overriding the language-server executable.
pub const LS_PATH_ENV: &str = "LS_PATH";

/// Environment variable naming the project definition file, relative to the
/// project root.
pub const PROJECT_FILE_ENV: &str = "ADA_PROJECT_FILE";

/// Everything needed to start (or restart) a server for one project root.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub project_root: PathBuf,
    /// Explicit executable; falls back to `LS_PATH` then the default name
    pub ls_path: Option<PathBuf>,
    /// Explicit project definition file; falls back to `ADA_PROJECT_FILE`
    /// then a search of the project root
    pub project_file: Option<PathBuf>,
    pub request_timeout: Duration,
    /// Pause after opening the project file so indexing can progress
    pub indexing_wait: Duration,
}

impl BootstrapOptions {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ls_path: None,
            project_file: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            indexing_wait: Duration::from_millis(500),
        }
    }
}

/// Locate a project definition file (`*.gpr`) in the project root.
///
/// Alire generates a wrapper project, so any `.gpr` whose name does not
/// start with `alire` wins; ties break on lexical order.
pub async fn find_project_file(project_root: &Path) -> Option<PathBuf> {
    let mut names: Vec<String> = Vec::new();
    let mut entries = tokio::fs::read_dir(project_root).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "gpr")
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            names.push(name.to_string());
        }
    }
    names.sort();

    let chosen = names
        .iter()
        .find(|name| !name.starts_with("alire"))
        .or_else(|| names.first())?;
    Some(project_root.join(chosen))
}

fn resolve_executable(options: &BootstrapOptions) -> PathBuf {
    options
        .ls_path
        .clone()
        .or_else(|| std::env::var_os(LS_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LS_EXECUTABLE))
}

async fn resolve_project_file(options: &BootstrapOptions) -> Option<PathBuf> {
    if let Some(file) = &options.project_file {
        return Some(file.clone());
    }
    if let Some(name) = std::env::var_os(PROJECT_FILE_ENV) {
        return Some(options.project_root.join(name));
    }
    find_project_file(&options.project_root).await
}

/// The capability set advertised to the server.
fn client_capabilities() -> Value {
    json!({
        "textDocument": {
            "definition": {"dynamicRegistration": true, "linkSupport": true},
            "references": {"dynamicRegistration": true},
            "hover": {
                "dynamicRegistration": true,
                "contentFormat": ["plaintext", "markdown"],
            },
            "documentSymbol": {
                "dynamicRegistration": true,
                "hierarchicalDocumentSymbolSupport": true,
            },
            "completion": {
                "dynamicRegistration": true,
                "completionItem": {
                    "snippetSupport": false,
                    "documentationFormat": ["plaintext", "markdown"],
                },
            },
            "publishDiagnostics": {"relatedInformation": true},
            "callHierarchy": {"dynamicRegistration": true},
            "rename": {"dynamicRegistration": true, "prepareSupport": true},
        },
        "workspace": {
            "workspaceFolders": true,
            "symbol": {"dynamicRegistration": true},
        },
    })
}

/// Spawn a language server and run the full initialization sequence.
///
/// Without a project definition file, indexing is disabled in the
/// initialization options so the server does not scan unbounded trees.
/// Any failure leaves no cached state; the caller decides what to retry.
pub async fn start_als(options: &BootstrapOptions) -> BridgeResult<Arc<AlsClient>> {
    let executable = resolve_executable(options);
    let project_file = resolve_project_file(options).await;
    let project_file = project_file.filter(|file| {
        let exists = file.exists();
        if !exists {
            log::warn!(
                target: "adabridge::als::bootstrap",
                "project file does not exist: {}",
                file.display()
            );
        }
        exists
    });

    log::info!(
        target: "adabridge::als::bootstrap",
        "starting {} for {}",
        executable.display(),
        options.project_root.display()
    );
    if let Some(file) = &project_file {
        log::info!(target: "adabridge::als::bootstrap", "project file: {}", file.display());
    }

    let client = AlsClient::spawn(
        &executable,
        &options.project_root,
        options.request_timeout,
    )
    .await?;

    let root_uri = path_to_uri(&options.project_root)?;
    let root_name = options
        .project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let initialization_options = match &project_file {
        Some(file) => json!({"projectFile": file.display().to_string()}),
        // No known project: stop the server from scanning the world
        None => json!({"enableIndexing": false}),
    };

    let init_params = json!({
        "processId": std::process::id(),
        "capabilities": client_capabilities(),
        "rootUri": root_uri,
        "rootPath": options.project_root.display().to_string(),
        "workspaceFolders": [{"uri": root_uri, "name": root_name}],
        "initializationOptions": initialization_options,
    });

    let init_result = client
        .send_request("initialize", init_params)
        .await
        .map_err(|e| BridgeError::bootstrap(format!("initialize failed: {e}")))?;
    client.set_server_capabilities(init_result.get("capabilities").cloned());

    client
        .send_notification("initialized", json!({}))
        .await
        .map_err(|e| BridgeError::bootstrap(format!("initialized notification failed: {e}")))?;

    // Opening the project definition triggers project load and indexing
    if let Some(file) = &project_file {
        let text = tokio::fs::read_to_string(file).await.unwrap_or_default();
        let params = json!({
            "textDocument": {
                "uri": path_to_uri(file)?,
                "languageId": "gpr",
                "version": 1,
                "text": text,
            }
        });
        if let Err(e) = client.send_notification("textDocument/didOpen", params).await {
            log::warn!(target: "adabridge::als::bootstrap", "failed to open project file: {e}");
        }
        tokio::time::sleep(options.indexing_wait).await;
    }

    log::info!(target: "adabridge::als::bootstrap", "language server initialized");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn finds_single_gpr_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demo.gpr"), "project Demo is end Demo;\n").unwrap();

        let found = find_project_file(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), "demo.gpr");
    }

    #[tokio::test]
    async fn prefers_non_alire_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alire.gpr"), "").unwrap();
        std::fs::write(dir.path().join("demo.gpr"), "").unwrap();

        let found = find_project_file(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), "demo.gpr");
    }

    #[tokio::test]
    async fn falls_back_to_alire_project_when_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alire.gpr"), "").unwrap();

        let found = find_project_file(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), "alire.gpr");
    }

    #[tokio::test]
    async fn ties_break_in_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zulu.gpr"), "").unwrap();
        std::fs::write(dir.path().join("bravo.gpr"), "").unwrap();

        let found = find_project_file(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), "bravo.gpr");
    }

    #[tokio::test]
    async fn no_gpr_means_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.md"), "").unwrap();
        assert!(find_project_file(dir.path()).await.is_none());
    }

    #[test]
    #[serial]
    fn executable_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = BootstrapOptions::new(dir.path());

        unsafe { std::env::remove_var(LS_PATH_ENV) };
        assert_eq!(
            resolve_executable(&options),
            PathBuf::from(DEFAULT_LS_EXECUTABLE)
        );

        unsafe { std::env::set_var(LS_PATH_ENV, "/opt/als/bin/als") };
        assert_eq!(resolve_executable(&options), PathBuf::from("/opt/als/bin/als"));

        options.ls_path = Some(PathBuf::from("/explicit/als"));
        assert_eq!(resolve_executable(&options), PathBuf::from("/explicit/als"));

        unsafe { std::env::remove_var(LS_PATH_ENV) };
    }

    #[tokio::test]
    #[serial]
    async fn project_file_env_joins_root() {
        let dir = tempfile::tempdir().unwrap();
        let options = BootstrapOptions::new(dir.path());

        unsafe { std::env::set_var(PROJECT_FILE_ENV, "custom.gpr") };
        let resolved = resolve_project_file(&options).await.unwrap();
        assert_eq!(resolved, dir.path().join("custom.gpr"));
        unsafe { std::env::remove_var(PROJECT_FILE_ENV) };
    }

    #[tokio::test]
    async fn bootstrap_failure_for_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = BootstrapOptions::new(dir.path());
        options.ls_path = Some(PathBuf::from("/no/such/language_server"));

        let err = start_als(&options).await.unwrap_err();
        assert!(matches!(err, BridgeError::Bootstrap(_)), "got {err:?}");
    }
}
