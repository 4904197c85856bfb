//! HTTP surfaces: the status dashboard and the download file server.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use aria2_client::{DownloadManager, GlobalStat};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use packmule_core::{format, storage, AuthStore};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::warn;

/// Bind a listener and serve the router until the shutdown future resolves.
pub async fn serve<S>(addr: SocketAddr, app: Router, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Shared state for the status API.
#[derive(Clone)]
pub struct DashboardState {
    pub downloads: Arc<dyn DownloadManager>,
    pub auth: Arc<Mutex<AuthStore>>,
    pub pubkey: String,
    pub npub: String,
    pub save_dir: PathBuf,
    pub file_port: u16,
    pub unlock_code: String,
    pub started_at: Instant,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    pubkey: String,
    npub: String,
    file_port: u16,
    save_dir: String,
    used_space: u64,
    used_space_formatted: String,
    uptime: u64,
    download_stats: GlobalStat,
    unlock_code: String,
    authorized_count: usize,
    timestamp: String,
}

/// Router for the dashboard port: the status API plus static assets.
pub fn dashboard_router(state: DashboardState, public_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
}

async fn status(State(state): State<DashboardState>) -> Json<StatusResponse> {
    // An unreachable aria2 degrades to zeroed stats instead of a 5xx; the
    // dashboard stays useful for everything else.
    let stats = match state.downloads.global_stat().await {
        Ok(stats) => stats,
        Err(err) => {
            warn!(error = %err, "global stat fetch failed for dashboard");
            GlobalStat::default()
        }
    };
    let used = storage::dir_size(&state.save_dir).await;
    let authorized_count = match state.auth.lock() {
        Ok(store) => store.count(),
        Err(poisoned) => poisoned.into_inner().count(),
    };

    Json(StatusResponse {
        pubkey: state.pubkey.clone(),
        npub: state.npub.clone(),
        file_port: state.file_port,
        save_dir: state.save_dir.display().to_string(),
        used_space: used,
        used_space_formatted: format::bytes_to_size(used),
        uptime: state.started_at.elapsed().as_secs(),
        download_stats: stats,
        unlock_code: state.unlock_code.clone(),
        authorized_count,
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Clone)]
struct FilesState {
    root: PathBuf,
}

/// Router for the file port: serves the save directory with HTML directory
/// listings.
pub fn file_router(root: PathBuf) -> Router {
    Router::new()
        .fallback(serve_files)
        .with_state(FilesState { root })
}

async fn serve_files(State(state): State<FilesState>, uri: Uri) -> Response {
    let decoded = match urlencoding::decode(uri.path()) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => return not_found(),
    };
    let Some(rel) = sanitize(&decoded) else {
        return not_found();
    };
    let full = state.root.join(&rel);

    match tokio::fs::metadata(&full).await {
        Ok(meta) if meta.is_dir() => directory_listing(&full, &decoded).await,
        Ok(_) => serve_file(&full).await,
        Err(_) => not_found(),
    }
}

/// Resolve a request path to a relative path that cannot escape the root.
fn sanitize(path: &str) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part => rel.push(part),
        }
    }
    Some(rel)
}

async fn directory_listing(dir: &PathBuf, display_path: &str) -> Response {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, path = %dir.display(), "failed to read directory");
            return not_found();
        }
    };

    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => names.push(entry.file_name().to_string_lossy().into_owned()),
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "failed to read directory entry");
                break;
            }
        }
    }
    names.sort();

    let base = display_path.trim_end_matches('/');
    let items: String = names
        .iter()
        .map(|name| {
            format!(
                "<li><a href=\"{base}/{}\">{name}</a></li>",
                urlencoding::encode(name)
            )
        })
        .collect();
    Html(format!("<h1>Index of {display_path}</h1><ul>{items}</ul>")).into_response()
}

async fn serve_file(path: &PathBuf) -> Response {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, path = %path.display(), "failed to read file");
            return not_found();
        }
    };
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    ([(header::CONTENT_TYPE, content_type)], data).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rejects_parent_traversal() {
        assert_eq!(sanitize("/../etc/passwd"), None);
        assert_eq!(sanitize("/a/../../b"), None);
    }

    #[test]
    fn test_sanitize_normalizes_paths() {
        assert_eq!(sanitize("/"), Some(PathBuf::new()));
        assert_eq!(sanitize("/a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(sanitize("//a//./b"), Some(PathBuf::from("a/b")));
    }

    #[test]
    fn test_status_response_wire_format() {
        let response = StatusResponse {
            pubkey: "ab".to_string(),
            npub: "npub1x".to_string(),
            file_port: 6799,
            save_dir: "/tmp/packmule".to_string(),
            used_space: 2048,
            used_space_formatted: "2.00 KB".to_string(),
            uptime: 61,
            download_stats: GlobalStat::default(),
            unlock_code: "code1234".to_string(),
            authorized_count: 2,
            timestamp: "2025-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["filePort"], 6799);
        assert_eq!(json["usedSpaceFormatted"], "2.00 KB");
        assert_eq!(json["authorizedCount"], 2);
        assert!(json["downloadStats"].is_object());
    }
}
