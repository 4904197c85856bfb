//! HTTP JSON-RPC client for the aria2 daemon.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Aria2Error;
use crate::types::{DownloadStatus, GlobalStat};

/// Request timeout for RPC calls.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct AddUriOptions {
    dir: String,
}

/// The download-manager operations the bot depends on.
///
/// Implemented by [`Aria2Client`] for production and by in-memory fakes in
/// dispatcher tests.
#[async_trait]
pub trait DownloadManager: Send + Sync {
    /// Submit a URI for download under `save_dir/<subdir>`; returns the job
    /// id (gid).
    async fn add_uri(&self, subdir: &str, uri: &str) -> Result<String, Aria2Error>;

    /// Status of a single job.
    async fn tell_status(&self, gid: &str) -> Result<DownloadStatus, Aria2Error>;

    /// All currently active jobs.
    async fn tell_active(&self) -> Result<Vec<DownloadStatus>, Aria2Error>;

    /// Cancel a job; returns the gid of the removed job.
    async fn remove(&self, gid: &str) -> Result<String, Aria2Error>;

    /// Global transfer statistics.
    async fn global_stat(&self) -> Result<GlobalStat, Aria2Error>;
}

/// Client for a running aria2 daemon.
#[derive(Clone)]
pub struct Aria2Client {
    http: Client,
    endpoint: String,
    save_dir: PathBuf,
    request_id: Arc<AtomicU64>,
}

impl Aria2Client {
    /// Create a client for the given RPC endpoint. Downloads are stored
    /// under `save_dir`, one subdirectory per requesting user.
    pub fn new(
        endpoint: impl Into<String>,
        save_dir: impl Into<PathBuf>,
    ) -> Result<Self, Aria2Error> {
        let http = Client::builder().timeout(RPC_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            save_dir: save_dir.into(),
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Whether the daemon answers RPC calls at all.
    pub async fn is_available(&self) -> bool {
        self.global_stat().await.is_ok()
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, Aria2Error> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        debug!(method, id, "aria2 rpc call");
        let response: RpcResponse<R> = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(Aria2Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response.result.ok_or(Aria2Error::MissingResult)
    }
}

#[async_trait]
impl DownloadManager for Aria2Client {
    async fn add_uri(&self, subdir: &str, uri: &str) -> Result<String, Aria2Error> {
        let dir = self.save_dir.join(subdir).to_string_lossy().into_owned();
        self.call(
            "aria2.addUri",
            (vec![uri.to_string()], AddUriOptions { dir }),
        )
        .await
    }

    async fn tell_status(&self, gid: &str) -> Result<DownloadStatus, Aria2Error> {
        self.call("aria2.tellStatus", (gid.to_string(),)).await
    }

    async fn tell_active(&self) -> Result<Vec<DownloadStatus>, Aria2Error> {
        self.call("aria2.tellActive", Vec::<String>::new()).await
    }

    async fn remove(&self, gid: &str) -> Result<String, Aria2Error> {
        self.call("aria2.remove", (gid.to_string(),)).await
    }

    async fn global_stat(&self) -> Result<GlobalStat, Aria2Error> {
        self.call("aria2.getGlobalStat", Vec::<String>::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_request_serialization() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method: "aria2.addUri",
            params: (
                vec!["magnet:?xt=urn:btih:abc".to_string()],
                AddUriOptions {
                    dir: "/srv/downloads/u1".to_string(),
                },
            ),
            id: 7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "aria2.addUri");
        assert_eq!(json["params"][0][0], "magnet:?xt=urn:btih:abc");
        assert_eq!(json["params"][1]["dir"], "/srv/downloads/u1");
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn test_rpc_error_decoding() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":1,"message":"not found"}}"#;
        let response: RpcResponse<String> = serde_json::from_str(json).unwrap();
        let err = response.error.unwrap();
        assert_eq!(err.code, 1);
        assert_eq!(err.message, "not found");
    }
}
