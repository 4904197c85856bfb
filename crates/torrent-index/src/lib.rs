//! Client for the torrentio stream index.
//!
//! `find <imdb id>` resolves torrents through torrentio's public movie-stream
//! endpoint. The index is treated as an unreliable collaborator: any HTTP or
//! decode failure surfaces as an [`IndexError`] which the dispatcher turns
//! into a user-facing failure reply.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Public torrentio instance.
pub const DEFAULT_BASE_URL: &str = "https://torrentio.strem.fun";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the torrent index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A single search hit: a named torrent with its info hash and a ready-made
/// magnet link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentHit {
    pub title: String,
    pub info_hash: String,
    pub magnet: String,
}

/// Torrent lookup by IMDb id.
#[async_trait]
pub trait TorrentIndex: Send + Sync {
    async fn search(&self, imdb_id: &str) -> Result<Vec<TorrentHit>, IndexError>;
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    streams: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    title: Option<String>,
    #[serde(rename = "infoHash")]
    info_hash: Option<String>,
}

/// HTTP client for a torrentio instance.
#[derive(Clone)]
pub struct TorrentioClient {
    http: reqwest::Client,
    base_url: String,
}

impl TorrentioClient {
    pub fn new() -> Result<Self, IndexError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TorrentIndex for TorrentioClient {
    async fn search(&self, imdb_id: &str) -> Result<Vec<TorrentHit>, IndexError> {
        let url = format!("{}/stream/movie/{}.json", self.base_url, imdb_id);
        debug!(%url, "torrent index lookup");
        let response: StreamResponse = self.http.get(&url).send().await?.json().await?;
        Ok(hits_from_streams(response.streams))
    }
}

/// Turn raw stream entries into hits; entries without an info hash are
/// dropped, missing titles become "Unknown".
fn hits_from_streams(streams: Vec<Stream>) -> Vec<TorrentHit> {
    streams
        .into_iter()
        .filter_map(|stream| {
            let info_hash = stream.info_hash?;
            let title = stream.title.unwrap_or_else(|| "Unknown".to_string());
            let magnet = format!(
                "magnet:?xt=urn:btih:{}&dn={}",
                info_hash,
                urlencoding::encode(&title)
            );
            Some(TorrentHit {
                title,
                info_hash,
                magnet,
            })
        })
        .collect()
}
