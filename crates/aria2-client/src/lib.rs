//! JSON-RPC 2.0 client for the aria2 download daemon.
//!
//! The bot drives a locally running aria2 instance over its HTTP JSON-RPC
//! endpoint. This crate exposes the handful of methods the bot needs behind
//! the [`DownloadManager`] trait so command handling can be tested against an
//! in-memory fake.
//!
//! # Example
//!
//! ```no_run
//! use aria2_client::{Aria2Client, DownloadManager};
//!
//! # async fn example() -> Result<(), aria2_client::Aria2Error> {
//! let client = Aria2Client::new("http://127.0.0.1:6800/jsonrpc", "/srv/downloads")?;
//! let gid = client.add_uri("user1234", "https://example.com/file.zip").await?;
//! let status = client.tell_status(&gid).await?;
//! println!("{}: {} / {}", gid, status.completed_bytes(), status.total_bytes());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod types;

pub use client::{Aria2Client, DownloadManager};
pub use error::Aria2Error;
pub use types::{DownloadFile, DownloadStatus, GlobalStat};
