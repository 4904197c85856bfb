//! Periodic public stats note.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use aria2_client::DownloadManager;
use chrono::Utc;
use packmule_core::{format, storage, AuthStore};
use packmule_nostr::{PublishGateway, SecureChannel};
use tracing::{info, warn};

/// Publishes a public note (kind 1) with transfer and disk statistics on a
/// fixed cadence. A cycle is skipped, not failed, when aria2 is unreachable.
pub struct StatsBroadcaster {
    downloads: Arc<dyn DownloadManager>,
    gateway: PublishGateway,
    channel: SecureChannel,
    auth: Arc<Mutex<AuthStore>>,
    save_dir: PathBuf,
    interval: Duration,
    started_at: Instant,
}

impl StatsBroadcaster {
    pub fn new(
        downloads: Arc<dyn DownloadManager>,
        gateway: PublishGateway,
        channel: SecureChannel,
        auth: Arc<Mutex<AuthStore>>,
        save_dir: PathBuf,
        interval: Duration,
        started_at: Instant,
    ) -> Self {
        Self {
            downloads,
            gateway,
            channel,
            auth,
            save_dir,
            interval,
            started_at,
        }
    }

    /// Run until the shutdown future resolves. The first note goes out one
    /// full interval after startup.
    pub async fn run<S>(self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("stats broadcaster stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.broadcast().await;
                }
            }
        }
    }

    async fn broadcast(&self) {
        let stat = match self.downloads.global_stat().await {
            Ok(stat) => stat,
            Err(err) => {
                warn!(error = %err, "aria2 unreachable, skipping stats note");
                return;
            }
        };
        let used = storage::dir_size(&self.save_dir).await;
        let authorized = match self.auth.lock() {
            Ok(store) => store.count(),
            Err(poisoned) => poisoned.into_inner().count(),
        };

        let uptime = self.started_at.elapsed().as_secs();
        let note = format!(
            "📊 Packmule Bot Status\n\n\
             Uptime: {}h {}m {}s\n\
             Authorised Users: {}\n\
             Active: {}\n\
             Queued: {}\n\
             Stopped: {}\n\
             Download: {}\n\
             Upload: {}\n\
             Disk Used: {}\n\
             Time: {}",
            uptime / 3600,
            (uptime % 3600) / 60,
            uptime % 60,
            authorized,
            stat.active(),
            stat.waiting(),
            stat.stopped(),
            format::speed(stat.download_speed_bytes()),
            format::speed(stat.upload_speed_bytes()),
            format::bytes_to_size(used),
            Utc::now().to_rfc3339(),
        );

        let outcome = self.gateway.publish(self.channel.public_note(&note)).await;
        if outcome.delivered() {
            info!("posted stats note");
        } else {
            warn!(attempts = outcome.attempts, "stats note not accepted by any relay");
        }
    }
}
