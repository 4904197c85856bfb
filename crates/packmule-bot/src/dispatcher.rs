//! Command dispatch: authorization, parsing, and reply composition.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use aria2_client::DownloadManager;
use async_trait::async_trait;
use chrono::Utc;
use packmule_core::{extract, format, storage, AuthStore, Command};
use packmule_nostr::{DmHandler, PublicKey, PublishGateway, SecureChannel, ToBech32};
use torrent_index::TorrentIndex;
use tracing::{error, info, warn};

/// File names listed in a status reply before truncation.
const MAX_STATUS_FILES: usize = 3;

/// Jobs listed in a `downloading` reply.
const MAX_ACTIVE_LISTED: usize = 5;

/// Search hits sent as individual replies before the summary line.
const MAX_FIND_RESULTS: usize = 3;

/// Age threshold for `autoclean`.
const AUTOCLEAN_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const ACCESS_GRANTED: &str = "🔓 Access granted! You are now authorized to use Packmule Bot.\n\n\
     Send \"help\" to see available commands.";

const ACCESS_REQUIRED: &str = "🔐 Access Required\n\n\
     This bot requires authorization to prevent abuse.\n\
     Please send the unlock code to gain access.\n\n\
     Contact the bot owner for the unlock code.";

const HELP_TEXT: &str = "🤖 Packmule Bot Commands\n\n\
     help - show this\n\
     whoami - your pubkey\n\
     start - bot info\n\
     download <url> - start download\n\
     dl <url> - alias for download\n\
     downloading - view active downloads\n\
     find <imdb_url_or_id> - search torrents\n\
     status_<gid> - check download status\n\
     cancel_<gid> - cancel download\n\
     dl_<hash> - quick download from a search result\n\
     stats - show aria2 global stats\n\
     clean - delete oldest file\n\
     autoclean - delete files older than 30 days\n\
     time - server time\n\n\
     ✅ You are authorized";

/// Turns a decrypted message into reply texts.
///
/// All collaborator failures are recovered here and become plain-language
/// failure replies; the dispatcher itself never errors.
pub struct CommandDispatcher {
    downloads: Arc<dyn DownloadManager>,
    index: Arc<dyn TorrentIndex>,
    auth: Arc<Mutex<AuthStore>>,
    save_dir: PathBuf,
    file_port: u16,
}

impl CommandDispatcher {
    pub fn new(
        downloads: Arc<dyn DownloadManager>,
        index: Arc<dyn TorrentIndex>,
        auth: Arc<Mutex<AuthStore>>,
        save_dir: PathBuf,
        file_port: u16,
    ) -> Self {
        Self {
            downloads,
            index,
            auth,
            save_dir,
            file_port,
        }
    }

    /// Respond to one message from `sender`. Most commands yield a single
    /// reply; `find` yields one per hit plus a summary.
    pub async fn respond(&self, sender: &PublicKey, text: &str) -> Vec<String> {
        let hex = sender.to_hex();
        let trimmed = text.trim();

        if !self.auth().is_authorized(&hex) {
            if self.auth().try_unlock(&hex, trimmed) {
                info!(sender = %format::short(&hex), "sender unlocked");
                return vec![ACCESS_GRANTED.to_string()];
            }
            info!(sender = %format::short(&hex), "unauthorized sender");
            return vec![ACCESS_REQUIRED.to_string()];
        }

        // Downloads are keyed by a per-user subdirectory.
        let user_id = hex.chars().take(8).collect::<String>();

        match Command::parse(trimmed) {
            Command::Help => vec![HELP_TEXT.to_string()],
            Command::WhoAmI => vec![self.whoami(sender, &hex)],
            Command::Start => vec![self.start(&user_id).await],
            Command::Download(target) => {
                if target.is_empty() {
                    vec!["Please provide a URL to download.".to_string()]
                } else {
                    vec![self.download(&user_id, &target).await]
                }
            }
            Command::Downloading => vec![self.downloading().await],
            Command::Find(query) => {
                if query.is_empty() {
                    vec!["Please provide an IMDb URL or IMDb ID.".to_string()]
                } else {
                    self.find(&query).await
                }
            }
            Command::Status(id) => vec![self.status(&id).await],
            Command::Cancel(id) => vec![self.cancel(&id).await],
            Command::DlHash(hash) => {
                if hash.is_empty() {
                    vec!["Invalid download command. Hash missing.".to_string()]
                } else {
                    let magnet = format!("magnet:?xt=urn:btih:{hash}");
                    vec![self.download(&user_id, &magnet).await]
                }
            }
            Command::Stats => vec![self.stats().await],
            Command::Clean => vec![self.clean().await],
            Command::AutoClean => vec![self.autoclean().await],
            Command::Time => vec![format!("Server time: {}", Utc::now().to_rfc3339())],
            Command::Unknown(token) => {
                vec![format!("Unknown command: {token}. Send help for list.")]
            }
        }
    }

    fn auth(&self) -> MutexGuard<'_, AuthStore> {
        match self.auth.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn whoami(&self, sender: &PublicKey, hex: &str) -> String {
        let npub = sender
            .to_bech32()
            .unwrap_or_else(|_| hex.to_string());
        format!("Your pubkey: {hex}\nYour npub: {npub}")
    }

    async fn start(&self, user_id: &str) -> String {
        let used = storage::dir_size(&self.save_dir).await;
        format!(
            "🤖 Packmule Bot\n\n\
             Your User ID: {user_id}\n\
             Used Space: {}\n\
             Server Port: {}\n\n\
             🌐 HTTP Access:\n\
             http://hostname:{}\n\n\
             Send help for all commands",
            format::bytes_to_size(used),
            self.file_port,
            self.file_port,
        )
    }

    async fn download(&self, user_id: &str, input: &str) -> String {
        if let Some(magnet) = extract::extract_magnet(input) {
            match self.downloads.add_uri(user_id, &magnet).await {
                Ok(gid) => format!(
                    "🧲 Magnet download started\nTrack: status_{gid}\nSee all: downloading"
                ),
                Err(err) => {
                    error!(error = %err, "magnet download failed to start");
                    "Failed to start magnet download. Check if aria2 is running.".to_string()
                }
            }
        } else if let Some(url) = extract::extract_http_url(input) {
            match self.downloads.add_uri(user_id, &url).await {
                Ok(gid) => {
                    format!("🔗 URL download started\nTrack: status_{gid}\nSee all: downloading")
                }
                Err(err) => {
                    error!(error = %err, "url download failed to start");
                    "Failed to start URL download. Check if aria2 is running.".to_string()
                }
            }
        } else {
            "No valid magnet link or URL found in your input.".to_string()
        }
    }

    async fn downloading(&self) -> String {
        let jobs = match self.downloads.tell_active().await {
            Ok(jobs) => jobs,
            Err(err) => {
                error!(error = %err, "failed to list active downloads");
                return "Failed to fetch downloads. Try again later.".to_string();
            }
        };
        if jobs.is_empty() {
            return "No ongoing downloads.".to_string();
        }

        let mut reply = "📥 Ongoing Downloads\n\n".to_string();
        for job in jobs.iter().take(MAX_ACTIVE_LISTED) {
            let progress = format::progress(job.completed_bytes(), job.total_bytes());
            reply.push_str(&format!(
                "🆔 status_{}\n📊 {} - {}%\n💾 {}/{} MB\n\n",
                job.gid, job.status, progress.percent, progress.completed_mb, progress.total_mb
            ));
        }
        reply
    }

    async fn find(&self, query: &str) -> Vec<String> {
        let Some(imdb_id) = extract::extract_imdb_id(query) else {
            return vec!["Please provide a valid IMDb URL or IMDb ID (e.g. tt1234567)".to_string()];
        };

        let hits = match self.index.search(&imdb_id).await {
            Ok(hits) => hits,
            Err(err) => {
                error!(error = %err, imdb_id, "torrent search failed");
                return vec!["Failed to fetch torrents. Try again later.".to_string()];
            }
        };
        if hits.is_empty() {
            return vec!["No torrents found for this IMDb ID.".to_string()];
        }

        let mut replies = Vec::new();
        for hit in hits.iter().take(MAX_FIND_RESULTS) {
            replies.push(format!(
                "🎬 {}\n\n📥 Quick download: dl_{}\n\n{}",
                hit.title, hit.info_hash, hit.magnet
            ));
        }
        if hits.len() > MAX_FIND_RESULTS {
            replies.push(format!(
                "... and {} more results found.",
                hits.len() - MAX_FIND_RESULTS
            ));
        }
        replies
    }

    async fn status(&self, id: &str) -> String {
        let job = match self.downloads.tell_status(id).await {
            Ok(job) => job,
            Err(err) => {
                warn!(error = %err, gid = id, "status lookup failed");
                return format!("Could not get status for {id}. Download may not exist.");
            }
        };

        let progress = format::progress(job.completed_bytes(), job.total_bytes());
        let mut reply = format!(
            "📊 Download Status\nStatus: {}\nProgress: {} MB / {} MB ({}%)\n",
            job.status, progress.completed_mb, progress.total_mb, progress.percent
        );
        if job.is_active() {
            reply.push_str(&format!("Cancel: cancel_{id}\n"));
        }

        let names: Vec<String> = job
            .files
            .iter()
            .take(MAX_STATUS_FILES)
            .map(|f| format!("📁 {}", f.basename()))
            .collect();
        if !names.is_empty() {
            reply.push_str(&format!("\nFiles:\n{}", names.join("\n")));
            if job.files.len() > MAX_STATUS_FILES {
                reply.push_str(&format!(
                    "\n... and {} more files",
                    job.files.len() - MAX_STATUS_FILES
                ));
            }
        }
        reply
    }

    async fn cancel(&self, id: &str) -> String {
        match self.downloads.remove(id).await {
            Ok(_) => format!("❌ Download {id} canceled."),
            Err(err) => {
                warn!(error = %err, gid = id, "cancel failed");
                format!("Failed to cancel {id}. May not exist or already finished.")
            }
        }
    }

    async fn stats(&self) -> String {
        let stat = match self.downloads.global_stat().await {
            Ok(stat) => stat,
            Err(err) => {
                error!(error = %err, "global stat fetch failed");
                return "Failed to fetch stats. Try again later.".to_string();
            }
        };
        format!(
            "📊 Aria2 Global Stats\n\n\
             🔽 Download Speed: {}/s\n\
             🔼 Upload Speed: {}/s\n\
             📦 Active Downloads: {}\n\
             ⏳ Waiting Downloads: {}\n\
             🛑 Stopped Downloads: {}\n\
             📈 Total Downloads: {}",
            format::bytes_to_size(stat.download_speed_bytes()),
            format::bytes_to_size(stat.upload_speed_bytes()),
            stat.active(),
            stat.waiting(),
            stat.stopped(),
            stat.total(),
        )
    }

    async fn clean(&self) -> String {
        match storage::delete_oldest_file(&self.save_dir).await {
            Ok(Some(path)) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("🗑️ Deleted oldest file: {name}")
            }
            Ok(None) => "No files to delete.".to_string(),
            Err(err) => {
                error!(error = %err, "clean failed");
                "❌ Failed to delete files.".to_string()
            }
        }
    }

    async fn autoclean(&self) -> String {
        let report = storage::autoclean(&self.save_dir, AUTOCLEAN_MAX_AGE).await;
        if report.deleted == 0 {
            return "No files older than 30 days found.".to_string();
        }
        format!(
            "🧹 Auto-clean completed!\n\
             ✅ Deleted {} files older than 30 days\n\
             💾 Freed up {} of space",
            report.deleted,
            format::bytes_to_size(report.bytes_freed),
        )
    }
}

/// Bridges the supervisor to the dispatcher: encrypts and publishes every
/// reply back to the sender.
pub struct BotHandler {
    dispatcher: Arc<CommandDispatcher>,
    channel: SecureChannel,
    gateway: PublishGateway,
}

impl BotHandler {
    pub fn new(
        dispatcher: Arc<CommandDispatcher>,
        channel: SecureChannel,
        gateway: PublishGateway,
    ) -> Self {
        Self {
            dispatcher,
            channel,
            gateway,
        }
    }
}

#[async_trait]
impl DmHandler for BotHandler {
    async fn handle_dm(&self, sender: PublicKey, text: String) {
        info!(sender = %format::short(&sender.to_hex()), "processing direct message");
        for reply in self.dispatcher.respond(&sender, &text).await {
            let builder = match self.channel.direct_message(&sender, &reply) {
                Ok(builder) => builder,
                Err(err) => {
                    error!(error = %err, "failed to encrypt reply");
                    continue;
                }
            };
            let outcome = self.gateway.publish(builder).await;
            if !outcome.delivered() && !outcome.timed_out {
                warn!(
                    attempts = outcome.attempts,
                    "reply not accepted by any relay"
                );
            }
        }
    }
}
