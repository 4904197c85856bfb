//! Subscription lifecycle, forced reconnects, and the inbound DM pipeline.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nostr_sdk::{Event, Filter, Kind, PublicKey, RelayPoolNotification, Timestamp};
use tracing::{debug, info, warn};

use packmule_core::{AuthStore, ReplayCache};

use crate::channel::SecureChannel;
use crate::error::NostrError;
use crate::pool::RelayPool;

/// Receives decrypted, deduplicated direct messages.
#[async_trait]
pub trait DmHandler: Send + Sync {
    async fn handle_dm(&self, sender: PublicKey, text: String);
}

/// Timing knobs for the supervision loop.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Proactive full reconnect cadence. Relays silently drop idle
    /// subscriptions; replacing the client on a timer is cheaper than
    /// detecting the drop.
    pub reconnect_interval: Duration,
    /// Health report cadence.
    pub health_interval: Duration,
    /// Maximum accepted event age. Anything older is treated as relay
    /// backfill, not a live command.
    pub event_window: Duration,
    /// Pause before resubscribing after the notification stream ends.
    pub resubscribe_delay: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_secs(100),
            health_interval: Duration::from_secs(60),
            event_window: Duration::from_secs(120),
            resubscribe_delay: Duration::from_secs(5),
        }
    }
}

/// Drives the inbound side: subscribes for DMs addressed to the bot,
/// filters and decrypts them, and hands plaintext to the [`DmHandler`].
///
/// Also owns the connection schedule: a full client rebuild every
/// `reconnect_interval` and a health log line every `health_interval`.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    pool: RelayPool,
    channel: SecureChannel,
    replay: Arc<Mutex<ReplayCache>>,
    auth: Arc<Mutex<AuthStore>>,
    handler: Arc<dyn DmHandler>,
    config: SupervisorConfig,
}

impl ConnectionSupervisor {
    pub fn new(
        pool: RelayPool,
        channel: SecureChannel,
        replay: Arc<Mutex<ReplayCache>>,
        auth: Arc<Mutex<AuthStore>>,
        handler: Arc<dyn DmHandler>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            pool,
            channel,
            replay,
            auth,
            handler,
            config,
        }
    }

    /// Run until the shutdown future resolves.
    ///
    /// Each pass of the outer loop subscribes on the current client and
    /// drives its notification stream; the inner select breaks out of the
    /// pass whenever the client needs replacing.
    pub async fn run<S>(&self, shutdown: S) -> Result<(), NostrError>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let mut reconnect = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.reconnect_interval,
            self.config.reconnect_interval,
        );
        let mut health = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.health_interval,
            self.config.health_interval,
        );

        loop {
            // A pass can end with the client still in place (stream drop,
            // failed rebuild); drop its subscription before opening the
            // replacement so they do not accumulate.
            self.pool.clear_subscriptions().await;

            let client = self.pool.client().await;
            let filter = Filter::new()
                .kind(Kind::EncryptedDirectMessage)
                .pubkey(self.channel.public_key())
                .since(Timestamp::now());
            client.subscribe(filter, None).await?;
            info!("subscribed for direct messages");

            let notifications = self.drive(client);
            tokio::pin!(notifications);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        info!("supervisor shutting down");
                        return Ok(());
                    }
                    _ = reconnect.tick() => {
                        info!("scheduled reconnect, rebuilding relay client");
                        if let Err(err) = self.pool.rebuild().await {
                            warn!(error = %err, "relay rebuild failed, retrying next cycle");
                        }
                        break;
                    }
                    _ = health.tick() => {
                        self.report_health().await;
                    }
                    result = &mut notifications => {
                        match result {
                            Ok(()) => info!("notification stream ended"),
                            Err(err) => warn!(error = %err, "notification stream failed"),
                        }
                        tokio::time::sleep(self.config.resubscribe_delay).await;
                        break;
                    }
                }
            }
        }
    }

    /// Consume the client's notification stream until it ends.
    async fn drive(&self, client: nostr_sdk::Client) -> Result<(), NostrError> {
        let supervisor = self.clone();
        client
            .handle_notifications(move |notification| {
                let supervisor = supervisor.clone();
                async move {
                    if let RelayPoolNotification::Event { event, .. } = notification {
                        supervisor.handle_event(&event).await;
                    }
                    Ok(false)
                }
            })
            .await?;
        Ok(())
    }

    /// The inbound pipeline for one event: kind check, self check, age
    /// window, replay dedupe, decrypt, dispatch.
    async fn handle_event(&self, event: &Event) {
        if event.kind != Kind::EncryptedDirectMessage {
            return;
        }
        if event.pubkey == self.channel.public_key() {
            return;
        }

        let now = Timestamp::now().as_u64();
        let created = event.created_at.as_u64();
        if is_expired(now, created, self.config.event_window.as_secs()) {
            debug!(age = now.saturating_sub(created), "dropping stale event");
            return;
        }

        let fresh = match self.replay.lock() {
            Ok(mut cache) => cache.record(&event.id.to_hex(), created),
            Err(poisoned) => {
                warn!("replay cache lock poisoned, recovering");
                poisoned.into_inner().record(&event.id.to_hex(), created)
            }
        };
        if !fresh {
            debug!(id = %event.id, "dropping replayed event");
            return;
        }

        let plaintext = match self.channel.decrypt(&event.pubkey, &event.content) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, sender = %event.pubkey, "failed to decrypt direct message");
                return;
            }
        };
        let text = packmule_core::strip_client_markup(&plaintext).to_string();

        // Handle commands off the notification task so a slow download
        // manager cannot stall the stream.
        let handler = self.handler.clone();
        let sender = event.pubkey;
        tokio::spawn(async move {
            handler.handle_dm(sender, text).await;
        });
    }

    async fn report_health(&self) {
        let connected = self.pool.connected_relays().await;
        let cached = match self.replay.lock() {
            Ok(cache) => cache.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        let authorized = match self.auth.lock() {
            Ok(store) => store.count(),
            Err(poisoned) => poisoned.into_inner().count(),
        };
        info!(
            connected,
            total = self.pool.relay_count(),
            cached_events = cached,
            authorized,
            "relay health"
        );
    }
}

/// Whether an event timestamp falls outside the acceptance window. Future
/// timestamps (skewed clocks) are accepted.
fn is_expired(now: u64, created_at: u64, window_secs: u64) -> bool {
    now.saturating_sub(created_at) > window_secs
}
