//! Relay connection pool with wholesale client replacement.

use std::sync::Arc;
use std::time::Duration;

use nostr_sdk::{Client, Keys, RelayStatus};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::NostrError;

/// Pause between tearing down the old client and building its replacement,
/// so in-flight socket closes can settle.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Owns the `nostr_sdk::Client` for a fixed relay set.
///
/// The supervisor replaces the client wholesale on every scheduled
/// reconnect; everything else (the publish gateway, health reports) reads
/// the current client through [`RelayPool::client`]. A caller holding a
/// clone of a client that was since replaced simply sees its sends fail and
/// picks up the fresh client on retry.
#[derive(Clone)]
pub struct RelayPool {
    client: Arc<RwLock<Client>>,
    keys: Keys,
    relays: Vec<String>,
}

impl RelayPool {
    /// Build a client, register all relay endpoints, and start connecting.
    pub async fn connect(keys: Keys, relays: Vec<String>) -> Result<Self, NostrError> {
        let client = build_client(&keys, &relays).await?;
        info!(relays = relays.len(), "relay pool connected");
        Ok(Self {
            client: Arc::new(RwLock::new(client)),
            keys,
            relays,
        })
    }

    /// The current client. Cheap clone; the underlying pool is shared.
    pub async fn client(&self) -> Client {
        self.client.read().await.clone()
    }

    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }

    /// Number of relays currently in the connected state.
    pub async fn connected_relays(&self) -> usize {
        let client = self.client().await;
        client
            .relays()
            .await
            .values()
            .filter(|relay| relay.status() == RelayStatus::Connected)
            .count()
    }

    /// Tear down the current client and swap in a freshly connected one.
    ///
    /// Teardown is best-effort; a stuck old client must not prevent the
    /// replacement from going up. The write lock is held across the swap so
    /// publishers wait for the fresh client instead of racing the teardown.
    pub async fn rebuild(&self) -> Result<(), NostrError> {
        let mut guard = self.client.write().await;
        let old = guard.clone();
        old.unsubscribe_all().await;
        old.shutdown().await;
        debug!("old relay client shut down");

        tokio::time::sleep(SETTLE_DELAY).await;

        let fresh = build_client(&self.keys, &self.relays).await?;
        *guard = fresh;
        info!(relays = self.relays.len(), "relay pool rebuilt");
        Ok(())
    }

    /// Drop every subscription on the current client without replacing it.
    pub async fn clear_subscriptions(&self) {
        self.client().await.unsubscribe_all().await;
    }

    /// Close the subscription and all relay connections.
    pub async fn shutdown(&self) {
        let client = self.client().await;
        client.unsubscribe_all().await;
        client.shutdown().await;
        info!("relay pool shut down");
    }
}

async fn build_client(keys: &Keys, relays: &[String]) -> Result<Client, NostrError> {
    let client = Client::builder().signer(keys.clone()).build();
    for relay in relays {
        if let Err(err) = client.add_relay(relay).await {
            warn!(relay = %relay, error = %err, "failed to add relay");
        }
    }
    client.connect().await;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    // An empty relay set keeps these off the network.

    #[tokio::test]
    async fn test_clear_subscriptions_is_idempotent() {
        let pool = RelayPool::connect(Keys::generate(), Vec::new())
            .await
            .unwrap();
        pool.clear_subscriptions().await;
        pool.clear_subscriptions().await;
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_rebuild_replaces_client() {
        let pool = RelayPool::connect(Keys::generate(), Vec::new())
            .await
            .unwrap();
        pool.rebuild().await.unwrap();
        assert_eq!(pool.relay_count(), 0);
        assert_eq!(pool.connected_relays().await, 0);
        pool.shutdown().await;
    }
}
