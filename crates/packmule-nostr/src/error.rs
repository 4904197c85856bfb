use thiserror::Error;

/// Errors from the nostr transport layer.
#[derive(Debug, Error)]
pub enum NostrError {
    #[error("nostr client error: {0}")]
    Client(#[from] nostr_sdk::client::Error),

    #[error("nostr key error: {0}")]
    Key(#[from] nostr_sdk::nostr::key::Error),

    /// NIP-04 failure: the ciphertext was not encrypted to this identity or
    /// is malformed. Non-fatal; the event is dropped after logging.
    #[error("nip04 error: {0}")]
    Crypto(#[from] nostr_sdk::nostr::nips::nip04::Error),
}
