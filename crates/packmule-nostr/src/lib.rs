//! Nostr transport for the Packmule download bot.
//!
//! This crate owns everything between the relay network and the command
//! layer:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       PACKMULE-NOSTR                           │
//! │                                                                │
//! │  relays ──► ConnectionSupervisor ──► SecureChannel.decrypt ──► │
//! │              (age filter, replay       │                       │
//! │               dedupe, reconnects)      ▼                       │
//! │                                   DmHandler (command layer)    │
//! │                                        │                       │
//! │  relays ◄── PublishGateway ◄── SecureChannel.encrypt ◄─────────┘
//! │              (per-relay outcomes,
//! │               bounded retry)
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`SecureChannel`] — NIP-04 encrypt/decrypt and event construction for
//!   the bot identity.
//! - [`RelayPool`] — owns the `nostr_sdk::Client`; the supervisor replaces
//!   the client wholesale on every scheduled reconnect.
//! - [`PublishGateway`] — publish with per-relay outcome accounting and
//!   linear-backoff retry on total failure.
//! - [`ConnectionSupervisor`] — subscription lifecycle, forced reconnects,
//!   health reports, and the inbound event pipeline.

mod channel;
mod error;
mod pool;
mod publish;
mod supervisor;

pub use channel::SecureChannel;
pub use error::NostrError;
pub use pool::RelayPool;
pub use publish::{PublishGateway, PublishOutcome};
pub use supervisor::{ConnectionSupervisor, DmHandler, SupervisorConfig};

// Types callers need to speak to this crate.
pub use nostr_sdk::nostr::nips::nip19::ToBech32;
pub use nostr_sdk::{EventBuilder, Keys, PublicKey};
