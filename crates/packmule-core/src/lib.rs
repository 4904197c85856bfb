//! Core state and parsing for the Packmule download bot.
//!
//! This crate holds the pieces of the bot with real invariants and no I/O
//! collaborators of their own:
//!
//! - [`ReplayCache`] — bounded dedupe of relayed event ids, so a command is
//!   executed at most once even when several relays redeliver the same event.
//! - [`AuthStore`] — the shared unlock code and the set of authorized senders.
//! - [`Command`] — the fixed command vocabulary and its parser.
//! - [`extract`] — magnet / URL / IMDb id extraction from free text.
//! - [`format`] — byte sizes, download progress, and transfer speeds.
//! - [`storage`] — download-directory maintenance (size, clean, autoclean).

mod auth;
mod command;
mod replay;

pub mod extract;
pub mod format;
pub mod storage;

pub use auth::AuthStore;
pub use command::{strip_client_markup, Command};
pub use replay::{ReplayCache, MAX_STORED_EVENTS};
