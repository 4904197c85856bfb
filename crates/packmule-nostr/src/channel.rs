//! NIP-04 encrypted channel for the bot identity.

use nostr_sdk::nostr::nips::nip04;
use nostr_sdk::{EventBuilder, Keys, Kind, PublicKey, Tag};

use crate::error::NostrError;

/// Encrypt/decrypt and event construction for direct messages to and from
/// the bot identity.
///
/// The cryptographic primitives themselves come from `nostr-sdk`; this type
/// only fixes the call contract: decryption failure is a recoverable error
/// (the event is dropped), and outbound events are built but not signed —
/// signing happens in the relay client, which carries the same keys as its
/// signer.
#[derive(Clone)]
pub struct SecureChannel {
    keys: Keys,
}

impl SecureChannel {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    /// Decrypt a direct message from `sender`. Fails when the ciphertext was
    /// not encrypted to this bot or is malformed.
    pub fn decrypt(&self, sender: &PublicKey, ciphertext: &str) -> Result<String, NostrError> {
        Ok(nip04::decrypt(self.keys.secret_key(), sender, ciphertext)?)
    }

    /// Encrypt a plaintext for `recipient`.
    pub fn encrypt(&self, recipient: &PublicKey, plaintext: &str) -> Result<String, NostrError> {
        Ok(nip04::encrypt(self.keys.secret_key(), recipient, plaintext)?)
    }

    /// Build an encrypted direct-message event (kind 4, `p`-tagged) for
    /// `recipient`.
    pub fn direct_message(
        &self,
        recipient: &PublicKey,
        plaintext: &str,
    ) -> Result<EventBuilder, NostrError> {
        let ciphertext = self.encrypt(recipient, plaintext)?;
        Ok(EventBuilder::new(Kind::EncryptedDirectMessage, ciphertext)
            .tags(vec![Tag::public_key(*recipient)]))
    }

    /// Build a plaintext public note (kind 1, untagged).
    pub fn public_note(&self, text: &str) -> EventBuilder {
        EventBuilder::new(Kind::TextNote, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dm_round_trip() {
        let bot = SecureChannel::new(Keys::generate());
        let peer = Keys::generate();

        let ciphertext = bot.encrypt(&peer.public_key(), "download tt1234567").unwrap();
        assert_ne!(ciphertext, "download tt1234567");

        // The peer decrypts with their own channel; NIP-04 is symmetric in
        // the shared secret.
        let peer_channel = SecureChannel::new(peer);
        let plaintext = peer_channel.decrypt(&bot.public_key(), &ciphertext).unwrap();
        assert_eq!(plaintext, "download tt1234567");
    }

    #[test]
    fn test_decrypt_rejects_foreign_ciphertext() {
        let bot = SecureChannel::new(Keys::generate());
        let alice = Keys::generate();
        let mallory = Keys::generate();

        // Encrypted between alice and mallory; the bot is not a party.
        let foreign = SecureChannel::new(alice.clone())
            .encrypt(&mallory.public_key(), "secret")
            .unwrap();
        assert!(bot.decrypt(&alice.public_key(), &foreign).is_err());
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let bot = SecureChannel::new(Keys::generate());
        let peer = Keys::generate();
        assert!(bot.decrypt(&peer.public_key(), "not-a-ciphertext").is_err());
    }
}
