//! Unlock-code authorization for command senders.

use std::collections::HashSet;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

/// Length of a generated unlock code.
const UNLOCK_CODE_LEN: usize = 8;

/// In-memory set of authorized sender pubkeys, gated by a shared unlock code.
///
/// Membership is monotonic for the process lifetime: there is no revoke
/// operation, and the store is lost on restart. Unlock attempts are not
/// throttled; brute-forcing the code is a known, deliberately unaddressed gap.
#[derive(Debug)]
pub struct AuthStore {
    unlock_code: String,
    granted: HashSet<String>,
}

impl AuthStore {
    pub fn new(unlock_code: impl Into<String>) -> Self {
        Self {
            unlock_code: unlock_code.into(),
            granted: HashSet::new(),
        }
    }

    /// Generate a random alphanumeric unlock code.
    pub fn generate_code() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(UNLOCK_CODE_LEN)
            .map(char::from)
            .collect()
    }

    pub fn is_authorized(&self, sender: &str) -> bool {
        self.granted.contains(sender)
    }

    /// Authorize the sender iff the presented code matches the unlock code.
    ///
    /// Idempotent: an already-authorized sender stays authorized no matter
    /// what code they present.
    pub fn try_unlock(&mut self, sender: &str, presented: &str) -> bool {
        if self.granted.contains(sender) {
            return true;
        }
        if presented == self.unlock_code {
            self.granted.insert(sender.to_string());
            info!(authorized = self.granted.len(), "sender authorized");
            return true;
        }
        false
    }

    pub fn count(&self) -> usize {
        self.granted.len()
    }

    pub fn unlock_code(&self) -> &str {
        &self.unlock_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_with_correct_code() {
        let mut store = AuthStore::new("sesame");
        assert!(!store.is_authorized("alice"));
        assert!(store.try_unlock("alice", "sesame"));
        assert!(store.is_authorized("alice"));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_unlock_with_wrong_code() {
        let mut store = AuthStore::new("sesame");
        assert!(!store.try_unlock("alice", "open please"));
        assert!(!store.is_authorized("alice"));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut store = AuthStore::new("sesame");
        assert!(store.try_unlock("alice", "sesame"));
        // Neither a repeat of the correct code nor garbage revokes access.
        assert!(store.try_unlock("alice", "sesame"));
        assert!(store.try_unlock("alice", "wrong"));
        assert!(store.is_authorized("alice"));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_generated_code_shape() {
        let code = AuthStore::generate_code();
        assert_eq!(code.len(), UNLOCK_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
