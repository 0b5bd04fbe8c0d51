//! Per-packet salt generation
//!
//! The salt is sent in clear in front of every packet and mixed into the
//! subkey derivation. Reusing a salt with the same key for two different
//! plaintexts breaks the AEAD, so it must come from a secure random source.

use std::sync::Arc;

use rand::RngCore;

use crate::security::ReplayProtector;

/// Produces the salt for outgoing packets.
pub trait SaltGenerator: Send + Sync {
    /// Fill `salt` with a new salt, its length is the key's salt size.
    fn new_salt(&self, salt: &mut [u8]);
}

/// Fills salts from the thread local CSPRNG, never checks for duplicates.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSaltGenerator;

impl SaltGenerator for RandomSaltGenerator {
    #[inline]
    fn new_salt(&self, salt: &mut [u8]) {
        rand::thread_rng().fill_bytes(salt);
    }
}

/// Random salts which are remembered by a [`ReplayProtector`].
///
/// A salt already in the history is never handed out, and packets coming
/// back with one of our own salts are recognized as replays when the same
/// protector guards the receive path.
#[derive(Clone)]
pub struct ReplayCheckingSaltGenerator {
    protector: Arc<ReplayProtector>,
}

impl ReplayCheckingSaltGenerator {
    pub fn new(protector: Arc<ReplayProtector>) -> Self {
        Self { protector }
    }

    pub fn protector(&self) -> &Arc<ReplayProtector> {
        &self.protector
    }
}

impl SaltGenerator for ReplayCheckingSaltGenerator {
    fn new_salt(&self, salt: &mut [u8]) {
        loop {
            RandomSaltGenerator.new_salt(salt);
            if !self.protector.check_and_record(salt) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::security::ReplayConfig;

    #[test]
    fn random_salts_are_unique() {
        let mut seen = HashSet::new();
        let mut salt = [0u8; 32];

        for _ in 0..10_000 {
            RandomSaltGenerator.new_salt(&mut salt);
            assert!(seen.insert(salt), "duplicated salt {}", hex::encode(salt));
        }
    }

    #[test]
    fn random_salt_fills_whole_buffer() {
        // 16 zero bytes after filling has a chance of 2^-128
        let mut salt = [0u8; 16];
        RandomSaltGenerator.new_salt(&mut salt);
        assert_ne!(salt, [0u8; 16]);
    }

    #[test]
    fn replay_checking_records() {
        let protector = Arc::new(ReplayProtector::new(&ReplayConfig::default()));
        let generator = ReplayCheckingSaltGenerator::new(protector.clone());

        let mut salt = [0u8; 16];
        generator.new_salt(&mut salt);

        assert!(protector.seen(&salt));
        assert_eq!(protector.len(), 1);

        generator.new_salt(&mut salt);
        assert_eq!(protector.len(), 2);
    }
}
