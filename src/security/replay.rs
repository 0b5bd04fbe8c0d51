use std::time::Duration;

use lru_time_cache::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer};
use tracing::debug;

const fn default_capacity() -> usize {
    10_000
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<u64>::deserialize(deserializer)?;
    Ok(secs.map(Duration::from_secs))
}

/// How many salts to remember, and for how long.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    /// Maximum remembered salts, the least recently seen one is evicted first
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Forget salts older than this, in seconds
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expiry: Option<Duration>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            expiry: None,
        }
    }
}

/// A bounded history of salts, protects against replay attack
///
/// https://github.com/shadowsocks/shadowsocks-org/issues/44
pub struct ReplayProtector {
    salts: Mutex<LruCache<Vec<u8>, ()>>,
}

impl ReplayProtector {
    pub fn new(config: &ReplayConfig) -> Self {
        let capacity = config.capacity.max(1);
        let cache = match config.expiry {
            Some(expiry) => LruCache::with_expiry_duration_and_capacity(expiry, capacity),
            None => LruCache::with_capacity(capacity),
        };

        debug!(
            message = "replay protector created",
            capacity,
            expiry = ?config.expiry
        );

        Self {
            salts: Mutex::new(cache),
        }
    }

    /// Check if the salt is remembered
    pub fn seen(&self, salt: &[u8]) -> bool {
        self.salts.lock().get(salt).is_some()
    }

    /// Remember the salt
    pub fn record(&self, salt: &[u8]) {
        self.salts.lock().insert(salt.to_vec(), ());
    }

    /// Returns `true` if the salt was seen before, records it otherwise.
    pub fn check_and_record(&self, salt: &[u8]) -> bool {
        let mut salts = self.salts.lock();
        if salts.get(salt).is_some() {
            return true;
        }

        salts.insert(salt.to_vec(), ());
        false
    }

    /// Number of remembered salts
    pub fn len(&self) -> usize {
        self.salts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReplayProtector {
    fn default() -> Self {
        Self::new(&ReplayConfig::default())
    }
}
