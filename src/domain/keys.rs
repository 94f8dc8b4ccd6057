//! Round-robin API key rotation.
//!
//! The key list is shared read-only across all loops; each loop owns
//! its own cursor. The cursor advances before the key is read, so with
//! keys `[A, B, C]` the sequence is `B, C, A, B, ...`.

use std::sync::Arc;

use crate::errors::ConfigError;

/// Non-empty, shared list of API keys plus a private rotation cursor.
#[derive(Debug, Clone)]
pub struct KeyRing {
    keys: Arc<[String]>,
    index: usize,
}

impl KeyRing {
    /// Build a ring over `keys`.
    ///
    /// # Errors
    /// Returns `ConfigError::NoApiKeys` if `keys` is empty.
    pub fn new(keys: impl Into<Arc<[String]>>) -> Result<Self, ConfigError> {
        let keys = keys.into();
        if keys.is_empty() {
            return Err(ConfigError::NoApiKeys);
        }
        Ok(Self { keys, index: 0 })
    }

    /// Advance the cursor and return the key it lands on.
    pub fn next_key(&mut self) -> &str {
        self.index = (self.index + 1) % self.keys.len();
        &self.keys[self.index]
    }

    /// Number of keys in the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; an empty ring cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
