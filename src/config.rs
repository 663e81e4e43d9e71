use crate::keys::{KeyType, SectorKey, DEFAULT_KEY};

/// Timeout for the non-blocking poll, in reader units.
pub const DEFAULT_POLL_TIMEOUT: u16 = 100;

/// Timeout used before writes: wait until a tag is presented.
pub const BLOCKING_TIMEOUT: u16 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    pub poll_timeout: u16,
    pub key_type: KeyType,
    pub key: SectorKey,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            key_type: KeyType::A,
            key: DEFAULT_KEY,
        }
    }
}

impl ReaderConfig {
    pub fn with_poll_timeout(mut self, poll_timeout: u16) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_key(mut self, key_type: KeyType, key: SectorKey) -> Self {
        self.key_type = key_type;
        self.key = key;
        self
    }
}
