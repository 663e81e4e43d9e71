//! Presence tracking and sector authentication.
//!
//! A tag left on the reader answers every poll. The tracker remembers that it
//! has already been seen and suppresses it until a poll comes back empty,
//! so a held tag is processed once.

use tracing::{debug, info, warn};

use crate::classic::{CardType, Uid, FIRST_PAYLOAD_BLOCK};
use crate::config::{ReaderConfig, BLOCKING_TIMEOUT};
use crate::error::{TagError, TagResult};
use crate::reader::TagReader;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Absent,
    Present,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    /// Wait for a tag indefinitely and ignore any earlier session. Used before writes.
    Blocking,
    /// Short bounded poll that honours the debounce rule.
    Polling,
}

#[derive(Clone, Debug, Default)]
pub struct SessionTracker {
    pub config: ReaderConfig,
    state: SessionState,
}

impl SessionTracker {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            state: SessionState::Absent,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_present(&self) -> bool {
        self.state == SessionState::Present
    }

    /// Detect a tag and authenticate the payload sector with the configured key.
    ///
    /// Returns the UID of a freshly presented tag. A tag that is still in the
    /// field from an earlier successful call yields [`TagError::AlreadyPresent`]
    /// until a poll finds the field empty.
    pub fn authenticate<R: TagReader>(
        &mut self,
        reader: &mut R,
        mode: AuthMode,
    ) -> TagResult<Uid> {
        let timeout = match mode {
            AuthMode::Blocking => {
                self.state = SessionState::Absent;
                BLOCKING_TIMEOUT
            }
            AuthMode::Polling => self.config.poll_timeout,
        };

        let uid = match reader.read_passive_target(CardType::Iso14443A, timeout) {
            Some(uid) => uid,
            None => {
                if self.state == SessionState::Present {
                    debug!("Tag removed");
                }
                self.state = SessionState::Absent;
                return Err(TagError::NoTag);
            }
        };

        if self.state == SessionState::Present {
            return Err(TagError::AlreadyPresent);
        }
        self.state = SessionState::Present;

        info!(uid = %uid, uid_len = uid.len(), "Found an ISO14443A card");

        if !uid.is_classic() {
            let err = TagError::UnsupportedUid { len: uid.len() };
            warn!("{err}, try a MIFARE Classic card");
            return Err(err);
        }

        debug!(
            block = FIRST_PAYLOAD_BLOCK,
            key_type = ?self.config.key_type,
            "Authenticating payload sector"
        );
        if reader.authenticate_block(
            &uid,
            FIRST_PAYLOAD_BLOCK,
            self.config.key_type,
            &self.config.key,
        ) {
            Ok(uid)
        } else {
            let err = TagError::AuthenticationRejected {
                block: FIRST_PAYLOAD_BLOCK,
            };
            warn!("{err}");
            Err(err)
        }
    }
}
