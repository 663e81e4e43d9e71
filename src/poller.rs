//! The poll loop tying the reader, the operator's write requests and playback together.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use tracing::{debug, info, warn};

use crate::codec::{self, WriteSummary};
use crate::config::ReaderConfig;
use crate::error::{TagError, TagResult};
use crate::firmware::{self, FirmwareVersion};
use crate::reader::TagReader;
use crate::session::SessionTracker;

/// Receives identifiers decoded from freshly presented tags.
pub trait Player {
    fn play(&mut self, identifier: &str);
}

impl<F: FnMut(&str)> Player for F {
    fn play(&mut self, identifier: &str) {
        self(identifier)
    }
}

/// Source of identifiers the operator wants written to the next tag.
pub trait WriteRequests {
    /// Next identifier to write, or `None` when there is nothing to write.
    fn next_request(&mut self) -> Option<String>;
}

/// No write requests, ever. For read-only installations.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRequests;

impl WriteRequests for NoRequests {
    fn next_request(&mut self) -> Option<String> {
        None
    }
}

impl WriteRequests for VecDeque<String> {
    fn next_request(&mut self) -> Option<String> {
        self.pop_front()
    }
}

/// Write requests read line by line from a control channel (a serial console,
/// stdin). Each line is trimmed; blank lines are skipped. End of input closes
/// the channel for good.
#[derive(Debug)]
pub struct LineRequests<B> {
    input: B,
    pending: Vec<u8>,
    closed: bool,
}

impl<B: BufRead> LineRequests<B> {
    pub fn new(input: B) -> Self {
        Self {
            input,
            pending: Vec::new(),
            closed: false,
        }
    }

    fn take_pending(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.pending);
        let request = String::from_utf8_lossy(&line).trim().to_string();
        (!request.is_empty()).then_some(request)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<B: BufRead> WriteRequests for LineRequests<B> {
    // A reader that has nothing yet should answer `WouldBlock`; anything else
    // blocks the poll until a line arrives. A partial line is kept until the
    // rest of it shows up.
    fn next_request(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }

        loop {
            match self.input.read_until(b'\n', &mut self.pending) {
                Ok(0) => {
                    debug!("Control channel closed");
                    self.closed = true;
                    return self.take_pending();
                }
                Ok(_) if self.pending.ends_with(b"\n") => {
                    if let Some(request) = self.take_pending() {
                        return Some(request);
                    }
                }
                // Last line without a newline; the next read reports end of input
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("Control channel failed: {e}");
                    self.closed = true;
                    return None;
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollState {
    #[default]
    Idle,
    HasNewTag,
    WriteRequested,
}

/// What a single poll cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// No new tag, or a new tag with nothing on it.
    Idle,
    /// A new tag was read and its identifier handed to the player.
    Played(String),
    Written(WriteSummary),
    WriteFailed(TagError),
}

pub struct Poller<R, P> {
    reader: R,
    player: P,
    session: SessionTracker,
    firmware: FirmwareVersion,
    state: PollState,
}

impl<R: TagReader, P: Player> Poller<R, P> {
    /// Probe the reader and set up an empty session.
    ///
    /// Fails with [`TagError::ReaderNotFound`] when no chip answers; there is
    /// nothing to poll in that case.
    pub fn new(mut reader: R, player: P, config: ReaderConfig) -> TagResult<Self> {
        let firmware = firmware::probe(&mut reader)?;
        Ok(Self {
            reader,
            player,
            session: SessionTracker::new(config),
            firmware,
            state: PollState::Idle,
        })
    }

    pub fn firmware(&self) -> FirmwareVersion {
        self.firmware
    }

    /// State entered by the last cycle.
    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    /// Run one cycle: a pending write request wins over reading.
    pub fn poll<W: WriteRequests + ?Sized>(&mut self, requests: &mut W) -> PollOutcome {
        match requests.next_request() {
            Some(identifier) => self.write(&identifier),
            None => self.read(),
        }
    }

    fn write(&mut self, identifier: &str) -> PollOutcome {
        self.state = PollState::WriteRequested;
        info!(identifier, "Write requested, waiting for a tag");

        match codec::write_identifier(&mut self.reader, &mut self.session, identifier) {
            Ok(summary) => PollOutcome::Written(summary),
            Err(e) => {
                warn!("Write failed: {e}");
                PollOutcome::WriteFailed(e)
            }
        }
    }

    fn read(&mut self) -> PollOutcome {
        let identifier = match codec::read_new_tag(&mut self.reader, &mut self.session) {
            Ok(identifier) => identifier,
            Err(e) => {
                if !matches!(e, TagError::NoTag | TagError::AlreadyPresent) {
                    debug!("Tag skipped: {e}");
                }
                self.state = PollState::Idle;
                return PollOutcome::Idle;
            }
        };

        self.state = PollState::HasNewTag;
        if identifier.is_empty() {
            debug!("Tag holds no identifier");
            return PollOutcome::Idle;
        }

        info!(identifier = %identifier, "Track to play");
        self.player.play(&identifier);
        PollOutcome::Played(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn line_requests_are_trimmed_and_blank_lines_skipped() {
        let input = Cursor::new("  spotify:track:3cRmHMdcalueasgmweHd2r \r\n\n\t\nspotify:album:1\n");
        let mut requests = LineRequests::new(input);

        assert_eq!(
            requests.next_request().as_deref(),
            Some("spotify:track:3cRmHMdcalueasgmweHd2r")
        );
        assert_eq!(requests.next_request().as_deref(), Some("spotify:album:1"));
        assert_eq!(requests.next_request(), None);
        assert!(requests.is_closed());
        assert_eq!(requests.next_request(), None);
    }

    #[test]
    fn queued_requests_drain_in_order() {
        let mut queue: VecDeque<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(queue.next_request().as_deref(), Some("a"));
        assert_eq!(queue.next_request().as_deref(), Some("b"));
        assert_eq!(queue.next_request(), None);
        assert_eq!(NoRequests.next_request(), None);
    }

    /// Hands out one chunk per `fill_buf`; `None` answers `WouldBlock`.
    struct Trickle {
        chunks: VecDeque<Option<&'static [u8]>>,
        current: &'static [u8],
    }

    impl Trickle {
        fn new(chunks: Vec<Option<&'static [u8]>>) -> Self {
            Self {
                chunks: chunks.into(),
                current: &[],
            }
        }
    }

    impl io::Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let available = self.fill_buf()?;
            let n = available.len().min(buf.len());
            buf[..n].copy_from_slice(&available[..n]);
            self.consume(n);
            Ok(n)
        }
    }

    impl BufRead for Trickle {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            if self.current.is_empty() {
                match self.chunks.pop_front() {
                    Some(Some(chunk)) => self.current = chunk,
                    Some(None) => return Err(io::ErrorKind::WouldBlock.into()),
                    None => {}
                }
            }
            Ok(self.current)
        }

        fn consume(&mut self, amt: usize) {
            self.current = &self.current[amt..];
        }
    }

    #[test]
    fn line_split_by_would_block_is_kept_whole() {
        let input = Trickle::new(vec![
            Some(&b"spotify:tr"[..]),
            None,
            Some(&b"ack:6rqhFgbbKwnb9MLmUQDhG6\n"[..]),
        ]);
        let mut requests = LineRequests::new(input);

        assert_eq!(requests.next_request(), None);
        assert!(!requests.is_closed());
        assert_eq!(
            requests.next_request().as_deref(),
            Some("spotify:track:6rqhFgbbKwnb9MLmUQDhG6")
        );
    }

    #[test]
    fn multibyte_char_split_by_would_block_survives() {
        let input = Trickle::new(vec![Some(&b"caf\xC3"[..]), None, Some(&b"\xA9\n"[..])]);
        let mut requests = LineRequests::new(input);

        assert_eq!(requests.next_request(), None);
        assert_eq!(requests.next_request().as_deref(), Some("caf\u{e9}"));
    }

    #[test]
    fn last_line_without_newline_is_returned_at_end_of_input() {
        let mut requests = LineRequests::new(Cursor::new(" spotify:album:1 "));

        assert_eq!(requests.next_request().as_deref(), Some("spotify:album:1"));
        assert!(requests.is_closed());
        assert_eq!(requests.next_request(), None);
    }
}
