//! Identifier storage in blocks 4..=6.
//!
//! Layout: identifier bytes, one `\n` terminator, then zero padding up to the
//! end of the last block used. Blocks past the terminator are never touched.
//! An identifier whose length is a multiple of 16 gets the terminator alone in
//! the following block.

use tracing::{debug, info, warn};

use crate::classic::{
    payload_blocks, Block, BLOCK_SIZE, MAX_IDENTIFIER_LEN, PAYLOAD_BLOCKS, PAYLOAD_CAPACITY,
    TERMINATOR,
};
use crate::error::{TagError, TagResult};
use crate::reader::TagReader;
use crate::session::{AuthMode, SessionTracker};

/// Highest byte value treated as plain text by the trailing-artifact heuristic.
const ASCII_MAX: u8 = 127;

/// Block indices touched by a write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: Vec<u8>,
    pub failed: Vec<u8>,
}

impl WriteSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reject identifiers that would not survive a write/read cycle.
pub fn validate(identifier: &str) -> TagResult<()> {
    let len = identifier.len();
    if len > MAX_IDENTIFIER_LEN {
        return Err(TagError::PayloadTooLong {
            len,
            max: MAX_IDENTIFIER_LEN,
        });
    }
    if let Some(c) = identifier.chars().find(|&c| c == '\n' || c == '\0') {
        return Err(TagError::InvalidIdentifier(c));
    }
    Ok(())
}

/// Split an identifier into the blocks to write, starting at block 4.
pub fn encode(identifier: &str) -> TagResult<Vec<Block>> {
    validate(identifier)?;

    let mut blocks = Vec::with_capacity(PAYLOAD_BLOCKS as usize);
    let mut remainder = identifier.as_bytes();

    loop {
        let mut block = [0u8; BLOCK_SIZE];

        if remainder.len() >= BLOCK_SIZE {
            // A full block carries no terminator; it goes into the next one,
            // even when that leaves the next block holding only `\n`.
            block.copy_from_slice(&remainder[..BLOCK_SIZE]);
            remainder = &remainder[BLOCK_SIZE..];
            blocks.push(block);
        } else {
            block[..remainder.len()].copy_from_slice(remainder);
            block[remainder.len()] = TERMINATOR;
            blocks.push(block);
            break;
        }
    }

    debug_assert!(blocks.len() <= PAYLOAD_BLOCKS as usize);
    Ok(blocks)
}

/// Rebuild the identifier from the payload blocks, in order.
///
/// `None` stands for a block that could not be read; it is skipped and the
/// remaining blocks still contribute. Reading stops at the terminator.
///
/// Blocks without a terminator that end early (a NUL before byte 16) are
/// treated as damaged: trailing whitespace and control bytes are trimmed and a
/// single trailing byte above 127 is dropped. That last rule is a heuristic
/// for garbage seen on partially written cards, not a property of the layout.
pub fn decode(blocks: &[Option<Block>]) -> String {
    let mut payload: Vec<u8> = Vec::with_capacity(PAYLOAD_CAPACITY);

    for block in blocks.iter().flatten() {
        let text = match block.iter().position(|&b| b == 0) {
            Some(end) => &block[..end],
            None => &block[..],
        };

        if let Some(end) = text.iter().position(|&b| b == TERMINATOR) {
            payload.extend_from_slice(&text[..end]);
            return String::from_utf8_lossy(&payload).into_owned();
        }

        payload.extend_from_slice(text);
        if text.len() < BLOCK_SIZE {
            trim_artifacts(&mut payload);
        }
    }

    trim_trailing(&mut payload);
    String::from_utf8_lossy(&payload).into_owned()
}

fn is_trimmable(b: u8) -> bool {
    b <= b' ' || b == 0x7F
}

fn trim_trailing(payload: &mut Vec<u8>) {
    while payload.last().copied().is_some_and(is_trimmable) {
        payload.pop();
    }
}

fn trim_artifacts(payload: &mut Vec<u8>) {
    trim_trailing(payload);
    if payload.last().is_some_and(|&b| b > ASCII_MAX) {
        payload.pop();
    }
}

/// Read the three payload blocks. Failed reads are logged and come back as `None`.
pub fn read_blocks<R: TagReader>(reader: &mut R) -> Vec<Option<Block>> {
    payload_blocks()
        .map(|index| match reader.read_block(index) {
            Some(data) => {
                debug!(block = index, data = %hex::encode_upper(data), "Read block");
                Some(data)
            }
            None => {
                warn!("{}", TagError::BlockRead { block: index });
                None
            }
        })
        .collect()
}

/// Poll for a new tag and decode its identifier.
///
/// Fails with the authentication error when no new tag is ready; storage is
/// not touched in that case. A new tag with nothing on it gives `Ok("")`.
pub fn read_new_tag<R: TagReader>(
    reader: &mut R,
    session: &mut SessionTracker,
) -> TagResult<String> {
    session.authenticate(reader, AuthMode::Polling)?;

    let identifier = decode(&read_blocks(reader));
    info!(identifier = %identifier, "Read identifier");
    Ok(identifier)
}

/// Like [`read_new_tag`], with every failure folded into an empty string.
pub fn read_identifier<R: TagReader>(reader: &mut R, session: &mut SessionTracker) -> String {
    read_new_tag(reader, session).unwrap_or_default()
}

/// Wait for a tag and store `identifier` on it.
///
/// The identifier is checked before the reader is touched. Once authenticated,
/// every encoded block is written; a failed block is logged and skipped.
pub fn write_identifier<R: TagReader>(
    reader: &mut R,
    session: &mut SessionTracker,
    identifier: &str,
) -> TagResult<WriteSummary> {
    let blocks = encode(identifier)?;

    session.authenticate(reader, AuthMode::Blocking)?;
    debug!("Payload sector authenticated");

    let mut summary = WriteSummary::default();
    for (index, block) in payload_blocks().zip(&blocks) {
        if reader.write_block(index, block) {
            debug!(block = index, data = %hex::encode_upper(block), "Wrote block");
            summary.written.push(index);
        } else {
            warn!("{}", TagError::BlockWrite { block: index });
            summary.failed.push(index);
        }
    }

    info!(
        identifier,
        written = summary.written.len(),
        failed = summary.failed.len(),
        "Blocks written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const URI: &str = "spotify:track:6rqhFgbbKwnb9MLmUQDhG6";

    fn padded(text: &[u8]) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        block[..text.len()].copy_from_slice(text);
        block
    }

    fn read_back(blocks: &[Block]) -> String {
        let stored: Vec<Option<Block>> = blocks.iter().copied().map(Some).collect();
        decode(&stored)
    }

    #[test]
    fn encodes_spotify_uri_across_three_blocks() {
        let blocks = encode(URI).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(&blocks[0], b"spotify:track:6r");
        assert_eq!(&blocks[1], b"qhFgbbKwnb9MLmUQ");
        assert_eq!(blocks[2], padded(b"DhG6\n"));
        assert_eq!(read_back(&blocks), URI);
    }

    #[test]
    fn exact_block_length_pushes_terminator_into_next_block() {
        let blocks = encode("0123456789abcdef").unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(&blocks[0], b"0123456789abcdef");
        assert_eq!(blocks[1], padded(b"\n"));
        assert_eq!(read_back(&blocks), "0123456789abcdef");

        let two = "0123456789abcdef".repeat(2);
        let blocks = encode(&two).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2], padded(b"\n"));
        assert_eq!(read_back(&blocks), two);
    }

    #[test]
    fn short_and_empty_identifiers_use_one_block() {
        assert_eq!(encode("abc").unwrap(), vec![padded(b"abc\n")]);
        assert_eq!(encode("").unwrap(), vec![padded(b"\n")]);
        assert_eq!(read_back(&encode("").unwrap()), "");
    }

    #[test]
    fn longest_identifier_fills_all_blocks() {
        let id = "x".repeat(MAX_IDENTIFIER_LEN);
        let blocks = encode(&id).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2][BLOCK_SIZE - 1], TERMINATOR);
        assert_eq!(read_back(&blocks), id);
    }

    #[test]
    fn oversized_identifier_is_rejected() {
        let id = "x".repeat(48);
        assert_eq!(
            encode(&id),
            Err(TagError::PayloadTooLong { len: 48, max: 47 })
        );
    }

    #[test]
    fn reserved_characters_are_rejected() {
        assert_eq!(encode("a\nb"), Err(TagError::InvalidIdentifier('\n')));
        assert_eq!(encode("a\0b"), Err(TagError::InvalidIdentifier('\0')));
    }

    #[test]
    fn stale_blocks_after_terminator_are_ignored() {
        let mut blocks = encode("abc").unwrap();
        blocks.push(*b"stale-stale-stal");
        blocks.push(*b"more stale bytes");
        assert_eq!(read_back(&blocks), "abc");
    }

    #[test]
    fn unreadable_middle_block_is_skipped() {
        let blocks = encode(URI).unwrap();
        let stored = [Some(blocks[0]), None, Some(blocks[2])];
        assert_eq!(decode(&stored), "spotify:track:6rDhG6");
    }

    #[test]
    fn nothing_readable_decodes_to_empty() {
        assert_eq!(decode(&[None, None, None]), "");
        assert_eq!(decode(&[]), "");
    }

    #[test]
    fn unterminated_partial_block_drops_trailing_artifacts() {
        let mut damaged = padded(b"abc \r");
        damaged[5] = 0xC3;
        damaged[6] = b' ';
        // "abc \r\xC3 ": the space goes, then the high byte, then the final trim
        assert_eq!(decode(&[Some(damaged)]), "abc");

        let legacy = [Some(padded(b"spotify:album:")), Some(padded(b"xyz  "))];
        assert_eq!(decode(&legacy), "spotify:album:xyz");
    }

    #[test]
    fn lowest_high_byte_is_dropped() {
        let mut damaged = padded(b"abc");
        damaged[3] = 0x80;
        assert_eq!(decode(&[Some(damaged)]), "abc");
    }

    #[test]
    fn printable_byte_below_threshold_is_kept() {
        let kept = padded(b"abc~  ");
        assert_eq!(decode(&[Some(kept)]), "abc~");
    }

    #[test]
    fn high_byte_in_full_block_is_kept() {
        let mut full = *b"0123456789abcdef";
        full[BLOCK_SIZE - 1] = 0x80;
        let decoded = decode(&[Some(full), Some(padded(b"\n"))]);
        assert_eq!(decoded.len(), BLOCK_SIZE - 1 + '\u{FFFD}'.len_utf8());
        assert!(decoded.starts_with("0123456789abcde"));
    }

    #[test]
    fn spaces_at_block_boundary_survive() {
        let id = "0123456789abcde then more";
        assert_eq!(id.as_bytes()[BLOCK_SIZE - 1], b' ');
        assert_eq!(read_back(&encode(id).unwrap()), id);
    }

    proptest! {
        #[test]
        fn round_trips_printable_ascii(id in "[ -~]{0,47}") {
            let blocks = encode(&id).unwrap();
            prop_assert!(blocks.len() <= PAYLOAD_BLOCKS as usize);
            prop_assert_eq!(read_back(&blocks), id);
        }

        #[test]
        fn round_trips_multibyte_text(id in r"[^\n\x00]{0,11}") {
            let blocks = encode(&id).unwrap();
            prop_assert!(blocks.len() <= PAYLOAD_BLOCKS as usize);
            prop_assert_eq!(read_back(&blocks), id);
        }
    }
}
