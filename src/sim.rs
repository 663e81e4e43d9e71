//! In-memory reader and tag, for tests and for running the poll loop without hardware.

use std::collections::HashSet;

use crate::classic::{Block, CardType, Uid, BLOCK_SIZE};
use crate::keys::{KeyType, SectorKey, DEFAULT_KEY};
use crate::reader::TagReader;

/// PN532, firmware 1.6
pub const SIMULATED_FIRMWARE: u32 = 0x3201_0607;

const BLOCKS_1K: usize = 64;
const BLOCKS_PER_SECTOR: u8 = 4;

#[derive(Clone, Debug)]
pub struct SimulatedTag {
    pub uid: Uid,
    pub key_a: SectorKey,
    pub key_b: SectorKey,
    blocks: Vec<Block>,
}

impl SimulatedTag {
    /// A blank 1K card with factory keys.
    pub fn classic(uid: [u8; 4]) -> Self {
        Self::with_uid(Uid::new(uid.to_vec()))
    }

    pub fn with_uid(uid: Uid) -> Self {
        Self {
            uid,
            key_a: DEFAULT_KEY,
            key_b: DEFAULT_KEY,
            blocks: vec![[0u8; BLOCK_SIZE]; BLOCKS_1K],
        }
    }

    /// Contents of `index`, or `None` past the end of the card.
    pub fn get_block(&self, index: u8) -> Option<Block> {
        self.blocks.get(index as usize).copied()
    }

    /// Contents of `index`; blocks past the end of the card read as zeros.
    pub fn block(&self, index: u8) -> Block {
        self.get_block(index).unwrap_or([0u8; BLOCK_SIZE])
    }

    /// Store `data` at `index`. Returns false past the end of the card.
    pub fn set_block(&mut self, index: u8, data: Block) -> bool {
        match self.blocks.get_mut(index as usize) {
            Some(block) => {
                *block = data;
                true
            }
            None => false,
        }
    }

    fn key(&self, key_type: KeyType) -> &SectorKey {
        match key_type {
            KeyType::A => &self.key_a,
            KeyType::B => &self.key_b,
        }
    }
}

#[derive(Debug, Default)]
pub struct SimulatedReader {
    firmware: u32,
    started: bool,
    tag: Option<SimulatedTag>,
    authenticated_sector: Option<u8>,
    failing_reads: HashSet<u8>,
    failing_writes: HashSet<u8>,
    timeouts: Vec<u16>,
    writes: Vec<(u8, Block)>,
}

impl SimulatedReader {
    pub fn new() -> Self {
        Self {
            firmware: SIMULATED_FIRMWARE,
            ..Default::default()
        }
    }

    /// A reader whose chip never answers the firmware query.
    pub fn without_chip() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn present(&mut self, tag: SimulatedTag) {
        self.tag = Some(tag);
        self.authenticated_sector = None;
    }

    pub fn remove(&mut self) -> Option<SimulatedTag> {
        self.authenticated_sector = None;
        self.tag.take()
    }

    pub fn tag(&self) -> Option<&SimulatedTag> {
        self.tag.as_ref()
    }

    pub fn tag_mut(&mut self) -> Option<&mut SimulatedTag> {
        self.tag.as_mut()
    }

    pub fn fail_read(&mut self, block: u8) {
        self.failing_reads.insert(block);
    }

    pub fn fail_write(&mut self, block: u8) {
        self.failing_writes.insert(block);
    }

    /// Timeouts passed to every target poll, oldest first.
    pub fn timeouts(&self) -> &[u16] {
        &self.timeouts
    }

    /// Every successful block write, oldest first.
    pub fn writes(&self) -> &[(u8, Block)] {
        &self.writes
    }

    fn can_access(&self, block: u8) -> bool {
        self.tag.is_some() && self.authenticated_sector == Some(block / BLOCKS_PER_SECTOR)
    }
}

impl TagReader for SimulatedReader {
    fn begin(&mut self) {
        self.started = true;
    }

    fn firmware_version(&mut self) -> u32 {
        self.firmware
    }

    // No tag never blocks here: a blocking poll on an empty field just returns None.
    fn read_passive_target(&mut self, _card: CardType, timeout: u16) -> Option<Uid> {
        self.timeouts.push(timeout);
        self.tag.as_ref().map(|tag| tag.uid.clone())
    }

    fn authenticate_block(
        &mut self,
        uid: &Uid,
        block: u8,
        key_type: KeyType,
        key: &SectorKey,
    ) -> bool {
        let accepted = match &self.tag {
            Some(tag) if tag.get_block(block).is_none() => false,
            Some(tag) => &tag.uid == uid && tag.key(key_type) == key,
            None => false,
        };
        self.authenticated_sector = accepted.then_some(block / BLOCKS_PER_SECTOR);
        accepted
    }

    fn read_block(&mut self, block: u8) -> Option<Block> {
        if !self.can_access(block) || self.failing_reads.contains(&block) {
            return None;
        }
        self.tag.as_ref().and_then(|tag| tag.get_block(block))
    }

    fn write_block(&mut self, block: u8, data: &Block) -> bool {
        if !self.can_access(block) || self.failing_writes.contains(&block) {
            return false;
        }
        let stored = self
            .tag
            .as_mut()
            .is_some_and(|tag| tag.set_block(block, *data));
        if stored {
            self.writes.push((block, *data));
        }
        stored
    }
}
