use crate::classic::{Block, CardType, Uid};
use crate::keys::{KeyType, SectorKey};

/// Low level operations of a PN532 style reader.
///
/// Timeouts are in the reader's own units; `0` waits until a target shows up.
/// Failures are reported the way the hardware reports them, as `None`/`false`;
/// mapping them onto [`TagError`](crate::TagError) is the session's job.
pub trait TagReader {
    fn begin(&mut self);
    /// Packed `IC | version | revision | support` word, `0` when no chip answered.
    fn firmware_version(&mut self) -> u32;
    fn read_passive_target(&mut self, card: CardType, timeout: u16) -> Option<Uid>;
    fn authenticate_block(
        &mut self,
        uid: &Uid,
        block: u8,
        key_type: KeyType,
        key: &SectorKey,
    ) -> bool;
    fn read_block(&mut self, block: u8) -> Option<Block>;
    fn write_block(&mut self, block: u8, data: &Block) -> bool;
}

impl<R: TagReader + ?Sized> TagReader for &mut R {
    fn begin(&mut self) {
        (**self).begin()
    }

    fn firmware_version(&mut self) -> u32 {
        (**self).firmware_version()
    }

    fn read_passive_target(&mut self, card: CardType, timeout: u16) -> Option<Uid> {
        (**self).read_passive_target(card, timeout)
    }

    fn authenticate_block(
        &mut self,
        uid: &Uid,
        block: u8,
        key_type: KeyType,
        key: &SectorKey,
    ) -> bool {
        (**self).authenticate_block(uid, block, key_type, key)
    }

    fn read_block(&mut self, block: u8) -> Option<Block> {
        (**self).read_block(block)
    }

    fn write_block(&mut self, block: u8, data: &Block) -> bool {
        (**self).write_block(block, data)
    }
}
