use binrw::BinRead;
use std::fmt;
use std::io::Cursor;
use tracing::{error, info};

use crate::error::{TagError, TagResult};
use crate::reader::TagReader;

/// Firmware word reported by the reader, most significant byte first.
#[derive(BinRead, Clone, Copy, Debug, PartialEq, Eq)]
#[br(big)]
pub struct FirmwareVersion {
    pub ic: u8,
    pub version: u8,
    pub revision: u8,
    pub support: u8,
}

impl FirmwareVersion {
    pub fn from_word(word: u32) -> TagResult<Self> {
        if word == 0 {
            return Err(TagError::ReaderNotFound);
        }
        let bytes = word.to_be_bytes();
        let mut cursor = Cursor::new(&bytes[..]);
        FirmwareVersion::read(&mut cursor).map_err(|e| TagError::Firmware(e.to_string()))
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PN5{:X} firmware {}.{}", self.ic, self.version, self.revision)
    }
}

/// Start the reader and make sure a chip answers. A missing reader is fatal.
pub fn probe<R: TagReader>(reader: &mut R) -> TagResult<FirmwareVersion> {
    reader.begin();

    let word = reader.firmware_version();
    let firmware = FirmwareVersion::from_word(word).map_err(|e| {
        error!("{e}");
        e
    })?;

    info!(
        "Found chip PN5{:X}, firmware ver. {}.{}",
        firmware.ic, firmware.version, firmware.revision
    );
    Ok(firmware)
}
