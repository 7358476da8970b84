// transitcard-rs/transitcard/src/transport/traits.rs

use crate::constants::CLASSIC_SMALL_SECTOR_COUNT;
use crate::types::{ClassicKey, KeyType, TagId};
use crate::Result;

/// A connection to one physical card for the duration of a session.
pub trait Connection {
    /// Open the connection. Must precede any request.
    fn connect(&mut self) -> Result<()>;

    /// Release the connection. Called exactly once per session.
    fn close(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// UID reported by the radio layer.
    fn tag_id(&self) -> TagId;
}

/// Half-duplex request/response byte channel (ISO14443-4, FeliCa).
///
/// Implementations report card removal as [`crate::Error::TagLost`] so the
/// acquisition loops can tell it apart from other I/O failures.
pub trait Transport: Connection {
    fn transceive(&mut self, data: &[u8]) -> Result<Vec<u8>>;
}

/// MIFARE Classic sector/block access as exposed by a reader driver.
pub trait ClassicTech: Connection {
    fn sector_count(&self) -> usize;

    /// 4 blocks per sector below sector 32, 16 above (MIFARE Classic 4K).
    fn block_count_in_sector(&self, sector: usize) -> usize {
        if sector < CLASSIC_SMALL_SECTOR_COUNT {
            4
        } else {
            16
        }
    }

    /// Absolute index of the first block of `sector`.
    fn sector_to_block(&self, sector: usize) -> usize {
        if sector < CLASSIC_SMALL_SECTOR_COUNT {
            sector * 4
        } else {
            CLASSIC_SMALL_SECTOR_COUNT * 4 + (sector - CLASSIC_SMALL_SECTOR_COUNT) * 16
        }
    }

    /// Returns `Ok(false)` when the card rejects the key.
    fn authenticate(&mut self, sector: usize, key: &ClassicKey, key_type: KeyType)
        -> Result<bool>;

    /// Raw block read. Some readers return a single NAK byte instead of an
    /// error when the block is not readable with the current key.
    fn read_block(&mut self, block: usize) -> Result<Vec<u8>>;
}
