// transitcard-rs/transitcard/src/card/classic.rs

//! MIFARE Classic sectors and blocks.

use crate::constants::{BLOCK_ALL_FF, BLOCK_ALL_ZERO, BLOCK_VALUE_ZERO, CLASSIC_BLOCK_LEN};
use crate::types::ClassicSectorKey;
use crate::{Error, Result};

/// Block role, derived from its position and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassicBlockType {
    Manufacturer,
    Trailer,
    Value,
    Data,
    /// Synthetic: the reader answered short for this block.
    Unauthorized,
}

/// True if `data` has the value block layout: value, inverted value, value,
/// then address, inverted address, address, inverted address.
pub fn is_value_block(data: &[u8]) -> bool {
    if data.len() != CLASSIC_BLOCK_LEN {
        return false;
    }
    let value_ok = (0..4).all(|i| data[i] == !data[i + 4] && data[i] == data[i + 8]);
    let addr_ok = data[12] == !data[13] && data[12] == data[14] && data[13] == data[15];
    value_ok && addr_ok
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassicBlock {
    index: usize,
    block_type: ClassicBlockType,
    data: Vec<u8>,
}

impl ClassicBlock {
    /// Classify a block read at `index` within `sector` (of `block_count` blocks).
    pub fn new(sector: usize, index: usize, block_count: usize, data: Vec<u8>) -> Self {
        let block_type = if data.len() < CLASSIC_BLOCK_LEN {
            ClassicBlockType::Unauthorized
        } else if sector == 0 && index == 0 {
            ClassicBlockType::Manufacturer
        } else if index + 1 == block_count {
            ClassicBlockType::Trailer
        } else if is_value_block(&data) {
            ClassicBlockType::Value
        } else {
            ClassicBlockType::Data
        };
        Self {
            index,
            block_type,
            data,
        }
    }

    /// Index within the sector.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn block_type(&self) -> ClassicBlockType {
        self.block_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_unauthorized(&self) -> bool {
        self.block_type == ClassicBlockType::Unauthorized
    }

    /// Compares against the blank patterns only, never the block type.
    pub fn is_empty(&self) -> bool {
        self.data[..] == BLOCK_ALL_ZERO[..]
            || self.data[..] == BLOCK_ALL_FF[..]
            || self.data[..] == BLOCK_VALUE_ZERO[..]
    }
}

/// Outcome of reading one sector.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassicSector {
    Authenticated {
        index: usize,
        blocks: Vec<ClassicBlock>,
        key: ClassicSectorKey,
    },
    Unauthorized {
        index: usize,
    },
    Invalid {
        index: usize,
        error: String,
    },
}

impl ClassicSector {
    pub fn index(&self) -> usize {
        match self {
            ClassicSector::Authenticated { index, .. }
            | ClassicSector::Unauthorized { index }
            | ClassicSector::Invalid { index, .. } => *index,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, ClassicSector::Authenticated { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClassicSector::Unauthorized { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ClassicSector::Invalid { .. })
    }

    fn not_readable(&self) -> Error {
        let state = match self {
            ClassicSector::Authenticated { .. } => "authenticated",
            ClassicSector::Unauthorized { .. } => "unauthorized",
            ClassicSector::Invalid { .. } => "invalid",
        };
        Error::UnsupportedOperation(format!("sector {} is {}", self.index(), state))
    }

    pub fn blocks(&self) -> Result<&[ClassicBlock]> {
        match self {
            ClassicSector::Authenticated { blocks, .. } => Ok(blocks),
            _ => Err(self.not_readable()),
        }
    }

    pub fn block(&self, index: usize) -> Result<&ClassicBlock> {
        self.blocks()?.get(index).ok_or_else(|| {
            Error::UnsupportedOperation(format!("sector {} has no block {}", self.index(), index))
        })
    }

    /// Concatenated data of `count` blocks starting at `start`.
    pub fn read_blocks(&self, start: usize, count: usize) -> Result<Vec<u8>> {
        let blocks = self.blocks()?;
        let range = start
            .checked_add(count)
            .and_then(|end| blocks.get(start..end))
            .ok_or(Error::InvalidLength {
                expected: start.saturating_add(count),
                actual: blocks.len(),
            })?;
        Ok(range.iter().flat_map(|b| b.data().iter().copied()).collect())
    }

    pub fn key(&self) -> Result<&ClassicSectorKey> {
        match self {
            ClassicSector::Authenticated { key, .. } => Ok(key),
            _ => Err(self.not_readable()),
        }
    }

    /// True if every block except the manufacturer block and the trailer
    /// holds a blank pattern. Unreadable sectors count as empty.
    pub fn is_empty(&self) -> bool {
        let ClassicSector::Authenticated { index, blocks, .. } = self else {
            return true;
        };
        let last = blocks.len().saturating_sub(1);
        blocks
            .iter()
            .filter(|b| !(*index == 0 && b.index() == 0) && b.index() != last)
            .all(ClassicBlock::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassicCard {
    sectors: Vec<ClassicSector>,
}

impl ClassicCard {
    pub fn new(sectors: Vec<ClassicSector>) -> Self {
        Self { sectors }
    }

    pub fn sectors(&self) -> &[ClassicSector] {
        &self.sectors
    }

    pub fn sector(&self, index: usize) -> Option<&ClassicSector> {
        self.sectors.iter().find(|s| s.index() == index)
    }

    pub fn first_authenticated_sector(&self) -> Option<&ClassicSector> {
        self.sectors.iter().find(|s| s.is_authenticated())
    }
}
