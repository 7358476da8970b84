// transitcard-rs/transitcard/src/protocol/parser.rs

use crate::types::{Idm, Pmm};
use crate::{Error, Result};

/// Ensure the slice has at least `min` bytes.
pub fn ensure_len(data: &[u8], min: usize) -> Result<()> {
    if data.len() < min {
        return Err(Error::InvalidLength {
            expected: min,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Read a single byte at `idx` with bounds checking.
pub fn byte_at(data: &[u8], idx: usize) -> Result<u8> {
    ensure_len(data, idx + 1)?;
    Ok(data[idx])
}

/// Return a subslice with bounds checking.
pub fn slice_at(data: &[u8], idx: usize, len: usize) -> Result<&[u8]> {
    ensure_len(data, idx + len)?;
    Ok(&data[idx..idx + len])
}

/// Read a little-endian u16 at given index, with bounds checking.
pub fn le_u16_at(data: &[u8], idx: usize) -> Result<u16> {
    ensure_len(data, idx + 2)?;
    Ok(u16::from_le_bytes([data[idx], data[idx + 1]]))
}

/// Read a big-endian u16 at given index, with bounds checking.
pub fn be_u16_at(data: &[u8], idx: usize) -> Result<u16> {
    ensure_len(data, idx + 2)?;
    Ok(u16::from_be_bytes([data[idx], data[idx + 1]]))
}

/// Big-endian unsigned integer of `len` bytes (at most 8).
pub fn be_uint_at(data: &[u8], idx: usize, len: usize) -> Result<u64> {
    if len > 8 {
        return Err(Error::UnsupportedOperation(format!(
            "integer width {} exceeds 8 bytes",
            len
        )));
    }
    let s = slice_at(data, idx, len)?;
    Ok(s.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Little-endian unsigned integer of `len` bytes (at most 8).
pub fn le_uint_at(data: &[u8], idx: usize, len: usize) -> Result<u64> {
    if len > 8 {
        return Err(Error::UnsupportedOperation(format!(
            "integer width {} exceeds 8 bytes",
            len
        )));
    }
    let s = slice_at(data, idx, len)?;
    Ok(s.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Big-endian 24-bit two's complement value, sign-extended.
pub fn be_i24_at(data: &[u8], idx: usize) -> Result<i32> {
    let raw = be_uint_at(data, idx, 3)? as u32;
    Ok(((raw << 8) as i32) >> 8)
}

/// Parse an Idm (8 bytes) at `start` index with bounds checking.
pub fn idm_at(data: &[u8], start: usize) -> Result<Idm> {
    let s = slice_at(data, start, 8)?;
    Idm::try_from(s)
}

/// Parse a PMm (8 bytes) at `start` index with bounds checking.
pub fn pmm_at(data: &[u8], start: usize) -> Result<Pmm> {
    let s = slice_at(data, start, 8)?;
    Pmm::try_from(s)
}

/// Ensure the byte at `idx` equals `expected`. Returns UnexpectedResponse on mismatch.
pub fn expect_code_at(data: &[u8], idx: usize, expected: u8) -> Result<()> {
    let actual = byte_at(data, idx)?;
    if actual != expected {
        return Err(Error::UnexpectedResponse { expected, actual });
    }
    Ok(())
}
