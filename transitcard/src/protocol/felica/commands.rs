// transitcard-rs/transitcard/src/protocol/felica/commands.rs

use crate::constants::*;
use crate::types::{Idm, ServiceCode, SystemCode};
use crate::{Error, Result};

/// Encode Polling payload. System code goes big-endian on the wire.
pub fn encode_polling(system_code: SystemCode, request_code: u8, time_slot: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5);
    buf.push(FELICA_CMD_POLLING);
    buf.extend_from_slice(&system_code.to_be_bytes());
    buf.push(request_code);
    buf.push(time_slot);
    buf
}

/// Block list element: 2 bytes for addresses up to 0xff, else 3 bytes.
pub fn encode_block_element(block: u16) -> Vec<u8> {
    if block > 0xff {
        let [lo, hi] = block.to_le_bytes();
        vec![0x00, lo, hi]
    } else {
        vec![0x80, block as u8]
    }
}

/// Encode ReadWithoutEncryption payload for one service.
pub fn encode_read(idm: Idm, service: ServiceCode, blocks: &[u16]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + blocks.len() * 3);
    buf.push(FELICA_CMD_READ_WO_ENCRYPTION);
    buf.extend_from_slice(idm.as_bytes());
    buf.push(0x01); // service count
    buf.extend_from_slice(&service.to_le_bytes());
    buf.push(blocks.len() as u8);
    for block in blocks {
        buf.extend_from_slice(&encode_block_element(*block));
    }
    buf
}

/// Encode SearchServiceCode payload. The index is little-endian.
pub fn encode_search_service_code(idm: Idm, index: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(11);
    buf.push(FELICA_CMD_SEARCH_SERVICE_CODE);
    buf.extend_from_slice(idm.as_bytes());
    buf.extend_from_slice(&index.to_le_bytes());
    buf
}

pub fn encode_request_system_code(idm: Idm) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    buf.push(FELICA_CMD_REQUEST_SYSTEM_CODE);
    buf.extend_from_slice(idm.as_bytes());
    buf
}

/// Encode ResetMode payload with its reserved `00 00` parameter.
pub fn encode_reset_mode(idm: Idm) -> Vec<u8> {
    let mut buf = Vec::with_capacity(11);
    buf.push(FELICA_CMD_RESET_MODE);
    buf.extend_from_slice(idm.as_bytes());
    buf.extend_from_slice(&[0x00, 0x00]);
    buf
}

/// FeliCa commands issued by this crate. Per-command encoders live
/// alongside; [`Command::to_frame`] adds the length prefix.
#[derive(Debug, Clone)]
pub enum Command {
    Polling {
        system_code: SystemCode,
        request_code: u8,
        time_slot: u8,
    },
    ReadWithoutEncryption {
        idm: Idm,
        service: ServiceCode,
        blocks: Vec<u16>,
    },
    SearchServiceCode {
        idm: Idm,
        index: u16,
    },
    RequestSystemCode {
        idm: Idm,
    },
    ResetMode {
        idm: Idm,
    },
}

impl Command {
    /// Polling that asks the card to report its system code.
    pub fn polling(system_code: SystemCode) -> Self {
        Self::Polling {
            system_code,
            request_code: FELICA_REQUEST_SYSTEM_CODE,
            time_slot: FELICA_TIME_SLOTS,
        }
    }

    pub fn command_code(&self) -> u8 {
        match self {
            Self::Polling { .. } => FELICA_CMD_POLLING,
            Self::ReadWithoutEncryption { .. } => FELICA_CMD_READ_WO_ENCRYPTION,
            Self::SearchServiceCode { .. } => FELICA_CMD_SEARCH_SERVICE_CODE,
            Self::RequestSystemCode { .. } => FELICA_CMD_REQUEST_SYSTEM_CODE,
            Self::ResetMode { .. } => FELICA_CMD_RESET_MODE,
        }
    }

    /// Command code followed by parameters, without the length byte.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Polling {
                system_code,
                request_code,
                time_slot,
            } => encode_polling(*system_code, *request_code, *time_slot),
            Self::ReadWithoutEncryption {
                idm,
                service,
                blocks,
            } => encode_read(*idm, *service, &blocks[..]),
            Self::SearchServiceCode { idm, index } => encode_search_service_code(*idm, *index),
            Self::RequestSystemCode { idm } => encode_request_system_code(*idm),
            Self::ResetMode { idm } => encode_reset_mode(*idm),
        }
    }

    /// Length-prefixed frame ready for the transport.
    pub fn to_frame(&self) -> Result<Vec<u8>> {
        let code = self.command_code();
        if code & 0x01 != 0 {
            return Err(Error::UnsupportedOperation(format!(
                "felica command code {:#04x} is odd",
                code
            )));
        }
        if let Self::ReadWithoutEncryption { blocks, .. } = self {
            if blocks.len() > FELICA_MAX_READ_BLOCKS {
                return Err(Error::UnsupportedOperation(format!(
                    "can only read {} blocks at a time, got {}",
                    FELICA_MAX_READ_BLOCKS,
                    blocks.len()
                )));
            }
        }
        let payload = self.encode();
        let len = payload.len() + 1;
        if len > 0xff {
            return Err(Error::InvalidLength {
                expected: 0xff,
                actual: len,
            });
        }
        let mut frame = Vec::with_capacity(len);
        frame.push(len as u8);
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}
