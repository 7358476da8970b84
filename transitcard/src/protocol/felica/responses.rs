// transitcard-rs/transitcard/src/protocol/felica/responses.rs

//! FeliCa response decoders. Every decoder takes the response with the
//! length prefix already removed, so byte 0 is the response code.

use crate::constants::*;
use crate::protocol::parser;
use crate::types::{Idm, Pmm, SystemCode};
use crate::{Error, Result};

/// Polling result. Fields are absent when the card answered short.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollingResult {
    pub idm: Option<Idm>,
    pub pmm: Option<Pmm>,
    pub system_code: Option<SystemCode>,
}

/// Decode a Polling response: code(1) + IDm(8) + PMm(8) + system code(2).
pub fn decode_polling(data: &[u8]) -> PollingResult {
    PollingResult {
        idm: parser::idm_at(data, 1).ok(),
        pmm: parser::pmm_at(data, 9).ok(),
        system_code: parser::be_u16_at(data, 17).ok().map(SystemCode::new),
    }
}

/// Decode RequestSystemCode: code(1) + IDm(8) + count(1) + codes(2*n).
/// A count larger than the payload is truncated to what is present.
pub fn decode_request_system_code(data: &[u8]) -> Vec<SystemCode> {
    let Ok(count) = parser::byte_at(data, 9) else {
        log::warn!("too few bytes for system code list: {}", data.len());
        return Vec::new();
    };
    let mut count = count as usize;
    let available = (data.len() - 10) / 2;
    if count > available {
        log::warn!("system code list truncated: {} of {}", available, count);
        count = available;
    }
    (0..count)
        .map(|i| SystemCode::new(u16::from_be_bytes([data[10 + i * 2], data[11 + i * 2]])))
        .collect()
}

/// One step of service discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    Service(u16),
    /// Area code and end service code.
    Area(u16, u16),
    /// The card reported the `0xffff` terminator.
    End,
    /// Any other payload length stops discovery.
    Unexpected(usize),
}

/// Payload after the IDm of a SearchServiceCode response; empty if the card sent nothing.
pub fn search_payload(data: &[u8]) -> &[u8] {
    data.get(9..).unwrap_or(&[])
}

/// Classify a SearchServiceCode payload. Codes are little-endian.
pub fn classify_search(payload: &[u8]) -> SearchResult {
    match payload.len() {
        2 => {
            let code = u16::from_le_bytes([payload[0], payload[1]]);
            if code == FELICA_SERVICE_END {
                SearchResult::End
            } else {
                SearchResult::Service(code)
            }
        }
        4 => SearchResult::Area(
            u16::from_le_bytes([payload[0], payload[1]]),
            u16::from_le_bytes([payload[2], payload[3]]),
        ),
        n => SearchResult::Unexpected(n),
    }
}

/// ReadWithoutEncryption response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub status1: u8,
    pub status2: u8,
    /// Everything after the block count byte.
    pub data: Vec<u8>,
}

impl ReadResult {
    pub fn is_ok(&self) -> bool {
        self.status1 == 0
    }

    /// Split the payload into blocks, checking the declared count.
    pub fn blocks(&self, declared: usize) -> Result<Vec<&[u8]>> {
        let expected = declared * FELICA_BLOCK_LEN;
        if self.data.len() != expected {
            return Err(Error::InvalidLength {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(self.data.chunks(FELICA_BLOCK_LEN).collect())
    }
}

/// Decode ReadWithoutEncryption: code(1) + IDm(8) + status(2) + count(1) + blocks.
pub fn decode_read(data: &[u8]) -> Result<ReadResult> {
    let status1 = parser::byte_at(data, 9)?;
    let status2 = data.get(10).copied().unwrap_or(0);
    Ok(ReadResult {
        status1,
        status2,
        data: data.get(12..).map(<[u8]>::to_vec).unwrap_or_default(),
    })
}

/// Decode ResetMode: code(1) + IDm(8) + status(2).
pub fn decode_reset_mode(data: &[u8]) -> Result<()> {
    parser::ensure_len(data, 11)?;
    let (status1, status2) = (data[9], data[10]);
    if status1 != 0 {
        return Err(Error::FelicaStatus { status1, status2 });
    }
    Ok(())
}

/// Decoded FeliCa response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Polling(PollingResult),
    ReadWithoutEncryption(ReadResult),
    SearchServiceCode(SearchResult),
    RequestSystemCode(Vec<SystemCode>),
    ResetMode,
}

impl Response {
    /// Decode a response for the given command code after checking that
    /// byte 0 carries `command + 1`.
    pub fn decode(expected_cmd: u8, data: &[u8]) -> Result<Self> {
        parser::ensure_len(data, 1)?;
        parser::expect_code_at(data, 0, expected_cmd.wrapping_add(1))?;

        match expected_cmd {
            FELICA_CMD_POLLING => Ok(Self::Polling(decode_polling(data))),
            FELICA_CMD_READ_WO_ENCRYPTION => Ok(Self::ReadWithoutEncryption(decode_read(data)?)),
            FELICA_CMD_SEARCH_SERVICE_CODE => {
                Ok(Self::SearchServiceCode(classify_search(search_payload(data))))
            }
            FELICA_CMD_REQUEST_SYSTEM_CODE => {
                Ok(Self::RequestSystemCode(decode_request_system_code(data)))
            }
            FELICA_CMD_RESET_MODE => decode_reset_mode(data).map(|_| Self::ResetMode),
            _ => Err(Error::UnexpectedResponse {
                expected: expected_cmd.wrapping_add(1),
                actual: data[0],
            }),
        }
    }
}
