// transitcard-rs/transitcard/src/protocol/status.rs

//! Table-driven mapping from card status bytes to typed outcomes.
//!
//! ISO7816 status words and DESFire status bytes both go through a static
//! table so the classification can be tested without any hardware.

use crate::error::ErrorKind;
use derive_more::Display;

/// Meaning of a status word or status byte returned by a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CardStatus {
    #[display(fmt = "ok")]
    Ok,
    #[display(fmt = "additional frame")]
    AdditionalFrame,
    #[display(fmt = "no current EF")]
    NoCurrentEf,
    #[display(fmt = "security status not satisfied")]
    SecurityStatusNotSatisfied,
    #[display(fmt = "file not found")]
    FileNotFound,
    #[display(fmt = "record not found")]
    RecordNotFound,
    #[display(fmt = "wrong length")]
    WrongLength,
    #[display(fmt = "instruction not supported")]
    InstructionNotSupported,
    #[display(fmt = "class not supported")]
    ClassNotSupported,
    #[display(fmt = "permission denied")]
    PermissionDenied,
    #[display(fmt = "authentication error")]
    AuthenticationError,
    #[display(fmt = "application not found")]
    ApplicationNotFound,
    #[display(fmt = "unknown status")]
    Unknown,
}

impl CardStatus {
    /// Error kind for a failing status, `None` for success and continuation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CardStatus::Ok | CardStatus::AdditionalFrame => None,
            CardStatus::FileNotFound
            | CardStatus::RecordNotFound
            | CardStatus::ApplicationNotFound => Some(ErrorKind::NotFound),
            CardStatus::SecurityStatusNotSatisfied
            | CardStatus::PermissionDenied
            | CardStatus::AuthenticationError => Some(ErrorKind::AccessDenied),
            CardStatus::NoCurrentEf
            | CardStatus::WrongLength
            | CardStatus::InstructionNotSupported
            | CardStatus::ClassNotSupported
            | CardStatus::Unknown => Some(ErrorKind::ProtocolViolation),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CardStatus::Ok)
    }
}

/// One row of the ISO7816 table. `sw2 == None` matches any second byte.
#[derive(Debug, Clone, Copy)]
pub struct StatusEntry {
    pub sw1: u8,
    pub sw2: Option<u8>,
    pub status: CardStatus,
}

const fn row(sw1: u8, sw2: Option<u8>, status: CardStatus) -> StatusEntry {
    StatusEntry { sw1, sw2, status }
}

/// Rows are matched in order; exact `(sw1, sw2)` rows precede wildcards.
pub const ISO7816_STATUS_TABLE: &[StatusEntry] = &[
    row(0x90, None, CardStatus::Ok),
    row(0x69, Some(0x86), CardStatus::NoCurrentEf),
    row(0x69, Some(0x82), CardStatus::SecurityStatusNotSatisfied),
    row(0x6A, Some(0x82), CardStatus::FileNotFound),
    row(0x6A, Some(0x83), CardStatus::RecordNotFound),
    row(0x6C, None, CardStatus::WrongLength),
    row(0x6D, None, CardStatus::InstructionNotSupported),
    row(0x6E, None, CardStatus::ClassNotSupported),
];

/// DESFire native status byte (second byte after the `0x91` marker).
pub const DESFIRE_STATUS_TABLE: &[(u8, CardStatus)] = &[
    (0x00, CardStatus::Ok),
    (0xAF, CardStatus::AdditionalFrame),
    (0x9D, CardStatus::PermissionDenied),
    (0xAE, CardStatus::AuthenticationError),
    (0xA0, CardStatus::ApplicationNotFound),
    (0xF0, CardStatus::FileNotFound),
];

/// Classify an ISO7816 status word.
pub fn iso7816_status(sw1: u8, sw2: u8) -> CardStatus {
    ISO7816_STATUS_TABLE
        .iter()
        .find(|e| e.sw1 == sw1 && e.sw2.map_or(true, |s| s == sw2))
        .map(|e| e.status)
        .unwrap_or(CardStatus::Unknown)
}

/// Classify a DESFire status byte.
pub fn desfire_status(code: u8) -> CardStatus {
    DESFIRE_STATUS_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
        .unwrap_or(CardStatus::Unknown)
}
