// transitcard-rs/transitcard/src/error.rs

use crate::protocol::status::CardStatus;
use thiserror::Error;

/// Errors raised by protocol layers and readers.
#[derive(Error, Debug)]
pub enum Error {
    /// The card left the field. Terminal for the current scan.
    #[error("tag lost")]
    TagLost,

    #[error("transport not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("operation timed out")]
    Timeout,

    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unexpected response code: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedResponse { expected: u8, actual: u8 },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("iso7816 error: sw=({sw1:#04x}, {sw2:#04x}) {status}")]
    Iso7816Status {
        sw1: u8,
        sw2: u8,
        status: CardStatus,
    },

    #[error("desfire error: status={code:#04x} {status}")]
    DesfireStatus { code: u8, status: CardStatus },

    #[error("felica error: status=({status1:#04x}, {status2:#04x})")]
    FelicaStatus { status1: u8, status2: u8 },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error taxonomy used by the acquisition loops to decide between
/// aborting, recording a placeholder, or ending an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// Transport I/O failed; aborts the current card-type attempt.
    CommunicationFailure,
    /// The card was removed; the scan ends with a partial result.
    CardRemoved,
    /// Unexpected status or response shape; recorded as an `Invalid` placeholder.
    ProtocolViolation,
    /// Authentication or permission refused; recorded as `Unauthorized`.
    AccessDenied,
    /// File or record absent; normal end of iteration.
    NotFound,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TagLost => ErrorKind::CardRemoved,
            Error::NotConnected | Error::Transport(_) | Error::Timeout => {
                ErrorKind::CommunicationFailure
            }
            Error::Iso7816Status { status, .. } | Error::DesfireStatus { status, .. } => {
                status.kind().unwrap_or(ErrorKind::ProtocolViolation)
            }
            Error::InvalidLength { .. }
            | Error::UnexpectedResponse { .. }
            | Error::MalformedResponse(_)
            | Error::FelicaStatus { .. }
            | Error::UnsupportedOperation(_) => ErrorKind::ProtocolViolation,
        }
    }

    pub fn is_tag_lost(&self) -> bool {
        self.kind() == ErrorKind::CardRemoved
    }

    pub fn is_access_denied(&self) -> bool {
        self.kind() == ErrorKind::AccessDenied
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Errors that end the whole acquisition rather than the current unit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::CardRemoved | ErrorKind::CommunicationFailure
        )
    }
}
