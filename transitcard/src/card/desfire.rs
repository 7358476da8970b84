// transitcard-rs/transitcard/src/card/desfire.rs

//! MIFARE DESFire card model.

use crate::protocol::parser::{byte_at, be_uint_at, ensure_len, le_uint_at, slice_at};
use crate::constants::DESFIRE_MANUFACTURING_DATA_LEN;
use crate::types::DesfireAppId;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// One version block of the GetVersion response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesfireVersion {
    pub vendor_id: u8,
    pub kind: u8,
    pub sub_type: u8,
    pub major_version: u8,
    pub minor_version: u8,
    pub storage_size: u8,
    pub protocol: u8,
}

impl DesfireVersion {
    fn parse(data: &[u8]) -> Result<Self> {
        let b = slice_at(data, 0, 7)?;
        Ok(Self {
            vendor_id: b[0],
            kind: b[1],
            sub_type: b[2],
            major_version: b[3],
            minor_version: b[4],
            storage_size: b[5],
            protocol: b[6],
        })
    }
}

/// Manufacturing data (GetVersion).
///
/// `uid`, `batch_no`, `week_prod` and `year_prod` keep the field widths
/// observed on real cards. Their values are known to look odd (batch
/// numbers with the high bit set, week/year outside calendar ranges) and
/// are not interpreted further.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesfireManufacturingData {
    pub hardware: DesfireVersion,
    pub software: DesfireVersion,
    pub uid: u64,
    pub batch_no: u64,
    pub week_prod: i8,
    pub year_prod: i8,
    raw: Vec<u8>,
}

impl DesfireManufacturingData {
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure_len(data, DESFIRE_MANUFACTURING_DATA_LEN)?;
        Ok(Self {
            hardware: DesfireVersion::parse(&data[0..7])?,
            software: DesfireVersion::parse(&data[7..14])?,
            uid: be_uint_at(data, 14, 7)?,
            batch_no: be_uint_at(data, 21, 5)?,
            week_prod: byte_at(data, 26)? as i8,
            year_prod: byte_at(data, 27)? as i8,
            raw: data.to_vec(),
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// File types reported by GetFileSettings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DesfireFileType {
    Standard,
    Backup,
    Value,
    LinearRecord,
    CyclicRecord,
}

impl DesfireFileType {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Standard),
            0x01 => Some(Self::Backup),
            0x02 => Some(Self::Value),
            0x03 => Some(Self::LinearRecord),
            0x04 => Some(Self::CyclicRecord),
            _ => None,
        }
    }
}

/// Type-specific part of the file settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DesfireFileLayout {
    Data {
        size: u32,
    },
    Value {
        lower_limit: i32,
        upper_limit: i32,
        limited_credit_value: i32,
        limited_credit_enabled: bool,
    },
    Record {
        record_size: u32,
        max_records: u32,
        current_records: u32,
    },
}

/// Parsed GetFileSettings response. Multi-byte fields are little-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesfireFileSettings {
    pub file_type: DesfireFileType,
    pub comm_setting: u8,
    pub access_rights: [u8; 2],
    pub layout: DesfireFileLayout,
    raw: Vec<u8>,
}

impl DesfireFileSettings {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let type_byte = byte_at(data, 0)?;
        let file_type = DesfireFileType::from_u8(type_byte).ok_or_else(|| {
            Error::MalformedResponse(format!("unknown desfire file type {:#04x}", type_byte))
        })?;
        let comm_setting = byte_at(data, 1)?;
        let rights = slice_at(data, 2, 2)?;

        let layout = match file_type {
            DesfireFileType::Standard | DesfireFileType::Backup => DesfireFileLayout::Data {
                size: le_uint_at(data, 4, 3)? as u32,
            },
            DesfireFileType::Value => DesfireFileLayout::Value {
                lower_limit: le_uint_at(data, 4, 4)? as u32 as i32,
                upper_limit: le_uint_at(data, 8, 4)? as u32 as i32,
                limited_credit_value: le_uint_at(data, 12, 4)? as u32 as i32,
                limited_credit_enabled: byte_at(data, 16)? != 0,
            },
            DesfireFileType::LinearRecord | DesfireFileType::CyclicRecord => {
                DesfireFileLayout::Record {
                    record_size: le_uint_at(data, 4, 3)? as u32,
                    max_records: le_uint_at(data, 7, 3)? as u32,
                    current_records: le_uint_at(data, 10, 3)? as u32,
                }
            }
        };

        Ok(Self {
            file_type,
            comm_setting,
            access_rights: [rights[0], rights[1]],
            layout,
            raw: data.to_vec(),
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// One file of an application. Placeholders keep the reason a file could
/// not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DesfireFile {
    Standard {
        settings: Option<DesfireFileSettings>,
        data: Vec<u8>,
    },
    Value {
        settings: Option<DesfireFileSettings>,
        data: Vec<u8>,
    },
    Record {
        settings: Option<DesfireFileSettings>,
        data: Vec<u8>,
    },
    Unauthorized {
        settings: Option<DesfireFileSettings>,
        message: String,
    },
    Invalid {
        settings: Option<DesfireFileSettings>,
        message: String,
    },
}

impl DesfireFile {
    pub fn settings(&self) -> Option<&DesfireFileSettings> {
        match self {
            DesfireFile::Standard { settings, .. }
            | DesfireFile::Value { settings, .. }
            | DesfireFile::Record { settings, .. }
            | DesfireFile::Unauthorized { settings, .. }
            | DesfireFile::Invalid { settings, .. } => settings.as_ref(),
        }
    }

    /// File payload; `None` for placeholders.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            DesfireFile::Standard { data, .. }
            | DesfireFile::Value { data, .. }
            | DesfireFile::Record { data, .. } => Some(data),
            DesfireFile::Unauthorized { .. } | DesfireFile::Invalid { .. } => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DesfireFile::Unauthorized { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, DesfireFile::Invalid { .. })
    }

    /// Placeholder reason, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            DesfireFile::Unauthorized { message, .. } | DesfireFile::Invalid { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }
}

/// One authentication exchange performed while reading an application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesfireAuthLog {
    pub key_id: u8,
    pub challenge: Vec<u8>,
    pub response: Vec<u8>,
    pub confirm: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesfireApplication {
    id: DesfireAppId,
    files: BTreeMap<u8, DesfireFile>,
    auth_log: Vec<DesfireAuthLog>,
    dir_list_locked: bool,
}

impl DesfireApplication {
    pub fn new(
        id: DesfireAppId,
        files: BTreeMap<u8, DesfireFile>,
        auth_log: Vec<DesfireAuthLog>,
        dir_list_locked: bool,
    ) -> Self {
        Self {
            id,
            files,
            auth_log,
            dir_list_locked,
        }
    }

    pub fn id(&self) -> DesfireAppId {
        self.id
    }

    pub fn files(&self) -> &BTreeMap<u8, DesfireFile> {
        &self.files
    }

    pub fn file(&self, file_no: u8) -> Option<&DesfireFile> {
        self.files.get(&file_no)
    }

    pub fn auth_log(&self) -> &[DesfireAuthLog] {
        &self.auth_log
    }

    /// True if the file list was scanned rather than read from the card.
    pub fn dir_list_locked(&self) -> bool {
        self.dir_list_locked
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DesfireCard {
    manufacturing_data: DesfireManufacturingData,
    applications: Vec<DesfireApplication>,
    app_list_locked: bool,
}

impl DesfireCard {
    pub fn new(
        manufacturing_data: DesfireManufacturingData,
        applications: Vec<DesfireApplication>,
        app_list_locked: bool,
    ) -> Self {
        Self {
            manufacturing_data,
            applications,
            app_list_locked,
        }
    }

    pub fn manufacturing_data(&self) -> &DesfireManufacturingData {
        &self.manufacturing_data
    }

    pub fn applications(&self) -> &[DesfireApplication] {
        &self.applications
    }

    pub fn application(&self, id: DesfireAppId) -> Option<&DesfireApplication> {
        self.applications.iter().find(|a| a.id == id)
    }

    /// Shortcut for `application(id)?.file(file_no)`.
    pub fn file(&self, id: DesfireAppId, file_no: u8) -> Option<&DesfireFile> {
        self.application(id)?.file(file_no)
    }

    /// True if application ids were probed from a fixed list.
    pub fn app_list_locked(&self) -> bool {
        self.app_list_locked
    }
}
