// transitcard-rs/transitcard/src/card/cepas.rs

//! CEPAS purses and transaction logs.

use crate::card::iso7816::{Iso7816File, Selector};
use crate::constants::{CEPAS_EPOCH_UNIX, CEPAS_PURSE_HEADER_LEN, CEPAS_TRANSACTION_LEN};
use crate::protocol::parser::{be_i24_at, be_uint_at, byte_at, ensure_len, slice_at};
use crate::Result;
use std::collections::BTreeMap;

const SECONDS_PER_DAY: i64 = 86_400;

/// Days since the CEPAS epoch to Unix seconds.
pub fn cepas_days_to_unix(days: u16) -> i64 {
    CEPAS_EPOCH_UNIX + days as i64 * SECONDS_PER_DAY
}

/// Seconds since the CEPAS epoch to Unix seconds.
pub fn cepas_seconds_to_unix(seconds: u32) -> i64 {
    CEPAS_EPOCH_UNIX + seconds as i64
}

/// Transaction categories by type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CepasTransactionType {
    Mrt,
    TopUp,
    Bus,
    BusRefund,
    Creation,
    Service,
    Retail,
    Unknown,
}

impl CepasTransactionType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            48 => Self::Mrt,
            117 | 3 => Self::TopUp,
            49 => Self::Bus,
            118 => Self::BusRefund,
            0xf0 | 5 => Self::Creation,
            4 => Self::Service,
            1 => Self::Retail,
            _ => Self::Unknown,
        }
    }
}

/// One 16-byte transaction record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CepasTransaction {
    pub type_byte: u8,
    /// Signed amount in cents.
    pub amount: i32,
    /// Unix seconds.
    pub timestamp: i64,
    pub user_data: [u8; 8],
}

impl CepasTransaction {
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure_len(data, CEPAS_TRANSACTION_LEN)?;
        let mut user_data = [0u8; 8];
        user_data.copy_from_slice(slice_at(data, 8, 8)?);
        Ok(Self {
            type_byte: data[0],
            amount: be_i24_at(data, 1)?,
            timestamp: cepas_seconds_to_unix(be_uint_at(data, 4, 4)? as u32),
            user_data,
        })
    }

    pub fn transaction_type(&self) -> CepasTransactionType {
        CepasTransactionType::from_byte(self.type_byte)
    }

    /// User data up to the first NUL, lossy UTF-8.
    pub fn user_data_text(&self) -> String {
        let end = self.user_data.iter().position(|b| *b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.user_data[..end]).into_owned()
    }
}

/// Decoded purse: a 62-byte header followed by issuer data of declared
/// length. Some cards append a debit options byte after the issuer data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CepasPurseInfo {
    pub cepas_version: u8,
    pub purse_status: u8,
    pub purse_balance: i32,
    pub auto_load_amount: i32,
    pub can: [u8; 8],
    pub csn: [u8; 8],
    /// Unix seconds.
    pub purse_expiry_date: i64,
    /// Unix seconds.
    pub purse_creation_date: i64,
    pub last_credit_transaction_trp: u32,
    pub last_credit_transaction_header: [u8; 8],
    pub logfile_record_count: u8,
    pub last_transaction_trp: u32,
    pub last_transaction_record: CepasTransaction,
    pub issuer_specific_data: Vec<u8>,
    pub last_transaction_debit_options: Option<u8>,
}

impl CepasPurseInfo {
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure_len(data, CEPAS_PURSE_HEADER_LEN)?;
        let issuer_len = byte_at(data, 41)? as usize;
        let issuer_end = CEPAS_PURSE_HEADER_LEN + issuer_len;
        ensure_len(data, issuer_end)?;

        let mut can = [0u8; 8];
        can.copy_from_slice(slice_at(data, 8, 8)?);
        let mut csn = [0u8; 8];
        csn.copy_from_slice(slice_at(data, 16, 8)?);
        let mut credit_header = [0u8; 8];
        credit_header.copy_from_slice(slice_at(data, 32, 8)?);

        Ok(Self {
            cepas_version: data[0],
            purse_status: data[1],
            purse_balance: be_i24_at(data, 2)?,
            auto_load_amount: be_i24_at(data, 5)?,
            can,
            csn,
            purse_expiry_date: cepas_days_to_unix(be_uint_at(data, 24, 2)? as u16),
            purse_creation_date: cepas_days_to_unix(be_uint_at(data, 26, 2)? as u16),
            last_credit_transaction_trp: be_uint_at(data, 28, 4)? as u32,
            last_credit_transaction_header: credit_header,
            logfile_record_count: data[40],
            last_transaction_trp: be_uint_at(data, 42, 4)? as u32,
            last_transaction_record: CepasTransaction::parse(slice_at(data, 46, 16)?)?,
            issuer_specific_data: data[CEPAS_PURSE_HEADER_LEN..issuer_end].to_vec(),
            last_transaction_debit_options: data.get(issuer_end).copied(),
        })
    }
}

/// Purse record as read from the card. The raw bytes are always kept;
/// `info` is `None` when they do not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CepasPurse {
    raw: Vec<u8>,
    info: Option<CepasPurseInfo>,
}

impl CepasPurse {
    pub fn from_raw(raw: Vec<u8>) -> Self {
        let info = match CepasPurseInfo::parse(&raw) {
            Ok(info) => Some(info),
            Err(e) => {
                log::warn!("purse of {} bytes does not decode: {}", raw.len(), e);
                None
            }
        };
        Self { raw, info }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn info(&self) -> Option<&CepasPurseInfo> {
        self.info.as_ref()
    }
}

/// Transaction log in card order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CepasHistory {
    transactions: Vec<CepasTransaction>,
    raw: Vec<u8>,
}

impl CepasHistory {
    /// Split into 16-byte records; a trailing partial record is ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let transactions = data
            .chunks_exact(CEPAS_TRANSACTION_LEN)
            .map(CepasTransaction::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            transactions,
            raw: data.to_vec(),
        })
    }

    pub fn transactions(&self) -> &[CepasTransaction] {
        &self.transactions
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CepasCard {
    purses: BTreeMap<u8, CepasPurse>,
    histories: BTreeMap<u8, CepasHistory>,
    files: BTreeMap<Selector, Iso7816File>,
}

impl CepasCard {
    pub fn new(
        purses: BTreeMap<u8, CepasPurse>,
        histories: BTreeMap<u8, CepasHistory>,
        files: BTreeMap<Selector, Iso7816File>,
    ) -> Self {
        Self {
            purses,
            histories,
            files,
        }
    }

    pub fn purses(&self) -> &BTreeMap<u8, CepasPurse> {
        &self.purses
    }

    pub fn purse(&self, id: u8) -> Option<&CepasPurse> {
        self.purses.get(&id)
    }

    pub fn history(&self, id: u8) -> Option<&CepasHistory> {
        self.histories.get(&id)
    }

    pub fn histories(&self) -> &BTreeMap<u8, CepasHistory> {
        &self.histories
    }

    pub fn files(&self) -> &BTreeMap<Selector, Iso7816File> {
        &self.files
    }

    pub fn file(&self, selector: &Selector) -> Option<&Iso7816File> {
        self.files.get(selector)
    }
}
