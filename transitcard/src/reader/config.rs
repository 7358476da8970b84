// transitcard-rs/transitcard/src/reader/config.rs

//! Bounds and probe lists for the acquisition routines.

use crate::card::iso7816::Selector;
use crate::constants::*;
use crate::types::{ClassicKey, DesfireAppId, ServiceCode, SystemCode};
use std::ops::Range;

/// One ISO7816 application to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iso7816AppProbe {
    /// DF name (AID).
    pub name: Vec<u8>,
    /// Files to dump, relative to the selected application.
    pub files: Vec<Selector>,
    /// Also walk SFIs 1..=31.
    pub scan_sfi: bool,
    /// Le for READ RECORD; 0 means "whatever the card has".
    pub record_length: u8,
}

impl Iso7816AppProbe {
    pub fn new(name: &[u8]) -> Self {
        Self {
            name: name.to_vec(),
            files: Vec::new(),
            scan_sfi: false,
            record_length: 0,
        }
    }

    pub fn file(mut self, selector: Selector) -> Self {
        self.files.push(selector);
        self
    }

    pub fn scan_sfi(mut self, scan: bool) -> Self {
        self.scan_sfi = scan;
        self
    }

    pub fn record_length(mut self, length: u8) -> Self {
        self.record_length = length;
        self
    }
}

/// Reader settings. Every retry loop is bounded by a field here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReaderConfig {
    /// Retries of the declared-key tier per sector.
    pub classic_retry_limit: usize,
    /// Re-authenticate and re-read attempts after a short block read.
    pub classic_reauth_attempts: usize,
    /// Last-resort keys, tried as A then B.
    pub well_known_keys: Vec<ClassicKey>,
    /// Application ids probed when the application directory is locked.
    pub desfire_hidden_app_ids: Vec<DesfireAppId>,
    /// File ids probed when an application's file list is locked.
    pub desfire_file_scan_range: Range<u8>,
    pub felica_poll_attempts: usize,
    /// (system, service) pairs polled when the card lists no systems.
    pub felica_magic_systems: Vec<(SystemCode, ServiceCode)>,
    pub cepas_purse_count: u8,
    /// File ids dumped under `3F00/4000`.
    pub cepas_file_scan: Range<u16>,
    pub iso7816_applications: Vec<Iso7816AppProbe>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            classic_retry_limit: 5,
            classic_reauth_attempts: 3,
            well_known_keys: WELL_KNOWN_KEYS.to_vec(),
            desfire_hidden_app_ids: Vec::new(),
            desfire_file_scan_range: 0..0x20,
            felica_poll_attempts: 3,
            felica_magic_systems: vec![
                (SystemCode::new(SYSTEMCODE_OCTOPUS), ServiceCode::new(SERVICE_OCTOPUS)),
                (SystemCode::new(SYSTEMCODE_SZT), ServiceCode::new(SERVICE_SZT)),
            ],
            cepas_purse_count: CEPAS_PURSE_COUNT,
            cepas_file_scan: 0..0x20,
            iso7816_applications: Vec::new(),
        }
    }
}

impl ReaderConfig {
    pub fn builder() -> ReaderConfigBuilder {
        ReaderConfigBuilder::new()
    }
}

/// Builder for [`ReaderConfig`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct ReaderConfigBuilder {
    config: ReaderConfig,
}

impl ReaderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classic_retry_limit(mut self, n: usize) -> Self {
        self.config.classic_retry_limit = n;
        self
    }

    pub fn classic_reauth_attempts(mut self, n: usize) -> Self {
        self.config.classic_reauth_attempts = n;
        self
    }

    /// Replace the well-known key list.
    pub fn well_known_keys(mut self, keys: Vec<ClassicKey>) -> Self {
        self.config.well_known_keys = keys;
        self
    }

    pub fn desfire_hidden_app(mut self, id: DesfireAppId) -> Self {
        self.config.desfire_hidden_app_ids.push(id);
        self
    }

    pub fn desfire_file_scan_range(mut self, range: Range<u8>) -> Self {
        self.config.desfire_file_scan_range = range;
        self
    }

    pub fn felica_poll_attempts(mut self, n: usize) -> Self {
        self.config.felica_poll_attempts = n;
        self
    }

    pub fn felica_magic_systems(mut self, systems: Vec<(SystemCode, ServiceCode)>) -> Self {
        self.config.felica_magic_systems = systems;
        self
    }

    pub fn cepas_purse_count(mut self, n: u8) -> Self {
        self.config.cepas_purse_count = n;
        self
    }

    pub fn cepas_file_scan(mut self, range: Range<u16>) -> Self {
        self.config.cepas_file_scan = range;
        self
    }

    pub fn iso7816_application(mut self, probe: Iso7816AppProbe) -> Self {
        self.config.iso7816_applications.push(probe);
        self
    }

    /// Zero retry or poll counts are rejected.
    pub fn build(self) -> crate::Result<ReaderConfig> {
        if self.config.classic_retry_limit == 0 {
            return Err(crate::Error::UnsupportedOperation(
                "classic_retry_limit must be at least 1".into(),
            ));
        }
        if self.config.felica_poll_attempts == 0 {
            return Err(crate::Error::UnsupportedOperation(
                "felica_poll_attempts must be at least 1".into(),
            ));
        }
        Ok(self.config)
    }
}
