// transitcard-rs/transitcard/src/reader/mod.rs

//! Acquisition routines, one per card kind.
//!
//! Each routine opens a [`Session`](crate::transport::Session) on the
//! transport it is given, so the connection is closed again on every exit
//! path. Tag loss after the card has been identified yields a card with
//! `partial_read` set instead of an error.

pub mod cepas;
pub mod classic;
pub mod config;
pub mod desfire;
pub mod felica;
pub mod iso7816;

pub use cepas::read_cepas;
pub use classic::read_classic;
pub use config::{Iso7816AppProbe, ReaderConfig, ReaderConfigBuilder};
pub use desfire::{read_desfire, DesfireUnlocker};
pub use felica::read_felica;
pub use iso7816::read_iso7816;

use crate::card::Card;
use crate::keys::KeyRetriever;
use crate::progress::ProgressSink;
use crate::transport::{ClassicTech, Transport};
use crate::{Error, Result};

/// A [`ReaderConfig`] bundled with the acquisition routines.
#[derive(Debug, Clone, Default)]
pub struct CardReader {
    config: ReaderConfig,
}

impl CardReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn read_classic(
        &self,
        tech: &mut dyn ClassicTech,
        keys: &dyn KeyRetriever,
        progress: &mut dyn ProgressSink,
    ) -> Result<Card> {
        read_classic(tech, keys, &self.config, progress)
    }

    pub fn read_felica(
        &self,
        transport: &mut dyn Transport,
        progress: &mut dyn ProgressSink,
    ) -> Result<Card> {
        read_felica(transport, &self.config, progress)
    }

    /// ISO14443-4 card: try DESFire, then CEPAS, then the configured
    /// ISO7816 applications.
    pub fn read_iso_dep(
        &self,
        transport: &mut dyn Transport,
        unlocker: Option<&mut dyn DesfireUnlocker>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Card> {
        if let Some(card) = read_desfire(transport, unlocker, &self.config, progress)? {
            return Ok(card);
        }
        if let Some(card) = read_cepas(transport, &self.config, progress)? {
            return Ok(card);
        }
        if let Some(card) = read_iso7816(transport, &self.config, progress)? {
            return Ok(card);
        }
        Err(Error::UnsupportedOperation(
            "card answered none of DESFire, CEPAS or the configured ISO7816 applications".into(),
        ))
    }
}
