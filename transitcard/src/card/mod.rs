// transitcard-rs/transitcard/src/card/mod.rs

//! Immutable card model returned by the readers.

use crate::types::{CardKind, TagId};
use std::time::SystemTime;

pub mod cepas;
pub mod classic;
pub mod desfire;
pub mod felica;
pub mod iso7816;

pub use cepas::{
    CepasCard, CepasHistory, CepasPurse, CepasPurseInfo, CepasTransaction, CepasTransactionType,
};
pub use classic::{ClassicBlock, ClassicBlockType, ClassicCard, ClassicSector};
pub use desfire::{
    DesfireApplication, DesfireAuthLog, DesfireCard, DesfireFile, DesfireFileSettings,
    DesfireManufacturingData,
};
pub use felica::{FelicaBlock, FelicaCard, FelicaService, FelicaSystem};
pub use iso7816::{Iso7816Application, Iso7816Card, Iso7816File, Selector, SelectorElement};

/// Tag UID and the time the scan started.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardIdentity {
    tag_id: TagId,
    scanned_at: SystemTime,
}

impl CardIdentity {
    pub fn new(tag_id: TagId, scanned_at: SystemTime) -> Self {
        Self { tag_id, scanned_at }
    }

    /// Identity stamped with the current time.
    pub fn now(tag_id: TagId) -> Self {
        Self::new(tag_id, SystemTime::now())
    }

    pub fn tag_id(&self) -> &TagId {
        &self.tag_id
    }

    pub fn scanned_at(&self) -> SystemTime {
        self.scanned_at
    }
}

/// Kind-specific content of a [`Card`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CardData {
    Classic(ClassicCard),
    Desfire(DesfireCard),
    Felica(FelicaCard),
    Cepas(CepasCard),
    Iso7816(Iso7816Card),
}

impl CardData {
    pub fn kind(&self) -> CardKind {
        match self {
            CardData::Classic(_) => CardKind::MifareClassic,
            CardData::Desfire(_) => CardKind::MifareDesfire,
            CardData::Felica(_) => CardKind::Felica,
            CardData::Cepas(_) => CardKind::Cepas,
            CardData::Iso7816(_) => CardKind::Iso7816,
        }
    }
}

/// A scanned card.
///
/// `partial_read` is set when the scan stopped early because the card was
/// removed. Whatever was read before that point is still present.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Card {
    identity: CardIdentity,
    partial_read: bool,
    data: CardData,
}

impl Card {
    pub fn new(identity: CardIdentity, partial_read: bool, data: CardData) -> Self {
        Self {
            identity,
            partial_read,
            data,
        }
    }

    pub fn identity(&self) -> &CardIdentity {
        &self.identity
    }

    pub fn tag_id(&self) -> &TagId {
        self.identity.tag_id()
    }

    pub fn is_partial_read(&self) -> bool {
        self.partial_read
    }

    pub fn kind(&self) -> CardKind {
        self.data.kind()
    }

    pub fn data(&self) -> &CardData {
        &self.data
    }

    pub fn into_data(self) -> CardData {
        self.data
    }

    pub fn as_classic(&self) -> Option<&ClassicCard> {
        match &self.data {
            CardData::Classic(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_desfire(&self) -> Option<&DesfireCard> {
        match &self.data {
            CardData::Desfire(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_felica(&self) -> Option<&FelicaCard> {
        match &self.data {
            CardData::Felica(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cepas(&self) -> Option<&CepasCard> {
        match &self.data {
            CardData::Cepas(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_iso7816(&self) -> Option<&Iso7816Card> {
        match &self.data {
            CardData::Iso7816(c) => Some(c),
            _ => None,
        }
    }
}
