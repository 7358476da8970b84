// transitcard-rs/transitcard/src/card/felica.rs

//! FeliCa systems, services and blocks.

use crate::types::{Idm, Pmm, ServiceCode, SystemCode};

/// 16-byte block as read from a service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FelicaBlock {
    address: u16,
    data: Vec<u8>,
}

impl FelicaBlock {
    pub fn new(address: u16, data: Vec<u8>) -> Self {
        Self { address, data }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A service holding at least one block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FelicaService {
    code: ServiceCode,
    blocks: Vec<FelicaBlock>,
}

impl FelicaService {
    pub fn new(code: ServiceCode, blocks: Vec<FelicaBlock>) -> Self {
        Self { code, blocks }
    }

    pub fn code(&self) -> ServiceCode {
        self.code
    }

    pub fn blocks(&self) -> &[FelicaBlock] {
        &self.blocks
    }

    pub fn block(&self, address: u16) -> Option<&FelicaBlock> {
        self.blocks.iter().find(|b| b.address == address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FelicaSystem {
    code: SystemCode,
    services: Vec<FelicaService>,
}

impl FelicaSystem {
    pub fn new(code: SystemCode, services: Vec<FelicaService>) -> Self {
        Self { code, services }
    }

    pub fn code(&self) -> SystemCode {
        self.code
    }

    pub fn services(&self) -> &[FelicaService] {
        &self.services
    }

    pub fn service(&self, code: ServiceCode) -> Option<&FelicaService> {
        self.services.iter().find(|s| s.code == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FelicaCard {
    idm: Idm,
    pmm: Option<Pmm>,
    systems: Vec<FelicaSystem>,
}

impl FelicaCard {
    pub fn new(idm: Idm, pmm: Option<Pmm>, systems: Vec<FelicaSystem>) -> Self {
        Self { idm, pmm, systems }
    }

    pub fn idm(&self) -> &Idm {
        &self.idm
    }

    pub fn pmm(&self) -> Option<&Pmm> {
        self.pmm.as_ref()
    }

    pub fn systems(&self) -> &[FelicaSystem] {
        &self.systems
    }

    pub fn system(&self, code: SystemCode) -> Option<&FelicaSystem> {
        self.systems.iter().find(|s| s.code == code)
    }

    /// Shortcut for `system(system)?.service(service)`.
    pub fn service(&self, system: SystemCode, service: ServiceCode) -> Option<&FelicaService> {
        self.system(system)?.service(service)
    }
}
