// transitcard-rs/transitcard/src/protocol/felica/mod.rs

//! FeliCa framing and polling-based addressing.

pub mod commands;
pub mod responses;

pub use commands::Command;
pub use responses::{PollingResult, ReadResult, Response, SearchResult};

use crate::constants::*;
use crate::transport::Transport;
use crate::types::{Idm, Pmm, ServiceCode, SystemCode};
use crate::utils::bytes_to_hex;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// True if both IDm address the same card, ignoring the system number nibble.
pub fn idm_matches(a: &Idm, b: &Idm) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a[1..] == b[1..] && (a[0] & 0x0f) == (b[0] & 0x0f)
}

/// System number carried in the upper nibble of an IDm.
pub fn system_number(idm: &Idm) -> u8 {
    idm.as_bytes()[0] >> 4
}

pub struct FelicaProtocol<'a> {
    transport: &'a mut dyn Transport,
    idm: Option<Idm>,
    pmm: Option<Pmm>,
}

impl<'a> FelicaProtocol<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self {
            transport,
            idm: None,
            pmm: None,
        }
    }

    /// IDm from the last polling, if the card answered in full.
    pub fn idm(&self) -> Option<Idm> {
        self.idm
    }

    pub fn pmm(&self) -> Option<Pmm> {
        self.pmm
    }

    /// Send a command and return the response without its length byte.
    /// An empty reply is passed through as an empty buffer.
    pub fn send_command(&mut self, command: &Command) -> Result<Vec<u8>> {
        let frame = command.to_frame()?;
        log::trace!(">>> {}", bytes_to_hex(&frame));
        let resp = self.transport.transceive(&frame)?;
        log::trace!("<<< {}", bytes_to_hex(&resp));

        if resp.is_empty() {
            return Ok(resp);
        }
        let expected = command.command_code() + 1;
        match resp.get(1) {
            Some(&actual) if actual == expected => Ok(resp[1..].to_vec()),
            Some(&actual) => Err(Error::UnexpectedResponse { expected, actual }),
            None => Err(Error::InvalidLength {
                expected: 2,
                actual: resp.len(),
            }),
        }
    }

    /// Poll for `system_code`, caching the IDm and PMm. A short or empty
    /// answer clears them instead of failing.
    pub fn polling(&mut self, system_code: SystemCode) -> Result<Option<Idm>> {
        let res = self.send_command(&Command::polling(system_code))?;
        let PollingResult { idm, pmm, .. } = responses::decode_polling(&res);
        self.idm = idm;
        self.pmm = pmm;
        Ok(idm)
    }

    /// Poll until the card answering `system_code` is the one addressed by
    /// `idm`. Returns the system number. Exhausting `max_tries` reports the
    /// card as lost.
    pub fn poll_for_system_code(
        &mut self,
        system_code: SystemCode,
        idm: &Idm,
        max_tries: usize,
    ) -> Result<u8> {
        if max_tries < 1 {
            return Err(Error::UnsupportedOperation(
                "max_tries must be at least 1".into(),
            ));
        }
        for attempt in 1..=max_tries {
            match self.polling(system_code)? {
                Some(found) if idm_matches(idm, &found) => {
                    let n = system_number(&found);
                    log::debug!("card {} has system {} at {}", idm.to_hex(), system_code, n);
                    return Ok(n);
                }
                Some(found) => log::debug!(
                    "card {} answered system {} instead of {} (attempt {})",
                    found.to_hex(),
                    system_code,
                    idm.to_hex(),
                    attempt
                ),
                None => log::debug!("no answer to system {} (attempt {})", system_code, attempt),
            }
        }
        log::warn!(
            "card {} did not answer system {} after {} attempt(s)",
            idm.to_hex(),
            system_code,
            max_tries
        );
        Err(Error::TagLost)
    }

    /// System codes of the card, in system number order.
    pub fn request_system_codes(&mut self, idm: Idm) -> Result<Vec<SystemCode>> {
        let res = self.send_command(&Command::RequestSystemCode { idm })?;
        Ok(responses::decode_request_system_code(&res))
    }

    /// Raw SearchServiceCode payload for the 1-origin `index`.
    pub fn search_service_code(&mut self, idm: Idm, index: u16) -> Result<Vec<u8>> {
        let res = self.send_command(&Command::SearchServiceCode { idm, index })?;
        Ok(responses::search_payload(&res).to_vec())
    }

    /// Iterate service codes of the system addressed by `idm`.
    pub fn service_codes(&mut self, idm: Idm) -> ServiceCodes<'_, 'a> {
        ServiceCodes {
            protocol: self,
            idm,
            next_index: Some(1),
        }
    }

    /// Read one block. `None` if the card reports a status error.
    pub fn read_without_encryption(
        &mut self,
        idm: Idm,
        service: ServiceCode,
        block: u16,
    ) -> Result<Option<Vec<u8>>> {
        let res = self.send_command(&Command::ReadWithoutEncryption {
            idm,
            service,
            blocks: vec![block],
        })?;
        let read = responses::decode_read(&res)?;
        if !read.is_ok() {
            log::debug!(
                "read {}/{} status {:02x}{:02x}",
                service,
                block,
                read.status1,
                read.status2
            );
            return Ok(None);
        }
        Ok(Some(read.data))
    }

    /// Read up to 15 blocks in one request, keyed by block number.
    pub fn read_blocks(
        &mut self,
        idm: Idm,
        service: ServiceCode,
        blocks: &[u16],
    ) -> Result<Option<BTreeMap<u16, Vec<u8>>>> {
        if blocks.len() > FELICA_MAX_READ_BLOCKS {
            return Err(Error::UnsupportedOperation(format!(
                "can only read {} blocks at a time, got {}",
                FELICA_MAX_READ_BLOCKS,
                blocks.len()
            )));
        }
        if blocks.is_empty() {
            return Ok(Some(BTreeMap::new()));
        }

        let res = self.send_command(&Command::ReadWithoutEncryption {
            idm,
            service,
            blocks: blocks.to_vec(),
        })?;
        let read = responses::decode_read(&res)?;
        if !read.is_ok() {
            log::warn!(
                "error reading from card: {:02x}{:02x}",
                read.status1,
                read.status2
            );
            return Ok(None);
        }
        match read.blocks(blocks.len()) {
            Ok(chunks) => Ok(Some(
                blocks
                    .iter()
                    .copied()
                    .zip(chunks.into_iter().map(<[u8]>::to_vec))
                    .collect(),
            )),
            Err(e) => {
                log::warn!("bad block read response: {}", e);
                Ok(None)
            }
        }
    }

    pub fn reset_mode(&mut self, idm: Idm) -> Result<()> {
        let res = self.send_command(&Command::ResetMode { idm })?;
        responses::decode_reset_mode(&res)
    }
}

/// Service discovery over indices `1..=0xffff`. Stops at the `0xffff`
/// terminator or any payload that is neither 2 nor 4 bytes. Area entries
/// are skipped.
pub struct ServiceCodes<'p, 'a> {
    protocol: &'p mut FelicaProtocol<'a>,
    idm: Idm,
    next_index: Option<u16>,
}

impl Iterator for ServiceCodes<'_, '_> {
    type Item = Result<ServiceCode>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(index) = self.next_index {
            self.next_index = index.checked_add(1);
            let payload = match self.protocol.search_service_code(self.idm, index) {
                Ok(p) => p,
                Err(e) => {
                    self.next_index = None;
                    return Some(Err(e));
                }
            };
            match responses::classify_search(&payload) {
                SearchResult::Service(code) => return Some(Ok(ServiceCode::new(code))),
                SearchResult::Area(..) => continue,
                SearchResult::End | SearchResult::Unexpected(_) => {
                    self.next_index = None;
                }
            }
        }
        None
    }
}
