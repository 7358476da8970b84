// transitcard-rs/transitcard/src/protocol/cepas.rs

//! CEPAS purse commands over ISO7816 (`CLA 90`, `INS 32`).

use crate::constants::*;
use crate::protocol::iso7816::Iso7816Protocol;
use crate::Result;

pub struct CepasProtocol<'p, 'a> {
    iso: &'p mut Iso7816Protocol<'a>,
}

impl<'p, 'a> CepasProtocol<'p, 'a> {
    pub fn new(iso: &'p mut Iso7816Protocol<'a>) -> Self {
        Self { iso }
    }

    /// Raw purse record. `None` if the card has no such purse.
    pub fn get_purse(&mut self, purse_id: u8) -> Result<Option<Vec<u8>>> {
        match self
            .iso
            .send_request(CEPAS_CLASS, CEPAS_INS_READ_PURSE, purse_id, 0, 0, &[])
        {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::debug!("purse {} not readable: {}", purse_id, e);
                Ok(None)
            }
        }
    }

    /// Transaction log of a purse, read in two phases: the first answer
    /// tells how many records fit, the second asks for the records after
    /// those. A failed second phase keeps the first buffer.
    pub fn get_history(&mut self, purse_id: u8) -> Result<Option<Vec<u8>>> {
        let Some(mut history) = self.history_head(purse_id)? else {
            return Ok(None);
        };
        match self.history_tail(purse_id, &history) {
            Ok(rest) => history.extend_from_slice(&rest),
            Err(e) => log::warn!(
                "history {} second read failed, keeping {} record(s): {}",
                purse_id,
                history.len() / CEPAS_TRANSACTION_LEN,
                e
            ),
        }
        Ok(Some(history))
    }

    /// First history phase. `None` if the purse has no log.
    pub fn history_head(&mut self, purse_id: u8) -> Result<Option<Vec<u8>>> {
        match self
            .iso
            .send_request(CEPAS_CLASS, CEPAS_INS_READ_PURSE, purse_id, 0, 0, &[0x00])
        {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::debug!("history {} not readable: {}", purse_id, e);
                Ok(None)
            }
        }
    }

    /// Second history phase: the records following those in `head`.
    pub fn history_tail(&mut self, purse_id: u8, head: &[u8]) -> Result<Vec<u8>> {
        let records = (head.len() / CEPAS_TRANSACTION_LEN) as u8;
        self.iso.send_request(
            CEPAS_CLASS,
            CEPAS_INS_READ_PURSE,
            purse_id,
            records,
            0,
            &[records],
        )
    }
}
