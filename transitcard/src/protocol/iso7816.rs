// transitcard-rs/transitcard/src/protocol/iso7816.rs

//! ISO7816-4 command/response APDUs.

use crate::card::iso7816::{Selector, SelectorElement};
use crate::constants::{
    CLASS_ISO7816, INS_READ_BINARY, INS_READ_RECORD, INS_SELECT_FILE, MAX_RECORD_NUMBER,
};
use crate::protocol::status::{self, CardStatus};
use crate::transport::Transport;
use crate::utils::bytes_to_hex;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Command APDU builder. `Le` is always emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    pub le: u8,
}

impl Apdu {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: 0,
        }
    }

    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    pub fn le(mut self, le: u8) -> Self {
        self.le = le;
        self
    }

    /// `CLA INS P1 P2 [Lc data] Le`
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.data.len() > 0xff {
            return Err(Error::UnsupportedOperation(format!(
                "short APDU data too long: {}",
                self.data.len()
            )));
        }
        let mut buf = Vec::with_capacity(6 + self.data.len());
        buf.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        if !self.data.is_empty() {
            buf.push(self.data.len() as u8);
            buf.extend_from_slice(&self.data);
        }
        buf.push(self.le);
        Ok(buf)
    }
}

/// Response APDU split into payload and status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
}

impl ApduResponse {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        match raw.len() {
            0 => Err(Error::InvalidLength {
                expected: 2,
                actual: 0,
            }),
            // Seen from some emulated tags
            1 => Err(Error::MalformedResponse(format!(
                "single byte response {:02x}",
                raw[0]
            ))),
            n => Ok(Self {
                data: raw[..n - 2].to_vec(),
                sw1: raw[n - 2],
                sw2: raw[n - 1],
            }),
        }
    }

    pub fn status(&self) -> CardStatus {
        status::iso7816_status(self.sw1, self.sw2)
    }

    pub fn status_word(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// Payload on success, typed status error otherwise.
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self.status() {
            CardStatus::Ok => Ok(self.data),
            status => Err(Error::Iso7816Status {
                sw1: self.sw1,
                sw2: self.sw2,
                status,
            }),
        }
    }
}

/// Records of one file, read from number 1 upward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordRun {
    pub records: BTreeMap<u8, Vec<u8>>,
    /// The card answered RecordNotFound, i.e. the file was walked to its end.
    pub reached_eof: bool,
}

/// ISO7816-4 protocol over a borrowed transport.
pub struct Iso7816Protocol<'a> {
    transport: &'a mut dyn Transport,
}

impl<'a> Iso7816Protocol<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self { transport }
    }

    /// Send one APDU and return its payload. A `6C xx` answer is retried
    /// once with `Le = xx` unless `xx` is the Le already sent.
    pub fn send(&mut self, apdu: &Apdu) -> Result<Vec<u8>> {
        let resp = self.exchange(apdu)?;
        if resp.status() == CardStatus::WrongLength && resp.sw2 != apdu.le {
            log::debug!("wrong length, retrying with Le={:#04x}", resp.sw2);
            let retry = apdu.clone().le(resp.sw2);
            return self.exchange(&retry)?.into_result();
        }
        resp.into_result()
    }

    fn exchange(&mut self, apdu: &Apdu) -> Result<ApduResponse> {
        let req = apdu.encode()?;
        log::trace!(">>> {}", bytes_to_hex(&req));
        let raw = self.transport.transceive(&req)?;
        log::trace!("<<< {}", bytes_to_hex(&raw));
        ApduResponse::parse(&raw)
    }

    /// Raw command in an arbitrary class. Used by layers built on top of ISO7816.
    pub fn send_request(
        &mut self,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        le: u8,
        params: &[u8],
    ) -> Result<Vec<u8>> {
        self.send(&Apdu::new(cla, ins, p1, p2).data(params).le(le))
    }

    /// SELECT by DF name. Returns the FCI.
    pub fn select_by_name(&mut self, name: &[u8], next_occurrence: bool) -> Result<Vec<u8>> {
        let p2 = if next_occurrence { 0x02 } else { 0x00 };
        self.send_request(CLASS_ISO7816, INS_SELECT_FILE, 0x04, p2, 0, name)
    }

    /// Like [`Self::select_by_name`], but a refused selection is `None`.
    /// Tag loss and transport failures still propagate.
    pub fn select_by_name_or_none(&mut self, name: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.select_by_name(name, false) {
            Ok(fci) => Ok(Some(fci)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::debug!("select {} failed: {}", bytes_to_hex(name), e);
                Ok(None)
            }
        }
    }

    /// SELECT by 2-byte file identifier. Returns the FCI.
    pub fn select_by_id(&mut self, id: u16) -> Result<Vec<u8>> {
        self.send_request(CLASS_ISO7816, INS_SELECT_FILE, 0x00, 0x00, 0, &id.to_be_bytes())
    }

    /// Return to the MF. Best effort: failures are logged and ignored.
    pub fn unselect_file(&mut self) {
        if let Err(e) = self.send_request(CLASS_ISO7816, INS_SELECT_FILE, 0x00, 0x00, 0, &[]) {
            log::debug!("unselect failed, ignoring: {}", e);
        }
    }

    /// Walk a selector path, returning the FCI of the last element.
    pub fn select_path(&mut self, selector: &Selector) -> Result<Option<Vec<u8>>> {
        let mut fci = None;
        for element in selector.path() {
            fci = Some(match element {
                SelectorElement::ById(id) => self.select_by_id(*id)?,
                SelectorElement::ByName(name) => self.select_by_name(name, false)?,
            });
        }
        Ok(fci)
    }

    /// READ BINARY of the current EF, or of a short file identifier.
    pub fn read_binary(&mut self, sfi: Option<u8>) -> Result<Vec<u8>> {
        let p1 = match sfi {
            Some(sfi) => 0x80 | (sfi & 0x1f),
            None => 0x00,
        };
        self.send_request(CLASS_ISO7816, INS_READ_BINARY, p1, 0x00, 0, &[])
    }

    /// READ RECORD `number` of the current EF, or of a short file identifier.
    pub fn read_record(&mut self, sfi: Option<u8>, number: u8, length: u8) -> Result<Vec<u8>> {
        let p2 = match sfi {
            Some(sfi) => ((sfi & 0x1f) << 3) | 0x04,
            None => 0x04,
        };
        self.send_request(CLASS_ISO7816, INS_READ_RECORD, number, p2, length, &[])
    }

    /// Read records 1..=255 until the card reports the end of the file.
    /// Other non-fatal errors also end the walk without reaching EOF.
    pub fn read_all_records(&mut self, sfi: Option<u8>, length: u8) -> Result<RecordRun> {
        let mut run = RecordRun::default();
        for number in 1..=MAX_RECORD_NUMBER {
            match self.read_record(sfi, number, length) {
                Ok(data) => {
                    run.records.insert(number, data);
                }
                Err(e) if e.is_not_found() => {
                    run.reached_eof = true;
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::debug!("record {} unreadable, stopping: {}", number, e);
                    break;
                }
            }
        }
        Ok(run)
    }
}
