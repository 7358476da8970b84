// transitcard-rs/transitcard/src/protocol/desfire.rs

//! MIFARE DESFire native commands wrapped in ISO7816-style envelopes.
//!
//! Requests are `90 CMD 00 00 [Lc data] 00`; responses end with `91 SS`
//! where `SS` is the DESFire status byte. Status `AF` means more data
//! follows and is fetched with a bare GET_ADDITIONAL_FRAME.

use crate::card::desfire::DesfireManufacturingData;
use crate::constants::*;
use crate::protocol::status::{self, CardStatus};
use crate::transport::Transport;
use crate::types::DesfireAppId;
use crate::utils::bytes_to_hex;
use crate::{Error, Result};

/// Wrap a native command in the ISO7816 envelope.
pub fn wrap_message(command: u8, params: &[u8]) -> Result<Vec<u8>> {
    if params.len() > 0xff {
        return Err(Error::UnsupportedOperation(format!(
            "desfire parameters too long: {}",
            params.len()
        )));
    }
    let mut buf = Vec::with_capacity(6 + params.len());
    buf.extend_from_slice(&[CLASS_90, command, 0x00, 0x00]);
    if !params.is_empty() {
        buf.push(params.len() as u8);
        buf.extend_from_slice(params);
    }
    buf.push(0x00);
    Ok(buf)
}

/// Split a wrapped response into payload and status byte.
pub fn split_response(resp: &[u8]) -> Result<(&[u8], u8)> {
    let n = resp.len();
    if n < 2 || resp[n - 2] != DESFIRE_STATUS_MARKER {
        return Err(Error::MalformedResponse(format!(
            "not a desfire response: {}",
            bytes_to_hex(resp)
        )));
    }
    Ok((&resp[..n - 2], resp[n - 1]))
}

pub struct DesfireProtocol<'a> {
    transport: &'a mut dyn Transport,
}

impl<'a> DesfireProtocol<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self { transport }
    }

    fn transceive(&mut self, command: u8, params: &[u8]) -> Result<Vec<u8>> {
        let req = wrap_message(command, params)?;
        log::trace!(">>> {}", bytes_to_hex(&req));
        let resp = self.transport.transceive(&req)?;
        log::trace!("<<< {}", bytes_to_hex(&resp));
        Ok(resp)
    }

    /// Send a command. With `auto_continue`, additional frames are fetched
    /// and concatenated until the card reports OK.
    pub fn send_request(
        &mut self,
        command: u8,
        params: &[u8],
        auto_continue: bool,
    ) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut resp = self.transceive(command, params)?;

        loop {
            let (payload, code) = split_response(&resp)?;
            output.extend_from_slice(payload);

            match status::desfire_status(code) {
                CardStatus::Ok => break,
                CardStatus::AdditionalFrame => {
                    if !auto_continue {
                        break;
                    }
                    resp = self.transceive(DESFIRE_GET_ADDITIONAL_FRAME, &[])?;
                }
                status => return Err(Error::DesfireStatus { code, status }),
            }
        }

        Ok(output)
    }

    pub fn manufacturing_data(&mut self) -> Result<DesfireManufacturingData> {
        let raw = self.send_request(DESFIRE_GET_MANUFACTURING_DATA, &[], true)?;
        DesfireManufacturingData::parse(&raw)
    }

    /// Application ids in card byte order.
    pub fn app_list(&mut self) -> Result<Vec<DesfireAppId>> {
        let buf = self.send_request(DESFIRE_GET_APPLICATION_DIRECTORY, &[], true)?;
        Ok(buf
            .chunks_exact(3)
            .map(|c| DesfireAppId::from_bytes([c[0], c[1], c[2]]))
            .collect())
    }

    pub fn select_app(&mut self, app_id: DesfireAppId) -> Result<()> {
        self.send_request(DESFIRE_SELECT_APPLICATION, &app_id.to_bytes(), true)?;
        Ok(())
    }

    pub fn file_list(&mut self) -> Result<Vec<u8>> {
        self.send_request(DESFIRE_GET_FILES, &[], true)
    }

    pub fn file_settings(&mut self, file_no: u8) -> Result<Vec<u8>> {
        self.send_request(DESFIRE_GET_FILE_SETTINGS, &[file_no], true)
    }

    /// Whole standard/backup data file (offset 0, length 0).
    pub fn read_file(&mut self, file_no: u8) -> Result<Vec<u8>> {
        self.send_request(DESFIRE_READ_DATA, &[file_no, 0, 0, 0, 0, 0, 0], true)
    }

    /// All records of a linear or cyclic record file.
    pub fn read_record(&mut self, file_no: u8) -> Result<Vec<u8>> {
        self.send_request(DESFIRE_READ_RECORD, &[file_no, 0, 0, 0, 0, 0, 0], true)
    }

    pub fn get_value(&mut self, file_no: u8) -> Result<Vec<u8>> {
        self.send_request(DESFIRE_GET_VALUE, &[file_no], true)
    }

    /// First leg of an authentication exchange. Returns the card challenge.
    pub fn send_unlock(&mut self, key_no: u8) -> Result<Vec<u8>> {
        self.send_request(DESFIRE_UNLOCK, &[key_no], false)
    }

    /// Continue an exchange left pending by [`Self::send_unlock`].
    pub fn send_additional_frame(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.send_request(DESFIRE_STATUS_ADDITIONAL_FRAME, data, false)
    }
}
