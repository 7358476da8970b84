//! Test support helpers intended for use by unit and integration tests.
//!
//! These helpers centralize the byte layouts of scripted card answers so
//! tests across the crate and tests/ directory can reuse the same logic.
#![allow(dead_code)]

use crate::constants::DESFIRE_STATUS_MARKER;
use crate::transport::{mock::MockTransport, traits::Transport};

/// ISO7816 answer: payload followed by `90 00`.
#[doc(hidden)]
pub fn apdu_ok(data: &[u8]) -> Vec<u8> {
    apdu_status(data, 0x90, 0x00)
}

/// ISO7816 answer with an explicit status word.
#[doc(hidden)]
pub fn apdu_status(data: &[u8], sw1: u8, sw2: u8) -> Vec<u8> {
    let mut v = data.to_vec();
    v.push(sw1);
    v.push(sw2);
    v
}

/// DESFire answer: payload followed by `91 status`.
#[doc(hidden)]
pub fn desfire_frame(payload: &[u8], status: u8) -> Vec<u8> {
    let mut v = payload.to_vec();
    v.push(DESFIRE_STATUS_MARKER);
    v.push(status);
    v
}

/// FeliCa answer: length byte, response code, IDm, then `tail`.
#[doc(hidden)]
pub fn felica_framed(code: u8, idm: &[u8; 8], tail: &[u8]) -> Vec<u8> {
    let mut v = vec![0, code];
    v.extend_from_slice(idm);
    v.extend_from_slice(tail);
    v[0] = v.len() as u8;
    v
}

/// Build a MockTransport pre-seeded with the given responses.
#[doc(hidden)]
pub fn mock_with_responses(tag_id: &[u8], responses: Vec<Vec<u8>>) -> MockTransport {
    let mut mock = MockTransport::new(tag_id);
    mock.push_responses(responses);
    mock
}

/// Same as [`mock_with_responses`], boxed as a Transport trait object.
#[doc(hidden)]
pub fn boxed_mock_with_responses(
    tag_id: &[u8],
    responses: Vec<Vec<u8>>,
) -> Box<dyn Transport> {
    Box::new(mock_with_responses(tag_id, responses))
}
