// transitcard-rs/transitcard/tests/common/fixtures.rs: commonly used card answers

use transitcard::test_support::{apdu_ok, desfire_frame, felica_framed};
use transitcard::transport::{MockClassicTag, MockSector, MockTransport};
use transitcard::types::ClassicKey;

pub const IDM: [u8; 8] = [0x01, 0x2e, 0x3d, 0x4c, 0x5b, 0x6a, 0x79, 0x88];
pub const PMM: [u8; 8] = [0x10, 0x0b, 0x4b, 0x42, 0x84, 0x85, 0xd0, 0xff];

/// GetManufacturingData answer of a DESFire EV1 8k.
pub const DESFIRE_MANUFACTURING: &str =
    "04010100021a0504010100061a05048e1d52a22c80ba54b5d0703413";

pub const FACTORY_KEY: ClassicKey = ClassicKey::from_bytes([0xff; 6]);
pub const OPERATOR_KEY: ClassicKey =
    ClassicKey::from_bytes([0x4b, 0x79, 0x1b, 0xea, 0x7b, 0xcc]);

pub fn felica_poll() -> Vec<u8> {
    felica_framed(0x01, &IDM, &PMM)
}

pub fn felica_block(fill: u8) -> Vec<u8> {
    let mut tail = vec![0x00, 0x00, 0x01];
    tail.extend_from_slice(&[fill; 16]);
    felica_framed(0x07, &IDM, &tail)
}

pub fn felica_read_error() -> Vec<u8> {
    felica_framed(0x07, &IDM, &[0x01, 0xa8])
}

pub fn felica_search(code: u16) -> Vec<u8> {
    felica_framed(0x0b, &IDM, &code.to_le_bytes())
}

pub fn felica_system_codes(codes: &[u16]) -> Vec<u8> {
    let mut tail = vec![codes.len() as u8];
    for c in codes {
        tail.extend_from_slice(&c.to_be_bytes());
    }
    felica_framed(0x0d, &IDM, &tail)
}

/// Queue the three-frame manufacturing data exchange.
pub fn push_desfire_manufacturing(m: &mut MockTransport) {
    let raw = hex::decode(DESFIRE_MANUFACTURING).unwrap();
    m.push_response(desfire_frame(&raw[..7], 0xaf));
    m.push_response(desfire_frame(&raw[7..14], 0xaf));
    m.push_response(desfire_frame(&raw[14..], 0x00));
}

pub fn record_not_found() -> Vec<u8> {
    vec![0x6a, 0x83]
}

pub fn file_not_found() -> Vec<u8> {
    vec![0x6a, 0x82]
}

pub fn ok(data: &[u8]) -> Vec<u8> {
    apdu_ok(data)
}

/// A 1k-layout tag whose sectors all open with `key` as key A. Block 0 of
/// every sector carries the sector number.
pub fn classic_tag(sectors: usize, key: ClassicKey) -> MockClassicTag {
    let mut tag = MockClassicTag::new(&[0xde, 0xad, 0xbe, 0xef], sectors);
    for i in 0..sectors {
        let mut blocks = vec![vec![0u8; 16]; 4];
        blocks[0][0] = i as u8;
        blocks[3] = trailer(&key);
        tag.set_sector(i, MockSector::new(Some(key), None, blocks));
    }
    tag
}

pub fn trailer(key: &ClassicKey) -> Vec<u8> {
    let mut t = key.as_bytes().to_vec();
    t.extend_from_slice(&[0xff, 0x07, 0x80, 0x69]);
    t.extend_from_slice(&[0xff; 6]);
    t
}
