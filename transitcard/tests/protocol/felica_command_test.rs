use crate::common::fixtures::*;
use transitcard::protocol::felica::commands::{encode_block_element, Command};
use transitcard::protocol::FelicaProtocol;
use transitcard::test_support::felica_framed;
use transitcard::transport::MockTransport;
use transitcard::types::{Idm, ServiceCode, SystemCode};

#[test]
fn block_elements_switch_to_three_bytes() {
    assert_eq!(encode_block_element(0x12), vec![0x80, 0x12]);
    assert_eq!(encode_block_element(0x0123), vec![0x00, 0x23, 0x01]);
}

#[test]
fn polling_frame_layout() {
    let frame = Command::polling(SystemCode::new(0x0003)).to_frame().unwrap();
    assert_eq!(frame, vec![0x06, 0x00, 0x00, 0x03, 0x01, 0x07]);
}

#[test]
fn read_blocks_caps_at_fifteen() {
    let mut m = MockTransport::connected(&IDM);
    let blocks: Vec<u16> = (0..16).collect();
    let res = FelicaProtocol::new(&mut m).read_blocks(
        Idm::from_bytes(IDM),
        ServiceCode::new(0x090f),
        &blocks,
    );
    assert!(res.is_err());
    assert!(m.sent.is_empty());
}

#[test]
fn read_blocks_keyed_by_number() {
    let mut m = MockTransport::connected(&IDM);
    let mut tail = vec![0x00, 0x00, 0x02];
    tail.extend_from_slice(&[0x0a; 16]);
    tail.extend_from_slice(&[0x0b; 16]);
    m.push_response(felica_framed(0x07, &IDM, &tail));
    let read = FelicaProtocol::new(&mut m)
        .read_blocks(Idm::from_bytes(IDM), ServiceCode::new(0x090f), &[4, 7])
        .unwrap()
        .unwrap();
    assert_eq!(read[&4], vec![0x0a; 16]);
    assert_eq!(read[&7], vec![0x0b; 16]);
}

#[test]
fn service_iterator_skips_areas() {
    let mut m = MockTransport::connected(&IDM);
    m.push_response(felica_framed(0x0b, &IDM, &[0x00, 0x00, 0xfe, 0xff]));
    m.push_response(felica_search(0x1009));
    m.push_response(felica_search(0xffff));
    let mut felica = FelicaProtocol::new(&mut m);
    let codes: Vec<_> = felica
        .service_codes(Idm::from_bytes(IDM))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(codes, vec![ServiceCode::new(0x1009)]);
}
