use crate::common::fixtures::*;
use transitcard::card::Selector;
use transitcard::protocol::{CardStatus, Iso7816Protocol};
use transitcard::test_support::apdu_status;
use transitcard::transport::MockTransport;
use transitcard::{Error, ErrorKind};

#[test]
fn wrong_length_is_retried_with_card_le() {
    let mut m = MockTransport::connected(&[1]);
    m.push_response(apdu_status(&[], 0x6c, 0x10));
    m.push_response(ok(&[0x55; 16]));
    let mut iso = Iso7816Protocol::new(&mut m);
    assert_eq!(iso.read_binary(None).unwrap(), vec![0x55; 16]);
    assert_eq!(m.sent[0], vec![0x00, 0xb0, 0x00, 0x00, 0x00]);
    assert_eq!(m.sent[1], vec![0x00, 0xb0, 0x00, 0x00, 0x10]);
}

#[test]
fn status_words_map_onto_kinds() {
    let cases = [
        ((0x69, 0x82), ErrorKind::AccessDenied),
        ((0x6a, 0x82), ErrorKind::NotFound),
        ((0x6a, 0x83), ErrorKind::NotFound),
        ((0x6d, 0x00), ErrorKind::ProtocolViolation),
        ((0x6e, 0x00), ErrorKind::ProtocolViolation),
    ];
    for ((sw1, sw2), kind) in cases {
        let mut m = MockTransport::connected(&[1]);
        m.push_response(apdu_status(&[], sw1, sw2));
        let err = Iso7816Protocol::new(&mut m).select_by_id(0x3f00).unwrap_err();
        assert_eq!(err.kind(), kind, "{:02x}{:02x}", sw1, sw2);
    }
}

#[test]
fn security_status_carries_both_bytes() {
    let mut m = MockTransport::connected(&[1]);
    m.push_response(apdu_status(&[], 0x69, 0x82));
    match Iso7816Protocol::new(&mut m).read_record(Some(3), 1, 0) {
        Err(Error::Iso7816Status {
            sw1: 0x69,
            sw2: 0x82,
            status: CardStatus::SecurityStatusNotSatisfied,
        }) => {}
        other => panic!("expected Iso7816Status, got {:?}", other),
    }
    // SFI 3 lands in the top five bits of P2
    assert_eq!(m.sent[0], vec![0x00, 0xb2, 0x01, 0x1c, 0x00]);
}

#[test]
fn selector_path_is_walked_in_order() {
    let mut m = MockTransport::connected(&[1]);
    m.push_response(ok(&[]));
    m.push_response(ok(&[0x6f, 0x01]));
    m.push_response(ok(&[0x62, 0x02]));
    let selector: Selector = "#a000000291:3f00:0002".parse().unwrap();
    let fci = Iso7816Protocol::new(&mut m).select_path(&selector).unwrap();
    assert_eq!(fci, Some(vec![0x62, 0x02]));
    assert_eq!(m.sent[0][..5], [0x00, 0xa4, 0x04, 0x00, 0x05]);
    assert_eq!(m.sent[2], vec![0x00, 0xa4, 0x00, 0x00, 0x02, 0x00, 0x02, 0x00]);
}

#[test]
fn records_walk_until_eof() {
    let mut m = MockTransport::connected(&[1]);
    m.push_response(ok(&[1]));
    m.push_response(ok(&[2]));
    m.push_response(record_not_found());
    let run = Iso7816Protocol::new(&mut m).read_all_records(Some(1), 0).unwrap();
    assert_eq!(run.records.len(), 2);
    assert!(run.reached_eof);
}
