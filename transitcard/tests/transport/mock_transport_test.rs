use transitcard::transport::{ClassicTech, Connection, MockClassicTag, MockTransport, Transport};
use transitcard::types::{ClassicKey, KeyType};
use transitcard::Error;

#[test]
fn mock_transport_send_and_receive() {
    let mut m = MockTransport::connected(&[1, 2, 3, 4]);
    m.push_response(vec![0x90, 0x00]);
    let r = m.transceive(&[0x00, 0xa4, 0x00, 0x00, 0x00]).unwrap();
    assert_eq!(r, vec![0x90, 0x00]);
    assert_eq!(m.sent.len(), 1);
    assert_eq!(m.tag_id().to_hex(), "01020304");
}

#[test]
fn empty_queue_times_out() {
    let mut m = MockTransport::connected(&[1]);
    match m.transceive(&[0]) {
        Err(Error::Timeout) => {}
        other => panic!("expected Timeout, got {:?}", other),
    }
}

#[test]
fn injected_failure_is_communication_error() {
    let mut m = MockTransport::connected(&[1]);
    m.push_failure("usb stall");
    let err = m.transceive(&[0]).unwrap_err();
    assert!(err.is_fatal());
    assert!(!err.is_tag_lost());
}

#[test]
fn classic_geometry_for_4k() {
    let tag = MockClassicTag::new(&[1], 40);
    assert_eq!(tag.block_count_in_sector(31), 4);
    assert_eq!(tag.block_count_in_sector(32), 16);
    assert_eq!(tag.sector_to_block(32), 128);
    assert_eq!(tag.sector_to_block(39), 128 + 7 * 16);
}

#[test]
fn classic_requires_connection() {
    let mut tag = MockClassicTag::new(&[1], 1);
    let key = ClassicKey::from_bytes([0xff; 6]);
    match tag.authenticate(0, &key, KeyType::A) {
        Err(Error::NotConnected) => {}
        other => panic!("expected NotConnected, got {:?}", other),
    }
}
