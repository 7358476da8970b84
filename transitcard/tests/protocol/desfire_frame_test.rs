use transitcard::protocol::desfire::{split_response, wrap_message};
use transitcard::protocol::{CardStatus, DesfireProtocol};
use transitcard::test_support::desfire_frame;
use transitcard::transport::MockTransport;
use transitcard::Error;

#[test]
fn wrap_with_and_without_params() {
    assert_eq!(wrap_message(0x60, &[]).unwrap(), vec![0x90, 0x60, 0x00, 0x00, 0x00]);
    assert_eq!(
        wrap_message(0xbd, &[0x01, 0, 0, 0, 0, 0, 0]).unwrap(),
        vec![0x90, 0xbd, 0x00, 0x00, 0x07, 0x01, 0, 0, 0, 0, 0, 0, 0x00]
    );
}

#[test]
fn non_desfire_answer_is_malformed() {
    match split_response(&[0x90, 0x00]) {
        Err(Error::MalformedResponse(_)) => {}
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}

#[test]
fn continuation_frames_are_concatenated() {
    let mut m = MockTransport::connected(&[1]);
    m.push_response(desfire_frame(&[1, 2, 3], 0xaf));
    m.push_response(desfire_frame(&[4, 5], 0xaf));
    m.push_response(desfire_frame(&[6], 0x00));
    let out = DesfireProtocol::new(&mut m).send_request(0x6a, &[], true).unwrap();
    assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(m.sent.len(), 3);
}

#[test]
fn unlock_does_not_continue() {
    let mut m = MockTransport::connected(&[1]);
    m.push_response(desfire_frame(&[0xee; 8], 0xaf));
    let challenge = DesfireProtocol::new(&mut m).send_unlock(0x00).unwrap();
    assert_eq!(challenge, vec![0xee; 8]);
    assert_eq!(m.remaining(), 0);
}

#[test]
fn error_status_after_continuation() {
    let mut m = MockTransport::connected(&[1]);
    m.push_response(desfire_frame(&[1], 0xaf));
    m.push_response(desfire_frame(&[], 0x9d));
    match DesfireProtocol::new(&mut m).read_file(1) {
        Err(Error::DesfireStatus {
            code: 0x9d,
            status: CardStatus::PermissionDenied,
        }) => {}
        other => panic!("expected DesfireStatus, got {:?}", other),
    }
}
