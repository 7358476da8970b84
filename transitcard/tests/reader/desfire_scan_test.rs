use crate::common::fixtures::*;
use transitcard::card::DesfireFile;
use transitcard::progress::RecordingProgress;
use transitcard::reader::{read_desfire, ReaderConfig};
use transitcard::test_support::desfire_frame;
use transitcard::transport::MockTransport;
use transitcard::types::DesfireAppId;

fn standard_settings(size: u8) -> Vec<u8> {
    vec![0x00, 0x00, 0xe0, 0xee, size, 0x00, 0x00]
}

#[test]
fn multi_frame_directory_and_data() {
    let mut m = MockTransport::new(&[0x04, 0x8e, 0x1d, 0x52]);
    push_desfire_manufacturing(&mut m);
    // application directory split over two frames
    m.push_response(desfire_frame(&[0x01, 0x00, 0x00, 0x02, 0x00, 0x00], 0xaf));
    m.push_response(desfire_frame(&[0x03, 0x00, 0x00], 0x00));
    // app 000001: one standard file, data in two frames
    m.push_response(desfire_frame(&[], 0x00));
    m.push_response(desfire_frame(&[0x01], 0x00));
    m.push_response(desfire_frame(&standard_settings(0x40), 0x00));
    m.push_response(desfire_frame(&[0xaa; 59], 0xaf));
    m.push_response(desfire_frame(&[0xbb; 5], 0x00));
    // app 000002: gone
    m.push_response(desfire_frame(&[], 0xa0));
    // app 000003: no files
    m.push_response(desfire_frame(&[], 0x00));
    m.push_response(desfire_frame(&[], 0x00));

    let mut progress = RecordingProgress::new();
    let card = read_desfire(&mut m, None, &ReaderConfig::default(), &mut progress)
        .unwrap()
        .unwrap();
    assert!(!card.is_partial_read());
    let desfire = card.as_desfire().unwrap();
    assert_eq!(desfire.manufacturing_data().raw().len(), 28);
    assert_eq!(desfire.applications().len(), 2);
    assert!(desfire.application(DesfireAppId::from_bytes([0x02, 0x00, 0x00])).is_none());

    let app = DesfireAppId::from_bytes([0x01, 0x00, 0x00]);
    match desfire.file(app, 1) {
        Some(DesfireFile::Standard { data, settings }) => {
            assert_eq!(data.len(), 64);
            assert_eq!(&data[59..], &[0xbb; 5]);
            assert!(settings.is_some());
        }
        other => panic!("expected Standard, got {:?}", other),
    }
    // continuation frames are bare GET_ADDITIONAL_FRAME requests
    assert_eq!(m.sent[4], vec![0x90, 0xaf, 0x00, 0x00, 0x00]);
    assert_eq!(m.remaining(), 0);
    assert_eq!(m.close_calls, 1);
}

#[test]
fn card_leaving_during_continuation_is_partial() {
    let mut m = MockTransport::new(&[1]);
    push_desfire_manufacturing(&mut m);
    m.push_response(desfire_frame(&[0x01, 0x00, 0x00], 0x00));
    m.push_response(desfire_frame(&[], 0x00));
    m.push_response(desfire_frame(&[0x01, 0x02], 0x00));
    m.push_response(desfire_frame(&standard_settings(2), 0x00));
    m.push_response(desfire_frame(&[0x10, 0x20], 0x00));
    m.push_response(desfire_frame(&standard_settings(0x40), 0x00));
    m.push_response(desfire_frame(&[0xaa; 59], 0xaf));
    m.push_lost();

    let card = read_desfire(&mut m, None, &ReaderConfig::default(), &mut RecordingProgress::new())
        .unwrap()
        .unwrap();
    assert!(card.is_partial_read());
    let app = &card.as_desfire().unwrap().applications()[0];
    assert_eq!(app.file(1).unwrap().data(), Some(&[0x10, 0x20][..]));
    assert!(app.file(2).is_none());
}
