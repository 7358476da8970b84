use crate::common::fixtures::*;
use transitcard::progress::{NoopProgress, RecordingProgress};
use transitcard::reader::{CardReader, ReaderConfig};
use transitcard::transport::MockTransport;
use transitcard::types::{CardKind, ServiceCode, SystemCode};

#[test]
fn service_search_stops_at_ffff() {
    let mut m = MockTransport::new(&IDM);
    m.push_response(felica_poll());
    m.push_response(felica_system_codes(&[0x0003]));
    m.push_response(felica_poll());
    m.push_response(felica_search(0x090f));
    m.push_response(felica_search(0x008b));
    m.push_response(felica_search(0xffff));
    // 090f: two blocks
    m.push_response(felica_poll());
    m.push_response(felica_block(0x11));
    m.push_response(felica_block(0x12));
    m.push_response(felica_read_error());
    // 008b: nothing readable, dropped
    m.push_response(felica_poll());
    m.push_response(felica_read_error());

    let mut progress = RecordingProgress::new();
    let card = CardReader::default().read_felica(&mut m, &mut progress).unwrap();
    assert_eq!(card.kind(), CardKind::Felica);
    assert!(!card.is_partial_read());

    let felica = card.as_felica().unwrap();
    let system = felica.system(SystemCode::new(0x0003)).unwrap();
    assert_eq!(system.services().len(), 1);
    assert_eq!(system.service(ServiceCode::new(0x090f)).unwrap().blocks().len(), 2);
    assert!(system.service(ServiceCode::new(0x008b)).is_none());

    // three SearchServiceCode requests, indices 1..=3
    let searches: Vec<_> = m.sent.iter().filter(|s| s.get(1) == Some(&0x0a)).collect();
    assert_eq!(searches.len(), 3);
    assert_eq!(&searches[2][10..12], &[0x03, 0x00]);
    assert_eq!(progress.kinds, vec![CardKind::Felica]);
    assert_eq!(progress.last(), Some((1, 1)));
    assert_eq!(m.remaining(), 0);
}

#[test]
fn system_that_never_answers_is_partial() {
    let mut m = MockTransport::new(&IDM);
    m.push_response(felica_poll());
    m.push_response(felica_system_codes(&[0x0003]));
    m.push_responses((0..2).map(|_| Vec::new()));

    let config = ReaderConfig::builder().felica_poll_attempts(2).build().unwrap();
    let card = CardReader::new(config).read_felica(&mut m, &mut NoopProgress).unwrap();
    assert!(card.is_partial_read());
    assert!(card.as_felica().unwrap().systems().is_empty());
}
