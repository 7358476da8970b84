use crate::common::fixtures::*;
use transitcard::card::Selector;
use transitcard::constants::CEPAS_TRANSACTION_LEN;
use transitcard::progress::NoopProgress;
use transitcard::reader::{CardReader, Iso7816AppProbe, ReaderConfig};
use transitcard::test_support::apdu_status;
use transitcard::transport::MockTransport;
use transitcard::types::CardKind;

fn cepas_purse(balance: i32) -> Vec<u8> {
    let mut p = vec![0u8; 62];
    p[0] = 0x02;
    p[1] = 0x01;
    p[2..5].copy_from_slice(&balance.to_be_bytes()[1..]);
    p
}

#[test]
fn cepas_history_has_sixteen_bytes_per_record() {
    let config = ReaderConfig::builder()
        .cepas_purse_count(2)
        .cepas_file_scan(0..0)
        .build()
        .unwrap();
    let mut m = MockTransport::new(&[0x10, 0x20, 0x30, 0x40]);
    m.push_response(vec![0x6e, 0x00]); // DESFire probe refused
    m.push_response(ok(&[])); // 4000 selected
    m.push_response(ok(&cepas_purse(-250)));
    m.push_response(record_not_found());
    m.push_response(ok(&[0x30; CEPAS_TRANSACTION_LEN * 15]));
    m.push_response(ok(&[0x31; CEPAS_TRANSACTION_LEN * 3]));

    let card = CardReader::new(config)
        .read_iso_dep(&mut m, None, &mut NoopProgress)
        .unwrap();
    assert_eq!(card.kind(), CardKind::Cepas);
    let cepas = card.as_cepas().unwrap();
    let purse = cepas.purse(0).unwrap().info().unwrap();
    assert_eq!(purse.purse_balance, -250);
    assert_eq!(purse.last_transaction_debit_options, None);
    let history = cepas.history(0).unwrap();
    assert_eq!(history.raw().len(), CEPAS_TRANSACTION_LEN * 18);
    assert_eq!(history.transactions().len(), 18);
    assert!(cepas.history(1).is_none());
    // phase two asks for the records after the first 15
    assert_eq!(m.sent.last().unwrap(), &vec![0x90, 0x32, 0x00, 0x0f, 0x01, 0x0f, 0x00]);
}

#[test]
fn generic_application_survives_refused_unselect() {
    let aid = [0xa0, 0x00, 0x00, 0x02, 0x91];
    let config = ReaderConfig::builder()
        .iso7816_application(
            Iso7816AppProbe::new(&aid)
                .file(Selector::by_ids(&[0x3f00, 0x2f10]))
                .record_length(0x1d),
        )
        .build()
        .unwrap();
    let mut m = MockTransport::new(&[0x08, 0x01, 0x02, 0x03]);
    m.push_response(vec![0x6d, 0x00]); // DESFire probe refused
    m.push_response(file_not_found()); // not CEPAS
    m.push_response(ok(&[0x6f, 0x00]));
    m.push_response(apdu_status(&[], 0x69, 0x86)); // unselect: no current EF
    m.push_response(ok(&[]));
    m.push_response(ok(&[0x62, 0x00]));
    m.push_response(apdu_status(&[], 0x69, 0x86)); // not a transparent EF
    m.push_response(ok(&[0x01; 0x1d]));
    m.push_response(record_not_found());

    let card = CardReader::new(config)
        .read_iso_dep(&mut m, None, &mut NoopProgress)
        .unwrap();
    let iso = card.as_iso7816().unwrap();
    let selector: Selector = ":3f00:2f10".parse().unwrap();
    let file = iso.file(&selector).unwrap();
    assert!(file.binary_data().is_none());
    assert_eq!(file.record(1).map(<[u8]>::len), Some(0x1d));
    assert_eq!(iso.first_applicable_record_for(&selector), Some(&[0x01; 0x1d][..]));
    // the record read carries the configured length
    assert_eq!(m.sent[7], vec![0x00, 0xb2, 0x01, 0x04, 0x1d]);
    assert_eq!(m.remaining(), 0);
}
