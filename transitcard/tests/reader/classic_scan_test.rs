use crate::common::fixtures::*;
use crate::common::init_logger;
use serial_test::serial;
use transitcard::card::ClassicSector;
use transitcard::keys::{KeyRetriever, MergedKeyRetriever, NoKeys, StaticKeys};
use transitcard::progress::{NoopProgress, RecordingProgress};
use transitcard::reader::{read_classic, CardReader, ReaderConfig};
use transitcard::transport::MockSector;
use transitcard::types::{CardKind, ClassicSectorKey, KeyType};

#[test]
#[serial]
fn tag_lost_at_sector_five_of_sixteen() {
    init_logger();
    let mut tag = classic_tag(16, FACTORY_KEY);
    tag.lost_at_block = Some(5 * 4);

    let mut progress = RecordingProgress::new();
    let card = read_classic(&mut tag, &NoKeys, &ReaderConfig::default(), &mut progress).unwrap();

    assert!(card.is_partial_read());
    let classic = card.as_classic().unwrap();
    assert_eq!(classic.sectors().len(), 6);
    assert!(classic.sectors()[..5].iter().all(ClassicSector::is_authenticated));
    assert!(classic.sector(5).unwrap().is_invalid());
    // no final 100% report after a loss
    assert_ne!(progress.last(), Some((80, 80)));
    assert_eq!(tag.close_calls, 1);
}

#[test]
fn empty_sectors_are_detected() {
    let tag_card = {
        let mut tag = classic_tag(2, FACTORY_KEY);
        read_classic(&mut tag, &NoKeys, &ReaderConfig::default(), &mut NoopProgress).unwrap()
    };
    let classic = tag_card.as_classic().unwrap();
    // sector 0: manufacturer block and trailer are ignored, the rest is zero
    assert!(classic.sector(0).unwrap().is_empty());
    // sector 1 carries its index in block 0
    assert!(!classic.sector(1).unwrap().is_empty());
    assert_eq!(classic.first_authenticated_sector().unwrap().index(), 0);
}

#[test]
fn merged_keys_unlock_operator_sectors() -> anyhow::Result<()> {
    let mut tag = classic_tag(4, FACTORY_KEY);
    tag.set_sector(
        2,
        MockSector::new(None, Some(OPERATOR_KEY), vec![vec![0x22; 16]; 4]),
    );

    let dumped = StaticKeys::parse("2:B:4b791bea7bcc\n")?;
    let fallback = StaticKeys::uniform(4, ClassicSectorKey::key_a(FACTORY_KEY));
    let keys = MergedKeyRetriever::new(vec![&dumped as &dyn KeyRetriever, &fallback]);

    let reader = CardReader::new(ReaderConfig::default());
    let card = reader.read_classic(&mut tag, &keys, &mut NoopProgress)?;
    let classic = card.as_classic().expect("classic card");
    assert_eq!(card.kind(), CardKind::MifareClassic);
    assert!(classic.sectors().iter().all(ClassicSector::is_authenticated));
    let key = classic.sector(2).unwrap().key()?;
    assert_eq!(key.key_type, KeyType::B);
    assert_eq!(key.key, OPERATOR_KEY);
    // sector 2 was opened on the first try with its declared key
    let attempts: Vec<_> = tag.auth_log.iter().filter(|a| a.0 == 2).collect();
    assert_eq!(attempts.len(), 1);
    Ok(())
}

#[test]
fn locked_sector_does_not_stop_the_scan() {
    let mut tag = classic_tag(3, FACTORY_KEY);
    tag.set_sector(1, MockSector::new(Some(OPERATOR_KEY), None, vec![vec![1; 16]; 4]));
    let card = read_classic(&mut tag, &NoKeys, &ReaderConfig::default(), &mut NoopProgress).unwrap();
    let classic = card.as_classic().unwrap();
    assert!(!card.is_partial_read());
    assert!(classic.sector(1).unwrap().is_unauthorized());
    assert!(classic.sector(2).unwrap().is_authenticated());
    match classic.sector(1).unwrap().blocks() {
        Err(transitcard::Error::UnsupportedOperation(_)) => {}
        other => panic!("expected UnsupportedOperation, got {:?}", other),
    }
}
