use proptest::prelude::*;
use transitcard::card::{
    CepasHistory, CepasPurse, CepasPurseInfo, DesfireFileSettings, DesfireManufacturingData, Selector,
};
use transitcard::protocol::desfire::split_response;
use transitcard::protocol::felica::responses::Response;
use transitcard::protocol::{ApduResponse, DesfireProtocol};
use transitcard::test_support::desfire_frame;
use transitcard::transport::MockTransport;

proptest! {
    #[test]
    fn decoders_never_panic(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = ApduResponse::parse(&data);
        let _ = split_response(&data);
        let _ = DesfireManufacturingData::parse(&data);
        let _ = DesfireFileSettings::parse(&data);
        let _ = CepasPurseInfo::parse(&data);
        let _ = CepasPurse::from_raw(data.clone());
        let _ = CepasHistory::parse(&data);
        for cmd in [0x00u8, 0x06, 0x0a, 0x0c, 0x3e, 0x42] {
            let _ = Response::decode(cmd, &data);
        }
    }

    #[test]
    fn selector_parse_never_panics(s in "[:#0-9a-fA-Fxz]{0,24}") {
        let _ = s.parse::<Selector>();
    }

    #[test]
    fn reassembly_ignores_frame_boundaries(
        payload in proptest::collection::vec(any::<u8>(), 1..96),
        cuts in proptest::collection::vec(any::<usize>(), 0..4),
    ) {
        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % payload.len()).collect();
        cuts.sort_unstable();
        cuts.dedup();

        let mut m = MockTransport::connected(&[1]);
        let mut start = 0;
        for cut in cuts.into_iter().filter(|c| *c > 0) {
            m.push_response(desfire_frame(&payload[start..cut], 0xaf));
            start = cut;
        }
        m.push_response(desfire_frame(&payload[start..], 0x00));

        let out = DesfireProtocol::new(&mut m).send_request(0xbd, &[1], true).unwrap();
        prop_assert_eq!(out, payload);
    }
}
