//! Fingerprint index bounding under sustained traffic.

use trim_core::{TrimConfig, ANCHOR_COUNT};
use trim_engine::Encoder;
use trim_tests::PayloadGen;

#[test]
fn test_index_stays_bounded() {
    let config = TrimConfig::with_capacity(4);
    let limit = config.index_limit();
    let mut encoder = Encoder::new(config).unwrap();
    let mut gen = PayloadGen::seeded(21);

    for _ in 0..50 {
        let mut payload = gen.bytes(200);
        encoder.process(&mut payload, 200).unwrap();
        assert!(encoder.index().len() < limit);
    }
    assert!(encoder.index().purges() > 0);
}

#[test]
fn test_purge_keeps_resident_fingerprints() {
    let config = TrimConfig {
        index_limit: Some(4 * ANCHOR_COUNT + 1),
        ..TrimConfig::with_capacity(4)
    };
    let mut encoder = Encoder::new(config).unwrap();
    let mut gen = PayloadGen::seeded(22);
    let payloads: Vec<Vec<u8>> = (0..12).map(|_| gen.bytes(300)).collect();

    for payload in &payloads {
        let mut buf = payload.clone();
        encoder.process(&mut buf, 300).unwrap();
    }
    assert!(encoder.index().purges() > 0);

    // The four most recent payloads must still be found after purging.
    for payload in &payloads[8..] {
        let mut buf = payload.clone();
        let outcome = encoder.process(&mut buf, 300).unwrap();
        assert!(outcome.is_rewritten());
    }
}
