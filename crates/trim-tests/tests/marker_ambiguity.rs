//! Behavior around genuine payload bytes that resemble the marker.

use trim_core::shim::MARKER_BYTE;
use trim_core::{ShimDescriptor, TrimConfig};
use trim_engine::{DeclineReason, DecodeAction, Decoder, EncodeAction, RejectReason};
use trim_tests::{Link, PayloadGen};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("trim_engine=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_medium_marker_run_is_flagged() {
    init_tracing();

    let mut link = Link::with_capacity(4).unwrap();
    let mut payload = vec![b'z'; 10];
    payload.extend_from_slice(&[MARKER_BYTE; 9]);
    payload.extend_from_slice(b"zzzzzzzzzzzz");

    let transfer = link.send(&payload).unwrap();
    assert!(transfer.encoded.marker_collision);
    assert_eq!(transfer.wire, payload);
    // The misread reference lies outside the wire space, so nothing is
    // rebuilt and the payload survives.
    assert!(matches!(
        transfer.decoded.action,
        DecodeAction::Rejected {
            offset: 10,
            reason: RejectReason::Unresolvable,
            ..
        }
    ));
    assert!(transfer.intact(&payload));
    assert_eq!(link.stats().marker_collisions, 1);
}

#[test]
fn test_long_marker_run_is_ignored() {
    init_tracing();

    let mut link = Link::with_capacity(4).unwrap();
    let mut payload = vec![MARKER_BYTE; 40];
    payload.extend_from_slice(b"zzzzzzzzzzzzzzzz");

    let transfer = link.send(&payload).unwrap();
    assert!(!transfer.encoded.marker_collision);
    assert_eq!(transfer.decoded.action, DecodeAction::Passthrough);
    assert!(transfer.intact(&payload));
}

#[test]
fn test_forged_descriptor_can_corrupt_passthrough() {
    init_tracing();

    // A payload that happens to contain a well-formed descriptor pointing
    // at resident history is rebuilt by the decoder. The encoder can only
    // flag it.
    let mut link = Link::with_capacity(4).unwrap();
    let mut gen = PayloadGen::seeded(11);
    let history = gen.bytes(100);
    link.send(&history).unwrap();

    let mut payload = b"prefix".to_vec();
    payload.extend_from_slice(&ShimDescriptor::new(0, 0, 49).to_bytes());
    let transfer = link.send(&payload).unwrap();

    assert!(transfer.encoded.marker_collision);
    assert!(transfer.decoded.is_reconstructed());
    assert!(!transfer.intact(&payload));
    assert_eq!(&transfer.delivered[6..56], &history[..50]);
}

#[test]
fn test_rewrite_next_to_marker_byte_is_declined() {
    init_tracing();

    let mut link = Link::with_capacity(8).unwrap();
    let mut gen = PayloadGen::seeded(12);
    let first = gen.bytes(200);
    let mut second = gen.embed(200, 70, &first[70..=150]);
    second[69] = MARKER_BYTE;
    second[151] = if first[151] == b'x' { b'y' } else { b'x' };

    link.send(&first).unwrap();
    let transfer = link.send(&second).unwrap();

    match transfer.encoded.action {
        EncodeAction::Declined { region, reason } => {
            assert_eq!(reason, DeclineReason::MarkerAmbiguity);
            assert_eq!((region.orig_left, region.orig_right), (70, 150));
        }
        other => panic!("expected decline, got {:?}", other),
    }
    assert!(!transfer.encoded.marker_collision);
    assert_eq!(transfer.wire, second);
    assert!(transfer.intact(&second));
    assert_eq!(link.stats().declined, 1);
}

#[test]
fn test_descriptor_before_any_history_is_rejected() {
    init_tracing();

    let mut decoder = Decoder::new(TrimConfig::with_capacity(4)).unwrap();
    let mut buf = vec![0u8; 32];
    buf[..16].copy_from_slice(&ShimDescriptor::new(0, 0, 15).to_bytes());
    let outcome = decoder.process(&mut buf, 16).unwrap();
    assert!(matches!(
        outcome.action,
        DecodeAction::Rejected {
            reason: RejectReason::Unresolvable,
            ..
        }
    ));
    assert_eq!(outcome.len, 16);
}
