//! Match decisions for captured client Initials
//!
//! Each test builds a matcher from configuration the way a router would and
//! feeds it whole datagrams or prefixes of them.

use l4quic::config::MatcherConfig;
use l4quic::matcher::{MatchOutcome, QuicMatcher};

use super::*;

fn matcher(config: &MatcherConfig) -> QuicMatcher {
    QuicMatcher::from_config(config).unwrap()
}

fn decisions(matcher: &QuicMatcher) -> Vec<bool> {
    CAPTURED
        .iter()
        .map(|packet| matcher.matches_datagram(packet))
        .collect()
}

// ============================================================================
// Criteria
// ============================================================================

#[test]
fn test_default_matches_every_captured_initial() {
    assert_eq!(decisions(&QuicMatcher::any()), [true, true, true]);

    let from_empty = matcher(&MatcherConfig::default());
    assert_eq!(decisions(&from_empty), [true, true, true]);
}

#[test]
fn test_sni_only_matches_every_captured_initial() {
    let m = matcher(&MatcherConfig::default().with_sni(["example.com"]));
    assert_eq!(decisions(&m), [true, true, true]);
}

#[test]
fn test_sni_and_custom_alpn() {
    let m = matcher(
        &MatcherConfig::default()
            .with_sni(["example.com"])
            .with_alpn(["custom"]),
    );
    assert_eq!(decisions(&m), [false, true, false]);
}

#[test]
fn test_sni_and_h3_alpn() {
    let m = matcher(
        &MatcherConfig::default()
            .with_sni(["example.com"])
            .with_alpn(["h3"]),
    );
    assert_eq!(decisions(&m), [true, false, true]);
}

#[test]
fn test_draft_alpn_only_offered_by_one_capture() {
    let m = matcher(&MatcherConfig::default().with_alpn(["h3-29"]));
    assert_eq!(decisions(&m), [false, false, true]);
}

#[test]
fn test_sni_wildcard_and_case() {
    let m = matcher(&MatcherConfig::default().with_sni(["EXAMPLE.com"]));
    assert_eq!(decisions(&m), [true, true, true]);

    let m = matcher(&MatcherConfig::default().with_sni(["*.com"]));
    assert_eq!(decisions(&m), [true, true, true]);

    let m = matcher(&MatcherConfig::default().with_sni(["*.example.com"]));
    assert_eq!(decisions(&m), [false, false, false]);
}

#[test]
fn test_sni_list_is_any_of() {
    let m = matcher(&MatcherConfig::default().with_sni(["example.org", "example.com"]));
    assert_eq!(decisions(&m), [true, true, true]);

    let m = matcher(&MatcherConfig::default().with_sni(["example.org", "example.net"]));
    assert_eq!(decisions(&m), [false, false, false]);
}

#[test]
fn test_criteria_and_across_or_within() {
    let m = matcher(
        &MatcherConfig::default()
            .with_sni(["example.org", "example.com"])
            .with_alpn(["h2", "custom"]),
    );
    assert_eq!(decisions(&m), [false, true, false]);

    // ALPN satisfied but no server name pattern matches
    let m = matcher(
        &MatcherConfig::default()
            .with_sni(["example.org", "example.net"])
            .with_alpn(["h2", "custom"]),
    );
    assert_eq!(decisions(&m), [false, false, false]);
}

#[test]
fn test_alpn_list_is_any_of() {
    let m = matcher(&MatcherConfig::default().with_alpn(["custom", "h3"]));
    assert_eq!(decisions(&m), [true, true, true]);
}

// ============================================================================
// Structural rejection
// ============================================================================

#[test]
fn test_concatenated_initials_rejected() {
    let mut joined = PACKET1.to_vec();
    joined.extend_from_slice(PACKET2);

    assert!(!QuicMatcher::any().matches_datagram(&joined));
    assert_eq!(QuicMatcher::any().evaluate(&joined), MatchOutcome::NotMatched);
}

#[test]
fn test_zero_padding_after_packet_accepted() {
    let mut padded = PACKET1.to_vec();
    padded.extend_from_slice(&[0u8; 64]);
    assert!(QuicMatcher::any().matches_datagram(&padded));
}

#[test]
fn test_mutated_first_byte_rejected() {
    for first in [0x40u8, 0x80, 0xc0] {
        for packet in CAPTURED {
            let mut mutated = packet.to_vec();
            mutated[0] = first;
            assert!(
                !QuicMatcher::any().matches_datagram(&mutated),
                "first byte {first:#04x} should not match"
            );
        }
    }
}

#[test]
fn test_short_header_rejected_immediately() {
    let mut mutated = PACKET1.to_vec();
    mutated[0] = 0x40;
    assert_eq!(
        QuicMatcher::any().evaluate(&mutated[..2]),
        MatchOutcome::NotMatched
    );
}

#[test]
fn test_version_negotiation_and_unknown_version_rejected() {
    let mut vn = PACKET1.to_vec();
    vn[1..5].copy_from_slice(&[0, 0, 0, 0]);
    assert_eq!(QuicMatcher::any().evaluate(&vn), MatchOutcome::NotMatched);

    let mut unknown = PACKET1.to_vec();
    unknown[1..5].copy_from_slice(&[0x1a, 0x2a, 0x3a, 0x4a]);
    assert_eq!(QuicMatcher::any().evaluate(&unknown), MatchOutcome::NotMatched);
}

#[test]
fn test_corrupted_payload_rejected() {
    for packet in CAPTURED {
        let mut corrupted = packet.to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0x01;
        assert!(!QuicMatcher::any().matches_datagram(&corrupted));
    }
}

#[test]
fn test_changed_dcid_breaks_authentication() {
    let mut changed = PACKET1.to_vec();
    // First DCID byte follows the 1-byte form/type, 4-byte version and 1-byte length
    changed[6] ^= 0xff;
    assert!(!QuicMatcher::any().matches_datagram(&changed));
}

// ============================================================================
// Incremental evaluation
// ============================================================================

#[test]
fn test_truncated_datagram_not_matched() {
    for packet in CAPTURED {
        let truncated = &packet[..packet.len() - 1];
        assert!(!QuicMatcher::any().matches_datagram(truncated));
        assert!(matches!(
            QuicMatcher::any().evaluate(truncated),
            MatchOutcome::NeedMoreData(_)
        ));
    }
}

#[test]
fn test_need_more_data_reaches_decision() {
    let m = matcher(
        &MatcherConfig::default()
            .with_sni(["example.com"])
            .with_alpn(["h3"]),
    );

    let mut len = 0;
    let outcome = loop {
        match m.evaluate(&PACKET1[..len]) {
            MatchOutcome::NeedMoreData(needed) => {
                assert!(needed > len, "must ask for more than it has");
                assert!(needed <= m.max_prefix_bytes());
                len = needed.min(PACKET1.len());
            }
            decided => break decided,
        }
    };

    assert_eq!(outcome, MatchOutcome::Matched);
    assert_eq!(len, PACKET1.len());
}

#[test]
fn test_every_prefix_is_undecided_or_correct() {
    let m = matcher(&MatcherConfig::default().with_alpn(["custom"]));

    for len in (0..PACKET2.len()).step_by(37) {
        match m.evaluate(&PACKET2[..len]) {
            MatchOutcome::NeedMoreData(needed) => assert!(needed > len),
            other => panic!("prefix of {len} bytes decided early: {other:?}"),
        }
    }
    assert_eq!(m.evaluate(PACKET2), MatchOutcome::Matched);
}

#[test]
fn test_evaluation_is_idempotent() {
    let m = matcher(&MatcherConfig::default().with_alpn(["h3"]));

    for packet in CAPTURED {
        for len in [0, 3, 600, packet.len()] {
            let first = m.evaluate(&packet[..len]);
            let second = m.evaluate(&packet[..len]);
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_matcher_shared_across_threads() {
    let m = std::sync::Arc::new(matcher(&MatcherConfig::default().with_sni(["example.com"])));

    let handles: Vec<_> = CAPTURED
        .iter()
        .map(|packet| {
            let m = std::sync::Arc::clone(&m);
            let packet = packet.to_vec();
            std::thread::spawn(move || m.matches_datagram(&packet))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

// ============================================================================
// Other versions and packet layouts
// ============================================================================

#[test]
fn test_synthetic_initials_match_criteria() {
    let m = matcher(
        &MatcherConfig::default()
            .with_sni(["example.com"])
            .with_alpn(["h3-29"]),
    );

    for (name, packet) in [
        ("v2", V2_INITIAL),
        ("draft-29", DRAFT29_INITIAL),
        ("split CRYPTO", SPLIT_CRYPTO),
        ("token", WITH_TOKEN),
        ("coalesced", COALESCED_HANDSHAKE),
    ] {
        assert!(m.matches_datagram(packet), "{name} should match");
    }
}

#[test]
fn test_unreadable_client_hello_matches_only_without_criteria() {
    let m = matcher(&MatcherConfig::default().with_sni(["example.com"]));

    for packet in [PARTIAL_CLIENT_HELLO, CRYPTO_GAP] {
        assert!(QuicMatcher::any().matches_datagram(packet));
        assert_eq!(m.evaluate(packet), MatchOutcome::NotMatched);
    }
}

#[test]
fn test_coalesced_with_foreign_dcid_rejected() {
    let mut mutated = COALESCED_HANDSHAKE.to_vec();
    // The trailing Handshake packet is the last 57 bytes; its DCID starts
    // after the first byte, version and length byte.
    let trailer = mutated.len() - 57;
    mutated[trailer + 6] ^= 0xff;
    assert!(!QuicMatcher::any().matches_datagram(&mutated));
}
