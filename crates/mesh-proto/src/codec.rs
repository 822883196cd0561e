// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse and serialize the `MESH:` wire framing.
//!
//! A MESH message is a single text line `MESH: <json>`. The prefix is
//! literal and case-sensitive, with at most one space before the JSON
//! object. Anything that fails framing, JSON parsing, field typing, or the
//! per-kind range checks is protocol noise and parses to `None`.

use crate::message::MeshMessage;

/// Literal, case-sensitive wire prefix.
pub const WIRE_PREFIX: &str = "MESH:";

/// Parse one line of chat text into a sanitized message.
///
/// Returns `None` for anything other than a fully valid MESH line. Extra
/// JSON fields are silently dropped by the typed reconstruction, so
/// `serialize(parse(t))` is the canonical form of `t`.
pub fn parse(text: &str) -> Option<MeshMessage> {
    let rest = text.strip_prefix(WIRE_PREFIX)?;
    let json = rest.strip_prefix(' ').unwrap_or(rest);
    if json.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }

    let msg: MeshMessage = serde_json::from_str(json).ok()?;
    validate(&msg).then_some(msg)
}

/// Serialize a message to its wire line.
pub fn serialize(msg: &MeshMessage) -> String {
    // Infallible: MeshMessage contains no non-serializable values.
    let json = serde_json::to_string(msg).unwrap_or_default();
    format!("{WIRE_PREFIX} {json}")
}

/// Per-kind range checks beyond what the typed decode enforces.
fn validate(msg: &MeshMessage) -> bool {
    match msg {
        MeshMessage::Intent(m) => {
            m.deadline > 0
                && m.min_reputation >= 0
                && (m.payload.is_object() || m.payload.is_array())
        }
        MeshMessage::Settle(m) => (1..=10).contains(&m.rating),
        MeshMessage::Beacon(_)
        | MeshMessage::Offer(_)
        | MeshMessage::Accept(_)
        | MeshMessage::Dispute(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::*;
    use bigdecimal::BigDecimal;
    use mesh_core::types::DealOutcome;
    use std::str::FromStr;

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_messages() -> Vec<MeshMessage> {
        vec![
            MeshMessage::Beacon(BeaconMsg {
                v: "1.0".into(),
                from: "EQX".into(),
                skills: vec!["analytics".into(), "scraping".into()],
                min_fee: Some(amount("0.1")),
                response_time: Some("~5s".into()),
                stake: Some(amount("2")),
                reply_chat: None,
            }),
            MeshMessage::Intent(IntentMsg {
                v: "1.0".into(),
                id: "i1".into(),
                from: "EQX".into(),
                skill: "analytics".into(),
                budget: amount("1.0"),
                deadline: 1_900_000_000,
                min_reputation: 50,
                payload: serde_json::json!({"query": "daily volume"}),
            }),
            MeshMessage::Offer(OfferMsg {
                v: "1.0".into(),
                intent_id: "i1".into(),
                from: "EQY".into(),
                fee: amount("0.75"),
                eta: "5s".into(),
                reputation: Some(100),
                escrow_address: None,
            }),
            MeshMessage::Accept(AcceptMsg {
                v: "1.0".into(),
                intent_id: "i1".into(),
                from: "EQX".into(),
                to: "EQY".into(),
                fee: amount("0.75"),
                selected_at: Some(1_900_000_060),
            }),
            MeshMessage::Settle(SettleMsg {
                v: "1.0".into(),
                intent_id: "i1".into(),
                from: "EQY".into(),
                tx_hash: "0xabc".into(),
                outcome: DealOutcome::Success,
                rating: 9,
            }),
            MeshMessage::Dispute(DisputeMsg {
                v: "1.0".into(),
                intent_id: "i1".into(),
                from: "EQX".into(),
                against: "EQY".into(),
                reason: Some("deliverable empty".into()),
                evidence_tx: None,
            }),
        ]
    }

    #[test]
    fn round_trip_preserves_every_kind() {
        for msg in sample_messages() {
            let wire = serialize(&msg);
            let back = parse(&wire).expect("round trip must parse");
            assert_eq!(back, msg, "kind {}", msg.kind());
        }
    }

    #[test]
    fn parse_is_idempotent_through_serialize() {
        let noisy = r#"MESH: {"type":"offer","intentId":"i1","from":"EQY","fee":"0.5","eta":"2m","debug":true,"nonce":42}"#;
        let first = parse(noisy).unwrap();
        let second = parse(&serialize(&first)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn extra_fields_are_dropped() {
        let wire = r#"MESH: {"type":"beacon","from":"EQX","skills":["a"],"shoeSize":44}"#;
        let msg = parse(wire).unwrap();
        assert!(!serialize(&msg).contains("shoeSize"));
    }

    #[test]
    fn version_defaults_when_absent() {
        let msg = parse(r#"MESH: {"type":"beacon","from":"EQX","skills":[]}"#).unwrap();
        match msg {
            MeshMessage::Beacon(b) => assert_eq!(b.v, "1.0"),
            other => panic!("unexpected kind {}", other.kind()),
        }
    }

    #[test]
    fn prefix_is_literal_and_case_sensitive() {
        assert!(parse(r#"mesh: {"type":"beacon","from":"EQX","skills":[]}"#).is_none());
        assert!(parse(r#"MESH {"type":"beacon","from":"EQX","skills":[]}"#).is_none());
        assert!(parse(r#"{"type":"beacon","from":"EQX","skills":[]}"#).is_none());
    }

    #[test]
    fn at_most_one_space_after_prefix() {
        assert!(parse(r#"MESH:{"type":"beacon","from":"EQX","skills":[]}"#).is_some());
        assert!(parse(r#"MESH: {"type":"beacon","from":"EQX","skills":[]}"#).is_some());
        assert!(parse(r#"MESH:  {"type":"beacon","from":"EQX","skills":[]}"#).is_none());
    }

    #[test]
    fn unknown_type_is_noise() {
        assert!(parse(r#"MESH: {"type":"gossip","from":"EQX"}"#).is_none());
    }

    #[test]
    fn missing_required_fields_are_noise() {
        // offer without eta
        assert!(parse(r#"MESH: {"type":"offer","intentId":"i1","from":"EQY","fee":"0.5"}"#).is_none());
        // intent without minReputation
        assert!(parse(
            r#"MESH: {"type":"intent","id":"i1","from":"EQX","skill":"a","budget":"1","deadline":99}"#
        )
        .is_none());
    }

    #[test]
    fn type_errors_are_noise() {
        // skills must be an array of strings
        assert!(parse(r#"MESH: {"type":"beacon","from":"EQX","skills":"analytics"}"#).is_none());
        // deadline must be an integer
        assert!(parse(
            r#"MESH: {"type":"intent","id":"i1","from":"EQX","skill":"a","budget":"1","deadline":"soon","minReputation":0}"#
        )
        .is_none());
    }

    #[test]
    fn range_checks_reject_out_of_band_values() {
        assert!(parse(
            r#"MESH: {"type":"intent","id":"i1","from":"EQX","skill":"a","budget":"1","deadline":0,"minReputation":0}"#
        )
        .is_none());
        assert!(parse(
            r#"MESH: {"type":"intent","id":"i1","from":"EQX","skill":"a","budget":"1","deadline":9,"minReputation":-1}"#
        )
        .is_none());
        assert!(parse(
            r#"MESH: {"type":"settle","intentId":"i1","from":"EQY","txHash":"abc","outcome":"success","rating":11}"#
        )
        .is_none());
        assert!(parse(
            r#"MESH: {"type":"settle","intentId":"i1","from":"EQY","txHash":"abc","outcome":"success","rating":0}"#
        )
        .is_none());
    }

    #[test]
    fn payload_must_be_structured() {
        assert!(parse(
            r#"MESH: {"type":"intent","id":"i1","from":"EQX","skill":"a","budget":"1","deadline":9,"minReputation":0,"payload":"text"}"#
        )
        .is_none());
        let defaulted = parse(
            r#"MESH: {"type":"intent","id":"i1","from":"EQX","skill":"a","budget":"1","deadline":9,"minReputation":0}"#,
        )
        .unwrap();
        match defaulted {
            MeshMessage::Intent(i) => assert!(i.payload.as_object().unwrap().is_empty()),
            other => panic!("unexpected kind {}", other.kind()),
        }
    }

    #[test]
    fn garbage_is_noise_not_panic() {
        for line in ["", "MESH:", "MESH: ", "MESH: {", "MESH: 42", "MESH: []", "hello"] {
            assert!(parse(line).is_none(), "line {line:?}");
        }
    }
}
