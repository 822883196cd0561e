// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end coordination scenarios over the in-memory store, the mock
//! transport, and a scripted chain.
//!
//! The dedup-replay, concurrent-accept, and no-offer-expiry scenarios are
//! unit-tested next to the coordinator; here the full creator and executor
//! flows run against real wire lines.

use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;

use mesh_config::MeshConfig;
use mesh_core::time::now_ts;
use mesh_core::types::{DealOutcome, IntentStatus, VerifyFailReason};
use mesh_core::{MeshError, TransactionSource, TransportEvent};
use mesh_engine::Coordinator;
use mesh_proto::{AcceptMsg, IntentMsg, MeshMessage, OfferMsg};
use mesh_reputation::{HostAdapters, ReputationClient, TrustSettings};
use mesh_store::MemoryStore;
use mesh_test_utils::{MockChain, MockTransport};

fn amount(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

async fn agent(
    address: &str,
    chain: Option<Arc<MockChain>>,
) -> (Arc<Coordinator>, Arc<MockTransport>) {
    let mut config = MeshConfig::default();
    config.agent.address = address.to_string();
    config.agent.skills = vec!["analytics".to_string()];
    config.agent.min_fee = amount("0.1");
    config.agent.stake = amount("2");
    config.transport.mesh_group_id = "mesh-group".to_string();

    let adapters = HostAdapters {
        backend: None,
        verifier: None,
        tx_source: chain.map(|c| c as Arc<dyn TransactionSource>),
    };
    let transport = Arc::new(MockTransport::new());
    let coordinator = Arc::new(Coordinator::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(ReputationClient::new(
            TrustSettings {
                strict_chain: false,
                allow_local_fallback: true,
            },
            adapters,
        )),
        transport.clone(),
    ));
    (coordinator, transport)
}

fn event(message_id: &str, text: &str) -> TransportEvent {
    TransportEvent {
        chat_id: "mesh-group".to_string(),
        message_id: Some(message_id.to_string()),
        text: text.to_string(),
    }
}

fn offer_line(intent_id: &str, from: &str, fee: &str, reputation: i64) -> String {
    mesh_proto::serialize(&MeshMessage::Offer(OfferMsg {
        v: "1.0".to_string(),
        intent_id: intent_id.to_string(),
        from: from.to_string(),
        fee: amount(fee),
        eta: "5s".to_string(),
        reputation: Some(reputation),
        escrow_address: None,
    }))
}

fn intent_line(id: &str, from: &str, budget: &str, deadline: i64, min_rep: i64) -> String {
    mesh_proto::serialize(&MeshMessage::Intent(IntentMsg {
        v: "1.0".to_string(),
        id: id.to_string(),
        from: from.to_string(),
        skill: "analytics".to_string(),
        budget: amount(budget),
        deadline,
        min_reputation: min_rep,
        payload: serde_json::json!({}),
    }))
}

fn accept_line(intent_id: &str, from: &str, to: &str, fee: &str) -> String {
    mesh_proto::serialize(&MeshMessage::Accept(AcceptMsg {
        v: "1.0".to_string(),
        intent_id: intent_id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        fee: amount(fee),
        selected_at: Some(now_ts()),
    }))
}

/// The creator's half of the happy path: two competing bids, deadline
/// selection, and the reputation-weighted winner.
#[tokio::test]
async fn happy_path_creator_selects_the_higher_reputation_bid() {
    let (x, transport) = agent("EQX", None).await;

    // EQY is staked and known on chain; EQZ only has its offer snapshot.
    x.reputation()
        .register_agent("EQY", &amount("5"))
        .await
        .unwrap();

    let intent = x
        .broadcast(
            "analytics",
            serde_json::json!({"query": "daily volume"}),
            amount("1.0"),
            now_ts() + 1,
            50,
        )
        .await
        .unwrap();
    transport.clear_sent().await;

    x.ingest(&event("m1", &offer_line(&intent.id, "EQY", "0.75", 100)))
        .await
        .unwrap();
    x.ingest(&event("m2", &offer_line(&intent.id, "EQZ", "0.60", 70)))
        .await
        .unwrap();

    // wait_for_deadline defers selection.
    let stored = x.store().get_intent(&intent.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Pending);

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    x.tick().await;

    let stored = x.store().get_intent(&intent.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Accepted);
    assert_eq!(
        stored.selected_executor.as_deref(),
        Some("EQY"),
        "the reputation weight outranks EQZ's cheaper bid"
    );

    let accepts: Vec<AcceptMsg> = transport
        .sent_messages()
        .await
        .into_iter()
        .filter_map(|m| match mesh_proto::parse(&m.text) {
            Some(MeshMessage::Accept(a)) => Some(a),
            _ => None,
        })
        .collect();
    assert_eq!(accepts.len(), 1);
    assert_eq!(accepts[0].to, "EQY");
    assert_eq!(accepts[0].fee, amount("0.75"));

    let deal = x.store().get_deal(&intent.id).await.unwrap().unwrap();
    assert_eq!(deal.executor_address, "EQY");
    assert!(deal.outcome.is_none(), "pre-seeded, not settled");
}

/// The executor's half of the happy path: a verified payment settles the
/// deal and lifts the executor's reputation to 115.
#[tokio::test]
async fn happy_path_executor_settles_against_a_verified_payment() {
    let chain = Arc::new(MockChain::new());
    chain
        .add_inbound(MockChain::payment("0xabc", "EQX", "EQY", amount("0.75")))
        .await;

    let (y, transport) = agent("EQY", Some(chain)).await;
    y.register(vec!["analytics".to_string()], amount("0.1"), amount("5"))
        .await
        .unwrap();

    let deadline = now_ts() + 60;
    y.ingest(&event("m1", &intent_line("i1", "EQX", "1.0", deadline, 50)))
        .await
        .unwrap();
    y.ingest(&event("m2", &accept_line("i1", "EQX", "EQY", "0.75")))
        .await
        .unwrap();

    let stored = y.store().get_intent("i1").await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Accepted);
    transport.clear_sent().await;

    let deal = y
        .settle("i1", "0xabc", DealOutcome::Success, 9)
        .await
        .unwrap();
    assert_eq!(deal.outcome, Some(DealOutcome::Success));
    assert_eq!(deal.fee, amount("0.75"));

    assert_eq!(
        y.reputation().get_reputation("EQY").await.unwrap(),
        Some(115),
        "rating 9 adds 15 on top of the registration score"
    );
    let stored = y.store().get_intent("i1").await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Settled);

    let settles = transport
        .sent_messages()
        .await
        .into_iter()
        .filter(|m| matches!(mesh_proto::parse(&m.text), Some(MeshMessage::Settle(_))))
        .count();
    assert_eq!(settles, 1);
}

/// A payment from the wrong sender aborts the settle flow: no reputation
/// delta, no outbound settle message, intent still accepted.
#[tokio::test]
async fn settle_aborts_on_a_sender_mismatch() {
    let chain = Arc::new(MockChain::new());
    chain
        .add_inbound(MockChain::payment("0xbad", "EQW", "EQY", amount("0.75")))
        .await;

    let (y, transport) = agent("EQY", Some(chain)).await;
    y.register(vec!["analytics".to_string()], amount("0.1"), amount("5"))
        .await
        .unwrap();

    y.ingest(&event("m1", &intent_line("i1", "EQX", "1.0", now_ts() + 60, 50)))
        .await
        .unwrap();
    y.ingest(&event("m2", &accept_line("i1", "EQX", "EQY", "0.75")))
        .await
        .unwrap();
    transport.clear_sent().await;

    let err = y
        .settle("i1", "0xbad", DealOutcome::Success, 9)
        .await
        .unwrap_err();
    match err {
        MeshError::Verification { reason } => {
            assert_eq!(reason, VerifyFailReason::SenderMismatch)
        }
        other => panic!("expected verification failure, got {other}"),
    }

    assert_eq!(
        y.reputation().get_reputation("EQY").await.unwrap(),
        Some(100),
        "no reputation delta on failed verification"
    );
    let stored = y.store().get_intent("i1").await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Accepted);
    assert_eq!(transport.sent_count().await, 0, "no outbound settle message");
    let deal = y.store().get_deal("i1").await.unwrap().unwrap();
    assert!(deal.outcome.is_none());
}

/// Beacons from unknown or unstaked addresses never reach the peer list.
#[tokio::test]
async fn unstaked_beacons_never_reach_the_peer_list() {
    let (x, _transport) = agent("EQX", None).await;

    let beacon = mesh_proto::serialize(&MeshMessage::Beacon(mesh_proto::BeaconMsg {
        v: "1.0".to_string(),
        from: "EQW".to_string(),
        skills: vec!["analytics".to_string()],
        min_fee: Some(amount("0.1")),
        response_time: Some("~5s".to_string()),
        stake: Some(amount("3")),
        reply_chat: None,
    }));
    x.ingest(&event("m1", &beacon)).await.unwrap();

    let peers = x.peers().await.unwrap();
    assert!(
        !peers.iter().any(|p| p.address == "EQW"),
        "unstaked beacon must not create a peer"
    );
}

/// A settle broadcast from the executor updates the creator's local view:
/// deal finalized, executor score recorded, intent settled.
#[tokio::test]
async fn settle_broadcast_updates_the_creator_side() {
    let (x, transport) = agent("EQX", None).await;
    x.reputation()
        .register_agent("EQY", &amount("5"))
        .await
        .unwrap();

    let intent = x
        .broadcast("analytics", serde_json::json!({}), amount("1.0"), now_ts() + 1, 0)
        .await
        .unwrap();
    x.ingest(&event("m1", &offer_line(&intent.id, "EQY", "0.75", 100)))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    x.tick().await;
    transport.clear_sent().await;

    let settle = mesh_proto::serialize(&MeshMessage::Settle(mesh_proto::SettleMsg {
        v: "1.0".to_string(),
        intent_id: intent.id.clone(),
        from: "EQY".to_string(),
        tx_hash: "0xabc".to_string(),
        outcome: DealOutcome::Success,
        rating: 9,
    }));
    x.ingest(&event("m2", &settle)).await.unwrap();

    let stored = x.store().get_intent(&intent.id).await.unwrap().unwrap();
    assert_eq!(stored.status, IntentStatus::Settled);
    let deal = x.store().get_deal(&intent.id).await.unwrap().unwrap();
    assert_eq!(deal.outcome, Some(DealOutcome::Success));
    assert_eq!(deal.fee, amount("0.75"), "fee comes from the pre-seeded deal");
    assert_eq!(
        x.reputation().get_reputation("EQY").await.unwrap(),
        Some(115),
        "the creator's ledger applies the same outcome delta"
    );

    // Replaying the same settle in a fresh message is rejected without a
    // second delta.
    let replay = x.ingest(&event("m3", &settle)).await.unwrap();
    assert_eq!(
        replay,
        mesh_engine::IngestOutcome::Ignored {
            kind: "settle",
            reason: "outcome_replay"
        }
    );
    assert_eq!(
        x.reputation().get_reputation("EQY").await.unwrap(),
        Some(115)
    );
}
