// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST implementation of the [`Store`] trait against a PostgREST-style
//! persistence service (Supabase).
//!
//! Atomicity of the conditional writes rides on the server: the accept is a
//! compound-filter PATCH (`id=eq.X&status=eq.pending`) with
//! `Prefer: return=representation`, so an empty representation means the row
//! was not pending at the server. The dedup insert uses
//! `Prefer: resolution=ignore-duplicates` the same way.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;

use mesh_core::types::{
    AcceptOutcome, Deal, Intent, IntentStatus, Offer, Peer, ProcessedMessage,
};
use mesh_core::{MeshError, Store};

/// Store backed by a remote PostgREST endpoint.
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
}

impl RestStore {
    /// Build a client for `base_url` (the service root; `/rest/v1` is
    /// appended per table) authenticated with the service-role key.
    pub fn new(base_url: &str, service_role_key: &str) -> Result<Self, MeshError> {
        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(service_role_key)
            .map_err(|e| MeshError::Config(format!("invalid service role key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_role_key}"))
            .map_err(|e| MeshError::Config(format!("invalid service role key: {e}")))?;
        headers.insert("apikey", key_value);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(MeshError::storage)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn expect_ok(resp: reqwest::Response) -> Result<reqwest::Response, MeshError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(MeshError::Storage {
            source: format!("rest backend returned {status}: {body}").into(),
        })
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, MeshError> {
        let resp = self
            .http
            .get(self.table_url(table))
            .query(query)
            .send()
            .await
            .map_err(MeshError::storage)?;
        Self::expect_ok(resp)
            .await?
            .json()
            .await
            .map_err(MeshError::storage)
    }

    /// Upsert one row via `Prefer: resolution=merge-duplicates`.
    async fn upsert_row<T: serde::Serialize>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<(), MeshError> {
        let resp = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await
            .map_err(MeshError::storage)?;
        Self::expect_ok(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for RestStore {
    async fn upsert_peer(&self, peer: Peer) -> Result<(), MeshError> {
        // created_at must survive refresh, so refresh is a PATCH that
        // simply omits it.
        let existing: Vec<Peer> = self
            .fetch_rows("peers", &[("address", format!("eq.{}", peer.address))])
            .await?;
        if existing.is_empty() {
            return self.upsert_row("peers", &peer).await;
        }

        let patch = serde_json::json!({
            "skills": peer.skills,
            "min_fee": peer.min_fee,
            "response_time": peer.response_time,
            "reputation": peer.reputation,
            "stake": peer.stake,
            "stake_age_seconds": peer.stake_age_seconds,
            "reply_chat": peer.reply_chat,
            "last_seen": peer.last_seen,
            "updated_at": peer.updated_at,
        });
        let resp = self
            .http
            .patch(self.table_url("peers"))
            .query(&[("address", format!("eq.{}", peer.address))])
            .json(&patch)
            .send()
            .await
            .map_err(MeshError::storage)?;
        Self::expect_ok(resp).await?;
        Ok(())
    }

    async fn get_peer(&self, address: &str) -> Result<Option<Peer>, MeshError> {
        let rows: Vec<Peer> = self
            .fetch_rows("peers", &[("address", format!("eq.{address}"))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_peers(&self) -> Result<Vec<Peer>, MeshError> {
        self.fetch_rows("peers", &[("order", "last_seen.desc".to_string())])
            .await
    }

    async fn save_intent(&self, intent: Intent) -> Result<(), MeshError> {
        let resp = self
            .http
            .post(self.table_url("intents"))
            .header("Prefer", "resolution=ignore-duplicates")
            .json(&[&intent])
            .send()
            .await
            .map_err(MeshError::storage)?;
        Self::expect_ok(resp).await?;
        Ok(())
    }

    async fn get_intent(&self, id: &str) -> Result<Option<Intent>, MeshError> {
        let rows: Vec<Intent> = self
            .fetch_rows("intents", &[("id", format!("eq.{id}"))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_intents(&self, status: Option<IntentStatus>) -> Result<Vec<Intent>, MeshError> {
        let mut query = vec![("order", "created_at.asc".to_string())];
        if let Some(status) = status {
            query.push(("status", format!("eq.{status}")));
        }
        self.fetch_rows("intents", &query).await
    }

    async fn update_intent_status(
        &self,
        id: &str,
        status: IntentStatus,
        now: i64,
    ) -> Result<bool, MeshError> {
        let required_prior = match status {
            IntentStatus::Expired => IntentStatus::Pending,
            IntentStatus::Settled => IntentStatus::Accepted,
            IntentStatus::Pending | IntentStatus::Accepted => {
                return Err(MeshError::Precondition(format!(
                    "illegal direct transition to {status}; accepted goes through accept_intent_offer"
                )))
            }
        };
        let resp = self
            .http
            .patch(self.table_url("intents"))
            .query(&[
                ("id", format!("eq.{id}")),
                ("status", format!("eq.{required_prior}")),
            ])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "status": status, "updated_at": now }))
            .send()
            .await
            .map_err(MeshError::storage)?;
        let rows: Vec<Intent> = Self::expect_ok(resp)
            .await?
            .json()
            .await
            .map_err(MeshError::storage)?;
        Ok(!rows.is_empty())
    }

    async fn accept_intent_offer(
        &self,
        intent_id: &str,
        offer_id: &str,
        executor: &str,
        now: i64,
    ) -> Result<AcceptOutcome, MeshError> {
        let resp = self
            .http
            .patch(self.table_url("intents"))
            .query(&[
                ("id", format!("eq.{intent_id}")),
                ("status", "eq.pending".to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "status": IntentStatus::Accepted,
                "accepted_offer_id": offer_id,
                "selected_executor": executor,
                "updated_at": now,
            }))
            .send()
            .await
            .map_err(MeshError::storage)?;
        let rows: Vec<Intent> = Self::expect_ok(resp)
            .await?
            .json()
            .await
            .map_err(MeshError::storage)?;
        if !rows.is_empty() {
            return Ok(AcceptOutcome::Accepted);
        }

        // Nothing matched the compound filter: distinguish a missing intent
        // from one that already left pending.
        match self.get_intent(intent_id).await? {
            Some(_) => Ok(AcceptOutcome::NotPending),
            None => Ok(AcceptOutcome::NotFound),
        }
    }

    async fn record_offer(&self, offer: Offer) -> Result<(), MeshError> {
        self.upsert_row("offers", &offer).await
    }

    async fn list_offers_for_intent(&self, intent_id: &str) -> Result<Vec<Offer>, MeshError> {
        self.fetch_rows(
            "offers",
            &[
                ("intent_id", format!("eq.{intent_id}")),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn save_deal(&self, deal: Deal) -> Result<(), MeshError> {
        self.upsert_row("deals", &deal).await
    }

    async fn get_deal(&self, intent_id: &str) -> Result<Option<Deal>, MeshError> {
        let rows: Vec<Deal> = self
            .fetch_rows("deals", &[("intent_id", format!("eq.{intent_id}"))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_deals(&self) -> Result<Vec<Deal>, MeshError> {
        self.fetch_rows("deals", &[("order", "settled_at.desc.nullslast".to_string())])
            .await
    }

    async fn expire_intents(&self, now: i64) -> Result<Vec<Intent>, MeshError> {
        let resp = self
            .http
            .patch(self.table_url("intents"))
            .query(&[
                ("status", "eq.pending".to_string()),
                ("deadline", format!("lt.{now}")),
            ])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "status": IntentStatus::Expired,
                "updated_at": now,
            }))
            .send()
            .await
            .map_err(MeshError::storage)?;
        Self::expect_ok(resp)
            .await?
            .json()
            .await
            .map_err(MeshError::storage)
    }

    async fn mark_processed_message(&self, msg: ProcessedMessage) -> Result<bool, MeshError> {
        let resp = self
            .http
            .post(self.table_url("processed_messages"))
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&[&msg])
            .send()
            .await
            .map_err(MeshError::storage)?;
        if resp.status() == StatusCode::CONFLICT {
            // Servers without ignore-duplicates support answer 409.
            return Ok(false);
        }
        let rows: Vec<ProcessedMessage> = Self::expect_ok(resp)
            .await?
            .json()
            .await
            .map_err(MeshError::storage)?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::matchers::{header, headers, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pending_intent_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "from_address": "EQX",
            "skill": "analytics",
            "payload": {},
            "budget": "1.0",
            "deadline": 1_900_000_000i64,
            "min_reputation": 0,
            "status": "pending",
            "accepted_offer_id": null,
            "selected_executor": null,
            "created_at": 1_899_999_000i64,
            "updated_at": 1_899_999_000i64,
        })
    }

    #[tokio::test]
    async fn accept_uses_compound_filter_and_wins_on_representation() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/intents"))
            .and(query_param("id", "eq.i1"))
            .and(query_param("status", "eq.pending"))
            .and(header("Prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![pending_intent_json("i1")]))
            .mount(&server)
            .await;

        let store = RestStore::new(&server.uri(), "svc-key").unwrap();
        let outcome = store
            .accept_intent_offer("i1", "i1:EQY:1", "EQY", 1_900_000_000)
            .await
            .unwrap();
        assert_eq!(outcome, AcceptOutcome::Accepted);
    }

    #[tokio::test]
    async fn accept_empty_representation_resolves_not_pending() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/intents"))
            .and(query_param("id", "eq.i1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![pending_intent_json("i1")]))
            .mount(&server)
            .await;

        let store = RestStore::new(&server.uri(), "svc-key").unwrap();
        let outcome = store
            .accept_intent_offer("i1", "i1:EQY:1", "EQY", 1_900_000_000)
            .await
            .unwrap();
        assert_eq!(outcome, AcceptOutcome::NotPending);
    }

    #[tokio::test]
    async fn accept_missing_intent_resolves_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
            .mount(&server)
            .await;

        let store = RestStore::new(&server.uri(), "svc-key").unwrap();
        let outcome = store
            .accept_intent_offer("gone", "x", "EQY", 1)
            .await
            .unwrap();
        assert_eq!(outcome, AcceptOutcome::NotFound);
    }

    #[tokio::test]
    async fn dedup_insert_reports_ignored_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/processed_messages"))
            .and(headers(
                "Prefer",
                vec!["resolution=ignore-duplicates", "return=representation"],
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(Vec::<serde_json::Value>::new()))
            .mount(&server)
            .await;

        let store = RestStore::new(&server.uri(), "svc-key").unwrap();
        let inserted = store
            .mark_processed_message(ProcessedMessage {
                key: "consumer:EQX:tg:1:2".into(),
                message_type: "beacon".into(),
                source_chat_id: Some("1".into()),
                source_message_id: Some("2".into()),
                payload_hash: "deadbeef".into(),
                first_seen_at: 1_900_000_000,
            })
            .await
            .unwrap();
        assert!(!inserted, "empty representation means duplicate");
    }

    #[tokio::test]
    async fn requests_carry_service_role_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/peers"))
            .and(header("apikey", "svc-key"))
            .and(header("authorization", "Bearer svc-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
            .mount(&server)
            .await;

        let store = RestStore::new(&server.uri(), "svc-key").unwrap();
        assert!(store.list_peers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expire_returns_transitioned_rows() {
        let server = MockServer::start().await;
        let mut expired = pending_intent_json("i9");
        expired["status"] = serde_json::json!("expired");
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/intents"))
            .and(query_param("status", "eq.pending"))
            .and(query_param("deadline", "lt.1900000100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![expired]))
            .mount(&server)
            .await;

        let store = RestStore::new(&server.uri(), "svc-key").unwrap();
        let rows = store.expire_intents(1_900_000_100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, IntentStatus::Expired);
        assert_eq!(rows[0].budget, bigdecimal::BigDecimal::from_str("1.0").unwrap());
    }
}
