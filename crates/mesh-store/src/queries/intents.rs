// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent lifecycle operations, including the atomic accept.

use mesh_core::types::{AcceptOutcome, Intent, IntentStatus};
use mesh_core::MeshError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};
use crate::queries::{decimal_col, enum_col, json_col};

const INTENT_COLUMNS: &str = "id, from_address, skill, payload, budget, deadline, \
                              min_reputation, status, accepted_offer_id, selected_executor, \
                              created_at, updated_at";

pub(crate) fn intent_from_row(row: &Row) -> rusqlite::Result<Intent> {
    Ok(Intent {
        id: row.get(0)?,
        from_address: row.get(1)?,
        skill: row.get(2)?,
        payload: json_col(3, row.get::<_, String>(3)?)?,
        budget: decimal_col(4, row.get::<_, String>(4)?)?,
        deadline: row.get(5)?,
        min_reputation: row.get(6)?,
        status: enum_col(7, row.get::<_, String>(7)?)?,
        accepted_offer_id: row.get(8)?,
        selected_executor: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Insert the intent if absent; an existing row is left untouched.
pub async fn save_intent(db: &Database, intent: Intent) -> Result<(), MeshError> {
    db.connection()
        .call(move |conn| {
            let payload = serde_json::to_string(&intent.payload)
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            conn.execute(
                "INSERT OR IGNORE INTO intents
                    (id, from_address, skill, payload, budget, deadline, min_reputation,
                     status, accepted_offer_id, selected_executor, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    intent.id,
                    intent.from_address,
                    intent.skill,
                    payload,
                    intent.budget.to_string(),
                    intent.deadline,
                    intent.min_reputation,
                    intent.status.to_string(),
                    intent.accepted_offer_id,
                    intent.selected_executor,
                    intent.created_at,
                    intent.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_intent(db: &Database, id: &str) -> Result<Option<Intent>, MeshError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let intent = conn
                .query_row(
                    &format!("SELECT {INTENT_COLUMNS} FROM intents WHERE id = ?1"),
                    params![id],
                    intent_from_row,
                )
                .optional()?;
            Ok(intent)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_intents(
    db: &Database,
    status: Option<IntentStatus>,
) -> Result<Vec<Intent>, MeshError> {
    db.connection()
        .call(move |conn| {
            let mut intents = Vec::new();
            match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {INTENT_COLUMNS} FROM intents WHERE status = ?1
                         ORDER BY created_at ASC"
                    ))?;
                    let rows = stmt.query_map(params![status.to_string()], intent_from_row)?;
                    for row in rows {
                        intents.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {INTENT_COLUMNS} FROM intents ORDER BY created_at ASC"
                    ))?;
                    let rows = stmt.query_map([], intent_from_row)?;
                    for row in rows {
                        intents.push(row?);
                    }
                }
            }
            Ok(intents)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a legal lifecycle transition. `Expired` requires the row to still
/// be pending, `Settled` requires accepted. Returns whether a row changed.
pub async fn update_intent_status(
    db: &Database,
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
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE intents SET status = ?2, updated_at = ?3
                 WHERE id = ?1 AND status = ?4",
                params![id, status.to_string(), now, required_prior.to_string()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// The only atomic multi-field write in the system: conditionally move a
/// pending intent to accepted, recording the winning offer and executor.
pub async fn accept_intent_offer(
    db: &Database,
    intent_id: &str,
    offer_id: &str,
    executor: &str,
    now: i64,
) -> Result<AcceptOutcome, MeshError> {
    let intent_id = intent_id.to_string();
    let offer_id = offer_id.to_string();
    let executor = executor.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let prior: Option<String> = tx
                .query_row(
                    "SELECT status FROM intents WHERE id = ?1",
                    params![intent_id],
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = match prior.as_deref() {
                None => AcceptOutcome::NotFound,
                Some("pending") => {
                    let changed = tx.execute(
                        "UPDATE intents
                         SET status = 'accepted', accepted_offer_id = ?2,
                             selected_executor = ?3, updated_at = ?4
                         WHERE id = ?1 AND status = 'pending'",
                        params![intent_id, offer_id, executor, now],
                    )?;
                    if changed > 0 {
                        AcceptOutcome::Accepted
                    } else {
                        AcceptOutcome::NotPending
                    }
                }
                Some(_) => AcceptOutcome::NotPending,
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Batch-expire pending intents whose deadline passed strictly before `now`.
/// Returns the transitioned rows.
pub async fn expire_intents(db: &Database, now: i64) -> Result<Vec<Intent>, MeshError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let ids: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM intents WHERE status = 'pending' AND deadline < ?1",
                )?;
                let rows = stmt.query_map(params![now], |row| row.get(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };

            let mut expired = Vec::new();
            for id in &ids {
                tx.execute(
                    "UPDATE intents SET status = 'expired', updated_at = ?2
                     WHERE id = ?1 AND status = 'pending'",
                    params![id, now],
                )?;
                let intent = tx.query_row(
                    &format!("SELECT {INTENT_COLUMNS} FROM intents WHERE id = ?1"),
                    params![id],
                    intent_from_row,
                )?;
                expired.push(intent);
            }
            tx.commit()?;
            Ok(expired)
        })
        .await
        .map_err(map_tr_err)
}
