// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deal record operations: pre-seeded on accept, finalized on settle.

use mesh_core::types::Deal;
use mesh_core::MeshError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};
use crate::queries::decimal_col;

const DEAL_COLUMNS: &str =
    "intent_id, executor_address, fee, tx_hash, outcome, rating, settled_at, updated_at";

fn deal_from_row(row: &Row) -> rusqlite::Result<Deal> {
    let outcome: Option<String> = row.get(4)?;
    let outcome = outcome
        .map(|text| crate::queries::enum_col(4, text))
        .transpose()?;
    Ok(Deal {
        intent_id: row.get(0)?,
        executor_address: row.get(1)?,
        fee: decimal_col(2, row.get::<_, String>(2)?)?,
        tx_hash: row.get(3)?,
        outcome,
        rating: row.get(5)?,
        settled_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Upsert the deal row keyed by intent id.
pub async fn save_deal(db: &Database, deal: Deal) -> Result<(), MeshError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO deals
                    (intent_id, executor_address, fee, tx_hash, outcome, rating,
                     settled_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(intent_id) DO UPDATE SET
                    executor_address = excluded.executor_address,
                    fee = excluded.fee,
                    tx_hash = excluded.tx_hash,
                    outcome = excluded.outcome,
                    rating = excluded.rating,
                    settled_at = excluded.settled_at,
                    updated_at = excluded.updated_at",
                params![
                    deal.intent_id,
                    deal.executor_address,
                    deal.fee.to_string(),
                    deal.tx_hash,
                    deal.outcome.map(|o| o.to_string()),
                    deal.rating,
                    deal.settled_at,
                    deal.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_deal(db: &Database, intent_id: &str) -> Result<Option<Deal>, MeshError> {
    let intent_id = intent_id.to_string();
    db.connection()
        .call(move |conn| {
            let deal = conn
                .query_row(
                    &format!("SELECT {DEAL_COLUMNS} FROM deals WHERE intent_id = ?1"),
                    params![intent_id],
                    deal_from_row,
                )
                .optional()?;
            Ok(deal)
        })
        .await
        .map_err(map_tr_err)
}

/// All deals, most recently settled first; unsettled rows sort last.
pub async fn list_deals(db: &Database) -> Result<Vec<Deal>, MeshError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEAL_COLUMNS} FROM deals ORDER BY settled_at DESC"
            ))?;
            let rows = stmt.query_map([], deal_from_row)?;
            let mut deals = Vec::new();
            for row in rows {
                deals.push(row?);
            }
            Ok(deals)
        })
        .await
        .map_err(map_tr_err)
}
