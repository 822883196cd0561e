// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offer audit-trail operations.

use mesh_core::types::Offer;
use mesh_core::MeshError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::queries::decimal_col;

const OFFER_COLUMNS: &str = "id, intent_id, from_address, fee, eta, reputation, \
                             stake_age_seconds, escrow_address, created_at";

fn offer_from_row(row: &Row) -> rusqlite::Result<Offer> {
    Ok(Offer {
        id: row.get(0)?,
        intent_id: row.get(1)?,
        from_address: row.get(2)?,
        fee: decimal_col(3, row.get::<_, String>(3)?)?,
        eta: row.get(4)?,
        reputation: row.get(5)?,
        stake_age_seconds: row.get(6)?,
        escrow_address: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub async fn record_offer(db: &Database, offer: Offer) -> Result<(), MeshError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO offers
                    (id, intent_id, from_address, fee, eta, reputation,
                     stake_age_seconds, escrow_address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    offer.id,
                    offer.intent_id,
                    offer.from_address,
                    offer.fee.to_string(),
                    offer.eta,
                    offer.reputation,
                    offer.stake_age_seconds,
                    offer.escrow_address,
                    offer.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Offers for an intent, oldest first.
pub async fn list_offers_for_intent(
    db: &Database,
    intent_id: &str,
) -> Result<Vec<Offer>, MeshError> {
    let intent_id = intent_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OFFER_COLUMNS} FROM offers
                 WHERE intent_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![intent_id], offer_from_row)?;
            let mut offers = Vec::new();
            for row in rows {
                offers.push(row?);
            }
            Ok(offers)
        })
        .await
        .map_err(map_tr_err)
}
