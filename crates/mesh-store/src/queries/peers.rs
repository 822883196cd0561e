// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Peer registry operations.

use mesh_core::types::Peer;
use mesh_core::MeshError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};
use crate::queries::{decimal_col, string_vec_col};

fn peer_from_row(row: &Row) -> rusqlite::Result<Peer> {
    Ok(Peer {
        address: row.get(0)?,
        skills: string_vec_col(1, row.get::<_, String>(1)?)?,
        min_fee: decimal_col(2, row.get::<_, String>(2)?)?,
        response_time: row.get(3)?,
        reputation: row.get(4)?,
        stake: decimal_col(5, row.get::<_, String>(5)?)?,
        stake_age_seconds: row.get(6)?,
        reply_chat: row.get(7)?,
        last_seen: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const PEER_COLUMNS: &str = "address, skills, min_fee, response_time, reputation, stake, \
                            stake_age_seconds, reply_chat, last_seen, created_at, updated_at";

/// Insert a peer or refresh an existing one. `created_at` survives refresh.
pub async fn upsert_peer(db: &Database, peer: Peer) -> Result<(), MeshError> {
    db.connection()
        .call(move |conn| {
            let skills = serde_json::to_string(&peer.skills)
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            conn.execute(
                "INSERT INTO peers (address, skills, min_fee, response_time, reputation, stake,
                                    stake_age_seconds, reply_chat, last_seen, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(address) DO UPDATE SET
                    skills = excluded.skills,
                    min_fee = excluded.min_fee,
                    response_time = excluded.response_time,
                    reputation = excluded.reputation,
                    stake = excluded.stake,
                    stake_age_seconds = excluded.stake_age_seconds,
                    reply_chat = excluded.reply_chat,
                    last_seen = excluded.last_seen,
                    updated_at = excluded.updated_at",
                params![
                    peer.address,
                    skills,
                    peer.min_fee.to_string(),
                    peer.response_time,
                    peer.reputation,
                    peer.stake.to_string(),
                    peer.stake_age_seconds,
                    peer.reply_chat,
                    peer.last_seen,
                    peer.created_at,
                    peer.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_peer(db: &Database, address: &str) -> Result<Option<Peer>, MeshError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            let peer = conn
                .query_row(
                    &format!("SELECT {PEER_COLUMNS} FROM peers WHERE address = ?1"),
                    params![address],
                    peer_from_row,
                )
                .optional()?;
            Ok(peer)
        })
        .await
        .map_err(map_tr_err)
}

/// All peers, most recently seen first.
pub async fn list_peers(db: &Database) -> Result<Vec<Peer>, MeshError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PEER_COLUMNS} FROM peers ORDER BY last_seen DESC"
            ))?;
            let rows = stmt.query_map([], peer_from_row)?;
            let mut peers = Vec::new();
            for row in rows {
                peers.push(row?);
            }
            Ok(peers)
        })
        .await
        .map_err(map_tr_err)
}
