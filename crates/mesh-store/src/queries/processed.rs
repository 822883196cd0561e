// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processed-message dedup set.

use mesh_core::types::ProcessedMessage;
use mesh_core::MeshError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Insert-ignore on the dedup key. Returns `true` only when the row was
/// actually inserted.
pub async fn mark_processed_message(
    db: &Database,
    msg: ProcessedMessage,
) -> Result<bool, MeshError> {
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO processed_messages
                    (key, message_type, source_chat_id, source_message_id,
                     payload_hash, first_seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.key,
                    msg.message_type,
                    msg.source_chat_id,
                    msg.source_message_id,
                    msg.payload_hash,
                    msg.first_seen_at,
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}
