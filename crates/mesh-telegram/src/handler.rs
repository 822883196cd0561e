// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update filtering and conversion into transport events.
//!
//! Only text messages from the configured mesh group are forwarded; the
//! engine's codec handles any further noise.

use teloxide::types::Message;

use mesh_core::TransportEvent;

/// Whether the message belongs to the coordination group.
pub fn is_mesh_group(msg: &Message, mesh_group_id: &str) -> bool {
    msg.chat.id.0.to_string() == mesh_group_id
}

/// Convert a Telegram message into a transport event. Non-text messages
/// (stickers, media, service messages) return `None`.
pub fn to_event(msg: &Message) -> Option<TransportEvent> {
    let text = msg.text()?;
    Some(TransportEvent {
        chat_id: msg.chat.id.0.to_string(),
        message_id: Some(msg.id.0.to_string()),
        text: text.to_string(),
    })
}
