// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test fixtures shared across the MESH workspace: a mock transport with
//! injectable inbound events and captured sends, and a scripted chain for
//! settlement verification.

pub mod mock_chain;
pub mod mock_transport;

pub use mock_chain::MockChain;
pub use mock_transport::{MockTransport, SentMessage};
