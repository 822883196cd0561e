// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits: the seams between the coordination engine and its
//! replaceable backends.

pub mod chain;
pub mod store;
pub mod transport;

pub use chain::{ChainBackend, PaymentVerifier, TransactionSource};
pub use store::Store;
pub use transport::{Transport, TransportEvent};
