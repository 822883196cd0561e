// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence backends for the MESH coordination engine.
//!
//! Three implementations of [`mesh_core::Store`] with identical
//! externally-visible semantics: WAL-mode SQLite with embedded migrations
//! (`database_path` configured), a PostgREST-style REST service
//! (`supabase_url` + service-role key), and in-memory maps (nothing
//! configured; also the test default). The shared conformance suite lives
//! in `tests/conformance.rs`.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;
pub mod rest;
pub mod sqlite;

pub use database::Database;
pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;
