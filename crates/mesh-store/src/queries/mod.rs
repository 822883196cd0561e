// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed per-table CRUD operations for the SQLite backend.

pub mod deals;
pub mod intents;
pub mod offers;
pub mod peers;
pub mod processed;

use std::str::FromStr;

use bigdecimal::BigDecimal;
use rusqlite::types::Type;

/// Parse a TEXT column into a decimal amount.
pub(crate) fn decimal_col(idx: usize, text: String) -> rusqlite::Result<BigDecimal> {
    BigDecimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a TEXT column holding a JSON value.
pub(crate) fn json_col(idx: usize, text: String) -> rusqlite::Result<serde_json::Value> {
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a TEXT column holding a JSON array of strings.
pub(crate) fn string_vec_col(idx: usize, text: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a TEXT column into any string-backed enum.
pub(crate) fn enum_col<T: FromStr>(idx: usize, text: String) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
