// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock access. Everything in the engine stamps unix-seconds from
//! here so the convention lives in one place.

/// Current unix time in whole seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current unix time in milliseconds, for sub-second gates like the
/// opportunistic expiry sweep.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
