// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for offer ETA strings.

/// Parse a duration string of the form `"<num>[unit]"` into seconds.
///
/// Accepted units: `ms`, `s`, `sec`, `secs`, `m`, `min`, `mins`, `h`, `hr`,
/// `hrs`; no unit means seconds. Anything unparseable yields `0.0`, which
/// the ranker treats as "unknown, assume max speed".
pub fn parse_eta_seconds(eta: &str) -> f64 {
    let trimmed = eta.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (num, unit) = trimmed.split_at(split);

    let value: f64 = match num.parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };

    let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "s" | "sec" | "secs" => 1.0,
        "ms" => 0.001,
        "m" | "min" | "mins" => 60.0,
        "h" | "hr" | "hrs" => 3600.0,
        _ => return 0.0,
    };

    let seconds = value * multiplier;
    if seconds.is_finite() && seconds >= 0.0 {
        seconds
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::parse_eta_seconds;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_eta_seconds("5s"), 5.0);
        assert_eq!(parse_eta_seconds("5"), 5.0);
        assert_eq!(parse_eta_seconds("30sec"), 30.0);
        assert_eq!(parse_eta_seconds("30secs"), 30.0);
        assert_eq!(parse_eta_seconds("1500ms"), 1.5);
        assert_eq!(parse_eta_seconds("2m"), 120.0);
        assert_eq!(parse_eta_seconds("2min"), 120.0);
        assert_eq!(parse_eta_seconds("2mins"), 120.0);
        assert_eq!(parse_eta_seconds("1h"), 3600.0);
        assert_eq!(parse_eta_seconds("1hr"), 3600.0);
        assert_eq!(parse_eta_seconds("2hrs"), 7200.0);
    }

    #[test]
    fn tolerates_whitespace_and_case() {
        assert_eq!(parse_eta_seconds(" 5S "), 5.0);
        assert_eq!(parse_eta_seconds("2 M"), 120.0);
    }

    #[test]
    fn fractional_values() {
        assert_eq!(parse_eta_seconds("1.5h"), 5400.0);
        assert_eq!(parse_eta_seconds("0.5s"), 0.5);
    }

    #[test]
    fn unparseable_means_unknown() {
        assert_eq!(parse_eta_seconds(""), 0.0);
        assert_eq!(parse_eta_seconds("soon"), 0.0);
        assert_eq!(parse_eta_seconds("5d"), 0.0);
        assert_eq!(parse_eta_seconds("five"), 0.0);
        assert_eq!(parse_eta_seconds("1.2.3s"), 0.0);
    }
}
