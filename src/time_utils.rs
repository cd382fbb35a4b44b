// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.
//!
//! The Google Tasks API is not consistent about timestamp shapes: due
//! dates arrive as RFC3339 with or without fractional seconds, bare
//! dates, offset datetimes, or space-separated datetimes depending on
//! which client wrote the task. Everything is funneled through
//! [`normalize_timestamp`] into one canonical form before it reaches a
//! caller.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Normalize a remote timestamp string into the canonical
/// `YYYY-MM-DDTHH:MM:SSZ` form.
///
/// Known source formats are tried in a fixed order; the first match
/// wins. Values with timezone info are converted to UTC. Unparseable
/// input is passed through unchanged so callers never lose the raw
/// value.
pub fn normalize_timestamp(raw: &str) -> String {
    match parse_known_formats(raw) {
        Some(utc) => format_utc_rfc3339(utc),
        None => {
            tracing::debug!(value = raw, "Unrecognized timestamp format, passing through");
            raw.to_string()
        }
    }
}

fn parse_known_formats(raw: &str) -> Option<DateTime<Utc>> {
    // UTC ("Z" suffix), with then without fractional seconds.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    // Date-only: anchor at midday so a timezone conversion on display
    // cannot shift the date to the previous or next day.
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(12, 0, 0).map(|naive| naive.and_utc());
    }

    // Explicit numeric offset.
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    // Space-separated date-time, assumed UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    None
}
