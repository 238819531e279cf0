//! Display helpers for hashes, ages, statuses and tx labels

use chrono::{DateTime, NaiveDateTime, Utc};

pub const DEFAULT_TRUNCATE: usize = 5;

/// Coarse age of `timestamp` relative to `now`.
///
/// Buckets: under a minute, minutes below 60, hours below 24, then days.
/// `short` selects the compact unit names used in dense tables.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>, short: bool) -> String {
    let delta = now.signed_duration_since(timestamp);
    let minutes = delta.num_minutes();
    let hours = delta.num_hours();
    let days = delta.num_days();

    if minutes < 1 {
        return if short { "now" } else { "Just now" }.to_string();
    }
    if minutes < 60 {
        let unit = if short { "min" } else { "minute" };
        let plural = if minutes > 1 { "s" } else { "" };
        return format!("{minutes} {unit}{plural} ago");
    }
    if hours < 24 {
        return format!("{hours} {} ago", if short { "h" } else { "hour" });
    }
    format!("{days} {} ago", if short { "d" } else { "day" })
}

/// `first n...last n` characters; unchanged when the input has at most
/// `2 * n` characters
pub fn truncate(hash: &str, length: usize) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= length * 2 {
        return hash.to_string();
    }
    let start: String = chars[..length].iter().collect();
    let end: String = chars[chars.len() - length..].iter().collect();
    format!("{start}...{end}")
}

/// Status value as it arrives from the chain or from a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status<'a> {
    Label(&'a str),
    Code(u32),
}

/// Color class for a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Danger,
    Error,
    Neutral,
}

pub fn status_tone(status: Status<'_>) -> StatusTone {
    match status {
        Status::Label("success") => StatusTone::Success,
        Status::Label("pending") => StatusTone::Danger,
        Status::Label("error") => StatusTone::Error,
        Status::Code(0) => StatusTone::Success,
        Status::Code(1) => StatusTone::Error,
        _ => StatusTone::Neutral,
    }
}

/// Clean a human-readable tx type label.
///
/// Drops literal `\n` and `\uXXXX` escape text, anything outside printable
/// ASCII, every `&`, and one trailing `Response`, then trims.
pub fn sanitize_string(input: &str) -> String {
    let without_newlines = input.replace("\\n", "");
    let without_escapes = strip_unicode_escapes(&without_newlines);
    let printable: String = without_escapes
        .chars()
        .filter(|c| (' '..='~').contains(c) && *c != '&')
        .collect();
    let stripped = printable.strip_suffix("Response").unwrap_or(&printable);
    stripped.trim().to_string()
}

fn strip_unicode_escapes(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut copied_from = 0;
    while i < bytes.len() {
        let is_escape = bytes[i] == b'\\'
            && bytes.get(i + 1) == Some(&b'u')
            && bytes.len() >= i + 6
            && bytes[i + 2..i + 6].iter().all(u8::is_ascii_hexdigit);
        if is_escape {
            out.push_str(&input[copied_from..i]);
            i += 6;
            copied_from = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&input[copied_from..]);
    out
}

/// Upper-case the first letter, lower-case the rest
pub fn capitalize_first_letter(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}

/// Parse an RFC 3339 chain timestamp, keeping millisecond precision.
///
/// Tendermint emits nanosecond fractions; anything past three digits is
/// dropped rather than rounded.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let Some((date_part, fraction)) = raw.split_once('.') else {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    };
    let digits: String = fraction
        .chars()
        .take_while(char::is_ascii_digit)
        .take(3)
        .collect();
    let normalized = format!("{date_part}.{digits:0<3}");
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.3f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// `/cosmos.bank.v1beta1.MsgSend` -> `MsgSend`
pub fn short_type_url(type_url: &str) -> &str {
    type_url.rsplit('.').next().unwrap_or(type_url)
}
