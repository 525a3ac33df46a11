pub mod farmer;
pub mod grant;
pub mod search;

/// Current time in the fixed RFC 3339 form used for every stored timestamp.
///
/// Millisecond precision with a `Z` suffix keeps the strings lexicographically
/// ordered, which the store relies on for `ORDER BY created_at` and expiry checks.
#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(chrono::Utc::now())
}

#[must_use]
pub fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
