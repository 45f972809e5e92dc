//! Cleanup of scraped numeric text.

/// Thousands separator used on the source page.
pub const THOUSANDS_SEPARATOR: char = ',';

/// Drop thousands separators and surrounding whitespace: `" 1,234 "` → `"1234"`.
pub fn strip_thousands(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|&c| c != THOUSANDS_SEPARATOR)
        .collect()
}

/// First whitespace-separated token: `"123,456 ▲"` → `"123,456"`.
pub fn first_token(raw: &str) -> Option<&str> {
    raw.split_whitespace().next()
}

/// Parse a non-negative price after separator removal.
pub fn parse_price(raw: &str) -> Option<u64> {
    let cleaned = strip_thousands(raw);
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// Parse a signed chart value. No separator cleanup: chart payloads are raw
/// JS number literals.
pub fn parse_series_value(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Render with thousands separators, the way the page prints prices.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
        out.push(ch);
    }
    out
}
