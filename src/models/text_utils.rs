//! Text helpers for titles, previews, and timestamps.

use chrono::{DateTime, Datelike, Utc};

/// Truncate to at most `max_chars` characters, appending "..." when cut.
/// Operates on char boundaries so multi-byte text never splits.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// First `max_chars` characters, no ellipsis (previews and list titles)
pub fn char_prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Relative timestamp for thread lists: "Just now", "5m ago", "3h ago",
/// then calendar dates ("Nov 14" same year, "Nov 14, 2023" otherwise).
pub fn format_timestamp(timestamp_ms: i64) -> String {
    format_timestamp_at(timestamp_ms, super::now_millis())
}

/// Same as [`format_timestamp`] against an explicit "now"
pub fn format_timestamp_at(timestamp_ms: i64, now_ms: i64) -> String {
    let elapsed = now_ms.saturating_sub(timestamp_ms);
    if elapsed < 60_000 {
        return "Just now".to_string();
    }
    if elapsed < 3_600_000 {
        return format!("{}m ago", elapsed / 60_000);
    }
    if elapsed < 86_400_000 {
        return format!("{}h ago", elapsed / 3_600_000);
    }

    let (Some(then), Some(now)) = (
        DateTime::<Utc>::from_timestamp_millis(timestamp_ms),
        DateTime::<Utc>::from_timestamp_millis(now_ms),
    ) else {
        return String::new();
    };

    if then.year() == now.year() {
        then.format("%b %-d").to_string()
    } else {
        then.format("%b %-d, %Y").to_string()
    }
}
