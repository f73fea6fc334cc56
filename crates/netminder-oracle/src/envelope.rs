//! Response-envelope handling
//!
//! The oracle is asked to answer inside a small JSON envelope such as
//! `{"message_type": "chat"}` or `{"response": "see you there"}`. Models
//! sometimes wrap the envelope in prose or skip it entirely, so
//! extraction is lenient: find the first braced block, parse it, and fall
//! back to the raw text when that fails.

use netminder_core::ChatMessage;
use regex::Regex;

/// Character budget for a conversation sent to the oracle. Oldest
/// entries are dropped first; the leading priming entry always stays.
pub const HISTORY_CHAR_LIMIT: usize = 15_000;

/// Pull `key` out of the first JSON object embedded in `raw`.
pub fn extract_field(raw: &str, key: &str) -> Option<String> {
    let braces = Regex::new(r"(?s)\{.*?\}").ok()?;
    let candidate = braces.find(raw)?.as_str();

    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    value.get(key)?.as_str().map(|s| s.to_string())
}

/// Pull `key` out of `raw`, or fall back to the trimmed raw text.
pub fn extract_field_or_raw(raw: &str, key: &str) -> String {
    extract_field(raw, key).unwrap_or_else(|| raw.trim().to_string())
}

/// Drop the oldest non-priming entries until the history fits the
/// character budget. Entry 0 is the priming entry and is never dropped.
pub fn trim_history(messages: &mut Vec<ChatMessage>) {
    while messages.len() > 1 && total_chars(messages) > HISTORY_CHAR_LIMIT {
        messages.remove(1);
    }
}

fn total_chars(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| m.text.len()).sum()
}
