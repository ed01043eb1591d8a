use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::utils::constants::BODY_PREVIEW_CHARS;

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("static tag pattern"))
}

/// Tag-stripped body, cut to `BODY_PREVIEW_CHARS` characters.
pub fn body_preview(body: &str) -> String {
    let text = tag_pattern().replace_all(body, "");
    match text.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.into_owned(),
    }
}

/// Replaces the HTML `Body` of a feed entry with a short `BodyPreview`.
pub fn minimize_feed_entry(entry: Value) -> Value {
    let Value::Object(mut entry) = entry else {
        return entry;
    };
    if let Some(Value::String(body)) = entry.remove("Body") {
        if !body.is_empty() {
            entry.insert("BodyPreview".to_string(), Value::String(body_preview(&body)));
        }
    }
    Value::Object(entry)
}
