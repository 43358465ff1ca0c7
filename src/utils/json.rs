use serde_json::Value;

const BOM: char = '\u{FEFF}';

/// Parses upstream text, retrying once with the BOM and surrounding
/// whitespace stripped. Returns `None` instead of an error.
pub fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let cleaned = text.trim().trim_start_matches(BOM).trim();
    serde_json::from_str::<Value>(cleaned).ok()
}

/// Like [`parse_lenient`], but anything other than a JSON array is a failure.
/// Upstream sometimes answers 200 with an error object.
pub fn parse_array(text: &str) -> Option<Vec<Value>> {
    match parse_lenient(text)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
