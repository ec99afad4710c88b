use std::collections::BTreeMap;

use serde_json::Value;

/// Best-effort extraction of a JSON value from arbitrary model output.
///
/// Ordered fallback chain, first success wins:
/// 1. parse the whole text,
/// 2. parse the interior of a ```json fenced block,
/// 3. parse the substring from the first `{` to the last `}`.
///
/// Returns `None` when every stage fails; never panics.
pub fn recover_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(interior) = fenced_json_block(text) {
        if let Ok(value) = serde_json::from_str(interior) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Interior of the first ```json fenced block, if present.
fn fenced_json_block(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    let fence = lower.find("```json")?;
    let body_start = fence + "```json".len();
    let rest = &text[body_start..];
    let close = rest.find("```")?;
    Some(rest[..close].trim())
}

/// Coerce a recovered value into a list of string maps.
///
/// Non-arrays become empty; elements that are not objects are dropped;
/// remaining keys and values are stringified uniformly.
pub fn coerce_string_maps(value: &Value) -> Vec<BTreeMap<String, String>> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.as_object())
        .map(|object| {
            object
                .iter()
                .map(|(key, value)| (key.clone(), stringify(value)))
                .collect()
        })
        .collect()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
