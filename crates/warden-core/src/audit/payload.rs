//! Serialization of audited arguments and results.

use serde_json::Value;

pub const TRUNCATION_MARKER: &str = "...[TRUNCATED]";
pub const MASK: &str = "******";

/// Keeps the first `max_chars` characters and appends [`TRUNCATION_MARKER`]
/// when anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &s[..idx], TRUNCATION_MARKER),
        None => s.to_string(),
    }
}

/// Replaces values of `excluded` keys, at any depth, with [`MASK`].
pub fn mask_params(value: &Value, excluded: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = if excluded.iter().any(|e| e.eq_ignore_ascii_case(k)) {
                        Value::String(MASK.to_string())
                    } else {
                        mask_params(v, excluded)
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| mask_params(v, excluded)).collect()),
        other => other.clone(),
    }
}

/// Serializes `value` and truncates it; failures are logged and yield `None`.
pub fn render(operation: &str, field: &'static str, value: &Value, max_chars: usize) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(s) => Some(truncate_chars(&s, max_chars)),
        Err(e) => {
            tracing::warn!(operation, field, error = %e, "audit payload serialization failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn long_param_keeps_prefix_and_marker() {
        let s = "a".repeat(3000);
        let out = truncate_chars(&s, 2000);
        assert_eq!(out.len(), 2000 + TRUNCATION_MARKER.len());
        assert!(out.starts_with(&"a".repeat(2000)));
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn short_and_exact_inputs_untouched() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcd", 4), "abcd");
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let out = truncate_chars("ééééé", 2);
        assert_eq!(out, format!("éé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn masks_nested_case_insensitive() {
        let excluded = vec!["password".to_string(), "newPassword".to_string()];
        let v = json!({
            "user": "alice",
            "Password": "hunter2",
            "change": [{"newpassword": "x", "keep": 1}]
        });
        let masked = mask_params(&v, &excluded);
        assert_eq!(masked["user"], "alice");
        assert_eq!(masked["Password"], MASK);
        assert_eq!(masked["change"][0]["newpassword"], MASK);
        assert_eq!(masked["change"][0]["keep"], 1);
    }
}
