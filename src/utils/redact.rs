use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::AppResult;

static DATA_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/[a-zA-Z0-9.+-]+;base64,").expect("valid regex"));

/// Redact request payloads before they hit the logs: base64 image data is
/// replaced with a size marker, personal fields are masked.
pub fn redact_sensitive_data(data: &JsonValue) -> AppResult<JsonValue> {
    let redacted = redact_value(data);
    Ok(redacted)
}

fn redact_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut redacted_map = serde_json::Map::new();
            for (key, val) in map {
                let redacted_val = if is_sensitive_field(key) {
                    redact_string_value(val)
                } else {
                    redact_value(val)
                };
                redacted_map.insert(key.clone(), redacted_val);
            }
            JsonValue::Object(redacted_map)
        }
        JsonValue::Array(arr) => {
            let redacted_arr: Vec<JsonValue> = arr.iter().map(redact_value).collect();
            JsonValue::Array(redacted_arr)
        }
        JsonValue::String(s) if DATA_URL_RE.is_match(s) => image_marker(s),
        _ => value.clone(),
    }
}

fn is_sensitive_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    matches!(
        lower.as_str(),
        "note" | "notes" | "weight" | "height" | "age" | "apikey" | "api_key"
    )
}

fn redact_string_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if !s.is_empty() => JsonValue::String("[REDACTED]".to_string()),
        JsonValue::Number(_) => JsonValue::String("[REDACTED]".to_string()),
        _ => value.clone(),
    }
}

fn image_marker(data_url: &str) -> JsonValue {
    JsonValue::String(format!("[IMAGE_DATA:{} bytes]", data_url.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_image_data_urls() {
        let data = json!({
            "image": "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQ",
            "detail": "high"
        });

        let redacted = redact_sensitive_data(&data).unwrap();

        let marker = redacted["image"].as_str().unwrap();
        assert!(marker.starts_with("[IMAGE_DATA:"));
        assert_eq!(redacted["detail"], "high");
    }

    #[test]
    fn test_redact_personal_fields() {
        let data = json!({
            "date": "2025-06-01",
            "weight": 82.5,
            "note": "felt strong today",
            "unit": "kg"
        });

        let redacted = redact_sensitive_data(&data).unwrap();

        assert_eq!(redacted["date"], "2025-06-01");
        assert_eq!(redacted["weight"], "[REDACTED]");
        assert_eq!(redacted["note"], "[REDACTED]");
        assert_eq!(redacted["unit"], "kg");
    }

    #[test]
    fn test_redact_nested_structures() {
        let data = json!({
            "photos": [
                {"id": "p1", "dataUrl": "data:image/png;base64,iVBORw0KGgo", "note": "week 1"}
            ]
        });

        let redacted = redact_sensitive_data(&data).unwrap();

        assert_eq!(redacted["photos"][0]["id"], "p1");
        assert!(redacted["photos"][0]["dataUrl"]
            .as_str()
            .unwrap()
            .starts_with("[IMAGE_DATA:"));
        assert_eq!(redacted["photos"][0]["note"], "[REDACTED]");
    }

    #[test]
    fn test_preserve_non_sensitive_data() {
        let data = json!({
            "count": 42,
            "status": "done",
            "summary": {
                "workouts": 5,
                "streak": 3
            }
        });

        let redacted = redact_sensitive_data(&data).unwrap();

        // Should remain unchanged
        assert_eq!(redacted, data);
    }
}
