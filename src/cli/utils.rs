use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            if let Some(Value::Object(fields)) = data {
                for (key, value) in fields {
                    println!("  {}: {}", key, display_value(&value));
                }
            }
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "success": false, "error": message }))?
            );
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// `{"success": true, "data": ...}` envelope from the API
pub fn unwrap_envelope(body: Value) -> anyhow::Result<Value> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(body.get("data").cloned().unwrap_or(Value::Null)),
        _ => {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("request failed");
            Err(anyhow::anyhow!("{}", error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_unwrapping() {
        let data = unwrap_envelope(json!({ "success": true, "data": { "id": 1 } })).unwrap();
        assert_eq!(data["id"], 1);

        let err = unwrap_envelope(json!({ "success": false, "error": "Unauthorized" })).unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn text_values() {
        assert_eq!(display_value(&json!(["admin", "prodi"])), "admin, prodi");
        assert_eq!(display_value(&Value::Null), "-");
    }
}
