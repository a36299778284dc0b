//! Compile error extraction from QuantConnect payloads

use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Placeholder used when a failed build reports nothing recognizable
pub const NO_SPECIFIC_ERROR: &str = "Compilation failed - no specific error extracted";

static RAW_ERROR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)error[:\s]+(.+?)\r?$",
        r"(?im)CS\d+[:\s]+(.+?)\r?$",
        r"(?im)line \d+[:\s]+(.+?)\r?$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract compile error messages from a `read_compile` (or similar) payload.
///
/// JSON payloads are read field by field; anything else is scanned with
/// error-line patterns. The result is deduplicated in order and never empty.
pub fn extract_compile_errors(raw: &str) -> Vec<String> {
    let errors = match serde_json::from_str::<Value>(raw) {
        Ok(value) => errors_from_json(&value),
        Err(_) => errors_from_text(raw),
    };

    let mut seen = HashSet::new();
    let unique: Vec<String> = errors
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty() && seen.insert(e.clone()))
        .collect();

    if unique.is_empty() {
        vec![NO_SPECIFIC_ERROR.to_string()]
    } else {
        unique
    }
}

/// Field-by-field extraction from an already parsed payload
pub fn errors_from_json(value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(obj) = value.as_object() else {
        return errors;
    };

    match obj.get("errors") {
        Some(Value::Array(items)) => errors.extend(items.iter().map(value_to_string)),
        Some(Value::String(s)) => errors.push(s.clone()),
        _ => {}
    }

    if let Some(Value::Object(compile)) = obj.get("compile")
        && let Some(Value::Array(logs)) = compile.get("logs")
    {
        errors.extend(logs.iter().map(value_to_string));
    }

    if let Some(error) = obj.get("error")
        && !error.is_null()
    {
        errors.push(value_to_string(error));
    }

    let state_is_error = obj
        .get("state")
        .map(|s| value_to_string(s).to_lowercase().contains("error"))
        .unwrap_or(false);

    if state_is_error {
        if let Some(message) = obj.get("message") {
            errors.push(value_to_string(message));
        }
        if let Some(Value::Array(logs)) = obj.get("logs") {
            errors.extend(
                logs.iter()
                    .map(value_to_string)
                    .filter(|line| line.to_lowercase().contains("error")),
            );
        }
    }

    errors
}

fn errors_from_text(raw: &str) -> Vec<String> {
    RAW_ERROR_PATTERNS
        .iter()
        .flat_map(|re| {
            re.captures_iter(raw)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        })
        .collect()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_list() {
        let raw = r#"{"errors": ["Build Error: main.py line 4", "Build Error: main.py line 4", "NameError"]}"#;
        assert_eq!(
            extract_compile_errors(raw),
            vec!["Build Error: main.py line 4", "NameError"]
        );
    }

    #[test]
    fn test_errors_string_and_error_field() {
        let raw = r#"{"errors": "bad indent", "error": "compile failed"}"#;
        assert_eq!(extract_compile_errors(raw), vec!["bad indent", "compile failed"]);
    }

    #[test]
    fn test_nested_compile_logs() {
        let raw = r#"{"compile": {"logs": ["Syntax error at line 3"]}}"#;
        assert_eq!(extract_compile_errors(raw), vec!["Syntax error at line 3"]);
    }

    #[test]
    fn test_message_only_when_state_is_error() {
        let failed = r#"{"state": "BuildError", "message": "missing colon", "logs": ["Build started", "Error: line 9"]}"#;
        assert_eq!(extract_compile_errors(failed), vec!["missing colon", "Error: line 9"]);

        let ok = r#"{"state": "BuildSuccess", "message": "done"}"#;
        assert_eq!(extract_compile_errors(ok), vec![NO_SPECIFIC_ERROR]);
    }

    #[test]
    fn test_raw_text_fallback() {
        let raw = "Build failed\nerror: undefined name 'spx'\nCS1002: ; expected\n";
        let errors = extract_compile_errors(raw);
        assert!(errors.contains(&"undefined name 'spx'".to_string()));
        assert!(errors.contains(&"; expected".to_string()));
    }

    #[test]
    fn test_never_empty() {
        assert_eq!(extract_compile_errors(""), vec![NO_SPECIFIC_ERROR]);
        assert_eq!(extract_compile_errors("[]"), vec![NO_SPECIFIC_ERROR]);
    }
}
