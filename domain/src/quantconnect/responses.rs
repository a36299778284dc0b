//! Parsers for QuantConnect tool payloads

use crate::parsing::compile_errors::errors_from_json;
use crate::strategy::entities::ProjectId;
use serde_json::Value;

/// Parse a tool result as JSON, if it is JSON
pub fn parse_payload(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim()).ok()
}

/// Read an id that may be a number or a numeric string
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Project id from `projectId`, `projects[0].projectId` or `project.projectId`
pub fn project_id(value: &Value) -> Option<ProjectId> {
    value
        .get("projectId")
        .and_then(as_u64)
        .or_else(|| {
            value
                .get("projects")
                .and_then(|p| p.get(0))
                .and_then(|p| p.get("projectId"))
                .and_then(as_u64)
        })
        .or_else(|| {
            value
                .get("project")
                .and_then(|p| p.get("projectId"))
                .and_then(as_u64)
        })
        .map(ProjectId)
}

/// Find a project by exact name in a `list_projects` payload
pub fn find_project_by_name(value: &Value, name: &str) -> Option<ProjectId> {
    value
        .get("projects")?
        .as_array()?
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|p| p.get("projectId"))
        .and_then(as_u64)
        .map(ProjectId)
}

/// Build state reported by `read_compile`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileState {
    InQueue,
    BuildSuccess,
    BuildError,
    Other(String),
}

impl CompileState {
    pub fn parse(s: &str) -> Self {
        match s {
            "InQueue" => CompileState::InQueue,
            "BuildSuccess" => CompileState::BuildSuccess,
            "BuildError" => CompileState::BuildError,
            other if other.to_lowercase().contains("error") => CompileState::BuildError,
            other => CompileState::Other(other.to_string()),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, CompileState::BuildSuccess | CompileState::BuildError)
    }
}

/// What a compile payload says right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSnapshot {
    pub compile_id: Option<String>,
    pub state: CompileState,
    /// Only populated for `BuildError`
    pub errors: Vec<String>,
}

impl CompileSnapshot {
    pub fn from_value(value: &Value) -> Self {
        let body = value.get("compile").filter(|c| c.is_object()).unwrap_or(value);

        let compile_id = body
            .get("compileId")
            .or_else(|| value.get("compileId"))
            .and_then(as_id_string);

        let state = body
            .get("state")
            .or_else(|| value.get("state"))
            .and_then(Value::as_str)
            .map(CompileState::parse)
            .unwrap_or(CompileState::Other(String::new()));

        let errors = if state == CompileState::BuildError {
            let mut errors = errors_from_json(value);
            for log in body
                .get("logs")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
            {
                if log.to_lowercase().contains("error") && !errors.iter().any(|e| e == log) {
                    errors.push(log.to_string());
                }
            }
            errors
        } else {
            Vec::new()
        };

        Self {
            compile_id,
            state,
            errors,
        }
    }
}

/// What a backtest payload says right now
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacktestSnapshot {
    pub backtest_id: Option<String>,
    pub status: String,
    pub completed: bool,
    pub error: Option<String>,
    pub stacktrace: Option<String>,
    /// `None` when the payload carries no trade statistics
    pub trades: Option<u64>,
}

impl BacktestSnapshot {
    pub fn from_value(value: &Value) -> Self {
        let body = value
            .get("backtest")
            .filter(|b| b.is_object())
            .or_else(|| value.get("backtests").and_then(|b| b.get(0)))
            .unwrap_or(value);

        let non_empty = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            backtest_id: body.get("backtestId").and_then(as_id_string),
            status: body
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            completed: body
                .get("completed")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            error: non_empty("error"),
            stacktrace: non_empty("stacktrace"),
            trades: trade_count(body),
        }
    }

    /// Finished, successfully or not
    pub fn is_finished(&self) -> bool {
        self.completed
            || self.status.contains("Completed")
            || self.status.contains("Error")
            || self.error.is_some()
    }

    /// Finished with an error
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.status.contains("Error")
    }

    /// Error text for prompts, falling back to the status line
    pub fn error_message(&self) -> Option<String> {
        if !self.is_error() {
            return None;
        }
        Some(self.error.clone().unwrap_or_else(|| self.status.clone()))
    }
}

/// Trade count from performance statistics
///
/// Prefers `totalPerformance.tradeStatistics.totalNumberOfTrades`, then the
/// summary statistics `Total Orders` / `Total Trades` (string values).
pub fn trade_count(body: &Value) -> Option<u64> {
    if let Some(n) = body
        .pointer("/totalPerformance/tradeStatistics/totalNumberOfTrades")
        .and_then(as_u64)
    {
        return Some(n);
    }
    let stats = body.get("statistics")?;
    ["Total Orders", "Total Trades"]
        .iter()
        .find_map(|key| stats.get(*key).and_then(as_u64))
}

/// Number of orders in a `read_backtest_orders` payload
pub fn order_count(value: &Value) -> Option<u64> {
    if let Some(orders) = value.get("orders").and_then(Value::as_array) {
        return Some(orders.len() as u64);
    }
    value
        .get("length")
        .or_else(|| value.get("total"))
        .and_then(as_u64)
}

/// Phrases QuantConnect uses when it rejects the user id / token pair
const AUTH_REJECTIONS: [&str; 5] = [
    "authentication failed",
    "hash doesn't match",
    "invalid credentials",
    "unauthorized",
    "invalid api token",
];

/// Whether a tool error means QuantConnect refused the credentials
pub fn is_auth_rejection(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTH_REJECTIONS.iter().any(|phrase| message.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_id_shapes() {
        assert_eq!(project_id(&json!({"projectId": 11})), Some(ProjectId(11)));
        assert_eq!(
            project_id(&json!({"projects": [{"projectId": "22", "name": "x"}]})),
            Some(ProjectId(22))
        );
        assert_eq!(
            project_id(&json!({"project": {"projectId": 33}})),
            Some(ProjectId(33))
        );
        assert_eq!(project_id(&json!({"success": false})), None);
    }

    #[test]
    fn test_find_project_by_name() {
        let list = json!({"projects": [
            {"projectId": 1, "name": "Other"},
            {"projectId": 2, "name": "SPX_0DTE_Strategy"}
        ]});
        assert_eq!(find_project_by_name(&list, "SPX_0DTE_Strategy"), Some(ProjectId(2)));
        assert_eq!(find_project_by_name(&list, "Missing"), None);
    }

    #[test]
    fn test_compile_snapshot_success() {
        let snap = CompileSnapshot::from_value(&json!({
            "compileId": "abc-123", "state": "BuildSuccess", "logs": ["Build Success"]
        }));
        assert_eq!(snap.compile_id.as_deref(), Some("abc-123"));
        assert!(snap.state.is_finished());
        assert!(snap.errors.is_empty());
    }

    #[test]
    fn test_compile_snapshot_error_collects_logs() {
        let snap = CompileSnapshot::from_value(&json!({
            "compileId": "abc", "state": "BuildError",
            "logs": ["Build started", "Build Error: main.py(12) undefined name 'x'"]
        }));
        assert_eq!(snap.state, CompileState::BuildError);
        assert_eq!(snap.errors, vec!["Build Error: main.py(12) undefined name 'x'"]);
    }

    #[test]
    fn test_compile_in_queue() {
        let snap = CompileSnapshot::from_value(&json!({"compileId": "c", "state": "InQueue"}));
        assert!(!snap.state.is_finished());
    }

    #[test]
    fn test_backtest_completed_with_trades() {
        let snap = BacktestSnapshot::from_value(&json!({"backtest": {
            "backtestId": "bt1", "status": "Completed.", "completed": true,
            "totalPerformance": {"tradeStatistics": {"totalNumberOfTrades": 42}}
        }}));
        assert!(snap.is_finished());
        assert!(!snap.is_error());
        assert_eq!(snap.trades, Some(42));
        assert_eq!(snap.backtest_id.as_deref(), Some("bt1"));
    }

    #[test]
    fn test_backtest_statistics_fallback() {
        let snap = BacktestSnapshot::from_value(&json!({
            "backtestId": "bt2", "status": "Completed.",
            "statistics": {"Total Orders": "7"}
        }));
        assert_eq!(snap.trades, Some(7));
    }

    #[test]
    fn test_backtest_runtime_error() {
        let snap = BacktestSnapshot::from_value(&json!({"backtest": {
            "status": "Runtime Error", "error": "ZeroDivisionError", "stacktrace": "at on_data line 40"
        }}));
        assert!(snap.is_finished());
        assert_eq!(snap.error_message().as_deref(), Some("ZeroDivisionError"));
        assert_eq!(snap.stacktrace.as_deref(), Some("at on_data line 40"));
        assert_eq!(snap.trades, None);
    }

    #[test]
    fn test_backtest_in_progress() {
        let snap = BacktestSnapshot::from_value(&json!({"backtest": {"status": "In Progress...", "error": ""}}));
        assert!(!snap.is_finished());
        assert_eq!(snap.error_message(), None);
    }

    #[test]
    fn test_order_count() {
        assert_eq!(order_count(&json!({"orders": [{}, {}, {}]})), Some(3));
        assert_eq!(order_count(&json!({"length": 5})), Some(5));
        assert_eq!(order_count(&json!({})), None);
    }

    #[test]
    fn test_auth_rejection_phrases() {
        assert!(is_auth_rejection("Authentication failed: Hash doesn't match."));
        assert!(is_auth_rejection("401 Unauthorized"));
        assert!(is_auth_rejection("Invalid credentials"));
        assert!(!is_auth_rejection("Project name already exists"));
        assert!(!is_auth_rejection("Build failed: CS0103"));
    }
}
