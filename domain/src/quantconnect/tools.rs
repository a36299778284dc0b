//! QuantConnect MCP tool allowlist

use crate::tool::entities::ToolDefinition;

pub const CREATE_PROJECT: &str = "create_project";
pub const READ_PROJECT: &str = "read_project";
pub const UPDATE_PROJECT: &str = "update_project";
pub const DELETE_PROJECT: &str = "delete_project";
pub const LIST_PROJECTS: &str = "list_projects";
pub const CREATE_FILE: &str = "create_file";
pub const READ_FILE: &str = "read_file";
pub const UPDATE_FILE_CONTENTS: &str = "update_file_contents";
pub const CREATE_COMPILE: &str = "create_compile";
pub const READ_COMPILE: &str = "read_compile";
pub const CREATE_BACKTEST: &str = "create_backtest";
pub const READ_BACKTEST: &str = "read_backtest";
pub const READ_BACKTEST_ORDERS: &str = "read_backtest_orders";
pub const READ_BACKTEST_INSIGHTS: &str = "read_backtest_insights";

/// Tools the pipeline and agent mode are allowed to use
pub const QC_TOOLS: [&str; 14] = [
    CREATE_PROJECT,
    READ_PROJECT,
    UPDATE_PROJECT,
    DELETE_PROJECT,
    LIST_PROJECTS,
    CREATE_FILE,
    READ_FILE,
    UPDATE_FILE_CONTENTS,
    CREATE_COMPILE,
    READ_COMPILE,
    CREATE_BACKTEST,
    READ_BACKTEST,
    READ_BACKTEST_ORDERS,
    READ_BACKTEST_INSIGHTS,
];

pub fn is_allowed(name: &str) -> bool {
    QC_TOOLS.contains(&name)
}

/// Split server tools into allowlisted definitions (allowlist order) and
/// the allowlist names the server does not expose.
pub fn partition_tools(available: &[ToolDefinition]) -> (Vec<ToolDefinition>, Vec<&'static str>) {
    let mut present = Vec::new();
    let mut missing = Vec::new();
    for name in QC_TOOLS {
        match available.iter().find(|t| t.name == name) {
            Some(def) => present.push(def.clone()),
            None => missing.push(name),
        }
    }
    (present, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_keeps_allowlist_order_and_drops_others() {
        let available = vec![
            ToolDefinition::new("read_backtest", ""),
            ToolDefinition::new("create_project", ""),
            ToolDefinition::new("read_lean_versions", ""),
        ];
        let (present, missing) = partition_tools(&available);
        let names: Vec<_> = present.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["create_project", "read_backtest"]);
        assert_eq!(missing.len(), QC_TOOLS.len() - 2);
        assert!(missing.contains(&"create_compile"));
        assert!(!missing.contains(&"read_lean_versions"));
    }

    #[test]
    fn test_is_allowed() {
        assert!(is_allowed("update_file_contents"));
        assert!(!is_allowed("delete_file"));
    }
}
