//! List Tools use case.
//!
//! Shows what the QuantConnect MCP server exposes and which of those tools
//! the pipeline is allowed to use.

use crate::ports::mcp_tools::{McpToolPort, ToolPortError};
use qcforge_domain::ToolDefinition;
use qcforge_domain::quantconnect::tools::is_allowed;
use std::sync::Arc;
use tracing::debug;

/// A tool in the listing
#[derive(Debug, Clone)]
pub struct ListedTool {
    pub definition: ToolDefinition,
    /// On the QuantConnect allowlist
    pub allowed: bool,
}

/// Result of listing tools
#[derive(Debug, Clone)]
pub struct ListToolsOutput {
    pub tools: Vec<ListedTool>,
    /// Tools on the server before filtering
    pub total: usize,
    pub filter: Option<String>,
}

impl ListToolsOutput {
    /// Input schemas are shown only for filtered listings
    pub fn show_schemas(&self) -> bool {
        self.filter.is_some()
    }
}

pub struct ListToolsUseCase {
    tools: Arc<dyn McpToolPort>,
}

impl ListToolsUseCase {
    pub fn new(tools: Arc<dyn McpToolPort>) -> Self {
        Self { tools }
    }

    /// List tools, optionally keeping only those whose name or description
    /// contains `filter` (case-insensitive).
    pub async fn execute(&self, filter: Option<&str>) -> Result<ListToolsOutput, ToolPortError> {
        let available = self.tools.list_tools().await?;
        let total = available.len();
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());

        let mut tools: Vec<ListedTool> = available
            .into_iter()
            .filter(|t| filter.is_none_or(|f| t.matches(f)))
            .map(|definition| ListedTool {
                allowed: is_allowed(&definition.name),
                definition,
            })
            .collect();
        tools.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));

        debug!("Listed {} of {} tools", tools.len(), total);
        Ok(ListToolsOutput {
            tools,
            total,
            filter: filter.map(str::to_string),
        })
    }
}
