//! Conversation history entities

use serde::{Deserialize, Serialize};

/// Which agent produced an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Turns a task into a strategy specification
    Spec,
    /// Writes and revises the algorithm code
    Code,
    /// Single-agent mode driving MCP tools directly
    Agent,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Spec => "spec",
            AgentRole::Code => "code",
            AgentRole::Agent => "agent",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One prompt and the model's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub agent: AgentRole,
    pub prompt: String,
    pub response: String,
}

impl Exchange {
    pub fn new(agent: AgentRole, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            agent,
            prompt: prompt.into(),
            response: response.into(),
        }
    }
}

/// Ordered history of every exchange in a run (Entity)
///
/// Append-only: exchanges are never reordered or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    exchanges: Vec<Exchange>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Exchanges produced by one agent, in order
    pub fn by_agent(&self, agent: AgentRole) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().filter(move |e| e.agent == agent)
    }

    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_preserves_order() {
        let mut conv = Conversation::new();
        conv.record(Exchange::new(AgentRole::Spec, "task", "spec"));
        conv.record(Exchange::new(AgentRole::Code, "spec", "code v1"));
        conv.record(Exchange::new(AgentRole::Code, "errors", "code v2"));

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.exchanges()[0].agent, AgentRole::Spec);
        let code: Vec<_> = conv.by_agent(AgentRole::Code).map(|e| e.response.as_str()).collect();
        assert_eq!(code, vec!["code v1", "code v2"]);
        assert_eq!(conv.last().unwrap().response, "code v2");
    }

    #[test]
    fn test_serializes_as_array() {
        let mut conv = Conversation::new();
        conv.record(Exchange::new(AgentRole::Agent, "p", "r"));
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json[0]["agent"], "agent");
        assert_eq!(json[0]["prompt"], "p");
    }
}
