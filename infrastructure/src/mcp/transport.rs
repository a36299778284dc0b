//! Line-delimited JSON-RPC transport.
//!
//! Every frame is one JSON object followed by `\n`. The transport is generic
//! over the byte streams so the client can run against a child process in
//! production and an in-memory duplex pipe in tests.

use crate::mcp::error::{McpError, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

/// Classification of an incoming JSON-RPC message.
///
/// - `Response` → matched against the pending request id
/// - `IncomingRequest` → server asks something of us (e.g. `ping`)
/// - `Notification` → logged and skipped
#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A response to a request we sent (has `id`, no `method`).
    Response,
    /// A request from the server (has `id` + `method`).
    IncomingRequest { id: u64 },
    /// A notification (has `method`, no `id`).
    Notification,
}

/// Classify a JSON-RPC message by inspecting `id` and `method` fields.
pub fn classify_message(json: &Value) -> MessageKind {
    let has_id = json.get("id").and_then(|v| v.as_u64());
    let has_method = json.get("method").and_then(|v| v.as_str());

    match (has_id, has_method) {
        (Some(id), Some(_)) => MessageKind::IncomingRequest { id },
        (Some(_), None) => MessageKind::Response,
        _ => MessageKind::Notification,
    }
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Newline-framed JSON reader/writer pair
pub struct LineTransport {
    reader: BufReader<BoxedReader>,
    writer: BoxedWriter,
}

impl LineTransport {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
        }
    }

    /// Serialize `message` and write it as a single line.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        trace!("MCP sending: {}", line);
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|_| McpError::TransportClosed)?;
        self.writer
            .flush()
            .await
            .map_err(|_| McpError::TransportClosed)?;
        Ok(())
    }

    /// Read the next JSON frame.
    ///
    /// Blank lines and lines that are not JSON (server banners, stray log
    /// output) are skipped. End of stream is [`McpError::TransportClosed`].
    pub async fn recv(&mut self) -> Result<Value> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|_| McpError::TransportClosed)?;
            if bytes_read == 0 {
                return Err(McpError::TransportClosed);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            trace!("MCP received: {}", trimmed);

            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) if value.is_object() => return Ok(value),
                _ => debug!("Skipping non-JSON line from MCP server: {}", trimmed),
            }
        }
    }
}
