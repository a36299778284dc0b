//! JSONL transcript writer.
//!
//! Each [`ConversationEvent`] becomes one JSON line: the payload fields plus
//! `type` and an RFC 3339 `timestamp`. The file is opened in append mode so
//! successive runs accumulate in one transcript.

use qcforge_application::{ConversationEvent, ConversationLogger};
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Transcript logger writing one JSON object per line.
pub struct JsonlConversationLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!("Writing transcript to {}", path.display());

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: ConversationEvent) -> Value {
        let timestamp = event
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        match event.payload {
            Value::Object(mut map) => {
                map.insert("type".to_string(), Value::String(event.event_type.to_string()));
                map.insert("timestamp".to_string(), Value::String(timestamp));
                Value::Object(map)
            }
            other => json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": other,
            }),
        }
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(event)) else {
            return;
        };

        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        // Flush every line so a crashed run still leaves a readable transcript
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!("Transcript write to {} failed: {}", self.path.display(), e);
        }
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
