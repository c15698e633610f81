//! Append-only JSONL event log with secret redaction.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fs::{OpenOptions, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::events::{EventSink, PipelineEvent};

static REDACTION_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("api_key", r"(?i)(api[_-]?key\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)"),
        ("secret", r"(?i)(secret\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)"),
        ("bearer", r"(?i)(bearer\s+)([A-Za-z0-9\-_.+=/]+)"),
        ("sk_token", r"(sk-[A-Za-z0-9]{16,})"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| match Regex::new(pattern) {
        Ok(regex) => Some((name, regex)),
        Err(err) => {
            warn!(pattern = name, error = %err, "invalid redaction pattern");
            None
        }
    })
    .collect()
});

#[derive(Serialize)]
struct EventLogRecord<'a> {
    recorded_at: String,
    #[serde(flatten)]
    event: &'a PipelineEvent,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    redactions: Vec<&'static str>,
}

/// Writes every event as one JSON line to a caller-chosen file.
///
/// Failures are logged and swallowed; event logging never affects a run.
pub struct JsonlEventSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, event: &PipelineEvent) -> Result<()> {
        let mut redactions = Vec::new();
        let mut value = serde_json::to_value(event)?;
        sanitize_value(&mut value, &mut redactions);
        let event: PipelineEvent = serde_json::from_value(value)?;

        let recorded_at = Utc
            .timestamp_millis_opt(event.timestamp as i64)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        redactions.sort_unstable();
        redactions.dedup();

        let record = EventLogRecord {
            recorded_at,
            event: &event,
            redactions,
        };

        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        append_json_line(&self.path, &record)
    }
}

impl EventSink for JsonlEventSink {
    fn emit(&self, event: PipelineEvent) {
        if let Err(err) = self.write(&event) {
            warn!(error = %err, path = %self.path.display(), "failed to append pipeline event");
        }
    }
}

fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let line = serde_json::to_string(value)?;
    writeln!(writer, "{}", line)
        .with_context(|| format!("failed to append log entry to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn sanitize_value(value: &mut serde_json::Value, redactions: &mut Vec<&'static str>) {
    match value {
        serde_json::Value::String(text) => *text = sanitize_text(text, redactions),
        serde_json::Value::Array(items) => {
            for item in items {
                sanitize_value(item, redactions);
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                sanitize_value(item, redactions);
            }
        }
        _ => {}
    }
}

fn sanitize_text(input: &str, redactions: &mut Vec<&'static str>) -> String {
    let mut output = input.to_string();
    for (name, regex) in REDACTION_PATTERNS.iter() {
        let mut matched = false;
        output = regex
            .replace_all(&output, |caps: &Captures| {
                matched = true;
                if caps.len() > 2 {
                    format!("{}[REDACTED]", &caps[1])
                } else {
                    "[REDACTED]".to_string()
                }
            })
            .to_string();
        if matched {
            redactions.push(name);
        }
    }
    output
}
