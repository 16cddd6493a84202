use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

/// Counts at one point of a run. `sent + failed + pending == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub progress: u8,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub pending: usize,
}

impl ProgressSnapshot {
    pub fn new(total: usize, sent: usize, failed: usize) -> ProgressSnapshot {
        let processed = sent + failed;
        let progress = if total == 0 {
            100
        } else {
            (processed * 100 / total) as u8
        };

        ProgressSnapshot {
            progress,
            total,
            sent,
            failed,
            pending: total - processed,
        }
    }

    pub fn processed(&self) -> usize {
        self.sent + self.failed
    }
}

/// One line of the progress feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Log { level: LogLevel, message: String },
    Progress(ProgressSnapshot),
    Complete { sent: usize, failed: usize },
    Aborted { reason: String },
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> ProgressEvent {
        ProgressEvent::Log {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> ProgressEvent {
        ProgressEvent::Log {
            level: LogLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> ProgressEvent {
        ProgressEvent::Log {
            level: LogLevel::Error,
            message: message.into(),
        }
    }

    /// Serializes the event as a single NDJSON line, newline included.
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');

        Ok(line)
    }
}
