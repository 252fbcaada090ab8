use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL log of session events. Never records passwords or tokens.
pub struct Transcript {
    pub path: PathBuf,
    session_id: String,
    api: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    api: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, session_id: &str, api: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            api: api.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            api: &self.api,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn session_start(&mut self, authenticated: bool) -> Result<()> {
        self.log(
            "session_start",
            serde_json::json!({ "authenticated": authenticated }),
        )
    }

    pub fn login_ok(&mut self, email: &str) -> Result<()> {
        self.log("login_ok", serde_json::json!({ "email": email }))
    }

    pub fn login_err(&mut self, email: &str, error: &str) -> Result<()> {
        self.log(
            "login_err",
            serde_json::json!({ "email": email, "error": error }),
        )
    }

    pub fn logout(&mut self) -> Result<()> {
        self.log("logout", serde_json::json!({}))
    }

    /// Log a completed bookings fetch
    pub fn bookings_ok(&mut self, count: usize, duration_ms: u64) -> Result<()> {
        self.log(
            "bookings_ok",
            serde_json::json!({ "count": count, "duration_ms": duration_ms }),
        )
    }

    pub fn bookings_err(&mut self, error: &str, duration_ms: u64) -> Result<()> {
        self.log(
            "bookings_err",
            serde_json::json!({ "error": error, "duration_ms": duration_ms }),
        )
    }
}
