//! Adventure log: free-text journal entries, newest first.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CompanionError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Millisecond timestamp of creation, bumped to stay unique.
    pub id: i64,
    pub text: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
}

/// Insert a new entry at the front. Blank text is ignored.
pub fn add_entry(log: &mut Vec<LogEntry>, text: &str, now: DateTime<Utc>) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let newest = log.iter().map(|e| e.id).max().unwrap_or(i64::MIN);
    let id = now.timestamp_millis().max(newest.saturating_add(1));
    log.insert(
        0,
        LogEntry {
            id,
            text: text.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    );
    Some(id)
}

pub fn find_entry(log: &[LogEntry], id: i64) -> Result<&LogEntry> {
    log.iter()
        .find(|e| e.id == id)
        .ok_or(CompanionError::LogEntryNotFound(id))
}

pub fn update_entry(log: &mut [LogEntry], id: i64, text: &str) -> Result<()> {
    let entry = log
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or(CompanionError::LogEntryNotFound(id))?;
    entry.text = text.to_string();
    Ok(())
}

pub fn delete_entry(log: &mut Vec<LogEntry>, id: i64) -> Result<()> {
    let before = log.len();
    log.retain(|e| e.id != id);
    if log.len() == before {
        return Err(CompanionError::LogEntryNotFound(id));
    }
    Ok(())
}
