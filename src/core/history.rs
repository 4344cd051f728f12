//! Prompt history: a capped, newest-first list of generation records.

use crate::core::settings::ResponseFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_HISTORY_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub prompt: String,
    /// Tone id active when the response was generated.
    pub tone: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub response_format: ResponseFormat,
}

impl HistoryEntry {
    /// Build an entry whose id sorts after every id already in `history`.
    ///
    /// Ids are the millisecond timestamp as a string; two generations in the
    /// same millisecond get consecutive ids instead of colliding.
    pub fn new(
        history: &[HistoryEntry],
        prompt: impl Into<String>,
        tone: impl Into<String>,
        response: Option<String>,
        response_format: ResponseFormat,
        now_ms: i64,
    ) -> Self {
        let newest = history
            .iter()
            .filter_map(|entry| entry.id.parse::<i64>().ok())
            .max();
        let id = match newest {
            Some(newest) if newest >= now_ms => newest + 1,
            _ => now_ms,
        };

        Self {
            id: id.to_string(),
            prompt: prompt.into(),
            tone: tone.into(),
            timestamp: now_ms,
            response,
            response_format,
        }
    }
}

/// Insert at the front and drop whatever falls past the cap.
pub fn push_entry(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    history.insert(0, entry);
    history.truncate(MAX_HISTORY_SIZE);
}

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub search: Option<String>,
    pub tone: Option<String>,
}

impl HistoryQuery {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => entry
                .prompt
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        };
        let matches_tone = match self.tone.as_deref() {
            Some(tone) if !tone.is_empty() => entry.tone == tone,
            _ => true,
        };
        matches_search && matches_tone
    }

    pub fn filter<'a>(&self, history: &'a [HistoryEntry]) -> Vec<&'a HistoryEntry> {
        history.iter().filter(|entry| self.matches(entry)).collect()
    }
}

/// Human-readable age of a history timestamp relative to `now_ms`.
pub fn format_relative(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms).max(0);
    let minutes = diff / 60_000;
    let hours = diff / 3_600_000;
    let days = diff / 86_400_000;

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| timestamp_ms.to_string())
    }
}
