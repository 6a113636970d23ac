//! Session history of user actions
//!
//! Append-only: entries are never removed or truncated. Display code asks for
//! a bounded view via [`HistoryLog::recent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::types::RecordId;

/// Number of entries the sidebar shows
pub const DEFAULT_HISTORY_VIEW: usize = 5;

/// Action types recorded in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// A record creation was confirmed on-ledger
    Uploaded { name: String },
    /// A verified decryption was accepted on-ledger
    Decrypted { record_id: RecordId },
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryAction::Uploaded { name } => write!(f, "Uploaded: {}", name),
            HistoryAction::Decrypted { record_id } => write!(f, "Decrypted: {}", record_id),
        }
    }
}

/// One immutable history line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Append position, starting at 0
    pub sequence: u64,
    pub action: HistoryAction,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only history shared by the workflows of one session
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action and return the stored entry
    pub async fn append(&self, action: HistoryAction) -> HistoryEntry {
        let mut entries = self.entries.write().await;
        let entry = HistoryEntry {
            sequence: entries.len() as u64,
            text: action.to_string(),
            action,
            recorded_at: Utc::now(),
        };
        entries.push(entry.clone());
        entry
    }

    /// The last `limit` entries, oldest first
    pub async fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.read().await;
        let start = entries.len().saturating_sub(limit);
        entries[start..].to_vec()
    }

    /// Every entry of the session, oldest first
    pub async fn all(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
