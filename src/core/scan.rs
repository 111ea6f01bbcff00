use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire;

/// Which emails have already been turned into tasks for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanHistory {
    #[serde(deserialize_with = "wire::user_id")]
    pub user_id: String,
    #[serde(default)]
    pub processed_email_ids: Vec<String>,
    #[serde(default, with = "wire::instant")]
    pub last_scan_at: Option<DateTime<Utc>>,
}

impl ScanHistory {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            processed_email_ids: Vec::new(),
            last_scan_at: None,
        }
    }

    pub fn is_processed(&self, email_id: &str) -> bool {
        self.processed_email_ids.iter().any(|id| id == email_id)
    }

    /// Append unseen ids in order and stamp the scan time.
    /// Returns how many ids were new.
    pub fn record<I, S>(&mut self, email_ids: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for id in email_ids {
            let id = id.as_ref().trim();
            if id.is_empty() || self.is_processed(id) {
                continue;
            }
            self.processed_email_ids.push(id.to_string());
            added += 1;
        }
        self.last_scan_at = Some(now);
        added
    }
}
