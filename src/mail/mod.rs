pub mod gmail;
pub mod imap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("mail API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("IMAP: {0}")]
    Imap(String),
}

/// A message ready for task extraction, whatever mailbox it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub date: DateTime<Utc>,
    pub body: String,
}

impl MailMessage {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            from: from.into(),
            date: Utc::now(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}
