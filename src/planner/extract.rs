//! Turning free text and mailboxes into tasks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AddOutcome, Planner, PlannerError};
use crate::ai::fallback;
use crate::core::task::TaskDraft;
use crate::core::user::User;
use crate::mail::gmail::GmailClient;
use crate::mail::{MailMessage, imap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub source: ExtractionSource,
    pub extracted: usize,
    #[serde(flatten)]
    pub outcome: AddOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct MailScanReport {
    pub user_id: String,
    pub fetched: usize,
    /// Messages skipped because an earlier scan already handled them.
    pub already_processed: usize,
    pub scanned: usize,
    pub source: ExtractionSource,
    pub extracted: usize,
    #[serde(flatten)]
    pub outcome: AddOutcome,
}

impl Planner {
    /// Extract tasks from pasted text and store them. Gemini is used when
    /// configured; any failure there falls back to keyword heuristics.
    pub async fn analyze_text(
        &self,
        text: &str,
        user_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ExtractionReport, PlannerError> {
        if text.trim().is_empty() {
            return Err(PlannerError::InvalidInput("text to analyze is empty".into()));
        }

        let (mut drafts, source) = match &self.gemini {
            Some(gemini) => match gemini.extract_from_text(text, now, &self.location).await {
                Ok(drafts) => (drafts, ExtractionSource::Ai),
                Err(e) => {
                    log::warn!("Gemini text analysis failed, using keyword fallback: {}", e);
                    (fallback::extract_from_text(text, now), ExtractionSource::Fallback)
                }
            },
            None => (fallback::extract_from_text(text, now), ExtractionSource::Fallback),
        };

        if let Some(uid) = user_id {
            stamp_owner(&mut drafts, &uid);
        }
        let extracted = drafts.len();
        let outcome = self.add_tasks(drafts, now)?;
        Ok(ExtractionReport {
            source,
            extracted,
            outcome,
        })
    }

    async fn extract_from_emails(
        &self,
        emails: &[MailMessage],
        now: DateTime<Utc>,
    ) -> (Vec<TaskDraft>, ExtractionSource) {
        if let Some(gemini) = &self.gemini {
            match gemini.extract_from_emails(emails, now).await {
                Ok(drafts) => return (drafts, ExtractionSource::Ai),
                Err(e) => log::warn!("Gemini email analysis failed, using keyword fallback: {}", e),
            }
        }
        let drafts = emails
            .iter()
            .filter_map(|email| fallback::extract_from_email(email, now))
            .collect();
        (drafts, ExtractionSource::Fallback)
    }

    /// Run a batch of mailbox messages (newest first) through extraction for
    /// `user_id`. Messages recorded by an earlier scan are skipped, at most
    /// `scan_batch` of the rest are analyzed, and their ids are recorded.
    pub async fn scan_messages(
        &self,
        user_id: &str,
        messages: Vec<MailMessage>,
        now: DateTime<Utc>,
    ) -> Result<MailScanReport, PlannerError> {
        let history = self.scan_history(user_id)?;
        let fetched = messages.len();
        let fresh: Vec<MailMessage> = messages
            .into_iter()
            .filter(|m| !history.is_processed(&m.id))
            .collect();
        let already_processed = fetched - fresh.len();
        let batch: Vec<MailMessage> = fresh.into_iter().take(self.gmail.scan_batch).collect();

        log::info!(
            "Scanning {} of {} messages for user {} ({} already processed)",
            batch.len(),
            fetched,
            user_id,
            already_processed
        );

        let (mut drafts, source) = if batch.is_empty() {
            (Vec::new(), ExtractionSource::Fallback)
        } else {
            self.extract_from_emails(&batch, now).await
        };
        stamp_owner(&mut drafts, user_id);
        let extracted = drafts.len();
        let outcome = self.add_tasks(drafts, now)?;

        self.record_scan(user_id, batch.iter().map(|m| m.id.as_str()), now)?;

        Ok(MailScanReport {
            user_id: user_id.to_string(),
            fetched,
            already_processed,
            scanned: batch.len(),
            source,
            extracted,
            outcome,
        })
    }

    /// Scan a Gmail inbox with an access token the frontend obtained. The
    /// mailbox owner is looked up by address and created if unknown.
    pub async fn scan_gmail(
        &self,
        access_token: &str,
        max_results: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(User, MailScanReport), PlannerError> {
        if access_token.trim().is_empty() {
            return Err(PlannerError::InvalidInput("access_token is required".into()));
        }
        let client = GmailClient::new(&self.gmail.base_url, access_token.trim());
        let email = client.profile_email().await?;
        let (user, _) = self.find_or_create_user(&email, now)?;

        let messages = client
            .fetch_inbox(max_results.unwrap_or(self.gmail.max_results))
            .await?;
        let report = self.scan_messages(&user.id, messages, now).await?;
        Ok((user, report))
    }

    /// Scan the configured IMAP account, if there is one. Tasks go to
    /// `user_id` when given, else to the account's configured owner.
    pub async fn scan_imap(
        &self,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MailScanReport, PlannerError> {
        let account = self
            .imap
            .as_ref()
            .ok_or_else(|| PlannerError::InvalidInput("no IMAP account configured".into()))?;
        let messages = imap::fetch_recent(account, self.gmail.max_results).await?;
        let owner = user_id.unwrap_or(&account.user_id);
        self.scan_messages(owner, messages, now).await
    }
}

fn stamp_owner(drafts: &mut [TaskDraft], user_id: &str) {
    for draft in drafts {
        draft.user_id = Some(user_id.to_string());
    }
}
