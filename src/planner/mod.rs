//! Task, user, notification and scan-history operations over the store.

mod extract;

pub use extract::{ExtractionReport, ExtractionSource, MailScanReport};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::ai::AiError;
use crate::ai::gemini::GeminiClient;
use crate::config::{GmailConfig, ImapAccount, PlannerConfig};
use crate::core::notification::{Notification, NotificationKind};
use crate::core::reminder;
use crate::core::scan::ScanHistory;
use crate::core::task::{Task, TaskDraft};
use crate::core::user::{User, next_user_id};
use crate::mail::MailError;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Mail(#[from] MailError),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of appending a batch of drafts.
#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub added: Vec<Task>,
    pub duplicates: usize,
    /// Drafts dropped for having no title.
    pub rejected: usize,
    /// Stored task count after the append.
    pub total: usize,
    pub notifications: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub tasks: usize,
    pub new_task: usize,
    pub reminders: usize,
    pub deadlines: usize,
}

impl SweepReport {
    pub fn created(&self) -> usize {
        self.new_task + self.reminders + self.deadlines
    }
}

pub struct Planner {
    store: Store,
    gemini: Option<GeminiClient>,
    location: String,
    gmail: GmailConfig,
    imap: Option<ImapAccount>,
}

impl Planner {
    pub fn new(config: &PlannerConfig) -> Result<Self, StoreError> {
        let gemini = GeminiClient::from_config(&config.gemini);
        if gemini.is_none() {
            log::warn!("No Gemini API key configured, using keyword extraction only");
        }
        Ok(Self {
            store: Store::open(config)?,
            gemini,
            location: config.gemini.location.clone(),
            gmail: config.gmail.clone(),
            imap: config.imap.clone(),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // -- Tasks --

    pub fn list_tasks(&self, user_id: Option<&str>) -> Result<Vec<Task>, PlannerError> {
        let tasks = self.store.tasks.load()?;
        Ok(match user_id {
            Some(uid) => tasks.into_iter().filter(|t| t.belongs_to(uid)).collect(),
            None => tasks,
        })
    }

    /// Append drafts that are not duplicates of a stored task or of an earlier
    /// draft in the same batch, then notify about each added task.
    pub fn add_tasks(
        &self,
        drafts: Vec<TaskDraft>,
        now: DateTime<Utc>,
    ) -> Result<AddOutcome, PlannerError> {
        let (added, duplicates, rejected, total) =
            self.store.tasks.try_update(|tasks| {
                let mut added: Vec<Task> = Vec::new();
                let mut duplicates = 0;
                let mut rejected = 0;

                for draft in drafts {
                    if !draft.has_title() {
                        rejected += 1;
                        continue;
                    }
                    let mut task = Task::from_draft(draft, now);
                    if tasks
                        .iter()
                        .chain(added.iter())
                        .any(|existing| existing.is_duplicate_of(&task))
                    {
                        log::info!("Duplicate task detected: {}", task.title);
                        duplicates += 1;
                        continue;
                    }
                    if tasks.iter().chain(added.iter()).any(|t| t.id == task.id) {
                        task.id = uuid::Uuid::new_v4().to_string();
                    }
                    added.push(task);
                }

                tasks.extend(added.iter().cloned());
                let dirty = !added.is_empty();
                Ok::<_, PlannerError>(((added, duplicates, rejected, tasks.len()), dirty))
            })?;

        if !added.is_empty() {
            log::info!(
                "Added {} tasks ({} duplicates skipped), {} stored",
                added.len(),
                duplicates,
                total
            );
        }

        let candidates = added
            .iter()
            .flat_map(|task| {
                std::iter::once(Notification::new_task(task, now))
                    .chain(reminder::pending_for(task, now))
            })
            .collect();
        let notifications = self.push_notifications(candidates)?.len();

        Ok(AddOutcome {
            added,
            duplicates,
            rejected,
            total,
            notifications,
        })
    }

    pub fn update_task(
        &self,
        id: &str,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<Task, PlannerError> {
        if !draft.has_title() {
            return Err(PlannerError::InvalidInput("task title is required".into()));
        }
        let updated = self.store.tasks.try_update(|tasks| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| PlannerError::NotFound(format!("task {}", id)))?;
            task.apply_draft(draft);
            Ok::<_, PlannerError>((task.clone(), true))
        })?;

        // A moved start time may land in a reminder window.
        self.push_notifications(reminder::pending_for(&updated, now))?;
        Ok(updated)
    }

    /// Remove a task along with any notifications that point at it.
    pub fn delete_task(&self, id: &str) -> Result<Task, PlannerError> {
        let removed = self.store.tasks.try_update(|tasks| {
            let pos = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| PlannerError::NotFound(format!("task {}", id)))?;
            Ok::<_, PlannerError>((tasks.remove(pos), true))
        })?;

        let dropped = self.store.notifications.update(|items| {
            let before = items.len();
            items.retain(|n| n.task_id.as_deref() != Some(id));
            before - items.len()
        })?;
        log::info!("Deleted task {} and {} notifications", removed.title, dropped);
        Ok(removed)
    }

    // -- Users --

    pub fn list_users(&self, email: Option<&str>) -> Result<Vec<User>, PlannerError> {
        let users = self.store.users.load()?;
        Ok(match email {
            Some(email) => users.into_iter().filter(|u| u.has_email(email)).collect(),
            None => users,
        })
    }

    pub fn get_user(&self, id: &str) -> Result<User, PlannerError> {
        self.store
            .users
            .load()?
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| PlannerError::NotFound(format!("user {}", id)))
    }

    /// Returns the user and whether it was created.
    pub fn find_or_create_user(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(User, bool), PlannerError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(PlannerError::InvalidInput(format!(
                "invalid email address: {:?}",
                email
            )));
        }
        self.store.users.try_update(|users| {
            if let Some(existing) = users.iter().find(|u| u.has_email(email)) {
                return Ok(((existing.clone(), false), false));
            }
            let user = User::new(next_user_id(users), email, now);
            log::info!("Created user {} for {}", user.id, user.email);
            users.push(user.clone());
            Ok::<_, PlannerError>(((user, true), true))
        })
    }

    // -- Notifications --

    /// Newest first.
    pub fn list_notifications(
        &self,
        user_id: Option<&str>,
        unread_only: bool,
    ) -> Result<Vec<Notification>, PlannerError> {
        let mut items: Vec<Notification> = self
            .store
            .notifications
            .load()?
            .into_iter()
            .filter(|n| user_id.is_none_or(|uid| n.belongs_to(uid)))
            .filter(|n| !unread_only || !n.read)
            .collect();
        items.sort_by(|a, b| b.time.cmp(&a.time));
        Ok(items)
    }

    /// Append candidates that duplicate neither a stored notification nor an
    /// earlier candidate. Returns the ones stored.
    fn push_notifications(
        &self,
        candidates: Vec<Notification>,
    ) -> Result<Vec<Notification>, StoreError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        self.store.notifications.try_update(|items| {
            let mut stored = Vec::new();
            for candidate in candidates {
                if items.iter().any(|n| n.is_duplicate_of(&candidate)) {
                    continue;
                }
                log::debug!("Notification for {}: {}", candidate.user_id, candidate.message);
                items.push(candidate.clone());
                stored.push(candidate);
            }
            let dirty = !stored.is_empty();
            Ok::<_, StoreError>((stored, dirty))
        })
    }

    /// Store a notification unless an equivalent one exists. Returns the
    /// stored (or already present) notification and whether it was new.
    pub fn add_notification(
        &self,
        notification: Notification,
    ) -> Result<(Notification, bool), PlannerError> {
        if notification.title.trim().is_empty() {
            return Err(PlannerError::InvalidInput("notification title is required".into()));
        }
        Ok(self.store.notifications.try_update(|items| {
            if let Some(existing) = items.iter().find(|n| n.is_duplicate_of(&notification)) {
                return Ok(((existing.clone(), false), false));
            }
            items.push(notification.clone());
            Ok::<_, StoreError>(((notification, true), true))
        })?)
    }

    /// Store a notification even if an equivalent one exists.
    pub fn append_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, PlannerError> {
        if notification.title.trim().is_empty() {
            return Err(PlannerError::InvalidInput("notification title is required".into()));
        }
        Ok(self.store.notifications.update(|items| {
            items.push(notification.clone());
            notification
        })?)
    }

    pub fn mark_read(&self, id: &str) -> Result<Notification, PlannerError> {
        self.store.notifications.try_update(|items| {
            let n = items
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| PlannerError::NotFound(format!("notification {}", id)))?;
            n.read = true;
            Ok::<_, PlannerError>((n.clone(), true))
        })
    }

    pub fn mark_all_read(&self, user_id: Option<&str>) -> Result<usize, PlannerError> {
        Ok(self.store.notifications.update(|items| {
            let mut changed = 0;
            for n in items
                .iter_mut()
                .filter(|n| user_id.is_none_or(|uid| n.belongs_to(uid)))
                .filter(|n| !n.read)
            {
                n.read = true;
                changed += 1;
            }
            changed
        })?)
    }

    pub fn delete_notification(&self, id: &str) -> Result<Notification, PlannerError> {
        self.store.notifications.try_update(|items| {
            let pos = items
                .iter()
                .position(|n| n.id == id)
                .ok_or_else(|| PlannerError::NotFound(format!("notification {}", id)))?;
            Ok::<_, PlannerError>((items.remove(pos), true))
        })
    }

    pub fn clear_notifications(&self, user_id: Option<&str>) -> Result<usize, PlannerError> {
        Ok(self.store.notifications.update(|items| {
            let before = items.len();
            items.retain(|n| user_id.is_some_and(|uid| !n.belongs_to(uid)));
            before - items.len()
        })?)
    }

    /// Backfill pass over every stored task: a new-task notification for each,
    /// plus whatever reminder or deadline notice its times call for now.
    pub fn sweep_reminders(&self, now: DateTime<Utc>) -> Result<SweepReport, PlannerError> {
        let tasks = self.store.tasks.load()?;
        let candidates: Vec<Notification> = tasks
            .iter()
            .flat_map(|task| {
                std::iter::once(Notification::new_task(task, now))
                    .chain(reminder::pending_for(task, now))
            })
            .collect();

        let stored = self.push_notifications(candidates)?;
        let mut report = SweepReport {
            tasks: tasks.len(),
            ..SweepReport::default()
        };
        for n in &stored {
            match n.kind {
                NotificationKind::NewTask => report.new_task += 1,
                NotificationKind::Reminder => report.reminders += 1,
                NotificationKind::Deadline => report.deadlines += 1,
                _ => {}
            }
        }
        log::info!(
            "Reminder sweep over {} tasks created {} notifications",
            report.tasks,
            report.created()
        );
        Ok(report)
    }

    // -- Scan history --

    pub fn scan_history(&self, user_id: &str) -> Result<ScanHistory, PlannerError> {
        Ok(self
            .store
            .scans
            .load()?
            .into_iter()
            .find(|h| h.user_id == user_id)
            .unwrap_or_else(|| ScanHistory::new(user_id)))
    }

    pub fn record_scan<I, S>(
        &self,
        user_id: &str,
        email_ids: I,
        now: DateTime<Utc>,
    ) -> Result<ScanHistory, PlannerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.store.scans.update(|histories| {
            let pos = match histories.iter().position(|h| h.user_id == user_id) {
                Some(pos) => pos,
                None => {
                    histories.push(ScanHistory::new(user_id));
                    histories.len() - 1
                }
            };
            histories[pos].record(email_ids, now);
            histories[pos].clone()
        })?)
    }
}
