use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::wire;

pub const DEFAULT_USER_ID: &str = "1";
pub const DEFAULT_CATEGORY: &str = "General";

/// Task urgency, 1 (low) to 5 (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Urgency(u8);

impl Urgency {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Clamp any integer into the valid range.
    pub fn new(level: i64) -> Self {
        Self(level.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Self(3)
    }
}

impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(wire::loose_integer(deserializer)?
            .map(Urgency::new)
            .unwrap_or_default())
    }
}

/// An incoming task as posted by the frontend, read from an import file, or
/// produced by an extractor. Everything but the title is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, with = "wire::instant")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire::instant")]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire::instant")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::optional_id")]
    pub user_id: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default = "new_task_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, with = "wire::instant")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire::instant")]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire::instant")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default = "default_user_id", deserialize_with = "wire::user_id")]
    pub user_id: String,
    #[serde(default, with = "wire::instant")]
    pub created_at: Option<DateTime<Utc>>,
}

fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_task_id(),
            title: title.into(),
            description: String::new(),
            category: default_category(),
            urgency: Urgency::default(),
            start_at: None,
            end_at: None,
            deadline: None,
            user_id: default_user_id(),
            created_at: Some(Utc::now()),
        }
    }

    /// Normalise a draft into a storable task.
    pub fn from_draft(mut draft: TaskDraft, now: DateTime<Utc>) -> Self {
        let id = draft
            .id
            .take()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_task_id);
        let mut task = Self {
            id,
            title: String::new(),
            description: String::new(),
            category: default_category(),
            urgency: Urgency::default(),
            start_at: None,
            end_at: None,
            deadline: None,
            user_id: default_user_id(),
            created_at: Some(now),
        };
        task.apply_draft(draft);
        task
    }

    /// Overwrite the editable fields from a draft. `id` and `created_at` are kept,
    /// and `user_id` only changes when the draft names one.
    pub fn apply_draft(&mut self, draft: TaskDraft) {
        self.title = draft.title.trim().to_string();
        self.description = draft.description.trim().to_string();
        self.category = draft
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(default_category);
        self.urgency = draft.urgency;
        self.start_at = draft.start_at;
        self.end_at = draft.end_at;
        self.deadline = draft.deadline;
        if let Some(user_id) = draft.user_id {
            self.user_id = user_id;
        }
    }

    /// Two tasks are duplicates when every user-visible field matches.
    pub fn is_duplicate_of(&self, other: &Task) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.category == other.category
            && self.urgency == other.urgency
            && self.start_at == other.start_at
            && self.end_at == other.end_at
            && self.deadline == other.deadline
            && self.user_id == other.user_id
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn hours_until_start(&self, now: DateTime<Utc>) -> Option<f64> {
        self.start_at.map(|start| hours_between(now, start))
    }

    pub fn hours_until_deadline(&self, now: DateTime<Utc>) -> Option<f64> {
        self.deadline.map(|deadline| hours_between(now, deadline))
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}
