use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reminder::ReminderWindow;
use super::task::{DEFAULT_USER_ID, Task};
use super::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    Reminder,
    NewTask,
    Deadline,
    Test,
    #[serde(other)]
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default = "new_notification_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NotificationKind,
    #[serde(
        rename = "reminderTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reminder_time: Option<ReminderWindow>,
    #[serde(default = "Utc::now", with = "instant_required")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub urgent: bool,
    #[serde(default = "default_user_id", deserialize_with = "wire::user_id")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

fn new_notification_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_kind() -> NotificationKind {
    NotificationKind::Info
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

mod instant_required {
    use chrono::{DateTime, Utc};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::wire::format_instant(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        Ok(super::wire::instant::deserialize(deserializer)?.unwrap_or_else(Utc::now))
    }
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        user_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_notification_id(),
            title: title.into(),
            message: message.into(),
            kind,
            reminder_time: None,
            time: now,
            read: false,
            urgent: false,
            user_id: user_id.into(),
            task_id: None,
        }
    }

    pub fn new_task(task: &Task, now: DateTime<Utc>) -> Self {
        let mut n = Self::new(
            "New Task Added",
            format!("\"{}\" has been added to your tasks", task.title),
            NotificationKind::NewTask,
            task.user_id.clone(),
            now,
        );
        n.task_id = Some(task.id.clone());
        n
    }

    pub fn reminder(task: &Task, window: ReminderWindow, now: DateTime<Utc>) -> Self {
        let mut n = Self::new(
            window.title(),
            format!(
                "Task \"{}\" starts in about {}",
                task.title,
                window.lead_phrase()
            ),
            NotificationKind::Reminder,
            task.user_id.clone(),
            now,
        );
        n.reminder_time = Some(window);
        n.urgent = window.is_urgent();
        n.task_id = Some(task.id.clone());
        n
    }

    pub fn deadline(task: &Task, now: DateTime<Utc>) -> Self {
        let mut n = Self::new(
            "Deadline Approaching",
            format!("Deadline for \"{}\" is in about 1 day", task.title),
            NotificationKind::Deadline,
            task.user_id.clone(),
            now,
        );
        n.task_id = Some(task.id.clone());
        n
    }

    pub fn test(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::new(
            "Test Notification",
            "This is a test notification",
            NotificationKind::Test,
            user_id,
            now,
        )
    }

    /// Same title, message, owner and type; ids and timestamps differ freely.
    pub fn is_duplicate_of(&self, other: &Notification) -> bool {
        self.title == other.title
            && self.message == other.message
            && self.user_id == other.user_id
            && self.kind == other.kind
    }

    pub fn belongs_to(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
