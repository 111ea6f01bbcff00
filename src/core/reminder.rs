use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::notification::Notification;
use super::task::Task;

/// Lead time before a task's start at which a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderWindow {
    #[serde(rename = "10min")]
    TenMinutes,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "1day")]
    OneDay,
}

impl ReminderWindow {
    /// Upper bounds, in hours until start, of each window. Windows are
    /// half-open `(lower, upper]` and checked nearest first.
    pub const TEN_MINUTES_LIMIT: f64 = 0.18;
    pub const ONE_HOUR_LIMIT: f64 = 1.1;
    pub const ONE_DAY_LIMIT: f64 = 25.0;

    /// Pick the single window a task falls in, if any.
    pub fn classify(hours_until_start: f64) -> Option<Self> {
        let h = hours_until_start;
        if h > 0.0 && h <= Self::TEN_MINUTES_LIMIT {
            Some(Self::TenMinutes)
        } else if h > Self::TEN_MINUTES_LIMIT && h <= Self::ONE_HOUR_LIMIT {
            Some(Self::OneHour)
        } else if h > Self::ONE_HOUR_LIMIT && h <= Self::ONE_DAY_LIMIT {
            Some(Self::OneDay)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TenMinutes => "10min",
            Self::OneHour => "1hour",
            Self::OneDay => "1day",
        }
    }

    /// Human phrase used in the notification message.
    pub fn lead_phrase(&self) -> &'static str {
        match self {
            Self::TenMinutes => "10 minutes",
            Self::OneHour => "1 hour",
            Self::OneDay => "1 day",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::TenMinutes => "Task Starting Soon",
            Self::OneHour => "Upcoming Task Soon",
            Self::OneDay => "Upcoming Task",
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::TenMinutes)
    }
}

/// Deadline notices fire in the hour either side of one day out.
pub fn deadline_due(hours_until_deadline: f64) -> bool {
    hours_until_deadline > 23.0 && hours_until_deadline <= 25.0
}

/// Notifications a task calls for right now: at most one start reminder,
/// plus a deadline notice when the deadline is about a day away.
pub fn pending_for(task: &Task, now: DateTime<Utc>) -> Vec<Notification> {
    let mut out = Vec::new();

    if let Some(window) = task
        .hours_until_start(now)
        .and_then(ReminderWindow::classify)
    {
        out.push(Notification::reminder(task, window, now));
    }

    if task.hours_until_deadline(now).is_some_and(deadline_due) {
        out.push(Notification::deadline(task, now));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notification::NotificationKind;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(ReminderWindow::classify(-1.0), None);
        assert_eq!(ReminderWindow::classify(0.0), None);
        assert_eq!(ReminderWindow::classify(0.01), Some(ReminderWindow::TenMinutes));
        assert_eq!(ReminderWindow::classify(0.18), Some(ReminderWindow::TenMinutes));
        assert_eq!(ReminderWindow::classify(0.19), Some(ReminderWindow::OneHour));
        assert_eq!(ReminderWindow::classify(1.1), Some(ReminderWindow::OneHour));
        assert_eq!(ReminderWindow::classify(1.2), Some(ReminderWindow::OneDay));
        assert_eq!(ReminderWindow::classify(25.0), Some(ReminderWindow::OneDay));
        assert_eq!(ReminderWindow::classify(25.01), None);
        assert_eq!(ReminderWindow::classify(f64::NAN), None);
    }

    #[test]
    fn window_serializes_as_short_codes() {
        let json = serde_json::to_string(&ReminderWindow::OneHour).unwrap();
        assert_eq!(json, "\"1hour\"");
    }

    #[test]
    fn single_reminder_for_nearest_window() {
        let mut task = Task::new("Standup");
        task.start_at = Some(now() + Duration::minutes(8));
        let pending = pending_for(&task, now());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reminder_time, Some(ReminderWindow::TenMinutes));
        assert!(pending[0].urgent);
        assert_eq!(pending[0].message, "Task \"Standup\" starts in about 10 minutes");
    }

    #[test]
    fn past_or_distant_tasks_get_nothing() {
        let mut task = Task::new("Retro");
        task.start_at = Some(now() - Duration::minutes(5));
        assert!(pending_for(&task, now()).is_empty());
        task.start_at = Some(now() + Duration::days(3));
        assert!(pending_for(&task, now()).is_empty());
        task.start_at = None;
        assert!(pending_for(&task, now()).is_empty());
    }

    #[test]
    fn deadline_notice_alongside_reminder() {
        let mut task = Task::new("Ship release");
        task.start_at = Some(now() + Duration::minutes(30));
        task.deadline = Some(now() + Duration::hours(24));
        let pending = pending_for(&task, now());
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].kind, NotificationKind::Reminder);
        assert_eq!(pending[0].reminder_time, Some(ReminderWindow::OneHour));
        assert_eq!(pending[1].kind, NotificationKind::Deadline);
    }
}
