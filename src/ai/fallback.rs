//! Keyword heuristics used when the AI extractor is unavailable.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;

use crate::core::task::{TaskDraft, Urgency};
use crate::mail::MailMessage;

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static US_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})\b").unwrap());

const ACTION_PHRASES: &[&str] = &[
    "task", "todo", "to-do", "to do", "action item", "action required",
    "please complete", "please finish", "please do", "please handle",
    "deadline", "due by", "due date", "by tomorrow", "by monday", "by tuesday",
    "by wednesday", "by thursday", "by friday", "asap", "urgent",
    "important", "priority", "follow up", "review", "complete",
    "finish", "submit", "send", "prepare", "create", "update",
    "check", "verify", "confirm", "schedule", "arrange", "organize",
    "call", "email", "contact", "remind", "remember", "don't forget",
    "exam", "assignment", "homework", "project", "report", "presentation",
    "meeting", "appointment", "interview", "session", "class", "lecture",
];

/// Checked top to bottom; the first level with a matching phrase wins.
/// Low-priority phrases go first so "not urgent" is not read as "urgent".
/// The generic level-3 phrases go last, so "please ... asap" is a 5 rather
/// than a 3.
const URGENCY_PHRASES: &[(i64, &[&str])] = &[
    (1, &["low priority", "not urgent", "whenever", "no rush"]),
    (2, &["when you can", "at your convenience", "sometime", "eventually"]),
    (5, &["urgent", "asap", "as soon as possible", "immediately", "right away", "high priority", "critical", "emergency"]),
    (4, &["important", "priority", "soon", "quickly", "fast", "prompt"]),
    (3, &["need", "should", "please", "required"]),
];

const CATEGORY_PATTERNS: &[(&str, &[&str])] = &[
    ("Meeting", &["meeting", "call", "conference", "zoom", "teams", "discuss", "talk", "conversation"]),
    ("Work", &["report", "document", "presentation", "project", "task", "assignment", "work"]),
    ("Study", &["study", "exam", "test", "quiz", "homework", "assignment", "class", "course", "lecture", "pfa"]),
    ("Review", &["review", "feedback", "check", "evaluate", "assess"]),
    ("Personal", &["personal", "family", "friend", "home", "house", "apartment"]),
];

#[derive(Debug, Clone, Copy)]
enum RelativeDay {
    Days(i64),
    /// Next occurrence of a weekday, counted from Sunday = 0.
    NextWeekday(u32),
}

const DATE_PHRASES: &[(&str, RelativeDay)] = &[
    ("tomorrow", RelativeDay::Days(1)),
    ("next monday", RelativeDay::NextWeekday(1)),
    ("next tuesday", RelativeDay::NextWeekday(2)),
    ("next wednesday", RelativeDay::NextWeekday(3)),
    ("next thursday", RelativeDay::NextWeekday(4)),
    ("next friday", RelativeDay::NextWeekday(5)),
    ("next week", RelativeDay::Days(7)),
    ("in two days", RelativeDay::Days(2)),
    ("in 2 days", RelativeDay::Days(2)),
    ("in three days", RelativeDay::Days(3)),
    ("in 3 days", RelativeDay::Days(3)),
    ("next month", RelativeDay::Days(30)),
];

const MAX_DESCRIPTION_CHARS: usize = 200;
const EMAIL_CATEGORY: &str = "Email";

pub fn looks_actionable(content: &str, subject: &str) -> bool {
    ACTION_PHRASES.iter().any(|p| content.contains(p))
        || (content.contains('?') && content.chars().count() > 50)
        || subject.chars().count() > 10
}

pub fn detect_urgency(content: &str) -> Urgency {
    URGENCY_PHRASES
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| content.contains(p)))
        .map(|(level, _)| Urgency::new(*level))
        .unwrap_or_default()
}

pub fn detect_category(content: &str) -> Option<&'static str> {
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| content.contains(p)))
        .map(|(category, _)| *category)
}

/// Days from `today` until the next given weekday, never zero.
fn days_until_next(today: NaiveDate, weekday_from_sunday: u32) -> i64 {
    let current = today.weekday().num_days_from_sunday();
    if current < weekday_from_sunday {
        (weekday_from_sunday - current) as i64
    } else {
        (7 + weekday_from_sunday - current) as i64
    }
}

/// First explicit date (ISO, then month/day/year), else the first relative
/// phrase. Dates resolve to midnight UTC.
pub fn detect_deadline(content: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let explicit = ISO_DATE_RE
        .captures(content)
        .and_then(|c| {
            NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)
        })
        .or_else(|| {
            US_DATE_RE.captures(content).and_then(|c| {
                let month: u32 = c[1].parse().ok()?;
                let day: u32 = c[2].parse().ok()?;
                let mut year: i32 = c[3].parse().ok()?;
                if year < 100 {
                    year += 2000;
                }
                NaiveDate::from_ymd_opt(year, month, day)
            })
        });

    let today = now.date_naive();
    let date = explicit.or_else(|| {
        DATE_PHRASES
            .iter()
            .find(|(phrase, _)| content.contains(phrase))
            .map(|(_, rel)| match *rel {
                RelativeDay::Days(n) => today + Duration::days(n),
                RelativeDay::NextWeekday(wd) => today + Duration::days(days_until_next(today, wd)),
            })
    })?;

    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

fn truncate_description(text: String) -> String {
    if text.chars().count() > MAX_DESCRIPTION_CHARS {
        let cut: String = text.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

/// Turn one email into a task draft when it looks actionable.
pub fn extract_from_email(email: &MailMessage, now: DateTime<Utc>) -> Option<TaskDraft> {
    let subject = email.subject.to_lowercase();
    let content = format!("{} {}", subject, email.body.to_lowercase());

    if !looks_actionable(&content, &subject) {
        return None;
    }

    Some(TaskDraft {
        id: None,
        title: email.subject.trim().to_string(),
        description: truncate_description(format!("From: {} - {}", email.from, email.body.trim())),
        category: Some(detect_category(&content).unwrap_or(EMAIL_CATEGORY).to_string()),
        urgency: detect_urgency(&content),
        start_at: Some(now),
        end_at: Some(now + Duration::days(1)),
        deadline: detect_deadline(&content, now),
        user_id: None,
    })
}

/// Free text: every actionable non-empty line becomes a task, starting now
/// and lasting an hour.
pub fn extract_from_text(text: &str, now: DateTime<Utc>) -> Vec<TaskDraft> {
    text.lines()
        .map(str::trim)
        .map(|line| line.trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let content = line.to_lowercase();
            if !looks_actionable(&content, &content) {
                return None;
            }
            let title: String = line.chars().take(100).collect();
            Some(TaskDraft {
                id: None,
                title,
                description: truncate_description(line.to_string()),
                category: detect_category(&content).map(str::to_string),
                urgency: detect_urgency(&content),
                start_at: Some(now),
                end_at: Some(now + Duration::hours(1)),
                deadline: detect_deadline(&content, now),
                user_id: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A Tuesday.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
    }

    #[test]
    fn urgency_levels() {
        assert_eq!(detect_urgency("this is urgent").get(), 5);
        assert_eq!(detect_urgency("not urgent at all").get(), 1);
        assert_eq!(detect_urgency("important stuff").get(), 4);
        assert_eq!(detect_urgency("please reply").get(), 3);
        assert_eq!(detect_urgency("at your convenience").get(), 2);
        assert_eq!(detect_urgency("hello there").get(), 3);
    }

    #[test]
    fn explicit_urgency_outranks_polite_phrasing() {
        assert_eq!(detect_urgency("please send it asap").get(), 5);
        assert_eq!(detect_urgency("please take a look soon").get(), 4);
        assert_eq!(detect_urgency("please, no rush").get(), 1);
    }

    #[test]
    fn categories_follow_pattern_order() {
        assert_eq!(detect_category("team meeting about the report"), Some("Meeting"));
        assert_eq!(detect_category("quarterly report"), Some("Work"));
        assert_eq!(detect_category("pfa exam"), Some("Study"));
        assert_eq!(detect_category("nothing here"), None);
    }

    #[test]
    fn deadlines() {
        assert_eq!(detect_deadline("due 2025-06-01 sharp", now()), midnight(2025, 6, 1));
        assert_eq!(detect_deadline("due 6/15/25", now()), midnight(2025, 6, 15));
        assert_eq!(detect_deadline("send it tomorrow", now()), midnight(2025, 5, 21));
        // Tuesday -> next friday is 3 days out, next tuesday a full week
        assert_eq!(detect_deadline("by next friday", now()), midnight(2025, 5, 23));
        assert_eq!(detect_deadline("next tuesday works", now()), midnight(2025, 5, 27));
        assert_eq!(detect_deadline("in 3 days", now()), midnight(2025, 5, 23));
        assert_eq!(detect_deadline("no dates here", now()), None);
    }

    #[test]
    fn email_becomes_task() {
        let email = MailMessage::new("m1", "Submit the PFA report", "Prof. Alami")
            .with_body("Please submit your report ASAP, due 2025-05-25.");
        let draft = extract_from_email(&email, now()).unwrap();
        assert_eq!(draft.title, "Submit the PFA report");
        assert_eq!(
            draft.description,
            "From: Prof. Alami - Please submit your report ASAP, due 2025-05-25."
        );
        assert_eq!(draft.category.as_deref(), Some("Work"));
        assert_eq!(draft.urgency.get(), 5);
        assert_eq!(draft.deadline, midnight(2025, 5, 25));
        assert_eq!(draft.start_at, Some(now()));
        assert_eq!(draft.end_at, Some(now() + Duration::days(1)));
    }

    #[test]
    fn short_chatty_email_is_ignored() {
        let email = MailMessage::new("m2", "Hi", "Sam").with_body("Nice weekend!");
        assert!(extract_from_email(&email, now()).is_none());
    }

    #[test]
    fn long_description_is_capped() {
        let email = MailMessage::new("m3", "Newsletter of the month", "News")
            .with_body("x".repeat(500));
        let draft = extract_from_email(&email, now()).unwrap();
        assert_eq!(draft.description.chars().count(), 200);
        assert!(draft.description.ends_with("..."));
        assert_eq!(draft.category.as_deref(), Some("Email"));
    }

    #[test]
    fn text_lines_become_tasks() {
        let drafts = extract_from_text(
            "- call the dentist tomorrow\n\n* hi\n- study for the exam in 2 days",
            now(),
        );
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "call the dentist tomorrow");
        assert_eq!(drafts[0].category.as_deref(), Some("Meeting"));
        assert_eq!(drafts[0].deadline, midnight(2025, 5, 21));
        assert_eq!(drafts[1].category.as_deref(), Some("Study"));
        assert_eq!(drafts[1].end_at, Some(now() + Duration::hours(1)));
    }
}
