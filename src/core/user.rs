use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "wire::user_id")]
    pub id: String,
    pub email: String,
    #[serde(default = "Utc::now", with = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

mod created_at {
    use chrono::{DateTime, Utc};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::wire::format_instant(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        Ok(super::wire::instant::deserialize(deserializer)?.unwrap_or_else(Utc::now))
    }
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            email: email.into().trim().to_string(),
            created_at: now,
            name: None,
        }
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }
}

/// Next sequential id: one past the highest numeric id in use.
pub fn next_user_id(users: &[User]) -> String {
    let max = users
        .iter()
        .filter_map(|u| u.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}
