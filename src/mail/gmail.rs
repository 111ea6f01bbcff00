use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{MailError, MailMessage};

/// Gmail emits base64url, sometimes padded and sometimes not.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").unwrap());
static DISPLAY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*<.*>").unwrap());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

#[derive(Debug, Default, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// The subset of a `format=full` Gmail message we read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

impl MessagePart {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }

    /// Depth-first search for the first part of `mime_type` carrying data.
    fn find_part(&self, mime_type: &str) -> Option<&MessagePart> {
        for part in &self.parts {
            if part.mime_type.eq_ignore_ascii_case(mime_type) && part.data().is_some() {
                return Some(part);
            }
            if let Some(found) = part.find_part(mime_type) {
                return Some(found);
            }
        }
        None
    }
}

fn decode_body(data: &str) -> Option<String> {
    match BASE64URL.decode(data.trim()) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            log::debug!("Could not decode Gmail body: {}", e);
            None
        }
    }
}

pub fn strip_html(html: &str) -> String {
    HTML_TAG_RE.replace_all(html, "").trim().to_string()
}

/// `"Jane Doe" <jane@example.com>` -> `Jane Doe`
pub fn clean_sender(from: &str) -> String {
    if !from.contains('<') {
        return from.trim().to_string();
    }
    match DISPLAY_NAME_RE
        .captures(from)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_matches('"').trim())
        .filter(|name| !name.is_empty())
    {
        Some(name) => name.to_string(),
        None => from.replace(['<', '>'], "").trim().to_string(),
    }
}

fn parse_date(header: Option<&str>, internal_date: Option<&str>) -> DateTime<Utc> {
    if let Some(raw) = header {
        // Some senders append a zone comment: "... +0000 (UTC)"
        let trimmed = match raw.find(" (") {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed.trim()) {
            return dt.with_timezone(&Utc);
        }
    }
    internal_date
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}

/// Flatten a Gmail message into subject, sender, date and plain-text body.
/// Body preference: text/plain part, text/html part (tags stripped), the
/// payload body, then the snippet.
pub fn parse_message(message: GmailMessage) -> MailMessage {
    let payload = message.payload.unwrap_or_default();

    let subject = payload
        .header("Subject")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("(No Subject)")
        .to_string();
    let from = payload
        .header("From")
        .map(clean_sender)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown Sender".to_string());
    let date = parse_date(payload.header("Date"), message.internal_date.as_deref());

    let body = if !payload.parts.is_empty() {
        if let Some(text) = payload
            .find_part("text/plain")
            .and_then(|p| p.data())
            .and_then(decode_body)
        {
            Some(text)
        } else {
            payload
                .find_part("text/html")
                .and_then(|p| p.data())
                .and_then(decode_body)
                .map(|html| strip_html(&html))
        }
    } else {
        payload.data().and_then(decode_body).map(|text| {
            if payload.mime_type.eq_ignore_ascii_case("text/html") {
                strip_html(&text)
            } else {
                text
            }
        })
    };

    MailMessage {
        id: message.id,
        subject,
        from,
        date,
        body: body.unwrap_or(message.snippet),
    }
}

/// Read-only Gmail REST client authorised with an OAuth access token the
/// frontend obtained.
pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MailError> {
        let url = format!("{}/gmail/v1/users/me/{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(MailError::Api { status, message });
        }

        Ok(resp.json().await?)
    }

    /// The mailbox owner's address.
    pub async fn profile_email(&self) -> Result<String, MailError> {
        let profile: Profile = self.get_json("profile", &[]).await?;
        Ok(profile.email_address)
    }

    /// Ids of the newest inbox messages, newest first.
    pub async fn list_inbox(&self, max_results: u32) -> Result<Vec<String>, MailError> {
        let list: MessageList = self
            .get_json(
                "messages",
                &[
                    ("maxResults", max_results.to_string()),
                    ("q", "in:inbox".to_string()),
                ],
            )
            .await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    pub async fn fetch_message(&self, id: &str) -> Result<MailMessage, MailError> {
        let raw: GmailMessage = self
            .get_json(&format!("messages/{}", id), &[("format", "full".to_string())])
            .await?;
        Ok(parse_message(raw))
    }

    /// List the inbox and fetch every listed message concurrently.
    pub async fn fetch_inbox(&self, max_results: u32) -> Result<Vec<MailMessage>, MailError> {
        let ids = self.list_inbox(max_results).await?;
        log::info!("Gmail: {} inbox messages listed", ids.len());
        futures::future::try_join_all(ids.iter().map(|id| self.fetch_message(id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(s)
    }

    #[test]
    fn sender_is_reduced_to_display_name() {
        assert_eq!(clean_sender("Jane Doe <jane@example.com>"), "Jane Doe");
        assert_eq!(clean_sender("\"Prof. X\" <x@uni.edu>"), "Prof. X");
        assert_eq!(clean_sender("<noreply@example.com>"), "noreply@example.com");
        assert_eq!(clean_sender("plain@example.com"), "plain@example.com");
    }

    #[test]
    fn prefers_plain_text_part() {
        let msg: GmailMessage = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "snippet": "snippet text",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "Subject", "value": "Project report due"},
                    {"name": "From", "value": "Boss <boss@corp.com>"},
                    {"name": "Date", "value": "Tue, 20 May 2025 09:00:00 +0000 (UTC)"}
                ],
                "parts": [
                    {"mimeType": "text/html", "body": {"data": encode("<p>html body</p>")}},
                    {"mimeType": "text/plain", "body": {"data": encode("Please send the report?")}}
                ]
            }
        }))
        .unwrap();
        let mail = parse_message(msg);
        assert_eq!(mail.id, "abc");
        assert_eq!(mail.subject, "Project report due");
        assert_eq!(mail.from, "Boss");
        assert_eq!(mail.body, "Please send the report?");
        assert_eq!(mail.date.to_rfc3339(), "2025-05-20T09:00:00+00:00");
    }

    #[test]
    fn falls_back_to_html_then_snippet() {
        let msg: GmailMessage = serde_json::from_value(serde_json::json!({
            "id": "h",
            "snippet": "snip",
            "payload": {
                "mimeType": "multipart/mixed",
                "headers": [],
                "parts": [
                    {"mimeType": "multipart/alternative", "parts": [
                        {"mimeType": "text/html", "body": {"data": encode("<b>Meeting</b> at 3")}}
                    ]}
                ]
            }
        }))
        .unwrap();
        let mail = parse_message(msg);
        assert_eq!(mail.body, "Meeting at 3");
        assert_eq!(mail.subject, "(No Subject)");
        assert_eq!(mail.from, "Unknown Sender");

        let bare: GmailMessage =
            serde_json::from_value(serde_json::json!({"id": "s", "snippet": "only snippet"}))
                .unwrap();
        assert_eq!(parse_message(bare).body, "only snippet");
    }

    #[test]
    fn decodes_padded_and_unpadded_base64url() {
        assert_eq!(decode_body("aGk_").as_deref(), Some("hi?"));
        assert_eq!(decode_body("aGk=").as_deref(), Some("hi"));
        assert_eq!(decode_body("aGk").as_deref(), Some("hi"));
    }
}
