use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::AiError;
use crate::config::GeminiConfig;
use crate::core::task::TaskDraft;
use crate::mail::MailMessage;

static JSON_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());

/// Categories the email prompt lets the model choose from.
pub const EMAIL_CATEGORIES: &[&str] = &["Work", "Meeting", "Study", "Personal", "Email", "Review"];

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &GeminiConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref()?.trim();
        if api_key.is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Send one prompt and return the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(AiError::Api { status, message });
        }

        let api_resp: serde_json::Value = resp.json().await?;
        api_resp["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(AiError::EmptyResponse)
    }

    pub async fn extract_from_text(
        &self,
        text: &str,
        now: DateTime<Utc>,
        location: &str,
    ) -> Result<Vec<TaskDraft>, AiError> {
        let reply = self.generate(&text_prompt(text, now, location)).await?;
        Ok(parse_task_blocks(&reply))
    }

    pub async fn extract_from_emails(
        &self,
        emails: &[MailMessage],
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskDraft>, AiError> {
        log::info!("Sending {} emails to Gemini for task extraction", emails.len());
        let reply = self.generate(&email_prompt(emails, now)).await?;
        log::debug!("Gemini analysis result: {}", reply);
        Ok(parse_task_blocks(&reply))
    }
}

fn reference_time(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn text_prompt(text: &str, now: DateTime<Utc>, location: &str) -> String {
    let now = reference_time(now);
    let mut prompt = format!(
        "Analyze the following text and extract the task details. Output each task as a valid JSON object \
         with the following fields: \"title\", \"description\", \"category\" (default to \"General\"), \
         \"urgency\" (on a scale of 1-5, default to 3), \"start_at\" (ISO 8601, infer, default to \"{now}\"), \
         \"end_at\" (ISO 8601, infer, default to start_at + 1 hour), and \"deadline\" (ISO 8601, infer, \
         default to end of today). Enclose each JSON object within a Markdown code block (```json ... ```). \
         Separate each JSON code block by a newline.\n\n\
         Text: {text}\n\n\
         Current Date and Time (for reference): {now}"
    );
    if !location.trim().is_empty() {
        prompt.push_str(&format!("\nCurrent Location (for context): {}", location.trim()));
    }
    prompt
}

pub fn email_prompt(emails: &[MailMessage], now: DateTime<Utc>) -> String {
    let now = reference_time(now);
    let combined = emails
        .iter()
        .map(|email| {
            // Cap each body to stay within the output token budget
            let body: String = email.body.chars().take(2000).collect();
            format!(
                "\nEMAIL FROM: {}\nSUBJECT: {}\nCONTENT: {}\n-------------------",
                email.from, email.subject, body
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the following emails and extract task details from them. Output each task as a valid JSON \
         object with the following fields: \"title\", \"description\", \"category\" (one of: {categories}), \
         \"urgency\" (on a scale of 1-5, default to 3), \"start_at\" (ISO 8601, infer, default to \"{now}\"), \
         \"end_at\" (ISO 8601, infer, default to start_at + 1 day), and \"deadline\" (ISO 8601, infer, default \
         to end of today). Enclose each JSON object within a Markdown code block (```json ... ```). Separate \
         each JSON code block by a newline. If no tasks are found in an email, don't create a task for it.\n\n\
         Emails to analyze: {combined}\n\n\
         Current Date and Time (for reference): {now}",
        categories = EMAIL_CATEGORIES.join(", "),
    )
}

/// Pull every ```json block out of a model reply. A block may hold one task
/// object or an array of them; blocks that fail to parse are skipped. A reply
/// with no fenced blocks is tried as bare JSON.
pub fn parse_task_blocks(reply: &str) -> Vec<TaskDraft> {
    let mut blocks: Vec<&str> = JSON_BLOCK_RE
        .captures_iter(reply)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    if blocks.is_empty() {
        blocks.push(reply);
    }

    let mut drafts = Vec::new();
    for block in blocks {
        let value: serde_json::Value = match serde_json::from_str(block.trim()) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Error parsing JSON block from AI reply: {}", e);
                continue;
            }
        };
        let items = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };
        for item in items {
            match serde_json::from_value::<TaskDraft>(item) {
                Ok(draft) if draft.has_title() => drafts.push(draft),
                Ok(_) => log::debug!("Skipping AI task without a title"),
                Err(e) => log::warn!("Skipping malformed AI task: {}", e),
            }
        }
    }
    drafts
}
