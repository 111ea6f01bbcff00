use chrono::{NaiveDateTime, Utc};
use futures::TryStreamExt;

use super::{MailError, MailMessage};
use crate::config::ImapAccount;

type ImapSession = async_imap::Session<async_native_tls::TlsStream<async_std::net::TcpStream>>;

/// Resolve a folder name case-insensitively against the server's mailbox list.
async fn resolve_folder(session: &mut ImapSession, folder: &str) -> Result<String, MailError> {
    let folders_stream = session
        .list(Some(""), Some("*"))
        .await
        .map_err(|e| MailError::Imap(format!("Failed to list folders: {}", e)))?;
    let folders: Vec<_> = folders_stream
        .try_collect()
        .await
        .map_err(|e| MailError::Imap(format!("Failed to collect folders: {}", e)))?;

    for f in &folders {
        if f.name().eq_ignore_ascii_case(folder) {
            return Ok(f.name().to_string());
        }
    }

    Err(MailError::Imap(format!(
        "Folder '{}' not found (available: {})",
        folder,
        folders
            .iter()
            .map(|f| f.name().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

/// Connect to IMAP over TLS and return a logged-in session.
async fn connect_and_login(account: &ImapAccount) -> Result<ImapSession, MailError> {
    let tls = async_native_tls::TlsConnector::new();
    let tcp = async_std::net::TcpStream::connect((account.host.as_str(), 993))
        .await
        .map_err(|e| MailError::Imap(format!("TCP connect failed: {}", e)))?;
    let tls_stream = tls
        .connect(account.host.as_str(), tcp)
        .await
        .map_err(|e| MailError::Imap(format!("TLS connect failed: {}", e)))?;

    let client = async_imap::Client::new(tls_stream);
    client
        .login(&account.username, &account.password)
        .await
        .map_err(|e| MailError::Imap(format!("IMAP login failed: {}", e.0)))
}

/// Parse a raw RFC 822 message into a [`MailMessage`].
pub fn parse_raw(uid: u32, raw: &[u8]) -> Option<MailMessage> {
    let parsed = mail_parser::MessageParser::default().parse(raw)?;

    let subject = parsed
        .subject()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("(No Subject)")
        .to_string();

    let from = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .map(|a| {
            if let Some(name) = a.name() {
                name.to_string()
            } else {
                a.address().unwrap_or("Unknown Sender").to_string()
            }
        })
        .unwrap_or_else(|| "Unknown Sender".to_string());

    let date = parsed
        .date()
        .and_then(|dt| {
            NaiveDateTime::parse_from_str(
                &format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
                ),
                "%Y-%m-%d %H:%M:%S",
            )
            .ok()
        })
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now);

    let body = parsed.body_text(0).unwrap_or_default().to_string();

    Some(MailMessage {
        id: format!("imap:{}", uid),
        subject,
        from,
        date,
        body,
    })
}

/// Fetch the newest `limit` messages from the account's folder, newest first.
pub async fn fetch_recent(account: &ImapAccount, limit: u32) -> Result<Vec<MailMessage>, MailError> {
    let mut session = connect_and_login(account).await?;

    let folder = resolve_folder(&mut session, &account.folder).await?;
    let mailbox = session
        .select(&folder)
        .await
        .map_err(|e| MailError::Imap(format!("Failed to select folder '{}': {}", folder, e)))?;

    if mailbox.exists == 0 || limit == 0 {
        session.logout().await.ok();
        return Ok(Vec::new());
    }
    let first = mailbox.exists.saturating_sub(limit - 1).max(1);
    let range = format!("{}:{}", first, mailbox.exists);

    let messages_stream = session
        .fetch(&range, "(UID BODY.PEEK[])")
        .await
        .map_err(|e| MailError::Imap(format!("IMAP fetch failed: {}", e)))?;

    let messages: Vec<_> = messages_stream
        .try_collect()
        .await
        .map_err(|e| MailError::Imap(format!("IMAP stream error: {}", e)))?;

    let mut emails: Vec<MailMessage> = messages
        .iter()
        .filter_map(|msg| parse_raw(msg.uid.unwrap_or(0), msg.body()?))
        .collect();
    emails.sort_by(|a, b| b.date.cmp(&a.date));

    session.logout().await.ok();
    log::info!("IMAP: fetched {} messages from {}", emails.len(), folder);
    Ok(emails)
}
