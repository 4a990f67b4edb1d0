//! Telegram adapter: long-polls the Bot API and bridges updates to the
//! chat engine.
//!
//! Inbound updates become [`ChatEvent`]s on the engine channel; engine
//! replies come back over a second channel and are sent with
//! `parse_mode=HTML`. The poll loop reconnects with exponential backoff
//! after transport errors.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChatEvent, ChatReply};

/// Connect timeout for the Bot API client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Extra request-timeout headroom on top of the long-poll window, so the
/// server side always answers first.
const POLL_TIMEOUT_HEADROOM_SECS: u64 = 10;

/// First reconnect delay after a poll error (milliseconds).
const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Maximum reconnect backoff (milliseconds).
const MAX_BACKOFF_MS: u64 = 30_000;

/// Errors from the Telegram Bot API adapter.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// Transport failure talking to the Bot API.
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The Bot API answered with an error status or `ok=false`.
    #[error("telegram api error: {0}")]
    Api(String),
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    chat: Chat,
    #[serde(default)]
    from: Option<Sender>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Sender {
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
}

impl Sender {
    fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

/// Media and service messages carry no text and are ignored.
fn event_from(message: IncomingMessage) -> Option<ChatEvent> {
    let text = message.text?;
    let sender_name = message
        .from
        .map(|sender| sender.display_name())
        .unwrap_or_default();
    Some(ChatEvent {
        chat_id: message.chat.id,
        sender_name,
        text,
    })
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Long-polling Telegram Bot API adapter.
#[derive(Debug, Clone)]
pub struct TelegramAdapter {
    client: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u32,
}

impl TelegramAdapter {
    /// Build an adapter for the hosted Bot API.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError`] when the HTTP client cannot be built.
    pub fn new(bot_token: &str, poll_timeout_secs: u32) -> Result<Self, TelegramError> {
        Self::with_base_url(
            format!("https://api.telegram.org/bot{bot_token}"),
            poll_timeout_secs,
        )
    }

    /// Build an adapter against an arbitrary base URL.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError`] when the HTTP client cannot be built.
    #[doc(hidden)]
    pub fn with_base_url(base_url: String, poll_timeout_secs: u32) -> Result<Self, TelegramError> {
        let request_timeout = Duration::from_secs(
            u64::from(poll_timeout_secs).saturating_add(POLL_TIMEOUT_HEADROOM_SECS),
        );
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            poll_timeout_secs,
        })
    }

    /// Run the adapter until the engine side of either channel closes.
    ///
    /// Spawns an outbound sender task for replies, then long-polls
    /// `getUpdates` on the current task, acknowledging each batch through
    /// the offset parameter so updates are delivered once.
    pub async fn run(
        self,
        events: mpsc::Sender<ChatEvent>,
        mut replies: mpsc::Receiver<ChatReply>,
    ) {
        let sender = self.clone();
        let _outbound = tokio::spawn(async move {
            while let Some(reply) = replies.recv().await {
                for message in &reply.messages {
                    if let Err(e) = sender.send_message(reply.chat_id, message).await {
                        warn!(error = %e, chat_id = reply.chat_id, "failed to send telegram message");
                    }
                }
            }
        });

        info!("telegram adapter polling for updates");
        let mut offset: i64 = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        loop {
            match self.get_updates(offset).await {
                Ok(updates) => {
                    backoff_ms = INITIAL_BACKOFF_MS;
                    for update in updates {
                        offset = offset.max(update.update_id.saturating_add(1));
                        let Some(message) = update.message else {
                            continue;
                        };
                        let Some(event) = event_from(message) else {
                            debug!("skipping update without text");
                            continue;
                        };
                        if events.send(event).await.is_err() {
                            info!("event channel closed, telegram adapter stopping");
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, backoff_ms, "getUpdates failed, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                }
            }
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let url = format!(
            "{}/getUpdates?timeout={}&offset={offset}",
            self.base_url, self.poll_timeout_secs
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(TelegramError::Api(format!(
                "getUpdates returned status {}",
                response.status()
            )));
        }
        let body: UpdatesResponse = response.json().await?;
        if !body.ok {
            return Err(TelegramError::Api(body.description.unwrap_or_else(|| {
                "getUpdates answered ok=false".to_owned()
            })));
        }
        Ok(body.result)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let url = format!("{}/sendMessage", self.base_url);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(TelegramError::Api(format!(
                "sendMessage returned status {status}: {detail}"
            )));
        }
        debug!(chat_id, "telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_an_update_batch() {
        let payload = r#"{
            "ok": true,
            "result": [
                {
                    "update_id": 811,
                    "message": {
                        "message_id": 5,
                        "from": {"id": 42, "first_name": "Alice", "last_name": "Smith"},
                        "chat": {"id": 42, "type": "private"},
                        "text": "any rain this week"
                    }
                },
                {"update_id": 812}
            ]
        }"#;

        let parsed: UpdatesResponse = serde_json::from_str(payload).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.len(), 2);
        assert_eq!(parsed.result[0].update_id, 811);
        assert!(parsed.result[1].message.is_none());

        let message = parsed.result[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("any rain this week"));
    }

    #[test]
    fn text_messages_become_events() {
        let message = IncomingMessage {
            chat: Chat { id: 7 },
            from: Some(Sender {
                first_name: "Alice".to_owned(),
                last_name: Some("Smith".to_owned()),
            }),
            text: Some("temps?".to_owned()),
        };

        let event = event_from(message).unwrap();
        assert_eq!(event.chat_id, 7);
        assert_eq!(event.sender_name, "Alice Smith");
        assert_eq!(event.text, "temps?");
    }

    #[test]
    fn media_messages_are_skipped() {
        let message = IncomingMessage {
            chat: Chat { id: 7 },
            from: Some(Sender {
                first_name: "Alice".to_owned(),
                last_name: None,
            }),
            text: None,
        };
        assert!(event_from(message).is_none());
    }

    #[test]
    fn missing_sender_yields_an_empty_name() {
        let message = IncomingMessage {
            chat: Chat { id: 7 },
            from: None,
            text: Some("?".to_owned()),
        };
        assert_eq!(event_from(message).unwrap().sender_name, "");
    }
}
