//! Chat engine: user bookkeeping, request classification, and reply
//! rendering.
//!
//! The engine consumes [`ChatEvent`]s from an adapter channel, runs each
//! message through the classifier, and answers with an ordered list of
//! outbound messages. Weather subjects pull a canonical forecast through
//! the provider handle; location and host subjects act on the user
//! registry and persist it after every change.
//!
//! Replies are pre-marked-up for Telegram's HTML parse mode.

pub mod help;
pub mod markup;
pub mod telegram;
pub mod users;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Datelike, Local};
use tokio::sync::{mpsc, Mutex};

use crate::chat::users::{ChatUser, LocationKind, Role, UserError, UserLocation, UserRegistry};
use crate::classify::{Classification, Classifier};
use crate::config::{BotConfig, WeatherConfig};
use crate::lexicon::{HelpKind, HostAction, Intent, Lexicon, LocationChange};
use crate::providers::ProviderHandle;
use crate::query::{self, DisplayContext};

/// Guard reply for weather requests before any location is set.
const NO_LOCATION_MSG: &str =
    "Please set your location first before requesting weather information.";

/// Sent after the location info when a forecast fetch fails.
const FORECAST_FAIL_MSG: &str =
    "I'm sorry, I couldn't retrieve the weather data for your location.";

/// Sent after the location info when an alerts fetch fails.
const ALERTS_FAIL_MSG: &str =
    "I'm sorry, I couldn't retrieve the weather alert data for your location.";

/// Reply when a handler produced no lines at all.
const NOTHING_TO_REPORT_MSG: &str =
    "Sorry, your request found nothing to report, try /h if you need command syntax help";

/// One inbound chat message from an adapter.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    /// Chat id replies are addressed to.
    pub chat_id: i64,
    /// Sender display name as the platform reports it.
    pub sender_name: String,
    /// Raw message text.
    pub text: String,
}

/// The replies for one handled message, sent in order as separate messages.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Chat id to address.
    pub chat_id: i64,
    /// Outbound messages, in send order.
    pub messages: Vec<String>,
}

/// The chat engine. One instance serves every adapter.
pub struct ChatEngine {
    classifier: Classifier,
    provider: Arc<ProviderHandle>,
    registry: Mutex<UserRegistry>,
    users_path: PathBuf,
    weather: WeatherConfig,
}

impl ChatEngine {
    /// Build an engine over a loaded user registry.
    pub fn new(
        config: &BotConfig,
        provider: Arc<ProviderHandle>,
        registry: UserRegistry,
        users_path: PathBuf,
    ) -> Self {
        Self {
            classifier: Classifier::new(Lexicon::new()),
            provider,
            registry: Mutex::new(registry),
            users_path,
            weather: config.weather.clone(),
        }
    }

    /// Consume events until the inbound channel closes, forwarding replies
    /// to the adapter. Messages that produce no reply are dropped silently.
    pub async fn run(&self, mut events: mpsc::Receiver<ChatEvent>, replies: mpsc::Sender<ChatReply>) {
        while let Some(event) = events.recv().await {
            let messages = self
                .handle_message(event.chat_id, &event.sender_name, &event.text)
                .await;
            if messages.is_empty() {
                continue;
            }
            let reply = ChatReply {
                chat_id: event.chat_id,
                messages,
            };
            if replies.send(reply).await.is_err() {
                tracing::info!("reply channel closed, chat engine stopping");
                break;
            }
        }
    }

    /// Handle one message and return the outbound messages for it.
    ///
    /// An empty result means stay silent (disabled users).
    pub async fn handle_message(&self, chat_id: i64, sender_name: &str, text: &str) -> Vec<String> {
        let user = {
            let mut registry = self.registry.lock().await;
            let known = registry.get(chat_id).cloned();
            let user = registry.observe(chat_id, sender_name).clone();
            if known.as_ref() != Some(&user) {
                if known.is_none() {
                    tracing::info!(
                        user_id = chat_id,
                        role = user.role.as_str(),
                        "new chat user registered"
                    );
                }
                self.persist(&registry);
            }
            user
        };

        if !user.enabled {
            tracing::debug!(user_id = chat_id, "ignoring message from disabled user");
            return Vec::new();
        }

        if let Some(messages) = slash_command(text, user.role) {
            return messages;
        }

        let intent = match self.classifier.classify(user.role, text) {
            Classification::Valid(intent) => intent,
            Classification::Invalid { reason } => return vec![reason],
        };
        tracing::info!(
            user_id = chat_id,
            subject = intent.subject(),
            "request classified"
        );

        match intent {
            Intent::Help(kind) => vec![help::text(kind, user.role)],
            Intent::Location(change) => self.handle_location(chat_id, &user, change).await,
            Intent::Host(action) => self.handle_host(action).await,
            Intent::Alerts => self.alerts_reply(&user).await,
            other => self.weather_reply(&user, &other).await,
        }
    }

    async fn handle_location(
        &self,
        chat_id: i64,
        user: &ChatUser,
        change: LocationChange,
    ) -> Vec<String> {
        match change {
            LocationChange::Show => vec![match &user.location {
                Some(location) => location_confirmation(location),
                None => format!("No location is set...\n{}", help::HELP_LOCATION_MSG),
            }],
            LocationChange::Label(label) => {
                let mut registry = self.registry.lock().await;
                let Some(stored) = registry.get_mut(chat_id) else {
                    return Vec::new();
                };
                let Some(location) = stored.location.as_mut() else {
                    return vec![format!(
                        "No location is set...\n{}",
                        help::HELP_LOCATION_MSG
                    )];
                };
                location.label = label;
                let confirmation = location_confirmation(location);
                self.persist(&registry);
                vec![confirmation]
            }
            LocationChange::City(value) => {
                self.store_location(chat_id, LocationKind::City, value).await
            }
            LocationChange::PostalCode(value) => {
                self.store_location(chat_id, LocationKind::PostalCode, value)
                    .await
            }
            LocationChange::Gps { lat, lon } => {
                self.store_location(chat_id, LocationKind::Gps, format!("{lat},{lon}"))
                    .await
            }
        }
    }

    /// Store a fresh location, confirm it, and prime the forecast cache so
    /// the first weather request answers from cache. Priming failures are
    /// only logged; the user finds out when they ask for weather.
    async fn store_location(&self, chat_id: i64, kind: LocationKind, value: String) -> Vec<String> {
        let location = UserLocation {
            label: value.clone(),
            kind,
            value,
        };
        {
            let mut registry = self.registry.lock().await;
            if let Err(e) = registry.set_location(chat_id, location.clone()) {
                tracing::error!(error = %e, user_id = chat_id, "failed to store location");
                return Vec::new();
            }
            self.persist(&registry);
        }

        if let Err(e) = self.provider.prepare_location(&location).await {
            tracing::warn!(error = %e, user_id = chat_id, "location priming fetch failed");
        }
        vec![location_confirmation(&location)]
    }

    async fn handle_host(&self, action: HostAction) -> Vec<String> {
        match action {
            HostAction::ListUsers => {
                let registry = self.registry.lock().await;
                vec![registry.list_formatted().join("\n")]
            }
            HostAction::SetEnabled {
                user_id,
                enabled,
                reason,
            } => {
                let Ok(id) = user_id.parse::<i64>() else {
                    return vec![format!("User {user_id} not found.")];
                };
                let mut registry = self.registry.lock().await;
                match registry.set_enabled(id, enabled, reason) {
                    Ok(_) => {
                        self.persist(&registry);
                        let state = if enabled { "enabled" } else { "disabled" };
                        vec![format!("User {id} has been {state}.")]
                    }
                    Err(_) => vec![format!("User {id} not found.")],
                }
            }
            HostAction::ChangeGroup { user_id, group } => {
                let Ok(id) = user_id.parse::<i64>() else {
                    return vec![format!("User {user_id} not found.")];
                };
                let mut registry = self.registry.lock().await;
                match registry.set_group(id, &group) {
                    Ok(_) => {
                        self.persist(&registry);
                        vec![format!("User {id} has been moved to the {group} group.")]
                    }
                    Err(UserError::UnknownUser(_)) => vec![format!("User {id} not found.")],
                    Err(e) => vec![e.to_string()],
                }
            }
            HostAction::Unknown => vec!["Unknown host function.".to_owned()],
        }
    }

    async fn weather_reply(&self, user: &ChatUser, intent: &Intent) -> Vec<String> {
        let Some(location) = &user.location else {
            return vec![NO_LOCATION_MSG.to_owned()];
        };

        let forecast = match self.provider.forecast(location, false).await {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::warn!(error = %e, user_id = user.id, "forecast fetch failed");
                return vec![location_confirmation(location), FORECAST_FAIL_MSG.to_owned()];
            }
        };

        let ctx = self.display_context();
        let lines = match intent {
            Intent::Temperature { filter } => {
                query::temperature(&forecast, filter.as_deref(), &ctx)
            }
            Intent::Rain { filter } => query::rain(&forecast, filter),
            Intent::Wind { filter } => query::wind(&forecast, filter),
            Intent::BadWeather => query::bad_weather(&forecast, &ctx),
            Intent::Forecast(selection) => query::forecast_periods(&forecast, selection),
            _ => Vec::new(),
        };

        let banner = location_banner(location);
        if lines.is_empty() {
            return vec![banner, NOTHING_TO_REPORT_MSG.to_owned()];
        }
        let mut messages = Vec::with_capacity(lines.len().saturating_add(1));
        messages.push(banner);
        messages.extend(lines);
        messages
    }

    async fn alerts_reply(&self, user: &ChatUser) -> Vec<String> {
        let Some(location) = &user.location else {
            return vec![NO_LOCATION_MSG.to_owned()];
        };

        match self.provider.alerts(location).await {
            Ok(alerts) => {
                let mut messages = vec![location_banner(location)];
                messages.extend(query::alerts(&alerts));
                messages
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = user.id, "alerts fetch failed");
                vec![location_confirmation(location), ALERTS_FAIL_MSG.to_owned()]
            }
        }
    }

    /// Thresholds for the current month plus the highlight word list.
    fn display_context(&self) -> DisplayContext {
        DisplayContext {
            temp_hot: self.weather.effective_temp_hot(Local::now().month()),
            temp_cold: self.weather.temp_cold,
            bad_weather_words: self.weather.bad_weather_words.clone(),
        }
    }

    fn persist(&self, registry: &UserRegistry) {
        if let Err(e) = registry.save(&self.users_path) {
            tracing::error!(
                error = %e,
                path = %self.users_path.display(),
                "failed to persist user registry"
            );
        }
    }
}

/// Telegram-style slash commands bypass classification entirely.
fn slash_command(text: &str, role: Role) -> Option<Vec<String>> {
    let command = text.trim().strip_prefix('/')?;
    // Group chats append a bot mention, as in "/help@somebot".
    let command = command.split(['@', ' ']).next().unwrap_or(command);
    Some(match command {
        "start" | "h" | "help" => vec![help::text(HelpKind::General, role)],
        other => vec![format!("Unknown command: /{}", markup::escape(other))],
    })
}

fn location_confirmation(location: &UserLocation) -> String {
    format!(
        "Your current location is set to: Label={} (Location={})",
        markup::escape(&location.label),
        markup::escape(&location.value)
    )
}

/// Banner sent ahead of weather lines. The raw value only shows when a
/// label hides it.
fn location_banner(location: &UserLocation) -> String {
    if location.label == location.value {
        format!("Weather for {}", markup::bold(&location.label))
    } else {
        format!(
            "Weather for {} ({})",
            markup::bold(&location.label),
            markup::escape(&location.value)
        )
    }
}
