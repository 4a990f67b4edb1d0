//! Chat user registry: roles, enablement, and per-user locations.
//!
//! The first user the bot ever sees becomes the host. Everyone after that
//! starts as a plain user until the host promotes them.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default reason recorded when a user is disabled without one.
pub const NO_REASON: &str = "No reason provided";

/// Errors from registry operations and persistence.
#[derive(Debug, Error)]
pub enum UserError {
    /// The referenced user id is not in the registry.
    #[error("unknown user id {0}")]
    UnknownUser(i64),
    /// The group name is not one of host, admin, or user.
    #[error("invalid user group '{0}', expected host, admin, or user")]
    InvalidGroup(String),
    /// Reading or writing the user store failed.
    #[error("user store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// The user store on disk did not parse.
    #[error("user store did not parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Privilege tier of a chat user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user: weather queries only.
    User,
    /// Admin: may run user-management functions.
    Admin,
    /// Host: the first user seen; full control.
    Host,
}

impl Role {
    /// Whether this role may run host-only functions.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Host | Role::Admin)
    }

    /// Lowercase name as stored and displayed.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Host => "host",
        }
    }

    fn from_group(group: &str) -> Option<Role> {
        match group {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "host" => Some(Role::Host),
            _ => None,
        }
    }
}

/// How a stored location value should be interpreted when building
/// provider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// Free-text city name.
    City,
    /// Five-digit US postal code.
    PostalCode,
    /// "lat,lon" coordinate pair.
    Gps,
}

/// A user's stored location. The label is display-only and renameable;
/// the kind and value drive geocoding and URL construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLocation {
    /// Display label, defaults to the raw value until renamed.
    pub label: String,
    /// Interpretation of `value`.
    #[serde(rename = "type")]
    pub kind: LocationKind,
    /// Raw location value as entered.
    pub value: String,
}

/// One registered chat user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    /// Chat id the adapter addresses replies to.
    pub id: i64,
    /// Display name from the chat platform.
    pub name: String,
    /// Privilege tier.
    pub role: Role,
    /// Disabled users are silently ignored.
    pub enabled: bool,
    /// Why the user was disabled, when they are.
    pub disabled_reason: Option<String>,
    /// Stored forecast location, if one has been set.
    pub location: Option<UserLocation>,
}

impl ChatUser {
    fn new(id: i64, name: &str, role: Role) -> Self {
        Self {
            id,
            name: name.to_owned(),
            role,
            enabled: true,
            disabled_reason: None,
            location: None,
        }
    }

    /// One-line summary used by the user listing.
    pub fn summary(&self) -> String {
        let location = match &self.location {
            Some(l) => format!("{} ({})", l.label, l.value),
            None => "none".to_owned(),
        };
        let status = if self.enabled { "Enabled" } else { "Disabled" };
        let mut line = format!(
            "User ID: {}, Type: {}, Name: {}, Location: {location}, Status: {status}",
            self.id,
            self.role.as_str(),
            self.name
        );
        if let Some(reason) = &self.disabled_reason {
            line.push_str(&format!(", Reason: {reason}"));
        }
        line
    }
}

/// All known users, keyed by chat id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserRegistry {
    users: HashMap<i64, ChatUser>,
}

impl UserRegistry {
    /// Load the registry from disk; a missing file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self, UserError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist the registry as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), UserError> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Look up a user.
    pub fn get(&self, id: i64) -> Option<&ChatUser> {
        self.users.get(&id)
    }

    /// Mutable lookup, for handlers that edit location or name in place.
    pub fn get_mut(&mut self, id: i64) -> Option<&mut ChatUser> {
        self.users.get_mut(&id)
    }

    /// Register the sender of an incoming message, creating them on first
    /// contact. The very first user becomes the host.
    pub fn observe(&mut self, id: i64, name: &str) -> &ChatUser {
        let role = if self.users.is_empty() {
            Role::Host
        } else {
            Role::User
        };
        let user = self
            .users
            .entry(id)
            .or_insert_with(|| ChatUser::new(id, name, role));
        if !name.is_empty() && user.name != name {
            user.name = name.to_owned();
        }
        user
    }

    /// Enable or disable a user. Disabling records a reason.
    pub fn set_enabled(
        &mut self,
        id: i64,
        enabled: bool,
        reason: Option<String>,
    ) -> Result<&ChatUser, UserError> {
        let user = self.users.get_mut(&id).ok_or(UserError::UnknownUser(id))?;
        user.enabled = enabled;
        user.disabled_reason = if enabled {
            None
        } else {
            Some(reason.unwrap_or_else(|| NO_REASON.to_owned()))
        };
        Ok(user)
    }

    /// Move a user to another group. Group names are validated.
    pub fn set_group(&mut self, id: i64, group: &str) -> Result<&ChatUser, UserError> {
        let role =
            Role::from_group(group).ok_or_else(|| UserError::InvalidGroup(group.to_owned()))?;
        let user = self.users.get_mut(&id).ok_or(UserError::UnknownUser(id))?;
        user.role = role;
        Ok(user)
    }

    /// Store a location for a user.
    pub fn set_location(&mut self, id: i64, location: UserLocation) -> Result<&ChatUser, UserError> {
        let user = self.users.get_mut(&id).ok_or(UserError::UnknownUser(id))?;
        user.location = Some(location);
        Ok(user)
    }

    /// Grouped user listing: disabled users first, then by type, then by
    /// name. Returned as display lines.
    pub fn list_formatted(&self) -> Vec<String> {
        let mut users: Vec<&ChatUser> = self.users.values().collect();
        users.sort_by_key(|u| (u.enabled, u.role.as_str(), u.name.to_lowercase()));

        let mut lines = vec!["User List:".to_owned()];
        let mut current_status: Option<bool> = None;
        let mut current_role: Option<Role> = None;
        for user in users {
            if current_status != Some(user.enabled) {
                current_status = Some(user.enabled);
                current_role = None;
                let status = if user.enabled { "Enabled" } else { "Disabled" };
                lines.push(format!("\n{status} Users:"));
            }
            if current_role != Some(user.role) {
                current_role = Some(user.role);
                lines.push(format!("  {}:", user.role.as_str()));
            }
            lines.push(format!("    {}", user.summary()));
        }
        lines
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True when nobody has talked to the bot yet.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
