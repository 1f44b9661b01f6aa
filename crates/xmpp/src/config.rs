//! Client configuration.
//!
//! Configuration is plain TOML; every field has a default so an empty
//! document is a valid configuration:
//!
//! ```toml
//! message_type = "chat"
//! id_prefix = "xc-"
//! advertise_chat_states = true
//!
//! [identity]
//! category = "client"
//! type = "pc"
//! name = "XC"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::XmppError;

/// Message types accepted for outbound messages.
const MESSAGE_TYPES: [&str; 4] = ["chat", "normal", "headline", "groupchat"];

/// Identity reported in disco#info responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Identity category
    pub category: String,
    /// Identity type within the category
    #[serde(rename = "type")]
    pub type_: String,
    /// Optional human-readable name
    pub name: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            category: "client".into(),
            type_: "pc".into(),
            name: None,
        }
    }
}

/// Client-side stanza configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Type attribute stamped on outbound messages
    pub message_type: String,
    /// Prefix for generated stanza ids
    pub id_prefix: String,
    /// Register the chat state namespace as a discoverable feature
    pub advertise_chat_states: bool,
    /// Identity for disco#info responses
    pub identity: IdentityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            message_type: "chat".into(),
            id_prefix: "xc-".into(),
            advertise_chat_states: true,
            identity: IdentityConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, XmppError> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| XmppError::config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, XmppError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            XmppError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = ?path, "Loaded client configuration");
        Ok(config)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), XmppError> {
        if !MESSAGE_TYPES.contains(&self.message_type.as_str()) {
            return Err(XmppError::config(format!(
                "Invalid message_type '{}': expected one of {}",
                self.message_type,
                MESSAGE_TYPES.join(", ")
            )));
        }

        if self.id_prefix.chars().any(char::is_whitespace) {
            return Err(XmppError::config(
                "id_prefix must not contain whitespace",
            ));
        }

        if self.identity.category.is_empty() || self.identity.type_.is_empty() {
            return Err(XmppError::config(
                "identity category and type must not be empty",
            ));
        }

        Ok(())
    }
}
