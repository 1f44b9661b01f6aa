//! Error types for the XMPP client core.

use thiserror::Error;

/// Errors raised by local operations of the client core.
///
/// Protocol-level failures (IQ `type='error'` responses) are never mapped
/// onto this type; they are handed verbatim to the caller's error callback.
#[derive(Debug, Error)]
pub enum XmppError {
    /// The transport refused or failed to write the data
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection has been closed
    #[error("Connection closed")]
    Closed,

    /// Raw XML could not be parsed into an element
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// An element could not be serialized
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An IQ request with this id is already awaiting a response
    #[error("IQ request already pending: {0}")]
    DuplicateRequest(String),
}

impl XmppError {
    /// Create a new transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new XML parse error.
    pub fn xml_parse(msg: impl Into<String>) -> Self {
        Self::XmlParse(msg.into())
    }

    /// Create a new XML write error.
    pub fn xml_write(msg: impl Into<String>) -> Self {
        Self::XmlWrite(msg.into())
    }

    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new duplicate request error.
    pub fn duplicate_request(id: impl Into<String>) -> Self {
        Self::DuplicateRequest(id.into())
    }

    /// Whether retrying the same operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, XmppError::Transport(_))
    }
}
