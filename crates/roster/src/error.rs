use thiserror::Error;
use xc_xmpp::XmppError;

/// Errors raised by the roster service.
///
/// A server-side failure of a roster request is not an error here: the
/// error packet is handed to the request's `on_error` callback.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The packet is not a roster push
    #[error("Not a roster push: {0}")]
    NotAPush(String),

    /// Sending failed
    #[error(transparent)]
    Xmpp(#[from] XmppError),
}

impl RosterError {
    pub fn not_a_push(msg: impl Into<String>) -> Self {
        Self::NotAPush(msg.into())
    }
}
