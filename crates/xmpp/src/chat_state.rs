//! XEP-0085: Chat State Notifications.
//!
//! Two halves, both composed onto existing types:
//!
//! - [`ChatStateBehavior`] is a stanza behavior that gives any
//!   [`ChatStateCarrier`] stanza a chat state: parsed from the packet,
//!   serialized as an empty `<STATE xmlns='http://jabber.org/protocol/chatstates'/>`
//!   child, and advertised as a discoverable feature on the connection.
//! - [`ChatStateNotifier`] adds the send helpers to anything that can
//!   reach a [`Connection`].
//!
//! `active` doubles as "no state on the wire": a message without a
//! chat state element parses to [`ChatState::Active`].

use std::fmt;

use jid::Jid;
use minidom::Element;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::Connection;
use crate::message::{MessageFields, MessageStanza};
use crate::stanza::{
    InitContext, InitNext, Initialized, SerializeNext, Serialized, Stanza, StanzaBehavior,
    StanzaFields, StanzaSource,
};
use crate::xml::{find_in_namespace, ns};
use crate::XmppError;

/// Chat state of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    /// Actively participating (also: no state given)
    #[default]
    Active,
    /// Typing a message
    Composing,
    /// Stopped typing
    Paused,
    /// Not paying attention
    Inactive,
    /// Left the conversation
    Gone,
}

impl ChatState {
    /// Get the element name for this chat state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatState::Active => "active",
            ChatState::Composing => "composing",
            ChatState::Paused => "paused",
            ChatState::Inactive => "inactive",
            ChatState::Gone => "gone",
        }
    }

    /// Parse a chat state element name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "active" => Some(ChatState::Active),
            "composing" => Some(ChatState::Composing),
            "paused" => Some(ChatState::Paused),
            "inactive" => Some(ChatState::Inactive),
            "gone" => Some(ChatState::Gone),
            _ => None,
        }
    }

    /// The empty namespaced element carrying this state.
    pub fn to_element(&self) -> Element {
        Element::builder(self.as_str(), ns::CHATSTATES).build()
    }
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extract the chat state carried by a packet, if any.
///
/// The first element in the chat state namespace wins, wherever it sits
/// in the packet and whatever attributes or children it carries; only its
/// name matters. Unknown element names are ignored.
pub fn parse_chat_state(packet: &Element) -> Option<ChatState> {
    let element = find_in_namespace(packet, ns::CHATSTATES)?;
    ChatState::from_name(element.name())
}

/// A stanza that carries a chat state.
pub trait ChatStateCarrier: Stanza<Fields: AsRef<ChatState>> {
    /// The current chat state.
    fn chat_state(&self) -> ChatState;

    /// Store the chat state during construction.
    fn set_chat_state(&mut self, state: ChatState);
}

/// Stanza behavior adding XEP-0085 support to a [`ChatStateCarrier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatStateBehavior;

impl<S: ChatStateCarrier> StanzaBehavior<S> for ChatStateBehavior {
    fn name(&self) -> &'static str {
        "chat-state"
    }

    fn on_init(
        &self,
        stanza: &mut S,
        source: &StanzaSource<S::Fields>,
        ctx: &InitContext<'_>,
        next: InitNext<'_, S>,
    ) -> Initialized {
        let done = next.run(stanza, source, ctx);

        if let Some(connection) = ctx.connection() {
            if connection.config().advertise_chat_states {
                connection.features().add_feature(ns::CHATSTATES);
            }
        }

        let state = match source.fields() {
            Some(fields) => *AsRef::<ChatState>::as_ref(fields),
            None => source
                .packet()
                .and_then(parse_chat_state)
                .unwrap_or_default(),
        };
        stanza.set_chat_state(state);

        done
    }

    fn on_serialize(&self, stanza: &S, next: SerializeNext<'_, S>) -> Serialized {
        let mut serialized = next.run(stanza);
        serialized.append_child(stanza.chat_state().to_element());
        serialized
    }
}

/// Chat state send helpers for anything bound to a connection.
pub trait ChatStateNotifier {
    /// The connection notifications are sent through.
    fn connection(&self) -> &Connection;

    /// Send a chat state notification to another entity.
    ///
    /// Builds a message carrying only the state (plus the optional thread
    /// and id), sends it and returns it.
    fn send_chat_state_notification(
        &self,
        state: ChatState,
        to: &Jid,
        thread: Option<&str>,
        id: Option<&str>,
    ) -> Result<MessageStanza, XmppError> {
        let connection = self.connection();
        let fields = MessageFields {
            header: StanzaFields {
                to: Some(to.to_string()),
                id: id.map(str::to_string),
                ..StanzaFields::default()
            },
            thread: thread.map(str::to_string),
            chat_state: state,
            ..MessageFields::default()
        };

        let message = MessageStanza::new(fields, &InitContext::bound(connection));
        connection.send(&message.to_element())?;
        debug!(to = %to, state = %state, "Sent chat state notification");
        Ok(message)
    }

    /// Send a `composing` notification.
    fn send_chat_state_composing(
        &self,
        to: &Jid,
        thread: Option<&str>,
        id: Option<&str>,
    ) -> Result<MessageStanza, XmppError> {
        self.send_chat_state_notification(ChatState::Composing, to, thread, id)
    }

    /// Send a `paused` notification.
    fn send_chat_state_paused(
        &self,
        to: &Jid,
        thread: Option<&str>,
        id: Option<&str>,
    ) -> Result<MessageStanza, XmppError> {
        self.send_chat_state_notification(ChatState::Paused, to, thread, id)
    }

    /// Send an `inactive` notification.
    fn send_chat_state_inactive(
        &self,
        to: &Jid,
        thread: Option<&str>,
        id: Option<&str>,
    ) -> Result<MessageStanza, XmppError> {
        self.send_chat_state_notification(ChatState::Inactive, to, thread, id)
    }

    /// Send a `gone` notification.
    ///
    /// The thread id must not be reused after a `gone` from the other
    /// side; start a new thread for later messages.
    fn send_chat_state_gone(
        &self,
        to: &Jid,
        thread: Option<&str>,
        id: Option<&str>,
    ) -> Result<MessageStanza, XmppError> {
        self.send_chat_state_notification(ChatState::Gone, to, thread, id)
    }
}

impl ChatStateNotifier for Connection {
    fn connection(&self) -> &Connection {
        self
    }
}
