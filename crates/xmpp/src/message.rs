//! Message stanza.
//!
//! ```xml
//! <message to='ford@betelguice.net' type='chat' id='m1'>
//!   <body>Don't panic</body>
//!   <subject>Guide</subject>
//!   <thread>t-42</thread>
//!   <active xmlns='http://jabber.org/protocol/chatstates'/>
//! </message>
//! ```
//!
//! The message chain is the base header, then [`MessageContent`]
//! (`body`, `subject`, `thread`), then [`ChatStateBehavior`] outermost, so
//! the chat state element is always the last child.

use std::sync::OnceLock;

use minidom::Element;
use tracing::debug;

use crate::chat_state::{ChatState, ChatStateBehavior, ChatStateCarrier};
use crate::connection::Connection;
use crate::stanza::{
    BehaviorChain, InitContext, InitNext, Initialized, SerializeNext, Serialized, Stanza,
    StanzaBehavior, StanzaFields, StanzaHeader, StanzaSource,
};
use crate::xml::{find_descendant, ns, text_of};
use crate::XmppError;

/// Message type used when neither the fields nor a connection say otherwise.
pub const DEFAULT_MESSAGE_TYPE: &str = "chat";

/// Fields of an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFields {
    /// Addressing
    pub header: StanzaFields,
    /// Subject line
    pub subject: Option<String>,
    /// Message body
    pub body: Option<String>,
    /// Conversation thread id
    pub thread: Option<String>,
    /// Chat state to attach
    pub chat_state: ChatState,
}

impl MessageFields {
    /// Fields for a message addressed to a recipient.
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            header: StanzaFields::to(to),
            ..Self::default()
        }
    }

    /// Set the stanza id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.header.id = Some(id.into());
        self
    }

    /// Set the sender address.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.header.from = Some(from.into());
        self
    }

    /// Set the message type.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.header.type_ = Some(type_.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the thread id.
    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    /// Set the chat state.
    pub fn with_chat_state(mut self, state: ChatState) -> Self {
        self.chat_state = state;
        self
    }
}

impl AsRef<StanzaFields> for MessageFields {
    fn as_ref(&self) -> &StanzaFields {
        &self.header
    }
}

impl AsRef<ChatState> for MessageFields {
    fn as_ref(&self) -> &ChatState {
        &self.chat_state
    }
}

/// An XMPP `<message/>` stanza.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStanza {
    header: StanzaHeader,
    subject: Option<String>,
    body: Option<String>,
    thread: Option<String>,
    chat_state: ChatState,
}

impl MessageStanza {
    /// Build an outbound message.
    pub fn new(fields: MessageFields, ctx: &InitContext<'_>) -> Self {
        Self::from_source(StanzaSource::Outbound(fields), ctx)
    }

    /// Recipient address.
    pub fn to(&self) -> Option<&str> {
        self.header.to.as_deref()
    }

    /// Sender address.
    pub fn from(&self) -> Option<&str> {
        self.header.from.as_deref()
    }

    /// Stanza id.
    pub fn id(&self) -> Option<&str> {
        self.header.id.as_deref()
    }

    /// Message type.
    pub fn type_(&self) -> Option<&str> {
        self.header.type_.as_deref()
    }

    /// The received packet, for inbound messages.
    pub fn packet(&self) -> Option<&Element> {
        self.header.packet.as_ref()
    }

    /// Subject line.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Message body.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Conversation thread id.
    pub fn thread(&self) -> Option<&str> {
        self.thread.as_deref()
    }

    /// Chat state (XEP-0085).
    pub fn chat_state(&self) -> ChatState {
        self.chat_state
    }

    /// Reply to this message, using it as a template.
    ///
    /// The reply goes to this message's sender, keeps its type and thread,
    /// and carries the given body and id. It is sent immediately; no
    /// acknowledgment is tracked.
    pub fn reply(
        &self,
        connection: &Connection,
        body: impl Into<String>,
        id: Option<String>,
    ) -> Result<MessageStanza, XmppError> {
        let fields = MessageFields {
            header: StanzaFields {
                to: self.header.from.clone(),
                from: self.header.to.clone(),
                id,
                type_: self.header.type_.clone(),
            },
            body: Some(body.into()),
            thread: self.thread.clone(),
            ..MessageFields::default()
        };

        let reply = MessageStanza::new(fields, &InitContext::bound(connection));
        connection.send(&reply.to_element())?;
        debug!(to = ?reply.to(), id = ?reply.id(), "Sent reply");
        Ok(reply)
    }
}

impl Stanza for MessageStanza {
    const NAME: &'static str = "message";
    type Fields = MessageFields;

    fn chain() -> &'static BehaviorChain<Self> {
        static CHAIN: OnceLock<BehaviorChain<MessageStanza>> = OnceLock::new();
        CHAIN.get_or_init(|| {
            BehaviorChain::new()
                .with(MessageContent)
                .with(ChatStateBehavior)
        })
    }

    fn header(&self) -> &StanzaHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut StanzaHeader {
        &mut self.header
    }
}

impl ChatStateCarrier for MessageStanza {
    fn chat_state(&self) -> ChatState {
        self.chat_state
    }

    fn set_chat_state(&mut self, state: ChatState) {
        self.chat_state = state;
    }
}

/// Behavior owning `body`, `subject` and `thread`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageContent;

impl MessageContent {
    /// Children owned by this behavior, in serialization order.
    const CHILDREN: [&'static str; 3] = ["body", "subject", "thread"];
}

impl StanzaBehavior<MessageStanza> for MessageContent {
    fn name(&self) -> &'static str {
        "message-content"
    }

    fn on_init(
        &self,
        stanza: &mut MessageStanza,
        source: &StanzaSource<MessageFields>,
        ctx: &InitContext<'_>,
        next: InitNext<'_, MessageStanza>,
    ) -> Initialized {
        let done = next.run(stanza, source, ctx);

        match source {
            StanzaSource::Outbound(fields) => {
                stanza.subject = fields.subject.clone().filter(|v| !v.is_empty());
                stanza.body = fields.body.clone().filter(|v| !v.is_empty());
                stanza.thread = fields.thread.clone().filter(|v| !v.is_empty());

                if stanza.header.type_.is_none() {
                    let type_ = ctx
                        .connection()
                        .map(|c| c.config().message_type.as_str())
                        .unwrap_or(DEFAULT_MESSAGE_TYPE);
                    stanza.header.type_ = Some(type_.to_string());
                }
            }
            StanzaSource::Inbound(packet) => {
                stanza.body = text_of(find_descendant(packet, "body"));
                stanza.thread = text_of(find_descendant(packet, "thread"));
                stanza.subject = text_of(find_descendant(packet, "subject"));
            }
        }

        done
    }

    fn on_serialize(&self, stanza: &MessageStanza, next: SerializeNext<'_, MessageStanza>) -> Serialized {
        let mut serialized = next.run(stanza);

        let values = [&stanza.body, &stanza.subject, &stanza.thread];
        for (name, value) in Self::CHILDREN.into_iter().zip(values) {
            let Some(text) = value.as_deref().filter(|v| !v.is_empty()) else {
                continue;
            };
            serialized.append_child(
                Element::builder(name, ns::JABBER_CLIENT)
                    .append(text.to_string())
                    .build(),
            );
        }

        serialized
    }
}
