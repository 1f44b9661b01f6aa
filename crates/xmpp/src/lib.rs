//! XC XMPP client core.
//!
//! Typed stanzas over raw XML, with per-type behavior chains:
//!
//! - [`stanza`]: the base init/serialize contract and [`BehaviorChain`]
//! - [`message`]: the `<message/>` stanza
//! - [`chat_state`]: XEP-0085 chat state notifications
//! - [`connection`]: transport, feature registry and pending IQ table
//! - [`pipeline`]: inbound dispatch to processors
//! - [`disco`]: disco#info responder (XEP-0030)

pub mod chat_state;
pub mod config;
pub mod connection;
pub mod disco;
pub mod entity;
pub mod error;
pub mod iq;
pub mod message;
pub mod pipeline;
pub mod stanza;
pub mod xml;

pub use chat_state::{ChatState, ChatStateBehavior, ChatStateCarrier, ChatStateNotifier};
pub use config::{ClientConfig, IdentityConfig};
pub use connection::{Connection, FeatureRegistry, IqCallback, MemoryTransport, Transport};
pub use disco::{DiscoInfoProcessor, Feature, Identity};
pub use entity::Entity;
pub use error::XmppError;
pub use iq::{build_ack, build_iq, IqResponse, IqType};
pub use message::{MessageFields, MessageStanza};
pub use pipeline::{ProcessorResult, StanzaPipeline, StanzaProcessor};
pub use stanza::{
    BehaviorChain, InitContext, InitNext, Initialized, SerializeNext, Serialized, Stanza,
    StanzaBehavior, StanzaFields, StanzaHeader, StanzaSource,
};
pub use xml::ns;

// Re-export so downstream crates build elements with the same version.
pub use jid::Jid;
pub use minidom::Element;
