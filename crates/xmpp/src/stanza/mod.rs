//! Stanza base: the construction/serialization contract shared by all
//! typed stanzas.
//!
//! A stanza type has two override points, `init` (run once when the
//! object is built from a [`StanzaSource`]) and `serialize` (run on demand
//! to produce an XML tree). Behaviors wrap those points through a
//! [`BehaviorChain`] registered once per stanza type; the base
//! implementation in this module is always the innermost link, so the
//! common header (`to`, `from`, `id`, `type`) is handled regardless of how
//! many behaviors are composed.

mod chain;

pub use chain::{BehaviorChain, InitNext, Initialized, SerializeNext, Serialized, StanzaBehavior};

use minidom::Element;

use crate::connection::Connection;
use crate::xml::{attr_string, ns, to_xml_string};
use crate::XmppError;

/// Addressing fields common to every outbound stanza.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StanzaFields {
    /// Recipient address
    pub to: Option<String>,
    /// Sender address
    pub from: Option<String>,
    /// Stanza id
    pub id: Option<String>,
    /// Stanza type attribute
    pub type_: Option<String>,
}

impl StanzaFields {
    /// Fields addressed to a recipient.
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            ..Self::default()
        }
    }

    /// Set the sender address.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Set the stanza id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the stanza type.
    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }
}

impl AsRef<StanzaFields> for StanzaFields {
    fn as_ref(&self) -> &StanzaFields {
        self
    }
}

/// Common header of a constructed stanza.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StanzaHeader {
    /// Recipient address
    pub to: Option<String>,
    /// Sender address
    pub from: Option<String>,
    /// Stanza id
    pub id: Option<String>,
    /// Stanza type attribute
    pub type_: Option<String>,
    /// The raw element, present only for stanzas built from a received packet
    pub packet: Option<Element>,
}

/// What a stanza is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum StanzaSource<F> {
    /// Fields supplied locally, for a stanza about to be sent
    Outbound(F),
    /// A received packet to be parsed
    Inbound(Element),
}

impl<F> StanzaSource<F> {
    /// The received packet, for inbound sources.
    pub fn packet(&self) -> Option<&Element> {
        match self {
            StanzaSource::Outbound(_) => None,
            StanzaSource::Inbound(packet) => Some(packet),
        }
    }

    /// The local fields, for outbound sources.
    pub fn fields(&self) -> Option<&F> {
        match self {
            StanzaSource::Outbound(fields) => Some(fields),
            StanzaSource::Inbound(_) => None,
        }
    }
}

/// Environment a stanza is constructed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitContext<'a> {
    connection: Option<&'a Connection>,
}

impl<'a> InitContext<'a> {
    /// Construction without a live connection.
    pub fn detached() -> Self {
        Self { connection: None }
    }

    /// Construction bound to a live connection.
    pub fn bound(connection: &'a Connection) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    /// The live connection, if any.
    pub fn connection(&self) -> Option<&'a Connection> {
        self.connection
    }
}

/// A typed, XML-backed stanza.
pub trait Stanza: Default + Send + Sync + Sized + 'static {
    /// Element name (`message`, `iq`, ...)
    const NAME: &'static str;

    /// Outbound construction fields.
    type Fields: AsRef<StanzaFields> + Send + Sync;

    /// The behavior chain of this stanza type.
    fn chain() -> &'static BehaviorChain<Self>;

    /// The common header.
    fn header(&self) -> &StanzaHeader;

    /// The common header, mutably.
    fn header_mut(&mut self) -> &mut StanzaHeader;

    /// Build a stanza by running the init chain over a source.
    fn from_source(source: StanzaSource<Self::Fields>, ctx: &InitContext<'_>) -> Self {
        let mut stanza = Self::default();
        let _initialized = Self::chain().init(&mut stanza, &source, ctx);
        stanza
    }

    /// Build a stanza from a received packet.
    fn from_packet(packet: Element, ctx: &InitContext<'_>) -> Self {
        Self::from_source(StanzaSource::Inbound(packet), ctx)
    }

    /// Serialize the stanza through its behavior chain.
    fn to_element(&self) -> Element {
        Self::chain().serialize(self)
    }

    /// Serialize the stanza to an XML string.
    fn to_xml(&self) -> Result<String, XmppError> {
        to_xml_string(&self.to_element())
    }
}

/// Base `init`: populate the common header.
pub(crate) fn base_init<S: Stanza>(stanza: &mut S, source: &StanzaSource<S::Fields>) -> Initialized {
    let header = stanza.header_mut();
    match source {
        StanzaSource::Outbound(fields) => {
            let fields = fields.as_ref();
            header.to = fields.to.clone().filter(|v| !v.is_empty());
            header.from = fields.from.clone().filter(|v| !v.is_empty());
            header.id = fields.id.clone().filter(|v| !v.is_empty());
            header.type_ = fields.type_.clone().filter(|v| !v.is_empty());
            header.packet = None;
        }
        StanzaSource::Inbound(packet) => {
            header.to = attr_string(packet, "to");
            header.from = attr_string(packet, "from");
            header.id = attr_string(packet, "id");
            header.type_ = attr_string(packet, "type");
            header.packet = Some(packet.clone());
        }
    }
    Initialized::new()
}

/// Base `serialize`: the stanza element with its header attributes.
pub(crate) fn base_serialize<S: Stanza>(stanza: &S) -> Serialized {
    let header = stanza.header();
    let mut builder = Element::builder(S::NAME, ns::JABBER_CLIENT);

    let attrs = [
        ("to", &header.to),
        ("from", &header.from),
        ("id", &header.id),
        ("type", &header.type_),
    ];
    for (name, value) in attrs {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            builder = builder.attr(name, value);
        }
    }

    Serialized::new(builder.build())
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::xml::parse_element;

    /// Stanza with no behaviors beyond the base.
    #[derive(Debug, Default)]
    struct BarePresence {
        header: StanzaHeader,
    }

    impl Stanza for BarePresence {
        const NAME: &'static str = "presence";
        type Fields = StanzaFields;

        fn chain() -> &'static BehaviorChain<Self> {
            static CHAIN: OnceLock<BehaviorChain<BarePresence>> = OnceLock::new();
            CHAIN.get_or_init(BehaviorChain::new)
        }

        fn header(&self) -> &StanzaHeader {
            &self.header
        }

        fn header_mut(&mut self) -> &mut StanzaHeader {
            &mut self.header
        }
    }

    #[test]
    fn test_base_serializes_set_header_fields_only() {
        let fields = StanzaFields::to("marvin@heart-of-gold.com").with_id("p1");
        let stanza = BarePresence::from_source(StanzaSource::Outbound(fields), &InitContext::detached());

        let element = stanza.to_element();
        assert_eq!(element.name(), "presence");
        assert_eq!(element.ns(), ns::JABBER_CLIENT);
        assert_eq!(element.attr("to"), Some("marvin@heart-of-gold.com"));
        assert_eq!(element.attr("id"), Some("p1"));
        assert_eq!(element.attr("from"), None);
        assert_eq!(element.attr("type"), None);
        assert!(stanza.header().packet.is_none());
    }

    #[test]
    fn test_base_treats_empty_fields_as_absent() {
        let fields = StanzaFields::to("").with_type("");
        let stanza = BarePresence::from_source(StanzaSource::Outbound(fields), &InitContext::detached());

        assert_eq!(stanza.header().to, None);
        let element = stanza.to_element();
        assert_eq!(element.attr("to"), None);
        assert_eq!(element.attr("type"), None);
    }

    #[test]
    fn test_base_parses_inbound_header() {
        let packet = parse_element(
            "<presence xmlns='jabber:client' from='arthur@earth.org' to='ford@betelguice.net' \
             id='p2' type='unavailable'/>",
        )
        .unwrap();
        let stanza = BarePresence::from_packet(packet.clone(), &InitContext::detached());

        let header = stanza.header();
        assert_eq!(header.from.as_deref(), Some("arthur@earth.org"));
        assert_eq!(header.to.as_deref(), Some("ford@betelguice.net"));
        assert_eq!(header.id.as_deref(), Some("p2"));
        assert_eq!(header.type_.as_deref(), Some("unavailable"));
        assert_eq!(header.packet.as_ref(), Some(&packet));
    }

    #[test]
    fn test_source_accessors() {
        let outbound: StanzaSource<StanzaFields> = StanzaSource::Outbound(StanzaFields::default());
        assert!(outbound.packet().is_none());
        assert!(outbound.fields().is_some());

        let packet = parse_element("<presence xmlns='jabber:client'/>").unwrap();
        let inbound: StanzaSource<StanzaFields> = StanzaSource::Inbound(packet);
        assert!(inbound.packet().is_some());
        assert!(inbound.fields().is_none());
    }
}
