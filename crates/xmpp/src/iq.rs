//! IQ (Info/Query) stanza helpers.
//!
//! IQs are handled as raw elements rather than through a typed stanza:
//! responses must be accepted as they arrive, including results carrying
//! several payload children, which a strict parser would reject.

use std::fmt;

use minidom::Element;

use crate::xml::ns;

/// The `type` attribute of an IQ stanza.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IqType {
    /// Request for information
    Get,
    /// Request to change state, or a server push
    Set,
    /// Successful response
    Result,
    /// Error response
    Error,
}

impl IqType {
    /// Get the XML attribute value for this IQ type.
    pub fn as_str(&self) -> &'static str {
        match self {
            IqType::Get => "get",
            IqType::Set => "set",
            IqType::Result => "result",
            IqType::Error => "error",
        }
    }

    /// Parse an IQ type attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "get" => Some(IqType::Get),
            "set" => Some(IqType::Set),
            "result" => Some(IqType::Result),
            "error" => Some(IqType::Error),
            _ => None,
        }
    }

    /// The IQ type of a packet, if it carries a valid one.
    pub fn of(packet: &Element) -> Option<Self> {
        packet.attr("type").and_then(Self::parse)
    }
}

impl fmt::Display for IqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response to an IQ request, delivered verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum IqResponse {
    /// `type='result'` packet
    Result(Element),
    /// `type='error'` packet
    Error(Element),
}

impl IqResponse {
    /// Whether this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, IqResponse::Error(_))
    }

    /// The raw response packet.
    pub fn packet(&self) -> &Element {
        match self {
            IqResponse::Result(packet) | IqResponse::Error(packet) => packet,
        }
    }

    /// Consume the response, yielding the raw packet.
    pub fn into_packet(self) -> Element {
        match self {
            IqResponse::Result(packet) | IqResponse::Error(packet) => packet,
        }
    }
}

/// Build an IQ stanza.
///
/// ```xml
/// <iq type='get' id='roster-1'>
///   <query xmlns='jabber:iq:roster'/>
/// </iq>
/// ```
pub fn build_iq(
    type_: IqType,
    id: Option<&str>,
    to: Option<&str>,
    payload: Option<Element>,
) -> Element {
    let mut builder = Element::builder("iq", ns::JABBER_CLIENT).attr("type", type_.as_str());

    if let Some(id) = id {
        builder = builder.attr("id", id);
    }

    if let Some(to) = to {
        builder = builder.attr("to", to);
    }

    if let Some(payload) = payload {
        builder = builder.append(payload);
    }

    builder.build()
}

/// Build the empty `result` acknowledging an IQ request.
///
/// The acknowledgment reuses the request id and is addressed to the
/// request's sender, when it has one.
pub fn build_ack(request: &Element) -> Element {
    build_iq(
        IqType::Result,
        request.attr("id"),
        request.attr("from"),
        None,
    )
}

/// Whether an IQ carries a payload with the given name and namespace.
pub fn has_payload(packet: &Element, name: &str, namespace: &str) -> bool {
    packet.name() == "iq" && packet.children().any(|c| c.is(name, namespace))
}
