//! Service Discovery: disco#info responder (XEP-0030).
//!
//! Features registered on a [`Connection`] (for instance the chat state
//! namespace) are reported back to any entity that asks.

use minidom::Element;
use tracing::debug;

use crate::config::IdentityConfig;
use crate::connection::Connection;
use crate::iq::{build_iq, IqType};
use crate::pipeline::{ProcessorResult, StanzaProcessor};
use crate::xml::ns;

/// A discoverable feature namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Feature(pub String);

impl Feature {
    /// Create a new feature.
    pub fn new(var: &str) -> Self {
        Self(var.to_string())
    }

    /// disco#info feature
    pub fn disco_info() -> Self {
        Self::new(ns::DISCO_INFO)
    }
}

/// Identity element of a disco#info response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Category (e.g. "client")
    pub category: String,
    /// Type (e.g. "pc", "phone")
    pub type_: String,
    /// Optional human-readable name
    pub name: Option<String>,
}

impl Identity {
    /// Create a new identity.
    pub fn new(category: &str, type_: &str, name: Option<&str>) -> Self {
        Self {
            category: category.to_string(),
            type_: type_.to_string(),
            name: name.map(|s| s.to_string()),
        }
    }
}

impl From<&IdentityConfig> for Identity {
    fn from(config: &IdentityConfig) -> Self {
        Self::new(&config.category, &config.type_, config.name.as_deref())
    }
}

/// Check if a packet is a disco#info query.
pub fn is_disco_info_query(packet: &Element) -> bool {
    packet.name() == "iq"
        && IqType::of(packet) == Some(IqType::Get)
        && packet.children().any(|c| c.is("query", ns::DISCO_INFO))
}

/// Build a disco#info response.
///
/// The response reuses the request id and is addressed to the requester.
/// A `node` on the query is echoed back.
pub fn build_disco_info_response(
    request: &Element,
    identity: &Identity,
    features: &[Feature],
) -> Element {
    let node = request
        .get_child("query", ns::DISCO_INFO)
        .and_then(|q| q.attr("node"));

    let mut query = Element::builder("query", ns::DISCO_INFO);
    if let Some(node) = node {
        query = query.attr("node", node);
    }

    let mut identity_builder = Element::builder("identity", ns::DISCO_INFO)
        .attr("category", identity.category.as_str())
        .attr("type", identity.type_.as_str());
    if let Some(name) = &identity.name {
        identity_builder = identity_builder.attr("name", name.as_str());
    }
    query = query.append(identity_builder.build());

    for feature in features {
        query = query.append(
            Element::builder("feature", ns::DISCO_INFO)
                .attr("var", feature.0.as_str())
                .build(),
        );
    }

    build_iq(
        IqType::Result,
        request.attr("id"),
        request.attr("from"),
        Some(query.build()),
    )
}

/// Features advertised by a connection: disco#info itself, then every
/// registered feature in registration order.
pub fn advertised_features(connection: &Connection) -> Vec<Feature> {
    let mut features = vec![Feature::disco_info()];
    features.extend(
        connection
            .features()
            .features()
            .into_iter()
            .filter(|f| f.0 != ns::DISCO_INFO),
    );
    features
}

/// Pipeline processor answering disco#info queries.
#[derive(Debug, Default)]
pub struct DiscoInfoProcessor;

impl DiscoInfoProcessor {
    /// Create the responder.
    pub fn new() -> Self {
        Self
    }
}

impl StanzaProcessor for DiscoInfoProcessor {
    fn name(&self) -> &'static str {
        "disco-info"
    }

    fn process_inbound(&self, packet: &Element, connection: &Connection) -> ProcessorResult {
        if !is_disco_info_query(packet) {
            return ProcessorResult::Continue;
        }

        let identity = Identity::from(&connection.config().identity);
        let features = advertised_features(connection);
        let response = build_disco_info_response(packet, &identity, &features);

        debug!(
            from = ?packet.attr("from"),
            features = features.len(),
            "Answering disco#info query"
        );
        if let Err(e) = connection.send(&response) {
            debug!(error = %e, "Failed to answer disco#info query");
        }
        ProcessorResult::Drop
    }

    fn priority(&self) -> i32 {
        50
    }
}
