//! Client connection handle.
//!
//! A [`Connection`] is the single object stanzas, behaviors and services
//! talk to. It owns:
//!
//! - the [`Transport`] that writes serialized stanzas,
//! - the discoverable-feature registry ([`FeatureRegistry`]),
//! - the table of IQ requests awaiting a response,
//! - the stanza id generator and the [`ClientConfig`].
//!
//! Reading from the network is not handled here: the owner of the read
//! loop feeds received elements into a
//! [`StanzaPipeline`](crate::pipeline::StanzaPipeline), which hands IQ
//! responses back to [`Connection::resolve_iq`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use minidom::Element;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::disco::Feature;
use crate::iq::{IqResponse, IqType};
use crate::xml::to_xml_string;
use crate::XmppError;

/// Outbound half of the network plumbing.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync + 'static {
    /// Write one serialized stanza.
    fn send(&self, data: &str) -> Result<(), XmppError>;

    /// Close the underlying stream.
    fn close(&self) -> Result<(), XmppError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, data: &str) -> Result<(), XmppError> {
        (**self).send(data)
    }

    fn close(&self) -> Result<(), XmppError> {
        (**self).close()
    }
}

/// In-memory transport that records everything written to it.
///
/// Useful for embedding the client core in tests or for loopback setups
/// where another component drains the sent stanzas.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// The most recently sent stanza.
    pub fn last_sent(&self) -> Option<String> {
        lock(&self.sent).last().cloned()
    }

    /// Whether [`Transport::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, data: &str) -> Result<(), XmppError> {
        if self.is_closed() {
            return Err(XmppError::Closed);
        }
        lock(&self.sent).push(data.to_string());
        Ok(())
    }

    fn close(&self) -> Result<(), XmppError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Per-connection set of discoverable features (XEP-0030).
///
/// Registration order is preserved so disco#info responses are stable.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    features: Mutex<Vec<Feature>>,
}

impl FeatureRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature namespace.
    ///
    /// The duplicate check and the insert happen under one lock, so
    /// concurrent registrations of the same namespace yield a single entry.
    /// Returns `true` if the feature was newly added.
    pub fn add_feature(&self, var: &str) -> bool {
        let mut features = lock(&self.features);
        if features.iter().any(|f| f.0 == var) {
            return false;
        }
        features.push(Feature::new(var));
        debug!(feature = %var, "Registered discoverable feature");
        true
    }

    /// Whether a feature namespace is registered.
    pub fn contains(&self, var: &str) -> bool {
        lock(&self.features).iter().any(|f| f.0 == var)
    }

    /// Snapshot of the registered features.
    pub fn features(&self) -> Vec<Feature> {
        lock(&self.features).clone()
    }

    /// Number of registered features.
    pub fn len(&self) -> usize {
        lock(&self.features).len()
    }

    /// Whether no feature is registered.
    pub fn is_empty(&self) -> bool {
        lock(&self.features).is_empty()
    }
}

/// Callback invoked once with the response to an IQ request.
pub type IqCallback = Box<dyn FnOnce(IqResponse) + Send + 'static>;

/// Client connection: transport, feature registry and pending IQs.
pub struct Connection {
    transport: Box<dyn Transport>,
    config: ClientConfig,
    features: FeatureRegistry,
    // Mutex only makes the FnOnce shareable; it is taken exactly once.
    pending: DashMap<String, Mutex<IqCallback>>,
    closed: AtomicBool,
}

impl Connection {
    /// Create a connection over a transport with the default configuration.
    pub fn new(transport: impl Transport) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    /// Create a connection over a transport.
    pub fn with_config(transport: impl Transport, config: ClientConfig) -> Self {
        Self {
            transport: Box::new(transport),
            config,
            features: FeatureRegistry::new(),
            pending: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The discoverable-feature registry of this connection.
    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    /// Generate a fresh stanza id.
    pub fn next_id(&self) -> String {
        format!("{}{}", self.config.id_prefix, Uuid::new_v4())
    }

    /// Whether [`Connection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Serialize an element and write it to the transport.
    pub fn send(&self, element: &Element) -> Result<(), XmppError> {
        let xml = to_xml_string(element)?;
        self.send_raw(&xml)
    }

    /// Write an already serialized stanza to the transport.
    pub fn send_raw(&self, xml: &str) -> Result<(), XmppError> {
        if self.is_closed() {
            return Err(XmppError::Closed);
        }
        trace!(bytes = xml.len(), "Sending stanza");
        self.transport.send(xml).inspect_err(|e| {
            warn!(error = %e, "Failed to send stanza");
        })
    }

    /// Send an IQ request and register a callback for its response.
    ///
    /// The element must carry an `id` attribute not already awaiting a
    /// response. The callback fires at most once, when [`Connection::resolve_iq`] sees a `result` or
    /// `error` with the same id. If sending fails the registration is
    /// rolled back and the callback is dropped without firing.
    pub fn send_iq(&self, iq: &Element, callback: IqCallback) -> Result<(), XmppError> {
        let id = iq
            .attr("id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| XmppError::xml_write("IQ request without an id"))?
            .to_string();

        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => return Err(XmppError::duplicate_request(id)),
            Entry::Vacant(slot) => {
                slot.insert(Mutex::new(callback));
            }
        }
        if let Err(e) = self.send(iq) {
            self.pending.remove(&id);
            return Err(e);
        }
        debug!(id = %id, "IQ request pending");
        Ok(())
    }

    /// Hand an inbound IQ to the callback waiting for it.
    ///
    /// Returns `false` (and leaves the packet untouched) if the packet is
    /// not an IQ `result`/`error` or no request with its id is pending.
    pub fn resolve_iq(&self, packet: &Element) -> bool {
        if packet.name() != "iq" {
            return false;
        }
        let response = match IqType::of(packet) {
            Some(IqType::Result) => IqResponse::Result(packet.clone()),
            Some(IqType::Error) => IqResponse::Error(packet.clone()),
            _ => return false,
        };
        let Some(id) = packet.attr("id") else {
            return false;
        };

        // Removed before the call so the callback may re-enter the connection.
        let Some((id, callback)) = self.pending.remove(id) else {
            return false;
        };
        debug!(id = %id, error = response.is_error(), "IQ response received");
        let callback = callback
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        callback(response);
        true
    }

    /// Number of IQ requests still awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Close the connection.
    ///
    /// Pending IQ requests are dropped without firing their callbacks.
    pub fn close(&self) -> Result<(), XmppError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let dropped = self.pending.len();
        self.pending.clear();
        debug!(dropped_requests = dropped, "Connection closed");
        self.transport.close()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("features", &self.features)
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
