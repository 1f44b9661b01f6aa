//! Roster retrieval and push handling (RFC 6121 section 2).
//!
//! Request:
//! ```xml
//! <iq type='get' id='xc-…'><query xmlns='jabber:iq:roster'/></iq>
//! ```
//!
//! Push (acknowledged with an empty `result` carrying the same id):
//! ```xml
//! <iq type='set' id='set1'>
//!   <query xmlns='jabber:iq:roster'>
//!     <item jid='ford@betelguice.net' name='Ford Prefect'><group>Hitchhiker</group></item>
//!   </query>
//! </iq>
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use minidom::Element;
use tracing::{debug, info, warn};
use xc_xmpp::iq::{build_ack, build_iq, has_payload, IqResponse, IqType};
use xc_xmpp::pipeline::{ProcessorResult, StanzaProcessor};
use xc_xmpp::xml::ns;
use xc_xmpp::Connection;

use crate::entity::{parse_roster_items, RosterEntity};
use crate::error::RosterError;

/// Callback receiving the parsed items of a roster push.
pub type PushHandler = Arc<dyn Fn(Vec<RosterEntity>) + Send + Sync + 'static>;

/// Callbacks for one roster request. Exactly one of them fires.
pub struct RosterRequest {
    on_success: Box<dyn FnOnce(Vec<RosterEntity>) + Send + 'static>,
    on_error: Box<dyn FnOnce(Element) + Send + 'static>,
}

impl RosterRequest {
    pub fn new(
        on_success: impl FnOnce(Vec<RosterEntity>) + Send + 'static,
        on_error: impl FnOnce(Element) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    fn complete(self, response: IqResponse) {
        let failed = response.is_error();
        let packet = response.into_packet();
        if failed {
            warn!(id = ?packet.attr("id"), "Roster request failed");
            (self.on_error)(packet);
        } else {
            let items = parse_roster_items(&packet);
            info!(items = items.len(), "Roster received");
            (self.on_success)(items);
        }
    }
}

impl std::fmt::Debug for RosterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterRequest").finish_non_exhaustive()
    }
}

/// Roster service bound to one connection.
pub struct RosterService {
    connection: Arc<Connection>,
    on_push: Mutex<Option<PushHandler>>,
}

impl RosterService {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            on_push: Mutex::new(None),
        }
    }

    /// Register the callback for roster pushes, replacing any previous one.
    pub fn set_on_roster_push(&self, handler: impl Fn(Vec<RosterEntity>) + Send + Sync + 'static) {
        *self.lock_handler() = Some(Arc::new(handler));
    }

    /// Remove the push callback. Pushes are still acknowledged.
    pub fn clear_on_roster_push(&self) {
        *self.lock_handler() = None;
    }

    /// Ask the server for the full roster.
    ///
    /// Returns the request id once the request is on the wire. The
    /// response is delivered through the connection's pending IQ table; if
    /// none ever arrives no callback fires.
    pub fn request_items(&self, request: RosterRequest) -> Result<String, RosterError> {
        let id = self.connection.next_id();
        let query = Element::builder("query", ns::ROSTER).build();
        let iq = build_iq(IqType::Get, Some(&id), None, Some(query));

        self.connection
            .send_iq(&iq, Box::new(move |response| request.complete(response)))?;

        debug!(id = %id, "Requested roster");
        Ok(id)
    }

    /// Handle an unsolicited roster IQ.
    ///
    /// `set` pushes carry incremental changes and are acknowledged;
    /// `result` pushes carry a full snapshot and are not. The ack is sent
    /// before the push callback, which fires once per packet, with an empty
    /// list when the push has no items.
    pub fn handle_roster_push(&self, packet: &Element) -> Result<(), RosterError> {
        let type_ = match IqType::of(packet) {
            Some(t @ (IqType::Set | IqType::Result)) if packet.name() == "iq" => t,
            _ => {
                return Err(RosterError::not_a_push(format!(
                    "<{} type='{}'>",
                    packet.name(),
                    packet.attr("type").unwrap_or_default()
                )))
            }
        };

        let items = parse_roster_items(packet);
        debug!(
            id = ?packet.attr("id"),
            type_ = %type_,
            items = items.len(),
            "Roster push"
        );

        // The ack goes out before the handler runs, whatever the handler does.
        let acked = match type_ {
            IqType::Set => self.connection.send(&build_ack(packet)),
            _ => Ok(()),
        };

        // Cloned out so the handler may re-register without deadlocking.
        let handler = self.lock_handler().clone();
        if let Some(handler) = handler {
            handler(items);
        }

        acked.map_err(RosterError::from)
    }

    fn lock_handler(&self) -> MutexGuard<'_, Option<PushHandler>> {
        self.on_push
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for RosterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterService")
            .field("connection", &self.connection)
            .field("has_push_handler", &self.lock_handler().is_some())
            .finish()
    }
}

/// Whether a packet is a roster push the service should claim.
pub fn is_roster_push(packet: &Element) -> bool {
    matches!(IqType::of(packet), Some(IqType::Set | IqType::Result))
        && has_payload(packet, "query", ns::ROSTER)
}

/// Claims roster pushes from the inbound pipeline.
impl StanzaProcessor for RosterService {
    fn name(&self) -> &'static str {
        "roster"
    }

    fn process_inbound(&self, packet: &Element, _connection: &Connection) -> ProcessorResult {
        if !is_roster_push(packet) {
            return ProcessorResult::Continue;
        }
        if let Err(e) = self.handle_roster_push(packet) {
            warn!(error = %e, "Failed to handle roster push");
        }
        ProcessorResult::Drop
    }

    fn priority(&self) -> i32 {
        20
    }
}
