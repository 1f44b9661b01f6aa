//! Roster (contact list) management for XC.
//!
//! [`RosterService`] fetches the roster through the connection's pending IQ
//! table and turns server pushes into [`RosterEntity`] lists. Register it
//! in a [`StanzaPipeline`](xc_xmpp::StanzaPipeline) to have pushes claimed
//! automatically.

pub mod entity;
pub mod error;
pub mod service;

pub use entity::{parse_roster_items, RosterEntity};
pub use error::RosterError;
pub use service::{is_roster_push, PushHandler, RosterRequest, RosterService};
