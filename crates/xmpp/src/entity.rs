//! Remote XMPP entity.

use std::sync::Arc;

use jid::Jid;

use crate::chat_state::{ChatState, ChatStateNotifier};
use crate::connection::Connection;
use crate::message::MessageStanza;
use crate::XmppError;

/// A remote address reachable through a connection.
///
/// Entities get the chat state send helpers through
/// [`ChatStateNotifier`]; [`Entity::send_chat_state`] targets the entity's
/// own address.
#[derive(Debug, Clone)]
pub struct Entity {
    jid: Jid,
    connection: Arc<Connection>,
}

impl Entity {
    pub fn new(jid: Jid, connection: Arc<Connection>) -> Self {
        Self { jid, connection }
    }

    /// The entity's address.
    pub fn jid(&self) -> &Jid {
        &self.jid
    }

    /// Tell this entity about our chat state.
    pub fn send_chat_state(
        &self,
        state: ChatState,
        thread: Option<&str>,
        id: Option<&str>,
    ) -> Result<MessageStanza, XmppError> {
        self.send_chat_state_notification(state, &self.jid, thread, id)
    }
}

impl ChatStateNotifier for Entity {
    fn connection(&self) -> &Connection {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_state::parse_chat_state;
    use crate::connection::MemoryTransport;
    use crate::xml::parse_element;

    fn entity(jid: &str) -> (Arc<MemoryTransport>, Entity) {
        let transport = Arc::new(MemoryTransport::new());
        let connection = Arc::new(Connection::new(Arc::clone(&transport)));
        (transport, Entity::new(jid.parse().unwrap(), connection))
    }

    #[test]
    fn test_send_chat_state_targets_entity() {
        let (transport, marvin) = entity("marvin@heart-of-gold.com/depressed");
        let sent = marvin
            .send_chat_state(ChatState::Paused, Some("t-1"), None)
            .unwrap();

        assert_eq!(sent.to(), Some("marvin@heart-of-gold.com/depressed"));
        let wire = parse_element(&transport.last_sent().unwrap()).unwrap();
        assert_eq!(wire.attr("to"), Some("marvin@heart-of-gold.com/depressed"));
        assert_eq!(parse_chat_state(&wire), Some(ChatState::Paused));
    }

    #[test]
    fn test_notifier_helpers_accept_other_targets() {
        let (transport, marvin) = entity("marvin@heart-of-gold.com");
        let arthur: Jid = "arthur@earth.org".parse().unwrap();

        marvin.send_chat_state_composing(&arthur, None, Some("c1")).unwrap();

        let wire = parse_element(&transport.last_sent().unwrap()).unwrap();
        assert_eq!(wire.attr("to"), Some("arthur@earth.org"));
        assert_eq!(wire.attr("id"), Some("c1"));
        assert_eq!(parse_chat_state(&wire), Some(ChatState::Composing));
    }

    #[test]
    fn test_entities_share_the_connection_registry() {
        let (_transport, marvin) = entity("marvin@heart-of-gold.com");
        let zaphod = Entity::new(
            "zaphod@heart-of-gold.com".parse().unwrap(),
            Arc::clone(&marvin.connection),
        );

        marvin.send_chat_state(ChatState::Active, None, None).unwrap();
        zaphod.send_chat_state(ChatState::Gone, None, None).unwrap();

        assert_eq!(marvin.connection().features().len(), 1);
        assert_eq!(zaphod.jid().to_string(), "zaphod@heart-of-gold.com");
    }
}
