//! Shared helpers for XC tests: fixture loading and a connection wired to
//! a recording transport.

pub mod fixtures {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use minidom::Element;
    use xc_xmpp::xml::parse_element;

    pub fn root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("tests")
            .join("fixtures")
    }

    pub fn path(relative: impl AsRef<Path>) -> PathBuf {
        root().join(relative.as_ref())
    }

    pub fn read(relative: impl AsRef<Path>) -> io::Result<String> {
        fs::read_to_string(path(relative))
    }

    pub fn stanza(name: &str) -> String {
        read_or_panic(Path::new("stanzas").join(name))
    }

    pub fn roster(name: &str) -> String {
        read_or_panic(Path::new("roster").join(name))
    }

    pub fn config(name: &str) -> String {
        read_or_panic(Path::new("config").join(name))
    }

    /// Parse a fixture into an element.
    pub fn element(xml: &str) -> Element {
        parse_element(xml).unwrap_or_else(|error| panic!("invalid fixture xml: {error}"))
    }

    /// Parse a roster fixture and stamp it with a request id.
    pub fn roster_response(name: &str, id: &str) -> Element {
        let mut packet = element(&roster(name));
        packet.set_attr("id", id);
        packet
    }

    fn read_or_panic(relative: impl AsRef<Path>) -> String {
        let relative = relative.as_ref();
        read(relative).unwrap_or_else(|error| {
            panic!(
                "failed to read fixture {}: {error}",
                relative.to_string_lossy()
            )
        })
    }
}

pub mod transport {
    use std::sync::Arc;

    use minidom::Element;
    use xc_xmpp::xml::parse_element;
    use xc_xmpp::{ClientConfig, Connection, MemoryTransport};

    /// A connection whose transport records everything sent.
    pub fn connected() -> (Arc<MemoryTransport>, Arc<Connection>) {
        connected_with(ClientConfig::default())
    }

    /// Like [`connected`], with a custom configuration.
    pub fn connected_with(config: ClientConfig) -> (Arc<MemoryTransport>, Arc<Connection>) {
        let transport = Arc::new(MemoryTransport::new());
        let connection = Arc::new(Connection::with_config(Arc::clone(&transport), config));
        (transport, connection)
    }

    /// Everything sent so far, parsed back into elements.
    pub fn sent_elements(transport: &MemoryTransport) -> Vec<Element> {
        transport
            .sent()
            .iter()
            .map(|xml| parse_element(xml).unwrap_or_else(|error| panic!("sent invalid xml: {error}")))
            .collect()
    }

    /// The most recently sent stanza, parsed.
    pub fn last_sent_element(transport: &MemoryTransport) -> Element {
        let xml = transport
            .last_sent()
            .unwrap_or_else(|| panic!("nothing was sent"));
        parse_element(&xml).unwrap_or_else(|error| panic!("sent invalid xml: {error}"))
    }
}

pub use transport::{connected, connected_with, last_sent_element, sent_elements};

#[cfg(test)]
mod tests {
    use super::{fixtures, transport};

    #[test]
    fn fixture_root_exists() {
        assert!(fixtures::root().is_dir());
    }

    #[test]
    fn loads_stanza_fixture() {
        let stanza = fixtures::stanza("message-chat.xml");
        assert!(stanza.contains("<message"));
    }

    #[test]
    fn loads_roster_fixture_with_id() {
        let packet = fixtures::roster_response("request-result.xml", "xc-1");
        assert_eq!(packet.name(), "iq");
        assert_eq!(packet.attr("id"), Some("xc-1"));
    }

    #[test]
    fn loads_config_fixture() {
        let config = fixtures::config("minimal-config.toml");
        let toml: toml::Value =
            toml::from_str(&config).expect("minimal-config.toml should be valid toml");
        assert!(toml.is_table());
    }

    #[test]
    fn connected_records_sent_stanzas() {
        let (transport, connection) = transport::connected();
        connection
            .send(&fixtures::element(&fixtures::stanza("message-chat.xml")))
            .unwrap();
        let sent = transport::sent_elements(&transport);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name(), "message");
    }
}
