//! Thin helpers over the `minidom` element tree.
//!
//! A missing element or attribute is `None`, never an error.

use minidom::Element;

use crate::XmppError;

/// XML namespaces used by the client core.
pub mod ns {
    /// XMPP client namespace
    pub const JABBER_CLIENT: &str = "jabber:client";
    /// Roster namespace (RFC 6121)
    pub const ROSTER: &str = xmpp_parsers::ns::ROSTER;
    /// Chat State Notifications namespace (XEP-0085)
    pub const CHATSTATES: &str = xmpp_parsers::ns::CHATSTATES;
    /// Service Discovery info namespace (XEP-0030)
    pub const DISCO_INFO: &str = xmpp_parsers::ns::DISCO_INFO;
}

/// Parse a single XML element from a string.
pub fn parse_element(xml: &str) -> Result<Element, XmppError> {
    let trimmed = xml.trim();
    if trimmed.is_empty() {
        return Err(XmppError::xml_parse("stanza payload is empty"));
    }
    trimmed
        .parse::<Element>()
        .map_err(|e| XmppError::xml_parse(format!("failed to parse stanza XML: {}", e)))
}

/// Serialize an element to its string form.
pub fn to_xml_string(element: &Element) -> Result<String, XmppError> {
    let mut payload = Vec::new();
    element.write_to(&mut payload).map_err(|e| {
        XmppError::xml_write(format!("failed to serialize <{}/>: {}", element.name(), e))
    })?;
    String::from_utf8(payload).map_err(|e| XmppError::xml_write(e.to_string()))
}

/// First descendant (depth-first, document order) with the given local
/// name, in any namespace. The element itself is not considered.
pub fn find_descendant<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    for child in element.children() {
        if child.name() == name {
            return Some(child);
        }
        if let Some(found) = find_descendant(child, name) {
            return Some(found);
        }
    }
    None
}

/// All descendants with the given local name, in document order.
pub fn find_descendants<'a>(element: &'a Element, name: &str) -> Vec<&'a Element> {
    let mut found = Vec::new();
    collect_descendants(element, name, &mut found);
    found
}

fn collect_descendants<'a>(element: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    for child in element.children() {
        if child.name() == name {
            found.push(child);
        }
        collect_descendants(child, name, found);
    }
}

/// First descendant living in the given namespace.
pub fn find_in_namespace<'a>(element: &'a Element, namespace: &str) -> Option<&'a Element> {
    for child in element.children() {
        if child.ns() == namespace {
            return Some(child);
        }
        if let Some(found) = find_in_namespace(child, namespace) {
            return Some(found);
        }
    }
    None
}

/// Text content of an optional element; empty text counts as absent.
pub fn text_of(element: Option<&Element>) -> Option<String> {
    element.map(Element::text).filter(|text| !text.is_empty())
}

/// Attribute value as an owned string; empty values count as absent.
pub fn attr_string(element: &Element, name: &str) -> Option<String> {
    element
        .attr(name)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = "<message xmlns='jabber:client'>\
        <wrapper xmlns='urn:example:wrap'><body>inner</body></wrapper>\
        <body>outer</body>\
        <paused xmlns='http://jabber.org/protocol/chatstates'/>\
    </message>";

    #[test]
    fn test_find_descendant_is_depth_first() {
        let element = parse_element(NESTED).unwrap();
        let body = find_descendant(&element, "body").unwrap();
        assert_eq!(body.text(), "inner");
        assert!(find_descendant(&element, "subject").is_none());
    }

    #[test]
    fn test_find_descendants_in_document_order() {
        let element = parse_element(NESTED).unwrap();
        let bodies: Vec<String> = find_descendants(&element, "body")
            .into_iter()
            .map(Element::text)
            .collect();
        assert_eq!(bodies, vec!["inner", "outer"]);
    }

    #[test]
    fn test_find_in_namespace() {
        let element = parse_element(NESTED).unwrap();
        let state = find_in_namespace(&element, ns::CHATSTATES).unwrap();
        assert_eq!(state.name(), "paused");
        assert!(find_in_namespace(&element, ns::ROSTER).is_none());
    }

    #[test]
    fn test_text_of_treats_empty_as_absent() {
        let element = parse_element("<message xmlns='jabber:client'><body/></message>").unwrap();
        assert_eq!(text_of(find_descendant(&element, "body")), None);
        assert_eq!(text_of(None), None);
    }

    #[test]
    fn test_parse_element_rejects_empty_and_garbage() {
        assert!(matches!(parse_element("   "), Err(XmppError::XmlParse(_))));
        assert!(matches!(parse_element("<open>"), Err(XmppError::XmlParse(_))));
    }

    #[test]
    fn test_to_xml_string_escapes_text() {
        let element = Element::builder("body", ns::JABBER_CLIENT)
            .append(String::from("fish & chips"))
            .build();
        let xml = to_xml_string(&element).unwrap();
        assert!(xml.contains("fish &amp; chips"));
        assert_eq!(parse_element(&xml).unwrap().text(), "fish & chips");
    }
}
