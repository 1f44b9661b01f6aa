//! Roster entries.

use minidom::Element;
use serde::{Deserialize, Serialize};
use tracing::debug;
use xc_xmpp::xml::{attr_string, find_descendants};

/// One contact-list entry.
///
/// ```xml
/// <item jid='ford@betelguice.net' name='Ford Prefect' subscription='both'>
///   <group>Hitchhiker</group>
/// </item>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntity {
    /// Contact address
    pub jid: String,
    /// Display name
    pub name: Option<String>,
    /// Group names, in document order
    pub groups: Vec<String>,
    /// `subscription` attribute, verbatim
    pub subscription: Option<String>,
    /// `ask` attribute, verbatim
    pub ask: Option<String>,
}

impl RosterEntity {
    /// Create an entry with only an address.
    pub fn new(jid: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            ..Self::default()
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a group.
    pub fn add_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Parse an `<item/>` element.
    ///
    /// Returns `None` for items without a `jid`. Empty group elements are
    /// skipped; duplicates are kept.
    pub fn from_element(item: &Element) -> Option<Self> {
        let jid = attr_string(item, "jid")?;

        let groups = item
            .children()
            .filter(|c| c.name() == "group")
            .map(|g| g.text())
            .filter(|g| !g.is_empty())
            .collect();

        Some(Self {
            jid,
            name: attr_string(item, "name"),
            groups,
            subscription: attr_string(item, "subscription"),
            ask: attr_string(item, "ask"),
        })
    }
}

/// Parse every roster item carried by a packet, in document order.
///
/// Items are matched by name wherever they sit, so both
/// `<iq><query><item/></query></iq>` and a bare `<iq><item/></iq>` work.
pub fn parse_roster_items(packet: &Element) -> Vec<RosterEntity> {
    find_descendants(packet, "item")
        .into_iter()
        .filter_map(|item| {
            let entity = RosterEntity::from_element(item);
            if entity.is_none() {
                debug!("Skipping roster item without a jid");
            }
            entity
        })
        .collect()
}
