//! Behavior composition chain.
//!
//! Each behavior may wrap `init`, `serialize`, or both. Layers run
//! outermost first (the most recently composed layer) and hand control
//! inward through the continuation they receive; the base implementation
//! terminates the chain.
//!
//! Delegation is checked by the compiler: `on_init` must return an
//! [`Initialized`] token and `on_serialize` a [`Serialized`] tree, and
//! neither can be constructed outside this module. The only way for a
//! layer to obtain one is to run its continuation.

use minidom::Element;

use super::{base_init, base_serialize, InitContext, Stanza, StanzaSource};

/// Proof that the init chain ran down to the base implementation.
#[derive(Debug)]
#[must_use]
pub struct Initialized {
    _private: (),
}

impl Initialized {
    pub(super) fn new() -> Self {
        Self { _private: () }
    }
}

/// Element produced by the serialize chain.
///
/// Layers receive it from their continuation and may append the children
/// they own before handing it outward.
#[derive(Debug)]
#[must_use]
pub struct Serialized {
    element: Element,
}

impl Serialized {
    pub(super) fn new(element: Element) -> Self {
        Self { element }
    }

    /// The element built so far.
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Append a child element.
    pub fn append_child(&mut self, child: Element) {
        self.element.append_child(child);
    }

    /// Finish serialization.
    pub fn into_element(self) -> Element {
        self.element
    }
}

/// A composable stanza behavior.
///
/// Both hooks default to plain delegation, so a behavior only overrides
/// the points it cares about.
pub trait StanzaBehavior<S: Stanza>: Send + Sync + 'static {
    /// Behavior name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Wrap stanza construction.
    fn on_init(
        &self,
        stanza: &mut S,
        source: &StanzaSource<S::Fields>,
        ctx: &InitContext<'_>,
        next: InitNext<'_, S>,
    ) -> Initialized {
        next.run(stanza, source, ctx)
    }

    /// Wrap stanza serialization.
    fn on_serialize(&self, stanza: &S, next: SerializeNext<'_, S>) -> Serialized {
        next.run(stanza)
    }
}

/// Continuation of the init chain.
pub struct InitNext<'c, S: Stanza> {
    layers: &'c [Box<dyn StanzaBehavior<S>>],
}

impl<S: Stanza> InitNext<'_, S> {
    /// Run the inner layers and the base implementation.
    pub fn run(
        self,
        stanza: &mut S,
        source: &StanzaSource<S::Fields>,
        ctx: &InitContext<'_>,
    ) -> Initialized {
        match self.layers.split_last() {
            Some((outer, inner)) => outer.on_init(stanza, source, ctx, InitNext { layers: inner }),
            None => base_init(stanza, source),
        }
    }
}

/// Continuation of the serialize chain.
pub struct SerializeNext<'c, S: Stanza> {
    layers: &'c [Box<dyn StanzaBehavior<S>>],
}

impl<S: Stanza> SerializeNext<'_, S> {
    /// Run the inner layers and the base implementation.
    pub fn run(self, stanza: &S) -> Serialized {
        match self.layers.split_last() {
            Some((outer, inner)) => outer.on_serialize(stanza, SerializeNext { layers: inner }),
            None => base_serialize(stanza),
        }
    }
}

/// Ordered behaviors of one stanza type.
pub struct BehaviorChain<S: Stanza> {
    layers: Vec<Box<dyn StanzaBehavior<S>>>,
}

impl<S: Stanza> BehaviorChain<S> {
    /// A chain holding only the base implementation.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Compose a behavior around everything composed so far.
    pub fn with(mut self, behavior: impl StanzaBehavior<S>) -> Self {
        self.layers.push(Box::new(behavior));
        self
    }

    /// Names of the composed behaviors, outermost first.
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().rev().map(|layer| layer.name()).collect()
    }

    /// Run the init chain.
    pub fn init(
        &self,
        stanza: &mut S,
        source: &StanzaSource<S::Fields>,
        ctx: &InitContext<'_>,
    ) -> Initialized {
        InitNext {
            layers: &self.layers,
        }
        .run(stanza, source, ctx)
    }

    /// Run the serialize chain.
    pub fn serialize(&self, stanza: &S) -> Element {
        SerializeNext {
            layers: &self.layers,
        }
        .run(stanza)
        .into_element()
    }
}

impl<S: Stanza> Default for BehaviorChain<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;
    use crate::stanza::{StanzaFields, StanzaHeader};
    use crate::xml::ns;

    /// Records the order layers run in.
    #[derive(Debug, Default)]
    struct Traced {
        header: StanzaHeader,
        trail: Mutex<Vec<String>>,
    }

    impl Traced {
        fn trail(&self) -> Vec<String> {
            self.trail.lock().unwrap().clone()
        }
    }

    impl Stanza for Traced {
        const NAME: &'static str = "message";
        type Fields = StanzaFields;

        fn chain() -> &'static BehaviorChain<Self> {
            static CHAIN: OnceLock<BehaviorChain<Traced>> = OnceLock::new();
            CHAIN.get_or_init(|| {
                BehaviorChain::new()
                    .with(Tag("inner"))
                    .with(InitOnly)
                    .with(Tag("outer"))
            })
        }

        fn header(&self) -> &StanzaHeader {
            &self.header
        }

        fn header_mut(&mut self) -> &mut StanzaHeader {
            &mut self.header
        }
    }

    /// Logs around both hooks and appends a child named after itself.
    struct Tag(&'static str);

    impl StanzaBehavior<Traced> for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn on_init(
            &self,
            stanza: &mut Traced,
            source: &StanzaSource<StanzaFields>,
            ctx: &InitContext<'_>,
            next: InitNext<'_, Traced>,
        ) -> Initialized {
            stanza.trail.lock().unwrap().push(format!("{}:before", self.0));
            let done = next.run(stanza, source, ctx);
            // The base has populated the header by now.
            assert!(stanza.header.to.is_some());
            stanza.trail.lock().unwrap().push(format!("{}:after", self.0));
            done
        }

        fn on_serialize(&self, stanza: &Traced, next: SerializeNext<'_, Traced>) -> Serialized {
            let mut serialized = next.run(stanza);
            serialized.append_child(Element::builder(self.0, ns::JABBER_CLIENT).build());
            serialized
        }
    }

    /// Overrides only `init`; serialization falls through to the default.
    struct InitOnly;

    impl StanzaBehavior<Traced> for InitOnly {
        fn name(&self) -> &'static str {
            "init-only"
        }

        fn on_init(
            &self,
            stanza: &mut Traced,
            source: &StanzaSource<StanzaFields>,
            ctx: &InitContext<'_>,
            next: InitNext<'_, Traced>,
        ) -> Initialized {
            stanza.trail.lock().unwrap().push("init-only".to_string());
            next.run(stanza, source, ctx)
        }
    }

    fn traced() -> Traced {
        Traced::from_source(
            StanzaSource::Outbound(StanzaFields::to("zaphod@heart-of-gold.com")),
            &InitContext::detached(),
        )
    }

    #[test]
    fn test_init_runs_outermost_first_and_base_last() {
        assert_eq!(
            traced().trail(),
            vec![
                "outer:before",
                "init-only",
                "inner:before",
                "inner:after",
                "outer:after"
            ]
        );
    }

    #[test]
    fn test_serialize_appends_outward() {
        let element = traced().to_element();
        let names: Vec<&str> = element.children().map(|c| c.name()).collect();
        assert_eq!(names, vec!["inner", "outer"]);
        assert_eq!(element.attr("to"), Some("zaphod@heart-of-gold.com"));
    }

    #[test]
    fn test_layer_names_outermost_first() {
        assert_eq!(
            Traced::chain().layer_names(),
            vec!["outer", "init-only", "inner"]
        );
    }

    #[test]
    fn test_empty_chain_is_base_only() {
        let chain: BehaviorChain<Traced> = BehaviorChain::default();
        let mut stanza = Traced::default();
        let _ = chain.init(
            &mut stanza,
            &StanzaSource::Outbound(StanzaFields::to("arthur@earth.org")),
            &InitContext::detached(),
        );
        assert!(stanza.trail().is_empty());
        assert_eq!(chain.serialize(&stanza).children().count(), 0);
    }
}
