//! Inbound stanza dispatch.
//!
//! The owner of the read loop hands every received element to
//! [`StanzaPipeline::process_inbound`]. IQ responses go to the connection's
//! pending request table first; everything else runs through the
//! registered processors in ascending priority order until one claims it.

use minidom::Element;
use tracing::{debug, trace};

use crate::connection::Connection;

/// Outcome of running one processor.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorResult {
    /// Not handled here; try the next processor
    Continue,
    /// Handled; stop dispatching
    Drop,
    /// Continue with a rewritten packet
    Replace(Box<Element>),
}

/// A stage of the inbound pipeline.
pub trait StanzaProcessor: Send + Sync + 'static {
    /// Processor name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Inspect a received packet.
    fn process_inbound(&self, packet: &Element, connection: &Connection) -> ProcessorResult;

    /// Lower runs first.
    fn priority(&self) -> i32;
}

/// Lets a shared processor sit in a pipeline while its owner keeps a handle.
impl<P: StanzaProcessor + ?Sized> StanzaProcessor for std::sync::Arc<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn process_inbound(&self, packet: &Element, connection: &Connection) -> ProcessorResult {
        (**self).process_inbound(packet, connection)
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }
}

/// Ordered set of inbound processors.
#[derive(Default)]
pub struct StanzaPipeline {
    processors: Vec<Box<dyn StanzaProcessor>>,
}

impl StanzaPipeline {
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Add a processor. Processors with equal priority keep registration order.
    pub fn register(&mut self, processor: Box<dyn StanzaProcessor>) {
        debug!(
            processor = processor.name(),
            priority = processor.priority(),
            "Registered stanza processor"
        );
        self.processors.push(processor);
        self.processors.sort_by_key(|p| p.priority());
    }

    /// Names of the registered processors, in dispatch order.
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Dispatch one received packet. Returns whether anything handled it.
    pub fn process_inbound(&self, connection: &Connection, packet: &Element) -> bool {
        if connection.resolve_iq(packet) {
            return true;
        }

        let mut replaced: Option<Element> = None;
        for processor in &self.processors {
            let current = replaced.as_ref().unwrap_or(packet);
            match processor.process_inbound(current, connection) {
                ProcessorResult::Continue => {}
                ProcessorResult::Drop => {
                    trace!(processor = processor.name(), "Stanza handled");
                    return true;
                }
                ProcessorResult::Replace(next) => {
                    trace!(processor = processor.name(), "Stanza replaced");
                    replaced = Some(*next);
                }
            }
        }

        debug!(
            name = %packet.name(),
            id = ?packet.attr("id"),
            "Unhandled inbound stanza"
        );
        false
    }
}

impl std::fmt::Debug for StanzaPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StanzaPipeline")
            .field("processors", &self.processor_names())
            .finish()
    }
}
