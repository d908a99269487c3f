use std::fmt;

use crate::traits::Tracer;

use super::heap::Heap;
use super::runtime::{CompartmentId, RuntimeId};
use super::thing::{ObjectId, ThingRef};

/// Extra information about the edge being traced, printed lazily.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TracingDetails {
    ObjectSlot { object: ObjectId, slot: usize },
}

/// Annotation of the edge currently being traced. Purely diagnostic: nothing
/// in the marker reads it.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct TraceDebug {
    name: Option<&'static str>,
    index: Option<usize>,
    details: Option<TracingDetails>,
}

impl TraceDebug {
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn details(&self) -> Option<TracingDetails> {
        self.details
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.details.is_none()
    }
}

impl fmt::Display for TraceDebug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(TracingDetails::ObjectSlot { object, slot }) = self.details {
            return write!(f, "{:?}.slot[{}]", object, slot);
        }
        match (self.name, self.index) {
            (Some(name), Some(index)) => write!(f, "{}[{}]", name, index),
            (Some(name), None) => f.write_str(name),
            (None, _) => f.write_str("<unknown>"),
        }
    }
}

/// Per-traversal state passed with every call instead of runtime-global flags:
/// the compartment filter of a compartment-scoped collection and the edge
/// annotation.
#[derive(Clone, Debug)]
pub struct TraceContext {
    runtime: RuntimeId,
    atoms: CompartmentId,
    current_compartment: Option<CompartmentId>,
    debug: TraceDebug,
}

impl TraceContext {
    pub fn new(heap: &Heap) -> Self {
        Self {
            runtime: heap.runtime().id(),
            atoms: heap.atoms_compartment(),
            current_compartment: None,
            debug: TraceDebug::default(),
        }
    }

    pub fn runtime(&self) -> RuntimeId {
        self.runtime
    }

    pub fn current_compartment(&self) -> Option<CompartmentId> {
        self.current_compartment
    }

    pub fn set_current_compartment(&mut self, compartment: Option<CompartmentId>) {
        self.current_compartment = compartment;
    }

    /// Whether a thing of `compartment` passes the compartment filter. Atoms
    /// are shared by every compartment and always pass.
    #[inline]
    pub fn allows(&self, compartment: CompartmentId) -> bool {
        match self.current_compartment {
            None => true,
            Some(current) => compartment == current || compartment == self.atoms,
        }
    }

    pub fn debug(&self) -> &TraceDebug {
        &self.debug
    }

    #[inline]
    pub fn set_tracing_name(&mut self, name: &'static str) {
        self.debug = TraceDebug {
            name: Some(name),
            index: None,
            details: None,
        };
    }

    #[inline]
    pub fn set_tracing_index(&mut self, name: &'static str, index: usize) {
        self.debug = TraceDebug {
            name: Some(name),
            index: Some(index),
            details: None,
        };
    }

    #[inline]
    pub fn set_tracing_details(&mut self, details: TracingDetails) {
        self.debug = TraceDebug {
            name: None,
            index: None,
            details: Some(details),
        };
    }

    #[inline]
    pub fn clear_debug(&mut self) {
        self.debug = TraceDebug::default();
    }
}

/// Generic tracer forwarding every edge to a closure together with its
/// annotation.
pub struct CallbackTracer<'h, F>
where
    F: FnMut(ThingRef, &TraceDebug),
{
    heap: &'h Heap,
    context: TraceContext,
    callback: F,
}

impl<'h, F> CallbackTracer<'h, F>
where
    F: FnMut(ThingRef, &TraceDebug),
{
    pub fn new(heap: &'h Heap, callback: F) -> Self {
        Self {
            heap,
            context: TraceContext::new(heap),
            callback,
        }
    }

    pub fn into_inner(self) -> F {
        self.callback
    }
}

impl<'h, F> Tracer<'h> for CallbackTracer<'h, F>
where
    F: FnMut(ThingRef, &TraceDebug),
{
    fn heap(&self) -> &'h Heap {
        self.heap
    }

    fn context(&self) -> &TraceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut TraceContext {
        &mut self.context
    }

    fn callback(&mut self, thing: ThingRef) {
        (self.callback)(thing, &self.context.debug);
    }
}
