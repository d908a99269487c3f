use crate::heap::heap::Heap;
use crate::heap::mark::GCMarker;
use crate::heap::thing::ThingRef;
use crate::heap::tracer::TraceContext;

/// Capability handed to every marking entry point.
///
/// A tracer either marks (it is a [`GCMarker`] and returns itself from
/// [`Tracer::as_marker`]) or is generic, in which case every edge is reported
/// once through [`Tracer::callback`] and nothing is marked. Generic tracers
/// decide themselves whether to recurse with
/// [`trace_children`](crate::heap::children::trace_children).
pub trait Tracer<'h> {
    fn heap(&self) -> &'h Heap;

    fn context(&self) -> &TraceContext;

    fn context_mut(&mut self) -> &mut TraceContext;

    fn as_marker(&mut self) -> Option<&mut GCMarker<'h>> {
        None
    }

    /// Called once per reported edge in generic mode. The edge annotation is
    /// available from `self.context().debug()` for the duration of the call.
    fn callback(&mut self, thing: ThingRef);
}
