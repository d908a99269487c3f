//! Mark phase of a tracing garbage collector for a dynamic-language runtime.
//!
//! The heap graph is traversed with an explicit, bounded mark stack; native
//! stack usage stays constant no matter how deep objects, shape lineages or
//! ropes nest. See [`heap::mark::GCMarker`] for the driver and
//! [`heap::marking`] for the typed entry points that report edges.

pub mod base;
pub mod heap;
pub mod traits;
pub mod utils;

pub use heap::children::{call_tracer, mark_cycle_collector_children, trace_children};
pub use heap::heap::{BaseShapeInit, Heap, ScriptInit, TypeObjectInit};
pub use heap::mark::{GCMarker, MarkObserver, MarkStackEntry, MarkStats};
pub use heap::marking_context::{MarkerConfig, SliceBudget};
pub use heap::runtime::CompartmentId;
pub use heap::thing::{
    BaseShapeId, MarkColor, MarkState, ObjectId, ScriptId, ShapeId, StringId, ThingKind, ThingRef,
    TypeObjectId, XmlId,
};
pub use heap::tracer::{CallbackTracer, TraceDebug};
pub use heap::value::{PropertyId, Value};
pub use traits::Tracer;
