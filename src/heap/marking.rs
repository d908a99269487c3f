//! Typed mark dispatch.
//!
//! Every edge of the heap graph is reported through one of these entry
//! points. A marking tracer gets the thing pushed (or scanned eagerly,
//! depending on its kind); a generic tracer gets a callback per edge.
//!
//! Root variants are used for edges held outside the heap, unbarriered ones
//! where the caller already took care of the write barrier. Neither differs
//! from the plain variant at this layer.

use crate::traits::Tracer;

use super::thing::*;
use super::value::{PropertyId, Value};

cfg_if::cfg_if! {
    if #[cfg(any(debug_assertions, feature = "gc-verify"))] {
        fn check_marked_thing(trc: &dyn Tracer<'_>, thing: ThingRef) {
            let heap = trc.heap();
            assert!(heap.contains(thing), "{:?} is not a thing of this heap", thing);

            let compartment = heap.compartment_of(thing);
            let runtime = heap.runtime().compartment(compartment).map(|c| c.runtime());
            assert_eq!(
                runtime,
                Some(trc.context().runtime()),
                "{:?} belongs to {:?} of another runtime",
                thing,
                compartment
            );
        }
    } else {
        #[inline(always)]
        fn check_marked_thing(_trc: &dyn Tracer<'_>, _thing: ThingRef) {}
    }
}

pub(crate) fn mark_internal(trc: &mut dyn Tracer<'_>, thing: ThingRef) {
    check_marked_thing(&*trc, thing);

    match trc.as_marker() {
        Some(gcmarker) => gcmarker.push_thing(thing),
        None => trc.callback(thing),
    }

    trc.context_mut().clear_debug();
}

macro_rules! decl_marker {
    ($($base:ident: $id:ty),* $(,)?) => {
        paste::paste! {
            $(
                pub fn [<mark_ $base>](trc: &mut dyn Tracer<'_>, thing: $id, name: &'static str) {
                    trc.context_mut().set_tracing_name(name);
                    mark_internal(trc, thing.into());
                }

                pub fn [<mark_ $base _root>](trc: &mut dyn Tracer<'_>, thing: $id, name: &'static str) {
                    trc.context_mut().set_tracing_name(name);
                    mark_internal(trc, thing.into());
                }

                pub fn [<mark_ $base _unbarriered>](
                    trc: &mut dyn Tracer<'_>,
                    thing: $id,
                    name: &'static str,
                ) {
                    trc.context_mut().set_tracing_name(name);
                    mark_internal(trc, thing.into());
                }

                /// Marks every present entry of a heap-held vector.
                pub fn [<mark_ $base _range>](
                    trc: &mut dyn Tracer<'_>,
                    vec: &[Option<$id>],
                    name: &'static str,
                ) {
                    for (i, thing) in vec.iter().enumerate() {
                        if let Some(thing) = *thing {
                            trc.context_mut().set_tracing_index(name, i);
                            mark_internal(trc, thing.into());
                        }
                    }
                }

                pub fn [<mark_ $base _root_range>](
                    trc: &mut dyn Tracer<'_>,
                    vec: &[$id],
                    name: &'static str,
                ) {
                    for (i, &thing) in vec.iter().enumerate() {
                        trc.context_mut().set_tracing_index(name, i);
                        mark_internal(trc, thing.into());
                    }
                }
            )*
        }
    };
}

decl_marker! {
    object: ObjectId,
    string: StringId,
    script: ScriptId,
    shape: ShapeId,
    base_shape: BaseShapeId,
    type_object: TypeObjectId,
    xml: XmlId,
}

/* Externally typed marking */

pub fn mark_kind(trc: &mut dyn Tracer<'_>, thing: ThingRef) {
    mark_internal(trc, thing);
}

pub fn mark_kind_named(trc: &mut dyn Tracer<'_>, thing: ThingRef, name: &'static str) {
    trc.context_mut().set_tracing_name(name);
    mark_internal(trc, thing);
}

/// Marks a root of unknown kind; a missing thing is a no-op.
pub fn mark_gc_thing_root(trc: &mut dyn Tracer<'_>, thing: Option<ThingRef>, name: &'static str) {
    trc.context_mut().set_tracing_name(name);
    if let Some(thing) = thing {
        mark_internal(trc, thing);
    }
}

/* Id marking */

#[inline]
fn mark_id_internal(trc: &mut dyn Tracer<'_>, id: PropertyId) {
    if let Some(thing) = id.to_gc_thing() {
        mark_internal(trc, thing);
    }
}

pub fn mark_id(trc: &mut dyn Tracer<'_>, id: PropertyId, name: &'static str) {
    trc.context_mut().set_tracing_name(name);
    mark_id_internal(trc, id);
}

pub fn mark_id_root(trc: &mut dyn Tracer<'_>, id: PropertyId, name: &'static str) {
    trc.context_mut().set_tracing_name(name);
    mark_id_internal(trc, id);
}

pub fn mark_id_range(trc: &mut dyn Tracer<'_>, vec: &[PropertyId], name: &'static str) {
    for (i, &id) in vec.iter().enumerate() {
        trc.context_mut().set_tracing_index(name, i);
        mark_id_internal(trc, id);
    }
}

pub fn mark_id_root_range(trc: &mut dyn Tracer<'_>, vec: &[PropertyId], name: &'static str) {
    for (i, &id) in vec.iter().enumerate() {
        trc.context_mut().set_tracing_index(name, i);
        mark_id_internal(trc, id);
    }
}

/* Value marking */

#[inline]
pub(crate) fn mark_value_internal(trc: &mut dyn Tracer<'_>, value: Value) {
    if let Some(thing) = value.to_gc_thing() {
        mark_internal(trc, thing);
    }
}

pub fn mark_value(trc: &mut dyn Tracer<'_>, value: Value, name: &'static str) {
    trc.context_mut().set_tracing_name(name);
    mark_value_internal(trc, value);
}

pub fn mark_value_root(trc: &mut dyn Tracer<'_>, value: Value, name: &'static str) {
    trc.context_mut().set_tracing_name(name);
    mark_value_internal(trc, value);
}

pub fn mark_value_unbarriered(trc: &mut dyn Tracer<'_>, value: Value, name: &'static str) {
    trc.context_mut().set_tracing_name(name);
    mark_value_internal(trc, value);
}

pub fn mark_value_range(trc: &mut dyn Tracer<'_>, vec: &[Value], name: &'static str) {
    for (i, &value) in vec.iter().enumerate() {
        trc.context_mut().set_tracing_index(name, i);
        mark_value_internal(trc, value);
    }
}

pub fn mark_value_root_range(trc: &mut dyn Tracer<'_>, vec: &[Value], name: &'static str) {
    for (i, &value) in vec.iter().enumerate() {
        trc.context_mut().set_tracing_index(name, i);
        mark_value_internal(trc, value);
    }
}

/// Marks a value held by a cross-compartment wrapper. Under a compartment
/// filter, values living in any other compartment (atoms included) are left
/// alone.
pub fn mark_cross_compartment_value(trc: &mut dyn Tracer<'_>, value: Value, name: &'static str) {
    if let Some(thing) = value.to_gc_thing() {
        if let Some(current) = trc.context().current_compartment() {
            if trc.heap().compartment_of(thing) != current {
                return;
            }
        }
        mark_value(trc, value, name);
    }
}
