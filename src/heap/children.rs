//! Per-kind child enumeration shared by every tracer.
//!
//! Generic tracers walk the graph through [`trace_children`]; the marker uses
//! it for delayed things and for kinds it has no fast path for. The edge set
//! reported here for a thing is the same one the marker's scanners follow.

use crate::traits::Tracer;

use super::marking::*;
use super::string::StringData;
use super::thing::*;
use super::tracer::TracingDetails;
use super::value::PropertyId;

pub fn mark_children_object(trc: &mut dyn Tracer<'_>, obj: ObjectId) {
    let heap = trc.heap();
    let object = heap.object(obj);

    mark_type_object(trc, object.type_object(), "type");
    mark_shape_unbarriered(trc, object.last_property(), "shape");

    let clasp = heap.object_class(obj);
    if let Some(trace) = clasp.trace {
        trace(trc, obj);
    }

    if clasp.native {
        for slot in 0..object.slot_span() {
            trc.context_mut()
                .set_tracing_details(TracingDetails::ObjectSlot { object: obj, slot });
            mark_value_internal(trc, object.native_get_slot(slot));
        }
    }
}

pub fn mark_children_string(trc: &mut dyn Tracer<'_>, string: StringId) {
    match *trc.heap().string(string).data() {
        StringData::Dependent { base, .. } => mark_string_unbarriered(trc, base, "base"),
        StringData::Rope { left, right, .. } => {
            mark_string_unbarriered(trc, left, "left child");
            mark_string_unbarriered(trc, right, "right child");
        }
        StringData::Linear(_) => {}
    }
}

pub fn mark_children_script(trc: &mut dyn Tracer<'_>, id: ScriptId) {
    let heap = trc.heap();
    let script = heap.script(id);

    for atom in script.atoms().iter().flatten() {
        mark_string_unbarriered(trc, *atom, "atom");
    }
    if let Some(objects) = script.objects() {
        mark_object_range(trc, objects, "objects");
    }
    if let Some(regexps) = script.regexps() {
        mark_object_range(trc, regexps, "regexps");
    }
    if let Some(consts) = script.consts() {
        mark_value_range(trc, consts, "consts");
    }
    if let Some(function) = script.function() {
        mark_object_unbarriered(trc, function, "function");
    }
    // A cached eval script does not keep the global it was compiled for alive.
    if !script.is_cached_eval() {
        if let Some(global) = script.global_object() {
            mark_object(trc, global, "global");
        }
    }

    if let Some(filename) = script.filename() {
        if trc.as_marker().is_some() {
            heap.runtime().script_filenames().mark(filename);
        }
    }

    if let Some(bindings) = script.bindings() {
        mark_shape(trc, bindings, "bindings");
    }

    if script.has_any_breakpoints_or_step_mode() {
        for closure in script.trap_closures() {
            mark_value(trc, closure, "trap closure");
        }
    }
}

pub fn mark_children_shape(trc: &mut dyn Tracer<'_>, id: ShapeId) {
    let shape = trc.heap().shape(id);
    mark_base_shape_unbarriered(trc, shape.base(), "base");
    mark_id(trc, shape.maybe_propid(), "propid");
    if let Some(previous) = shape.previous() {
        mark_shape(trc, previous, "parent");
    }
}

fn mark_base_shape_getter_setter(trc: &mut dyn Tracer<'_>, id: BaseShapeId) {
    let base = trc.heap().base_shape(id);
    if let Some(getter) = base.getter_object() {
        mark_object_unbarriered(trc, getter, "getter");
    }
    if let Some(setter) = base.setter_object() {
        mark_object_unbarriered(trc, setter, "setter");
    }
}

pub fn mark_children_base_shape(trc: &mut dyn Tracer<'_>, id: BaseShapeId) {
    let base = trc.heap().base_shape(id);
    mark_base_shape_getter_setter(trc, id);
    if let Some(unowned) = base.base_unowned() {
        mark_base_shape_unbarriered(trc, unowned, "base");
    }
    if let Some(parent) = base.object_parent() {
        mark_object_unbarriered(trc, parent, "parent");
    }
}

pub fn mark_children_type_object(trc: &mut dyn Tracer<'_>, id: TypeObjectId) {
    let ty = trc.heap().type_object(id);
    // The marker only keeps string-named properties alive; the other ids are
    // reported to generic tracers alone.
    let string_ids_only = trc.as_marker().is_some();

    if ty.singleton().is_none() {
        for i in 0..ty.property_count() {
            if let Some(prop) = ty.property(i) {
                if string_ids_only && !matches!(prop.id, PropertyId::String(_)) {
                    continue;
                }
                mark_id(trc, prop.id, "type_prop");
            }
        }
    }

    if let Some(proto) = ty.proto() {
        mark_object(trc, proto, "type_proto");
    }
    if let Some(singleton) = ty.singleton() {
        if !ty.is_lazy() {
            mark_object(trc, singleton, "type_singleton");
        }
    }
    if let Some(new_script) = ty.new_script() {
        mark_object(trc, new_script.fun, "type_new_function");
        mark_shape(trc, new_script.shape, "type_new_shape");
    }
    if let Some(function) = ty.interpreted_function() {
        mark_object(trc, function, "type_function");
    }
}

pub fn mark_children_xml(trc: &mut dyn Tracer<'_>, id: XmlId) {
    let node = trc.heap().xml(id);
    if let Some(object) = node.object() {
        mark_object(trc, object, "object");
    }
    if let Some(name) = node.name() {
        mark_string(trc, name, "name");
    }
    if let Some(value) = node.value() {
        mark_string(trc, value, "value");
    }
    if let Some(parent) = node.parent() {
        mark_xml(trc, parent, "xml_parent");
    }
    mark_xml_root_range(trc, node.kids(), "xml_kids");
    mark_xml_root_range(trc, node.attrs(), "xml_attrs");
}

/// Reports every child edge of `thing` to `trc`.
pub fn trace_children(trc: &mut dyn Tracer<'_>, thing: ThingRef) {
    match thing {
        ThingRef::Object(id) => mark_children_object(trc, id),
        ThingRef::String(id) => mark_children_string(trc, id),
        ThingRef::Script(id) => mark_children_script(trc, id),
        ThingRef::Shape(id) => mark_children_shape(trc, id),
        ThingRef::BaseShape(id) => mark_children_base_shape(trc, id),
        ThingRef::TypeObject(id) => mark_children_type_object(trc, id),
        ThingRef::Xml(id) => mark_children_xml(trc, id),
    }
}

pub fn call_tracer(trc: &mut dyn Tracer<'_>, thing: ThingRef) {
    mark_kind(trc, thing);
}

fn mark_cycle_collector_base_shape(
    trc: &mut dyn Tracer<'_>,
    id: BaseShapeId,
    prev_parent: &mut Option<ObjectId>,
) {
    // Unowned twins carry the same getter, setter and parent, so they are
    // never visited here.
    mark_base_shape_getter_setter(trc, id);

    if let Some(parent) = trc.heap().base_shape(id).object_parent() {
        if Some(parent) != *prev_parent {
            mark_object_unbarriered(trc, parent, "parent");
            *prev_parent = Some(parent);
        }
    }
}

/// Walks a shape lineage for the cycle collector, which has no interest in
/// shapes themselves: only getters, setters, parents and property ids are
/// reported, and a parent shared by consecutive shapes is reported once.
pub fn mark_cycle_collector_children(trc: &mut dyn Tracer<'_>, shape: ShapeId) {
    let heap = trc.heap();
    let mut prev_parent = None;
    let mut current = Some(shape);
    while let Some(id) = current {
        let shape = heap.shape(id);
        mark_cycle_collector_base_shape(trc, shape.base(), &mut prev_parent);
        mark_id(trc, shape.maybe_propid(), "propid");
        current = shape.previous();
    }
}
