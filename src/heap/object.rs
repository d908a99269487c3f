use std::fmt;

use crate::traits::Tracer;

use super::marking::{mark_kind_named, mark_value_range};
use super::thing::{CellHeader, ObjectId, ShapeId, ThingRef, TypeObjectId};
use super::value::Value;

/// Custom child tracer of a class. Called with the object being traced; it
/// reports extra edges through the usual `mark_*` entry points.
pub type TraceHook = for<'h, 't> fn(&'t mut dyn Tracer<'h>, ObjectId);

/// Object class. Classes are static and compared by address.
pub struct Class {
    pub name: &'static str,
    /// Native objects keep their properties in slots described by the shape
    /// lineage. Non-native objects (dense arrays) store elements elsewhere.
    pub native: bool,
    pub trace: Option<TraceHook>,
}

impl Class {
    pub fn is(&'static self, other: &'static Class) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("native", &self.native)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

pub static PLAIN_CLASS: Class = Class {
    name: "Object",
    native: true,
    trace: None,
};

/// Dense arrays. Marking scans the element vector directly instead of calling
/// the hook.
pub static ARRAY_CLASS: Class = Class {
    name: "Array",
    native: false,
    trace: Some(array_trace),
};

pub static FUNCTION_CLASS: Class = Class {
    name: "Function",
    native: true,
    trace: Some(private_trace),
};

fn array_trace(trc: &mut dyn Tracer<'_>, obj: ObjectId) {
    let heap = trc.heap();
    mark_value_range(trc, heap.object(obj).elements(), "element");
}

fn private_trace(trc: &mut dyn Tracer<'_>, obj: ObjectId) {
    let heap = trc.heap();
    if let Some(private) = heap.object(obj).private() {
        mark_kind_named(trc, private, "private");
    }
}

/// Which contiguous value region of an object a value-array range refers to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SlotRegion {
    Fixed,
    Dynamic,
    Elements,
}

pub struct JSObject {
    pub(crate) header: CellHeader,
    pub(crate) type_: TypeObjectId,
    pub(crate) shape: ShapeId,
    pub(crate) fixed: Box<[Value]>,
    pub(crate) dynamic: Option<Vec<Value>>,
    pub(crate) slot_span: u32,
    pub(crate) elements: Vec<Value>,
    pub(crate) private: Option<ThingRef>,
}

impl JSObject {
    pub fn header(&self) -> &CellHeader {
        &self.header
    }

    pub fn type_object(&self) -> TypeObjectId {
        self.type_
    }

    pub fn last_property(&self) -> ShapeId {
        self.shape
    }

    pub fn num_fixed_slots(&self) -> usize {
        self.fixed.len()
    }

    pub fn slot_span(&self) -> usize {
        self.slot_span as usize
    }

    pub fn has_dynamic_slots(&self) -> bool {
        self.dynamic.is_some()
    }

    /// Slot `i` of the native slot span, fixed slots first.
    pub fn native_get_slot(&self, i: usize) -> Value {
        assert!(i < self.slot_span(), "slot {} out of span {}", i, self.slot_span);
        let nfixed = self.num_fixed_slots();
        if i < nfixed {
            self.fixed[i]
        } else {
            self.dynamic.as_ref().map(|d| d[i - nfixed]).unwrap_or_default()
        }
    }

    /// Used part of the inline slots.
    pub fn fixed_slots(&self) -> &[Value] {
        let n = self.slot_span().min(self.num_fixed_slots());
        &self.fixed[..n]
    }

    /// Used part of the out-of-line slots.
    pub fn dynamic_slots(&self) -> &[Value] {
        match &self.dynamic {
            Some(d) => {
                let n = self.slot_span().saturating_sub(self.num_fixed_slots());
                &d[..n.min(d.len())]
            }
            None => &[],
        }
    }

    /// Initialized dense elements.
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn private(&self) -> Option<ThingRef> {
        self.private
    }

    pub fn region(&self, region: SlotRegion) -> &[Value] {
        match region {
            SlotRegion::Fixed => self.fixed_slots(),
            SlotRegion::Dynamic => self.dynamic_slots(),
            SlotRegion::Elements => self.elements(),
        }
    }

    pub(crate) fn set_slot(&mut self, i: usize, value: Value) {
        let nfixed = self.num_fixed_slots();
        if i < nfixed {
            self.fixed[i] = value;
        } else {
            let dynamic = self.dynamic.get_or_insert_with(Vec::new);
            let index = i - nfixed;
            if dynamic.len() <= index {
                dynamic.resize(index + 1, Value::Undefined);
            }
            dynamic[index] = value;
        }
        if i >= self.slot_span() {
            self.slot_span = i as u32 + 1;
        }
    }
}

impl fmt::Debug for JSObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JSObject")
            .field("header", &self.header)
            .field("type", &self.type_)
            .field("shape", &self.shape)
            .field("slot_span", &self.slot_span)
            .field("elements", &self.elements.len())
            .finish()
    }
}
