use std::fmt;

use super::object::{Class, PLAIN_CLASS};
use super::thing::{BaseShapeId, CellHeader, ObjectId, ShapeId};
use super::value::PropertyId;

/// One step of a property lineage. Suffixes (everything reachable through
/// `previous`) are shared by many objects.
pub struct Shape {
    pub(crate) header: CellHeader,
    pub(crate) base: BaseShapeId,
    pub(crate) propid: PropertyId,
    pub(crate) previous: Option<ShapeId>,
}

impl Shape {
    pub fn header(&self) -> &CellHeader {
        &self.header
    }

    pub fn base(&self) -> BaseShapeId {
        self.base
    }

    pub fn maybe_propid(&self) -> PropertyId {
        self.propid
    }

    pub fn previous(&self) -> Option<ShapeId> {
        self.previous
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("header", &self.header)
            .field("base", &self.base)
            .field("propid", &self.propid)
            .field("previous", &self.previous)
            .finish()
    }
}

/// Metadata shared between shapes.
///
/// An owned base shape points at its canonical unowned twin; both carry the
/// same class, getter, setter and parent.
pub struct BaseShape {
    pub(crate) header: CellHeader,
    pub(crate) clasp: Option<&'static Class>,
    pub(crate) getter: Option<ObjectId>,
    pub(crate) setter: Option<ObjectId>,
    pub(crate) parent: Option<ObjectId>,
    pub(crate) unowned: Option<BaseShapeId>,
}

impl BaseShape {
    pub fn header(&self) -> &CellHeader {
        &self.header
    }

    pub fn clasp(&self) -> &'static Class {
        self.clasp.unwrap_or(&PLAIN_CLASS)
    }

    pub fn getter_object(&self) -> Option<ObjectId> {
        self.getter
    }

    pub fn setter_object(&self) -> Option<ObjectId> {
        self.setter
    }

    pub fn object_parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn is_owned(&self) -> bool {
        self.unowned.is_some()
    }

    pub fn base_unowned(&self) -> Option<BaseShapeId> {
        self.unowned
    }
}

impl fmt::Debug for BaseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseShape")
            .field("header", &self.header)
            .field("class", &self.clasp().name)
            .field("getter", &self.getter)
            .field("setter", &self.setter)
            .field("parent", &self.parent)
            .field("unowned", &self.unowned)
            .finish()
    }
}
