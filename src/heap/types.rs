use super::thing::{CellHeader, ObjectId, ShapeId};
use super::value::PropertyId;

/// Entry of a type object's property set.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TypeProperty {
    pub id: PropertyId,
}

/// Constructor information attached to a type: the function that creates
/// instances and the shape they start with.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NewScript {
    pub fun: ObjectId,
    pub shape: ShapeId,
}

#[derive(Debug)]
pub struct TypeObject {
    pub(crate) header: CellHeader,
    /// Property set; empty buckets are `None`.
    pub(crate) properties: Vec<Option<TypeProperty>>,
    pub(crate) proto: Option<ObjectId>,
    pub(crate) singleton: Option<ObjectId>,
    /// A lazy singleton type has not materialised its object yet.
    pub(crate) lazy: bool,
    pub(crate) interpreted_function: Option<ObjectId>,
    pub(crate) new_script: Option<NewScript>,
}

impl TypeObject {
    pub fn header(&self) -> &CellHeader {
        &self.header
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn property(&self, i: usize) -> Option<&TypeProperty> {
        self.properties.get(i).and_then(|p| p.as_ref())
    }

    pub fn proto(&self) -> Option<ObjectId> {
        self.proto
    }

    pub fn singleton(&self) -> Option<ObjectId> {
        self.singleton
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn interpreted_function(&self) -> Option<ObjectId> {
        self.interpreted_function
    }

    pub fn new_script(&self) -> Option<&NewScript> {
        self.new_script.as_ref()
    }
}
