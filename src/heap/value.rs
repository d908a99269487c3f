use super::thing::{ObjectId, StringId, ThingRef};

/// A polymorphic slot value. Only strings and objects are GC things.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Int32(i32),
    Double(f64),
    String(StringId),
    Object(ObjectId),
}

impl Value {
    #[inline]
    pub fn is_markable(&self) -> bool {
        matches!(self, Value::String(_) | Value::Object(_))
    }

    #[inline]
    pub fn to_gc_thing(&self) -> Option<ThingRef> {
        match *self {
            Value::String(s) => Some(ThingRef::String(s)),
            Value::Object(o) => Some(ThingRef::Object(o)),
            _ => None,
        }
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Value {
        Value::Object(id)
    }
}

impl From<StringId> for Value {
    fn from(id: StringId) -> Value {
        Value::String(id)
    }
}

/// Property identifier. Integer and void ids carry no edge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum PropertyId {
    #[default]
    Void,
    Int(i32),
    String(StringId),
    Object(ObjectId),
}

impl PropertyId {
    #[inline]
    pub fn to_gc_thing(&self) -> Option<ThingRef> {
        match *self {
            PropertyId::String(s) => Some(ThingRef::String(s)),
            PropertyId::Object(o) => Some(ThingRef::Object(o)),
            _ => None,
        }
    }
}

impl From<StringId> for PropertyId {
    fn from(id: StringId) -> PropertyId {
        PropertyId::String(id)
    }
}
