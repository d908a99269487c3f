use std::cell::Cell;
use std::fmt;

use super::runtime::CompartmentId;

/// Trace kind of a GC thing. Fixed at allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum ThingKind {
    Object,
    String,
    Script,
    Shape,
    BaseShape,
    TypeObject,
    Xml,
}

impl ThingKind {
    pub const ALL: [ThingKind; 7] = [
        ThingKind::Object,
        ThingKind::String,
        ThingKind::Script,
        ThingKind::Shape,
        ThingKind::BaseShape,
        ThingKind::TypeObject,
        ThingKind::Xml,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ThingKind::Object => "object",
            ThingKind::String => "string",
            ThingKind::Script => "script",
            ThingKind::Shape => "shape",
            ThingKind::BaseShape => "base_shape",
            ThingKind::TypeObject => "type_object",
            ThingKind::Xml => "xml",
        }
    }
}

macro_rules! thing_ids {
    ($($id:ident => $kind:ident),* $(,)?) => {
        $(
            #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $id(pub(crate) u32);

            impl $id {
                pub const KIND: ThingKind = ThingKind::$kind;

                #[inline]
                pub const fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl fmt::Debug for $id {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}#{}", ThingKind::$kind.name(), self.0)
                }
            }

            impl From<$id> for ThingRef {
                #[inline]
                fn from(id: $id) -> ThingRef {
                    ThingRef::$kind(id)
                }
            }
        )*
    };
}

thing_ids! {
    ObjectId => Object,
    StringId => String,
    ScriptId => Script,
    ShapeId => Shape,
    BaseShapeId => BaseShape,
    TypeObjectId => TypeObject,
    XmlId => Xml,
}

/// Kind-tagged reference to any GC thing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThingRef {
    Object(ObjectId),
    String(StringId),
    Script(ScriptId),
    Shape(ShapeId),
    BaseShape(BaseShapeId),
    TypeObject(TypeObjectId),
    Xml(XmlId),
}

impl ThingRef {
    pub const fn kind(self) -> ThingKind {
        match self {
            ThingRef::Object(_) => ThingKind::Object,
            ThingRef::String(_) => ThingKind::String,
            ThingRef::Script(_) => ThingKind::Script,
            ThingRef::Shape(_) => ThingKind::Shape,
            ThingRef::BaseShape(_) => ThingKind::BaseShape,
            ThingRef::TypeObject(_) => ThingKind::TypeObject,
            ThingRef::Xml(_) => ThingKind::Xml,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            ThingRef::Object(id) => id.index(),
            ThingRef::String(id) => id.index(),
            ThingRef::Script(id) => id.index(),
            ThingRef::Shape(id) => id.index(),
            ThingRef::BaseShape(id) => id.index(),
            ThingRef::TypeObject(id) => id.index(),
            ThingRef::Xml(id) => id.index(),
        }
    }
}

impl fmt::Debug for ThingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThingRef::Object(id) => id.fmt(f),
            ThingRef::String(id) => id.fmt(f),
            ThingRef::Script(id) => id.fmt(f),
            ThingRef::Shape(id) => id.fmt(f),
            ThingRef::BaseShape(id) => id.fmt(f),
            ThingRef::TypeObject(id) => id.fmt(f),
            ThingRef::Xml(id) => id.fmt(f),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MarkColor {
    Black,
    Gray,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MarkState {
    Unmarked,
    Black,
    Gray,
}

const BLACK_BIT: u8 = 1 << 0;
const GRAY_BIT: u8 = 1 << 1;

/// Header shared by every heap kind: the owning compartment and one mark bit
/// per color.
///
/// The black bit doubles as the "marked" bit. Gray is only ever set together
/// with black, so a thing moves from unmarked to marked exactly once per
/// cycle; only [`CellHeader::unmark`] (called between cycles) resets it.
pub struct CellHeader {
    compartment: CompartmentId,
    marks: Cell<u8>,
}

impl CellHeader {
    pub(crate) const fn new(compartment: CompartmentId) -> Self {
        Self {
            compartment,
            marks: Cell::new(0),
        }
    }

    #[inline]
    pub fn compartment(&self) -> CompartmentId {
        self.compartment
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.marks.get() & BLACK_BIT != 0
    }

    pub fn mark_state(&self) -> MarkState {
        let bits = self.marks.get();
        if bits & BLACK_BIT == 0 {
            MarkState::Unmarked
        } else if bits & GRAY_BIT != 0 {
            MarkState::Gray
        } else {
            MarkState::Black
        }
    }

    /// Returns true if this call moved the thing from unmarked to marked.
    #[inline]
    pub fn mark_if_unmarked(&self, color: MarkColor) -> bool {
        let bits = self.marks.get();
        if bits & BLACK_BIT != 0 {
            return false;
        }

        let new_bits = match color {
            MarkColor::Black => BLACK_BIT,
            MarkColor::Gray => BLACK_BIT | GRAY_BIT,
        };
        self.marks.set(bits | new_bits);
        true
    }

    pub(crate) fn unmark(&self) {
        self.marks.set(0);
    }
}

impl fmt::Debug for CellHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellHeader")
            .field("compartment", &self.compartment)
            .field("mark_state", &self.mark_state())
            .finish()
    }
}
