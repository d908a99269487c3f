//! Thing storage.
//!
//! The heap stands in for the allocator: it hands out typed ids, owns every
//! thing, and resets mark bits between cycles. Marking only ever reads it; mark
//! bits live in `Cell`s inside each thing's header.

use std::collections::{BTreeSet, HashMap};

use super::object::{Class, JSObject};
use super::runtime::{CompartmentId, Runtime};
use super::script::{DebugScript, Script};
use super::shape::{BaseShape, Shape};
use super::string::{JSString, StringData};
use super::thing::*;
use super::types::{NewScript, TypeObject, TypeProperty};
use super::value::{PropertyId, Value};
use super::xml::{XmlNode, XmlNodeKind};

/// Fields of a type object known at creation.
pub struct TypeObjectInit {
    pub compartment: CompartmentId,
    pub properties: Vec<Option<PropertyId>>,
    pub proto: Option<ObjectId>,
    pub interpreted_function: Option<ObjectId>,
    pub new_script: Option<NewScript>,
}

impl TypeObjectInit {
    pub fn new(compartment: CompartmentId) -> Self {
        Self {
            compartment,
            properties: Vec::new(),
            proto: None,
            interpreted_function: None,
            new_script: None,
        }
    }
}

pub struct BaseShapeInit {
    pub compartment: CompartmentId,
    pub clasp: Option<&'static Class>,
    pub getter: Option<ObjectId>,
    pub setter: Option<ObjectId>,
    pub parent: Option<ObjectId>,
}

impl BaseShapeInit {
    pub fn new(compartment: CompartmentId) -> Self {
        Self {
            compartment,
            clasp: None,
            getter: None,
            setter: None,
            parent: None,
        }
    }
}

pub struct ScriptInit<'a> {
    pub compartment: CompartmentId,
    pub atoms: Vec<Option<StringId>>,
    pub objects: Option<Vec<Option<ObjectId>>>,
    pub regexps: Option<Vec<Option<ObjectId>>>,
    pub consts: Option<Vec<Value>>,
    pub function: Option<ObjectId>,
    pub global: Option<ObjectId>,
    pub is_cached_eval: bool,
    pub filename: Option<&'a str>,
    pub bindings: Option<ShapeId>,
    pub debug: Option<DebugScript>,
}

impl ScriptInit<'_> {
    pub fn new(compartment: CompartmentId) -> Self {
        Self {
            compartment,
            atoms: Vec::new(),
            objects: None,
            regexps: None,
            consts: None,
            function: None,
            global: None,
            is_cached_eval: false,
            filename: None,
            bindings: None,
            debug: None,
        }
    }
}

pub struct Heap {
    runtime: Runtime,
    objects: Vec<JSObject>,
    strings: Vec<JSString>,
    scripts: Vec<Script>,
    shapes: Vec<Shape>,
    base_shapes: Vec<BaseShape>,
    types: Vec<TypeObject>,
    xml: Vec<XmlNode>,
    atoms: HashMap<Box<str>, StringId>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            runtime: Runtime::new(),
            objects: Vec::new(),
            strings: Vec::new(),
            scripts: Vec::new(),
            shapes: Vec::new(),
            base_shapes: Vec::new(),
            types: Vec::new(),
            xml: Vec::new(),
            atoms: HashMap::new(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn new_compartment(&mut self, name: &str) -> CompartmentId {
        self.runtime.new_compartment(name)
    }

    pub fn atoms_compartment(&self) -> CompartmentId {
        self.runtime.atoms_compartment()
    }

    /* Allocation */

    pub fn new_string(&mut self, compartment: CompartmentId, chars: &str) -> StringId {
        self.push_string(compartment, StringData::Linear(chars.into()))
    }

    /// Returns the atom for `chars`, allocating it in the atoms compartment on
    /// first use.
    pub fn atomize(&mut self, chars: &str) -> StringId {
        if let Some(&atom) = self.atoms.get(chars) {
            return atom;
        }
        let atoms = self.atoms_compartment();
        let atom = self.push_string(atoms, StringData::Linear(chars.into()));
        self.atoms.insert(chars.into(), atom);
        atom
    }

    /// Creates a string sharing `base`'s characters in `[start, start + length)`.
    /// The base must be linear.
    pub fn new_dependent_string(
        &mut self,
        compartment: CompartmentId,
        base: StringId,
        start: usize,
        length: usize,
    ) -> StringId {
        let chars = self.linear_chars(base);
        assert!(
            start + length <= chars.len()
                && chars.is_char_boundary(start)
                && chars.is_char_boundary(start + length),
            "dependent range {}..{} is not valid for {:?}",
            start,
            start + length,
            base
        );
        self.push_string(
            compartment,
            StringData::Dependent {
                base,
                start,
                length,
            },
        )
    }

    pub fn concat(&mut self, compartment: CompartmentId, left: StringId, right: StringId) -> StringId {
        let length = self.string(left).len() + self.string(right).len();
        self.push_string(
            compartment,
            StringData::Rope {
                left,
                right,
                length,
            },
        )
    }

    fn push_string(&mut self, compartment: CompartmentId, data: StringData) -> StringId {
        let id = StringId(self.strings.len() as u32);
        self.strings.push(JSString {
            header: CellHeader::new(compartment),
            data,
        });
        id
    }

    pub fn new_base_shape(&mut self, init: BaseShapeInit) -> BaseShapeId {
        let id = BaseShapeId(self.base_shapes.len() as u32);
        self.base_shapes.push(BaseShape {
            header: CellHeader::new(init.compartment),
            clasp: init.clasp,
            getter: init.getter,
            setter: init.setter,
            parent: init.parent,
            unowned: None,
        });
        id
    }

    /// Creates an owned copy of the unowned base shape `unowned`.
    pub fn new_owned_base_shape(&mut self, unowned: BaseShapeId) -> BaseShapeId {
        let base = self.base_shape(unowned);
        assert!(!base.is_owned(), "{:?} is itself owned", unowned);
        let owned = BaseShape {
            header: CellHeader::new(base.header.compartment()),
            clasp: base.clasp,
            getter: base.getter,
            setter: base.setter,
            parent: base.parent,
            unowned: Some(unowned),
        };
        let id = BaseShapeId(self.base_shapes.len() as u32);
        self.base_shapes.push(owned);
        id
    }

    pub fn new_shape(
        &mut self,
        compartment: CompartmentId,
        base: BaseShapeId,
        propid: PropertyId,
        previous: Option<ShapeId>,
    ) -> ShapeId {
        let id = ShapeId(self.shapes.len() as u32);
        self.shapes.push(Shape {
            header: CellHeader::new(compartment),
            base,
            propid,
            previous,
        });
        id
    }

    pub fn new_type_object(&mut self, init: TypeObjectInit) -> TypeObjectId {
        let id = TypeObjectId(self.types.len() as u32);
        self.types.push(TypeObject {
            header: CellHeader::new(init.compartment),
            properties: init
                .properties
                .into_iter()
                .map(|id| id.map(|id| TypeProperty { id }))
                .collect(),
            proto: init.proto,
            singleton: None,
            lazy: false,
            interpreted_function: init.interpreted_function,
            new_script: init.new_script,
        });
        id
    }

    /// Makes `ty` the singleton type of `object`. A lazy singleton has not
    /// materialised its object yet and does not keep it alive.
    pub fn set_type_singleton(&mut self, ty: TypeObjectId, object: ObjectId, lazy: bool) {
        let ty = &mut self.types[ty.index()];
        ty.singleton = Some(object);
        ty.lazy = lazy;
    }

    pub fn set_type_new_script(&mut self, ty: TypeObjectId, new_script: NewScript) {
        self.types[ty.index()].new_script = Some(new_script);
    }

    pub fn add_type_property(&mut self, ty: TypeObjectId, id: PropertyId) {
        self.types[ty.index()].properties.push(Some(TypeProperty { id }));
    }

    /// Allocates an object with `nfixed` inline slots. Slots beyond that go to
    /// an out-of-line vector created on demand.
    pub fn new_object(
        &mut self,
        compartment: CompartmentId,
        type_: TypeObjectId,
        shape: ShapeId,
        nfixed: usize,
    ) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(JSObject {
            header: CellHeader::new(compartment),
            type_,
            shape,
            fixed: vec![Value::Undefined; nfixed].into_boxed_slice(),
            dynamic: None,
            slot_span: 0,
            elements: Vec::new(),
            private: None,
        });
        id
    }

    pub fn set_slot(&mut self, obj: ObjectId, slot: usize, value: Value) {
        self.objects[obj.index()].set_slot(slot, value);
    }

    pub fn set_object_shape(&mut self, obj: ObjectId, shape: ShapeId) {
        self.objects[obj.index()].shape = shape;
    }

    pub fn push_element(&mut self, obj: ObjectId, value: Value) {
        self.objects[obj.index()].elements.push(value);
    }

    pub fn set_private(&mut self, obj: ObjectId, private: Option<ThingRef>) {
        self.objects[obj.index()].private = private;
    }

    pub fn new_script(&mut self, init: ScriptInit<'_>) -> ScriptId {
        let filename = init
            .filename
            .map(|name| self.runtime.script_filenames().intern(name));
        let id = ScriptId(self.scripts.len() as u32);
        self.scripts.push(Script {
            header: CellHeader::new(init.compartment),
            atoms: init.atoms,
            objects: init.objects,
            regexps: init.regexps,
            consts: init.consts,
            function: init.function,
            global: init.global,
            is_cached_eval: init.is_cached_eval,
            filename,
            bindings: init.bindings,
            debug: init.debug,
        });
        id
    }

    pub fn new_xml(&mut self, compartment: CompartmentId, kind: XmlNodeKind) -> XmlId {
        let id = XmlId(self.xml.len() as u32);
        self.xml.push(XmlNode {
            header: CellHeader::new(compartment),
            kind,
            object: None,
            name: None,
            value: None,
            parent: None,
            kids: Vec::new(),
            attrs: Vec::new(),
        });
        id
    }

    pub fn set_xml_name(&mut self, node: XmlId, name: Option<StringId>) {
        self.xml[node.index()].name = name;
    }

    pub fn set_xml_value(&mut self, node: XmlId, value: Option<StringId>) {
        self.xml[node.index()].value = value;
    }

    pub fn set_xml_object(&mut self, node: XmlId, object: Option<ObjectId>) {
        self.xml[node.index()].object = object;
    }

    pub fn append_xml_kid(&mut self, parent: XmlId, kid: XmlId) {
        self.xml[kid.index()].parent = Some(parent);
        self.xml[parent.index()].kids.push(kid);
    }

    pub fn append_xml_attr(&mut self, parent: XmlId, attr: XmlId) {
        self.xml[attr.index()].parent = Some(parent);
        self.xml[parent.index()].attrs.push(attr);
    }

    /* Lookup */

    pub fn object(&self, id: ObjectId) -> &JSObject {
        &self.objects[id.index()]
    }

    pub fn string(&self, id: StringId) -> &JSString {
        &self.strings[id.index()]
    }

    pub fn script(&self, id: ScriptId) -> &Script {
        &self.scripts[id.index()]
    }

    pub fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.index()]
    }

    pub fn base_shape(&self, id: BaseShapeId) -> &BaseShape {
        &self.base_shapes[id.index()]
    }

    pub fn type_object(&self, id: TypeObjectId) -> &TypeObject {
        &self.types[id.index()]
    }

    pub fn xml(&self, id: XmlId) -> &XmlNode {
        &self.xml[id.index()]
    }

    /// True if `thing` names a live slot of this heap.
    pub fn contains(&self, thing: ThingRef) -> bool {
        let len = match thing.kind() {
            ThingKind::Object => self.objects.len(),
            ThingKind::String => self.strings.len(),
            ThingKind::Script => self.scripts.len(),
            ThingKind::Shape => self.shapes.len(),
            ThingKind::BaseShape => self.base_shapes.len(),
            ThingKind::TypeObject => self.types.len(),
            ThingKind::Xml => self.xml.len(),
        };
        thing.index() < len
    }

    pub fn header(&self, thing: ThingRef) -> &CellHeader {
        match thing {
            ThingRef::Object(id) => &self.object(id).header,
            ThingRef::String(id) => &self.string(id).header,
            ThingRef::Script(id) => &self.script(id).header,
            ThingRef::Shape(id) => &self.shape(id).header,
            ThingRef::BaseShape(id) => &self.base_shape(id).header,
            ThingRef::TypeObject(id) => &self.type_object(id).header,
            ThingRef::Xml(id) => &self.xml(id).header,
        }
    }

    pub fn compartment_of(&self, thing: ThingRef) -> CompartmentId {
        self.header(thing).compartment()
    }

    pub fn is_marked(&self, thing: impl Into<ThingRef>) -> bool {
        self.header(thing.into()).is_marked()
    }

    pub fn mark_state(&self, thing: impl Into<ThingRef>) -> MarkState {
        self.header(thing.into()).mark_state()
    }

    pub fn object_class(&self, obj: ObjectId) -> &'static Class {
        let shape = self.shape(self.object(obj).shape);
        self.base_shape(shape.base).clasp()
    }

    pub fn things(&self) -> impl Iterator<Item = ThingRef> + '_ {
        let objects = (0..self.objects.len()).map(|i| ThingRef::Object(ObjectId(i as u32)));
        let strings = (0..self.strings.len()).map(|i| ThingRef::String(StringId(i as u32)));
        let scripts = (0..self.scripts.len()).map(|i| ThingRef::Script(ScriptId(i as u32)));
        let shapes = (0..self.shapes.len()).map(|i| ThingRef::Shape(ShapeId(i as u32)));
        let bases =
            (0..self.base_shapes.len()).map(|i| ThingRef::BaseShape(BaseShapeId(i as u32)));
        let types = (0..self.types.len()).map(|i| ThingRef::TypeObject(TypeObjectId(i as u32)));
        let xml = (0..self.xml.len()).map(|i| ThingRef::Xml(XmlId(i as u32)));
        objects
            .chain(strings)
            .chain(scripts)
            .chain(shapes)
            .chain(bases)
            .chain(types)
            .chain(xml)
    }

    pub fn thing_count(&self) -> usize {
        self.objects.len()
            + self.strings.len()
            + self.scripts.len()
            + self.shapes.len()
            + self.base_shapes.len()
            + self.types.len()
            + self.xml.len()
    }

    pub fn marked_things(&self) -> BTreeSet<ThingRef> {
        self.things()
            .filter(|&thing| self.header(thing).is_marked())
            .collect()
    }

    /// Resets every mark bit, as the sweep phase does between cycles.
    pub fn clear_marks(&self) {
        for thing in self.things() {
            self.header(thing).unmark();
        }
        self.runtime.script_filenames().clear_marks();
    }

    /* Strings */

    /// Characters of a linear string, following the dependent chain to its
    /// flat base.
    pub fn linear_chars(&self, id: StringId) -> &str {
        let mut ranges = Vec::new();
        let mut current = id;
        loop {
            match &self.string(current).data {
                StringData::Linear(chars) => {
                    let mut out: &str = chars;
                    for &(start, length) in ranges.iter().rev() {
                        out = &out[start..start + length];
                    }
                    return out;
                }
                StringData::Dependent {
                    base,
                    start,
                    length,
                } => {
                    ranges.push((*start, *length));
                    current = *base;
                }
                StringData::Rope { .. } => {
                    panic!("{:?} is a rope and has no linear characters", current)
                }
            }
        }
    }

    /// Concatenated characters of any string. Ropes are walked with an
    /// explicit stack, so arbitrarily deep concatenation chains are fine.
    pub fn flatten_string(&self, id: StringId) -> String {
        let mut out = String::with_capacity(self.string(id).len());
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            match self.string(current).data {
                StringData::Rope { left, right, .. } => {
                    pending.push(right);
                    pending.push(left);
                }
                _ => out.push_str(self.linear_chars(current)),
            }
        }
        out
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
