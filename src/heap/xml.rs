use super::thing::{CellHeader, ObjectId, StringId, XmlId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum XmlNodeKind {
    List,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// E4X-style node.
#[derive(Debug)]
pub struct XmlNode {
    pub(crate) header: CellHeader,
    pub(crate) kind: XmlNodeKind,
    /// Object reflecting this node to script, if one was created.
    pub(crate) object: Option<ObjectId>,
    pub(crate) name: Option<StringId>,
    pub(crate) value: Option<StringId>,
    pub(crate) parent: Option<XmlId>,
    pub(crate) kids: Vec<XmlId>,
    pub(crate) attrs: Vec<XmlId>,
}

impl XmlNode {
    pub fn header(&self) -> &CellHeader {
        &self.header
    }

    pub fn kind(&self) -> XmlNodeKind {
        self.kind
    }

    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    pub fn name(&self) -> Option<StringId> {
        self.name
    }

    pub fn value(&self) -> Option<StringId> {
        self.value
    }

    pub fn parent(&self) -> Option<XmlId> {
        self.parent
    }

    pub fn kids(&self) -> &[XmlId] {
        &self.kids
    }

    pub fn attrs(&self) -> &[XmlId] {
        &self.attrs
    }
}
