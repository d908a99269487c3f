use std::fmt;

use super::thing::{CellHeader, StringId};

/// String layouts.
///
/// A rope subtree only ever contains strings, and a dependent chain always
/// ends at a flat linear string.
pub enum StringData {
    /// Flat buffer.
    Linear(Box<str>),
    /// Byte range `[start, start + length)` of `base`'s characters.
    Dependent {
        base: StringId,
        start: usize,
        length: usize,
    },
    /// Lazy concatenation of two child strings.
    Rope {
        left: StringId,
        right: StringId,
        length: usize,
    },
}

pub struct JSString {
    pub(crate) header: CellHeader,
    pub(crate) data: StringData,
}

impl JSString {
    pub fn header(&self) -> &CellHeader {
        &self.header
    }

    pub fn data(&self) -> &StringData {
        &self.data
    }

    /// Linear strings have realized characters, either their own or their
    /// base's.
    pub fn is_linear(&self) -> bool {
        !self.is_rope()
    }

    pub fn is_rope(&self) -> bool {
        matches!(self.data, StringData::Rope { .. })
    }

    pub fn is_dependent(&self) -> bool {
        matches!(self.data, StringData::Dependent { .. })
    }

    pub fn dependent_base(&self) -> Option<StringId> {
        match self.data {
            StringData::Dependent { base, .. } => Some(base),
            _ => None,
        }
    }

    pub fn rope_children(&self) -> Option<(StringId, StringId)> {
        match self.data {
            StringData::Rope { left, right, .. } => Some((left, right)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            StringData::Linear(chars) => chars.len(),
            StringData::Dependent { length, .. } => *length,
            StringData::Rope { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for JSString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = match self.data {
            StringData::Linear(_) => "linear",
            StringData::Dependent { .. } => "dependent",
            StringData::Rope { .. } => "rope",
        };
        f.debug_struct("JSString")
            .field("header", &self.header)
            .field("layout", &layout)
            .field("length", &self.len())
            .finish()
    }
}
