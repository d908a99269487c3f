use std::sync::Arc;

use super::thing::{CellHeader, ObjectId, ShapeId, StringId};
use super::value::Value;

/// Debugger state of a script: step mode counter and breakpoint sites, each
/// holding the closure to run when the trap fires.
#[derive(Default, Debug)]
pub struct DebugScript {
    pub step_mode: u32,
    pub breakpoints: Vec<BreakpointSite>,
}

#[derive(Debug)]
pub struct BreakpointSite {
    pub pc: u32,
    pub trap_closure: Value,
}

#[derive(Debug)]
pub struct Script {
    pub(crate) header: CellHeader,
    pub(crate) atoms: Vec<Option<StringId>>,
    pub(crate) objects: Option<Vec<Option<ObjectId>>>,
    pub(crate) regexps: Option<Vec<Option<ObjectId>>>,
    pub(crate) consts: Option<Vec<Value>>,
    pub(crate) function: Option<ObjectId>,
    pub(crate) global: Option<ObjectId>,
    pub(crate) is_cached_eval: bool,
    pub(crate) filename: Option<Arc<str>>,
    /// Last shape of the binding (argument/variable) lineage.
    pub(crate) bindings: Option<ShapeId>,
    pub(crate) debug: Option<DebugScript>,
}

impl Script {
    pub fn header(&self) -> &CellHeader {
        &self.header
    }

    pub fn atoms(&self) -> &[Option<StringId>] {
        &self.atoms
    }

    pub fn objects(&self) -> Option<&[Option<ObjectId>]> {
        self.objects.as_deref()
    }

    pub fn regexps(&self) -> Option<&[Option<ObjectId>]> {
        self.regexps.as_deref()
    }

    pub fn consts(&self) -> Option<&[Value]> {
        self.consts.as_deref()
    }

    pub fn function(&self) -> Option<ObjectId> {
        self.function
    }

    pub fn global_object(&self) -> Option<ObjectId> {
        self.global
    }

    pub fn is_cached_eval(&self) -> bool {
        self.is_cached_eval
    }

    pub fn filename(&self) -> Option<&Arc<str>> {
        self.filename.as_ref()
    }

    pub fn bindings(&self) -> Option<ShapeId> {
        self.bindings
    }

    pub fn has_any_breakpoints_or_step_mode(&self) -> bool {
        match &self.debug {
            Some(debug) => debug.step_mode > 0 || !debug.breakpoints.is_empty(),
            None => false,
        }
    }

    pub fn trap_closures(&self) -> impl Iterator<Item = Value> + '_ {
        self.debug
            .iter()
            .flat_map(|debug| debug.breakpoints.iter().map(|site| site.trap_closure))
    }
}
