use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompartmentId(pub(crate) u32);

impl fmt::Debug for CompartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compartment#{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RuntimeId(u32);

static NEXT_RUNTIME_ID: AtomicU32 = AtomicU32::new(1);

impl RuntimeId {
    fn fresh() -> Self {
        Self(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub struct Compartment {
    id: CompartmentId,
    runtime: RuntimeId,
    name: String,
}

impl Compartment {
    pub fn id(&self) -> CompartmentId {
        self.id
    }

    pub fn runtime(&self) -> RuntimeId {
        self.runtime
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Runtime-wide table of script filenames.
///
/// Filenames are not GC things; scripts keep them alive by marking the entry
/// during a marking traversal. The table is shared by every compartment of the
/// runtime, so it sits behind a lock.
#[derive(Default)]
pub struct ScriptFilenameTable {
    entries: Mutex<HashMap<Arc<str>, bool>>,
}

impl ScriptFilenameTable {
    pub fn intern(&self, filename: &str) -> Arc<str> {
        let mut entries = self.entries.lock();
        if let Some((key, _)) = entries.get_key_value(filename) {
            return key.clone();
        }
        let key: Arc<str> = Arc::from(filename);
        entries.insert(key.clone(), false);
        key
    }

    pub fn mark(&self, filename: &str) {
        if let Some(marked) = self.entries.lock().get_mut(filename) {
            *marked = true;
        }
    }

    pub fn is_marked(&self, filename: &str) -> bool {
        self.entries.lock().get(filename).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn clear_marks(&self) {
        for marked in self.entries.lock().values_mut() {
            *marked = false;
        }
    }

    /// Drops every unmarked filename, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, marked| *marked);
        before - entries.len()
    }
}

/// Owner of the compartments of one heap. The atoms compartment is created
/// with the runtime and holds strings shared by every other compartment.
pub struct Runtime {
    id: RuntimeId,
    atoms: CompartmentId,
    compartments: Vec<Compartment>,
    script_filenames: ScriptFilenameTable,
}

impl Runtime {
    pub fn new() -> Self {
        let id = RuntimeId::fresh();
        let mut runtime = Self {
            id,
            atoms: CompartmentId(0),
            compartments: Vec::new(),
            script_filenames: ScriptFilenameTable::default(),
        };
        runtime.atoms = runtime.new_compartment("atoms");
        runtime
    }

    pub fn id(&self) -> RuntimeId {
        self.id
    }

    pub fn atoms_compartment(&self) -> CompartmentId {
        self.atoms
    }

    pub fn new_compartment(&mut self, name: &str) -> CompartmentId {
        let id = CompartmentId(self.compartments.len() as u32);
        self.compartments.push(Compartment {
            id,
            runtime: self.id,
            name: name.to_owned(),
        });
        log::trace!(target: "gc", "new compartment {:?} ({})", id, name);
        id
    }

    pub fn compartment(&self, id: CompartmentId) -> Option<&Compartment> {
        self.compartments.get(id.0 as usize)
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn script_filenames(&self) -> &ScriptFilenameTable {
        &self.script_filenames
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
