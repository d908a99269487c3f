//! The marker.
//!
//! [`GCMarker`] owns the explicit mark stack and the delayed-marking list and
//! drives the traversal without native recursion: objects, type objects and
//! XML nodes are pushed, while strings, shapes, base shapes and scripts are
//! scanned as soon as they are marked since their scans never recurse
//! through the native stack. When the stack is full, the thing whose scan
//! could not be recorded is parked on the delayed list and its children are
//! traced once the stack drains.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use crate::traits::Tracer;
use crate::utils::stack::Stack;

use super::children::{mark_children_script, mark_children_xml, trace_children};
use super::heap::Heap;
use super::marking_context::{MarkerConfig, SliceBudget, DEFAULT_MARKER_CONFIG};
use super::object::{SlotRegion, ARRAY_CLASS};
use super::runtime::CompartmentId;
use super::thing::*;
use super::tracer::TraceContext;
use super::value::{PropertyId, Value};

/// Work item of the mark stack.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MarkStackEntry {
    Object(ObjectId),
    TypeObject(TypeObjectId),
    Xml(XmlId),
    /// Unscanned values `[start, end)` of one region of `owner`.
    ValueArray {
        owner: ObjectId,
        region: SlotRegion,
        start: u32,
        end: u32,
    },
    /// Rope set aside by a rope scan. Only ever sits above the depth the scan
    /// started at, and is gone again when the scan returns.
    Rope(StringId),
}

/// Things whose children still have to be traced because recording their
/// scan on the mark stack failed.
#[derive(Default)]
pub struct DelayedMarking {
    list: Vec<ThingRef>,
    members: HashSet<ThingRef>,
}

impl DelayedMarking {
    /// Returns false if `thing` was already delayed.
    pub fn add(&mut self, thing: ThingRef) -> bool {
        if !self.members.insert(thing) {
            return false;
        }
        self.list.push(thing);
        true
    }

    pub fn pop(&mut self) -> Option<ThingRef> {
        let thing = self.list.pop()?;
        self.members.remove(&thing);
        Some(thing)
    }

    pub fn contains(&self, thing: ThingRef) -> bool {
        self.members.contains(&thing)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.members.clear();
    }
}

#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct MarkStats {
    scanned: [usize; ThingKind::ALL.len()],
    delayed: usize,
    peak_stack_depth: usize,
    slices: usize,
}

impl MarkStats {
    pub fn scanned(&self, kind: ThingKind) -> usize {
        self.scanned[kind.index()]
    }

    pub fn total_scanned(&self) -> usize {
        self.scanned.iter().sum()
    }

    /// Number of things parked on the delayed-marking list.
    pub fn delayed(&self) -> usize {
        self.delayed
    }

    pub fn peak_stack_depth(&self) -> usize {
        self.peak_stack_depth
    }

    pub fn slices(&self) -> usize {
        self.slices
    }
}

impl fmt::Display for MarkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in ThingKind::ALL {
            write!(f, "{}: {}, ", kind.name(), self.scanned(kind))?;
        }
        write!(
            f,
            "delayed: {}, peak depth: {}, slices: {}",
            self.delayed, self.peak_stack_depth, self.slices
        )
    }
}

/// Instrumentation hook of a marker.
pub trait MarkObserver {
    /// Called once for every thing whose children are scanned.
    fn on_scan(&mut self, thing: ThingRef) {
        let _ = thing;
    }

    /// Returning true makes the push of `entry` fail as if the stack were
    /// full.
    fn should_fail_push(&mut self, entry: &MarkStackEntry) -> bool {
        let _ = entry;
        false
    }
}

/// Logs the duration of a marking phase when dropped.
struct MarkPhase {
    name: &'static str,
    start: Instant,
}

impl MarkPhase {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for MarkPhase {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        log::info!(target: "gc", "Mark {} {}ms", self.name, elapsed.as_micros() as f64 / 1000.0);
    }
}

/// What the drain loop is scanning right now.
enum ScanState {
    Object(ObjectId),
    Values {
        owner: ObjectId,
        region: SlotRegion,
        start: usize,
        end: usize,
    },
}

pub struct GCMarker<'h> {
    heap: &'h Heap,
    context: TraceContext,
    color: MarkColor,
    stack: Stack<MarkStackEntry>,
    delayed: DelayedMarking,
    stats: MarkStats,
    observer: Option<Box<dyn MarkObserver + 'h>>,
}

impl<'h> GCMarker<'h> {
    pub fn new(heap: &'h Heap) -> Self {
        Self::with_config(heap, &DEFAULT_MARKER_CONFIG)
    }

    pub fn with_config(heap: &'h Heap, config: &MarkerConfig) -> Self {
        Self {
            heap,
            context: TraceContext::new(heap),
            color: MarkColor::Black,
            stack: Stack::new(
                config.segment_size,
                config.max_cache_segments,
                config.mark_stack_limit,
            ),
            delayed: DelayedMarking::default(),
            stats: MarkStats::default(),
            observer: None,
        }
    }

    pub fn mark_color(&self) -> MarkColor {
        self.color
    }

    pub fn set_mark_color(&mut self, color: MarkColor) {
        self.color = color;
    }

    /// Restricts marking to `compartment` (plus atoms). `None` marks the whole
    /// heap.
    pub fn set_current_compartment(&mut self, compartment: Option<CompartmentId>) {
        self.context.set_current_compartment(compartment);
    }

    pub fn set_observer(&mut self, observer: Box<dyn MarkObserver + 'h>) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn MarkObserver + 'h>> {
        self.observer.take()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.size()
    }

    pub fn has_delayed_children(&self) -> bool {
        !self.delayed.is_empty()
    }

    pub fn is_delayed(&self, thing: ThingRef) -> bool {
        self.delayed.contains(thing)
    }

    /// True once there is no work left at all.
    pub fn is_drained(&self) -> bool {
        self.stack.is_empty() && self.delayed.is_empty()
    }

    pub fn stats(&self) -> MarkStats {
        let mut stats = self.stats.clone();
        stats.peak_stack_depth = self.stack.peak();
        stats
    }

    /// Drops all pending work and statistics, e.g. when a cycle is abandoned.
    pub fn reset(&mut self) {
        self.stack.clear(false);
        self.stack.reset_peak();
        self.delayed.clear();
        self.stats = MarkStats::default();
    }

    #[inline]
    fn should_mark(&self, thing: ThingRef) -> bool {
        self.context.allows(self.heap.compartment_of(thing))
    }

    #[inline]
    fn note_scan(&mut self, thing: ThingRef) {
        self.stats.scanned[thing.kind().index()] += 1;
        if let Some(observer) = &mut self.observer {
            observer.on_scan(thing);
        }
    }

    /* Push paths */

    pub(crate) fn push_thing(&mut self, thing: ThingRef) {
        match thing {
            ThingRef::Object(id) => self.push_object(id),
            ThingRef::String(id) => self.push_string(id),
            ThingRef::Script(id) => self.push_script(id),
            ThingRef::Shape(id) => self.push_shape(id),
            ThingRef::BaseShape(id) => self.push_base_shape(id),
            ThingRef::TypeObject(id) => self.push_type_object(id),
            ThingRef::Xml(id) => self.push_xml(id),
        }
    }

    /// Records `entry`, or delays the children of `owner` if the stack
    /// refuses it.
    fn push_entry(&mut self, entry: MarkStackEntry, owner: ThingRef) {
        let vetoed = match &mut self.observer {
            Some(observer) => observer.should_fail_push(&entry),
            None => false,
        };
        if vetoed || self.stack.push(entry).is_err() {
            self.delay_marking_children(owner);
        }
    }

    pub(crate) fn delay_marking_children(&mut self, thing: ThingRef) {
        debug_assert!(self.heap.is_marked(thing), "delaying unmarked {:?}", thing);
        if self.delayed.add(thing) {
            self.stats.delayed += 1;
            log::trace!(target: "gc-mark", "delayed marking children of {:?}", thing);
        }
    }

    fn push_object(&mut self, id: ObjectId) {
        if self.should_mark(id.into()) && self.heap.object(id).header().mark_if_unmarked(self.color)
        {
            self.push_entry(MarkStackEntry::Object(id), id.into());
        }
    }

    fn push_type_object(&mut self, id: TypeObjectId) {
        if self.should_mark(id.into())
            && self.heap.type_object(id).header().mark_if_unmarked(self.color)
        {
            self.push_entry(MarkStackEntry::TypeObject(id), id.into());
        }
    }

    fn push_xml(&mut self, id: XmlId) {
        if self.should_mark(id.into()) && self.heap.xml(id).header().mark_if_unmarked(self.color) {
            self.push_entry(MarkStackEntry::Xml(id), id.into());
        }
    }

    fn push_value_array(&mut self, owner: ObjectId, region: SlotRegion, start: usize, end: usize) {
        debug_assert!(start <= end);
        if start == end {
            return;
        }
        let entry = MarkStackEntry::ValueArray {
            owner,
            region,
            start: start as u32,
            end: end as u32,
        };
        self.push_entry(entry, owner.into());
    }

    /// Strings are always black: they cannot reach anything but strings.
    #[inline]
    fn mark_string_if_unmarked(&self, id: StringId) -> bool {
        self.should_mark(id.into())
            && self
                .heap
                .string(id)
                .header()
                .mark_if_unmarked(MarkColor::Black)
    }

    fn push_string(&mut self, id: StringId) {
        if self.mark_string_if_unmarked(id) {
            self.scan_string(id);
        }
    }

    fn push_script(&mut self, id: ScriptId) {
        if self.should_mark(id.into()) && self.heap.script(id).header().mark_if_unmarked(self.color)
        {
            self.note_scan(id.into());
            mark_children_script(self, id);
        }
    }

    fn push_shape(&mut self, id: ShapeId) {
        if self.should_mark(id.into()) && self.heap.shape(id).header().mark_if_unmarked(self.color) {
            self.scan_shape(id);
        }
    }

    fn push_base_shape(&mut self, id: BaseShapeId) {
        if self.should_mark(id.into())
            && self.heap.base_shape(id).header().mark_if_unmarked(self.color)
        {
            self.scan_base_shape(id);
        }
    }

    /* Scanners */

    /// Walks a marked shape and its unmarked predecessors. The walk stops at
    /// the first predecessor that was already marked: its suffix has been or
    /// will be scanned by whoever marked it.
    fn scan_shape(&mut self, shape: ShapeId) {
        let heap = self.heap;
        let mut current = shape;
        loop {
            self.note_scan(current.into());
            let shape = heap.shape(current);
            self.push_base_shape(shape.base());

            match shape.maybe_propid() {
                PropertyId::String(s) => self.push_string(s),
                PropertyId::Object(o) => self.push_object(o),
                _ => {}
            }

            match shape.previous() {
                Some(previous)
                    if self.should_mark(previous.into())
                        && heap.shape(previous).header().mark_if_unmarked(self.color) =>
                {
                    current = previous;
                }
                _ => break,
            }
        }
    }

    fn scan_base_shape(&mut self, id: BaseShapeId) {
        self.note_scan(id.into());
        let heap = self.heap;
        let base = heap.base_shape(id);

        if let Some(getter) = base.getter_object() {
            self.push_object(getter);
        }
        if let Some(setter) = base.setter_object() {
            self.push_object(setter);
        }
        if let Some(parent) = base.object_parent() {
            self.push_object(parent);
        }

        // The unowned twin has the same children as this base, so marking it
        // is enough.
        if let Some(unowned) = base.base_unowned() {
            let twin = heap.base_shape(unowned);
            debug_assert_eq!(twin.header().compartment(), base.header().compartment());
            debug_assert_eq!(twin.getter_object(), base.getter_object());
            debug_assert_eq!(twin.setter_object(), base.setter_object());
            debug_assert_eq!(twin.object_parent(), base.object_parent());
            twin.header().mark_if_unmarked(self.color);
        }
    }

    fn scan_string(&mut self, id: StringId) {
        if self.heap.string(id).is_rope() {
            self.scan_rope(id);
        } else {
            self.scan_linear_string(id);
        }
    }

    /// Marks the dependent chain of a marked linear string.
    fn scan_linear_string(&mut self, id: StringId) {
        debug_assert!(self.heap.string(id).is_linear());
        self.note_scan(id.into());

        let mut current = id;
        while let Some(base) = self.heap.string(current).dependent_base() {
            debug_assert!(self.heap.string(base).is_linear());
            if !self.mark_string_if_unmarked(base) {
                break;
            }
            self.note_scan(base.into());
            current = base;
        }
    }

    /// Depth-first walk of a marked rope using the mark stack as scratch
    /// space for right children set aside while their left sibling is
    /// walked. The stack is back at its entry depth on return.
    fn scan_rope(&mut self, rope: StringId) {
        let heap = self.heap;
        let saved_depth = self.stack.size();
        let mut rope = rope;

        loop {
            self.note_scan(rope.into());
            let (left, right) = match heap.string(rope).rope_children() {
                Some(children) => children,
                None => unreachable!("{:?} is not a rope", rope),
            };

            let mut next = None;

            if self.mark_string_if_unmarked(right) {
                if heap.string(right).is_linear() {
                    self.scan_linear_string(right);
                } else {
                    next = Some(right);
                }
            }

            if self.mark_string_if_unmarked(left) {
                if heap.string(left).is_linear() {
                    self.scan_linear_string(left);
                } else {
                    // Both children are ropes: the right one waits.
                    if let Some(right) = next {
                        self.push_entry(MarkStackEntry::Rope(right), right.into());
                    }
                    next = Some(left);
                }
            }

            if let Some(next) = next {
                rope = next;
            } else if self.stack.size() != saved_depth {
                debug_assert!(self.stack.size() > saved_depth);
                match self.stack.pop() {
                    Some(MarkStackEntry::Rope(pending)) => rope = pending,
                    entry => unreachable!("rope scan found {:?} above its frame", entry),
                }
            } else {
                break;
            }
        }

        debug_assert_eq!(self.stack.size(), saved_depth);
    }

    fn scan_type_object(&mut self, id: TypeObjectId) {
        self.note_scan(id.into());
        let heap = self.heap;
        let ty = heap.type_object(id);

        if ty.singleton().is_none() {
            for i in 0..ty.property_count() {
                if let Some(prop) = ty.property(i) {
                    if let PropertyId::String(name) = prop.id {
                        self.push_string(name);
                    }
                }
            }
        }

        if let Some(proto) = ty.proto() {
            self.push_object(proto);
        }
        if let Some(new_script) = ty.new_script() {
            self.push_object(new_script.fun);
            self.push_shape(new_script.shape);
        }
        if let Some(function) = ty.interpreted_function() {
            self.push_object(function);
        }
        if let Some(singleton) = ty.singleton() {
            if !ty.is_lazy() {
                self.push_object(singleton);
            }
        }
    }

    /// Scans `[start, end)` of a value region. Strings are scanned on the
    /// spot. The first newly marked object is returned for scanning in place,
    /// with the rest of the range pushed back.
    fn scan_value_array(
        &mut self,
        owner: ObjectId,
        region: SlotRegion,
        start: usize,
        end: usize,
    ) -> Option<ObjectId> {
        let heap = self.heap;
        let values = heap.object(owner).region(region);
        debug_assert!(end <= values.len());

        let mut i = start;
        while i < end {
            let value = values[i];
            i += 1;
            match value {
                Value::String(s) => self.push_string(s),
                Value::Object(obj) => {
                    if self.should_mark(obj.into())
                        && heap.object(obj).header().mark_if_unmarked(self.color)
                    {
                        self.push_value_array(owner, region, i, end);
                        return Some(obj);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Marks the type and shape of `obj` and runs its class hook. Returns the
    /// inline slots as the next range to scan; out-of-line slots are pushed.
    fn scan_object(&mut self, id: ObjectId) -> Option<ScanState> {
        self.note_scan(id.into());
        let heap = self.heap;
        let obj = heap.object(id);

        self.push_type_object(obj.type_object());
        self.push_shape(obj.last_property());

        let clasp = heap.object_class(id);
        if let Some(trace) = clasp.trace {
            if clasp.is(&ARRAY_CLASS) {
                debug_assert!(!clasp.native);
                return Some(ScanState::Values {
                    owner: id,
                    region: SlotRegion::Elements,
                    start: 0,
                    end: obj.elements().len(),
                });
            }
            trace(self, id);
        }

        if !clasp.native {
            return None;
        }

        if obj.has_dynamic_slots() {
            self.push_value_array(id, SlotRegion::Dynamic, 0, obj.dynamic_slots().len());
        }
        Some(ScanState::Values {
            owner: id,
            region: SlotRegion::Fixed,
            start: 0,
            end: obj.fixed_slots().len(),
        })
    }

    /// Pops one entry and scans it. Objects found along the way are scanned
    /// in place, each charged to `budget`; once it runs out the next one goes
    /// back on the stack.
    fn process_mark_stack_top(&mut self, budget: &mut SliceBudget) {
        let mut state = match self.stack.pop() {
            Some(MarkStackEntry::Object(id)) => ScanState::Object(id),
            Some(MarkStackEntry::ValueArray {
                owner,
                region,
                start,
                end,
            }) => ScanState::Values {
                owner,
                region,
                start: start as usize,
                end: end as usize,
            },
            Some(MarkStackEntry::TypeObject(id)) => {
                self.scan_type_object(id);
                return;
            }
            Some(MarkStackEntry::Xml(id)) => {
                self.note_scan(id.into());
                mark_children_xml(self, id);
                return;
            }
            Some(MarkStackEntry::Rope(id)) => {
                debug_assert!(false, "{:?} left on the stack by a rope scan", id);
                self.scan_rope(id);
                return;
            }
            None => return,
        };

        loop {
            state = match state {
                ScanState::Object(id) => match self.scan_object(id) {
                    Some(next) => next,
                    None => return,
                },
                ScanState::Values {
                    owner,
                    region,
                    start,
                    end,
                } => match self.scan_value_array(owner, region, start, end) {
                    Some(obj) => {
                        budget.step(1);
                        if budget.is_over_budget() {
                            self.push_entry(MarkStackEntry::Object(obj), obj.into());
                            return;
                        }
                        ScanState::Object(obj)
                    }
                    None => return,
                },
            };
        }
    }

    /* Driver */

    /// Traces the children of delayed things until the list is empty or the
    /// budget runs out. Returns true if the list was emptied.
    pub fn mark_delayed_children(&mut self, budget: &mut SliceBudget) -> bool {
        while let Some(thing) = self.delayed.pop() {
            log::trace!(target: "gc-mark", "marking delayed children of {:?}", thing);
            self.note_scan(thing);
            trace_children(self, thing);

            budget.step(1);
            if budget.is_over_budget() {
                return false;
            }
        }
        true
    }

    /// Processes the mark stack and the delayed list until both are empty.
    /// Returns false if `budget` ran out first; calling again resumes where
    /// this slice stopped.
    pub fn drain_mark_stack(&mut self, mut budget: SliceBudget) -> bool {
        let _phase = MarkPhase::new("slice");
        self.stats.slices += 1;

        loop {
            while !self.stack.is_empty() {
                self.process_mark_stack_top(&mut budget);
                budget.step(1);
                if budget.is_over_budget() {
                    log::debug!(target: "gc", "Mark slice over budget, {} entries left", self.stack.size());
                    return false;
                }
            }

            if !self.has_delayed_children() {
                break;
            }

            log::debug!(target: "gc", "Marking children of {} delayed things", self.delayed.len());
            if !self.mark_delayed_children(&mut budget) {
                return false;
            }
        }

        log::debug!(target: "gc", "Mark stack drained: {}", self.stats());
        true
    }
}

impl<'h> Tracer<'h> for GCMarker<'h> {
    fn heap(&self) -> &'h Heap {
        self.heap
    }

    fn context(&self) -> &TraceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut TraceContext {
        &mut self.context
    }

    fn as_marker(&mut self) -> Option<&mut GCMarker<'h>> {
        Some(self)
    }

    fn callback(&mut self, thing: ThingRef) {
        self.push_thing(thing);
    }
}
