use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use rsmark::heap::marking::{mark_gc_thing_root, mark_object_root, mark_string_root};
use rsmark::heap::object::{ARRAY_CLASS, FUNCTION_CLASS};
use rsmark::heap::script::{BreakpointSite, DebugScript};
use rsmark::heap::types::NewScript;
use rsmark::heap::xml::XmlNodeKind;
use rsmark::*;

/* Reference traversal */

fn children_of(heap: &Heap, thing: ThingRef) -> Vec<ThingRef> {
    let mut kids = Vec::new();
    let mut trc = CallbackTracer::new(heap, |kid: ThingRef, _: &TraceDebug| kids.push(kid));
    trace_children(&mut trc, thing);
    drop(trc);
    kids
}

fn allowed(heap: &Heap, filter: Option<CompartmentId>, thing: ThingRef) -> bool {
    match filter {
        None => true,
        Some(current) => {
            let compartment = heap.compartment_of(thing);
            compartment == current || compartment == heap.atoms_compartment()
        }
    }
}

/// Things reachable from `roots` through the generic child relation, walked
/// breadth-first with no mark bits involved.
fn reachable(heap: &Heap, roots: &[ThingRef], filter: Option<CompartmentId>) -> BTreeSet<ThingRef> {
    let mut seen = BTreeSet::new();
    let mut work = Vec::new();
    for &root in roots {
        if allowed(heap, filter, root) && seen.insert(root) {
            work.push(root);
        }
    }
    while let Some(thing) = work.pop() {
        for kid in children_of(heap, thing) {
            if allowed(heap, filter, kid) && seen.insert(kid) {
                work.push(kid);
            }
        }
    }
    seen
}

fn mark_with(
    heap: &Heap,
    roots: &[ThingRef],
    config: &MarkerConfig,
    filter: Option<CompartmentId>,
    observer: Option<Box<dyn MarkObserver>>,
) -> (BTreeSet<ThingRef>, MarkStats) {
    heap.clear_marks();
    let mut marker = GCMarker::with_config(heap, config);
    marker.set_current_compartment(filter);
    if let Some(observer) = observer {
        marker.set_observer(observer);
    }
    for &root in roots {
        mark_gc_thing_root(&mut marker, Some(root), "root");
    }
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));
    assert!(marker.is_drained());
    (heap.marked_things(), marker.stats())
}

/* Observers */

#[derive(Default)]
struct ScanCounter {
    scans: Rc<RefCell<HashMap<ThingRef, usize>>>,
}

impl MarkObserver for ScanCounter {
    fn on_scan(&mut self, thing: ThingRef) {
        *self.scans.borrow_mut().entry(thing).or_insert(0) += 1;
    }
}

/// Fails every `every`-th push.
struct FailEvery {
    every: usize,
    pushes: usize,
}

impl MarkObserver for FailEvery {
    fn should_fail_push(&mut self, _entry: &MarkStackEntry) -> bool {
        self.pushes += 1;
        self.pushes % self.every == 0
    }
}

/// Fails the push of one particular object.
struct FailObject(ObjectId);

impl MarkObserver for FailObject {
    fn should_fail_push(&mut self, entry: &MarkStackEntry) -> bool {
        *entry == MarkStackEntry::Object(self.0)
    }
}

/* Random heaps */

struct Graph {
    heap: Heap,
    compartments: Vec<CompartmentId>,
    roots: Vec<ThingRef>,
}

fn random_graph(seed: u64, size: usize) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut heap = Heap::new();
    let compartments = vec![heap.new_compartment("a"), heap.new_compartment("b")];
    let pick = |rng: &mut StdRng| compartments[rng.gen_range(0..compartments.len())];

    // Strings: atoms, flat strings, dependent strings and ropes over earlier
    // strings.
    let atoms: Vec<StringId> = (0..8).map(|i| heap.atomize(&format!("atom{}", i))).collect();
    let mut linear: Vec<(StringId, usize)> = Vec::new();
    for i in 0..size / 4 {
        let c = pick(&mut rng);
        let s = heap.new_string(c, &format!("string-{:04}", i));
        linear.push((s, 11));
    }
    for _ in 0..size / 8 {
        let (base, len) = *linear.choose(&mut rng).unwrap();
        let start = rng.gen_range(0..=len);
        let length = rng.gen_range(0..=len - start);
        let c = pick(&mut rng);
        let dep = heap.new_dependent_string(c, base, start, length);
        linear.push((dep, length));
    }
    let mut strings: Vec<StringId> = linear.iter().map(|(s, _)| *s).chain(atoms.clone()).collect();
    for _ in 0..size / 4 {
        let left = *strings.choose(&mut rng).unwrap();
        let right = *strings.choose(&mut rng).unwrap();
        let c = pick(&mut rng);
        strings.push(heap.concat(c, left, right));
    }

    // Objects are created against a bootstrap layout, then given real types
    // and shapes once those exist.
    let boot: Vec<(CompartmentId, TypeObjectId, ShapeId)> = compartments
        .iter()
        .map(|&c| {
            let ty = heap.new_type_object(TypeObjectInit::new(c));
            let base = heap.new_base_shape(BaseShapeInit::new(c));
            (c, ty, heap.new_shape(c, base, PropertyId::Void, None))
        })
        .collect();

    let mut objects = Vec::new();
    for _ in 0..size / 2 {
        let (c, ty, shape) = *boot.choose(&mut rng).unwrap();
        objects.push(heap.new_object(c, ty, shape, rng.gen_range(0..4)));
    }

    let mut bases = Vec::new();
    for _ in 0..size / 10 + 1 {
        let c = pick(&mut rng);
        let clasp = match rng.gen_range(0..6) {
            0 => Some(&ARRAY_CLASS),
            1 => Some(&FUNCTION_CLASS),
            _ => None,
        };
        let maybe_object = |rng: &mut StdRng| {
            if rng.gen_bool(0.3) {
                objects.choose(rng).copied()
            } else {
                None
            }
        };
        let unowned = heap.new_base_shape(BaseShapeInit {
            clasp,
            getter: maybe_object(&mut rng),
            setter: maybe_object(&mut rng),
            parent: maybe_object(&mut rng),
            ..BaseShapeInit::new(c)
        });
        bases.push(unowned);
        if rng.gen_bool(0.5) {
            bases.push(heap.new_owned_base_shape(unowned));
        }
    }

    let mut shapes: Vec<ShapeId> = boot.iter().map(|b| b.2).collect();
    for _ in 0..size / 2 {
        let base = *bases.choose(&mut rng).unwrap();
        let c = heap.compartment_of(base.into());
        let propid = match rng.gen_range(0..4) {
            0 => PropertyId::Int(rng.gen()),
            1 => PropertyId::String(*atoms.choose(&mut rng).unwrap()),
            2 => PropertyId::String(*strings.choose(&mut rng).unwrap()),
            _ => PropertyId::Object(*objects.choose(&mut rng).unwrap()),
        };
        let previous = if rng.gen_bool(0.8) {
            shapes.choose(&mut rng).copied()
        } else {
            None
        };
        shapes.push(heap.new_shape(c, base, propid, previous));
    }

    let mut types = Vec::new();
    for _ in 0..size / 10 + 1 {
        let c = pick(&mut rng);
        let properties = (0..rng.gen_range(0..4))
            .map(|_| match rng.gen_range(0..3) {
                0 => None,
                1 => Some(PropertyId::Int(rng.gen())),
                _ => Some(PropertyId::String(*strings.choose(&mut rng).unwrap())),
            })
            .collect();
        let new_script = if rng.gen_bool(0.2) {
            Some(NewScript {
                fun: *objects.choose(&mut rng).unwrap(),
                shape: *shapes.choose(&mut rng).unwrap(),
            })
        } else {
            None
        };
        let ty = heap.new_type_object(TypeObjectInit {
            properties,
            proto: objects.choose(&mut rng).copied().filter(|_| rng.gen_bool(0.7)),
            interpreted_function: objects.choose(&mut rng).copied().filter(|_| rng.gen_bool(0.2)),
            new_script,
            ..TypeObjectInit::new(c)
        });
        types.push(ty);
    }

    for _ in 0..size / 2 {
        let c = pick(&mut rng);
        let ty = *types.choose(&mut rng).unwrap();
        let shape = *shapes.choose(&mut rng).unwrap();
        objects.push(heap.new_object(c, ty, shape, rng.gen_range(0..4)));
    }
    for &obj in &objects[..size / 2] {
        if rng.gen_bool(0.7) {
            heap.set_object_shape(obj, *shapes.choose(&mut rng).unwrap());
        }
    }
    for &ty in &types {
        if rng.gen_bool(0.2) {
            heap.set_type_singleton(ty, *objects.choose(&mut rng).unwrap(), rng.gen_bool(0.5));
        }
    }

    let mut scripts = Vec::new();
    for i in 0..size / 20 + 1 {
        let c = pick(&mut rng);
        let filename = format!("script{}.js", i % 3);
        let debug = if rng.gen_bool(0.3) {
            Some(DebugScript {
                step_mode: rng.gen_range(0..2),
                breakpoints: vec![BreakpointSite {
                    pc: 4,
                    trap_closure: Value::Object(*objects.choose(&mut rng).unwrap()),
                }],
            })
        } else {
            None
        };
        let script = heap.new_script(ScriptInit {
            atoms: (0..3).map(|_| atoms.choose(&mut rng).copied()).collect(),
            objects: Some((0..2).map(|_| objects.choose(&mut rng).copied()).collect()),
            regexps: None,
            consts: Some(vec![Value::Double(1.5), Value::String(*strings.choose(&mut rng).unwrap())]),
            function: objects.choose(&mut rng).copied().filter(|_| rng.gen_bool(0.5)),
            global: objects.choose(&mut rng).copied(),
            is_cached_eval: rng.gen_bool(0.3),
            filename: Some(&filename),
            bindings: shapes.choose(&mut rng).copied(),
            debug,
            ..ScriptInit::new(c)
        });
        scripts.push(script);
    }

    // Slots, elements and privates.
    for &obj in &objects {
        let nslots = rng.gen_range(0..8);
        for slot in 0..nslots {
            let value = match rng.gen_range(0..5) {
                0 => Value::Int32(slot as i32),
                1 => Value::String(*strings.choose(&mut rng).unwrap()),
                2 => Value::Null,
                _ => Value::Object(*objects.choose(&mut rng).unwrap()),
            };
            heap.set_slot(obj, slot, value);
        }
        let clasp = heap.object_class(obj);
        if clasp.is(&ARRAY_CLASS) {
            for _ in 0..rng.gen_range(0..6) {
                let value = if rng.gen_bool(0.5) {
                    Value::Object(*objects.choose(&mut rng).unwrap())
                } else {
                    Value::String(*strings.choose(&mut rng).unwrap())
                };
                heap.push_element(obj, value);
            }
        } else if clasp.is(&FUNCTION_CLASS) && rng.gen_bool(0.7) {
            let private: ThingRef = scripts.choose(&mut rng).copied().unwrap().into();
            heap.set_private(obj, Some(private));
        }
    }

    let mut xml = Vec::new();
    for _ in 0..size / 20 + 1 {
        let c = pick(&mut rng);
        let node = heap.new_xml(c, XmlNodeKind::Element);
        heap.set_xml_name(node, atoms.choose(&mut rng).copied());
        if rng.gen_bool(0.5) {
            heap.set_xml_object(node, objects.choose(&mut rng).copied());
        }
        if let Some(&parent) = xml.choose(&mut rng) {
            if rng.gen_bool(0.5) {
                heap.append_xml_kid(parent, node);
            } else {
                let attr = heap.new_xml(c, XmlNodeKind::Attribute);
                heap.set_xml_value(attr, strings.choose(&mut rng).copied());
                heap.append_xml_attr(node, attr);
                heap.append_xml_kid(parent, node);
            }
        }
        xml.push(node);
    }

    let mut roots: Vec<ThingRef> = Vec::new();
    roots.extend(objects.choose_multiple(&mut rng, 4).map(|&o| ThingRef::from(o)));
    roots.extend(strings.choose_multiple(&mut rng, 2).map(|&s| ThingRef::from(s)));
    roots.extend(scripts.choose(&mut rng).map(|&s| ThingRef::from(s)));
    roots.extend(xml.choose(&mut rng).map(|&x| ThingRef::from(x)));

    Graph {
        heap,
        compartments,
        roots,
    }
}

/* Properties */

#[test]
fn test_reachability_closure() {
    for seed in 0..8 {
        let graph = random_graph(seed, 200);
        let heap = &graph.heap;
        let (marked, _) = mark_with(heap, &graph.roots, &MarkerConfig::default(), None, None);

        for &thing in &marked {
            for kid in children_of(heap, thing) {
                assert!(marked.contains(&kid), "{:?} -> {:?} left unmarked", thing, kid);
            }
        }
        assert_eq!(marked, reachable(heap, &graph.roots, None));
    }
}

#[test]
fn test_empty_dependent_chains() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let flat = heap.new_string(c, "abc");
    let tail = heap.new_dependent_string(c, flat, 3, 0);
    let empty = heap.new_dependent_string(c, tail, 0, 0);
    let rope = heap.concat(c, empty, tail);
    assert_eq!(heap.flatten_string(rope), "");

    let (marked, _) = mark_with(&heap, &[rope.into()], &MarkerConfig::default(), None, None);
    assert_eq!(marked.len(), 4);

    // Generated heaps build dependent strings on top of empty ones too.
    for seed in 0..64 {
        let graph = random_graph(1000 + seed, 80);
        let (marked, _) = mark_with(
            &graph.heap,
            &graph.roots,
            &MarkerConfig::default(),
            None,
            None,
        );
        assert_eq!(marked, reachable(&graph.heap, &graph.roots, None));
    }
}

#[test]
fn test_compartment_filtered_marking_matches_reference() {
    for seed in 0..8 {
        let graph = random_graph(100 + seed, 200);
        let heap = &graph.heap;
        for &compartment in &graph.compartments {
            let (marked, _) = mark_with(
                heap,
                &graph.roots,
                &MarkerConfig::default(),
                Some(compartment),
                None,
            );
            for &thing in &marked {
                assert!(allowed(heap, Some(compartment), thing));
            }
            assert_eq!(marked, reachable(heap, &graph.roots, Some(compartment)));
        }
    }
}

#[test]
fn test_delayed_marking_is_equivalent() {
    for seed in 0..8 {
        let graph = random_graph(200 + seed, 300);
        let heap = &graph.heap;
        let (expected, unbounded) =
            mark_with(heap, &graph.roots, &MarkerConfig::default(), None, None);
        assert_eq!(unbounded.delayed(), 0);

        let tiny = MarkerConfig {
            mark_stack_limit: 2,
            segment_size: 1,
            ..MarkerConfig::default()
        };
        let (marked, stats) = mark_with(heap, &graph.roots, &tiny, None, None);
        assert_eq!(marked, expected);
        assert!(stats.peak_stack_depth() <= 2);

        for every in [1, 2, 5] {
            let observer = FailEvery { every, pushes: 0 };
            let (marked, stats) = mark_with(
                heap,
                &graph.roots,
                &MarkerConfig::default(),
                None,
                Some(Box::new(observer)),
            );
            assert_eq!(marked, expected, "failing every {} pushes", every);
            if expected.iter().any(|t| t.kind() == ThingKind::Object) {
                assert!(stats.delayed() > 0);
            }
        }
    }
}

#[test]
fn test_forced_failure_on_one_object() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let ty = heap.new_type_object(TypeObjectInit::new(c));
    let base = heap.new_base_shape(BaseShapeInit::new(c));
    let shape = heap.new_shape(c, base, PropertyId::Void, None);
    let root = heap.new_object(c, ty, shape, 2);
    let victim = heap.new_object(c, ty, shape, 2);
    let grandchild = heap.new_object(c, ty, shape, 0);
    let text = heap.new_string(c, "text");
    heap.set_slot(victim, 0, grandchild.into());
    heap.set_slot(victim, 1, text.into());
    heap.set_slot(root, 0, Value::Int32(1));
    heap.set_slot(root, 1, victim.into());

    let roots = [ThingRef::from(victim), ThingRef::from(root)];
    let (expected, _) = mark_with(&heap, &roots, &MarkerConfig::default(), None, None);
    let (marked, stats) = mark_with(
        &heap,
        &roots,
        &MarkerConfig::default(),
        None,
        Some(Box::new(FailObject(victim))),
    );
    assert_eq!(stats.delayed(), 1);
    assert_eq!(marked, expected);
    assert!(marked.contains(&ThingRef::from(grandchild)));
    assert!(marked.contains(&ThingRef::from(text)));
}

#[test]
fn test_each_thing_scanned_once() {
    for seed in 0..4 {
        let graph = random_graph(300 + seed, 300);
        let heap = &graph.heap;
        let counter = ScanCounter::default();
        let scans = counter.scans.clone();

        let mut roots = graph.roots.clone();
        // Rooting things twice must not scan them twice.
        roots.extend(graph.roots.iter().copied());
        let (marked, stats) = mark_with(
            heap,
            &roots,
            &MarkerConfig::default(),
            None,
            Some(Box::new(counter)),
        );

        let scans = scans.borrow();
        for (thing, count) in scans.iter() {
            assert_eq!(*count, 1, "{:?} scanned {} times", thing, count);
            assert!(marked.contains(thing));
        }
        assert_eq!(stats.total_scanned(), scans.len());
    }
}

#[test]
fn test_overflow_slots_match_single_pass() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let ty = heap.new_type_object(TypeObjectInit::new(c));
    let base = heap.new_base_shape(BaseShapeInit::new(c));
    let shape = heap.new_shape(c, base, PropertyId::Void, None);
    let wide = heap.new_object(c, ty, shape, 2);
    let mut expected: BTreeSet<ThingRef> = BTreeSet::new();
    for slot in 0..12 {
        let value = if slot % 3 == 0 {
            let s = heap.new_string(c, &format!("s{}", slot));
            expected.insert(s.into());
            Value::String(s)
        } else {
            let o = heap.new_object(c, ty, shape, 1);
            let s = heap.new_string(c, &format!("inner{}", slot));
            heap.set_slot(o, 0, s.into());
            expected.insert(o.into());
            expected.insert(s.into());
            Value::Object(o)
        };
        heap.set_slot(wide, slot, value);
    }
    assert_eq!(heap.object(wide).dynamic_slots().len(), 10);
    expected.extend([
        ThingRef::from(wide),
        ThingRef::from(ty),
        ThingRef::from(base),
        ThingRef::from(shape),
    ]);

    let roots = [ThingRef::from(wide)];
    let (marked, _) = mark_with(&heap, &roots, &MarkerConfig::default(), None, None);
    assert_eq!(marked, expected);
    assert_eq!(marked, reachable(&heap, &roots, None));
}

#[test]
fn test_shape_lineage_short_circuit() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let ty = heap.new_type_object(TypeObjectInit::new(c));
    let base = heap.new_base_shape(BaseShapeInit::new(c));

    let mut shared = heap.new_shape(c, base, PropertyId::Int(0), None);
    for i in 1..50 {
        shared = heap.new_shape(c, base, PropertyId::Int(i), Some(shared));
    }
    let mut first = shared;
    let mut second = shared;
    for i in 0..5 {
        first = heap.new_shape(c, base, PropertyId::Int(100 + i), Some(first));
        second = heap.new_shape(c, base, PropertyId::Int(200 + i), Some(second));
    }
    let a = heap.new_object(c, ty, first, 0);
    let b = heap.new_object(c, ty, second, 0);

    let mut marker = GCMarker::new(&heap);
    mark_object_root(&mut marker, a, "a");
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));
    assert_eq!(marker.stats().scanned(ThingKind::Shape), 55);

    mark_object_root(&mut marker, b, "b");
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));
    assert_eq!(marker.stats().scanned(ThingKind::Shape), 60);
    assert_eq!(marker.stats().scanned(ThingKind::BaseShape), 1);
}

#[test]
fn test_deep_ropes_do_not_recurse() {
    const N: usize = 100_000;
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");

    let mut left_deep = heap.new_string(c, "a");
    let mut right_deep = heap.new_string(c, "z");
    for _ in 0..N {
        let piece = heap.new_string(c, "b");
        left_deep = heap.concat(c, left_deep, piece);
        let piece = heap.new_string(c, "y");
        right_deep = heap.concat(c, piece, right_deep);
    }
    let before = (heap.flatten_string(left_deep), heap.flatten_string(right_deep));

    let mut marker = GCMarker::new(&heap);
    mark_string_root(&mut marker, left_deep, "left deep");
    mark_string_root(&mut marker, right_deep, "right deep");
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));
    assert_eq!(marker.stack_depth(), 0);
    assert_eq!(heap.marked_things().len(), heap.thing_count());
    assert_eq!(marker.stats().scanned(ThingKind::String), heap.thing_count());

    assert_eq!(before.0.len(), N + 1);
    assert_eq!(
        (heap.flatten_string(left_deep), heap.flatten_string(right_deep)),
        before
    );
}

#[test]
fn test_compartment_filter_exempts_atoms() {
    let mut heap = Heap::new();
    let a = heap.new_compartment("a");
    let b = heap.new_compartment("b");
    let ty_a = heap.new_type_object(TypeObjectInit::new(a));
    let base_a = heap.new_base_shape(BaseShapeInit::new(a));
    let shape_a = heap.new_shape(a, base_a, PropertyId::Void, None);
    let ty_b = heap.new_type_object(TypeObjectInit::new(b));
    let base_b = heap.new_base_shape(BaseShapeInit::new(b));
    let shape_b = heap.new_shape(b, base_b, PropertyId::Void, None);

    let local = heap.new_object(a, ty_a, shape_a, 2);
    let foreign = heap.new_object(b, ty_b, shape_b, 0);
    let foreign_root = heap.new_object(b, ty_b, shape_b, 0);
    let atom = heap.atomize("shared");
    let atom_root = heap.atomize("rooted");
    heap.set_slot(local, 0, foreign.into());
    heap.set_slot(local, 1, atom.into());

    let mut marker = GCMarker::new(&heap);
    marker.set_current_compartment(Some(a));
    mark_object_root(&mut marker, local, "local");
    mark_object_root(&mut marker, foreign_root, "foreign");
    mark_string_root(&mut marker, atom_root, "atom");
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));

    assert!(heap.is_marked(local));
    assert!(heap.is_marked(atom));
    assert!(heap.is_marked(atom_root));
    assert!(!heap.is_marked(foreign));
    assert!(!heap.is_marked(foreign_root));
    assert!(!heap.is_marked(ty_b));
}

#[test]
fn test_script_side_channels() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let ty = heap.new_type_object(TypeObjectInit::new(c));
    let base = heap.new_base_shape(BaseShapeInit::new(c));
    let shape = heap.new_shape(c, base, PropertyId::Void, None);
    let global = heap.new_object(c, ty, shape, 0);
    let closure = heap.new_object(c, ty, shape, 0);

    let eval = heap.new_script(ScriptInit {
        global: Some(global),
        is_cached_eval: true,
        filename: Some("eval.js"),
        debug: Some(DebugScript {
            step_mode: 1,
            breakpoints: vec![BreakpointSite {
                pc: 0,
                trap_closure: closure.into(),
            }],
        }),
        ..ScriptInit::new(c)
    });
    heap.runtime().script_filenames().intern("dead.js");
    let idle = heap.new_script(ScriptInit {
        debug: Some(DebugScript::default()),
        ..ScriptInit::new(c)
    });
    let function = heap.new_base_shape(BaseShapeInit {
        clasp: Some(&FUNCTION_CLASS),
        ..BaseShapeInit::new(c)
    });
    let function_shape = heap.new_shape(c, function, PropertyId::Void, None);
    let fun = heap.new_object(c, ty, function_shape, 0);
    heap.set_private(fun, Some(idle.into()));

    let mut marker = GCMarker::new(&heap);
    mark_gc_thing_root(&mut marker, Some(eval.into()), "eval");
    mark_object_root(&mut marker, fun, "function");
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));

    assert!(heap.is_marked(eval));
    assert!(heap.is_marked(idle));
    assert!(heap.is_marked(closure));
    assert!(!heap.is_marked(global));

    let filenames = heap.runtime().script_filenames();
    assert!(filenames.is_marked("eval.js"));
    assert_eq!(filenames.sweep(), 1);
    assert_eq!(filenames.len(), 1);
}

#[test]
fn test_type_object_edges() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let boot_ty = heap.new_type_object(TypeObjectInit::new(c));
    let base = heap.new_base_shape(BaseShapeInit::new(c));
    let shape = heap.new_shape(c, base, PropertyId::Void, None);
    let proto = heap.new_object(c, boot_ty, shape, 0);
    let function = heap.new_object(c, boot_ty, shape, 0);
    let ctor = heap.new_object(c, boot_ty, shape, 0);
    let ctor_shape = heap.new_shape(c, base, PropertyId::Int(1), None);
    let named = heap.new_string(c, "named");
    let by_object = heap.new_object(c, boot_ty, shape, 0);

    let ty = heap.new_type_object(TypeObjectInit {
        properties: vec![Some(named.into()), Some(PropertyId::Object(by_object))],
        proto: Some(proto),
        interpreted_function: Some(function),
        new_script: Some(NewScript {
            fun: ctor,
            shape: ctor_shape,
        }),
        ..TypeObjectInit::new(c)
    });
    let lazy_ty = heap.new_type_object(TypeObjectInit::new(c));
    let instance = heap.new_object(c, ty, shape, 0);
    let lazy_singleton = heap.new_object(c, boot_ty, shape, 0);
    heap.set_type_singleton(lazy_ty, lazy_singleton, true);
    let holder = heap.new_object(c, lazy_ty, shape, 0);

    let mut marker = GCMarker::new(&heap);
    mark_object_root(&mut marker, instance, "instance");
    mark_object_root(&mut marker, holder, "holder");
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));

    for thing in [proto, function, ctor] {
        assert!(heap.is_marked(thing));
    }
    assert!(heap.is_marked(ctor_shape));
    assert!(heap.is_marked(named));
    // Object-named type properties do not keep their object alive.
    assert!(!heap.is_marked(by_object));
    assert!(!heap.is_marked(lazy_singleton));
}

#[test]
fn test_xml_tree_and_gray_marking() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let ty = heap.new_type_object(TypeObjectInit::new(c));
    let base = heap.new_base_shape(BaseShapeInit::new(c));
    let shape = heap.new_shape(c, base, PropertyId::Void, None);
    let reflector = heap.new_object(c, ty, shape, 0);

    let root = heap.new_xml(c, XmlNodeKind::Element);
    let kid = heap.new_xml(c, XmlNodeKind::Text);
    let attr = heap.new_xml(c, XmlNodeKind::Attribute);
    let name = heap.atomize("item");
    let value = heap.new_string(c, "42");
    heap.append_xml_kid(root, kid);
    heap.append_xml_attr(kid, attr);
    heap.set_xml_name(attr, Some(name));
    heap.set_xml_value(attr, Some(value));
    heap.set_xml_object(kid, Some(reflector));

    let mut marker = GCMarker::new(&heap);
    marker.set_mark_color(MarkColor::Gray);
    // Rooting a leaf reaches the whole tree through parent links.
    mark_gc_thing_root(&mut marker, Some(attr.into()), "attr");
    assert!(marker.drain_mark_stack(SliceBudget::unlimited()));

    for node in [root, kid, attr] {
        assert_eq!(heap.mark_state(node), MarkState::Gray);
    }
    assert_eq!(heap.mark_state(reflector), MarkState::Gray);
    assert_eq!(heap.mark_state(value), MarkState::Black);
    assert_eq!(heap.mark_state(name), MarkState::Black);
}

#[test]
fn test_dense_array_elements() {
    let mut heap = Heap::new();
    let c = heap.new_compartment("test");
    let ty = heap.new_type_object(TypeObjectInit::new(c));
    let plain = heap.new_base_shape(BaseShapeInit::new(c));
    let plain_shape = heap.new_shape(c, plain, PropertyId::Void, None);
    let array_base = heap.new_base_shape(BaseShapeInit {
        clasp: Some(&ARRAY_CLASS),
        ..BaseShapeInit::new(c)
    });
    let array_shape = heap.new_shape(c, array_base, PropertyId::Void, None);
    let array = heap.new_object(c, ty, array_shape, 1);
    let slot_only = heap.new_object(c, ty, plain_shape, 0);
    // Dense arrays are not native: their slots carry nothing.
    heap.set_slot(array, 0, slot_only.into());

    let mut elements = Vec::new();
    for i in 0..20 {
        let element = heap.new_object(c, ty, plain_shape, 0);
        heap.push_element(array, element.into());
        heap.push_element(array, Value::Int32(i));
        elements.push(element);
    }

    let (marked, _) = mark_with(&heap, &[array.into()], &MarkerConfig::default(), None, None);
    for element in elements {
        assert!(marked.contains(&ThingRef::from(element)));
    }
    assert!(!marked.contains(&ThingRef::from(slot_only)));
    assert_eq!(marked, reachable(&heap, &[array.into()], None));
}
