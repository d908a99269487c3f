use rsmark::{
    base::utils::{formatted_size, read_uint_from_env},
    heap::marking::{mark_object_root, mark_string_root},
    BaseShapeInit, CompartmentId, GCMarker, Heap, MarkerConfig, ObjectId, PropertyId, ShapeId,
    ThingKind, TypeObjectId, TypeObjectInit, Value,
};

struct Layout {
    compartment: CompartmentId,
    type_: TypeObjectId,
    shape: ShapeId,
}

fn bottom_up_tree(heap: &mut Heap, layout: &Layout, depth: usize) -> ObjectId {
    let node = heap.new_object(layout.compartment, layout.type_, layout.shape, 2);
    if depth > 0 {
        let left = bottom_up_tree(heap, layout, depth - 1);
        let right = bottom_up_tree(heap, layout, depth - 1);
        heap.set_slot(node, 0, Value::Object(left));
        heap.set_slot(node, 1, Value::Object(right));
    }
    node
}

fn main() {
    env_logger::init();

    let depth = match read_uint_from_env("TREE_DEPTH") {
        Some(x) if x > 0 && x < 24 => x,
        _ => 16,
    };

    let mut heap = Heap::new();
    let compartment = heap.new_compartment("main");
    let type_ = heap.new_type_object(TypeObjectInit::new(compartment));
    let base = heap.new_base_shape(BaseShapeInit::new(compartment));
    let left = heap.atomize("left");
    let right = heap.atomize("right");
    let first = heap.new_shape(compartment, base, PropertyId::from(left), None);
    let shape = heap.new_shape(compartment, base, PropertyId::from(right), Some(first));
    let layout = Layout {
        compartment,
        type_,
        shape,
    };

    let tree = bottom_up_tree(&mut heap, &layout, depth);
    let _garbage = bottom_up_tree(&mut heap, &layout, depth / 2);

    let mut rope = heap.new_string(compartment, "a");
    for _ in 0..100_000 {
        let piece = heap.new_string(compartment, "b");
        rope = heap.concat(compartment, rope, piece);
    }

    let config = MarkerConfig::from_env();
    let mut marker = GCMarker::with_config(&heap, &config);
    mark_object_root(&mut marker, tree, "tree");
    mark_string_root(&mut marker, rope, "rope");

    let mut slices = 1;
    while !marker.drain_mark_stack(config.slice_budget()) {
        slices += 1;
    }

    let stats = marker.stats();
    println!(
        "marked {} of {} things in {} slice(s)",
        heap.marked_things().len(),
        heap.thing_count(),
        slices
    );
    for kind in ThingKind::ALL {
        println!("  {:<12} {}", kind.name(), stats.scanned(kind));
    }
    println!(
        "peak stack depth {} ({}), delayed {}",
        stats.peak_stack_depth(),
        formatted_size(stats.peak_stack_depth() * std::mem::size_of::<rsmark::MarkStackEntry>()),
        stats.delayed()
    );
    println!("rope length {}", heap.flatten_string(rope).len());
}
