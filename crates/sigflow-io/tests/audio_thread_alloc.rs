//! Applying staged changes on the render side must not touch the allocator.
//!
//! Own test binary so the counting allocator sees nothing but this file.

#![allow(unsafe_code)]

use sigflow_core::{Buffer, GraphConfig, InputSource, InputSpec, Inputs, Node};
use sigflow_io::engine;
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingAlloc;

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
}

fn note_allocation() {
    if COUNTING.with(Cell::get) {
        ALLOCATIONS.fetch_add(1, Ordering::SeqCst);
    }
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        note_allocation();
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        note_allocation();
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        note_allocation();
        unsafe { System.realloc(ptr, layout, new_size) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

/// Allocations made by `f` on the calling thread.
fn allocations_in<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let before = ALLOCATIONS.load(Ordering::SeqCst);
    COUNTING.with(|c| c.set(true));
    let result = f();
    COUNTING.with(|c| c.set(false));
    (result, ALLOCATIONS.load(Ordering::SeqCst) - before)
}

const THRU_INPUTS: &[InputSpec] = &[InputSpec::with_default("in", 0.25)];

/// Copies `in` to its mono output.
struct Thru;

impl Node for Thru {
    fn kind(&self) -> &'static str {
        "thru"
    }

    fn input_specs(&self) -> &'static [InputSpec] {
        THRU_INPUTS
    }

    fn process(&mut self, inputs: &Inputs<'_>, output: &mut Buffer, num_frames: usize) {
        let input = inputs.get(0);
        for (f, o) in output.channel_mut(0)[..num_frames].iter_mut().enumerate() {
            *o = input.value(f);
        }
    }
}

#[test]
fn connect_applies_without_allocating() {
    let config = GraphConfig {
        sample_rate: 48000.0,
        block_size: 16,
        output_channels: 1,
    };
    let (mut handle, mut renderer) = engine(config).unwrap();

    let mut tx = handle.transaction();
    let a = tx.add_node(Box::new(Thru));
    let b = tx.add_node(Box::new(Thru));
    let c = tx.add_node(Box::new(Thru));
    tx.connect(a, "in", InputSource::Constant(0.5));
    tx.add_output(b);
    tx.commit().unwrap();
    assert_eq!(renderer.apply_pending(), 1);
    assert_eq!(renderer.render(16).channel(0)[0], 0.25);

    // First connect registers logging callsites; it is not what is measured.
    let mut tx = handle.transaction();
    tx.connect(b, "in", InputSource::Node(c));
    tx.commit().unwrap();
    renderer.apply_pending();

    let mut tx = handle.transaction();
    tx.connect(b, "in", InputSource::Node(a));
    tx.connect(c, "in", InputSource::Node(b));
    tx.commit().unwrap();

    let (applied, allocations) = allocations_in(|| renderer.apply_pending());
    assert_eq!(applied, 1);
    assert_eq!(allocations, 0, "applying a connect allocated on the render side");

    let (_, allocations) = allocations_in(|| {
        renderer.render(16);
    });
    assert_eq!(allocations, 0);
    assert_eq!(renderer.render(16).channel(0)[0], 0.5);
    assert_eq!(handle.collect_garbage(), 3);
}
