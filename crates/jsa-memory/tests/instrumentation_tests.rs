//! Tests for vector lifecycle instrumentation and its histograms.

use jsa_memory::instrumentation::{CapacityChangeDumpOptions, MaxSizeDumpOptions};
use jsa_memory::{
    BumpVector, CapacityChangeHistogram, InstrumentedVector, LinearArena, RawBumpVector, Vector,
    VectorEvent, VectorInstrumentation,
};
use smallvec::SmallVec;

fn events(log: &VectorInstrumentation) -> Vec<(u64, &'static str, VectorEvent, usize, usize)> {
    log.entries()
        .into_iter()
        .map(|e| (e.instance_id, e.owner, e.event, e.size, e.capacity))
        .collect()
}

fn heap_vector<'s>(
    owner: &'static str,
    log: &'s VectorInstrumentation,
) -> InstrumentedVector<'s, Vec<u32>, VectorInstrumentation> {
    InstrumentedVector::with_sink(owner, Vec::new(), log)
}

#[test]
fn test_lifecycle_events_are_logged_in_order() {
    let arena = LinearArena::new();
    let log = VectorInstrumentation::new();
    {
        let mut v: BumpVector<'_, u32, LinearArena, VectorInstrumentation> =
            InstrumentedVector::new_in("tokens", &arena, &log);
        v.push(10);
        v.clear();
    }

    let id = log.entries()[0].instance_id;
    assert_eq!(
        events(&log),
        vec![
            (id, "tokens", VectorEvent::Create, 0, 0),
            (id, "tokens", VectorEvent::Append, 1, 4),
            (id, "tokens", VectorEvent::Clear, 0, 0),
            (id, "tokens", VectorEvent::Destroy, 0, 0),
        ]
    );
}

#[test]
fn test_storage_address_tracks_allocation() {
    let arena = LinearArena::new();
    let log = VectorInstrumentation::new();
    let mut v: BumpVector<'_, u32, LinearArena, VectorInstrumentation> =
        InstrumentedVector::new_in("tokens", &arena, &log);
    v.push(1);

    let entries = log.entries();
    assert_eq!(entries[0].storage_address, 0);
    assert_eq!(entries[1].storage_address, v.inner().as_ptr() as usize);
}

#[test]
fn test_assign_from_logs_assign_and_clear() {
    let log = VectorInstrumentation::new();
    let mut source = heap_vector("source", &log);
    let mut target = heap_vector("target", &log);
    source.push(1);
    source.push(2);
    log.clear();

    target.assign_from(&mut source);
    assert_eq!(&target[..], &[1, 2]);
    assert!(source.is_empty());

    let logged = log.entries();
    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].owner, "target");
    assert_eq!(logged[0].event, VectorEvent::Assign);
    assert_eq!(logged[0].size, 2);
    assert_eq!(logged[1].owner, "source");
    assert_eq!(logged[1].event, VectorEvent::Clear);
    assert_eq!(logged[1].size, 0);
}

#[test]
fn test_take_with_owner_logs_create_and_clear() {
    let log = VectorInstrumentation::new();
    let mut source = heap_vector("parser", &log);
    source.push(7);
    log.clear();

    let taken = InstrumentedVector::take_with_owner("checker", &mut source);
    assert_eq!(taken.owner(), "checker");
    assert_ne!(taken.instance_id(), source.instance_id());
    assert_eq!(&taken[..], &[7]);
    assert!(source.is_empty());

    let logged = log.entries();
    assert_eq!(logged.len(), 2);
    assert_eq!(
        (logged[0].owner, logged[0].event, logged[0].size),
        ("checker", VectorEvent::Create, 1)
    );
    assert_eq!(
        (logged[1].owner, logged[1].event, logged[1].size),
        ("parser", VectorEvent::Clear, 0)
    );
}

#[test]
fn test_reserve_is_not_logged() {
    let log = VectorInstrumentation::new();
    let mut v = heap_vector("v", &log);
    log.clear();
    v.reserve(16);
    assert!(log.entries().is_empty());
    assert!(v.capacity() >= 16);
}

#[test]
fn test_max_size_histogram() {
    let log = VectorInstrumentation::new();
    {
        let _empty = heap_vector("test", &log);
        let mut one_a = heap_vector("test", &log);
        let mut one_b = heap_vector("test", &log);
        let mut three = heap_vector("test", &log);
        one_a.push(1);
        one_b.push(1);
        three.push(1);
        three.push(2);
        three.push(3);
        // The maximum is over the whole lifetime, not the final size.
        three.clear();
    }

    let histogram = log.max_size_histogram_by_owner();
    let counts: Vec<(usize, usize)> = histogram["test"].iter().map(|(&k, &v)| (k, v)).collect();
    assert_eq!(counts, vec![(0, 1), (1, 2), (3, 1)]);

    let mut out = String::new();
    VectorInstrumentation::dump_max_size_histogram(
        &histogram,
        &mut out,
        &MaxSizeDumpOptions::default(),
    )
    .unwrap();
    assert_eq!(
        out,
        "Max sizes for test:\n\
         0  ( 25%) *\n\
         1  ( 50%) **\n\
         2  (  0%)\n\
         3  ( 25%) *\n"
    );
}

#[test]
fn test_max_size_histogram_collapses_empty_rows() {
    let log = VectorInstrumentation::new();
    {
        let _empty = heap_vector("test", &log);
        let mut three = heap_vector("test", &log);
        for i in 0..3 {
            three.push(i);
        }
    }

    let mut out = String::new();
    VectorInstrumentation::dump_max_size_histogram(
        &log.max_size_histogram_by_owner(),
        &mut out,
        &MaxSizeDumpOptions {
            max_adjacent_empty_rows: 0,
            ..MaxSizeDumpOptions::default()
        },
    )
    .unwrap();
    assert_eq!(
        out,
        "Max sizes for test:\n\
         0  ( 50%) *\n\
         ...\n\
         3  ( 50%) *\n"
    );
}

#[test]
fn test_max_size_histogram_separates_owners() {
    let log = VectorInstrumentation::new();
    {
        let mut a = heap_vector("a", &log);
        let _b = heap_vector("b", &log);
        a.push(1);
    }

    let mut out = String::new();
    VectorInstrumentation::dump_max_size_histogram(
        &log.max_size_histogram_by_owner(),
        &mut out,
        &MaxSizeDumpOptions::default(),
    )
    .unwrap();
    assert_eq!(
        out,
        "Max sizes for a:\n\
         0  (  0%)\n\
         1  (100%) *\n\
         \n\
         Max sizes for b:\n\
         0  (100%) *\n"
    );
}

#[test]
fn test_max_size_histogram_scales_to_line_length() {
    let log = VectorInstrumentation::new();
    {
        let mut vectors: Vec<_> = (0..100).map(|_| heap_vector("wide", &log)).collect();
        for v in &mut vectors {
            v.push(0);
        }
    }

    let mut out = String::new();
    VectorInstrumentation::dump_max_size_histogram(
        &log.max_size_histogram_by_owner(),
        &mut out,
        &MaxSizeDumpOptions {
            maximum_line_length: 20,
            ..MaxSizeDumpOptions::default()
        },
    )
    .unwrap();
    for line in out.lines() {
        assert!(line.len() <= 20, "line too long: {line:?}");
    }
    assert!(out.contains("1  (100%) ***"), "got: {out}");
}

#[test]
fn test_capacity_change_histogram_in_place_growth_is_reuse() {
    let arena = LinearArena::new();
    let log = VectorInstrumentation::new();
    {
        let mut v: BumpVector<'_, u32, LinearArena, VectorInstrumentation> =
            InstrumentedVector::new_in("test", &arena, &log);
        for i in 0..5 {
            v.push(i);
        }
        // 4 -> 8 extended the topmost allocation without moving it.
        assert_eq!(v.capacity(), 8);
    }

    let histogram = log.capacity_change_histogram_by_owner();
    assert_eq!(
        histogram["test"],
        CapacityChangeHistogram {
            appends_initial_capacity: 1,
            appends_reusing_capacity: 4,
            appends_growing_capacity: 0,
        }
    );

    let mut out = String::new();
    VectorInstrumentation::dump_capacity_change_histogram(
        &histogram,
        &mut out,
        &CapacityChangeDumpOptions::default(),
    )
    .unwrap();
    assert_eq!(
        out,
        "Capacity changes for test:\n  \
         initial 1 ( 20%) *\n  \
         reused  4 ( 80%) ****\n  \
         grown   0 (  0%)\n"
    );
}

#[test]
fn test_capacity_change_histogram_relocation_is_growth() {
    let arena = LinearArena::new();
    let log = VectorInstrumentation::new();
    {
        let mut a: BumpVector<'_, u32, LinearArena, VectorInstrumentation> =
            InstrumentedVector::new_in("a", &arena, &log);
        let mut b: BumpVector<'_, u32, LinearArena, VectorInstrumentation> =
            InstrumentedVector::new_in("b", &arena, &log);
        // Interleaved pushes: neither vector is topmost when it needs to grow.
        for i in 0..5 {
            a.push(i);
            b.push(i);
        }
        assert_eq!(&a[..], &[0, 1, 2, 3, 4]);
        assert_eq!(&b[..], &[0, 1, 2, 3, 4]);
    }

    let histogram = log.capacity_change_histogram_by_owner();
    let expected = CapacityChangeHistogram {
        appends_initial_capacity: 1,
        appends_reusing_capacity: 3,
        appends_growing_capacity: 1,
    };
    assert_eq!(histogram["a"], expected);
    assert_eq!(histogram["b"], expected);

    let mut out = String::new();
    VectorInstrumentation::dump_capacity_change_histogram(
        &histogram,
        &mut out,
        &CapacityChangeDumpOptions::default(),
    )
    .unwrap();
    assert!(
        out.contains(
            "Capacity changes for a:\n  \
             initial 1 ( 20%) *\n  \
             reused  3 ( 60%) ***\n  \
             grown   1 ( 20%) *\n"
        ),
        "got: {out}"
    );
}

#[test]
fn test_capacity_change_after_clear_counts_as_initial() {
    let arena = LinearArena::new();
    let log = VectorInstrumentation::new();
    let mut v: BumpVector<'_, u32, LinearArena, VectorInstrumentation> =
        InstrumentedVector::new_in("test", &arena, &log);
    v.push(1);
    v.clear();
    v.push(2);

    let counts = log.capacity_change_histogram_by_owner()["test"];
    assert_eq!(counts.appends_initial_capacity, 2);
    assert_eq!(counts.total(), 2);
}

#[test]
fn test_small_vector_inline_storage() {
    let log = VectorInstrumentation::new();
    let mut v: Vector<'_, u32, 4, VectorInstrumentation> =
        InstrumentedVector::with_sink("small", SmallVec::new(), &log);
    for i in 0..4 {
        v.push(i);
    }
    assert!(
        log.entries().iter().all(|e| e.storage_address == 0),
        "inline storage reports no address"
    );

    v.push(4);
    let last = log.entries().pop().unwrap();
    assert_ne!(last.storage_address, 0);
    assert_eq!(&v[..], &[0, 1, 2, 3, 4]);

    let counts = log.capacity_change_histogram_by_owner()["small"];
    assert_eq!(counts.appends_reusing_capacity, 4);
    assert_eq!(counts.appends_growing_capacity, 1);
}

#[test]
fn test_no_instrumentation_matches_instrumented_behavior() {
    let arena = LinearArena::new();
    let log = VectorInstrumentation::new();
    let mut plain: BumpVector<'_, u32> = InstrumentedVector::new("plain", RawBumpVector::new(&arena));
    let mut logged: BumpVector<'_, u32, LinearArena, VectorInstrumentation> =
        InstrumentedVector::new_in("logged", &arena, &log);
    for i in 0..50 {
        plain.push(i);
        logged.push(i);
        assert_eq!(plain.capacity(), logged.capacity());
    }
    assert_eq!(&plain[..], &logged[..]);
    assert_eq!(plain.instance_id(), 0);

    assert_eq!(log.entries().len(), 51);
}

#[test]
fn test_summary_contains_both_histograms() {
    let log = VectorInstrumentation::new();
    {
        let mut v = heap_vector("summary", &log);
        v.push(1);
    }
    let summary = log.summary();
    assert!(summary.starts_with("Max sizes for summary:\n"), "got: {summary}");
    assert!(summary.contains("\nCapacity changes for summary:\n"), "got: {summary}");
}
