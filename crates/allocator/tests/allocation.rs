//! End-to-end allocation properties against a redb-backed counter store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;

use exam_registry_allocator::Allocator;
use exam_registry_storage::{CounterStore, RedbCounterStore, StorageEngine};
use exam_registry_test_utils::TestDir;
use exam_registry_types::config::{StorageConfig, ADVANCED_SECTION, PRIMARY_SECTION};
use exam_registry_types::{RegistrationNumber, RegistryError, SectionKey, SequencePolicy};

fn in_memory_allocator() -> Allocator<RedbCounterStore> {
    let engine = StorageEngine::open_in_memory().expect("open in-memory engine");
    Allocator::new(Arc::new(SequencePolicy::default()), engine.counters())
}

#[test]
fn test_concurrent_allocations_are_distinct_and_contiguous() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let policy = Arc::new(SequencePolicy::default());
    let section = SectionKey::new(PRIMARY_SECTION);
    let workers = 16;
    let per_worker = 40;

    // Each worker builds its own allocator over the shared database, the way
    // separate request handlers would.
    let issued: Vec<RegistrationNumber> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let allocator = Allocator::new(Arc::clone(&policy), engine.counters());
                let section = section.clone();
                scope.spawn(move || {
                    (0..per_worker).map(|_| allocator.next(&section).unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let total = workers * per_worker;
    let distinct: HashSet<RegistrationNumber> = issued.iter().copied().collect();
    assert_eq!(distinct.len(), total, "every allocation must be unique");

    let expected: HashSet<RegistrationNumber> = (0..total as u32)
        .map(|offset| RegistrationNumber::new('I', 250_001 + offset))
        .collect();
    assert_eq!(distinct, expected, "allocations must be contiguous from start");
}

#[test]
fn test_section_capacity_is_exactly_ten_thousand() {
    let allocator = in_memory_allocator();
    let section = SectionKey::new(ADVANCED_SECTION);

    let mut last = None;
    for _ in 0..10_000 {
        last = Some(allocator.next(&section).expect("within capacity"));
    }
    assert_eq!(last.unwrap().to_string(), "A260000");

    let err = allocator.next(&section).expect_err("10,001st allocation must fail");
    assert!(matches!(err, RegistryError::SectionCapacityExceeded { capacity: 10_000, .. }));
    assert!(!err.is_retryable());
}

#[test]
fn test_sections_number_independently() {
    let allocator = in_memory_allocator();
    let primary = SectionKey::new(PRIMARY_SECTION);
    let advanced = SectionKey::new(ADVANCED_SECTION);

    assert_eq!(allocator.next(&primary).unwrap().to_string(), "I250001");
    assert_eq!(allocator.next(&advanced).unwrap().to_string(), "A250001");
    assert_eq!(allocator.next(&primary).unwrap().to_string(), "I250002");
}

#[test]
fn test_numbering_continues_after_reopen() {
    let dir = TestDir::new();
    let config = StorageConfig::builder().path(dir.db_path()).build().unwrap();
    let section = SectionKey::new(ADVANCED_SECTION);
    let policy = Arc::new(SequencePolicy::default());

    {
        let engine = StorageEngine::open(&config).unwrap();
        let allocator = Allocator::new(Arc::clone(&policy), engine.counters());
        allocator.next(&section).unwrap();
        allocator.next(&section).unwrap();
    }

    let engine = StorageEngine::open(&config).unwrap();
    assert_eq!(engine.counters().read(&section).unwrap(), Some(2));
    let allocator = Allocator::new(policy, engine.counters());
    assert_eq!(allocator.next(&section).unwrap().to_string(), "A250003");
}
