use std::time::Duration;

use time::macros::datetime;

use super::*;
use crate::catalog::{Catalog, CatalogItem, Representation, Resource, WriteRequest};
use crate::store::{AttrValue, ContainerStore, MemStore, NodeId};
use crate::util::Error;

const BEGIN: time::OffsetDateTime = datetime!(2020-01-01 00:00:00 UTC);

fn item(path: &str, resource: &str, rep: &str) -> CatalogItem {
    CatalogItem::new(
        Catalog::new(path),
        Resource::new(resource),
        Representation::new(rep),
    )
}

fn open_session(dir: &std::path::Path, items: &[CatalogItem]) -> Session<MemStore> {
    let mut session = Session::new(WriterConfig::new(dir));
    session
        .open(
            BEGIN,
            Duration::from_secs(2000),
            Duration::from_secs(1),
            items,
        )
        .unwrap();
    session
}

fn dataset_node(store: &MemStore, catalog: &str, resource: &str, dataset: &str) -> NodeId {
    let cat = store.lookup(store.root(), catalog).unwrap();
    let res = store.lookup(cat, resource).unwrap();
    store.lookup(res, dataset).unwrap()
}

fn no_progress() -> impl FnMut(usize, usize) {
    |_, _| {}
}

#[test]
fn test_two_window_scenario() {
    // begin 2020-01-01T00:00:00Z, 1s sampling, 2000s file period: three
    // catalog items, 1000 samples at offset 0s then 1000s each.
    let dir = tempfile::tempdir().unwrap();
    let items = vec![
        item("/A", "ch1", "raw"),
        item("/A", "ch2", "raw"),
        item("/B", "ch1", "raw"),
    ];
    let mut session = open_session(dir.path(), &items);
    assert_eq!(session.total_len(), Some(2000));

    let first: Vec<f64> = (0..1000).map(|i| i as f64).collect();
    let second: Vec<f64> = (1000..2000).map(|i| i as f64).collect();

    let requests: Vec<WriteRequest> = items
        .iter()
        .map(|it| WriteRequest::new(it.clone(), first.clone()))
        .collect();
    session
        .write(Duration::ZERO, &requests, &mut no_progress(), &CancelToken::new())
        .unwrap();

    let requests: Vec<WriteRequest> = items
        .iter()
        .map(|it| WriteRequest::new(it.clone(), second.clone()))
        .collect();
    session
        .write(
            Duration::from_secs(1000),
            &requests,
            &mut no_progress(),
            &CancelToken::new(),
        )
        .unwrap();

    session.close().unwrap();
    let store = session.into_store().unwrap();

    let expected: Vec<f64> = (0..2000).map(|i| i as f64).collect();
    for (catalog, resource) in [("A", "ch1"), ("A", "ch2"), ("B", "ch1")] {
        let ds = dataset_node(&store, catalog, resource, "dataset_raw");
        assert_eq!(store.extent(ds).unwrap(), 2000);
        assert_eq!(store.read_f64(ds).unwrap(), expected.as_slice());
    }
}

#[test]
fn test_file_name_and_preamble_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path(), &[item("/A", "ch1", "raw")]);
    let path = session.path().unwrap().clone();
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "2020-01-01T00-00-00Z_1s.mat"
    );
    session.close().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.len() > 512);
    assert!(bytes.starts_with(b"MATLAB 7.3 MAT-file, Platform: PCWIN64, Created on: "));
    // Space padding up to the 12-byte marker.
    assert!(bytes[..116].iter().all(|&b| (0x20..0x7f).contains(&b)));
    assert_eq!(&bytes[116..124], &[0u8; 8]);
    assert_eq!(&bytes[124..128], &[0x00, 0x02, b'I', b'M']);
}

#[test]
fn test_chunk_plan_frozen_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = WriterConfig::new(dir.path());
    config.max_chunk_len = 100;
    let mut session: Session<MemStore> = Session::new(config);
    session
        .open(BEGIN, Duration::from_secs(2000), Duration::from_secs(1), &[item("/A", "ch", "raw")])
        .unwrap();

    // 2000 = 16 * 125; 125 exceeds the limit, so chunks are 16 long.
    let plan = session.chunk_plan().unwrap();
    assert_eq!(plan.chunk_len, 16);
    assert_eq!(plan.chunk_count, 125);

    let store = session.store().unwrap();
    let ds = dataset_node(store, "A", "ch", "dataset_raw");
    assert_eq!(store.chunk_len(ds).unwrap(), 16);
}

#[test]
fn test_open_fails_on_existing_target_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2020-01-01T00-00-00Z_1s.mat");
    std::fs::write(&path, b"precious").unwrap();

    let mut session: Session<MemStore> = Session::new(WriterConfig::new(dir.path()));
    let err = session
        .open(BEGIN, Duration::from_secs(2000), Duration::from_secs(1), &[])
        .unwrap_err();
    assert!(matches!(err, Error::TargetExists(_)));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(std::fs::read(&path).unwrap(), b"precious");
}

#[test]
fn test_capacity_failure_precedes_file_creation() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = WriterConfig::new(dir.path());
    config.max_chunk_len = 3;
    let mut session: Session<MemStore> = Session::new(config);

    // total length 7 is prime and exceeds the ceiling: no chunking exists.
    let err = session
        .open(BEGIN, Duration::from_secs(7), Duration::from_secs(1), &[])
        .unwrap_err();
    assert!(matches!(err, Error::Capacity { total_len: 7, .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_sanitizer_failure_precedes_file_creation() {
    let dir = tempfile::tempdir().unwrap();
    let bad = CatalogItem::new(
        Catalog::new("/A"),
        Resource::new("ch"),
        Representation::new("raw").with_parameter("k", "!!!"),
    );
    let mut session: Session<MemStore> = Session::new(WriterConfig::new(dir.path()));
    let err = session
        .open(BEGIN, Duration::from_secs(10), Duration::from_secs(1), &[bad])
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_misaligned_period_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut session: Session<MemStore> = Session::new(WriterConfig::new(dir.path()));
    let err = session
        .open(BEGIN, Duration::from_secs(7), Duration::from_secs(3), &[])
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_write_out_of_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let it = item("/A", "ch", "raw");
    let mut session = open_session(dir.path(), std::slice::from_ref(&it));

    let requests = vec![WriteRequest::new(it, vec![0.0; 1001])];
    let err = session
        .write(
            Duration::from_secs(1000),
            &requests,
            &mut no_progress(),
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Bounds { extent: 2000, .. }));
}

#[test]
fn test_extreme_offset_is_bounds_error() {
    // A sample offset of u64::MAX would wrap the end-of-write position;
    // it must surface as an ordinary bounds failure, not wrap around.
    let dir = tempfile::tempdir().unwrap();
    let it = item("/A", "ch", "raw");
    let mut session = open_session(dir.path(), std::slice::from_ref(&it));

    let requests = vec![WriteRequest::new(it, vec![0.0])];
    let err = session
        .write(
            Duration::new(u64::MAX, 0),
            &requests,
            &mut no_progress(),
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Bounds { offset: u64::MAX, .. }));
}

#[test]
fn test_unknown_item_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path(), &[item("/A", "ch", "raw")]);

    let stranger = WriteRequest::new(item("/Z", "ch", "raw"), vec![1.0]);
    let err = session
        .write(Duration::ZERO, &[stranger], &mut no_progress(), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_progress_reported_per_catalog_group() {
    let dir = tempfile::tempdir().unwrap();
    let items = vec![
        item("/A", "ch1", "raw"),
        item("/A", "ch2", "raw"),
        item("/B", "ch1", "raw"),
    ];
    let mut session = open_session(dir.path(), &items);

    let requests: Vec<WriteRequest> = items
        .iter()
        .map(|it| WriteRequest::new(it.clone(), vec![1.0; 10]))
        .collect();

    let mut reports = Vec::new();
    session
        .write(
            Duration::ZERO,
            &requests,
            &mut |done, total| reports.push((done, total)),
            &CancelToken::new(),
        )
        .unwrap();
    // Two catalogs in insertion order: /A completes two requests, /B one.
    assert_eq!(reports, vec![(2, 3), (3, 3)]);
}

#[test]
fn test_cancellation_aborts_without_rollback() {
    let dir = tempfile::tempdir().unwrap();
    let items = vec![item("/A", "ch", "raw"), item("/B", "ch", "raw")];
    let mut session = open_session(dir.path(), &items);

    // Cancel as soon as the first group reports, so /B is never written.
    let cancel = CancelToken::new();
    let requests: Vec<WriteRequest> = items
        .iter()
        .map(|it| WriteRequest::new(it.clone(), vec![7.0; 10]))
        .collect();
    let cancel_in_sink = cancel.clone();
    let err = session
        .write(
            Duration::ZERO,
            &requests,
            &mut move |_, _| cancel_in_sink.cancel(),
            &cancel,
        )
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let store = session.store().unwrap();
    let a = dataset_node(store, "A", "ch", "dataset_raw");
    let b = dataset_node(store, "B", "ch", "dataset_raw");
    assert_eq!(&store.read_f64(a).unwrap()[..10], &[7.0; 10]);
    assert_eq!(&store.read_f64(b).unwrap()[..10], &[0.0; 10]);
}

#[test]
fn test_lifecycle_state_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut session: Session<MemStore> = Session::new(WriterConfig::new(dir.path()));

    assert!(matches!(
        session.write(Duration::ZERO, &[], &mut no_progress(), &CancelToken::new()),
        Err(Error::State(_))
    ));
    assert!(matches!(session.close(), Err(Error::State(_))));

    session
        .open(BEGIN, Duration::from_secs(10), Duration::from_secs(1), &[item("/A", "ch", "raw")])
        .unwrap();
    assert!(matches!(
        session.open(BEGIN, Duration::from_secs(10), Duration::from_secs(1), &[]),
        Err(Error::State(_))
    ));

    session.close().unwrap();
    assert!(matches!(session.close(), Err(Error::State(_))));
}

#[test]
fn test_close_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path(), &[item("/A", "ch", "raw")]);
    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Closed);

    // The skeleton alone makes a well-formed file.
    let store = session.into_store().unwrap();
    let ds = dataset_node(&store, "A", "ch", "dataset_raw");
    assert_eq!(store.read_f64(ds).unwrap(), &vec![0.0; 2000][..]);
}

#[test]
fn test_catalog_properties_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let blob = "opaque host metadata: μV per count = 0.3";
    let it = CatalogItem::new(
        Catalog::new("/A/B").with_properties(blob),
        Resource::new("ch"),
        Representation::new("raw"),
    );
    let mut session = open_session(dir.path(), &[it]);
    session.close().unwrap();
    let store = session.into_store().unwrap();

    let group = store.lookup(store.root(), "A_B").unwrap();
    let cell = store.lookup(group, "properties").unwrap();
    assert_eq!(
        store.read_attr(cell, "MATLAB_class"),
        Some(&AttrValue::Text("cell".into()))
    );
    let target = store.deref(store.read_ref(cell).unwrap()).unwrap();
    assert_eq!(
        String::from_utf16(store.read_u16(target).unwrap()).unwrap(),
        blob
    );
}

#[test]
fn test_parameterized_dataset_names() {
    let dir = tempfile::tempdir().unwrap();
    let it = CatalogItem::new(
        Catalog::new("/A"),
        Resource::new("ch"),
        Representation::new("spectrum").with_parameter("a", "1 Hz"),
    );
    let mut session = open_session(dir.path(), std::slice::from_ref(&it));

    let requests = vec![WriteRequest::new(it, vec![5.0; 4])];
    session
        .write(Duration::ZERO, &requests, &mut no_progress(), &CancelToken::new())
        .unwrap();
    session.close().unwrap();

    let store = session.into_store().unwrap();
    let ds = dataset_node(&store, "A", "ch", "dataset_spectrum_a_1Hz");
    assert_eq!(&store.read_f64(ds).unwrap()[..4], &[5.0; 4]);
}
