//! End-to-end pipeline scenarios over an in-memory database.

use pravah_core::{
    pipeline,
    privacy::PrivacyPolicy,
    store::{CountRow, PincodeMetadataRow, ZoneStore},
};

fn fresh_store() -> ZoneStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = ZoneStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn meta(pincode: &str, district: &str, state: &str) -> PincodeMetadataRow {
    PincodeMetadataRow {
        pincode: pincode.into(),
        district: district.into(),
        state: state.into(),
        ..Default::default()
    }
}

fn counts(pincode: &str, district: &str, state: &str, total: i64) -> CountRow {
    CountRow {
        record_date: "2023-06-01".into(),
        state: state.into(),
        district: district.into(),
        pincode: pincode.into(),
        age_0_5: 0,
        age_5_17: 0,
        age_17_plus: total,
        total,
    }
}

/// Three cells, minimum cell size 10: the 5-person cell is suppressed,
/// the other two come out scored.
#[test]
fn three_cell_scenario() {
    let mut store = fresh_store();
    for (pin, bio, demo, enrol) in [
        ("110001", 12, 10, 0),
        ("110002", 5, 5, 5),
        ("110003", 100, 60, 80),
    ] {
        store
            .insert_pincode_metadata(&meta(pin, "New Delhi", "Delhi"))
            .unwrap();
        if bio > 0 {
            store
                .insert_biometric(&counts(pin, "New Delhi", "Delhi", bio))
                .unwrap();
        }
        if demo > 0 {
            store
                .insert_demographic(&counts(pin, "New Delhi", "Delhi", demo))
                .unwrap();
        }
        if enrol > 0 {
            store
                .insert_enrolment(&counts(pin, "New Delhi", "Delhi", enrol))
                .unwrap();
        }
    }

    let summary = pipeline::run(&mut store, PrivacyPolicy::new(10), 42).unwrap();
    assert_eq!(summary.cells_scored, 3);
    assert_eq!(summary.cells_suppressed, 1);

    let zones = store.all_risk_zones().unwrap();
    assert_eq!(zones.len(), 3);

    let z1 = zones.iter().find(|z| z.pincode == "110001").unwrap();
    let z2 = zones.iter().find(|z| z.pincode == "110002").unwrap();
    let z3 = zones.iter().find(|z| z.pincode == "110003").unwrap();

    assert!(!z1.is_suppressed, "population 12 must be released");
    assert!(z1.risk_score.is_some());
    assert!(z2.is_suppressed, "population 5 < 10 must be suppressed");
    assert!(z2.risk_score.is_none());
    assert!(!z3.is_suppressed, "population 100 must be released");
    assert!(z3.risk_score.is_some());
}

/// Metadata cells with no counts anywhere have population 0 and emit no
/// record at all.
#[test]
fn zero_population_cells_emit_no_record() {
    let mut store = fresh_store();
    store
        .insert_pincode_metadata(&meta("110001", "New Delhi", "Delhi"))
        .unwrap();
    store
        .insert_pincode_metadata(&meta("560001", "Bengaluru", "Karnataka"))
        .unwrap();
    store
        .insert_biometric(&counts("560001", "Bengaluru", "Karnataka", 50))
        .unwrap();

    let summary = pipeline::run(&mut store, PrivacyPolicy::new(10), 7).unwrap();
    assert_eq!(summary.cells_seen, 2);
    assert_eq!(summary.cells_scored, 1);

    let zones = store.all_risk_zones().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].pincode, "560001");
}

/// The metadata table is the authoritative cell set: a pincode with counts
/// but no metadata is never scored.
#[test]
fn counts_without_metadata_are_ignored() {
    let mut store = fresh_store();
    store
        .insert_pincode_metadata(&meta("110001", "New Delhi", "Delhi"))
        .unwrap();
    store
        .insert_biometric(&counts("110001", "New Delhi", "Delhi", 40))
        .unwrap();
    // Orphan counts: no metadata row.
    store
        .insert_biometric(&counts("999999", "Nowhere", "Nowhere", 500))
        .unwrap();

    pipeline::run(&mut store, PrivacyPolicy::new(10), 7).unwrap();

    let zones = store.all_risk_zones().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].pincode, "110001");
}

/// Re-running replaces the record set instead of accumulating rows.
#[test]
fn rerun_replaces_record_set() {
    let mut store = fresh_store();
    for pin in ["110001", "110002"] {
        store
            .insert_pincode_metadata(&meta(pin, "New Delhi", "Delhi"))
            .unwrap();
        store
            .insert_demographic(&counts(pin, "New Delhi", "Delhi", 200))
            .unwrap();
    }

    pipeline::run(&mut store, PrivacyPolicy::new(10), 1).unwrap();
    pipeline::run(&mut store, PrivacyPolicy::new(10), 1).unwrap();

    assert_eq!(store.risk_zone_count().unwrap(), 2);
    assert_eq!(store.pipeline_run_count().unwrap(), 2);
}

/// An empty batch is a warning, not an error.
#[test]
fn empty_batch_is_not_an_error() {
    let mut store = fresh_store();
    store
        .insert_pincode_metadata(&meta("110009", "New Delhi", "Delhi"))
        .unwrap();
    let summary = pipeline::run(&mut store, PrivacyPolicy::new(10), 1).unwrap();
    assert_eq!(summary.cells_seen, 1);
    assert_eq!(summary.cells_scored, 0);
    assert_eq!(store.risk_zone_count().unwrap(), 0);
}
