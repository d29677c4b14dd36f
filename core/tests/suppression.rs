//! Privacy-gate behavior: the predicate, record redaction, group
//! aggregation, and the read-path second gate.

use pravah_core::{
    pipeline, read,
    privacy::PrivacyPolicy,
    store::{CountRow, PincodeMetadataRow, ZoneStore},
};

fn fresh_store() -> ZoneStore {
    let store = ZoneStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn insert_cell(store: &ZoneStore, pincode: &str, district: &str, state: &str, demo: i64) {
    store
        .insert_pincode_metadata(&PincodeMetadataRow {
            pincode: pincode.into(),
            district: district.into(),
            state: state.into(),
            ..Default::default()
        })
        .unwrap();
    store
        .insert_demographic(&CountRow {
            record_date: "2023-06-01".into(),
            state: state.into(),
            district: district.into(),
            pincode: pincode.into(),
            age_0_5: 0,
            age_5_17: 0,
            age_17_plus: demo,
            total: demo,
        })
        .unwrap();
}

#[test]
fn should_suppress_boundary() {
    let policy = PrivacyPolicy::new(10);
    assert!(policy.should_suppress(0));
    assert!(policy.should_suppress(9));
    assert!(!policy.should_suppress(10), "count == minimum passes");
    assert!(!policy.should_suppress(11));
}

/// Suppressed records null every sensitive field, keep location fields, and
/// carry a non-empty reason.
#[test]
fn suppressed_record_shape() {
    let mut store = fresh_store();
    insert_cell(&store, "110001", "New Delhi", "Delhi", 6);
    insert_cell(&store, "110002", "New Delhi", "Delhi", 600);
    pipeline::run(&mut store, PrivacyPolicy::new(10), 3).unwrap();

    let zones = store.all_risk_zones().unwrap();
    let small = zones.iter().find(|z| z.pincode == "110001").unwrap();

    assert!(small.is_suppressed);
    assert!(small.population.is_none());
    assert!(small.calibrated_population.is_none());
    assert!(small.lower_ci.is_none());
    assert!(small.upper_ci.is_none());
    assert!(small.risk_score.is_none());
    assert!(small.migration_velocity.is_none());
    assert!(small.biometric_risk.is_none());
    assert!(small.digital_exclusion.is_none());
    assert!(small.electoral_integrity_ratio.is_none());
    let reason = small.suppression_reason.as_deref().unwrap_or("");
    assert!(!reason.is_empty(), "suppression reason must be populated");
    assert_eq!(small.district, "New Delhi");
    assert_eq!(small.state, "Delhi");
}

/// The read path applies the live threshold, not the stored flag: a record
/// released under an old threshold is gated again at read time.
#[test]
fn read_path_enforces_live_threshold() {
    let mut store = fresh_store();
    insert_cell(&store, "110001", "New Delhi", "Delhi", 30);
    insert_cell(&store, "110002", "New Delhi", "Delhi", 600);
    pipeline::run(&mut store, PrivacyPolicy::new(10), 3).unwrap();

    // Threshold raised after the run.
    let strict = PrivacyPolicy::new(50);

    let listed = read::risk_zones(&store, &strict, None, None, 100).unwrap();
    assert_eq!(listed.len(), 1, "the 30-person zone must be dropped");
    assert_eq!(listed[0].pincode, "110002");

    let detail = read::zone_by_pincode(&store, &strict, "110001")
        .unwrap()
        .expect("record exists");
    assert!(detail.is_suppressed, "detail reads come back redacted");
    assert!(detail.risk_score.is_none());
    assert!(detail.suppression_reason.is_some());
}

#[test]
fn group_aggregation_never_partially_suppresses() {
    let policy = PrivacyPolicy::new(10);
    let rows = vec![
        ("Delhi".to_string(), 6_i64),
        ("Delhi".to_string(), 8),
        ("Sikkim".to_string(), 4),
        ("Sikkim".to_string(), 3),
    ];
    let groups = policy.aggregate_groups(rows);
    assert_eq!(groups.len(), 2);

    let delhi = &groups[0];
    assert_eq!(delhi.key, "Delhi");
    assert_eq!(delhi.total, Some(14));
    assert!(!delhi.suppressed);
    assert_eq!(delhi.record_count, Some(2));

    let sikkim = &groups[1];
    assert_eq!(sikkim.key, "Sikkim");
    assert_eq!(sikkim.total, None, "7 < 10: the whole group is a stub");
    assert!(sikkim.suppressed);
    assert!(sikkim.suppression_reason.is_some());
    assert_eq!(sikkim.record_count, None);
}

#[test]
fn state_rollup_goes_through_the_gate() {
    let mut store = fresh_store();
    insert_cell(&store, "110001", "New Delhi", "Delhi", 300);
    insert_cell(&store, "110002", "New Delhi", "Delhi", 200);
    insert_cell(&store, "737101", "Gangtok", "Sikkim", 12);
    pipeline::run(&mut store, PrivacyPolicy::new(10), 9).unwrap();

    let rollup = read::state_population_rollup(&store, &PrivacyPolicy::new(100)).unwrap();
    let delhi = rollup.iter().find(|g| g.key == "Delhi").unwrap();
    let sikkim = rollup.iter().find(|g| g.key == "Sikkim").unwrap();
    assert_eq!(delhi.total, Some(500));
    assert!(sikkim.suppressed, "12 < 100 suppresses the whole state group");
    assert_eq!(sikkim.total, None);
}
