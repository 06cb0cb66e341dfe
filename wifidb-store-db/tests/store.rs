// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! End-to-end tests against fixture stores written to disk.

use proptest::prelude::*;
use wifidb_store_db::{
    Bounds, ColumnMap, Error, Field, IndexLevel, Layout, MainTable, OpenMode, PlannerOptions,
    QueryPlanner, StoreDb, Value,
};
use wifidb_utils_mac::Bssid;
use wifidb_utils_test::{
    BuiltinFixture, BuiltinIndexes, CanonicalTempDir, CustomFixture, NetRecord, SqlValue, arb_bssid,
    sample_records, write_garbage,
};

fn builtin_store(dir: &CanonicalTempDir, indexes: BuiltinIndexes) -> StoreDb {
    let path = BuiltinFixture::nets()
        .records(sample_records())
        .indexes(indexes)
        .write(&dir.join("wifi.sqlite"))
        .unwrap();
    StoreDb::open(path, OpenMode::Immutable).unwrap()
}

fn bssid(text: &str) -> Bssid {
    text.parse().unwrap()
}

#[test]
fn test_geo_indexes_only() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(
        &dir,
        BuiltinIndexes {
            geo: true,
            ..BuiltinIndexes::none()
        },
    );
    let class = db.classify();
    assert_eq!(class.geo, IndexLevel::Full);
    assert_eq!(class.point, IndexLevel::None);
    assert_eq!(
        class.layout,
        Layout::Builtin {
            table: MainTable::Nets,
            geo_table: true
        }
    );

    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());
    let stmt = planner.point(bssid("00:07:26:43:97:A3")).unwrap();
    let row = db.fetch_optional(&stmt).unwrap().unwrap();
    assert_eq!(row.get_i64("BSSID"), Some(30_706_735_011));
    assert_eq!(row.get_str("ESSID"), Some("HomeNet"));
    assert_eq!(row.get_f64("latitude"), Some(55.75));
}

#[test]
fn test_classification_is_monotonic() {
    let steps = [
        BuiltinIndexes::none(),
        BuiltinIndexes {
            secondary: true,
            ..BuiltinIndexes::none()
        },
        BuiltinIndexes {
            basic: true,
            ..BuiltinIndexes::none()
        },
        BuiltinIndexes {
            basic: true,
            secondary: true,
            ..BuiltinIndexes::none()
        },
        BuiltinIndexes::all(),
    ];
    let mut previous = (IndexLevel::None, IndexLevel::None, IndexLevel::None);
    for (i, indexes) in steps.into_iter().enumerate() {
        let dir = CanonicalTempDir::new().unwrap();
        let class = builtin_store(&dir, indexes).classify();
        let current = (class.geo, class.point, class.field);
        assert!(current.0 >= previous.0, "geo regressed at step {i}");
        assert!(current.1 >= previous.1, "point regressed at step {i}");
        assert!(current.2 >= previous.2, "field regressed at step {i}");
        previous = current;
    }
    assert_eq!(previous, (IndexLevel::Full, IndexLevel::Full, IndexLevel::Full));
}

#[test]
fn test_hinted_plans_execute() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(&dir, BuiltinIndexes::all());
    let class = db.classify();
    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());

    let point = planner.point(bssid("A0:B1:C2:D3:E4:F5")).unwrap();
    assert!(db.explain(&point).unwrap().iter().any(|d| d.contains("idx_nets_BSSID")));
    assert_eq!(db.fetch_all(&point).unwrap().len(), 1);

    let pin = planner.fields(&[Field::Pin], "87654321", true).unwrap();
    let rows = db.fetch_all(&pin).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("ESSID"), Some("office"));

    let key = planner.fields(&[Field::Credential], "SECRET", false).unwrap();
    assert!(db.fetch_all(&key).unwrap().is_empty());
    let key = planner.fields(&[Field::Credential], "S3CR3T", true).unwrap();
    assert_eq!(db.fetch_all(&key).unwrap().len(), 1);

    let names = planner.names(&["HomeNet".into(), "office".into()]).unwrap();
    assert_eq!(db.fetch_all(&names).unwrap().len(), 2);

    let geo = planner.geo(&Bounds::new(40.0, 60.0, 0.0, 40.0), None).unwrap();
    assert_eq!(db.fetch_points(&geo, 0, || false).unwrap().len(), 3);
}

#[test]
fn test_point_and_field_lookup_agree() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(&dir, BuiltinIndexes::none());
    let class = db.classify();
    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());

    for record in sample_records() {
        let id = Bssid::new(record.bssid).unwrap();
        let by_point = db.fetch_optional(&planner.point(id).unwrap()).unwrap();
        let by_field = db
            .fetch_all(&planner.fields(&[Field::Identifier], &id.to_string(), false).unwrap())
            .unwrap();
        assert_eq!(by_field.len(), 1);
        assert_eq!(by_point.as_ref(), by_field.first());
    }
}

#[test]
fn test_degenerate_bounding_box() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(&dir, BuiltinIndexes::all());
    let class = db.classify();
    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());
    let stmt = planner.geo(&Bounds::point(55.75, 37.61), None).unwrap();
    let mut ids: Vec<u64> = db
        .fetch_points(&stmt, 0, || false)
        .unwrap()
        .into_iter()
        .map(|p| p.bssid)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![0x0007_2643_97A3, 0x0011_2233_4455]);
}

#[test]
fn test_like_metacharacters_are_literal() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(&dir, BuiltinIndexes::none());
    let class = db.classify();
    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());

    let rows = db
        .fetch_all(&planner.fields(&[Field::Name], "_50%", false).unwrap())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("ESSID"), Some("Cafe_50%"));

    let rows = db
        .fetch_all(&planner.fields(&[Field::Name], "o_f", false).unwrap())
        .unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_partial_identifier_fallback() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(&dir, BuiltinIndexes::none());
    let class = db.classify();
    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());
    let rows = db
        .fetch_all(&planner.identifier_fallback("c2:d3", 10).unwrap())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("ESSID"), Some("office"));
}

#[test]
fn test_store_without_geo_table() {
    let dir = CanonicalTempDir::new().unwrap();
    let path = BuiltinFixture::base()
        .without_geo_table()
        .records(sample_records())
        .write(&dir.join("base.sqlite"))
        .unwrap();
    let db = StoreDb::open(path, OpenMode::ReadOnly).unwrap();
    let class = db.classify();
    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());
    let row = db
        .fetch_optional(&planner.point(Bssid::new(1).unwrap()).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(row.get_str("ESSID"), Some("tiny"));
    assert_eq!(row.get("latitude"), Some(&Value::Null));
    assert!(planner.geo(&Bounds::point(0.0, 0.0), None).is_none());
}

fn custom_store(dir: &CanonicalTempDir) -> StoreDb {
    let text = |s: &str| SqlValue::Text(s.to_owned());
    let path = CustomFixture::new("access points")
        .column("mac", "TEXT")
        .column("ssid", "TEXT")
        .column("psk", "TEXT")
        .column("lat", "REAL")
        .column("lon", "REAL")
        .row(vec![
            text("00-07-26-43-97-a3"),
            text("HomeNet"),
            text("hunter22"),
            SqlValue::Real(55.75),
            SqlValue::Real(37.61),
        ])
        .row(vec![
            text("001122334455"),
            text("Cafe"),
            text("espresso"),
            SqlValue::Real(10.0),
            SqlValue::Real(20.0),
        ])
        .index("idx_mac", "mac")
        .index("idx_ssid", "ssid")
        .write(&dir.join("custom.sqlite"))
        .unwrap();
    StoreDb::open(path, OpenMode::ReadOnly).unwrap()
}

#[test]
fn test_custom_store_lookups() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = custom_store(&dir);
    let columns = ColumnMap::new()
        .with(Field::Identifier, "MAC")
        .with(Field::Name, "ssid")
        .with(Field::Credential, "psk")
        .with(Field::Latitude, "lat")
        .with(Field::Longitude, "lon")
        .resolve_against("access points", &db.column_names("access points").unwrap());
    assert_eq!(columns.get(Field::Identifier), Some("mac"));

    let class = db.classify_custom("access points", &columns);
    assert_eq!(class.point, IndexLevel::Basic);
    assert_eq!(class.field, IndexLevel::Basic);
    assert_eq!(class.geo, IndexLevel::None);

    let planner = QueryPlanner::new(&class, Some(&columns), PlannerOptions::default());
    let row = db
        .fetch_optional(&planner.point(bssid("00:07:26:43:97:A3")).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(row.get_str("ssid"), Some("HomeNet"));

    let rows = db
        .fetch_all(&planner.identifiers(&["00:11:22:33:44:55".into(), "30706735011".into()]).unwrap())
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = db
        .fetch_all(&planner.fields(&[Field::Credential], "PRESS", false).unwrap())
        .unwrap();
    assert_eq!(columns.project(&rows[0]).get_str("name"), Some("Cafe"));

    let points = db
        .fetch_points(&planner.geo(&Bounds::new(0.0, 60.0, 0.0, 40.0), None).unwrap(), 0, || false)
        .unwrap();
    assert_eq!(points.len(), 2);
    assert!(points.iter().any(|p| p.bssid == 0x0007_2643_97A3));
}

#[test]
fn test_tables_columns_and_recommendation() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(&dir, BuiltinIndexes::none());
    assert_eq!(db.table_names().unwrap(), vec!["geo".to_string(), "nets".to_string()]);
    assert!(db.column_names("nets").unwrap().contains(&"WiFiKey".to_string()));
    assert!(db.column_names("missing").unwrap().is_empty());
    assert_eq!(db.recommend_level("nets"), IndexLevel::None);
    assert_eq!(db.recommend_level("missing"), IndexLevel::Basic);
    db.tune(IndexLevel::Full).unwrap();
}

#[test]
fn test_cancelled_scan_discards_rows() {
    let dir = CanonicalTempDir::new().unwrap();
    let db = builtin_store(&dir, BuiltinIndexes::none());
    let class = db.classify();
    let planner = QueryPlanner::new(&class, None, PlannerOptions::default());
    let stmt = planner.identifier_fallback("0", 100).unwrap();
    let err = db.fetch_all_cancellable(&stmt, 1, || true).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(db.fetch_all_cancellable(&stmt, 1, || false).unwrap().len(), 4);
}

#[test]
fn test_garbage_file_is_corruption() {
    let dir = CanonicalTempDir::new().unwrap();
    let path = dir.join("broken.sqlite");
    write_garbage(&path).unwrap();
    let db = StoreDb::open(&path, OpenMode::ReadOnly).unwrap();
    let err = db.check_readable().unwrap_err();
    assert!(err.is_corruption(), "{err}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_display_form_finds_stored_row(value in arb_bssid()) {
        let dir = CanonicalTempDir::new().unwrap();
        let path = BuiltinFixture::nets()
            .record(NetRecord::new(value, "ap", "key", 1))
            .write(&dir.join("one.sqlite"))
            .unwrap();
        let db = StoreDb::open(path, OpenMode::Immutable).unwrap();
        let class = db.classify();
        let planner = QueryPlanner::new(&class, None, PlannerOptions::default());
        let display = Bssid::new(value).unwrap().to_string();
        let stmt = planner.fields(&[Field::Identifier], &display, true).unwrap();
        let rows = db.fetch_all(&stmt).unwrap();
        prop_assert_eq!(rows.len(), 1);
        prop_assert_eq!(rows[0].get_i64("BSSID"), Some(value as i64));
    }
}
