// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Engine behaviour against fixture stores on disk.

use std::path::PathBuf;

use wifidb_engine::{
    Bounds, CancellationToken, ColumnMap, Engine, EngineConfig, EngineError, Field, IndexLevel,
    Layout, Origin, StoreHandle,
};
use wifidb_utils_test::{
    BuiltinFixture, BuiltinIndexes, CanonicalTempDir, CustomFixture, SqlValue, sample_records,
};

fn engine(dir: &CanonicalTempDir) -> Engine {
    engine_with(dir, EngineConfig::default())
}

fn engine_with(dir: &CanonicalTempDir, config: EngineConfig) -> Engine {
    Engine::new(EngineConfig {
        cache_dir: dir.join("cache"),
        ..config
    })
    .unwrap()
}

fn nets_store(dir: &CanonicalTempDir, indexes: BuiltinIndexes) -> PathBuf {
    BuiltinFixture::nets()
        .records(sample_records())
        .indexes(indexes)
        .write(&dir.join("wifi.sqlite"))
        .unwrap()
}

async fn open_nets(engine: &Engine, dir: &CanonicalTempDir, indexes: BuiltinIndexes) -> StoreHandle {
    let path = nets_store(dir, indexes);
    engine.open_store(None, Some(&path)).await.unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_lookup_with_geo_indexes_only() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(
        &engine,
        &dir,
        BuiltinIndexes {
            geo: true,
            ..BuiltinIndexes::none()
        },
    )
    .await;

    let class = engine.classify(&handle);
    assert_eq!(class.geo, IndexLevel::Full);
    assert_eq!(class.point, IndexLevel::None);
    assert_eq!(handle.origin(), Origin::Direct);

    let row = engine
        .lookup(&handle, "00:07:26:43:97:A3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get_str("BSSID"), Some("00:07:26:43:97:A3"));
    assert_eq!(row.get_str("ESSID"), Some("HomeNet"));
    assert_eq!(row.get_str("WiFiKey"), Some("hunter22"));
    assert_eq!(row.get_f64("latitude"), Some(55.75));

    let by_decimal = engine.lookup(&handle, "30706735011").await.unwrap();
    assert_eq!(by_decimal, Some(row));

    assert_eq!(engine.lookup(&handle, "zz-zz").await.unwrap(), None);
    assert_eq!(engine.lookup(&handle, "02:00:00:00:00:00").await.unwrap(), None);
}

#[tokio::test]
async fn test_lookup_recovers_partial_identifiers() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;

    // Both parse to a value no row has, so only the partial search finds them.
    for input in ["264397", "26:43:97"] {
        let row = engine.lookup(&handle, input).await.unwrap().unwrap();
        assert_eq!(row.get_str("BSSID"), Some("00:07:26:43:97:A3"), "{input}");
    }
    assert!(handle.results().is_empty());

    assert_eq!(engine.lookup(&handle, "999999").await.unwrap(), None);
    assert_eq!(engine.lookup(&handle, "   ").await.unwrap(), None);
}

#[tokio::test]
async fn test_partial_identifiers_in_batches_and_field_search() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::none()).await;

    let found = engine
        .search_by_identifiers(&handle, &strings(&["264397", "26:43:97", "999999"]))
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["264397"].get_str("ESSID"), Some("HomeNet"));
    assert_eq!(found["26:43:97"].get_str("ESSID"), Some("HomeNet"));

    let rows = engine
        .search_by_field(&handle, Field::Identifier, "264397", false)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("ESSID"), Some("HomeNet"));

    let rows = engine
        .search_by_field(&handle, Field::Identifier, "264397", true)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_lookups_fill_the_result_cache() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;
    assert!(handle.results().is_empty());

    let first = engine.lookup(&handle, "00-07-26-43-97-a3").await.unwrap();
    assert_eq!(handle.results().len(), 1);
    let cached = handle.results().get("30706735011").unwrap();
    assert_eq!(Some(cached), first);

    let again = engine.lookup(&handle, "0007264397A3").await.unwrap();
    assert_eq!(again, first);
    assert_eq!(handle.results().len(), 1);
}

#[tokio::test]
async fn test_result_cache_evicts_least_recent() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine_with(
        &dir,
        EngineConfig {
            result_cache_capacity: 2,
            ..EngineConfig::default()
        },
    );
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;

    for input in ["00:07:26:43:97:A3", "00:11:22:33:44:55", "A0:B1:C2:D3:E4:F5"] {
        assert!(engine.lookup(&handle, input).await.unwrap().is_some());
    }
    assert_eq!(handle.results().len(), 2);
    assert!(handle.results().get("30706735011").is_none());
}

#[tokio::test]
async fn test_point_and_field_lookups_agree() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;

    let point = engine
        .lookup(&handle, "A0:B1:C2:D3:E4:F5")
        .await
        .unwrap()
        .unwrap();
    let rows = engine
        .search_by_field(&handle, Field::Identifier, "a0-b1-c2-d3-e4-f5", true)
        .await
        .unwrap();
    assert_eq!(rows, vec![point]);
}

#[tokio::test]
async fn test_search_by_identifiers_mixed_inputs() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;

    let inputs = strings(&[
        "00:07:26:43:97:A3",
        "00-11-22-33-44-55",
        "C2:D3:E4",
        "FF:FF:FF:FF:FF:FE",
    ]);
    let found = engine.search_by_identifiers(&handle, &inputs).await.unwrap();

    assert_eq!(found.len(), 3);
    assert_eq!(found["00:07:26:43:97:A3"].get_str("ESSID"), Some("HomeNet"));
    assert_eq!(found["00-11-22-33-44-55"].get_str("ESSID"), Some("Cafe_50%"));
    assert_eq!(found["C2:D3:E4"].get_str("ESSID"), Some("office"));
    assert!(!found.contains_key("FF:FF:FF:FF:FF:FE"));
}

#[tokio::test]
async fn test_search_by_identifiers_in_small_chunks() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine_with(
        &dir,
        EngineConfig {
            identifier_chunk_size: 1,
            ..EngineConfig::default()
        },
    );
    let handle = open_nets(&engine, &dir, BuiltinIndexes::none()).await;

    let inputs = strings(&["1", "30706735011", "00:11:22:33:44:55", "30706735011"]);
    let found = engine.search_by_identifiers(&handle, &inputs).await.unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(found["1"].get_str("BSSID"), Some("00:00:00:00:00:01"));
}

#[tokio::test]
async fn test_field_search_escapes_wildcards() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;

    let rows = engine
        .search_by_field(&handle, Field::Name, "_50%", false)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("ESSID"), Some("Cafe_50%"));

    let rows = engine
        .search_by_field(&handle, Field::Name, "homenet", true)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_credential_search_needs_full_indexes() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::none()).await;
    let rows = engine
        .search_by_fields(&handle, &[Field::Credential, Field::Pin], "hunter", false)
        .await
        .unwrap();
    assert!(rows.is_empty());
    engine.close_store(&handle).await;

    let permissive = engine_with(
        &dir,
        EngineConfig {
            allow_unindexed_secondary: true,
            ..EngineConfig::default()
        },
    );
    let handle = permissive
        .open_store(None, Some(&dir.join("wifi.sqlite")))
        .await
        .unwrap();
    let rows = permissive
        .search_by_field(&handle, Field::Credential, "hunter", false)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("BSSID"), Some("00:07:26:43:97:A3"));
}

#[tokio::test]
async fn test_search_by_names() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine_with(
        &dir,
        EngineConfig {
            name_chunk_size: 2,
            ..EngineConfig::default()
        },
    );
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;

    let rows = engine
        .search_by_names(&handle, &strings(&["HomeNet", "office", "nowhere"]))
        .await
        .unwrap();
    let mut names: Vec<&str> = rows.iter().filter_map(|r| r.get_str("ESSID")).collect();
    names.sort();
    assert_eq!(names, vec!["HomeNet", "office"]);
    assert!(engine.search_by_names(&handle, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bounding_box() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;
    let token = CancellationToken::new();

    let points = engine
        .points_in_bounding_box(&handle, Bounds::new(40.0, 60.0, 0.0, 40.0), None, &token)
        .await
        .unwrap();
    assert_eq!(points.len(), 3);

    let degenerate = engine
        .points_in_bounding_box(&handle, Bounds::point(55.75, 37.61), None, &token)
        .await
        .unwrap();
    assert_eq!(degenerate.len(), 2);

    let limited = engine
        .points_in_bounding_box(&handle, Bounds::new(40.0, 60.0, 0.0, 40.0), Some(1), &token)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);

    token.cancel();
    let err = engine
        .points_in_bounding_box(&handle, Bounds::new(40.0, 60.0, 0.0, 40.0), None, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scans_and_lookups_run_together() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;
    let token = CancellationToken::new();

    let office_names = strings(&["office"]);
    let (point, points, names) = tokio::join!(
        engine.lookup(&handle, "00:11:22:33:44:55"),
        engine.points_in_bounding_box(&handle, Bounds::new(-90.0, 90.0, -180.0, 180.0), None, &token),
        engine.search_by_names(&handle, &office_names),
    );
    assert!(point.unwrap().is_some());
    assert_eq!(points.unwrap().len(), 3);
    assert_eq!(names.unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_without_geo_table() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let path = BuiltinFixture::base()
        .without_geo_table()
        .records(sample_records())
        .write(&dir.join("base.sqlite"))
        .unwrap();
    let handle = engine.open_store(None, Some(&path)).await.unwrap();

    let row = engine.lookup(&handle, "00:07:26:43:97:A3").await.unwrap().unwrap();
    assert_eq!(row.get_str("ESSID"), Some("HomeNet"));
    assert_eq!(row.get_f64("latitude"), None);

    let points = engine
        .points_in_bounding_box(&handle, Bounds::new(-90.0, 90.0, -180.0, 180.0), None, &CancellationToken::new())
        .await
        .unwrap();
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::all()).await;
    engine.lookup(&handle, "00:07:26:43:97:A3").await.unwrap();

    let clone = handle.clone();
    assert!(engine.close_store(&handle).await);
    assert!(!engine.close_store(&clone).await);
    assert!(clone.is_closed());
    assert!(handle.results().is_empty());

    let err = engine.lookup(&handle, "00:07:26:43:97:A3").await.unwrap_err();
    assert!(matches!(err, EngineError::Closed));
    let err = engine.tables(&handle).await.unwrap_err();
    assert!(matches!(err, EngineError::Closed));
}

#[tokio::test]
async fn test_tables_columns_and_recommendation() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let handle = open_nets(&engine, &dir, BuiltinIndexes::none()).await;

    assert_eq!(engine.tables(&handle).await.unwrap(), strings(&["geo", "nets"]));
    let columns = engine.columns(&handle, "nets").await.unwrap();
    assert!(columns.contains(&"ESSID".to_string()));
    assert!(engine.columns(&handle, "missing").await.unwrap().is_empty());
    assert_eq!(engine.recommend_index_level(&handle).await.unwrap(), IndexLevel::None);
}

#[tokio::test]
async fn test_unrecognized_layout_is_rejected() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let path = CustomFixture::new("routers")
        .column("mac", "TEXT")
        .row(vec![SqlValue::Text("00:07:26:43:97:A3".into())])
        .write(&dir.join("routers.sqlite"))
        .unwrap();

    let err = engine.open_store(None, Some(&path)).await.unwrap_err();
    assert!(matches!(err, EngineError::SchemaUnrecognized { .. }));

    let err = engine
        .attach_custom_store(None, Some(&path), "missing", ColumnMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SchemaUnrecognized { .. }));
}

#[tokio::test]
async fn test_custom_store() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
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
            text("A0:B1:C2:D3:E4:F5"),
            text("office"),
            text("s3cr3t"),
            SqlValue::Real(48.85),
            SqlValue::Real(2.35),
        ])
        .index("idx_mac", "mac")
        .write(&dir.join("custom.sqlite"))
        .unwrap();

    let columns = ColumnMap::new()
        .with(Field::Identifier, "mac")
        .with(Field::Name, "ssid")
        .with(Field::Credential, "psk")
        .with(Field::Pin, "no_such_column")
        .with(Field::Latitude, "lat")
        .with(Field::Longitude, "lon");
    let handle = engine
        .attach_custom_store(None, Some(&path), "access points", columns)
        .await
        .unwrap();
    assert!(matches!(handle.classification().layout, Layout::Custom { .. }));
    assert!(!handle.columns().unwrap().contains(Field::Pin));

    let row = engine.lookup(&handle, "00:07:26:43:97:A3").await.unwrap().unwrap();
    assert_eq!(row.get_str("identifier"), Some("00-07-26-43-97-a3"));
    assert_eq!(row.get_str("name"), Some("HomeNet"));
    assert!(handle.results().get("00-07-26-43-97-a3").is_some());

    let partial = engine.lookup(&handle, "B1:C2").await.unwrap().unwrap();
    assert_eq!(partial.get_str("name"), Some("office"));

    let rows = engine
        .search_by_field(&handle, Field::Credential, "CR3", false)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("name"), Some("office"));

    let found = engine
        .search_by_identifiers(&handle, &strings(&["a0b1c2d3e4f5", "B1:C2"]))
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["B1:C2"].get_str("name"), Some("office"));

    let points = engine
        .points_in_bounding_box(&handle, Bounds::new(40.0, 50.0, 0.0, 10.0), None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].bssid, 0xA0B1_C2D3_E4F5);
}

#[tokio::test]
async fn test_content_reference_goes_through_the_cache() {
    let dir = CanonicalTempDir::new().unwrap();
    let engine = engine(&dir);
    let source = nets_store(&dir, BuiltinIndexes::all());
    let reference = format!("file://{}", source.display());

    let first = engine.open_store(Some(&reference), None).await.unwrap();
    assert_eq!(first.origin(), Origin::Copied);
    assert_eq!(first.path(), engine.cached_path(&reference));
    assert!(engine.lookup(&first, "00:07:26:43:97:A3").await.unwrap().is_some());
    engine.close_store(&first).await;

    let second = engine.open_store(Some(&reference), None).await.unwrap();
    assert_eq!(second.origin(), Origin::Cached);
    engine.close_store(&second).await;

    assert!(engine.remove_cached(&reference).await.unwrap());
    assert!(!engine.remove_cached(&reference).await.unwrap());
}
