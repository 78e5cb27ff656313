mod common;

use std::fs;

use common::*;
use lakearea::io::export::{write_csv, DEFAULT_COLUMNS};
use lakearea::{
    lake_area_time_series, AreaColumn, CsvTableSink, InMemorySceneCatalog, LakeAreaConfig,
    LakeCatalog, LakeRegistry,
};
use tempfile::TempDir;

fn scenes() -> InMemorySceneCatalog {
    InMemorySceneCatalog::new(vec![
        SceneSpec::new("LC08_20190704", (2019, 7, 4)).clouded(10..16).build(),
        SceneSpec::new("LC08_20180801", (2018, 8, 1)).build(),
    ])
}

#[test]
fn test_default_export_writes_date_and_area() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let sink = CsvTableSink::new(dir.path());

    let series = lake_area_time_series(
        LAKE_NAME,
        LakeAreaConfig::default(),
        &scenes(),
        &lake_registry(),
        &occurrence(),
        &flat_dem(),
        Some(&sink),
    )
    .unwrap();
    assert_eq!(series.len(), 2);

    let text = fs::read_to_string(sink.path_for(LAKE_NAME)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Date,ReconstructedArea");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("2018-08-01,0.36"));
    assert!(lines[2].starts_with("2019-07-04,0.36"));
}

#[test]
fn test_selected_columns_export() {
    let dir = TempDir::new().unwrap();
    let sink = CsvTableSink::new(dir.path().join("nested"));

    let series = lake_area_time_series(
        LAKE_NAME,
        LakeAreaConfig::default(),
        &scenes(),
        &lake_registry(),
        &occurrence(),
        &flat_dem(),
        None,
    )
    .unwrap();

    let columns: Vec<AreaColumn> = ["SceneId", "FillStatus", "ObstructionArea"]
        .iter()
        .map(|c| c.parse().unwrap())
        .collect();
    series.export(&sink, &columns).unwrap();

    let mut reader = csv::Reader::from_path(sink.path_for(LAKE_NAME)).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["SceneId", "FillStatus", "ObstructionArea"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(&rows[0][0], "LC08_20180801");
    assert_eq!(&rows[0][1], "success");
    assert_eq!(rows[0][2].parse::<f64>().unwrap(), 0.0);
    assert!(rows[1][2].parse::<f64>().unwrap() > 0.1);
}

#[test]
fn test_empty_series_writes_header_only() {
    let mut out = Vec::new();
    write_csv(&mut out, &[], &DEFAULT_COLUMNS).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Date,ReconstructedArea\n");
}

#[test]
fn test_config_and_lakes_from_json_files() {
    let dir = TempDir::new().unwrap();

    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"water_method": "Jones2019_3", "max_cloud_cover": 20.0}"#).unwrap();
    let config = LakeAreaConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.max_cloud_cover, 20.0);
    assert_eq!(config.water_method.to_string(), "Jones2019_3");

    let first = dir.path().join("nhd.json");
    let second = dir.path().join("hydrolakes.json");
    fs::write(
        &first,
        r#"{"lakes": [{"name": "Synthetic Lake",
            "exterior": [[500300,4200300],[500900,4200300],[500900,4200900],[500300,4200900],[500300,4200300]]}]}"#,
    )
    .unwrap();
    fs::write(
        &second,
        r#"{"lakes": [{"name": "Synthetic Lake", "polygon_area_km2": 0.01,
            "exterior": [[0,0],[2000,0],[2000,2000],[0,2000],[0,0]]}]}"#,
    )
    .unwrap();

    let registry = LakeRegistry::from_json_files(&[&first, &second]).unwrap();
    assert_eq!(registry.len(), 2);
    // the smaller feature wins, measured by geometry rather than the stated area
    let lake = registry.lookup(LAKE_NAME).unwrap();
    assert!((lake.polygon_area_km2 - 0.36).abs() < 1e-6);

    let series = lake_area_time_series(
        LAKE_NAME,
        config,
        &scenes(),
        &registry,
        &occurrence(),
        &flat_dem(),
        None,
    )
    .unwrap();
    assert_eq!(series.len(), 2);
}
