//! End-to-end runs of the load → join → label → render pipeline.

mod common;

use std::fs;

use choromap::config::AppConfig;
use choromap::join::join_values;
use choromap::pipeline::{self, attach_values};
use choromap::{AttributeValue, ChoroplethError, LabelPlacer, RegionDataset};
use common::{region_name, write_boundaries, write_config, GRID, RANDOM_VALUES};
use geo::{Contains, Point};
use tempfile::TempDir;

#[test]
fn test_sixteen_regions_render_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), RANDOM_VALUES);
    let config = AppConfig::load_from_file(&config_path).unwrap();

    let summary = pipeline::run(&config).unwrap();

    assert_eq!(summary.polygons, GRID * GRID);
    assert_eq!(summary.labels, GRID * GRID);
    assert_eq!((summary.width, summary.height), (240, 240));

    let image = image::open(dir.path().join("out/map.png")).unwrap();
    assert_eq!((image.width(), image.height()), (240, 240));
}

#[test]
fn test_water_features_are_filtered_out() {
    let dir = TempDir::new().unwrap();
    let path = write_boundaries(dir.path());

    let all = RegionDataset::load(&path).unwrap();
    let land = all.filter_eq("GF", &AttributeValue::Number(4.0)).unwrap();
    assert_eq!(all.len(), 18);
    assert_eq!(land.len(), 16);

    let names: Vec<String> = land.select("GEN").unwrap().into_iter().map(|r| r.name).collect();
    let expected: Vec<String> = (0..GRID * GRID).map(region_name).collect();
    assert_eq!(names, expected);

    let err = all.filter_eq("GF", &AttributeValue::Number(3.0)).unwrap_err();
    assert!(matches!(err, ChoroplethError::Filter { total: 18 }));
}

#[test]
fn test_numeric_identifiers_select() {
    let dir = TempDir::new().unwrap();
    let path = write_boundaries(dir.path());
    let regions = RegionDataset::load(&path).unwrap().select("AGS").unwrap();
    assert_eq!(regions[0].name, "01");
}

#[test]
fn test_same_seed_renders_same_values() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), RANDOM_VALUES);
    let config = AppConfig::load_from_file(&config_path).unwrap();

    let load = || {
        RegionDataset::load(&config.input.boundary)
            .unwrap()
            .apply(config.input.filter.as_ref().unwrap())
            .unwrap()
            .select(&config.input.id_column)
            .unwrap()
    };

    let mut first = load();
    let mut second = load();
    attach_values(&mut first, &config.values).unwrap();
    attach_values(&mut second, &config.values).unwrap();

    let a: Vec<_> = first.iter().map(|r| r.value).collect();
    let b: Vec<_> = second.iter().map(|r| r.value).collect();
    assert_eq!(a, b);
    assert!(a.iter().all(Option::is_some));
}

#[test]
fn test_inline_values_with_wrong_length_abort() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(
        dir.path(),
        "[values]\nsource = \"inline\"\nvalues = [1, 2, 3]",
    );
    let config = AppConfig::load_from_file(&config_path).unwrap();

    let err = pipeline::run(&config).unwrap_err();
    let err = err.downcast_ref::<ChoroplethError>().unwrap();
    assert!(matches!(
        err,
        ChoroplethError::LengthMismatch { expected: 16, actual: 3 }
    ));
    assert!(!dir.path().join("out/map.png").exists());
}

#[test]
fn test_keyed_csv_values() {
    let dir = TempDir::new().unwrap();
    let mut csv = String::from("name,value\n");
    for i in (0..GRID * GRID).rev() {
        csv.push_str(&format!("{},{}\n", region_name(i), i * 10));
    }
    fs::write(dir.path().join("values.csv"), csv).unwrap();

    let config_path = write_config(
        dir.path(),
        "[values]\nsource = \"csv\"\npath = \"values.csv\"\ncolumn = \"value\"\nkey_column = \"name\"",
    );
    let config = AppConfig::load_from_file(&config_path).unwrap();

    let mut regions = RegionDataset::load(&config.input.boundary)
        .unwrap()
        .apply(config.input.filter.as_ref().unwrap())
        .unwrap()
        .select("GEN")
        .unwrap();
    attach_values(&mut regions, &config.values).unwrap();
    assert_eq!(regions[3].value, Some(30.0));

    assert!(pipeline::run(&config).is_ok());
}

#[test]
fn test_labels_inside_regions_and_overrides_win() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), RANDOM_VALUES);
    let config = AppConfig::load_from_file(&config_path).unwrap();

    let mut regions = RegionDataset::load(&config.input.boundary)
        .unwrap()
        .apply(config.input.filter.as_ref().unwrap())
        .unwrap()
        .select("GEN")
        .unwrap();
    let ones = vec![1.0; regions.len()];
    join_values(&mut regions, &ones).unwrap();

    let labels = LabelPlacer::new(config.labels.overrides.clone())
        .place(&regions)
        .unwrap();

    for (region, label) in regions.iter().zip(&labels) {
        if region.name == "State 5" {
            assert!(label.overridden);
            assert_eq!((label.anchor.x, label.anchor.y), (5.5, 48.5));
        } else {
            assert!(region.geometry.contains(&Point::from(label.anchor)));
        }
    }
}
