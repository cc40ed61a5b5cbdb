//! Shared fixtures: a 4x4 grid of "states" plus water features to filter out.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

pub const GRID: usize = 4;

pub fn region_name(index: usize) -> String {
    format!("State {index}")
}

fn square(x: f64, y: f64, size: f64) -> serde_json::Value {
    json!([[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]])
}

/// Sixteen land squares (`GF = 4`) and two water areas (`GF = 1`, `GF = 2`).
pub fn write_boundaries(dir: &Path) -> PathBuf {
    let mut features = Vec::new();

    for i in 0..GRID * GRID {
        let (col, row) = ((i % GRID) as f64, (i / GRID) as f64);
        features.push(json!({
            "type": "Feature",
            "properties": { "GEN": region_name(i), "GF": 4, "AGS": format!("{:02}", i + 1) },
            "geometry": { "type": "Polygon", "coordinates": square(6.0 + col, 47.0 + row, 1.0) }
        }));
    }

    features.push(json!({
        "type": "Feature",
        "properties": { "GEN": "North Sea", "GF": 1, "AGS": "98" },
        "geometry": { "type": "Polygon", "coordinates": square(6.0, 51.0, 4.0) }
    }));
    features.push(json!({
        "type": "Feature",
        "properties": { "GEN": "Lake", "GF": 2, "AGS": "99" },
        "geometry": {
            "type": "MultiPolygon",
            "coordinates": [square(9.2, 47.2, 0.3), square(9.6, 47.2, 0.3)]
        }
    }));

    let path = dir.join("states.geojson");
    let collection = json!({ "type": "FeatureCollection", "features": features });
    fs::write(&path, serde_json::to_string_pretty(&collection).unwrap()).unwrap();
    path
}

/// A config rendering the grid with seeded random values.
pub fn write_config(dir: &Path, values_section: &str) -> PathBuf {
    write_boundaries(dir);
    let config = format!(
        r#"
[input]
boundary = "states.geojson"
id_column = "GEN"
filter = {{ column = "GF", equals = 4 }}

{values_section}

[labels]
size_pt = 6
overrides = [{{ name = "State 5", x = 5.5, y = 48.5, h_align = "right" }}]

[render]
output = "out/map.png"
width_in = 4
height_in = 4
dpi = 60
palette = "viridis"
title = "Synthetic values"
colorbar_label = "value"
"#
    );
    let path = dir.join("choromap.toml");
    fs::write(&path, config).unwrap();
    path
}

pub const RANDOM_VALUES: &str = r#"
[values]
source = "random"
seed = 42
min = 0
max = 100
integer = true
"#;
