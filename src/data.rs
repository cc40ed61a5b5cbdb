//! Boundary loading, attribute filtering and column selection.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::MultiPolygon;
use geojson::GeoJson;
use serde::Deserialize;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use tracing::{debug, info};

use crate::error::{ChoroplethError, Result};
use crate::types::{AttributeValue, Feature, Region};

/// Attribute filter as written in configuration, e.g.
/// `{ column = "GF", equals = 4 }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Predicate {
    pub column: String,
    #[serde(flatten)]
    pub test: PredicateTest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateTest {
    Equals(AttributeValue),
    NotEquals(AttributeValue),
}

impl Predicate {
    pub fn equals(column: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            column: column.into(),
            test: PredicateTest::Equals(value),
        }
    }

    pub fn evaluate(&self, feature: &Feature) -> bool {
        let cell = feature.get(&self.column).unwrap_or(&AttributeValue::Null);
        match &self.test {
            PredicateTest::Equals(target) => cell.matches(target),
            PredicateTest::NotEquals(target) => !cell.matches(target),
        }
    }
}

/// A boundary collection: every polygonal record of the input file.
#[derive(Debug, Clone, Default)]
pub struct RegionDataset {
    features: Vec<Feature>,
}

impl RegionDataset {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Load a Shapefile (`.shp` with its `.dbf`) or a GeoJSON FeatureCollection.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(load_error(path, "file does not exist"));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let features = match extension.as_str() {
            "shp" => load_shapefile(path)?,
            "json" | "geojson" => load_geojson(path)?,
            _ => return Err(ChoroplethError::UnsupportedFormat { extension }),
        };

        info!(path = %path.display(), records = features.len(), "loaded boundary file");
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// All attribute column names seen in any record.
    pub fn columns(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .features
            .iter()
            .flat_map(|f| f.attributes.keys())
            .collect();
        names.into_iter().cloned().collect()
    }

    /// Distinct values of one column with their record counts.
    pub fn value_counts(&self, column: &str) -> Result<BTreeMap<String, usize>> {
        self.require_column(column)?;
        let mut counts = BTreeMap::new();
        for feature in &self.features {
            let key = feature
                .get(column)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "null".to_string());
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Keep the records for which `predicate` holds, in their original order.
    ///
    /// Fails if nothing matches.
    pub fn filter<F>(&self, predicate: F) -> Result<Self>
    where
        F: Fn(&Feature) -> bool,
    {
        let kept: Vec<Feature> = self
            .features
            .iter()
            .filter(|f| predicate(f))
            .cloned()
            .collect();

        if kept.is_empty() {
            return Err(ChoroplethError::Filter {
                total: self.features.len(),
            });
        }

        debug!(before = self.features.len(), after = kept.len(), "filtered records");
        Ok(Self { features: kept })
    }

    /// Keep records whose `column` equals `value`.
    pub fn filter_eq(&self, column: &str, value: &AttributeValue) -> Result<Self> {
        self.apply(&Predicate::equals(column, value.clone()))
    }

    /// Keep records matching `predicate`. An empty dataset has no columns to
    /// check and fails as an empty filter result.
    pub fn apply(&self, predicate: &Predicate) -> Result<Self> {
        if !self.features.is_empty() {
            self.require_column(&predicate.column)?;
        }
        self.filter(|f| predicate.evaluate(f))
    }

    /// Project down to an identifier and a geometry per record.
    ///
    /// Identifiers must be present and unique.
    pub fn select(&self, id_column: &str) -> Result<Vec<Region>> {
        self.require_column(id_column)?;

        let mut seen = HashSet::new();
        let mut regions = Vec::with_capacity(self.features.len());

        for (row, feature) in self.features.iter().enumerate() {
            let name = feature
                .get(id_column)
                .and_then(AttributeValue::as_identifier)
                .ok_or_else(|| ChoroplethError::MissingIdentifier {
                    row,
                    column: id_column.to_string(),
                })?;

            if !seen.insert(name.clone()) {
                return Err(ChoroplethError::DuplicateIdentifier(name));
            }

            regions.push(Region::new(name, feature.geometry.clone()));
        }

        Ok(regions)
    }

    fn require_column(&self, column: &str) -> Result<()> {
        if self.features.iter().any(|f| f.attributes.contains_key(column)) {
            Ok(())
        } else {
            Err(ChoroplethError::UnknownColumn(column.to_string()))
        }
    }
}

fn load_error(path: &Path, reason: impl ToString) -> ChoroplethError {
    ChoroplethError::Load {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn load_shapefile(path: &Path) -> Result<Vec<Feature>> {
    let mut reader = Reader::from_path(path).map_err(|e| load_error(path, e))?;
    let mut features = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(|e| load_error(path, e))?;

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| load_error(path, format!("invalid polygon: {e:?}")))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| load_error(path, format!("invalid polygonM: {e:?}")))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| load_error(path, format!("invalid polygonZ: {e:?}")))?,
            _ => continue,
        };

        let attributes = record
            .into_iter()
            .map(|(name, value)| (name, field_to_attribute(value)))
            .collect();

        features.push(Feature {
            attributes,
            geometry,
        });
    }

    Ok(features)
}

fn field_to_attribute(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => AttributeValue::Text(s),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
            AttributeValue::Number(n)
        }
        FieldValue::Float(Some(n)) => AttributeValue::Number(f64::from(n)),
        FieldValue::Integer(n) => AttributeValue::Number(f64::from(n)),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
        _ => AttributeValue::Null,
    }
}

fn load_geojson(path: &Path) -> Result<Vec<Feature>> {
    let file = File::open(path).map_err(|e| load_error(path, e))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).map_err(|e| load_error(path, e))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(load_error(path, "GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();

    for feature in collection.features {
        let geometry = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| load_error(path, format!("invalid geometry: {e:?}")))?;
                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        let attributes = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, json_to_attribute(value)))
            .collect();

        features.push(Feature {
            attributes,
            geometry,
        });
    }

    Ok(features)
}

fn json_to_attribute(value: serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::String(s) => AttributeValue::Text(s),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(AttributeValue::Number)
            .unwrap_or(AttributeValue::Null),
        serde_json::Value::Bool(b) => AttributeValue::Bool(b),
        serde_json::Value::Null => AttributeValue::Null,
        other => AttributeValue::Text(other.to_string()),
    }
}
