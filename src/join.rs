//! Attaching numeric values to regions.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::error::{ChoroplethError, Result};
use crate::types::Region;

/// Values read from a CSV source.
#[derive(Debug, Clone, PartialEq)]
pub enum CsvValues {
    /// One value per row, assigned to regions in order.
    Ordered(Vec<f64>),
    /// Values keyed by region identifier.
    Keyed(HashMap<String, f64>),
}

/// Assign `values` to `regions` one-to-one in iteration order.
///
/// Nothing is assigned unless the lengths agree and every value is finite.
pub fn join_values(regions: &mut [Region], values: &[f64]) -> Result<()> {
    if values.len() != regions.len() {
        return Err(ChoroplethError::LengthMismatch {
            expected: regions.len(),
            actual: values.len(),
        });
    }

    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ChoroplethError::NonFiniteValue { index });
    }

    for (region, value) in regions.iter_mut().zip(values) {
        region.value = Some(*value);
    }

    debug!(count = values.len(), "joined values by position");
    Ok(())
}

/// Assign values by region identifier. Every region must find a value.
pub fn join_by_key(regions: &mut [Region], values: &HashMap<String, f64>) -> Result<()> {
    if let Some(missing) = regions.iter().find(|r| !values.contains_key(&r.name)) {
        return Err(ChoroplethError::UnmatchedRegion(missing.name.clone()));
    }

    if let Some(index) = regions.iter().position(|r| !values[&r.name].is_finite()) {
        return Err(ChoroplethError::NonFiniteValue { index });
    }

    for region in regions.iter_mut() {
        region.value = Some(values[&region.name]);
    }

    let unused = values.len().saturating_sub(regions.len());
    if unused > 0 {
        warn!(unused, "value keys without a matching region were ignored");
    }

    Ok(())
}

/// Read a values column from a CSV file.
///
/// With `key_column` the result is keyed by that column, otherwise the
/// values keep their row order.
pub fn load_values_csv(path: &Path, value_column: &str, key_column: Option<&str>) -> Result<CsvValues> {
    let file = File::open(path)?;
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let headers = rdr.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ChoroplethError::UnknownColumn(name.to_string()))
    };

    let value_idx = position(value_column)?;
    let key_idx = key_column.map(position).transpose()?;

    let mut ordered = Vec::new();
    let mut keyed = HashMap::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let raw = record.get(value_idx).unwrap_or("");
        let value: f64 = raw
            .parse()
            .map_err(|_| ChoroplethError::InvalidValue {
                row,
                raw: raw.to_string(),
            })?;

        match key_idx {
            Some(idx) => {
                let key = record.get(idx).unwrap_or("").to_string();
                if key.is_empty() {
                    continue;
                }
                keyed.insert(key, value);
            }
            None => ordered.push(value),
        }
    }

    Ok(match key_idx {
        Some(_) => CsvValues::Keyed(keyed),
        None => CsvValues::Ordered(ordered),
    })
}

/// Join whichever shape of CSV values was loaded.
pub fn join_csv(regions: &mut [Region], values: &CsvValues) -> Result<()> {
    match values {
        CsvValues::Ordered(v) => join_values(regions, v),
        CsvValues::Keyed(map) => join_by_key(regions, map),
    }
}
