//! Label anchors: an interior point per region, with manual overrides for
//! small neighbours whose labels would collide.

use std::collections::{HashMap, HashSet};

use geo::Coord;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ChoroplethError, Result};
use crate::types::{HAlign, Label, Region, VAlign};

/// An explicit label position for one region, in map coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelOverride {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub h_align: HAlign,
    #[serde(default)]
    pub v_align: VAlign,
}

#[derive(Debug, Clone, Default)]
pub struct LabelPlacer {
    overrides: HashMap<String, LabelOverride>,
}

impl LabelPlacer {
    pub fn new(overrides: impl IntoIterator<Item = LabelOverride>) -> Self {
        Self {
            overrides: overrides
                .into_iter()
                .map(|o| (o.name.clone(), o))
                .collect(),
        }
    }

    /// Resolve one label per region, in region order.
    pub fn place(&self, regions: &[Region]) -> Result<Vec<Label>> {
        for name in self.unmatched_overrides(regions) {
            warn!(region = %name, "label override does not name any region");
        }

        regions.iter().map(|region| self.place_one(region)).collect()
    }

    fn place_one(&self, region: &Region) -> Result<Label> {
        if let Some(o) = self.overrides.get(&region.name) {
            debug!(region = %region.name, x = o.x, y = o.y, "using label override");
            return Ok(Label {
                text: region.name.clone(),
                anchor: Coord { x: o.x, y: o.y },
                h_align: o.h_align,
                v_align: o.v_align,
                overridden: true,
            });
        }

        Ok(Label {
            text: region.name.clone(),
            anchor: representative_point(region)?,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            overridden: false,
        })
    }

    /// Override names with no matching region, sorted.
    pub fn unmatched_overrides(&self, regions: &[Region]) -> Vec<String> {
        let names: HashSet<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        let mut unmatched: Vec<String> = self
            .overrides
            .keys()
            .filter(|k| !names.contains(k.as_str()))
            .cloned()
            .collect();
        unmatched.sort();
        unmatched
    }
}

/// A point inside the region (never just inside its bounding box).
pub fn representative_point(region: &Region) -> Result<Coord<f64>> {
    region
        .representative_point()
        .map(|p| p.0)
        .ok_or_else(|| ChoroplethError::EmptyGeometry(region.name.clone()))
}
