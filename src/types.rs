use std::collections::BTreeMap;
use std::fmt;

use geo::{Coord, InteriorPoint, MultiPolygon, Point};
use serde::Deserialize;

/// A single attribute cell read from a boundary file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl AttributeValue {
    /// Loose equality used by attribute filters.
    ///
    /// Numbers compare numerically, and a text cell matches a number when it
    /// parses to the same value (dbf numeric columns often come back as text).
    pub fn matches(&self, target: &AttributeValue) -> bool {
        match (self, target) {
            (AttributeValue::Number(a), AttributeValue::Number(b)) => a == b,
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a.trim() == b.trim(),
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            (AttributeValue::Text(s), AttributeValue::Number(n))
            | (AttributeValue::Number(n), AttributeValue::Text(s)) => {
                s.trim().parse::<f64>().map(|v| v == *n).unwrap_or(false)
            }
            (AttributeValue::Null, AttributeValue::Null) => true,
            _ => false,
        }
    }

    /// Identifier form of the cell, if it can name a region.
    pub fn as_identifier(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            AttributeValue::Number(n) if n.fract() == 0.0 => Some(format!("{n:.0}")),
            AttributeValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Text(s) => write!(f, "{s}"),
            AttributeValue::Null => write!(f, "null"),
        }
    }
}

/// One raw record of a boundary file: attributes plus polygonal geometry.
#[derive(Debug, Clone)]
pub struct Feature {
    pub attributes: BTreeMap<String, AttributeValue>,
    pub geometry: MultiPolygon<f64>,
}

impl Feature {
    pub fn get(&self, column: &str) -> Option<&AttributeValue> {
        self.attributes.get(column)
    }
}

/// An administrative region after column selection.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    /// Unset until a value joiner assigns it.
    pub value: Option<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
            value: None,
        }
    }

    /// A point inside the region's geometry, `None` for empty geometry.
    pub fn representative_point(&self) -> Option<Point<f64>> {
        self.geometry.interior_point()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// A resolved label anchor in map coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub anchor: Coord<f64>,
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub overridden: bool,
}
