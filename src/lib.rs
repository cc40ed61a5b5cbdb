//! Choropleth maps from administrative boundary files.
//!
//! The stages run strictly in sequence:
//! [`RegionDataset`] loads and filters boundaries, the [`join`] functions
//! attach one value per region, [`LabelPlacer`] anchors labels inside each
//! region, and [`ChoroplethRenderer`] draws the image.

pub mod config;
pub mod data;
pub mod error;
pub mod join;
pub mod label;
pub mod pipeline;
pub mod render;
pub mod scale;
pub mod synth;
pub mod text;
pub mod types;

pub use data::{Predicate, RegionDataset};
pub use error::{ChoroplethError, Result};
pub use label::{LabelOverride, LabelPlacer};
pub use render::{ChoroplethRenderer, RenderOptions, RenderSummary, RenderedMap};
pub use scale::{ColorScale, Palette};
pub use synth::SyntheticValues;
pub use types::{AttributeValue, Feature, HAlign, Label, Region, VAlign};
