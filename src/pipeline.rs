//! The end-to-end run: load, filter, select, join, place labels, render.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{AppConfig, ValuesConfig};
use crate::data::RegionDataset;
use crate::join::{join_csv, join_values, load_values_csv};
use crate::label::LabelPlacer;
use crate::render::{ChoroplethRenderer, RenderSummary};
use crate::scale::{ColorScale, Palette};
use crate::text::FontFace;
use crate::types::Region;

pub fn run(config: &AppConfig) -> Result<RenderSummary> {
    // 1. Load and narrow the boundary collection
    let dataset = RegionDataset::load(&config.input.boundary)?;
    let dataset = match &config.input.filter {
        Some(predicate) => dataset
            .apply(predicate)
            .with_context(|| format!("Failed to filter on column '{}'", predicate.column))?,
        None => dataset,
    };
    let mut regions = dataset.select(&config.input.id_column)?;
    info!(regions = regions.len(), "selected regions");

    // 2. Attach values
    attach_values(&mut regions, &config.values)?;

    // 3. Label anchors
    let labels = LabelPlacer::new(config.labels.overrides.iter().cloned()).place(&regions)?;

    // 4. Render
    let scale = color_scale(config, &regions)?;
    let font = FontFace::load(config.render.font.as_deref())?;
    let renderer = ChoroplethRenderer::new(config.render_options()?, font);
    let map = renderer.render(&regions, &labels, &scale)?;
    map.save(&config.render.output)
        .with_context(|| format!("Failed to write {:?}", config.render.output))?;

    Ok(map.summary)
}

pub fn attach_values(regions: &mut [Region], source: &ValuesConfig) -> Result<()> {
    match source {
        ValuesConfig::Inline { values } => join_values(regions, values)?,
        ValuesConfig::Csv {
            path,
            column,
            key_column,
        } => {
            let values = load_values_csv(path, column, key_column.as_deref())
                .with_context(|| format!("Failed to read values from {:?}", path))?;
            join_csv(regions, &values)?;
        }
        ValuesConfig::Random(synthetic) => {
            let values = synthetic.generate(regions.len())?;
            info!(seed = synthetic.seed, count = values.len(), "generated synthetic values");
            join_values(regions, &values)?;
        }
    }
    Ok(())
}

fn color_scale(config: &AppConfig, regions: &[Region]) -> Result<ColorScale> {
    let palette = Palette::from_name(&config.render.palette)?;
    let scale = match config.render.domain {
        Some([min, max]) => ColorScale::new(min, max, palette)?,
        None => {
            let values: Vec<f64> = regions.iter().filter_map(|r| r.value).collect();
            ColorScale::from_values(&values, palette)?
        }
    };
    Ok(scale)
}
