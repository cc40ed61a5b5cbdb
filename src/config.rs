use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::data::Predicate;
use crate::label::LabelOverride;
use crate::render::RenderOptions;
use crate::scale::{parse_hex_color, Palette};
use crate::synth::SyntheticValues;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub values: ValuesConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub boundary: PathBuf,
    pub id_column: String,
    pub filter: Option<Predicate>,
}

/// Where the per-region values come from.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ValuesConfig {
    Inline {
        values: Vec<f64>,
    },
    Csv {
        path: PathBuf,
        column: String,
        /// Join by this identifier column instead of row order.
        key_column: Option<String>,
    },
    Random(SyntheticValues),
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelConfig {
    #[serde(default = "default_label_size")]
    pub size_pt: f32,
    #[serde(default = "default_label_color")]
    pub color: String,
    #[serde(default)]
    pub overrides: Vec<LabelOverride>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            size_pt: default_label_size(),
            color: default_label_color(),
            overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_width")]
    pub width_in: f32,
    #[serde(default = "default_height")]
    pub height_in: f32,
    #[serde(default = "default_dpi")]
    pub dpi: f32,
    #[serde(default = "default_palette")]
    pub palette: String,
    /// Fixed color domain; defaults to the data range.
    pub domain: Option<[f64; 2]>,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_edge_color")]
    pub edge_color: String,
    #[serde(default = "default_edge_width")]
    pub edge_width_pt: f32,
    pub title: Option<String>,
    #[serde(default = "default_title_size")]
    pub title_size_pt: f32,
    #[serde(default = "default_true")]
    pub colorbar: bool,
    pub colorbar_label: Option<String>,
    #[serde(default = "default_tick_count")]
    pub tick_count: usize,
    /// TrueType font for all text; the built-in bitmap face otherwise.
    pub font: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            width_in: default_width(),
            height_in: default_height(),
            dpi: default_dpi(),
            palette: default_palette(),
            domain: None,
            background: default_background(),
            edge_color: default_edge_color(),
            edge_width_pt: default_edge_width(),
            title: None,
            title_size_pt: default_title_size(),
            colorbar: true,
            colorbar_label: None,
            tick_count: default_tick_count(),
            font: None,
        }
    }
}

fn default_label_size() -> f32 {
    7.0
}
fn default_label_color() -> String {
    "#000000".to_string()
}
fn default_output() -> PathBuf {
    PathBuf::from("choropleth.png")
}
fn default_width() -> f32 {
    8.0
}
fn default_height() -> f32 {
    10.0
}
fn default_dpi() -> f32 {
    100.0
}
fn default_palette() -> String {
    "viridis".to_string()
}
fn default_background() -> String {
    "#ffffff".to_string()
}
fn default_edge_color() -> String {
    "#ffffff".to_string()
}
fn default_edge_width() -> f32 {
    0.5
}
fn default_title_size() -> f32 {
    14.0
}
fn default_true() -> bool {
    true
}
fn default_tick_count() -> usize {
    5
}

impl AppConfig {
    /// Read and validate a TOML config. Relative paths resolve against the
    /// config file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.input.boundary);
        resolve(&mut self.render.output);
        if let Some(font) = self.render.font.as_mut() {
            resolve(font);
        }
        if let ValuesConfig::Csv { path, .. } = &mut self.values {
            resolve(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.render;
        if !(r.width_in > 0.0 && r.height_in > 0.0) {
            bail!("figure size must be positive, got {}x{} in", r.width_in, r.height_in);
        }
        if r.dpi <= 0.0 {
            bail!("dpi must be positive, got {}", r.dpi);
        }
        if let Some([min, max]) = r.domain {
            if !(min.is_finite() && max.is_finite()) || min > max {
                bail!("invalid color domain [{min}, {max}]");
            }
        }
        Palette::from_name(&r.palette)?;
        self.render_options()?;
        Ok(())
    }

    /// Styling for the renderer with colors parsed.
    pub fn render_options(&self) -> Result<RenderOptions> {
        let r = &self.render;
        Ok(RenderOptions {
            width_in: r.width_in,
            height_in: r.height_in,
            dpi: r.dpi,
            background: color(&r.background, "render.background")?,
            edge_color: color(&r.edge_color, "render.edge_color")?,
            edge_width_pt: r.edge_width_pt,
            label_size_pt: self.labels.size_pt,
            label_color: color(&self.labels.color, "labels.color")?,
            title: r.title.clone(),
            title_size_pt: r.title_size_pt,
            colorbar: r.colorbar,
            colorbar_label: r.colorbar_label.clone(),
            tick_count: r.tick_count,
        })
    }
}

fn color(hex: &str, field: &str) -> Result<image::Rgba<u8>> {
    parse_hex_color(hex).ok_or_else(|| anyhow!("{field}: '{hex}' is not a #rrggbb color"))
}
