//! Rasterizes filled region polygons, a colorbar legend and labels.

use std::fs;
use std::path::Path;

use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use rstar::{RTree, RTreeObject, AABB};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::{debug, info, warn};

use crate::error::{ChoroplethError, Result};
use crate::scale::ColorScale;
use crate::text::{FontFace, TextBox};
use crate::types::{HAlign, Label, Region, VAlign};

/// Figure geometry and styling.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width_in: f32,
    pub height_in: f32,
    pub dpi: f32,
    pub background: Rgba<u8>,
    pub edge_color: Rgba<u8>,
    /// Region outline width in points; zero disables outlines.
    pub edge_width_pt: f32,
    pub label_size_pt: f32,
    pub label_color: Rgba<u8>,
    pub title: Option<String>,
    pub title_size_pt: f32,
    pub colorbar: bool,
    pub colorbar_label: Option<String>,
    pub tick_count: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width_in: 8.0,
            height_in: 10.0,
            dpi: 100.0,
            background: Rgba([255, 255, 255, 255]),
            edge_color: Rgba([255, 255, 255, 255]),
            edge_width_pt: 0.5,
            label_size_pt: 7.0,
            label_color: Rgba([0, 0, 0, 255]),
            title: None,
            title_size_pt: 14.0,
            colorbar: true,
            colorbar_label: None,
            tick_count: 5,
        }
    }
}

impl RenderOptions {
    /// Output size in pixels: inches times dots per inch.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width_in * self.dpi).round() as u32,
            (self.height_in * self.dpi).round() as u32,
        )
    }

    pub fn points_to_pixels(&self, pt: f32) -> f32 {
        pt * self.dpi / 72.0
    }
}

/// A pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Maps map coordinates onto pixels with equal aspect ratio, y pointing up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    min_x: f64,
    max_y: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Viewport {
    /// Fit `bounds` into `area`, centered.
    pub fn fit(bounds: Rect<f64>, area: PixelRect) -> Self {
        let span_x = bounds.width().max(f64::EPSILON);
        let span_y = bounds.height().max(f64::EPSILON);
        let scale = (f64::from(area.width) / span_x).min(f64::from(area.height) / span_y);

        Self {
            min_x: bounds.min().x,
            max_y: bounds.max().y,
            scale,
            offset_x: f64::from(area.x) + (f64::from(area.width) - span_x * scale) / 2.0,
            offset_y: f64::from(area.y) + (f64::from(area.height) - span_y * scale) / 2.0,
        }
    }

    pub fn project(&self, c: Coord<f64>) -> (f32, f32) {
        (
            (self.offset_x + (c.x - self.min_x) * self.scale) as f32,
            (self.offset_y + (self.max_y - c.y) * self.scale) as f32,
        )
    }
}

/// What ended up in the image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderSummary {
    pub width: u32,
    pub height: u32,
    pub polygons: usize,
    pub labels: usize,
    /// Pairs of labels whose boxes overlap, in label order.
    pub overlapping_labels: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct RenderedMap {
    pub image: RgbaImage,
    pub viewport: Viewport,
    pub summary: RenderSummary,
}

impl RenderedMap {
    /// Write the image; the format follows the file extension, PNG without one.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("jpg" | "jpeg") => DynamicImage::ImageRgba8(self.image.clone())
                .to_rgb8()
                .save(path)?,
            Some(_) => self.image.save(path)?,
            None => self.image.save_with_format(path, ImageFormat::Png)?,
        }

        info!(path = %path.display(), width = self.summary.width, height = self.summary.height, "saved map");
        Ok(())
    }
}

struct LabelEnvelope {
    index: usize,
    bbox: TextBox,
}

impl RTreeObject for LabelEnvelope {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.x, self.bbox.y],
            [self.bbox.x + self.bbox.width, self.bbox.y + self.bbox.height],
        )
    }
}

struct Layout {
    map: PixelRect,
    colorbar: Option<PixelRect>,
    title_anchor: (f32, f32),
}

#[derive(Debug)]
pub struct ChoroplethRenderer {
    options: RenderOptions,
    font: FontFace,
}

impl ChoroplethRenderer {
    pub fn new(options: RenderOptions, font: FontFace) -> Self {
        Self { options, font }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Draw every region filled by its value, the legend and the labels.
    ///
    /// A region without a value or geometry aborts the whole render.
    pub fn render(&self, regions: &[Region], labels: &[Label], scale: &ColorScale) -> Result<RenderedMap> {
        let bounds = validate_regions(regions)?;

        let (width, height) = self.options.pixel_size();
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ChoroplethError::Render(format!("invalid image size {width}x{height}")))?;
        let bg = self.options.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(bg[0], bg[1], bg[2], bg[3]));

        let tick_values = colorbar_ticks(scale, self.options.tick_count);
        let tick_texts = format_ticks(&tick_values);
        let layout = self.layout(width, height, &tick_texts);
        let viewport = Viewport::fit(bounds, layout.map);

        debug!(width, height, map = ?layout.map, "computed layout");

        let polygons = self.fill_regions(&mut pixmap, regions, scale, &viewport)?;
        if let Some(bar) = layout.colorbar {
            self.fill_colorbar(&mut pixmap, bar, scale);
        }

        let mut image = pixmap_to_image(&pixmap)?;

        if let Some(title) = &self.options.title {
            let px = self.options.points_to_pixels(self.options.title_size_pt);
            self.font.draw_aligned(
                &mut image,
                title,
                layout.title_anchor,
                px,
                self.options.label_color,
                HAlign::Center,
                VAlign::Top,
            );
        }

        if let Some(bar) = layout.colorbar {
            self.draw_colorbar_text(&mut image, bar, &tick_values, &tick_texts, scale);
        }

        let boxes = self.draw_labels(&mut image, labels, &viewport);
        let overlapping_labels = find_overlaps(&boxes)
            .into_iter()
            .map(|(a, b)| (labels[a].text.clone(), labels[b].text.clone()))
            .collect::<Vec<_>>();
        for (a, b) in &overlapping_labels {
            warn!(first = %a, second = %b, "labels overlap; consider a label override");
        }

        info!(polygons, labels = boxes.len(), "rendered choropleth");

        Ok(RenderedMap {
            image,
            viewport,
            summary: RenderSummary {
                width,
                height,
                polygons,
                labels: boxes.len(),
                overlapping_labels,
            },
        })
    }

    fn layout(&self, width: u32, height: u32, tick_texts: &[String]) -> Layout {
        let (w, h) = (width as f32, height as f32);
        let pad = 0.03 * w.min(h);

        let title_height = match &self.options.title {
            Some(_) => self.options.points_to_pixels(self.options.title_size_pt) * 1.6,
            None => 0.0,
        };
        let top = pad + title_height;
        let body_height = (h - top - pad).max(1.0);

        let colorbar = if self.options.colorbar {
            let tick_px = self.options.points_to_pixels(self.options.label_size_pt);
            let text_width = tick_texts
                .iter()
                .map(|t| self.font.measure(t, tick_px).0)
                .fold(0.0, f32::max);
            let bar_width = (0.025 * w).max(4.0);
            let reserved = pad + bar_width + tick_px * 0.6 + text_width;
            Some((bar_width, reserved))
        } else {
            None
        };

        let reserved = colorbar.map(|(_, r)| r).unwrap_or(0.0);
        let map = PixelRect {
            x: pad,
            y: top,
            width: (w - 2.0 * pad - reserved).max(1.0),
            height: body_height,
        };

        let colorbar = colorbar.map(|(bar_width, _)| PixelRect {
            x: map.x + map.width + pad,
            y: top + body_height * 0.15,
            width: bar_width,
            height: body_height * 0.7,
        });

        Layout {
            map,
            colorbar,
            title_anchor: (w / 2.0, pad),
        }
    }

    fn fill_regions(
        &self,
        pixmap: &mut Pixmap,
        regions: &[Region],
        scale: &ColorScale,
        viewport: &Viewport,
    ) -> Result<usize> {
        let edge_px = self.options.points_to_pixels(self.options.edge_width_pt);
        let mut edge_paint = Paint::default();
        let edge = self.options.edge_color;
        edge_paint.set_color_rgba8(edge[0], edge[1], edge[2], edge[3]);
        edge_paint.anti_alias = true;
        let stroke = Stroke {
            width: edge_px,
            ..Stroke::default()
        };

        let mut drawn = 0;
        for region in regions {
            let value = region
                .value
                .ok_or_else(|| ChoroplethError::MissingValue(region.name.clone()))?;
            let path = region_path(&region.geometry, viewport)
                .ok_or_else(|| ChoroplethError::EmptyGeometry(region.name.clone()))?;

            let color = scale.color_for(value);
            let mut paint = Paint::default();
            paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
            paint.anti_alias = true;

            pixmap.fill_path(&path, &paint, FillRule::EvenOdd, Transform::identity(), None);
            if edge_px > 0.0 {
                pixmap.stroke_path(&path, &edge_paint, &stroke, Transform::identity(), None);
            }
            drawn += 1;
        }

        Ok(drawn)
    }

    fn fill_colorbar(&self, pixmap: &mut Pixmap, bar: PixelRect, scale: &ColorScale) {
        let rows = bar.height.round().max(1.0) as u32;
        let (min, max) = scale.domain();
        let mut paint = Paint::default();
        paint.anti_alias = false;

        for row in 0..rows {
            // Top row is the domain maximum; a flat domain is a single color.
            let c = if min == max {
                scale.color_for(min)
            } else if rows > 1 {
                scale
                    .palette()
                    .sample(1.0 - f64::from(row) / f64::from(rows - 1))
            } else {
                scale.palette().sample(0.5)
            };
            paint.set_color_rgba8(c[0], c[1], c[2], c[3]);
            if let Some(rect) = tiny_skia::Rect::from_xywh(bar.x, bar.y + row as f32, bar.width, 1.0) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }

        let mut outline = Paint::default();
        let c = self.options.label_color;
        outline.set_color_rgba8(c[0], c[1], c[2], c[3]);
        let stroke = Stroke {
            width: self.options.points_to_pixels(0.5).max(1.0),
            ..Stroke::default()
        };
        if let Some(rect) = tiny_skia::Rect::from_xywh(bar.x, bar.y, bar.width, bar.height) {
            let path = PathBuilder::from_rect(rect);
            pixmap.stroke_path(&path, &outline, &stroke, Transform::identity(), None);
        }
    }

    fn draw_colorbar_text(
        &self,
        image: &mut RgbaImage,
        bar: PixelRect,
        ticks: &[f64],
        texts: &[String],
        scale: &ColorScale,
    ) {
        let px = self.options.points_to_pixels(self.options.label_size_pt);
        let color = self.options.label_color;
        let tick_len = (px * 0.4).max(2.0);

        for (value, text) in ticks.iter().zip(texts) {
            let y = bar.y + bar.height * (1.0 - scale.normalize(*value) as f32);
            let x = bar.x + bar.width;
            for dx in 0..tick_len.round() as u32 {
                let (px_x, px_y) = (x as u32 + dx, y.round() as u32);
                if px_x < image.width() && px_y < image.height() {
                    image.put_pixel(px_x, px_y, color);
                }
            }
            self.font
                .draw_aligned(image, text, (x + tick_len + 2.0, y), px, color, HAlign::Left, VAlign::Center);
        }

        if let Some(caption) = &self.options.colorbar_label {
            self.font.draw_aligned(
                image,
                caption,
                (bar.x + bar.width, bar.y - px * 0.5),
                px,
                color,
                HAlign::Right,
                VAlign::Bottom,
            );
        }
    }

    fn draw_labels(&self, image: &mut RgbaImage, labels: &[Label], viewport: &Viewport) -> Vec<TextBox> {
        let px = self.options.points_to_pixels(self.options.label_size_pt);
        labels
            .iter()
            .map(|label| {
                self.font.draw_aligned(
                    image,
                    &label.text,
                    viewport.project(label.anchor),
                    px,
                    self.options.label_color,
                    label.h_align,
                    label.v_align,
                )
            })
            .collect()
    }
}

/// Every region must carry a value and geometry; returns their joint bounds.
fn validate_regions(regions: &[Region]) -> Result<Rect<f64>> {
    let mut bounds: Option<Rect<f64>> = None;

    for region in regions {
        if region.value.is_none() {
            return Err(ChoroplethError::MissingValue(region.name.clone()));
        }
        let rect = region
            .geometry
            .bounding_rect()
            .ok_or_else(|| ChoroplethError::EmptyGeometry(region.name.clone()))?;

        bounds = Some(match bounds {
            Some(b) => Rect::new(
                Coord {
                    x: b.min().x.min(rect.min().x),
                    y: b.min().y.min(rect.min().y),
                },
                Coord {
                    x: b.max().x.max(rect.max().x),
                    y: b.max().y.max(rect.max().y),
                },
            ),
            None => rect,
        });
    }

    bounds.ok_or_else(|| ChoroplethError::Render("no regions to draw".to_string()))
}

fn region_path(geometry: &MultiPolygon<f64>, viewport: &Viewport) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();

    for polygon in &geometry.0 {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            let mut coords = ring.coords();
            let Some(first) = coords.next() else {
                continue;
            };
            let (x, y) = viewport.project(*first);
            pb.move_to(x, y);
            for c in coords {
                let (x, y) = viewport.project(*c);
                pb.line_to(x, y);
            }
            pb.close();
        }
    }

    pb.finish()
}

fn pixmap_to_image(pixmap: &Pixmap) -> Result<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for p in pixmap.pixels() {
        let c = p.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .ok_or_else(|| ChoroplethError::Render("pixel buffer size mismatch".to_string()))
}

/// Index pairs `(i, j)`, `i < j`, of boxes that overlap.
fn find_overlaps(boxes: &[TextBox]) -> Vec<(usize, usize)> {
    let tree = RTree::bulk_load(
        boxes
            .iter()
            .enumerate()
            .map(|(index, bbox)| LabelEnvelope { index, bbox: *bbox })
            .collect(),
    );

    let mut pairs = Vec::new();
    for (i, bbox) in boxes.iter().enumerate() {
        let envelope = LabelEnvelope { index: i, bbox: *bbox }.envelope();
        for other in tree.locate_in_envelope_intersecting(&envelope) {
            if other.index > i && bbox.intersects(&other.bbox) {
                pairs.push((i, other.index));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Legend tick values; a zero-width domain gets a single tick.
fn colorbar_ticks(scale: &ColorScale, count: usize) -> Vec<f64> {
    let (min, max) = scale.domain();
    if min == max {
        vec![min]
    } else {
        scale.ticks(count)
    }
}

/// Tick labels with as many decimals as the ticks need, at most three.
fn format_ticks(values: &[f64]) -> Vec<String> {
    let decimals = values
        .iter()
        .map(|v| {
            let mut scaled = *v;
            let mut d = 0;
            while d < 3 && (scaled - scaled.round()).abs() > 1e-9 * scaled.abs().max(1.0) {
                scaled *= 10.0;
                d += 1;
            }
            d
        })
        .max()
        .unwrap_or(0);

    values.iter().map(|v| format!("{v:.decimals$}")).collect()
}
