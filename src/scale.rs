//! Continuous color scales: a fixed numeric domain over a named gradient.

use image::Rgba;

use crate::error::{ChoroplethError, Result};

const VIRIDIS: &[&str] = &[
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];
const PLASMA: &[&str] = &[
    "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953", "#fb9f3a",
    "#fdca26", "#f0f921",
];
const INFERNO: &[&str] = &[
    "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925", "#fb9b06",
    "#f7d13d", "#fcffa4",
];
const MAGMA: &[&str] = &[
    "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d", "#fd9668",
    "#feca8d", "#fcfdbf",
];
const CIVIDIS: &[&str] = &[
    "#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8779", "#a69d75", "#c4b56c",
    "#e4cf5b", "#fee838",
];
const BLUES: &[&str] = &[
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];
const GREENS: &[&str] = &[
    "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c",
    "#00441b",
];
const REDS: &[&str] = &[
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15",
    "#67000d",
];
const ORANGES: &[&str] = &[
    "#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c", "#f16913", "#d94801", "#a63603",
    "#7f2704",
];
const PURPLES: &[&str] = &[
    "#fcfbfd", "#efedf5", "#dadaeb", "#bcbddc", "#9e9ac8", "#807dba", "#6a51a3", "#54278f",
    "#3f007d",
];
const YLORRD: &[&str] = &[
    "#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c", "#bd0026",
    "#800026",
];
const YLGNBU: &[&str] = &[
    "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8", "#253494",
    "#081d58",
];

/// Parse `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let hex = hex.trim().trim_start_matches('#');
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// A named gradient sampled by linear interpolation between evenly spaced stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    name: String,
    stops: Vec<Rgba<u8>>,
}

impl Palette {
    pub const NAMES: &'static [&'static str] = &[
        "viridis", "plasma", "inferno", "magma", "cividis", "blues", "greens", "reds", "oranges",
        "purples", "ylorrd", "ylgnbu",
    ];

    /// Look up a palette by name, case-insensitively. A `_r` suffix reverses it.
    pub fn from_name(name: &str) -> Result<Self> {
        let lowered = name.trim().to_lowercase();
        let (base, reversed) = match lowered.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (lowered.as_str(), false),
        };

        let hexes = match base {
            "viridis" => VIRIDIS,
            "plasma" => PLASMA,
            "inferno" => INFERNO,
            "magma" => MAGMA,
            "cividis" => CIVIDIS,
            "blues" => BLUES,
            "greens" => GREENS,
            "reds" => REDS,
            "oranges" => ORANGES,
            "purples" => PURPLES,
            "ylorrd" => YLORRD,
            "ylgnbu" => YLGNBU,
            _ => return Err(ChoroplethError::UnknownPalette(name.to_string())),
        };

        let mut stops: Vec<Rgba<u8>> = hexes.iter().filter_map(|h| parse_hex_color(h)).collect();
        if reversed {
            stops.reverse();
        }

        Ok(Self {
            name: lowered,
            stops,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color at position `t` in `[0, 1]`; out-of-range positions clamp.
    pub fn sample(&self, t: f64) -> Rgba<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let last = self.stops.len() - 1;
        let scaled = t * last as f64;
        let i = (scaled.floor() as usize).min(last.saturating_sub(1));
        let frac = scaled - i as f64;
        let (a, b) = (self.stops[i], self.stops[(i + 1).min(last)]);

        let lerp = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8;
        Rgba([
            lerp(a[0], b[0]),
            lerp(a[1], b[1]),
            lerp(a[2], b[2]),
            lerp(a[3], b[3]),
        ])
    }
}

/// A numeric domain mapped onto a palette.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
    palette: Palette,
}

impl ColorScale {
    pub fn new(min: f64, max: f64, palette: Palette) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(ChoroplethError::InvalidDomain { min, max });
        }
        Ok(Self { min, max, palette })
    }

    /// Domain spanning the smallest and largest of `values`.
    pub fn from_values(values: &[f64], palette: Palette) -> Result<Self> {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        Self::new(min, max, palette)
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Position of `value` in the domain, clamped to `[0, 1]`.
    ///
    /// A zero-width domain puts every value at the midpoint.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn color_for(&self, value: f64) -> Rgba<u8> {
        self.palette.sample(self.normalize(value))
    }

    /// `count` evenly spaced tick values from min to max inclusive.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![self.min],
            _ => {
                let step = (self.max - self.min) / (count - 1) as f64;
                (0..count).map(|i| self.min + step * i as f64).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#440154"), Some(Rgba([0x44, 0x01, 0x54, 255])));
        assert_eq!(parse_hex_color("ffffff80"), Some(Rgba([255, 255, 255, 0x80])));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_palette_endpoints() {
        let viridis = Palette::from_name("Viridis").unwrap();
        assert_eq!(viridis.sample(0.0), parse_hex_color("#440154").unwrap());
        assert_eq!(viridis.sample(1.0), parse_hex_color("#fde725").unwrap());

        let reversed = Palette::from_name("viridis_r").unwrap();
        assert_eq!(reversed.sample(0.0), viridis.sample(1.0));
    }

    #[test]
    fn test_every_named_palette_loads() {
        for name in Palette::NAMES {
            assert!(Palette::from_name(name).is_ok(), "{name}");
        }
        assert!(matches!(
            Palette::from_name("rainbow"),
            Err(ChoroplethError::UnknownPalette(_))
        ));
    }

    #[test]
    fn test_normalize_is_monotonic_and_clamped() {
        let scale = ColorScale::new(-10.0, 30.0, Palette::from_name("blues").unwrap()).unwrap();
        let mut previous = f64::NEG_INFINITY;
        for i in -50..=80 {
            let t = scale.normalize(i as f64);
            assert!(t >= previous);
            assert!((0.0..=1.0).contains(&t));
            previous = t;
        }
        assert_eq!(scale.color_for(-100.0), scale.color_for(-10.0));
        assert_eq!(scale.color_for(100.0), scale.color_for(30.0));
    }

    #[test]
    fn test_sequential_palette_darkens() {
        let scale = ColorScale::new(0.0, 1.0, Palette::from_name("greens").unwrap()).unwrap();
        let brightness = |c: Rgba<u8>| c[0] as u32 + c[1] as u32 + c[2] as u32;
        let mut previous = u32::MAX;
        for i in 0..=20 {
            let b = brightness(scale.color_for(i as f64 / 20.0));
            assert!(b <= previous);
            previous = b;
        }
    }

    #[test]
    fn test_invalid_domain() {
        let palette = Palette::from_name("reds").unwrap();
        assert!(ColorScale::new(5.0, 1.0, palette.clone()).is_err());
        assert!(ColorScale::new(f64::NAN, 1.0, palette.clone()).is_err());
        assert!(ColorScale::from_values(&[], palette).is_err());
    }

    #[test]
    fn test_zero_width_domain_uses_midpoint() {
        let palette = Palette::from_name("plasma").unwrap();
        let scale = ColorScale::from_values(&[3.0, 3.0], palette.clone()).unwrap();
        assert_eq!(scale.color_for(3.0), palette.sample(0.5));
    }

    #[test]
    fn test_ticks() {
        let scale = ColorScale::new(0.0, 100.0, Palette::from_name("magma").unwrap()).unwrap();
        assert_eq!(scale.ticks(5), vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert!(scale.ticks(0).is_empty());
    }
}
