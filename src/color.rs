use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::alphabet::{self, FunctionalGroup, STOP};
use crate::error::LogoError;

pub type Rgb = Srgb<u8>;

pub const BLACK: Rgb = Srgb::new(0, 0, 0);
pub const GREY: Rgb = Srgb::new(160, 160, 160);

/// `#rrggbb` for SVG attributes.
pub fn hex(c: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue)
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format::<u8>()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Continuous colour scales
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Jet,
    Viridis,
    Coolwarm,
    Greys,
}

impl Colormap {
    pub const NAMES: [&'static str; 4] = ["jet", "viridis", "coolwarm", "greys"];

    /// Control points as (position in [0, 1], sRGB).
    fn stops(&self) -> &'static [(f32, [f32; 3])] {
        match self {
            Colormap::Jet => &[
                (0.0, [0.0, 0.0, 0.5]),
                (0.125, [0.0, 0.0, 1.0]),
                (0.375, [0.0, 1.0, 1.0]),
                (0.625, [1.0, 1.0, 0.0]),
                (0.875, [1.0, 0.0, 0.0]),
                (1.0, [0.5, 0.0, 0.0]),
            ],
            Colormap::Viridis => &[
                (0.0, [0.267, 0.005, 0.329]),
                (0.25, [0.229, 0.322, 0.546]),
                (0.5, [0.128, 0.567, 0.551]),
                (0.75, [0.369, 0.789, 0.383]),
                (1.0, [0.993, 0.906, 0.144]),
            ],
            Colormap::Coolwarm => &[
                (0.0, [0.230, 0.299, 0.754]),
                (0.5, [0.865, 0.865, 0.865]),
                (1.0, [0.706, 0.016, 0.150]),
            ],
            Colormap::Greys => &[(0.0, [0.9, 0.9, 0.9]), (1.0, [0.1, 0.1, 0.1])],
        }
    }

    /// Colour at fraction `t` of the scale; `t` is clamped to [0, 1].
    pub fn at(&self, t: f64) -> Rgb {
        let t = if t.is_finite() {
            t.clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        let stops = self.stops();
        let upper = stops
            .iter()
            .position(|(p, _)| *p >= t)
            .unwrap_or(stops.len() - 1)
            .max(1);
        let (p0, c0) = stops[upper - 1];
        let (p1, c1) = stops[upper];
        let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
        let a: LinSrgb = Srgb::new(c0[0], c0[1], c0[2]).into_linear();
        let b: LinSrgb = Srgb::new(c1[0], c1[1], c1[2]).into_linear();
        Srgb::<f32>::from_linear(a.mix(b, f)).into_format::<u8>()
    }

    /// Colour for `value` on a scale spanning `[min, max]`.
    pub fn scaled(&self, value: f64, min: f64, max: f64) -> Rgb {
        if max > min {
            self.at((value - min) / (max - min))
        } else {
            self.at(0.5)
        }
    }
}

impl FromStr for Colormap {
    type Err = LogoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jet" => Ok(Colormap::Jet),
            "viridis" => Ok(Colormap::Viridis),
            "coolwarm" => Ok(Colormap::Coolwarm),
            "greys" | "grays" => Ok(Colormap::Greys),
            _ => Err(LogoError::invalid_option(
                "colormap",
                s,
                format!("expected one of {}", Colormap::NAMES.join(", ")),
            )),
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Colormap::Jet => "jet",
            Colormap::Viridis => "viridis",
            Colormap::Coolwarm => "coolwarm",
            Colormap::Greys => "greys",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category → colour
// ---------------------------------------------------------------------------

/// Maps category labels to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Rgb>,
    default_color: Rgb,
}

impl ColorMap {
    /// Build a colour map from the unique category labels.
    pub fn new(unique_values: &BTreeSet<String>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .collect();
        ColorMap {
            mapping,
            default_color: GREY,
        }
    }

    pub fn color_for(&self, value: &str) -> Rgb {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Legend entries (label → colour), in label order.
    pub fn legend_entries(&self) -> Vec<(String, Rgb)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.clone(), *c))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Letter colouring by amino-acid property
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MapMetric {
    /// Kyte-Doolittle hydrophobicity
    Kd,
    /// Molecular weight
    Mw,
    /// Side-chain charge
    Charge,
    /// Functional group
    #[default]
    #[value(name = "functionalgroup")]
    FunctionalGroup,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Legend {
    Categories(Vec<(String, Rgb)>),
    Gradient {
        title: String,
        colormap: Colormap,
        min: f64,
        max: f64,
    },
}

/// The colour of every symbol plus the legend describing it.
#[derive(Debug, Clone)]
pub struct LetterColors {
    colors: BTreeMap<char, Rgb>,
    pub legend: Legend,
}

impl LetterColors {
    pub fn new(metric: MapMetric, colormap: Colormap) -> Self {
        let continuous = |title: &str, f: fn(char) -> Option<f64>| {
            let values: Vec<(char, f64)> = alphabet::AMINO_ACIDS
                .iter()
                .filter_map(|aa| f(*aa).map(|v| (*aa, v)))
                .collect();
            let min = values.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
            let max = values.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
            let colors = values
                .iter()
                .map(|(aa, v)| (*aa, colormap.scaled(*v, min, max)))
                .collect();
            LetterColors {
                colors,
                legend: Legend::Gradient {
                    title: title.to_string(),
                    colormap,
                    min,
                    max,
                },
            }
        };

        match metric {
            MapMetric::Kd => continuous("hydrophobicity", alphabet::kyte_doolittle),
            MapMetric::Mw => continuous("molecular weight", alphabet::molecular_weight),
            MapMetric::Charge => continuous("charge", alphabet::charge),
            MapMetric::FunctionalGroup => {
                let palette = generate_palette(FunctionalGroup::ALL.len());
                let group_colors: BTreeMap<FunctionalGroup, Rgb> =
                    FunctionalGroup::ALL.into_iter().zip(palette).collect();
                let colors = alphabet::AMINO_ACIDS
                    .iter()
                    .filter_map(|aa| {
                        FunctionalGroup::of(*aa).map(|g| (*aa, group_colors[&g]))
                    })
                    .collect();
                let entries = FunctionalGroup::ALL
                    .iter()
                    .map(|g| (g.to_string(), group_colors[g]))
                    .collect();
                LetterColors {
                    colors,
                    legend: Legend::Categories(entries),
                }
            }
        }
    }

    /// Stop and unknown symbols are drawn in black.
    pub fn color_for(&self, symbol: char) -> Rgb {
        if symbol == STOP {
            return BLACK;
        }
        self.colors.get(&symbol).copied().unwrap_or(BLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_distinct() {
        let p = generate_palette(7);
        assert_eq!(p.len(), 7);
        let unique: BTreeSet<String> = p.iter().map(|c| hex(*c)).collect();
        assert_eq!(unique.len(), 7);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn colormap_endpoints_and_clamping() {
        let low = Colormap::Jet.at(0.0);
        assert_eq!((low.red, low.green), (0, 0));
        assert!((126..=129).contains(&low.blue));
        let high = Colormap::Jet.at(1.0);
        assert_eq!((high.green, high.blue), (0, 0));
        assert!((126..=129).contains(&high.red));
        assert_eq!(Colormap::Jet.at(-3.0), Colormap::Jet.at(0.0));
        assert_eq!(Colormap::Greys.at(2.0), Colormap::Greys.at(1.0));
        assert_eq!(Colormap::Viridis.scaled(5.0, 5.0, 5.0), Colormap::Viridis.at(0.5));
    }

    #[test]
    fn colormap_names_parse() {
        assert_eq!("JET".parse::<Colormap>().unwrap(), Colormap::Jet);
        assert_eq!("grays".parse::<Colormap>().unwrap(), Colormap::Greys);
        assert!("rainbow".parse::<Colormap>().is_err());
    }

    #[test]
    fn functional_groups_share_colours() {
        let lc = LetterColors::new(MapMetric::FunctionalGroup, Colormap::Jet);
        assert_eq!(lc.color_for('D'), lc.color_for('E'));
        assert_ne!(lc.color_for('D'), lc.color_for('K'));
        assert_eq!(lc.color_for('*'), BLACK);
        match lc.legend {
            Legend::Categories(entries) => assert_eq!(entries.len(), 7),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn charge_uses_scale_extremes() {
        let lc = LetterColors::new(MapMetric::Charge, Colormap::Coolwarm);
        assert_eq!(lc.color_for('D'), Colormap::Coolwarm.at(0.0));
        assert_eq!(lc.color_for('K'), Colormap::Coolwarm.at(1.0));
    }

    #[test]
    fn categorical_map_falls_back_to_grey() {
        let cats: BTreeSet<String> = ["helix", "strand"].iter().map(|s| s.to_string()).collect();
        let cm = ColorMap::new(&cats);
        assert_ne!(cm.color_for("helix"), cm.color_for("strand"));
        assert_eq!(cm.color_for("loop"), GREY);
        assert_eq!(cm.legend_entries().len(), 2);
    }
}
