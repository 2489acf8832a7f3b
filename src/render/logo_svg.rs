use std::path::Path;

use anyhow::Context;
use log::debug;
use svg::node::element::{Group, Line, Rectangle, Text};
use svg::Document;

use super::{LogoPlot, LogoRenderer};
use crate::color::{self, ColorMap, Colormap, Legend, Rgb};
use crate::data::model::{OverlayTrack, OverlayValue, SiteRow};

const SITE_WIDTH: f32 = 14.0;
/// Pixel height of a full y range at `letterheight` 1.
const STACK_HEIGHT: f32 = 120.0;
const MARGIN_LEFT: f32 = 110.0;
const MARGIN_RIGHT: f32 = 90.0;
const MARGIN_TOP: f32 = 20.0;
const TRACK_HEIGHT: f32 = 12.0;
const TRACK_GAP: f32 = 3.0;
const NUMBER_HEIGHT: f32 = 22.0;
const ROW_GAP: f32 = 24.0;
const LEGEND_LINE: f32 = 22.0;
const GLYPH_FONT_SIZE: f32 = 100.0;
/// Cap height of the bold sans glyphs at `GLYPH_FONT_SIZE`.
const GLYPH_CAP_HEIGHT: f32 = 72.0;
const FONT: &str = "Helvetica, Arial, sans-serif";
/// Letters shorter than this (in data units) are not drawn.
const MIN_LETTER: f64 = 1e-9;

/// Writes logo plots as SVG documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgLogoRenderer;

impl LogoRenderer for SvgLogoRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn render(&self, plot: &LogoPlot<'_>, out: &Path) -> anyhow::Result<()> {
        let doc = build_document(plot);
        svg::save(out, &doc).with_context(|| format!("writing {}", out.display()))?;
        debug!("wrote {}", out.display());
        Ok(())
    }
}

/// Vertical placement shared by every row.
struct RowGeometry {
    overlay_height: f32,
    panel_height: f32,
    px_per_unit: f32,
    row_height: f32,
}

impl RowGeometry {
    fn new(plot: &LogoPlot<'_>) -> Self {
        let n_tracks = if plot.style.underlay {
            0
        } else {
            plot.overlays.len()
        };
        let overlay_height = n_tracks as f32 * (TRACK_HEIGHT + TRACK_GAP);
        let panel_height = STACK_HEIGHT * plot.style.letterheight as f32;
        let px_per_unit = panel_height / plot.y_range.span() as f32;
        RowGeometry {
            overlay_height,
            panel_height,
            px_per_unit,
            row_height: overlay_height + panel_height + NUMBER_HEIGHT + ROW_GAP,
        }
    }
}

/// Lay out the whole plot as one SVG document.
pub fn build_document(plot: &LogoPlot<'_>) -> Document {
    let style = plot.style;
    let geom = RowGeometry::new(plot);
    let n_sites = plot.matrix.len();
    let nperline = style.nperline.max(1);
    let n_rows = n_sites.div_ceil(nperline);
    let sites_in_widest_row = n_sites.min(nperline);

    let width = MARGIN_LEFT + sites_in_widest_row as f32 * SITE_WIDTH + MARGIN_RIGHT;
    let legend_top = MARGIN_TOP + n_rows as f32 * geom.row_height;
    let n_legends = 1 + plot.overlays.len();
    let height = legend_top + n_legends as f32 * LEGEND_LINE + MARGIN_TOP;

    let mut doc = Document::new()
        .set("viewBox", (0, 0, width, height))
        .set("width", width)
        .set("height", height)
        .add(
            Rectangle::new()
                .set("x", 0)
                .set("y", 0)
                .set("width", width)
                .set("height", height)
                .set("fill", "#ffffff"),
        );

    let overlay_maps: Vec<OverlayColors> = plot
        .overlays
        .iter()
        .map(|t| OverlayColors::new(t, style.overlay_colormap))
        .collect();

    for row_idx in 0..n_rows {
        let first = row_idx * nperline;
        let last = (first + nperline).min(n_sites);
        let top = MARGIN_TOP + row_idx as f32 * geom.row_height;
        doc = doc.add(draw_row(plot, &geom, &overlay_maps, first..last, top));
    }

    doc = doc.add(draw_legends(plot, &overlay_maps, legend_top));
    doc
}

fn draw_row(
    plot: &LogoPlot<'_>,
    geom: &RowGeometry,
    overlay_maps: &[OverlayColors],
    sites: std::ops::Range<usize>,
    top: f32,
) -> Group {
    let style = plot.style;
    let y_range = plot.y_range;
    let panel_top = top + geom.overlay_height;
    let panel_bottom = panel_top + geom.panel_height;
    let zero_y = panel_top + y_range.max as f32 * geom.px_per_unit;
    let row_width = sites.len() as f32 * SITE_WIDTH;
    let mut group = Group::new();

    // Overlay bars above, or shading behind, the letters.
    if style.underlay {
        let band = geom.panel_height / plot.overlays.len().max(1) as f32;
        for (k, (track, colors)) in plot.overlays.iter().zip(overlay_maps).enumerate() {
            let band_top = panel_top + k as f32 * band;
            for (col, idx) in sites.clone().enumerate() {
                if let Some(value) = &track.values[idx] {
                    group = group.add(
                        Rectangle::new()
                            .set("x", MARGIN_LEFT + col as f32 * SITE_WIDTH)
                            .set("y", band_top)
                            .set("width", SITE_WIDTH)
                            .set("height", band)
                            .set("fill", color::hex(colors.color_for(value)))
                            .set("opacity", 0.3f32),
                    );
                }
            }
        }
    } else {
        for (k, (track, colors)) in plot.overlays.iter().zip(overlay_maps).enumerate() {
            let y = top + k as f32 * (TRACK_HEIGHT + TRACK_GAP);
            group = group.add(
                Text::new(track.long_name.clone())
                    .set("x", MARGIN_LEFT - 6.0)
                    .set("y", y + TRACK_HEIGHT - 2.0)
                    .set("text-anchor", "end")
                    .set("font-family", FONT)
                    .set("font-size", 10)
                    .set("fill", "#111827"),
            );
            for (col, idx) in sites.clone().enumerate() {
                if let Some(value) = &track.values[idx] {
                    group = group.add(
                        Rectangle::new()
                            .set("x", MARGIN_LEFT + col as f32 * SITE_WIDTH)
                            .set("y", y)
                            .set("width", SITE_WIDTH)
                            .set("height", TRACK_HEIGHT)
                            .set("fill", color::hex(colors.color_for(value))),
                    );
                }
            }
        }
    }

    group = group.add(draw_y_axis(plot, geom, panel_top, panel_bottom));

    if style.sepline && plot.matrix.kind.is_signed() {
        group = group.add(
            Line::new()
                .set("x1", MARGIN_LEFT)
                .set("y1", zero_y)
                .set("x2", MARGIN_LEFT + row_width)
                .set("y2", zero_y)
                .set("stroke", "#6b7280")
                .set("stroke-width", 0.75f32),
        );
    }

    for (col, idx) in sites.clone().enumerate() {
        let x = MARGIN_LEFT + col as f32 * SITE_WIDTH;
        let row = &plot.matrix.rows[idx];
        group = draw_stack(group, plot, row, x, zero_y, geom.px_per_unit);

        if col == 0 || idx % plot.style.numberevery.max(1) == 0 {
            group = group.add(
                Text::new(row.site.to_string())
                    .set("x", x + SITE_WIDTH / 2.0)
                    .set("y", panel_bottom + 14.0)
                    .set("text-anchor", "middle")
                    .set("font-family", FONT)
                    .set("font-size", 10)
                    .set("fill", "#111827"),
            );
        }
    }

    if let Some(bar) = &style.scalebar {
        let x = MARGIN_LEFT + row_width + 16.0;
        let bar_height = bar.height as f32 * geom.px_per_unit;
        group = group
            .add(
                Line::new()
                    .set("x1", x)
                    .set("y1", zero_y)
                    .set("x2", x)
                    .set("y2", zero_y - bar_height)
                    .set("stroke", "#111827")
                    .set("stroke-width", 2),
            )
            .add(
                Text::new(bar.label.clone())
                    .set("x", x + 5.0)
                    .set("y", zero_y - bar_height / 2.0 + 4.0)
                    .set("font-family", FONT)
                    .set("font-size", 10)
                    .set("fill", "#111827"),
            );
    }

    group
}

/// Stack positive values upward from zero with the largest on top, and
/// negative values downward with the most negative at the bottom.
fn draw_stack(
    mut group: Group,
    plot: &LogoPlot<'_>,
    row: &SiteRow,
    x: f32,
    zero_y: f32,
    px_per_unit: f32,
) -> Group {
    let (positive, negative) = stack_order(row);
    let colors = &plot.style.letter_colors;

    let mut cursor = zero_y;
    for (symbol, value) in positive {
        let h = value as f32 * px_per_unit;
        group = group.add(glyph(symbol, x, cursor, h, colors.color_for(symbol)));
        cursor -= h;
    }

    let mut cursor = zero_y;
    for (symbol, value) in negative {
        let h = -value as f32 * px_per_unit;
        cursor += h;
        group = group.add(glyph(symbol, x, cursor, h, colors.color_for(symbol)));
    }
    group
}

/// Symbols in drawing order away from the zero line: positives ascending,
/// negatives by ascending magnitude.
pub fn stack_order(row: &SiteRow) -> (Vec<(char, f64)>, Vec<(char, f64)>) {
    let mut positive: Vec<(char, f64)> = row
        .values
        .iter()
        .filter(|(_, v)| **v > MIN_LETTER)
        .map(|(c, v)| (*c, *v))
        .collect();
    positive.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut negative: Vec<(char, f64)> = row
        .values
        .iter()
        .filter(|(_, v)| **v < -MIN_LETTER)
        .map(|(c, v)| (*c, *v))
        .collect();
    negative.sort_by(|a, b| b.1.total_cmp(&a.1));
    (positive, negative)
}

/// A letter whose cap height is stretched to `height` pixels, sitting on
/// `baseline`.
fn glyph(symbol: char, x: f32, baseline: f32, height: f32, fill: Rgb) -> Text {
    let scale_y = height / GLYPH_CAP_HEIGHT;
    Text::new(symbol.to_string())
        .set("x", 0)
        .set("y", 0)
        .set("font-family", FONT)
        .set("font-weight", "bold")
        .set("font-size", GLYPH_FONT_SIZE)
        .set("textLength", SITE_WIDTH - 1.0)
        .set("lengthAdjust", "spacingAndGlyphs")
        .set("fill", color::hex(fill))
        .set(
            "transform",
            format!("translate({:.2},{:.2}) scale(1,{:.5})", x + 0.5, baseline, scale_y),
        )
}

fn draw_y_axis(
    plot: &LogoPlot<'_>,
    geom: &RowGeometry,
    panel_top: f32,
    panel_bottom: f32,
) -> Group {
    let y_range = plot.y_range;
    let axis_x = MARGIN_LEFT - 4.0;
    let mut group = Group::new().add(
        Line::new()
            .set("x1", axis_x)
            .set("y1", panel_top)
            .set("x2", axis_x)
            .set("y2", panel_bottom)
            .set("stroke", "#111827")
            .set("stroke-width", 1),
    );

    let step = nice_step(y_range.span() / 4.0);
    for tick in ticks(y_range.min, y_range.max, step) {
        let y = panel_top + (y_range.max - tick) as f32 * geom.px_per_unit;
        group = group
            .add(
                Line::new()
                    .set("x1", axis_x - 4.0)
                    .set("y1", y)
                    .set("x2", axis_x)
                    .set("y2", y)
                    .set("stroke", "#111827")
                    .set("stroke-width", 1),
            )
            .add(
                Text::new(format_tick(tick, step))
                    .set("x", axis_x - 6.0)
                    .set("y", y + 3.5)
                    .set("text-anchor", "end")
                    .set("font-family", FONT)
                    .set("font-size", 9)
                    .set("fill", "#111827"),
            );
    }

    let mid = (panel_top + panel_bottom) / 2.0;
    let label_x = axis_x - 34.0;
    group.add(
        Text::new(plot.matrix.kind.y_label())
            .set("x", label_x)
            .set("y", mid)
            .set("text-anchor", "middle")
            .set("font-family", FONT)
            .set("font-size", 10)
            .set("fill", "#111827")
            .set("transform", format!("rotate(-90 {label_x:.2} {mid:.2})")),
    )
}

/// Round a raw tick spacing to 1, 2 or 5 times a power of ten.
pub fn nice_step(raw: f64) -> f64 {
    if !(raw > 0.0 && raw.is_finite()) {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let nice = if norm < 1.5 {
        1.0
    } else if norm < 3.0 {
        2.0
    } else if norm < 7.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Multiples of `step` within `[min, max]`.
pub fn ticks(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite() && step.is_finite() && step > 0.0) {
        return Vec::new();
    }
    let first = (min / step - 1e-9).ceil() as i64;
    let last = (max / step + 1e-9).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil() as usize
    };
    let text = format!("{value:.decimals$}");
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// Overlay colouring and legends
// ---------------------------------------------------------------------------

enum OverlayColors {
    Numeric {
        colormap: Colormap,
        min: f64,
        max: f64,
    },
    Categorical(ColorMap),
}

impl OverlayColors {
    fn new(track: &OverlayTrack, colormap: Colormap) -> Self {
        if track.is_numeric() {
            let (min, max) = track.numeric_range().unwrap_or((0.0, 1.0));
            OverlayColors::Numeric { colormap, min, max }
        } else {
            OverlayColors::Categorical(ColorMap::new(&track.categories()))
        }
    }

    fn color_for(&self, value: &OverlayValue) -> Rgb {
        match (self, value) {
            (OverlayColors::Numeric { colormap, min, max }, OverlayValue::Numeric(v)) => {
                colormap.scaled(*v, *min, *max)
            }
            (OverlayColors::Categorical(map), OverlayValue::Category(c)) => map.color_for(c),
            _ => color::GREY,
        }
    }

    fn legend(&self, title: &str) -> Legend {
        match self {
            OverlayColors::Numeric { colormap, min, max } => Legend::Gradient {
                title: title.to_string(),
                colormap: *colormap,
                min: *min,
                max: *max,
            },
            OverlayColors::Categorical(map) => Legend::Categories(map.legend_entries()),
        }
    }
}

fn draw_legends(plot: &LogoPlot<'_>, overlay_maps: &[OverlayColors], top: f32) -> Group {
    let mut group = Group::new();
    let mut y = top;

    let letter_title = match &plot.style.letter_colors.legend {
        Legend::Gradient { title, .. } => title.clone(),
        Legend::Categories(_) => "letters".to_string(),
    };
    group = draw_legend(group, &letter_title, &plot.style.letter_colors.legend, y);
    y += LEGEND_LINE;

    for (track, colors) in plot.overlays.iter().zip(overlay_maps) {
        group = draw_legend(group, &track.long_name, &colors.legend(&track.long_name), y);
        y += LEGEND_LINE;
    }
    group
}

fn draw_legend(mut group: Group, title: &str, legend: &Legend, y: f32) -> Group {
    group = group.add(
        Text::new(title.to_string())
            .set("x", MARGIN_LEFT - 6.0)
            .set("y", y + 10.0)
            .set("text-anchor", "end")
            .set("font-family", FONT)
            .set("font-size", 10)
            .set("fill", "#111827"),
    );

    match legend {
        Legend::Categories(entries) => {
            let mut x = MARGIN_LEFT;
            for (label, c) in entries {
                group = group
                    .add(
                        Rectangle::new()
                            .set("x", x)
                            .set("y", y + 1.0)
                            .set("width", 10)
                            .set("height", 10)
                            .set("fill", color::hex(*c)),
                    )
                    .add(
                        Text::new(label.clone())
                            .set("x", x + 13.0)
                            .set("y", y + 10.0)
                            .set("font-family", FONT)
                            .set("font-size", 10)
                            .set("fill", "#111827"),
                    );
                x += 22.0 + 6.0 * label.chars().count() as f32;
            }
        }
        Legend::Gradient {
            colormap, min, max, ..
        } => {
            const STEPS: usize = 20;
            const STEP_WIDTH: f32 = 6.0;
            group = group.add(
                Text::new(format!("{min:.3}"))
                    .set("x", MARGIN_LEFT)
                    .set("y", y + 10.0)
                    .set("font-family", FONT)
                    .set("font-size", 9)
                    .set("fill", "#111827"),
            );
            let bar_x = MARGIN_LEFT + 40.0;
            for i in 0..STEPS {
                let t = i as f64 / (STEPS - 1) as f64;
                group = group.add(
                    Rectangle::new()
                        .set("x", bar_x + i as f32 * STEP_WIDTH)
                        .set("y", y + 1.0)
                        .set("width", STEP_WIDTH)
                        .set("height", 10)
                        .set("fill", color::hex(colormap.at(t))),
                );
            }
            group = group.add(
                Text::new(format!("{max:.3}"))
                    .set("x", bar_x + STEPS as f32 * STEP_WIDTH + 4.0)
                    .set("y", y + 10.0)
                    .set("font-family", FONT)
                    .set("font-size", 9)
                    .set("fill", "#111827"),
            );
        }
    }
    group
}
