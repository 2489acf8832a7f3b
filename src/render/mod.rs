//! Logo rendering.
//!
//! The pipeline hands a fully reshaped [`LogoPlot`] to a [`LogoRenderer`];
//! glyph layout, colouring, and row tiling live behind that trait. The page
//! is always built as SVG; the PDF renderer converts that document.

use std::path::Path;

use crate::color::{Colormap, LetterColors};
use crate::data::model::{LogoMatrix, OverlayTrack};
use crate::data::reshape::YRange;

pub mod logo_pdf;
pub mod logo_svg;

pub use logo_pdf::PdfLogoRenderer;
pub use logo_svg::SvgLogoRenderer;

/// `--format`: which renderer writes the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Pdf,
    Svg,
}

impl OutputFormat {
    pub fn renderer(self) -> Box<dyn LogoRenderer> {
        match self {
            OutputFormat::Pdf => Box::new(PdfLogoRenderer),
            OutputFormat::Svg => Box::new(SvgLogoRenderer),
        }
    }
}

/// `--scalebar HEIGHT LABEL`
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub height: f64,
    pub label: String,
}

/// Styling options that do not depend on the data.
#[derive(Debug, Clone)]
pub struct PlotStyle {
    /// Sites per row.
    pub nperline: usize,
    /// Label every Nth site.
    pub numberevery: usize,
    pub letter_colors: LetterColors,
    pub overlay_colormap: Colormap,
    /// Vertical scale factor for letter stacks.
    pub letterheight: f64,
    pub scalebar: Option<ScaleBar>,
    /// Draw a line at zero for signed plots.
    pub sepline: bool,
    /// Draw overlays as shading behind the letters instead of bars above.
    pub underlay: bool,
}

/// Everything a renderer needs for one plot.
#[derive(Debug, Clone, Copy)]
pub struct LogoPlot<'a> {
    pub matrix: &'a LogoMatrix,
    pub overlays: &'a [OverlayTrack],
    pub y_range: YRange,
    pub style: &'a PlotStyle,
}

pub trait LogoRenderer {
    /// File extension of the produced plot, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, plot: &LogoPlot<'_>, out: &Path) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_pick_their_extension() {
        assert_eq!(OutputFormat::default(), OutputFormat::Pdf);
        assert_eq!(OutputFormat::Pdf.renderer().extension(), "pdf");
        assert_eq!(OutputFormat::Svg.renderer().extension(), "svg");
    }
}
