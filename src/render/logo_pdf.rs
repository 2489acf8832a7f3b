use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context};
use log::{debug, warn};
use svg2pdf::usvg;
use svg2pdf::{ConversionOptions, PageOptions};

use super::logo_svg::build_document;
use super::{LogoPlot, LogoRenderer};

/// Writes logo plots as single-page PDFs.
///
/// The page is laid out by the SVG builder and converted with `svg2pdf`, so
/// both outputs share one geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLogoRenderer;

impl LogoRenderer for PdfLogoRenderer {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, plot: &LogoPlot<'_>, out: &Path) -> anyhow::Result<()> {
        let pdf = to_pdf(&build_document(plot).to_string())?;
        fs::write(out, pdf).with_context(|| format!("writing {}", out.display()))?;
        debug!("wrote {}", out.display());
        Ok(())
    }
}

/// Convert an SVG document to PDF bytes, using the system fonts for text.
pub fn to_pdf(svg_text: &str) -> anyhow::Result<Vec<u8>> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    if options.fontdb.faces().next().is_none() {
        warn!("no system fonts found; letters and labels will be missing from the PDF");
    }

    let tree = usvg::Tree::from_str(svg_text, &options).context("parsing generated SVG")?;
    svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default())
        .map_err(|e| anyhow!("converting SVG to PDF: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_simple_document() {
        let svg = concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" "#,
            r#"width="40" height="20" viewBox="0 0 40 20">"#,
            r##"<rect x="0" y="0" width="40" height="20" fill="#ff0000"/>"##,
            "</svg>",
        );
        let pdf = to_pdf(svg).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn rejects_malformed_svg() {
        assert!(to_pdf("<svg").is_err());
    }
}
