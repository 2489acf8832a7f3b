use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::PlotConfig;
use crate::data::loader::load_matrix;
use crate::data::model::{LogoMatrix, OverlayTrack};
use crate::data::overlay::{load_overlay, merge_overlays};
use crate::data::reshape::{self, YRange};
use crate::render::{LogoPlot, LogoRenderer};

/// Reshaped data ready for rendering.
#[derive(Debug, Clone)]
pub struct PreparedPlot {
    pub matrix: LogoMatrix,
    pub overlays: Vec<OverlayTrack>,
    pub y_range: YRange,
}

/// The plot left by an earlier run, when `use_existing` says to keep it.
pub fn existing_plot(config: &PlotConfig, renderer: &dyn LogoRenderer) -> Option<PathBuf> {
    let plot_path = config.plot_path(renderer.extension());
    (config.use_existing && plot_path.exists()).then_some(plot_path)
}

/// Run the whole conversion: load, reshape, merge overlays, render.
///
/// Returns the written plot. On any failure the plot file is removed before
/// the error is returned.
pub fn run(config: &PlotConfig, renderer: &dyn LogoRenderer) -> Result<PathBuf> {
    let plot_path = config.plot_path(renderer.extension());
    fs::create_dir_all(&config.outdir)
        .with_context(|| format!("creating output directory {}", config.outdir.display()))?;

    match prepare(config).and_then(|prepared| render(config, renderer, &prepared, &plot_path)) {
        Ok(()) => {
            info!("wrote {} logo plot to {}", config.kind, plot_path.display());
            Ok(plot_path)
        }
        Err(e) => {
            remove_partial(&plot_path);
            Err(e)
        }
    }
}

/// Every data step before rendering.
pub fn prepare(config: &PlotConfig) -> Result<PreparedPlot> {
    info!("reading {} from {}", config.kind, config.input.display());
    let mut matrix = load_matrix(&config.input, config.kind, config.ignore_extracols)
        .with_context(|| format!("loading {}", config.input.display()))?;
    info!(
        "read {} sites with {} symbols",
        matrix.len(),
        matrix.alphabet.len()
    );

    reshape::validate(&matrix)?;
    if config.exclude_stop {
        reshape::exclude_stop(&mut matrix)?;
    }
    reshape::rescale_stringency(&mut matrix, config.stringency)?;
    reshape::restrict_sign(&mut matrix, config.restriction)?;
    if config.sort_sites {
        matrix.sort_sites();
    }

    let y_range = reshape::y_range(&matrix, config.y_range)?;
    info!("y axis spans [{:.4}, {:.4}]", y_range.min, y_range.max);

    let overlays = config
        .overlays
        .iter()
        .map(|spec| {
            load_overlay(spec).with_context(|| {
                format!("loading overlay {} from {}", spec.short_name, spec.path.display())
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let overlays = merge_overlays(&matrix, overlays)?;

    Ok(PreparedPlot {
        matrix,
        overlays,
        y_range,
    })
}

fn render(
    config: &PlotConfig,
    renderer: &dyn LogoRenderer,
    prepared: &PreparedPlot,
    plot_path: &Path,
) -> Result<()> {
    let plot = LogoPlot {
        matrix: &prepared.matrix,
        overlays: &prepared.overlays,
        y_range: prepared.y_range,
        style: &config.style,
    };
    renderer
        .render(&plot, plot_path)
        .with_context(|| format!("rendering {}", plot_path.display()))
}

fn remove_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => warn!("removed partial output {}", path.display()),
        Err(e) => warn!("could not remove partial output {}: {e}", path.display()),
    }
}
