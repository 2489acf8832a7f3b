use std::path::PathBuf;

use crate::cli::Args;
use crate::color::LetterColors;
use crate::data::model::DataKind;
use crate::data::overlay::{OverlaySpec, MAX_OVERLAYS};
use crate::data::reshape::{SignRestriction, YRange};
use crate::error::{LogoError, Result};
use crate::render::{OutputFormat, PlotStyle, ScaleBar};

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything one invocation needs, validated before any file is touched.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub kind: DataKind,
    pub input: PathBuf,
    pub name: String,
    pub outdir: PathBuf,
    pub format: OutputFormat,
    pub use_existing: bool,
    pub ignore_extracols: bool,
    pub exclude_stop: bool,
    pub stringency: f64,
    pub sort_sites: bool,
    pub restriction: SignRestriction,
    /// User-supplied y extent, if any.
    pub y_range: Option<YRange>,
    pub overlays: Vec<OverlaySpec>,
    pub style: PlotStyle,
}

impl PlotConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let (kind, input) = args.input().ok_or_else(|| {
            LogoError::invalid_option(
                "input",
                "none",
                "give one of --prefs, --diffsel, --fracsurvive, --diffprefs, --muteffects",
            )
        })?;

        if args.name.trim().is_empty() || args.name.contains(std::path::is_separator) {
            return Err(LogoError::invalid_option(
                "--name",
                &args.name,
                "must be a non-empty file name prefix",
            ));
        }
        positive("--nperline", args.nperline as f64)?;
        positive("--numberevery", args.numberevery as f64)?;
        positive("--letterheight", args.letterheight)?;
        positive("--stringency", args.stringency)?;
        if kind != DataKind::Prefs && args.stringency != 1.0 {
            return Err(LogoError::invalid_option(
                "--stringency",
                args.stringency,
                format!("only applies to prefs, not {kind}"),
            ));
        }
        if kind != DataKind::Diffsel && args.restrictdiffsel != SignRestriction::All {
            return Err(LogoError::invalid_option(
                "--restrictdiffsel",
                format!("{:?}", args.restrictdiffsel).to_lowercase(),
                format!("only applies to diffsel, not {kind}"),
            ));
        }

        let y_range = requested_range(args, kind)?;
        let overlays = overlay_specs(&args.overlay)?;
        let scalebar = scalebar(args.scalebar.as_deref(), kind)?;

        let style = PlotStyle {
            nperline: args.nperline,
            numberevery: args.numberevery,
            letter_colors: LetterColors::new(args.mapmetric, args.colormap),
            overlay_colormap: args.overlaycolormap,
            letterheight: args.letterheight,
            scalebar,
            sepline: args.sepline.is_yes(),
            underlay: args.underlay.is_yes(),
        };

        Ok(PlotConfig {
            kind,
            input: input.to_path_buf(),
            name: args.name.trim().to_string(),
            outdir: args.outdir.clone(),
            format: args.format,
            use_existing: args.use_existing.is_yes(),
            ignore_extracols: args.ignore_extracols.is_yes(),
            exclude_stop: args.excludestop,
            stringency: args.stringency,
            sort_sites: args.sortsites.is_yes(),
            restriction: args.restrictdiffsel,
            y_range,
            overlays,
            style,
        })
    }

    /// `<outdir>/<name>_logoplot.log`
    pub fn log_path(&self) -> PathBuf {
        self.outdir.join(format!("{}_logoplot.log", self.name))
    }

    /// `<outdir>/<name>_<kind>.<extension>`
    pub fn plot_path(&self, extension: &str) -> PathBuf {
        self.outdir
            .join(format!("{}_{}.{extension}", self.name, self.kind.as_str()))
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(LogoError::invalid_option(name, value, "must be greater than zero"))
    }
}

/// Map the kind-specific range options to one y extent.
fn requested_range(args: &Args, kind: DataKind) -> Result<Option<YRange>> {
    let given: Vec<&str> = [
        ("--diffselrange", args.diffselrange.is_some()),
        ("--fracsurvivemax", args.fracsurvivemax.is_some()),
        ("--diffprefheight", args.diffprefheight.is_some()),
    ]
    .into_iter()
    .filter(|(_, set)| *set)
    .map(|(name, _)| name)
    .collect();

    let allowed = match kind {
        DataKind::Diffsel => Some("--diffselrange"),
        DataKind::Fracsurvive => Some("--fracsurvivemax"),
        DataKind::Diffprefs => Some("--diffprefheight"),
        DataKind::Prefs | DataKind::Muteffects => None,
    };
    if let Some(bad) = given.iter().find(|name| Some(**name) != allowed) {
        return Err(LogoError::invalid_option(
            *bad,
            "given",
            format!("not valid for {kind}"),
        ));
    }

    let range = match kind {
        DataKind::Diffsel => match args.diffselrange.as_deref() {
            Some([min, max]) => Some(YRange {
                min: *min,
                max: *max,
            }),
            Some(other) => {
                return Err(LogoError::invalid_option(
                    "--diffselrange",
                    format!("{other:?}"),
                    "expected MIN MAX",
                ))
            }
            None => None,
        },
        DataKind::Fracsurvive => match args.fracsurvivemax {
            Some(max) => {
                positive("--fracsurvivemax", max)?;
                Some(YRange { min: 0.0, max })
            }
            None => None,
        },
        DataKind::Diffprefs => match args.diffprefheight {
            Some(h) => {
                positive("--diffprefheight", h)?;
                Some(YRange { min: -h, max: h })
            }
            None => None,
        },
        DataKind::Prefs | DataKind::Muteffects => None,
    };
    Ok(range)
}

fn overlay_specs(raw: &[String]) -> Result<Vec<OverlaySpec>> {
    if raw.len() % 3 != 0 {
        return Err(LogoError::invalid_option(
            "--overlay",
            raw.join(" "),
            "expected FILE SHORTNAME LONGNAME",
        ));
    }
    let specs: Vec<OverlaySpec> = raw
        .chunks(3)
        .map(|c| OverlaySpec {
            path: PathBuf::from(&c[0]),
            short_name: c[1].clone(),
            long_name: c[2].clone(),
        })
        .collect();
    if specs.len() > MAX_OVERLAYS {
        return Err(LogoError::invalid_option(
            "--overlay",
            specs.len(),
            format!("at most {MAX_OVERLAYS} overlays are supported"),
        ));
    }
    Ok(specs)
}

fn scalebar(raw: Option<&[String]>, kind: DataKind) -> Result<Option<ScaleBar>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if kind == DataKind::Prefs {
        return Err(LogoError::invalid_option(
            "--scalebar",
            raw.join(" "),
            "preferences are already on a fixed scale",
        ));
    }
    let [height, label] = raw else {
        return Err(LogoError::invalid_option(
            "--scalebar",
            raw.join(" "),
            "expected HEIGHT LABEL",
        ));
    };
    let height: f64 = height.parse().map_err(|_| {
        LogoError::invalid_option("--scalebar", height, "HEIGHT must be a number")
    })?;
    positive("--scalebar", height)?;
    Ok(Some(ScaleBar {
        height,
        label: label.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;

    fn config(extra: &[&str]) -> Result<PlotConfig> {
        let mut argv = vec!["dms2_logoplot", "--name", "run1", "--outdir", "out"];
        argv.extend_from_slice(extra);
        PlotConfig::from_args(&Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn builds_paths_and_style() {
        let cfg = config(&["--prefs", "p.csv", "--nperline", "50"]).unwrap();
        assert_eq!(cfg.kind, DataKind::Prefs);
        assert_eq!(cfg.format, OutputFormat::Pdf);
        assert_eq!(cfg.plot_path("pdf"), Path::new("out/run1_prefs.pdf"));
        assert_eq!(cfg.log_path(), Path::new("out/run1_logoplot.log"));
        assert_eq!(cfg.style.nperline, 50);
        assert!(cfg.style.sepline);
        assert!(!cfg.style.underlay);
        assert!(cfg.y_range.is_none());

        let cfg = config(&["--prefs", "p.csv", "--format", "svg"]).unwrap();
        assert_eq!(cfg.format, OutputFormat::Svg);
    }

    #[test]
    fn range_options_must_match_kind() {
        let cfg = config(&["--diffsel", "d.csv", "--diffselrange", "-1", "2"]).unwrap();
        assert_eq!(cfg.y_range, Some(YRange { min: -1.0, max: 2.0 }));

        assert!(config(&["--prefs", "p.csv", "--fracsurvivemax", "2"]).is_err());
        assert!(config(&["--fracsurvive", "f.csv", "--fracsurvivemax", "0"]).is_err());

        let cfg = config(&["--diffprefs", "d.csv", "--diffprefheight", "0.5"]).unwrap();
        assert_eq!(cfg.y_range, Some(YRange { min: -0.5, max: 0.5 }));
    }

    #[test]
    fn kind_specific_options_are_checked() {
        assert!(config(&["--diffsel", "d.csv", "--stringency", "2"]).is_err());
        assert!(config(&["--prefs", "p.csv", "--restrictdiffsel", "positive"]).is_err());
        assert!(config(&["--prefs", "p.csv", "--scalebar", "1", "one"]).is_err());
        assert!(config(&["--diffsel", "d.csv", "--scalebar", "x", "one"]).is_err());
        assert!(config(&["--prefs", "p.csv", "--nperline", "0"]).is_err());

        let cfg = config(&["--diffsel", "d.csv", "--scalebar", "2", "two units"]).unwrap();
        assert_eq!(
            cfg.style.scalebar,
            Some(ScaleBar {
                height: 2.0,
                label: "two units".to_string()
            })
        );
    }

    #[test]
    fn at_most_three_overlays() {
        let mut argv = vec!["--diffsel", "d.csv"];
        for _ in 0..4 {
            argv.extend_from_slice(&["--overlay", "o.csv", "X", "x"]);
        }
        assert!(config(&argv).is_err());

        let cfg = config(&["--diffsel", "d.csv", "--overlay", "o.csv", "RSA", "rsa"]).unwrap();
        assert_eq!(cfg.overlays.len(), 1);
        assert_eq!(cfg.overlays[0].short_name, "RSA");
    }
}
