use std::path::{Path, PathBuf};

use clap::{ArgAction, ArgGroup, Parser, ValueEnum};

use crate::color::{Colormap, MapMetric};
use crate::data::model::DataKind;
use crate::data::reshape::SignRestriction;
use crate::render::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dms2_logoplot",
    about = "Logo plots of amino-acid preferences, differential selection, fraction surviving, \
             differential preferences, or mutational effects",
    long_about = "Reads a per-site CSV table, validates and reshapes it into one letter stack per site, \
                  optionally adds per-site overlays, and writes a logo plot plus a run log. \
                  On failure the partial plot is removed and the error is written to the log.",
    version,
    after_help = "Example usage:\n    \
                  dms2_logoplot --prefs prefs.csv --name lib1 --outdir plots --stringency 2\n    \
                  dms2_logoplot --diffsel mutdiffsel.csv --name ab1 --restrictdiffsel positive \
                  --overlay rsa.csv RSA 'relative solvent accessibility'",
    group(
        ArgGroup::new("input")
            .required(true)
            .multiple(false)
            .args(["prefs", "diffsel", "fracsurvive", "diffprefs", "muteffects"])
    )
)]
pub struct Args {
    /// Amino-acid preferences: columns site, A, C, ..., Y (optionally *)
    #[arg(long, value_name = "CSV")]
    pub prefs: Option<PathBuf>,

    /// Mutation differential selection: columns site, wildtype, mutation, mutdiffsel
    #[arg(long, value_name = "CSV")]
    pub diffsel: Option<PathBuf>,

    /// Mutation fraction surviving: columns site, wildtype, mutation, mutfracsurvive
    #[arg(long, value_name = "CSV")]
    pub fracsurvive: Option<PathBuf>,

    /// Differential preferences: columns site, dpi_A, dpi_C, ..., dpi_Y
    #[arg(long, value_name = "CSV")]
    pub diffprefs: Option<PathBuf>,

    /// Mutational effects: columns site, wildtype, mutation, log2effect (or effect)
    #[arg(long, value_name = "CSV")]
    pub muteffects: Option<PathBuf>,

    /// Prefix for output files
    #[arg(long)]
    pub name: String,

    /// Output directory, created if needed
    #[arg(long, default_value = ".")]
    pub outdir: PathBuf,

    /// Plot file format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Sites per line
    #[arg(long, default_value_t = 70)]
    pub nperline: usize,

    /// Label every this many sites
    #[arg(long, default_value_t = 10)]
    pub numberevery: usize,

    /// Exclude stop codons
    #[arg(long)]
    pub excludestop: bool,

    /// Exponent applied to preferences before plotting (prefs only)
    #[arg(long, default_value_t = 1.0)]
    pub stringency: f64,

    /// Sort sites numerically rather than keeping input order
    #[arg(long, value_enum, default_value_t = YesNo::Yes)]
    pub sortsites: YesNo,

    /// Amino-acid property used to colour letters
    #[arg(long, value_enum, default_value_t)]
    pub mapmetric: MapMetric,

    /// Colour scale for continuous letter metrics (jet, viridis, coolwarm, greys)
    #[arg(long, default_value = "jet")]
    pub colormap: Colormap,

    /// Per-site overlay: CSV with columns site and SHORTNAME; may repeat up to 3 times
    #[arg(
        long,
        num_args = 3,
        value_names = ["FILE", "SHORTNAME", "LONGNAME"],
        action = ArgAction::Append
    )]
    pub overlay: Vec<String>,

    /// Colour scale for numeric overlays
    #[arg(long, default_value = "jet")]
    pub overlaycolormap: Colormap,

    /// Shade overlays behind the letters instead of drawing bars above them
    #[arg(long, value_enum, default_value_t = YesNo::No)]
    pub underlay: YesNo,

    /// Keep only positive or negative differential selection (diffsel only)
    #[arg(long, value_enum, default_value_t)]
    pub restrictdiffsel: SignRestriction,

    /// Y-axis limits for diffsel
    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true
    )]
    pub diffselrange: Option<Vec<f64>>,

    /// Y-axis maximum for fracsurvive
    #[arg(long)]
    pub fracsurvivemax: Option<f64>,

    /// Y-axis half height for diffprefs
    #[arg(long)]
    pub diffprefheight: Option<f64>,

    /// Scale bar of HEIGHT data units labelled LABEL (not for prefs)
    #[arg(long, num_args = 2, value_names = ["HEIGHT", "LABEL"])]
    pub scalebar: Option<Vec<String>>,

    /// Line at zero for signed plots
    #[arg(long, value_enum, default_value_t = YesNo::Yes)]
    pub sepline: YesNo,

    /// Drop unrecognised columns in wide input tables instead of failing
    #[arg(long = "ignore_extracols", value_enum, default_value_t = YesNo::No)]
    pub ignore_extracols: YesNo,

    /// Vertical scale factor for the letter stacks
    #[arg(long, default_value_t = 1.0)]
    pub letterheight: f64,

    /// Do nothing if the plot already exists
    #[arg(long = "use_existing", value_enum, default_value_t = YesNo::No)]
    pub use_existing: YesNo,
}

impl Args {
    /// The selected data kind and its input file.
    pub fn input(&self) -> Option<(DataKind, &Path)> {
        [
            (DataKind::Prefs, &self.prefs),
            (DataKind::Diffsel, &self.diffsel),
            (DataKind::Fracsurvive, &self.fracsurvive),
            (DataKind::Diffprefs, &self.diffprefs),
            (DataKind::Muteffects, &self.muteffects),
        ]
        .into_iter()
        .find_map(|(kind, path)| path.as_deref().map(|p| (kind, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_input_kind() {
        let args = Args::try_parse_from(["dms2_logoplot", "--diffsel", "x.csv", "--name", "n"])
            .unwrap();
        let (kind, path) = args.input().unwrap();
        assert_eq!(kind, DataKind::Diffsel);
        assert_eq!(path, Path::new("x.csv"));

        assert!(Args::try_parse_from(["dms2_logoplot", "--name", "n"]).is_err());
        assert!(Args::try_parse_from([
            "dms2_logoplot",
            "--prefs",
            "a.csv",
            "--diffsel",
            "b.csv",
            "--name",
            "n"
        ])
        .is_err());
    }

    #[test]
    fn defaults_and_multi_value_options() {
        let args = Args::try_parse_from([
            "dms2_logoplot",
            "--diffsel",
            "x.csv",
            "--name",
            "n",
            "--diffselrange",
            "-2",
            "3.5",
            "--overlay",
            "rsa.csv",
            "RSA",
            "solvent accessibility",
            "--overlay",
            "ss.csv",
            "SS",
            "secondary structure",
            "--mapmetric",
            "kd",
            "--colormap",
            "viridis",
            "--ignore_extracols",
            "yes",
        ])
        .unwrap();
        assert_eq!(args.nperline, 70);
        assert_eq!(args.numberevery, 10);
        assert!(args.sortsites.is_yes());
        assert_eq!(args.diffselrange, Some(vec![-2.0, 3.5]));
        assert_eq!(args.overlay.len(), 6);
        assert_eq!(args.mapmetric, MapMetric::Kd);
        assert_eq!(args.colormap, Colormap::Viridis);
        assert_eq!(args.restrictdiffsel, SignRestriction::All);
        assert!(args.ignore_extracols.is_yes());
        assert!(!args.use_existing.is_yes());
        assert_eq!(args.format, OutputFormat::Pdf);
    }

    #[test]
    fn unknown_colormap_is_rejected() {
        assert!(Args::try_parse_from([
            "dms2_logoplot",
            "--prefs",
            "p.csv",
            "--name",
            "n",
            "--colormap",
            "rainbow"
        ])
        .is_err());
    }
}
