use log::{debug, info};

use super::model::{DataKind, LogoMatrix};
use crate::alphabet::STOP;
use crate::error::{LogoError, Result};

/// How far a site's sum may drift from its expected total.
pub const SUM_TOLERANCE: f64 = 1e-3;

/// Slack allowed when checking values against bounds.
const BOUND_TOLERANCE: f64 = 1e-6;

/// Which side of a differential-selection stack to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SignRestriction {
    #[default]
    All,
    Positive,
    Negative,
}

/// Vertical extent of the letter stacks, in data units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

impl YRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Kind-specific sanity checks on freshly loaded values.
pub fn validate(matrix: &LogoMatrix) -> Result<()> {
    match matrix.kind {
        DataKind::Prefs => {
            for row in &matrix.rows {
                if let Some((symbol, v)) = row
                    .values
                    .iter()
                    .find(|(_, v)| **v < -BOUND_TOLERANCE || **v > 1.0 + BOUND_TOLERANCE)
                {
                    return Err(LogoError::site_values(
                        row.site.as_str(),
                        format!("preference for {symbol} is {v}, outside [0, 1]"),
                    ));
                }
                let total = row.total();
                if (total - 1.0).abs() > SUM_TOLERANCE {
                    return Err(LogoError::site_values(
                        row.site.as_str(),
                        format!("preferences sum to {total}, not 1"),
                    ));
                }
            }
        }
        DataKind::Diffprefs => {
            for row in &matrix.rows {
                let total = row.total();
                if total.abs() > SUM_TOLERANCE {
                    return Err(LogoError::site_values(
                        row.site.as_str(),
                        format!("differential preferences sum to {total}, not 0"),
                    ));
                }
            }
        }
        DataKind::Fracsurvive => {
            for row in &matrix.rows {
                if let Some((symbol, v)) = row.values.iter().find(|(_, v)| **v < 0.0) {
                    return Err(LogoError::site_values(
                        row.site.as_str(),
                        format!("fraction surviving for {symbol} is negative ({v})"),
                    ));
                }
            }
        }
        DataKind::Diffsel | DataKind::Muteffects => {}
    }
    Ok(())
}

/// Drop the stop symbol; preferences are renormalised to sum to one.
pub fn exclude_stop(matrix: &mut LogoMatrix) -> Result<()> {
    if !matrix.has_symbol(STOP) {
        return Ok(());
    }
    matrix.alphabet.retain(|c| *c != STOP);
    for row in &mut matrix.rows {
        row.values.remove(&STOP);
        if matrix.kind == DataKind::Prefs {
            let total = row.total();
            if total <= 0.0 {
                return Err(LogoError::site_values(
                    row.site.as_str(),
                    "no preference left after excluding stop codons",
                ));
            }
            for v in row.values.values_mut() {
                *v /= total;
            }
        }
    }
    info!("excluded stop codons from {} sites", matrix.len());
    Ok(())
}

/// Rescale preferences as `p^s / sum(p^s)`.
pub fn rescale_stringency(matrix: &mut LogoMatrix, stringency: f64) -> Result<()> {
    if !(stringency > 0.0 && stringency.is_finite()) {
        return Err(LogoError::invalid_option(
            "--stringency",
            stringency,
            "must be a positive number",
        ));
    }
    if matrix.kind != DataKind::Prefs {
        if stringency != 1.0 {
            return Err(LogoError::invalid_option(
                "--stringency",
                stringency,
                format!("only applies to prefs, not {}", matrix.kind),
            ));
        }
        return Ok(());
    }
    if stringency == 1.0 {
        return Ok(());
    }
    for row in &mut matrix.rows {
        for v in row.values.values_mut() {
            *v = (*v).max(0.0).powf(stringency);
        }
        let total = row.total();
        if total <= 0.0 {
            return Err(LogoError::site_values(
                row.site.as_str(),
                "all preferences are zero",
            ));
        }
        for v in row.values.values_mut() {
            *v /= total;
        }
    }
    info!("rescaled preferences by stringency {stringency}");
    Ok(())
}

/// Clip differential selection to one sign.
pub fn restrict_sign(matrix: &mut LogoMatrix, restriction: SignRestriction) -> Result<()> {
    if restriction == SignRestriction::All {
        return Ok(());
    }
    if matrix.kind != DataKind::Diffsel {
        return Err(LogoError::invalid_option(
            "--restrictdiffsel",
            format!("{restriction:?}").to_lowercase(),
            format!("only applies to diffsel, not {}", matrix.kind),
        ));
    }
    for row in &mut matrix.rows {
        for v in row.values.values_mut() {
            *v = match restriction {
                SignRestriction::Positive => (*v).max(0.0),
                SignRestriction::Negative => (*v).min(0.0),
                SignRestriction::All => *v,
            };
        }
    }
    info!("restricted differential selection to {restriction:?} values");
    Ok(())
}

/// Decide the y extent of the plot, checking any user-supplied range covers
/// every letter stack.
pub fn y_range(matrix: &LogoMatrix, requested: Option<YRange>) -> Result<YRange> {
    let pos = matrix.max_positive_stack();
    let neg = matrix.max_negative_stack();
    debug!("largest stacks: +{pos} / -{neg}");
    if !(pos.is_finite() && neg.is_finite()) {
        return Err(LogoError::Range(format!(
            "letter stacks must be finite, got +{pos} / -{neg}"
        )));
    }

    if matrix.kind == DataKind::Prefs {
        if requested.is_some() {
            return Err(LogoError::Range(
                "preferences always span [0, 1]; no range may be given".to_string(),
            ));
        }
        return Ok(YRange { min: 0.0, max: 1.0 });
    }

    let range = match requested {
        Some(r) => {
            if !(r.min.is_finite() && r.max.is_finite()) || r.min >= r.max {
                return Err(LogoError::Range(format!(
                    "[{}, {}] is not an increasing interval",
                    r.min, r.max
                )));
            }
            if r.min > 0.0 || r.max < 0.0 {
                return Err(LogoError::Range(format!(
                    "[{}, {}] does not contain zero",
                    r.min, r.max
                )));
            }
            if pos > r.max + BOUND_TOLERANCE || neg > -r.min + BOUND_TOLERANCE {
                return Err(LogoError::Range(format!(
                    "[{}, {}] does not cover the data, which spans [{}, {}]",
                    r.min, r.max, -neg, pos
                )));
            }
            r
        }
        None => match matrix.kind {
            DataKind::Diffprefs => {
                let h = pos.max(neg);
                YRange { min: -h, max: h }
            }
            DataKind::Fracsurvive => YRange { min: 0.0, max: pos },
            _ => YRange {
                min: -neg,
                max: pos,
            },
        },
    };

    if range.span() <= 0.0 {
        let widened = if matrix.kind.is_signed() {
            YRange {
                min: -1.0,
                max: 1.0,
            }
        } else {
            YRange { min: 0.0, max: 1.0 }
        };
        debug!("all values are zero, using {widened:?}");
        return Ok(widened);
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{SiteId, SiteRow};
    use std::collections::BTreeSet;

    fn matrix(kind: DataKind, rows: &[(&str, &[(char, f64)])]) -> LogoMatrix {
        let rows: Vec<SiteRow> = rows
            .iter()
            .map(|(site, vals)| SiteRow {
                site: SiteId::new(site),
                wildtype: None,
                values: vals.iter().cloned().collect(),
            })
            .collect();
        let alphabet: BTreeSet<char> = rows.iter().flat_map(|r| r.values.keys().cloned()).collect();
        LogoMatrix::new(kind, alphabet.into_iter().collect(), rows).unwrap()
    }

    #[test]
    fn prefs_must_sum_to_one() {
        let ok = matrix(DataKind::Prefs, &[("1", &[('A', 0.25), ('C', 0.75)])]);
        assert!(validate(&ok).is_ok());
        let bad = matrix(DataKind::Prefs, &[("1", &[('A', 0.25), ('C', 0.5)])]);
        assert!(matches!(validate(&bad), Err(LogoError::SiteValues { .. })));
    }

    #[test]
    fn diffprefs_must_sum_to_zero() {
        let bad = matrix(DataKind::Diffprefs, &[("1", &[('A', 0.25), ('C', -0.1)])]);
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn stringency_sharpens_preferences() {
        let mut m = matrix(DataKind::Prefs, &[("1", &[('A', 0.25), ('C', 0.75)])]);
        rescale_stringency(&mut m, 2.0).unwrap();
        let a = m.rows[0].values[&'A'];
        let c = m.rows[0].values[&'C'];
        assert!((a - 0.1).abs() < 1e-12);
        assert!((c - 0.9).abs() < 1e-12);

        let mut d = matrix(DataKind::Diffsel, &[("1", &[('A', 1.0)])]);
        assert!(rescale_stringency(&mut d, 2.0).is_err());
        assert!(rescale_stringency(&mut d, 1.0).is_ok());
        assert!(rescale_stringency(&mut m, 0.0).is_err());
    }

    #[test]
    fn excluding_stop_renormalises_prefs() {
        let mut m = matrix(
            DataKind::Prefs,
            &[("1", &[('*', 0.5), ('A', 0.25), ('C', 0.25)])],
        );
        exclude_stop(&mut m).unwrap();
        assert!(!m.has_symbol('*'));
        assert_eq!(m.rows[0].values[&'A'], 0.5);
        assert_eq!(m.rows[0].values.len(), 2);

        let mut only_stop = matrix(DataKind::Prefs, &[("1", &[('*', 1.0), ('A', 0.0)])]);
        assert!(exclude_stop(&mut only_stop).is_err());
    }

    #[test]
    fn restriction_clips_one_side() {
        let mut m = matrix(DataKind::Diffsel, &[("1", &[('A', 1.0), ('C', -2.0)])]);
        restrict_sign(&mut m, SignRestriction::Positive).unwrap();
        assert_eq!(m.rows[0].values[&'C'], 0.0);
        assert_eq!(m.rows[0].values[&'A'], 1.0);

        let mut f = matrix(DataKind::Fracsurvive, &[("1", &[('A', 1.0)])]);
        assert!(restrict_sign(&mut f, SignRestriction::Negative).is_err());
        assert!(restrict_sign(&mut f, SignRestriction::All).is_ok());
    }

    #[test]
    fn computed_and_requested_ranges() {
        let m = matrix(
            DataKind::Diffsel,
            &[
                ("1", &[('A', 1.0), ('C', -2.0)]),
                ("2", &[('A', 3.0), ('C', -0.5)]),
            ],
        );
        assert_eq!(y_range(&m, None).unwrap(), YRange { min: -2.0, max: 3.0 });

        let wide = YRange { min: -5.0, max: 5.0 };
        assert_eq!(y_range(&m, Some(wide)).unwrap(), wide);

        let narrow = YRange { min: -1.0, max: 5.0 };
        assert!(matches!(y_range(&m, Some(narrow)), Err(LogoError::Range(_))));

        let no_zero = YRange { min: 1.0, max: 5.0 };
        assert!(y_range(&m, Some(no_zero)).is_err());

        let dp = matrix(DataKind::Diffprefs, &[("1", &[('A', 0.3), ('C', -0.3)])]);
        assert_eq!(y_range(&dp, None).unwrap(), YRange { min: -0.3, max: 0.3 });

        let zeros = matrix(DataKind::Fracsurvive, &[("1", &[('A', 0.0)])]);
        assert_eq!(y_range(&zeros, None).unwrap(), YRange { min: 0.0, max: 1.0 });
    }

    #[test]
    fn infinite_stacks_have_no_range() {
        let m = matrix(DataKind::Muteffects, &[("1", &[('A', f64::INFINITY), ('C', -1.0)])]);
        assert!(matches!(y_range(&m, None), Err(LogoError::Range(_))));
    }
}
