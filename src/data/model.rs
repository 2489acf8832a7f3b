use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{LogoError, Result};

// ---------------------------------------------------------------------------
// DataKind – which experimental quantity the input holds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Prefs,
    Diffsel,
    Fracsurvive,
    Diffprefs,
    Muteffects,
}

impl DataKind {
    /// Suffix used for the output file name and in log messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Prefs => "prefs",
            DataKind::Diffsel => "diffsel",
            DataKind::Fracsurvive => "fracsurvive",
            DataKind::Diffprefs => "diffprefs",
            DataKind::Muteffects => "muteffects",
        }
    }

    pub fn y_label(&self) -> &'static str {
        match self {
            DataKind::Prefs => "preference",
            DataKind::Diffsel => "differential selection",
            DataKind::Fracsurvive => "fraction surviving",
            DataKind::Diffprefs => "differential preference",
            DataKind::Muteffects => "log2 mutational effect",
        }
    }

    /// Whether letter stacks may extend below zero.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataKind::Diffsel | DataKind::Diffprefs | DataKind::Muteffects
        )
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SiteId – a string site label with numeric-aware ordering
// ---------------------------------------------------------------------------

/// Site identifier as it appears in the input (`"52"`, `"52a"`, `"-3"`).
///
/// Ordered by the leading integer and then by the remaining suffix; labels
/// without a leading integer sort after every numbered site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteId {
    label: String,
    number: Option<i64>,
    suffix: String,
}

impl SiteId {
    pub fn new(label: &str) -> Self {
        let label = label.trim().to_string();
        let digits_end = label
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
            .map(|(i, _)| i)
            .unwrap_or(label.len());
        let number = label[..digits_end].parse::<i64>().ok();
        let suffix = match number {
            Some(_) => label[digits_end..].to_string(),
            None => label.clone(),
        };
        SiteId {
            label,
            number,
            suffix,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl PartialOrd for SiteId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SiteId {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_number = match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.suffix.cmp(&other.suffix)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.suffix.cmp(&other.suffix),
        };
        // "052" and "52" are distinct sites
        by_number.then_with(|| self.label.cmp(&other.label))
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

// ---------------------------------------------------------------------------
// LogoMatrix – one row per site, one value per symbol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SiteRow {
    pub site: SiteId,
    pub wildtype: Option<char>,
    /// symbol → letter height (may be negative for signed kinds).
    pub values: BTreeMap<char, f64>,
}

impl SiteRow {
    pub fn positive_sum(&self) -> f64 {
        self.values.values().filter(|v| **v > 0.0).sum()
    }

    /// Magnitude of the summed negative values.
    pub fn negative_sum(&self) -> f64 {
        -self.values.values().filter(|v| **v < 0.0).sum::<f64>()
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

/// The reshaped per-site, per-symbol table that gets plotted.
#[derive(Debug, Clone)]
pub struct LogoMatrix {
    pub kind: DataKind,
    /// Ordered symbols (amino acids, optionally `*`).
    pub alphabet: Vec<char>,
    pub rows: Vec<SiteRow>,
}

impl LogoMatrix {
    /// Build a matrix, rejecting empty tables and duplicated sites.
    pub fn new(kind: DataKind, alphabet: Vec<char>, rows: Vec<SiteRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(LogoError::Sites("no sites in input".to_string()));
        }
        let mut seen = BTreeSet::new();
        for row in &rows {
            if !seen.insert(row.site.clone()) {
                return Err(LogoError::Sites(format!("duplicate site {}", row.site)));
            }
        }
        Ok(LogoMatrix {
            kind,
            alphabet,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_symbol(&self, symbol: char) -> bool {
        self.alphabet.contains(&symbol)
    }

    pub fn position(&self, site: &SiteId) -> Option<usize> {
        self.rows.iter().position(|r| &r.site == site)
    }

    pub fn sort_sites(&mut self) {
        self.rows.sort_by(|a, b| a.site.cmp(&b.site));
    }

    /// Largest per-site sum of positive values.
    pub fn max_positive_stack(&self) -> f64 {
        self.rows
            .iter()
            .map(SiteRow::positive_sum)
            .fold(0.0, f64::max)
    }

    /// Largest per-site magnitude of negative values.
    pub fn max_negative_stack(&self) -> f64 {
        self.rows
            .iter()
            .map(SiteRow::negative_sum)
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// OverlayValue – a single per-site annotation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayValue {
    Numeric(f64),
    Category(String),
}

impl fmt::Display for OverlayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayValue::Numeric(v) => write!(f, "{v:.4}"),
            OverlayValue::Category(s) => write!(f, "{s}"),
        }
    }
}

impl OverlayValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OverlayValue::Numeric(v) => Some(*v),
            OverlayValue::Category(_) => None,
        }
    }
}

/// An overlay aligned to the site order of a [`LogoMatrix`].
#[derive(Debug, Clone)]
pub struct OverlayTrack {
    pub short_name: String,
    pub long_name: String,
    /// One entry per matrix row; `None` where the overlay has no value.
    pub values: Vec<Option<OverlayValue>>,
}

impl OverlayTrack {
    pub fn is_numeric(&self) -> bool {
        self.values
            .iter()
            .flatten()
            .all(|v| matches!(v, OverlayValue::Numeric(_)))
    }

    /// Min and max of the numeric values, if any.
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        let nums: Vec<f64> = self.values.iter().flatten().filter_map(|v| v.as_f64()).collect();
        if nums.is_empty() {
            return None;
        }
        let min = nums.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    pub fn categories(&self) -> BTreeSet<String> {
        self.values
            .iter()
            .flatten()
            .filter_map(|v| match v {
                OverlayValue::Category(s) => Some(s.clone()),
                OverlayValue::Numeric(_) => None,
            })
            .collect()
    }
}
