use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::model::{DataKind, LogoMatrix, SiteId, SiteRow};
use crate::alphabet::{parse_symbol, AMINO_ACIDS, STOP};
use crate::error::{LogoError, Result};

/// Column-name prefix of differential-preference tables (`dpi_A`, ...).
pub const DIFFPREFS_PREFIX: &str = "dpi_";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an input table and reshape it into a [`LogoMatrix`].  Dispatch by kind.
///
/// * `prefs`, `diffprefs` – wide tables, one column per amino acid
/// * `diffsel`, `fracsurvive`, `muteffects` – long tables, one row per mutation
pub fn load_matrix(path: &Path, kind: DataKind, ignore_extracols: bool) -> Result<LogoMatrix> {
    match kind {
        DataKind::Prefs | DataKind::Diffprefs => load_wide(path, kind, ignore_extracols),
        DataKind::Diffsel => pivot_long(path, kind, read_records::<DiffselRecord>(path)?),
        DataKind::Fracsurvive => {
            pivot_long(path, kind, read_records::<FracsurviveRecord>(path)?)
        }
        DataKind::Muteffects => {
            pivot_long(path, kind, read_records::<MuteffectsRecord>(path)?)
        }
    }
}

// ---------------------------------------------------------------------------
// Plain CSV table
// ---------------------------------------------------------------------------

/// A CSV file held as raw strings, header plus records.
#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| LogoError::csv(path, e))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| LogoError::csv(path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| LogoError::csv(path, e))?;
        debug!("read {} rows from {}", records.len(), path.display());
        Ok(Table {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Indices of the named columns, or an error listing every missing one.
    pub fn require(&self, names: &[&str]) -> Result<Vec<usize>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.column(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LogoError::MissingColumns {
                path: self.path.clone(),
                columns: missing,
            });
        }
        Ok(names.iter().filter_map(|n| self.column(n)).collect())
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.records[row].get(col).unwrap_or("").trim()
    }

    /// Parse a cell as a finite number; anything else is an error.
    pub fn number(&self, row: usize, col: usize) -> Result<f64> {
        let raw = self.cell(row, col);
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(LogoError::NotANumber {
                path: self.path.clone(),
                row: row + 1,
                column: self.headers[col].clone(),
                value: raw.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Wide tables (prefs, diffprefs)
// ---------------------------------------------------------------------------

fn load_wide(path: &Path, kind: DataKind, ignore_extracols: bool) -> Result<LogoMatrix> {
    let table = Table::read(path)?;
    let prefix = if kind == DataKind::Diffprefs {
        DIFFPREFS_PREFIX
    } else {
        ""
    };

    let site_idx = table.require(&["site"])?[0];
    let wildtype_idx = table.column("wildtype");

    let mut symbol_cols: Vec<(char, usize)> = Vec::new();
    let mut extra: Vec<String> = Vec::new();
    for (idx, header) in table.headers.iter().enumerate() {
        if idx == site_idx || Some(idx) == wildtype_idx {
            continue;
        }
        let symbol = header
            .strip_prefix(prefix)
            .filter(|s| s.chars().count() == 1)
            .and_then(parse_symbol)
            .filter(|c| header.ends_with(*c));
        match symbol {
            Some(c) => symbol_cols.push((c, idx)),
            None => extra.push(header.clone()),
        }
    }

    let missing: Vec<String> = AMINO_ACIDS
        .iter()
        .filter(|aa| !symbol_cols.iter().any(|(c, _)| c == *aa))
        .map(|aa| format!("{prefix}{aa}"))
        .collect();
    if !missing.is_empty() {
        return Err(LogoError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }
    if !extra.is_empty() {
        if !ignore_extracols {
            return Err(LogoError::ExtraColumns {
                path: path.to_path_buf(),
                columns: extra,
            });
        }
        warn!("ignoring extra columns in {}: {}", path.display(), extra.join(", "));
    }

    let mut alphabet = AMINO_ACIDS.to_vec();
    if symbol_cols.iter().any(|(c, _)| *c == STOP) {
        alphabet.push(STOP);
    }

    let mut rows = Vec::with_capacity(table.records.len());
    for i in 0..table.records.len() {
        let site = table.cell(i, site_idx);
        if site.is_empty() {
            return Err(LogoError::Sites(format!(
                "{}, row {}: empty site",
                path.display(),
                i + 1
            )));
        }
        let wildtype = match wildtype_idx {
            Some(col) => Some(parse_symbol(table.cell(i, col)).ok_or_else(|| {
                LogoError::Symbol {
                    site: site.to_string(),
                    symbol: table.cell(i, col).to_string(),
                }
            })?),
            None => None,
        };
        let mut values = BTreeMap::new();
        for &(symbol, col) in &symbol_cols {
            values.insert(symbol, table.number(i, col)?);
        }
        rows.push(SiteRow {
            site: SiteId::new(site),
            wildtype,
            values,
        });
    }

    LogoMatrix::new(kind, alphabet, rows)
}

// ---------------------------------------------------------------------------
// Long tables (diffsel, fracsurvive, muteffects)
// ---------------------------------------------------------------------------

/// One mutation of a long-format table after value-column resolution.
#[derive(Debug, Clone)]
struct MutationRow {
    site: String,
    wildtype: String,
    mutation: String,
    value: Option<f64>,
}

/// A long-format row type with the columns it needs to find in the header.
trait LongRecord: DeserializeOwned {
    /// Columns that must all be present.
    const REQUIRED: &'static [&'static str];

    fn check_header(path: &Path, headers: &StringRecord) -> Result<()> {
        let missing: Vec<String> = Self::REQUIRED
            .iter()
            .filter(|c| !headers.iter().any(|h| h.trim() == **c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LogoError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing,
            })
        }
    }

    fn into_row(self) -> Result<MutationRow>;
}

#[derive(Debug, Deserialize)]
struct DiffselRecord {
    site: String,
    wildtype: String,
    mutation: String,
    mutdiffsel: Option<f64>,
}

impl LongRecord for DiffselRecord {
    const REQUIRED: &'static [&'static str] = &["site", "wildtype", "mutation", "mutdiffsel"];

    fn into_row(self) -> Result<MutationRow> {
        Ok(MutationRow {
            site: self.site,
            wildtype: self.wildtype,
            mutation: self.mutation,
            value: self.mutdiffsel,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FracsurviveRecord {
    site: String,
    wildtype: String,
    mutation: String,
    mutfracsurvive: Option<f64>,
}

impl LongRecord for FracsurviveRecord {
    const REQUIRED: &'static [&'static str] = &["site", "wildtype", "mutation", "mutfracsurvive"];

    fn into_row(self) -> Result<MutationRow> {
        Ok(MutationRow {
            site: self.site,
            wildtype: self.wildtype,
            mutation: self.mutation,
            value: self.mutfracsurvive,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MuteffectsRecord {
    site: String,
    wildtype: String,
    mutation: String,
    #[serde(default)]
    log2effect: Option<f64>,
    #[serde(default)]
    effect: Option<f64>,
}

impl LongRecord for MuteffectsRecord {
    const REQUIRED: &'static [&'static str] = &["site", "wildtype", "mutation"];

    fn check_header(path: &Path, headers: &StringRecord) -> Result<()> {
        let mut missing: Vec<String> = Self::REQUIRED
            .iter()
            .filter(|c| !headers.iter().any(|h| h.trim() == **c))
            .map(|c| c.to_string())
            .collect();
        if !headers
            .iter()
            .any(|h| matches!(h.trim(), "log2effect" | "effect"))
        {
            missing.push("log2effect (or effect)".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LogoError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing,
            })
        }
    }

    fn into_row(self) -> Result<MutationRow> {
        let value = match (self.log2effect, self.effect) {
            (Some(l), _) => Some(l),
            (None, Some(e)) if e.is_nan() => None,
            (None, Some(e)) if e > 0.0 => Some(e.log2()),
            (None, Some(e)) => {
                return Err(LogoError::site_values(
                    self.site,
                    format!("mutation {} has non-positive effect {e}", self.mutation),
                ))
            }
            (None, None) => None,
        };
        Ok(MutationRow {
            site: self.site,
            wildtype: self.wildtype,
            mutation: self.mutation,
            value,
        })
    }
}

fn read_records<R: LongRecord>(path: &Path) -> Result<Vec<MutationRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| LogoError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| LogoError::csv(path, e))?.clone();
    R::check_header(path, &headers)?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<R>() {
        let record = result.map_err(|e| LogoError::csv(path, e))?;
        rows.push(record.into_row()?);
    }
    debug!("read {} mutations from {}", rows.len(), path.display());
    Ok(rows)
}

/// Pivot one-row-per-mutation records into one row per site.
///
/// Missing values and unlisted mutations become 0, as does the wildtype.
/// Infinite values are rejected.
fn pivot_long(path: &Path, kind: DataKind, records: Vec<MutationRow>) -> Result<LogoMatrix> {
    let mut order: Vec<SiteId> = Vec::new();
    let mut by_site: HashMap<SiteId, (char, BTreeMap<char, f64>)> = HashMap::new();
    let mut has_stop = false;

    for rec in records {
        if rec.site.is_empty() {
            return Err(LogoError::Sites(format!("{}: empty site", path.display())));
        }
        let site = SiteId::new(&rec.site);
        let wildtype = parse_symbol(&rec.wildtype).ok_or_else(|| LogoError::Symbol {
            site: rec.site.clone(),
            symbol: rec.wildtype.clone(),
        })?;
        let mutation = parse_symbol(&rec.mutation).ok_or_else(|| LogoError::Symbol {
            site: rec.site.clone(),
            symbol: rec.mutation.clone(),
        })?;
        has_stop |= wildtype == STOP || mutation == STOP;

        let entry = by_site.entry(site.clone()).or_insert_with(|| {
            order.push(site.clone());
            (wildtype, BTreeMap::new())
        });
        if entry.0 != wildtype {
            return Err(LogoError::site_values(
                rec.site,
                format!("conflicting wildtypes {} and {}", entry.0, wildtype),
            ));
        }
        let value = match rec.value {
            Some(v) if v.is_finite() => v,
            Some(v) if v.is_nan() => 0.0,
            Some(v) => {
                return Err(LogoError::site_values(
                    rec.site,
                    format!("mutation {mutation} has non-finite value {v}"),
                ))
            }
            None => 0.0,
        };
        if entry.1.insert(mutation, value).is_some() {
            return Err(LogoError::site_values(
                rec.site,
                format!("mutation {mutation} listed more than once"),
            ));
        }
    }

    let mut alphabet = AMINO_ACIDS.to_vec();
    if has_stop {
        alphabet.push(STOP);
    }

    let mut rows = Vec::with_capacity(order.len());
    for site in order {
        let Some((wildtype, listed)) = by_site.remove(&site) else {
            continue;
        };
        let mut values: BTreeMap<char, f64> = alphabet.iter().map(|c| (*c, 0.0)).collect();
        for (symbol, v) in listed {
            values.insert(symbol, v);
        }
        values.insert(wildtype, 0.0);
        rows.push(SiteRow {
            site,
            wildtype: Some(wildtype),
            values,
        });
    }

    LogoMatrix::new(kind, alphabet, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn prefs_header(extra: &str) -> String {
        let aas: Vec<String> = AMINO_ACIDS.iter().map(|c| c.to_string()).collect();
        format!("site,{}{}\n", aas.join(","), extra)
    }

    fn uniform_row(site: &str) -> String {
        let vals = vec!["0.05"; 20];
        format!("{site},{}", vals.join(","))
    }

    #[test]
    fn loads_wide_prefs() {
        let text = format!(
            "{}{}\n{}\n",
            prefs_header(""),
            uniform_row("2"),
            uniform_row("1")
        );
        let file = csv_file(&text);
        let m = load_matrix(file.path(), DataKind::Prefs, false).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.alphabet.len(), 20);
        assert_eq!(m.rows[0].site.as_str(), "2");
        assert_eq!(m.rows[0].values[&'W'], 0.05);
        assert_eq!(m.rows[0].wildtype, None);
    }

    #[test]
    fn wide_table_reports_missing_and_extra_columns() {
        let file = csv_file("site,A,C\n1,0.5,0.5\n");
        match load_matrix(file.path(), DataKind::Prefs, false) {
            Err(LogoError::MissingColumns { columns, .. }) => {
                assert_eq!(columns.len(), 18);
                assert!(columns.contains(&"W".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }

        let text = format!("{}{},0.3\n", prefs_header(",entropy"), uniform_row("1"));
        let file = csv_file(&text);
        assert!(matches!(
            load_matrix(file.path(), DataKind::Prefs, false),
            Err(LogoError::ExtraColumns { .. })
        ));
        let m = load_matrix(file.path(), DataKind::Prefs, true).unwrap();
        assert_eq!(m.rows[0].values.len(), 20);
    }

    #[test]
    fn diffprefs_prefix_is_stripped() {
        let aas: Vec<String> = AMINO_ACIDS.iter().map(|c| format!("dpi_{c}")).collect();
        let mut vals = vec!["0"; 20];
        vals[0] = "0.2";
        vals[1] = "-0.2";
        let text = format!("site,{}\n7,{}\n", aas.join(","), vals.join(","));
        let file = csv_file(&text);
        let m = load_matrix(file.path(), DataKind::Diffprefs, false).unwrap();
        assert_eq!(m.rows[0].values[&'A'], 0.2);
        assert_eq!(m.rows[0].values[&'C'], -0.2);
    }

    #[test]
    fn non_numeric_cell_names_row_and_column() {
        let row = uniform_row("1").replace("0.05,0.05", "x,0.05");
        let text = format!("{}{}\n", prefs_header(""), row);
        let file = csv_file(&text);
        match load_matrix(file.path(), DataKind::Prefs, false) {
            Err(LogoError::NotANumber { row, column, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "A");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pivots_long_diffsel() {
        let file = csv_file(
            "site,wildtype,mutation,mutdiffsel\n\
             5,K,R,1.5\n\
             5,K,*,-0.5\n\
             5,K,K,\n\
             3,M,A,0.25\n",
        );
        let m = load_matrix(file.path(), DataKind::Diffsel, false).unwrap();
        assert!(m.has_symbol('*'));
        assert_eq!(m.len(), 2);
        let five = &m.rows[0];
        assert_eq!(five.site.as_str(), "5");
        assert_eq!(five.wildtype, Some('K'));
        assert_eq!(five.values[&'R'], 1.5);
        assert_eq!(five.values[&'*'], -0.5);
        assert_eq!(five.values[&'K'], 0.0);
        assert_eq!(five.values[&'W'], 0.0);
        assert_eq!(m.rows[1].values.len(), 21);
    }

    #[test]
    fn long_table_rejects_conflicts() {
        let file = csv_file("site,wildtype,mutation,mutdiffsel\n1,K,R,1\n1,A,C,2\n");
        assert!(matches!(
            load_matrix(file.path(), DataKind::Diffsel, false),
            Err(LogoError::SiteValues { .. })
        ));

        let file = csv_file("site,wildtype,mutation,mutfracsurvive\n1,K,R,0.1\n1,K,R,0.2\n");
        assert!(matches!(
            load_matrix(file.path(), DataKind::Fracsurvive, false),
            Err(LogoError::SiteValues { .. })
        ));

        let file = csv_file("site,wildtype,mutation,mutdiffsel\n1,K,Xaa,1\n");
        assert!(matches!(
            load_matrix(file.path(), DataKind::Diffsel, false),
            Err(LogoError::Symbol { .. })
        ));

        let file = csv_file("site,wildtype,mutation\n1,K,R\n");
        assert!(matches!(
            load_matrix(file.path(), DataKind::Diffsel, false),
            Err(LogoError::MissingColumns { .. })
        ));
    }

    #[test]
    fn long_table_rejects_infinite_values() {
        let file = csv_file("site,wildtype,mutation,mutdiffsel\n1,M,A,inf\n1,M,C,-0.5\n");
        match load_matrix(file.path(), DataKind::Diffsel, false) {
            Err(LogoError::SiteValues { site, message }) => {
                assert_eq!(site, "1");
                assert!(message.contains("non-finite"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let file = csv_file("site,wildtype,mutation,mutfracsurvive\n1,M,A,-inf\n");
        assert!(load_matrix(file.path(), DataKind::Fracsurvive, false).is_err());

        let file = csv_file("site,wildtype,mutation,effect\n1,M,A,inf\n");
        assert!(load_matrix(file.path(), DataKind::Muteffects, false).is_err());

        let file = csv_file("site,wildtype,mutation,mutdiffsel\n1,M,A,NaN\n");
        let m = load_matrix(file.path(), DataKind::Diffsel, false).unwrap();
        assert_eq!(m.rows[0].values[&'A'], 0.0);
    }

    #[test]
    fn muteffects_falls_back_to_linear_effect() {
        let file = csv_file("site,wildtype,mutation,effect\n1,K,R,4\n1,K,A,0.5\n");
        let m = load_matrix(file.path(), DataKind::Muteffects, false).unwrap();
        assert_eq!(m.rows[0].values[&'R'], 2.0);
        assert_eq!(m.rows[0].values[&'A'], -1.0);

        let file = csv_file("site,wildtype,mutation,effect\n1,K,R,0\n");
        assert!(load_matrix(file.path(), DataKind::Muteffects, false).is_err());

        let file = csv_file("site,wildtype,mutation,score\n1,K,R,1\n");
        assert!(matches!(
            load_matrix(file.path(), DataKind::Muteffects, false),
            Err(LogoError::MissingColumns { .. })
        ));
    }
}
