use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::info;

use super::loader::Table;
use super::model::{LogoMatrix, OverlayTrack, OverlayValue, SiteId};
use crate::error::{LogoError, Result};

/// Most overlay tracks that fit above a logo row.
pub const MAX_OVERLAYS: usize = 3;

/// `--overlay FILE SHORTNAME LONGNAME`
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub path: PathBuf,
    pub short_name: String,
    pub long_name: String,
}

/// Per-site annotation read from an overlay CSV.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub short_name: String,
    pub long_name: String,
    pub values: BTreeMap<SiteId, OverlayValue>,
}

/// Read the `site` and `SHORTNAME` columns of an overlay file.
///
/// The column is numeric if every non-empty cell parses as a number,
/// otherwise every cell is kept as a category label.
pub fn load_overlay(spec: &OverlaySpec) -> Result<Overlay> {
    let table = Table::read(&spec.path)?;
    let cols = table.require(&["site", spec.short_name.as_str()])?;
    let (site_idx, value_idx) = (cols[0], cols[1]);

    let mut raw: BTreeMap<SiteId, String> = BTreeMap::new();
    for i in 0..table.records.len() {
        let site = table.cell(i, site_idx);
        if site.is_empty() {
            return Err(LogoError::overlay(
                &spec.short_name,
                format!("row {} has an empty site", i + 1),
            ));
        }
        let value = table.cell(i, value_idx);
        if raw.insert(SiteId::new(site), value.to_string()).is_some() {
            return Err(LogoError::overlay(
                &spec.short_name,
                format!("site {site} appears more than once"),
            ));
        }
    }

    let numeric = raw
        .values()
        .filter(|v| !v.is_empty())
        .all(|v| v.parse::<f64>().map(|x| x.is_finite()).unwrap_or(false));

    let values = raw
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(site, v)| {
            let value = match v.parse::<f64>() {
                Ok(x) if numeric => OverlayValue::Numeric(x),
                _ => OverlayValue::Category(v),
            };
            (site, value)
        })
        .collect();

    Ok(Overlay {
        short_name: spec.short_name.clone(),
        long_name: spec.long_name.clone(),
        values,
    })
}

/// Align overlays to the matrix site order.
///
/// Every overlay site must exist in the matrix; matrix sites missing from an
/// overlay are left blank.
pub fn merge_overlays(matrix: &LogoMatrix, overlays: Vec<Overlay>) -> Result<Vec<OverlayTrack>> {
    if overlays.len() > MAX_OVERLAYS {
        return Err(LogoError::invalid_option(
            "--overlay",
            overlays.len(),
            format!("at most {MAX_OVERLAYS} overlays are supported"),
        ));
    }
    let mut names = BTreeSet::new();
    for overlay in &overlays {
        if !names.insert(overlay.short_name.as_str()) {
            return Err(LogoError::overlay(
                &overlay.short_name,
                "short name used by more than one overlay",
            ));
        }
    }

    let mut tracks = Vec::with_capacity(overlays.len());
    for overlay in overlays {
        let unknown: Vec<&str> = overlay
            .values
            .keys()
            .filter(|site| matrix.position(site).is_none())
            .map(|site| site.as_str())
            .collect();
        if !unknown.is_empty() {
            return Err(LogoError::overlay(
                &overlay.short_name,
                format!("sites not in the data: {}", unknown.join(", ")),
            ));
        }

        let values: Vec<Option<OverlayValue>> = matrix
            .rows
            .iter()
            .map(|row| overlay.values.get(&row.site).cloned())
            .collect();
        let covered = values.iter().filter(|v| v.is_some()).count();
        info!(
            "overlay {} ({}) covers {covered} of {} sites",
            overlay.short_name,
            overlay.long_name,
            matrix.len()
        );
        tracks.push(OverlayTrack {
            short_name: overlay.short_name,
            long_name: overlay.long_name,
            values,
        });
    }
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{DataKind, SiteRow};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn spec_for(contents: &str, short: &str) -> (NamedTempFile, OverlaySpec) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let spec = OverlaySpec {
            path: file.path().to_path_buf(),
            short_name: short.to_string(),
            long_name: format!("{short} long"),
        };
        (file, spec)
    }

    fn three_sites() -> LogoMatrix {
        let rows = ["1", "2", "3"]
            .iter()
            .map(|s| SiteRow {
                site: SiteId::new(s),
                wildtype: None,
                values: [('A', 1.0)].into_iter().collect(),
            })
            .collect();
        LogoMatrix::new(DataKind::Diffsel, vec!['A'], rows).unwrap()
    }

    #[test]
    fn numeric_and_categorical_columns() {
        let (_f, spec) = spec_for("site,RSA,SS\n1,0.5,helix\n2,,strand\n", "RSA");
        let overlay = load_overlay(&spec).unwrap();
        assert_eq!(overlay.values.len(), 1);
        assert_eq!(
            overlay.values[&SiteId::new("1")],
            OverlayValue::Numeric(0.5)
        );

        let (_f, spec) = spec_for("site,RSA,SS\n1,0.5,helix\n2,,strand\n", "SS");
        let overlay = load_overlay(&spec).unwrap();
        assert_eq!(
            overlay.values[&SiteId::new("2")],
            OverlayValue::Category("strand".to_string())
        );
    }

    #[test]
    fn overlay_missing_column_or_duplicate_site() {
        let (_f, spec) = spec_for("site,RSA\n1,0.5\n", "SS");
        assert!(matches!(
            load_overlay(&spec),
            Err(LogoError::MissingColumns { .. })
        ));
        let (_f, spec) = spec_for("site,RSA\n1,0.5\n1,0.2\n", "RSA");
        assert!(matches!(load_overlay(&spec), Err(LogoError::Overlay { .. })));
    }

    #[test]
    fn merge_aligns_to_matrix_sites() {
        let m = three_sites();
        let (_f, spec) = spec_for("site,RSA\n3,0.1\n1,0.9\n", "RSA");
        let tracks = merge_overlays(&m, vec![load_overlay(&spec).unwrap()]).unwrap();
        assert_eq!(tracks.len(), 1);
        let vals: Vec<Option<f64>> = tracks[0]
            .values
            .iter()
            .map(|v| v.as_ref().and_then(|v| v.as_f64()))
            .collect();
        assert_eq!(vals, [Some(0.9), None, Some(0.1)]);
        assert!(tracks[0].is_numeric());
        assert_eq!(tracks[0].numeric_range(), Some((0.1, 0.9)));
    }

    #[test]
    fn merge_rejects_unknown_sites_and_name_clashes() {
        let m = three_sites();
        let (_f, spec) = spec_for("site,RSA\n4,0.1\n", "RSA");
        assert!(merge_overlays(&m, vec![load_overlay(&spec).unwrap()]).is_err());

        let (_f, spec) = spec_for("site,RSA\n1,0.1\n", "RSA");
        let a = load_overlay(&spec).unwrap();
        assert!(merge_overlays(&m, vec![a.clone(), a]).is_err());
    }
}
