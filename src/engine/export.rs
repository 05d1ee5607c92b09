//! Filtered CSV-ready extracts of the entry table.

use serde::{Deserialize, Serialize};

use crate::db::{EntryRow, UNKNOWN_LABEL};

/// Half-year split: S1 is months 1-6, S2 is months 7-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Semester {
    S1,
    S2,
}

impl Semester {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "S1" | "s1" => Some(Semester::S1),
            "S2" | "s2" => Some(Semester::S2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::S1 => "S1",
            Semester::S2 => "S2",
        }
    }

    fn contains(&self, month: u32) -> bool {
        match self {
            Semester::S1 => month <= 6,
            Semester::S2 => month > 6,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportFilter {
    pub site_id: Option<i64>,
    pub year: Option<i32>,
    pub semester: Option<Semester>,
}

/// One CSV row of the export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub id: i64,
    pub date: String,
    pub site: String,
    pub worker: String,
    pub hours: f64,
    pub material: f64,
    pub status: String,
}

impl ExportFilter {
    /// The year filter is a plain prefix match on the date string, so it
    /// applies even to dates that do not parse. The semester filter needs
    /// a month: an unparseable date fails it without aborting the scan.
    pub fn matches(&self, row: &EntryRow) -> bool {
        if let Some(site_id) = self.site_id {
            if row.site_id != site_id {
                return false;
            }
        }
        if let Some(year) = self.year {
            if !row.date.starts_with(&format!("{year:04}")) {
                return false;
            }
        }
        if let Some(semester) = self.semester {
            match month_of(&row.date) {
                Some(month) => {
                    if !semester.contains(month) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

fn month_of(date: &str) -> Option<u32> {
    let parsed = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(chrono::Datelike::month(&parsed))
}

pub fn build_rows(entries: &[EntryRow], filter: &ExportFilter) -> Vec<ExportRow> {
    entries
        .iter()
        .filter(|row| filter.matches(row))
        .map(|row| ExportRow {
            id: row.id,
            date: row.date.clone(),
            site: row
                .site_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            worker: row
                .user_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            hours: row.hours,
            material: row.material_cost,
            status: row.status.clone(),
        })
        .collect()
}

/// Deterministic attachment name built from the supplied filters:
/// `export_<site|global>[_<year>][_<semester>].csv`.
pub fn filename(filter: &ExportFilter, site_name: Option<&str>) -> String {
    let mut name = String::from("export_");

    match (filter.site_id, site_name) {
        (Some(_), Some(site_name)) => name.push_str(&slugify(site_name)),
        (Some(site_id), None) => name.push_str(&format!("site-{site_id}")),
        (None, _) => name.push_str("global"),
    }
    if let Some(year) = filter.year {
        name.push_str(&format!("_{year}"));
    }
    if let Some(semester) = filter.semester {
        name.push('_');
        name.push_str(semester.as_str());
    }
    name.push_str(".csv");
    name
}

fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("site");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, site_id: i64, date: &str) -> EntryRow {
        EntryRow {
            id,
            user_id: 1,
            site_id,
            date: date.to_string(),
            hours: 8.0,
            material_cost: 0.0,
            status: "PENDING".to_string(),
            created_by_id: None,
            user_name: Some("marc".to_string()),
            site_name: Some("Villa A".to_string()),
        }
    }

    #[test]
    fn semester_split_at_month_boundary() {
        let rows = vec![
            row(1, 1, "2024-06-30"),
            row(2, 1, "2024-07-01"),
        ];

        let s1 = ExportFilter {
            semester: Some(Semester::S1),
            ..Default::default()
        };
        let s2 = ExportFilter {
            semester: Some(Semester::S2),
            ..Default::default()
        };

        let first = build_rows(&rows, &s1);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, 1);

        let second = build_rows(&rows, &s2);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, 2);
    }

    #[test]
    fn unparseable_date_never_crashes() {
        let rows = vec![row(1, 1, "??-??"), row(2, 1, "2024-03-01")];

        // No filter: the bad row is included.
        let all = build_rows(&rows, &ExportFilter::default());
        assert_eq!(all.len(), 2);

        // Semester filters cannot place it, so it is excluded.
        let s1 = ExportFilter {
            semester: Some(Semester::S1),
            ..Default::default()
        };
        let filtered = build_rows(&rows, &s1);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 2);
    }

    #[test]
    fn year_filter_is_a_prefix_match() {
        let rows = vec![row(1, 1, "2023-12-31"), row(2, 1, "2024-01-01")];
        let filter = ExportFilter {
            year: Some(2024),
            ..Default::default()
        };
        let out = build_rows(&rows, &filter);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 2);
    }

    #[test]
    fn fallback_labels_for_missing_references() {
        let mut bad = row(1, 1, "2024-03-01");
        bad.user_name = None;
        bad.site_name = None;
        let out = build_rows(&[bad], &ExportFilter::default());
        assert_eq!(out[0].site, UNKNOWN_LABEL);
        assert_eq!(out[0].worker, UNKNOWN_LABEL);
    }

    #[test]
    fn filename_from_filters() {
        assert_eq!(filename(&ExportFilter::default(), None), "export_global.csv");

        let filter = ExportFilter {
            site_id: Some(3),
            year: Some(2024),
            semester: Some(Semester::S2),
        };
        assert_eq!(
            filename(&filter, Some("Villa A")),
            "export_villa-a_2024_S2.csv"
        );
        assert_eq!(filename(&filter, None), "export_site-3_2024_S2.csv");
    }
}
