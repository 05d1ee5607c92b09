//! Aggregation over raw entries: monthly time series plus a
//! year-over-year comparison of hours and material cost.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::Entry;

/// Number of trailing months kept in the history series.
const HISTORY_MONTHS: usize = 12;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthBucket {
    pub month: String,
    pub hours: f64,
    pub material: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YearComparison {
    pub hours_curr: f64,
    pub hours_last: f64,
    pub material_curr: f64,
    pub material_last: f64,
    pub hours_growth: f64,
    pub material_growth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_entries: usize,
    pub total_hours: f64,
    pub total_material: f64,
    pub active_sites: i64,
    pub history: Vec<MonthBucket>,
    pub comparison: YearComparison,
}

/// Percentage growth between two yearly totals, one decimal place.
/// Defined as 0 when the previous year is 0: this masks a genuinely
/// undefined growth figure, but keeps dashboards free of infinities.
fn growth(curr: f64, prev: f64) -> f64 {
    if prev == 0.0 {
        return 0.0;
    }
    ((curr - prev) / prev * 1000.0).round() / 10.0
}

/// Fold all entries into monthly buckets and yearly totals. Entries with
/// a date that does not parse as `YYYY-MM-DD` are skipped; they never
/// abort the scan.
pub fn compute_stats(entries: &[Entry], active_sites: i64, current_year: i32) -> Stats {
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut total_hours = 0.0;
    let mut total_material = 0.0;
    let mut curr = (0.0, 0.0);
    let mut prev = (0.0, 0.0);

    for entry in entries {
        let Some((year, month_key)) = parse_month(&entry.date) else {
            continue;
        };

        total_hours += entry.hours;
        total_material += entry.material_cost;

        let bucket = months.entry(month_key).or_insert((0.0, 0.0));
        bucket.0 += entry.hours;
        bucket.1 += entry.material_cost;

        if year == current_year {
            curr.0 += entry.hours;
            curr.1 += entry.material_cost;
        } else if year == current_year - 1 {
            prev.0 += entry.hours;
            prev.1 += entry.material_cost;
        }
    }

    let skip = months.len().saturating_sub(HISTORY_MONTHS);
    let history = months
        .into_iter()
        .skip(skip)
        .map(|(month, (hours, material))| MonthBucket {
            month,
            hours,
            material,
        })
        .collect();

    Stats {
        total_entries: entries.len(),
        total_hours,
        total_material,
        active_sites,
        history,
        comparison: YearComparison {
            hours_curr: curr.0,
            hours_last: prev.0,
            material_curr: curr.1,
            material_last: prev.1,
            hours_growth: growth(curr.0, prev.0),
            material_growth: growth(curr.1, prev.1),
        },
    }
}

/// Extract `(year, "YYYY-MM")` from an ISO date, None when malformed.
fn parse_month(date: &str) -> Option<(i32, String)> {
    let parsed = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some((
        chrono::Datelike::year(&parsed),
        date.get(..7)?.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, hours: f64, material: f64) -> Entry {
        Entry {
            id: 0,
            user_id: 1,
            site_id: 1,
            date: date.to_string(),
            hours,
            material_cost: material,
            status: "VALIDATED".to_string(),
            created_by_id: None,
        }
    }

    #[test]
    fn monthly_buckets_and_year_over_year_growth() {
        let entries = vec![
            entry("2024-01-15", 8.0, 0.0),
            entry("2024-01-20", 2.0, 0.0),
            entry("2023-01-10", 5.0, 0.0),
        ];

        let stats = compute_stats(&entries, 0, 2024);

        let jan = stats
            .history
            .iter()
            .find(|b| b.month == "2024-01")
            .expect("2024-01 bucket");
        assert_eq!(jan.hours, 10.0);
        assert_eq!(stats.comparison.hours_curr, 10.0);
        assert_eq!(stats.comparison.hours_last, 5.0);
        assert_eq!(stats.comparison.hours_growth, 100.0);
    }

    #[test]
    fn growth_is_zero_when_previous_year_empty() {
        let entries = vec![entry("2024-03-01", 8.0, 100.0)];
        let stats = compute_stats(&entries, 0, 2024);
        assert_eq!(stats.comparison.hours_growth, 0.0);
        assert_eq!(stats.comparison.material_growth, 0.0);
    }

    #[test]
    fn malformed_dates_are_skipped() {
        let entries = vec![
            entry("not-a-date", 8.0, 0.0),
            entry("2024-13-99", 4.0, 0.0),
            entry("2024-02-01", 6.0, 0.0),
        ];
        let stats = compute_stats(&entries, 0, 2024);
        assert_eq!(stats.total_hours, 6.0);
        assert_eq!(stats.history.len(), 1);
        // The raw entry count still reflects the full table.
        assert_eq!(stats.total_entries, 3);
    }

    #[test]
    fn history_keeps_last_twelve_months_ascending() {
        let mut entries = Vec::new();
        for year in [2023, 2024] {
            for month in 1..=12 {
                entries.push(entry(&format!("{year}-{month:02}-10"), 1.0, 0.0));
            }
        }
        let stats = compute_stats(&entries, 0, 2024);
        assert_eq!(stats.history.len(), 12);
        assert_eq!(stats.history.first().unwrap().month, "2024-01");
        assert_eq!(stats.history.last().unwrap().month, "2024-12");
    }
}
