use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};

use crate::text::to_pascal_case;

use super::filter::FilteredView;
use super::model::Dataset;
use super::DataError;

// ---------------------------------------------------------------------------
// Category counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

/// Count occurrences of each value in one column of a view.
///
/// Values are normalized to Pascal Case before grouping, so `vaccination`
/// and `Vaccination` land in the same bucket; missing and null cells group
/// under `Unknown`. The result is ordered descending by count, ties broken
/// by first occurrence in the original dataset.
pub fn category_counts(
    dataset: &Dataset,
    view: &FilteredView,
    column: &str,
) -> Result<Vec<CategoryCount>, DataError> {
    require_column(dataset, column, "category counts")?;

    let mut counts: BTreeMap<String, (u64, usize)> = BTreeMap::new();
    for (position, record) in view.records(dataset).enumerate() {
        let label = match record.get(column) {
            Some(v) => to_pascal_case(&v.to_string()),
            None => "Unknown".to_string(),
        };
        let entry = counts.entry(label).or_insert((0, position));
        entry.0 += 1;
    }

    let mut ordered: Vec<(String, (u64, usize))> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

    Ok(ordered
        .into_iter()
        .map(|(label, (count, _))| CategoryCount { label, count })
        .collect())
}

// ---------------------------------------------------------------------------
// Weekday × hour heatmap
// ---------------------------------------------------------------------------

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Consultations are only recorded during opening hours.
pub const OPENING_HOUR: u32 = 8;
pub const CLOSING_HOUR: u32 = 20;
pub const HOUR_SLOTS: usize = (CLOSING_HOUR - OPENING_HOUR + 1) as usize;

/// 12-hour label for an hour in the opening range, e.g. `9 AM` or `3 PM`.
fn hour_label(hour: u32) -> String {
    if hour == 12 {
        "12 PM".to_string()
    } else if hour < 12 {
        format!("{hour} AM")
    } else {
        format!("{} PM", hour - 12)
    }
}

/// Counts of records per (weekday, opening hour) cell. Every cell of the
/// 7 × 13 grid is present; cells with no records hold 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyHeatmap {
    /// Labels for the 13 hour slots, ascending from opening to closing.
    pub hour_labels: Vec<String>,
    /// `counts[day][slot]`, day indexed Monday → Sunday.
    pub counts: Vec<Vec<u64>>,
}

impl HourlyHeatmap {
    fn zeroed() -> Self {
        HourlyHeatmap {
            hour_labels: (OPENING_HOUR..=CLOSING_HOUR).map(hour_label).collect(),
            counts: vec![vec![0; HOUR_SLOTS]; WEEKDAYS.len()],
        }
    }

    pub fn max_count(&self) -> u64 {
        self.counts
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Flattened (weekday, hour label, count) cells, weekday-major.
    pub fn cells(&self) -> impl Iterator<Item = (&'static str, &str, u64)> + '_ {
        self.counts.iter().enumerate().flat_map(move |(day, row)| {
            row.iter().enumerate().map(move |(slot, &count)| {
                (WEEKDAYS[day], self.hour_labels[slot].as_str(), count)
            })
        })
    }
}

/// Bucket a view's records by weekday and hour of day, restricted to the
/// opening hours. Records whose date cell is missing or not a timestamp are
/// skipped, as are records outside the hour range.
pub fn weekday_hour_counts(
    dataset: &Dataset,
    view: &FilteredView,
    date_column: &str,
) -> Result<HourlyHeatmap, DataError> {
    require_column(dataset, date_column, "the weekday/hour heatmap")?;

    let mut heatmap = HourlyHeatmap::zeroed();
    for record in view.records(dataset) {
        let Some(when) = record.date(date_column) else {
            continue;
        };
        let hour = when.hour();
        if !(OPENING_HOUR..=CLOSING_HOUR).contains(&hour) {
            continue;
        }
        let day = when.weekday().num_days_from_monday() as usize;
        let slot = (hour - OPENING_HOUR) as usize;
        heatmap.counts[day][slot] += 1;
    }
    Ok(heatmap)
}

// ---------------------------------------------------------------------------
// Period counts
// ---------------------------------------------------------------------------

/// Calendar bucket size for time-series aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Quarter,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCount {
    pub label: String,
    pub count: u64,
}

/// Chronologically ordered bucket counts plus the first bucket that reaches
/// the maximum count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodCounts {
    pub buckets: Vec<PeriodCount>,
    pub peak: Option<PeriodCount>,
}

/// Bucket a view's records into calendar periods over a date column.
/// Records without a parsable date are skipped.
pub fn period_counts(
    dataset: &Dataset,
    view: &FilteredView,
    date_column: &str,
    period: Period,
) -> Result<PeriodCounts, DataError> {
    require_column(dataset, date_column, "period counts")?;

    // Keyed by a chronologically ordered integer so the BTreeMap iteration
    // order is the output order.
    let mut counts: BTreeMap<i64, (String, u64)> = BTreeMap::new();
    for record in view.records(dataset) {
        let Some(when) = record.date(date_column) else {
            continue;
        };
        let date = when.date();
        let (key, label) = match period {
            Period::Day => (
                i64::from(date.num_days_from_ce()),
                date.format("%Y-%m-%d").to_string(),
            ),
            Period::Quarter => {
                let quarter = (date.month0() / 3) + 1;
                (
                    i64::from(date.year()) * 4 + i64::from(quarter),
                    format!("{} Q{quarter}", date.year()),
                )
            }
            Period::Year => (i64::from(date.year()), date.year().to_string()),
        };
        counts.entry(key).or_insert((label, 0)).1 += 1;
    }

    let buckets: Vec<PeriodCount> = counts
        .into_values()
        .map(|(label, count)| PeriodCount { label, count })
        .collect();

    // Strict comparison keeps the earliest bucket on ties.
    let mut peak: Option<PeriodCount> = None;
    for bucket in &buckets {
        if peak.as_ref().map_or(true, |p| bucket.count > p.count) {
            peak = Some(bucket.clone());
        }
    }

    Ok(PeriodCounts { buckets, peak })
}

fn require_column(
    dataset: &Dataset,
    column: &str,
    operation: &'static str,
) -> Result<(), DataError> {
    // Schema is checked lazily, at the point of use; an empty dataset has no
    // schema to violate.
    if dataset.is_empty() || dataset.has_column(column) {
        Ok(())
    } else {
        Err(DataError::MissingColumn {
            column: column.to_string(),
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{FilterSpec, Selection};
    use crate::data::model::{FieldValue, Record};
    use chrono::NaiveDate;

    fn consult(mpc: &str, y: i32, m: u32, d: u32, h: u32) -> Record {
        [
            (
                "SAVSNET MPC".to_string(),
                FieldValue::String(mpc.to_string()),
            ),
            (
                "Consult_date".to_string(),
                FieldValue::Date(
                    NaiveDate::from_ymd_opt(y, m, d)
                        .unwrap()
                        .and_hms_opt(h, 0, 0)
                        .unwrap(),
                ),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn category_counts_sum_and_sort_descending() {
        let ds = Dataset::from_records(vec![
            consult("gastroenteric", 2018, 1, 1, 9),
            consult("vaccination", 2018, 1, 2, 9),
            consult("vaccination", 2018, 1, 3, 9),
            consult("pruritus", 2018, 1, 4, 9),
        ]);
        let view = FilteredView::all(&ds);
        let counts = category_counts(&ds, &view, "SAVSNET MPC").unwrap();

        assert_eq!(counts[0].label, "Vaccination");
        assert_eq!(counts[0].count, 2);
        let total: u64 = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, view.len() as u64);
        for pair in counts.windows(2) {
            assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn category_count_ties_keep_first_seen_order() {
        let ds = Dataset::from_records(vec![
            consult("pruritus", 2018, 1, 1, 9),
            consult("trauma", 2018, 1, 2, 9),
            consult("trauma", 2018, 1, 3, 9),
            consult("pruritus", 2018, 1, 4, 9),
        ]);
        let counts = category_counts(&ds, &FilteredView::all(&ds), "SAVSNET MPC").unwrap();
        // Both count 2; "pruritus" appeared first in the dataset.
        assert_eq!(counts[0].label, "Pruritus");
        assert_eq!(counts[1].label, "Trauma");
    }

    #[test]
    fn filtered_vaccination_scenario() {
        let ds = Dataset::from_records(vec![
            consult("vaccination", 2018, 1, 1, 9),
            consult("vaccination", 2018, 1, 2, 9),
            consult("checkup", 2018, 1, 3, 9),
        ]);
        let view = FilterSpec::new()
            .category_in("SAVSNET MPC", Selection::only(["vaccination"]))
            .apply(&ds)
            .unwrap();
        assert_eq!(view.len(), 2);

        let counts = category_counts(&ds, &view, "SAVSNET MPC").unwrap();
        assert_eq!(
            counts,
            vec![CategoryCount {
                label: "Vaccination".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn null_values_group_under_unknown() {
        let mut records = vec![consult("vaccination", 2018, 1, 1, 9)];
        records.push(
            [("SAVSNET MPC".to_string(), FieldValue::Null)]
                .into_iter()
                .collect(),
        );
        let ds = Dataset::from_records(records);
        let counts = category_counts(&ds, &FilteredView::all(&ds), "SAVSNET MPC").unwrap();
        assert!(counts.iter().any(|c| c.label == "Unknown" && c.count == 1));
    }

    #[test]
    fn heatmap_covers_full_grid_with_zero_fill() {
        // 2018-01-01 is a Monday.
        let ds = Dataset::from_records(vec![
            consult("vaccination", 2018, 1, 1, 9),
            consult("checkup", 2018, 1, 1, 9),
        ]);
        let heatmap = weekday_hour_counts(&ds, &FilteredView::all(&ds), "Consult_date").unwrap();

        assert_eq!(heatmap.cells().count(), 91);
        let monday_nine = heatmap
            .cells()
            .find(|(day, hour, _)| *day == "Monday" && *hour == "9 AM")
            .unwrap();
        assert_eq!(monday_nine.2, 2);
        let zero_cells = heatmap.cells().filter(|(_, _, count)| *count == 0).count();
        assert_eq!(zero_cells, 90);
    }

    #[test]
    fn heatmap_labels_cover_opening_hours_in_order() {
        let ds = Dataset::from_records(vec![consult("checkup", 2018, 1, 1, 12)]);
        let heatmap = weekday_hour_counts(&ds, &FilteredView::all(&ds), "Consult_date").unwrap();
        assert_eq!(heatmap.hour_labels.first().map(String::as_str), Some("8 AM"));
        assert_eq!(heatmap.hour_labels[4], "12 PM");
        assert_eq!(heatmap.hour_labels.last().map(String::as_str), Some("8 PM"));
        assert_eq!(heatmap.hour_labels.len(), HOUR_SLOTS);
    }

    #[test]
    fn heatmap_ignores_records_outside_opening_hours() {
        let ds = Dataset::from_records(vec![
            consult("checkup", 2018, 1, 1, 7),
            consult("checkup", 2018, 1, 1, 21),
            consult("checkup", 2018, 1, 1, 8),
        ]);
        let heatmap = weekday_hour_counts(&ds, &FilteredView::all(&ds), "Consult_date").unwrap();
        assert_eq!(heatmap.max_count(), 1);
        let total: u64 = heatmap.cells().map(|(_, _, c)| c).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn quarter_buckets_are_chronological_with_first_peak() {
        let ds = Dataset::from_records(vec![
            consult("checkup", 2018, 11, 1, 9),
            consult("checkup", 2018, 2, 1, 9),
            consult("checkup", 2018, 5, 1, 9),
            consult("checkup", 2018, 1, 15, 9),
        ]);
        let result = period_counts(&ds, &FilteredView::all(&ds), "Consult_date", Period::Quarter)
            .unwrap();

        let labels: Vec<&str> = result.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2018 Q1", "2018 Q2", "2018 Q4"]);
        // Q1 has 2, Q2 and Q4 have 1 each: peak is Q1.
        let peak = result.peak.unwrap();
        assert_eq!(peak.label, "2018 Q1");
        assert_eq!(peak.count, 2);
    }

    #[test]
    fn peak_tie_resolves_to_earliest_bucket() {
        let ds = Dataset::from_records(vec![
            consult("checkup", 2017, 3, 1, 9),
            consult("checkup", 2019, 3, 1, 9),
        ]);
        let result =
            period_counts(&ds, &FilteredView::all(&ds), "Consult_date", Period::Year).unwrap();
        assert_eq!(result.peak.unwrap().label, "2017");
    }

    #[test]
    fn empty_view_aggregates_to_zero_not_error() {
        let ds = Dataset::from_records(vec![consult("checkup", 2018, 1, 1, 9)]);
        let empty = FilterSpec::new()
            .year_equals("Consult_date", 1999)
            .apply(&ds)
            .unwrap();

        assert!(category_counts(&ds, &empty, "SAVSNET MPC")
            .unwrap()
            .is_empty());
        let heatmap = weekday_hour_counts(&ds, &empty, "Consult_date").unwrap();
        assert_eq!(heatmap.max_count(), 0);
        let periods = period_counts(&ds, &empty, "Consult_date", Period::Day).unwrap();
        assert!(periods.buckets.is_empty());
        assert!(periods.peak.is_none());
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let ds = Dataset::from_records(vec![consult("checkup", 2018, 1, 1, 9)]);
        let err = category_counts(&ds, &FilteredView::all(&ds), "TherapeuticGroup").unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { .. }));
    }
}
