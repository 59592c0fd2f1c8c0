use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;

use super::model::{Dataset, FieldValue, Record};
use super::DataError;

// ---------------------------------------------------------------------------
// Selection – category filter state
// ---------------------------------------------------------------------------

/// The two states a category filter widget can be in. `All` means the
/// filter is unset (pass everything); `Only` restricts to the given values,
/// and an empty set means nothing is selected, so nothing passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(BTreeSet<String>),
}

impl Selection {
    /// Build a restriction from any iterator of values. Members are
    /// lowercased once here so matching stays case-insensitive.
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Selection::Only(
            values
                .into_iter()
                .map(|v| v.as_ref().to_lowercase())
                .collect(),
        )
    }

    fn allows(&self, value: Option<&FieldValue>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => match value {
                Some(v) => set.contains(&v.to_string().to_lowercase()),
                None => false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Predicate – one column constraint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Record passes iff its value is a member of the selection.
    CategoryIn(Selection),
    /// Case-insensitive substring match. An empty needle passes everything;
    /// a missing or null field never matches a non-empty needle.
    Contains(String),
    /// Calendar year of a date column equals the given year.
    YearEquals(i32),
}

impl Predicate {
    fn matches(&self, record: &Record, column: &str) -> bool {
        let value = record.get(column);
        match self {
            Predicate::CategoryIn(selection) => selection.allows(value),
            Predicate::Contains(needle) => {
                if needle.is_empty() {
                    return true;
                }
                match value {
                    Some(FieldValue::Null) | None => false,
                    Some(v) => v
                        .to_string()
                        .to_lowercase()
                        .contains(&needle.to_lowercase()),
                }
            }
            Predicate::YearEquals(year) => value
                .and_then(FieldValue::as_date)
                .map(|d| d.date().year() == *year)
                .unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – AND-combined predicates, one per column
// ---------------------------------------------------------------------------

/// A declarative set of column predicates, combined with logical AND.
/// OR and NOT are deliberately not provided; no dashboard page needs them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    predicates: BTreeMap<String, Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category_in(mut self, column: &str, selection: Selection) -> Self {
        self.predicates
            .insert(column.to_string(), Predicate::CategoryIn(selection));
        self
    }

    pub fn contains(mut self, column: &str, needle: &str) -> Self {
        self.predicates
            .insert(column.to_string(), Predicate::Contains(needle.to_string()));
        self
    }

    pub fn year_equals(mut self, column: &str, year: i32) -> Self {
        self.predicates
            .insert(column.to_string(), Predicate::YearEquals(year));
        self
    }

    /// Apply all predicates to a dataset, producing an order-preserving view.
    /// Fails if any predicate names a column absent from the schema.
    pub fn apply(&self, dataset: &Dataset) -> Result<FilteredView, DataError> {
        self.apply_to(dataset, &FilteredView::all(dataset))
    }

    /// Refine an existing view with the same rules. Applying a spec to its
    /// own output returns an identical view.
    pub fn apply_to(
        &self,
        dataset: &Dataset,
        view: &FilteredView,
    ) -> Result<FilteredView, DataError> {
        self.check_columns(dataset)?;

        let indices = view
            .indices()
            .iter()
            .copied()
            .filter(|&i| {
                self.predicates
                    .iter()
                    .all(|(column, pred)| pred.matches(&dataset.records[i], column))
            })
            .collect();
        Ok(FilteredView { indices })
    }

    fn check_columns(&self, dataset: &Dataset) -> Result<(), DataError> {
        for column in self.predicates.keys() {
            if !dataset.has_column(column) {
                return Err(DataError::FieldNotFound {
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FilteredView – order-preserving subsequence of a dataset
// ---------------------------------------------------------------------------

/// Indices of the records that passed a filter, in original dataset order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    indices: Vec<usize>,
}

impl FilteredView {
    /// The unfiltered view over a whole dataset.
    pub fn all(dataset: &Dataset) -> Self {
        FilteredView {
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Iterate the view's records in dataset order.
    pub fn records<'a>(&'a self, dataset: &'a Dataset) -> impl Iterator<Item = &'a Record> + 'a {
        self.indices.iter().map(move |&i| &dataset.records[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn consult(mpc: &str, year: i32, notes: &str) -> Record {
        [
            (
                "SAVSNET MPC".to_string(),
                FieldValue::String(mpc.to_string()),
            ),
            (
                "Consult_date".to_string(),
                FieldValue::Date(
                    NaiveDate::from_ymd_opt(year, 6, 15)
                        .unwrap()
                        .and_hms_opt(9, 30, 0)
                        .unwrap(),
                ),
            ),
            (
                "Narrative".to_string(),
                FieldValue::String(notes.to_string()),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn sample_dataset() -> Dataset {
        Dataset::from_records(vec![
            consult("vaccination", 2018, "annual booster given"),
            consult("gastroenteric", 2018, "vomiting since Tuesday"),
            consult("vaccination", 2019, "primary course, second visit"),
            consult("trauma", 2018, "RTA, hind leg"),
        ])
    }

    #[test]
    fn category_filter_preserves_order() {
        let ds = sample_dataset();
        let view = FilterSpec::new()
            .category_in("SAVSNET MPC", Selection::only(["Vaccination"]))
            .apply(&ds)
            .unwrap();
        assert_eq!(view.indices(), &[0, 2]);
    }

    #[test]
    fn empty_selection_rejects_all_but_all_passes_all() {
        let ds = sample_dataset();
        let none = FilterSpec::new()
            .category_in("SAVSNET MPC", Selection::Only(BTreeSet::new()))
            .apply(&ds)
            .unwrap();
        assert!(none.is_empty());

        let all = FilterSpec::new()
            .category_in("SAVSNET MPC", Selection::All)
            .apply(&ds)
            .unwrap();
        assert_eq!(all.len(), ds.len());
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let ds = sample_dataset();
        let spec = FilterSpec::new()
            .year_equals("Consult_date", 2018)
            .category_in("SAVSNET MPC", Selection::only(["vaccination", "trauma"]));

        let once = spec.apply(&ds).unwrap();
        let twice = spec.apply_to(&ds, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn contains_is_case_insensitive_and_null_safe() {
        let mut records = vec![consult("trauma", 2018, "RTA, hind leg")];
        records.push(
            [
                (
                    "SAVSNET MPC".to_string(),
                    FieldValue::String("other".to_string()),
                ),
                ("Narrative".to_string(), FieldValue::Null),
            ]
            .into_iter()
            .collect(),
        );
        let ds = Dataset::from_records(records);

        let hit = FilterSpec::new()
            .contains("Narrative", "rta")
            .apply(&ds)
            .unwrap();
        assert_eq!(hit.indices(), &[0]);

        // Empty needle passes everything, including the null row.
        let all = FilterSpec::new()
            .contains("Narrative", "")
            .apply(&ds)
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn year_filter_matches_calendar_year() {
        let ds = sample_dataset();
        let view = FilterSpec::new()
            .year_equals("Consult_date", 2019)
            .apply(&ds)
            .unwrap();
        assert_eq!(view.indices(), &[2]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ds = sample_dataset();
        let err = FilterSpec::new()
            .contains("TherapeuticGroup", "antibiotic")
            .apply(&ds)
            .unwrap_err();
        assert_eq!(
            err,
            DataError::FieldNotFound {
                column: "TherapeuticGroup".to_string()
            }
        );
    }

    #[test]
    fn empty_dataset_yields_empty_view_not_error() {
        let ds = Dataset::default();
        let spec = FilterSpec::new();
        let view = spec.apply(&ds).unwrap();
        assert!(view.is_empty());
    }
}
