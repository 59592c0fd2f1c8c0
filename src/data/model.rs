use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// FieldValue – a single cell in a record
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the column types found in the
/// cleaned clinic exports. Using `BTreeMap` / `BTreeSet` downstream so
/// `FieldValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord so we can put FieldValue in BTreeSet --

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use FieldValue::*;
        fn discriminant(v: &FieldValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                String(_) => 3,
                Date(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for FieldValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::String(s) => s.hash(state),
            FieldValue::Integer(i) => i.hash(state),
            FieldValue::Float(f) => f.to_bits().hash(state),
            FieldValue::Date(d) => d.hash(state),
            FieldValue::Null => {}
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            FieldValue::Null => write!(f, "Unknown"),
        }
    }
}

impl FieldValue {
    /// Interpret the value as a timestamp, if it is one.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Record – one row of a loaded table
// ---------------------------------------------------------------------------

/// A single record (one row of the source table).
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Dynamic columns: field name → value.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    /// The record's timestamp in the given column, if present and parsed.
    pub fn date(&self, column: &str) -> Option<NaiveDateTime> {
        self.fields.get(column).and_then(FieldValue::as_date)
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// A full parsed table with pre-computed column indices. Immutable after
/// construction; filtering and aggregation build views, they never mutate
/// the records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// All records (rows), in file order.
    pub records: Vec<Record>,
    /// Ordered list of column names.
    pub column_names: Vec<String>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<FieldValue>>,
}

impl Dataset {
    /// Build column indices from the loaded records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        let mut unique_values: BTreeMap<String, BTreeSet<FieldValue>> = BTreeMap::new();

        for rec in &records {
            for (col, val) in &rec.fields {
                column_names_set.insert(col.clone());
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        Dataset {
            records,
            column_names,
            unique_values,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Sorted unique calendar years found in a date column.
    pub fn years(&self, column: &str) -> Vec<i32> {
        use chrono::Datelike;
        let mut years: BTreeSet<i32> = BTreeSet::new();
        if let Some(values) = self.unique_values.get(column) {
            for val in values {
                if let Some(d) = val.as_date() {
                    years.insert(d.date().year());
                }
            }
        }
        years.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn from_records_builds_column_index() {
        let ds = Dataset::from_records(vec![
            record(&[
                ("Species", FieldValue::String("cat".into())),
                ("Age", FieldValue::Integer(4)),
            ]),
            record(&[
                ("Species", FieldValue::String("dog".into())),
                ("Age", FieldValue::Integer(4)),
            ]),
        ]);

        assert_eq!(
            ds.column_names,
            vec!["Age".to_string(), "Species".to_string()]
        );
        assert_eq!(ds.unique_values["Species"].len(), 2);
        assert_eq!(ds.unique_values["Age"].len(), 1);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn field_values_order_by_type_then_value() {
        let mut set = BTreeSet::new();
        set.insert(FieldValue::String("b".into()));
        set.insert(FieldValue::String("a".into()));
        set.insert(FieldValue::Null);
        set.insert(FieldValue::Integer(7));

        let ordered: Vec<FieldValue> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![
                FieldValue::Null,
                FieldValue::Integer(7),
                FieldValue::String("a".into()),
                FieldValue::String("b".into()),
            ]
        );
    }

    #[test]
    fn years_come_out_sorted_and_unique() {
        let d = |y: i32| {
            FieldValue::Date(
                NaiveDate::from_ymd_opt(y, 3, 1)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
            )
        };
        let ds = Dataset::from_records(vec![
            record(&[("Consult_date", d(2019))]),
            record(&[("Consult_date", d(2017))]),
            record(&[("Consult_date", d(2019))]),
        ]);
        assert_eq!(ds.years("Consult_date"), vec![2017, 2019]);
        assert!(ds.years("Narrative").is_empty());
    }
}
