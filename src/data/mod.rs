/// Data layer: core types, loading, filtering, aggregation, pagination.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Record>, column index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply predicates → FilteredView
///   └──────────┘
///        │
///        ├──────────────────┐
///        ▼                  ▼
///   ┌───────────┐     ┌──────────┐
///   │ aggregate  │     │   page    │
///   │ counts /   │     │ slice +   │
///   │ heatmap /  │     │ navigate  │
///   │ periods    │     └──────────┘
///   └───────────┘
/// ```
pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
pub mod page;

/// Errors surfaced by the filter engine and the aggregator. An empty dataset
/// or view is never an error: it yields zero pages and zero buckets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// A filter predicate referenced a column the dataset does not have.
    #[error("no column named '{column}' in this dataset")]
    FieldNotFound { column: String },

    /// A column required by an aggregation was absent at the point of use.
    #[error("column '{column}' is required for {operation} but is missing")]
    MissingColumn {
        column: String,
        operation: &'static str,
    },
}
