/// Data layer: core types, loading, labelling, filtering and reporting.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → CustomerTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ segment   │  LabelingMode → RFM_Score + Segment (or Cluster as-is)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  closed ranges / cluster selection → row indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ aggregate │  metrics, per-label means, histograms  ──► export (CSV)
///   └──────────┘
/// ```

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod segment;
