//! RFM customer segmentation: loading, labelling, filtering and reporting.
//!
//! The binaries (`rfm-dashboard`, `rfm-report`, `generate_sample`) are thin
//! presentation layers over [`data`].

pub mod data;
pub mod error;

pub use data::aggregate::{HeadlineMetrics, LabelMeans};
pub use data::filter::{ClusterSelection, FilterSpec, Interval, RangeFilter};
pub use data::model::{CellValue, CustomerRecord, CustomerTable, Label, Segment, SubScores};
pub use data::segment::{apply_labeling, LabelingMode};
pub use error::{RfmError, Result};
