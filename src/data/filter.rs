use std::collections::BTreeSet;

use serde::Serialize;

use super::model::{CellValue, CustomerRecord, CustomerTable};
use super::segment::LabelingMode;

// ---------------------------------------------------------------------------
// Numeric ranges
// ---------------------------------------------------------------------------

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both ends inclusive.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Smallest interval covering `values`; `[0, 0]` when there are none.
    pub fn observed(values: impl IntoIterator<Item = f64>) -> Self {
        values
            .into_iter()
            .fold(None, |acc: Option<Interval>, v| match acc {
                None => Some(Interval::new(v, v)),
                Some(iv) => Some(Interval::new(iv.min.min(v), iv.max.max(v))),
            })
            .unwrap_or(Interval::new(0.0, 0.0))
    }
}

/// One closed interval per RFM dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeFilter {
    pub recency: Interval,
    pub frequency: Interval,
    pub monetary: Interval,
}

impl RangeFilter {
    /// Ranges spanning every observed value, i.e. a filter that keeps all rows.
    pub fn observed(table: &CustomerTable) -> Self {
        let recs = &table.records;
        RangeFilter {
            recency: Interval::observed(recs.iter().map(|r| r.recency)),
            frequency: Interval::observed(recs.iter().map(|r| r.frequency)),
            monetary: Interval::observed(recs.iter().map(|r| r.monetary)),
        }
    }

    /// All three dimensions must fall inside their intervals.
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        self.recency.contains(record.recency)
            && self.frequency.contains(record.frequency)
            && self.monetary.contains(record.monetary)
    }
}

// ---------------------------------------------------------------------------
// Cluster selection
// ---------------------------------------------------------------------------

/// Which cluster ids are selected. An empty selection keeps nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterSelection {
    pub selected: BTreeSet<CellValue>,
}

impl ClusterSelection {
    /// Every cluster observed in the table (i.e., show everything).
    pub fn all(table: &CustomerTable) -> Self {
        Self {
            selected: table.clusters.clone(),
        }
    }

    pub fn contains(&self, cluster: &CellValue) -> bool {
        self.selected.contains(cluster)
    }

    /// Toggle a single cluster in the selection.
    pub fn toggle(&mut self, cluster: &CellValue) {
        if !self.selected.remove(cluster) {
            self.selected.insert(cluster.clone());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Records without a cluster never match.
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        record
            .cluster
            .as_ref()
            .is_some_and(|c| self.selected.contains(c))
    }
}

// ---------------------------------------------------------------------------
// Filter predicate
// ---------------------------------------------------------------------------

/// The current filter, passed explicitly into the filter and report steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterSpec {
    Ranges(RangeFilter),
    Clusters(ClusterSelection),
}

impl FilterSpec {
    /// The keep-everything filter for `mode`: observed ranges for segments,
    /// every cluster for clusters.
    pub fn default_for(table: &CustomerTable, mode: LabelingMode) -> Self {
        match mode {
            LabelingMode::ScoreBased => FilterSpec::Ranges(RangeFilter::observed(table)),
            LabelingMode::ClusterBased => FilterSpec::Clusters(ClusterSelection::all(table)),
        }
    }

    pub fn matches(&self, record: &CustomerRecord) -> bool {
        match self {
            FilterSpec::Ranges(ranges) => ranges.matches(record),
            FilterSpec::Clusters(selection) => selection.matches(record),
        }
    }
}

/// Return indices of records that pass the filter, in table order.
///
/// An empty result is valid and simply yields an empty vector.
pub fn filtered_indices(table: &CustomerTable, filter: &FilterSpec) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| filter.matches(rec))
        .map(|(i, _)| i)
        .collect()
}
