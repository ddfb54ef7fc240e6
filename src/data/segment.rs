use std::fmt;

use serde::Serialize;

use super::model::{CustomerRecord, CustomerTable, Label, Segment, CLUSTER, RFM_SCORE, SUB_SCORE_COLUMNS};
use crate::error::{Result, RfmError};

// ---------------------------------------------------------------------------
// Score → segment rule
// ---------------------------------------------------------------------------

/// Inclusive lower bound of each tier, highest first. A score below the last
/// bound is `Churned`.
pub const SEGMENT_TIERS: [(f64, Segment); 3] = [
    (9.0, Segment::BestCustomers),
    (6.0, Segment::LoyalCustomers),
    (4.0, Segment::AtRisk),
];

/// Map a composite RFM score to its segment.
pub fn assign_segment(score: f64) -> Segment {
    SEGMENT_TIERS
        .iter()
        .find(|(lower, _)| score >= *lower)
        .map(|&(_, segment)| segment)
        .unwrap_or(Segment::Churned)
}

impl Segment {
    pub fn from_score(score: f64) -> Self {
        assign_segment(score)
    }
}

// ---------------------------------------------------------------------------
// Labelling modes
// ---------------------------------------------------------------------------

/// How a record gets its grouping label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LabelingMode {
    /// Segment derived from `RFM_Score` (or the sum of the sub-scores).
    #[default]
    ScoreBased,
    /// The externally assigned `Cluster` column, used as-is.
    ClusterBased,
}

impl fmt::Display for LabelingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelingMode::ScoreBased => f.write_str("Score-based segments"),
            LabelingMode::ClusterBased => f.write_str("Clusters"),
        }
    }
}

impl LabelingMode {
    pub const ALL: [LabelingMode; 2] = [LabelingMode::ScoreBased, LabelingMode::ClusterBased];

    /// Fail with `MissingColumn` unless the table carries what this mode needs.
    pub fn check_columns(self, table: &CustomerTable) -> Result<()> {
        match self {
            LabelingMode::ScoreBased => {
                if table.has_column(RFM_SCORE) {
                    return Ok(());
                }
                match SUB_SCORE_COLUMNS.iter().find(|c| !table.has_column(c)) {
                    Some(missing) => Err(RfmError::MissingColumn(missing.to_string())),
                    None => Ok(()),
                }
            }
            LabelingMode::ClusterBased if table.has_column(CLUSTER) => Ok(()),
            LabelingMode::ClusterBased => Err(RfmError::MissingColumn(CLUSTER.to_string())),
        }
    }

    /// The label of a single record, or `None` if it lacks the input this
    /// mode reads.
    pub fn compute_label(self, record: &CustomerRecord) -> Option<Label> {
        match self {
            LabelingMode::ScoreBased => composite_score(record)
                .map(assign_segment)
                .map(Label::Segment),
            LabelingMode::ClusterBased => record.cluster.clone().map(Label::Cluster),
        }
    }
}

/// An existing `RFM_Score` wins over the sub-score sum.
fn composite_score(record: &CustomerRecord) -> Option<f64> {
    record
        .rfm_score
        .or_else(|| record.scores.map(|s| s.total()))
}

// ---------------------------------------------------------------------------
// Table labelling
// ---------------------------------------------------------------------------

/// Label every record of `table` according to `mode`.
///
/// Score-based: fills `RFM_Score` where it was not read from input and sets
/// `segment` on every record. Cluster-based: clears any segment so the
/// `Cluster` column is the only label. Every check runs before the first
/// mutation, so on error the table is left exactly as it was.
///
/// Running it twice with the same mode is a no-op the second time.
pub fn apply_labeling(table: &mut CustomerTable, mode: LabelingMode) -> Result<()> {
    mode.check_columns(table)?;

    match mode {
        LabelingMode::ScoreBased => {
            let scores = table
                .records
                .iter()
                .enumerate()
                .map(|(i, rec)| {
                    composite_score(rec).ok_or_else(|| {
                        RfmError::MalformedFile(format!("row {}: no RFM score", i + 1))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            for (rec, score) in table.records.iter_mut().zip(scores) {
                rec.rfm_score = Some(score);
                rec.segment = Some(assign_segment(score));
            }
            table.derived_rfm_score = !table.has_column(RFM_SCORE);
            table.segmented = true;
            log::debug!(
                "Segmented {} customers (RFM_Score derived: {})",
                table.len(),
                table.derived_rfm_score
            );
        }
        LabelingMode::ClusterBased => {
            for rec in &mut table.records {
                rec.segment = None;
            }
            table.segmented = false;
            log::debug!(
                "Using {} clusters for {} customers",
                table.clusters.len(),
                table.len()
            );
        }
    }
    Ok(())
}
