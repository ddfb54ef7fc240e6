use std::collections::BTreeMap;

use serde::Serialize;

use super::filter::{filtered_indices, FilterSpec, Interval};
use super::model::{CustomerRecord, CustomerTable, Label, Segment};
use super::segment::LabelingMode;

/// Bin count used for the R/F/M distribution charts.
pub const DEFAULT_HISTOGRAM_BINS: usize = 30;

// ---------------------------------------------------------------------------
// Metric selector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Monetary];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Recency => "Recency",
            Metric::Frequency => "Frequency",
            Metric::Monetary => "Monetary",
        }
    }

    pub fn of(self, record: &CustomerRecord) -> f64 {
        match self {
            Metric::Recency => record.recency,
            Metric::Frequency => record.frequency,
            Metric::Monetary => record.monetary,
        }
    }

    /// This metric for every selected row.
    pub fn values(self, table: &CustomerTable, rows: &[usize]) -> Vec<f64> {
        table.select(rows).map(|rec| self.of(rec)).collect()
    }
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Headline metrics
// ---------------------------------------------------------------------------

/// Customer counts shown above the charts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeadlineMetrics {
    pub total: usize,
    pub best_customers: usize,
    pub loyal_customers: usize,
    pub at_risk: usize,
    pub churned: usize,
}

impl HeadlineMetrics {
    /// Count the selected rows per segment. Rows without a segment only
    /// contribute to `total`.
    pub fn compute(table: &CustomerTable, rows: &[usize]) -> Self {
        let mut metrics = HeadlineMetrics::default();
        for rec in table.select(rows) {
            metrics.total += 1;
            match rec.segment {
                Some(Segment::BestCustomers) => metrics.best_customers += 1,
                Some(Segment::LoyalCustomers) => metrics.loyal_customers += 1,
                Some(Segment::AtRisk) => metrics.at_risk += 1,
                Some(Segment::Churned) => metrics.churned += 1,
                None => {}
            }
        }
        metrics
    }
}

// ---------------------------------------------------------------------------
// Per-label counts and means
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: Label,
    pub count: usize,
}

/// Mean R/F/M of one label group, rounded to two decimals.
/// `None` when the group has no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelMeans {
    pub label: Label,
    pub count: usize,
    pub recency: Option<f64>,
    pub frequency: Option<f64>,
    pub monetary: Option<f64>,
}

#[derive(Default)]
struct Sums {
    count: usize,
    recency: f64,
    frequency: f64,
    monetary: f64,
}

impl Sums {
    fn add(&mut self, rec: &CustomerRecord) {
        self.count += 1;
        self.recency += rec.recency;
        self.frequency += rec.frequency;
        self.monetary += rec.monetary;
    }

    fn mean(&self, total: f64) -> Option<f64> {
        (self.count > 0).then(|| round2(total / self.count as f64))
    }
}

/// Every label `mode` can produce for this table, in display order.
pub fn label_universe(table: &CustomerTable, mode: LabelingMode) -> Vec<Label> {
    match mode {
        LabelingMode::ScoreBased => Segment::ALL.into_iter().map(Label::Segment).collect(),
        LabelingMode::ClusterBased => table.clusters.iter().cloned().map(Label::Cluster).collect(),
    }
}

fn group_sums(table: &CustomerTable, rows: &[usize], mode: LabelingMode) -> BTreeMap<Label, Sums> {
    let mut groups: BTreeMap<Label, Sums> = BTreeMap::new();
    for rec in table.select(rows) {
        if let Some(label) = mode.compute_label(rec) {
            groups.entry(label).or_default().add(rec);
        }
    }
    groups
}

/// Number of selected rows per label, only for labels that occur.
pub fn label_counts(table: &CustomerTable, rows: &[usize], mode: LabelingMode) -> Vec<LabelCount> {
    let groups = group_sums(table, rows, mode);
    label_universe(table, mode)
        .into_iter()
        .filter_map(|label| {
            let count = groups.get(&label).map_or(0, |s| s.count);
            (count > 0).then_some(LabelCount { label, count })
        })
        .collect()
}

/// Per-label mean of Recency, Frequency and Monetary over the selected rows.
///
/// Lists every label of the mode (all four segments, or every observed
/// cluster); groups with no selected rows have `None` means.
pub fn label_means(table: &CustomerTable, rows: &[usize], mode: LabelingMode) -> Vec<LabelMeans> {
    let groups = group_sums(table, rows, mode);
    let empty = Sums::default();
    label_universe(table, mode)
        .into_iter()
        .map(|label| {
            let sums = groups.get(&label).unwrap_or(&empty);
            LabelMeans {
                count: sums.count,
                recency: sums.mean(sums.recency),
                frequency: sums.mean(sums.frequency),
                monetary: sums.mean(sums.monetary),
                label,
            }
        })
        .collect()
}

/// Metric values of the selected rows grouped by label, for box plots.
pub fn grouped_values(
    table: &CustomerTable,
    rows: &[usize],
    mode: LabelingMode,
    metric: Metric,
) -> BTreeMap<Label, Vec<f64>> {
    let mut groups: BTreeMap<Label, Vec<f64>> = BTreeMap::new();
    for rec in table.select(rows) {
        if let Some(label) = mode.compute_label(rec) {
            groups.entry(label).or_default().push(metric.of(rec));
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Distribution shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram over the observed range of `values`.
///
/// No values → no bins; a constant column → a single bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let range = Interval::observed(values.iter().copied());
    let span = range.max - range.min;
    if span <= 0.0 {
        return vec![HistogramBin {
            start: range.min,
            end: range.max,
            count: values.len(),
        }];
    }

    let width = span / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        // The maximum lands in the last bin.
        let idx = (((v - range.min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: range.min + i as f64 * width,
            end: range.min + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Five-number summary for a box plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxSpread {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Quartiles use linear interpolation between closest ranks.
pub fn box_spread(values: &[f64]) -> Option<BoxSpread> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let quantile = |q: f64| {
        let pos = q * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    };

    Some(BoxSpread {
        min: sorted[0],
        q1: quantile(0.25),
        median: quantile(0.5),
        q3: quantile(0.75),
        max: sorted[sorted.len() - 1],
    })
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Metrics, counts and means over one selection of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub metrics: HeadlineMetrics,
    pub counts: Vec<LabelCount>,
    pub means: Vec<LabelMeans>,
}

impl Summary {
    pub fn compute(table: &CustomerTable, rows: &[usize], mode: LabelingMode) -> Self {
        Summary {
            metrics: HeadlineMetrics::compute(table, rows),
            counts: label_counts(table, rows, mode),
            means: label_means(table, rows, mode),
        }
    }
}

/// Everything the presentation layer shows for a labelled table and filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub mode: LabelingMode,
    pub filter: FilterSpec,
    pub overall: Summary,
    pub filtered: Summary,
}

impl Report {
    pub fn build(table: &CustomerTable, mode: LabelingMode, filter: &FilterSpec) -> Self {
        let visible = filtered_indices(table, filter);
        Report {
            mode,
            filter: filter.clone(),
            overall: Summary::compute(table, &table.all_rows(), mode),
            filtered: Summary::compute(table, &visible, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, CLUSTER, FREQUENCY, MONETARY, RECENCY, RFM_SCORE};
    use crate::data::segment::apply_labeling;

    fn segmented_table(rows: &[(f64, f64, f64, f64)]) -> CustomerTable {
        let columns = vec![RECENCY.into(), FREQUENCY.into(), MONETARY.into(), RFM_SCORE.into()];
        let records = rows
            .iter()
            .map(|&(r, f, m, score)| CustomerRecord::new(r, f, m).with_rfm_score(score))
            .collect();
        let mut table = CustomerTable::from_records(columns, records);
        apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap();
        table
    }

    #[test]
    fn headline_counts_per_segment() {
        let table = segmented_table(&[
            (10.0, 5.0, 2000.0, 12.0),
            (20.0, 3.0, 800.0, 7.0),
            (40.0, 2.0, 300.0, 6.0),
            (90.0, 1.0, 50.0, 4.0),
            (300.0, 1.0, 10.0, 3.0),
        ]);
        let metrics = HeadlineMetrics::compute(&table, &table.all_rows());
        assert_eq!(
            metrics,
            HeadlineMetrics {
                total: 5,
                best_customers: 1,
                loyal_customers: 2,
                at_risk: 1,
                churned: 1,
            }
        );
    }

    #[test]
    fn empty_selection_aggregates_to_zero() {
        let table = segmented_table(&[(10.0, 5.0, 2000.0, 12.0)]);
        let summary = Summary::compute(&table, &[], LabelingMode::ScoreBased);

        assert_eq!(summary.metrics, HeadlineMetrics::default());
        assert!(summary.counts.is_empty());
        assert_eq!(summary.means.len(), Segment::ALL.len());
        for means in &summary.means {
            assert_eq!(means.count, 0);
            assert_eq!(means.recency, None);
            assert_eq!(means.monetary, None);
        }
    }

    #[test]
    fn means_are_rounded_and_missing_groups_are_none() {
        let table = segmented_table(&[
            (10.0, 1.0, 100.0, 12.0),
            (11.0, 2.0, 100.001, 10.0),
            (12.0, 2.0, 100.0, 9.0),
            (200.0, 1.0, 5.0, 2.0),
        ]);
        let means = label_means(&table, &table.all_rows(), LabelingMode::ScoreBased);

        let best = &means[0];
        assert_eq!(best.label, Label::Segment(Segment::BestCustomers));
        assert_eq!(best.count, 3);
        assert_eq!(best.recency, Some(11.0));
        assert_eq!(best.frequency, Some(1.67));
        assert_eq!(best.monetary, Some(100.0));

        let loyal = &means[1];
        assert_eq!(loyal.count, 0);
        assert_eq!(loyal.frequency, None);

        let churned = &means[3];
        assert_eq!(churned.label, Label::Segment(Segment::Churned));
        assert_eq!(churned.recency, Some(200.0));
    }

    #[test]
    fn counts_and_means_by_cluster() {
        let columns = vec![RECENCY.into(), FREQUENCY.into(), MONETARY.into(), CLUSTER.into()];
        let records = vec![
            CustomerRecord::new(10.0, 4.0, 400.0).with_cluster(CellValue::Integer(1)),
            CustomerRecord::new(30.0, 2.0, 200.0).with_cluster(CellValue::Integer(1)),
            CustomerRecord::new(300.0, 1.0, 20.0).with_cluster(CellValue::Integer(0)),
        ];
        let table = CustomerTable::from_records(columns, records);

        let counts = label_counts(&table, &table.all_rows(), LabelingMode::ClusterBased);
        assert_eq!(
            counts,
            vec![
                LabelCount { label: Label::Cluster(CellValue::Integer(0)), count: 1 },
                LabelCount { label: Label::Cluster(CellValue::Integer(1)), count: 2 },
            ]
        );

        let means = label_means(&table, &[0, 1], LabelingMode::ClusterBased);
        assert_eq!(means[0].count, 0);
        assert_eq!(means[0].recency, None);
        assert_eq!(means[1].recency, Some(20.0));
        assert_eq!(means[1].monetary, Some(300.0));

        // Cluster tables carry no segments.
        assert_eq!(HeadlineMetrics::compute(&table, &table.all_rows()).best_customers, 0);
    }

    #[test]
    fn histogram_places_extremes_in_first_and_last_bin() {
        let bins = histogram(&[0.0, 1.0, 2.0, 10.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[4].end, 10.0);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
    }

    #[test]
    fn histogram_edge_cases() {
        assert!(histogram(&[], DEFAULT_HISTOGRAM_BINS).is_empty());
        let constant = histogram(&[7.0, 7.0, 7.0], DEFAULT_HISTOGRAM_BINS);
        assert_eq!(constant.len(), 1);
        assert_eq!(constant[0].count, 3);
    }

    #[test]
    fn box_spread_interpolates_quartiles() {
        let spread = box_spread(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!(
            spread,
            BoxSpread { min: 1.0, q1: 2.0, median: 3.0, q3: 4.0, max: 5.0 }
        );
        let even = box_spread(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(even.median, 2.5);
        assert_eq!(even.q1, 1.75);
        assert!(box_spread(&[]).is_none());
    }

    #[test]
    fn report_keeps_overall_and_filtered_apart() {
        use crate::data::filter::RangeFilter;

        let table = segmented_table(&[(10.0, 5.0, 2000.0, 12.0), (50.0, 2.0, 5000.0, 5.0)]);
        let mut ranges = RangeFilter::observed(&table);
        ranges.monetary = Interval::new(0.0, 1000.0);

        let report = Report::build(&table, LabelingMode::ScoreBased, &FilterSpec::Ranges(ranges));
        assert_eq!(report.overall.metrics.total, 2);
        assert_eq!(report.filtered.metrics.total, 0);
    }
}
