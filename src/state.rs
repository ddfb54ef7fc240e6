use rfm_dashboard::data::aggregate::{label_universe, Report};
use rfm_dashboard::data::filter::filtered_indices;
use rfm_dashboard::{
    apply_labeling, CellValue, ClusterSelection, CustomerTable, FilterSpec, LabelingMode, RangeFilter,
    RfmError,
};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Table exactly as loaded; relabelled from scratch on mode change.
    pub source: Option<CustomerTable>,

    /// Labelled table the dashboard reads from.
    pub table: Option<CustomerTable>,

    pub mode: LabelingMode,

    /// Current filter selection.
    pub filter: Option<FilterSpec>,

    /// Observed R/F/M ranges, used as slider bounds.
    pub bounds: Option<RangeFilter>,

    /// Indices of customers passing the current filter (cached).
    pub visible_indices: Vec<usize>,

    /// Report for the current table and filter (cached).
    pub report: Option<Report>,

    /// Colour per segment / cluster.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,
}

impl AppState {
    /// Ingest a newly loaded table in the current mode, falling back to the
    /// other mode when the file only supports that one. On error the
    /// previous dataset is kept.
    pub fn set_dataset(&mut self, source: CustomerTable) -> Result<(), RfmError> {
        let mut labelled = source.clone();
        let mode = match apply_labeling(&mut labelled, self.mode) {
            Ok(()) => self.mode,
            Err(err @ RfmError::MissingColumn(_)) => {
                let other = LabelingMode::ALL
                    .into_iter()
                    .find(|m| *m != self.mode)
                    .unwrap_or(self.mode);
                labelled = source.clone();
                if apply_labeling(&mut labelled, other).is_err() {
                    return Err(err);
                }
                log::info!("Switched to {other}: {err}");
                other
            }
            Err(err) => return Err(err),
        };

        self.mode = mode;
        self.source = Some(source);
        self.install(labelled);
        self.status_message = None;
        self.loading = false;
        Ok(())
    }

    /// Relabel the loaded table in `mode`. Leaves everything unchanged and
    /// reports the error in the status bar if the table lacks the columns.
    pub fn set_mode(&mut self, mode: LabelingMode) {
        if mode == self.mode {
            return;
        }
        let Some(source) = &self.source else {
            self.mode = mode;
            return;
        };
        let mut labelled = source.clone();
        match apply_labeling(&mut labelled, mode) {
            Ok(()) => {
                self.mode = mode;
                self.install(labelled);
                self.status_message = None;
            }
            Err(err) => {
                log::warn!("Cannot switch to {mode}: {err}");
                self.status_message = Some(format!("Cannot switch to {mode}: {err}"));
            }
        }
    }

    fn install(&mut self, table: CustomerTable) {
        self.bounds = Some(RangeFilter::observed(&table));
        self.filter = Some(FilterSpec::default_for(&table, self.mode));
        self.color_map = Some(ColorMap::new(&label_universe(&table, self.mode)));
        self.table = Some(table);
        self.refilter();
    }

    /// Recompute `visible_indices` and the report after a filter change.
    pub fn refilter(&mut self) {
        match (&self.table, &self.filter) {
            (Some(table), Some(filter)) => {
                self.visible_indices = filtered_indices(table, filter);
                self.report = Some(Report::build(table, self.mode, filter));
            }
            _ => {
                self.visible_indices.clear();
                self.report = None;
            }
        }
    }

    /// Back to the keep-everything filter for the current mode.
    pub fn reset_filter(&mut self) {
        if let Some(table) = &self.table {
            self.filter = Some(FilterSpec::default_for(table, self.mode));
            self.refilter();
        }
    }

    /// Toggle a single cluster in the selection.
    pub fn toggle_cluster(&mut self, cluster: &CellValue) {
        if let Some(FilterSpec::Clusters(selection)) = &mut self.filter {
            selection.toggle(cluster);
            self.refilter();
        }
    }

    /// Select every cluster.
    pub fn select_all_clusters(&mut self) {
        if let Some(table) = &self.table {
            self.filter = Some(FilterSpec::Clusters(ClusterSelection::all(table)));
            self.refilter();
        }
    }

    /// Deselect every cluster.
    pub fn select_no_clusters(&mut self) {
        if let Some(FilterSpec::Clusters(selection)) = &mut self.filter {
            selection.clear();
            self.refilter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfm_dashboard::data::loader::read_csv;

    const SCORED: &str = "\
Recency,Frequency,Monetary,R_Score,F_Score,M_Score,Cluster
10,5,2000,5,4,3,0
50,2,5000,2,2,1,1
300,1,20,1,1,1,1
";

    fn loaded(csv: &str) -> AppState {
        let mut state = AppState::default();
        state.set_dataset(read_csv(csv.as_bytes()).unwrap()).unwrap();
        state
    }

    #[test]
    fn loading_shows_everything() {
        let state = loaded(SCORED);
        assert_eq!(state.mode, LabelingMode::ScoreBased);
        assert_eq!(state.visible_indices, vec![0, 1, 2]);
        let report = state.report.as_ref().unwrap();
        assert_eq!(report.overall.metrics.total, 3);
        assert_eq!(report.overall.metrics.best_customers, 1);
    }

    #[test]
    fn narrowing_a_range_refilters() {
        let mut state = loaded(SCORED);
        if let Some(FilterSpec::Ranges(ranges)) = &mut state.filter {
            ranges.monetary.max = 1000.0;
        }
        state.refilter();
        assert_eq!(state.visible_indices, vec![2]);
        assert_eq!(state.report.as_ref().unwrap().filtered.metrics.total, 1);
    }

    #[test]
    fn cluster_only_file_switches_mode() {
        let state = loaded("Recency,Frequency,Monetary,Cluster\n1,1,1,a\n2,2,2,b\n");
        assert_eq!(state.mode, LabelingMode::ClusterBased);
        assert!(matches!(state.filter, Some(FilterSpec::Clusters(_))));
    }

    #[test]
    fn unusable_file_keeps_previous_dataset() {
        let mut state = loaded(SCORED);
        let bad = read_csv("Recency,Frequency,Monetary\n1,1,1\n".as_bytes()).unwrap();
        let err = state.set_dataset(bad).unwrap_err();
        assert!(matches!(err, RfmError::MissingColumn(_)));
        assert_eq!(state.table.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn switching_mode_relabels_and_resets_filter() {
        let mut state = loaded(SCORED);
        state.set_mode(LabelingMode::ClusterBased);
        assert_eq!(state.mode, LabelingMode::ClusterBased);
        assert!(!state.table.as_ref().unwrap().segmented);

        state.toggle_cluster(&CellValue::Integer(1));
        assert_eq!(state.visible_indices, vec![0]);
        state.select_no_clusters();
        assert!(state.visible_indices.is_empty());
        state.select_all_clusters();
        assert_eq!(state.visible_indices.len(), 3);

        state.set_mode(LabelingMode::ScoreBased);
        assert!(state.table.as_ref().unwrap().segmented);
    }

    #[test]
    fn failed_mode_switch_reports_status() {
        let mut state = loaded("Recency,Frequency,Monetary,RFM_Score\n1,1,1,9\n");
        state.set_mode(LabelingMode::ClusterBased);
        assert_eq!(state.mode, LabelingMode::ScoreBased);
        assert!(state.status_message.as_deref().unwrap().contains("Cluster"));
    }
}
