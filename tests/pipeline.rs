//! Integration tests for the load → label → filter → report pipeline

use std::io::Write;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rfm_dashboard::data::aggregate::{label_means, Report};
use rfm_dashboard::data::export::{export_file, to_csv_bytes};
use rfm_dashboard::data::filter::filtered_indices;
use rfm_dashboard::data::loader::{load_file, read_csv};
use rfm_dashboard::{
    apply_labeling, CellValue, ClusterSelection, FilterSpec, HeadlineMetrics, Interval, Label,
    LabelingMode, RangeFilter, RfmError, Segment,
};
use tempfile::NamedTempFile;

/// Create a CSV file with the given contents
fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

const CUSTOMERS: &str = "\
CustomerID,Recency,Frequency,Monetary,R_Score,F_Score,M_Score
17850,10,5,2000,5,4,3
13047,50,2,5000,2,2,3
12583,35,3,800,3,2,2
14688,120,1,95.5,2,1,1
15311,360,1,12.25,1,1,1
";

#[test]
fn test_single_customer_end_to_end() {
    let file = csv_file("Recency,Frequency,Monetary,R_Score,F_Score,M_Score\n10,5,2000,5,4,3\n");
    let mut table = load_file(file.path()).unwrap();
    apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap();

    assert_eq!(table.records[0].rfm_score, Some(12.0));
    assert_eq!(table.records[0].segment, Some(Segment::BestCustomers));

    let metrics = HeadlineMetrics::compute(&table, &table.all_rows());
    assert_eq!(metrics.total, 1);
    assert_eq!(metrics.best_customers, 1);
    assert_eq!(metrics.loyal_customers, 0);
    assert_eq!(metrics.at_risk, 0);
}

#[test]
fn test_filter_and_report() {
    let file = csv_file(CUSTOMERS);
    let mut table = load_file(file.path()).unwrap();
    apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap();

    let filter = FilterSpec::Ranges(RangeFilter {
        recency: Interval::new(20.0, 80.0),
        frequency: Interval::new(1.0, 3.0),
        monetary: Interval::new(0.0, 10000.0),
    });
    assert_eq!(filtered_indices(&table, &filter), vec![1, 2]);

    let report = Report::build(&table, LabelingMode::ScoreBased, &filter);
    assert_eq!(report.overall.metrics.total, 5);
    assert_eq!(report.overall.metrics.best_customers, 1);
    assert_eq!(report.overall.metrics.loyal_customers, 2);
    assert_eq!(report.overall.metrics.at_risk, 1);
    assert_eq!(report.overall.metrics.churned, 1);
    assert_eq!(report.filtered.metrics.total, 2);
    assert_eq!(report.filtered.metrics.loyal_customers, 2);

    // Re-running on the same inputs gives the same answer.
    assert_eq!(Report::build(&table, LabelingMode::ScoreBased, &filter), report);
}

#[test]
fn test_empty_filter_result() {
    let file = csv_file(CUSTOMERS);
    let mut table = load_file(file.path()).unwrap();
    apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap();

    let mut ranges = RangeFilter::observed(&table);
    ranges.recency = Interval::new(1000.0, 2000.0);
    let report = Report::build(&table, LabelingMode::ScoreBased, &FilterSpec::Ranges(ranges));

    assert_eq!(report.filtered.metrics, HeadlineMetrics::default());
    assert!(report.filtered.counts.is_empty());
    assert!(report.filtered.means.iter().all(|m| m.recency.is_none()));
}

#[test]
fn test_missing_score_columns() {
    let file = csv_file("Recency,Frequency,Monetary\n10,5,2000\n");
    let mut table = load_file(file.path()).unwrap();
    let before = table.clone();

    let err = apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap_err();
    assert!(matches!(err, RfmError::MissingColumn(ref c) if c == "R_Score"));
    assert_eq!(table, before);
}

#[test]
fn test_malformed_file() {
    let file = csv_file("Recency,Frequency,Monetary\n10,5,lots\n");
    assert!(matches!(load_file(file.path()), Err(RfmError::MalformedFile(_))));
}

#[test]
fn test_export_round_trip() {
    let file = csv_file(CUSTOMERS);
    let mut table = load_file(file.path()).unwrap();
    apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap();

    let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    export_file(&table, out.path()).unwrap();

    let mut reloaded = load_file(out.path()).unwrap();
    apply_labeling(&mut reloaded, LabelingMode::ScoreBased).unwrap();

    let before: Vec<_> = table.records.iter().map(|r| r.segment).collect();
    let after: Vec<_> = reloaded.records.iter().map(|r| r.segment).collect();
    assert_eq!(before, after);
    assert_eq!(to_csv_bytes(&reloaded).unwrap(), to_csv_bytes(&table).unwrap());
}

#[test]
fn test_cluster_pipeline() {
    let csv = "\
CustomerID,Recency,Frequency,Monetary,Cluster
1,10,8,4000,2
2,20,6,3000,2
3,200,1,50,0
4,90,3,700,1
";
    let mut table = read_csv(csv.as_bytes()).unwrap();
    apply_labeling(&mut table, LabelingMode::ClusterBased).unwrap();

    let mut selection = ClusterSelection::all(&table);
    assert_eq!(selection.selected.len(), 3);
    selection.toggle(&CellValue::Integer(0));
    let filter = FilterSpec::Clusters(selection);
    assert_eq!(filtered_indices(&table, &filter), vec![0, 1, 3]);

    let means = label_means(&table, &table.all_rows(), LabelingMode::ClusterBased);
    let top = means
        .iter()
        .find(|m| m.label == Label::Cluster(CellValue::Integer(2)))
        .unwrap();
    assert_eq!(top.count, 2);
    assert_eq!(top.monetary, Some(3500.0));
}

#[test]
fn test_parquet_input() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("CustomerID", DataType::Utf8, false),
        Field::new("Recency", DataType::Int64, false),
        Field::new("Frequency", DataType::Int64, false),
        Field::new("Monetary", DataType::Float64, false),
        Field::new("RFM_Score", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["a", "b"])),
            Arc::new(Int64Array::from(vec![5, 300])),
            Arc::new(Int64Array::from(vec![9, 1])),
            Arc::new(Float64Array::from(vec![1500.0, 20.5])),
            Arc::new(Int64Array::from(vec![10, 4])),
        ],
    )
    .unwrap();

    let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
    let mut writer = ArrowWriter::try_new(std::fs::File::create(file.path()).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let mut table = load_file(file.path()).unwrap();
    assert_eq!(table.columns, ["CustomerID", "Recency", "Frequency", "Monetary", "RFM_Score"]);
    apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap();

    let segments: Vec<_> = table.records.iter().map(|r| r.segment).collect();
    assert_eq!(segments, vec![Some(Segment::BestCustomers), Some(Segment::AtRisk)]);
    assert_eq!(table.records[1].monetary, 20.5);
}
