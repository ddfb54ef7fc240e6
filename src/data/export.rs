use std::io::Write;
use std::path::Path;

use super::model::{CustomerRecord, CustomerTable, RFM_SCORE, SEGMENT};
use crate::error::{Result, RfmError};

pub const EXPORT_FILE_NAME: &str = "RFM_segmented.csv";
pub const EXPORT_MIME_TYPE: &str = "text/csv";

/// Header of the exported file: the input columns in their original order,
/// then `RFM_Score` if it was derived, then `Segment` if the table is
/// segmented. A column already present in the input is overwritten in place.
pub fn export_columns(table: &CustomerTable) -> Vec<String> {
    let mut columns = table.columns.clone();
    if table.derived_rfm_score && !table.has_column(RFM_SCORE) {
        columns.push(RFM_SCORE.to_string());
    }
    if table.segmented && !table.has_column(SEGMENT) {
        columns.push(SEGMENT.to_string());
    }
    columns
}

/// Text of one cell as exported, derived columns included.
pub fn cell_text(table: &CustomerTable, rec: &CustomerRecord, column: &str) -> String {
    match column {
        SEGMENT if table.segmented => rec.segment.map(|s| s.name().to_string()).unwrap_or_default(),
        RFM_SCORE if table.derived_rfm_score => rec
            .rfm_score
            .map(|v| v.to_string())
            .unwrap_or_default(),
        _ => rec.cells.get(column).map(ToString::to_string).unwrap_or_default(),
    }
}

fn write_error(err: csv::Error) -> RfmError {
    RfmError::Io(std::io::Error::other(err))
}

/// Write the table as UTF-8 CSV.
pub fn write_csv<W: Write>(table: &CustomerTable, writer: W) -> Result<()> {
    let columns = export_columns(table);
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&columns).map_err(write_error)?;

    for rec in &table.records {
        out.write_record(columns.iter().map(|col| cell_text(table, rec, col)))
            .map_err(write_error)?;
    }
    out.flush()?;
    Ok(())
}

/// The CSV export as bytes, ready for a download/save dialog.
pub fn to_csv_bytes(table: &CustomerTable) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

pub fn export_file(table: &CustomerTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(table, file)?;
    log::info!("Exported {} customers to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;
    use crate::data::model::Segment;
    use crate::data::segment::{apply_labeling, LabelingMode};

    const INPUT: &str = "\
CustomerID,Recency,Frequency,Monetary,R_Score,F_Score,M_Score
17850,10,5,2000.75,5,4,3
13047,200,1,150,1,1,1
12345,40,3,610.5,2,2,2
";

    fn segmented(csv: &str) -> CustomerTable {
        let mut table = read_csv(csv.as_bytes()).unwrap();
        apply_labeling(&mut table, LabelingMode::ScoreBased).unwrap();
        table
    }

    #[test]
    fn appends_derived_columns() {
        let bytes = to_csv_bytes(&segmented(INPUT)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("CustomerID,Recency,Frequency,Monetary,R_Score,F_Score,M_Score,RFM_Score,Segment")
        );
        assert_eq!(lines.next(), Some("17850,10,5,2000.75,5,4,3,12,Best Customers"));
        assert_eq!(lines.next(), Some("13047,200,1,150,1,1,1,3,Churned"));
        assert_eq!(lines.next(), Some("12345,40,3,610.5,2,2,2,6,Loyal Customers"));
    }

    #[test]
    fn reload_preserves_segments() {
        let table = segmented(INPUT);
        let bytes = to_csv_bytes(&table).unwrap();

        let mut reloaded = read_csv(bytes.as_slice()).unwrap();
        assert!(reloaded.has_column(RFM_SCORE));
        apply_labeling(&mut reloaded, LabelingMode::ScoreBased).unwrap();

        for (a, b) in table.records.iter().zip(&reloaded.records) {
            assert_eq!(a.segment, b.segment);
            assert_eq!(a.rfm_score, b.rfm_score);
            let written = b.cells[SEGMENT].to_string().parse::<Segment>().unwrap();
            assert_eq!(Some(written), a.segment);
        }

        // Columns are not appended a second time.
        let again = String::from_utf8(to_csv_bytes(&reloaded).unwrap()).unwrap();
        assert_eq!(
            again.lines().next(),
            Some("CustomerID,Recency,Frequency,Monetary,R_Score,F_Score,M_Score,RFM_Score,Segment")
        );
    }

    #[test]
    fn unsegmented_table_exports_input_layout() {
        let csv = "Recency,Frequency,Monetary,Cluster\n1,2,3,a\n";
        let mut table = read_csv(csv.as_bytes()).unwrap();
        apply_labeling(&mut table, LabelingMode::ClusterBased).unwrap();
        let text = String::from_utf8(to_csv_bytes(&table).unwrap()).unwrap();
        assert_eq!(text, csv);
    }
}
