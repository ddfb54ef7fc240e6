//! Integration tests for the `rfm-report` binary

use std::io::Write;
use std::process::Command;

use serde_json::Value;

const CUSTOMERS: &str = "\
CustomerID,Recency,Frequency,Monetary,R_Score,F_Score,M_Score
17850,10,5,2000,5,4,3
13047,50,2,5000,2,2,3
15311,360,1,12.25,1,1,1
";

#[test]
fn test_json_output_with_export_is_valid_json() {
    let mut input = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(input, "{CUSTOMERS}").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("out.csv");

    let output = Command::new(env!("CARGO_BIN_EXE_rfm-report"))
        .arg("--input")
        .arg(input.path())
        .arg("--json")
        .arg("--export")
        .arg(&export)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["report"]["overall"]["metrics"]["total"], 3);
    assert!(export.exists());
}

#[test]
fn test_text_output_reports_export_path() {
    let mut input = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(input, "{CUSTOMERS}").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("out.csv");

    let output = Command::new(env!("CARGO_BIN_EXE_rfm-report"))
        .arg("--input")
        .arg(input.path())
        .arg("--export")
        .arg(&export)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Segmented data saved to:"), "{stdout}");
}
