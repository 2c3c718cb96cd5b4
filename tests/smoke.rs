//! Smoke tests -- verify the binary runs and each subcommand works end to end.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

const HEADER: &str = "sku,location,description,supplier,quantity,net_value,document_date,order_number";

fn purchases_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for i in 0..3 {
        writeln!(file, "A,L1,Rice 5kg,Acme,2,20,2024-01-0{},A{}", i + 1, i).unwrap();
    }
    for i in 0..9 {
        writeln!(file, "B,L1,Beans 1kg,Acme,1,20,2024-02-0{},B{}", i + 1, i).unwrap();
    }
    writeln!(file, "B,L1,Beans 1kg,Other,1,400,2024-02-15,B9").unwrap();
    writeln!(file, "C,L2,Oil 900ml,Acme,1,1200,2024-03-01,C0").unwrap();
    file
}

fn priceaudit() -> Command {
    let mut cmd = Command::cargo_bin("priceaudit").unwrap();
    cmd.env_remove("PRICEAUDIT_CONFIG").env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_cli_help() {
    priceaudit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Procurement price anomaly detection"));
}

#[test]
fn test_cli_version() {
    priceaudit()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("priceaudit"));
}

#[test]
fn test_subcommands_exist() {
    for sub in ["analyze", "check-prices", "overview", "compare"] {
        priceaudit().args([sub, "--help"]).assert().success();
    }
}

#[test]
fn test_analyze_ranks_unstable_group() {
    let csv = purchases_csv();
    priceaudit()
        .arg("analyze")
        .arg("--input")
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Suspect groups: 1"))
        .stdout(predicate::str::contains("B (L1)"))
        .stdout(predicate::str::contains("1 single-purchase group not tested"));
}

#[test]
fn test_analyze_json_with_filters() {
    let csv = purchases_csv();
    let output = priceaudit()
        .args(["analyze", "--json", "--location", "L1", "--from", "2024-02-01"])
        .arg("--input")
        .arg(csv.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["filtered_records"], 10);
    assert_eq!(value["suspects"][0]["key"]["sku"], "B");
    assert_eq!(value["suspects"][0]["outlier_count"], 1);
    assert_eq!(value["records"].as_array().map(Vec::len), Some(10));
    assert_eq!(value["single_sample"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_analyze_json_lists_filtered_records() {
    let csv = purchases_csv();
    let output = priceaudit()
        .args(["analyze", "--json", "--sku", "C", "--limit", "5"])
        .arg("--input")
        .arg(csv.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["filtered_records"], 1);
    assert_eq!(value["records"][0]["order_number"], "C0");
    assert_eq!(value["records"][0]["net_value"], 1200.0);
    assert_eq!(value["single_sample"][0]["sku"], "C");

    let output = priceaudit()
        .args(["analyze", "--json", "--limit", "2"])
        .arg("--input")
        .arg(csv.path())
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["filtered_records"], 14);
    assert_eq!(value["records"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_analyze_text_lists_purchases_with_limit() {
    let csv = purchases_csv();
    priceaudit()
        .args(["analyze", "--limit", "3"])
        .arg("--input")
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Filtered purchases"))
        .stdout(predicate::str::contains("... 11 more"));
}

#[test]
fn test_analyze_rejects_negative_threshold() {
    let csv = purchases_csv();
    priceaudit()
        .args(["analyze", "--threshold=-1"])
        .arg("--input")
        .arg(csv.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid detection parameters"));
}

#[test]
fn test_check_prices_flags_line_above_ceiling() {
    let csv = purchases_csv();
    priceaudit()
        .arg("check-prices")
        .arg("--input")
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Value above market (1200 > 1000)"))
        .stdout(predicate::str::contains("1 alert"));
}

#[test]
fn test_check_prices_unit_basis() {
    let csv = purchases_csv();
    priceaudit()
        .args(["check-prices", "--basis", "unit-price", "--market-price", "300"])
        .arg("--input")
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("order B9"))
        .stdout(predicate::str::contains("order C0"))
        .stdout(predicate::str::contains("2 alerts"));
}

#[test]
fn test_overview_lists_locations() {
    let csv = purchases_csv();
    priceaudit()
        .arg("overview")
        .arg("--input")
        .arg(csv.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Spend by location"))
        .stdout(predicate::str::contains("L2"))
        .stdout(predicate::str::contains("3 SKUs, 2 locations"))
        .stdout(predicate::str::contains("20.00 / 20.00 / 20.00 / 20.00 / 400.00"))
        .stdout(predicate::str::contains("Monthly average unit price"))
        .stdout(predicate::str::contains("2024-02 58.00"));
}

#[test]
fn test_compare_against_reference_table() {
    let csv = purchases_csv();
    let mut reference = NamedTempFile::new().unwrap();
    writeln!(
        reference,
        "[[reference]]\nsku = \"A\"\nlocation = \"L1\"\ninternal_average_price = 10.0\nexternal_reference_price = 8.0\nnote = \"check supplier\""
    )
    .unwrap();

    priceaudit()
        .arg("compare")
        .arg("--input")
        .arg(csv.path())
        .arg("--reference")
        .arg(reference.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1.25x"))
        .stdout(predicate::str::contains("check supplier"));
}

#[test]
fn test_invalid_row_rejects_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    writeln!(file, "A,L1,Rice,Acme,0,20,2024-01-01,A0").unwrap();

    priceaudit()
        .arg("analyze")
        .arg("--input")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}
