mod common;

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

use common::test_helpers::*;

fn run_cli(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cxml-outbound"))
        .args(args)
        .current_dir(workdir)
        .env_remove("RUST_LOG")
        .env_remove("CXML_TIMEOUT")
        .env_remove("CXML_DTD_DIR")
        .env_remove("CXML_VALIDATE_ORDERS")
        .env_remove("CXML_VERBOSE")
        .env_remove("CXML_QUIET")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_cli_help_output() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("render"));
    assert!(stdout.contains("submit"));
    assert!(stdout.contains("--dtd-dir"));
    assert!(stdout.contains("--validate-orders"));
}

#[test]
fn test_render_order_description() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_description(temp_dir.path(), "order.json", &order_description_json("PO-500"));

    let output = run_cli(temp_dir.path(), &["render", file.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("<?xml"));
    assert!(stdout.contains("payloadID=\"po-1@buyer.example\""));
    assert!(stdout.contains("orderID=\"PO-500\""));
}

#[test]
fn test_render_compact_has_no_indentation() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_description(temp_dir.path(), "order.json", &order_description_json("PO-501"));

    let output = run_cli(temp_dir.path(), &["render", "--compact", file.to_str().unwrap()]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("\n  <"));
}

#[test]
fn test_submit_to_test_destination() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_description(temp_dir.path(), "order.json", &order_description_json("PO-502"));

    let output = run_cli(
        temp_dir.path(),
        &["submit", file.to_str().unwrap(), "--url", "%%TEST%%"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Test destination"));
}

#[test]
fn test_submit_invoice_without_dtds_fails() {
    let temp_dir = TempDir::new().unwrap();
    let dtd_dir = TempDir::new().unwrap();
    let file = write_description(
        temp_dir.path(),
        "invoice.json",
        &invoice_description_json("inv-500@supplier.example"),
    );

    let output = run_cli(
        temp_dir.path(),
        &[
            "submit",
            file.to_str().unwrap(),
            "--url",
            "%%TEST%%",
            "--dtd-dir",
            dtd_dir.path().to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("InvoiceDetail.dtd"), "{stderr}");
}

#[test]
fn test_invalid_description_reports_field() {
    let temp_dir = TempDir::new().unwrap();
    let mut description = order_description_json("PO-503");
    description["items"][0]["quantity"] = serde_json::json!("lots");
    let file = write_description(temp_dir.path(), "order.json", &description);

    let output = run_cli(temp_dir.path(), &["-q", "render", file.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("INVALID order item: quantity"), "{stderr}");
}

#[test]
fn test_missing_file_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["render", "/nonexistent/order.json"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("File does not exist"));
}

#[test]
fn test_cli_conflicting_options() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["--verbose", "--quiet", "render", "order.json"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_config_file_in_working_directory_is_used() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("cxml-outbound.toml"),
        "[output]\npretty = false\n",
    )
    .unwrap();
    let file = write_description(temp_dir.path(), "order.json", &order_description_json("PO-504"));

    let output = run_cli(temp_dir.path(), &["render", file.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("\n  <"));
}
