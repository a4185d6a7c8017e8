//! Integration tests running the `unitq` binary

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn unitq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_unitq"))
        .args(args)
        .output()
        .expect("failed to run unitq")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Pipe lines into the binary's stdin
fn unitq_piped(input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_unitq"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn unitq");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_mul_cancels_units() {
    let output = unitq(&["mul", "12 s", "3 1/s"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "36");
}

#[test]
fn test_normalize() {
    let output = unitq(&["normalize", "a*b*c/b"]);
    assert_eq!(stdout(&output), "a*c");
}

#[test]
fn test_negative_argument() {
    let output = unitq(&["abs", "-5.5 m"]);
    assert_eq!(stdout(&output), "5.5 m");
}

#[test]
fn test_json_output() {
    let output = unitq(&["--json", "div", "100 km", "2 h"]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["type"], "quantity");
    assert_eq!(value["value"], "50 km/h");
}

#[test]
fn test_mismatch_fails() {
    let output = unitq(&["add", "1 apple", "1 banana"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unit mismatch"));
}

#[test]
fn test_sum_fallback() {
    let output = unitq(&["sum", "--exponent", "-2", "--unit", "DKK"]);
    assert_eq!(stdout(&output), "0.00 DKK");
}

#[test]
fn test_non_finite_rejected() {
    let output = unitq(&["inverse", "inf m"]);
    assert!(!output.status.success());
}

#[test]
fn test_pipe_mode() {
    let output = unitq_piped("# rates\ndiv 100 km | 2 h\nconvert 1500 kWh | MWh | -3\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "50 km/h\n1.500 MWh");
}

#[test]
fn test_pipe_mode_reports_bad_lines() {
    let output = unitq_piped("add 1 m | 1 s\nmul 2 m | 3 m\n");
    assert!(!output.status.success());
    assert_eq!(stdout(&output), "6 m*m");
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 1"));
}
