//! End-to-end CLI scenarios, driven through the compiled `hbal` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn write_fixture(dir: &std::path::Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{}", lines.join("\n")).unwrap();
    path
}

/// §8 scenario 1: two identical nodes, cross-secondaries, already balanced.
#[test]
fn balanced_two_node_cluster_produces_zero_placements() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(
        tmp.path(),
        "cluster.txt",
        &[
            "default | uuid-g1 | preferred |  | ",
            "",
            "node1.example.com | 32762 | 1024 | 7280 | 1861 | 1026 | 4 | N | uuid-g1 | 8 |  | Y | 8 | 4 | 1.0",
            "node2.example.com | 32762 | 1024 | 7280 | 1861 | 1026 | 4 | N | uuid-g1 | 8 |  | Y | 8 | 4 | 1.0",
            "",
            "inst1 | 1024 | 100 | 1 | running | Y | node1.example.com | node2.example.com | drbd |  | 1 | 1",
            "inst2 | 1024 | 100 | 1 | running | Y | node2.example.com | node1.example.com | drbd |  | 1 | 1",
            "",
            "",
            "cluster | 1:128:1024:1:1:1 | 1:1024:10240:1:1:1 | 8:16384:102400:4:4:8 | drbd,plain | 4.0 | 1.0",
        ],
    );

    Command::cargo_bin("hbal")
.unwrap()
.arg("--text-data")
.arg(&input)
.arg("--quiet")
.arg("--machine-readable")
.assert()
.success()
.stdout(predicate::str::contains("placements=0"));
}

/// §8 scenario 2: one overloaded node, three identical nodes, five instances.
#[test]
fn overloaded_node_is_rebalanced() {
    let tmp = tempfile::tempdir().unwrap();
    let mut lines = vec![
        "default | uuid-g1 | preferred |  | ".to_string(),
        String::new(),
    ];
    for i in 1..=3 {
        lines.push(format!("node{i}.example.com | 32762 | 1024 | 7280 | 1861 | 1026 | 4 | N | uuid-g1 | 8 | | Y | 8 | 4 | 1.0"));
    }
    lines.push(String::new());
    for i in 1..=5 {
        lines.push(format!("inst{i} | 1024 | 100 | 1 | running | Y | node1.example.com | node2.example.com | drbd | | 1 | 1"));
    }
    lines.push(String::new());
    lines.push(String::new());
    lines.push(
        "cluster | 1:128:1024:1:1:1 | 1:1024:10240:1:1:1 | 8:16384:102400:4:4:8 | drbd,plain | 4.0 | 1.0"
.to_string(),
    );
    let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let input = write_fixture(tmp.path(), "cluster.txt", &line_refs);

    Command::cargo_bin("hbal")
.unwrap()
.arg("--text-data")
.arg(&input)
.arg("--quiet")
.arg("--machine-readable")
.assert()
.success()
.stdout(predicate::str::contains("placements=4"));
}

#[test]
fn missing_input_mode_exits_with_cli_parse_code() {
    Command::cargo_bin("hbal").unwrap().assert().failure().code(2);
}

#[test]
fn conflicting_input_modes_exit_with_cli_parse_code() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_fixture(
        tmp.path(),
        "cluster.txt",
        &["default | uuid-g1 | preferred |  | "],
    );
    Command::cargo_bin("hbal")
.unwrap()
.arg("--text-data")
.arg(&input)
.arg("--rapi")
.arg(tmp.path())
.assert()
.failure()
.code(2);
}

#[test]
fn luxi_input_mode_reports_not_implemented() {
    Command::cargo_bin("hbal")
.unwrap()
.arg("--luxi")
.assert()
.failure()
.code(1)
.stderr(predicate::str::contains("not implemented"));
}
