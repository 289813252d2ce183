//! End-to-end runs of the `sa` binary against temp directories.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PRIORS: &str = "unit_id,probability,sweep_width,area\nA,0.9,10,100\nB,0.01,10,100\n";

fn sa() -> Command {
    Command::cargo_bin("sa").unwrap()
}

fn write(dir: &Path, name: &str, body: &str) -> String {
    let p = dir.join(name);
    fs::write(&p, body).unwrap();
    p.to_str().unwrap().to_string()
}

fn run_record(out: &Path) -> serde_json::Value {
    serde_json::from_slice(&fs::read(out.join("run_record.json")).unwrap()).unwrap()
}

#[test]
fn allocate_writes_tables_and_run_record() {
    let dir = TempDir::new().unwrap();
    let priors = write(dir.path(), "priors.csv", PRIORS);
    let out = dir.path().join("out");

    sa().args(["allocate", "--priors", &priors, "--effort", "10", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 kept, 1 dropped"));

    let alloc = fs::read_to_string(out.join("allocation.csv")).unwrap();
    assert!(alloc.starts_with("unit_id,area,probability,"));
    assert!(alloc.contains("\nA,"));
    let dropped = fs::read_to_string(out.join("dropped_units.csv")).unwrap();
    assert!(dropped.contains("\nB,"));

    let rec = run_record(&out);
    assert!(rec["id"].as_str().unwrap().starts_with("RUN:"));
    assert_eq!(rec["command"], "allocate");
    assert_eq!(rec["counts"]["units_dropped"], 1);
    assert_eq!(rec["counts"]["passes"], 2);
    assert!(rec["outputs_sha256"]["allocation.csv"].is_string());
    assert!(rec.get("warning").is_none());
    assert!(rec.get("manifest_id").is_none());
}

#[test]
fn run_record_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let priors = write(dir.path(), "priors.csv", PRIORS);
    let (a, b) = (dir.path().join("a"), dir.path().join("b"));
    for out in [&a, &b] {
        sa().args(["--quiet", "allocate", "--priors", &priors, "--effort", "10", "--out"])
            .arg(out)
            .assert()
            .success();
    }
    assert_eq!(
        fs::read(a.join("run_record.json")).unwrap(),
        fs::read(b.join("run_record.json")).unwrap()
    );
}

#[test]
fn iteration_cap_is_a_warning_not_a_failure() {
    let dir = TempDir::new().unwrap();
    let priors = write(dir.path(), "priors.csv", PRIORS);
    let out = dir.path().join("out");

    sa().args(["--quiet", "allocate", "--priors", &priors, "--effort", "10", "--max-iters", "0", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("iteration cap"));

    let rec = run_record(&out);
    assert!(rec["warning"].as_str().unwrap().contains("iteration cap 0"));
    assert_eq!(rec["counts"]["units_dropped"], 0);
}

#[test]
fn all_dropped_exits_3() {
    let dir = TempDir::new().unwrap();
    let priors = write(dir.path(), "priors.csv", PRIORS);
    sa().args(["--quiet", "allocate", "--priors", &priors, "--effort", "-50", "--out"])
        .arg(dir.path().join("out"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("all allocations dropped at iteration 1"));
}

#[test]
fn missing_column_exits_2_and_names_it() {
    let dir = TempDir::new().unwrap();
    let priors = write(dir.path(), "priors.csv", "unit_id,probability,area\nA,0.5,100\n");
    sa().args(["allocate", "--priors", &priors, "--effort", "10", "--out"])
        .arg(dir.path().join("out"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("sweep_width"));
}

#[test]
fn missing_input_file_exits_2() {
    sa().args(["allocate", "--priors", "no/such/priors.csv", "--effort", "10"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn manifest_params_and_flag_override() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "priors.csv", PRIORS);
    let man = write(
        dir.path(),
        "run.json",
        r#"{ "id": "cycle-7", "priors_path": "priors.csv", "params": { "total_effort": -50.0 } }"#,
    );

    // manifest effort drops everything
    sa().args(["--quiet", "allocate", "--manifest", &man, "--out"])
        .arg(dir.path().join("m1"))
        .assert()
        .code(3);

    // flag wins over the manifest
    let out = dir.path().join("m2");
    sa().args(["--quiet", "allocate", "--manifest", &man, "--effort", "10", "--out"])
        .arg(&out)
        .assert()
        .success();
    let rec = run_record(&out);
    assert_eq!(rec["params"]["total_effort"], 10.0);
    assert!(rec["inputs_sha256"]["manifest"].is_string());
    assert_eq!(rec["manifest_id"], "cycle-7");
}

#[test]
fn manifest_digest_mismatch_exits_2() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "priors.csv", PRIORS);
    let bad = "0".repeat(64);
    let man = write(
        dir.path(),
        "run.json",
        &format!(r#"{{ "priors_path": "priors.csv", "inputs_sha256": {{ "priors_path": "{bad}" }} }}"#),
    );
    sa().args(["allocate", "--manifest", &man, "--effort", "10", "--out"])
        .arg(dir.path().join("out"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("sha256 mismatch"));
}

#[test]
fn update_writes_posterior_and_next_priors() {
    let dir = TempDir::new().unwrap();
    let priors = write(dir.path(), "priors.csv", PRIORS);
    let obs = write(dir.path(), "obs.csv", "unit_id,l_walked_today,success\nA,10,0\n");
    let out = dir.path().join("out");

    sa().args(["--quiet", "update", "--priors", &priors, "--observations", &obs, "--out"])
        .arg(&out)
        .assert()
        .success();

    let post = fs::read_to_string(out.join("posterior.csv")).unwrap();
    assert!(post.starts_with("unit_id,prior_prob,coverage,post_prob,updated\n"));
    assert!(post.contains("A,0.9,1,0,1\n"));
    assert!(post.contains("B,0.01,0,0.01,0\n"));

    let next = fs::read_to_string(out.join("next_priors.csv")).unwrap();
    assert!(next.contains("A,100,0,10,"));

    let rec = run_record(&out);
    assert_eq!(rec["command"], "update");
    assert_eq!(rec["counts"]["units_updated"], 1);
}

#[test]
fn posterior_from_merged_table() {
    let dir = TempDir::new().unwrap();
    let table = write(
        dir.path(),
        "merged.csv",
        "unit_id,probability,sweep_width,area,l_walked_today,success\nA,0.4,10,100,5,1\nB,0.4,10,100,,\n",
    );
    let out = dir.path().join("out");
    sa().args(["--quiet", "posterior", "--table", &table, "--out"])
        .arg(&out)
        .assert()
        .success();
    let post = fs::read_to_string(out.join("posterior.csv")).unwrap();
    assert!(post.contains("A,0.4,0.5,1,1\n"));
    assert!(post.contains("B,0.4,0,0.4,0\n"));
}

#[test]
fn validate_reports_duplicate_observations() {
    let dir = TempDir::new().unwrap();
    let priors = write(dir.path(), "priors.csv", PRIORS);
    let obs = write(dir.path(), "obs.csv", "unit_id,l_walked_today,success\nA,1,0\nA,2,1\n");

    sa().args(["validate", "--priors", &priors])
        .assert()
        .success()
        .stderr(predicate::str::contains("inputs OK"));

    sa().args(["validate", "--priors", &priors, "--observations", &obs])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("duplicate_observation"));
}

#[test]
fn zero_probability_validates_and_is_dropped_by_allocate() {
    let dir = TempDir::new().unwrap();
    let priors = write(
        dir.path(),
        "priors.csv",
        "unit_id,probability,sweep_width,area\nA,0,10,100\nB,0.9,10,100\n",
    );

    sa().args(["validate", "--priors", &priors])
        .assert()
        .success()
        .stderr(predicate::str::contains("inputs OK"));

    let out = dir.path().join("out");
    sa().args(["--quiet", "allocate", "--priors", &priors, "--effort", "10", "--out"])
        .arg(&out)
        .assert()
        .success();

    let alloc = fs::read_to_string(out.join("allocation.csv")).unwrap();
    assert!(alloc.contains("\nB,"));
    assert!(!alloc.contains("\nA,"));
    let dropped = fs::read_to_string(out.join("dropped_units.csv")).unwrap();
    assert!(dropped.contains("\nA,"));
    assert!(dropped.contains("zero probability (iteration 1)"));

    let rec = run_record(&out);
    assert_eq!(rec["counts"]["units_in"], 2);
    assert_eq!(rec["counts"]["units_dropped"], 1);
}
