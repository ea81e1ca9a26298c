#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn run_json(config_home: &Path, args: &[&str], dir: &Path) -> Value {
    let output = cargo_bin_cmd!("shardgraph")
        .env("XDG_CONFIG_HOME", config_home)
        .args(["--format", "json"])
        .args(args)
        .arg(dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("valid json")
}

#[test]
fn generate_then_inspect() {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("graph");

    let generated = run_json(
        dir.path(),
        &["generate", "--vertices", "10", "--edges", "5", "--seed", "7"],
        &data,
    );
    assert_eq!(generated["vertices"], 10);
    assert_eq!(generated["edges"], 5);
    assert_eq!(generated["incidences"], 10);
    assert_eq!(generated["records_written"], 25);

    let report = run_json(dir.path(), &["inspect"], &data);
    assert_eq!(report["partial_graph"], 1);
    assert_eq!(report["schema"], "sample");
    assert_eq!(report["vertices"], 10);
    assert_eq!(report["edges"], 5);
    assert_eq!(report["resident_incidences"], 10);
    assert_eq!(report["registered_partial_graphs"], serde_json::json!([1]));
    assert!(report["vertex_list_version"].as_i64().unwrap_or(0) > 0);
}

#[test]
fn inspect_prints_text_report() {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("graph");
    cargo_bin_cmd!("shardgraph")
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["generate", "--vertices", "3", "--edges", "1"])
        .arg(&data)
        .assert()
        .success();

    let output = cargo_bin_cmd!("shardgraph")
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("inspect")
        .arg(&data)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.starts_with("partial graph 1 (sample)"), "{text}");
    assert!(text.contains("vertices"));
    assert!(text.contains("partial graphs"));
}

#[test]
fn custom_schema_is_used_for_generation() {
    let dir = TempDir::new().expect("tempdir");
    let schema = dir.path().join("schema.toml");
    fs::write(
        &schema,
        r#"
name = "roads"

[[vertex_types]]
id = 10
name = "City"

[[edge_types]]
id = 11
name = "Road"

[[incidence_types]]
id = 12
name = "from"
direction = "out"

[[incidence_types]]
id = 13
name = "to"
direction = "in"
"#,
    )
    .expect("write schema");
    let data = dir.path().join("roads");
    let schema_arg = schema.to_str().expect("utf8 path");

    let generated = run_json(
        dir.path(),
        &["generate", "--vertices", "4", "--edges", "3", "--schema", schema_arg],
        &data,
    );
    assert_eq!(generated["edges"], 3);

    let report = run_json(dir.path(), &["inspect", "--schema", schema_arg], &data);
    assert_eq!(report["schema"], "roads");
    assert_eq!(report["vertices"], 4);
}

#[test]
fn oversized_type_ids_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let schema = dir.path().join("huge.toml");
    fs::write(
        &schema,
        "name = \"huge\"\n\n[[vertex_types]]\nid = 4000000000\nname = \"Huge\"\n",
    )
    .expect("write schema");
    let output = cargo_bin_cmd!("shardgraph")
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["generate", "--vertices", "1", "--edges", "0", "--schema"])
        .arg(&schema)
        .arg(dir.path().join("graph"))
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("type id 4000000000"), "{stderr}");
}

#[test]
fn inspecting_an_empty_directory_fails() {
    let dir = TempDir::new().expect("tempdir");
    let output = cargo_bin_cmd!("shardgraph")
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("inspect")
        .arg(dir.path().join("nothing"))
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("holds no graph"), "{stderr}");
}

#[test]
fn generating_twice_into_one_directory_fails() {
    let dir = TempDir::new().expect("tempdir");
    let data = dir.path().join("graph");
    for expect_success in [true, false] {
        let assert = cargo_bin_cmd!("shardgraph")
            .env("XDG_CONFIG_HOME", dir.path())
            .args(["generate", "--vertices", "2", "--edges", "0"])
            .arg(&data)
            .assert();
        if expect_success {
            assert.success();
        } else {
            assert.failure();
        }
    }
}
