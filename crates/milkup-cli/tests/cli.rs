// SPDX-License-Identifier: AGPL-3.0-or-later
use assert_cmd::cargo::cargo_bin_cmd;
use milkup_core::Markdown;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn import_prints_outline() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "# Title\n\nSome **bold** text\n").unwrap();

    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("import").arg(&input).arg("--outline");
    cmd.assert().success().stdout(
        predicate::str::contains("heading level=1")
            .and(predicate::str::contains("  paragraph"))
            .and(predicate::str::contains("text \"bold\" [bold]")),
    );
}

#[test]
fn import_reads_stdin_as_json() {
    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("import").arg("-").write_stdin("*hi*");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"paragraph\"").and(predicate::str::contains("\"italic\": true")));
}

#[test]
fn export_renders_json_tree() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("tree.json");
    let tree = Markdown::default().parse("## Hi\n\n- a\n- b").to_tree();
    fs::write(&input, serde_json::to_string(&tree).unwrap()).unwrap();

    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("export").arg(&input);
    cmd.assert().success().stdout("## Hi\n\n- a\n- b\n");
}

#[test]
fn export_rejects_illegal_tree() {
    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("export")
        .arg("-")
        .write_stdin(r#"{"type":"root","children":[{"type":"text","content":"x"}]}"#);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid document tree"));
}

#[test]
fn roundtrip_canonicalizes_markers() {
    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("roundtrip")
        .arg("--check")
        .arg("-")
        .write_stdin("__b__ and _i_\n\n* item");
    cmd.assert().success().stdout("**b** and *i*\n\n- item\n");
}

#[test]
fn stats_counts_words() {
    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("stats").arg("-").write_stdin("# One two\n\nthree");
    cmd.assert().success().stdout(
        predicate::str::contains("\"blocks\": 2").and(predicate::str::contains("\"word_count\": 3")),
    );
}

#[test]
fn transformers_follow_config() {
    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("transformers");
    cmd.assert().success().stdout(
        predicate::str::contains("HEADING")
            .and(predicate::str::contains("INLINE_EQUATION"))
            .and(predicate::str::contains("text-match")),
    );

    let dir = tempdir().unwrap();
    let config = dir.path().join("milkup.toml");
    fs::write(&config, "[registry]\ndisabled = [\"HEADING\"]\n").unwrap();
    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("transformers").arg("--config").arg(&config);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("HEADING").not());
}

#[test]
fn missing_node_type_is_a_startup_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("milkup.toml");
    fs::write(&config, "[registry]\nnodes = [\"root\", \"paragraph\", \"text\"]\n").unwrap();

    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("--config").arg(&config).arg("transformers");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("depends on node type"));
}

#[test]
fn unreadable_config_reports_path() {
    let mut cmd = cargo_bin_cmd!("milkup");
    cmd.arg("--config").arg("does-not-exist.toml").arg("transformers");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}
