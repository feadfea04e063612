//! CLI behavior tests: subcommands, flags, config discovery and exit codes.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn fixflow() -> Command {
    Command::cargo_bin("fixflow").expect("fixflow binary")
}

fn create_temp_project(files: &[(&str, &str)]) -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    for (name, text) in files {
        let path = td.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    td
}

fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap()
}

#[test]
fn test_format_no_args_uses_current_dir() {
    let temp = create_temp_project(&[("A.cs", "class A {}   \n"), ("notes.txt", "keep   \n")]);

    fixflow()
        .current_dir(temp.path())
        .arg("format")
        .assert()
        .success()
        .stdout(predicate::str::contains("# fixflow run"));

    assert_eq!(read(temp.path(), "A.cs"), "class A {}\n");
    assert_eq!(read(temp.path(), "notes.txt"), "keep   \n");
}

#[test]
fn test_check_reports_pending_changes_without_writing() {
    let temp = create_temp_project(&[("src/A.cs", "class A {}   \n")]);

    fixflow()
        .arg("check")
        .arg(temp.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("changed 1"));

    assert_eq!(read(temp.path(), "src/A.cs"), "class A {}   \n");
}

#[test]
fn test_check_clean_project_succeeds() {
    let temp = create_temp_project(&[("A.cs", "class A {}\n")]);

    fixflow()
        .arg("check")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("changed 0"));
}

#[test]
fn test_check_lists_remaining_diagnostics() {
    let temp = create_temp_project(&[(
        "A.cs",
        "class A {\n    private int x;\n    void M(int x) { this.x = x; }\n}\n",
    )]);

    fixflow()
        .arg("check")
        .arg(temp.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("## Remaining diagnostics"))
        .stdout(predicate::str::contains("`FF0001`"));
}

#[test]
fn test_rule_toggle_disables_rule() {
    let temp = create_temp_project(&[("A.cs", "class A {}   \n")]);

    fixflow()
        .arg("format")
        .arg(temp.path())
        .arg("--rule")
        .arg("Format-Document=false")
        .assert()
        .success();

    assert_eq!(read(temp.path(), "A.cs"), "class A {}   \n");
}

#[test]
fn test_unknown_rule_fails_before_processing() {
    let temp = create_temp_project(&[("A.cs", "class A {}   \n")]);

    fixflow()
        .arg("format")
        .arg(temp.path())
        .arg("--rule")
        .arg("nope=true")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown rule `nope`"));

    assert_eq!(read(temp.path(), "A.cs"), "class A {}   \n");
}

#[test]
fn test_invalid_rule_toggle_format() {
    fixflow()
        .arg("check")
        .arg("--rule")
        .arg("format-document")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing value"));
}

#[test]
fn test_invalid_option_format() {
    fixflow()
        .arg("check")
        .arg("--option")
        .arg("header=x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<rule>.<key>=<value>"));
}

#[test]
fn test_config_file_sets_header_option() {
    let temp = create_temp_project(&[
        (
            "fixflow.toml",
            "[rules.options.copyright-header]\nheader = \"Copyright (c) Example\"\n",
        ),
        ("A.cs", "class A {}\n"),
    ]);

    fixflow().arg("format").arg(temp.path()).assert().success();

    assert_eq!(
        read(temp.path(), "A.cs"),
        "// Copyright (c) Example\n\nclass A {}\n"
    );
}

#[test]
fn test_cli_option_and_explicit_config() {
    let temp = create_temp_project(&[
        ("custom.toml", "[rules]\nformat-document = false\n"),
        ("A.cs", "class A {}   \n"),
    ]);

    fixflow()
        .arg("format")
        .arg(temp.path())
        .arg("--config")
        .arg(temp.path().join("custom.toml"))
        .arg("--option")
        .arg("copyright-header.header=Copyright (c) Cli")
        .assert()
        .success();

    assert_eq!(
        read(temp.path(), "A.cs"),
        "// Copyright (c) Cli\n\nclass A {}   \n"
    );
}

#[test]
fn test_file_name_filter() {
    let temp = create_temp_project(&[("A.cs", "class A {}   \n"), ("B.cs", "class B {}   \n")]);

    fixflow()
        .arg("format")
        .arg(temp.path())
        .arg("--file")
        .arg("b.cs")
        .assert()
        .success();

    assert_eq!(read(temp.path(), "A.cs"), "class A {}   \n");
    assert_eq!(read(temp.path(), "B.cs"), "class B {}\n");
}

#[test]
fn test_patch_and_report_outputs() {
    let temp = create_temp_project(&[("A.cs", "class A {}   \n")]);
    let out = tempfile::tempdir().expect("out dir");
    let patch = out.path().join("changes.diff");
    let report = out.path().join("report.json");

    fixflow()
        .arg("check")
        .arg(temp.path())
        .arg("--patch")
        .arg(&patch)
        .arg("--report")
        .arg(&report)
        .assert()
        .code(2);

    let diff = fs::read_to_string(&patch).expect("patch written");
    assert!(diff.contains("-class A {}   "));
    assert!(diff.contains("+class A {}"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report written")).unwrap();
    assert_eq!(json["units"][0]["unit"], "A.cs");
    assert_eq!(json["units"][0]["changed"], true);
}

#[test]
fn test_extra_configuration_is_processed() {
    let temp = create_temp_project(&[(
        "A.cs",
        "class A {\n#if DEBUG\n    int x = 1;   \n#endif\n}\n",
    )]);

    fixflow().arg("format").arg(temp.path()).assert().success();
    assert!(read(temp.path(), "A.cs").contains("int x = 1;   \n"));

    fixflow()
        .arg("format")
        .arg(temp.path())
        .arg("--configuration")
        .arg("DEBUG")
        .assert()
        .success();
    assert!(read(temp.path(), "A.cs").contains("int x = 1;\n"));
}

#[test]
fn test_nonexistent_root() {
    fixflow()
        .arg("check")
        .arg("/nonexistent/fixflow/root")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a directory"));
}

#[test]
fn test_list_text_format() {
    fixflow()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rules:"))
        .stdout(predicate::str::contains("copyright-header"))
        .stdout(predicate::str::contains("FF0001"));
}

#[test]
fn test_list_analyzers_only() {
    fixflow()
        .arg("list")
        .arg("--analyzers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Analyzers:"))
        .stdout(predicate::str::contains("Rules:").not());
}

#[test]
fn test_list_json_format() {
    fixflow()
        .arg("list")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("fixflow.rule_list.v1"))
        .stdout(predicate::str::contains("\"explicit-this\""));
}

#[test]
fn test_list_invalid_format() {
    fixflow()
        .arg("list")
        .arg("--format")
        .arg("invalid")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("invalid").or(predicate::str::contains("possible values")),
        );
}

#[test]
fn test_export_options_round_trips_through_format() {
    let temp = create_temp_project(&[("A.cs", "class A {}   \n")]);

    fixflow()
        .arg("export-options")
        .arg("--out")
        .arg(temp.path().join("fixflow.toml"))
        .assert()
        .success();

    let exported = read(temp.path(), "fixflow.toml");
    assert!(exported.contains("[rules]"));
    assert!(exported.contains("format-document = true"));

    fixflow().arg("format").arg(temp.path()).assert().success();
    assert_eq!(read(temp.path(), "A.cs"), "class A {}\n");
}
