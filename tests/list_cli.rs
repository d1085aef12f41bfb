// Binary-level checks for `gotest-util list`: the JSON shape,
// per-category sorting, platform filtering and overlay handling.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

mod util;
use util::{gotest_util, make_module};

fn names(report: &Value, key: &str) -> Vec<String> {
    report[key]
        .as_array()
        .map(|a| {
            a.iter()
                .map(|d| d["name"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn list_json(cmd: &mut std::process::Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("valid JSON")
}

#[test]
fn lists_every_category_for_linux() {
    let tmp = make_module();

    let report = list_json(
        gotest_util(tmp.path())
            .args(["list", "p", "--goos", "linux", "--goarch", "amd64"]),
    );

    assert_eq!(report["pkg_name"], "p");
    assert!(
        report["pkg_root"]
            .as_str()
            .expect("pkg_root")
            .ends_with(
                tmp.path()
                    .file_name()
                    .and_then(|n| n.to_str())
                    .expect("name")
            )
    );
    assert_eq!(names(&report, "tests"), ["TestAPI", "TestAdd"]);
    assert_eq!(names(&report, "benchmarks"), ["BenchmarkAdd"]);
    assert_eq!(names(&report, "examples"), ["ExampleAdd"]);
    assert_eq!(names(&report, "fuzz"), ["FuzzAdd"]);

    // Docs and positions
    let add = &report["tests"][1];
    assert_eq!(add["comment"], "TestAdd checks Add.\n");
    assert_eq!(add["line"], 6);
    assert!(add["filename"].as_str().expect("filename").ends_with("p_test.go"));
    assert!(report["tests"][0].get("comment").is_none());
    assert!(report.get("go_env").is_some());
}

#[test]
fn goos_flag_selects_platform_files() {
    let tmp = make_module();

    let report = list_json(gotest_util(tmp.path()).args(["list", "p", "--goos", "windows"]));

    assert_eq!(names(&report, "tests"), ["TestAPI", "TestAdd", "TestWindowsOnly"]);
    assert_eq!(report["go_env"]["GOOS"], "windows");
}

#[test]
fn file_argument_matches_its_environment() {
    let tmp = make_module();

    // A Windows-only file switches the environment on its own
    let report = list_json(
        gotest_util(tmp.path()).args(["list", "p/p_windows_test.go", "--goos", "linux"]),
    );

    assert!(names(&report, "tests").contains(&"TestWindowsOnly".to_string()));
    assert_eq!(report["go_env"]["GOOS"], "windows");
}

#[test]
fn package_without_tests_has_no_env_or_lists() {
    let tmp = make_module();
    tmp.child("q/q.go").write_str("package q\n").expect("write");

    let report = list_json(gotest_util(tmp.path()).args(["list", "q"]));

    assert_eq!(report["pkg_name"], "q");
    let obj = report.as_object().expect("object");
    assert_eq!(obj.len(), 2, "only pkg_name and pkg_root: {report}");
}

#[test]
fn overlay_buffer_replaces_disk_content() {
    let tmp = make_module();
    let file = tmp.child("p/p_test.go");
    let mut replace = serde_json::Map::new();
    replace.insert(
        file.path().to_string_lossy().into_owned(),
        Value::from("package p\n\nfunc TestUnsaved(t *T) {}\n"),
    );
    let overlay = serde_json::json!({ "replace": replace }).to_string();

    let report = list_json(gotest_util(tmp.path()).args([
        "list",
        "p",
        "--goos",
        "linux",
        "--overlay",
        overlay.as_str(),
    ]));

    assert_eq!(names(&report, "tests"), ["TestAPI", "TestUnsaved"]);
    assert!(names(&report, "benchmarks").is_empty());
}

#[test]
fn overlay_with_unknown_fields_fails() {
    let tmp = make_module();

    gotest_util(tmp.path())
        .args(["list", "p", "--overlay", r#"{"replace": {}, "bogus": true}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid overlay"));
}

#[test]
fn syntax_error_in_a_test_file_fails_the_listing() {
    let tmp = make_module();
    tmp.child("p/broken_test.go")
        .write_str("package p\n\nfunc TestBroken(t *T) {\n")
        .expect("write");

    gotest_util(tmp.path())
        .args(["list", "p", "--goos", "linux"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("broken_test.go"));
}

#[test]
fn mixed_packages_are_an_import_error() {
    let tmp = make_module();
    tmp.child("p/other.go").write_str("package other\n").expect("write");

    gotest_util(tmp.path())
        .args(["list", "p", "--goos", "linux"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("found packages"));
}
