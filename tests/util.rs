//! Shared test utilities for integration tests
//!
//! Provides a hermetic command builder and Go module fixtures
//! used across multiple test files.

#![allow(dead_code)]

use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;

/// Variables that would leak the developer's Go setup into a test
const SCRUBBED: &[&str] = &[
    "GOOS",
    "GOARCH",
    "CGO_ENABLED",
    "GOEXPERIMENT",
    "GOFLAGS",
    "RUST_LOG",
    "GOTEST_UTIL_TAGS",
    "GOTEST_UTIL_GO_COMMAND",
    "GOTEST_UTIL_GO_MINOR",
    "GOTEST_UTIL_LOG_LEVEL",
];

/// The binary, run inside `dir` with a scrubbed environment.
pub fn gotest_util(dir: &std::path::Path) -> Command
{
    let mut cmd = Command::cargo_bin("gotest-util").expect("bin");
    cmd.current_dir(dir);
    for var in SCRUBBED
    {
        cmd.env_remove(var);
    }
    cmd
}

/// Module `example.com/m` with a package `p` holding one test file
/// per category and a helper.
pub fn make_module() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("go.mod")
        .write_str("module example.com/m\n\ngo 1.22\n")
        .expect("write go.mod");

    tmp.child("p/p.go")
        .write_str("package p\n\n// Add adds.\nfunc Add(a, b int) int {\n\treturn a + b\n}\n")
        .expect("write p.go");

    tmp.child("p/p_test.go")
        .write_str(
            "package p\n\
             \n\
             import \"testing\"\n\
             \n\
             // TestAdd checks Add.\n\
             func TestAdd(t *testing.T) {\n\
             \tif Add(1, 2) != 3 {\n\
             \t\tt.Fatal(\"bad\")\n\
             \t}\n\
             }\n\
             \n\
             func BenchmarkAdd(b *testing.B) {}\n\
             \n\
             func helper() {}\n",
        )
        .expect("write p_test.go");

    tmp.child("p/example_test.go")
        .write_str(
            "package p_test\n\
             \n\
             import \"testing\"\n\
             \n\
             func ExampleAdd() {}\n\
             \n\
             func FuzzAdd(f *testing.F) {}\n\
             \n\
             func TestAPI(t *testing.T) {}\n",
        )
        .expect("write example_test.go");

    tmp.child("p/p_windows_test.go")
        .write_str("package p\n\nimport \"testing\"\n\nfunc TestWindowsOnly(t *testing.T) {}\n")
        .expect("write p_windows_test.go");

    tmp
}
