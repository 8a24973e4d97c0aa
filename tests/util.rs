//! Shared test utilities for integration tests
//!
//! Provides fixture projects and a preconfigured command for
//! driving the binary from inside them.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_fs::prelude::*;

/// Python module exercised by most CLI tests.
pub const EXAMPLE: &str = "\
import os


def func_no_args():
    \"Single line docstring\"
    pass


async def async_func(a, b, c):
    pass


def func_fully_typed(a: int, b: str) -> bool:
    pass


def _private() -> None:
    pass


class ClassWithMethods:
    def __init__(self):
        pass

    def method_types(self, b: int) -> bool:
        return True

    async def async_method(a, b, c):
        pass
";

/// Build a temporary project from `(relative path, contents)` pairs.
pub fn project(files: &[(&str, &str)]) -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    for (path, contents) in files
    {
        tmp.child(path)
            .write_str(contents)
            .expect("write fixture");
    }

    tmp
}

/// Project with `example.py` at its root.
pub fn example_project() -> assert_fs::TempDir
{
    project(&[("example.py", EXAMPLE)])
}

/// The binary, running inside `dir` with a clean environment.
pub fn defgrep(dir: &assert_fs::TempDir) -> Command
{
    let mut cmd = Command::cargo_bin("defgrep").expect("defgrep binary");
    cmd.current_dir(dir.path())
        .env_remove("DEFGREP_LOG")
        .env_remove("DEFGREP_PYTHON")
        .env_remove("DEFGREP_SILENT")
        .env("NO_COLOR", "1");
    cmd
}

/// Lines of stdout that start a definition, trimmed.
pub fn def_lines(stdout: &[u8]) -> Vec<String>
{
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("def ") || l.starts_with("async def ") || l.starts_with("class "))
        .map(|l| {
            l.split(['(', ':'])
                .next()
                .unwrap_or(l)
                .to_string()
        })
        .collect()
}
