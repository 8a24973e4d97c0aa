//! Integration tests for searching, filtering and rendering.

mod util;

use assert_fs::prelude::*;
use predicates::prelude::*;
use util::{def_lines, defgrep, example_project, project};

#[test]
fn prints_full_function_with_file_header()
{
    let tmp = example_project();

    defgrep(&tmp)
        .arg("func_no_args")
        .assert()
        .success()
        .stdout(
            "# File: example.py Line: 4\n\
             def func_no_args():\n    \"Single line docstring\"\n    pass\n\n",
        );
}

#[test]
fn plain_name_matches_methods_and_dotted_selects_class()
{
    let tmp = example_project();

    let out = defgrep(&tmp)
        .args(["*_method*", "-n"])
        .assert()
        .success();
    assert_eq!(def_lines(&out.get_output().stdout), vec!["async def async_method"]);

    defgrep(&tmp)
        .args(["ClassWithMethods.method_types"])
        .assert()
        .success()
        .stdout(
            "# File: example.py Class: ClassWithMethods Line: 25\n\
             \x20   def method_types(self, b: int) -> bool:\n        return True\n\n",
        );
}

#[test]
fn signatures_elide_bodies()
{
    let tmp = example_project();

    defgrep(&tmp)
        .args(["ClassWithMethods.*", "-s", "-n"])
        .assert()
        .success()
        .stdout(
            "    def __init__(self):\n        ...\n\n\
             \x20   def method_types(self, b: int) -> bool:\n        ...\n\n\
             \x20   async def async_method(a, b, c):\n        ...\n\n",
        );
}

#[test]
fn docs_keep_docstrings()
{
    let tmp = example_project();

    defgrep(&tmp)
        .args(["func_no_args", "--docs", "-n"])
        .assert()
        .success()
        .stdout("def func_no_args():\n    \"Single line docstring\"\n    ...\n\n");
}

#[test]
fn no_match_is_silent_success()
{
    let tmp = example_project();

    defgrep(&tmp)
        .arg("nothing_here")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn structural_filters()
{
    let tmp = example_project();

    let cases: [(&[&str], &[&str]); 6] = [
        (&["--async"], &["async def async_func", "async def async_method"]),
        (&["--class"], &["class ClassWithMethods"]),
        (&["--async", "--class"], &[]),
        (
            &["--fully-typed"],
            &[
                "def func_fully_typed",
                "def _private",
                "def __init__",
                "def method_types",
            ],
        ),
        (&["--no-init"], &["def func_fully_typed", "def _private", "def method_types"]),
        (&["--private", "--function"], &["def _private"]),
    ];

    for (args, expected) in cases
    {
        let out = defgrep(&tmp)
            .args(args)
            .assert()
            .success();
        assert_eq!(
            def_lines(&out.get_output().stdout),
            expected.to_vec(),
            "args: {args:?}"
        );
    }
}

#[test]
fn untyped_includes_plain_constructor()
{
    let tmp = example_project();

    let out = defgrep(&tmp)
        .args(["ClassWithMethods.*", "--untyped"])
        .assert()
        .success();
    assert_eq!(
        def_lines(&out.get_output().stdout),
        vec!["def __init__", "async def async_method"]
    );
}

#[test]
fn syntax_errors_are_reported_and_skipped()
{
    let tmp = project(&[("a_bad.py", "def broken(:\n    pass\n"), ("b_good.py", "def ok():\n    pass\n")]);

    defgrep(&tmp)
        .arg("*")
        .assert()
        .success()
        .stdout(predicate::str::contains("def ok():"))
        .stderr(predicate::str::contains("# Syntax error in").and(predicate::str::contains("a_bad.py")));

    defgrep(&tmp)
        .args(["*", "--silent"])
        .assert()
        .success()
        .stderr("");
}

#[test]
fn non_utf8_files_are_reported()
{
    let tmp = project(&[("ok.py", "def ok():\n    pass\n")]);
    tmp.child("latin.py")
        .write_binary(b"def caf\xe9():\n    pass\n")
        .unwrap();

    defgrep(&tmp)
        .arg("*")
        .assert()
        .success()
        .stdout(predicate::str::contains("def ok():"))
        .stderr(predicate::str::contains("invalid UTF-8"));
}

#[test]
fn explicit_files_directories_and_excludes()
{
    let tmp = project(&[
        ("src/app.py", "def handler():\n    pass\n"),
        ("src/vendor/lib.py", "def handler():\n    pass\n"),
        ("other/extra.py", "def handler():\n    pass\n"),
    ]);

    defgrep(&tmp)
        .args(["handler", "-d", "src", "-x", "src/vendor"])
        .assert()
        .success()
        .stdout("# File: src/app.py Line: 1\ndef handler():\n    pass\n\n");

    defgrep(&tmp)
        .args(["handler", "-f", "other/extra.py"])
        .assert()
        .success()
        .stdout("# File: other/extra.py Line: 1\ndef handler():\n    pass\n\n");
}

#[test]
fn file_named_twice_is_searched_once()
{
    let tmp = project(&[("code.py", "def foo():\n    pass\n")]);

    defgrep(&tmp)
        .args(["foo", "-f", "code.py", "-d", "."])
        .assert()
        .success()
        .stdout("# File: code.py Line: 1\ndef foo():\n    pass\n\n");
}

#[test]
fn coding_cookie_selects_the_decoder()
{
    let tmp = project(&[]);
    tmp.child("latin.py")
        .write_binary(b"# -*- coding: latin-1 -*-\ndef caf\xe9():\n    return '\xe9'\n")
        .unwrap();

    defgrep(&tmp)
        .args(["caf*", "-n"])
        .assert()
        .success()
        .stdout("def caf\u{e9}():\n    return '\u{e9}'\n\n")
        .stderr("");
}

#[test]
fn gitignore_is_respected_unless_disabled()
{
    let tmp = project(&[
        (".gitignore", "generated.py\n"),
        ("generated.py", "def gen():\n    pass\n"),
        ("main.py", "def main():\n    pass\n"),
    ]);
    tmp.child(".git")
        .create_dir_all()
        .unwrap();

    let out = defgrep(&tmp)
        .arg("*")
        .assert()
        .success();
    assert_eq!(def_lines(&out.get_output().stdout), vec!["def main"]);

    let out = defgrep(&tmp)
        .args(["*", "--no-ignore"])
        .assert()
        .success();
    assert_eq!(def_lines(&out.get_output().stdout), vec!["def gen", "def main"]);
}

#[test]
fn imports_use_sys_path_roots()
{
    let tmp = project(&[("pkg/tools.py", "class Tool:\n    def run(self):\n        pass\n\ndef helper():\n    pass\n")]);

    defgrep(&tmp)
        .args(["helper", "Tool.run", "-i", "-n", "-s", "--sys-path", "."])
        .assert()
        .success()
        .stdout(
            "# from pkg.tools import Tool\n    def run(self):\n        ...\n\n\
             # from pkg.tools import helper\ndef helper():\n    ...\n\n",
        );
}

#[test]
fn count_prints_only_the_number()
{
    let tmp = example_project();

    defgrep(&tmp)
        .args(["*", "--count"])
        .assert()
        .success()
        .stdout("8\n");
}

#[test]
fn check_exits_nonzero_on_matches()
{
    let tmp = example_project();

    defgrep(&tmp)
        .args(["--undocumented", "--function", "--check", "--count"])
        .assert()
        .code(1)
        .stdout("6\n");

    defgrep(&tmp)
        .args(["nope", "--check"])
        .assert()
        .success();
}

#[test]
fn no_arguments_prints_help()
{
    let tmp = example_project();

    defgrep(&tmp)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn missing_interpreter_fails_module_lookup()
{
    let tmp = example_project();

    defgrep(&tmp)
        .args(["-m", "json"])
        .env("DEFGREP_PYTHON", "no-such-python-interpreter")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-python-interpreter"));
}
