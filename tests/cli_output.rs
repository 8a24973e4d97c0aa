//! Integration tests for structured output formats.

mod util;

use predicates::prelude::*;
use serde_json::Value;
use util::{defgrep, project};

const SRC: &str = "def blah():\n    pass\n\n\ndef quoted():\n    return \"a, b\"\n";

#[test]
fn csv_has_header_and_quotes_multiline_code()
{
    let tmp = project(&[("mod.py", SRC)]);

    defgrep(&tmp)
        .args(["*", "--csv"])
        .assert()
        .success()
        .stdout(
            "id,code\n\
             mod.py:1,\"def blah():\n    pass\"\n\
             mod.py:5,\"def quoted():\n    return \"\"a, b\"\"\"\n",
        );
}

#[test]
fn tsv_with_id_prefix()
{
    let tmp = project(&[("mod.py", SRC)]);

    defgrep(&tmp)
        .args(["blah", "-s", "--tsv", "--id-prefix", "repo:"])
        .assert()
        .success()
        .stdout("id\tcode\nrepo:mod.py:1\t\"def blah():\n    ...\"\n");
}

#[test]
fn json_array_of_records()
{
    let tmp = project(&[("mod.py", SRC)]);

    let out = defgrep(&tmp)
        .args(["*", "--json"])
        .assert()
        .success();
    let records: Value = serde_json::from_slice(&out.get_output().stdout).expect("valid json");

    assert_eq!(
        records,
        serde_json::json!([
            {"id": "mod.py:1", "code": "def blah():\n    pass"},
            {"id": "mod.py:5", "code": "def quoted():\n    return \"a, b\""},
        ])
    );
}

#[test]
fn json_with_imports_uses_import_ids()
{
    let tmp = project(&[("pkg/mod.py", SRC)]);

    let out = defgrep(&tmp)
        .args(["blah", "--json", "--imports", "--sys-path", "."])
        .assert()
        .success();
    let records: Value = serde_json::from_slice(&out.get_output().stdout).expect("valid json");

    assert_eq!(records[0]["id"], "from pkg.mod import blah");
}

#[test]
fn empty_json_is_empty_array()
{
    let tmp = project(&[("mod.py", SRC)]);

    defgrep(&tmp)
        .args(["missing", "--json"])
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
fn nl_is_one_record_per_line()
{
    let tmp = project(&[("mod.py", SRC)]);

    let out = defgrep(&tmp)
        .args(["*", "--nl", "-s"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).into_owned();
    let lines: Vec<Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["id"], "mod.py:5");
    assert_eq!(lines[1]["code"], "def quoted():\n    ...");
}

#[test]
fn formats_are_mutually_exclusive()
{
    let tmp = project(&[("mod.py", SRC)]);

    defgrep(&tmp)
        .args(["*", "--csv", "--nl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn id_prefix_requires_a_format()
{
    let tmp = project(&[("mod.py", SRC)]);

    defgrep(&tmp)
        .args(["*", "--id-prefix", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--id-prefix can only be used with"));
}
