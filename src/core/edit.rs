//! Rewrite engine: substitute one matched span in a file.
//!
//! The engine works on whole lines. Everything before the span's
//! first line and after its last line is copied byte-for-byte; the
//! replacement text always ends with exactly one inserted '\n' when
//! it lacks one. Writes are all-or-nothing: the new body lands via
//! a same-directory temp file and an atomic rename.

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

use tracing::{debug, instrument};

use crate::core::extract::Span;
use crate::infra::{
    io::{SourceError, read_source},
    line_index::NewlineIndex,
};

/// Where a replacement goes and what must still be there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanTarget
{
    /// Decorator-inclusive line span
    pub span: Span,

    /// Full-mode text the match rendered to
    pub expected: String,
}

/// Replace-family failures. None of them leaves a partial write.
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError
{
    #[error("replace needs exactly one match, got 0")]
    NoMatch,

    #[error("replace needs exactly one match, got {count}")]
    MultipleMatches
    {
        count: usize
    },

    #[error("lines {start_line}-{end_line} no longer hold the matched text")]
    SpanMismatch
    {
        start_line: usize, end_line: usize
    },

    #[error("no replacement text was provided")]
    EmptyReplacement,

    #[error("command '{command}' failed with exit code {}, stderr: {stderr}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    CommandFailed
    {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run command '{command}': {source}")]
    CommandIo
    {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Source
    {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io
    {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Enforce the single-target rule across a whole operation.
pub fn only_match<T>(mut items: Vec<T>) -> Result<T, ReplaceError>
{
    match items.len()
    {
        0 => Err(ReplaceError::NoMatch),
        1 => Ok(items.remove(0)),
        count => Err(ReplaceError::MultipleMatches { count }),
    }
}

/// New file body with `target`'s lines replaced by `replacement`.
pub fn replace(
    file_text: &str,
    target: &SpanTarget,
    replacement: &str,
) -> Result<String, ReplaceError>
{
    let Span { start_line, end_line } = target.span;
    let mismatch = || ReplaceError::SpanMismatch { start_line, end_line };

    let bytes = file_text.as_bytes();
    let idx = NewlineIndex::build(bytes);

    // Span must be intact and still hold what was matched.
    if end_line > idx.line_count()
    {
        return Err(mismatch());
    }
    let (lo, hi) = idx
        .byte_range_for_lines(start_line, end_line, bytes)
        .ok_or_else(mismatch)?;
    if file_text[lo..hi] != target.expected
    {
        return Err(mismatch());
    }

    let after = idx
        .after_line(end_line)
        .ok_or_else(mismatch)?;

    let mut out = String::with_capacity(file_text.len() - (after - lo) + replacement.len() + 1);
    out.push_str(&file_text[..lo]);
    out.push_str(replacement);
    if !replacement.ends_with('\n')
    {
        out.push('\n');
    }
    out.push_str(&file_text[after..]);

    Ok(out)
}

/// Read `path`, substitute the span and atomically write it back.
/// The file keeps its BOM and declared encoding.
#[instrument(skip(target, replacement), fields(span = ?target.span))]
pub fn apply_to_file(
    path: &Path,
    target: &SpanTarget,
    replacement: &str,
) -> Result<(), ReplaceError>
{
    let source_err = |source| ReplaceError::Source { path: path.to_path_buf(), source };

    let original = read_source(path).map_err(source_err)?;
    let updated = replace(&original.text, target, replacement)?;
    let bytes = original
        .encode(path, &updated)
        .map_err(source_err)?;

    write_atomic(path, &bytes).map_err(|source| ReplaceError::Io { path: path.to_path_buf(), source })?;
    debug!(bytes = bytes.len(), encoding = original.encoding().name(), "replacement written");
    Ok(())
}

/// Pipe `input` through a shell command and return its stdout.
/// Blocks until the command exits; there is no timeout.
#[instrument(skip(input), fields(input_bytes = input.len()))]
pub fn pipe_through(
    command: &str,
    input: &str,
) -> Result<String, ReplaceError>
{
    let io_err = |source| ReplaceError::CommandIo { command: command.to_string(), source };

    let mut child = shell(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(io_err)?;

    // Feed stdin from a helper thread so a chatty child cannot
    // deadlock against a full stdout pipe.
    let writer = child
        .stdin
        .take()
        .map(|mut stdin| {
            let data = input
                .as_bytes()
                .to_vec();
            thread::spawn(move || stdin.write_all(&data))
        });

    let mut stdout = Vec::new();
    if let Some(mut out) = child
        .stdout
        .take()
    {
        out.read_to_end(&mut stdout)
            .map_err(io_err)?;
    }
    let mut stderr = Vec::new();
    if let Some(mut err) = child
        .stderr
        .take()
    {
        err.read_to_end(&mut stderr)
            .map_err(io_err)?;
    }

    let status = child
        .wait()
        .map_err(io_err)?;

    if let Some(handle) = writer
    {
        match handle.join()
        {
            // A child that exits without reading its input is fine.
            Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => return Err(io_err(e)),
            _ =>
            {}
        }
    }

    if !status.success()
    {
        return Err(ReplaceError::CommandFailed {
            command: command.to_string(),
            code: status.code(),
            stderr: String::from_utf8_lossy(&stderr)
                .trim_end()
                .to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

#[cfg(unix)]
fn shell(command: &str) -> Command
{
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell(command: &str) -> Command
{
    let mut cmd = Command::new("cmd");
    cmd.arg("/C")
        .arg(command);
    cmd
}

/// Atomic write with robust temp file strategy
pub fn write_atomic(
    path: &Path,
    data: &[u8],
) -> io::Result<()>
{
    // Prefer same-dir tempfile so the rename stays on one filesystem
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // Preserve original permissions
    let perms = fs::metadata(path)
        .map(|m| m.permissions())
        .ok();

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;

    // Write the content fully
    tmp.write_all(data)?;
    tmp.as_file()
        .sync_all()?;

    if let Some(perms) = perms
    {
        fs::set_permissions(tmp.path(), perms)?;
    }

    // Atomically replace the destination
    tmp.persist(path)
        .map_err(|e| e.error)?;

    // fsync parent dir to ensure durability on Unix
    #[cfg(unix)]
    if let Ok(parent_file) = fs::File::open(dir)
    {
        let _ = parent_file.sync_all();
    }

    Ok(())
}

#[cfg(test)]
mod tests
{
    use anyhow::Result;

    use super::*;
    use crate::core::extract::{RenderMode, full_text};
    use crate::core::walker::candidates;
    use crate::parsers::SourceUnit;

    fn target(
        src: &str,
        name: &str,
    ) -> Result<SpanTarget>
    {
        let unit = SourceUnit::parse(src, "t.py")?;
        let c = candidates(&unit)
            .find(|c| c.name == name)
            .expect("candidate");
        Ok(SpanTarget { span: Span::of(&c), expected: full_text(&unit, &c).to_string() })
    }

    const SRC: &str = "\
import x


def foo(bar):
    return 1 + 2 + 3


class Foo:
    def bar(self):
        return 1 + 2 + 3
";

    #[test]
    fn replaces_only_the_span() -> Result<()>
    {
        let t = target(SRC, "foo")?;
        let out = replace(SRC, &t, "def foo(bar):\n    return 6")?;

        assert_eq!(
            out,
            "import x\n\n\ndef foo(bar):\n    return 6\n\n\nclass Foo:\n    def bar(self):\n        return 1 + 2 + 3\n"
        );
        Ok(())
    }

    #[test]
    fn replacement_newline_is_not_doubled() -> Result<()>
    {
        let t = target(SRC, "foo")?;
        let with_nl = replace(SRC, &t, "def foo(bar):\n    return 6\n")?;
        let without = replace(SRC, &t, "def foo(bar):\n    return 6")?;

        assert_eq!(with_nl, without);
        Ok(())
    }

    #[test]
    fn method_span_keeps_surroundings() -> Result<()>
    {
        let t = target(SRC, "bar")?;
        let out = replace(SRC, &t, "    def bar(self):\n        return 0")?;

        assert!(out.starts_with("import x\n\n\ndef foo(bar):\n    return 1 + 2 + 3\n"));
        assert!(out.ends_with("class Foo:\n    def bar(self):\n        return 0\n"));
        Ok(())
    }

    #[test]
    fn last_line_without_newline_gains_one() -> Result<()>
    {
        let src = "def a():\n    pass";
        let t = target(src, "a")?;

        assert_eq!(replace(src, &t, "def a(): return 1")?, "def a(): return 1\n");
        Ok(())
    }

    #[test]
    fn crlf_outside_span_is_untouched() -> Result<()>
    {
        let src = "x = 1\r\n\r\ndef a():\r\n    pass\r\n\r\ny = 2\r\n";
        let t = target(src, "a")?;

        assert_eq!(replace(src, &t, "def a(): ...")?, "x = 1\r\n\r\ndef a(): ...\n\r\ny = 2\r\n");
        Ok(())
    }

    #[test]
    fn stale_target_is_rejected() -> Result<()>
    {
        let t = target(SRC, "foo")?;
        let edited = SRC.replace("1 + 2 + 3\n\n\nclass", "7\n\n\nclass");

        assert!(matches!(
            replace(&edited, &t, "anything"),
            Err(ReplaceError::SpanMismatch { .. })
        ));
        assert!(matches!(replace("", &t, "anything"), Err(ReplaceError::SpanMismatch { .. })));
        Ok(())
    }

    #[test]
    fn round_trip_renders_replacement() -> Result<()>
    {
        let t = target(SRC, "foo")?;
        let replacement = "@wrapped\ndef foo(bar, baz=2):\n    return bar * baz\n";
        let out = replace(SRC, &t, replacement)?;

        let unit = SourceUnit::parse(out, "t.py")?;
        let c = candidates(&unit)
            .find(|c| c.name == "foo")
            .expect("foo still present");
        let rendered = crate::core::extract::render(&unit, &c, RenderMode::Full);

        assert_eq!(format!("{rendered}\n"), replacement);
        Ok(())
    }

    #[test]
    fn only_match_counts()
    {
        assert!(matches!(only_match(Vec::<u8>::new()), Err(ReplaceError::NoMatch)));
        assert!(matches!(only_match(vec![1, 2]), Err(ReplaceError::MultipleMatches { count: 2 })));
        assert_eq!(only_match(vec![7]).unwrap(), 7);
    }

    #[test]
    fn atomic_write_replaces_contents() -> Result<()>
    {
        let dir = tempfile::tempdir()?;
        let path = dir
            .path()
            .join("code.py");
        fs::write(&path, "old\n")?;

        write_atomic(&path, b"new\n")?;

        assert_eq!(fs::read_to_string(&path)?, "new\n");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn apply_to_file_leaves_file_alone_on_mismatch() -> Result<()>
    {
        let dir = tempfile::tempdir()?;
        let path = dir
            .path()
            .join("code.py");
        fs::write(&path, SRC)?;

        let mut t = target(SRC, "foo")?;
        t.expected = "def foo(other):".to_string();

        assert!(apply_to_file(&path, &t, "x").is_err());
        assert_eq!(fs::read_to_string(&path)?, SRC);
        Ok(())
    }

    #[test]
    fn apply_to_file_keeps_bom() -> Result<()>
    {
        let dir = tempfile::tempdir()?;
        let path = dir
            .path()
            .join("bom.py");
        fs::write(&path, b"\xEF\xBB\xBFdef foo():\n    pass\n")?;

        let t = target("def foo():\n    pass\n", "foo")?;
        apply_to_file(&path, &t, "def foo():\n    return 1\n")?;

        assert_eq!(fs::read(&path)?, b"\xEF\xBB\xBFdef foo():\n    return 1\n");
        Ok(())
    }

    #[test]
    fn apply_to_file_keeps_declared_encoding() -> Result<()>
    {
        let dir = tempfile::tempdir()?;
        let path = dir
            .path()
            .join("latin.py");
        fs::write(&path, b"# coding: latin-1\ndef caf\xe9():\n    pass\n")?;

        let t = target("# coding: latin-1\ndef caf\u{e9}():\n    pass\n", "caf\u{e9}")?;
        apply_to_file(&path, &t, "def caf\u{e9}():\n    return '\u{e9}'\n")?;

        assert_eq!(fs::read(&path)?, b"# coding: latin-1\ndef caf\xe9():\n    return '\xe9'\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn pipe_through_captures_stdout() -> Result<()>
    {
        let out = pipe_through("tr a-z A-Z", "def foo():\n    pass")?;
        assert_eq!(out, "DEF FOO():\n    PASS");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn pipe_through_reports_failure()
    {
        let err = pipe_through("echo oops >&2; exit 3", "ignored").unwrap_err();
        match err
        {
            ReplaceError::CommandFailed { code, stderr, .. } =>
            {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
