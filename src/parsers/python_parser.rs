//! Filepath: src/parsers/python_parser.rs
//! ------------------------------------------------------------------
//! Python parser adapter built on Tree-sitter 0.25.x.
//! Goals:
//!   - Own the text, the tree and a newline index together so
//!     every later stage borrows from one place.
//!   - Turn Tree-sitter's error recovery into an explicit
//!     `Result`: a tree containing ERROR/MISSING nodes is a
//!     `ParseFailure`, never a partially trusted tree.
//!   - Stay pure: parsing never touches the filesystem.
//!
//! Notes:
//!   - Tree-sitter always produces a tree; we locate the first
//!     broken node in document order to report a line.
//!   - Line numbers in failures are 1-based.
//! ------------------------------------------------------------------

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::trace;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::infra::line_index::NewlineIndex;

/// Longest snippet of offending source echoed in a failure message.
const SNIPPET_MAX: usize = 40;

/// Structured syntax failure for one file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{}: {}", .path.display(), .line, .message)]
pub struct ParseFailure
{
    /// File the text came from
    pub path: PathBuf,

    /// 1-based line of the first broken node
    pub line: usize,

    /// Human readable description
    pub message: String,
}

/// One parsed Python file: original text, its syntax tree and
/// a newline index for line/byte conversions.
pub struct SourceUnit
{
    path: PathBuf,
    text: String,
    tree: Tree,
    lines: NewlineIndex,
}

impl std::fmt::Debug for SourceUnit
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.debug_struct("SourceUnit")
            .field("path", &self.path)
            .field("bytes", &self.text.len())
            .finish()
    }
}

impl SourceUnit
{
    /// Parse `text` with a one-off parser. Prefer reusing a
    /// [`PythonParser`] when handling many files.
    pub fn parse(
        text: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, ParseFailure>
    {
        let path = path.into();
        let mut parser = PythonParser::new().map_err(|e| ParseFailure {
            path: path.clone(),
            line: 0,
            message: format!("{e:#}"),
        })?;
        parser.parse(text, path)
    }

    /// Identifying path of this unit.
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Original, unmodified source text.
    pub fn text(&self) -> &str
    {
        &self.text
    }

    /// Root `module` node.
    pub fn root(&self) -> Node<'_>
    {
        self.tree
            .root_node()
    }

    /// Newline index over `text`.
    pub fn lines(&self) -> &NewlineIndex
    {
        &self.lines
    }

    /// Source text covered by `node`.
    pub fn node_text(
        &self,
        node: Node<'_>,
    ) -> &str
    {
        &self.text[node.byte_range()]
    }
}

/// Reusable Python parser.
pub struct PythonParser
{
    parser: Parser,
}

impl PythonParser
{
    /// Create a parser bound to the Python grammar.
    pub fn new() -> Result<Self>
    {
        let language: Language = tree_sitter_python::LANGUAGE.into();

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .context("set Python language")?;

        Ok(Self { parser })
    }

    /// Parse `text`, returning a [`SourceUnit`] or the first
    /// syntax problem found.
    pub fn parse(
        &mut self,
        text: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<SourceUnit, ParseFailure>
    {
        let text = text.into();
        let path = path.into();

        let Some(tree) = self
            .parser
            .parse(&text, None)
        else
        {
            return Err(ParseFailure {
                path,
                line: 1,
                message: "parser produced no tree".to_string(),
            });
        };

        if tree
            .root_node()
            .has_error()
        {
            let (line, message) = describe_first_error(tree.root_node(), &text);
            trace!(path = %path.display(), line, %message, "syntax error");
            return Err(ParseFailure { path, line, message });
        }

        let lines = NewlineIndex::build(text.as_bytes());
        Ok(SourceUnit { path, text, tree, lines })
    }
}

/// Depth-first search for the first ERROR or MISSING node,
/// descending only into subtrees that report errors.
fn describe_first_error(
    root: Node<'_>,
    text: &str,
) -> (usize, String)
{
    let mut node = root;

    'descend: loop
    {
        if node.is_missing()
        {
            let line = node.start_position().row + 1;
            return (line, format!("missing '{}'", node.kind()));
        }
        if node.is_error()
        {
            let line = node.start_position().row + 1;
            return (line, format!("invalid syntax near '{}'", snippet(node, text)));
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor)
        {
            if child.has_error() || child.is_missing()
            {
                node = child;
                continue 'descend;
            }
        }

        // has_error() was set but no child carries it
        let line = node.start_position().row + 1;
        return (line, "invalid syntax".to_string());
    }
}

/// First line of the node's text, trimmed and capped.
fn snippet(
    node: Node<'_>,
    text: &str,
) -> String
{
    let raw = text
        .get(node.byte_range())
        .unwrap_or_default();
    let first = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    if first.chars().count() > SNIPPET_MAX
    {
        let cut: String = first
            .chars()
            .take(SNIPPET_MAX)
            .collect();
        format!("{cut}...")
    }
    else
    {
        first.to_string()
    }
}
