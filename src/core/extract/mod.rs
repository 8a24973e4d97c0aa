//! Span extraction: exact source text of a candidate and its
//! signature-only projections.
//!
//! Everything is sliced from the original text by line and byte
//! boundaries; nothing is re-serialized from the tree, so comments,
//! quoting and formatting survive untouched.

pub mod import_path;

pub use import_path::{ImportPath, import_path};

use std::borrow::Cow;

use tree_sitter::Node;

use crate::core::facts::docstring_node;
use crate::core::walker::{CandidateNode, named_children};
use crate::parsers::SourceUnit;

/// Marker line standing in for an elided body.
pub const ELISION: &str = "...";

/// Indent added to a one-line body when it is moved below the header.
const DEFAULT_INDENT: &str = "    ";

/// How a match is turned into text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode
{
    /// Decorators through the last body line
    #[default]
    Full,
    /// Decorators and header, body elided
    Signature,
    /// Signature plus the docstring, when there is one
    SignatureWithDocstring,
}

/// Inclusive 1-based line span of a candidate, decorators included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span
{
    pub start_line: usize,
    pub end_line: usize,
}

impl Span
{
    pub fn of(candidate: &CandidateNode<'_>) -> Self
    {
        Self { start_line: candidate.decorated_start_line, end_line: candidate.end_line }
    }
}

/// Render a candidate under `mode`.
pub fn render<'u>(
    unit: &'u SourceUnit,
    candidate: &CandidateNode<'u>,
    mode: RenderMode,
) -> Cow<'u, str>
{
    match mode
    {
        RenderMode::Full => Cow::Borrowed(full_text(unit, candidate)),
        RenderMode::Signature => Cow::Owned(signature_text(unit, candidate, false)),
        RenderMode::SignatureWithDocstring => Cow::Owned(signature_text(unit, candidate, true)),
    }
}

/// Whole lines from the first decorator through the last body
/// line, without the final line terminator.
pub fn full_text<'u>(
    unit: &'u SourceUnit,
    candidate: &CandidateNode<'u>,
) -> &'u str
{
    let span = Span::of(candidate);
    let text = unit.text();

    unit.lines()
        .byte_range_for_lines(span.start_line, span.end_line, text.as_bytes())
        .map_or("", |(lo, hi)| &text[lo..hi])
}

/// Decorators and header through the header colon, optionally
/// the docstring, then the elision line.
pub fn signature_text(
    unit: &SourceUnit,
    candidate: &CandidateNode<'_>,
    with_docstring: bool,
) -> String
{
    let text = unit.text();
    let def = candidate.node;

    let start = unit
        .lines()
        .start_byte_of_line(candidate.decorated_start_line)
        .unwrap_or_else(|| def.start_byte());
    let header_end = header_colon(def).map_or_else(|| def.end_byte(), |c| c.end_byte());

    let indent = body_indent(unit, def);

    let mut out = String::with_capacity(header_end - start + 32);
    out.push_str(&text[start..header_end]);

    if with_docstring && let Some(doc) = docstring_node(unit, def)
    {
        out.push('\n');
        out.push_str(&indent);
        out.push_str(unit.node_text(doc));
    }

    out.push('\n');
    out.push_str(&indent);
    out.push_str(ELISION);
    out
}

/// The `:` token that closes a definition header: the last colon
/// that is a direct child preceding the body.
fn header_colon(def: Node<'_>) -> Option<Node<'_>>
{
    let body_start = def
        .child_by_field_name("body")
        .map_or(usize::MAX, |b| b.start_byte());

    let mut cursor = def.walk();
    def.children(&mut cursor)
        .filter(|c| c.kind() == ":" && c.start_byte() < body_start)
        .last()
}

/// Leading whitespace of the body's first statement, or the
/// header's indentation plus one level when the body shares the
/// header line.
fn body_indent(
    unit: &SourceUnit,
    def: Node<'_>,
) -> String
{
    let header_line = def
        .start_position()
        .row
        + 1;

    let first_stmt = def
        .child_by_field_name("body")
        .and_then(|body| {
            named_children(body)
                .into_iter()
                .find(|n| n.kind() != "comment")
        });

    match first_stmt
    {
        Some(stmt)
            if stmt
                .start_position()
                .row
                + 1
                > header_line =>
        {
            leading_whitespace(unit, stmt.start_position().row + 1).to_string()
        }
        _ => format!("{}{DEFAULT_INDENT}", leading_whitespace(unit, header_line)),
    }
}

/// Indentation prefix of a 1-based line.
fn leading_whitespace(
    unit: &SourceUnit,
    line: usize,
) -> &str
{
    let text = unit.text();
    let Some((lo, hi)) = unit
        .lines()
        .byte_range_for_lines(line, line, text.as_bytes())
    else
    {
        return "";
    };

    let content = &text[lo..hi];
    let trimmed = content.trim_start_matches([' ', '\t']);
    &content[..content.len() - trimmed.len()]
}
