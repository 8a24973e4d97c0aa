//! Filepath: src/core/output.rs
//! Streaming writers for rendered matches: annotated text blocks,
//! CSV/TSV tables, a JSON array, or newline-delimited JSON.
//! Records are written as they arrive; only the JSON array needs
//! a closing step.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::{
    extract::{ImportPath, Span},
    walker::SymbolKind,
};

/// One match, rendered and detached from its parse tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSymbol
{
    /// Path the file was read from
    pub path: PathBuf,

    /// Path shown to users (relative to the working directory when beneath it)
    pub display_path: String,

    /// Declared name
    pub name: String,

    /// Enclosing class for methods
    pub class_name: Option<String>,

    /// Function or class
    pub kind: SymbolKind,

    /// 1-based line of the `def`/`class` keyword
    pub line: usize,

    /// Decorator-inclusive line span
    pub span: Span,

    /// Estimated import statement, when a root contains the file
    pub import: Option<ImportPath>,

    /// Rendered snippet
    pub code: String,
}

impl RenderedSymbol
{
    /// Record id: the import statement when requested and known,
    /// otherwise `path:line`.
    pub fn id(
        &self,
        prefer_import: bool,
    ) -> String
    {
        match (&self.import, prefer_import)
        {
            (Some(import), true) => import.to_string(),
            _ => format!("{}:{}", self.display_path, self.line),
        }
    }

    /// `# File: ... Line: n` header of the text format.
    pub fn file_header(&self) -> String
    {
        match &self.class_name
        {
            Some(class) => format!(
                "# File: {} Class: {} Line: {}",
                self.display_path, class, self.line
            ),
            None => format!("# File: {} Line: {}", self.display_path, self.line),
        }
    }
}

/// Shape of what is written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat
{
    /// Annotated source blocks
    #[default]
    Text,
    /// Comma-separated `id,code` rows
    Csv,
    /// Tab-separated `id,code` rows
    Tsv,
    /// JSON array of `{id, code}` objects
    Json,
    /// One JSON object per line
    Nl,
}

impl OutputFormat
{
    pub fn is_structured(self) -> bool
    {
        self != Self::Text
    }
}

/// Rendering knobs shared by all formats.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions
{
    pub format: OutputFormat,

    /// Emit the `# File:` header in text mode
    pub show_file: bool,

    /// Emit import lines in text mode, use them as ids otherwise
    pub show_imports: bool,

    /// Prepended to every record id
    pub id_prefix: String,
}

#[derive(Serialize)]
struct Record<'a>
{
    id: &'a str,
    code: &'a str,
}

/// Writes records in the configured format.
pub struct SymbolWriter<W: Write>
{
    out: W,
    opts: OutputOptions,
    written: usize,
}

impl<W: Write> SymbolWriter<W>
{
    pub fn new(
        out: W,
        opts: OutputOptions,
    ) -> Self
    {
        Self { out, opts, written: 0 }
    }

    pub fn write(
        &mut self,
        symbol: &RenderedSymbol,
    ) -> Result<()>
    {
        let id = format!(
            "{}{}",
            self.opts
                .id_prefix,
            symbol.id(
                self.opts
                    .show_imports
            )
        );

        match self
            .opts
            .format
        {
            OutputFormat::Text => self.write_text(symbol)?,
            OutputFormat::Csv => self.write_delimited(',', &id, &symbol.code)?,
            OutputFormat::Tsv => self.write_delimited('\t', &id, &symbol.code)?,
            OutputFormat::Json =>
            {
                let sep = if self.written == 0 { "[\n  " } else { ",\n  " };
                let json = serde_json::to_string(&Record { id: &id, code: &symbol.code })
                    .context("Failed to serialize record")?;
                write!(self.out, "{sep}{json}").context("Failed to write record")?;
            }
            OutputFormat::Nl =>
            {
                let json = serde_json::to_string(&Record { id: &id, code: &symbol.code })
                    .context("Failed to serialize record")?;
                writeln!(self.out, "{json}").context("Failed to write record")?;
            }
        }

        self.written += 1;
        Ok(())
    }

    /// Close the JSON array and flush.
    pub fn finish(mut self) -> Result<W>
    {
        if self
            .opts
            .format
            == OutputFormat::Json
        {
            let close = if self.written == 0 { "[]\n" } else { "\n]\n" };
            self.out
                .write_all(close.as_bytes())
                .context("Failed to write output")?;
        }
        self.out
            .flush()
            .context("Failed to flush output")?;
        Ok(self.out)
    }

    fn write_text(
        &mut self,
        symbol: &RenderedSymbol,
    ) -> Result<()>
    {
        if self
            .opts
            .show_file
        {
            writeln!(self.out, "{}", symbol.file_header())?;
        }
        if self
            .opts
            .show_imports
            && let Some(import) = &symbol.import
        {
            writeln!(self.out, "# {import}")?;
        }
        writeln!(self.out, "{}\n", symbol.code).context("Failed to write snippet")?;
        Ok(())
    }

    fn write_delimited(
        &mut self,
        delimiter: char,
        id: &str,
        code: &str,
    ) -> Result<()>
    {
        if self.written == 0
        {
            writeln!(self.out, "id{delimiter}code")?;
        }
        writeln!(
            self.out,
            "{}{delimiter}{}",
            quote_field(id, delimiter),
            quote_field(code, delimiter)
        )
        .context("Failed to write row")?;
        Ok(())
    }
}

/// Minimal quoting: wrap in double quotes when the field holds the
/// delimiter, a quote or a line break; embedded quotes are doubled.
fn quote_field(
    field: &str,
    delimiter: char,
) -> std::borrow::Cow<'_, str>
{
    if field.contains([delimiter, '"', '\n', '\r'])
    {
        std::borrow::Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    }
    else
    {
        std::borrow::Cow::Borrowed(field)
    }
}

/// `path` relative to `base` when beneath it, as given otherwise.
pub fn display_path(
    path: &Path,
    base: &Path,
) -> String
{
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
