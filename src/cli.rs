use clap::{ArgGroup, Args, Parser};
use std::path::PathBuf;

use crate::core::facts::{FilterSet, StructuralFilter};
use crate::core::output::OutputFormat;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub silent: bool,   // --silent (or implied by --stdlib)
    pub no_color: bool, // --no-color
    pub verbose: bool,  // --verbose
}

#[derive(Debug, Parser)]
#[command(name = "defgrep")]
#[command(
    about = "Find the Python functions, classes and methods matching a name and print their code"
)]
#[command(
    version,
    long_about = None,
    after_help = "Examples:\n  defgrep my_function\n  defgrep 'MyClass.*' -s\n  defgrep '*' --fully-typed -d src\n  cat new.py | defgrep my_function --replace"
)]
#[command(group(ArgGroup::new("format").args(["csv", "tsv", "json", "nl"])))]
pub struct Cli {
    /// Names to search for; `*` is a wildcard, `Class.method` selects methods
    pub patterns: Vec<String>,

    /// Files to search
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Directories to search recursively
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directories: Vec<PathBuf>,

    /// Directories to exclude
    #[arg(short = 'x', long = "exclude", value_name = "DIR")]
    pub excludes: Vec<PathBuf>,

    /// Search the Python standard library
    #[arg(long)]
    pub stdlib: bool,

    /// Search an installed module or package by name
    #[arg(short = 'm', long = "module", value_name = "MODULE")]
    pub modules: Vec<String>,

    /// Show signatures only, with the body elided
    #[arg(short = 's', long)]
    pub signatures: bool,

    /// Show signatures and docstrings
    #[arg(long)]
    pub docs: bool,

    /// Don't include the `# File:` comments in the output
    #[arg(short = 'n', long)]
    pub no_file: bool,

    /// Show `from x import y` lines for each symbol
    #[arg(short = 'i', long)]
    pub imports: bool,

    /// Directories to treat as import roots for --imports
    #[arg(long = "sys-path", value_name = "DIR")]
    pub sys_paths: Vec<PathBuf>,

    /// Print only the number of matches
    #[arg(long)]
    pub count: bool,

    /// Silently ignore files that fail to parse
    #[arg(long)]
    pub silent: bool,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Exit with code 1 if any matches are found
    #[arg(long)]
    pub check: bool,

    /// Replace the single matching symbol with text from stdin
    #[arg(long)]
    pub replace: bool,

    /// Replace the single matching symbol with the output of CMD, fed its code on stdin
    #[arg(long, value_name = "CMD")]
    pub rexec: Option<String>,

    /// Output as CSV
    #[arg(long)]
    pub csv: bool,

    /// Output as TSV
    #[arg(long)]
    pub tsv: bool,

    /// Output as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Output as newline-delimited JSON
    #[arg(long)]
    pub nl: bool,

    /// Prefix to add to every record id
    #[arg(long, value_name = "PREFIX")]
    pub id_prefix: Option<String>,

    /// Don't respect .gitignore files while walking directories
    #[arg(long)]
    pub no_ignore: bool,

    /// Disable colored diagnostics
    #[arg(long)]
    pub no_color: bool,

    /// Log progress to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Structural filters; all given filters must hold.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Only functions
    #[arg(long)]
    pub function: bool,

    /// Only classes
    #[arg(long)]
    pub class: bool,

    /// Only async functions
    #[arg(long = "async")]
    pub async_: bool,

    /// Only non-async functions
    #[arg(long)]
    pub unasync: bool,

    /// Only symbols with a docstring
    #[arg(long)]
    pub documented: bool,

    /// Only symbols without a docstring
    #[arg(long)]
    pub undocumented: bool,

    /// Only public symbols
    #[arg(long)]
    pub public: bool,

    /// Only private symbols (leading underscore)
    #[arg(long)]
    pub private: bool,

    /// Only `__dunder__` symbols
    #[arg(long)]
    pub dunder: bool,

    /// Only functions with at least one type annotation
    #[arg(long)]
    pub typed: bool,

    /// Only functions without type annotations
    #[arg(long)]
    pub untyped: bool,

    /// Only functions with some but not all annotations
    #[arg(long)]
    pub partially_typed: bool,

    /// Only fully annotated functions
    #[arg(long)]
    pub fully_typed: bool,

    /// Skip `__init__(self)` methods with no arguments
    #[arg(long)]
    pub no_init: bool,
}

impl FilterArgs {
    /// Selected filters, `--no-init` implying `--fully-typed`.
    pub fn to_filter_set(&self) -> FilterSet {
        use StructuralFilter::*;

        let flags = [
            (self.function, Function),
            (self.class, Class),
            (self.async_, Async),
            (self.unasync, Unasync),
            (self.documented, Documented),
            (self.undocumented, Undocumented),
            (self.public, Public),
            (self.private, Private),
            (self.dunder, Dunder),
            (self.typed, Typed),
            (self.untyped, Untyped),
            (self.partially_typed, PartiallyTyped),
            (self.fully_typed || self.no_init, FullyTyped),
            (self.no_init, NoInit),
        ];

        flags
            .into_iter()
            .filter_map(|(on, filter)| on.then_some(filter))
            .collect()
    }
}

impl Cli {
    pub fn context(&self) -> AppContext {
        AppContext {
            silent: self.silent,
            no_color: self.no_color,
            verbose: self.verbose,
        }
    }

    /// Requested output format; clap already rejects more than one.
    pub fn output_format(&self) -> OutputFormat {
        if self.csv {
            OutputFormat::Csv
        } else if self.tsv {
            OutputFormat::Tsv
        } else if self.json {
            OutputFormat::Json
        } else if self.nl {
            OutputFormat::Nl
        } else {
            OutputFormat::Text
        }
    }
}
