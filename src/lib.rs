//! **defgrep** - Find, extract and replace Python functions, classes and methods by name
//!
//! Syntax-tree based search over Python sources: wildcard and `Class.method` name
//! patterns, structural filters (async, typed, documented, ...), signature-only views,
//! import path estimation and single-symbol rewriting.

/// Command-line interface with clap integration
pub mod cli;

/// Core pipeline - matching, classification, extraction and rewriting
pub mod core {
    /// Wildcard name patterns, plain and `Class.method`
    pub mod pattern;
    pub use pattern::{PatternSet, QueryPattern, glob_match};

    /// Module-level definitions and class methods in source order
    pub mod walker;
    pub use walker::{CandidateNode, SymbolKind, candidates};

    /// Structural facts (async, docstring, visibility, typing) and filters
    pub mod facts;
    pub use facts::{FilterSet, StructuralFacts, StructuralFilter, TypingState};

    /// Byte-exact spans, signature projections and import paths
    pub mod extract;
    pub use extract::{ImportPath, RenderMode, Span};

    /// Single-span substitution with atomic writes
    pub mod edit;
    pub use edit::{ReplaceError, SpanTarget};

    /// Text, CSV/TSV and JSON writers
    pub mod output;
    pub use output::{OutputFormat, RenderedSymbol, SymbolWriter};

    /// Search pipeline and command entry point
    pub mod symbols;
    pub use symbols::{Match, Outcome, SearchRequest, SymbolSearch, find, run as symbols_run};
}

/// Language processing - Tree-sitter Python parsing
pub mod parsers {
    /// Parser adapter producing trees or structured syntax failures
    pub mod python_parser;
    pub use python_parser::{ParseFailure, PythonParser, SourceUnit};
}

/// Infrastructure - Configuration, I/O, walking and environment discovery
pub mod infra {
    /// Layered configuration (defgrep.toml + DEFGREP_ env)
    pub mod config;
    pub use config::{Config, load_config};

    /// Source reading with encoding checks
    pub mod io;
    pub use io::{SourceError, SourceText, read_source};

    /// CRLF/LF-robust line indexing for line→byte mapping
    pub mod line_index;
    pub use line_index::NewlineIndex;

    /// Gitignore-aware directory walking
    pub mod walk;
    pub use walk::FileWalker;

    /// Standard library, site-packages and module lookup via the interpreter
    pub mod pyenv;
    pub use pyenv::{ModuleLocation, PythonEnv};
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli};
pub use core::symbols_run;
pub use infra::{Config, FileWalker, load_config};
pub use parsers::{PythonParser, SourceUnit};
