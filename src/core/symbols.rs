//! Filepath: src/core/symbols.rs
//! End-to-end symbol search: collect files, parse each one, walk its
//! definitions, filter them and render the survivors. The command
//! entry point then prints, counts, checks or rewrites.
//!
//! Files are processed one at a time; a file that cannot be read or
//! parsed becomes a diagnostic and never stops the run.

use std::{
    borrow::Cow,
    fmt,
    io::{self, IsTerminal, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::CommandFactory;
use owo_colors::OwoColorize;
use tracing::{debug, info, instrument, warn};

use crate::{
    cli::{AppContext, Cli},
    core::{
        edit::{self, SpanTarget},
        extract::{self, ImportPath, RenderMode, Span},
        facts::{FilterSet, StructuralFacts},
        output::{self, OutputOptions, RenderedSymbol, SymbolWriter},
        pattern::PatternSet,
        walker::{self, CandidateNode},
    },
    infra::{
        config::{Config, load_config},
        io::read_source,
        pyenv::{ModuleLocation, PythonEnv},
        walk::FileWalker,
    },
    parsers::{PythonParser, SourceUnit},
};

/// How the command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome
{
    /// Normal completion
    Done,

    /// `--check` found at least one match
    MatchesFound,

    /// Nothing to search for; usage was printed
    HelpShown,
}

/// A candidate that passed both the name and the structural filters.
#[derive(Debug, Clone, Copy)]
pub struct Match<'u>
{
    pub unit: &'u SourceUnit,
    pub candidate: CandidateNode<'u>,
    pub facts: StructuralFacts,
}

impl<'u> Match<'u>
{
    pub fn span(&self) -> Span
    {
        Span::of(&self.candidate)
    }

    pub fn render(
        &self,
        mode: RenderMode,
    ) -> Cow<'u, str>
    {
        extract::render(self.unit, &self.candidate, mode)
    }

    /// Methods are imported through their class.
    pub fn import_path(
        &self,
        file: &Path,
        roots: &[PathBuf],
    ) -> Option<ImportPath>
    {
        let name = self
            .candidate
            .class_name
            .unwrap_or(self.candidate.name);
        extract::import_path(file, roots, name)
    }
}

/// Matches in `unit`, in source order.
pub fn find<'u>(
    unit: &'u SourceUnit,
    patterns: &'u PatternSet,
    filters: &'u FilterSet,
) -> impl Iterator<Item = Match<'u>> + 'u
{
    walker::matching(unit, patterns).filter_map(move |candidate| {
        let facts = StructuralFacts::of(unit, &candidate);
        filters
            .accepts(&facts)
            .then_some(Match { unit, candidate, facts })
    })
}

/// Per-file problem reported instead of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic
{
    pub path: PathBuf,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind
{
    /// Unreadable or not valid UTF-8
    Read,
    /// Not valid Python
    Syntax,
}

impl fmt::Display for Diagnostic
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        let what = match self.kind
        {
            DiagnosticKind::Read => "Read error",
            DiagnosticKind::Syntax => "Syntax error",
        };
        write!(f, "# {what} in {}: {}", self.path.display(), self.message)
    }
}

/// Everything a search needs besides the files.
#[derive(Debug, Clone)]
pub struct SearchRequest
{
    pub patterns: PatternSet,
    pub filters: FilterSet,
    pub mode: RenderMode,

    /// Compute import paths against these roots
    pub import_roots: Option<Vec<PathBuf>>,

    /// Displayed paths are relative to this directory
    pub base_dir: PathBuf,
}

/// Runs a [`SearchRequest`] file by file with one reusable parser.
pub struct SymbolSearch<'r>
{
    request: &'r SearchRequest,
    parser: PythonParser,
}

impl<'r> SymbolSearch<'r>
{
    pub fn new(request: &'r SearchRequest) -> Result<Self>
    {
        Ok(Self { request, parser: PythonParser::new()? })
    }

    /// Read, parse and search one file.
    #[instrument(skip(self), fields(file = %path.display()))]
    pub fn search_file(
        &mut self,
        path: &Path,
    ) -> Result<Vec<RenderedSymbol>, Diagnostic>
    {
        let source = read_source(path).map_err(|e| Diagnostic {
            path: path.to_path_buf(),
            kind: DiagnosticKind::Read,
            message: e.to_string(),
        })?;
        self.search_text(source.text, path)
    }

    /// Search already-loaded source text.
    pub fn search_text(
        &mut self,
        text: String,
        path: &Path,
    ) -> Result<Vec<RenderedSymbol>, Diagnostic>
    {
        let unit = self
            .parser
            .parse(text, path)
            .map_err(|e| Diagnostic {
                path: path.to_path_buf(),
                kind: DiagnosticKind::Syntax,
                message: format!("line {}: {}", e.line, e.message),
            })?;

        let resolved = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let display_path = output::display_path(&resolved, &self.request.base_dir);

        let req = self.request;
        let found: Vec<RenderedSymbol> = find(&unit, &req.patterns, &req.filters)
            .map(|m| RenderedSymbol {
                path: path.to_path_buf(),
                display_path: display_path.clone(),
                name: m
                    .candidate
                    .name
                    .to_string(),
                class_name: m
                    .candidate
                    .class_name
                    .map(str::to_string),
                kind: m.candidate.kind,
                line: m.candidate.start_line,
                span: m.span(),
                import: req
                    .import_roots
                    .as_deref()
                    .and_then(|roots| m.import_path(&resolved, roots)),
                code: m
                    .render(req.mode)
                    .into_owned(),
            })
            .collect();

        debug!(matches = found.len(), "file searched");
        Ok(found)
    }

    /// Search every file, handing diagnostics to `on_diagnostic`.
    pub fn run<F>(
        &mut self,
        files: &[PathBuf],
        mut on_diagnostic: F,
    ) -> Vec<RenderedSymbol>
    where
        F: FnMut(&Diagnostic),
    {
        let mut all = Vec::new();
        for path in files
        {
            match self.search_file(path)
            {
                Ok(found) => all.extend(found),
                Err(diag) => on_diagnostic(&diag),
            }
        }
        all
    }
}

/// Public CLI entry point
pub fn run(
    cli: Cli,
    ctx: &AppContext,
) -> Result<Outcome>
{
    let format = cli.output_format();
    if cli
        .id_prefix
        .is_some()
        && !format.is_structured()
    {
        bail!("--id-prefix can only be used with --csv, --tsv, --json or --nl");
    }

    // Load configuration with graceful fallback
    let config = load_config().unwrap_or_else(|e| {
        warn!("ignoring configuration: {e:#}");
        Config::default()
    });
    let env = PythonEnv::new(&config.python);

    let mut silent = ctx.silent || config.silent;
    let mut patterns = cli
        .patterns
        .clone();
    let mut files = cli
        .files
        .clone();
    let mut dirs = cli
        .directories
        .clone();
    let mut sys_paths: Vec<PathBuf> = cli
        .sys_paths
        .iter()
        .chain(&config.sys_paths)
        .cloned()
        .collect();

    // Installed modules become search sources and widen the import roots.
    if !cli
        .modules
        .is_empty()
    {
        for module in &cli.modules
        {
            match env.module_location(module)?
            {
                ModuleLocation::File(f) => files.push(f),
                ModuleLocation::Package(d) => dirs.push(d),
            }
        }
        if patterns.is_empty()
        {
            patterns.push("*".to_string());
        }
        let mut roots = env.site_packages()?;
        roots.push(env.stdlib_dir()?);
        roots.append(&mut sys_paths);
        sys_paths = roots;
    }

    if cli.stdlib
    {
        let stdlib = env.stdlib_dir()?;
        if dirs.is_empty() && files.is_empty()
        {
            silent = true;
        }
        if !sys_paths.contains(&stdlib)
        {
            sys_paths.insert(0, stdlib.clone());
        }
        dirs.push(stdlib);
    }

    let filters = cli
        .filters
        .to_filter_set();
    let signatures = cli.signatures
        || cli.docs
        || cli.count
        || (cli.imports
            && cli
                .patterns
                .is_empty());

    if patterns.is_empty() && !signatures && filters.is_empty()
    {
        Cli::command()
            .print_help()
            .context("Failed to print help")?;
        return Ok(Outcome::HelpShown);
    }

    let replace = cli.replace
        || cli
            .rexec
            .is_some();
    if replace && signatures
    {
        bail!("--replace cannot be used with --signatures");
    }

    if patterns.is_empty()
    {
        patterns.push("*".to_string());
    }
    if files.is_empty() && dirs.is_empty()
    {
        dirs.push(PathBuf::from("."));
    }

    let mode = if cli.docs
    {
        RenderMode::SignatureWithDocstring
    }
    else if signatures
    {
        RenderMode::Signature
    }
    else
    {
        RenderMode::Full
    };

    let import_roots = cli
        .imports
        .then(|| {
            let roots = if sys_paths.is_empty() { &dirs } else { &sys_paths };
            roots
                .iter()
                .map(|r| dunce::canonicalize(r).unwrap_or_else(|_| r.clone()))
                .collect()
        });

    let request = SearchRequest {
        patterns: PatternSet::new(&patterns),
        filters,
        mode,
        import_roots,
        base_dir: dunce::canonicalize(".").context("Failed to resolve working directory")?,
    };

    // Build a gitignore-aware file walker with extra globs
    let walker = FileWalker::new(&config.exclude)?
        .with_gitignore(config.respect_gitignore && !cli.no_ignore)
        .with_include_hidden(config.include_hidden)
        .with_excludes(&cli.excludes);
    let paths = walker.collect(&files, &dirs);
    info!(files = paths.len(), patterns = ?request.patterns, "searching");

    let color = !ctx.no_color && std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();
    let mut search = SymbolSearch::new(&request)?;
    let results = search.run(&paths, |diag| {
        if silent
        {
            debug!(%diag, "suppressed");
        }
        else if color
        {
            eprintln!("{}", diag.yellow());
        }
        else
        {
            eprintln!("{diag}");
        }
    });

    if replace
    {
        replace_single(results, cli.rexec.as_deref())?;
        return Ok(Outcome::Done);
    }

    if cli.count
    {
        println!("{}", results.len());
    }
    else
    {
        let opts = OutputOptions {
            format,
            show_file: !cli.no_file,
            show_imports: cli.imports,
            id_prefix: cli
                .id_prefix
                .unwrap_or_default(),
        };
        let mut writer = SymbolWriter::new(io::stdout().lock(), opts);
        for symbol in &results
        {
            writer.write(symbol)?;
        }
        let _stdout = writer.finish()?;
    }

    if cli.check && !results.is_empty()
    {
        return Ok(Outcome::MatchesFound);
    }
    Ok(Outcome::Done)
}

/// Rewrite the one match with stdin or the output of `rexec`.
#[instrument(skip(results), fields(matches = results.len()))]
fn replace_single(
    results: Vec<RenderedSymbol>,
    rexec: Option<&str>,
) -> Result<()>
{
    let symbol = edit::only_match(results)?;

    let replacement = match rexec
    {
        Some(command) => edit::pipe_through(command, &symbol.code)?,
        None =>
        {
            let stdin = io::stdin();
            if stdin.is_terminal()
            {
                bail!("--replace only works with text piped to it on stdin");
            }
            let mut text = String::new();
            stdin
                .lock()
                .read_to_string(&mut text)
                .context("Failed to read replacement from stdin")?;
            if text.is_empty()
            {
                return Err(edit::ReplaceError::EmptyReplacement.into());
            }
            text
        }
    };

    let target = SpanTarget { span: symbol.span, expected: symbol.code };
    edit::apply_to_file(&symbol.path, &target, &replacement)?;
    info!(file = %symbol.path.display(), "symbol replaced");
    Ok(())
}
