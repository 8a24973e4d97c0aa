//! Python environment discovery through the interpreter itself.
//!
//! Locating the standard library, site-packages and installed
//! modules is delegated to `python -c`, so virtualenvs and
//! distribution layouts resolve the same way Python resolves them.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

const STDLIB_SCRIPT: &str = "import sysconfig; print(sysconfig.get_paths()['stdlib'])";

const SITE_SCRIPT: &str = "\
import site, sys
paths = site.getsitepackages() if hasattr(site, 'getsitepackages') else []
user = getattr(site, 'getusersitepackages', lambda: None)()
print('\\n'.join(paths + ([user] if isinstance(user, str) else [])))";

const FIND_SPEC_SCRIPT: &str = "\
import importlib.util, sys
try:
    spec = importlib.util.find_spec(sys.argv[1])
except (ImportError, ValueError):
    spec = None
if spec is None:
    sys.exit(3)
print(spec.origin or '')";

/// Exit status of the find-spec script for unknown modules.
const NOT_FOUND: i32 = 3;

/// Where a module's source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLocation
{
    /// Single-file module
    File(PathBuf),

    /// Package directory (its `__init__.py` and below)
    Package(PathBuf),
}

impl ModuleLocation
{
    pub fn path(&self) -> &Path
    {
        match self
        {
            Self::File(p) | Self::Package(p) => p,
        }
    }
}

/// A Python interpreter that can be asked about its environment.
#[derive(Debug, Clone)]
pub struct PythonEnv
{
    interpreter: String,
}

impl PythonEnv
{
    pub fn new(interpreter: impl Into<String>) -> Self
    {
        Self { interpreter: interpreter.into() }
    }

    /// Directory holding the standard library.
    pub fn stdlib_dir(&self) -> Result<PathBuf>
    {
        let out = self.query(STDLIB_SCRIPT, &[])?;
        let dir = out.trim();
        if dir.is_empty()
        {
            bail!("{} reported no standard library directory", self.interpreter);
        }
        Ok(PathBuf::from(dir))
    }

    /// Site-packages directories that exist on disk.
    pub fn site_packages(&self) -> Result<Vec<PathBuf>>
    {
        let out = self.query(SITE_SCRIPT, &[])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .collect())
    }

    /// Resolve an importable module name to its source.
    #[instrument(skip(self), fields(python = %self.interpreter))]
    pub fn module_location(
        &self,
        module: &str,
    ) -> Result<ModuleLocation>
    {
        let output = self
            .command(FIND_SPEC_SCRIPT, &[module])
            .output()
            .with_context(|| format!("Failed to run {}", self.interpreter))?;

        if output
            .status
            .code()
            == Some(NOT_FOUND)
        {
            bail!("Module not found: {module}");
        }
        let stdout = checked_stdout(&self.interpreter, output)?;

        let location = classify_origin(module, stdout.trim())?;
        debug!(path = %location.path().display(), "module resolved");
        Ok(location)
    }

    fn command(
        &self,
        script: &str,
        args: &[&str],
    ) -> Command
    {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-c")
            .arg(script)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn query(
        &self,
        script: &str,
        args: &[&str],
    ) -> Result<String>
    {
        let output = self
            .command(script, args)
            .output()
            .with_context(|| format!("Failed to run {}", self.interpreter))?;
        checked_stdout(&self.interpreter, output)
    }
}

fn checked_stdout(
    interpreter: &str,
    output: std::process::Output,
) -> Result<String>
{
    if !output
        .status
        .success()
    {
        bail!(
            "{interpreter} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    String::from_utf8(output.stdout).with_context(|| format!("{interpreter} printed non-UTF-8 output"))
}

/// Map a module spec origin to a file or package directory.
fn classify_origin(
    module: &str,
    origin: &str,
) -> Result<ModuleLocation>
{
    if origin.is_empty() || origin == "built-in" || origin == "frozen"
    {
        bail!("Module {module} has no Python source");
    }

    let path = PathBuf::from(origin);
    if path
        .extension()
        .is_none_or(|ext| ext != "py")
    {
        bail!("Module {module} has no Python source ({origin})");
    }

    if path
        .file_stem()
        .is_some_and(|stem| stem == "__init__")
        && let Some(dir) = path.parent()
    {
        return Ok(ModuleLocation::Package(dir.to_path_buf()));
    }
    Ok(ModuleLocation::File(path))
}
