use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config files looked up in the working directory, first match wins.
const CONFIG_FILES: [&str; 3] = ["defgrep.toml", ".defgrep.toml", "defgrep.json"];

/// Prefix of environment overrides, e.g. `DEFGREP_PYTHON`.
const ENV_PREFIX: &str = "DEFGREP";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config
{
    /// Extra ignore globs (in addition to .gitignore)
    pub exclude: Vec<String>,

    /// Honour .gitignore while walking directories
    pub respect_gitignore: bool,

    /// Walk into hidden files and directories
    pub include_hidden: bool,

    /// Suppress per-file diagnostics
    pub silent: bool,

    /// Extra roots used to estimate import paths
    pub sys_paths: Vec<PathBuf>,

    /// Interpreter queried for `--stdlib` and `--module`
    pub python: String,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            exclude: vec![
                "**/.git".to_string(),
                "**/__pycache__".to_string(),
                "**/.tox".to_string(),
                "**/node_modules".to_string(),
            ],
            respect_gitignore: true,
            include_hidden: true,
            silent: false,
            sys_paths: Vec::new(),
            python: "python3".to_string(),
        }
    }
}

/// Load configuration from the working directory and environment.
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load configuration looking for config files in `dir`.
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    for name in CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // Nested keys use a double underscore, e.g. DEFGREP_RESPECT_GITIGNORE
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("exclude")
            .with_list_parse_key("sys_paths")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}
