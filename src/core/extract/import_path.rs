//! Estimated import statement for a symbol.
//!
//! The module path is the file path relative to the longest root
//! that contains it, with separators turned into dots. Methods are
//! imported through their class.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};


/// Package initializer module name.
const PACKAGE_INIT: &str = "__init__";

/// `from <module> import <name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath
{
    pub module: String,
    pub name: String,
}

impl fmt::Display for ImportPath
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "from {} import {}", self.module, self.name)
    }
}

/// Estimate the import path of `name` defined in `file`.
///
/// `file` and `roots` are compared component-wise, so both should
/// be absolute (or both relative to the same base). Returns None
/// when no root contains the file.
pub fn import_path(
    file: &Path,
    roots: &[PathBuf],
    name: &str,
) -> Option<ImportPath>
{
    let relative = roots
        .iter()
        .filter_map(|root| {
            file.strip_prefix(root)
                .ok()
                .map(|rel| (root.components().count(), rel))
        })
        .max_by_key(|(depth, _)| *depth)
        .map(|(_, rel)| rel)?;

    let mut parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c
        {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    // Last component is the file; drop its extension.
    let file_name = parts.pop()?;
    let stem = Path::new(file_name)
        .file_stem()?
        .to_str()?;
    if stem != PACKAGE_INIT
    {
        parts.push(stem);
    }

    if parts.is_empty()
    {
        return None;
    }

    Some(ImportPath { module: parts.join("."), name: name.to_string() })
}
