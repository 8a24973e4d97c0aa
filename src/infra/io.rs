use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

/// UTF-8 byte order mark
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding declaration on the first or second line of a file.
static CODING_COOKIE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)")
        .unwrap_or_else(|e| unreachable!("coding cookie regex: {e}"))
});

/// Why a source file could not be turned into text, or back.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid UTF-8 on line {line}")]
    InvalidUtf8 { path: PathBuf, line: usize },

    #[error("unsupported source encoding '{encoding}'")]
    UnsupportedEncoding { path: PathBuf, encoding: String },

    #[error("source is not valid {encoding}")]
    Malformed { path: PathBuf, encoding: String },

    #[error("text cannot be written as {encoding}")]
    Unencodable { path: PathBuf, encoding: String },
}

/// Decoded source plus what is needed to store it the same way again.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    encoding: &'static Encoding,
    bom: bool,
}

impl SourceText {
    /// Encoding the file was decoded from.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Bytes for `text` in the file's original encoding, BOM included.
    pub fn encode(&self, path: &Path, text: &str) -> Result<Vec<u8>, SourceError> {
        let mut out = Vec::with_capacity(text.len() + BOM.len());
        if self.bom {
            out.extend_from_slice(BOM);
        }

        if self.encoding == UTF_8 {
            out.extend_from_slice(text.as_bytes());
            return Ok(out);
        }

        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(SourceError::Unencodable {
                path: path.to_path_buf(),
                encoding: self.encoding.name().to_string(),
            });
        }
        out.extend_from_slice(&bytes);
        Ok(out)
    }
}

/// Read a Python source file as text.
///
/// A leading BOM is dropped. A coding cookie naming a known
/// ASCII-compatible encoding is honoured; unknown labels are rejected
/// rather than misread.
pub fn read_source<P: AsRef<Path>>(path: P) -> Result<SourceText, SourceError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_source(path, bytes)
}

/// Decode raw file bytes; see [`read_source`].
pub fn decode_source(path: &Path, mut bytes: Vec<u8>) -> Result<SourceText, SourceError> {
    let bom = bytes.starts_with(BOM);
    if bom {
        bytes.drain(..BOM.len());
    }

    let encoding = match declared_encoding(&bytes) {
        None => UTF_8,
        Some(label) if is_utf8_compatible(&label) => UTF_8,
        Some(label) => match lookup_encoding(&label) {
            Some(enc) if enc.is_ascii_compatible() && !bom => enc,
            _ => {
                return Err(SourceError::UnsupportedEncoding {
                    path: path.to_path_buf(),
                    encoding: label,
                });
            }
        },
    };

    let text = if encoding == UTF_8 {
        decode_utf8(path, bytes)?
    } else {
        encoding
            .decode_without_bom_handling_and_without_replacement(&bytes)
            .ok_or_else(|| SourceError::Malformed {
                path: path.to_path_buf(),
                encoding: encoding.name().to_string(),
            })?
            .into_owned()
    };

    Ok(SourceText {
        text,
        encoding,
        bom,
    })
}

fn decode_utf8(path: &Path, bytes: Vec<u8>) -> Result<String, SourceError> {
    String::from_utf8(bytes).map_err(|e| {
        let valid = e.utf8_error().valid_up_to();
        let line = memchr::memchr_iter(b'\n', &e.as_bytes()[..valid]).count() + 1;
        SourceError::InvalidUtf8 {
            path: path.to_path_buf(),
            line,
        }
    })
}

/// Encoding named by a coding cookie in the first two lines.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    bytes
        .split(|&b| b == b'\n')
        .take(2)
        .find_map(|line| CODING_COOKIE.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).to_ascii_lowercase())
}

fn is_utf8_compatible(encoding: &str) -> bool {
    let normalized = encoding.replace('_', "-");
    matches!(
        normalized.as_str(),
        "utf-8" | "utf8" | "utf-8-sig" | "ascii" | "us-ascii"
    ) || normalized.starts_with("utf-8-")
}

/// Resolve a cookie label, tolerating `latin_1`/`latin-1` style spellings.
fn lookup_encoding(label: &str) -> Option<&'static Encoding> {
    let dashed = label.replace('_', "-");
    let squashed: String = label.chars().filter(|c| !matches!(c, '-' | '_')).collect();

    [label, dashed.as_str(), squashed.as_str()]
        .into_iter()
        .find_map(|l| Encoding::for_label(l.as_bytes()))
}
