//! Eligibility checks and output-path derivation.
//!
//! Pure computation: given a source path and a minified-suffix, work out
//! directory, extension, base name and the candidate output path, or reject
//! the file. Extensions are matched longest-first so the double extension
//! `.js.erb` is reachable alongside plain `.js`.

use camino::{Utf8Path, Utf8PathBuf};

/// File suffixes accepted as minification input, longest first.
/// Exact, case-sensitive matches against the end of the file name.
pub const ELIGIBLE_SUFFIXES: [&str; 4] = [".js.erb", ".jsm", "._js", ".js"];

/// Why a path was rejected before any I/O happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ineligible {
    #[error("{file_name} does not have a recognised file suffix.")]
    UnrecognisedSuffix { file_name: String },
    #[error("{file_name} already looks like a minified artifact.")]
    AlreadyMinified { file_name: String },
}

/// A source file that passed eligibility, with its derived paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Directory containing the source file.
    pub directory: Utf8PathBuf,
    /// Matched suffix, leading dot included (e.g. `.js.erb`).
    pub extension: String,
    /// File name with the matched suffix stripped.
    pub base_name: String,
    /// File name without any directory components. Result-log key.
    pub file_name: String,
    /// Where the minified output goes: `<dir>/<base>.<suffix><ext>`.
    pub output_path: Utf8PathBuf,
}

/// Resolve a source path, or explain why it is ineligible.
pub fn resolve(file_path: &Utf8Path, min_suffix: &str) -> Result<ResolvedSource, Ineligible> {
    let file_name = file_path.file_name().unwrap_or_default().to_string();

    let extension = ELIGIBLE_SUFFIXES
        .iter()
        .find(|suffix| file_name.ends_with(*suffix) && file_name.len() > suffix.len())
        .ok_or_else(|| Ineligible::UnrecognisedSuffix {
            file_name: file_name.clone(),
        })?;

    // Refuse to re-minify our own output (`app.min.js` with the default
    // suffix). The guard tracks the configured suffix so a custom one
    // protects its own artifacts too.
    if file_name.contains(&format!(".{min_suffix}.")) {
        return Err(Ineligible::AlreadyMinified { file_name });
    }

    let base_name = file_name[..file_name.len() - extension.len()].to_string();
    let directory = file_path
        .parent()
        .map(Utf8Path::to_path_buf)
        .unwrap_or_default();
    let output_path = directory.join(format!("{base_name}.{min_suffix}{extension}"));

    Ok(ResolvedSource {
        directory,
        extension: extension.to_string(),
        base_name,
        file_name,
        output_path,
    })
}
