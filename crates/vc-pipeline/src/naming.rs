//! Output filenames: suffixes and slice indices go between stem and
//! extension.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// `dir/{stem}{suffix}{-index}{.ext}` for `output = dir/{stem}{.ext}`.
pub fn derive_output_path(output: &Path, suffix: &str, index: Option<usize>) -> PathBuf {
    let stem = output.file_stem().unwrap_or_default();

    let mut name = OsString::from(stem);
    name.push(suffix);
    if let Some(i) = index {
        name.push(format!("-{i}"));
    }
    if let Some(ext) = output.extension() {
        name.push(".");
        name.push(ext);
    }

    output.with_file_name(name)
}

/// Whether `a` and `b` name the same file once `.`, `..` and symlinks in
/// their directories are resolved. Directories that do not exist are
/// compared as written.
pub fn is_same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.file_name(), b.file_name()) {
        (Some(x), Some(y)) if x == y => canonical_parent(a) == canonical_parent(b),
        _ => false,
    }
}

fn canonical_parent(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf())
}
