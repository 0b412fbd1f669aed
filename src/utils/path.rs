//! Path helpers: session-root relations, the reserved temporary-file
//! naming convention and Windows long-path handling.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Suffix reserved for in-flight temporary files at the destination.
pub const TEMP_SUFFIX: &str = ".ccopy_tmp";

/// Whether a file name carries the reserved temporary suffix.
///
/// Such files are never treated as legitimate data: the walker skips them
/// so a source file can never collide with an in-flight temporary.
pub fn is_reserved_temp_name(name: &OsStr) -> bool {
    name.to_string_lossy().ends_with(TEMP_SUFFIX)
}

/// Prefix for a temporary file standing in for `dst`.
///
/// Together with a random segment and [`TEMP_SUFFIX`] this yields
/// `<finalname>.<random>.ccopy_tmp` in the destination directory.
pub(crate) fn temp_prefix(dst: &Path) -> String {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{name}.")
}

/// Lexically normalize an absolute path (resolve `.` and `..`).
///
/// Unlike `canonicalize` this works for paths that do not exist yet,
/// such as a destination root about to be created.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `candidate` is `root` or lies underneath it.
///
/// Both paths should be absolute and normalized.
pub fn is_within(candidate: &Path, root: &Path) -> bool {
    candidate.starts_with(root)
}

/// Convert a path for safe use with file operations.
///
/// On Windows, this converts the path to extended-length (`\\?\`) format so
/// that deep trees plus the temporary suffix do not run into `MAX_PATH`.
/// On other platforms, it returns the path unchanged.
#[cfg(windows)]
pub fn safe_path(path: &Path) -> PathBuf {
    let text = path.as_os_str().to_string_lossy();
    if text.starts_with(r"\\?\") {
        return path.to_path_buf();
    }
    if let Some(unc) = text.strip_prefix(r"\\") {
        return PathBuf::from(format!(r"\\?\UNC\{unc}"));
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    PathBuf::from(format!(r"\\?\{}", absolute.display()))
}

/// Convert a path for safe use with file operations.
///
/// On non-Windows platforms, this simply returns a clone of the input path.
#[cfg(not(windows))]
pub fn safe_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
