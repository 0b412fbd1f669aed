//! Source tree enumeration.
//!
//! The engine only needs a flat list of regular files with their size and
//! mtime. Symlinks are not followed and not transferred: deleting one under
//! `move` would remove the link and leave its target behind, which is not
//! what a user moving "their data" expects.

use crate::error::Result;
use crate::options::SessionConfig;
use crate::task::SourceEntry;
use crate::utils::path::is_reserved_temp_name;
use std::fs;
use std::path::{Path, PathBuf};

/// Recursively collect every regular file under `root`.
///
/// Entries are returned in a stable order (directory entries sorted by
/// name, depth first) so two walks over an unchanged tree yield identical
/// sequences.
///
/// Skipped with a warning: symlinks, special files, unreadable entries
/// and files carrying the reserved `.ccopy_tmp` suffix.
///
/// # Errors
///
/// Fails only if `root` itself cannot be read.
pub fn discover(root: &Path, config: &SessionConfig) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();
    let mut dirs: Vec<PathBuf> = vec![PathBuf::new()];
    let mut first = true;

    while let Some(rel_dir) = dirs.pop() {
        let abs_dir = root.join(&rel_dir);
        let listing = match fs::read_dir(&abs_dir) {
            Ok(listing) => listing,
            Err(e) if first => return Err(e.into()),
            Err(e) => {
                config.warn(&format!(
                    "Skipping unreadable directory {}: {}",
                    abs_dir.display(),
                    e
                ));
                continue;
            }
        };
        first = false;

        let mut children: Vec<fs::DirEntry> = listing
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    config.warn(&format!(
                        "Skipping unreadable entry in {}: {}",
                        abs_dir.display(),
                        e
                    ));
                    None
                }
            })
            .collect();
        children.sort_by_key(fs::DirEntry::file_name);

        let mut subdirs = Vec::new();
        for child in children {
            let name = child.file_name();
            let rel_path = rel_dir.join(&name);

            // Check symlink FIRST (before is_dir/is_file which follow symlinks)
            let file_type = match child.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    config.warn(&format!("Skipping {}: {}", child.path().display(), e));
                    continue;
                }
            };

            if file_type.is_symlink() {
                config.warn(&format!("Skipping symlink: {}", child.path().display()));
            } else if file_type.is_dir() {
                subdirs.push(rel_path);
            } else if file_type.is_file() {
                if is_reserved_temp_name(&name) {
                    config.warn(&format!(
                        "Skipping leftover temporary file: {}",
                        child.path().display()
                    ));
                    continue;
                }
                match child.metadata().and_then(|m| Ok((m.len(), m.modified()?))) {
                    Ok((size, mtime)) => entries.push(SourceEntry {
                        relative_path: rel_path,
                        size,
                        mtime,
                    }),
                    Err(e) => {
                        config.warn(&format!("Skipping {}: {}", child.path().display(), e));
                    }
                }
            } else {
                config.warn(&format!("Skipping special file: {}", child.path().display()));
            }
        }

        // Reverse so the stack pops subdirectories in name order
        dirs.extend(subdirs.into_iter().rev());
    }

    Ok(entries)
}
