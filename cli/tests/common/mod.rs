//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A source tree and a not-yet-created destination inside one temp dir.
pub struct TestFixture {
    pub root: TempDir,
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl TestFixture {
    /// Create a fixture with an empty source directory.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let src = root.path().join("src");
        let dst = root.path().join("dst");
        fs::create_dir_all(&src).expect("Failed to create source dir");
        Self { root, src, dst }
    }

    /// Write `content` to `relative` under the source, creating parents.
    pub fn write_src(&self, relative: &str, content: &str) -> PathBuf {
        write_file(&self.src.join(relative), content)
    }

    /// Write `content` to `relative` under the destination, creating parents.
    pub fn write_dst(&self, relative: &str, content: &str) -> PathBuf {
        write_file(&self.dst.join(relative), content)
    }

    /// Create `count` files of `size` bytes in the source root.
    pub fn create_files(&self, count: usize, size: usize) {
        for i in 0..count {
            self.write_src(&format!("file{i}.txt"), &"x".repeat(size));
        }
    }

    /// Content of a destination file.
    pub fn read_dst(&self, relative: &str) -> String {
        fs::read_to_string(self.dst.join(relative)).expect("Failed to read destination file")
    }

    /// Copy a source file's mtime onto its destination counterpart.
    pub fn sync_mtime(&self, relative: &str) {
        let mtime = fs::metadata(self.src.join(relative))
            .and_then(|m| m.modified())
            .expect("Failed to read source mtime");
        filetime::set_file_mtime(
            self.dst.join(relative),
            filetime::FileTime::from_system_time(mtime),
        )
        .expect("Failed to set destination mtime");
    }

    /// A path for a log file outside both trees.
    pub fn log_path(&self) -> PathBuf {
        self.root.path().join("session.jsonl")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, content).expect("Failed to write file");
    path.to_path_buf()
}

/// All regular files under `dir`, relative and sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    collect(dir, dir, &mut out);
    out.sort();
    out
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let relative = path.strip_prefix(root).expect("entry outside root");
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Whether any temporary artifact is left under `dir`.
pub fn has_temp_artifacts(dir: &Path) -> bool {
    list_files(dir).iter().any(|f| f.ends_with(".ccopy_tmp"))
}
