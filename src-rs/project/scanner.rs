use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::config::ScannerConfig;
use crate::error::{CoreError, CoreResult};
use crate::llm::models::provider_base::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Counted,
    /// Not valid UTF-8; counted as zero lines.
    Undecodable,
    /// Could not be read at all; counted as zero lines.
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFile {
    /// Relative to the scan root, `/`-separated.
    pub path: String,
    pub line_count: usize,
    /// Final `.suffix` including the dot, or empty.
    pub extension: String,
    pub status: FileStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

/// Snapshot of a project tree. Rebuilt from scratch on every scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStructure {
    pub files: Vec<ProjectFile>,
    pub directories: BTreeSet<String>,
    pub languages: BTreeSet<String>,
    pub total_lines: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl ProjectStructure {
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Project structure: {} files, {} directories, {} total lines\n",
            self.files.len(),
            self.directories.len(),
            self.total_lines
        );
        if !self.languages.is_empty() {
            let langs: Vec<&str> = self.languages.iter().map(String::as_str).collect();
            out.push_str(&format!("Languages: {}\n", langs.join(", ")));
        }
        if !self.directories.is_empty() {
            out.push_str("Directories:\n");
            for dir in &self.directories {
                out.push_str(&format!("  {}/\n", dir));
            }
        }
        out.push_str("Files:\n");
        for file in &self.files {
            match file.status {
                FileStatus::Counted => {
                    out.push_str(&format!("  {} ({} lines)\n", file.path, file.line_count))
                }
                FileStatus::Undecodable => out.push_str(&format!("  {} (binary)\n", file.path)),
                FileStatus::Unreadable => out.push_str(&format!("  {} (unreadable)\n", file.path)),
            }
        }
        out
    }

    fn add_file(&mut self, file: ProjectFile) {
        self.total_lines += file.line_count;
        if !file.extension.is_empty() {
            self.languages.insert(file.extension.clone());
        }
        self.files.push(file);
    }

    /// The summary as a system message, ready to pass as provider context.
    pub fn to_context(&self) -> Message {
        Message::system(self.summary())
    }
}

#[derive(Debug, Clone)]
pub struct ProjectScanner {
    skip_dirs: BTreeSet<String>,
}

impl Default for ProjectScanner {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl ProjectScanner {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            skip_dirs: config.skip_dirs.iter().cloned().collect(),
        }
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.skip_dirs.contains(name.as_ref())
    }

    /// Walks `root` in file-name order. Per-file problems are recorded on
    /// the entry; only a root that is not a directory is an error.
    pub fn scan(&self, root: &Path) -> CoreResult<ProjectStructure> {
        if !root.is_dir() {
            return Err(CoreError::InvalidRequest(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let mut structure = ProjectStructure::default();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_excluded(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| relative_path(root, p))
                        .unwrap_or_default();
                    let reason = e
                        .io_error()
                        .map(|io| io.to_string())
                        .unwrap_or_else(|| e.to_string());
                    log::warn!("Skipping '{}' during scan: {}", path, reason);
                    structure.skipped.push(SkippedEntry { path, reason });
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let rel = relative_path(root, entry.path());
            let file_type = entry.file_type();
            if file_type.is_dir() {
                structure.directories.insert(rel);
            } else if file_type.is_file() {
                structure.add_file(scan_file(entry.path(), rel));
            } else if file_type.is_symlink() {
                // Symlinked directories are never descended into. Links to
                // files are read through; dangling ones end up unreadable.
                match fs::metadata(entry.path()) {
                    Ok(target) if target.is_dir() => {
                        log::debug!("Not following symlinked directory '{}'", rel);
                        structure.skipped.push(SkippedEntry {
                            path: rel,
                            reason: "symlinked directory not followed".to_string(),
                        });
                    }
                    _ => structure.add_file(scan_file(entry.path(), rel)),
                }
            }
        }

        log::debug!(
            "Scanned {}: {} files, {} lines",
            root.display(),
            structure.files.len(),
            structure.total_lines
        );
        Ok(structure)
    }
}

fn scan_file(path: &Path, rel: String) -> ProjectFile {
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let (line_count, status) = match fs::read_to_string(path) {
        Ok(content) => (content.lines().count(), FileStatus::Counted),
        Err(e) if e.kind() == ErrorKind::InvalidData => (0, FileStatus::Undecodable),
        Err(e) => {
            log::debug!("Unreadable file {}: {}", path.display(), e);
            (0, FileStatus::Unreadable)
        }
    };

    ProjectFile {
        path: rel,
        line_count,
        extension,
        status,
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
