// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Single-level directory listing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{ScanConfig, DEFAULT_BACKUP_DIR_NAME};
use crate::{OrdoError, Result};

/// One filesystem object as observed at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Lower-cased, including the dot; empty for directories and bare names
    pub extension: String,
    pub is_directory: bool,
    pub is_symlink: bool,
}

impl ScannedEntry {
    /// Build an entry for a single path
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = std::fs::symlink_metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| OrdoError::Plan(format!("path has no file name: {:?}", path)))?;

        let is_symlink = meta.file_type().is_symlink();
        let is_directory = meta.is_dir();
        let extension = if is_directory {
            String::new()
        } else {
            extension_of(&name)
        };

        Ok(Self {
            name,
            path: path.to_path_buf(),
            size: if is_directory { 0 } else { meta.len() },
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            extension,
            is_directory,
            is_symlink,
        })
    }

    /// Name without the extension
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if !self.extension.is_empty() => &self.name[..idx],
            _ => &self.name,
        }
    }
}

/// Lower-cased extension including the dot, or empty
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) if idx + 1 == name.len() => String::new(),
        Some(idx) => name[idx..].to_lowercase(),
    }
}

/// List the entries directly inside `root`, sorted by name.
///
/// Entries whose metadata cannot be read are skipped; only an unreadable
/// root is an error.
pub fn scan(root: &Path, config: &ScanConfig) -> Result<Vec<ScannedEntry>> {
    let patterns = config
        .ignore_patterns
        .iter()
        .map(|p| glob::Pattern::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let reader = std::fs::read_dir(root).map_err(|source| OrdoError::Scan {
        path: root.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for item in reader {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", root, e);
                continue;
            }
        };

        let path = item.path();
        let name = item.file_name().to_string_lossy().into_owned();
        if !should_process(&name, config.include_hidden) {
            debug!("Skipping by policy: {:?}", path);
            continue;
        }
        if patterns.iter().any(|p| p.matches(&name)) {
            debug!("Skipping ignored entry: {:?}", path);
            continue;
        }

        match ScannedEntry::from_path(&path) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("Scanned {} entries in {:?}", entries.len(), root);
    Ok(entries)
}

/// Check if an entry should be considered at all
pub fn should_process(filename: &str, include_hidden: bool) -> bool {
    if filename.is_empty() || filename == DEFAULT_BACKUP_DIR_NAME {
        return false;
    }

    if filename.starts_with('.') && !include_hidden {
        return false;
    }

    // Downloads still in flight
    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    let lower = filename.to_lowercase();
    if temp_extensions.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }

    let skip_names = ["desktop.ini", "thumbs.db", ".ds_store"];
    !skip_names.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn extension_is_lowercased_with_dot() {
        assert_eq!(extension_of("Report.PDF"), ".pdf");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("Makefile"), "");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn scan_lists_one_level_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), b"bb").unwrap();
        fs::write(dir.path().join("a.JPG"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("nested.txt"), b"x").unwrap();

        let entries = scan(dir.path(), &ScanConfig::default()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.JPG", "b.txt", "sub"]);

        assert_eq!(entries[0].extension, ".jpg");
        assert_eq!(entries[0].size, 1);
        assert!(entries[0].modified.is_some());
        assert!(entries[2].is_directory);
        assert_eq!(entries[2].extension, "");
    }

    #[test]
    fn scan_skips_hidden_temp_and_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".hidden"), b"").unwrap();
        fs::write(dir.path().join("movie.mp4.part"), b"").unwrap();
        fs::write(dir.path().join("Thumbs.db"), b"").unwrap();
        fs::write(dir.path().join("old.bak"), b"").unwrap();
        fs::write(dir.path().join("keep.txt"), b"").unwrap();
        fs::create_dir(dir.path().join(DEFAULT_BACKUP_DIR_NAME)).unwrap();

        let config = ScanConfig {
            include_hidden: false,
            ignore_patterns: vec!["*.bak".to_string()],
        };
        let entries = scan(dir.path(), &config).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["keep.txt"]);
    }

    #[test]
    fn scan_of_missing_root_is_a_scan_error() {
        let dir = TempDir::new().unwrap();
        let err = scan(&dir.path().join("nope"), &ScanConfig::default()).unwrap_err();
        assert!(matches!(err, OrdoError::Scan { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_flagged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link")).unwrap();

        let entry = ScannedEntry::from_path(&dir.path().join("link")).unwrap();
        assert!(entry.is_symlink);
        assert!(!entry.is_directory);
    }

    #[test]
    fn stem_strips_extension() {
        let entry = ScannedEntry {
            name: "IMG_0001.JPG".to_string(),
            path: PathBuf::from("/x/IMG_0001.JPG"),
            size: 1,
            modified: None,
            extension: ".jpg".to_string(),
            is_directory: false,
            is_symlink: false,
        };
        assert_eq!(entry.stem(), "IMG_0001");
    }
}
