// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Best-effort reversal of an operation log

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_BACKUP_DIR_NAME;
use crate::executor::StepFailure;
use crate::history::{Operation, OperationKind, OperationLog};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoResult {
    pub log_id: String,
    /// Operations successfully reversed
    pub restored: usize,
    /// Created folders left in place because they are no longer empty
    pub skipped: usize,
    pub failures: Vec<StepFailure>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UndoEngine;

enum Outcome {
    Restored,
    Skipped,
}

impl UndoEngine {
    pub fn new() -> Self {
        Self
    }

    /// Replay `log` backwards. A step that cannot be reversed is recorded
    /// and the rest still run.
    pub fn reverse(&self, log: &OperationLog) -> UndoResult {
        let mut result = UndoResult {
            log_id: log.id.clone(),
            ..Default::default()
        };

        for op in log.operations.iter().rev() {
            match reverse_one(op) {
                Ok(Outcome::Restored) => result.restored += 1,
                Ok(Outcome::Skipped) => result.skipped += 1,
                Err(e) => {
                    warn!("Cannot undo {:?} on {:?}: {}", op.kind, op.source, e);
                    result.failures.push(StepFailure {
                        path: op.source.clone(),
                        kind: op.kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(backup_dir) = &log.backup_dir {
            remove_backup_area(backup_dir);
        }

        info!(
            "Undo of {}: {} restored, {} skipped, {} failed",
            log.id,
            result.restored,
            result.skipped,
            result.failures.len()
        );
        result
    }
}

fn reverse_one(op: &Operation) -> io::Result<Outcome> {
    match op.kind {
        OperationKind::MoveOrRename => {
            let destination = op.destination.as_ref().ok_or_else(|| missing("destination"))?;
            ensure_free(&op.source)?;
            fs::rename(destination, &op.source)?;
            debug!("Restored {:?} -> {:?}", destination, op.source);
            Ok(Outcome::Restored)
        }
        OperationKind::RelocateDuplicate => {
            let backup = op.backup.as_ref().ok_or_else(|| missing("backup"))?;
            ensure_free(&op.source)?;
            fs::copy(backup, &op.source)?;
            if let Err(e) = fs::remove_file(backup) {
                warn!("Restored {:?} but could not delete backup {:?}: {}", op.source, backup, e);
            }
            debug!("Restored duplicate {:?}", op.source);
            Ok(Outcome::Restored)
        }
        OperationKind::CreateDirectory => match fs::remove_dir(&op.source) {
            Ok(()) => Ok(Outcome::Restored),
            Err(_) if has_entries(&op.source) => {
                debug!("Keeping non-empty folder {:?}", op.source);
                Ok(Outcome::Skipped)
            }
            Err(e) => Err(e),
        },
    }
}

fn missing(field: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("operation has no {field} path"))
}

/// Never overwrite something that now occupies the original path
fn ensure_free(path: &Path) -> io::Result<()> {
    if path.symlink_metadata().is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        ));
    }
    Ok(())
}

fn has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Drop the run's backup folder, and the default base folder, once empty
fn remove_backup_area(backup_dir: &Path) {
    if fs::remove_dir(backup_dir).is_err() {
        debug!("Backup area {:?} kept", backup_dir);
        return;
    }
    if let Some(base) = backup_dir.parent() {
        if base.file_name().map_or(false, |n| n == DEFAULT_BACKUP_DIR_NAME) {
            let _ = fs::remove_dir(base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reverses_in_strict_reverse_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let folder = root.join("Image");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("b.jpg"), b"x").unwrap();

        // the folder can only be removed after the file has left it
        let mut log = OperationLog::new(root);
        log.push(Operation::create_directory(folder.clone()));
        log.push(Operation::move_or_rename(root.join("a.jpg"), folder.join("b.jpg")));

        let result = UndoEngine::new().reverse(&log);
        assert_eq!(result.restored, 2);
        assert!(result.failures.is_empty());
        assert!(root.join("a.jpg").exists());
        assert!(!folder.exists());
    }

    #[test]
    fn non_empty_folder_is_skipped_silently() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("Image");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("added-by-user.jpg"), b"x").unwrap();

        let mut log = OperationLog::new(tmp.path());
        log.push(Operation::create_directory(folder.clone()));

        let result = UndoEngine::new().reverse(&log);
        assert_eq!(result.restored, 0);
        assert_eq!(result.skipped, 1);
        assert!(result.failures.is_empty());
        assert!(folder.join("added-by-user.jpg").exists());
    }

    #[test]
    fn occupied_original_path_is_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"new file").unwrap();
        fs::write(tmp.path().join("b.jpg"), b"moved file").unwrap();

        let mut log = OperationLog::new(tmp.path());
        log.push(Operation::move_or_rename(tmp.path().join("a.jpg"), tmp.path().join("b.jpg")));

        let result = UndoEngine::new().reverse(&log);
        assert_eq!(result.restored, 0);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(fs::read(tmp.path().join("a.jpg")).unwrap(), b"new file");
        assert!(tmp.path().join("b.jpg").exists());
    }

    #[test]
    fn failures_do_not_stop_the_rest() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("y"), b"y").unwrap();

        let mut log = OperationLog::new(tmp.path());
        log.push(Operation::move_or_rename(tmp.path().join("x"), tmp.path().join("y")));
        log.push(Operation::move_or_rename(tmp.path().join("gone"), tmp.path().join("vanished")));

        let result = UndoEngine::new().reverse(&log);
        assert_eq!(result.restored, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].path, tmp.path().join("gone"));
        assert!(tmp.path().join("x").exists());
    }

    #[test]
    fn duplicate_is_restored_from_backup() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join(DEFAULT_BACKUP_DIR_NAME);
        let run_dir = base.join("run");
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("copy.txt"), b"same").unwrap();

        let mut log = OperationLog::new(tmp.path());
        log.backup_dir = Some(run_dir.clone());
        log.push(Operation::relocate_duplicate(tmp.path().join("copy.txt"), run_dir.join("copy.txt")));

        let result = UndoEngine::new().reverse(&log);
        assert_eq!(result.restored, 1);
        assert_eq!(fs::read(tmp.path().join("copy.txt")).unwrap(), b"same");
        assert!(!base.exists());
    }
}
