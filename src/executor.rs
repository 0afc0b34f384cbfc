// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Applies an organize plan to disk and records what it did

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ExecutionConfig;
use crate::history::{Operation, OperationKind, OperationLog};
use crate::plan::OrganizePlan;
use crate::{OrdoError, Result};

/// One step that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub path: PathBuf,
    pub kind: OperationKind,
    pub message: String,
}

/// Counts reported after a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub log_id: String,
    pub dirs_created: usize,
    pub files_moved: usize,
    pub files_renamed: usize,
    pub duplicates_removed: usize,
    pub failures: Vec<StepFailure>,
}

impl ExecutionResult {
    fn fail(&mut self, path: &Path, kind: OperationKind, error: impl std::fmt::Display) {
        warn!("{:?} failed for {:?}: {}", kind, path, error);
        self.failures.push(StepFailure {
            path: path.to_path_buf(),
            kind,
            message: error.to_string(),
        });
    }
}

pub struct ExecutionEngine {
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Apply `plan`: create folders, move and rename selected files, then
    /// back up and remove confirmed duplicates.
    ///
    /// Only a missing backup area is fatal, and it is checked before anything
    /// in the organized folder changes. Every other failure is recorded in
    /// the result and the run continues.
    pub fn apply(&self, plan: &OrganizePlan) -> Result<(OperationLog, ExecutionResult)> {
        let mut log = OperationLog::new(&plan.root);
        let mut result = ExecutionResult {
            log_id: log.id.clone(),
            ..Default::default()
        };

        let removals = plan.removal_targets();
        let backup_dir = if removals.is_empty() {
            None
        } else {
            let dir = self.config.backup_base(&plan.root).join(&log.id);
            fs::create_dir_all(&dir).map_err(|source| OrdoError::BackupArea {
                path: dir.clone(),
                source,
            })?;
            debug!("Backup area ready at {:?}", dir);
            log.backup_dir = Some(dir.clone());
            Some(dir)
        };

        // Step 1: folders for categories that will receive at least one file
        for category in plan.folders_to_create() {
            let dir = plan.root.join(category.folder_name());
            if dir.is_dir() {
                debug!("Folder already present: {:?}", dir);
                continue;
            }
            match fs::create_dir(&dir) {
                Ok(()) => {
                    info!("Created folder {:?}", dir);
                    log.push(Operation::create_directory(dir));
                    result.dirs_created += 1;
                }
                Err(e) => result.fail(&dir, OperationKind::CreateDirectory, e),
            }
        }

        // Step 2: moves and renames, targets claimed before touching disk
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for file in plan.movers() {
            let source = &file.entry.path;
            let Some(target) = file.target_path(&plan.root) else { continue };
            if &target == source {
                continue;
            }
            let target = unique_target(&target, &claimed);
            claimed.insert(target.clone());

            match fs::rename(source, &target) {
                Ok(()) => {
                    info!("Moved {:?} -> {:?}", source, target);
                    log.push(Operation::move_or_rename(source.clone(), target));
                    if file.needs_move {
                        result.files_moved += 1;
                    } else {
                        result.files_renamed += 1;
                    }
                }
                Err(e) => result.fail(source, OperationKind::MoveOrRename, e),
            }
        }

        // Step 3: duplicates are copied aside first; removal is gated on the copy
        if let Some(backup_dir) = backup_dir {
            let mut backups: HashSet<PathBuf> = HashSet::new();
            for member in removals {
                let backup = unique_target(&backup_dir.join(&member.name), &backups);
                backups.insert(backup.clone());

                if let Err(e) = fs::copy(&member.path, &backup) {
                    result.fail(&member.path, OperationKind::RelocateDuplicate, e);
                    continue;
                }
                match fs::remove_file(&member.path) {
                    Ok(()) => {
                        info!("Relocated duplicate {:?} -> {:?}", member.path, backup);
                        log.push(Operation::relocate_duplicate(member.path.clone(), backup));
                        result.duplicates_removed += 1;
                    }
                    Err(e) => {
                        let _ = fs::remove_file(&backup);
                        result.fail(&member.path, OperationKind::RelocateDuplicate, e);
                    }
                }
            }
        }

        info!(
            "Run {} finished: {} folders, {} moved, {} renamed, {} duplicates removed, {} failures",
            log.id,
            result.dirs_created,
            result.files_moved,
            result.files_renamed,
            result.duplicates_removed,
            result.failures.len()
        );
        Ok((log, result))
    }
}

/// First free path among `target`, `stem_1.ext`, `stem_2.ext`, ...
///
/// A path is taken when it exists on disk or has been claimed by an earlier
/// step of the same run.
pub fn unique_target(target: &Path, claimed: &HashSet<PathBuf>) -> PathBuf {
    let taken = |p: &Path| claimed.contains(p) || p.symlink_metadata().is_ok();
    if !taken(target) {
        return target.to_path_buf();
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name.as_str(), ""),
    };

    (1u64..)
        .map(|n| parent.join(format!("{stem}_{n}{ext}")))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use crate::duplicates::DuplicateDetector;
    use crate::plan::PlanBuilder;
    use crate::rename::{FixedClock, RenameAdvisor};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn plan_for(root: &Path) -> OrganizePlan {
        let clock = Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        let builder = PlanBuilder::new(
            RenameAdvisor::new(&RuleConfig::default(), clock),
            Some(DuplicateDetector::default()),
            3,
        );
        let entries = crate::scanner::scan(root, &Default::default()).unwrap();
        builder.build(root, &entries, &HashMap::new())
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn unique_target_appends_counters_before_extension() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
        let mut claimed = HashSet::new();
        claimed.insert(tmp.path().join("a_1.jpg"));

        assert_eq!(unique_target(&tmp.path().join("a.jpg"), &claimed), tmp.path().join("a_2.jpg"));
        assert_eq!(unique_target(&tmp.path().join("b.jpg"), &claimed), tmp.path().join("b.jpg"));

        fs::write(tmp.path().join("README"), b"x").unwrap();
        assert_eq!(unique_target(&tmp.path().join("README"), &claimed), tmp.path().join("README_1"));
    }

    #[test]
    fn colliding_targets_never_overwrite() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("IMG_0001.jpg"), b"one").unwrap();
        fs::write(tmp.path().join("IMG_0002.jpg"), b"two").unwrap();
        let plan = plan_for(tmp.path());
        let target = plan.files[0].suggested_name.clone();
        assert_eq!(target, plan.files[1].suggested_name);

        let (log, result) = ExecutionEngine::new(Default::default()).apply(&plan).unwrap();
        assert_eq!(result.files_renamed, 2);
        assert!(result.failures.is_empty());
        assert_eq!(log.len(), 2);

        let stem = target.trim_end_matches(".jpg");
        assert_eq!(fs::read(tmp.path().join(&target)).unwrap(), b"one");
        assert_eq!(fs::read(tmp.path().join(format!("{stem}_1.jpg"))).unwrap(), b"two");
    }

    #[test]
    fn existing_folder_is_reused_and_not_logged() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("Image")).unwrap();
        for name in ["beach.jpg", "lake.jpg", "hill.jpg"] {
            fs::write(tmp.path().join(name), name).unwrap();
        }
        let plan = plan_for(tmp.path());

        let (log, result) = ExecutionEngine::new(Default::default()).apply(&plan).unwrap();
        assert_eq!(result.dirs_created, 0);
        assert_eq!(result.files_moved, 3);
        assert_eq!(log.count(OperationKind::CreateDirectory), 0);
        assert_eq!(names_in(&tmp.path().join("Image")), vec!["beach.jpg", "hill.jpg", "lake.jpg"]);
    }

    #[test]
    fn deselected_files_stay_put() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("IMG_0001.jpg"), b"x").unwrap();
        let mut plan = plan_for(tmp.path());
        plan.set_selected(&tmp.path().join("IMG_0001.jpg"), false).unwrap();

        let (log, result) = ExecutionEngine::new(Default::default()).apply(&plan).unwrap();
        assert!(log.is_empty());
        assert_eq!(result.files_renamed, 0);
        assert_eq!(names_in(tmp.path()), vec!["IMG_0001.jpg"]);
    }

    #[test]
    fn vanished_file_is_a_step_failure() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("IMG_0001.jpg"), b"x").unwrap();
        fs::write(tmp.path().join("untitled.txt"), b"y").unwrap();
        let plan = plan_for(tmp.path());
        fs::remove_file(tmp.path().join("IMG_0001.jpg")).unwrap();

        let (log, result) = ExecutionEngine::new(Default::default()).apply(&plan).unwrap();
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].kind, OperationKind::MoveOrRename);
        assert_eq!(result.files_renamed, 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn duplicates_are_backed_up_before_removal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), b"same").unwrap();
        fs::write(tmp.path().join("notes2.txt"), b"same").unwrap();
        let mut plan = plan_for(tmp.path());
        plan.mark_all_duplicates_for_removal();

        let (log, result) = ExecutionEngine::new(Default::default()).apply(&plan).unwrap();
        assert_eq!(result.duplicates_removed, 1);
        assert!(!tmp.path().join("notes2.txt").exists());
        assert!(tmp.path().join("notes.txt").exists());

        let op = &log.operations[0];
        assert_eq!(op.kind, OperationKind::RelocateDuplicate);
        let backup = op.backup.as_ref().unwrap();
        assert_eq!(fs::read(backup).unwrap(), b"same");
        assert!(backup.starts_with(tmp.path().join(crate::config::DEFAULT_BACKUP_DIR_NAME)));
    }

    #[test]
    fn unusable_backup_area_aborts_before_any_change() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blocker"), b"file, not a directory").unwrap();
        let inbox = tmp.path().join("inbox");
        fs::create_dir(&inbox).unwrap();
        fs::write(inbox.join("IMG_0001.jpg"), b"same").unwrap();
        fs::write(inbox.join("IMG_0002.jpg"), b"same").unwrap();
        let mut plan = plan_for(&inbox);
        plan.mark_all_duplicates_for_removal();

        let config = ExecutionConfig {
            backup_dir: Some(tmp.path().join("blocker").join("backups").to_string_lossy().into_owned()),
            ..Default::default()
        };
        let err = ExecutionEngine::new(config).apply(&plan).unwrap_err();
        assert!(matches!(err, OrdoError::BackupArea { .. }));
        assert!(err.is_engine_fatal());
        assert_eq!(names_in(&inbox), vec!["IMG_0001.jpg", "IMG_0002.jpg"]);
    }

    #[test]
    fn edited_plan_cannot_touch_directories_or_shortcuts() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("IMG_0001")).unwrap();
        fs::write(tmp.path().join("old.lnk"), b"link").unwrap();
        let mut plan = plan_for(tmp.path());
        for file in &mut plan.files {
            file.category = crate::category::Category::Image;
            file.needs_move = true;
            file.needs_rename = true;
            file.suggested_name = "taken.jpg".to_string();
        }
        plan.categories_needing_folders.insert(crate::category::Category::Image);
        assert!(plan.movers().next().is_none());

        let (log, result) = ExecutionEngine::new(Default::default()).apply(&plan).unwrap();
        assert!(log.is_empty());
        assert_eq!(result.dirs_created + result.files_moved + result.files_renamed, 0);
        assert_eq!(names_in(tmp.path()), vec!["IMG_0001", "old.lnk"]);
    }

    #[test]
    fn preview_and_run_agree_on_folders() {
        let tmp = TempDir::new().unwrap();
        for name in ["beach.jpg", "lake.jpg", "hill.jpg"] {
            fs::write(tmp.path().join(name), name).unwrap();
        }
        let mut plan = plan_for(tmp.path());
        for name in ["beach.jpg", "lake.jpg", "hill.jpg"] {
            plan.set_selected(&tmp.path().join(name), false).unwrap();
        }
        assert!(plan.categories_needing_folders.contains(&crate::category::Category::Image));
        assert!(plan.pending_actions().is_empty());

        let (_, result) = ExecutionEngine::new(Default::default()).apply(&plan).unwrap();
        assert_eq!(result.dirs_created, 0);
        assert!(!tmp.path().join("Image").exists());
    }
}
