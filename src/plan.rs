// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Organize plans: what would be moved, renamed and deduplicated

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::category::Category;
use crate::classifier::classify;
use crate::config::AppConfig;
use crate::duplicates::{DuplicateCandidate, DuplicateDetector, DuplicateGroup, DuplicateMember};
use crate::executor::unique_target;
use crate::hash::HashService;
use crate::rename::{Clock, RenameAdvisor};
use crate::scanner::ScannedEntry;
use crate::{OrdoError, Result};

/// A scanned entry plus everything decided about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    #[serde(flatten)]
    pub entry: ScannedEntry,
    pub category: Category,
    pub needs_rename: bool,
    pub needs_move: bool,
    pub suggested_name: String,
    pub selected: bool,
    pub is_shortcut: bool,
}

impl PlannedFile {
    /// Name the file will carry after execution
    pub fn final_name(&self) -> &str {
        if self.needs_rename {
            &self.suggested_name
        } else {
            &self.entry.name
        }
    }

    pub fn has_action(&self) -> bool {
        self.needs_move || self.needs_rename
    }

    /// Directories, symlinks and shortcuts stay exactly where they are
    pub fn is_fixed(&self) -> bool {
        self.entry.is_directory || self.entry.is_symlink || self.is_shortcut
    }

    /// Where the file should end up, before conflict resolution
    pub fn target_path(&self, root: &Path) -> Option<PathBuf> {
        if self.needs_move {
            Some(root.join(self.category.folder_name()).join(self.final_name()))
        } else if self.needs_rename {
            let parent = self.entry.path.parent().unwrap_or(root);
            Some(parent.join(self.final_name()))
        } else {
            None
        }
    }
}

/// One step `execute` would attempt, for previews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    CreateDirectory { path: PathBuf },
    Move { from: PathBuf, to: PathBuf },
    Rename { from: PathBuf, to: PathBuf },
    RemoveDuplicate { path: PathBuf },
}

/// The aggregate produced by one scan and edited by the user before execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizePlan {
    pub id: String,
    pub root: PathBuf,
    pub created_at: DateTime<Utc>,
    pub folder_threshold: usize,
    pub files: Vec<PlannedFile>,
    pub duplicates: Vec<DuplicateGroup>,
    pub stats: BTreeMap<Category, usize>,
    pub categories_needing_folders: BTreeSet<Category>,
}

impl OrganizePlan {
    pub fn file(&self, path: &Path) -> Option<&PlannedFile> {
        self.files.iter().find(|f| f.entry.path == path)
    }

    fn file_mut(&mut self, path: &Path) -> Result<&mut PlannedFile> {
        self.files
            .iter_mut()
            .find(|f| f.entry.path == path)
            .ok_or_else(|| OrdoError::Plan(format!("no planned file at {:?}", path)))
    }

    fn group_mut(&mut self, group: usize) -> Result<&mut DuplicateGroup> {
        self.duplicates
            .get_mut(group)
            .ok_or_else(|| OrdoError::Plan(format!("no duplicate group {}", group)))
    }

    pub fn set_selected(&mut self, path: &Path, selected: bool) -> Result<()> {
        self.file_mut(path)?.selected = selected;
        Ok(())
    }

    /// Replace the proposed name; the file needs a rename iff the name changes
    pub fn set_suggested_name(&mut self, path: &Path, name: &str) -> Result<()> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(OrdoError::Plan(format!("invalid file name: {:?}", name)));
        }

        let file = self.file_mut(path)?;
        if file.entry.is_directory || file.is_shortcut {
            return Err(OrdoError::Plan(format!(
                "directories and shortcuts are never renamed: {:?}",
                path
            )));
        }
        file.suggested_name = name.to_string();
        file.needs_rename = name != file.entry.name;
        Ok(())
    }

    /// Reassign a category and re-decide which categories get folders.
    ///
    /// The suggested name is kept as is; [`PlanBuilder::recategorize`] also
    /// re-derives it for the new category.
    pub fn set_category(&mut self, path: &Path, category: Category) -> Result<()> {
        let file = self.file_mut(path)?;
        if file.entry.is_symlink && category != Category::Shortcut {
            return Err(OrdoError::Plan(format!("symlinks stay shortcuts: {:?}", path)));
        }
        file.category = category;
        file.is_shortcut = category == Category::Shortcut;
        if file.is_shortcut {
            file.needs_rename = false;
            file.suggested_name = file.entry.name.clone();
        }
        self.apply_move_threshold();
        Ok(())
    }

    pub fn set_keeper(&mut self, group: usize, index: usize) -> Result<()> {
        self.group_mut(group)?.set_keeper(index)
    }

    pub fn mark_for_removal(&mut self, group: usize, index: usize, remove: bool) -> Result<()> {
        self.group_mut(group)?.mark_for_removal(index, remove)
    }

    pub fn mark_all_duplicates_for_removal(&mut self) {
        for group in &mut self.duplicates {
            group.mark_all_for_removal();
        }
    }

    /// Non-keeper duplicates the user confirmed for removal
    pub fn removal_targets(&self) -> Vec<&DuplicateMember> {
        self.duplicates.iter().flat_map(|g| g.removal_targets()).collect()
    }

    /// Recount categories and set `needs_move` from the folder threshold
    pub fn apply_move_threshold(&mut self) {
        let folders = decide_folders(
            self.files.iter().map(|f| (&f.entry, f.category)),
            self.folder_threshold,
        );
        for file in &mut self.files {
            file.needs_move = is_movable(&file.entry, file.category) && folders.contains(&file.category);
        }
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        self.stats = BTreeMap::new();
        for file in &self.files {
            *self.stats.entry(file.category).or_insert(0) += 1;
        }
        self.categories_needing_folders = self
            .files
            .iter()
            .filter(|f| f.needs_move)
            .map(|f| f.category)
            .collect();
    }

    /// Selected files that will be moved or renamed. Fixed entries and
    /// duplicates marked for removal are left out.
    pub fn movers(&self) -> impl Iterator<Item = &PlannedFile> + '_ {
        let removals: HashSet<&Path> = self
            .duplicates
            .iter()
            .flat_map(|g| g.removal_targets())
            .map(|m| m.path.as_path())
            .collect();
        self.files
            .iter()
            .filter(|f| f.selected && f.has_action() && !f.is_fixed())
            .filter(move |f| !removals.contains(f.entry.path.as_path()))
    }

    /// Category folders that will receive at least one file
    pub fn folders_to_create(&self) -> BTreeSet<Category> {
        self.movers()
            .filter(|f| f.needs_move)
            .map(|f| f.category)
            .filter(|c| self.categories_needing_folders.contains(c))
            .collect()
    }

    /// Steps `execute` would attempt right now, with target conflicts resolved
    /// against the current disk state
    pub fn pending_actions(&self) -> Vec<PendingAction> {
        let mut actions = Vec::new();
        for category in self.folders_to_create() {
            let path = self.root.join(category.folder_name());
            if !path.is_dir() {
                actions.push(PendingAction::CreateDirectory { path });
            }
        }

        let mut claimed = HashSet::new();
        for file in self.movers() {
            let Some(target) = file.target_path(&self.root) else { continue };
            if target == file.entry.path {
                continue;
            }
            let to = unique_target(&target, &claimed);
            claimed.insert(to.clone());
            let from = file.entry.path.clone();
            actions.push(if file.needs_move {
                PendingAction::Move { from, to }
            } else {
                PendingAction::Rename { from, to }
            });
        }

        for member in self.removal_targets() {
            actions.push(PendingAction::RemoveDuplicate { path: member.path.clone() });
        }
        actions
    }

    /// Export as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Import a previously exported plan, rejecting edits that break it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let plan: Self = serde_json::from_str(&content)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Check the invariants a hand-edited plan could violate
    pub fn validate(&self) -> Result<()> {
        for group in &self.duplicates {
            group.validate()?;
        }

        for file in &self.files {
            let path = &file.entry.path;
            if file.is_shortcut != (file.category == Category::Shortcut) {
                return Err(OrdoError::Plan(format!(
                    "{:?}: shortcut flag disagrees with category {}",
                    path, file.category
                )));
            }
            if file.entry.is_symlink && !file.is_shortcut {
                return Err(OrdoError::Plan(format!("{:?}: symlinks stay shortcuts", path)));
            }
            if file.is_fixed() && file.has_action() {
                return Err(OrdoError::Plan(format!(
                    "{:?}: directories and shortcuts are never moved or renamed",
                    path
                )));
            }
            if file.needs_move && !is_movable(&file.entry, file.category) {
                return Err(OrdoError::Plan(format!(
                    "{:?}: category {} never gets a folder",
                    path, file.category
                )));
            }
            if file.needs_rename && !is_valid_name(&file.suggested_name) {
                return Err(OrdoError::Plan(format!(
                    "{:?}: invalid file name {:?}",
                    path, file.suggested_name
                )));
            }
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\', '\0'])
        && name != "."
        && name != ".."
}

fn is_movable(entry: &ScannedEntry, category: Category) -> bool {
    !entry.is_directory && !entry.is_symlink && category.is_movable()
}

/// Categories with at least `threshold` movable files
fn decide_folders<'a>(
    items: impl Iterator<Item = (&'a ScannedEntry, Category)>,
    threshold: usize,
) -> BTreeSet<Category> {
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for (entry, category) in items {
        if !entry.is_directory {
            *counts.entry(category).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(category, count)| category.is_movable() && *count >= threshold)
        .map(|(category, _)| category)
        .collect()
}

/// Composes classification, rename advice and duplicate detection into a plan
pub struct PlanBuilder {
    advisor: RenameAdvisor,
    detector: Option<DuplicateDetector>,
    folder_threshold: usize,
}

impl PlanBuilder {
    pub fn new(advisor: RenameAdvisor, detector: Option<DuplicateDetector>, folder_threshold: usize) -> Self {
        Self {
            advisor,
            detector,
            folder_threshold: folder_threshold.max(1),
        }
    }

    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let detector = config
            .duplicates
            .enabled
            .then(|| DuplicateDetector::new(HashService::new(config.duplicates.chunk_size)));
        Self::new(
            RenameAdvisor::new(&config.rules, clock),
            detector,
            config.rules.folder_threshold,
        )
    }

    /// Build a plan for `entries` found directly under `root`.
    ///
    /// `classifications` overrides the rule-based category of regular files
    /// (e.g. answers from a classification oracle).
    pub fn build(
        &self,
        root: &Path,
        entries: &[ScannedEntry],
        classifications: &HashMap<PathBuf, Category>,
    ) -> OrganizePlan {
        // Pass 1: categories and folder decision
        let categories: Vec<Category> = entries
            .iter()
            .map(|entry| {
                let rule_based = classify(&entry.name, entry.is_directory, entry.is_symlink);
                if entry.is_directory || entry.is_symlink {
                    return rule_based;
                }
                classifications.get(&entry.path).copied().unwrap_or(rule_based)
            })
            .collect();
        let folders = decide_folders(entries.iter().zip(categories.iter().copied()), self.folder_threshold);
        debug!("Categories receiving folders: {:?}", folders);

        // Pass 2: per-entry decisions
        let files: Vec<PlannedFile> = entries
            .iter()
            .zip(categories)
            .map(|(entry, category)| {
                let advice = self.advisor.advise(entry, category);
                PlannedFile {
                    entry: entry.clone(),
                    category,
                    needs_rename: advice.needs_rename,
                    needs_move: is_movable(entry, category) && folders.contains(&category),
                    suggested_name: advice.suggested_name,
                    selected: true,
                    is_shortcut: category == Category::Shortcut,
                }
            })
            .collect();

        let duplicates = match &self.detector {
            Some(detector) => {
                let candidates: Vec<DuplicateCandidate> = entries
                    .iter()
                    .filter(|e| !e.is_directory && !e.is_symlink)
                    .map(DuplicateCandidate::from)
                    .collect();
                detector.detect(&candidates)
            }
            None => Vec::new(),
        };

        let mut plan = OrganizePlan {
            id: uuid::Uuid::new_v4().to_string(),
            root: root.to_path_buf(),
            created_at: Utc::now(),
            folder_threshold: self.folder_threshold,
            files,
            duplicates,
            stats: BTreeMap::new(),
            categories_needing_folders: BTreeSet::new(),
        };
        plan.refresh_derived();

        info!(
            "Plan {}: {} entries, {} to move, {} to rename, {} duplicate groups",
            plan.id,
            plan.files.len(),
            plan.files.iter().filter(|f| f.needs_move).count(),
            plan.files.iter().filter(|f| f.needs_rename).count(),
            plan.duplicates.len()
        );
        plan
    }

    /// Reassign a category and re-derive the suggested name for it
    pub fn recategorize(&self, plan: &mut OrganizePlan, path: &Path, category: Category) -> Result<()> {
        plan.set_category(path, category)?;
        let file = plan.file_mut(path)?;
        if !file.is_fixed() {
            let advice = self.advisor.advise(&file.entry, category);
            file.needs_rename = advice.needs_rename;
            file.suggested_name = advice.suggested_name;
        }
        Ok(())
    }
}
