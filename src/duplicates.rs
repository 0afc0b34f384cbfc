// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Exact-duplicate grouping by size, then content hash

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::hash::HashService;
use crate::scanner::ScannedEntry;
use crate::{OrdoError, Result};

/// Input to duplicate detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCandidate {
    pub path: PathBuf,
    pub size: u64,
    pub name: String,
}

impl From<&ScannedEntry> for DuplicateCandidate {
    fn from(entry: &ScannedEntry) -> Self {
        Self {
            path: entry.path.clone(),
            size: entry.size,
            name: entry.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMember {
    pub path: PathBuf,
    pub name: String,
    /// Confirmed for removal by the user; never set on the keeper
    #[serde(default)]
    pub remove: bool,
}

/// Two or more content-identical files, exactly one of which is kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub size: u64,
    pub members: Vec<DuplicateMember>,
    pub keep_index: usize,
}

impl DuplicateGroup {
    pub fn keeper(&self) -> &DuplicateMember {
        &self.members[self.keep_index]
    }

    /// Make another member the keeper. The new keeper loses any removal mark.
    pub fn set_keeper(&mut self, index: usize) -> Result<()> {
        let member = self.members.get_mut(index).ok_or_else(|| {
            OrdoError::Plan(format!("keeper index {} out of range for group {}", index, self.hash))
        })?;
        member.remove = false;
        self.keep_index = index;
        Ok(())
    }

    /// Confirm or withdraw removal of a non-keeper member
    pub fn mark_for_removal(&mut self, index: usize, remove: bool) -> Result<()> {
        if index == self.keep_index && remove {
            return Err(OrdoError::Plan("the keeper of a duplicate group cannot be removed".to_string()));
        }
        let member = self.members.get_mut(index).ok_or_else(|| {
            OrdoError::Plan(format!("member index {} out of range for group {}", index, self.hash))
        })?;
        member.remove = remove;
        Ok(())
    }

    pub fn mark_all_for_removal(&mut self) {
        let keep = self.keep_index;
        for (i, member) in self.members.iter_mut().enumerate() {
            member.remove = i != keep;
        }
    }

    /// Members confirmed for removal, keeper excluded
    pub fn removal_targets(&self) -> impl Iterator<Item = &DuplicateMember> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(move |(i, m)| *i != self.keep_index && m.remove)
            .map(|(_, m)| m)
    }

    /// Reject groups an edited plan file could have broken
    pub fn validate(&self) -> Result<()> {
        if self.members.len() < 2 {
            return Err(OrdoError::Plan(format!(
                "duplicate group {} needs at least two members",
                self.hash
            )));
        }
        match self.members.get(self.keep_index) {
            None => Err(OrdoError::Plan(format!(
                "keeper index {} out of range for group {}",
                self.keep_index, self.hash
            ))),
            Some(keeper) if keeper.remove => Err(OrdoError::Plan(format!(
                "keeper of group {} is marked for removal",
                self.hash
            ))),
            Some(_) => Ok(()),
        }
    }
}

/// Groups candidates into exact-duplicate sets
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    hasher: HashService,
}

impl DuplicateDetector {
    pub fn new(hasher: HashService) -> Self {
        Self { hasher }
    }

    /// Detect duplicate groups.
    ///
    /// Only same-size files are hashed; empty files are never duplicates and
    /// unreadable files drop out of their group. Groups are ordered by the
    /// input position of their first member, which is also the keeper.
    pub fn detect(&self, candidates: &[DuplicateCandidate]) -> Vec<DuplicateGroup> {
        let mut by_size: HashMap<u64, Vec<usize>> = HashMap::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            if candidate.size > 0 {
                by_size.entry(candidate.size).or_default().push(idx);
            }
        }

        let mut to_hash: Vec<usize> = by_size
            .into_values()
            .filter(|indices| indices.len() > 1)
            .flatten()
            .collect();
        to_hash.sort_unstable();
        debug!("Hashing {} of {} duplicate candidates", to_hash.len(), candidates.len());

        let hashed: Vec<(usize, Option<String>)> = to_hash
            .par_iter()
            .map(|&idx| {
                let candidate = &candidates[idx];
                match self.hasher.hash_file(&candidate.path) {
                    Ok(hash) => (idx, Some(hash)),
                    Err(e) => {
                        warn!("Excluding from duplicate check: {}", e);
                        (idx, None)
                    }
                }
            })
            .collect();

        let mut buckets: HashMap<(u64, String), Vec<usize>> = HashMap::new();
        for (idx, hash) in hashed {
            if let Some(hash) = hash {
                buckets.entry((candidates[idx].size, hash)).or_default().push(idx);
            }
        }

        let mut groups: Vec<(usize, DuplicateGroup)> = buckets
            .into_iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|((size, hash), indices)| {
                let members = indices
                    .iter()
                    .map(|&i| DuplicateMember {
                        path: candidates[i].path.clone(),
                        name: candidates[i].name.clone(),
                        remove: false,
                    })
                    .collect();
                (indices[0], DuplicateGroup { hash, size, members, keep_index: 0 })
            })
            .collect();
        groups.sort_by_key(|(first, _)| *first);

        info!("Found {} duplicate groups", groups.len());
        groups.into_iter().map(|(_, group)| group).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn candidate(dir: &Path, name: &str, content: &[u8]) -> DuplicateCandidate {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        DuplicateCandidate {
            path,
            size: content.len() as u64,
            name: name.to_string(),
        }
    }

    #[test]
    fn same_size_different_content_is_not_grouped() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![
            candidate(dir.path(), "a.txt", b"same bytes"),
            candidate(dir.path(), "b.txt", b"same bytes"),
            candidate(dir.path(), "c.txt", b"diff bytes"),
        ];

        let groups = DuplicateDetector::default().detect(&candidates);
        assert_eq!(groups.len(), 1);
        let names: Vec<_> = groups[0].members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(groups[0].keeper().name, "a.txt");
        assert_eq!(groups[0].size, 10);
    }

    #[test]
    fn empty_files_are_never_duplicates() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![
            candidate(dir.path(), "empty1", b""),
            candidate(dir.path(), "empty2", b""),
        ];
        assert!(DuplicateDetector::default().detect(&candidates).is_empty());
    }

    #[test]
    fn unreadable_file_drops_out_without_failing() {
        let dir = TempDir::new().unwrap();
        let mut candidates = vec![
            candidate(dir.path(), "a", b"xyz"),
            candidate(dir.path(), "b", b"xyz"),
            candidate(dir.path(), "c", b"xyz"),
        ];
        candidates[1].path = dir.path().join("vanished");

        let groups = DuplicateDetector::default().detect(&candidates);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[0].keeper().name, "a");
    }

    #[test]
    fn groups_follow_input_order() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![
            candidate(dir.path(), "x1", b"first group"),
            candidate(dir.path(), "y1", b"2nd"),
            candidate(dir.path(), "y2", b"2nd"),
            candidate(dir.path(), "x2", b"first group"),
        ];

        let groups = DuplicateDetector::new(HashService::new(3)).detect(&candidates);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].keeper().name, "x1");
        assert_eq!(groups[1].keeper().name, "y1");
    }

    #[test]
    fn keeper_is_never_a_removal_target() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![
            candidate(dir.path(), "a", b"dup"),
            candidate(dir.path(), "b", b"dup"),
            candidate(dir.path(), "c", b"dup"),
        ];
        let mut group = DuplicateDetector::default().detect(&candidates).remove(0);

        group.mark_all_for_removal();
        let targets: Vec<_> = group.removal_targets().map(|m| m.name.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);

        group.set_keeper(2).unwrap();
        assert!(!group.keeper().remove);
        let targets: Vec<_> = group.removal_targets().map(|m| m.name.as_str()).collect();
        assert_eq!(targets, vec!["b"]);

        assert!(group.mark_for_removal(2, true).is_err());
        assert!(group.set_keeper(9).is_err());
    }

    #[test]
    fn broken_groups_fail_validation() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![
            candidate(dir.path(), "a", b"dup"),
            candidate(dir.path(), "b", b"dup"),
        ];
        let group = DuplicateDetector::default().detect(&candidates).remove(0);
        assert!(group.validate().is_ok());

        let mut out_of_range = group.clone();
        out_of_range.keep_index = 7;
        assert!(out_of_range.validate().is_err());

        let mut doomed_keeper = group.clone();
        doomed_keeper.members[0].remove = true;
        assert!(doomed_keeper.validate().is_err());

        let mut lonely = group;
        lonely.members.truncate(1);
        assert!(lonely.validate().is_err());
    }
}
