// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Operation logs recorded during execution, the sole input to undo

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    CreateDirectory,
    MoveOrRename,
    RelocateDuplicate,
}

/// A single applied filesystem action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub source: PathBuf,
    /// Absent for directory creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Copy of the original bytes, for relocated duplicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

impl Operation {
    pub fn create_directory(path: PathBuf) -> Self {
        Self {
            kind: OperationKind::CreateDirectory,
            source: path,
            destination: None,
            backup: None,
        }
    }

    pub fn move_or_rename(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            kind: OperationKind::MoveOrRename,
            source,
            destination: Some(destination),
            backup: None,
        }
    }

    pub fn relocate_duplicate(source: PathBuf, backup: PathBuf) -> Self {
        Self {
            kind: OperationKind::RelocateDuplicate,
            source,
            destination: None,
            backup: Some(backup),
        }
    }
}

/// Operations of one run, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    pub id: String,
    pub root: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Per-run backup area, if one was created
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    pub operations: Vec<Operation>,
}

impl OperationLog {
    pub fn new(root: &Path) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            root: root.to_path_buf(),
            created_at: Utc::now(),
            backup_dir: None,
            operations: Vec::new(),
        }
    }

    pub fn push(&mut self, operation: Operation) {
        tracing::trace!("Recorded {:?}", operation);
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }

    pub fn summary(&self) -> LogSummary {
        LogSummary {
            id: self.id.clone(),
            root: self.root.clone(),
            created_at: self.created_at,
            operations: self.len(),
        }
    }

    /// Export as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Listing entry for the undo stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub id: String,
    pub root: PathBuf,
    pub created_at: DateTime<Utc>,
    pub operations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_keeps_execution_order() {
        let mut log = OperationLog::new(Path::new("/inbox"));
        log.push(Operation::create_directory("/inbox/Image".into()));
        log.push(Operation::move_or_rename("/inbox/a.jpg".into(), "/inbox/Image/a.jpg".into()));
        log.push(Operation::relocate_duplicate("/inbox/b.jpg".into(), "/bk/b.jpg".into()));

        let kinds: Vec<_> = log.operations.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::CreateDirectory,
                OperationKind::MoveOrRename,
                OperationKind::RelocateDuplicate
            ]
        );
        assert_eq!(log.count(OperationKind::MoveOrRename), 1);
        assert_eq!(log.summary().operations, 3);
    }

    #[test]
    fn export_uses_string_labels() {
        let tmp = TempDir::new().unwrap();
        let mut log = OperationLog::new(tmp.path());
        log.push(Operation::create_directory(tmp.path().join("Image")));
        let path = tmp.path().join("log.json");
        log.save(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"create-directory\""));
        assert!(!json.contains("\"destination\""));
        assert_eq!(OperationLog::load(&path).unwrap(), log);
    }

    #[test]
    fn load_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(OperationLog::load(&path).is_err());
    }
}
