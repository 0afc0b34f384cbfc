// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Owns the undo stack and serializes execute/undo

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, TryLockError};
use tracing::{debug, info};

use crate::config::ExecutionConfig;
use crate::executor::{ExecutionEngine, ExecutionResult};
use crate::history::{LogSummary, OperationLog};
use crate::plan::OrganizePlan;
use crate::undo::{UndoEngine, UndoResult};
use crate::{OrdoError, Result};

/// One per session. Only one execute or undo runs at a time; a second
/// caller fails fast with [`OrdoError::RunInProgress`].
pub struct RunCoordinator {
    engine: ExecutionEngine,
    undo: UndoEngine,
    logs: Mutex<VecDeque<OperationLog>>,
    run_lock: Mutex<()>,
    limit: usize,
}

impl RunCoordinator {
    pub fn new(engine: ExecutionEngine, history_limit: usize) -> Self {
        Self {
            engine,
            undo: UndoEngine::new(),
            logs: Mutex::new(VecDeque::new()),
            run_lock: Mutex::new(()),
            limit: history_limit.max(1),
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(ExecutionEngine::new(config.clone()), config.history_limit)
    }

    fn begin_run(&self) -> Result<MutexGuard<'_, ()>> {
        match self.run_lock.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(OrdoError::RunInProgress),
        }
    }

    fn logs(&self) -> MutexGuard<'_, VecDeque<OperationLog>> {
        self.logs.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Apply a plan and push its log. The stack is untouched on error.
    pub fn execute(&self, plan: &OrganizePlan) -> Result<ExecutionResult> {
        let _run = self.begin_run()?;
        let (log, result) = self.engine.apply(plan)?;
        self.push_log(log);
        Ok(result)
    }

    /// Reverse the most recent log, or the one with `log_id`
    pub fn undo(&self, log_id: Option<&str>) -> Result<UndoResult> {
        let _run = self.begin_run()?;
        let log = {
            let mut logs = self.logs();
            match log_id {
                Some(id) => {
                    let pos = logs
                        .iter()
                        .position(|l| l.id == id)
                        .ok_or_else(|| OrdoError::UnknownLog(id.to_string()))?;
                    logs.remove(pos)
                }
                None => logs.pop_back(),
            }
        }
        .ok_or(OrdoError::NothingToUndo)?;

        info!("Undoing run {} ({} operations)", log.id, log.len());
        Ok(self.undo.reverse(&log))
    }

    /// Add a log to the top of the stack, dropping the oldest beyond the limit
    pub fn push_log(&self, log: OperationLog) {
        let mut logs = self.logs();
        logs.push_back(log);
        while logs.len() > self.limit {
            if let Some(dropped) = logs.pop_front() {
                debug!("Dropped oldest operation log {}", dropped.id);
            }
        }
    }

    pub fn log(&self, log_id: &str) -> Option<OperationLog> {
        self.logs().iter().find(|l| l.id == log_id).cloned()
    }

    /// Newest first
    pub fn history(&self) -> Vec<LogSummary> {
        self.logs().iter().rev().map(OperationLog::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.logs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Operation;
    use std::path::Path;
    use tempfile::TempDir;

    fn coordinator(limit: usize) -> RunCoordinator {
        RunCoordinator::new(ExecutionEngine::new(Default::default()), limit)
    }

    fn empty_log() -> OperationLog {
        OperationLog::new(Path::new("/inbox"))
    }

    #[test]
    fn nothing_to_undo_on_empty_stack() {
        let c = coordinator(4);
        assert!(matches!(c.undo(None), Err(OrdoError::NothingToUndo)));
        assert!(matches!(c.undo(Some("nope")), Err(OrdoError::UnknownLog(_))));
    }

    #[test]
    fn stack_is_lifo_and_bounded() {
        let c = coordinator(2);
        let logs: Vec<_> = (0..3).map(|_| empty_log()).collect();
        for log in &logs {
            c.push_log(log.clone());
        }
        assert_eq!(c.len(), 2);
        let ids: Vec<_> = c.history().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![logs[2].id.clone(), logs[1].id.clone()]);

        assert_eq!(c.undo(None).unwrap().log_id, logs[2].id);
        assert_eq!(c.undo(None).unwrap().log_id, logs[1].id);
        assert!(c.is_empty());
    }

    #[test]
    fn undo_a_specific_log() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b"), b"x").unwrap();
        let mut target = OperationLog::new(tmp.path());
        target.push(Operation::move_or_rename(tmp.path().join("a"), tmp.path().join("b")));

        let c = coordinator(8);
        c.push_log(target.clone());
        c.push_log(empty_log());

        let result = c.undo(Some(&target.id)).unwrap();
        assert_eq!(result.restored, 1);
        assert!(tmp.path().join("a").exists());
        assert_eq!(c.len(), 1);
        assert!(c.log(&target.id).is_none());
    }

    #[test]
    fn concurrent_run_is_rejected_without_touching_the_stack() {
        let tmp = TempDir::new().unwrap();
        let c = coordinator(4);
        c.push_log(empty_log());
        let plan = OrganizePlan {
            id: "p".to_string(),
            root: tmp.path().to_path_buf(),
            created_at: chrono::Utc::now(),
            folder_threshold: 3,
            files: Vec::new(),
            duplicates: Vec::new(),
            stats: Default::default(),
            categories_needing_folders: Default::default(),
        };

        let held = c.begin_run().unwrap();
        assert!(matches!(c.execute(&plan), Err(OrdoError::RunInProgress)));
        assert!(matches!(c.undo(None), Err(OrdoError::RunInProgress)));
        assert_eq!(c.len(), 1);
        drop(held);

        let result = c.execute(&plan).unwrap();
        assert_eq!(c.len(), 2);
        assert!(c.log(&result.log_id).unwrap().is_empty());
    }
}
