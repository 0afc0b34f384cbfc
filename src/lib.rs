// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ordo: reversible folder organizer
//!
//! Scans one directory, classifies every entry, proposes renames for
//! meaningless names, groups exact duplicates and turns all of it into an
//! editable plan. Applying a plan records an operation log that undo replays
//! backwards.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//! use std::sync::Arc;
//! use ordo::{scanner, AppConfig, PlanBuilder, RunCoordinator, SystemClock};
//!
//! # fn main() -> ordo::Result<()> {
//! let config = AppConfig::default();
//! let root = Path::new("/home/me/Downloads");
//! let entries = scanner::scan(root, &config.scan)?;
//! let plan = PlanBuilder::from_config(&config, Arc::new(SystemClock))
//!     .build(root, &entries, &HashMap::new());
//!
//! let coordinator = RunCoordinator::from_config(&config.execution);
//! coordinator.execute(&plan)?;
//! coordinator.undo(None)?;
//! # Ok(())
//! # }
//! ```

pub mod category;
pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod duplicates;
pub mod error;
pub mod executor;
pub mod hash;
pub mod history;
pub mod ollama;
pub mod oracle;
pub mod plan;
pub mod rename;
pub mod scanner;
pub mod undo;

pub use category::Category;
pub use classifier::classify;
pub use config::AppConfig;
pub use coordinator::RunCoordinator;
pub use duplicates::{DuplicateDetector, DuplicateGroup};
pub use error::{OrdoError, Result};
pub use executor::{ExecutionEngine, ExecutionResult};
pub use history::{Operation, OperationKind, OperationLog};
pub use plan::{OrganizePlan, PlanBuilder, PlannedFile};
pub use rename::{Clock, FixedClock, RenameAdvisor, SystemClock};
pub use scanner::ScannedEntry;
pub use undo::{UndoEngine, UndoResult};
