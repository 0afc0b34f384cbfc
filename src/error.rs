// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Ordo

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Ordo operations
pub type Result<T> = std::result::Result<T, OrdoError>;

/// Ordo error types
#[derive(Error, Debug)]
pub enum OrdoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Cannot scan {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot hash {path:?}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Classification oracle failed: {0}")]
    Oracle(String),

    #[error("Classification oracle timed out after {0}s")]
    OracleTimeout(u64),

    #[error("Plan error: {0}")]
    Plan(String),

    #[error("Cannot create backup area {path:?}: {source}")]
    BackupArea {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Another organize run is already active")]
    RunInProgress,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("No operation log with id {0}")]
    UnknownLog(String),
}

impl OrdoError {
    /// Whether the error was raised before any filesystem mutation of a run
    pub fn is_engine_fatal(&self) -> bool {
        matches!(self, Self::BackupArea { .. } | Self::RunInProgress)
    }
}
