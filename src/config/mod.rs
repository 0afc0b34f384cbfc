// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Ordo

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Naming and folder rules
    #[serde(default)]
    pub rules: RuleConfig,

    /// Directory listing policy
    #[serde(default)]
    pub scan: ScanConfig,

    /// Duplicate detection settings
    #[serde(default)]
    pub duplicates: DuplicateConfig,

    /// Execution and undo settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Optional classification oracle
    #[serde(default)]
    pub oracle: OracleConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleConfig {
    /// Minimum number of files before a category gets its own folder
    #[serde(default = "default_folder_threshold")]
    pub folder_threshold: usize,
    /// Maximum characters kept from a cleaned name stem
    #[serde(default = "default_name_max_chars")]
    pub name_max_chars: usize,
    /// Name inserted into document file names (falls back to the OS user)
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default = "default_screenshot_label")]
    pub screenshot_label: String,
    #[serde(default = "default_document_label")]
    pub document_label: String,
    #[serde(default = "default_generic_label")]
    pub generic_label: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ScanConfig {
    #[serde(default)]
    pub include_hidden: bool,
    /// Glob patterns matched against entry names
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DuplicateConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Read buffer size used while hashing
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExecutionConfig {
    /// Where removed duplicates are kept; defaults to `<root>/.ordo-backup`
    #[serde(default)]
    pub backup_dir: Option<String>,
    /// Number of operation logs kept for undo
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleKind {
    #[default]
    None,
    Command,
    Ollama,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OracleConfig {
    #[serde(default)]
    pub kind: OracleKind,
    /// Program spawned by the command oracle
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of names sent in one request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Name of the backup directory created inside the organized folder
pub const DEFAULT_BACKUP_DIR_NAME: &str = ".ordo-backup";

// Default value functions
fn default_folder_threshold() -> usize { 3 }
fn default_name_max_chars() -> usize { 30 }
fn default_screenshot_label() -> String { "screenshot".to_string() }
fn default_document_label() -> String { "document".to_string() }
fn default_generic_label() -> String { "file".to_string() }
fn default_true() -> bool { true }
fn default_chunk_size() -> usize { 64 * 1024 }
fn default_history_limit() -> usize { 32 }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_oracle_model() -> String { "llama3.2:3b".to_string() }
fn default_oracle_timeout() -> u64 { 30 }
fn default_batch_size() -> usize { 20 }

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            folder_threshold: default_folder_threshold(),
            name_max_chars: default_name_max_chars(),
            user_name: None,
            screenshot_label: default_screenshot_label(),
            document_label: default_document_label(),
            generic_label: default_generic_label(),
        }
    }
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            history_limit: default_history_limit(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            kind: OracleKind::None,
            command: None,
            args: Vec::new(),
            url: default_ollama_url(),
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl RuleConfig {
    /// User name for document file names: configured, then `USER`/`USERNAME`, then "user"
    pub fn resolved_user_name(&self) -> String {
        self.user_name
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "user".to_string())
    }
}

impl ExecutionConfig {
    /// Base directory for duplicate backups of a run rooted at `root`
    pub fn backup_base(&self, root: &Path) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => PathBuf::from(dir),
            None => root.join(DEFAULT_BACKUP_DIR_NAME),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::OrdoError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        use crate::OrdoError::Config;

        if self.rules.folder_threshold == 0 {
            return Err(Config("rules.folder_threshold must be at least 1".to_string()));
        }
        if self.duplicates.chunk_size == 0 {
            return Err(Config("duplicates.chunk_size must be at least 1".to_string()));
        }
        if self.oracle.batch_size == 0 {
            return Err(Config("oracle.batch_size must be at least 1".to_string()));
        }
        if self.oracle.kind == OracleKind::Command && self.oracle.command.is_none() {
            return Err(Config("oracle.kind is \"command\" but oracle.command is unset".to_string()));
        }
        for pattern in &self.scan.ignore_patterns {
            glob::Pattern::new(pattern)?;
        }
        Ok(())
    }
}
