// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Optional external classification for names the rules leave as `Other`
//!
//! An oracle only ever improves classification. Absent, slow, failing or
//! nonsensical oracles all degrade to the rule-based result.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::classifier::classify;
use crate::config::{OracleConfig, OracleKind};
use crate::ollama::OllamaOracle;
use crate::scanner::ScannedEntry;
use crate::{OrdoError, Result};

/// Classifies a small batch of file names, or fails
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    fn name(&self) -> &'static str;

    /// Map of name to category; names may be missing from the answer
    async fn classify_batch(&self, names: &[String]) -> Result<HashMap<String, Category>>;
}

/// Oracle that never knows anything
pub struct NoopOracle;

#[async_trait]
impl ClassificationOracle for NoopOracle {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn classify_batch(&self, _names: &[String]) -> Result<HashMap<String, Category>> {
        Ok(HashMap::new())
    }
}

/// Runs an external program with the prompt on stdin and reads JSON from stdout
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl ClassificationOracle for CommandOracle {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn classify_batch(&self, names: &[String]) -> Result<HashMap<String, Category>> {
        let spawn_err = |e: std::io::Error| OrdoError::Oracle(format!("{}: {}", self.program, e));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(build_prompt(names).as_bytes()).await.map_err(spawn_err)?;
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        if !output.status.success() {
            return Err(OrdoError::Oracle(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_oracle_response(&String::from_utf8_lossy(&output.stdout), names)
    }
}

/// Pick the oracle selected in the configuration
pub fn build_oracle(config: &OracleConfig) -> Result<Box<dyn ClassificationOracle>> {
    Ok(match config.kind {
        OracleKind::None => Box::new(NoopOracle),
        OracleKind::Command => {
            let program = config
                .command
                .clone()
                .ok_or_else(|| OrdoError::Config("oracle.command is unset".to_string()))?;
            Box::new(CommandOracle::new(program, config.args.clone()))
        }
        OracleKind::Ollama => Box::new(OllamaOracle::new(&config.url, &config.model)?),
    })
}

/// Prompt asking for a JSON object mapping each name to one category label
pub fn build_prompt(names: &[String]) -> String {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let mut prompt = format!(
        "Classify each file name into exactly one of these categories: {}.\n\
         Reply with only a JSON object mapping every file name to its category.\n\
         File names:\n",
        labels.join(", ")
    );
    for name in names {
        prompt.push_str("- ");
        prompt.push_str(name);
        prompt.push('\n');
    }
    prompt
}

/// Extract `{name: category}` answers from free-form oracle output.
///
/// Accepts a JSON object or an array of `{"name", "category"}` objects, also
/// when surrounded by prose or a code fence. Names outside `names` and
/// unknown labels are dropped.
pub fn parse_oracle_response(text: &str, names: &[String]) -> Result<HashMap<String, Category>> {
    let value = extract_json(text)
        .ok_or_else(|| OrdoError::Oracle("response contains no JSON".to_string()))?;

    let pairs: Vec<(String, String)> = match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(name, v)| v.as_str().map(|c| (name, c.to_string())))
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?;
                let category = item.get("category")?.as_str()?;
                Some((name.to_string(), category.to_string()))
            })
            .collect(),
        other => {
            return Err(OrdoError::Oracle(format!("unexpected JSON: {}", other)));
        }
    };

    Ok(pairs
        .into_iter()
        .filter(|(name, _)| names.contains(name))
        .filter_map(|(name, label)| Category::from_str(label.trim()).ok().map(|c| (name, c)))
        .collect())
}

/// Largest `{...}` or `[...]` span that parses
fn extract_json(text: &str) -> Option<Value> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Ask `oracle` about regular files the rules classify as `Other`.
///
/// At most `batch_size` names are sent. Any failure or timeout yields an
/// empty map; `Other` answers are ignored.
pub async fn consult_oracle(
    oracle: &dyn ClassificationOracle,
    entries: &[ScannedEntry],
    config: &OracleConfig,
) -> HashMap<PathBuf, Category> {
    let candidates: Vec<&ScannedEntry> = entries
        .iter()
        .filter(|e| !e.is_directory && !e.is_symlink)
        .filter(|e| classify(&e.name, false, false) == Category::Other)
        .take(config.batch_size)
        .collect();
    if candidates.is_empty() {
        return HashMap::new();
    }

    let names: Vec<String> = candidates.iter().map(|e| e.name.clone()).collect();
    debug!("Asking {} oracle about {} names", oracle.name(), names.len());

    let limit = Duration::from_secs(config.timeout_secs);
    let answers = match tokio::time::timeout(limit, oracle.classify_batch(&names)).await {
        Ok(Ok(answers)) => answers,
        Ok(Err(e)) => {
            warn!("Ignoring {} oracle: {}", oracle.name(), e);
            return HashMap::new();
        }
        Err(_) => {
            warn!("Ignoring {} oracle: {}", oracle.name(), OrdoError::OracleTimeout(config.timeout_secs));
            return HashMap::new();
        }
    };

    let merged: HashMap<PathBuf, Category> = candidates
        .into_iter()
        .filter_map(|entry| match answers.get(&entry.name) {
            Some(&category) if category != Category::Other => Some((entry.path.clone(), category)),
            _ => None,
        })
        .collect();
    info!("{} oracle classified {} of {} names", oracle.name(), merged.len(), names.len());
    merged
}
