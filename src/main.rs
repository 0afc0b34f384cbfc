// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ordo: reversible folder organizer

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use ordo::config::{AppConfig, OracleKind};
use ordo::ollama::OllamaClient;
use ordo::oracle::{build_oracle, consult_oracle};
use ordo::plan::PendingAction;
use ordo::{scanner, OperationLog, OrdoError, OrganizePlan, PlanBuilder, Result, RunCoordinator, SystemClock};

/// Ordo CLI - classify, rename, deduplicate and undo
#[derive(Parser, Debug)]
#[command(name = "ordo")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Reversible folder organizer", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "ordo.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a folder and show what organizing it would do
    Plan {
        /// Folder to organize
        dir: PathBuf,

        /// Export the plan as JSON for editing
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ask the configured classification oracle about unknown files
        #[arg(long)]
        oracle: bool,
    },

    /// Organize a folder
    Apply {
        /// Folder to organize
        dir: PathBuf,

        /// Use an exported (possibly edited) plan instead of scanning
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Remove every non-keeper duplicate (a backup copy is kept)
        #[arg(long)]
        remove_duplicates: bool,

        /// Show the steps without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Ask the configured classification oracle about unknown files
        #[arg(long)]
        oracle: bool,

        /// Where to write the operation log needed by `undo`
        #[arg(short, long, default_value = "ordo-log.json")]
        log: PathBuf,
    },

    /// Reverse a run from its operation log
    Undo {
        /// Operation log written by `apply`
        #[arg(short, long, default_value = "ordo-log.json")]
        log: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "ordo.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Plan { dir, output, oracle } => {
            let plan = build_plan(&config, &dir, oracle).await?;
            if let Some(output) = output {
                plan.save(&output)?;
                info!("Plan exported to {:?}", output);
            }
            print_plan(&plan, json)
        }
        Commands::Apply { dir, plan, remove_duplicates, dry_run, oracle, log } => {
            run_apply(&config, &dir, plan, remove_duplicates, dry_run, oracle, &log, json).await
        }
        Commands::Undo { log } => run_undo(&config, &log, json),
        Commands::Config { action } => run_config_command(config, action, &cli.config).await,
    }
}

async fn build_plan(config: &AppConfig, dir: &Path, use_oracle: bool) -> Result<OrganizePlan> {
    let root = dir.canonicalize().map_err(|source| OrdoError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;
    let entries = scanner::scan(&root, &config.scan)?;

    let classifications = if use_oracle {
        let oracle = build_oracle(&config.oracle)?;
        consult_oracle(oracle.as_ref(), &entries, &config.oracle).await
    } else {
        HashMap::new()
    };

    Ok(PlanBuilder::from_config(config, Arc::new(SystemClock)).build(&root, &entries, &classifications))
}

fn print_plan(plan: &OrganizePlan, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    println!("Plan for {}", plan.root.display());
    for (category, count) in &plan.stats {
        let folder = if plan.categories_needing_folders.contains(category) {
            format!(" -> {}/", category.folder_name())
        } else {
            String::new()
        };
        println!("  {:<12} {:>4}{}", category.as_str(), count, folder);
    }

    let changes: Vec<_> = plan.files.iter().filter(|f| f.has_action()).collect();
    if !changes.is_empty() {
        println!("\nChanges:");
        for file in changes {
            let mark = if file.selected { " " } else { "-" };
            let to = if file.needs_move {
                format!("{}/{}", file.category.folder_name(), file.final_name())
            } else {
                file.final_name().to_string()
            };
            println!("  {} {} -> {}", mark, file.entry.name, to);
        }
    }

    if !plan.duplicates.is_empty() {
        println!("\nDuplicates:");
        for (i, group) in plan.duplicates.iter().enumerate() {
            println!("  [{}] {} bytes, keeping {}", i, group.size, group.keeper().name);
            for member in group.members.iter().filter(|m| m.path != group.keeper().path) {
                let mark = if member.remove { "remove" } else { "keep" };
                println!("      {} ({})", member.name, mark);
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_apply(
    config: &AppConfig,
    dir: &Path,
    plan_file: Option<PathBuf>,
    remove_duplicates: bool,
    dry_run: bool,
    use_oracle: bool,
    log_path: &Path,
    json: bool,
) -> Result<()> {
    let mut plan = match plan_file {
        Some(path) => {
            let plan = OrganizePlan::load(&path)?;
            let root = dir.canonicalize()?;
            if plan.root != root {
                return Err(OrdoError::Plan(format!(
                    "{:?} was built for {:?}, not {:?}",
                    path, plan.root, root
                )));
            }
            plan
        }
        None => build_plan(config, dir, use_oracle).await?,
    };
    if remove_duplicates {
        plan.mark_all_duplicates_for_removal();
    }

    if dry_run {
        warn!("DRY RUN MODE - no files will be changed");
        let actions = plan.pending_actions();
        if json {
            println!("{}", serde_json::to_string_pretty(&actions)?);
        } else {
            for action in &actions {
                match action {
                    PendingAction::CreateDirectory { path } => println!("mkdir   {}", path.display()),
                    PendingAction::Move { from, to } => println!("move    {} -> {}", from.display(), to.display()),
                    PendingAction::Rename { from, to } => println!("rename  {} -> {}", from.display(), to.display()),
                    PendingAction::RemoveDuplicate { path } => println!("remove  {}", path.display()),
                }
            }
        }
        return Ok(());
    }

    let coordinator = RunCoordinator::from_config(&config.execution);
    let result = coordinator.execute(&plan)?;
    if let Some(log) = coordinator.log(&result.log_id) {
        log.save(log_path)?;
        info!("Operation log written to {:?}", log_path);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Folders created:    {}", result.dirs_created);
        println!("Files moved:        {}", result.files_moved);
        println!("Files renamed:      {}", result.files_renamed);
        println!("Duplicates removed: {}", result.duplicates_removed);
        for failure in &result.failures {
            println!("  failed: {} ({})", failure.path.display(), failure.message);
        }
    }
    Ok(())
}

fn run_undo(config: &AppConfig, log_path: &Path, json: bool) -> Result<()> {
    let log = OperationLog::load(log_path)?;
    let coordinator = RunCoordinator::from_config(&config.execution);
    coordinator.push_log(log);
    let result = coordinator.undo(None)?;

    if result.failures.is_empty() {
        std::fs::remove_file(log_path)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Restored: {}", result.restored);
        if result.skipped > 0 {
            println!("Folders kept (not empty): {}", result.skipped);
        }
        for failure in &result.failures {
            println!("  failed: {} ({})", failure.path.display(), failure.message);
        }
    }
    Ok(())
}

async fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Folder threshold: {}", config.rules.folder_threshold);
            println!("  Duplicate detection: {}", config.duplicates.enabled);
            println!("  Oracle: {:?}", config.oracle.kind);

            if config.oracle.kind == OracleKind::Ollama {
                let client = OllamaClient::new(&config.oracle.url)?;
                match client.health_check().await {
                    Ok(()) => match client.model_available(&config.oracle.model).await {
                        Ok(true) => println!("  Ollama: running, {} available", config.oracle.model),
                        Ok(false) => println!("  Ollama: running, {} not pulled", config.oracle.model),
                        Err(e) => println!("  Ollama: error listing models - {}", e),
                    },
                    Err(e) => println!("  Ollama: unreachable - {}", e),
                }
            }
        }
    }

    Ok(())
}
