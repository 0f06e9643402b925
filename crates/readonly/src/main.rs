//! readonly - Keep AI coding assistants out of folders you mark read-only
//!
//! "Look, don't touch."

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use readonly::{
    evaluator::{Action, Guard},
    folders::{absolute_folder, Scope},
    hook,
    install::{self, FoldersInit, HookRegistration},
    settings::Settings,
};
use readonly_core::Paths;

/// readonly - Block shell commands that would modify read-only folders
#[derive(Parser)]
#[command(name = "readonly")]
#[command(version)]
#[command(about = "Block AI shell commands that would modify read-only folders")]
#[command(after_help = r#"WHEN TO USE:
    Mark folders the assistant may read but must never change: vendored
    code, fixtures, reference checkouts, secrets.

HOW IT WORKS:
    `readonly install` registers `readonly hook` as a PreToolUse hook for
    the Bash tool. Commands that mention a protected folder and look like
    writes (rm, mv, cp, >, sed -i, chmod, ...) are blocked. Reads (ls, cat,
    grep, find, ...) pass. Anything the guard can't decide passes too.

EXAMPLES:
    readonly install                  # Register the hook
    readonly add vendor               # Protect ./vendor in this project
    readonly add ~/secrets --global   # Protect a folder everywhere
    readonly remove vendor            # Stop protecting ./vendor
    readonly list                     # Show what's protected here
    readonly eval rm -rf vendor/x     # Dry-run a command"#)]
struct Cli {
    /// Settings document (default: ~/.claude/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as a PreToolUse hook (request on stdin, block response on stdout)
    Hook,

    /// Evaluate a command as the hook would (exits 0=allow, 1=block)
    #[command(after_help = "Example: readonly eval --cwd /work/app rm -rf vendor")]
    Eval {
        /// Working directory to resolve project folders for
        #[arg(long)]
        cwd: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// The command line to evaluate
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Protect a folder
    Add {
        /// Folder path; may contain spaces
        #[arg(required = true)]
        path: Vec<String>,

        /// Protect in every project instead of only the current one
        #[arg(long)]
        global: bool,
    },

    /// Stop protecting a folder
    Remove {
        /// Folder path; may contain spaces
        #[arg(required = true)]
        path: Vec<String>,

        /// Remove from the global list instead of the current project
        #[arg(long)]
        global: bool,
    },

    /// List protected folders for the current directory
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register the hook in settings.json
    Install {
        /// Command the assistant should run (default: this binary + " hook")
        #[arg(long)]
        hook_command: Option<String>,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the hook protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = match cli.settings {
        Some(settings) => Paths::from_settings(settings),
        None => Paths::new(),
    };

    match cli.command {
        Commands::Hook => cmd_hook(&paths),
        Commands::Eval { cwd, json, command } => cmd_eval(&paths, command, cwd, json),
        Commands::Add { path, global } => cmd_add(&paths, path, global),
        Commands::Remove { path, global } => cmd_remove(&paths, path, global),
        Commands::List { json } => cmd_list(&paths, json),
        Commands::Install { hook_command } => cmd_install(&paths, hook_command),
    }
}

fn scope(global: bool) -> Scope {
    if global {
        Scope::Global
    } else {
        Scope::Project
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to read current directory")
}

/// Never fails: whatever goes wrong, the hooked command runs.
fn cmd_hook(paths: &Paths) -> Result<()> {
    let mut raw = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut raw) {
        debug!("Could not read hook input: {}", e);
        return Ok(());
    }

    let guard = match Guard::with_settings(&paths.settings) {
        Ok(guard) => guard,
        Err(e) => {
            debug!("Guard unavailable: {}", e);
            return Ok(());
        }
    };

    let cwd = std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(response) = hook::respond(&guard, &raw, &cwd) {
        println!("{}", response.to_line());
    }

    Ok(())
}

fn cmd_eval(paths: &Paths, command: Vec<String>, cwd: Option<String>, json_output: bool) -> Result<()> {
    let command = command.join(" ");
    let guard = Guard::with_settings(&paths.settings)?;
    let cwd = match cwd {
        Some(cwd) => cwd,
        None => current_dir()?.to_string_lossy().into_owned(),
    };

    let decision = guard.evaluate(&command, &cwd);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        let action_str = match decision.action {
            Action::Allow => "ALLOW",
            Action::Block => "BLOCK",
        };
        let classification = guard.classifier().classify(&command);

        println!("{}: {}", action_str, command);
        println!("  Verdict: {:?}", classification.verdict());
        if let Some(reason) = &decision.reason {
            println!("  Reason: {}", reason);
        }
        if let Some(folder) = &decision.folder {
            println!("  Folder: {}", folder);
        }
        if let Some(pattern) = &decision.matched_pattern {
            println!("  Matched pattern: {}", pattern);
        }
    }

    // Exit with appropriate code
    match decision.action {
        Action::Allow => std::process::exit(0),
        Action::Block => std::process::exit(1),
    }
}

fn cmd_add(paths: &Paths, path: Vec<String>, global: bool) -> Result<()> {
    let cwd = current_dir()?;
    let cwd_str = cwd.to_string_lossy().into_owned();
    let folder = absolute_folder(&path.join(" "), &cwd);

    if !Path::new(&folder).exists() {
        bail!("Folder not found: {}", folder);
    }

    let mut settings = Settings::load(&paths.settings)?;
    let mut folders = settings.readonly_folders().unwrap_or_default();
    let scope = scope(global);

    if folders.add(scope, &cwd_str, &folder) {
        settings.set_readonly_folders(&folders);
        settings
            .save()
            .with_context(|| format!("Failed to write {}", paths.settings.display()))?;
    } else {
        debug!("{} already protected", folder);
    }

    println!("✓ Added read-only: {}", folder);
    match scope {
        Scope::Global => println!("  Type: global"),
        Scope::Project => println!("  Type: project ({})", cwd_str),
    }

    Ok(())
}

fn cmd_remove(paths: &Paths, path: Vec<String>, global: bool) -> Result<()> {
    let cwd = current_dir()?;
    let cwd_str = cwd.to_string_lossy().into_owned();
    let folder = absolute_folder(&path.join(" "), &cwd);

    let mut settings = Settings::load(&paths.settings)?;
    if !settings.exists() {
        bail!("settings.json not found: {}", paths.settings.display());
    }

    let Some(mut folders) = settings.readonly_folders() else {
        println!("No read-only folders configured");
        return Ok(());
    };

    if folders.remove(scope(global), &cwd_str, &folder) {
        settings.set_readonly_folders(&folders);
        settings
            .save()
            .with_context(|| format!("Failed to write {}", paths.settings.display()))?;
        println!("✓ Removed read-only: {}", folder);
    } else {
        println!("Not found: {}", folder);
    }

    Ok(())
}

fn cmd_list(paths: &Paths, json_output: bool) -> Result<()> {
    let settings = Settings::load(&paths.settings)?;
    if !settings.exists() {
        println!("No settings.json found");
        return Ok(());
    }

    let Some(folders) = settings.readonly_folders() else {
        println!("No read-only folders configured");
        return Ok(());
    };

    let cwd = current_dir()?.to_string_lossy().into_owned();

    if json_output {
        let effective: Vec<_> = folders.folders_for(&cwd).iter().cloned().collect();
        let out = serde_json::json!({ "cwd": cwd, "folders": effective });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("📁 Read-only folders");
    println!();
    println!("Current project: {}", cwd);
    println!();

    let project = folders.project_folders(&cwd);
    if project.is_empty() {
        println!("Project-specific: (none)");
    } else {
        println!("Project-specific:");
        for folder in project {
            println!("  • {}", folder);
        }
    }

    println!();
    if folders.global.is_empty() {
        println!("Global: (none)");
    } else {
        println!("Global:");
        for folder in &folders.global {
            println!("  • {}", folder);
        }
    }

    println!();
    println!("Total: {} folder(s) protected", project.len() + folders.global.len());
    println!();

    Ok(())
}

fn cmd_install(paths: &Paths, hook_command: Option<String>) -> Result<()> {
    let command = match hook_command {
        Some(command) => command,
        None => {
            let exe = std::env::current_exe().context("Failed to locate the readonly binary")?;
            install::hook_command(&exe)
        }
    };

    println!("Installing into {}", paths.home.display());
    println!();

    let report = install::install(paths, &command)?;

    if report.created_settings {
        println!("✓ Created: settings.json");
    }
    if report.migrated_legacy {
        println!("ℹ Migrated: readonly-config.json → settings.json");
    }

    match report.folders {
        FoldersInit::Added => println!("✓ Added: readonlyFolders to settings.json"),
        FoldersInit::Merged => println!("✓ Merged: migrated config into settings.json"),
        FoldersInit::Exists => println!("ℹ Exists: readonlyFolders in settings.json"),
    }

    match report.hook {
        HookRegistration::Added => println!("✓ Added: PreToolUse hook ({})", command),
        HookRegistration::Updated => println!("✓ Updated: hook command ({})", command),
        HookRegistration::Unchanged => println!("ℹ Exists: PreToolUse hook"),
    }

    println!();
    println!("Commands available:");
    println!("  readonly list                     List protected folders");
    println!("  readonly add <path>               Add folder (project-specific)");
    println!("  readonly add <path> --global      Add folder (all projects)");
    println!("  readonly remove <path> [--global] Remove folder");
    println!();
    println!("Restart the assistant to apply changes.");

    Ok(())
}
