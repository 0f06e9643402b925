//! Hook installation
//!
//! Registers `readonly hook` as a `PreToolUse` hook for the Bash tool in
//! `settings.json`, makes sure a `readonlyFolders` document exists, and folds
//! in the standalone `readonly-config.json` used by older releases.

use crate::error::{GuardError, GuardResult};
use crate::folders::ReadonlyFolders;
use crate::settings::Settings;
use anyhow::{Context, Result};
use readonly_core::Paths;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Hook event the guard listens on
pub const HOOK_EVENT: &str = "PreToolUse";

/// Tool the hook is attached to
pub const HOOK_MATCHER: &str = "Bash";

/// Seconds the assistant waits for the hook
pub const HOOK_TIMEOUT_SECS: u64 = 5;

/// What happened to the `readonlyFolders` document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldersInit {
    /// Key was missing and has been created
    Added,
    /// Legacy config merged into an existing document
    Merged,
    /// Already present, left alone
    Exists,
}

/// What happened to the hook entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRegistration {
    Added,
    /// An older guard entry now points at the current command
    Updated,
    Unchanged,
}

/// Summary of an install run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub created_settings: bool,
    pub migrated_legacy: bool,
    pub folders: FoldersInit,
    pub hook: HookRegistration,
}

/// Hook command for a binary path, quoted and with forward slashes
pub fn hook_command(exe: &Path) -> String {
    format!("\"{}\" hook", exe.to_string_lossy().replace('\\', "/"))
}

/// Whether a hook command belongs to this guard (current or older releases)
pub fn is_guard_command(command: &str) -> bool {
    command.contains("protect-readonly")
        || (command.contains("readonly") && command.trim_end().ends_with(" hook"))
}

/// Install into the given paths
pub fn install(paths: &Paths, command: &str) -> Result<InstallReport> {
    fs::create_dir_all(&paths.home)
        .with_context(|| format!("Failed to create {}", paths.home.display()))?;

    let mut settings = Settings::load(&paths.settings)?;
    let created_settings = !settings.exists();

    let migrated = read_legacy_config(&paths.legacy_config);
    let migrated_legacy = migrated.is_some();

    let folders = init_folders(&mut settings, migrated);
    let hook = register_hook(&mut settings, command)?;

    settings
        .save()
        .with_context(|| format!("Failed to write {}", paths.settings.display()))?;

    if migrated_legacy {
        remove_legacy_config(&paths.legacy_config);
    }

    Ok(InstallReport {
        created_settings,
        migrated_legacy,
        folders,
        hook,
    })
}

/// Read the legacy config, if present and parseable
pub fn read_legacy_config(path: &Path) -> Option<ReadonlyFolders> {
    if !path.exists() {
        return None;
    }

    let value = match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str::<Value>(&content).map_err(|e| e.to_string()))
    {
        Ok(value) => value,
        Err(e) => {
            warn!("Skipping unreadable legacy config {}: {}", path.display(), e);
            return None;
        }
    };

    Some(ReadonlyFolders::from_value(&value))
}

/// Delete the legacy config once its folders are saved in settings.json
fn remove_legacy_config(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Migrated legacy config {}", path.display()),
        Err(e) => warn!("Could not remove legacy config {}: {}", path.display(), e),
    }
}

/// Ensure `readonlyFolders` exists, merging a migrated document if any
pub fn init_folders(settings: &mut Settings, migrated: Option<ReadonlyFolders>) -> FoldersInit {
    match (settings.readonly_folders(), migrated) {
        (None, migrated) => {
            settings.set_readonly_folders(&migrated.unwrap_or_default());
            FoldersInit::Added
        }
        (Some(mut current), Some(migrated)) => {
            current.merge(migrated);
            settings.set_readonly_folders(&current);
            FoldersInit::Merged
        }
        (Some(_), None) => FoldersInit::Exists,
    }
}

/// Point existing guard hook entries at `command`, or add a new entry
pub fn register_hook(settings: &mut Settings, command: &str) -> GuardResult<HookRegistration> {
    let hooks = settings
        .root_mut()
        .entry("hooks")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| GuardError::InternalFault("`hooks` in settings is not an object".into()))?;

    let entries = hooks
        .entry(HOOK_EVENT)
        .or_insert_with(|| json!([]))
        .as_array_mut()
        .ok_or_else(|| {
            GuardError::InternalFault(format!("`hooks.{}` in settings is not an array", HOOK_EVENT))
        })?;

    let mut found = false;
    let mut changed = false;
    for entry in entries.iter_mut() {
        let Some(list) = entry.get_mut("hooks").and_then(Value::as_array_mut) else {
            continue;
        };
        for hook in list.iter_mut() {
            let Some(existing) = hook.get("command").and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            if !is_guard_command(&existing) {
                continue;
            }
            found = true;
            if existing != command {
                hook["command"] = Value::String(command.to_string());
                changed = true;
            }
        }
    }

    if found {
        return Ok(if changed {
            HookRegistration::Updated
        } else {
            HookRegistration::Unchanged
        });
    }

    entries.push(json!({
        "matcher": HOOK_MATCHER,
        "hooks": [{
            "type": "command",
            "command": command,
            "timeout": HOOK_TIMEOUT_SECS,
        }]
    }));
    Ok(HookRegistration::Added)
}
