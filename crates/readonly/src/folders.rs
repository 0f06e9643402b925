//! Protected folders and their resolution
//!
//! Folders live in the settings document under `readonlyFolders`:
//!
//! ```json
//! { "projects": { "/home/u/app": ["/home/u/app/vendor"] }, "global": ["/etc"] }
//! ```
//!
//! For a working directory the effective set is that directory's project
//! folders followed by every global folder. Resolution never fails: a
//! missing or broken document simply protects nothing.

use crate::error::GuardResult;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Where a protected folder applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only when working in one project directory
    Project,
    /// Everywhere
    Global,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Project => write!(f, "project"),
            Scope::Global => write!(f, "global"),
        }
    }
}

/// A single protected folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedFolder {
    pub path: String,
    pub scope: Scope,
}

impl ProtectedFolder {
    pub fn new(path: impl Into<String>, scope: Scope) -> Self {
        Self {
            path: path.into(),
            scope,
        }
    }

    /// Short name used in block messages: the last path component, or the
    /// whole path when it has none (e.g. `/`).
    pub fn name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path)
    }

    /// Protection is textual: the command must literally contain the path.
    pub fn is_mentioned_in(&self, command: &str) -> bool {
        !self.path.is_empty() && command.contains(self.path.as_str())
    }
}

/// Effective folders for one working directory, in resolution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderSet {
    folders: Vec<ProtectedFolder>,
}

impl FolderSet {
    /// All paths treated as global folders
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths
            .into_iter()
            .map(|p| ProtectedFolder::new(p, Scope::Global))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtectedFolder> {
        self.folders.iter()
    }

    /// First folder (in resolution order) the command mentions
    pub fn first_mentioned_in(&self, command: &str) -> Option<&ProtectedFolder> {
        self.folders.iter().find(|f| f.is_mentioned_in(command))
    }
}

impl FromIterator<ProtectedFolder> for FolderSet {
    fn from_iter<T: IntoIterator<Item = ProtectedFolder>>(iter: T) -> Self {
        Self {
            folders: iter.into_iter().filter(|f| !f.path.is_empty()).collect(),
        }
    }
}

/// The persisted `readonlyFolders` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadonlyFolders {
    /// Project folders keyed by absolute working directory
    #[serde(default)]
    pub projects: BTreeMap<String, Vec<String>>,

    /// Folders protected in every project
    #[serde(default)]
    pub global: Vec<String>,
}

impl ReadonlyFolders {
    /// Lenient extraction: entries of the wrong type are skipped instead of
    /// failing the whole document.
    pub fn from_value(value: &Value) -> Self {
        let projects = value
            .get("projects")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(dir, folders)| {
                        folders.as_array().map(|list| (dir.clone(), strings(list)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let global = value
            .get("global")
            .and_then(Value::as_array)
            .map(|list| strings(list))
            .unwrap_or_default();

        Self { projects, global }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "projects": self.projects,
            "global": self.global,
        })
    }

    /// Project folders for `cwd` followed by the global folders
    pub fn folders_for(&self, cwd: &str) -> FolderSet {
        let project = self
            .projects
            .get(cwd)
            .into_iter()
            .flatten()
            .map(|p| ProtectedFolder::new(p.clone(), Scope::Project));
        let global = self
            .global
            .iter()
            .map(|p| ProtectedFolder::new(p.clone(), Scope::Global));

        project.chain(global).collect()
    }

    pub fn project_folders(&self, cwd: &str) -> &[String] {
        self.projects.get(cwd).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add a folder; returns false if it was already there
    pub fn add(&mut self, scope: Scope, cwd: &str, folder: &str) -> bool {
        let list = match scope {
            Scope::Global => &mut self.global,
            Scope::Project => self.projects.entry(cwd.to_string()).or_default(),
        };

        if list.iter().any(|f| f == folder) {
            return false;
        }
        list.push(folder.to_string());
        true
    }

    /// Remove a folder; an emptied project entry is dropped
    pub fn remove(&mut self, scope: Scope, cwd: &str, folder: &str) -> bool {
        match scope {
            Scope::Global => remove_from(&mut self.global, folder),
            Scope::Project => {
                let Some(list) = self.projects.get_mut(cwd) else {
                    return false;
                };
                let removed = remove_from(list, folder);
                if removed && list.is_empty() {
                    self.projects.remove(cwd);
                }
                removed
            }
        }
    }

    /// Fold another document in: its project lists replace ours key by key,
    /// global folders are unioned keeping first-seen order.
    pub fn merge(&mut self, other: ReadonlyFolders) {
        self.projects.extend(other.projects);
        for folder in other.global {
            if !self.global.contains(&folder) {
                self.global.push(folder);
            }
        }
    }
}

fn strings(list: &[Value]) -> Vec<String> {
    list.iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

fn remove_from(list: &mut Vec<String>, folder: &str) -> bool {
    match list.iter().position(|f| f == folder) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

/// Resolves the effective folder set from the settings document.
///
/// Reads the document on every call; each hook invocation is a fresh
/// process and the file may change between them.
#[derive(Debug, Clone)]
pub struct FolderResolver {
    settings: PathBuf,
}

impl FolderResolver {
    pub fn new(settings: impl Into<PathBuf>) -> Self {
        Self {
            settings: settings.into(),
        }
    }

    /// Effective folders for `cwd`; empty on any failure.
    pub fn resolve(&self, cwd: &str) -> FolderSet {
        match self.load() {
            Ok(Some(folders)) => folders.folders_for(cwd),
            Ok(None) => FolderSet::default(),
            Err(e) => {
                debug!("No protected folders: {}", e);
                FolderSet::default()
            }
        }
    }

    fn load(&self) -> GuardResult<Option<ReadonlyFolders>> {
        let settings = Settings::load(&self.settings)?;
        Ok(settings.readonly_folders())
    }
}

/// Turn a user-supplied folder argument into an absolute path string.
///
/// Expands `~`, resolves relative paths against `cwd` and folds `.`/`..`
/// lexically. Symlinks are left alone.
pub fn absolute_folder(arg: &str, cwd: &Path) -> String {
    let expanded = shellexpand::tilde(arg);
    let path = Path::new(expanded.as_ref());
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized.to_string_lossy().into_owned()
}
