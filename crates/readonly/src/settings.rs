//! Settings document access
//!
//! The guard shares `settings.json` with the assistant, so it only ever
//! touches its own keys (`readonlyFolders`, and the hook entry during
//! install) and writes every other key back untouched.

use crate::error::{GuardError, GuardResult};
use crate::folders::ReadonlyFolders;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Key holding the protected folder document
pub const READONLY_KEY: &str = "readonlyFolders";

/// A loaded settings document
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    root: Map<String, Value>,
    existed: bool,
}

impl Settings {
    /// Load the document; a missing file yields an empty one.
    pub fn load(path: impl Into<PathBuf>) -> GuardResult<Self> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self {
                path,
                root: Map::new(),
                existed: false,
            });
        }

        let content = fs::read_to_string(&path).map_err(|e| GuardError::config(&path, e))?;
        let root = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(GuardError::config(&path, "root is not a JSON object")),
            Err(e) => return Err(GuardError::config(&path, e)),
        };

        Ok(Self {
            path,
            root,
            existed: true,
        })
    }

    /// Whether the document was on disk when loaded
    pub fn exists(&self) -> bool {
        self.existed
    }

    /// The `readonlyFolders` document, if the key is present
    pub fn readonly_folders(&self) -> Option<ReadonlyFolders> {
        self.root.get(READONLY_KEY).map(ReadonlyFolders::from_value)
    }

    pub fn set_readonly_folders(&mut self, folders: &ReadonlyFolders) {
        self.root.insert(READONLY_KEY.to_string(), folders.to_value());
    }

    /// Raw access for keys the guard manages directly (hooks)
    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Write the document back as pretty JSON
    pub fn save(&mut self) -> GuardResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| GuardError::config(parent, e))?;
        }

        let mut content = serde_json::to_string_pretty(&self.root)
            .map_err(|e| GuardError::InternalFault(format!("serializing settings: {}", e)))?;
        content.push('\n');

        fs::write(&self.path, content).map_err(|e| GuardError::config(&self.path, e))?;
        self.existed = true;
        Ok(())
    }
}
