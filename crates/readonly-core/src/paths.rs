//! Standard paths used by the readonly guard

use std::path::{Path, PathBuf};

/// Overrides the settings document location (tests, non-standard homes)
pub const SETTINGS_ENV: &str = "READONLY_SETTINGS";

/// Name of the pre-settings.json config file
const LEGACY_CONFIG: &str = "readonly-config.json";

/// Standard readonly paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Assistant home directory (~/.claude)
    pub home: PathBuf,
    /// Settings document (~/.claude/settings.json)
    pub settings: PathBuf,
    /// Standalone config used by older releases (~/.claude/readonly-config.json)
    pub legacy_config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        if let Some(settings) = std::env::var_os(SETTINGS_ENV).filter(|v| !v.is_empty()) {
            return Self::from_settings(PathBuf::from(settings));
        }

        let home = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".claude");

        Self::with_home(home)
    }

    /// Paths rooted at an explicit assistant home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            settings: home.join("settings.json"),
            legacy_config: home.join(LEGACY_CONFIG),
            home,
        }
    }

    /// Paths derived from an explicit settings document; the home directory
    /// is the document's parent.
    pub fn from_settings(settings: impl Into<PathBuf>) -> Self {
        let settings = settings.into();
        let home = settings
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            legacy_config: home.join(LEGACY_CONFIG),
            home,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_home() {
        let paths = Paths::with_home("/home/u/.claude");
        assert_eq!(paths.settings, PathBuf::from("/home/u/.claude/settings.json"));
        assert_eq!(
            paths.legacy_config,
            PathBuf::from("/home/u/.claude/readonly-config.json")
        );
    }

    #[test]
    fn test_from_settings() {
        let paths = Paths::from_settings("/tmp/x/custom.json");
        assert_eq!(paths.home, PathBuf::from("/tmp/x"));
        assert_eq!(paths.settings, PathBuf::from("/tmp/x/custom.json"));

        let bare = Paths::from_settings("settings.json");
        assert_eq!(bare.home, PathBuf::from("."));
    }
}
