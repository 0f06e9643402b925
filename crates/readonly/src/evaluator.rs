//! Decision engine
//!
//! Combines the folder set with the command classification:
//!
//! 1. Find the first protected folder (resolution order) whose path appears
//!    in the command text. None → allow.
//! 2. Classify the command once. Safe → allow. Dangerous → block, naming
//!    the folder. Neither → allow.
//!
//! The classification does not depend on which folder matched, so looking
//! past the first mentioned folder could never change the outcome.

use crate::classifier::{Classification, CommandClassifier, Verdict};
use crate::error::GuardResult;
use crate::folders::{FolderResolver, FolderSet, ProtectedFolder};
use crate::pattern::PatternRegistry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Result of evaluating one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The final decision
    pub action: Action,

    /// Why the command was blocked; absent on allow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Protected folder the command mentioned (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    /// Dangerous shape that triggered a block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

/// Actions the guard can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
}

impl Decision {
    /// Plain allow, nothing to report
    pub fn allow() -> Self {
        Self {
            action: Action::Allow,
            reason: None,
            folder: None,
            matched_pattern: None,
        }
    }

    fn allow_mentioning(folder: &ProtectedFolder) -> Self {
        Self {
            folder: Some(folder.path.clone()),
            ..Self::allow()
        }
    }

    fn block(folder: &ProtectedFolder, classification: &Classification) -> Self {
        Self {
            action: Action::Block,
            reason: Some(format!("Read-only: {}", folder.name())),
            folder: Some(folder.path.clone()),
            matched_pattern: classification.matched.map(str::to_string),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.action == Action::Allow
    }

    pub fn is_blocked(&self) -> bool {
        self.action == Action::Block
    }
}

/// Decide a command against an already-resolved folder set. Pure.
pub fn decide(command: &str, folders: &FolderSet, classifier: &CommandClassifier<'_>) -> Decision {
    let Some(folder) = folders.first_mentioned_in(command) else {
        return Decision::allow();
    };

    let classification = classifier.classify(command);
    match classification.verdict() {
        Verdict::Safe | Verdict::Neutral => Decision::allow_mentioning(folder),
        Verdict::Dangerous => Decision::block(folder, &classification),
    }
}

/// The guard: an immutable registry plus a folder resolver
#[derive(Debug, Clone)]
pub struct Guard {
    registry: PatternRegistry,
    resolver: FolderResolver,
}

impl Guard {
    /// Guard reading a specific settings document
    pub fn with_settings(settings: impl Into<PathBuf>) -> GuardResult<Self> {
        Ok(Self {
            registry: PatternRegistry::builtin()?,
            resolver: FolderResolver::new(settings),
        })
    }

    pub fn classifier(&self) -> CommandClassifier<'_> {
        CommandClassifier::new(&self.registry)
    }

    /// Evaluate a command run from `working_dir`.
    ///
    /// Total: settings problems resolve to an empty folder set, so the worst
    /// outcome of a fault is an allow.
    pub fn evaluate(&self, command: &str, working_dir: &str) -> Decision {
        if command.trim().is_empty() {
            return Decision::allow();
        }

        let folders = self.resolver.resolve(working_dir);
        if folders.is_empty() {
            return Decision::allow();
        }

        let decision = decide(command, &folders, &self.classifier());
        debug!(
            action = ?decision.action,
            folder = decision.folder.as_deref().unwrap_or("-"),
            "evaluated command against {} protected folder(s)",
            folders.len()
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn decide_with(folders: &[&str], command: &str) -> Decision {
        let registry = PatternRegistry::builtin().unwrap();
        let classifier = CommandClassifier::new(&registry);
        decide(command, &FolderSet::from_paths(folders.iter().copied()), &classifier)
    }

    #[test]
    fn test_safe_read_allowed() {
        let d = decide_with(&["/home/u/secret"], "cat /home/u/secret/file.txt");
        assert!(d.is_allowed());
        assert_eq!(d.reason, None);
    }

    #[test]
    fn test_rm_blocked() {
        let d = decide_with(&["/home/u/secret"], "rm -rf /home/u/secret");
        assert!(d.is_blocked());
        assert_eq!(d.reason.as_deref(), Some("Read-only: secret"));
        assert_eq!(d.matched_pattern.as_deref(), Some("rm"));
    }

    #[test]
    fn test_redirection_blocked() {
        let d = decide_with(&["/home/u/secret"], "echo hi > /home/u/secret/out.txt");
        assert!(d.is_blocked());
        assert_eq!(d.reason.as_deref(), Some("Read-only: secret"));
    }

    #[test]
    fn test_no_folders_allows_everything() {
        assert!(decide_with(&[], "rm -rf /anything").is_allowed());
    }

    #[test]
    fn test_dangerous_after_separator_blocked() {
        let d = decide_with(&["/a"], "ls /a && rm /a/file");
        assert!(d.is_blocked());
        assert_eq!(d.reason.as_deref(), Some("Read-only: a"));
    }

    #[test]
    fn test_mutation_inside_substitution_blocked() {
        for command in ["ls /a $(rm -rf /a)", "cat /a/x `rm -rf /a`", "ls /a (rm -rf /a)"] {
            let d = decide_with(&["/a"], command);
            assert!(d.is_blocked(), "{command}");
            assert_eq!(d.matched_pattern.as_deref(), Some("rm"), "{command}");
        }
    }

    #[test]
    fn test_fd_redirection_into_folder_blocked() {
        for command in [
            "sort /a/x 1>/a/x",
            "python /a/gen.py 2>/a/err.log",
            "ls /a &>/a/out",
            "find /a -name x -fprint /a/out",
        ] {
            assert!(decide_with(&["/a"], command).is_blocked(), "{command}");
        }

        assert!(decide_with(&["/a"], "grep x /a 2>/dev/null").is_allowed());
    }

    #[test]
    fn test_unmentioned_folder_allows() {
        assert!(decide_with(&["/a"], "grep foo /b/file").is_allowed());
        assert!(decide_with(&["/a"], "rm /b/file").is_allowed());
    }

    #[test]
    fn test_neutral_command_allowed() {
        let d = decide_with(&["/a"], "python /a/script.py");
        assert!(d.is_allowed());
        assert_eq!(d.folder.as_deref(), Some("/a"));
    }

    #[test]
    fn test_first_mentioned_folder_names_the_block() {
        let d = decide_with(&["/x/first", "/x/second"], "mv /x/second/a /x/first/b");
        assert_eq!(d.reason.as_deref(), Some("Read-only: first"));

        let d = decide_with(&["/x/absent", "/x/second"], "mv /x/second/a /tmp");
        assert_eq!(d.reason.as_deref(), Some("Read-only: second"));
    }

    #[test]
    fn test_empty_folder_entries_ignored() {
        assert!(decide_with(&[""], "rm -rf /anything").is_allowed());
    }

    #[test]
    fn test_sibling_prefix_is_protected() {
        let d = decide_with(&["/home/u/proj"], "rm -rf /home/u/project2");
        assert!(d.is_blocked());
        assert_eq!(d.reason.as_deref(), Some("Read-only: proj"));
    }

    #[test]
    fn test_guard_evaluate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "readonlyFolders": {
                    "projects": { "/work/app": ["/work/app/vendor"] },
                    "global": ["/etc/keys"]
                }
            }"#,
        )
        .unwrap();
        let guard = Guard::with_settings(&path).unwrap();

        let blocked = guard.evaluate("rm -rf /work/app/vendor/lib", "/work/app");
        assert_eq!(blocked.reason.as_deref(), Some("Read-only: vendor"));

        // Project folders only apply in their own project
        assert!(guard.evaluate("rm -rf /work/app/vendor/lib", "/work/other").is_allowed());
        assert!(guard.evaluate("touch /etc/keys/new", "/work/other").is_blocked());
        assert!(guard.evaluate("", "/work/app").is_allowed());

        // Same inputs, same decision
        let again = guard.evaluate("rm -rf /work/app/vendor/lib", "/work/app");
        assert_eq!(blocked, again);
    }

    #[test]
    fn test_guard_fails_open_on_corrupt_settings() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{\"readonlyFolders\": ").unwrap();

        let guard = Guard::with_settings(&path).unwrap();
        assert!(guard.evaluate("rm -rf /etc", "/").is_allowed());
    }

    #[test]
    fn test_decision_json() {
        let d = decide_with(&["/s"], "rm /s/x");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["action"], "block");
        assert_eq!(json["reason"], "Read-only: s");

        let allow = serde_json::to_value(Decision::allow()).unwrap();
        assert_eq!(allow, serde_json::json!({ "action": "allow" }));
    }
}
