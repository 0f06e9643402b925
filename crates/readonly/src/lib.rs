//! Readonly - Folder protection for AI-driven shell commands
//!
//! Runs as a `PreToolUse` hook. Every shell command the assistant wants to
//! run is checked against the folders you marked read-only; commands that
//! name one of those folders and look like they write to it are blocked.
//!
//! Detection is lexical, not a sandbox:
//! - a command must literally contain a protected path to be considered
//! - read-only shapes (`ls`, `cat`, `grep`, ...) are let through
//! - mutating shapes (`rm`, `mv`, `>`, `sed -i`, ...) are blocked
//! - anything else is let through
//!
//! Any fault inside the guard allows the command. A broken guard must never
//! wedge the assistant.

pub mod classifier;
pub mod error;
pub mod evaluator;
pub mod folders;
pub mod hook;
pub mod install;
pub mod pattern;
pub mod settings;

pub use classifier::{Classification, CommandClassifier, Verdict};
pub use error::{GuardError, GuardResult};
pub use evaluator::{decide, Action, Decision, Guard};
pub use folders::{FolderResolver, FolderSet, ProtectedFolder, ReadonlyFolders, Scope};
pub use pattern::{Pattern, PatternRegistry};
pub use settings::Settings;
