//! PreToolUse hook protocol
//!
//! The assistant runs `readonly hook` before every shell command and writes
//! a JSON request to stdin:
//!
//! ```json
//! { "tool_name": "Bash", "tool_input": { "command": "rm -rf dist" }, "cwd": "/work/app" }
//! ```
//!
//! A block is answered with one JSON line on stdout; an allow prints nothing.
//! The process exits 0 either way.

use crate::evaluator::{Decision, Guard};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Incoming hook request. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_input: Option<ToolInput>,

    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub command: Option<String>,
}

impl HookInput {
    pub fn parse(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    /// The shell command, or "" when absent
    pub fn command(&self) -> &str {
        self.tool_input
            .as_ref()
            .and_then(|t| t.command.as_deref())
            .unwrap_or("")
    }

    /// Working directory of the request, if the host sent a usable one
    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref().filter(|c| !c.is_empty())
    }
}

/// Response printed when a command is blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookOutput {
    pub decision: String,
    pub reason: String,
}

impl HookOutput {
    /// Only blocks produce output
    pub fn from_decision(decision: &Decision) -> Option<Self> {
        if !decision.is_blocked() {
            return None;
        }

        Some(Self {
            decision: "block".to_string(),
            reason: decision.reason.clone().unwrap_or_default(),
        })
    }

    pub fn to_line(&self) -> String {
        // Two string fields; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Answer one raw hook request.
///
/// Never fails and never panics outward: bad input, an empty command or a
/// fault inside evaluation all mean "say nothing".
pub fn respond(guard: &Guard, raw: &str, fallback_cwd: &str) -> Option<HookOutput> {
    let input = match HookInput::parse(raw) {
        Ok(input) => input,
        Err(e) => {
            debug!("Ignoring unparseable hook input: {}", e);
            return None;
        }
    };

    let command = input.command();
    if command.is_empty() {
        return None;
    }
    let cwd = input.cwd().unwrap_or(fallback_cwd);

    let decision = panic::catch_unwind(AssertUnwindSafe(|| guard.evaluate(command, cwd)))
        .unwrap_or_else(|_| {
            debug!("Evaluation panicked, allowing");
            Decision::allow()
        });

    HookOutput::from_decision(&decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn guard(tmp: &TempDir) -> Guard {
        let path = tmp.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "readonlyFolders": { "projects": { "/work/app": ["/work/app/fixtures"] }, "global": ["/home/u/secret"] } }"#,
        )
        .unwrap();
        Guard::with_settings(path).unwrap()
    }

    fn request(command: &str, cwd: &str) -> String {
        serde_json::json!({
            "session_id": "abc",
            "tool_name": "Bash",
            "tool_input": { "command": command, "description": "x" },
            "cwd": cwd,
        })
        .to_string()
    }

    #[test]
    fn test_block_response() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);

        let out = respond(&guard, &request("rm -rf /home/u/secret", "/"), "/").unwrap();
        assert_eq!(out.decision, "block");
        assert_eq!(out.reason, "Read-only: secret");
        assert_eq!(
            out.to_line(),
            r#"{"decision":"block","reason":"Read-only: secret"}"#
        );
    }

    #[test]
    fn test_allow_is_silent() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);

        assert!(respond(&guard, &request("cat /home/u/secret/a", "/"), "/").is_none());
        assert!(respond(&guard, &request("rm -rf /tmp/x", "/"), "/").is_none());
    }

    #[test]
    fn test_project_scope_uses_request_cwd() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);
        let raw = request("rm /work/app/fixtures/a.json", "/work/app");

        assert!(respond(&guard, &raw, "/elsewhere").is_some());

        let no_cwd = r#"{ "tool_input": { "command": "rm /work/app/fixtures/a.json" } }"#;
        assert!(respond(&guard, no_cwd, "/work/app").is_some());
        assert!(respond(&guard, no_cwd, "/elsewhere").is_none());
    }

    #[test]
    fn test_bad_input_fails_open() {
        let tmp = TempDir::new().unwrap();
        let guard = guard(&tmp);

        assert!(respond(&guard, "", "/").is_none());
        assert!(respond(&guard, "not json", "/").is_none());
        assert!(respond(&guard, r#"{ "tool_input": null }"#, "/").is_none());
        assert!(respond(&guard, r#"{ "tool_input": { "command": 42 } }"#, "/").is_none());
        assert!(respond(&guard, r#"{ "tool_input": {} }"#, "/").is_none());
    }
}
