//! Command classification
//!
//! Applies the pattern registry to a raw command line. The two tests are
//! independent: a command may be both safe and dangerous (`grep rm notes`
//! names `rm` as an argument), and the decision engine settles the tie.

use crate::pattern::PatternRegistry;
use serde::Serialize;

/// Outcome of classifying one command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Every segment is a read-only shape and nothing is redirected
    pub is_safe: bool,
    /// Some dangerous shape appears anywhere in the command
    pub is_dangerous: bool,
    /// First dangerous shape that matched
    pub matched: Option<&'static str>,
}

/// Tri-state view of a classification, safe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Dangerous,
    Neutral,
}

impl Classification {
    pub fn verdict(&self) -> Verdict {
        if self.is_safe {
            Verdict::Safe
        } else if self.is_dangerous {
            Verdict::Dangerous
        } else {
            Verdict::Neutral
        }
    }
}

/// Classifies command lines against a borrowed registry
#[derive(Debug, Clone, Copy)]
pub struct CommandClassifier<'a> {
    registry: &'a PatternRegistry,
}

impl<'a> CommandClassifier<'a> {
    pub fn new(registry: &'a PatternRegistry) -> Self {
        Self { registry }
    }

    pub fn classify(&self, command: &str) -> Classification {
        let matched = self.registry.match_dangerous(command).map(|p| p.shape());

        Classification {
            is_safe: self.is_safe(command),
            is_dangerous: matched.is_some(),
            matched,
        }
    }

    /// A command is safe when it redirects nothing and each of its segments
    /// starts with a read-only shape.
    pub fn is_safe(&self, command: &str) -> bool {
        if has_redirection(command) {
            return false;
        }

        let mut any = false;
        for segment in segments(command) {
            if self.registry.match_safe(segment).is_none() {
                return false;
            }
            any = true;
        }
        any
    }
}

/// Any output redirection token, including fd redirections like `2>`
fn has_redirection(command: &str) -> bool {
    command.contains('>')
}

/// Split a command line on `;`, `&&`, `||`, `|`, `&` and newlines, and
/// around subshells and command substitutions (`( )`, `$( )`, backticks).
///
/// Purely lexical: separators inside quotes split too, which can only make a
/// command look less safe.
pub fn segments(command: &str) -> impl Iterator<Item = &str> {
    command
        .split(|c| matches!(c, ';' | '|' | '&' | '\n' | '(' | ')' | '`'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
