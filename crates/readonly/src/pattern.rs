//! Command shape registry
//!
//! Two ordered lists of lexical patterns: safe shapes (pure inspection) and
//! dangerous shapes (anything that can write, move, truncate or delete).
//! Commands are never parsed; a shape is a regular expression over the raw
//! command text.
//!
//! Safe shapes are matched against a single command segment (already split
//! on separators and trimmed), so they are anchored at `^`. Dangerous shapes
//! are matched against the whole command line and carry their own anchor.

use crate::error::GuardResult;
use regex::Regex;
use std::borrow::Cow;

/// Where a shape may start in the text it is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// Start of a trimmed segment
    Segment,
    /// Start of the command line or right after a separator
    Head,
    /// Like `Head`, or after any whitespace
    Word,
    /// Anywhere in the command line
    Anywhere,
}

impl Anchor {
    fn prefix(self) -> &'static str {
        match self {
            Anchor::Segment => "^",
            Anchor::Head => r"(?:^|[;&|(`\n])\s*",
            Anchor::Word => r"(?:^|[\s;&|(`])",
            Anchor::Anywhere => "",
        }
    }
}

/// Static description of a command shape
struct Shape {
    name: &'static str,
    anchor: Anchor,
    body: &'static str,
    unless: Option<&'static str>,
    /// Spans blanked out before `body` is tried
    ignore: Option<&'static str>,
}

const fn shape(name: &'static str, anchor: Anchor, body: &'static str) -> Shape {
    Shape {
        name,
        anchor,
        body,
        unless: None,
        ignore: None,
    }
}

macro_rules! find_actions {
    () => {
        r"\s-(?:delete|exec|execdir|ok|okdir|fprint|fprint0|fprintf|fls)\b"
    };
}

/// `find` actions that write or run other programs
const FIND_ACTIONS: &str = find_actions!();

/// Redirections that cannot touch a file: `2>/dev/null`, `&>/dev/null`,
/// `2>&1`, `>&2`, `2>&-`
const HARMLESS_REDIRECTS: &str = r"[0-9]*&?>>?\s*(?:&(?:[0-9]+-?|-)|/dev/null(?:$|[\s;&|)]))";

const SAFE_SHAPES: &[Shape] = &[
    shape("ls", Anchor::Segment, r"ls\b"),
    shape("dir", Anchor::Segment, r"dir\b"),
    shape("Get-ChildItem", Anchor::Segment, r"Get-ChildItem\b"),
    shape("cat", Anchor::Segment, r"cat\s"),
    shape("type", Anchor::Segment, r"type\s"),
    shape("Get-Content", Anchor::Segment, r"Get-Content\b"),
    shape("head", Anchor::Segment, r"head\s"),
    shape("tail", Anchor::Segment, r"tail\s"),
    shape("grep", Anchor::Segment, r"grep\s"),
    shape("rg", Anchor::Segment, r"rg\s"),
    shape("grepai", Anchor::Segment, r"grepai\s"),
    shape("Select-String", Anchor::Segment, r"Select-String\b"),
    Shape {
        name: "find",
        anchor: Anchor::Segment,
        body: r"find\s.*-(?:name|type|print)",
        unless: Some(FIND_ACTIONS),
        ignore: None,
    },
    shape("file", Anchor::Segment, r"file\s"),
    shape("wc", Anchor::Segment, r"wc\s"),
    shape("diff", Anchor::Segment, r"diff\s"),
    shape("less", Anchor::Segment, r"less\s"),
    shape("more", Anchor::Segment, r"more\s"),
    shape("bat", Anchor::Segment, r"bat\s"),
    shape("tree", Anchor::Segment, r"tree\b"),
    shape("stat", Anchor::Segment, r"stat\s"),
    shape("du", Anchor::Segment, r"du\s"),
    shape("realpath", Anchor::Segment, r"realpath\s"),
    shape("basename", Anchor::Segment, r"basename\s"),
    shape("dirname", Anchor::Segment, r"dirname\s"),
    shape("readlink", Anchor::Segment, r"readlink\s"),
    shape("pwd", Anchor::Segment, r"pwd\b"),
    shape("md5sum", Anchor::Segment, r"md5sum\s"),
    shape("sha256sum", Anchor::Segment, r"sha256sum\s"),
    shape("xxd", Anchor::Segment, r"xxd\s"),
    shape("hexdump", Anchor::Segment, r"hexdump\s"),
    shape("strings", Anchor::Segment, r"strings\s"),
];

const DANGEROUS_SHAPES: &[Shape] = &[
    // Deletion
    shape("rm", Anchor::Word, r"rm\s"),
    shape("rmdir", Anchor::Word, r"rmdir\s"),
    shape("unlink", Anchor::Word, r"unlink\s"),
    shape("shred", Anchor::Word, r"shred\s"),
    shape("del", Anchor::Head, r"del\s"),
    shape("erase", Anchor::Head, r"erase\s"),
    shape("rd", Anchor::Head, r"rd\s"),
    shape("Remove-Item", Anchor::Head, r"Remove-Item\b"),
    shape("find -delete", Anchor::Head, concat!(r"find\s.*", find_actions!())),
    // Move / copy
    shape("mv", Anchor::Word, r"mv\s"),
    shape("move", Anchor::Head, r"move\s"),
    shape("Move-Item", Anchor::Head, r"Move-Item\b"),
    shape("cp", Anchor::Word, r"cp\s"),
    shape("copy", Anchor::Head, r"copy\s"),
    shape("Copy-Item", Anchor::Head, r"Copy-Item\b"),
    // Creation and truncation
    shape("touch", Anchor::Word, r"touch\s"),
    shape("mkdir", Anchor::Word, r"mkdir\s"),
    shape("md", Anchor::Head, r"md\s"),
    shape("New-Item", Anchor::Head, r"New-Item\b"),
    shape("install", Anchor::Word, r"install\s"),
    shape("truncate", Anchor::Word, r"truncate\s"),
    shape("ln", Anchor::Word, r"ln\s"),
    // Writers
    shape("echo >", Anchor::Word, r"echo\s.*>"),
    shape("printf >", Anchor::Head, r"printf\s.*>"),
    shape("cat >", Anchor::Word, r"cat\s.*>"),
    shape("tee", Anchor::Word, r"tee\s"),
    shape("Set-Content", Anchor::Head, r"Set-Content\b"),
    shape("Out-File", Anchor::Head, r"Out-File\b"),
    shape("Add-Content", Anchor::Head, r"Add-Content\b"),
    // `>`, `>>`, `N>`, `&>` into a file; arrows (`->`, `=>`) are not redirections
    Shape {
        name: "redirect",
        anchor: Anchor::Anywhere,
        body: r"(?:^|[^=-])>>?\s*[^\s>]",
        unless: None,
        ignore: Some(HARMLESS_REDIRECTS),
    },
    // In-place edits, permissions, raw writes
    shape("sed -i", Anchor::Word, r"sed\s+-i"),
    shape("chmod", Anchor::Word, r"chmod\s"),
    shape("chown", Anchor::Word, r"chown\s"),
    shape("icacls", Anchor::Head, r"icacls\s"),
    shape("dd", Anchor::Word, r"dd\s"),
    // Version control
    shape("git checkout", Anchor::Head, r"git\s+checkout\b"),
    shape("git reset", Anchor::Head, r"git\s+reset\b"),
    shape("git clean", Anchor::Head, r"git\s+clean\b"),
    shape("git rm", Anchor::Head, r"git\s+rm\b"),
];

/// A compiled command shape
#[derive(Debug, Clone)]
pub struct Pattern {
    shape: &'static str,
    regex: Regex,
    unless: Option<Regex>,
    ignore: Option<Regex>,
}

impl Pattern {
    fn compile(shape: &Shape) -> GuardResult<Self> {
        let regex = Regex::new(&format!("{}{}", shape.anchor.prefix(), shape.body))?;
        let unless = shape.unless.map(Regex::new).transpose()?;
        let ignore = shape.ignore.map(Regex::new).transpose()?;

        Ok(Self {
            shape: shape.name,
            regex,
            unless,
            ignore,
        })
    }

    /// The command shape this pattern recognizes (e.g. "rm", "sed -i")
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    /// Whether the text has this shape
    pub fn is_match(&self, text: &str) -> bool {
        let text = match &self.ignore {
            Some(ignore) => ignore.replace_all(text, " "),
            None => Cow::Borrowed(text),
        };
        self.regex.is_match(&text) && !self.unless.as_ref().is_some_and(|u| u.is_match(&text))
    }
}

/// Immutable safe/dangerous pattern lists, built once per process
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    safe: Vec<Pattern>,
    dangerous: Vec<Pattern>,
}

impl PatternRegistry {
    /// Compile the built-in shapes
    pub fn builtin() -> GuardResult<Self> {
        Ok(Self {
            safe: compile_all(SAFE_SHAPES)?,
            dangerous: compile_all(DANGEROUS_SHAPES)?,
        })
    }

    pub fn safe(&self) -> &[Pattern] {
        &self.safe
    }

    pub fn dangerous(&self) -> &[Pattern] {
        &self.dangerous
    }

    /// First safe shape matching a single trimmed segment
    pub fn match_safe(&self, segment: &str) -> Option<&Pattern> {
        self.safe.iter().find(|p| p.is_match(segment))
    }

    /// First dangerous shape matching anywhere in a command line
    pub fn match_dangerous(&self, command: &str) -> Option<&Pattern> {
        self.dangerous.iter().find(|p| p.is_match(command))
    }
}

fn compile_all(shapes: &[Shape]) -> GuardResult<Vec<Pattern>> {
    shapes.iter().map(Pattern::compile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PatternRegistry {
        PatternRegistry::builtin().unwrap()
    }

    fn dangerous_shape(command: &str) -> Option<&'static str> {
        registry().match_dangerous(command).map(Pattern::shape)
    }

    #[test]
    fn test_builtin_compiles() {
        let registry = registry();
        assert_eq!(registry.safe().len(), SAFE_SHAPES.len());
        assert_eq!(registry.dangerous().len(), DANGEROUS_SHAPES.len());
    }

    #[test]
    fn test_safe_shapes() {
        let registry = registry();
        for segment in [
            "ls -la /a",
            "ls",
            "cat /a/file.txt",
            "grep -rn foo /a",
            "rg foo /a",
            "find /a -name '*.rs'",
            "stat /a",
            "wc -l /a/x",
            "md5sum /a/x",
            "xxd /a/bin",
            "pwd",
            "dirname /a/b",
            "Get-ChildItem C:\\a",
        ] {
            assert!(registry.match_safe(segment).is_some(), "{segment}");
        }

        for segment in ["rm /a", "vim /a/x", "lsblk", "python /a/x.py"] {
            assert!(registry.match_safe(segment).is_none(), "{segment}");
        }
    }

    #[test]
    fn test_find_actions_are_not_safe() {
        let registry = registry();
        assert!(registry.match_safe("find /a -name '*.tmp' -delete").is_none());
        assert!(registry.match_safe("find /a -type f -exec rm {} ;").is_none());
        assert_eq!(
            dangerous_shape("find /a -name '*.tmp' -delete"),
            Some("find -delete")
        );
        assert!(registry.match_safe("find /a -name x -fprint /a/out").is_none());
        assert_eq!(
            dangerous_shape("find /a -name x -fprint /a/out"),
            Some("find -delete")
        );
        assert_eq!(dangerous_shape("find /a -type f -fls /a/list"), Some("find -delete"));
    }

    #[test]
    fn test_dangerous_at_start_and_after_separators() {
        assert_eq!(dangerous_shape("rm -rf /a"), Some("rm"));
        assert_eq!(dangerous_shape("ls /a && rm /a/file"), Some("rm"));
        assert_eq!(dangerous_shape("ls /a&&rm /a/file"), Some("rm"));
        assert_eq!(dangerous_shape("ls /a; mv /a/x /b"), Some("mv"));
        assert_eq!(dangerous_shape("ls /a | xargs cp -t /a"), Some("cp"));
        assert_eq!(dangerous_shape("cd /x && git checkout ."), Some("git checkout"));
        assert_eq!(dangerous_shape("Get-Item x | Remove-Item"), Some("Remove-Item"));
        assert_eq!(dangerous_shape("sed -i 's/a/b/' /a/x"), Some("sed -i"));
        assert_eq!(dangerous_shape("chmod 600 /a/x"), Some("chmod"));
        assert_eq!(dangerous_shape("dd if=/dev/zero of=/a/disk"), Some("dd"));
    }

    #[test]
    fn test_redirection() {
        assert!(dangerous_shape("ls /a > /a/list.txt").is_some());
        assert!(dangerous_shape("ls /a >> /a/list.txt").is_some());
        assert!(dangerous_shape("ls /a>/a/list.txt").is_some());
        assert!(dangerous_shape(">/a/empty").is_some());
        assert!(dangerous_shape("grep x /a | sort > /a/out").is_some());

        assert_eq!(dangerous_shape("grep x /a 2>/dev/null"), None);
        assert_eq!(dangerous_shape("grep x /a 2>&1"), None);
        assert_eq!(dangerous_shape("grep x /a &>/dev/null | wc -l"), None);
        assert_eq!(dangerous_shape("grep x /a >/dev/null 2>&1"), None);
        assert_eq!(dangerous_shape("grep -- '->' /a/x"), None);
        assert_eq!(dangerous_shape("grep '=>' /a/x"), None);
    }

    #[test]
    fn test_numbered_fd_redirection_into_files() {
        assert_eq!(dangerous_shape("sort /a/x 1>/a/x"), Some("redirect"));
        assert_eq!(dangerous_shape("python /a/gen.py 2>/a/err.log"), Some("redirect"));
        assert_eq!(dangerous_shape("ls /a &>/a/out"), Some("redirect"));
        assert_eq!(dangerous_shape("ls /a &>> /a/out"), Some("redirect"));
        assert_eq!(dangerous_shape("ls /a 2>&1 >/a/out"), Some("redirect"));
        assert_eq!(dangerous_shape("ls /a > /dev/nullx"), Some("redirect"));
        assert_eq!(dangerous_shape("ls /a >& /a/out"), Some("redirect"));
    }

    #[test]
    fn test_windows_shapes_need_a_command_position() {
        assert_eq!(dangerous_shape("del C:\\a\\x"), Some("del"));
        assert_eq!(dangerous_shape("echo hi; md C:\\a\\new"), Some("md"));
        assert_eq!(dangerous_shape("ls /a/README.md notes"), None);
        assert_eq!(dangerous_shape("grep copy /a/x"), None);
    }
}
