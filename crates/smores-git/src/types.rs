//! Parsed shapes of git tool output.

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Remote name, e.g. `origin`.
    pub name: String,
    /// Fetch URL or path.
    pub target: String,
}

/// One entry of `git status --porcelain -z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Index (staged) status code.
    pub index: char,
    /// Working tree status code.
    pub worktree: char,
    /// Path relative to the repository root.
    pub path: String,
    /// Original path for renames and copies.
    pub original_path: Option<String>,
}

impl StatusEntry {
    /// The tool reports this path as ignored.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.index == '!' && self.worktree == '!'
    }

    /// The path has unresolved merge conflicts.
    #[must_use]
    pub const fn is_unmerged(&self) -> bool {
        matches!(
            (self.index, self.worktree),
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D')
        )
    }
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Entries are NUL separated; renames and copies are followed by an extra
/// NUL-terminated field holding the original path.
#[must_use]
pub fn parse_status(raw: &str) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    let mut fields = raw.split('\0').filter(|f| !f.is_empty());

    while let Some(field) = fields.next() {
        let mut chars = field.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        let path = field.get(3..).unwrap_or_default().to_string();
        if path.is_empty() {
            continue;
        }
        let original_path = if matches!(index, 'R' | 'C') {
            fields.next().map(String::from)
        } else {
            None
        };
        entries.push(StatusEntry {
            index,
            worktree,
            path,
            original_path,
        });
    }

    entries
}

/// Parse `git remote -v` output, one entry per remote name.
#[must_use]
pub fn parse_remotes(raw: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();
    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(target)) = (parts.next(), parts.next()) else {
            continue;
        };
        if remotes.iter().any(|r| r.name == name) {
            continue;
        }
        remotes.push(Remote {
            name: name.to_string(),
            target: target.to_string(),
        });
    }
    remotes
}
