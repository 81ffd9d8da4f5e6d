//! Change records between an issued revision and the current commit.

use std::fmt;

use regex::Regex;
use serde::Serialize;
use smores_git::GitOps;

use crate::engine::{Engine, lock};
use crate::error::{Error, Result};
use crate::traits::{Document, Frontend, Workspace};

/// How a file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modification {
    /// New file.
    Added,
    /// Content changed.
    Modified,
    /// File removed.
    Deleted,
    /// File moved, possibly with edits.
    Renamed,
    /// The summary had no usable code for this path.
    Unknown,
}

impl Modification {
    /// Map a `--name-status` code letter.
    #[must_use]
    pub const fn from_code(code: char) -> Self {
        match code {
            'A' => Self::Added,
            'M' => Self::Modified,
            'D' => Self::Deleted,
            'R' => Self::Renamed,
            _ => Self::Unknown,
        }
    }

    /// Unified-diff header lines preceding the first hunk.
    const fn header_lines(self) -> usize {
        match self {
            Self::Modified => 4,
            Self::Added | Self::Deleted => 5,
            Self::Renamed | Self::Unknown => 0,
        }
    }
}

impl fmt::Display for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Unknown => "unknown",
        };
        f.pad(name)
    }
}

/// One changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRecord {
    /// Path relative to the repository root.
    pub filepath: String,
    /// Lines added; zero for binary files.
    pub insertions: u64,
    /// Lines removed; zero for binary files.
    pub deletions: u64,
    /// Kind of change.
    pub modification: Modification,
    /// Hunks with the header trimmed and quotes escaped.
    pub detail: String,
}

/// A parsed `--numstat` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatEntry {
    /// Lines added.
    pub insertions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// Current path; the new side of a rename.
    pub path: String,
}

/// Parse `git diff --numstat` output, keeping git's order.
///
/// Binary files report `-` counts, read as zero. Renames are reported as
/// `old => new` or `dir/{old => new}/file`; the new path is kept.
#[must_use]
pub fn parse_numstat(raw: &str) -> Vec<NumstatEntry> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let insertions = fields.next()?;
            let deletions = fields.next()?;
            let path = fields.next()?.trim();
            if path.is_empty() {
                return None;
            }
            Some(NumstatEntry {
                insertions: insertions.trim().parse().unwrap_or(0),
                deletions: deletions.trim().parse().unwrap_or(0),
                path: rename_target(path),
            })
        })
        .collect()
}

fn rename_target(path: &str) -> String {
    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) {
        if open < close {
            if let Some((_, new)) = path[open + 1..close].split_once(" => ") {
                let joined = format!("{}{}{}", &path[..open], new, &path[close + 1..]);
                return joined.replace("//", "/");
            }
        }
    }
    match path.split_once(" => ") {
        Some((_, new)) => new.to_string(),
        None => path.to_string(),
    }
}

/// Find the modification of `path` in `--name-status` summary output.
///
/// The path is matched literally against the last field of each line.
/// No match, or a code outside `A`/`M`/`D`/`R`, gives
/// [`Modification::Unknown`].
#[must_use]
pub fn modification_for(path: &str, summary: &str) -> Modification {
    let pattern = format!(
        r"(?m)^([A-Z])[0-9]*\t(?:[^\t\n]*\t)?{}$",
        regex::escape(path)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(path, error = %e, "cannot build summary pattern");
            return Modification::Unknown;
        }
    };

    let Some(caps) = re.captures(summary) else {
        tracing::warn!(path, "no summary line for path");
        return Modification::Unknown;
    };

    let code = caps[1].chars().next().unwrap_or('?');
    let modification = Modification::from_code(code);
    if modification == Modification::Unknown {
        tracing::warn!(path, %code, "unrecognized change code");
    }
    modification
}

/// Drop the unified-diff header and escape quote characters.
#[must_use]
pub fn trim_detail(raw: &str, modification: Modification) -> String {
    let body: Vec<&str> = raw.lines().skip(modification.header_lines()).collect();
    body.join("\n")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

impl<G, W, F> Engine<G, W, F>
where
    G: GitOps + 'static,
    W: Workspace + 'static,
    F: Frontend + 'static,
{
    /// Changes to the managed tree since `document` was last issued.
    ///
    /// A document never issued is compared against the baseline tag.
    /// Records follow the order git reports files in.
    ///
    /// # Errors
    /// Returns [`Error::NotOpen`] when no repository is open, or the git
    /// error if a stat or summary query fails.
    pub async fn get_diff_records<D>(&self, document: &D, trace_report: bool) -> Result<Vec<DiffRecord>>
    where
        D: Document + ?Sized,
    {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }

        let tag = self.get_last_tag(document, trace_report, true).await;
        let range = format!("{tag}..HEAD");
        let pathspec = lock(&self.inner.repo).tracked_pathspec.clone();
        let scope = (pathspec != ".").then_some(pathspec.as_str());

        let _worktree = self.inner.worktree.lock().await;
        let git = &self.inner.git;

        let entries = parse_numstat(&git.diff_numstat(&range, scope).await?);
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let summary = git.diff_summary(&range, scope).await?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let modification = modification_for(&entry.path, &summary);
            let detail = match git.diff_detail(&range, Some(&entry.path)).await {
                Ok(raw) => trim_detail(&raw, modification),
                Err(e) => {
                    tracing::warn!(path = %entry.path, error = %e, "no detail for path");
                    String::new()
                }
            };
            records.push(DiffRecord {
                filepath: entry.path,
                insertions: entry.insertions,
                deletions: entry.deletions,
                modification,
                detail,
            });
        }

        tracing::debug!(%range, files = records.len(), "computed diff records");
        Ok(records)
    }
}
