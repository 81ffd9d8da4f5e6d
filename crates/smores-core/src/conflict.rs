//! Classification of failed pull output.
//!
//! [`classify`] is pure: it reads the text git printed and reports which
//! paths conflicted and whether any line was not understood. When the text
//! says an earlier conflict is still unresolved, the paths are not in the
//! text at all; [`resolve_conflicts`] performs that live query explicitly.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use smores_git::GitOps;

/// Structured result of classifying failure text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictOutcome {
    /// Paths with merge conflicts, in the order first reported.
    pub conflicted_paths: Vec<String>,

    /// The tool refused to pull because a previous conflict is unresolved.
    pub unresolved_previous: bool,

    /// Lines that matched no known pattern.
    pub unrecognized: Vec<String>,
}

impl ConflictOutcome {
    /// Some line matched no known pattern.
    #[must_use]
    pub fn has_unrecognized_lines(&self) -> bool {
        !self.unrecognized.is_empty()
    }

    /// The text describes a merge conflict, new or left over.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicted_paths.is_empty() || self.unresolved_previous
    }

    fn push_path(&mut self, path: &str) {
        let path = path.trim();
        if !path.is_empty() && !self.conflicted_paths.iter().any(|p| p == path) {
            self.conflicted_paths.push(path.to_string());
        }
    }
}

#[allow(clippy::expect_used)]
fn content_conflict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^CONFLICT \([^)]*\): Merge conflict in (.+)$").expect("valid regex")
    })
}

#[allow(clippy::expect_used)]
fn delete_conflict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^CONFLICT \((?:modify/delete|delete/modify|rename/delete)\): (.+?) deleted in ")
            .expect("valid regex")
    })
}

#[allow(clippy::expect_used)]
fn auto_merging_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Auto-merging (.+)$").expect("valid regex"))
}

#[allow(clippy::expect_used)]
fn previous_conflict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(you have unmerged files|Exiting because of an unresolved conflict|You have not concluded your merge|Exiting because of unfinished merge)",
        )
        .expect("valid regex")
    })
}

#[allow(clippy::expect_used)]
fn boilerplate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(From \S|\* (branch|tag|\[new (branch|tag)\])|[+ ]?[0-9a-f]{7,}\.{2,3}[0-9a-f]{7,} |hint:|Automatic merge failed|Please,? commit your changes|Already up to date|Merge made by|Fast-forward)",
        )
        .expect("valid regex")
    })
}

/// Classify raw failure text from a pull.
///
/// Every non-empty line is either a conflict report, a benign merge
/// notice, instructional boilerplate, or unrecognized. Unrecognized lines
/// are logged and collected; they never stop classification.
#[must_use]
pub fn classify(raw: &str) -> ConflictOutcome {
    let mut outcome = ConflictOutcome::default();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = content_conflict_re().captures(line) {
            outcome.push_path(&caps[1]);
        } else if let Some(caps) = delete_conflict_re().captures(line) {
            outcome.push_path(&caps[1]);
        } else if previous_conflict_re().is_match(line) {
            outcome.unresolved_previous = true;
        } else if auto_merging_re().is_match(line) || boilerplate_re().is_match(line) {
            continue;
        } else {
            tracing::warn!(line, "unrecognized git output");
            outcome.unrecognized.push(line.to_string());
        }
    }

    outcome
}

/// Fill in conflicted paths for a leftover conflict by asking git.
///
/// Outcomes that already name their paths are returned unchanged. A failed
/// query is logged and leaves the outcome as classified.
pub async fn resolve_conflicts<G: GitOps>(git: &G, mut outcome: ConflictOutcome) -> ConflictOutcome {
    if !outcome.unresolved_previous {
        return outcome;
    }

    match git.conflicted_files().await {
        Ok(paths) => {
            for path in &paths {
                outcome.push_path(path);
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not list conflicted files"),
    }
    outcome
}
