//! Revision tags for issued documents.
//!
//! A tag name is a pure function of document id, title, trace-report flag
//! and revision, so the name of any issued revision can be re-derived at
//! any time without consulting history.

use serde::Serialize;
use smores_git::GitOps;

use crate::batcher::FlushOutcome;
use crate::engine::{Engine, Timer, lock};
use crate::error::{Error, Result};
use crate::traits::{Document, Frontend, Revision, Workspace};

/// An annotated tag to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Annotation, the revision detail.
    pub message: String,
}

/// Replace every character git or a shell could trip over with `_`.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Tag name for one issued revision.
///
/// `<TR_ if trace report><id>_<title>_revision_<MM>-<mm>`
#[must_use]
pub fn tag_name(id: u64, title: &str, trace_report: bool, revision: &Revision) -> String {
    let prefix = if trace_report { "TR_" } else { "" };
    format!(
        "{prefix}{id}_{}_revision_{}",
        sanitize_title(title),
        revision.issue_string()
    )
}

/// Name of the baseline tag created when version control starts.
#[must_use]
pub fn baseline_tag(prefix: &str, project_name: &str) -> String {
    format!("{prefix}{}", sanitize_title(project_name))
}

/// Tags waiting for the coalescing window to pass.
#[derive(Debug, Default)]
pub(crate) struct TagQueue {
    pending: Vec<Tag>,
    pub(crate) timer: Timer,
}

impl TagQueue {
    /// Queue a tag unless one with the same name is already waiting.
    fn enqueue(&mut self, tag: Tag) -> bool {
        if self.pending.iter().any(|t| t.name == tag.name) {
            return false;
        }
        self.pending.push(tag);
        true
    }
}

/// What happened to one queued tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TagResult {
    /// The tag was created.
    Created {
        /// Tag name.
        name: String,
    },
    /// A tag with this name was already in history.
    AlreadyExists {
        /// Tag name.
        name: String,
    },
    /// git refused.
    Failed {
        /// Tag name.
        name: String,
        /// Failure summary.
        error: String,
    },
}

/// Returned when a document is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReceipt {
    /// Tag queued for creation.
    pub tag: Tag,
    /// Flush forced before tagging.
    pub flush: FlushOutcome,
}

impl<G, W, F> Engine<G, W, F>
where
    G: GitOps + 'static,
    W: Workspace + 'static,
    F: Frontend + 'static,
{
    /// Baseline tag for this project.
    #[must_use]
    pub fn baseline_tag(&self) -> String {
        baseline_tag(
            &self.inner.settings.repository.baseline_prefix,
            self.inner.workspace.project_name(),
        )
    }

    /// Issue the latest revision of `document`.
    ///
    /// Pending edits are committed first so the tag points at them. The tag
    /// itself is created once the coalescing window passes, then a sync
    /// runs.
    ///
    /// # Errors
    /// Returns [`Error::NotOpen`] when no repository is open.
    pub async fn issue_document<D>(&self, document: &D, trace_report: bool) -> Result<IssueReceipt>
    where
        D: Document + ?Sized,
    {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }

        let revision = document.latest_revision(trace_report);
        let tag = Tag {
            name: tag_name(document.id(), document.title(), trace_report, &revision),
            message: revision.detail,
        };

        let flush = self.flush_now().await;

        {
            let mut queue = lock(&self.inner.tags);
            if !queue.enqueue(tag.clone()) {
                tracing::debug!(tag = %tag.name, "tag already queued");
            }
            self.arm_tag_timer(&mut queue);
        }

        Ok(IssueReceipt { tag, flush })
    }

    fn arm_tag_timer(&self, queue: &mut TagQueue) {
        if self.is_closed() {
            return;
        }
        let engine = self.clone();
        let delay = self.inner.settings.tag.debounce();
        queue.timer.arm(move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let current = lock(&engine.inner.tags).timer.claim(generation);
                if current {
                    engine.flush_tags().await;
                }
            })
        });
    }

    /// Create every queued tag now, then sync if any was created.
    pub async fn flush_tags(&self) -> Vec<TagResult> {
        let pending = {
            let mut queue = lock(&self.inner.tags);
            queue.timer.cancel();
            std::mem::take(&mut queue.pending)
        };
        if pending.is_empty() {
            return Vec::new();
        }
        if !self.is_open() {
            tracing::warn!(count = pending.len(), "dropping tags: repository not open");
            return Vec::new();
        }

        let results = {
            let _worktree = self.inner.worktree.lock().await;
            let git = &self.inner.git;

            let existing = git.list_tags().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not list tags");
                Vec::new()
            });

            let mut results = Vec::with_capacity(pending.len());
            for tag in pending {
                if existing.contains(&tag.name) {
                    tracing::debug!(tag = %tag.name, "tag exists");
                    results.push(TagResult::AlreadyExists { name: tag.name });
                    continue;
                }
                match git.add_annotated_tag(&tag.name, &tag.message).await {
                    Ok(()) => {
                        tracing::info!(tag = %tag.name, "created tag");
                        results.push(TagResult::Created { name: tag.name });
                    }
                    Err(e) => {
                        tracing::warn!(tag = %tag.name, error = %e, "tag creation failed");
                        results.push(TagResult::Failed {
                            name: tag.name,
                            error: e.to_string(),
                        });
                    }
                }
            }
            results
        };

        if results.iter().any(|r| matches!(r, TagResult::Created { .. })) {
            self.sync_with_remote().await;
        }
        results
    }

    /// Tag of the last issued revision of `document`.
    ///
    /// With `verify`, and an open repository, the tag must exist in
    /// history; otherwise the baseline tag is returned, meaning the
    /// document was never issued.
    pub async fn get_last_tag<D>(&self, document: &D, trace_report: bool, verify: bool) -> String
    where
        D: Document + ?Sized,
    {
        let revision = document.latest_revision(trace_report);
        let name = tag_name(document.id(), document.title(), trace_report, &revision);
        if !verify || !self.is_open() {
            return name;
        }

        match self.inner.git.list_tags().await {
            Ok(tags) if tags.contains(&name) => name,
            Ok(_) => {
                tracing::debug!(tag = %name, "never issued, using baseline");
                self.baseline_tag()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not list tags, using baseline");
                self.baseline_tag()
            }
        }
    }
}
