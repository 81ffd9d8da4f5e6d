//! Debounced commit batching.
//!
//! Edits call [`Engine::commit_changes`] with a one-line message. Messages
//! accumulate until the quiet window passes without another request, then
//! a single flush exports the project, stages what changed and commits with
//! every buffered line.
//!
//! ```text
//! Idle --push--> Pending(timer) --timer--> Flushing --done--> Idle
//!                   ^    |                    |
//!                   +push (restart timer)     +--push: queued for next Pending
//! ```

use serde::Serialize;
use smores_git::GitOps;

use crate::engine::{Engine, Timer, lock};
use crate::error::Result;
use crate::sync::SyncOutcome;
use crate::traits::{Frontend, Workspace};

/// Batcher phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    /// Nothing is waiting. A message retained from a failed flush may
    /// still be buffered.
    #[default]
    Idle,
    /// Messages are buffered and the debounce timer is running.
    Pending,
    /// A flush is staging and committing.
    Flushing,
}

/// Buffered commit messages and the debounce timer.
#[derive(Debug, Default)]
pub(crate) struct PendingCommit {
    message: String,
    queued: String,
    phase: BatchPhase,
    pub(crate) timer: Timer,
}

impl PendingCommit {
    /// Buffer a message. True when the debounce timer should (re)start.
    pub(crate) fn push(&mut self, message: &str) -> bool {
        if self.phase == BatchPhase::Flushing {
            self.queued.push_str(message);
            self.queued.push('\n');
            return false;
        }
        self.message.push_str(message);
        self.message.push('\n');
        self.phase = BatchPhase::Pending;
        true
    }

    /// Take the buffer for flushing, `None` when there is nothing to commit.
    pub(crate) fn begin_flush(&mut self) -> Option<String> {
        if self.message.is_empty() {
            return None;
        }
        self.timer.cancel();
        self.phase = BatchPhase::Flushing;
        Some(std::mem::take(&mut self.message))
    }

    /// End a flush, putting back a retained message ahead of anything
    /// queued meanwhile. True when queued requests need a new timer.
    pub(crate) fn finish_flush(&mut self, retained: Option<String>) -> bool {
        let queued = std::mem::take(&mut self.queued);
        let mut message = retained.unwrap_or_default();
        message.push_str(&queued);
        self.message = message;

        if queued.is_empty() {
            self.phase = BatchPhase::Idle;
            false
        } else {
            self.phase = BatchPhase::Pending;
            true
        }
    }
}

/// Why a flush did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No message buffered.
    Empty,
    /// No repository is open.
    NotOpen,
}

/// Result of one flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Nothing was attempted.
    Skipped {
        /// Why.
        reason: SkipReason,
    },

    /// Messages were buffered but no tracked path changed.
    NothingToCommit {
        /// The discarded message.
        message: String,
    },

    /// A commit was made and a sync followed.
    Committed {
        /// Commit message.
        message: String,
        /// Paths staged.
        paths: Vec<String>,
        /// Result of the sync the commit triggered.
        sync: SyncOutcome,
    },

    /// Staging or committing failed.
    Failed {
        /// Message that was being committed.
        message: String,
        /// The message was put back for the next flush.
        retained: bool,
        /// Raw failure.
        error: String,
    },
}

impl<G, W, F> Engine<G, W, F>
where
    G: GitOps + 'static,
    W: Workspace + 'static,
    F: Frontend + 'static,
{
    /// Buffer `message` and restart the quiet window.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn commit_changes(&self, message: &str) {
        let mut batch = lock(&self.inner.batch);
        if batch.push(message) {
            self.arm_flush_timer(&mut batch);
        }
    }

    /// Current batcher phase.
    #[must_use]
    pub fn batch_phase(&self) -> BatchPhase {
        lock(&self.inner.batch).phase
    }

    /// Messages waiting to be committed.
    #[must_use]
    pub fn pending_message(&self) -> String {
        let batch = lock(&self.inner.batch);
        format!("{}{}", batch.message, batch.queued)
    }

    fn arm_flush_timer(&self, batch: &mut PendingCommit) {
        if self.is_closed() {
            return;
        }
        let engine = self.clone();
        let delay = self.inner.settings.commit.debounce();
        batch.timer.arm(move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let current = lock(&engine.inner.batch).timer.claim(generation);
                if current {
                    engine.flush().await;
                }
            })
        });
    }

    /// Cancel the debounce timer and flush immediately.
    pub async fn flush_now(&self) -> FlushOutcome {
        lock(&self.inner.batch).timer.cancel();
        self.flush().await
    }

    /// Commit everything buffered, then sync.
    ///
    /// Export failures are logged and the flush continues with whatever
    /// is on disk. Paths in unresolved conflict are left unstaged.
    pub async fn flush(&self) -> FlushOutcome {
        if !self.is_open() {
            tracing::debug!("flush skipped: repository not open");
            return FlushOutcome::Skipped {
                reason: SkipReason::NotOpen,
            };
        }

        let mut outcome = {
            let _worktree = self.inner.worktree.lock().await;

            let message = lock(&self.inner.batch).begin_flush();
            let Some(message) = message else {
                return FlushOutcome::Skipped {
                    reason: SkipReason::Empty,
                };
            };

            let (outcome, retained) = match self.stage_and_commit(&message).await {
                Ok(Some(paths)) => (
                    FlushOutcome::Committed {
                        message,
                        paths,
                        sync: SyncOutcome::NotOpen,
                    },
                    None,
                ),
                Ok(None) => {
                    tracing::debug!("nothing to commit");
                    (FlushOutcome::NothingToCommit { message }, None)
                }
                Err(e) => {
                    let retain = self.inner.settings.commit.retain_on_failure;
                    tracing::warn!(error = %e, retained = retain, "commit failed");
                    (
                        FlushOutcome::Failed {
                            message: message.clone(),
                            retained: retain,
                            error: e.to_string(),
                        },
                        retain.then_some(message),
                    )
                }
            };

            let mut batch = lock(&self.inner.batch);
            if batch.finish_flush(retained) {
                self.arm_flush_timer(&mut batch);
            }
            outcome
        };

        if let FlushOutcome::Committed { sync, .. } = &mut outcome {
            *sync = self.sync_with_remote().await;
        }
        outcome
    }

    async fn stage_and_commit(&self, message: &str) -> Result<Option<Vec<String>>> {
        if let Err(e) = self.inner.workspace.export_all() {
            tracing::warn!(error = %e, "export failed, committing files on disk");
        }

        let pathspec = lock(&self.inner.repo).tracked_pathspec.clone();
        let conflicted = lock(&self.inner.sync).state.conflicted_paths.clone();

        let entries = self.inner.git.status(&pathspec).await?;
        let mut paths: Vec<String> = Vec::new();
        for entry in entries.iter().filter(|e| !e.is_ignored()) {
            if entry.is_unmerged() || conflicted.contains(&entry.path) {
                tracing::debug!(path = %entry.path, "leaving conflicted path unstaged");
                continue;
            }
            // A rename's source side is already staged; only the target exists.
            if !paths.contains(&entry.path) {
                paths.push(entry.path.clone());
            }
        }

        if paths.is_empty() {
            return Ok(None);
        }

        self.inner.git.add(&paths).await?;
        self.inner.git.commit(message).await?;
        tracing::info!(files = paths.len(), "committed changes");
        Ok(Some(paths))
    }
}
