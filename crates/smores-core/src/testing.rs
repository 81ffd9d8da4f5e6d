//! In-memory collaborators for engine tests.
//!
//! `MockGit` scripts the gateway: it keeps a tiny model of a repository
//! (branch, remotes, tags, status, commits) and records every call so tests
//! can assert on ordering. Failures are injected per operation as the raw
//! text git would have printed.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use smores_git::{Error as GitError, GitOps, Remote, Result as GitResult, StatusEntry};

use crate::config::Settings;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::state::ProjectMetadata;
use crate::traits::{Document, Frontend, RepoChoice, Revision, Workspace};

#[derive(Default)]
struct MockGitState {
    workdir: PathBuf,
    is_repo: bool,
    toplevel: Option<PathBuf>,
    branch: String,
    config: HashMap<String, String>,
    remotes: Vec<Remote>,
    tags: Vec<String>,
    status: Vec<StatusEntry>,
    staged: Vec<String>,
    conflicted: Vec<String>,
    commits: Vec<String>,
    numstat: String,
    summary: String,
    details: HashMap<String, String>,
    failures: HashMap<&'static str, String>,
    calls: Vec<String>,
}

/// Scripted gateway.
pub struct MockGit {
    state: Mutex<MockGitState>,
}

impl MockGit {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockGitState {
                branch: "main".into(),
                ..MockGitState::default()
            }),
        }
    }

    /// A repository rooted at `root`.
    pub fn with_repo(root: impl Into<PathBuf>) -> Self {
        let git = Self::new();
        {
            let mut s = git.state.lock().unwrap();
            let root = root.into();
            s.is_repo = true;
            s.workdir.clone_from(&root);
            s.toplevel = Some(root);
        }
        git
    }

    pub fn set_remote(&self, name: &str, target: &str) {
        let mut s = self.state.lock().unwrap();
        s.remotes.retain(|r| r.name != name);
        s.remotes.push(Remote {
            name: name.into(),
            target: target.into(),
        });
    }

    pub fn set_toplevel(&self, root: Option<PathBuf>) {
        let mut s = self.state.lock().unwrap();
        s.is_repo = root.is_some();
        s.toplevel = root;
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .config
            .insert(key.into(), value.into());
    }

    /// Add a changed path to the working tree.
    pub fn touch(&self, path: &str) {
        self.push_status('?', '?', path);
    }

    pub fn push_status(&self, index: char, worktree: char, path: &str) {
        self.state.lock().unwrap().status.push(StatusEntry {
            index,
            worktree,
            path: path.into(),
            original_path: None,
        });
    }

    /// A staged rename, as porcelain reports it.
    pub fn push_rename(&self, path: &str, original: &str) {
        self.state.lock().unwrap().status.push(StatusEntry {
            index: 'R',
            worktree: ' ',
            path: path.into(),
            original_path: Some(original.into()),
        });
    }

    pub fn set_conflicted(&self, paths: &[&str]) {
        self.state.lock().unwrap().conflicted = paths.iter().map(|p| (*p).to_string()).collect();
    }

    pub fn add_tag(&self, name: &str) {
        self.state.lock().unwrap().tags.push(name.into());
    }

    pub fn set_diff(&self, numstat: &str, summary: &str, details: &[(&str, &str)]) {
        let mut s = self.state.lock().unwrap();
        s.numstat = numstat.into();
        s.summary = summary.into();
        s.details = details
            .iter()
            .map(|(p, d)| ((*p).to_string(), (*d).to_string()))
            .collect();
    }

    /// Make `op` fail with `output` on stdout until cleared.
    pub fn fail(&self, op: &'static str, output: &str) {
        self.state.lock().unwrap().failures.insert(op, output.into());
    }

    pub fn clear_failure(&self, op: &'static str) {
        self.state.lock().unwrap().failures.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls whose operation name is `op`.
    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    pub fn commits(&self) -> Vec<String> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn staged_history(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("add "))
            .collect()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state.lock().unwrap().tags.clone()
    }

    pub fn remotes(&self) -> Vec<Remote> {
        self.state.lock().unwrap().remotes.clone()
    }

    fn begin(&self, op: &'static str, args: &[&str]) -> GitResult<()> {
        let mut s = self.state.lock().unwrap();
        let mut call = op.to_string();
        for arg in args {
            call.push(' ');
            call.push_str(arg);
        }
        s.calls.push(call);
        match s.failures.get(op) {
            Some(output) => Err(GitError::CommandFailed {
                command: format!("git {op}"),
                code: Some(1),
                stdout: output.clone(),
                stderr: String::new(),
            }),
            None => Ok(()),
        }
    }
}

impl GitOps for MockGit {
    fn workdir(&self) -> PathBuf {
        self.state.lock().unwrap().workdir.clone()
    }

    fn set_workdir(&self, path: &Path) {
        self.state.lock().unwrap().workdir = path.to_path_buf();
    }

    async fn is_repository(&self) -> bool {
        self.begin("is_repository", &[]).is_ok() && self.state.lock().unwrap().is_repo
    }

    async fn show_toplevel(&self) -> GitResult<PathBuf> {
        self.begin("show_toplevel", &[])?;
        let s = self.state.lock().unwrap();
        s.toplevel
            .clone()
            .ok_or_else(|| GitError::NotARepository(s.workdir.clone()))
    }

    async fn init(&self) -> GitResult<()> {
        self.begin("init", &[])?;
        let mut s = self.state.lock().unwrap();
        s.is_repo = true;
        s.toplevel = Some(s.workdir.clone());
        Ok(())
    }

    async fn current_branch(&self) -> GitResult<String> {
        self.begin("current_branch", &[])?;
        Ok(self.state.lock().unwrap().branch.clone())
    }

    async fn config_value(&self, key: &str) -> GitResult<Option<String>> {
        self.begin("config_value", &[key])?;
        Ok(self.state.lock().unwrap().config.get(key).cloned())
    }

    async fn list_remotes(&self) -> GitResult<Vec<Remote>> {
        self.begin("list_remotes", &[])?;
        Ok(self.remotes())
    }

    async fn add_remote(&self, name: &str, target: &str) -> GitResult<()> {
        self.begin("add_remote", &[name, target])?;
        self.set_remote(name, target);
        Ok(())
    }

    async fn remove_remote(&self, name: &str) -> GitResult<()> {
        self.begin("remove_remote", &[name])?;
        self.state.lock().unwrap().remotes.retain(|r| r.name != name);
        Ok(())
    }

    async fn pull(&self, remote: &str, branch: &str) -> GitResult<()> {
        self.begin("pull", &[remote, branch])
    }

    async fn fetch_tags(&self, remote: &str, branch: &str) -> GitResult<()> {
        self.begin("fetch_tags", &[remote, branch])
    }

    async fn push(&self, remote: &str, branch: &str) -> GitResult<()> {
        self.begin("push", &[remote, branch])
    }

    async fn push_tags(&self, remote: &str) -> GitResult<()> {
        self.begin("push_tags", &[remote])
    }

    async fn add_annotated_tag(&self, name: &str, message: &str) -> GitResult<()> {
        self.begin("add_annotated_tag", &[name, message])?;
        let mut s = self.state.lock().unwrap();
        if s.tags.iter().any(|t| t == name) {
            return Err(GitError::CommandFailed {
                command: format!("git tag -a {name}"),
                code: Some(128),
                stdout: String::new(),
                stderr: format!("fatal: tag '{name}' already exists"),
            });
        }
        s.tags.push(name.into());
        Ok(())
    }

    async fn list_tags(&self) -> GitResult<Vec<String>> {
        self.begin("list_tags", &[])?;
        Ok(self.tags())
    }

    async fn status(&self, pathspec: &str) -> GitResult<Vec<StatusEntry>> {
        self.begin("status", &[pathspec])?;
        Ok(self.state.lock().unwrap().status.clone())
    }

    async fn conflicted_files(&self) -> GitResult<Vec<String>> {
        self.begin("conflicted_files", &[])?;
        Ok(self.state.lock().unwrap().conflicted.clone())
    }

    async fn add(&self, paths: &[String]) -> GitResult<()> {
        let args: Vec<&str> = paths.iter().map(String::as_str).collect();
        self.begin("add", &args)?;
        self.state.lock().unwrap().staged.extend_from_slice(paths);
        Ok(())
    }

    async fn commit(&self, message: &str) -> GitResult<()> {
        self.begin("commit", &[])?;
        let mut s = self.state.lock().unwrap();
        if s.staged.is_empty() {
            return Err(GitError::CommandFailed {
                command: "git commit".into(),
                code: Some(1),
                stdout: "nothing to commit, working tree clean".into(),
                stderr: String::new(),
            });
        }
        let staged = std::mem::take(&mut s.staged);
        s.status.retain(|e| !staged.contains(&e.path));
        s.commits.push(message.into());
        Ok(())
    }

    async fn diff_numstat(&self, range: &str, path: Option<&str>) -> GitResult<String> {
        self.begin("diff_numstat", &[range, path.unwrap_or("")])?;
        Ok(self.state.lock().unwrap().numstat.clone())
    }

    async fn diff_summary(&self, range: &str, path: Option<&str>) -> GitResult<String> {
        self.begin("diff_summary", &[range, path.unwrap_or("")])?;
        Ok(self.state.lock().unwrap().summary.clone())
    }

    async fn diff_detail(&self, range: &str, path: Option<&str>) -> GitResult<String> {
        self.begin("diff_detail", &[range, path.unwrap_or("")])?;
        let s = self.state.lock().unwrap();
        Ok(path
            .and_then(|p| s.details.get(p).cloned())
            .unwrap_or_default())
    }
}

/// Project held in memory.
pub struct MockWorkspace {
    dir: PathBuf,
    name: String,
    metadata: Mutex<ProjectMetadata>,
    exports: AtomicUsize,
    export_fails: AtomicBool,
}

impl MockWorkspace {
    pub fn new(dir: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            metadata: Mutex::new(ProjectMetadata::default()),
            exports: AtomicUsize::new(0),
            export_fails: AtomicBool::new(false),
        }
    }

    pub fn with_metadata(self, metadata: ProjectMetadata) -> Self {
        *self.metadata.lock().unwrap() = metadata;
        self
    }

    pub fn metadata(&self) -> ProjectMetadata {
        self.metadata.lock().unwrap().clone()
    }

    pub fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }

    pub fn fail_exports(&self) {
        self.export_fails.store(true, Ordering::SeqCst);
    }
}

impl Workspace for MockWorkspace {
    fn project_dir(&self) -> &Path {
        &self.dir
    }

    fn project_name(&self) -> &str {
        &self.name
    }

    fn export_all(&self) -> Result<()> {
        self.exports.fetch_add(1, Ordering::SeqCst);
        if self.export_fails.load(Ordering::SeqCst) {
            return Err(Error::Export("disk full".into()));
        }
        Ok(())
    }

    fn load_metadata(&self) -> Result<ProjectMetadata> {
        Ok(self.metadata())
    }

    fn save_metadata(&self, metadata: &ProjectMetadata) -> Result<()> {
        *self.metadata.lock().unwrap() = metadata.clone();
        Ok(())
    }
}

/// What the engine told the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendEvent {
    SyncStart,
    Healthy(bool),
    RemoteUse(bool),
    Error(String),
    Conflicts(Vec<String>),
    Asked(PathBuf),
}

/// Recording frontend with a preset repository choice.
#[derive(Default)]
pub struct MockFrontend {
    events: Mutex<Vec<FrontendEvent>>,
    choice: Mutex<Option<RepoChoice>>,
}

impl MockFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choosing(choice: RepoChoice) -> Self {
        let frontend = Self::default();
        *frontend.choice.lock().unwrap() = Some(choice);
        frontend
    }

    pub fn events(&self) -> Vec<FrontendEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: FrontendEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Frontend for MockFrontend {
    fn sync_start(&self) {
        self.record(FrontendEvent::SyncStart);
    }

    fn update_healthy(&self, healthy: bool) {
        self.record(FrontendEvent::Healthy(healthy));
    }

    fn update_remote_use(&self, in_use: bool) {
        self.record(FrontendEvent::RemoteUse(in_use));
    }

    fn show_error(&self, message: &str) {
        self.record(FrontendEvent::Error(message.into()));
    }

    fn show_conflicts(&self, paths: &[String]) {
        self.record(FrontendEvent::Conflicts(paths.to_vec()));
    }

    fn choose_repository_mode(&self, outer_root: &Path) -> Option<RepoChoice> {
        self.record(FrontendEvent::Asked(outer_root.to_path_buf()));
        *self.choice.lock().unwrap()
    }
}

pub type TestEngine = Engine<MockGit, MockWorkspace, MockFrontend>;

pub const PROJECT_DIR: &str = "/work/Widget";

/// Engine for project "Widget" that was never opened.
pub fn unopened_engine(git: MockGit) -> TestEngine {
    Engine::new(
        git,
        MockWorkspace::new(PROJECT_DIR, "Widget"),
        MockFrontend::new(),
        Settings::default(),
    )
}

/// Engine for project "Widget", reopened from metadata.
pub async fn open_engine_with(git: MockGit, remote: Option<&str>, settings: Settings) -> TestEngine {
    git.set_toplevel(Some(PROJECT_DIR.into()));
    let metadata = ProjectMetadata {
        git_in_use: true,
        repo_root: Some(PROJECT_DIR.into()),
        repo_pathspec: Some(".".into()),
        repo_remote: remote.map(String::from),
        ..ProjectMetadata::default()
    };
    let engine = Engine::new(
        git,
        MockWorkspace::new(PROJECT_DIR, "Widget").with_metadata(metadata),
        MockFrontend::new(),
        settings,
    );
    engine.initialise().await.unwrap();
    engine
}

pub async fn open_engine(git: MockGit) -> TestEngine {
    open_engine_with(git, None, Settings::default()).await
}

pub async fn open_engine_with_remote(git: MockGit, target: &str) -> TestEngine {
    open_engine_with(git, Some(target), Settings::default()).await
}

/// Fixed document.
pub struct MockDocument {
    pub id: u64,
    pub title: String,
    pub revision: Revision,
    pub trace_revision: Revision,
}

impl MockDocument {
    pub fn new(id: u64, title: &str, major: u32, minor: u32) -> Self {
        Self {
            id,
            title: title.into(),
            revision: Revision::new(major, minor, format!("Issue {major}-{minor}")),
            trace_revision: Revision::new(0, 1, "trace"),
        }
    }
}

impl Document for MockDocument {
    fn id(&self) -> u64 {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn latest_revision(&self, trace_report: bool) -> Revision {
        if trace_report {
            self.trace_revision.clone()
        } else {
            self.revision.clone()
        }
    }
}
