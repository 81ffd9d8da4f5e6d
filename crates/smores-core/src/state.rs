//! Project metadata persistence in the `.smores/` directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::traits::Workspace;

/// Version-control fields of the project file.
///
/// Other collaborators store their own fields in the same file; those are
/// carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    /// Version control has been started for this project.
    #[serde(default)]
    pub git_in_use: bool,

    /// Repository top-level directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<PathBuf>,

    /// Project folder relative to `repo_root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_pathspec: Option<String>,

    /// Remote URL or path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_remote: Option<String>,

    /// Fields owned by other collaborators.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// File-backed project: the `.smores/` directory inside the project folder.
#[derive(Debug)]
pub struct ProjectState {
    /// Canonical project directory.
    project_dir: PathBuf,
    /// Project name, defaults to the folder name.
    name: String,
}

impl ProjectState {
    /// Names within the project folder.
    const STATE_DIR: &'static str = ".smores";
    const PROJECT_FILE: &'static str = "project.json";
    const CONFIG_FILE: &'static str = "config.toml";

    /// Open the project at `project_dir`.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist.
    pub fn new(project_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = project_dir.as_ref();
        let project_dir = fs::canonicalize(dir)
            .map_err(|_| Error::ProjectNotFound(dir.to_path_buf()))?;
        if !project_dir.is_dir() {
            return Err(Error::ProjectNotFound(project_dir));
        }

        let name = project_dir
            .file_name()
            .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self { project_dir, name })
    }

    /// Override the project name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Path to the `.smores/` directory.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.project_dir.join(Self::STATE_DIR)
    }

    fn project_path(&self) -> PathBuf {
        self.state_dir().join(Self::PROJECT_FILE)
    }

    /// Path to the settings file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.state_dir().join(Self::CONFIG_FILE)
    }

    /// Check whether a project file has been written.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.project_path().exists()
    }

    /// Load engine settings, defaults when absent.
    ///
    /// # Errors
    /// Returns error if the settings file can't be parsed.
    pub fn load_settings(&self) -> Result<Settings> {
        Settings::load(self.config_path())
    }

    /// Load project metadata, defaults when absent.
    ///
    /// # Errors
    /// Returns error if the file can't be read or parsed.
    pub fn load_metadata(&self) -> Result<ProjectMetadata> {
        let path = self.project_path();
        if !path.exists() {
            return Ok(ProjectMetadata::default());
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| Error::ParseError {
            file: path,
            message: e.to_string(),
        })
    }

    /// Save project metadata.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save_metadata(&self, metadata: &ProjectMetadata) -> Result<()> {
        fs::create_dir_all(self.state_dir())?;
        let mut content = serde_json::to_string_pretty(metadata)?;
        content.push('\n');
        fs::write(self.project_path(), content)?;
        Ok(())
    }
}

impl Workspace for ProjectState {
    fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn project_name(&self) -> &str {
        &self.name
    }

    fn export_all(&self) -> Result<()> {
        // Documents are exported by the editor host; a bare project folder
        // has nothing beyond its metadata file.
        tracing::debug!(project = %self.name, "no exportable artifacts");
        Ok(())
    }

    fn load_metadata(&self) -> Result<ProjectMetadata> {
        self.load_metadata()
    }

    fn save_metadata(&self, metadata: &ProjectMetadata) -> Result<()> {
        self.save_metadata(metadata)
    }
}
