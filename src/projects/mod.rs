use std::path::{Path, PathBuf};

use crate::stats::child_dirs;

/// Project store validation and IO failures
#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Project '{0}' already exists.")]
    ProjectExists(String),

    #[error("Subproject '{subproject}' already exists under '{project}'.")]
    SubprojectExists { project: String, subproject: String },

    #[error("Project '{0}' does not exist.")]
    ParentNotFound(String),

    #[error("Subproject '{subproject}' does not exist under '{project}'.")]
    SubprojectNotFound { project: String, subproject: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProjectError {
    /// The name is already taken
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ProjectError::ProjectExists(_) | ProjectError::SubprojectExists { .. })
    }
}

/// Two-level project/subproject directory tree under an output root
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    /// Open the store, creating the root directory when missing
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let root = root.into();
        fs_err::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    pub fn subproject_dir(&self, project: &str, subproject: &str) -> PathBuf {
        self.root.join(project).join(subproject)
    }

    /// Sorted project names
    pub fn list_projects(&self) -> Result<Vec<String>, ProjectError> {
        Ok(child_dirs(&self.root)?)
    }

    /// Sorted subproject names; empty when the project does not exist
    pub fn list_subprojects(&self, project: &str) -> Result<Vec<String>, ProjectError> {
        Ok(child_dirs(&self.project_dir(project))?)
    }

    pub fn create_project(&self, name: &str) -> Result<PathBuf, ProjectError> {
        let path = self.project_dir(name);
        if path.exists() {
            return Err(ProjectError::ProjectExists(name.to_string()));
        }

        fs_err::create_dir(&path)?;
        tracing::info!("Project '{}' created", name);
        Ok(path)
    }

    pub fn create_subproject(&self, project: &str, name: &str) -> Result<PathBuf, ProjectError> {
        if !self.project_dir(project).is_dir() {
            return Err(ProjectError::ParentNotFound(project.to_string()));
        }

        let path = self.subproject_dir(project, name);
        if path.exists() {
            return Err(ProjectError::SubprojectExists {
                project: project.to_string(),
                subproject: name.to_string(),
            });
        }

        fs_err::create_dir(&path)?;
        tracing::info!("Subproject '{}' created under '{}'", name, project);
        Ok(path)
    }

    /// Directory transcripts should be written to.
    ///
    /// The root itself when no project is selected; otherwise the project or
    /// subproject directory, which must already exist.
    pub fn resolve_target(
        &self,
        project: Option<&str>,
        subproject: Option<&str>,
    ) -> Result<PathBuf, ProjectError> {
        let Some(project) = project else {
            return Ok(self.root.clone());
        };

        let project_dir = self.project_dir(project);
        if !project_dir.is_dir() {
            return Err(ProjectError::ParentNotFound(project.to_string()));
        }

        match subproject {
            None => Ok(project_dir),
            Some(subproject) => {
                let dir = project_dir.join(subproject);
                if !dir.is_dir() {
                    return Err(ProjectError::SubprojectNotFound {
                        project: project.to_string(),
                        subproject: subproject.to_string(),
                    });
                }
                Ok(dir)
            }
        }
    }
}
