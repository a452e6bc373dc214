use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable overriding the default projects directory
pub const PROJECTS_DIR_ENV: &str = "NOCODE_PROJECTS_DIR";

/// Settings of a designer session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignerConfig {
    /// Directory holding `.ncp` project files
    pub projects_dir: PathBuf,
    /// Save after every successful mutation
    pub autosave: bool,
}

impl DesignerConfig {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            autosave: false,
        }
    }

    /// Resolve the projects directory: explicit value, then
    /// `NOCODE_PROJECTS_DIR`, then the platform data directory.
    pub fn resolve(custom_dir: Option<PathBuf>) -> Result<Self> {
        let projects_dir = match custom_dir {
            Some(dir) => dir,
            None => match std::env::var_os(PROJECTS_DIR_ENV) {
                Some(dir) if !dir.is_empty() => PathBuf::from(dir),
                _ => default_projects_dir()?,
            },
        };

        Ok(Self::new(projects_dir))
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }
}

/// `<platform data dir>/projects`
pub fn default_projects_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "nocode-designer")
        .context("Could not determine projects directory")?;
    Ok(proj_dirs.data_dir().join("projects"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let config = DesignerConfig::resolve(Some(PathBuf::from("/tmp/designs"))).unwrap();
        assert_eq!(config.projects_dir, PathBuf::from("/tmp/designs"));
        assert!(!config.autosave);
    }

    #[test]
    fn test_with_autosave() {
        let config = DesignerConfig::new("p").with_autosave(true);
        assert!(config.autosave);
    }
}
