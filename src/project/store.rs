//! `.ncp` project documents on disk

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::model::{timestamp, Project, DEFAULT_DATABASE_TYPE, DEFAULT_PROJECT_NAME, DEFAULT_THEME};
use crate::config::DesignerConfig;
use crate::error::{DesignError, Result};
use crate::ident::file_stem;
use crate::schema::table::null_as_default;

/// Project file extension
pub const PROJECT_EXTENSION: &str = "ncp";

/// One entry of a projects directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub file: String,
    pub path: PathBuf,
    pub modified: String,
    pub description: String,
}

pub struct ProjectStore {
    projects_dir: PathBuf,
}

impl ProjectStore {
    /// Open a store rooted at `projects_dir`, creating the directory if needed
    pub fn new(projects_dir: impl Into<PathBuf>) -> Result<Self> {
        let projects_dir = projects_dir.into();
        fs::create_dir_all(&projects_dir).map_err(|e| DesignError::io(&projects_dir, e))?;
        Ok(Self { projects_dir })
    }

    pub fn from_config(config: &DesignerConfig) -> Result<Self> {
        Self::new(config.projects_dir.clone())
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Where a project is saved when no path has been bound yet
    pub fn default_path(&self, project: &Project) -> PathBuf {
        self.projects_dir
            .join(format!("{}.{}", file_stem(&project.name), PROJECT_EXTENSION))
    }

    /// Turn a user argument into a project path: an existing file as given,
    /// otherwise a project of that name inside the projects directory.
    pub fn locate(&self, name_or_path: &str) -> PathBuf {
        let given = Path::new(name_or_path);
        if given.is_file() {
            return given.to_path_buf();
        }
        if given.extension().and_then(|e| e.to_str()) == Some(PROJECT_EXTENSION) {
            return self.projects_dir.join(given);
        }
        self.projects_dir
            .join(format!("{}.{}", file_stem(name_or_path), PROJECT_EXTENSION))
    }

    /// Write the whole project, replacing any previous file atomically.
    ///
    /// `modified` and the derived reference lists are refreshed; on failure
    /// the in-memory project is left as it was.
    pub fn save(&self, project: &mut Project, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.default_path(project),
        };

        let mut snapshot = project.clone();
        snapshot.modified = timestamp();
        snapshot.sync_references();

        write_document(&snapshot, &path)?;
        *project = snapshot;

        info!(path = %path.display(), tables = project.tables.len(), "Saved project");
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<Project> {
        load_project(path)
    }

    /// Every readable project in the projects directory, sorted by file name.
    /// Only the top-level keys are read; files that are not JSON objects
    /// are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ProjectSummary>> {
        let entries = match fs::read_dir(&self.projects_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DesignError::io(&self.projects_dir, e)),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DesignError::io(&self.projects_dir, e))?;
            let path = entry.path();

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(PROJECT_EXTENSION) {
                continue;
            }

            match read_header(&path) {
                Ok(header) => summaries.push(ProjectSummary {
                    name: header.name,
                    file: entry.file_name().to_string_lossy().into_owned(),
                    path,
                    modified: header.modified,
                    description: header.description,
                }),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable project"),
            }
        }

        summaries.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(summaries)
    }
}

/// Top-level project metadata, read without touching the tables
#[derive(Deserialize, Default)]
#[serde(default)]
struct ProjectHeader {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    modified: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
}

fn read_header(path: &Path) -> Result<ProjectHeader> {
    let contents = fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| DesignError::parse(path, e))?;
    if !value.is_object() {
        return Err(DesignError::validation("document", "expected a JSON object"));
    }

    let mut header: ProjectHeader =
        serde_json::from_value(value).map_err(|e| DesignError::parse(path, e))?;
    if header.name.trim().is_empty() {
        header.name = DEFAULT_PROJECT_NAME.to_string();
    }
    Ok(header)
}

fn write_document(project: &Project, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| DesignError::io(&dir, e))?;

    let mut json = serde_json::to_string_pretty(project).map_err(|e| DesignError::parse(path, e))?;
    json.push('\n');

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| DesignError::io(&dir, e))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| DesignError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| DesignError::io(path, e.error))?;

    Ok(())
}

/// Read a project document; missing keys take their defaults
pub fn load_project(path: &Path) -> Result<Project> {
    let contents = fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
    let mut project: Project =
        serde_json::from_str(&contents).map_err(|e| DesignError::parse(path, e))?;

    if project.name.trim().is_empty() {
        project.name = DEFAULT_PROJECT_NAME.to_string();
    }
    if project.theme.is_empty() {
        project.theme = DEFAULT_THEME.to_string();
    }
    if project.database_type.is_empty() {
        project.database_type = DEFAULT_DATABASE_TYPE.to_string();
    }
    project.normalize();

    info!(path = %path.display(), tables = project.tables.len(), "Loaded project");
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_path_from_name() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let project = Project::new("Мой проект").unwrap();

        assert_eq!(store.default_path(&project), dir.path().join("moy_proekt.ncp"));
    }

    #[test]
    fn test_save_refreshes_modified() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let mut project = Project::new("Demo").unwrap();
        project.modified = "2000-01-01T00:00:00+00:00".into();

        let path = store.save(&mut project, None).unwrap();
        assert!(path.exists());
        assert_ne!(project.modified, "2000-01-01T00:00:00+00:00");

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, project);
    }

    #[test]
    fn test_document_is_pretty_utf8() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let mut project = Project::new("Склад").unwrap();

        let path = store.save(&mut project, None).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("\"name\": \"Склад\""));
        assert!(text.starts_with("{\n  \"name\""));
    }

    #[test]
    fn test_load_missing_keys_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.ncp");
        fs::write(&path, "{}").unwrap();

        let project = load_project(&path).unwrap();
        assert_eq!(project.name, DEFAULT_PROJECT_NAME);
        assert_eq!(project.theme, "dark_blue");
        assert_eq!(project.database_type, "sqlite");
        assert!(project.tables.is_empty());
    }

    #[test]
    fn test_load_null_keys_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nulls.ncp");
        fs::write(&path, r#"{"name": null, "theme": null, "tables": null, "menus": null}"#).unwrap();

        let project = load_project(&path).unwrap();
        assert_eq!(project.name, DEFAULT_PROJECT_NAME);
        assert_eq!(project.theme, "dark_blue");
        assert!(project.tables.is_empty());
        assert!(project.menus.is_empty());
    }

    #[test]
    fn test_list_reads_only_top_level_keys() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        fs::write(
            dir.path().join("odd.ncp"),
            r#"{"name": "Odd", "modified": "2024-01-01T00:00:00+03:00", "tables": 5}"#,
        )
        .unwrap();

        let summaries = store.list().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Odd");
        assert_eq!(summaries[0].modified, "2024-01-01T00:00:00+03:00");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_project(&dir.path().join("absent.ncp")),
            Err(DesignError::Io { .. })
        ));

        let path = dir.path().join("broken.ncp");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_project(&path), Err(DesignError::Parse { .. })));
    }

    #[test]
    fn test_list_skips_malformed() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();

        let mut b = Project::new("Beta").unwrap();
        store.save(&mut b, None).unwrap();
        let mut a = Project::new("Alpha").unwrap();
        a.description = "first".into();
        store.save(&mut a, None).unwrap();

        fs::write(dir.path().join("broken.ncp"), "[1, 2").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let summaries = store.list().unwrap();
        let files: Vec<_> = summaries.iter().map(|s| s.file.as_str()).collect();
        assert_eq!(files, vec!["alpha.ncp", "beta.ncp"]);
        assert_eq!(summaries[0].name, "Alpha");
        assert_eq!(summaries[0].description, "first");
    }

    #[test]
    fn test_locate() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();

        assert_eq!(store.locate("Demo"), dir.path().join("demo.ncp"));
        assert_eq!(store.locate("shop.ncp"), dir.path().join("shop.ncp"));
    }
}
