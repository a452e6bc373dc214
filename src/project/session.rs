use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::model::Project;
use super::store::ProjectStore;
use crate::error::Result;
use crate::events::{ChangeEvent, DesignerObserver};
use crate::ident::Transliterator;
use crate::schema::{Direction, FieldUpdate};

/// An editing session over one project.
///
/// The session owns the identifier deriver (and its cache), the path the
/// project is bound to, and the observers notified of each committed change.
/// A session starts unbound and becomes bound to a file after its first
/// save or when opened from disk.
pub struct Designer {
    project: Project,
    ident: Transliterator,
    store: ProjectStore,
    bound_path: Option<PathBuf>,
    autosave: bool,
    observers: Vec<Box<dyn DesignerObserver>>,
}

impl Designer {
    /// Start an unbound session over an existing in-memory project
    pub fn new(project: Project, store: ProjectStore) -> Self {
        Self {
            project,
            ident: Transliterator::new(),
            store,
            bound_path: None,
            autosave: false,
            observers: Vec::new(),
        }
    }

    /// Start a session over a new, empty project
    pub fn create(name: &str, store: ProjectStore) -> Result<Self> {
        let project = Project::new(name)?;
        let mut designer = Self::new(project, store);
        designer.notify(&ChangeEvent::ProjectCreated {
            name: designer.project.name.clone(),
        });
        Ok(designer)
    }

    /// Open a project file; the session is bound to that path
    pub fn open(path: &Path, store: ProjectStore) -> Result<Self> {
        let project = store.load(path)?;
        let mut designer = Self::new(project, store);
        designer.bound_path = Some(path.to_path_buf());
        designer.notify(&ChangeEvent::ProjectLoaded {
            path: path.to_path_buf(),
        });
        Ok(designer)
    }

    /// Save after every successful mutation
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn DesignerObserver>) {
        self.observers.push(observer);
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    pub fn ident(&self) -> &Transliterator {
        &self.ident
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn bound_path(&self) -> Option<&Path> {
        self.bound_path.as_deref()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Save to the bound path, or to the default path derived from the name
    pub fn save(&mut self) -> Result<PathBuf> {
        let bound = self.bound_path.clone();
        self.save_to(bound.as_deref())
    }

    /// Save to an explicit path and bind the session to it
    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf> {
        self.save_to(Some(path))
    }

    fn save_to(&mut self, path: Option<&Path>) -> Result<PathBuf> {
        let path = self.store.save(&mut self.project, path)?;
        self.bound_path = Some(path.clone());
        self.notify(&ChangeEvent::ProjectSaved { path: path.clone() });
        Ok(path)
    }

    fn notify(&mut self, event: &ChangeEvent) {
        debug!(%event, "Change committed");
        for observer in &mut self.observers {
            observer.on_change(event);
        }
    }

    /// Notify observers and write through when autosave is on
    fn commit(&mut self, event: ChangeEvent) -> Result<ChangeEvent> {
        self.notify(&event);
        if self.autosave {
            let path = self.save()?;
            info!(path = %path.display(), "Autosaved");
        }
        Ok(event)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn create_table(&mut self, name: &str) -> Result<ChangeEvent> {
        let table_id = self.project.create_table(&self.ident, name)?.id.clone();
        self.commit(ChangeEvent::TableCreated { table_id })
    }

    pub fn rename_table(&mut self, table_id: &str, new_name: &str) -> Result<ChangeEvent> {
        let name_en = self
            .project
            .rename_table(&self.ident, table_id, new_name)?
            .name_en
            .clone();
        self.commit(ChangeEvent::TableRenamed {
            table_id: table_id.to_string(),
            name_en,
        })
    }

    pub fn delete_table(&mut self, table_id: &str) -> Result<ChangeEvent> {
        let dangling = self.project.delete_table(table_id)?;
        self.commit(ChangeEvent::TableDeleted {
            table_id: table_id.to_string(),
            dangling,
        })
    }

    pub fn create_field(&mut self, table_id: &str, type_key: &str) -> Result<ChangeEvent> {
        let field_id = self
            .project
            .create_field(&self.ident, table_id, type_key)?
            .id
            .clone();
        self.commit(ChangeEvent::FieldCreated {
            table_id: table_id.to_string(),
            field_id,
        })
    }

    pub fn update_field(&mut self, table_id: &str, field_id: &str, update: &FieldUpdate) -> Result<ChangeEvent> {
        let dropped = self
            .project
            .update_field(&self.ident, table_id, field_id, update)?;
        self.commit(ChangeEvent::FieldUpdated {
            table_id: table_id.to_string(),
            field_id: field_id.to_string(),
            dropped,
        })
    }

    /// Reset a field and apply `update` to it as a single committed change
    pub fn reset_and_update_field(
        &mut self,
        table_id: &str,
        field_id: &str,
        update: &FieldUpdate,
    ) -> Result<ChangeEvent> {
        let dropped = self
            .project
            .reset_and_update_field(&self.ident, table_id, field_id, update)?;
        self.commit(ChangeEvent::FieldUpdated {
            table_id: table_id.to_string(),
            field_id: field_id.to_string(),
            dropped,
        })
    }

    pub fn reset_field(&mut self, table_id: &str, field_id: &str) -> Result<ChangeEvent> {
        self.project.reset_field(table_id, field_id)?;
        self.commit(ChangeEvent::FieldReset {
            table_id: table_id.to_string(),
            field_id: field_id.to_string(),
        })
    }

    /// `Ok(None)` when the field is already at the boundary
    pub fn move_field(&mut self, table_id: &str, field_id: &str, direction: Direction) -> Result<Option<ChangeEvent>> {
        match self.project.move_field(table_id, field_id, direction)? {
            Some((from, to)) => self
                .commit(ChangeEvent::FieldMoved {
                    table_id: table_id.to_string(),
                    field_id: field_id.to_string(),
                    from,
                    to,
                })
                .map(Some),
            None => Ok(None),
        }
    }

    /// `Ok(None)` when the field did not exist
    pub fn delete_field(&mut self, table_id: &str, field_id: &str) -> Result<Option<ChangeEvent>> {
        if !self.project.delete_field(table_id, field_id)? {
            return Ok(None);
        }
        self.commit(ChangeEvent::FieldDeleted {
            table_id: table_id.to_string(),
            field_id: field_id.to_string(),
        })
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[test]
    fn test_unbound_then_bound() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let mut designer = Designer::create("Demo", store).unwrap();
        assert!(designer.bound_path().is_none());

        let path = designer.save().unwrap();
        assert_eq!(path, dir.path().join("demo.ncp"));
        assert_eq!(designer.bound_path(), Some(path.as_path()));

        // Renaming the project does not move the bound file
        designer.project.name = "Renamed".into();
        assert_eq!(designer.save().unwrap(), path);
    }

    #[test]
    fn test_observers_see_commits() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let mut designer = Designer::create("Demo", store).unwrap();

        let seen: Rc<RefCell<Vec<ChangeEvent>>> = Rc::default();
        let sink = Rc::clone(&seen);
        designer.add_observer(Box::new(move |e: &ChangeEvent| sink.borrow_mut().push(e.clone())));

        let table = designer.create_table("Клиенты").unwrap();
        let table_id = table.table_id().unwrap().to_string();
        assert!(designer.create_table("").is_err());

        let field = designer.create_field(&table_id, "text").unwrap();
        let field_id = field.field_id().unwrap().to_string();
        assert_eq!(designer.move_field(&table_id, &field_id, Direction::Up).unwrap(), None);

        let events = seen.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ChangeEvent::TableCreated { table_id });
    }

    #[test]
    fn test_autosave_writes_through() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let mut designer = Designer::create("Склад", store).unwrap().with_autosave(true);

        designer.create_table("Товары").unwrap();
        let path = designer.bound_path().unwrap().to_path_buf();
        assert_eq!(path, dir.path().join("sklad.ncp"));

        let store = ProjectStore::new(dir.path()).unwrap();
        let reopened = Designer::open(&path, store).unwrap();
        assert_eq!(reopened.project().tables.len(), 1);
        assert_eq!(reopened.bound_path(), Some(path.as_path()));
    }

    #[test]
    fn test_rejected_reset_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let mut designer = Designer::create("Demo", store).unwrap().with_autosave(true);
        let table_id = designer
            .create_table("T")
            .unwrap()
            .table_id()
            .unwrap()
            .to_string();
        let field_id = designer
            .create_field(&table_id, "text")
            .unwrap()
            .field_id()
            .unwrap()
            .to_string();
        designer
            .update_field(&table_id, &field_id, &FieldUpdate::new().name("Код").required(true))
            .unwrap();
        let path = designer.bound_path().unwrap().to_path_buf();
        let on_disk = std::fs::read_to_string(&path).unwrap();

        let bad = FieldUpdate {
            validation_regex: Some(Some("([a-z".into())),
            ..FieldUpdate::default()
        };
        assert!(designer.reset_and_update_field(&table_id, &field_id, &bad).is_err());

        assert!(designer.project().field(&table_id, &field_id).unwrap().required);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);
    }

    #[test]
    fn test_delete_missing_field_is_silent() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::new(dir.path()).unwrap();
        let mut designer = Designer::create("Demo", store).unwrap();
        let table_id = designer
            .create_table("T")
            .unwrap()
            .table_id()
            .unwrap()
            .to_string();

        assert_eq!(designer.delete_field(&table_id, "field_0_tekst").unwrap(), None);
    }
}
