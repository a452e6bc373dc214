//! Project aggregate and its CRUD operations
//!
//! Every mutation either commits completely or leaves the project untouched:
//! the affected table is edited as a copy and swapped in only on success.

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::{DesignError, Result};
use crate::ident::Transliterator;
use crate::schema::table::{null_as_default, seq_of};
use crate::schema::{
    dangling_references, lookup_type, references_to, resolve_reference, sync_reference_lists,
    DanglingReference, Direction, Field, FieldRef, FieldUpdate, Table,
};

pub const DEFAULT_PROJECT_NAME: &str = "Без имени";
pub const DEFAULT_THEME: &str = "dark_blue";
pub const DEFAULT_DATABASE_TYPE: &str = "sqlite";

/// Current local time as an ISO-8601 string
pub fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// The aggregate root: metadata plus the ordered table list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created: String,
    #[serde(deserialize_with = "null_as_default")]
    pub modified: String,
    #[serde(deserialize_with = "null_as_default")]
    pub theme: String,
    #[serde(deserialize_with = "null_as_default")]
    pub database_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tables: Vec<Table>,
    /// Opaque designer data, carried through untouched
    #[serde(deserialize_with = "null_as_default")]
    pub forms: Vec<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub reports: Vec<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub menus: Vec<Value>,
    /// Next table index; never decreases
    #[serde(deserialize_with = "null_as_default")]
    pub table_seq: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROJECT_NAME.to_string(),
            description: String::new(),
            author: String::new(),
            created: String::new(),
            modified: String::new(),
            theme: DEFAULT_THEME.to_string(),
            database_type: DEFAULT_DATABASE_TYPE.to_string(),
            tables: Vec::new(),
            forms: Vec::new(),
            reports: Vec::new(),
            menus: Vec::new(),
            table_seq: 0,
            extra: Map::new(),
        }
    }
}

/// A problem found by [`Project::validate`]
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    UnnamedField(FieldRef),
    DuplicateFieldName { table_id: String, name_en: String },
    /// Reference field with no target table chosen
    MissingTarget(FieldRef),
    Dangling(DanglingReference),
    MissingDisplayField { field: FieldRef, display_field: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::UnnamedField(field) => write!(f, "{}: field has no name", field),
            Issue::DuplicateFieldName { table_id, name_en } => {
                write!(f, "{}: several fields are named '{}'", table_id, name_en)
            }
            Issue::MissingTarget(field) => write!(f, "{}: reference has no target table", field),
            Issue::Dangling(d) => write!(f, "{}: references missing table '{}'", d.source, d.target),
            Issue::MissingDisplayField {
                field,
                display_field,
            } => write!(f, "{}: display field '{}' does not exist", field, display_field),
        }
    }
}

impl Project {
    /// Create an empty project; the name must not be blank
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DesignError::validation("name", "project name must not be empty"));
        }

        let now = timestamp();
        Ok(Self {
            name: name.to_string(),
            created: now.clone(),
            modified: now,
            ..Self::default()
        })
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn table(&self, id: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| DesignError::not_found("Table", id))
    }

    fn table_index(&self, id: &str) -> Result<usize> {
        self.tables
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| DesignError::not_found("Table", id))
    }

    /// Find a table by id, then `name_en`, then `name_ru`
    pub fn find_table(&self, key: &str) -> Option<&Table> {
        let key = key.trim();
        self.tables
            .iter()
            .find(|t| t.id == key)
            .or_else(|| self.tables.iter().find(|t| t.name_en == key))
            .or_else(|| self.tables.iter().find(|t| t.name_ru == key))
    }

    pub fn field(&self, table_id: &str, field_id: &str) -> Result<&Field> {
        self.table(table_id)?
            .field(field_id)
            .ok_or_else(|| DesignError::not_found("Field", field_id))
    }

    /// `name_en` for a table, suffixed `_2`, `_3`, ... while another table uses it
    fn unique_name_en(&self, base: &str, exclude_id: Option<&str>) -> String {
        let taken = |candidate: &str| {
            self.tables
                .iter()
                .any(|t| Some(t.id.as_str()) != exclude_id && t.name_en == candidate)
        };

        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn derive_table_name(&self, ident: &Transliterator, name: &str, exclude_id: Option<&str>) -> Result<(String, String)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DesignError::validation("name", "table name must not be empty"));
        }

        let mut base = ident.derive(name);
        if base.is_empty() {
            base = "table".to_string();
        }
        Ok((name.to_string(), self.unique_name_en(&base, exclude_id)))
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub fn create_table(&mut self, ident: &Transliterator, name: &str) -> Result<&Table> {
        let (name_ru, name_en) = self.derive_table_name(ident, name, None)?;
        let next = self
            .table_seq
            .checked_add(1)
            .ok_or_else(|| DesignError::validation("table_seq", "no free table ids"))?;
        let id = format!("table_{}_{}", self.table_seq, name_en);

        self.table_seq = next;
        self.tables.push(Table::new(id.clone(), name_ru, name_en));
        debug!(table = %id, "Created table");

        self.table(&id)
    }

    pub fn rename_table(&mut self, ident: &Transliterator, table_id: &str, new_name: &str) -> Result<&Table> {
        let index = self.table_index(table_id)?;
        let (name_ru, name_en) = self.derive_table_name(ident, new_name, Some(table_id))?;

        let table = &mut self.tables[index];
        table.name_ru = name_ru;
        table.name_en = name_en;
        debug!(table = %table_id, name_en = %table.name_en, "Renamed table");

        Ok(&self.tables[index])
    }

    /// Remove a table. Reference fields elsewhere that pointed at it are kept
    /// as they are and returned so the caller can report them.
    pub fn delete_table(&mut self, table_id: &str) -> Result<Vec<FieldRef>> {
        let index = self.table_index(table_id)?;
        self.tables.remove(index);

        let dangling = references_to(&self.tables, table_id);
        self.sync_references();
        debug!(table = %table_id, dangling = dangling.len(), "Deleted table");

        Ok(dangling)
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Append a new field of the given type (id or display name)
    pub fn create_field(&mut self, ident: &Transliterator, table_id: &str, type_key: &str) -> Result<&Field> {
        let desc = lookup_type(type_key).ok_or_else(|| DesignError::UnknownType(type_key.to_string()))?;
        let index = self.table_index(table_id)?;

        let table = &mut self.tables[index];
        let field_id = table.push_field(desc.type_id, |s| ident.derive(s))?;
        debug!(table = %table_id, field = %field_id, "Created field");

        self.field(table_id, &field_id)
    }

    /// Merge a partial update into a field.
    /// Returns the property names that were dropped as foreign to the field's type.
    pub fn update_field(
        &mut self,
        ident: &Transliterator,
        table_id: &str,
        field_id: &str,
        update: &FieldUpdate,
    ) -> Result<Vec<String>> {
        self.modify_field(ident, table_id, field_id, update, false)
    }

    /// Reset a field to defaults and merge `update` into it as one change:
    /// if the update is rejected the field keeps its previous properties.
    pub fn reset_and_update_field(
        &mut self,
        ident: &Transliterator,
        table_id: &str,
        field_id: &str,
        update: &FieldUpdate,
    ) -> Result<Vec<String>> {
        self.modify_field(ident, table_id, field_id, update, true)
    }

    fn modify_field(
        &mut self,
        ident: &Transliterator,
        table_id: &str,
        field_id: &str,
        update: &FieldUpdate,
        reset: bool,
    ) -> Result<Vec<String>> {
        let index = self.table_index(table_id)?;
        let mut field = self.field(table_id, field_id)?.clone();

        if reset {
            field.reset();
        }
        let dropped = field.apply(update, |s| ident.derive(s))?;
        self.check_reference(&field, update)?;

        let table = &mut self.tables[index];
        if let Some(slot) = table.field_mut(field_id) {
            *slot = field;
        }
        self.sync_references();
        debug!(table = %table_id, field = %field_id, reset, dropped = ?dropped, "Updated field");

        Ok(dropped)
    }

    /// The reference target and display field named in `update` must exist
    fn check_reference(&self, field: &Field, update: &FieldUpdate) -> Result<()> {
        let Some(spec) = &field.reference else {
            return Ok(());
        };

        if let Some(Some(target)) = &update.reference_table {
            self.table(target)?;
        }
        if let Some(Some(display)) = &update.display_field {
            let target = spec.reference_table.as_deref().ok_or_else(|| {
                DesignError::validation("display_field", "choose a reference table first")
            })?;
            self.field(target, display)?;
        }
        Ok(())
    }

    /// Reset a field's properties to defaults, keeping id, names and type
    pub fn reset_field(&mut self, table_id: &str, field_id: &str) -> Result<()> {
        let index = self.table_index(table_id)?;
        let field = self.tables[index]
            .field_mut(field_id)
            .ok_or_else(|| DesignError::not_found("Field", field_id))?;

        field.reset();
        self.sync_references();
        debug!(table = %table_id, field = %field_id, "Reset field");
        Ok(())
    }

    /// Move a field one position. `Ok(None)` at a boundary.
    pub fn move_field(&mut self, table_id: &str, field_id: &str, direction: Direction) -> Result<Option<(usize, usize)>> {
        let index = self.table_index(table_id)?;
        let table = &mut self.tables[index];
        if table.field(field_id).is_none() {
            return Err(DesignError::not_found("Field", field_id));
        }

        let moved = table.move_field(field_id, direction);
        if let Some((from, to)) = moved {
            debug!(table = %table_id, field = %field_id, from, to, "Moved field");
        }
        Ok(moved)
    }

    /// Remove a field. Returns `false` when the field was already absent.
    pub fn delete_field(&mut self, table_id: &str, field_id: &str) -> Result<bool> {
        let index = self.table_index(table_id)?;
        let removed = self.tables[index].remove_field(field_id).is_some();

        if removed {
            self.sync_references();
            debug!(table = %table_id, field = %field_id, "Deleted field");
        }
        Ok(removed)
    }

    // =========================================================================
    // References & integrity
    // =========================================================================

    pub fn resolve_reference(&self, table_id: &str, field_id: &str) -> Result<&Table> {
        resolve_reference(&self.tables, table_id, field_id)
    }

    pub fn references_to(&self, table_id: &str) -> Vec<FieldRef> {
        references_to(&self.tables, table_id)
    }

    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        dangling_references(&self.tables)
    }

    /// Recompute every table's `references` / `referenced_by` lists
    pub fn sync_references(&mut self) {
        sync_reference_lists(&mut self.tables);
    }

    /// Bring counters and derived lists in line with the stored tables.
    /// Applied after loading a document that may predate the counters.
    pub(crate) fn normalize(&mut self) {
        let floor = self
            .tables
            .iter()
            .filter_map(|t| seq_of(&t.id, "table_"))
            .map(|n| n.saturating_add(1))
            .max()
            .unwrap_or(0)
            .max(u32::try_from(self.tables.len()).unwrap_or(u32::MAX));
        self.table_seq = self.table_seq.max(floor);

        for table in &mut self.tables {
            table.repair_field_seq();
        }
        self.sync_references();
    }

    /// Check the whole project for problems a user must fix
    pub fn validate(&self) -> Vec<Issue> {
        let mut issues = Vec::new();

        for table in &self.tables {
            let mut names: HashMap<&str, usize> = HashMap::new();

            for field in &table.fields {
                let here = || FieldRef::new(&table.id, &field.id);

                if field.name_ru.trim().is_empty() {
                    issues.push(Issue::UnnamedField(here()));
                } else {
                    *names.entry(field.name_en.as_str()).or_default() += 1;
                }

                if let Some(spec) = &field.reference {
                    match spec.reference_table.as_deref() {
                        None => issues.push(Issue::MissingTarget(here())),
                        Some(target) => {
                            if let (Ok(target), Some(display)) = (self.table(target), &spec.display_field) {
                                if target.field(display).is_none() {
                                    issues.push(Issue::MissingDisplayField {
                                        field: here(),
                                        display_field: display.clone(),
                                    });
                                }
                            }
                        }
                    }
                }
            }

            let mut duplicates: Vec<&str> = names
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(name, _)| name)
                .collect();
            duplicates.sort_unstable();
            issues.extend(duplicates.into_iter().map(|name_en| Issue::DuplicateFieldName {
                table_id: table.id.clone(),
                name_en: name_en.to_string(),
            }));
        }

        issues.extend(self.dangling_references().into_iter().map(Issue::Dangling));
        issues
    }
}
