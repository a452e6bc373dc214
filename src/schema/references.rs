//! Weak, id-based links between tables
//!
//! A Reference field stores only the target table id. Nothing keeps the
//! target alive: deleting a table leaves dependent fields in place, and
//! resolution reports them as dangling.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::table::Table;
use crate::error::{DesignError, Result};

/// Location of a field inside a project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub table_id: String,
    pub field_id: String,
}

impl FieldRef {
    pub fn new(table_id: impl Into<String>, field_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            field_id: field_id.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table_id, self.field_id)
    }
}

/// A Reference field whose target table no longer exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub source: FieldRef,
    pub target: String,
}

/// Find the table a Reference field points at.
/// A Reference field with no target chosen yet is a `Validation` error.
pub fn resolve_reference<'a>(tables: &'a [Table], table_id: &str, field_id: &str) -> Result<&'a Table> {
    let table = tables
        .iter()
        .find(|t| t.id == table_id)
        .ok_or_else(|| DesignError::not_found("Table", table_id))?;
    let field = table
        .field(field_id)
        .ok_or_else(|| DesignError::not_found("Field", field_id))?;

    if !field.is_reference() {
        return Err(DesignError::validation(
            "reference_table",
            format!("field '{}' is not a reference", field_id),
        ));
    }

    let target = field
        .reference_target()
        .ok_or_else(|| DesignError::validation("reference_table", "no target table chosen"))?;
    tables
        .iter()
        .find(|t| t.id == target)
        .ok_or_else(|| DesignError::DanglingReference {
            table_id: table_id.to_string(),
            field_id: field_id.to_string(),
            target: target.to_string(),
        })
}

/// Every Reference field in the project that targets `table_id`.
/// Self-references are included.
pub fn references_to(tables: &[Table], table_id: &str) -> Vec<FieldRef> {
    tables
        .iter()
        .flat_map(|t| {
            t.fields
                .iter()
                .filter(|f| f.reference_target() == Some(table_id))
                .map(move |f| FieldRef::new(&t.id, &f.id))
        })
        .collect()
}

/// Reference fields whose target id names no existing table.
/// Fields with no target chosen yet are not dangling.
pub fn dangling_references(tables: &[Table]) -> Vec<DanglingReference> {
    let known: HashSet<&str> = tables.iter().map(|t| t.id.as_str()).collect();

    tables
        .iter()
        .flat_map(|t| {
            let known = &known;
            t.fields.iter().filter_map(move |f| {
                let target = f.reference_target()?;
                (!known.contains(target)).then(|| DanglingReference {
                    source: FieldRef::new(&t.id, &f.id),
                    target: target.to_string(),
                })
            })
        })
        .collect()
}

/// Recompute every table's `references` and `referenced_by` lists from its fields.
///
/// Only existing tables appear in the lists; dangling targets are left out.
pub fn sync_reference_lists(tables: &mut [Table]) {
    let known: HashSet<String> = tables.iter().map(|t| t.id.clone()).collect();
    let mut reverse: HashMap<String, Vec<String>> = HashMap::new();

    for table in tables.iter_mut() {
        let targets: Vec<String> = table
            .reference_targets()
            .into_iter()
            .filter(|t| known.contains(t))
            .collect();

        for target in &targets {
            reverse.entry(target.clone()).or_default().push(table.id.clone());
        }
        table.references = targets;
    }

    for table in tables.iter_mut() {
        table.referenced_by = reverse.remove(&table.id).unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::transliterate;
    use crate::schema::field::FieldUpdate;
    use crate::schema::types::FieldTypeId;

    fn link(table: &mut Table, target: &str) -> String {
        let id = table.push_field(FieldTypeId::Reference, transliterate).unwrap();
        table
            .field_mut(&id)
            .unwrap()
            .apply(&FieldUpdate::new().references(target), transliterate)
            .unwrap();
        id
    }

    fn project() -> Vec<Table> {
        let mut a = Table::new("table_0_a", "А", "a");
        let b = Table::new("table_1_b", "Б", "b");
        link(&mut a, "table_1_b");
        vec![a, b]
    }

    #[test]
    fn test_resolve_reference() {
        let tables = project();
        let target = resolve_reference(&tables, "table_0_a", "field_0_ssylka").unwrap();
        assert_eq!(target.id, "table_1_b");
    }

    #[test]
    fn test_dangling_after_target_removed() {
        let mut tables = project();
        tables.retain(|t| t.id != "table_1_b");

        let err = resolve_reference(&tables, "table_0_a", "field_0_ssylka").unwrap_err();
        assert!(matches!(err, DesignError::DanglingReference { ref target, .. } if target == "table_1_b"));

        let dangling = dangling_references(&tables);
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].source, FieldRef::new("table_0_a", "field_0_ssylka"));
    }

    #[test]
    fn test_non_reference_field() {
        let mut tables = project();
        tables[1].push_field(FieldTypeId::Text, transliterate).unwrap();
        assert!(matches!(
            resolve_reference(&tables, "table_1_b", "field_0_tekst"),
            Err(DesignError::Validation { .. })
        ));
    }

    #[test]
    fn test_unset_target_is_not_dangling() {
        let mut tables = project();
        let id = tables[1].push_field(FieldTypeId::Reference, transliterate).unwrap();

        assert!(matches!(
            resolve_reference(&tables, "table_1_b", &id),
            Err(DesignError::Validation { ref field, .. }) if field == "reference_table"
        ));
        assert!(dangling_references(&tables).is_empty());
    }

    #[test]
    fn test_references_to_includes_self() {
        let mut tables = project();
        link(&mut tables[1], "table_1_b");

        let refs = references_to(&tables, "table_1_b");
        assert_eq!(
            refs,
            vec![
                FieldRef::new("table_0_a", "field_0_ssylka"),
                FieldRef::new("table_1_b", "field_0_ssylka"),
            ]
        );
    }

    #[test]
    fn test_sync_reference_lists() {
        let mut tables = project();
        // Cycle back from B to A
        link(&mut tables[1], "table_0_a");
        link(&mut tables[1], "table_9_gone");

        sync_reference_lists(&mut tables);
        assert_eq!(tables[0].references, vec!["table_1_b"]);
        assert_eq!(tables[0].referenced_by, vec!["table_1_b"]);
        assert_eq!(tables[1].references, vec!["table_0_a"]);
        assert_eq!(tables[1].referenced_by, vec!["table_0_a"]);
    }
}
