use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::field::Field;
use super::registry::descriptor;
use super::types::FieldTypeId;
use crate::error::{DesignError, Result};

pub const DEFAULT_TABLE_ICON: &str = "📊";

/// Direction of a single-step field move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A user-defined table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTable", into = "RawTable")]
pub struct Table {
    pub id: String,
    pub name_ru: String,
    pub name_en: String,
    pub icon: String,
    pub fields: Vec<Field>,
    /// Field entries this version cannot read (e.g. a newer field type).
    /// Written back unchanged after the known fields.
    pub unsupported_fields: Vec<Value>,
    /// Tables this table's Reference fields point at
    pub references: Vec<String>,
    /// Tables whose Reference fields point here
    pub referenced_by: Vec<String>,
    /// Next field index; never decreases
    pub field_seq: u32,
    pub extra: Map<String, Value>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            id: String::new(),
            name_ru: String::new(),
            name_en: String::new(),
            icon: DEFAULT_TABLE_ICON.to_string(),
            fields: Vec::new(),
            unsupported_fields: Vec::new(),
            references: Vec::new(),
            referenced_by: Vec::new(),
            field_seq: 0,
            extra: Map::new(),
        }
    }
}

impl Table {
    pub fn new(id: impl Into<String>, name_ru: impl Into<String>, name_en: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name_ru: name_ru.into(),
            name_en: name_en.into(),
            ..Self::default()
        }
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Find a field by id, then `name_en`, then `name_ru`
    pub fn find_field(&self, key: &str) -> Option<&Field> {
        self.field(key)
            .or_else(|| self.fields.iter().find(|f| !f.name_en.is_empty() && f.name_en == key))
            .or_else(|| self.fields.iter().find(|f| !f.name_ru.is_empty() && f.name_ru == key))
    }

    /// Append a fresh, unnamed field and return its id.
    ///
    /// The id is `field_<seq>_<derived type name>`; the per-table sequence
    /// only grows, so ids of deleted fields are never reissued. Fails once
    /// the sequence is exhausted.
    pub fn push_field(&mut self, type_id: FieldTypeId, derive: impl Fn(&str) -> String) -> Result<String> {
        let next = self.field_seq.checked_add(1).ok_or_else(|| {
            DesignError::validation("field_seq", format!("table '{}' has no free field ids", self.id))
        })?;
        let id = format!(
            "field_{}_{}",
            self.field_seq,
            derive(descriptor(type_id).display_name)
        );
        self.field_seq = next;
        self.fields.push(Field::new(id.clone(), type_id));
        Ok(id)
    }

    /// Swap a field with its neighbour.
    /// Returns the old and new positions, or `None` at a boundary or for an unknown id.
    pub fn move_field(&mut self, id: &str, direction: Direction) -> Option<(usize, usize)> {
        let from = self.position(id)?;
        let to = match direction {
            Direction::Up => from.checked_sub(1)?,
            Direction::Down if from + 1 < self.fields.len() => from + 1,
            Direction::Down => return None,
        };
        self.fields.swap(from, to);
        Some((from, to))
    }

    /// Remove a field; absent ids are ignored
    pub fn remove_field(&mut self, id: &str) -> Option<Field> {
        let index = self.position(id)?;
        Some(self.fields.remove(index))
    }

    /// Distinct target table ids of this table's Reference fields, in field order
    pub fn reference_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for target in self.fields.iter().filter_map(Field::reference_target) {
            if !targets.iter().any(|t| t == target) {
                targets.push(target.to_string());
            }
        }
        targets
    }

    /// Raise `field_seq` above every index already used by a field id,
    /// unreadable entries included. Documents written without the counter
    /// would otherwise reissue ids.
    pub(crate) fn repair_field_seq(&mut self) {
        let known = self.fields.iter().map(|f| f.id.as_str());
        let unsupported = self
            .unsupported_fields
            .iter()
            .filter_map(|v| v.get("id").and_then(Value::as_str));

        let floor = known
            .chain(unsupported)
            .filter_map(|id| seq_of(id, "field_"))
            .map(|n| n.saturating_add(1))
            .max()
            .unwrap_or(0)
            .max(u32::try_from(self.fields.len()).unwrap_or(u32::MAX));
        self.field_seq = self.field_seq.max(floor);
    }
}

/// Parse the numeric part of `<prefix><n>_...`
pub(crate) fn seq_of(id: &str, prefix: &str) -> Option<u32> {
    let rest = id.strip_prefix(prefix)?;
    let digits = rest.split('_').next()?;
    digits.parse().ok()
}

/// Deserialize a value where an explicit `null` means "use the default"
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_icon() -> String {
    DEFAULT_TABLE_ICON.to_string()
}

/// Table object exactly as it appears in a project document
#[derive(Serialize, Deserialize)]
struct RawTable {
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name_ru: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name_en: String,
    #[serde(default = "default_icon", deserialize_with = "null_as_default")]
    icon: String,
    #[serde(default, deserialize_with = "null_as_default")]
    fields: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    references: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    referenced_by: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    field_seq: u32,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawTable> for Table {
    fn from(raw: RawTable) -> Self {
        let mut fields = Vec::with_capacity(raw.fields.len());
        let mut unsupported_fields = Vec::new();

        for value in raw.fields {
            match serde_json::from_value::<Field>(value.clone()) {
                Ok(field) => fields.push(field),
                Err(e) => {
                    warn!(table = %raw.id, error = %e, "Keeping unreadable field as is");
                    unsupported_fields.push(value);
                }
            }
        }

        let icon = if raw.icon.is_empty() { default_icon() } else { raw.icon };
        Table {
            id: raw.id,
            name_ru: raw.name_ru,
            name_en: raw.name_en,
            icon,
            fields,
            unsupported_fields,
            references: raw.references,
            referenced_by: raw.referenced_by,
            field_seq: raw.field_seq,
            extra: raw.extra,
        }
    }
}

impl From<Table> for RawTable {
    fn from(table: Table) -> Self {
        let mut fields: Vec<Value> = table
            .fields
            .into_iter()
            .filter_map(|f| serde_json::to_value(f).ok())
            .collect();
        fields.extend(table.unsupported_fields);

        RawTable {
            id: table.id,
            name_ru: table.name_ru,
            name_en: table.name_en,
            icon: table.icon,
            fields,
            references: table.references,
            referenced_by: table.referenced_by,
            field_seq: table.field_seq,
            extra: table.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::transliterate;

    fn table_with(n: usize) -> Table {
        let mut table = Table::new("table_0_klienty", "Клиенты", "klienty");
        for _ in 0..n {
            table.push_field(FieldTypeId::Text, transliterate).unwrap();
        }
        table
    }

    fn ids(table: &Table) -> Vec<&str> {
        table.fields.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_push_field_ids() {
        let mut table = table_with(2);
        assert_eq!(ids(&table), vec!["field_0_tekst", "field_1_tekst"]);

        let id = table.push_field(FieldTypeId::Integer, transliterate).unwrap();
        assert_eq!(id, "field_2_chislo_tseloe");
        assert_eq!(table.field_seq, 3);
    }

    #[test]
    fn test_ids_not_reissued_after_delete() {
        let mut table = table_with(3);
        table.remove_field("field_2_tekst");
        let id = table.push_field(FieldTypeId::Text, transliterate).unwrap();
        assert_eq!(id, "field_3_tekst");
    }

    #[test]
    fn test_move_field_boundaries() {
        let mut table = table_with(3);
        assert_eq!(table.move_field("field_0_tekst", Direction::Up), None);
        assert_eq!(table.move_field("field_2_tekst", Direction::Down), None);
        assert_eq!(table.move_field("missing", Direction::Down), None);

        assert_eq!(table.move_field("field_0_tekst", Direction::Down), Some((0, 1)));
        assert_eq!(ids(&table), vec!["field_1_tekst", "field_0_tekst", "field_2_tekst"]);

        table.move_field("field_0_tekst", Direction::Up);
        assert_eq!(ids(&table), vec!["field_0_tekst", "field_1_tekst", "field_2_tekst"]);
    }

    #[test]
    fn test_remove_field_idempotent() {
        let mut table = table_with(2);
        assert!(table.remove_field("field_0_tekst").is_some());
        assert!(table.remove_field("field_0_tekst").is_none());
        assert_eq!(ids(&table), vec!["field_1_tekst"]);
    }

    #[test]
    fn test_find_field() {
        let mut table = table_with(1);
        table.fields[0].name_ru = "Имя".into();
        table.fields[0].name_en = "imya".into();

        assert!(table.find_field("field_0_tekst").is_some());
        assert!(table.find_field("imya").is_some());
        assert!(table.find_field("Имя").is_some());
        assert!(table.find_field("").is_none());
    }

    #[test]
    fn test_repair_field_seq() {
        let mut table = table_with(0);
        table.fields.push(Field::new("field_7_tekst_7", FieldTypeId::Text));
        table.fields.push(Field::new("custom", FieldTypeId::Text));
        table.repair_field_seq();
        assert_eq!(table.field_seq, 8);
    }

    #[test]
    fn test_seq_of() {
        assert_eq!(seq_of("table_12_zakazy", "table_"), Some(12));
        assert_eq!(seq_of("field_0_tekst_0", "field_"), Some(0));
        assert_eq!(seq_of("field_x", "field_"), None);
        assert_eq!(seq_of("table_1", "field_"), None);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let table: Table = serde_json::from_str(r#"{"id": "t1", "name_ru": "Склад", "color": "red"}"#).unwrap();
        assert_eq!(table.icon, DEFAULT_TABLE_ICON);
        assert!(table.fields.is_empty());
        assert_eq!(table.extra.get("color"), Some(&Value::from("red")));
    }

    #[test]
    fn test_exhausted_field_seq() {
        let mut table = table_with(0);
        table.field_seq = u32::MAX;
        assert!(matches!(
            table.push_field(FieldTypeId::Text, transliterate),
            Err(DesignError::Validation { .. })
        ));
        assert!(table.fields.is_empty());

        let mut table = table_with(0);
        table.fields.push(Field::new("field_4294967295_x", FieldTypeId::Text));
        table.repair_field_seq();
        assert_eq!(table.field_seq, u32::MAX);
        assert!(table.push_field(FieldTypeId::Text, transliterate).is_err());
    }

    #[test]
    fn test_unknown_field_type_kept_as_is() {
        let table: Table = serde_json::from_value(serde_json::json!({
            "id": "table_0_a",
            "fields": [
                { "id": "field_0_tekst", "type_id": "text" },
                { "id": "field_5_shtrikhkod", "type_id": "barcode", "symbology": "ean13" }
            ]
        }))
        .unwrap();
        assert_eq!(ids(&table), vec!["field_0_tekst"]);
        assert_eq!(table.unsupported_fields.len(), 1);

        let mut table = table;
        table.repair_field_seq();
        assert_eq!(table.field_seq, 6);

        let out = serde_json::to_value(&table).unwrap();
        assert_eq!(out["fields"][1]["type_id"], "barcode");
        assert_eq!(out["fields"][1]["symbology"], "ean13");
    }

    #[test]
    fn test_null_collections_use_defaults() {
        let table: Table =
            serde_json::from_str(r#"{"id": "t1", "icon": null, "fields": null, "references": null}"#).unwrap();
        assert_eq!(table.icon, DEFAULT_TABLE_ICON);
        assert!(table.fields.is_empty());
        assert!(table.references.is_empty());
    }
}
