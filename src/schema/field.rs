use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use super::format::FieldFormat;
use super::registry::{descriptor, lookup_type};
use super::types::{FieldTypeId, RelationType, ResultType, TypeDescriptor};
use crate::error::{DesignError, Result};

/// Relational metadata of a Reference field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSpec {
    /// Target table id. Stored by id only, never as a live link.
    pub reference_table: Option<String>,
    /// Field id of the target table shown in place of the record
    pub display_field: Option<String>,
    pub reference_filter: Option<String>,
    pub relation_type: RelationType,
}

/// Formula metadata of a Computed field
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedSpec {
    pub formula: Option<String>,
    pub result_type: ResultType,
    pub cache_result: bool,
}

impl Default for ComputedSpec {
    fn default() -> Self {
        Self {
            formula: None,
            result_type: ResultType::Text,
            cache_result: true,
        }
    }
}

/// A column definition of a user table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub struct Field {
    pub id: String,
    pub name_ru: String,
    pub name_en: String,
    pub type_id: FieldTypeId,
    pub required: bool,
    pub unique: bool,
    pub default: Option<Value>,
    pub format: FieldFormat,
    /// Present exactly when the type is Reference
    pub reference: Option<ReferenceSpec>,
    /// Present exactly when the type is Calculated
    pub computed: Option<ComputedSpec>,
    /// Hint text shown next to the input
    pub description: String,
    pub validation_regex: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Keys this version does not understand, kept for round-tripping
    pub extra: Map<String, Value>,
}

impl Field {
    /// Create a fresh, unnamed field of the given type
    pub fn new(id: impl Into<String>, type_id: FieldTypeId) -> Self {
        let desc = descriptor(type_id);
        Self {
            id: id.into(),
            name_ru: String::new(),
            name_en: String::new(),
            type_id,
            required: false,
            unique: false,
            default: None,
            format: FieldFormat::empty(type_id),
            reference: desc.is_reference().then(ReferenceSpec::default),
            computed: desc.is_computed().then(ComputedSpec::default),
            description: String::new(),
            validation_regex: None,
            min_value: None,
            max_value: None,
            extra: Map::new(),
        }
    }

    pub fn descriptor(&self) -> &'static TypeDescriptor {
        descriptor(self.type_id)
    }

    /// Display name of the field's type
    pub fn type_name(&self) -> &'static str {
        self.descriptor().display_name
    }

    pub fn is_reference(&self) -> bool {
        self.descriptor().is_reference()
    }

    pub fn is_computed(&self) -> bool {
        self.descriptor().is_computed()
    }

    /// Target table id of a Reference field, if one is set
    pub fn reference_target(&self) -> Option<&str> {
        self.reference
            .as_ref()
            .and_then(|r| r.reference_table.as_deref())
    }

    pub fn formula(&self) -> Option<&str> {
        self.computed.as_ref().and_then(|c| c.formula.as_deref())
    }

    /// Label used in listings: the display name, or the id while unnamed
    pub fn label(&self) -> &str {
        if self.name_ru.is_empty() {
            &self.id
        } else {
            &self.name_ru
        }
    }

    /// Reset every property to its default, keeping identity, names and type
    pub fn reset(&mut self) {
        let mut fresh = Field::new(self.id.clone(), self.type_id);
        fresh.name_ru = std::mem::take(&mut self.name_ru);
        fresh.name_en = std::mem::take(&mut self.name_en);
        fresh.extra = std::mem::take(&mut self.extra);
        *self = fresh;
    }

    /// Merge a partial update into this field.
    ///
    /// Returns the names of properties that do not apply to the field's type
    /// and were dropped. Callers apply this to a copy and commit on success.
    pub(crate) fn apply(
        &mut self,
        update: &FieldUpdate,
        derive: impl Fn(&str) -> String,
    ) -> Result<Vec<String>> {
        let mut dropped = Vec::new();

        if let Some(name) = &update.name_ru {
            let name = name.trim();
            self.name_ru = name.to_string();
            self.name_en = derive(name);
        }
        if let Some(required) = update.required {
            self.required = required;
        }
        if let Some(unique) = update.unique {
            self.unique = unique;
        }
        if let Some(default) = &update.default {
            self.default = match default {
                Some(value) => coerce_default(self.type_id, value)?,
                None => None,
            };
        }
        if let Some(map) = &update.format {
            let (format, stale) = FieldFormat::from_map(self.type_id, map);
            self.format = format;
            dropped.extend(stale);
        }

        match self.reference.as_mut() {
            Some(spec) => {
                if let Some(table) = &update.reference_table {
                    if spec.reference_table != *table {
                        // A different target invalidates the chosen display field
                        spec.display_field = None;
                    }
                    spec.reference_table = table.clone();
                }
                if let Some(display) = &update.display_field {
                    spec.display_field = display.clone();
                }
                if let Some(filter) = &update.reference_filter {
                    spec.reference_filter = filter.clone().filter(|f| !f.is_empty());
                }
                if let Some(relation) = update.relation_type {
                    spec.relation_type = relation;
                }
            }
            None => dropped.extend(update.reference_keys()),
        }

        match self.computed.as_mut() {
            Some(spec) => {
                if let Some(formula) = &update.formula {
                    spec.formula = formula.clone().filter(|f| !f.is_empty());
                }
                if let Some(result_type) = update.result_type {
                    spec.result_type = result_type;
                }
                if let Some(cache) = update.cache_result {
                    spec.cache_result = cache;
                }
            }
            None => dropped.extend(update.computed_keys()),
        }

        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(pattern) = &update.validation_regex {
            let pattern = pattern.clone().filter(|p| !p.is_empty());
            if let Some(p) = &pattern {
                Regex::new(p)
                    .map_err(|e| DesignError::validation("validation_regex", e.to_string()))?;
            }
            self.validation_regex = pattern;
        }
        if let Some(min) = update.min_value {
            self.min_value = min;
        }
        if let Some(max) = update.max_value {
            self.max_value = max;
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(DesignError::validation(
                    "min_value",
                    format!("minimum {} is greater than maximum {}", min, max),
                ));
            }
        }

        Ok(dropped)
    }
}

/// Coerce a user-entered default value to the field type.
/// Empty strings and null clear the default.
pub fn coerce_default(type_id: FieldTypeId, value: &Value) -> Result<Option<Value>> {
    let invalid = |expected: &str| {
        DesignError::validation(
            "default",
            format!("{} is not a valid {} for a {} field", value, expected, type_id),
        )
    };

    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => Some(s.trim()),
        _ => None,
    };

    match type_id {
        FieldTypeId::Integer | FieldTypeId::Rating => match (value, text) {
            (Value::Number(n), _) if n.is_i64() || n.is_u64() => Ok(Some(value.clone())),
            (_, Some(s)) => s
                .parse::<i64>()
                .map(|i| Some(Value::from(i)))
                .map_err(|_| invalid("integer")),
            _ => Err(invalid("integer")),
        },
        FieldTypeId::Float | FieldTypeId::Money | FieldTypeId::Percent => match (value, text) {
            (Value::Number(_), _) => Ok(Some(value.clone())),
            (_, Some(s)) => s
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(|n| Some(Value::Number(n)))
                .ok_or_else(|| invalid("number")),
            _ => Err(invalid("number")),
        },
        FieldTypeId::Boolean => match (value, text) {
            (Value::Bool(_), _) => Ok(Some(value.clone())),
            (_, Some(s)) => match s.to_lowercase().as_str() {
                "true" | "1" | "да" | "yes" => Ok(Some(Value::Bool(true))),
                "false" | "0" | "нет" | "no" => Ok(Some(Value::Bool(false))),
                _ => Err(invalid("boolean")),
            },
            _ => Err(invalid("boolean")),
        },
        FieldTypeId::Calculated => Err(DesignError::validation(
            "default",
            "computed fields cannot have a default value",
        )),
        FieldTypeId::List => match value {
            Value::String(_) => Ok(Some(value.clone())),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(Some(value.clone())),
            _ => Err(invalid("list option")),
        },
        _ => match value {
            Value::String(_) => Ok(Some(value.clone())),
            Value::Number(_) | Value::Bool(_) => Ok(Some(Value::String(value.to_string()))),
            _ => Err(invalid("text")),
        },
    }
}

/// Partial set of field properties, as produced by a property editor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub name_ru: Option<String>,
    pub required: Option<bool>,
    pub unique: Option<bool>,
    pub default: Option<Option<Value>>,
    /// Replaces the whole format; keys foreign to the type are dropped
    pub format: Option<Map<String, Value>>,
    pub reference_table: Option<Option<String>>,
    pub display_field: Option<Option<String>>,
    pub reference_filter: Option<Option<String>>,
    pub relation_type: Option<RelationType>,
    pub formula: Option<Option<String>>,
    pub result_type: Option<ResultType>,
    pub cache_result: Option<bool>,
    pub description: Option<String>,
    pub validation_regex: Option<Option<String>>,
    pub min_value: Option<Option<f64>>,
    pub max_value: Option<Option<f64>>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name_ru = Some(name.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(Some(value.into()));
        self
    }

    pub fn format(mut self, format: Map<String, Value>) -> Self {
        self.format = Some(format);
        self
    }

    /// Builder: point a Reference field at a table (by id)
    pub fn references(mut self, table_id: impl Into<String>) -> Self {
        self.reference_table = Some(Some(table_id.into()));
        self
    }

    pub fn display_field(mut self, field_id: impl Into<String>) -> Self {
        self.display_field = Some(Some(field_id.into()));
        self
    }

    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(Some(formula.into()));
        self
    }

    fn reference_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if self.reference_table.is_some() {
            keys.push("reference_table".to_string());
        }
        if self.display_field.is_some() {
            keys.push("display_field".to_string());
        }
        if self.reference_filter.is_some() {
            keys.push("reference_filter".to_string());
        }
        if self.relation_type.is_some() {
            keys.push("relation_type".to_string());
        }
        keys
    }

    fn computed_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if self.formula.is_some() {
            keys.push("formula".to_string());
        }
        if self.result_type.is_some() {
            keys.push("result_type".to_string());
        }
        if self.cache_result.is_some() {
            keys.push("cache_result".to_string());
        }
        keys
    }

    /// Build an update from a loose property object.
    ///
    /// Unrecognized property names are returned, not merged; a recognized
    /// property with a value of the wrong shape is a validation error.
    pub fn from_properties(props: &Map<String, Value>) -> Result<(Self, Vec<String>)> {
        let mut update = FieldUpdate::default();
        let mut unknown = Vec::new();

        for (key, value) in props {
            match key.as_str() {
                "name_ru" | "name" => update.name_ru = Some(expect_string(key, value)?),
                "required" => update.required = Some(expect_bool(key, value)?),
                "unique" => update.unique = Some(expect_bool(key, value)?),
                "default" => update.default = Some(Some(value.clone()).filter(|v| !v.is_null())),
                "format" => match value {
                    Value::Object(map) => update.format = Some(map.clone()),
                    Value::Null => update.format = Some(Map::new()),
                    _ => return Err(DesignError::validation(key, "expected an object")),
                },
                "reference_table" => update.reference_table = Some(optional_string(key, value)?),
                "display_field" => update.display_field = Some(optional_string(key, value)?),
                "reference_filter" => update.reference_filter = Some(optional_string(key, value)?),
                "relation_type" => update.relation_type = Some(parse_enum(key, value)?),
                "formula" => update.formula = Some(optional_string(key, value)?),
                "result_type" => update.result_type = Some(parse_enum(key, value)?),
                "cache_result" => update.cache_result = Some(expect_bool(key, value)?),
                "description" => update.description = Some(expect_string(key, value)?),
                "validation_regex" => update.validation_regex = Some(optional_string(key, value)?),
                "min_value" => update.min_value = Some(optional_number(key, value)?),
                "max_value" => update.max_value = Some(optional_number(key, value)?),
                _ => unknown.push(key.clone()),
            }
        }

        Ok((update, unknown))
    }
}

fn expect_string(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DesignError::validation(key, "expected a string"))
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| DesignError::validation(key, "expected true or false"))
}

fn optional_string(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(DesignError::validation(key, "expected a string or null")),
    }
}

fn optional_number(key: &str, value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DesignError::validation(key, "expected a number")),
        _ => Err(DesignError::validation(key, "expected a number or null")),
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| DesignError::validation(key, e.to_string()))
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// =============================================================================
// Document shape
// =============================================================================

/// Field object exactly as it appears in a project document
#[derive(Serialize, Deserialize)]
struct RawField {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name_ru: String,
    #[serde(default)]
    name_en: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    type_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    required: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    unique: Option<bool>,
    #[serde(default)]
    default: Value,
    #[serde(default, deserialize_with = "lenient")]
    format: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    reference_table: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    display_field: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    reference_filter: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    relation_type: Option<RelationType>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    result_type: Option<ResultType>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    cache_result: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    validation_regex: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    min_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    max_value: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawField> for Field {
    type Error = String;

    fn try_from(raw: RawField) -> std::result::Result<Self, Self::Error> {
        // Older documents only carry the display name in `type`
        let key = raw
            .type_id
            .clone()
            .or_else(|| raw.type_name.clone())
            .unwrap_or_default();
        let desc = lookup_type(&key)
            .ok_or_else(|| format!("field '{}' has unknown type {:?}", raw.id, key))?;

        let type_id = desc.type_id;
        let (format, _) = FieldFormat::from_map(type_id, &raw.format.unwrap_or_default());

        let reference = desc.is_reference().then(|| ReferenceSpec {
            reference_table: raw.reference_table,
            display_field: raw.display_field,
            reference_filter: raw.reference_filter,
            relation_type: raw.relation_type.unwrap_or_default(),
        });

        let computed = desc.is_computed().then(|| ComputedSpec {
            formula: raw.formula,
            result_type: raw.result_type.unwrap_or_default(),
            cache_result: raw.cache_result.unwrap_or(true),
        });

        Ok(Field {
            id: raw.id,
            name_ru: raw.name_ru,
            name_en: raw.name_en,
            type_id,
            required: raw.required.unwrap_or(false),
            unique: raw.unique.unwrap_or(false),
            default: Some(raw.default).filter(|v| !v.is_null()),
            format,
            reference,
            computed,
            description: raw.description.unwrap_or_default(),
            validation_regex: raw.validation_regex,
            min_value: raw.min_value,
            max_value: raw.max_value,
            extra: raw.extra,
        })
    }
}

impl From<Field> for RawField {
    fn from(field: Field) -> Self {
        let desc = field.descriptor();
        let reference = field.reference.unwrap_or_default();
        let computed = field.computed;

        RawField {
            id: field.id,
            name_ru: field.name_ru,
            name_en: field.name_en,
            type_name: Some(desc.display_name.to_string()),
            type_id: Some(desc.type_id.as_str().to_string()),
            required: Some(field.required),
            unique: Some(field.unique),
            default: field.default.unwrap_or(Value::Null),
            format: Some(field.format.to_map()),
            reference_table: reference.reference_table,
            display_field: reference.display_field,
            reference_filter: reference.reference_filter,
            relation_type: desc.is_reference().then_some(reference.relation_type),
            formula: computed.as_ref().and_then(|c| c.formula.clone()),
            result_type: computed.as_ref().map(|c| c.result_type),
            cache_result: computed.as_ref().map(|c| c.cache_result),
            description: Some(field.description).filter(|d| !d.is_empty()),
            validation_regex: field.validation_regex,
            min_value: field.min_value,
            max_value: field.max_value,
            extra: field.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::transliterate;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_new_field_defaults() {
        let field = Field::new("field_0_tekst", FieldTypeId::Text);
        assert_eq!(field.type_name(), "Текст");
        assert!(!field.required);
        assert!(field.format.is_empty());
        assert!(field.reference.is_none());
        assert!(field.computed.is_none());

        let reference = Field::new("field_1_ssylka", FieldTypeId::Reference);
        assert!(reference.reference.is_some());

        let computed = Field::new("field_2_vychislyaemoe", FieldTypeId::Calculated);
        assert!(computed.computed.as_ref().unwrap().cache_result);
    }

    #[test]
    fn test_apply_rederives_name() {
        let mut field = Field::new("field_0_tekst", FieldTypeId::Text);
        let dropped = field
            .apply(&FieldUpdate::new().name(" Имя ").required(true), transliterate)
            .unwrap();

        assert!(dropped.is_empty());
        assert_eq!(field.name_ru, "Имя");
        assert_eq!(field.name_en, "imya");
        assert!(field.required);
        assert_eq!(field.id, "field_0_tekst");
    }

    #[test]
    fn test_apply_drops_foreign_properties() {
        let mut field = Field::new("field_0_data", FieldTypeId::Date);
        let update = FieldUpdate::new()
            .format(object(json!({ "date_format": 2, "decimals": 4 })))
            .references("table_0_klienty")
            .formula("[Цена] * 2");

        let dropped = field.apply(&update, transliterate).unwrap();
        assert_eq!(dropped, vec!["decimals", "reference_table", "formula"]);
        assert_eq!(field.format.to_map(), object(json!({ "date_format": 2 })));
    }

    #[test]
    fn test_format_update_replaces_previous_keys() {
        let mut field = Field::new("field_0_dengi", FieldTypeId::Money);
        field
            .apply(
                &FieldUpdate::new().format(object(json!({ "currency": 2, "decimals": 0 }))),
                transliterate,
            )
            .unwrap();
        field
            .apply(
                &FieldUpdate::new().format(object(json!({ "thousands": false }))),
                transliterate,
            )
            .unwrap();

        assert_eq!(field.format.to_map(), object(json!({ "thousands": false })));
    }

    #[test]
    fn test_changing_reference_target_clears_display_field() {
        let mut field = Field::new("field_0_ssylka", FieldTypeId::Reference);
        field
            .apply(
                &FieldUpdate::new()
                    .references("table_0_a")
                    .display_field("field_0_tekst"),
                transliterate,
            )
            .unwrap();
        field
            .apply(&FieldUpdate::new().references("table_1_b"), transliterate)
            .unwrap();

        let spec = field.reference.as_ref().unwrap();
        assert_eq!(spec.reference_table.as_deref(), Some("table_1_b"));
        assert_eq!(spec.display_field, None);
    }

    #[test]
    fn test_apply_rejects_bad_regex_and_range() {
        let mut field = Field::new("field_0_tekst", FieldTypeId::Text);
        let update = FieldUpdate {
            validation_regex: Some(Some("([a-z".into())),
            ..FieldUpdate::default()
        };
        assert!(matches!(
            field.apply(&update, transliterate),
            Err(DesignError::Validation { .. })
        ));

        let mut field = Field::new("field_0_chislo_tseloe", FieldTypeId::Integer);
        let update = FieldUpdate {
            min_value: Some(Some(10.0)),
            max_value: Some(Some(1.0)),
            ..FieldUpdate::default()
        };
        assert!(field.apply(&update, transliterate).is_err());
    }

    #[test]
    fn test_coerce_default() {
        assert_eq!(
            coerce_default(FieldTypeId::Integer, &json!("42")).unwrap(),
            Some(json!(42))
        );
        assert_eq!(
            coerce_default(FieldTypeId::Money, &json!("10,5")).unwrap(),
            Some(json!(10.5))
        );
        assert_eq!(
            coerce_default(FieldTypeId::Boolean, &json!("Да")).unwrap(),
            Some(json!(true))
        );
        assert_eq!(coerce_default(FieldTypeId::Text, &json!("")).unwrap(), None);
        assert_eq!(
            coerce_default(FieldTypeId::Text, &json!(7)).unwrap(),
            Some(json!("7"))
        );
        assert!(coerce_default(FieldTypeId::Integer, &json!("seven")).is_err());
        assert!(coerce_default(FieldTypeId::Calculated, &json!("x")).is_err());
    }

    #[test]
    fn test_from_properties() {
        let props = object(json!({
            "name_ru": "Цена",
            "required": true,
            "default": "100",
            "widget_color": "blue"
        }));

        let (update, unknown) = FieldUpdate::from_properties(&props).unwrap();
        assert_eq!(update.name_ru.as_deref(), Some("Цена"));
        assert_eq!(update.required, Some(true));
        assert_eq!(update.default, Some(Some(json!("100"))));
        assert_eq!(unknown, vec!["widget_color"]);

        let bad = object(json!({ "required": "yes" }));
        assert!(FieldUpdate::from_properties(&bad).is_err());
    }

    #[test]
    fn test_document_shape() {
        let mut field = Field::new("field_0_tekst", FieldTypeId::Text);
        field.name_ru = "Имя".into();
        field.name_en = "imya".into();

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "Текст");
        assert_eq!(json["type_id"], "text");
        assert_eq!(json["required"], false);
        assert_eq!(json["default"], Value::Null);
        assert_eq!(json["format"], json!({}));
        assert!(json.get("reference_table").is_none());
        assert!(json.get("formula").is_none());
    }

    #[test]
    fn test_load_tolerates_legacy_and_unknown_keys() {
        let doc = json!({
            "id": "field_0_dengi_0",
            "name_ru": "Сумма",
            "type": "Деньги",
            "format": { "currency": 1, "date_format": 0 },
            "ui_width": 120
        });

        let field: Field = serde_json::from_value(doc).unwrap();
        assert_eq!(field.type_id, FieldTypeId::Money);
        assert_eq!(field.format.to_map(), object(json!({ "currency": 1 })));
        assert_eq!(field.extra.get("ui_width"), Some(&json!(120)));
        assert_eq!(field.default, None);

        let out = serde_json::to_value(&field).unwrap();
        assert_eq!(out["ui_width"], 120);
    }

    #[test]
    fn test_load_rejects_unknown_type() {
        let doc = json!({ "id": "field_0_x", "type_id": "hologram" });
        assert!(serde_json::from_value::<Field>(doc).is_err());
    }

    #[test]
    fn test_computed_round_trip() {
        let mut field = Field::new("field_3_vychislyaemoe", FieldTypeId::Calculated);
        field
            .apply(&FieldUpdate::new().formula("[Цена] * [Количество]"), transliterate)
            .unwrap();

        let json = serde_json::to_string(&field).unwrap();
        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
        assert_eq!(back.formula(), Some("[Цена] * [Количество]"));
    }
}
