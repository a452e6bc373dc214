//! Type-specific format configuration of a field
//!
//! Every format section is a fixed record of the keys the registry declares
//! for it. Values are optional: a key that was never edited is absent from
//! the stored document and reads back as the registry default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::registry::descriptor;
use super::types::{FieldTypeId, FormatDefault, FormatSection};

/// Deserialize a key, treating a value of the wrong shape as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub case: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub trim: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub multiline: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub number_format: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub negative_parens: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub negative_red: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoneyFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub currency: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub thousands: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub percent_format: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub date_format: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub time_format: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatetimeFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub datetime_format: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub boolean_format: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub true_text: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub false_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub list_type: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sort_type: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub phone_format: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub lowercase: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub trim: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlFormat {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub add_protocol: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub lowercase: Option<bool>,
}

/// Format configuration, one variant per format section
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFormat {
    Text(TextFormat),
    Number(NumberFormat),
    Money(MoneyFormat),
    Percent(PercentFormat),
    Date(DateFormat),
    Time(TimeFormat),
    Datetime(DatetimeFormat),
    Boolean(BooleanFormat),
    List(ListFormat),
    Phone(PhoneFormat),
    Email(EmailFormat),
    Url(UrlFormat),
    None,
}

impl Default for FieldFormat {
    fn default() -> Self {
        FieldFormat::None
    }
}

fn record<T: DeserializeOwned + Default>(map: Map<String, Value>) -> T {
    serde_json::from_value(Value::Object(map)).unwrap_or_default()
}

fn to_object<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

impl FieldFormat {
    /// Empty format (no explicit keys) for a field type
    pub fn empty(type_id: FieldTypeId) -> Self {
        Self::build(type_id.format_section(), Map::new())
    }

    fn build(section: FormatSection, map: Map<String, Value>) -> Self {
        match section {
            FormatSection::Text => FieldFormat::Text(record(map)),
            FormatSection::Number => FieldFormat::Number(record(map)),
            FormatSection::Money => FieldFormat::Money(record(map)),
            FormatSection::Percent => FieldFormat::Percent(record(map)),
            FormatSection::Date => FieldFormat::Date(record(map)),
            FormatSection::Time => FieldFormat::Time(record(map)),
            FormatSection::Datetime => FieldFormat::Datetime(record(map)),
            FormatSection::Boolean => FieldFormat::Boolean(record(map)),
            FormatSection::List => FieldFormat::List(record(map)),
            FormatSection::Phone => FieldFormat::Phone(record(map)),
            FormatSection::Email => FieldFormat::Email(record(map)),
            FormatSection::Url => FieldFormat::Url(record(map)),
            FormatSection::None => FieldFormat::None,
        }
    }

    /// Build a format for `type_id` from a loose key/value map.
    ///
    /// Keys the registry does not recognize for the type, and recognized keys
    /// whose value has the wrong shape, are dropped. The dropped key names
    /// are returned alongside the format.
    pub fn from_map(type_id: FieldTypeId, map: &Map<String, Value>) -> (Self, Vec<String>) {
        let desc = descriptor(type_id);
        let pruned: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| desc.recognizes(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let format = Self::build(type_id.format_section(), pruned);
        let kept = format.to_map();
        let dropped = map
            .keys()
            .filter(|k| !kept.contains_key(*k))
            .cloned()
            .collect();

        (format, dropped)
    }

    /// Explicitly set keys as a JSON object
    pub fn to_map(&self) -> Map<String, Value> {
        match self {
            FieldFormat::Text(f) => to_object(f),
            FieldFormat::Number(f) => to_object(f),
            FieldFormat::Money(f) => to_object(f),
            FieldFormat::Percent(f) => to_object(f),
            FieldFormat::Date(f) => to_object(f),
            FieldFormat::Time(f) => to_object(f),
            FieldFormat::Datetime(f) => to_object(f),
            FieldFormat::Boolean(f) => to_object(f),
            FieldFormat::List(f) => to_object(f),
            FieldFormat::Phone(f) => to_object(f),
            FieldFormat::Email(f) => to_object(f),
            FieldFormat::Url(f) => to_object(f),
            FieldFormat::None => Map::new(),
        }
    }

    pub fn section(&self) -> FormatSection {
        match self {
            FieldFormat::Text(_) => FormatSection::Text,
            FieldFormat::Number(_) => FormatSection::Number,
            FieldFormat::Money(_) => FormatSection::Money,
            FieldFormat::Percent(_) => FormatSection::Percent,
            FieldFormat::Date(_) => FormatSection::Date,
            FieldFormat::Time(_) => FormatSection::Time,
            FieldFormat::Datetime(_) => FormatSection::Datetime,
            FieldFormat::Boolean(_) => FormatSection::Boolean,
            FieldFormat::List(_) => FormatSection::List,
            FieldFormat::Phone(_) => FormatSection::Phone,
            FieldFormat::Email(_) => FormatSection::Email,
            FieldFormat::Url(_) => FormatSection::Url,
            FieldFormat::None => FormatSection::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_map().is_empty()
    }

    /// Every recognized key of `type_id` with the explicit value or its default.
    /// Keys without a default (e.g. `max_length`) are omitted unless set.
    pub fn resolved(&self, type_id: FieldTypeId) -> Map<String, Value> {
        let explicit = self.to_map();
        let mut out = Map::new();

        for key in descriptor(type_id).format_keys {
            let value = match explicit.get(key.name) {
                Some(v) => Some(v.clone()),
                None => default_value(key.default),
            };
            if let Some(v) = value {
                out.insert(key.name.to_string(), v);
            }
        }

        out
    }
}

fn default_value(default: FormatDefault) -> Option<Value> {
    match default {
        FormatDefault::Int(i) => Some(Value::from(i)),
        FormatDefault::Bool(b) => Some(Value::Bool(b)),
        FormatDefault::Text(s) => Some(Value::from(s)),
        FormatDefault::Unset => None,
        FormatDefault::EmptyList => Some(Value::Array(Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::list_types;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_format_has_no_keys() {
        for t in list_types() {
            let format = FieldFormat::empty(t.type_id);
            assert!(format.is_empty(), "{} should start empty", t.type_id);
            assert_eq!(format.section(), t.format_section());
        }
    }

    #[test]
    fn test_registry_keys_match_records() {
        // Fully populated defaults must serialize to exactly the declared keys
        for t in list_types() {
            let mut full = FieldFormat::empty(t.type_id).resolved(t.type_id);
            for key in t.format_keys {
                full.entry(key.name.to_string()).or_insert(json!(1));
            }

            let (format, dropped) = FieldFormat::from_map(t.type_id, &full);
            assert!(dropped.is_empty(), "{}: dropped {:?}", t.type_id, dropped);

            let keys: Vec<_> = format.to_map().keys().cloned().collect();
            let declared: Vec<_> = t.format_keys.iter().map(|k| k.name.to_string()).collect();
            assert_eq!(keys, declared, "{}", t.type_id);
        }
    }

    #[test]
    fn test_from_map_drops_foreign_keys() {
        let map = object(json!({
            "currency": 1,
            "decimals": 0,
            "date_format": 3,
            "color": "red"
        }));

        let (format, dropped) = FieldFormat::from_map(FieldTypeId::Money, &map);
        assert_eq!(
            format,
            FieldFormat::Money(MoneyFormat {
                currency: Some(1),
                decimals: Some(0),
                thousands: None,
            })
        );
        assert_eq!(dropped, vec!["date_format".to_string(), "color".to_string()]);
    }

    #[test]
    fn test_from_map_drops_wrong_shapes() {
        let map = object(json!({ "trim": "yes", "case": 2 }));
        let (format, dropped) = FieldFormat::from_map(FieldTypeId::Text, &map);

        assert_eq!(format.to_map(), object(json!({ "case": 2 })));
        assert_eq!(dropped, vec!["trim".to_string()]);
    }

    #[test]
    fn test_resolved_applies_defaults() {
        let format = FieldFormat::empty(FieldTypeId::TextMultiline);
        let resolved = format.resolved(FieldTypeId::TextMultiline);
        assert_eq!(resolved.get("multiline"), Some(&json!(true)));
        assert!(!resolved.contains_key("max_length"));

        let (format, _) =
            FieldFormat::from_map(FieldTypeId::Boolean, &object(json!({ "true_text": "Вкл" })));
        let resolved = format.resolved(FieldTypeId::Boolean);
        assert_eq!(resolved.get("true_text"), Some(&json!("Вкл")));
        assert_eq!(resolved.get("false_text"), Some(&json!("Нет")));
    }

    #[test]
    fn test_list_options() {
        let map = object(json!({ "options": ["Новый", "В работе", "Готов"], "list_type": 1 }));
        let (format, dropped) = FieldFormat::from_map(FieldTypeId::List, &map);
        assert!(dropped.is_empty());
        match format {
            FieldFormat::List(list) => {
                assert_eq!(list.options.as_ref().map(Vec::len), Some(3));
                assert_eq!(list.list_type, Some(1));
            }
            other => panic!("unexpected format {:?}", other),
        }
    }
}
