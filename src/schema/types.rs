use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a field type in the registry catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTypeId {
    Text,
    TextMultiline,
    Integer,
    Float,
    Money,
    Percent,
    Date,
    Time,
    Datetime,
    Boolean,
    List,
    Reference,
    Phone,
    Email,
    Url,
    File,
    Image,
    Color,
    Rating,
    Calculated,
}

impl FieldTypeId {
    /// The `type_id` string stored in project documents
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldTypeId::Text => "text",
            FieldTypeId::TextMultiline => "text_multiline",
            FieldTypeId::Integer => "integer",
            FieldTypeId::Float => "float",
            FieldTypeId::Money => "money",
            FieldTypeId::Percent => "percent",
            FieldTypeId::Date => "date",
            FieldTypeId::Time => "time",
            FieldTypeId::Datetime => "datetime",
            FieldTypeId::Boolean => "boolean",
            FieldTypeId::List => "list",
            FieldTypeId::Reference => "reference",
            FieldTypeId::Phone => "phone",
            FieldTypeId::Email => "email",
            FieldTypeId::Url => "url",
            FieldTypeId::File => "file",
            FieldTypeId::Image => "image",
            FieldTypeId::Color => "color",
            FieldTypeId::Rating => "rating",
            FieldTypeId::Calculated => "calculated",
        }
    }

    /// Which format configuration section applies to this type
    pub const fn format_section(&self) -> FormatSection {
        match self {
            FieldTypeId::Text | FieldTypeId::TextMultiline => FormatSection::Text,
            FieldTypeId::Integer | FieldTypeId::Float => FormatSection::Number,
            FieldTypeId::Money => FormatSection::Money,
            FieldTypeId::Percent => FormatSection::Percent,
            FieldTypeId::Date => FormatSection::Date,
            FieldTypeId::Time => FormatSection::Time,
            FieldTypeId::Datetime => FormatSection::Datetime,
            FieldTypeId::Boolean => FormatSection::Boolean,
            FieldTypeId::List => FormatSection::List,
            FieldTypeId::Phone => FormatSection::Phone,
            FieldTypeId::Email => FormatSection::Email,
            FieldTypeId::Url => FormatSection::Url,
            FieldTypeId::Reference
            | FieldTypeId::File
            | FieldTypeId::Image
            | FieldTypeId::Color
            | FieldTypeId::Rating
            | FieldTypeId::Calculated => FormatSection::None,
        }
    }
}

impl fmt::Display for FieldTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format configuration section shown for a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSection {
    Text,
    Number,
    Money,
    Percent,
    Date,
    Time,
    Datetime,
    Boolean,
    List,
    Phone,
    Email,
    Url,
    /// Types without any format keys
    None,
}

/// Default value of a recognized format key
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatDefault {
    Int(i64),
    Bool(bool),
    Text(&'static str),
    /// Optional value that is absent by default
    Unset,
    EmptyList,
}

/// A recognized format configuration key
#[derive(Debug, Clone, Copy)]
pub struct FormatKey {
    pub name: &'static str,
    pub default: FormatDefault,
}

impl FormatKey {
    pub const fn int(name: &'static str, default: i64) -> Self {
        Self {
            name,
            default: FormatDefault::Int(default),
        }
    }

    pub const fn flag(name: &'static str, default: bool) -> Self {
        Self {
            name,
            default: FormatDefault::Bool(default),
        }
    }

    pub const fn text(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            default: FormatDefault::Text(default),
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            default: FormatDefault::Unset,
        }
    }

    pub const fn list(name: &'static str) -> Self {
        Self {
            name,
            default: FormatDefault::EmptyList,
        }
    }
}

/// Field type descriptor
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub type_id: FieldTypeId,
    pub icon: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Recognized format keys, in display order
    pub format_keys: &'static [FormatKey],
}

impl TypeDescriptor {
    pub fn is_reference(&self) -> bool {
        is_reference(self.type_id)
    }

    pub fn is_computed(&self) -> bool {
        is_computed(self.type_id)
    }

    pub fn format_section(&self) -> FormatSection {
        self.type_id.format_section()
    }

    /// Whether `key` is a recognized format key for this type
    pub fn recognizes(&self, key: &str) -> bool {
        self.format_keys.iter().any(|k| k.name == key)
    }

    pub fn format_key(&self, key: &str) -> Option<&FormatKey> {
        self.format_keys.iter().find(|k| k.name == key)
    }
}

pub fn is_reference(type_id: FieldTypeId) -> bool {
    type_id == FieldTypeId::Reference
}

pub fn is_computed(type_id: FieldTypeId) -> bool {
    type_id == FieldTypeId::Calculated
}

/// How many target records a Reference field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    #[default]
    One,
    Many,
}

/// Value type produced by a Computed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    #[default]
    Text,
    Number,
    Date,
    Boolean,
}
