//! Field type catalog shared by every project

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::types::*;
use crate::error::{DesignError, Result};

// =============================================================================
// Format key sets
// =============================================================================

const TEXT_KEYS: &[FormatKey] = &[
    FormatKey::int("case", 0),
    FormatKey::optional("max_length"),
    FormatKey::flag("trim", false),
    FormatKey::flag("multiline", false),
];

const MULTILINE_KEYS: &[FormatKey] = &[
    FormatKey::int("case", 0),
    FormatKey::optional("max_length"),
    FormatKey::flag("trim", false),
    FormatKey::flag("multiline", true),
];

const NUMBER_KEYS: &[FormatKey] = &[
    FormatKey::int("number_format", 0),
    FormatKey::int("decimals", 2),
    FormatKey::flag("negative_parens", false),
    FormatKey::flag("negative_red", false),
];

const MONEY_KEYS: &[FormatKey] = &[
    FormatKey::int("currency", 0),
    FormatKey::int("decimals", 2),
    FormatKey::flag("thousands", true),
];

const PERCENT_KEYS: &[FormatKey] = &[
    FormatKey::int("percent_format", 0),
    FormatKey::int("decimals", 2),
];

const DATE_KEYS: &[FormatKey] = &[FormatKey::int("date_format", 0)];

const TIME_KEYS: &[FormatKey] = &[FormatKey::int("time_format", 0)];

const DATETIME_KEYS: &[FormatKey] = &[FormatKey::int("datetime_format", 0)];

const BOOLEAN_KEYS: &[FormatKey] = &[
    FormatKey::int("boolean_format", 0),
    FormatKey::text("true_text", "Да"),
    FormatKey::text("false_text", "Нет"),
];

const LIST_KEYS: &[FormatKey] = &[
    FormatKey::list("options"),
    FormatKey::int("list_type", 0),
    FormatKey::int("sort_type", 0),
];

const PHONE_KEYS: &[FormatKey] = &[FormatKey::int("phone_format", 0)];

const EMAIL_KEYS: &[FormatKey] = &[
    FormatKey::flag("lowercase", false),
    FormatKey::flag("trim", true),
];

const URL_KEYS: &[FormatKey] = &[
    FormatKey::flag("add_protocol", true),
    FormatKey::flag("lowercase", false),
];

// =============================================================================
// Catalog (order = tile panel display order)
// =============================================================================

pub static FIELD_TYPES: &[TypeDescriptor] = &[
    TypeDescriptor {
        type_id: FieldTypeId::Text,
        icon: "📝",
        display_name: "Текст",
        description: "Строка текста",
        format_keys: TEXT_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::TextMultiline,
        icon: "📄",
        display_name: "Текст (многострочный)",
        description: "Несколько строк текста",
        format_keys: MULTILINE_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Integer,
        icon: "🔢",
        display_name: "Число целое",
        description: "Целое число",
        format_keys: NUMBER_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Float,
        icon: "🔣",
        display_name: "Число дробное",
        description: "Число с дробной частью",
        format_keys: NUMBER_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Money,
        icon: "💰",
        display_name: "Деньги",
        description: "Денежная сумма",
        format_keys: MONEY_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Percent,
        icon: "📊",
        display_name: "Процент",
        description: "Процентное значение",
        format_keys: PERCENT_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Date,
        icon: "📅",
        display_name: "Дата",
        description: "Календарная дата",
        format_keys: DATE_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Time,
        icon: "⏰",
        display_name: "Время",
        description: "Время суток",
        format_keys: TIME_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Datetime,
        icon: "🕒",
        display_name: "Дата и время",
        description: "Дата вместе со временем",
        format_keys: DATETIME_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Boolean,
        icon: "✅",
        display_name: "Да/Нет",
        description: "Логическое значение",
        format_keys: BOOLEAN_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::List,
        icon: "📋",
        display_name: "Список",
        description: "Выбор из списка вариантов",
        format_keys: LIST_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Reference,
        icon: "🔗",
        display_name: "Ссылка",
        description: "Связь с записью другой таблицы",
        format_keys: &[],
    },
    TypeDescriptor {
        type_id: FieldTypeId::Phone,
        icon: "📞",
        display_name: "Телефон",
        description: "Номер телефона",
        format_keys: PHONE_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Email,
        icon: "📧",
        display_name: "Email",
        description: "Адрес электронной почты",
        format_keys: EMAIL_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::Url,
        icon: "🌐",
        display_name: "URL",
        description: "Адрес веб-страницы",
        format_keys: URL_KEYS,
    },
    TypeDescriptor {
        type_id: FieldTypeId::File,
        icon: "📎",
        display_name: "Файл",
        description: "Вложенный файл",
        format_keys: &[],
    },
    TypeDescriptor {
        type_id: FieldTypeId::Image,
        icon: "🖼️",
        display_name: "Изображение",
        description: "Картинка",
        format_keys: &[],
    },
    TypeDescriptor {
        type_id: FieldTypeId::Color,
        icon: "🎨",
        display_name: "Цвет",
        description: "Цвет в формате #RRGGBB",
        format_keys: &[],
    },
    TypeDescriptor {
        type_id: FieldTypeId::Rating,
        icon: "⭐",
        display_name: "Рейтинг",
        description: "Оценка звёздами",
        format_keys: &[],
    },
    TypeDescriptor {
        type_id: FieldTypeId::Calculated,
        icon: "🧮",
        display_name: "Вычисляемое",
        description: "Значение по формуле",
        format_keys: &[],
    },
];

static BY_ID: Lazy<HashMap<&'static str, &'static TypeDescriptor>> = Lazy::new(|| {
    FIELD_TYPES
        .iter()
        .map(|t| (t.type_id.as_str(), t))
        .collect()
});

/// All field types in display order
pub fn list_types() -> &'static [TypeDescriptor] {
    FIELD_TYPES
}

/// Look up a type by its `type_id` (case-insensitive)
pub fn by_id(id: &str) -> Result<&'static TypeDescriptor> {
    BY_ID
        .get(id.trim().to_ascii_lowercase().as_str())
        .copied()
        .ok_or_else(|| DesignError::not_found("Field type", id))
}

/// Descriptor for a known type id; every variant is in the catalog
pub fn descriptor(type_id: FieldTypeId) -> &'static TypeDescriptor {
    BY_ID[type_id.as_str()]
}

/// Look up a type by `type_id` or by display name, as chosen from the tile panel
pub fn lookup_type(key: &str) -> Option<&'static TypeDescriptor> {
    let key = key.trim();
    by_id(key)
        .ok()
        .or_else(|| FIELD_TYPES.iter().find(|t| t.display_name == key))
}

/// Get all type ids
pub fn type_ids() -> Vec<&'static str> {
    FIELD_TYPES.iter().map(|t| t.type_id.as_str()).collect()
}
