//! Machine identifiers derived from human-readable (Cyrillic) names

use std::cell::RefCell;
use std::collections::HashMap;

/// Map a single lower-case character to its ASCII replacement.
/// Returns `None` for characters that pass through unchanged.
fn translit_char(c: char) -> Option<&'static str> {
    let mapped = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        ' ' | '-' | '—' | '.' | ',' => "_",
        '(' | ')' => "",
        _ => return None,
    };
    Some(mapped)
}

/// Derive a machine identifier from a display name (uncached).
///
/// Lower-cases, transliterates, collapses `_` runs, trims `_` at both ends
/// and prefixes `f_` when the result would start with a digit.
pub fn transliterate(text: &str) -> String {
    let mut mapped = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match translit_char(c) {
            Some(s) => mapped.push_str(s),
            None => mapped.push(c),
        }
    }

    let mut result = String::with_capacity(mapped.len());
    for c in mapped.chars() {
        if c == '_' && result.ends_with('_') {
            continue;
        }
        result.push(c);
    }

    let result = result.trim_matches('_');
    match result.chars().next() {
        Some(first) if first.is_numeric() => format!("f_{}", result),
        _ => result.to_string(),
    }
}

/// Derive a filesystem-safe file stem from a display name
pub fn file_stem(text: &str) -> String {
    let stem: String = transliterate(text)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if stem.is_empty() {
        "project".to_string()
    } else {
        stem
    }
}

/// Memoizing identifier deriver.
///
/// One instance lives as long as a designer session; the cache is keyed by
/// the exact input and only grows.
#[derive(Debug, Default)]
pub struct Transliterator {
    cache: RefCell<HashMap<String, String>>,
}

impl Transliterator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(&self, text: &str) -> String {
        if let Some(hit) = self.cache.borrow().get(text) {
            return hit.clone();
        }

        let derived = transliterate(text);
        self.cache
            .borrow_mut()
            .insert(text.to_string(), derived.clone());
        derived
    }

    /// Number of memoized inputs
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}
