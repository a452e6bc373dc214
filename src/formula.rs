//! Formula text buffer for computed fields
//!
//! Formulas are opaque text. The builder appends palette fragments and can
//! list the `[Field name]` tokens present, but never parses or evaluates the
//! expression.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{DesignError, Result};
use crate::schema::Table;

/// A palette button: the symbol and its hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub symbol: &'static str,
    pub hint: &'static str,
}

const fn entry(symbol: &'static str, hint: &'static str) -> PaletteEntry {
    PaletteEntry { symbol, hint }
}

pub static OPERATORS: &[PaletteEntry] = &[
    entry("+", "Сложение"),
    entry("-", "Вычитание"),
    entry("*", "Умножение"),
    entry("/", "Деление"),
    entry("=", "Равно"),
    entry("<>", "Не равно"),
    entry(">", "Больше"),
    entry("<", "Меньше"),
    entry(">=", "Больше или равно"),
    entry("<=", "Меньше или равно"),
    entry("&", "Объединение строк"),
];

pub static FUNCTIONS: &[PaletteEntry] = &[
    entry("SUM", "Сумма"),
    entry("AVG", "Среднее"),
    entry("COUNT", "Количество"),
    entry("MIN", "Минимум"),
    entry("MAX", "Максимум"),
    entry("ROUND", "Округление"),
    entry("ABS", "Модуль числа"),
    entry("YEAR", "Год из даты"),
    entry("MONTH", "Месяц из даты"),
    entry("DAY", "День из даты"),
    entry("NOW", "Текущая дата"),
];

pub static STRING_FUNCTIONS: &[PaletteEntry] = &[
    entry("UPPER", "ВСЕ ПРОПИСНЫЕ"),
    entry("LOWER", "все строчные"),
    entry("PROPER", "Первая Прописная"),
    entry("LEFT", "Левые символы"),
    entry("RIGHT", "Правые символы"),
    entry("MID", "Середина текста"),
    entry("LEN", "Длина текста"),
    entry("TRIM", "Удалить пробелы"),
];

pub static CONDITIONS: &[PaletteEntry] = &[
    entry("ЕСЛИ", "Условный оператор"),
    entry("И", "Логическое И"),
    entry("ИЛИ", "Логическое ИЛИ"),
    entry("НЕ", "Логическое НЕ"),
];

static FIELD_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\[\]]+)\]").unwrap_or_else(|e| panic!("invalid field token pattern: {}", e))
});

/// Logical condition skeletons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    If,
    And,
    Or,
    Not,
}

impl Condition {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim().to_uppercase().as_str() {
            "ЕСЛИ" | "IF" => Some(Condition::If),
            "И" | "AND" => Some(Condition::And),
            "ИЛИ" | "OR" => Some(Condition::Or),
            "НЕ" | "NOT" => Some(Condition::Not),
            _ => None,
        }
    }

    fn fragment(&self) -> &'static str {
        match self {
            Condition::If => "ЕСЛИ(условие; значение_если_истина; значение_если_ложь)",
            Condition::And => " И ",
            Condition::Or => " ИЛИ ",
            Condition::Not => "НЕ()",
        }
    }
}

/// Kind of palette item, for the string-based entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Field,
    Operator,
    Function,
    Condition,
}

impl std::str::FromStr for TokenKind {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "field" => Ok(TokenKind::Field),
            "operator" | "op" => Ok(TokenKind::Operator),
            "function" | "fn" => Ok(TokenKind::Function),
            "condition" => Ok(TokenKind::Condition),
            other => Err(DesignError::validation(
                "token kind",
                format!("unknown token kind '{}'", other),
            )),
        }
    }
}

/// One palette insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormulaToken {
    Field(String),
    Operator(&'static str),
    Function(&'static str),
    Condition(Condition),
}

impl fmt::Display for FormulaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaToken::Field(name) => write!(f, "[{}]", name),
            FormulaToken::Operator(op) => write!(f, " {} ", op),
            FormulaToken::Function(name) => write!(f, "{}()", name),
            FormulaToken::Condition(c) => f.write_str(c.fragment()),
        }
    }
}

fn palette_symbol(palette: &[PaletteEntry], symbol: &str) -> Option<&'static str> {
    palette
        .iter()
        .find(|e| e.symbol.eq_ignore_ascii_case(symbol))
        .map(|e| e.symbol)
}

impl FormulaToken {
    /// Build a token from a palette kind and literal.
    /// Literals outside the palette are rejected; field names are taken as-is.
    pub fn parse(kind: TokenKind, literal: &str) -> Result<Self> {
        let literal = literal.trim();
        match kind {
            TokenKind::Field => {
                if literal.is_empty() || literal.contains(&['[', ']'][..]) {
                    return Err(DesignError::validation(
                        "field",
                        format!("'{}' cannot be used as a field token", literal),
                    ));
                }
                Ok(FormulaToken::Field(literal.to_string()))
            }
            TokenKind::Operator => palette_symbol(OPERATORS, literal)
                .map(FormulaToken::Operator)
                .ok_or_else(|| DesignError::validation("operator", format!("unknown operator '{}'", literal))),
            TokenKind::Function => palette_symbol(FUNCTIONS, literal)
                .or_else(|| palette_symbol(STRING_FUNCTIONS, literal))
                .map(FormulaToken::Function)
                .ok_or_else(|| DesignError::validation("function", format!("unknown function '{}'", literal))),
            TokenKind::Condition => Condition::from_symbol(literal)
                .map(FormulaToken::Condition)
                .ok_or_else(|| DesignError::validation("condition", format!("unknown condition '{}'", literal))),
        }
    }
}

/// Mutable formula buffer behind the formula editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaBuilder {
    text: String,
}

impl FormulaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formula(formula: impl Into<String>) -> Self {
        Self { text: formula.into() }
    }

    /// Append a token's fragment to the end of the buffer
    pub fn push(&mut self, token: &FormulaToken) -> &mut Self {
        self.text.push_str(&token.to_string());
        self
    }

    /// Append a palette item and return the inserted fragment
    pub fn build_token(&mut self, kind: TokenKind, literal: &str) -> Result<String> {
        let fragment = FormulaToken::parse(kind, literal)?.to_string();
        self.text.push_str(&fragment);
        Ok(fragment)
    }

    pub fn formula(&self) -> &str {
        &self.text
    }

    pub fn set_formula(&mut self, formula: impl Into<String>) {
        self.text = formula.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Distinct `[Field name]` tokens in first-seen order
    pub fn field_tokens(&self) -> Vec<String> {
        field_tokens(&self.text)
    }

    /// Preview text: the raw formula echoed back, nothing is computed
    pub fn preview(&self) -> String {
        if self.text.is_empty() {
            "Введите формулу".to_string()
        } else {
            format!("Результат вычисления:\n{}", self.text)
        }
    }

    pub fn into_formula(self) -> String {
        self.text
    }
}

/// Distinct `[Field name]` tokens of a formula, in first-seen order
pub fn field_tokens(formula: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for cap in FIELD_TOKEN.captures_iter(formula) {
        let name = cap[1].to_string();
        if !tokens.contains(&name) {
            tokens.push(name);
        }
    }
    tokens
}

/// Field names offered by the field picker for a table.
/// Unnamed fields cannot be referenced and are skipped.
pub fn available_fields(table: &Table) -> Vec<&str> {
    table
        .fields
        .iter()
        .map(|f| f.name_ru.as_str())
        .filter(|name| !name.is_empty())
        .collect()
}
