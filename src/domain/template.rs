// ============================================================
// TEMPLATE MODEL
// ============================================================
// Stored templates and the personalisation values substituted into
// them at render time

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::shared::formatters::strip_and_remove_obscure_whitespace;
use crate::shared::insensitive_dict::InsensitiveDict;

/// Which channel a template is sent over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Sms,
    Email,
    Letter,
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Letter => "letter",
        })
    }
}

/// A template as stored by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContent {
    pub id: Option<Uuid>,

    pub name: Option<String>,

    pub template_type: TemplateType,

    /// Markdown-ish body with ((placeholders))
    pub content: String,

    /// Subject line (email) or heading (letter)
    #[serde(default)]
    pub subject: Option<String>,
}

impl TemplateContent {
    pub fn new(template_type: TemplateType, content: &str) -> Self {
        Self {
            id: None,
            name: None,
            template_type,
            content: content.to_string(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// A per-recipient value for one placeholder. Spreadsheets with
/// repeated column names accumulate a list of values under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonalisationValue {
    Text(String),
    List(Vec<Option<String>>),
}

impl PersonalisationValue {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// The non-empty items of a list value, cleaned up.
    pub fn list_items(&self) -> Vec<String> {
        match self {
            Self::Text(value) => vec![value.clone()],
            Self::List(items) => items
                .iter()
                .flatten()
                .map(|item| strip_and_remove_obscure_whitespace(item))
                .filter(|item| !item.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(value) => value.is_empty(),
            Self::List(items) => items.iter().all(|item| item.is_none()),
        }
    }
}

impl From<&str> for PersonalisationValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Per-recipient values, keyed insensitively by placeholder name.
/// `None` models a column that was present but empty.
pub type Personalisation = InsensitiveDict<Option<PersonalisationValue>>;

/// Truthiness rules for conditional placeholders.
pub fn str2bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "y" | "true" | "t" | "1" | "include" | "show"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_type_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&TemplateType::Sms).unwrap(), "\"sms\"");
        assert_eq!(
            serde_json::from_str::<TemplateType>("\"letter\"").unwrap(),
            TemplateType::Letter
        );
    }

    #[test]
    fn test_str2bool() {
        for value in ["yes", "y", "TRUE", "t", "1", "include", "Show"] {
            assert!(str2bool(value), "{value} should be truthy");
        }
        for value in ["no", "nope", "0", "false", ""] {
            assert!(!str2bool(value), "{value} should be falsy");
        }
    }

    #[test]
    fn test_list_items_drops_empty_values() {
        let value = PersonalisationValue::List(vec![
            Some("one".to_string()),
            None,
            Some(" \u{200B} ".to_string()),
            Some("two".to_string()),
        ]);
        assert_eq!(value.list_items(), vec!["one", "two"]);
    }

    #[test]
    fn test_personalisation_value_deserialises_untagged() {
        let text: PersonalisationValue = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(text, PersonalisationValue::text("hello"));

        let list: PersonalisationValue = serde_json::from_str("[\"a\", null]").unwrap();
        assert_eq!(
            list,
            PersonalisationValue::List(vec![Some("a".to_string()), None])
        );
    }
}
