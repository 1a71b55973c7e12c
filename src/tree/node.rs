//! Content node representation

use crate::types::{LanguageId, NodeId, DEFAULT_LANGUAGE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field holding a node's title
pub const TITLE_FIELD: &str = "title";

/// A node of the content tree
///
/// Only the parts the naming and history subsystems read are modeled: identity,
/// placement, name (per language), field values and the child name format
/// declared by the node's template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// `None` until the node has been persisted
    #[serde(default)]
    pub id: Option<NodeId>,
    /// `None` only for the root
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub language_names: BTreeMap<LanguageId, String>,
    #[serde(default)]
    pub language_fields: BTreeMap<LanguageId, BTreeMap<String, String>>,
    /// Name format applied to children created under this node
    #[serde(default)]
    pub child_name_format: Option<String>,
}

impl Node {
    /// New, unsaved node under `parent`
    pub fn new(parent: NodeId, created: DateTime<Utc>) -> Self {
        Self {
            id: None,
            parent: Some(parent),
            name: String::new(),
            created,
            trashed: false,
            fields: BTreeMap::new(),
            language_names: BTreeMap::new(),
            language_fields: BTreeMap::new(),
            child_name_format: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.with_field(TITLE_FIELD, title)
    }

    pub fn with_language_name(mut self, language: LanguageId, name: impl Into<String>) -> Self {
        self.language_names.insert(language, name.into());
        self
    }

    pub fn with_language_field(
        mut self,
        language: LanguageId,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.language_fields
            .entry(language)
            .or_default()
            .insert(field.into(), value.into());
        self
    }

    pub fn with_child_name_format(mut self, format: impl Into<String>) -> Self {
        self.child_name_format = Some(format.into());
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
            || self.language_fields.values().any(|f| f.contains_key(field))
    }

    /// Field value in `language`, falling back to the default value when the
    /// language has none (or an empty one).
    pub fn field(&self, field: &str, language: Option<LanguageId>) -> Option<&str> {
        let localized = language
            .filter(|l| *l != DEFAULT_LANGUAGE)
            .and_then(|l| self.language_fields.get(&l))
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
            .filter(|v| !v.is_empty());
        localized.or_else(|| self.fields.get(field).map(String::as_str))
    }

    pub fn title(&self, language: Option<LanguageId>) -> &str {
        self.field(TITLE_FIELD, language).map(str::trim).unwrap_or("")
    }

    /// Effective name in `language`: the language-specific name when present,
    /// else the default name.
    pub fn name_in(&self, language: Option<LanguageId>) -> &str {
        language
            .filter(|l| *l != DEFAULT_LANGUAGE)
            .and_then(|l| self.language_names.get(&l))
            .map(String::as_str)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }
}
