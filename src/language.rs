//! Language capability
//!
//! Multi-language naming is optional. Components hold an
//! `Option<Arc<dyn LanguageProvider>>` and only branch into per-language logic
//! when one is present.

use crate::types::{LanguageId, DEFAULT_LANGUAGE};
use serde::{Deserialize, Serialize};

/// A language known to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

pub trait LanguageProvider: Send + Sync {
    /// All languages, default included.
    fn languages(&self) -> Vec<Language>;

    fn default_language(&self) -> Option<Language> {
        self.languages().into_iter().find(|l| l.is_default)
    }

    fn language(&self, id: LanguageId) -> Option<Language> {
        self.languages().into_iter().find(|l| l.id == id)
    }

    /// Languages that carry their own name column.
    fn alternate_languages(&self) -> Vec<Language> {
        self.languages().into_iter().filter(|l| !l.is_default).collect()
    }

    /// True when `id` addresses the default name column.
    fn is_default(&self, id: LanguageId) -> bool {
        id == DEFAULT_LANGUAGE || self.language(id).map(|l| l.is_default).unwrap_or(false)
    }
}

/// Fixed language list, typically built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticLanguages {
    languages: Vec<Language>,
}

impl StaticLanguages {
    pub fn new(languages: Vec<Language>) -> Self {
        Self { languages }
    }
}

impl LanguageProvider for StaticLanguages {
    fn languages(&self) -> Vec<Language> {
        self.languages.clone()
    }
}
