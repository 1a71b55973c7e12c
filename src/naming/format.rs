//! Name formats
//!
//! A name format is a small string language evaluated per node. Classification
//! follows a fixed priority order that existing configurations depend on:
//!
//! 1. `title`
//! 2. `random`
//! 3. `untitled`
//! 4. `untitled-time`
//! 5. anything containing `}`: a template with `{field}` placeholders
//! 6. anything containing `|`: an ordered list of fallback fields
//! 7. `date:<pattern>`: strftime pattern (default `%Y-%m-%d %H:%M:%S`)
//! 8. anything containing a space or `/`: strftime pattern
//! 9. a field-name token: that field's value
//! 10. literal text

use super::unique::NameScope;
use crate::clock::Clock;
use crate::config::NamingConfig;
use crate::error::NamingError;
use crate::sanitize::NameSanitizer;
use crate::tree::Node;
use crate::types::LanguageId;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp layout of `untitled-time` names
pub const STAMP_PATTERN: &str = "%y%m%d%H%M%S";

/// Parsed name format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFormat {
    Title,
    Random,
    Untitled,
    UntitledTime,
    Template(String),
    FieldList(Vec<String>),
    Date(String),
    Field(String),
    Literal(String),
}

impl NameFormat {
    pub fn parse(format: &str) -> Self {
        let format = format.trim();
        match format {
            "title" => NameFormat::Title,
            "random" => NameFormat::Random,
            "untitled" => NameFormat::Untitled,
            "untitled-time" => NameFormat::UntitledTime,
            f if f.contains('}') => NameFormat::Template(f.to_string()),
            f if f.contains('|') => NameFormat::FieldList(
                f.split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            f if f.starts_with("date:") => {
                let pattern = f["date:".len()..].trim();
                NameFormat::Date(if pattern.is_empty() {
                    DEFAULT_DATE_PATTERN.to_string()
                } else {
                    pattern.to_string()
                })
            }
            f if f.contains(' ') || f.contains('/') => NameFormat::Date(f.to_string()),
            f if is_field_name(f) => NameFormat::Field(f.to_string()),
            f => NameFormat::Literal(f.to_string()),
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_field_name(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Format to use for `node` when none is given: the parent's child name
/// format, else `title` when the node has one, else `fallback`.
pub fn default_format(node: &Node, parent: Option<&Node>, fallback: &str) -> String {
    if let Some(format) = parent
        .and_then(|p| p.child_name_format.as_deref())
        .map(str::trim)
        .filter(|f| !f.is_empty())
    {
        return format.to_string();
    }
    if !node.title(None).is_empty() {
        return "title".to_string();
    }
    fallback.to_string()
}

/// Source of collision-free random names
pub trait RandomNames {
    fn random_name(&self, scope: &NameScope) -> Result<String, NamingError>;
}

pub struct FormatInterpreter<'a> {
    config: &'a NamingConfig,
    sanitizer: &'a dyn NameSanitizer,
    clock: &'a dyn Clock,
    random: &'a dyn RandomNames,
}

impl<'a> FormatInterpreter<'a> {
    pub fn new(
        config: &'a NamingConfig,
        sanitizer: &'a dyn NameSanitizer,
        clock: &'a dyn Clock,
        random: &'a dyn RandomNames,
    ) -> Self {
        Self {
            config,
            sanitizer,
            clock,
            random,
        }
    }

    /// Sanitized name for `node` under `format`.
    pub fn resolve(&self, node: &Node, format: &str) -> Result<String, NamingError> {
        self.resolve_in(node, format, None)
    }

    /// Like [`resolve`](Self::resolve), reading language-specific field values.
    pub fn resolve_in(
        &self,
        node: &Node,
        format: &str,
        language: Option<LanguageId>,
    ) -> Result<String, NamingError> {
        let raw = self.raw_name(node, &NameFormat::parse(format), language)?;
        Ok(self.sanitize(&raw))
    }

    pub fn sanitize(&self, raw: &str) -> String {
        self.sanitizer.page_name(raw, self.config.charset)
    }

    /// `untitled-0yymmddHHMMSS`; the `0` keeps stamps apart from counters.
    pub fn untitled_time(&self) -> String {
        format!(
            "{}{}0{}",
            self.config.untitled,
            self.config.delimiter,
            self.clock.now().format(STAMP_PATTERN)
        )
    }

    fn raw_name(
        &self,
        node: &Node,
        format: &NameFormat,
        language: Option<LanguageId>,
    ) -> Result<String, NamingError> {
        let raw = match format {
            NameFormat::Title => {
                let title = node.title(language);
                if title.is_empty() {
                    self.untitled_time()
                } else {
                    title.to_string()
                }
            }
            NameFormat::Random => {
                let scope = NameScope::siblings_of(node);
                let scope = match language {
                    Some(l) => scope.with_language(l),
                    None => scope,
                };
                self.random.random_name(&scope)?
            }
            NameFormat::Untitled => self.config.untitled.clone(),
            NameFormat::UntitledTime => self.untitled_time(),
            NameFormat::Template(template) => render_template(template, node, language),
            NameFormat::FieldList(fields) => fields
                .iter()
                .filter_map(|f| node.field(f, language))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .unwrap_or("")
                .to_string(),
            NameFormat::Date(pattern) => match format_date(self.clock.now(), pattern) {
                Some(date) => date,
                None => {
                    tracing::debug!(pattern = %pattern, "Unusable date pattern, using it as literal text");
                    pattern.clone()
                }
            },
            NameFormat::Field(field) if node.has_field(field) => {
                node.field(field, language).unwrap_or("").trim().to_string()
            }
            NameFormat::Field(token) => token.clone(),
            NameFormat::Literal(text) => text.clone(),
        };
        Ok(raw)
    }
}

fn render_template(template: &str, node: &Node, language: Option<LanguageId>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let field = after[..close].trim();
                out.push_str(node.field(field, language).unwrap_or("").trim());
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// strftime rendering; `None` for patterns chrono cannot interpret.
fn format_date(now: DateTime<Utc>, pattern: &str) -> Option<String> {
    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", now.format_with_items(items.iter())).ok()?;
    Some(out)
}
