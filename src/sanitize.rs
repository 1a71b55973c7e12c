//! Name sanitizing
//!
//! Normalizes arbitrary text into the constrained alphabet of a node name. The
//! naming core only consumes the [`NameSanitizer`] trait; [`DefaultSanitizer`]
//! is the implementation used when the host does not supply its own.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Character set a sanitized name may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharsetMode {
    /// `[a-z0-9-_.]` only, accents stripped
    #[default]
    Ascii,
    /// Any lowercase alphanumeric character plus `-_.`
    Utf8,
    /// Like `Ascii`, but common letters are transliterated (`ä` -> `ae`)
    Translate,
}

pub trait NameSanitizer: Send + Sync {
    /// Sanitize a single name segment.
    fn page_name(&self, raw: &str, mode: CharsetMode) -> String;

    /// Sanitize a `/`-separated path: single leading slash, no trailing slash.
    fn path_name(&self, raw: &str, mode: CharsetMode) -> String;
}

const NAME_DELIMITERS: [char; 3] = ['-', '_', '.'];

#[derive(Debug, Clone)]
pub struct DefaultSanitizer {
    max_length: usize,
}

impl DefaultSanitizer {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for DefaultSanitizer {
    fn default() -> Self {
        Self::new(128)
    }
}

impl NameSanitizer for DefaultSanitizer {
    fn page_name(&self, raw: &str, mode: CharsetMode) -> String {
        let folded: String = match mode {
            CharsetMode::Ascii => fold_ascii(raw, false),
            CharsetMode::Translate => fold_ascii(raw, true),
            CharsetMode::Utf8 => raw.nfc().collect(),
        };

        let mut out = String::with_capacity(folded.len());
        let mut last_was_delimiter = true;
        for c in folded.chars().flat_map(char::to_lowercase) {
            let keep = c.is_ascii_alphanumeric()
                || (mode == CharsetMode::Utf8 && c.is_alphanumeric());
            if keep {
                out.push(c);
                last_was_delimiter = false;
            } else if !last_was_delimiter {
                out.push(if NAME_DELIMITERS.contains(&c) { c } else { '-' });
                last_was_delimiter = true;
            }
        }

        let trimmed = out.trim_matches(&NAME_DELIMITERS[..]);
        let limited: String = trimmed.chars().take(self.max_length).collect();
        limited.trim_end_matches(&NAME_DELIMITERS[..]).to_string()
    }

    fn path_name(&self, raw: &str, mode: CharsetMode) -> String {
        let segments: Vec<String> = raw
            .split('/')
            .map(|segment| self.page_name(segment, mode))
            .filter(|segment| !segment.is_empty())
            .collect();
        format!("/{}", segments.join("/"))
    }
}

fn fold_ascii(raw: &str, translate: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if translate {
            if let Some(replacement) = transliterate(c) {
                out.push_str(replacement);
                continue;
            }
        }
        out.extend(c.to_string().nfkd().filter(char::is_ascii));
    }
    out
}

fn transliterate(c: char) -> Option<&'static str> {
    let replacement = match c {
        'ä' | 'Ä' => "ae",
        'ö' | 'Ö' => "oe",
        'ü' | 'Ü' => "ue",
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ø' | 'Ø' => "o",
        'å' | 'Å' => "aa",
        'þ' | 'Þ' => "th",
        'ð' | 'Ð' => "d",
        'ł' | 'Ł' => "l",
        '&' => "-and-",
        _ => return None,
    };
    Some(replacement)
}
