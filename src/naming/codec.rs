//! Name codec: numeric suffix parsing, incrementing and length limiting.

use crate::config::NamingConfig;

/// Digit count of the `untitled-time` stamp suffix (`0` + `yymmddHHMMSS`).
///
/// A zero-led suffix of at least this length is a stamp, not a counter.
pub const STAMP_DIGITS: usize = 13;

/// Numeric suffix found at the end of a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameSuffix<'a> {
    /// Everything before the delimiter preceding the digits
    pub prefix: &'a str,
    /// Raw digit text, zero padding included
    pub digits: &'a str,
    pub number: u64,
}

impl NameSuffix<'_> {
    pub fn is_stamp(&self) -> bool {
        self.digits.starts_with('0') && self.digits.len() >= STAMP_DIGITS
    }
}

#[derive(Debug, Clone)]
pub struct NameCodec {
    delimiter: char,
    delimiters: Vec<char>,
    max_length: usize,
}

impl NameCodec {
    pub fn new(delimiter: char, delimiters: Vec<char>, max_length: usize) -> Self {
        Self {
            delimiter,
            delimiters,
            max_length,
        }
    }

    pub fn from_config(config: &NamingConfig) -> Self {
        Self::new(config.delimiter, config.delimiters.clone(), config.max_length)
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Numeric suffix after the last delimiter, if the text there is all digits.
    pub fn suffix<'a>(&self, name: &'a str) -> Option<NameSuffix<'a>> {
        let pos = name.rfind(self.delimiter)?;
        let digits = &name[pos + self.delimiter.len_utf8()..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let significant = digits.trim_start_matches('0');
        let number = if significant.is_empty() {
            0
        } else {
            significant.parse().ok()?
        };
        Some(NameSuffix {
            prefix: &name[..pos],
            digits,
            number,
        })
    }

    /// Split `name` into `(prefix, number)`; `number` is 0 when there is no suffix.
    pub fn split(&self, name: &str) -> (String, u64) {
        match self.suffix(name) {
            Some(suffix) => (suffix.prefix.to_string(), suffix.number),
            None => (name.to_string(), 0),
        }
    }

    /// Limit `name` to `max_length` characters without losing its numeric suffix,
    /// preferring to cut at a word delimiter near the end.
    ///
    /// When `max_length` cannot hold the delimiter plus the suffix, only the
    /// trailing `max_length` digits survive. Configured lengths are validated to
    /// leave room for a full stamp, so this only happens on direct calls.
    pub fn truncate(&self, name: &str, max_length: usize) -> String {
        if name.chars().count() <= max_length {
            return name.to_string();
        }

        let (prefix, digits) = match self.suffix(name) {
            Some(suffix) => (suffix.prefix, Some(suffix.digits)),
            None => (name, None),
        };
        let tail = digits
            .map(|d| format!("{}{}", self.delimiter, d))
            .unwrap_or_default();
        let tail_len = tail.chars().count();

        if tail_len >= max_length {
            let digits = digits.unwrap_or("");
            let skip = digits.len().saturating_sub(max_length);
            return digits[skip..].to_string();
        }

        let mut head: String = prefix.chars().take(max_length - tail_len).collect();
        let head_len = head.chars().count();
        let cut = head
            .char_indices()
            .filter(|(_, c)| self.delimiters.contains(c))
            .map(|(i, _)| i)
            .last();
        if let Some(pos) = cut {
            let cut_chars = head[..pos].chars().count();
            if pos > 0 && cut_chars as f64 >= head_len as f64 / 1.3 {
                head.truncate(pos);
            }
        }

        let head = head.trim_end_matches(&self.delimiters[..]);
        match digits {
            Some(digits) if head.is_empty() => digits.to_string(),
            _ => format!("{}{}", head, tail),
        }
    }

    /// Next name in the numbering sequence of `name`.
    ///
    /// `page-007` becomes `page-008`; `page` becomes `page-1`. An explicit
    /// number replaces (or supplies) the suffix.
    pub fn increment(&self, name: &str, explicit: Option<u64>) -> String {
        let next = match self.suffix(name) {
            Some(suffix) if !suffix.is_stamp() => match (explicit, suffix.number.checked_add(1)) {
                (Some(number), _) => format!("{}{}{}", suffix.prefix, self.delimiter, number),
                (None, Some(number)) => format!(
                    "{}{}{:0width$}",
                    suffix.prefix,
                    self.delimiter,
                    number,
                    width = suffix.digits.len()
                ),
                // counter is saturated: start a fresh one after it
                (None, None) => format!("{}{}1", name, self.delimiter),
            },
            _ => format!("{}{}{}", name, self.delimiter, explicit.unwrap_or(1)),
        };
        self.truncate(&next, self.max_length)
    }
}

impl Default for NameCodec {
    fn default() -> Self {
        Self::from_config(&NamingConfig::default())
    }
}
