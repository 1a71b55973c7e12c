//! Random name generation options and alphabet sampling.

use super::unique::NameScope;
use rand::Rng;

const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const NUMERIC: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Characters a random name is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomCharset {
    Alpha,
    Numeric,
    #[default]
    Alphanumeric,
}

impl RandomCharset {
    fn alphabet(self) -> &'static [u8] {
        match self {
            RandomCharset::Alpha => ALPHA,
            RandomCharset::Numeric => NUMERIC,
            RandomCharset::Alphanumeric => ALPHANUMERIC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RandomNameOptions {
    /// Fixed length; overrides `min_length`/`max_length`
    pub length: Option<usize>,
    pub min_length: usize,
    /// Defaults to twice `min_length`
    pub max_length: Option<usize>,
    pub charset: RandomCharset,
    pub prefix: String,
    pub suffix: String,
    /// Where the name must be unique
    pub scope: NameScope,
    /// Check the scope for collisions; disabling trades uniqueness for speed
    pub confirm: bool,
}

impl Default for RandomNameOptions {
    fn default() -> Self {
        Self {
            length: None,
            min_length: 6,
            max_length: None,
            charset: RandomCharset::default(),
            prefix: String::new(),
            suffix: String::new(),
            scope: NameScope::default(),
            confirm: true,
        }
    }
}

impl RandomNameOptions {
    /// Inclusive bounds of the random part's length.
    pub fn length_range(&self) -> (usize, usize) {
        match self.length {
            Some(length) => (length.max(1), length.max(1)),
            None => {
                let min = self.min_length.max(1);
                let max = self.max_length.unwrap_or(min * 2).max(min);
                (min, max)
            }
        }
    }

    /// One candidate; not checked against any scope.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let (min, max) = self.length_range();
        let length = rng.gen_range(min..=max);
        let alphabet = self.charset.alphabet();
        let body: String = (0..length)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect();
        format!("{}{}{}", self.prefix, body, self.suffix)
    }
}
