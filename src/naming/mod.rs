//! Name generation
//!
//! - [`codec`]: numeric suffix parsing, truncation and incrementing
//! - [`format`]: the name format mini-language
//! - [`random`]: random name candidates
//! - [`unique`]: scope-aware unique name assignment

pub mod codec;
pub mod format;
pub mod random;
pub mod unique;

pub use codec::{NameCodec, NameSuffix, STAMP_DIGITS};
pub use format::{default_format, FormatInterpreter, NameFormat, RandomNames};
pub use random::{RandomCharset, RandomNameOptions};
pub use unique::{NameScope, NameService};
