//! Base builder carrying the defaults every layer merges over.

use crate::config::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_SEGMENTS, DEFAULT_MIN_AGE_SECS};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("naming.max_attempts", DEFAULT_MAX_ATTEMPTS as i64)?
        .set_default("history.min_age_secs", DEFAULT_MIN_AGE_SECS as i64)?
        .set_default("history.max_segments", DEFAULT_MAX_SEGMENTS as i64)
}
