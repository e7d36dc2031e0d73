//! Configuration resolution and validation.

mod cli;
mod types;
mod validation;

pub use cli::{parse_boolean_env, Cli};
pub use types::*;
pub use validation::{validate_config, ConfigError};
