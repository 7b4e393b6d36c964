use std::fmt;

/// Errors raised while loading palette configuration.
///
/// Ranking and usage tracking never return errors; only configuration
/// loading can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteError {
    /// Config file could not be read.
    ConfigRead(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (negative weight, zero half-life, etc.).
    ConfigValidation(String),
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigRead(msg) => write!(f, "config read error: {msg}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for PaletteError {}
