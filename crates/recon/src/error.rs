use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Unusable column mapping or options (nothing left to compare, zero budget, ...).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty file path, bad threshold, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// CSV decoding error while loading one side.
    #[error("{side} CSV: {message}")]
    Csv { side: String, message: String },
}
