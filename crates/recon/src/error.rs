use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty view, bad batch size, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A view lists the same column twice.
    #[error("view '{view}': duplicate column '{column}'")]
    DuplicateColumn { view: String, column: String },
    /// A key column that the view does not carry.
    #[error("view '{view}': key column '{column}' is not in the column list")]
    UnknownKeyColumn { view: String, column: String },
}
