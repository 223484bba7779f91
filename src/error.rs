use thiserror::Error;

/// Main error type for Stepsmith operations
#[derive(Error, Debug)]
pub enum StepsmithError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Registry scan error: {0}")]
    Registry(String),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Refusing to write empty artifact: {0}")]
    EmptyArtifact(String),

    #[error("Artifact validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, StepsmithError>;
