//! is-project: protocol file format and validation.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_protocol_file};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported file extension: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk encoding of a protocol file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> ProjectResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ProjectError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

pub fn load_yaml(path: &Path) -> ProjectResult<ProtocolFile> {
    let content = std::fs::read_to_string(path)?;
    let file: ProtocolFile = serde_yaml::from_str(&content)?;
    validate_protocol_file(&file)?;
    Ok(file)
}

pub fn save_yaml(path: &Path, file: &ProtocolFile) -> ProjectResult<()> {
    validate_protocol_file(file)?;
    let content = serde_yaml::to_string(file)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<ProtocolFile> {
    let content = std::fs::read_to_string(path)?;
    let file: ProtocolFile = serde_json::from_str(&content)?;
    validate_protocol_file(&file)?;
    Ok(file)
}

pub fn save_json(path: &Path, file: &ProtocolFile) -> ProjectResult<()> {
    validate_protocol_file(file)?;
    let content = serde_json::to_string_pretty(file)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a protocol file, picking the format from the extension.
pub fn load(path: &Path) -> ProjectResult<ProtocolFile> {
    match FileFormat::from_path(path)? {
        FileFormat::Yaml => load_yaml(path),
        FileFormat::Json => load_json(path),
    }
}

/// Save a protocol file, picking the format from the extension.
pub fn save(path: &Path, file: &ProtocolFile) -> ProjectResult<()> {
    match FileFormat::from_path(path)? {
        FileFormat::Yaml => save_yaml(path, file),
        FileFormat::Json => save_json(path, file),
    }
}
