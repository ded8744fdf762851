use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structural cause reported by an embedding collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbedErrorKind {
    /// Weights, tokenizer or remote model could not be loaded.
    ModelLoad,
    /// The requested accelerator (GPU, Metal) is missing or restricted.
    Acceleration,
    /// The model loaded but a forward pass failed.
    Inference,
    /// Output did not match the request (count or dimensionality).
    Shape,
}

impl fmt::Display for EmbedErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmbedErrorKind::ModelLoad => "model loading failed",
            EmbedErrorKind::Acceleration => "accelerator unavailable",
            EmbedErrorKind::Inference => "inference failed",
            EmbedErrorKind::Shape => "unexpected embedding shape",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EmbedError {
    pub kind: EmbedErrorKind,
    pub message: String,
    /// Raw diagnostic text (backend error chain, device info).
    pub detail: Option<String>,
}

impl EmbedError {
    pub fn new(kind: EmbedErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), detail: None }
    }

    pub fn model_load(message: impl Into<String>) -> Self { Self::new(EmbedErrorKind::ModelLoad, message) }

    pub fn acceleration(message: impl Into<String>) -> Self { Self::new(EmbedErrorKind::Acceleration, message) }

    pub fn inference(message: impl Into<String>) -> Self { Self::new(EmbedErrorKind::Inference, message) }

    pub fn shape(message: impl Into<String>) -> Self { Self::new(EmbedErrorKind::Shape, message) }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Full technical description: kind, message and detail on separate lines.
    pub fn technical(&self) -> String {
        match &self.detail {
            Some(d) => format!("{:?}: {}\n{}", self.kind, self.message, d),
            None => format!("{:?}: {}", self.kind, self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_error_display_includes_kind() {
        let err = EmbedError::model_load("weights file not found");
        assert_eq!(err.to_string(), "model loading failed: weights file not found");
    }

    #[test]
    fn embed_error_technical_keeps_detail() {
        let err = EmbedError::acceleration("metal device 0").with_detail("MTLCreateSystemDefaultDevice returned nil");
        let tech = err.technical();
        assert!(tech.starts_with("Acceleration: metal device 0"));
        assert!(tech.contains("returned nil"));
    }

    #[test]
    fn parse_error_names_the_value() {
        let err = ParseEnumError::new("chunk method", "words");
        assert_eq!(err.to_string(), "unknown chunk method: 'words'");
    }
}
