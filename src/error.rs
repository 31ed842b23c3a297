//! Errors raised at collaborator boundaries.

use crate::alert::{Alert, Severity};
use crate::doc::EditError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("invalid document path: {0}")]
    InvalidPath(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("invalid document path: {0}")]
    InvalidPath(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("save rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("failed to start execution: {0}")]
    Spawn(#[from] io::Error),
    #[error("execution stream failed: {0}")]
    Transport(String),
    #[error("execution failed: {0}")]
    Remote(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("reset is not supported by this runner")]
    Unsupported,
    #[error("reset failed: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Any failure a session reports to its alert sink.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Reset(#[from] ResetError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("edit rejected: {0}")]
    Edit(#[from] EditError),
    #[error("editing is disabled")]
    ReadOnly,
    #[error("no code block at the cursor")]
    NoCodeBlock,
    #[error("no document is open")]
    NoDocument,
}

impl EditorError {
    pub fn severity(&self) -> Severity {
        match self {
            EditorError::Load(_) | EditorError::Save(_) | EditorError::Execution(_) => {
                Severity::Error
            }
            EditorError::Reset(_)
            | EditorError::Config(_)
            | EditorError::Edit(_)
            | EditorError::ReadOnly
            | EditorError::NoCodeBlock
            | EditorError::NoDocument => Severity::Warning,
        }
    }

    pub fn to_alert(&self) -> Alert {
        Alert::new(self.severity(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_mapping() {
        let err = EditorError::from(LoadError::NotFound("a.md".into()));
        let alert = err.to_alert();
        assert_eq!(alert.severity, Severity::Error);
        assert_eq!(alert.message, "document not found: a.md");

        let reset = EditorError::from(ResetError::Unsupported);
        assert_eq!(reset.severity(), Severity::Warning);
    }
}
