use thiserror::Error;

/// Crate-wide error type.
///
/// The analysis core never panics on bad input: malformed trace records are
/// tolerated (clamped and logged), everything else surfaces through this
/// enum unchanged.
#[derive(Error, Debug)]
pub enum BhaError {
    #[error("analysis error: {0}")]
    Analysis(String),

    /// A DAG-required operation hit a cycle. Carries one offending cycle.
    #[error("circular dependency: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("snapshot already exists: {0} (delete it first or pass --force)")]
    AlreadyExists(String),

    #[error("invalid snapshot name: {0}")]
    InvalidName(String),

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(String),

    #[error("resource limit exceeded: {0}")]
    ResourceExhausted(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BhaError {
    /// Wraps an I/O error with an operation description.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        BhaError::Io {
            message: message.into(),
            source,
        }
    }

    /// True for errors that describe a bad graph rather than a bad environment.
    pub fn is_graph_error(&self) -> bool {
        matches!(self, BhaError::CircularDependency { .. })
    }
}

impl From<std::io::Error> for BhaError {
    fn from(source: std::io::Error) -> Self {
        BhaError::Io {
            message: format!("I/O error: {source}"),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BhaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_renders_path() {
        let err = BhaError::CircularDependency {
            cycle: vec!["a.h".into(), "b.h".into(), "a.h".into()],
        };
        assert_eq!(err.to_string(), "circular dependency: a.h -> b.h -> a.h");
        assert!(err.is_graph_error());
    }

    #[test]
    fn io_wraps_message() {
        let err = BhaError::io(
            "failed to write snapshot: /tmp/x.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to write snapshot: /tmp/x.json");
    }
}
