//! Build error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Failure reported by the source-language compiler for one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{unit}: {message}")]
pub struct CompileError {
    /// File path, namespace, or `<inline>` for in-memory sources
    pub unit: String,
    /// Compiler diagnostic text
    pub message: String,
}

impl CompileError {
    pub fn new(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unresolved namespace '{namespace}' required by {required_by}")]
    UnresolvedNamespace {
        namespace: String,
        required_by: String,
    },

    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Compilation failed for {0}")]
    Compile(#[from] CompileError),

    #[error("No source found for namespace '{namespace}'")]
    NamespaceSourceNotFound { namespace: String },

    #[error("Optimization failed: {}", errors.join("; "))]
    Optimize {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("Optimization level '{level}' requested but no optimizer is configured")]
    OptimizerUnavailable { level: String },

    #[error("Malformed dependency manifest line {line}: {reason}")]
    ManifestParse { line: usize, reason: String },

    #[error("Archive error at {path}: {error}")]
    Archive {
        path: PathBuf,
        error: zip::result::ZipError,
    },

    #[error("Invalid TOML syntax in {file}: {error}")]
    ConfigParse {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidOption { field: String, reason: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an archive error with path context
    pub fn archive(path: impl Into<PathBuf>, error: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            error,
        }
    }

    /// Create a compilation error
    pub fn compilation(unit: impl Into<String>, error: impl ToString) -> Self {
        Self::Compile(CompileError::new(unit, error.to_string()))
    }

    pub fn invalid_option(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = BuildError::CyclicDependency {
            cycle: vec!["x".to_string(), "y".to_string(), "x".to_string()],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: x -> y -> x");
    }

    #[test]
    fn test_optimize_message_joins_errors() {
        let err = BuildError::Optimize {
            errors: vec!["bad token".to_string(), "undefined foo".to_string()],
            warnings: vec![],
        };
        assert_eq!(err.to_string(), "Optimization failed: bad token; undefined foo");
    }

    #[test]
    fn test_compile_error_from() {
        let err: BuildError = CompileError::new("app/core.ql", "unexpected EOF").into();
        assert_eq!(
            err.to_string(),
            "Compilation failed for app/core.ql: unexpected EOF"
        );
    }
}
