//! Build options
//!
//! Options can be built in code, or loaded from a TOML file:
//!
//! ```toml
//! output-dir = "target/js"
//! output-to = "target/js/main.js"
//! optimizations = "advanced"
//! flags = ["pretty-print"]
//! language-prefixes = ["quill", "app"]
//! ```
//!
//! Environment variables (`QUILL_OUTPUT_DIR`, `QUILL_OPTIMIZATIONS`) override
//! file values when [`BuildOptions::apply_env_overrides`] is called.

use crate::cache::FreshnessPolicy;
use crate::error::{BuildError, BuildResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Optimization level handed to the optimizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// No optimizer; every artifact is written individually with a manifest
    #[default]
    None,
    Whitespace,
    Simple,
    Advanced,
}

impl OptimizationLevel {
    /// Whether this level selects bundle mode
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Whitespace => write!(f, "whitespace"),
            Self::Simple => write!(f, "simple"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for OptimizationLevel {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "whitespace" => Ok(Self::Whitespace),
            "simple" => Ok(Self::Simple),
            "advanced" => Ok(Self::Advanced),
            other => Err(BuildError::invalid_option(
                "optimizations",
                format!(
                    "'{}' is not one of none, whitespace, simple, advanced",
                    other
                ),
            )),
        }
    }
}

/// Cosmetic output flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFlag {
    PrettyPrint,
    PrintInputDelimiter,
}

/// Destination of the final bundle or manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum OutputTo {
    Path(PathBuf),
    Stdout,
}

impl From<String> for OutputTo {
    fn from(value: String) -> Self {
        if value == "stdout" {
            Self::Stdout
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

/// Configuration for one build
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct BuildOptions {
    /// Directory receiving compiled and materialized files
    pub output_dir: PathBuf,
    /// Where to write the bundle or manifest; `None` only returns it
    pub output_to: Option<OutputTo>,
    /// Output file name for in-memory compiles, relative to `output_dir`
    pub output_file: Option<PathBuf>,
    pub optimizations: OptimizationLevel,
    pub flags: BTreeSet<OutputFlag>,
    /// Extern files appended to the optimizer's defaults
    pub externs: Vec<PathBuf>,
    /// Namespaces under these prefixes are compiled on demand
    pub language_prefixes: Vec<String>,
    /// Fail on requires nothing in the build provides
    pub strict_resolution: bool,
    /// When an existing compiled file may be reused
    pub freshness: FreshnessPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
            output_to: None,
            output_file: None,
            optimizations: OptimizationLevel::None,
            flags: BTreeSet::new(),
            externs: Vec::new(),
            language_prefixes: vec!["quill".to_string()],
            strict_resolution: false,
            freshness: FreshnessPolicy::Exists,
        }
    }
}

impl BuildOptions {
    /// Parse options from TOML text
    pub fn from_toml_str(content: &str) -> BuildResult<Self> {
        Self::parse(content, Path::new("<inline>"))
    }

    /// Load options from a TOML file
    pub fn load_from_file(path: &Path) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, file: &Path) -> BuildResult<Self> {
        let options: Self = toml::from_str(content).map_err(|e| BuildError::ConfigParse {
            file: file.to_path_buf(),
            error: e,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Apply `QUILL_*` environment variable overrides
    pub fn apply_env_overrides(mut self) -> BuildResult<Self> {
        if let Ok(dir) = env::var("QUILL_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Ok(level) = env::var("QUILL_OPTIMIZATIONS") {
            self.optimizations = level.parse()?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate option values
    pub fn validate(&self) -> BuildResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(BuildError::invalid_option(
                "output-dir",
                "output directory cannot be empty",
            ));
        }

        if let Some(file) = &self.output_file {
            if file.is_absolute() {
                return Err(BuildError::invalid_option(
                    "output-file",
                    "must be relative to output-dir",
                ));
            }
        }

        if self.language_prefixes.iter().any(|p| p.is_empty()) {
            return Err(BuildError::invalid_option(
                "language-prefixes",
                "prefixes cannot be empty",
            ));
        }

        Ok(())
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_output_to(mut self, output_to: OutputTo) -> Self {
        self.output_to = Some(output_to);
        self
    }

    pub fn with_output_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.output_file = Some(file.into());
        self
    }

    pub fn with_optimizations(mut self, level: OptimizationLevel) -> Self {
        self.optimizations = level;
        self
    }

    pub fn with_flag(mut self, flag: OutputFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_externs(mut self, externs: Vec<PathBuf>) -> Self {
        self.externs = externs;
        self
    }

    pub fn with_language_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.language_prefixes = prefixes;
        self
    }

    pub fn with_strict_resolution(mut self, strict: bool) -> Self {
        self.strict_resolution = strict;
        self
    }

    pub fn with_freshness(mut self, policy: FreshnessPolicy) -> Self {
        self.freshness = policy;
        self
    }

    /// Whether `namespace` is implemented in the source language
    pub fn is_language_namespace(&self, namespace: &str) -> bool {
        self.language_prefixes.iter().any(|prefix| {
            namespace == prefix
                || namespace
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}
