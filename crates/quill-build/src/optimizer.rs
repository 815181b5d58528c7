//! The JavaScript optimizer collaborator
use crate::artifact::Artifact;
use crate::options::{BuildOptions, OptimizationLevel, OutputFlag};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Externs every optimization run starts from
pub const DEFAULT_EXTERNS: &[&str] = &["es6.js", "browser/w3c_dom1.js", "browser/window.js"];

/// Options passed to the optimizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub level: OptimizationLevel,
    pub flags: BTreeSet<OutputFlag>,
    /// Default externs followed by the caller's extra externs
    pub externs: Vec<PathBuf>,
}

impl OptimizeOptions {
    pub fn from_build_options(options: &BuildOptions) -> Self {
        let externs = DEFAULT_EXTERNS
            .iter()
            .map(PathBuf::from)
            .chain(options.externs.iter().cloned())
            .collect();

        Self {
            level: options.optimizations,
            flags: options.flags.clone(),
            externs,
        }
    }

    pub fn pretty_print(&self) -> bool {
        self.flags.contains(&OutputFlag::PrettyPrint)
    }
}

/// What the optimizer reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeOutcome {
    pub success: bool,
    pub bundle: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl OptimizeOutcome {
    pub fn succeeded(bundle: impl Into<String>) -> Self {
        Self {
            success: true,
            bundle: bundle.into(),
            ..Self::default()
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            ..Self::default()
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Merges an ordered artifact sequence into one optimized JavaScript string
pub trait Optimizer: Send + Sync {
    fn optimize(&self, options: &OptimizeOptions, artifacts: &[Artifact]) -> OptimizeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_externs_extend_defaults() {
        let options = BuildOptions::default()
            .with_optimizations(OptimizationLevel::Simple)
            .with_externs(vec![PathBuf::from("externs/jquery.js")]);

        let optimize = OptimizeOptions::from_build_options(&options);
        assert_eq!(optimize.level, OptimizationLevel::Simple);
        assert_eq!(optimize.externs.len(), DEFAULT_EXTERNS.len() + 1);
        assert_eq!(
            optimize.externs.last(),
            Some(&PathBuf::from("externs/jquery.js"))
        );
        assert!(!optimize.pretty_print());
    }

    #[test]
    fn test_pretty_print_flag() {
        let options = BuildOptions::default().with_flag(OutputFlag::PrettyPrint);
        assert!(OptimizeOptions::from_build_options(&options).pretty_print());
    }
}
