//! When compiled output on disk may be reused

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Rule deciding whether an existing compiled file is still valid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FreshnessPolicy {
    /// Any existing output file is reused, however old
    #[default]
    Exists,
    /// Output must be at least as new as its source file
    NewerThanSource,
}

impl FreshnessPolicy {
    /// Check `output` against this policy.
    ///
    /// `source` is only consulted by policies that compare against the source
    /// file. A source that cannot be located or stat'ed never invalidates an
    /// existing output.
    pub fn is_fresh(&self, output: &Path, source: impl FnOnce() -> Option<PathBuf>) -> bool {
        let Some(output_time) = modified(output) else {
            return false;
        };

        match self {
            Self::Exists => true,
            Self::NewerThanSource => match source().as_deref().and_then(modified) {
                Some(source_time) => output_time >= source_time,
                None => true,
            },
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
