//! Namespace introspection for raw JavaScript text
//!
//! Compiled units report their provides/requires directly. Everything else
//! (inline snippets, files read back from disk) is scanned textually for
//! `provide('ns')` / `require('ns')` statements. The scan stops at the first
//! function literal assignment, so declarations placed after code are missed.

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

fn provide_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(?:[\w$]+\.)*provide\(\s*['"]([^'"]+)['"]\s*\)$"#)
            .expect("provide pattern is valid")
    })
}

fn require_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(?:[\w$]+\.)*require\(\s*['"]([^'"]+)['"]\s*\)$"#)
            .expect("require pattern is valid")
    })
}

fn function_literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"=\s*function\s*\([^)]*\)\s*\{").expect("function pattern is valid")
    })
}

/// Namespaces declared by a piece of JavaScript source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    pub provides: Vec<String>,
    pub requires: Vec<String>,
}

/// Scan `source` for namespace declarations.
///
/// Statements are split on `;`, trimmed, and examined up to the first
/// function literal. Each matching statement contributes exactly one name.
pub fn parse_namespaces(source: &str) -> Namespaces {
    let mut namespaces = Namespaces::default();

    let statements = source
        .split(';')
        .map(str::trim)
        .take_while(|stmt| !function_literal_pattern().is_match(stmt));

    for stmt in statements {
        if let Some(caps) = provide_pattern().captures(stmt) {
            push_unique(&mut namespaces.provides, &caps[1]);
        } else if let Some(caps) = require_pattern().captures(stmt) {
            push_unique(&mut namespaces.requires, &caps[1]);
        }
    }

    namespaces
}

/// Append `name` unless already present, keeping first-seen order
pub(crate) fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

/// Munge a namespace into the file-system friendly form used by compiled output.
pub fn munge(namespace: &str) -> String {
    namespace.replace('-', "_")
}

/// Canonical path of a namespace's compiled output, relative to the output directory.
///
/// `quill.string-utils` becomes `quill/string_utils.js`.
pub fn relative_output_path(namespace: &str) -> PathBuf {
    let mut path: PathBuf = munge(namespace).split('.').collect();
    path.set_extension("js");
    path
}
