//! The static runtime library and its dependency manifest
//!
//! The runtime library ships pre-built JavaScript together with a manifest of
//! `addDependency("file.js", ['provided.ns'], ['required.ns']);` lines. The
//! manifest is parsed into a [`NamespaceIndex`] on first use and kept for the
//! lifetime of the [`RuntimeLibrary`] value.

use crate::archive::ArchiveEntry;
use crate::artifact::{Artifact, Location, Origin};
use crate::build_order::{topological_order, DependencyDescriptor, NamespaceIndex};
use crate::error::{BuildError, BuildResult};
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default bootstrap file, always loaded first
pub const DEFAULT_BOOTSTRAP: &str = "bootstrap.js";
/// Default dependency manifest file name
pub const DEFAULT_MANIFEST: &str = "deps.js";
/// Manifest entries under this directory are vendored code and never indexed
pub const DEFAULT_VENDOR_PREFIX: &str = "third_party/";

/// Where the runtime library files are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// Plain directory on disk
    Directory(PathBuf),
    /// Zip/jar archive, library files living under `prefix`
    Archive { archive: PathBuf, prefix: String },
}

/// The pre-built runtime library with a lazily built namespace index
#[derive(Debug)]
pub struct RuntimeLibrary {
    source: LibrarySource,
    bootstrap: String,
    manifest: String,
    vendor_prefix: String,
    index: OnceLock<NamespaceIndex>,
}

impl RuntimeLibrary {
    /// Runtime library stored in a directory
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        Self::new(LibrarySource::Directory(root.into()))
    }

    /// Runtime library stored under `prefix` inside an archive
    pub fn archive(archive: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self::new(LibrarySource::Archive {
            archive: archive.into(),
            prefix: prefix.into(),
        })
    }

    pub fn new(source: LibrarySource) -> Self {
        Self {
            source,
            bootstrap: DEFAULT_BOOTSTRAP.to_string(),
            manifest: DEFAULT_MANIFEST.to_string(),
            vendor_prefix: DEFAULT_VENDOR_PREFIX.to_string(),
            index: OnceLock::new(),
        }
    }

    /// Set the bootstrap file name (relative to the library root)
    pub fn with_bootstrap(mut self, bootstrap: impl Into<String>) -> Self {
        self.bootstrap = bootstrap.into();
        self
    }

    /// Set the dependency manifest file name (relative to the library root)
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    pub fn with_vendor_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.vendor_prefix = prefix.into();
        self
    }

    /// Use an already known index instead of parsing the manifest
    pub fn with_index(self, index: NamespaceIndex) -> Self {
        // A fresh OnceLock is always empty, so `set` cannot fail here.
        let _ = self.index.set(index);
        self
    }

    pub fn bootstrap(&self) -> &str {
        &self.bootstrap
    }

    pub fn manifest_file(&self) -> &str {
        &self.manifest
    }

    /// The namespace index, parsed from the manifest on first call
    pub fn index(&self) -> BuildResult<&NamespaceIndex> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }

        let text = self.read(&self.manifest)?;
        let descriptors = parse_manifest(&text, &self.vendor_prefix)?;
        tracing::debug!(
            descriptors = descriptors.len(),
            manifest = %self.manifest,
            "indexed runtime library"
        );
        Ok(self.index.get_or_init(|| NamespaceIndex::new(descriptors)))
    }

    /// Where a library-relative file lives
    pub fn location_of(&self, file: &str) -> Location {
        match &self.source {
            LibrarySource::Directory(root) => Location::File(root.join(file)),
            LibrarySource::Archive { archive, prefix } => {
                Location::Archive(ArchiveEntry::new(archive, join_entry(prefix, file)))
            }
        }
    }

    /// Path the library file occupies on disk once materialized under `output_dir`
    pub fn disk_path_of(&self, file: &str, output_dir: &Path) -> PathBuf {
        match self.location_of(file) {
            Location::File(path) => path,
            Location::Archive(entry) => output_dir.join(entry.relative_path()),
        }
    }

    /// Resolve the runtime-library files needed by `requested`, transitively.
    ///
    /// The result starts with the bootstrap file and lists every other file
    /// after the files it requires, each exactly once. Names without a
    /// descriptor are skipped.
    pub fn dependencies<S: AsRef<str>>(&self, requested: &[S]) -> BuildResult<Vec<String>> {
        let index = self.index()?;
        let mut queue: VecDeque<String> =
            requested.iter().map(|s| s.as_ref().to_string()).collect();
        let mut expanded = HashSet::new();
        let mut found = Vec::new();

        while let Some(name) = queue.pop_front() {
            if !expanded.insert(name.clone()) {
                continue;
            }
            match index.get(&name) {
                Some(descriptor) => {
                    queue.extend(descriptor.requires.iter().cloned());
                    found.push(descriptor.clone());
                }
                None => tracing::trace!(namespace = %name, "not a runtime library namespace"),
            }
        }

        let mut files = vec![self.bootstrap.clone()];
        for descriptor in topological_order(found)? {
            if !files.contains(&descriptor.file_path) {
                files.push(descriptor.file_path);
            }
        }
        Ok(files)
    }

    /// Artifacts for the files returned by [`RuntimeLibrary::dependencies`]
    pub fn artifacts(&self, files: &[String]) -> BuildResult<Vec<Artifact>> {
        let index = self.index()?;
        Ok(files
            .iter()
            .map(|file| {
                let (provides, requires) = index
                    .get(file)
                    .map(|d| (d.provides.clone(), d.requires.clone()))
                    .unwrap_or_default();
                Artifact::deferred(self.location_of(file), provides, requires)
                    .with_origin(Origin::RuntimeLibrary)
            })
            .collect())
    }

    /// The bootstrap file as an artifact
    pub fn bootstrap_artifact(&self) -> Artifact {
        Artifact::deferred(self.location_of(&self.bootstrap), vec![], vec![])
            .with_origin(Origin::RuntimeLibrary)
    }

    /// The dependency manifest file as an artifact
    pub fn manifest_artifact(&self) -> Artifact {
        Artifact::deferred(self.location_of(&self.manifest), vec![], vec![])
            .with_origin(Origin::RuntimeLibrary)
    }

    fn read(&self, file: &str) -> BuildResult<String> {
        match self.location_of(file) {
            Location::File(path) => {
                fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))
            }
            Location::Archive(entry) => entry.read_to_string(),
        }
    }
}

fn join_entry(prefix: &str, file: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", prefix, file)
    }
}

fn manifest_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^\s*(?:[\w$]+\.)*addDependency\(\s*['"]([^'"]+)['"]\s*,\s*\[([^\]]*)\]\s*,\s*\[([^\]]*)\]"#,
        )
        .expect("manifest pattern is valid")
    })
}

/// Parse dependency manifest text into descriptors.
///
/// Blank lines and `//` comments are ignored. Entries whose file path lies
/// under `vendor_prefix` (after any leading `../` segments) are excluded.
pub fn parse_manifest(text: &str, vendor_prefix: &str) -> BuildResult<Vec<DependencyDescriptor>> {
    let mut descriptors = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        let caps = manifest_line_pattern().captures(trimmed).ok_or_else(|| {
            BuildError::ManifestParse {
                line: number + 1,
                reason: format!("expected addDependency(...), found `{}`", trimmed),
            }
        })?;

        let file = caps[1].to_string();
        if is_vendored(&file, vendor_prefix) {
            continue;
        }

        descriptors.push(
            DependencyDescriptor::new(file)
                .with_provides(parse_name_list(&caps[2]))
                .with_requires(parse_name_list(&caps[3])),
        );
    }

    Ok(descriptors)
}

fn is_vendored(file: &str, vendor_prefix: &str) -> bool {
    let mut rest = file;
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
    }
    !vendor_prefix.is_empty() && rest.starts_with(vendor_prefix)
}

fn parse_name_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"'))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
