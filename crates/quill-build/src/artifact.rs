//! JavaScript artifacts flowing through the build

use crate::archive::ArchiveEntry;
use crate::error::{BuildError, BuildResult};
use crate::namespace::{parse_namespaces, push_unique};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Where an artifact's text lives outside of memory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A plain file on disk
    File(PathBuf),
    /// A member of a zip/jar archive
    Archive(ArchiveEntry),
}

impl Location {
    /// The on-disk path, if the location is a plain file
    pub fn as_file(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Archive(_) => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Archive(entry) => write!(f, "{}", entry.display_path().display()),
        }
    }
}

/// Which part of the toolchain produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// File of the static runtime library
    RuntimeLibrary,
    /// Language-level namespace compiled on demand
    Language,
    /// Supplied by the caller of the build
    Input,
}

/// One unit of JavaScript.
///
/// An artifact without a [`Location`] always carries its text; an artifact
/// with one may defer reading until [`Artifact::source`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub location: Option<Location>,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub origin: Origin,
    text: Option<String>,
}

impl Artifact {
    /// Artifact from raw JavaScript text, namespaces derived by scanning it
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let namespaces = parse_namespaces(&text);
        Self {
            location: None,
            provides: namespaces.provides,
            requires: namespaces.requires,
            origin: Origin::Input,
            text: Some(text),
        }
    }

    /// Artifact for output the compiler just produced, with its reported namespaces
    pub fn compiled(
        text: impl Into<String>,
        location: Option<PathBuf>,
        provides: Vec<String>,
        requires: Vec<String>,
    ) -> Self {
        Self {
            location: location.map(Location::File),
            provides: dedup(provides),
            requires: dedup(requires),
            origin: Origin::Input,
            text: Some(text.into()),
        }
    }

    /// Read a JavaScript file from disk, scanning it for namespaces
    pub fn from_disk(path: impl Into<PathBuf>) -> BuildResult<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        let namespaces = parse_namespaces(&text);
        Ok(Self {
            location: Some(Location::File(path)),
            provides: namespaces.provides,
            requires: namespaces.requires,
            origin: Origin::Input,
            text: Some(text),
        })
    }

    /// Artifact whose text is read lazily from `location`
    pub fn deferred(location: Location, provides: Vec<String>, requires: Vec<String>) -> Self {
        Self {
            location: Some(location),
            provides: dedup(provides),
            requires: dedup(requires),
            origin: Origin::Input,
            text: None,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Point the artifact at a new location, keeping any text already loaded
    pub fn relocated(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// The JavaScript text, read from the location if not held in memory
    pub fn source(&self) -> BuildResult<Cow<'_, str>> {
        if let Some(text) = &self.text {
            return Ok(Cow::Borrowed(text));
        }

        match &self.location {
            Some(Location::File(path)) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| BuildError::io(path, e)),
            Some(Location::Archive(entry)) => entry.read_to_string().map(Cow::Owned),
            None => Ok(Cow::Borrowed("")),
        }
    }

    /// Whether the text is held in memory
    pub fn is_loaded(&self) -> bool {
        self.text.is_some()
    }

    /// Short name for logs and error messages
    pub fn label(&self) -> String {
        if let Some(ns) = self.provides.first() {
            return ns.clone();
        }
        match &self.location {
            Some(location) => location.to_string(),
            None => "<inline>".to_string(),
        }
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(names.len());
    for name in &names {
        push_unique(&mut unique, name);
    }
    unique
}
