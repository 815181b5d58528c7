//! Compilable sources and the compiler collaborator
use crate::archive::ArchiveEntry;
use crate::artifact::Artifact;
use crate::build_order::topological_order;
use crate::error::{BuildError, BuildResult, CompileError};
use crate::options::BuildOptions;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A pre-parsed syntax form, as data
pub type Form = serde_json::Value;

/// Input to a single compiler invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CompileUnit {
    File(PathBuf),
    Text(String),
    Forms(Vec<Form>),
}

impl CompileUnit {
    /// Name used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Text(_) | Self::Forms(_) => "<inline>".to_string(),
        }
    }
}

/// Where compiled output should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// Keep the output in memory only
    InMemory,
    /// Write the output to exactly this file
    File(PathBuf),
    /// Write beneath this directory at the compiler's conventional path
    Directory(PathBuf),
}

/// The source-language compiler.
///
/// Implementations turn one compilation unit into JavaScript and report the
/// namespace it declares plus the namespaces it requires.
pub trait Compiler: Send + Sync {
    /// Compile one unit
    fn compile_unit(
        &self,
        unit: &CompileUnit,
        emit: &Emit,
        options: &BuildOptions,
    ) -> Result<Artifact, CompileError>;

    /// Locate the source file of a language-level namespace
    fn namespace_source(&self, namespace: &str) -> Option<PathBuf>;

    /// File extension of compilable source files
    fn source_extension(&self) -> &str {
        "ql"
    }

    /// Compile every unit beneath `dir`, dependencies first.
    fn compile_tree(
        &self,
        dir: &Path,
        output_dir: &Path,
        options: &BuildOptions,
    ) -> BuildResult<Vec<Artifact>> {
        let emit = Emit::Directory(output_dir.to_path_buf());
        let mut artifacts = Vec::new();

        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                BuildError::io(path, e.into())
            })?;

            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|s| s.to_str()) == Some(self.source_extension())
            {
                let unit = CompileUnit::File(path.to_path_buf());
                artifacts.push(self.compile_unit(&unit, &emit, options)?);
            }
        }

        topological_order(artifacts)
    }
}

/// Anything that can be compiled into JavaScript artifacts
#[derive(Debug, Clone, PartialEq)]
pub enum Compilable {
    /// A source file, or a directory compiled recursively
    File(PathBuf),
    /// A source file inside a zip/jar archive
    Archive(ArchiveEntry),
    /// Source text held in memory
    Text(String),
    /// Pre-parsed syntax forms
    Forms(Vec<Form>),
    /// JavaScript that needs no compilation
    Artifact(Artifact),
}

impl Compilable {
    /// Compile into one or more artifacts.
    ///
    /// Single units compile in memory unless `output_file` names a target.
    /// Directories are written beneath `output_dir` at each unit's
    /// conventional path, and archive members are extracted there first.
    pub fn compile(
        &self,
        compiler: &dyn Compiler,
        options: &BuildOptions,
    ) -> BuildResult<Vec<Artifact>> {
        match self {
            Self::File(path) if path.is_dir() => {
                tracing::debug!(dir = %path.display(), "compiling directory");
                compiler.compile_tree(path, &options.output_dir, options)
            }
            Self::File(path) => {
                tracing::debug!(file = %path.display(), "compiling file");
                compile_one(compiler, CompileUnit::File(path.clone()), options)
            }
            Self::Archive(entry) => {
                let extracted = entry.extract_to(&options.output_dir)?;
                Self::File(extracted).compile(compiler, options)
            }
            Self::Text(text) => compile_one(compiler, CompileUnit::Text(text.clone()), options),
            Self::Forms(forms) => compile_one(compiler, CompileUnit::Forms(forms.clone()), options),
            Self::Artifact(artifact) => Ok(vec![artifact.clone()]),
        }
    }
}

/// Compile one unit, writing it only to an explicitly requested file
fn compile_one(
    compiler: &dyn Compiler,
    unit: CompileUnit,
    options: &BuildOptions,
) -> BuildResult<Vec<Artifact>> {
    let emit = match &options.output_file {
        Some(file) => Emit::File(options.output_dir.join(file)),
        None => Emit::InMemory,
    };
    Ok(vec![compiler.compile_unit(&unit, &emit, options)?])
}

impl From<Artifact> for Compilable {
    fn from(artifact: Artifact) -> Self {
        Self::Artifact(artifact)
    }
}

impl From<ArchiveEntry> for Compilable {
    fn from(entry: ArchiveEntry) -> Self {
        Self::Archive(entry)
    }
}

impl From<Vec<Form>> for Compilable {
    fn from(forms: Vec<Form>) -> Self {
        Self::Forms(forms)
    }
}
