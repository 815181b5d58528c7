//! Test doubles and fixtures shared by the integration tests

#![allow(dead_code)]

use quill_build::namespace::relative_output_path;
use quill_build::{
    parse_namespaces, Artifact, CompileError, CompileUnit, Compiler, Emit, OptimizeOptions,
    OptimizeOutcome, Optimizer, RuntimeLibrary,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Compiler double: sources are already JavaScript, so "compiling" copies
/// the text and reports the provide/require statements it declares.
pub struct FakeCompiler {
    pub source_root: PathBuf,
    pub delay: Duration,
    calls: AtomicUsize,
    per_unit: Mutex<HashMap<String, usize>>,
}

impl FakeCompiler {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            per_unit: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total number of compile_unit calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of times the unit declaring `namespace` was compiled
    pub fn compilations_of(&self, namespace: &str) -> usize {
        self.per_unit
            .lock()
            .unwrap()
            .get(namespace)
            .copied()
            .unwrap_or(0)
    }
}

impl Compiler for FakeCompiler {
    fn compile_unit(
        &self,
        unit: &CompileUnit,
        emit: &Emit,
        _options: &quill_build::BuildOptions,
    ) -> Result<Artifact, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        let text = match unit {
            CompileUnit::File(path) => fs::read_to_string(path)
                .map_err(|e| CompileError::new(path.display().to_string(), e.to_string()))?,
            CompileUnit::Text(text) => text.clone(),
            CompileUnit::Forms(forms) => forms
                .iter()
                .map(|f| f.as_str().map(str::to_string).unwrap_or_else(|| f.to_string()))
                .collect::<Vec<_>>()
                .join(";\n"),
        };

        if text.contains("syntax-error") {
            return Err(CompileError::new(unit.describe(), "unbalanced parentheses"));
        }

        let namespaces = parse_namespaces(&text);
        let key = namespaces
            .provides
            .first()
            .cloned()
            .unwrap_or_else(|| unit.describe());
        *self.per_unit.lock().unwrap().entry(key.clone()).or_default() += 1;

        let location = match emit {
            Emit::InMemory => None,
            Emit::File(path) => Some(path.clone()),
            Emit::Directory(dir) => Some(dir.join(relative_output_path(&key))),
        };
        if let Some(path) = &location {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, &text).unwrap();
        }

        Ok(Artifact::compiled(
            text,
            location,
            namespaces.provides,
            namespaces.requires,
        ))
    }

    fn namespace_source(&self, namespace: &str) -> Option<PathBuf> {
        let path = self
            .source_root
            .join(relative_output_path(namespace))
            .with_extension("ql");
        path.exists().then_some(path)
    }
}

/// Optimizer double that concatenates artifact sources in order
#[derive(Default)]
pub struct ConcatOptimizer {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub seen: Mutex<Vec<Vec<String>>>,
}

impl ConcatOptimizer {
    pub fn failing(errors: &[&str], warnings: &[&str]) -> Self {
        Self {
            errors: errors.iter().map(|s| s.to_string()).collect(),
            warnings: warnings.iter().map(|s| s.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Labels of the artifacts passed to each optimize call
    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Optimizer for ConcatOptimizer {
    fn optimize(&self, options: &OptimizeOptions, artifacts: &[Artifact]) -> OptimizeOutcome {
        self.seen
            .lock()
            .unwrap()
            .push(artifacts.iter().map(|a| a.label()).collect());

        if !self.errors.is_empty() {
            return OptimizeOutcome::failed(self.errors.clone())
                .with_warnings(self.warnings.clone());
        }

        let separator = if options.pretty_print() { "\n\n" } else { "\n" };
        let bundle = artifacts
            .iter()
            .map(|a| a.source().unwrap().into_owned())
            .collect::<Vec<_>>()
            .join(separator);
        OptimizeOutcome::succeeded(bundle).with_warnings(self.warnings.clone())
    }
}

/// Scratch project: runtime library, language sources and output directory
pub struct Fixture {
    pub temp: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self {
            temp: TempDir::new().unwrap(),
        };
        fixture.write("lib/bootstrap.js", "var RT = RT || {};");
        fixture.write("lib/deps.js", "");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root().join("lib")
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root().join("src")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root().join("out")
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Add a runtime library file together with its manifest entry
    pub fn runtime_file(&self, file: &str, provides: &[&str], requires: &[&str]) {
        let quote = |names: &[&str]| {
            names
                .iter()
                .map(|n| format!("'{}'", n))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut body = format!("provide('{}');", provides.join("'); provide('"));
        for r in requires {
            body.push_str(&format!(" require('{}');", r));
        }
        self.write(&format!("lib/{}", file), &body);

        let manifest = self.lib_dir().join("deps.js");
        let mut text = fs::read_to_string(&manifest).unwrap();
        text.push_str(&format!(
            "addDependency(\"{}\", [{}], [{}]);\n",
            file,
            quote(provides),
            quote(requires)
        ));
        fs::write(manifest, text).unwrap();
    }

    /// Add a language-level namespace source
    pub fn language_source(&self, namespace: &str, body: &str) -> PathBuf {
        let relative = relative_output_path(namespace).with_extension("ql");
        self.write(&format!("src/{}", relative.display()), body)
    }

    pub fn library(&self) -> RuntimeLibrary {
        RuntimeLibrary::directory(self.lib_dir())
    }

    pub fn compiler(&self) -> FakeCompiler {
        FakeCompiler::new(self.src_dir())
    }
}
