//! Compile-on-demand cache for language-level namespaces
//!
//! Each namespace is compiled at most once per cache lifetime. Output already
//! present in the output directory is reused when the [`FreshnessPolicy`]
//! accepts it. Concurrent builds sharing one cache serialize per namespace:
//! the check, compile and insert for a name run under that name's own lock.

mod freshness;

pub use freshness::FreshnessPolicy;

use crate::artifact::{Artifact, Origin};
use crate::build_order::topological_order;
use crate::compilable::{CompileUnit, Compiler, Emit};
use crate::error::{BuildError, BuildResult};
use crate::namespace::relative_output_path;
use crate::options::BuildOptions;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

type Slot = Arc<Mutex<Option<Artifact>>>;

/// Compiled language-level namespaces, keyed by namespace name
#[derive(Debug, Default)]
pub struct CompileCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, namespace: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(namespace.to_string()).or_default().clone()
    }

    /// The compiled artifact for `namespace`.
    ///
    /// Reuses the cached artifact when its output file is still fresh, reads
    /// the output file when it is fresh but not cached, and otherwise compiles
    /// the namespace's source to the output file.
    pub fn get_compiled_namespace(
        &self,
        compiler: &dyn Compiler,
        options: &BuildOptions,
        namespace: &str,
    ) -> BuildResult<Artifact> {
        let output = options.output_dir.join(relative_output_path(namespace));
        let slot = self.slot(namespace);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if options
            .freshness
            .is_fresh(&output, || compiler.namespace_source(namespace))
        {
            if let Some(artifact) = entry.as_ref() {
                tracing::debug!(%namespace, "compile cache hit");
                return Ok(artifact.clone());
            }

            tracing::debug!(%namespace, path = %output.display(), "reusing compiled output");
            let artifact = Artifact::from_disk(&output)?.with_origin(Origin::Language);
            *entry = Some(artifact.clone());
            return Ok(artifact);
        }

        let source = compiler.namespace_source(namespace).ok_or_else(|| {
            BuildError::NamespaceSourceNotFound {
                namespace: namespace.to_string(),
            }
        })?;

        tracing::debug!(%namespace, source = %source.display(), "compiling namespace");
        let artifact = compiler
            .compile_unit(&CompileUnit::File(source), &Emit::File(output), options)?
            .with_origin(Origin::Language);
        *entry = Some(artifact.clone());
        Ok(artifact)
    }

    /// Compile every language-level namespace reachable from `requires`.
    ///
    /// Names outside the language prefixes are ignored. The result is in
    /// dependency order.
    pub fn language_dependencies<S: AsRef<str>>(
        &self,
        compiler: &dyn Compiler,
        options: &BuildOptions,
        requires: &[S],
    ) -> BuildResult<Vec<Artifact>> {
        let mut pending: VecDeque<String> = VecDeque::new();
        for name in requires.iter().map(AsRef::as_ref) {
            if options.is_language_namespace(name) && !pending.iter().any(|p| p == name) {
                pending.push_back(name.to_string());
            }
        }

        let mut visited = HashSet::new();
        let mut found = Vec::new();

        while let Some(namespace) = pending.pop_front() {
            if !visited.insert(namespace.clone()) {
                continue;
            }

            let artifact = self.get_compiled_namespace(compiler, options, &namespace)?;
            for required in &artifact.requires {
                if options.is_language_namespace(required)
                    && !visited.contains(required)
                    && !pending.contains(required)
                {
                    pending.push_back(required.clone());
                }
            }
            found.push(artifact);
        }

        topological_order(found)
    }

    /// Whether `namespace` has been compiled or loaded
    pub fn contains(&self, namespace: &str) -> bool {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(namespace).cloned()
        };
        slot.as_ref().is_some_and(is_filled)
    }

    /// Number of cached namespaces
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.values().cloned().collect()
        };
        slots.iter().filter(|s| is_filled(s)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached namespace
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn is_filled(slot: &Slot) -> bool {
    slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
}
