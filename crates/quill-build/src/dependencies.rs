//! Expanding explicit inputs into the full, ordered artifact list
use crate::artifact::Artifact;
use crate::cache::CompileCache;
use crate::compilable::Compiler;
use crate::error::{BuildError, BuildResult};
use crate::namespace::push_unique;
use crate::options::BuildOptions;
use crate::runtime_library::RuntimeLibrary;
use std::collections::HashSet;

/// Resolve everything `inputs` depend on.
///
/// Returns runtime-library files first, then language-level namespaces, then
/// `inputs` unchanged, which is the order they must be loaded in. Requires
/// that one of the inputs provides itself are not resolved again.
pub fn add_dependencies(
    library: &RuntimeLibrary,
    cache: &CompileCache,
    compiler: &dyn Compiler,
    options: &BuildOptions,
    inputs: Vec<Artifact>,
) -> BuildResult<Vec<Artifact>> {
    let provided: HashSet<&str> = inputs
        .iter()
        .flat_map(|a| a.provides.iter().map(String::as_str))
        .collect();

    let mut requires = Vec::new();
    for name in inputs.iter().flat_map(|a| a.requires.iter()) {
        if !provided.contains(name.as_str()) {
            push_unique(&mut requires, name);
        }
    }

    let language_deps = cache.language_dependencies(compiler, options, &requires)?;

    let mut runtime_seed = Vec::new();
    for name in language_deps
        .iter()
        .flat_map(|a| a.requires.iter())
        .chain(requires.iter())
    {
        push_unique(&mut runtime_seed, name);
    }
    let runtime_files = library.dependencies(&runtime_seed)?;
    let runtime_deps = library.artifacts(&runtime_files)?;

    tracing::debug!(
        runtime = runtime_deps.len(),
        language = language_deps.len(),
        inputs = inputs.len(),
        "resolved dependencies"
    );

    let mut sources = runtime_deps;
    sources.extend(language_deps);
    sources.extend(inputs);

    if options.strict_resolution {
        check_resolved(&sources)?;
    }
    Ok(sources)
}

/// Ensure every require is provided by an artifact loaded before it
pub fn check_resolved(sources: &[Artifact]) -> BuildResult<()> {
    let mut provided: HashSet<&str> = HashSet::new();
    for artifact in sources {
        for name in &artifact.requires {
            if !provided.contains(name.as_str()) && !artifact.provides.contains(name) {
                return Err(BuildError::UnresolvedNamespace {
                    namespace: name.clone(),
                    required_by: artifact.label(),
                });
            }
        }
        provided.extend(artifact.provides.iter().map(String::as_str));
    }
    Ok(())
}
