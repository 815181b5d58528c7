//! Writing build results: optimized bundles or per-file output plus manifest
use crate::artifact::{Artifact, Location, Origin};
use crate::error::{BuildError, BuildResult};
use crate::namespace::relative_output_path;
use crate::optimizer::{OptimizeOptions, Optimizer};
use crate::options::{BuildOptions, OutputTo};
use crate::runtime_library::RuntimeLibrary;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Path beneath the output directory where an artifact is materialized
pub fn output_path(artifact: &Artifact, output_dir: &Path) -> BuildResult<PathBuf> {
    let relative = match (&artifact.location, artifact.provides.first()) {
        (Some(Location::Archive(entry)), _) => entry.relative_path(),
        (_, Some(namespace)) => relative_output_path(namespace),
        (_, None) => {
            let digest = Sha256::digest(artifact.source()?.as_bytes());
            PathBuf::from(format!("inline-{}.js", &format!("{:x}", digest)[..16]))
        }
    };
    Ok(output_dir.join(relative))
}

/// Make sure `artifact` exists as a plain file, returning it with that location.
///
/// Artifacts already on disk are returned unchanged. In-memory and archived
/// artifacts are written beneath the output directory, unless the target file
/// already exists, in which case nothing is written.
pub fn ensure_on_disk(artifact: &Artifact, options: &BuildOptions) -> BuildResult<Artifact> {
    if let Some(Location::File(_)) = &artifact.location {
        return Ok(artifact.clone());
    }

    let target = output_path(artifact, &options.output_dir)?;
    if target.exists() {
        tracing::debug!(path = %target.display(), "already materialized");
    } else {
        let source = artifact.source()?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::write(&target, source.as_bytes()).map_err(|e| BuildError::io(&target, e))?;
        tracing::debug!(artifact = %artifact.label(), path = %target.display(), "materialized");
    }

    Ok(artifact.clone().relocated(Location::File(target)))
}

fn segments(path: &Path) -> Vec<String> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Slash-separated path of `input` relative to the directory holding `base`.
///
/// Both paths must exist; they are compared in canonical form.
pub fn path_relative_to(base: &Path, input: &Path) -> BuildResult<String> {
    let base_path = segments(&fs::canonicalize(base).map_err(|e| BuildError::io(base, e))?);
    let input_path = segments(&fs::canonicalize(input).map_err(|e| BuildError::io(input, e))?);

    let common = base_path
        .iter()
        .zip(&input_path)
        .take_while(|(a, b)| a == b)
        .count();

    if common == base_path.len() {
        return Ok(input_path.last().cloned().unwrap_or_default());
    }

    let ups = base_path.len() - common - 1;
    let relative: Vec<&str> = std::iter::repeat("..")
        .take(ups)
        .chain(input_path[common..].iter().map(String::as_str))
        .collect();
    Ok(relative
        .into_iter()
        .filter(|s| *s != "/" && *s != "\\")
        .collect::<Vec<_>>()
        .join("/"))
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One manifest line for an artifact at `relative_path`
pub fn manifest_line(relative_path: &str, artifact: &Artifact) -> String {
    format!(
        "addDependency(\"{}\", [{}], [{}]);",
        relative_path,
        quoted_list(&artifact.provides),
        quoted_list(&artifact.requires)
    )
}

/// Manifest text for on-disk artifacts, paths relative to the bootstrap file
pub fn dependency_manifest<'a>(
    bootstrap: &Path,
    artifacts: impl IntoIterator<Item = &'a Artifact>,
) -> BuildResult<String> {
    let mut lines = Vec::new();
    for artifact in artifacts {
        let path = match &artifact.location {
            Some(Location::File(path)) => path,
            _ => {
                return Err(BuildError::io(
                    PathBuf::from(artifact.label()),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "artifact is not on disk"),
                ))
            }
        };
        lines.push(manifest_line(&path_relative_to(bootstrap, path)?, artifact));
    }
    Ok(lines.join("\n"))
}

/// Write `text` to the configured destination and hand it back
pub fn emit(text: String, output_to: Option<&OutputTo>) -> BuildResult<String> {
    match output_to {
        Some(OutputTo::Path(path)) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
            fs::write(path, &text).map_err(|e| BuildError::io(path, e))?;
            tracing::info!(path = %path.display(), bytes = text.len(), "wrote output");
        }
        Some(OutputTo::Stdout) => println!("{}", text),
        None => {}
    }
    Ok(text)
}

/// Target path of an artifact `ensure_on_disk` would write, if any
fn planned_target(artifact: &Artifact, options: &BuildOptions) -> BuildResult<Option<PathBuf>> {
    match &artifact.location {
        Some(Location::File(_)) => Ok(None),
        _ => output_path(artifact, &options.output_dir).map(Some),
    }
}

/// Run `ensure_on_disk` over `artifacts` in parallel, keeping their order.
///
/// When several artifacts share a target path, the first one in order claims
/// it and is written in the parallel pass; the rest run afterwards and find
/// the file already present.
fn materialize_all(artifacts: &[Artifact], options: &BuildOptions) -> BuildResult<Vec<Artifact>> {
    let mut claimed = HashSet::new();
    let mut parallel = Vec::with_capacity(artifacts.len());
    let mut deferred = Vec::new();
    for (position, artifact) in artifacts.iter().enumerate() {
        match planned_target(artifact, options)? {
            Some(target) if !claimed.insert(target.clone()) => deferred.push(position),
            _ => parallel.push(position),
        }
    }

    let mut slots: Vec<Option<Artifact>> = vec![None; artifacts.len()];
    let written = parallel
        .par_iter()
        .map(|&position| ensure_on_disk(&artifacts[position], options).map(|a| (position, a)))
        .collect::<BuildResult<Vec<_>>>()?;
    for (position, artifact) in written {
        slots[position] = Some(artifact);
    }
    for position in deferred {
        slots[position] = Some(ensure_on_disk(&artifacts[position], options)?);
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Materialize every artifact and produce the dependency manifest.
///
/// Runtime-library files are materialized but left out of the manifest, as is
/// the runtime library's own manifest file, which is always materialized.
pub fn write_unoptimized(
    library: &RuntimeLibrary,
    options: &BuildOptions,
    artifacts: &[Artifact],
) -> BuildResult<String> {
    let on_disk = materialize_all(artifacts, options)?;

    ensure_on_disk(&library.manifest_artifact(), options)?;
    ensure_on_disk(&library.bootstrap_artifact(), options)?;
    let bootstrap = library.disk_path_of(library.bootstrap(), &options.output_dir);

    let manifest = dependency_manifest(
        &bootstrap,
        on_disk.iter().filter(|a| a.origin != Origin::RuntimeLibrary),
    )?;
    emit(manifest, options.output_to.as_ref())
}

/// Optimize the ordered artifacts into a single bundle.
///
/// Optimizer warnings are logged. Any reported error fails the build with
/// every error and warning attached.
pub fn write_bundle(
    optimizer: &dyn Optimizer,
    options: &BuildOptions,
    artifacts: &[Artifact],
) -> BuildResult<String> {
    let optimize_options = OptimizeOptions::from_build_options(options);
    let outcome = optimizer.optimize(&optimize_options, artifacts);

    for warning in &outcome.warnings {
        tracing::warn!(%warning, "optimizer warning");
    }

    if !outcome.success || !outcome.errors.is_empty() {
        let errors = if outcome.errors.is_empty() {
            vec!["optimizer reported failure without diagnostics".to_string()]
        } else {
            outcome.errors
        };
        return Err(BuildError::Optimize {
            errors,
            warnings: outcome.warnings,
        });
    }

    tracing::info!(
        level = %options.optimizations,
        artifacts = artifacts.len(),
        bytes = outcome.bundle.len(),
        "optimized bundle"
    );
    emit(outcome.bundle, options.output_to.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_manifest_line_format() {
        let artifact = Artifact::compiled(
            "",
            None,
            vec!["ns1".into(), "ns2".into()],
            vec!["req1".into()],
        );
        assert_eq!(
            manifest_line("../app/core.js", &artifact),
            "addDependency(\"../app/core.js\", ['ns1', 'ns2'], ['req1']);"
        );
    }

    #[test]
    fn test_manifest_line_empty_lists() {
        let artifact = Artifact::compiled("", None, vec![], vec![]);
        assert_eq!(
            manifest_line("x.js", &artifact),
            "addDependency(\"x.js\", [], []);"
        );
    }

    #[test]
    fn test_relative_to_sibling_directory() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("out/rt/bootstrap.js");
        let input = temp.path().join("out/app/core.js");
        touch(&base);
        touch(&input);

        assert_eq!(path_relative_to(&base, &input).unwrap(), "../app/core.js");
    }

    #[test]
    fn test_relative_to_same_directory() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("out/bootstrap.js");
        let input = temp.path().join("out/app.js");
        touch(&base);
        touch(&input);

        assert_eq!(path_relative_to(&base, &input).unwrap(), "app.js");
    }

    #[test]
    fn test_relative_to_same_file() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("out/bootstrap.js");
        touch(&base);

        assert_eq!(path_relative_to(&base, &base).unwrap(), "bootstrap.js");
    }

    #[test]
    fn test_relative_to_deeper_base() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("lib/rt/base/bootstrap.js");
        let input = temp.path().join("out/quill/core.js");
        touch(&base);
        touch(&input);

        assert_eq!(
            path_relative_to(&base, &input).unwrap(),
            "../../../out/quill/core.js"
        );
    }

    #[test]
    fn test_output_path_for_namespace() {
        let artifact = Artifact::from_text("provide('app.main-view');");
        assert_eq!(
            output_path(&artifact, Path::new("out")).unwrap(),
            Path::new("out").join("app").join("main_view.js")
        );
    }

    #[test]
    fn test_output_path_for_anonymous_text_is_stable() {
        let a = Artifact::from_text("console.log(1);");
        let b = Artifact::from_text("console.log(1);");
        let c = Artifact::from_text("console.log(2);");

        let path_a = output_path(&a, Path::new("out")).unwrap();
        assert_eq!(path_a, output_path(&b, Path::new("out")).unwrap());
        assert_ne!(path_a, output_path(&c, Path::new("out")).unwrap());
        assert!(path_a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("inline-"));
    }

    #[test]
    fn test_ensure_on_disk_leaves_files_in_place() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lib.js");
        fs::write(&path, "provide('lib');").unwrap();
        let artifact = Artifact::from_disk(&path).unwrap();
        let options = BuildOptions::default().with_output_dir(temp.path().join("out"));

        let result = ensure_on_disk(&artifact, &options).unwrap();
        assert_eq!(result.location, Some(Location::File(path)));
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_emit_to_path_creates_parent() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("dist/js/main.js");

        let text = emit("x".to_string(), Some(&OutputTo::Path(target.clone()))).unwrap();
        assert_eq!(text, "x");
        assert_eq!(fs::read_to_string(target).unwrap(), "x");
    }
}
