//! Build orchestration: compile, resolve dependencies, write output
use crate::artifact::Artifact;
use crate::cache::CompileCache;
use crate::compilable::{Compilable, Compiler};
use crate::dependencies::add_dependencies;
use crate::error::{BuildError, BuildResult};
use crate::optimizer::Optimizer;
use crate::options::{BuildOptions, OptimizationLevel};
use crate::output::{write_bundle, write_unoptimized};
use crate::runtime_library::RuntimeLibrary;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Long-lived collaborators and caches shared by successive builds.
///
/// Cloning is cheap and clones share the runtime library index and the
/// compile cache, so a REPL or watch loop can keep one toolchain for the
/// whole process while tests start from a fresh one.
#[derive(Clone)]
pub struct Toolchain {
    pub library: Arc<RuntimeLibrary>,
    pub cache: Arc<CompileCache>,
    pub compiler: Arc<dyn Compiler>,
    pub optimizer: Option<Arc<dyn Optimizer>>,
}

impl Toolchain {
    /// Create a toolchain with an empty compile cache and no optimizer
    pub fn new(library: RuntimeLibrary, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            library: Arc::new(library),
            cache: Arc::new(CompileCache::new()),
            compiler,
            optimizer: None,
        }
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn Optimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Share an existing compile cache
    pub fn with_cache(mut self, cache: Arc<CompileCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Expand `inputs` with all runtime-library and language-level dependencies
    pub fn add_dependencies(
        &self,
        options: &BuildOptions,
        inputs: Vec<Artifact>,
    ) -> BuildResult<Vec<Artifact>> {
        add_dependencies(
            &self.library,
            &self.cache,
            self.compiler.as_ref(),
            options,
            inputs,
        )
    }
}

/// Main builder for orchestrating builds
pub struct Builder {
    toolchain: Toolchain,
    options: BuildOptions,
}

impl Builder {
    /// Create a new builder with default options
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            options: BuildOptions::default(),
        }
    }

    /// Set build options
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Set optimization level
    pub fn with_optimization(mut self, level: OptimizationLevel) -> Self {
        self.options.optimizations = level;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Build `source` into a single JavaScript string.
    ///
    /// With optimizations enabled the string is the optimized bundle;
    /// otherwise every artifact is written to the output directory and the
    /// string is the dependency manifest.
    pub fn build(&self, source: &Compilable) -> BuildResult<String> {
        let build_start = Instant::now();
        let options = &self.options;
        options.validate()?;

        // Fail before compiling anything if the bundle cannot be produced
        let optimizer = if options.optimizations.is_enabled() {
            let optimizer = self.toolchain.optimizer.as_ref().ok_or_else(|| {
                BuildError::OptimizerUnavailable {
                    level: options.optimizations.to_string(),
                }
            })?;
            Some(optimizer)
        } else {
            None
        };

        let compiled = source.compile(self.toolchain.compiler.as_ref(), options)?;
        let sources = self.toolchain.add_dependencies(options, compiled)?;

        let output = match optimizer {
            Some(optimizer) => write_bundle(optimizer.as_ref(), options, &sources)?,
            None => write_unoptimized(&self.toolchain.library, options, &sources)?,
        };

        tracing::info!(
            artifacts = sources.len(),
            optimizations = %options.optimizations,
            elapsed_ms = elapsed_ms(build_start.elapsed()),
            "build completed"
        );
        Ok(output)
    }
}

/// Whole milliseconds in `elapsed`, saturating at `u64::MAX`
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
