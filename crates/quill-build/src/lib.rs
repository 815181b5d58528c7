//! Quill build orchestration
//!
//! Turns Quill sources into runnable JavaScript:
//! - Compiles files, directories, archive members or in-memory forms
//! - Resolves runtime-library and language-level namespace dependencies
//! - Compiles language-level namespaces on demand, once per cache
//! - Emits one optimized bundle, or per-file output plus a dependency manifest
//!
//! The source-language compiler and the JavaScript optimizer are supplied by
//! the caller through the [`Compiler`] and [`Optimizer`] traits.

pub mod archive;
pub mod artifact;
pub mod build_order;
pub mod builder;
pub mod cache;
pub mod compilable;
pub mod dependencies;
pub mod error;
pub mod namespace;
pub mod optimizer;
pub mod options;
pub mod output;
pub mod runtime_library;

// Re-export main types
pub use archive::ArchiveEntry;
pub use artifact::{Artifact, Location, Origin};
pub use build_order::{
    build_index, topological_order, DependencyDescriptor, DependencyInfo, NamespaceIndex,
};
pub use builder::{Builder, Toolchain};
pub use cache::{CompileCache, FreshnessPolicy};
pub use compilable::{Compilable, CompileUnit, Compiler, Emit, Form};
pub use dependencies::add_dependencies;
pub use error::{BuildError, BuildResult, CompileError};
pub use namespace::{parse_namespaces, Namespaces};
pub use optimizer::{OptimizeOptions, OptimizeOutcome, Optimizer, DEFAULT_EXTERNS};
pub use options::{BuildOptions, OptimizationLevel, OutputFlag, OutputTo};
pub use output::{ensure_on_disk, path_relative_to, write_bundle, write_unoptimized};
pub use runtime_library::{LibrarySource, RuntimeLibrary};
