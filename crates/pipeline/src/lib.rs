//! DroidForge Build Pipeline
//!
//! Dependency-driven APK build graph: artifacts and targets, content
//! fingerprints for staleness detection, the pipeline stages that wrap the
//! external toolchain, and the runner that walks the graph and skips
//! everything that is already up to date.

pub mod apk;
pub mod assemble;
pub mod compile;
pub mod config;
pub mod dex;
pub mod finalize;
pub mod fingerprint;
pub mod graph;
pub mod naming;
pub mod native;
pub mod obfuscate;
pub mod registry;
pub mod resources;
pub mod runner;
pub mod tool;

pub use apk::ApkContents;
pub use config::{BuildConfig, NativeMode, ProguardConfig, ProjectLayout, SigningInfo};
pub use finalize::FinalizeState;
pub use fingerprint::{Fingerprint, FingerprintStore};
pub use graph::{Artifact, ArtifactId, ArtifactKind, BuildGraph, BuildTarget, TargetId, TargetKind};
pub use naming::{FileNameStrategy, GeneratedStubStrategy, OutputNamingStrategy};
pub use registry::PipelineRegistry;
pub use runner::{ApkPipeline, BuildOutcome};
pub use tool::{ProcessInvoker, ToolInvocation, ToolInvoker, ToolKind, ToolOutput};

use droidforge_toolchain::ConfigurationError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A required configuration value is absent; raised before any
    /// collaborator is invoked.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Manifest or override file is malformed or missing an element.
    #[error("parse error: {0}")]
    Parse(#[from] droidforge_manifest::ParseError),

    /// A collaborator exited non-zero; diagnostics are surfaced verbatim.
    #[error("{tool} exited with status {status}: {diagnostics}")]
    ExternalTool {
        tool: ToolKind,
        status: i32,
        diagnostics: String,
    },

    /// The source compiler rejected a source set.
    #[error("compile error in {source_set}: {diagnostics}")]
    Compile { source_set: String, diagnostics: String },

    /// The build graph is cyclic or references an unresolved target;
    /// detected at graph construction, never mid-execution.
    #[error("dependency error: {0}")]
    Dependency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fingerprint store error: {0}")]
    Store(#[from] serde_json::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BuildError>;
