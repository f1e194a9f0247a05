//! DroidForge - Dependency-Driven APK Build Pipeline
//!
//! Builds an installable Android package from source, resource, and
//! native-code inputs by orchestrating the external toolchain, tracking
//! fine-grained dependencies so unaffected stages are skipped on rebuild.
//!
//! ## Architecture
//!
//! DroidForge is organized into specialized crates:
//!
//! - `droidforge-manifest`: AndroidManifest.xml inspection
//! - `droidforge-toolchain`: layered configuration and SDK/NDK locations
//! - `droidforge-pipeline`: build graph, fingerprint store, and stages

pub use droidforge_manifest as manifest;
pub use droidforge_pipeline as pipeline;
pub use droidforge_toolchain as toolchain;

pub mod commands;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "DroidForge";
