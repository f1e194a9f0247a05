//! Build Configuration
//!
//! The project layout on disk and the per-invocation build settings.
//! Both are supplied once and read-only during a build.

use std::path::{Path, PathBuf};

use droidforge_toolchain::Abi;
use serde::{Deserialize, Serialize};

/// Where the project's inputs live and where outputs go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectLayout {
    /// Project root directory
    pub root: PathBuf,

    /// Application name; drives output artifact naming
    pub name: String,

    /// Manifest path
    pub manifest: PathBuf,

    /// Program source roots
    pub source_dirs: Vec<PathBuf>,

    /// Resource roots, ordered; later roots win on identifier collisions
    pub resource_dirs: Vec<PathBuf>,

    /// Native source root, when the project carries native code
    pub native_dir: Option<PathBuf>,

    /// External library archives appended to the classpath
    pub external_jars: Vec<PathBuf>,

    /// Directory for all produced artifacts and the fingerprint store
    pub build_dir: PathBuf,
}

impl ProjectLayout {
    /// Conventional layout rooted at a project directory: `src`, `res`,
    /// `jni` (if present), `AndroidManifest.xml`, outputs under `build`.
    pub fn conventional(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let root = root.into();
        let jni = root.join("jni");
        Self {
            manifest: root.join("AndroidManifest.xml"),
            source_dirs: vec![root.join("src")],
            resource_dirs: vec![root.join("res")],
            native_dir: jni.is_dir().then_some(jni),
            external_jars: Vec::new(),
            build_dir: root.join("build"),
            name: name.into(),
            root,
        }
    }

    /// Generated-source directory (resource stub output)
    pub fn gen_dir(&self) -> PathBuf {
        self.build_dir.join("gen")
    }

    /// Compiled-unit output directory
    pub fn classes_dir(&self) -> PathBuf {
        self.build_dir.join("classes")
    }

    /// Per-architecture native library root
    pub fn libs_dir(&self) -> PathBuf {
        self.build_dir.join("libs")
    }

    /// Obfuscation working directory
    pub fn proguard_dir(&self) -> PathBuf {
        self.build_dir.join("proguard")
    }
}

/// Native build mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NativeMode {
    /// One toolchain invocation per architecture, tracked per architecture
    #[default]
    Direct,
    /// One external architecture-aware build invocation for everything;
    /// dependency tracking degrades to the whole native source tree
    Delegated,
}

/// Signing credential reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningInfo {
    pub keystore: PathBuf,
    pub alias: String,
}

/// Obfuscation pass configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProguardConfig {
    /// Configuration files, applied in order
    pub config_files: Vec<PathBuf>,
}

/// Per-invocation build settings. Read-only during a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Requested architectures; ignored when the project has no native code
    pub abis: Vec<Abi>,

    /// Native build mode
    pub native_mode: NativeMode,

    /// Shared library base name (`lib<module>.so`)
    pub native_module: String,

    /// Signing credential; absent means a debug (unsigned) build
    pub signing: Option<SigningInfo>,

    /// Obfuscation pass; absent means compiled units feed the converter
    /// directly
    pub proguard: Option<ProguardConfig>,

    /// Extra resource packager flags
    pub aapt_flags: Vec<String>,

    /// Source compiler flags
    pub javac_flags: Vec<String>,

    /// Extra native compiler flags, applied to every architecture
    pub cflags: Vec<String>,

    /// Bound on concurrent per-architecture native builds
    pub jobs: usize,

    /// Package identity override
    pub package_override: Option<String>,

    /// Entry-point name override
    pub activity_override: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            abis: vec![Abi::ArmeabiV7a],
            native_mode: NativeMode::Direct,
            native_module: "main".to_string(),
            signing: None,
            proguard: None,
            aapt_flags: Vec::new(),
            javac_flags: vec!["-g".to_string(), "-encoding".to_string(), "ascii".to_string()],
            cflags: Vec::new(),
            jobs: 4,
            package_override: None,
            activity_override: None,
        }
    }
}

impl BuildConfig {
    /// Load from a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        toml::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
