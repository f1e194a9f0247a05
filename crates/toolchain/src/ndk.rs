//! NDK Architecture Variants
//!
//! One `ArchVariant` per requested ABI: the ABI tag paired with its
//! compiler/linker configuration and the minimum platform version. Variants
//! are mutually independent; nothing crosses variants until package
//! assembly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Target ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Abi {
    Arm64V8a,
    ArmeabiV7a,
    X86,
    X86_64,
}

impl Abi {
    /// Directory/package name as used under `lib/<abi>/` in an APK.
    pub fn as_str(&self) -> &'static str {
        match self {
            Abi::Arm64V8a => "arm64-v8a",
            Abi::ArmeabiV7a => "armeabi-v7a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }

    /// Toolchain triple used in compiler binary names.
    pub fn ndk_triple(&self) -> &'static str {
        match self {
            Abi::Arm64V8a => "aarch64-linux-android",
            Abi::ArmeabiV7a => "armv7a-linux-androideabi",
            Abi::X86 => "i686-linux-android",
            Abi::X86_64 => "x86_64-linux-android",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "arm64-v8a" => Some(Abi::Arm64V8a),
            "armeabi-v7a" => Some(Abi::ArmeabiV7a),
            "x86" => Some(Abi::X86),
            "x86_64" => Some(Abi::X86_64),
            _ => None,
        }
    }

    pub fn all() -> &'static [Abi] {
        &[Abi::Arm64V8a, Abi::ArmeabiV7a, Abi::X86, Abi::X86_64]
    }
}

/// An ABI paired with its toolchain configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchVariant {
    pub abi: Abi,
    /// Minimum platform version the compiler targets
    pub api_level: u32,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
}

impl ArchVariant {
    /// Variant with flag defaults appropriate to the ABI and platform
    /// version.
    pub fn new(abi: Abi, api_level: u32) -> Self {
        let mut cflags = vec![
            "-fPIC".to_string(),
            "-ffunction-sections".to_string(),
            "-funwind-tables".to_string(),
            "-fstack-protector".to_string(),
        ];
        match abi {
            Abi::ArmeabiV7a => {
                cflags.extend(
                    ["-march=armv7-a", "-mfloat-abi=softfp", "-mthumb"]
                        .iter()
                        .map(|s| s.to_string()),
                );
            }
            Abi::Arm64V8a | Abi::X86 | Abi::X86_64 => {}
        }
        Self {
            abi,
            api_level,
            cflags,
            ldflags: vec!["-shared".to_string(), "-Wl,--no-undefined".to_string()],
        }
    }

    pub fn with_cflags(mut self, flags: Vec<String>) -> Self {
        self.cflags = flags;
        self
    }

    /// Stable rendering of the full flag set, hashed into the per-variant
    /// rebuild condition.
    pub fn flags_signature(&self) -> String {
        format!(
            "abi={} api={} cflags={} ldflags={}",
            self.abi.as_str(),
            self.api_level,
            self.cflags.join(" "),
            self.ldflags.join(" ")
        )
    }
}

/// NDK installation layout
#[derive(Debug, Clone)]
pub struct NdkToolchain {
    root: PathBuf,
    host_tag: String,
}

impl NdkToolchain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            host_tag: detect_host_tag(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-ABI C compiler, which doubles as the linker driver.
    pub fn clang(&self, variant: &ArchVariant) -> PathBuf {
        let exe_suffix = if cfg!(windows) { ".exe" } else { "" };
        self.root
            .join("toolchains")
            .join("llvm")
            .join("prebuilt")
            .join(&self.host_tag)
            .join("bin")
            .join(format!(
                "{}{}clang{}",
                variant.abi.ndk_triple(),
                variant.api_level,
                exe_suffix
            ))
    }

    /// Architecture-aware delegated build driver.
    pub fn ndk_build(&self) -> PathBuf {
        let name = if cfg!(windows) {
            "ndk-build.cmd"
        } else {
            "ndk-build"
        };
        self.root.join(name)
    }
}

fn detect_host_tag() -> String {
    if cfg!(windows) {
        "windows-x86_64".to_string()
    } else if cfg!(target_os = "macos") {
        "darwin-x86_64".to_string()
    } else {
        "linux-x86_64".to_string()
    }
}
