//! SDK Tool Locations
//!
//! Paths to the external tools shipped with the platform SDK, plus the
//! platform library jar for a resolved target version.

use std::path::{Path, PathBuf};

/// Platform SDK layout
#[derive(Debug, Clone)]
pub struct SdkTools {
    root: PathBuf,
}

impl SdkTools {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resource packager
    pub fn aapt(&self) -> PathBuf {
        self.platform_tool("aapt")
    }

    /// Bytecode converter
    pub fn dx(&self) -> PathBuf {
        self.platform_tool("dx")
    }

    /// Device install/launch tool
    pub fn adb(&self) -> PathBuf {
        self.platform_tool("adb")
    }

    /// Alignment tool
    pub fn zipalign(&self) -> PathBuf {
        self.root.join("tools").join(exe_name("zipalign"))
    }

    /// Signer; resolved from PATH since it ships with the JDK.
    pub fn jarsigner(&self) -> PathBuf {
        which::which("jarsigner").unwrap_or_else(|_| PathBuf::from("jarsigner"))
    }

    /// Platform library jar for a target platform version.
    pub fn platform_jar(&self, target_sdk: u32) -> PathBuf {
        self.root
            .join("platforms")
            .join(format!("android-{}", target_sdk))
            .join("android.jar")
    }

    /// Package assembler support jars, colon/semicolon-joined for a java
    /// classpath argument.
    pub fn apkbuilder_classpath(&self) -> String {
        let sep = if cfg!(windows) { ";" } else { ":" };
        ["androidprefs.jar", "sdklib.jar"]
            .iter()
            .map(|jar| {
                self.root
                    .join("tools")
                    .join("lib")
                    .join(jar)
                    .to_string_lossy()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn platform_tool(&self, name: &str) -> PathBuf {
        self.root.join("platform-tools").join(exe_name(name))
    }
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}
