//! APK Inspection
//!
//! Read-only listing of a produced package, used for the post-build
//! summary and by tests asserting fan-in of per-architecture libraries.

use std::path::Path;

use zip::ZipArchive;

use crate::Result;

/// Entry listing of a produced APK.
#[derive(Debug, Clone)]
pub struct ApkContents {
    pub entries: Vec<String>,
}

impl ApkContents {
    /// Read the entry list of an archive.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not a readable package: {}", path.as_ref().display(), e),
            )
        })?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            if let Ok(entry) = archive.by_index(i) {
                entries.push(entry.name().to_string());
            }
        }
        Ok(Self { entries })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    /// Native libraries by architecture: `(abi, library name)` pairs for
    /// every `lib/<abi>/<name>` entry.
    pub fn native_libs(&self) -> Vec<(String, String)> {
        let mut libs = Vec::new();
        for entry in &self.entries {
            let parts: Vec<&str> = entry.split('/').collect();
            if parts.len() == 3 && parts[0] == "lib" && parts[2].ends_with(".so") {
                libs.push((parts[1].to_string(), parts[2].to_string()));
            }
        }
        libs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_apk(path: &Path, entries: &[&str]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for entry in entries {
            writer.start_file(*entry, FileOptions::default()).unwrap();
            writer.write_all(b"x").unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_native_libs_listing() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("Test-debug.apk");
        write_apk(
            &apk,
            &[
                "classes.dex",
                "resources.arsc",
                "lib/armeabi-v7a/libtest.so",
                "lib/x86/libtest.so",
            ],
        );

        let contents = ApkContents::read(&apk).unwrap();
        assert!(contents.contains("classes.dex"));
        assert_eq!(
            contents.native_libs(),
            vec![
                ("armeabi-v7a".to_string(), "libtest.so".to_string()),
                ("x86".to_string(), "libtest.so".to_string()),
            ]
        );
    }
}
