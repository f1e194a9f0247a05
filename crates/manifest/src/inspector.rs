//! AndroidManifest.xml Inspector
//!
//! Parses the manifest for the attributes the build pipeline needs:
//! the package identifier, the first declared activity, and the
//! min/target platform versions.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::properties::target_from_properties;
use crate::ParseError;

/// Sibling file that may override the manifest-declared target version.
const PROPERTIES_FILE: &str = "default.properties";

/// Application metadata resolved once per build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestInfo {
    /// Dotted package identifier (e.g. `com.example.android`)
    pub package: String,
    /// Name of the first declared activity (e.g. `.MyActivity`)
    pub activity: String,
    /// Minimum platform version
    pub min_sdk: u32,
    /// Target platform version, after override resolution
    pub target_sdk: u32,
}

impl ManifestInfo {
    /// Path of the generated resource stub relative to the gen directory.
    pub fn stub_source_path(&self) -> std::path::PathBuf {
        let mut p: std::path::PathBuf = self.package.split('.').collect();
        p.push("R.java");
        p
    }

    /// Component string for launching the entry-point activity.
    pub fn launch_component(&self) -> String {
        format!("{}/{}{}", self.package, self.package, self.activity)
    }
}

/// Manifest inspector
pub struct ManifestInspector;

impl ManifestInspector {
    /// Inspect a manifest file, applying the `default.properties` override
    /// from the same directory when present.
    pub async fn inspect(manifest: impl AsRef<Path>) -> Result<ManifestInfo, ParseError> {
        let manifest = manifest.as_ref();
        let xml = tokio::fs::read_to_string(manifest).await?;

        let override_target = match manifest.parent() {
            Some(dir) if dir.join(PROPERTIES_FILE).exists() => {
                let content = tokio::fs::read_to_string(dir.join(PROPERTIES_FILE)).await?;
                target_from_properties(&content)
            }
            _ => None,
        };

        Self::parse(&xml, override_target)
    }

    /// Parse manifest XML, with an already-resolved override target.
    pub fn parse(xml: &str, override_target: Option<u32>) -> Result<ManifestInfo, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut package: Option<String> = None;
        let mut activity: Option<String> = None;
        let mut min_sdk: Option<u32> = None;
        let mut target_sdk: Option<u32> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                    b"manifest" => {
                        package = get_attr(e, "package");
                    }
                    b"activity" => {
                        // first declared activity is the entry point
                        if activity.is_none() {
                            activity = get_android_attr(e, "name");
                        }
                    }
                    b"uses-sdk" => {
                        min_sdk = parse_sdk_attr(e, "minSdkVersion")?;
                        target_sdk = parse_sdk_attr(e, "targetSdkVersion")?;
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        let package = package.ok_or(ParseError::MissingElement("manifest package attribute"))?;
        let activity = activity.ok_or(ParseError::MissingElement("activity declaration"))?;
        let min_sdk = min_sdk.ok_or(ParseError::MissingElement("uses-sdk minSdkVersion"))?;

        // Override file wins, then the manifest declaration, then min.
        let target_sdk = override_target.or(target_sdk).unwrap_or(min_sdk);

        debug!(%package, %activity, min_sdk, target_sdk, "inspected manifest");

        Ok(ManifestInfo {
            package,
            activity,
            min_sdk,
            target_sdk,
        })
    }
}

/// Get an `android:` namespaced attribute
fn get_android_attr(e: &BytesStart, name: &str) -> Option<String> {
    get_attr(e, &format!("android:{}", name))
}

/// Get an attribute by exact key
fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().filter_map(|a| a.ok()) {
        let key = std::str::from_utf8(attr.key.as_ref()).ok()?;
        if key == name {
            return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
        }
    }
    None
}

fn parse_sdk_attr(e: &BytesStart, name: &'static str) -> Result<Option<u32>, ParseError> {
    match get_android_attr(e, name) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ParseError::InvalidValue(name, v)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.android"
    android:versionCode="1"
    android:versionName="1.0">
    <application android:icon="@drawable/icon" android:label="@string/app_name">
        <activity android:name=".MyActivity" android:label="@string/app_name">
            <intent-filter>
                <action android:name="android.intent.action.MAIN"/>
                <category android:name="android.intent.category.LAUNCHER"/>
            </intent-filter>
        </activity>
    </application>
    <uses-sdk android:targetSdkVersion="10" android:minSdkVersion="4"/>
</manifest>"#;

    #[test]
    fn test_parse_manifest() {
        let info = ManifestInspector::parse(SAMPLE_MANIFEST, None).unwrap();
        assert_eq!(info.package, "com.example.android");
        assert_eq!(info.activity, ".MyActivity");
        assert_eq!(info.min_sdk, 4);
        assert_eq!(info.target_sdk, 10);
    }

    #[test]
    fn test_override_takes_precedence() {
        let info = ManifestInspector::parse(SAMPLE_MANIFEST, Some(13)).unwrap();
        assert_eq!(info.target_sdk, 13);
    }

    #[test]
    fn test_target_falls_back_to_min() {
        let xml = r#"<manifest package="com.example.android">
            <application><activity android:name=".Main"/></application>
            <uses-sdk android:minSdkVersion="9"/>
        </manifest>"#;
        let info = ManifestInspector::parse(xml, None).unwrap();
        assert_eq!(info.target_sdk, 9);
    }

    #[test]
    fn test_missing_package_is_error() {
        let xml = r#"<manifest>
            <application><activity android:name=".Main"/></application>
            <uses-sdk android:minSdkVersion="9"/>
        </manifest>"#;
        assert!(matches!(
            ManifestInspector::parse(xml, None),
            Err(ParseError::MissingElement("manifest package attribute"))
        ));
    }

    #[test]
    fn test_missing_activity_is_error() {
        let xml = r#"<manifest package="com.example.android">
            <uses-sdk android:minSdkVersion="9"/>
        </manifest>"#;
        assert!(matches!(
            ManifestInspector::parse(xml, None),
            Err(ParseError::MissingElement("activity declaration"))
        ));
    }

    #[test]
    fn test_missing_uses_sdk_is_error() {
        let xml = r#"<manifest package="com.example.android">
            <application><activity android:name=".Main"/></application>
        </manifest>"#;
        assert!(matches!(
            ManifestInspector::parse(xml, None),
            Err(ParseError::MissingElement("uses-sdk minSdkVersion"))
        ));
    }

    #[test]
    fn test_stub_source_path() {
        let info = ManifestInspector::parse(SAMPLE_MANIFEST, None).unwrap();
        assert_eq!(
            info.stub_source_path(),
            std::path::Path::new("com/example/android/R.java")
        );
    }

    #[tokio::test]
    async fn test_inspect_applies_properties_override() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("AndroidManifest.xml");
        std::fs::write(&manifest, SAMPLE_MANIFEST).unwrap();
        std::fs::write(
            dir.path().join("default.properties"),
            "\n#blank line test\n\ntarget=android-13\n",
        )
        .unwrap();

        let info = ManifestInspector::inspect(&manifest).await.unwrap();
        assert_eq!(info.target_sdk, 13);
        assert_eq!(info.min_sdk, 4);
    }

    #[test]
    fn test_launch_component() {
        let info = ManifestInspector::parse(SAMPLE_MANIFEST, None).unwrap();
        assert_eq!(
            info.launch_component(),
            "com.example.android/com.example.android.MyActivity"
        );
    }
}
