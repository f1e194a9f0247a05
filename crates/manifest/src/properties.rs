//! default.properties Override File
//!
//! Line-oriented `key=value` file next to the manifest. Only the `target`
//! key matters to the pipeline: its value has the form `<prefix>-<version>`
//! and the version suffix overrides the manifest-declared target platform.

use tracing::warn;

/// Extract the target platform version from properties file content.
///
/// Comments (`#`) and blank lines are ignored. Returns `None` when the
/// `target` key is absent or its value cannot be interpreted, in which case
/// the manifest-declared target governs.
pub fn target_from_properties(content: &str) -> Option<u32> {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != "target" {
            continue;
        }
        // value looks like "android-13"; only the suffix matters
        let Some((_, version)) = value.trim().split_once('-') else {
            warn!(value, "target property has no platform suffix");
            return None;
        };
        return match version.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(value, "unparseable target platform version");
                None
            }
        };
    }
    None
}
