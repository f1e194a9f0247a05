//! Artifact Fingerprints
//!
//! Content-derived digests for staleness detection, and the durable store
//! that persists them across build invocations. Content hashing (rather
//! than modification times) is what makes a no-op rebuild stable even when
//! a collaborator rewrites byte-identical output.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use crate::Result;

/// A content digest recorded at last successful production.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest a single file's contents.
pub fn fingerprint_file(path: &Path) -> std::io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// Digest a directory tree: relative paths plus contents, in sorted order
/// so the result is independent of traversal order. A missing directory
/// digests the same as an empty one.
pub fn fingerprint_tree(dir: &Path) -> std::io::Result<Fingerprint> {
    let mut files: Vec<PathBuf> = Vec::new();
    if dir.is_dir() {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();

    let mut hasher = Sha256::new();
    for file in &files {
        let rel = file.strip_prefix(dir).unwrap_or(file);
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(fingerprint_file(file)?.as_str().as_bytes());
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// Digest an explicit file set, in the given order.
pub fn fingerprint_files(files: &[PathBuf]) -> std::io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(fingerprint_file(file)?.as_str().as_bytes());
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// Digest an ordered list of strings (flag sets, combined input digests).
pub fn fingerprint_strings<S: AsRef<str>>(parts: &[S]) -> Fingerprint {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update([0]);
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

/// What the store remembers about one target's last successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Combined digest of the target's inputs and stage configuration
    pub input_digest: Fingerprint,
    /// Output artifact path → digest at production time
    pub outputs: BTreeMap<String, Fingerprint>,
}

/// Durable fingerprint store, backed by one JSON file under the build
/// directory. Read by every stage; writes are serialized behind a mutex
/// because concurrently-built architectures share the backing file even
/// though they write disjoint keys.
#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    state: Mutex<HashMap<String, TargetRecord>>,
}

impl FingerprintStore {
    /// Load the store, starting empty when no file exists yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Record of a target's last successful run, if any.
    pub fn get(&self, target: &str) -> Option<TargetRecord> {
        self.state.lock().get(target).cloned()
    }

    /// Record a successful run and persist.
    pub fn record(&self, target: &str, record: TargetRecord) -> Result<()> {
        let mut state = self.state.lock();
        state.insert(target.to_string(), record);
        self.persist(&state)
    }

    /// Drop a target's record (used when a stage is reconfigured away).
    pub fn forget(&self, target: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.remove(target).is_some() {
            self.persist(&state)?;
        }
        Ok(())
    }

    fn persist(&self, state: &HashMap<String, TargetRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "persisted fingerprint store");
        Ok(())
    }
}
