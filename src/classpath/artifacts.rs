//! Artifact resolution - mapping dependency targets to artifact paths.
//!
//! The resolver is a collaborator: the classpath strategies ask it where a
//! target's artifacts live, but never touch the filesystem themselves.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::core::{Label, TargetInfo};

/// Tag marking a target as usable from tests only.
const TESTONLY_TAG: &str = "testonly";

/// A candidate artifact for a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    /// Compiled artifact
    pub path: PathBuf,

    /// Companion source artifact
    pub source_path: Option<PathBuf>,

    /// Whether the producing target is test-only
    pub test_only: bool,
}

/// Resolves dependency targets and implicit artifacts to paths.
pub trait ArtifactResolver: Send + Sync {
    /// Candidate artifacts for a dependency target. Empty when unknown.
    fn resolve_target(&self, label: &Label, info: Option<&TargetInfo>) -> Vec<ArtifactCandidate>;

    /// Locate an artifact given relative to the build output directory.
    fn locate(&self, relative: &Path) -> Option<PathBuf>;
}

/// Resolves artifacts from the `jars` listed in metadata records.
///
/// Paths in records are relative to the execution root; implicit artifacts
/// are relative to the binary output directory. This resolver only joins
/// paths, it does not check that they exist.
#[derive(Debug, Clone)]
pub struct MetadataArtifactResolver {
    exec_root: PathBuf,
    bin_dir: PathBuf,
}

impl MetadataArtifactResolver {
    /// Create a resolver rooted at an execution root and output directory.
    pub fn new(exec_root: impl Into<PathBuf>, bin_dir: impl Into<PathBuf>) -> Self {
        MetadataArtifactResolver {
            exec_root: exec_root.into(),
            bin_dir: bin_dir.into(),
        }
    }

}

impl ArtifactResolver for MetadataArtifactResolver {
    fn resolve_target(&self, _label: &Label, info: Option<&TargetInfo>) -> Vec<ArtifactCandidate> {
        let Some(info) = info else {
            return Vec::new();
        };
        let test_only = info.tags.iter().any(|t| t == TESTONLY_TAG);

        info.jars
            .iter()
            .map(|out| ArtifactCandidate {
                path: self.exec_root.join(&out.jar),
                source_path: out.source_jar.as_ref().map(|s| self.exec_root.join(s)),
                test_only,
            })
            .collect()
    }

    fn locate(&self, relative: &Path) -> Option<PathBuf> {
        Some(self.bin_dir.join(relative))
    }
}

/// Memoizes another resolver for the duration of a run.
///
/// Safe to share between threads resolving different projects. The cache is
/// not locked while the wrapped resolver runs, so two threads may both
/// resolve the same target; the first result stored wins.
#[derive(Debug)]
pub struct CachedArtifactResolver<R> {
    inner: R,
    targets: Mutex<HashMap<Label, Vec<ArtifactCandidate>>>,
    located: Mutex<HashMap<PathBuf, Option<PathBuf>>>,
}

impl<R: ArtifactResolver> CachedArtifactResolver<R> {
    /// Wrap a resolver.
    pub fn new(inner: R) -> Self {
        CachedArtifactResolver {
            inner,
            targets: Mutex::new(HashMap::new()),
            located: Mutex::new(HashMap::new()),
        }
    }

}

/// Look up `key`, computing and storing the value on a miss.
///
/// The lock is released while `compute` runs.
fn cached<K, V>(cache: &Mutex<HashMap<K, V>>, key: &K, compute: impl FnOnce() -> V) -> V
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if let Some(hit) = cache.lock().unwrap_or_else(PoisonError::into_inner).get(key) {
        return hit.clone();
    }

    let value = compute();
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key.clone())
        .or_insert(value)
        .clone()
}

impl<R: ArtifactResolver> ArtifactResolver for CachedArtifactResolver<R> {
    fn resolve_target(&self, label: &Label, info: Option<&TargetInfo>) -> Vec<ArtifactCandidate> {
        cached(&self.targets, label, || self.inner.resolve_target(label, info))
    }

    fn locate(&self, relative: &Path) -> Option<PathBuf> {
        cached(&self.located, &relative.to_path_buf(), || self.inner.locate(relative))
    }
}
