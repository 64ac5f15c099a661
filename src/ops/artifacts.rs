//! Artifact resolution against bazel's output tree on disk.

use std::path::{Path, PathBuf};

use crate::classpath::{ArtifactCandidate, ArtifactResolver, MetadataArtifactResolver};
use crate::core::{Label, TargetInfo};

/// Resolves artifacts from metadata records, keeping only those that exist.
///
/// A missing companion source artifact is dropped from the candidate rather
/// than dropping the candidate.
#[derive(Debug, Clone)]
pub struct WorkspaceArtifactResolver {
    paths: MetadataArtifactResolver,
}

impl WorkspaceArtifactResolver {
    /// Resolver for record paths under `exec_root` and implicit artifacts
    /// under `bin_dir`.
    pub fn new(exec_root: &Path, bin_dir: &Path) -> Self {
        WorkspaceArtifactResolver {
            paths: MetadataArtifactResolver::new(exec_root, bin_dir),
        }
    }
}

impl ArtifactResolver for WorkspaceArtifactResolver {
    fn resolve_target(&self, label: &Label, info: Option<&TargetInfo>) -> Vec<ArtifactCandidate> {
        self.paths
            .resolve_target(label, info)
            .into_iter()
            .filter(|candidate| {
                let exists = candidate.path.exists();
                if !exists {
                    tracing::debug!("{}: artifact {} does not exist", label, candidate.path.display());
                }
                exists
            })
            .map(|mut candidate| {
                candidate.source_path = candidate.source_path.filter(|p| p.exists());
                candidate
            })
            .collect()
    }

    fn locate(&self, relative: &Path) -> Option<PathBuf> {
        self.paths.locate(relative).filter(|p| p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TargetKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_only_existing_artifacts() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bazel-bin");
        fs::create_dir_all(tmp.path().join("external/maven")).unwrap();
        fs::create_dir_all(bin.join("tools")).unwrap();
        fs::write(tmp.path().join("external/maven/guava.jar"), "").unwrap();
        fs::write(bin.join("tools/runner.jar"), "").unwrap();

        let resolver = WorkspaceArtifactResolver::new(tmp.path(), &bin);

        let guava = TargetInfo::new(Label::parse("@maven//:guava").unwrap(), TargetKind::Import)
            .with_jar(
                "external/maven/guava.jar",
                Some(PathBuf::from("external/maven/guava-src.jar")),
            );
        let candidates = resolver.resolve_target(&guava.label, Some(&guava));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_path, None);

        let gson = TargetInfo::new(Label::parse("@maven//:gson").unwrap(), TargetKind::Import)
            .with_jar("external/maven/gson.jar", None);
        assert!(resolver.resolve_target(&gson.label, Some(&gson)).is_empty());

        assert_eq!(
            resolver.locate(Path::new("tools/runner.jar")),
            Some(bin.join("tools/runner.jar"))
        );
        assert_eq!(resolver.locate(Path::new("tools/missing.jar")), None);
    }

    #[test]
    fn test_external_jars_under_execution_root() {
        let tmp = TempDir::new().unwrap();
        let ws = tmp.path().join("ws");
        let exec_root = tmp.path().join("output_base/execroot/ws");
        let bin = exec_root.join("bazel-out/k8-fastbuild/bin");
        fs::create_dir_all(&ws).unwrap();
        fs::create_dir_all(exec_root.join("external/maven")).unwrap();
        fs::create_dir_all(&bin).unwrap();
        fs::write(exec_root.join("external/maven/guava.jar"), "").unwrap();
        fs::write(bin.join("runner.jar"), "").unwrap();

        let guava = TargetInfo::new(Label::parse("@maven//:guava").unwrap(), TargetKind::Import)
            .with_jar("external/maven/guava.jar", None);

        let from_workspace = WorkspaceArtifactResolver::new(&ws, &ws.join("bazel-bin"));
        assert!(from_workspace.resolve_target(&guava.label, Some(&guava)).is_empty());

        let resolver = WorkspaceArtifactResolver::new(&exec_root, &bin);
        let candidates = resolver.resolve_target(&guava.label, Some(&guava));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].path, exec_root.join("external/maven/guava.jar"));
        assert_eq!(resolver.locate(Path::new("runner.jar")), Some(bin.join("runner.jar")));
    }
}
