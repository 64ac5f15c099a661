//! Implicit-dependency classpath strategy.
//!
//! The build tool adds some dependencies on its own (the JUnit test runner
//! for test rules, a language runtime) that never show up as edges in the
//! target metadata. This strategy contributes them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classpath::artifacts::ArtifactResolver;
use crate::classpath::{ClasspathEntry, ClasspathResult, ClasspathStrategy, Unresolved};
use crate::core::{Project, TargetInfoStore};

/// Implicit dependency rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImplicitConfig {
    /// Artifacts added to projects with test targets, relative to the output directory
    pub test_runner: Vec<PathBuf>,

    /// Artifacts added to every project, relative to the output directory
    pub runtime: Vec<PathBuf>,
}

impl Default for ImplicitConfig {
    fn default() -> Self {
        ImplicitConfig {
            test_runner: vec![default_test_runner(std::env::consts::OS)],
            runtime: Vec::new(),
        }
    }
}

/// Location of the test runner's interface jar for the host platform.
pub fn default_test_runner(os: &str) -> PathBuf {
    let repo = match os {
        "macos" => "remote_java_tools_darwin",
        "windows" => "remote_java_tools_windows",
        _ => "remote_java_tools_linux",
    };
    PathBuf::from("external/bazel_tools/tools/jdk/_ijar/TestRunner/external")
        .join(repo)
        .join("java_tools/Runner_deploy-ijar.jar")
}

/// Adds dependencies the build tool injects implicitly.
pub struct ImplicitStrategy<'a> {
    config: &'a ImplicitConfig,
    store: &'a TargetInfoStore,
    artifacts: &'a dyn ArtifactResolver,
}

impl<'a> ImplicitStrategy<'a> {
    /// Create a strategy with the given rules.
    pub fn new(
        config: &'a ImplicitConfig,
        store: &'a TargetInfoStore,
        artifacts: &'a dyn ArtifactResolver,
    ) -> Self {
        ImplicitStrategy {
            config,
            store,
            artifacts,
        }
    }

    fn add(&self, result: &mut ClasspathResult, relative: &Path, is_test: bool) {
        match self.artifacts.locate(relative) {
            Some(path) => result
                .entries
                .push(ClasspathEntry::new(path).test(is_test).runtime(is_test)),
            None => {
                tracing::warn!("implicit dependency {} not found", relative.display());
                result.mark_unresolved(Unresolved::Artifact(relative.to_path_buf()));
            }
        }
    }
}

impl ClasspathStrategy for ImplicitStrategy<'_> {
    fn name(&self) -> &str {
        "implicit"
    }

    fn resolve(&self, project: &Project) -> ClasspathResult {
        let mut result = ClasspathResult::new();

        for relative in &self.config.runtime {
            self.add(&mut result, relative, false);
        }

        let has_tests = project
            .targets
            .iter()
            .filter_map(|label| self.store.get(label))
            .any(|info| info.kind.is_test());
        if has_tests {
            for relative in &self.config.test_runner {
                self.add(&mut result, relative, true);
            }
        }

        result
    }
}
