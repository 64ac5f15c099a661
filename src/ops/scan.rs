//! Workspace scanning - finding build packages on disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::core::PackageLocation;

/// Files that make a directory a package.
pub const BUILD_FILES: &[&str] = &["BUILD.bazel", "BUILD"];

static MODULE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bmodule\s*\([^)]*?\bname\s*=\s*["']([^"']+)["']"#).unwrap()
});

static WORKSPACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bworkspace\s*\([^)]*?\bname\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// Scan a workspace for packages.
///
/// Hidden directories, `bazel-*` output links and the ignored
/// workspace-relative paths are not descended into.
pub fn scan_workspace(root: &Path, ignore: &BTreeSet<PathBuf>) -> Result<PackageLocation> {
    let mut packages = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| should_descend(root, entry, ignore));

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
        if !is_package_dir(entry.path()) {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} is outside the workspace", entry.path().display()))?;
        let path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        tracing::debug!("found package //{}", path);
        packages.push(path);
    }

    tracing::info!("found {} packages in {}", packages.len(), root.display());
    Ok(PackageLocation::from_paths(packages))
}

fn should_descend(root: &Path, entry: &DirEntry, ignore: &BTreeSet<PathBuf>) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if !entry.file_type().is_dir() {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') || name.starts_with("bazel-") {
        return false;
    }

    match entry.path().strip_prefix(root) {
        Ok(rel) => !ignore.contains(rel),
        Err(_) => false,
    }
}

fn is_package_dir(dir: &Path) -> bool {
    BUILD_FILES.iter().any(|name| dir.join(name).is_file())
}

/// Name of the workspace.
///
/// Taken from `module(name = ...)` in `MODULE.bazel`, then from
/// `workspace(name = ...)` in `WORKSPACE` or `WORKSPACE.bazel`, falling back
/// to the directory name.
pub fn workspace_name(root: &Path) -> String {
    let declared = [
        ("MODULE.bazel", &*MODULE_NAME),
        ("WORKSPACE.bazel", &*WORKSPACE_NAME),
        ("WORKSPACE", &*WORKSPACE_NAME),
    ]
    .into_iter()
    .find_map(|(file, re)| {
        let contents = std::fs::read_to_string(root.join(file)).ok()?;
        re.captures(&contents).map(|c| c[1].to_string())
    });

    declared.unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}
