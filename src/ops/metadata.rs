//! Metadata ingestion - loading per-target records.
//!
//! Records are JSON files named `*.trellis-info.json`, one per target. They
//! either come pre-produced in a directory or are produced by running the
//! build tool with the metadata aspect.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;
use walkdir::WalkDir;

use crate::core::{PackageLocation, TargetInfo};
use crate::util::config::ASPECT_FILE;
use crate::util::process::ProcessBuilder;

/// Suffix of metadata record files.
pub const RECORD_SUFFIX: &str = ".trellis-info.json";

/// Name of the aspect's output group.
pub const OUTPUT_GROUP: &str = "trellis_info";

/// Repository name the aspect directory is mounted under.
const ASPECT_REPO: &str = "trellis_aspect";

/// Exit code bazel uses when some targets failed to build.
const BUILD_FAILED_EXIT: i32 = 1;

/// A source of target metadata records.
pub trait MetadataSource {
    /// Short description for logging.
    fn describe(&self) -> String;

    /// Collect records for the selected packages.
    ///
    /// Targets without metadata are absent from the result, not errors.
    fn collect(&self, packages: &[&PackageLocation]) -> Result<Vec<TargetInfo>>;
}

/// Parse a single record file.
pub fn read_record(path: &Path) -> Result<TargetInfo> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read metadata record: {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse metadata record: {}", path.display()))
}

/// Parse record files, skipping any that cannot be read.
///
/// A bad record leaves its target without metadata.
pub fn read_record_files<P: AsRef<Path>>(paths: &[P]) -> Vec<TargetInfo> {
    paths
        .iter()
        .filter_map(|path| match read_record(path.as_ref()) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!("skipping metadata record: {:#}", e);
                None
            }
        })
        .collect()
}

/// Read every record file below a directory, in path order.
pub fn read_records(dir: &Path) -> Result<Vec<TargetInfo>> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        let is_record = entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(RECORD_SUFFIX);
        if is_record {
            paths.push(entry.into_path());
        }
    }

    let infos = read_record_files(&paths);
    tracing::debug!("read {} metadata records from {}", infos.len(), dir.display());
    Ok(infos)
}

/// The part of a build event that lists output files.
#[derive(Debug, Deserialize)]
struct BuildEvent {
    #[serde(rename = "namedSetOfFiles")]
    named_set_of_files: Option<NamedSetOfFiles>,
}

#[derive(Debug, Deserialize)]
struct NamedSetOfFiles {
    #[serde(default)]
    files: Vec<BuildEventFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildEventFile {
    name: String,
    uri: Option<String>,
    #[serde(default)]
    path_prefix: Vec<String>,
}

impl BuildEventFile {
    /// Local path of the file. Non-file URIs fall back to the path prefix
    /// under the execution root.
    fn local_path(&self, exec_root: &Path) -> PathBuf {
        let from_uri = self
            .uri
            .as_deref()
            .and_then(|uri| Url::parse(uri).ok())
            .filter(|url| url.scheme() == "file")
            .and_then(|url| url.to_file_path().ok());

        from_uri.unwrap_or_else(|| {
            let mut path = exec_root.to_path_buf();
            path.extend(&self.path_prefix);
            path.join(&self.name)
        })
    }
}

/// Record files a build reported in its JSON build event file, in path order.
///
/// Only files the build itself named are returned, so records left in the
/// output tree by earlier builds are never picked up.
pub fn build_event_records(events: &str, exec_root: &Path) -> Vec<PathBuf> {
    let mut records = BTreeSet::new();

    for (index, line) in events.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: BuildEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("skipping unreadable build event on line {}: {}", index + 1, e);
                continue;
            }
        };

        let files = event.named_set_of_files.into_iter().flat_map(|set| set.files);
        for file in files.filter(|f| f.name.ends_with(RECORD_SUFFIX)) {
            records.insert(file.local_path(exec_root));
        }
    }

    records.into_iter().collect()
}

/// Pre-produced records in a directory.
///
/// Every record in the directory is loaded; the selection only decides which
/// packages become projects.
#[derive(Debug, Clone)]
pub struct DirectoryMetadataSource {
    dir: PathBuf,
}

impl DirectoryMetadataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryMetadataSource { dir: dir.into() }
    }
}

impl MetadataSource for DirectoryMetadataSource {
    fn describe(&self) -> String {
        format!("records in {}", self.dir.display())
    }

    fn collect(&self, _packages: &[&PackageLocation]) -> Result<Vec<TargetInfo>> {
        read_records(&self.dir)
    }
}

/// Records produced by running `bazel build` with the metadata aspect.
#[derive(Debug, Clone)]
pub struct BazelMetadataSource {
    bazel: PathBuf,
    workspace: PathBuf,
    exec_root: PathBuf,
    aspect_dir: Option<PathBuf>,
}

impl BazelMetadataSource {
    /// Create a source running `bazel` in `workspace`.
    ///
    /// With an aspect directory the aspect is loaded from there; otherwise
    /// the workspace must already define the `@trellis_aspect` repository.
    pub fn new(
        bazel: impl Into<PathBuf>,
        workspace: impl Into<PathBuf>,
        exec_root: impl Into<PathBuf>,
        aspect_dir: Option<PathBuf>,
    ) -> Self {
        BazelMetadataSource {
            bazel: bazel.into(),
            workspace: workspace.into(),
            exec_root: exec_root.into(),
            aspect_dir,
        }
    }

    /// The build command for a selection of packages, reporting its outputs
    /// to `events`.
    pub fn build_command(&self, packages: &[&PackageLocation], events: &Path) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.bazel)
            .cwd(&self.workspace)
            .arg("build")
            .arg("--keep_going")
            .arg(format!(
                "--aspects=@{}//:{}%{}",
                ASPECT_REPO, ASPECT_FILE, OUTPUT_GROUP
            ))
            .arg(format!("--output_groups={}", OUTPUT_GROUP))
            .arg(format!("--build_event_json_file={}", events.display()));

        if let Some(ref dir) = self.aspect_dir {
            cmd = cmd.arg(format!(
                "--override_repository={}={}",
                ASPECT_REPO,
                dir.display()
            ));
        }

        cmd.arg("--")
            .args(packages.iter().map(|p| format!("{}:*", p.label())))
    }
}

impl MetadataSource for BazelMetadataSource {
    fn describe(&self) -> String {
        format!("`{} build` in {}", self.bazel.display(), self.workspace.display())
    }

    fn collect(&self, packages: &[&PackageLocation]) -> Result<Vec<TargetInfo>> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }

        let events = tempfile::NamedTempFile::new().context("failed to create build event file")?;
        let cmd = self.build_command(packages, events.path());
        tracing::info!("collecting metadata for {} packages", packages.len());
        let output = cmd.exec()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if output.status.code() == Some(BUILD_FAILED_EXIT) {
                // Partial metadata is still usable
                tracing::warn!("some targets failed to build; their metadata will be missing");
                tracing::debug!("{}", stderr);
            } else {
                bail!(
                    "`{}` failed with exit code {:?}\n{}",
                    cmd.display_command(),
                    output.status.code(),
                    stderr
                );
            }
        }

        let contents = std::fs::read_to_string(events.path())
            .with_context(|| format!("failed to read build events: {}", events.path().display()))?;
        let records = build_event_records(&contents, &self.exec_root);
        tracing::debug!("build reported {} metadata records", records.len());

        Ok(read_record_files(&records))
    }
}
