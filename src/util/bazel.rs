//! Queries against bazel for workspace facts.
//!
//! Record artifact paths are relative to the execution root, which lives in
//! the output base rather than the workspace, and the binary directory moves
//! with `--symlink_prefix`. Both are asked for once per run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::util::process::ProcessBuilder;

const EXECUTION_ROOT_KEY: &str = "execution_root";
const BIN_DIR_KEY: &str = "bazel-bin";

/// `  'build' options: ...` and `  Inherited 'common' options: ...`
static RC_OPTIONS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:Inherited\s+)?'([\w-]+)' options:\s*(.*)$").unwrap()
});

/// Where bazel keeps build inputs and outputs for a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLayout {
    /// Root that artifact paths in records are relative to
    pub execution_root: PathBuf,

    /// Binary output directory
    pub bin_dir: PathBuf,
}

impl OutputLayout {
    /// The layout implied by the workspace's convenience symlinks.
    pub fn for_workspace(workspace: &Path) -> Self {
        OutputLayout {
            execution_root: workspace.to_path_buf(),
            bin_dir: workspace.join("bazel-bin"),
        }
    }

    /// Ask bazel for the layout of a workspace.
    pub fn query(bazel: &Path, workspace: &Path) -> Result<Self> {
        let output = ProcessBuilder::new(bazel)
            .cwd(workspace)
            .args(["info", EXECUTION_ROOT_KEY, BIN_DIR_KEY])
            .exec_and_check()?;

        let layout = Self::parse(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("unexpected `bazel info` output in {}", workspace.display()))?;
        tracing::debug!(
            "execution root {}, binary directory {}",
            layout.execution_root.display(),
            layout.bin_dir.display()
        );
        Ok(layout)
    }

    /// Parse the `key: value` lines printed by `bazel info execution_root bazel-bin`.
    pub fn parse(info: &str) -> Result<Self> {
        let values: HashMap<&str, &str> = info
            .lines()
            .filter_map(|line| line.split_once(": "))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();

        let path = |key: &str| {
            values
                .get(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .with_context(|| format!("missing `{}`", key))
        };

        Ok(OutputLayout {
            execution_root: path(EXECUTION_ROOT_KEY)?,
            bin_dir: path(BIN_DIR_KEY)?,
        })
    }
}

/// Options the workspace's rc files apply, keyed by the command they are
/// declared for (`common`, `build`, `test`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandOptions {
    options: BTreeMap<String, Vec<String>>,
}

impl CommandOptions {
    /// Ask bazel which rc options apply to a build in the workspace.
    ///
    /// Nothing is built; bazel only announces the options it read.
    pub fn query(bazel: &Path, workspace: &Path) -> Result<Self> {
        let cmd = ProcessBuilder::new(bazel)
            .cwd(workspace)
            .args(["build", "--nobuild", "--announce_rc"]);
        let output = cmd.exec()?;
        if !output.status.success() {
            tracing::debug!("`{}` exited with {:?}", cmd.display_command(), output.status.code());
        }
        Ok(Self::parse(&String::from_utf8_lossy(&output.stderr)))
    }

    /// Parse `--announce_rc` output.
    ///
    /// Only options read from rc files count; options bazel's client adds on
    /// its own are skipped.
    pub fn parse(announce: &str) -> Self {
        let mut options: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut from_rc = false;

        for line in announce.lines() {
            if line.starts_with("INFO:") {
                from_rc = line.contains("Reading rc options");
                continue;
            }
            if !from_rc {
                continue;
            }
            let Some(caps) = RC_OPTIONS_LINE.captures(line) else {
                continue;
            };

            let command = options.entry(caps[1].to_string()).or_default();
            for option in caps[2].split_whitespace() {
                if !command.iter().any(|o| o == option) {
                    command.push(option.to_string());
                }
            }
        }

        CommandOptions { options }
    }

    pub fn is_empty(&self) -> bool {
        self.options.values().all(Vec::is_empty)
    }

    /// Options declared for one command.
    pub fn get(&self, command: &str) -> &[String] {
        self.options.get(command).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Commands and their options, by command name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.options
            .iter()
            .filter(|(_, opts)| !opts.is_empty())
            .map(|(command, opts)| (command.as_str(), opts.as_slice()))
    }
}

impl fmt::Display for CommandOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (command, opts) in self.iter() {
            writeln!(f, "{}: {}", command, opts.join(" "))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info() {
        let layout = OutputLayout::parse(
            "execution_root: /cache/_bazel/abc/execroot/_main\nbazel-bin: /cache/_bazel/abc/execroot/_main/bazel-out/k8-fastbuild/bin\n",
        )
        .unwrap();

        assert_eq!(layout.execution_root, PathBuf::from("/cache/_bazel/abc/execroot/_main"));
        assert!(layout.bin_dir.ends_with("k8-fastbuild/bin"));
    }

    #[test]
    fn test_parse_info_missing_key() {
        let err = OutputLayout::parse("execution_root: /x\n").unwrap_err();
        assert!(err.to_string().contains("bazel-bin"));
    }

    #[test]
    fn test_workspace_layout() {
        let layout = OutputLayout::for_workspace(Path::new("/ws"));
        assert_eq!(layout.execution_root, PathBuf::from("/ws"));
        assert_eq!(layout.bin_dir, PathBuf::from("/ws/bazel-bin"));
    }

    #[test]
    fn test_parse_announce_rc() {
        let announce = "\
INFO: Options provided by the client:
  Inherited 'common' options: --isatty=0 --terminal_columns=80
INFO: Reading rc options for 'build' from /ws/.bazelrc:
  Inherited 'common' options: --enable_bzlmod
INFO: Reading rc options for 'build' from /ws/.bazelrc:
  'build' options: --java_language_version=17 --javacopt=-Xlint:all
INFO: Reading rc options for 'build' from /home/me/.bazelrc:
  'build' options: --java_language_version=17 --disk_cache=/tmp/cache
WARNING: Usage: bazel build <options> <targets>.
";
        let options = CommandOptions::parse(announce);

        assert_eq!(options.get("common"), ["--enable_bzlmod"]);
        assert_eq!(
            options.get("build"),
            ["--java_language_version=17", "--javacopt=-Xlint:all", "--disk_cache=/tmp/cache"]
        );
        assert!(options.get("test").is_empty());
        assert_eq!(
            options.to_string(),
            "build: --java_language_version=17 --javacopt=-Xlint:all --disk_cache=/tmp/cache\ncommon: --enable_bzlmod\n"
        );
    }

    #[test]
    fn test_no_rc_files() {
        let options = CommandOptions::parse(
            "INFO: Options provided by the client:\n  Inherited 'common' options: --isatty=0\n",
        );
        assert!(options.is_empty());
        assert_eq!(options.to_string(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_query_runs_bazel_in_workspace() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bazel = fake::bazel(
            tmp.path(),
            r#"case "$1" in
  info) echo "execution_root: $PWD/execroot"; echo "bazel-bin: $PWD/out/bin" ;;
  build) echo "INFO: Reading rc options for 'build' from $PWD/.bazelrc:" >&2
         echo "  'build' options: --javacopt=-Werror" >&2 ;;
esac"#,
        );
        let ws = tmp.path().canonicalize().unwrap();

        let layout = OutputLayout::query(&bazel, &ws).unwrap();
        assert_eq!(layout.execution_root, ws.join("execroot"));
        assert_eq!(layout.bin_dir, ws.join("out/bin"));

        let options = CommandOptions::query(&bazel, &ws).unwrap();
        assert_eq!(options.get("build"), ["--javacopt=-Werror"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_query_failure_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let bazel = fake::bazel(tmp.path(), "echo 'not a workspace' >&2; exit 2");

        let err = OutputLayout::query(&bazel, tmp.path()).unwrap_err();
        assert!(err.to_string().contains("info execution_root bazel-bin"));
    }
}
