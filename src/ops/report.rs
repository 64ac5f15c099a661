//! Text formatting for analysis results.

use std::fmt::Write;

use crate::classpath::{ClasspathEntry, ProjectClasspath};
use crate::core::{Label, PackageLocation};
use crate::ops::analyze::AnalysisReport;
use crate::order::CycleDetected;

/// Format selected packages as an indented tree.
///
/// Directories that are not packages themselves are shown only when they
/// lead to a selected package.
pub fn format_packages(tree: &PackageLocation, selection: &[&PackageLocation]) -> String {
    let mut output = String::new();
    let selected: Vec<&str> = selection.iter().map(|p| p.path()).collect();
    write_package(&mut output, tree, &selected, 0);
    output
}

fn write_package(output: &mut String, node: &PackageLocation, selected: &[&str], depth: usize) {
    let is_selected = selected.contains(&node.path());
    let leads_to_selection = selected.iter().any(|path| node.find(path).is_some());
    if !leads_to_selection {
        return;
    }

    if is_selected {
        writeln!(output, "{}{}", "  ".repeat(depth), node.label()).unwrap();
    }
    let child_depth = if is_selected { depth + 1 } else { depth };
    for child in node.children() {
        write_package(output, child, selected, child_depth);
    }
}

/// Format root labels, one per line.
pub fn format_roots(roots: &[Label]) -> String {
    let mut output = String::new();
    for root in roots {
        writeln!(output, "{}", root).unwrap();
    }
    output
}

/// Format the import order followed by any cycles.
pub fn format_order(order: &[String], cycles: &[CycleDetected]) -> String {
    let mut output = String::new();
    for (i, package) in order.iter().enumerate() {
        writeln!(output, "{:>4}. {}", i + 1, package).unwrap();
    }
    for cycle in cycles {
        writeln!(output).unwrap();
        output.push_str(&cycle.to_diagnostic().format(false));
    }
    output
}

fn entry_flags(entry: &ClasspathEntry) -> String {
    let mut flags = Vec::new();
    if entry.is_test_jar {
        flags.push("test");
    }
    if entry.is_runtime_jar {
        flags.push("runtime");
    }
    if entry.has_source() {
        flags.push("source");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    }
}

/// Format one project's classpath.
pub fn format_classpath(project: &ProjectClasspath) -> String {
    let mut output = String::new();
    let classpath = &project.classpath;

    let status = if classpath.is_complete {
        "complete"
    } else {
        "incomplete"
    };
    writeln!(output, "{} ({})", project.project, status).unwrap();

    if !classpath.project_refs.is_empty() {
        writeln!(output, "  projects:").unwrap();
        for reference in &classpath.project_refs {
            writeln!(output, "    {}", reference.name).unwrap();
        }
    }

    if !classpath.entries.is_empty() {
        writeln!(output, "  entries:").unwrap();
        for entry in &classpath.entries {
            writeln!(output, "    {}{}", entry.path.display(), entry_flags(entry)).unwrap();
        }
    }

    if !classpath.unresolved.is_empty() {
        writeln!(output, "  unresolved:").unwrap();
        for unresolved in &classpath.unresolved {
            writeln!(output, "    {}", unresolved).unwrap();
        }
    }

    output
}

/// Format the full report.
pub fn format_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    writeln!(output, "Workspace: {} ({})", report.workspace, report.root.display()).unwrap();
    if let Some(ref scope) = report.scope {
        writeln!(output, "Scope: {}", scope).unwrap();
    }
    if let Some(ref options) = report.bazel_options {
        if options.is_empty() {
            writeln!(output, "Bazel options: none").unwrap();
        } else {
            writeln!(output, "Bazel options:").unwrap();
            for line in options.to_string().lines() {
                writeln!(output, "  {}", line).unwrap();
            }
        }
    }
    writeln!(
        output,
        "Targets: {} in {} packages\n",
        report.target_count,
        report.packages.len()
    )
    .unwrap();

    writeln!(output, "Roots:").unwrap();
    for root in &report.roots {
        writeln!(output, "  {}", root).unwrap();
    }
    writeln!(output).unwrap();

    if !report.target_cycles.is_empty() {
        writeln!(output, "Target cycles:").unwrap();
        for cycle in &report.target_cycles {
            let labels: Vec<String> = cycle.iter().map(|l| l.to_string()).collect();
            writeln!(output, "  {}", labels.join(" <-> ")).unwrap();
        }
        writeln!(output).unwrap();
    }

    writeln!(output, "Import order:").unwrap();
    output.push_str(&format_order(&report.order, &report.cycles));
    writeln!(output).unwrap();

    writeln!(output, "Classpaths:").unwrap();
    for project in &report.projects {
        output.push_str(&format_classpath(project));
    }

    let incomplete = report
        .projects
        .iter()
        .filter(|p| !p.classpath.is_complete)
        .count();
    writeln!(
        output,
        "\nSummary: {} projects, {} incomplete",
        report.projects.len(),
        incomplete
    )
    .unwrap();

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classpath::{ClasspathResult, ProjectReference, Unresolved};
    use crate::util::bazel::CommandOptions;
    use std::path::PathBuf;

    #[test]
    fn test_format_packages_with_scope() {
        let tree = PackageLocation::from_paths(["app", "app/sub", "lib", "ide/vsc/a", "ide/vsc/b"]);

        let all = format_packages(&tree, &tree.gather_children(None));
        assert_eq!(all, "//app\n  //app/sub\n//ide/vsc/a\n//ide/vsc/b\n//lib\n");

        let scoped = format_packages(&tree, &tree.gather_children(Some("ide/vsc")));
        assert_eq!(scoped, "//ide/vsc/a\n//ide/vsc/b\n");
    }

    #[test]
    fn test_format_order_with_cycle() {
        let cycles = vec![CycleDetected {
            packages: vec!["//p".to_string(), "//q".to_string()],
        }];
        let output = format_order(&["//q".to_string(), "//p".to_string()], &cycles);
        assert!(output.starts_with("   1. //q\n   2. //p\n"));
        assert!(output.contains("cycle: //p -> //q -> //p"));
    }

    #[test]
    fn test_format_classpath() {
        let mut classpath = ClasspathResult::new();
        classpath.entries = vec![
            ClasspathEntry::new("/ws/guava.jar").with_source(Some("/ws/guava-src.jar".into())),
            ClasspathEntry::new("/ws/junit.jar").test(true).runtime(true),
        ];
        classpath.project_refs = vec![ProjectReference {
            name: "//lib".to_string(),
        }];
        classpath.mark_unresolved(Unresolved::Target(Label::parse("@maven//:gson").unwrap()));

        let output = format_classpath(&ProjectClasspath {
            project: "//app".to_string(),
            classpath,
        });
        assert_eq!(
            output,
            "//app (incomplete)\n  projects:\n    //lib\n  entries:\n    /ws/guava.jar [source]\n    /ws/junit.jar [test, runtime]\n  unresolved:\n    @maven//:gson\n"
        );
    }

    #[test]
    fn test_format_report_sections() {
        let label = |s: &str| Label::parse(s).unwrap();
        let report = AnalysisReport {
            workspace: "demo".to_string(),
            root: PathBuf::from("/ws"),
            scope: None,
            packages: vec!["//a".to_string(), "//b".to_string()],
            bazel_options: Some(CommandOptions::parse(
                "INFO: Reading rc options for 'build' from /ws/.bazelrc:\n  'build' options: --javacopt=-Werror\n",
            )),
            target_count: 2,
            roots: vec![],
            target_cycles: vec![vec![label("//a:a"), label("//b:b")]],
            order: vec!["//a".to_string(), "//b".to_string()],
            cycles: vec![CycleDetected {
                packages: vec!["//a".to_string(), "//b".to_string()],
            }],
            projects: vec![],
        };

        let output = format_report(&report);
        assert!(output.starts_with("Workspace: demo (/ws)\nBazel options:\n  build: --javacopt=-Werror\n"));
        assert!(output.contains("Target cycles:\n  //a:a <-> //b:b\n"));
        assert!(output.ends_with("Summary: 0 projects, 0 incomplete\n"));

        let quiet = AnalysisReport {
            bazel_options: Some(CommandOptions::default()),
            target_cycles: vec![],
            ..report
        };
        let output = format_report(&quiet);
        assert!(output.contains("Bazel options: none\n"));
        assert!(!output.contains("Target cycles"));
    }
}
