//! Graph construction errors and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::Label;
use crate::graph::DependencyKind;
use crate::util::diagnostic::Diagnostic;

/// Error building the dependency graph from metadata.
///
/// Both variants mean the metadata itself is malformed, so graph
/// construction stops at the first one found.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum GraphError {
    #[error("`{from}` has a {kind} dependency on `{to}`, which has no metadata record")]
    #[diagnostic(
        code(trellis::graph::dangling_reference),
        help("Re-run metadata collection so that `{to}` is included")
    )]
    DanglingReference {
        from: Label,
        to: Label,
        kind: DependencyKind,
    },

    #[error("`{label}` declares a {kind} dependency on itself")]
    #[diagnostic(code(trellis::graph::self_dependency))]
    SelfDependency { label: Label, kind: DependencyKind },
}

impl GraphError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GraphError::DanglingReference { from, to, kind } => {
                Diagnostic::error(format!("dangling dependency from `{}`", from))
                    .with_context(format!("{} dependency `{}` has no metadata record", kind, to))
                    .with_suggestion(format!(
                        "Re-run metadata collection with `{}` in scope",
                        to.package_label()
                    ))
                    .with_suggestion(
                        "Check that the metadata aspect follows every dependency attribute"
                            .to_string(),
                    )
            }

            GraphError::SelfDependency { label, kind } => {
                Diagnostic::error(format!("`{}` depends on itself", label))
                    .with_context(format!("found in its {} dependencies", kind))
                    .with_suggestion(format!("Remove `{}` from its own dependency list", label))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_diagnostic() {
        let err = GraphError::DanglingReference {
            from: Label::parse("//app:lib").unwrap(),
            to: Label::parse("//missing:dep").unwrap(),
            kind: DependencyKind::Runtime,
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("dangling dependency from `//app:lib`"));
        assert!(output.contains("runtime dependency `//missing:dep`"));
        assert!(output.contains("//missing"));
    }

    #[test]
    fn test_self_dependency_message() {
        let err = GraphError::SelfDependency {
            label: Label::parse("//a:a").unwrap(),
            kind: DependencyKind::Compile,
        };
        assert_eq!(
            err.to_string(),
            "`//a:a` declares a compile dependency on itself"
        );
    }
}
