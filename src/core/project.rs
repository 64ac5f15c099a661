//! Projects - the units an IDE imports.
//!
//! A project corresponds to one selected package and owns the targets
//! declared in that package.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::label::Label;
use crate::core::package::PackageLocation;
use crate::core::target_info::TargetInfoStore;

/// An importable project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Project name, the package label (`//foo/bar`)
    pub name: String,

    /// Workspace-relative package path
    pub package: String,

    /// Targets declared by the project
    pub targets: Vec<Label>,
}

impl Project {
    /// Create a project for a package with the given targets.
    pub fn new(package: impl Into<String>, targets: Vec<Label>) -> Self {
        let package = package.into();
        Project {
            name: format!("//{}", package),
            package,
            targets,
        }
    }

    /// Check whether a label belongs to this project's package.
    pub fn owns(&self, label: &Label) -> bool {
        !label.is_external() && label.package() == self.package
    }
}

/// The set of projects in a run, indexed by package.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: Vec<Project>,
    by_package: HashMap<String, usize>,
}

impl ProjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one project per selected package that owns at least one target.
    pub fn from_packages(packages: &[&PackageLocation], store: &TargetInfoStore) -> Self {
        let mut registry = ProjectRegistry::new();
        for pkg in packages {
            let targets: Vec<Label> = store
                .in_package(pkg.path())
                .map(|info| info.label.clone())
                .collect();
            if targets.is_empty() {
                tracing::debug!("package {} has no targets, not a project", pkg);
                continue;
            }
            registry.add(Project::new(pkg.path(), targets));
        }
        registry
    }

    /// Register a project. A project for an already-registered package is ignored.
    pub fn add(&mut self, project: Project) {
        if self.by_package.contains_key(&project.package) {
            return;
        }
        self.by_package
            .insert(project.package.clone(), self.projects.len());
        self.projects.push(project);
    }

    /// Find the project that owns a label.
    pub fn owning_project(&self, label: &Label) -> Option<&Project> {
        if label.is_external() {
            return None;
        }
        self.by_package
            .get(label.package())
            .map(|&idx| &self.projects[idx])
    }

    /// Find a project by name (`//pkg`) or package path.
    pub fn get(&self, name: &str) -> Option<&Project> {
        let package = name.strip_prefix("//").unwrap_or(name);
        self.by_package.get(package).map(|&idx| &self.projects[idx])
    }

    /// Iterate over projects in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    /// Get the number of projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
