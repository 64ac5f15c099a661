//! Package tree - the workspace's build packages as a hierarchy.
//!
//! Each node is a directory containing a build file. A package hangs under
//! its nearest ancestor package; the root node is the workspace root and is
//! only a package itself when the root directory has a build file.

use std::fmt;

use serde::Serialize;

/// A node in the package tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageLocation {
    /// Workspace-relative path, empty for the workspace root
    path: String,

    /// Whether this directory contains a build file
    is_package: bool,

    /// Child packages, sorted by path
    children: Vec<PackageLocation>,
}

impl PackageLocation {
    /// Create the workspace root node.
    pub fn workspace_root(is_package: bool) -> Self {
        PackageLocation {
            path: String::new(),
            is_package,
            children: Vec::new(),
        }
    }

    /// Create a package node with no children.
    pub fn new(path: impl Into<String>) -> Self {
        PackageLocation {
            path: path.into(),
            is_package: true,
            children: Vec::new(),
        }
    }

    /// Build a tree from a list of workspace-relative package paths.
    ///
    /// An empty path marks the root directory as a package.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths: Vec<String> = paths
            .into_iter()
            .map(|p| p.as_ref().trim_matches('/').to_string())
            .collect();
        paths.sort();
        paths.dedup();

        let mut root = PackageLocation::workspace_root(false);
        for path in paths {
            if path.is_empty() {
                root.is_package = true;
            } else {
                root.insert(path);
            }
        }
        root
    }

    /// Insert a package below its nearest existing ancestor.
    fn insert(&mut self, path: String) {
        let idx = self
            .children
            .iter()
            .position(|child| is_ancestor(&child.path, &path));

        match idx {
            Some(idx) => self.children[idx].insert(path),
            None => {
                let pos = self
                    .children
                    .binary_search_by(|c| c.path.as_str().cmp(path.as_str()))
                    .unwrap_or_else(|p| p);
                self.children.insert(pos, PackageLocation::new(path));
            }
        }
    }

    /// Workspace-relative path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Package label, e.g. `//foo/bar`.
    pub fn label(&self) -> String {
        format!("//{}", self.path)
    }

    /// Last path segment, used for tree display.
    pub fn last_segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Whether this is the workspace root node.
    pub fn is_workspace_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Whether this directory contains a build file.
    pub fn is_package(&self) -> bool {
        self.is_package
    }

    /// Child packages.
    pub fn children(&self) -> &[PackageLocation] {
        &self.children
    }

    /// Find a node by workspace-relative path.
    pub fn find(&self, path: &str) -> Option<&PackageLocation> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .find(|child| child.path == path || is_ancestor(&child.path, path))
            .and_then(|child| child.find(path))
    }

    /// Find the package that contains a directory: the node itself, or its
    /// nearest ancestor that has a build file.
    pub fn nearest_package(&self, path: &str) -> Option<&PackageLocation> {
        let child = self
            .children
            .iter()
            .find(|child| child.path == path || is_ancestor(&child.path, path));

        match child.and_then(|c| c.nearest_package(path)) {
            Some(found) => Some(found),
            None if self.is_package && (self.path == path || is_ancestor(&self.path, path)) => {
                Some(self)
            }
            None => None,
        }
    }

    /// Collect the packages selected for analysis.
    ///
    /// `None` or an empty scope selects every package in the tree. Otherwise
    /// the packages at or below the scope directory are selected. Results are
    /// in depth-first, path-sorted order.
    pub fn gather_children(&self, scope: Option<&str>) -> Vec<&PackageLocation> {
        let scope = scope.map(|s| s.trim_matches('/')).unwrap_or_default();
        let mut selected = Vec::new();
        self.gather_into(scope, &mut selected);
        selected
    }

    fn gather_into<'a>(&'a self, scope: &str, out: &mut Vec<&'a PackageLocation>) {
        let in_scope = scope.is_empty() || self.path == scope || is_ancestor(scope, &self.path);
        if in_scope && self.is_package {
            out.push(self);
        }
        for child in &self.children {
            // Prune subtrees that can neither be in scope nor contain the scope
            if in_scope || child.path == scope || is_ancestor(&child.path, scope) || is_ancestor(scope, &child.path) {
                child.gather_into(scope, out);
            }
        }
    }

    /// Iterate over every package in the tree, depth-first.
    pub fn all_packages(&self) -> Vec<&PackageLocation> {
        self.gather_children(None)
    }
}

impl fmt::Display for PackageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}", self.path)
    }
}

/// Whether `ancestor` is a strict directory ancestor of `path`.
fn is_ancestor(ancestor: &str, path: &str) -> bool {
    if ancestor.is_empty() {
        return !path.is_empty();
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}
