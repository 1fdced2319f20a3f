//! Package transaction queue.

use crate::types::Package;
use std::collections::{BTreeMap, BTreeSet};

/// Packages to erase, reinstall and install in one package-manager run.
///
/// The three sets are keyed by name and kept disjoint: queueing a package
/// moves it out of whichever set held it before. `protect` lists names the
/// package manager must not erase while resolving dependencies.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    install: BTreeMap<String, Package>,
    reinstall: BTreeMap<String, Package>,
    remove: BTreeMap<String, Package>,
    protect: BTreeSet<String>,
}

impl Transaction {
    /// Create an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    fn take(&mut self, name: &str) {
        self.install.remove(name);
        self.reinstall.remove(name);
        self.remove.remove(name);
    }

    /// Queue a fresh install or upgrade.
    pub fn queue_install(&mut self, pkg: Package) {
        self.take(&pkg.name);
        self.install.insert(pkg.name.clone(), pkg);
    }

    /// Queue a forced reinstall of the same version.
    pub fn queue_reinstall(&mut self, pkg: Package) {
        self.take(&pkg.name);
        self.reinstall.insert(pkg.name.clone(), pkg);
    }

    /// Queue an erase.
    pub fn queue_remove(&mut self, pkg: Package) {
        self.take(&pkg.name);
        self.remove.insert(pkg.name.clone(), pkg);
    }

    /// Forbid erasing `name` as a side effect.
    pub fn protect(&mut self, name: impl Into<String>) {
        self.protect.insert(name.into());
    }

    /// Packages to install, sorted by name.
    pub fn installs(&self) -> impl Iterator<Item = &Package> {
        self.install.values()
    }

    /// Packages to reinstall, sorted by name.
    pub fn reinstalls(&self) -> impl Iterator<Item = &Package> {
        self.reinstall.values()
    }

    /// Packages to erase, sorted by name.
    pub fn removals(&self) -> impl Iterator<Item = &Package> {
        self.remove.values()
    }

    /// Protected names, sorted.
    pub fn protected(&self) -> impl Iterator<Item = &str> {
        self.protect.iter().map(String::as_str)
    }

    /// Whether `name` is protected.
    pub fn is_protected(&self, name: &str) -> bool {
        self.protect.contains(name)
    }

    /// Whether nothing is queued. Protection alone does not count.
    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.reinstall.is_empty() && self.remove.is_empty()
    }

    /// One line per queued operation, for logs and previews.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.extend(self.removals().map(|p| format!("erase {p}")));
        lines.extend(self.reinstalls().map(|p| format!("reinstall {p}")));
        lines.extend(self.installs().map(|p| format!("install {p}")));
        lines
    }
}
