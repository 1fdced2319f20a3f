//! Three-way reconciliation
//!
//! Compares the resources declared at the deployed revision, the resources
//! declared at the target revision and what is actually on the host, and
//! turns the result into a [`DeploymentPlan`]. Every divergence is recorded;
//! nothing short-circuits, so one run reports everything at once.

use crate::context::{Event, LiveState, CrontabService, RevisionSource};
use crate::diff::{DiffMode, unified_diff};
use crate::error::Result;
use crate::hash::{ContentHash, ObjectHasher};
use crate::resource::{FileResource, ResourceSet, partition};
use crate::types::{Action, DeploymentPlan, ReconcileOptions};
use rpmkit::{Package, Transaction, TransactionOutcome};
use std::cmp::Ordering;

/// Where to fetch file content at the deployed and target revisions.
pub struct History<'a> {
    pub source: &'a dyn RevisionSource,
    /// Deployed revision, `None` on a first deployment
    pub deployed: Option<String>,
    /// Target revision
    pub newest: String,
}

/// Builds a [`DeploymentPlan`] from two resource sets and the live system.
pub struct Reconciler<'a> {
    live: &'a dyn LiveState,
    crontabs: &'a dyn CrontabService,
    packages: &'a rpmkit::Client,
    hasher: &'a dyn ObjectHasher,
    options: ReconcileOptions,
    history: Option<History<'a>>,
}

/// Actions per class, assembled in execution order at the end.
#[derive(Default)]
struct Pending {
    deletes: Vec<Action>,
    adds: Vec<Action>,
    updates: Vec<Action>,
    crontab_deletes: Vec<Action>,
    crontab_writes: Vec<Action>,
    transaction: Transaction,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        live: &'a dyn LiveState,
        crontabs: &'a dyn CrontabService,
        packages: &'a rpmkit::Client,
        hasher: &'a dyn ObjectHasher,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            live,
            crontabs,
            packages,
            hasher,
            options,
            history: None,
        }
    }

    /// Enable diff attachment against repository history.
    pub fn with_history(mut self, history: History<'a>) -> Self {
        self.history = Some(history);
        self
    }

    /// Reconcile `original` (deployed) and `new` (target) against the host.
    pub fn reconcile(&self, original: &ResourceSet, new: &ResourceSet) -> Result<DeploymentPlan> {
        let mut plan = DeploymentPlan::new();
        let mut pending = Pending::default();

        self.files(original, new, &mut plan, &mut pending)?;
        self.crontabs(original, new, &mut plan, &mut pending)?;
        self.packages(original, new, &mut plan, &mut pending)?;

        let Pending {
            deletes,
            adds,
            updates,
            crontab_deletes,
            crontab_writes,
            transaction,
        } = pending;
        plan.actions.extend(deletes.into_iter().rev());
        plan.actions.extend(adds);
        plan.actions.extend(updates);
        plan.actions.extend(crontab_deletes);
        plan.actions.extend(crontab_writes);
        if !transaction.is_empty() {
            plan.actions.push(Action::PackageTransaction(transaction));
        }

        log::debug!(
            "reconciled: {} action(s), {} holdup(s), {} failure(s)",
            plan.actions.len(),
            plan.holdups.len(),
            plan.failures.len()
        );
        Ok(plan)
    }

    fn files(&self, original: &ResourceSet, new: &ResourceSet, plan: &mut DeploymentPlan, pending: &mut Pending) -> Result<()> {
        let (deleted, added, common) = partition(&original.files, &new.files);

        for path in deleted {
            let previous = &original.files[path];
            if !self.live.exists(path) {
                plan.note(format!("DELETED and already removed: {path}"));
                plan.events.push(Event::AlreadyDeleted(path.to_string()));
                continue;
            }
            if !previous.is_dir && self.live.hash(path)? != previous.hash {
                plan.holdup(format!("DELETED but has local differences: {path}"));
                if self.options.diffs.enabled() {
                    self.diff_deployed_to_live(plan, previous)?;
                }
            } else {
                plan.note(format!("DELETED: {path}"));
            }
            pending.deletes.push(Action::DeleteFile {
                path: path.to_string(),
                is_dir: previous.is_dir,
            });
            plan.events.push(Event::Deleted(path.to_string()));
        }

        for path in added {
            let resource = &new.files[path];
            if !self.live.exists(path) {
                plan.note(format!("ADDED: {path}"));
                pending.adds.push(Action::AddFile(resource.clone()));
                plan.events.push(Event::Added(path.to_string()));
                continue;
            }

            if resource.is_dir || self.live.hash(path)? == resource.hash {
                match self.live.acl(path)? {
                    Some(live) if live != resource.acl => {
                        plan.holdup(format!(
                            "ADDED and exists locally: {path}\n  PERMISSIONS INCORRECT: {live} (locally) -> {}",
                            resource.acl
                        ));
                        pending.updates.push(Action::UpdateFile(resource.clone()));
                    }
                    _ => plan.note(format!("ADDED and exists locally: {path}")),
                }
                plan.events.push(Event::AlreadyAdded(path.to_string()));
            } else {
                plan.holdup(format!("ADDED and exists with differences: {path}"));
                match self.options.diffs {
                    DiffMode::All => self.diff_live_to_newest(plan, resource)?,
                    DiffMode::HoldupsOnly => self.diff_deployed_to_live(plan, resource)?,
                    DiffMode::None => {}
                }
                // local content is being replaced, not created
                pending.updates.push(Action::UpdateFile(resource.clone()));
                plan.events.push(Event::Modified(path.to_string()));
            }
        }

        for path in common {
            let previous = &original.files[path];
            let resource = &new.files[path];
            let mut modified = false;

            if resource.acl != previous.acl {
                plan.holdup(format!(
                    "PERMISSIONS changed in repository: {path} from {} -> {}",
                    previous.acl, resource.acl
                ));
                modified = true;
            }
            if let Some(live) = self.live.acl(path)?
                && live != previous.acl
            {
                if live == resource.acl {
                    plan.note(format!("PERMISSIONS already changed locally: {path}"));
                } else {
                    plan.holdup(format!(
                        "PERMISSIONS were locally modified: {path} from {} -> {live}",
                        previous.acl
                    ));
                    modified = true;
                }
            }

            if !self.live.exists(path) {
                plan.holdup(format!("LOCAL file missing: {path}"));
                modified = true;
            } else if !previous.is_dir {
                let live = self.live.hash(path)?;
                // a live copy matching the new content was updated by hand ahead of time
                if live != previous.hash && live != resource.hash {
                    plan.holdup(format!("LOCAL file has changes: {path}"));
                    modified = true;
                    if self.options.diffs.enabled() {
                        self.diff_deployed_to_live(plan, previous)?;
                    }
                }
            }

            if !previous.is_dir && resource.hash != previous.hash {
                plan.note(format!("MODIFIED, content update pending: {path}"));
                modified = true;
                if self.options.diffs == DiffMode::All {
                    self.diff_deployed_to_newest(plan, previous, resource)?;
                }
            }

            if modified {
                pending.updates.push(Action::UpdateFile(resource.clone()));
                plan.events.push(Event::Modified(path.to_string()));
            }
        }
        Ok(())
    }

    fn crontab_hash(&self, user: &str) -> Result<Option<ContentHash>> {
        let Some(content) = self.crontabs.export(user)? else {
            return Ok(None);
        };
        Ok(Some(self.hasher.hash_bytes(content.as_bytes())?))
    }

    fn crontabs(&self, original: &ResourceSet, new: &ResourceSet, plan: &mut DeploymentPlan, pending: &mut Pending) -> Result<()> {
        let (deleted, added, common) = partition(&original.crontabs, &new.crontabs);

        for user in deleted {
            let previous = &original.crontabs[user];
            let remove = Action::DeleteCrontab { user: user.to_string() };
            match self.crontab_hash(user)? {
                None => plan.note(format!("DELETED crontab already removed: {user}")),
                Some(live) if live != previous.hash => {
                    plan.holdup(format!("DELETED crontab but has local differences: {user}"));
                    pending.crontab_deletes.push(remove);
                }
                Some(_) => {
                    plan.note(format!("DELETED crontab: {user}"));
                    pending.crontab_deletes.push(remove);
                }
            }
        }

        for user in added {
            let crontab = &new.crontabs[user];
            match self.crontab_hash(user)? {
                None => {
                    plan.note(format!("ADDED crontab: {user}"));
                    pending.crontab_writes.push(Action::WriteCrontab(crontab.clone()));
                }
                Some(live) if live == crontab.hash => {
                    plan.note(format!("ADDED crontab already deployed: {user}"));
                }
                Some(_) => {
                    plan.holdup(format!("ADDED crontab already exists with differences: {user}"));
                    pending.crontab_writes.push(Action::WriteCrontab(crontab.clone()));
                }
            }
        }

        for user in common {
            let previous = &original.crontabs[user];
            let crontab = &new.crontabs[user];
            let live = self.crontab_hash(user)?;

            if live.as_ref() != Some(&previous.hash) {
                plan.holdup(format!("MODIFIED crontab but has local differences: {user}"));
            } else if crontab.hash == previous.hash {
                continue;
            } else if live.as_ref() == Some(&crontab.hash) {
                plan.note(format!("MODIFIED crontab already deployed: {user}"));
                continue;
            } else {
                plan.note(format!("MODIFIED crontab: {user}"));
            }
            pending.crontab_writes.push(Action::WriteCrontab(crontab.clone()));
        }
        Ok(())
    }

    fn packages(&self, original: &ResourceSet, new: &ResourceSet, plan: &mut DeploymentPlan, pending: &mut Pending) -> Result<()> {
        let tx = &mut pending.transaction;
        for name in new.packages.keys() {
            tx.protect(name.clone());
        }

        let (deleted, added, common) = partition(&original.packages, &new.packages);

        for name in deleted {
            let previous = &original.packages[name];
            let Some(installed) = self.packages.query_installed(name)? else {
                plan.note(format!("DELETED package already removed: {previous}"));
                continue;
            };
            let message = format!("DELETED package but has local differences: {installed}");
            if self.verify_clean(plan, name, message)? {
                plan.note(format!("DELETED package: {installed}"));
                tx.queue_remove(installed);
            }
        }

        for name in added {
            let package = &new.packages[name];
            let Some(installed) = self.packages.query_installed(name)? else {
                plan.note(format!("ADDED package: {package}"));
                tx.queue_install(package.clone());
                continue;
            };

            if !package.is_versioned() {
                plan.note(format!("ADDED unversioned package, assuming already deployed: {package}"));
                self.check_installed(plan, tx, package, &installed)?;
                continue;
            }
            match package.partial_cmp(&installed) {
                Some(Ordering::Less) => {
                    plan.fail(format!("package downgrades not supported: {package} ({installed} installed)"));
                }
                Some(Ordering::Equal) => {
                    plan.note(format!("ADDED package already deployed: {package}"));
                    self.check_installed(plan, tx, package, &installed)?;
                }
                _ => {
                    plan.holdup(format!(
                        "ADDED package already installed with different version: {package} ({installed} installed)"
                    ));
                    self.verify_clean(plan, name, format!("INSTALLED package has local differences: {installed}"))?;
                    tx.queue_install(package.clone());
                }
            }
        }

        for name in common {
            let previous = &original.packages[name];
            let package = &new.packages[name];
            let Some(installed) = self.packages.query_installed(name)? else {
                if package == previous {
                    plan.holdup(format!("MISSING package: {package}"));
                } else {
                    plan.holdup(format!("UPGRADED package missing locally: {previous}"));
                }
                tx.queue_install(package.clone());
                continue;
            };

            match package.partial_cmp(&installed) {
                Some(Ordering::Less) if package.is_versioned() => {
                    plan.fail(format!("package downgrades not supported: {package} ({installed} installed)"));
                }
                Some(Ordering::Greater) => {
                    let message = format!("UPGRADED package has local differences: {installed}");
                    if self.verify_clean(plan, name, message)? {
                        plan.note(format!("UPGRADED package: {installed} -> {package}"));
                    }
                    tx.queue_install(package.clone());
                }
                _ => self.check_installed(plan, tx, package, &installed)?,
            }
        }

        if !tx.is_empty() {
            match self.packages.run(tx, true)? {
                TransactionOutcome::Success => {}
                TransactionOutcome::Failed { log } => {
                    plan.holdup(format!("package transaction test failed:\n{}", log.trim_end()));
                }
            }
        }
        Ok(())
    }

    /// Verify an installed package that is already at the declared version.
    fn check_installed(
        &self,
        plan: &mut DeploymentPlan,
        tx: &mut Transaction,
        package: &Package,
        installed: &Package,
    ) -> Result<()> {
        let message = format!("INSTALLED package has local differences: {installed}");
        if !self.verify_clean(plan, &package.name, message)? && self.options.reinstall_broken {
            tx.queue_reinstall(package.clone());
        }
        Ok(())
    }

    /// Run verification; on drift record a holdup and return `false`.
    fn verify_clean(&self, plan: &mut DeploymentPlan, name: &str, message: String) -> Result<bool> {
        let issues = self.packages.verify(name)?;
        if issues.is_empty() {
            return Ok(true);
        }
        let details: Vec<String> = issues.iter().map(|issue| format!("  {issue}")).collect();
        plan.holdup(format!("{message}\n{}", details.join("\n")));
        Ok(false)
    }

    fn show(&self, resource: &FileResource, revision: Option<&str>) -> Result<Vec<u8>> {
        let (Some(history), Some(revision)) = (&self.history, revision) else {
            return Ok(Vec::new());
        };
        Ok(history.source.show(&resource.repo_path, revision)?.unwrap_or_default())
    }

    fn deployed(&self) -> Option<&str> {
        self.history.as_ref().and_then(|h| h.deployed.as_deref())
    }

    fn newest(&self) -> Option<&str> {
        self.history.as_ref().map(|h| h.newest.as_str())
    }

    fn attach(plan: &mut DeploymentPlan, diff: Option<String>) {
        if let Some(diff) = diff {
            plan.note(diff);
        }
    }

    fn diff_deployed_to_live(&self, plan: &mut DeploymentPlan, resource: &FileResource) -> Result<()> {
        let deployed = self.show(resource, self.deployed())?;
        let live = self.live.content(&resource.path)?.unwrap_or_default();
        let label = format!("{} ({})", resource.repo_path, self.deployed().unwrap_or("not deployed"));
        Self::attach(plan, unified_diff(&deployed, &live, &label, &format!("/{}", resource.path)));
        Ok(())
    }

    fn diff_live_to_newest(&self, plan: &mut DeploymentPlan, resource: &FileResource) -> Result<()> {
        let live = self.live.content(&resource.path)?.unwrap_or_default();
        let newest = self.show(resource, self.newest())?;
        let label = format!("{} ({})", resource.repo_path, self.newest().unwrap_or("newest"));
        Self::attach(plan, unified_diff(&live, &newest, &format!("/{}", resource.path), &label));
        Ok(())
    }

    fn diff_deployed_to_newest(&self, plan: &mut DeploymentPlan, previous: &FileResource, resource: &FileResource) -> Result<()> {
        let deployed = self.show(previous, self.deployed())?;
        let newest = self.show(resource, self.newest())?;
        let old = format!("{} ({})", previous.repo_path, self.deployed().unwrap_or("not deployed"));
        let new = format!("{} ({})", resource.repo_path, self.newest().unwrap_or("newest"));
        Self::attach(plan, unified_diff(&deployed, &newest, &old, &new));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Blake3Hasher;
    use acl::Acl;
    use rpmkit::backend::Backend;
    use rpmkit::{VerifyIssue, VerifyReason};
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    #[derive(Default)]
    struct MockLive {
        files: BTreeMap<String, (Option<&'static str>, Acl)>,
    }

    impl MockLive {
        fn file(mut self, path: &str, content: &'static str, acl: Acl) -> Self {
            self.files.insert(path.to_string(), (Some(content), acl));
            self
        }

        fn dir(mut self, path: &str, acl: Acl) -> Self {
            self.files.insert(path.to_string(), (None, acl));
            self
        }
    }

    impl LiveState for MockLive {
        fn exists(&self, path: &str) -> bool {
            self.files.contains_key(path)
        }

        fn hash(&self, path: &str) -> anyhow::Result<Option<ContentHash>> {
            match self.files.get(path) {
                Some((Some(content), _)) => Ok(Some(Blake3Hasher.hash_bytes(content.as_bytes())?)),
                _ => Ok(None),
            }
        }

        fn acl(&self, path: &str) -> anyhow::Result<Option<Acl>> {
            Ok(self.files.get(path).map(|(_, acl)| acl.clone()))
        }

        fn content(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.files.get(path).and_then(|(c, _)| c.map(|c| c.as_bytes().to_vec())))
        }
    }

    #[derive(Default)]
    struct MockCrontab {
        tabs: BTreeMap<String, String>,
    }

    impl CrontabService for MockCrontab {
        fn export(&self, user: &str) -> anyhow::Result<Option<String>> {
            Ok(self.tabs.get(user).cloned())
        }

        fn install(&self, _user: &str, _content: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn remove(&self, _user: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockRpm {
        installed: BTreeMap<String, Package>,
        broken: Vec<String>,
        test_runs: RefCell<usize>,
    }

    impl Backend for MockRpm {
        fn is_available(&self) -> bool {
            true
        }

        fn query_installed(&self, name: &str) -> rpmkit::Result<Option<Package>> {
            Ok(self.installed.get(name).cloned())
        }

        fn verify(&self, name: &str) -> rpmkit::Result<Vec<VerifyIssue>> {
            if self.broken.iter().any(|b| b == name) {
                Ok(vec![VerifyIssue {
                    file: format!("/usr/bin/{name}"),
                    reasons: vec![VerifyReason::Digest],
                    config: false,
                }])
            } else {
                Ok(Vec::new())
            }
        }

        fn run_transaction(&self, _tx: &Transaction, test: bool) -> rpmkit::Result<TransactionOutcome> {
            assert!(test);
            *self.test_runs.borrow_mut() += 1;
            Ok(TransactionOutcome::Success)
        }
    }

    fn mode(m: u32) -> Acl {
        Acl::simple(None, None, Some(m))
    }

    fn file(path: &str, content: &str, acl: Acl) -> FileResource {
        FileResource {
            path: path.to_string(),
            source: PathBuf::from("/repo/machines/h").join(path),
            repo_path: format!("machines/h/{path}"),
            is_dir: false,
            hash: Some(Blake3Hasher.hash_bytes(content.as_bytes()).unwrap()),
            acl,
            dir_acl: None,
        }
    }

    fn set(files: Vec<FileResource>) -> ResourceSet {
        let mut set = ResourceSet::empty();
        for f in files {
            set.files.insert(f.path.clone(), f);
        }
        set
    }

    fn reconcile(live: &MockLive, rpm: MockRpm, original: &ResourceSet, new: &ResourceSet) -> DeploymentPlan {
        let crontab = MockCrontab::default();
        let client = rpmkit::Client::with_backend(Box::new(rpm));
        Reconciler::new(live, &crontab, &client, &Blake3Hasher, ReconcileOptions::default())
            .reconcile(original, new)
            .unwrap()
    }

    fn owned(live: Acl) -> Acl {
        match live {
            Acl::Simple(mut s) => {
                s.user = Some("root".into());
                s.group = Some("root".into());
                Acl::Simple(s)
            }
            other => other,
        }
    }

    #[test]
    fn test_idempotent() {
        let new = set(vec![file("etc/a", "a", mode(0o644))]);
        let live = MockLive::default().file("etc/a", "a", owned(mode(0o644)));
        let plan = reconcile(&live, MockRpm::default(), &new, &new);
        assert!(plan.holdups.is_empty());
        assert!(plan.failures.is_empty());
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn test_first_deploy_of_converged_host_is_noop() {
        let new = set(vec![file("etc/a", "a", mode(0o644))]);
        let live = MockLive::default().file("etc/a", "a", owned(mode(0o644)));
        let plan = reconcile(&live, MockRpm::default(), &ResourceSet::empty(), &new);
        assert!(plan.actions.is_empty());
        assert_eq!(plan.events, [Event::AlreadyAdded("etc/a".into())]);
    }

    #[test]
    fn test_content_update_pending() {
        let original = set(vec![file("etc/foo.conf", "one", mode(0o644))]);
        let new = set(vec![file("etc/foo.conf", "two", mode(0o644))]);
        let live = MockLive::default().file("etc/foo.conf", "one", owned(mode(0o644)));

        let plan = reconcile(&live, MockRpm::default(), &original, &new);
        assert!(plan.holdups.is_empty());
        assert_eq!(plan.actions.len(), 1);
        assert!(matches!(&plan.actions[0], Action::UpdateFile(f) if f.path == "etc/foo.conf"));
        assert!(plan.verbose.iter().any(|l| l.contains("content update pending")));
    }

    #[test]
    fn test_local_drift_is_holdup_but_still_updates() {
        let original = set(vec![file("etc/foo.conf", "one", mode(0o644))]);
        let new = set(vec![file("etc/foo.conf", "two", mode(0o644))]);
        let live = MockLive::default().file("etc/foo.conf", "local", owned(mode(0o644)));

        let plan = reconcile(&live, MockRpm::default(), &original, &new);
        assert_eq!(plan.holdups, ["LOCAL file has changes: etc/foo.conf"]);
        assert!(matches!(&plan.actions[..], [Action::UpdateFile(_)]));
    }

    #[test]
    fn test_preapplied_change_is_not_drift() {
        let original = set(vec![file("etc/foo.conf", "one", mode(0o644))]);
        let new = set(vec![file("etc/foo.conf", "two", mode(0o644))]);
        let live = MockLive::default().file("etc/foo.conf", "two", owned(mode(0o644)));

        let plan = reconcile(&live, MockRpm::default(), &original, &new);
        assert!(plan.holdups.is_empty());
        assert_eq!(plan.actions.len(), 1);
    }

    #[test]
    fn test_permission_changes() {
        let original = set(vec![file("a", "a", mode(0o644)), file("b", "b", mode(0o644))]);
        let new = set(vec![file("a", "a", mode(0o600)), file("b", "b", mode(0o600))]);
        let live = MockLive::default()
            .file("a", "a", owned(mode(0o644)))
            .file("b", "b", owned(mode(0o600)));

        let plan = reconcile(&live, MockRpm::default(), &original, &new);
        assert_eq!(plan.holdups.len(), 2);
        assert!(plan.holdups.iter().all(|h| h.starts_with("PERMISSIONS changed in repository")));
        assert!(plan.verbose.iter().any(|l| l == "PERMISSIONS already changed locally: b"));
        assert_eq!(plan.actions.len(), 2);
    }

    #[test]
    fn test_deletions_are_reverse_sorted() {
        let mut dir = file("etc", "", mode(0o755));
        dir.is_dir = true;
        dir.hash = None;
        let original = set(vec![dir, file("etc/a", "a", mode(0o644)), file("gone", "g", mode(0o644))]);
        let live = MockLive::default()
            .dir("etc", owned(mode(0o755)))
            .file("etc/a", "changed", owned(mode(0o644)));

        let plan = reconcile(&live, MockRpm::default(), &original, &ResourceSet::empty());
        assert_eq!(plan.holdups, ["DELETED but has local differences: etc/a"]);
        let deleted: Vec<&str> = plan
            .actions
            .iter()
            .map(|a| match a {
                Action::DeleteFile { path, .. } => path.as_str(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(deleted, ["etc/a", "etc"]);
        assert!(plan.events.contains(&Event::AlreadyDeleted("gone".into())));
    }

    #[test]
    fn test_added_over_existing_content_is_update() {
        let new = set(vec![file("etc/a", "new", mode(0o644)), file("etc/b", "b", mode(0o600))]);
        let live = MockLive::default()
            .file("etc/a", "old", owned(mode(0o644)))
            .file("etc/b", "b", owned(mode(0o644)));

        let plan = reconcile(&live, MockRpm::default(), &ResourceSet::empty(), &new);
        assert_eq!(plan.holdups.len(), 2);
        assert!(plan.holdups[0].starts_with("ADDED and exists with differences: etc/a"));
        assert!(plan.holdups[1].contains("PERMISSIONS INCORRECT"));
        assert!(plan.actions.iter().all(|a| matches!(a, Action::UpdateFile(_))));
        assert_eq!(plan.events, [Event::Modified("etc/a".into()), Event::AlreadyAdded("etc/b".into())]);
    }

    #[test]
    fn test_downgrade_is_fatal() {
        let mut new = ResourceSet::empty();
        new.packages.insert("foo".into(), Package::parse("foo-1.0-1"));
        let rpm = MockRpm {
            installed: [("foo".to_string(), Package::installed("foo", "2.0", "1"))].into(),
            ..Default::default()
        };

        let plan = reconcile(&MockLive::default(), rpm, &ResourceSet::empty(), &new);
        assert_eq!(plan.failures.len(), 1);
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn test_package_reinstall_and_removal() {
        let mut original = ResourceSet::empty();
        original.packages.insert("old".into(), Package::parse("old-1.0-1"));
        original.packages.insert("bar".into(), Package::parse("bar-1.0-1"));
        let mut new = ResourceSet::empty();
        new.packages.insert("bar".into(), Package::parse("bar-1.0-1"));
        new.packages.insert("baz".into(), Package::parse("baz-2.0-1"));

        let rpm = MockRpm {
            installed: [
                ("old".to_string(), Package::installed("old", "1.0", "1")),
                ("bar".to_string(), Package::installed("bar", "1.0", "1")),
            ]
            .into(),
            broken: vec!["bar".into()],
            ..Default::default()
        };

        let plan = reconcile(&MockLive::default(), rpm, &original, &new);
        assert_eq!(plan.holdups.len(), 1);
        assert!(plan.holdups[0].starts_with("INSTALLED package has local differences: bar-1.0-1"));

        let [Action::PackageTransaction(tx)] = &plan.actions[..] else {
            panic!("expected one transaction, got {:?}", plan.actions);
        };
        assert_eq!(tx.summary(), ["erase old-1.0-1", "reinstall bar-1.0-1", "install baz-2.0-1"]);
        assert!(tx.is_protected("bar"));
        assert!(!tx.is_protected("old"));
    }

    #[test]
    fn test_crontab_states() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a"), "* * * * * a\n").unwrap();
        let tab = crate::resource::CrontabResource::build("root", vec![tmp.path().join("a")], tmp.path(), &Blake3Hasher)
            .unwrap();
        let mut new = ResourceSet::empty();
        new.crontabs.insert("root".into(), tab.clone());

        let client = rpmkit::Client::with_backend(Box::new(MockRpm::default()));
        let live = MockLive::default();

        let mut crontab = MockCrontab::default();
        let reconciler = Reconciler::new(&live, &crontab, &client, &Blake3Hasher, ReconcileOptions::default());
        let plan = reconciler.reconcile(&ResourceSet::empty(), &new).unwrap();
        assert!(matches!(&plan.actions[..], [Action::WriteCrontab(_)]));
        assert!(plan.holdups.is_empty());

        crontab.tabs.insert("root".into(), "something else".into());
        let reconciler = Reconciler::new(&live, &crontab, &client, &Blake3Hasher, ReconcileOptions::default());
        let plan = reconciler.reconcile(&new, &ResourceSet::empty()).unwrap();
        assert_eq!(plan.holdups, ["DELETED crontab but has local differences: root"]);
        assert!(matches!(&plan.actions[..], [Action::DeleteCrontab { .. }]));

        crontab.tabs.insert("root".into(), tab.content.clone());
        let reconciler = Reconciler::new(&live, &crontab, &client, &Blake3Hasher, ReconcileOptions::default());
        let plan = reconciler.reconcile(&new, &new).unwrap();
        assert!(plan.actions.is_empty());
        assert!(plan.verbose.is_empty());
    }
}
