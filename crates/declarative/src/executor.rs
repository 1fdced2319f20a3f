//! Execution engine - applies a deployment plan in order
//!
//! Actions run strictly in plan order and stop at the first error. Nothing
//! already applied is rolled back; the next reconciliation picks up
//! whatever is left.

use crate::context::{CrontabService, EventSink};
use crate::error::ExecutionError;
use crate::fsops::{BACKUP_SUFFIX, safe_replace, with_suffix};
use crate::record::DeploymentRecord;
use crate::resource::FileResource;
use crate::types::{Action, DeploymentPlan, ExecuteOptions, ExecuteSummary};
use acl::AclBackend;
use rpmkit::TransactionOutcome;
use std::fs;

type Result<T> = std::result::Result<T, ExecutionError>;

/// Applies plans to the host.
pub struct Executor<'a> {
    backend: &'a dyn AclBackend,
    crontabs: &'a dyn CrontabService,
    packages: &'a rpmkit::Client,
    sink: &'a mut dyn EventSink,
    options: ExecuteOptions,
}

/// Which event groups have been handed to the sink.
#[derive(Default)]
struct Announced {
    deletions: bool,
    files: bool,
}

impl<'a> Executor<'a> {
    pub fn new(
        backend: &'a dyn AclBackend,
        crontabs: &'a dyn CrontabService,
        packages: &'a rpmkit::Client,
        sink: &'a mut dyn EventSink,
        options: ExecuteOptions,
    ) -> Self {
        Self {
            backend,
            crontabs,
            packages,
            sink,
            options,
        }
    }

    /// Apply `plan`, then record `revision` as deployed.
    pub fn deploy(&mut self, plan: &DeploymentPlan, record: &DeploymentRecord, revision: &str) -> Result<ExecuteSummary> {
        let summary = self.execute(plan)?;
        record.write(revision)?;
        Ok(summary)
    }

    /// Apply `plan` without touching the deployment record.
    ///
    /// Refuses plans with failures, and plans with holdups unless forced.
    pub fn execute(&mut self, plan: &DeploymentPlan) -> Result<ExecuteSummary> {
        if plan.is_blocked(self.options.force) {
            return Err(ExecutionError::Blocked {
                failures: plan.failures.len(),
                holdups: plan.holdups.len(),
            });
        }

        let mut summary = ExecuteSummary::default();
        let mut announced = Announced::default();

        for action in &plan.actions {
            if !matches!(action, Action::DeleteFile { .. }) {
                self.announce(plan, &mut announced, true);
            }
            if !matches!(action, Action::DeleteFile { .. } | Action::AddFile(_) | Action::UpdateFile(_)) {
                self.announce(plan, &mut announced, false);
            }
            log::debug!("{}", action.describe());
            self.apply(action, &mut summary)?;
        }
        self.announce(plan, &mut announced, true);
        self.announce(plan, &mut announced, false);

        log::info!("deployment applied {} change(s)", summary.total_changes());
        Ok(summary)
    }

    fn announce(&mut self, plan: &DeploymentPlan, announced: &mut Announced, deletions: bool) {
        let done = if deletions {
            &mut announced.deletions
        } else {
            &mut announced.files
        };
        if *done {
            return;
        }
        *done = true;
        for event in plan.events.iter().filter(|e| e.is_deletion() == deletions) {
            self.sink.emit(event);
        }
    }

    fn apply(&mut self, action: &Action, summary: &mut ExecuteSummary) -> Result<()> {
        match action {
            Action::DeleteFile { path, is_dir } => {
                if self.delete(path, *is_dir)? {
                    summary.deleted += 1;
                } else {
                    summary.skipped += 1;
                }
            }
            Action::AddFile(file) => {
                self.install(file)?;
                summary.added += 1;
            }
            Action::UpdateFile(file) => {
                self.install(file)?;
                summary.updated += 1;
            }
            Action::DeleteCrontab { user } => {
                self.crontabs.remove(user).map_err(|source| ExecutionError::Crontab {
                    user: user.clone(),
                    source,
                })?;
                summary.crontabs_removed += 1;
            }
            Action::WriteCrontab(crontab) => {
                self.crontabs
                    .install(&crontab.user, &crontab.content)
                    .map_err(|source| ExecutionError::Crontab {
                        user: crontab.user.clone(),
                        source,
                    })?;
                summary.crontabs_written += 1;
            }
            Action::PackageTransaction(tx) => match self.packages.run(tx, false)? {
                TransactionOutcome::Success => summary.packages += tx.summary().len(),
                TransactionOutcome::Failed { log } => return Err(ExecutionError::PackageTransaction { log }),
            },
        }
        Ok(())
    }

    /// Remove a deployed entry; returns `false` if it was left in place.
    fn delete(&self, path: &str, is_dir: bool) -> Result<bool> {
        let target = self.options.target_root.join(path);
        if fs::symlink_metadata(&target).is_err() {
            return Ok(false);
        }

        if self.options.backup {
            let backup = with_suffix(&target, BACKUP_SUFFIX);
            fs::rename(&target, &backup).map_err(|e| ExecutionError::io(&target, e))?;
        } else if is_dir {
            // only empty directories go; anything left in them is not ours
            if let Err(e) = fs::remove_dir(&target) {
                log::warn!("failed to remove directory {}: {e}", target.display());
                return Ok(false);
            }
        } else {
            fs::remove_file(&target).map_err(|e| ExecutionError::io(&target, e))?;
        }
        Ok(true)
    }

    fn install(&self, file: &FileResource) -> Result<()> {
        let dest = file.target(&self.options.target_root);

        if let Some(parent) = dest.parent()
            && !parent.is_dir()
        {
            fs::create_dir_all(parent).map_err(|e| ExecutionError::io(parent, e))?;
            if let Some(acl) = &file.dir_acl {
                acl.apply_to(parent, self.backend)?;
            }
        }

        if file.is_dir {
            if fs::symlink_metadata(&dest).is_err() {
                fs::create_dir(&dest).map_err(|e| ExecutionError::io(&dest, e))?;
            }
        } else {
            safe_replace(&file.source, &dest, self.options.backup).map_err(|e| ExecutionError::io(&dest, e))?;
        }

        let is_link = fs::symlink_metadata(&dest).is_ok_and(|m| m.file_type().is_symlink());
        if !is_link {
            file.acl.apply_to(&dest, self.backend)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CollectingSink, Event};
    use crate::resource::CrontabResource;
    use crate::hash::ContentHash;
    use acl::{Acl, NoExtended};
    use rpmkit::backend::Backend;
    use rpmkit::{Package, Transaction, VerifyIssue};
    use std::cell::RefCell;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockCrontab {
        log: RefCell<Vec<String>>,
    }

    impl CrontabService for MockCrontab {
        fn export(&self, _user: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn install(&self, user: &str, content: &str) -> anyhow::Result<()> {
            self.log.borrow_mut().push(format!("install {user} {}", content.len()));
            Ok(())
        }

        fn remove(&self, user: &str) -> anyhow::Result<()> {
            self.log.borrow_mut().push(format!("remove {user}"));
            Ok(())
        }
    }

    struct FailingRpm;

    impl Backend for FailingRpm {
        fn is_available(&self) -> bool {
            true
        }

        fn query_installed(&self, _name: &str) -> rpmkit::Result<Option<Package>> {
            Ok(None)
        }

        fn verify(&self, _name: &str) -> rpmkit::Result<Vec<VerifyIssue>> {
            Ok(Vec::new())
        }

        fn run_transaction(&self, _tx: &Transaction, _test: bool) -> rpmkit::Result<TransactionOutcome> {
            Ok(TransactionOutcome::Failed {
                log: "conflict".into(),
            })
        }
    }

    fn resource(source: &Path, path: &str, acl: Acl) -> FileResource {
        FileResource {
            path: path.to_string(),
            source: source.to_path_buf(),
            repo_path: path.to_string(),
            is_dir: source.is_dir(),
            hash: None,
            acl,
            dir_acl: Some(Acl::simple(None, None, Some(0o750))),
        }
    }

    fn options(root: &Path) -> ExecuteOptions {
        ExecuteOptions {
            target_root: PathBuf::from(root),
            ..Default::default()
        }
    }

    fn run(plan: &DeploymentPlan, options: ExecuteOptions) -> (Result<ExecuteSummary>, CollectingSink, Vec<String>) {
        let crontab = MockCrontab::default();
        let client = rpmkit::Client::with_backend(Box::new(FailingRpm));
        let mut sink = CollectingSink::default();
        let result = Executor::new(&NoExtended, &crontab, &client, &mut sink, options).execute(plan);
        let log = crontab.log.borrow().clone();
        (result, sink, log)
    }

    #[test]
    fn test_blocked_plans_are_refused() {
        let tmp = TempDir::new().unwrap();
        let mut plan = DeploymentPlan::new();
        plan.holdup("drift");
        let (result, _, _) = run(&plan, options(tmp.path()));
        assert!(matches!(result, Err(ExecutionError::Blocked { holdups: 1, .. })));

        let forced = ExecuteOptions {
            force: true,
            ..options(tmp.path())
        };
        assert!(run(&plan, forced).0.is_ok());

        plan.fail("downgrade");
        let forced = ExecuteOptions {
            force: true,
            ..options(tmp.path())
        };
        assert!(run(&plan, forced).0.is_err());
    }

    #[test]
    fn test_add_creates_parents_and_applies_modes() {
        let repo = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let src = repo.path().join("motd");
        fs::write(&src, "hello").unwrap();

        let mut plan = DeploymentPlan::new();
        plan.actions.push(Action::AddFile(resource(&src, "etc/new/motd", Acl::simple(None, None, Some(0o600)))));
        plan.events.push(Event::Added("etc/new/motd".into()));

        let (result, sink, _) = run(&plan, options(target.path()));
        assert_eq!(result.unwrap().added, 1);

        let dest = target.path().join("etc/new/motd");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
        assert_eq!(fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o600);
        let parent = fs::metadata(target.path().join("etc/new")).unwrap();
        assert_eq!(parent.permissions().mode() & 0o777, 0o750);
        assert_eq!(sink.events, [Event::Added("etc/new/motd".into())]);
    }

    #[test]
    fn test_delete_with_and_without_backup() {
        let target = TempDir::new().unwrap();
        fs::create_dir_all(target.path().join("d")).unwrap();
        fs::write(target.path().join("d/a"), "a").unwrap();
        fs::write(target.path().join("d/keep"), "k").unwrap();
        fs::write(target.path().join("b"), "b").unwrap();

        let mut plan = DeploymentPlan::new();
        plan.actions = vec![
            Action::DeleteFile { path: "d/a".into(), is_dir: false },
            Action::DeleteFile { path: "d".into(), is_dir: true },
        ];
        let (result, _, _) = run(&plan, options(target.path()));
        let summary = result.unwrap();
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.skipped, 1);
        assert!(target.path().join("d/keep").exists());

        plan.actions = vec![Action::DeleteFile { path: "b".into(), is_dir: false }];
        let backup = ExecuteOptions {
            backup: true,
            ..options(target.path())
        };
        run(&plan, backup).0.unwrap();
        assert!(!target.path().join("b").exists());
        assert_eq!(fs::read_to_string(target.path().join("b.gitman")).unwrap(), "b");
    }

    #[test]
    fn test_update_keeps_backup() {
        let repo = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let src = repo.path().join("conf");
        fs::write(&src, "new").unwrap();
        fs::write(target.path().join("conf"), "old").unwrap();

        let mut plan = DeploymentPlan::new();
        plan.actions.push(Action::UpdateFile(resource(&src, "conf", Acl::simple(None, None, None))));
        let backup = ExecuteOptions {
            backup: true,
            ..options(target.path())
        };
        assert_eq!(run(&plan, backup).0.unwrap().updated, 1);
        assert_eq!(fs::read_to_string(target.path().join("conf")).unwrap(), "new");
        assert_eq!(fs::read_to_string(target.path().join("conf.gitman")).unwrap(), "old");
    }

    #[test]
    fn test_events_follow_their_phase_and_crontabs_run() {
        let target = TempDir::new().unwrap();
        let mut plan = DeploymentPlan::new();
        plan.actions = vec![
            Action::DeleteCrontab { user: "old".into() },
            Action::WriteCrontab(CrontabResource {
                user: "root".into(),
                sources: Vec::new(),
                content: "x".into(),
                hash: ContentHash::new("h"),
            }),
        ];
        plan.events = vec![Event::Modified("a".into()), Event::Deleted("b".into())];

        let (result, sink, log) = run(&plan, options(target.path()));
        let summary = result.unwrap();
        assert_eq!(summary.crontabs_removed, 1);
        assert_eq!(summary.crontabs_written, 1);
        assert_eq!(log, ["remove old", "install root 1"]);
        assert_eq!(sink.events, [Event::Deleted("b".into()), Event::Modified("a".into())]);
    }

    #[test]
    fn test_package_failure_is_fatal() {
        let target = TempDir::new().unwrap();
        let mut tx = Transaction::new();
        tx.queue_install(Package::parse("foo-1.0-1"));
        let mut plan = DeploymentPlan::new();
        plan.actions.push(Action::PackageTransaction(tx));

        let (result, _, _) = run(&plan, options(target.path()));
        assert!(matches!(result, Err(ExecutionError::PackageTransaction { log }) if log == "conflict"));
    }

    #[test]
    fn test_deploy_writes_record_only_on_success() {
        let target = TempDir::new().unwrap();
        let record = DeploymentRecord::at(target.path().join("record"));
        let crontab = MockCrontab::default();
        let client = rpmkit::Client::with_backend(Box::new(FailingRpm));
        let mut sink = CollectingSink::default();

        let mut executor = Executor::new(&NoExtended, &crontab, &client, &mut sink, options(target.path()));
        executor.deploy(&DeploymentPlan::new(), &record, "abc").unwrap();
        assert_eq!(record.read().unwrap().as_deref(), Some("abc"));

        let mut blocked = DeploymentPlan::new();
        blocked.fail("nope");
        assert!(executor.deploy(&blocked, &record, "def").is_err());
        assert_eq!(record.read().unwrap().as_deref(), Some("abc"));
    }

    /// Parse two revisions, reconcile against a temporary host root,
    /// execute, and reconcile again.
    mod scenarios {
        use crate::context::{CollectingSink, CrontabService, Event, LocalState};
        use crate::{
            Action, Blake3Hasher, ConfigParser, DeploymentPlan, DeploymentRecord, ExecuteOptions, ExecuteSummary,
            ExecutionError, Executor, ReconcileOptions, Reconciler, RepoConfig, ResourceSet,
        };
        use acl::{AclSettings, NoExtended};
        use rpmkit::backend::Backend;
        use rpmkit::{Package, Transaction, TransactionOutcome, VerifyIssue, VerifyReason};
        use std::cell::RefCell;
        use std::collections::BTreeMap;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use std::rc::Rc;
        use tempfile::TempDir;

        const SETTINGS: AclSettings = AclSettings { extended: false };

        #[derive(Default)]
        struct MemoryCrontab {
            tabs: RefCell<BTreeMap<String, String>>,
        }

        impl CrontabService for MemoryCrontab {
            fn export(&self, user: &str) -> anyhow::Result<Option<String>> {
                Ok(self.tabs.borrow().get(user).cloned())
            }

            fn install(&self, user: &str, content: &str) -> anyhow::Result<()> {
                self.tabs.borrow_mut().insert(user.to_string(), content.to_string());
                Ok(())
            }

            fn remove(&self, user: &str) -> anyhow::Result<()> {
                self.tabs.borrow_mut().remove(user);
                Ok(())
            }
        }

        /// Package database whose contents are fixed up front.
        #[derive(Default)]
        struct StaticRpm {
            installed: BTreeMap<String, Package>,
            /// Packages whose files fail verification
            broken: Vec<String>,
            /// Summaries of the transactions actually run
            applied: Rc<RefCell<Vec<Vec<String>>>>,
        }

        impl Backend for StaticRpm {
            fn is_available(&self) -> bool {
                true
            }

            fn query_installed(&self, name: &str) -> rpmkit::Result<Option<Package>> {
                Ok(self.installed.get(name).cloned())
            }

            fn verify(&self, name: &str) -> rpmkit::Result<Vec<VerifyIssue>> {
                if !self.broken.iter().any(|b| b == name) {
                    return Ok(Vec::new());
                }
                Ok(vec![VerifyIssue {
                    file: format!("/usr/bin/{name}"),
                    reasons: vec![VerifyReason::Size, VerifyReason::Digest],
                    config: false,
                }])
            }

            fn run_transaction(&self, tx: &Transaction, test: bool) -> rpmkit::Result<TransactionOutcome> {
                if !test {
                    self.applied.borrow_mut().push(tx.summary());
                }
                Ok(TransactionOutcome::Success)
            }
        }

        fn no_packages() -> rpmkit::Client {
            rpmkit::Client::with_backend(Box::new(StaticRpm::default()))
        }

        /// Write a checkout for host `web1` with the given host file and tree.
        fn checkout(host_file: &str, files: &[(&str, &str)]) -> TempDir {
            let repo = TempDir::new().unwrap();
            fs::write(repo.path().join("config"), "root: machines/%short_machine%\n").unwrap();
            fs::create_dir_all(repo.path().join("hosts")).unwrap();
            fs::write(repo.path().join("hosts/web1"), host_file).unwrap();
            for (path, content) in files {
                let path = repo.path().join("machines/web1").join(path);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            repo
        }

        fn parse(repo: &Path) -> ResourceSet {
            let config = RepoConfig::load(repo, "web1.example.com").unwrap();
            ConfigParser::new(repo, &config, SETTINGS, &Blake3Hasher).parse().unwrap()
        }

        fn reconcile(
            target: &Path,
            crontab: &MemoryCrontab,
            packages: &rpmkit::Client,
            original: &ResourceSet,
            new: &ResourceSet,
        ) -> DeploymentPlan {
            let live = LocalState::new(target, &Blake3Hasher, &NoExtended, SETTINGS);
            Reconciler::new(&live, crontab, packages, &Blake3Hasher, ReconcileOptions::default())
                .reconcile(original, new)
                .unwrap()
        }

        fn execute(
            target: &Path,
            crontab: &MemoryCrontab,
            plan: &DeploymentPlan,
            force: bool,
            backup: bool,
        ) -> (Result<ExecuteSummary, ExecutionError>, Vec<Event>) {
            execute_with(target, crontab, &no_packages(), plan, force, backup)
        }

        fn execute_with(
            target: &Path,
            crontab: &MemoryCrontab,
            packages: &rpmkit::Client,
            plan: &DeploymentPlan,
            force: bool,
            backup: bool,
        ) -> (Result<ExecuteSummary, ExecutionError>, Vec<Event>) {
            let mut sink = CollectingSink::default();
            let options = ExecuteOptions {
                backup,
                force,
                target_root: target.to_path_buf(),
            };
            let result = Executor::new(&NoExtended, crontab, packages, &mut sink, options).execute(plan);
            (result, sink.events)
        }

        const HOST: &str = "defattr mode=0644 dirmode=0755\n\
                            include etc/**\n\
                            exclude **/*.swp\n\
                            crontab root cron/backup\n";

        #[test]
        fn test_first_deploy_then_idempotent() {
            let repo = checkout(
                HOST,
                &[
                    ("etc/app/app.conf", "port=80\n"),
                    ("etc/app/app.conf.swp", "junk"),
                    ("etc/motd", "welcome\n"),
                    ("cron/backup", "0 3 * * * /usr/local/bin/backup\n"),
                ],
            );
            let target = TempDir::new().unwrap();
            let crontab = MemoryCrontab::default();
            let packages = no_packages();

            let new = parse(repo.path());
            assert!(!new.files.contains_key("etc/app/app.conf.swp"));

            let plan = reconcile(target.path(), &crontab, &packages, &ResourceSet::empty(), &new);
            assert!(plan.holdups.is_empty(), "{:?}", plan.holdups);
            assert!(plan.actions.iter().any(|a| matches!(a, Action::WriteCrontab(_))));

            let (result, events) = execute(target.path(), &crontab, &plan, false, false);
            let summary = result.unwrap();
            assert_eq!(summary.added, 3); // etc/app, etc/app/app.conf, etc/motd
            assert_eq!(summary.crontabs_written, 1);
            assert!(events.contains(&Event::Added("etc/motd".into())));

            let conf = target.path().join("etc/app/app.conf");
            assert_eq!(fs::read_to_string(&conf).unwrap(), "port=80\n");
            assert_eq!(fs::metadata(&conf).unwrap().permissions().mode() & 0o7777, 0o644);
            assert_eq!(
                fs::metadata(target.path().join("etc/app")).unwrap().permissions().mode() & 0o7777,
                0o755
            );
            assert!(crontab.tabs.borrow()["root"].contains("/usr/local/bin/backup"));

            // same revision again: nothing to do
            let again = reconcile(target.path(), &crontab, &packages, &new, &new);
            assert!(again.holdups.is_empty(), "{:?}", again.holdups);
            assert!(again.failures.is_empty());
            assert!(again.actions.is_empty(), "{:?}", again.actions);
        }

        #[test]
        fn test_update_pending_then_local_drift() {
            let old_repo = checkout("include etc/** mode=0644\n", &[("etc/foo.conf", "H1\n")]);
            let new_repo = checkout("include etc/** mode=0644\n", &[("etc/foo.conf", "H2\n")]);
            let target = TempDir::new().unwrap();
            let crontab = MemoryCrontab::default();
            let packages = no_packages();
            let original = parse(old_repo.path());
            let new = parse(new_repo.path());

            fs::create_dir_all(target.path().join("etc")).unwrap();
            let live = target.path().join("etc/foo.conf");
            fs::write(&live, "H1\n").unwrap();
            fs::set_permissions(&live, fs::Permissions::from_mode(0o644)).unwrap();

            let plan = reconcile(target.path(), &crontab, &packages, &original, &new);
            assert!(plan.holdups.is_empty(), "{:?}", plan.holdups);
            assert!(plan.verbose.iter().any(|l| l.contains("content update pending")));
            assert!(matches!(&plan.actions[..], [Action::UpdateFile(f)] if f.path == "etc/foo.conf"));

            // operator edits the file before the update lands
            fs::write(&live, "local edit\n").unwrap();
            let plan = reconcile(target.path(), &crontab, &packages, &original, &new);
            assert_eq!(plan.holdups, ["LOCAL file has changes: etc/foo.conf"]);
            assert!(matches!(&plan.actions[..], [Action::UpdateFile(_)]));

            let (result, _) = execute(target.path(), &crontab, &plan, false, true);
            assert!(matches!(result, Err(ExecutionError::Blocked { holdups: 1, .. })));
            assert_eq!(fs::read_to_string(&live).unwrap(), "local edit\n");

            let (result, _) = execute(target.path(), &crontab, &plan, true, true);
            assert_eq!(result.unwrap().updated, 1);
            assert_eq!(fs::read_to_string(&live).unwrap(), "H2\n");
            assert_eq!(
                fs::read_to_string(target.path().join("etc/foo.conf.gitman")).unwrap(),
                "local edit\n"
            );
        }

        #[test]
        fn test_removed_from_repository() {
            let old_repo = checkout(
                "include etc/** mode=0644\ninclude etc\n",
                &[("etc/a", "a"), ("etc/b", "b")],
            );
            let new_repo = checkout("include etc/** mode=0644\ninclude etc\n", &[("etc/b", "b")]);
            let target = TempDir::new().unwrap();
            let crontab = MemoryCrontab::default();
            let packages = no_packages();

            let original = parse(old_repo.path());
            let plan = reconcile(target.path(), &crontab, &packages, &ResourceSet::empty(), &original);
            execute(target.path(), &crontab, &plan, false, false).0.unwrap();
            assert!(target.path().join("etc/a").exists());

            let new = parse(new_repo.path());
            let plan = reconcile(target.path(), &crontab, &packages, &original, &new);
            assert!(plan.holdups.is_empty());
            let (result, events) = execute(target.path(), &crontab, &plan, false, false);
            assert_eq!(result.unwrap().deleted, 1);
            assert!(!target.path().join("etc/a").exists());
            assert!(target.path().join("etc/b").exists());
            assert_eq!(events, [Event::Deleted("etc/a".into())]);

            // the directory is removed last, after its contents
            let plan = reconcile(target.path(), &crontab, &packages, &new, &ResourceSet::empty());
            let (result, _) = execute(target.path(), &crontab, &plan, false, false);
            let summary = result.unwrap();
            assert_eq!(summary.deleted, 2);
            assert!(!target.path().join("etc").exists());
        }

        #[test]
        fn test_crontab_drift_needs_force() {
            let repo = checkout("crontab root cron/a\n", &[("cron/a", "* * * * * a\n")]);
            let target = TempDir::new().unwrap();
            let crontab = MemoryCrontab::default();
            let packages = no_packages();
            let new = parse(repo.path());

            crontab.tabs.borrow_mut().insert("root".into(), "hand written\n".into());
            let plan = reconcile(target.path(), &crontab, &packages, &ResourceSet::empty(), &new);
            assert_eq!(plan.holdups, ["ADDED crontab already exists with differences: root"]);

            execute(target.path(), &crontab, &plan, true, false).0.unwrap();
            assert_eq!(crontab.tabs.borrow()["root"], new.crontabs["root"].content);

            let plan = reconcile(target.path(), &crontab, &packages, &new, &ResourceSet::empty());
            assert!(plan.holdups.is_empty());
            execute(target.path(), &crontab, &plan, false, false).0.unwrap();
            assert!(crontab.tabs.borrow().is_empty());
        }

        #[test]
        fn test_package_downgrade_blocks_even_with_force() {
            let repo = checkout("rpm foo-1.0-1.x86_64.rpm\nrpm bar-2.0-1\n", &[]);
            let target = TempDir::new().unwrap();
            let crontab = MemoryCrontab::default();
            let packages = rpmkit::Client::with_backend(Box::new(StaticRpm {
                installed: [("foo".to_string(), Package::installed("foo", "2.0", "1"))].into(),
                ..Default::default()
            }));

            let new = parse(repo.path());
            let plan = reconcile(target.path(), &crontab, &packages, &ResourceSet::empty(), &new);
            assert_eq!(plan.failures.len(), 1);
            assert!(plan.failures[0].contains("foo-1.0-1"));

            let [Action::PackageTransaction(tx)] = &plan.actions[..] else {
                panic!("expected a package transaction, got {:?}", plan.actions);
            };
            assert_eq!(tx.summary(), ["install bar-2.0-1"]);

            let (result, _) = execute(target.path(), &crontab, &plan, true, false);
            assert!(matches!(result, Err(ExecutionError::Blocked { failures: 1, .. })));
        }

        #[test]
        fn test_modified_package_is_kept_on_delete() {
            let old_repo = checkout("rpm tmux-1.8-4\nrpm screen-4.1-1\n", &[]);
            let new_repo = checkout("", &[]);
            let target = TempDir::new().unwrap();
            let crontab = MemoryCrontab::default();
            let applied = Rc::new(RefCell::new(Vec::new()));
            let packages = rpmkit::Client::with_backend(Box::new(StaticRpm {
                installed: [
                    ("tmux".to_string(), Package::installed("tmux", "1.8", "4")),
                    ("screen".to_string(), Package::installed("screen", "4.1", "1")),
                ]
                .into(),
                broken: vec!["tmux".to_string()],
                applied: Rc::clone(&applied),
            }));

            let plan = reconcile(
                target.path(),
                &crontab,
                &packages,
                &parse(old_repo.path()),
                &parse(new_repo.path()),
            );
            assert_eq!(plan.holdups.len(), 1);
            assert!(plan.holdups[0].starts_with("DELETED package but has local differences: tmux-1.8-4"));
            assert!(plan.holdups[0].contains("/usr/bin/tmux"));
            let [Action::PackageTransaction(tx)] = &plan.actions[..] else {
                panic!("expected a package transaction, got {:?}", plan.actions);
            };
            assert_eq!(tx.summary(), ["erase screen-4.1-1"]);

            execute_with(target.path(), &crontab, &packages, &plan, true, false).0.unwrap();
            assert_eq!(*applied.borrow(), [vec!["erase screen-4.1-1".to_string()]]);
        }

        #[test]
        fn test_record_round_trip_through_deploy() {
            let repo = checkout("include etc/**\n", &[("etc/x", "x")]);
            fs::create_dir(repo.path().join(".git")).unwrap();
            let target = TempDir::new().unwrap();
            let crontab = MemoryCrontab::default();
            let packages = no_packages();
            let record = DeploymentRecord::for_branch(repo.path(), "feature/x");
            assert_eq!(record.read().unwrap(), None);

            let new = parse(repo.path());
            let plan = reconcile(target.path(), &crontab, &packages, &ResourceSet::empty(), &new);
            let mut sink = CollectingSink::default();
            let options = ExecuteOptions {
                target_root: target.path().to_path_buf(),
                ..Default::default()
            };
            Executor::new(&NoExtended, &crontab, &packages, &mut sink, options)
                .deploy(&plan, &record, "c0ffee")
                .unwrap();

            assert_eq!(record.read().unwrap().as_deref(), Some("c0ffee"));
            assert!(record.path().ends_with(".git/gitman_deploy.feature^x"));
        }
    }
}
