//! One deployment run: load both revisions, reconcile, report, apply.

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::{
    ConfigParser, DeploymentPlan, DeploymentRecord, ExecuteOptions, Executor, History, LocalState,
    LogSink, ReconcileOptions, Reconciler, RepoConfig, ResourceSet,
};
use std::path::Path;

use crate::Context;
use crate::cli::Cli;
use crate::crontab::CrontabCli;
use crate::runner;
use crate::ui;
use crate::vcs::{GitHasher, GitRepo};

pub fn run(ctx: &Context, cli: &Cli) -> Result<()> {
    if !runner::command_exists("git") {
        bail!("git not found in PATH");
    }

    let repo = GitRepo::open_or_clone(&cli.repo(), cli.origin.as_deref())?;
    let host = resolve_host(cli)?;
    log::debug!("deploying {} for {host}", repo.path().display());

    let settings = acl::AclSettings {
        extended: !cli.noacl,
    };
    let backend: Box<dyn acl::AclBackend> = if cli.noacl {
        Box::new(acl::NoExtended)
    } else {
        acl::default_backend()
    };
    let hasher = GitHasher::new(repo.path());

    if let Some(machine) = &cli.info {
        return show_info(&repo, machine, settings, &hasher);
    }

    let record = DeploymentRecord::for_branch(repo.path(), &cli.branch);
    let deployed = record.read()?;
    repo.verify_clean()?;

    let original = match &deployed {
        Some(revision) => {
            repo.switch_to(revision)?;
            load(repo.path(), &host, settings, &hasher)
                .with_context(|| format!("Failed to load deployed revision {revision}"))?
                .1
        }
        None => ResourceSet::empty(),
    };

    repo.switch_to_head(&cli.branch)?;
    let (config, new) = load(repo.path(), &host, settings, &hasher)
        .context("Failed to load newest revision")?;
    let newest = repo.latest_version()?;

    let verbose = !ctx.quiet;
    if verbose {
        ui::kv("Deployed version", deployed.as_deref().unwrap_or("None"));
        ui::kv("Newest version", &newest);
        println!(
            "  {} revisions between deployed and latest",
            repo.undeployed_revisions(deployed.as_deref())?
        );
    }

    let packages = rpmkit::Client::new().with_policy(config.verify_policy()?);
    if !new.packages.is_empty() && !packages.is_available() {
        ui::warn("rpm is not available; package checks will fail");
    }

    let crontabs = CrontabCli::new();
    let live = LocalState::new(&cli.target_root, &hasher, backend.as_ref(), settings);
    let options = ReconcileOptions {
        diffs: cli.diff_mode(),
        reinstall_broken: !cli.no_reinstall_broken,
    };
    let plan = Reconciler::new(&live, &crontabs, &packages, &hasher, options)
        .with_history(History {
            source: &repo,
            deployed: deployed.clone(),
            newest: newest.clone(),
        })
        .reconcile(&original, &new)?;

    report(&plan, verbose, cli.force);

    if !should_execute(&plan, cli.deploy, cli.force)? {
        return Ok(());
    }

    let mut sink = LogSink;
    let summary = Executor::new(
        backend.as_ref(),
        &crontabs,
        &packages,
        &mut sink,
        ExecuteOptions {
            backup: cli.backup,
            force: cli.force,
            target_root: cli.target_root.clone(),
        },
    )
    .deploy(&plan, &record, &newest)?;

    if verbose {
        ui::success(&format!("Deployed {newest}: {} change(s)", summary.total_changes()));
        if summary.skipped > 0 {
            ui::warn(&format!("{} directories were not empty and were left in place", summary.skipped));
        }
    }
    Ok(())
}

/// Whether `plan` goes on to the executor.
///
/// Failures are an error even on a report-only run.
fn should_execute(plan: &DeploymentPlan, deploy: bool, force: bool) -> Result<bool> {
    if !plan.failures.is_empty() {
        bail!("Deployment skipped due to failures...");
    }
    if !deploy {
        return Ok(false);
    }
    if !plan.holdups.is_empty() && !force {
        bail!("Deployment skipped due to holdups...");
    }
    Ok(true)
}

/// Host name from the command line, or the machine's fully qualified name.
fn resolve_host(cli: &Cli) -> Result<String> {
    if let Some(host) = cli.info.as_ref().or(cli.assume_host.as_ref()) {
        return Ok(host.clone());
    }
    let host = runner::run_capture("hostname", &["-f"]).context("Failed to determine host name")?;
    if host.is_empty() {
        bail!("hostname -f returned nothing; use --assume-host");
    }
    Ok(host)
}

/// Configuration and declared resources of the checkout as it is now.
fn load(
    repo: &Path,
    host: &str,
    settings: acl::AclSettings,
    hasher: &GitHasher,
) -> Result<(RepoConfig, ResourceSet)> {
    let config = RepoConfig::load(repo, host)?;
    let resources = ConfigParser::new(repo, &config, settings, hasher).parse()?;
    Ok((config, resources))
}

/// Every file `machine` would get from the current checkout.
fn show_info(repo: &GitRepo, machine: &str, settings: acl::AclSettings, hasher: &GitHasher) -> Result<()> {
    let (config, resources) = load(repo.path(), machine, settings, hasher)?;
    let host_file = config.host_file_path(repo.path())?;
    let name = host_file
        .file_name()
        .map_or_else(|| host_file.display().to_string(), |n| n.to_string_lossy().into_owned());

    println!("Showing deployment info for: {name}");
    for path in resources.files.keys() {
        println!("ADDED: {path}");
    }
    Ok(())
}

fn report(plan: &DeploymentPlan, verbose: bool, force: bool) {
    if verbose {
        for line in &plan.verbose {
            ui::narrate(line);
        }
    }
    if !plan.failures.is_empty() {
        ui::section("Deployment blocked by:");
        ui::findings(&plan.failures);
    }
    if !plan.holdups.is_empty() && !force {
        ui::section("Force deployment needed:");
        ui::findings(&plan.holdups);
    }
    if verbose && plan.is_empty() && plan.holdups.is_empty() && plan.failures.is_empty() {
        ui::info("Nothing to deploy");
    }
}
