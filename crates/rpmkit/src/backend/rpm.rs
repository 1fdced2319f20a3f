//! Real backend using the `rpm` and `yum` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::transaction::Transaction;
use crate::types::{Package, TransactionOutcome, VerifyIssue};
use crate::verify;
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Backend that executes real `rpm`/`yum` commands.
#[derive(Debug, Clone)]
pub struct RpmBackend {
    rpm: String,
    yum: String,
}

impl Default for RpmBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RpmBackend {
    /// Use `rpm` and `yum` from `PATH`.
    pub fn new() -> Self {
        Self {
            rpm: "rpm".to_string(),
            yum: "yum".to_string(),
        }
    }

    fn run_rpm(&self, args: &[&str]) -> Result<Output> {
        log::debug!("{} {}", self.rpm, args.join(" "));
        Command::new(&self.rpm).args(args).output().map_err(|e| Error::CommandFailed {
            message: format!("failed to execute rpm: {e}"),
            stderr: String::new(),
        })
    }

    /// Dry run of `tx`.
    ///
    /// Only removals can be checked up front, since `rpm --test` cannot
    /// resolve the bare names and repository urls installs are queued as.
    fn test_transaction(&self, tx: &Transaction) -> Result<TransactionOutcome> {
        if let Some(pkg) = tx.removals().find(|p| tx.is_protected(&p.name)) {
            return Ok(TransactionOutcome::Failed {
                log: format!("refusing to erase protected package {}", pkg.name),
            });
        }

        let erase: Vec<&str> = tx.removals().map(|p| p.name.as_str()).collect();
        if erase.is_empty() {
            return Ok(TransactionOutcome::Success);
        }
        let mut args = vec!["--quiet", "--test", "-e"];
        args.extend(erase);
        Ok(failed(self.run_rpm(&args)?).unwrap_or(TransactionOutcome::Success))
    }

    fn real_transaction(&self, tx: &Transaction) -> Result<TransactionOutcome> {
        let script = yum_script(tx);
        let protected: Vec<&str> = tx.protected().collect();
        let setopt = format!("--setopt=protected_packages={}", protected.join(","));

        log::info!("yum shell:\n{script}");
        let mut child = Command::new(&self.yum)
            .args(["shell", "-y", &setopt])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute yum: {e}"),
                stderr: String::new(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        Ok(failed(output).unwrap_or(TransactionOutcome::Success))
    }
}

fn failed(output: Output) -> Option<TransactionOutcome> {
    if output.status.success() {
        return None;
    }
    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    Some(TransactionOutcome::Failed {
        log: log.trim_end().to_string(),
    })
}

/// Script fed to `yum shell`.
fn yum_script(tx: &Transaction) -> String {
    let mut script = String::new();
    for pkg in tx.removals() {
        script.push_str(&format!("erase {}\n", pkg.name));
    }
    for pkg in tx.reinstalls() {
        script.push_str(&format!("reinstall {}\n", pkg.url));
    }
    for pkg in tx.installs() {
        script.push_str(&format!("install {}\n", pkg.url));
    }
    script.push_str("run\n");
    script
}

fn parse_query(stdout: &str) -> Option<Package> {
    let line = stdout.lines().next()?;
    let mut fields = line.split('\t');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(name), Some(version), Some(release)) => Some(Package::installed(name, version, release)),
        _ => None,
    }
}

impl Backend for RpmBackend {
    fn is_available(&self) -> bool {
        self.run_rpm(&["--version"]).is_ok_and(|o| o.status.success())
    }

    fn query_installed(&self, name: &str) -> Result<Option<Package>> {
        let output = self.run_rpm(&["-q", "--qf", "%{NAME}\\t%{VERSION}\\t%{RELEASE}\\n", name])?;
        // rpm -q exits 1 for packages that are not installed
        if !output.status.success() {
            return Ok(None);
        }
        Ok(parse_query(&String::from_utf8_lossy(&output.stdout)))
    }

    fn verify(&self, name: &str) -> Result<Vec<VerifyIssue>> {
        // non-zero exit just means something differs; the output says what
        let output = self.run_rpm(&["-V", name])?;
        verify::parse_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn run_transaction(&self, tx: &Transaction, test: bool) -> Result<TransactionOutcome> {
        if tx.is_empty() {
            return Ok(TransactionOutcome::Success);
        }
        if test {
            self.test_transaction(tx)
        } else {
            self.real_transaction(tx)
        }
    }
}
