//! # rpmkit
//!
//! RPM package bookkeeping for configuration deployment.
//!
//! This crate provides:
//! - Parsing package specifiers (`name-version-release[.rpm]`)
//! - Version/release ordering with zero padding and pre-release tokens
//! - A transaction queue of disjoint install/reinstall/erase sets
//! - Verification reports with config files and ignored reasons filtered out
//!
//! ## Example
//!
//! ```no_run
//! use rpmkit::{Client, Package, Transaction, VerifyPolicy};
//!
//! let client = Client::new().with_policy(VerifyPolicy::from_codes("T")?);
//!
//! let wanted = Package::parse("jsoncpp-0.6.0rc2-3.x86_64.rpm");
//! let mut tx = Transaction::new();
//! match client.query_installed(&wanted.name)? {
//!     Some(installed) if installed >= wanted => {}
//!     _ => tx.queue_install(wanted),
//! }
//!
//! let outcome = client.run(&tx, true)?;
//! println!("dry run ok: {}", outcome.is_success());
//! # Ok::<(), rpmkit::Error>(())
//! ```

pub mod backend;
pub mod error;
pub mod transaction;
pub mod types;
pub mod verify;
pub mod version;

pub use error::{Error, Result};
pub use transaction::Transaction;
pub use types::{Package, TransactionOutcome, VerifyIssue, VerifyReason};
pub use verify::VerifyPolicy;

use backend::{Backend, RpmBackend};

/// High-level client for package operations.
///
/// Wraps a backend and applies the verify policy to everything it reports.
pub struct Client {
    backend: Box<dyn Backend>,
    policy: VerifyPolicy,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client using the system `rpm`/`yum`.
    pub fn new() -> Self {
        Self::with_backend(Box::new(RpmBackend::new()))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            policy: VerifyPolicy::default(),
        }
    }

    /// Replace the verify policy.
    pub fn with_policy(mut self, policy: VerifyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check if the package manager is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// The installed package named `name`, if any.
    pub fn query_installed(&self, name: &str) -> Result<Option<Package>> {
        self.backend.query_installed(name)
    }

    /// Local drift of the installed package `name`, after the verify policy.
    ///
    /// Empty when the package is intact.
    pub fn verify(&self, name: &str) -> Result<Vec<VerifyIssue>> {
        let issues = self.backend.verify(name)?;
        Ok(self.policy.filter(issues))
    }

    /// Run a transaction, for real or as a dry run.
    pub fn run(&self, tx: &Transaction, test: bool) -> Result<TransactionOutcome> {
        log::debug!("package transaction (test={test}): {:?}", tx.summary());
        self.backend.run_transaction(tx, test)
    }
}
