//! Backend abstraction for package manager operations.
//!
//! The [`Backend`] trait is the seam between package decisions and the
//! system package manager, allowing the real `rpm`/`yum` CLI to be swapped
//! for an in-memory mock in tests.

pub mod rpm;

use crate::error::Result;
use crate::transaction::Transaction;
use crate::types::{Package, TransactionOutcome, VerifyIssue};

pub use rpm::RpmBackend;

/// Backend trait for package manager operations.
pub trait Backend {
    /// Check if the package manager is available.
    fn is_available(&self) -> bool;

    /// The installed package named `name`, if any.
    fn query_installed(&self, name: &str) -> Result<Option<Package>>;

    /// Unfiltered verification findings for the installed package `name`.
    fn verify(&self, name: &str) -> Result<Vec<VerifyIssue>>;

    /// Run a transaction.
    ///
    /// With `test` set nothing on the system may change, but the outcome
    /// must be the one a real run would produce.
    fn run_transaction(&self, tx: &Transaction, test: bool) -> Result<TransactionOutcome>;
}
