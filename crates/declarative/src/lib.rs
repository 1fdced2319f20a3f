//! # Declarative
//!
//! Three-way reconciliation of declared host state.
//!
//! A repository describes what one host should look like. This crate turns
//! that description into a [`ResourceSet`], compares the set deployed last
//! time with the set at the target revision and with the live system, and
//! applies the result.
//!
//! ## Core Concepts
//!
//! - **ResourceSet**: files, crontabs and packages declared at one revision
//! - **DeploymentPlan**: ordered actions plus every holdup and failure found
//! - **Holdup**: a divergence that needs force to override
//! - **Failure**: a divergence that blocks deployment outright
//! - **DeploymentRecord**: the revision last applied from a branch
//!
//! ## Example
//!
//! ```no_run
//! use declarative::{
//!     Blake3Hasher, ConfigParser, DeploymentRecord, ExecuteOptions, Executor, LocalState,
//!     LogSink, ReconcileOptions, Reconciler, RepoConfig, ResourceSet,
//! };
//! # use declarative::CrontabService;
//! # struct NoCron;
//! # impl CrontabService for NoCron {
//! #     fn export(&self, _: &str) -> anyhow::Result<Option<String>> { Ok(None) }
//! #     fn install(&self, _: &str, _: &str) -> anyhow::Result<()> { Ok(()) }
//! #     fn remove(&self, _: &str) -> anyhow::Result<()> { Ok(()) }
//! # }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = std::path::Path::new("/srv/config");
//! let config = RepoConfig::load(repo, "web1.example.com")?;
//! let settings = acl::AclSettings::default();
//! let hasher = Blake3Hasher;
//!
//! let new = ConfigParser::new(repo, &config, settings, &hasher).parse()?;
//!
//! let backend = acl::default_backend();
//! let live = LocalState::new("/", &hasher, backend.as_ref(), settings);
//! let packages = rpmkit::Client::new();
//! let plan = Reconciler::new(&live, &NoCron, &packages, &hasher, ReconcileOptions::default())
//!     .reconcile(&ResourceSet::empty(), &new)?;
//!
//! let mut sink = LogSink;
//! let record = DeploymentRecord::for_branch(repo, "master");
//! Executor::new(backend.as_ref(), &NoCron, &packages, &mut sink, ExecuteOptions::default())
//!     .deploy(&plan, &record, "0123abcd")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Collaborator Traits
//!
//! Everything outside the process is reached through traits:
//!
//! - [`LiveState`]: deployed files and their permissions
//! - [`CrontabService`]: per-user crontabs
//! - [`RevisionSource`]: file content at past revisions, for diffs
//! - [`ObjectHasher`]: content fingerprints matching the repository's own
//! - [`EventSink`]: notifications about deployed files

pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod fsops;
pub mod glob;
pub mod hash;
pub mod parser;
pub mod planner;
pub mod record;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use config::RepoConfig;
pub use context::{
    CollectingSink, CrontabService, Event, EventSink, LiveState, LocalState, LogSink, RevisionSource,
};
pub use diff::{DiffMode, unified_diff};
pub use error::{Error, ExecutionError, ParseError, Result};
pub use executor::Executor;
pub use fsops::{safe_replace, safe_replace_with};
pub use glob::{AntGlob, GlobOptions};
pub use hash::{Blake3Hasher, ContentHash, ObjectHasher, hash_path};
pub use parser::ConfigParser;
pub use planner::{History, Reconciler};
pub use record::DeploymentRecord;
pub use resource::{CrontabResource, FileResource, PackageResource, ResourceSet};
pub use types::{Action, DeploymentPlan, ExecuteOptions, ExecuteSummary, ReconcileOptions};
