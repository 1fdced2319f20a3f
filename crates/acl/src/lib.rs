//! # acl
//!
//! File permission model with "don't care" comparison semantics.
//!
//! A declared permission may leave the owner, group or mode unset; unset
//! fields match whatever is on disk. Three shapes are supported:
//!
//! - [`Acl::Simple`]: owner, group and mode bits
//! - [`Acl::Extended`]: owner, group and a POSIX ACL entry list
//! - [`Acl::Symlink`]: matches anything, applying it does nothing
//!
//! ## Example
//!
//! ```
//! use acl::{Acl, AclComponents, AclSettings};
//!
//! let settings = AclSettings::default();
//! let declared = AclComponents::from_tokens(["mode=0644"], settings)?
//!     .file_acl(settings)?;
//!
//! assert_eq!(declared, Acl::simple(Some("alice"), Some("wheel"), Some(0o644)));
//! # Ok::<(), acl::Error>(())
//! ```

pub mod attrs;
pub mod backend;
pub mod entries;
pub mod error;
pub mod live;
pub mod owner;
pub mod types;

pub use attrs::{AclComponents, parse_mode};
pub use backend::{AclBackend, GetfaclBackend, NoExtended, default_backend};
pub use entries::{AclEntries, AclEntry, Perms, Tag};
pub use error::{Error, Result};
pub use types::{Acl, AclSettings, ExtendedAcl, SimpleAcl};
