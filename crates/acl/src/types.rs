//! Permission descriptions and their wildcard comparison.

use crate::entries::AclEntries;
use std::fmt;

/// Owner, group and permission bits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleAcl {
    /// Owning user name, `None` = don't care
    pub user: Option<String>,
    /// Owning group name, `None` = don't care
    pub group: Option<String>,
    /// Permission bits (`0o7777` range), `None` = don't care
    pub mode: Option<u32>,
}

/// Owner, group and a full POSIX ACL entry list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedAcl {
    /// Owning user name, `None` = don't care
    pub user: Option<String>,
    /// Owning group name, `None` = don't care
    pub group: Option<String>,
    /// Complete entry list including the mask
    pub entries: AclEntries,
}

/// Who can access a file.
///
/// Equality is wildcard-aware and therefore not derived: an unset field on
/// either side matches anything, and a [`Acl::Symlink`] matches every value.
/// Use [`Acl::matches`] (or `==`) for "is the declared state satisfied", and
/// compare the fields directly when strict identity is needed.
#[derive(Debug, Clone)]
pub enum Acl {
    /// Traditional owner/group/mode
    Simple(SimpleAcl),
    /// Owner/group plus extended ACL entries
    Extended(ExtendedAcl),
    /// Symlinks carry no meaningful permissions
    Symlink,
}

/// Runtime switches for permission handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclSettings {
    /// Whether extended ACLs (`xattr=`/`dirxattr=`) may be declared, read and written
    pub extended: bool,
}

impl Default for AclSettings {
    fn default() -> Self {
        Self { extended: true }
    }
}

fn wildcard_eq<T: PartialEq>(a: Option<&T>, b: Option<&T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

impl Acl {
    /// Build from already-validated components.
    ///
    /// An entry list is only honoured when extended ACLs are enabled; the
    /// result is simplified so entry lists that only restate a mode compare
    /// as plain modes.
    pub fn from_components(
        user: Option<String>,
        group: Option<String>,
        mode: Option<u32>,
        entries: Option<AclEntries>,
        settings: AclSettings,
    ) -> Self {
        match entries {
            Some(entries) if settings.extended => Self::Extended(ExtendedAcl {
                user,
                group,
                entries,
            })
            .simplify(),
            _ => Self::Simple(SimpleAcl { user, group, mode }),
        }
    }

    /// Shorthand for a simple ACL.
    pub fn simple(user: Option<&str>, group: Option<&str>, mode: Option<u32>) -> Self {
        Self::Simple(SimpleAcl {
            user: user.map(str::to_string),
            group: group.map(str::to_string),
            mode,
        })
    }

    /// Declared owning user, if any.
    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Simple(acl) => acl.user.as_deref(),
            Self::Extended(acl) => acl.user.as_deref(),
            Self::Symlink => None,
        }
    }

    /// Declared owning group, if any.
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::Simple(acl) => acl.group.as_deref(),
            Self::Extended(acl) => acl.group.as_deref(),
            Self::Symlink => None,
        }
    }

    /// Whether this carries an extended entry list.
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }

    /// Collapse an extended ACL with no named entries to a simple one.
    pub fn simplify(self) -> Self {
        match self {
            Self::Extended(acl) => match acl.entries.equiv_mode() {
                Some(mode) => Self::Simple(SimpleAcl {
                    user: acl.user,
                    group: acl.group,
                    mode: Some(mode),
                }),
                None => Self::Extended(acl),
            },
            other => other,
        }
    }

    /// Wildcard comparison.
    ///
    /// Simple and extended values never match each other; a symlink matches
    /// anything.
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Symlink, _) | (_, Self::Symlink) => true,
            (Self::Simple(a), Self::Simple(b)) => {
                wildcard_eq(a.user.as_ref(), b.user.as_ref())
                    && wildcard_eq(a.group.as_ref(), b.group.as_ref())
                    && wildcard_eq(a.mode.as_ref(), b.mode.as_ref())
            }
            (Self::Extended(a), Self::Extended(b)) => {
                wildcard_eq(a.user.as_ref(), b.user.as_ref())
                    && wildcard_eq(a.group.as_ref(), b.group.as_ref())
                    && a.entries == b.entries
            }
            _ => false,
        }
    }

    /// Text form of the permission part: `0644`, an abbreviated entry list,
    /// or `default` when unset.
    pub fn mode_str(&self) -> String {
        match self {
            Self::Simple(SimpleAcl { mode: Some(mode), .. }) => format!("{mode:04o}"),
            Self::Simple(_) => "default".to_string(),
            Self::Extended(acl) => acl.entries.to_string(),
            Self::Symlink => "0777".to_string(),
        }
    }
}

impl PartialEq for Acl {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.user().unwrap_or("default"),
            self.group().unwrap_or("default"),
            self.mode_str()
        )
    }
}
