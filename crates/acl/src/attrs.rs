//! `key=value` attribute tokens as written in resource declarations.

use crate::entries::AclEntries;
use crate::error::{Error, Result};
use crate::types::{Acl, AclSettings};

/// Raw attribute values collected from `defattr`/`include` tokens.
///
/// Values stay textual until resolved so that a `defattr` default can be
/// overridden token by token before anything is validated as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclComponents {
    pub user: Option<String>,
    pub group: Option<String>,
    pub mode: Option<String>,
    pub xattr: Option<String>,
    pub dirmode: Option<String>,
    pub dirxattr: Option<String>,
}

impl AclComponents {
    /// Parse a list of tokens on top of an empty set of components.
    pub fn from_tokens<'a, I>(tokens: I, settings: AclSettings) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut components = Self::default();
        components.apply_all(tokens, settings)?;
        Ok(components)
    }

    /// Apply a list of tokens, later ones overriding earlier ones.
    pub fn apply_all<'a, I>(&mut self, tokens: I, settings: AclSettings) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tokens.into_iter().try_for_each(|token| self.apply(token, settings))
    }

    /// Apply a single `key=value` token.
    ///
    /// `xattr` and `dirxattr` are rejected unless extended ACL support is
    /// enabled.
    pub fn apply(&mut self, token: &str, settings: AclSettings) -> Result<()> {
        let Some((key, value)) = token.split_once('=') else {
            return Err(Error::InvalidAttribute {
                key: token.to_string(),
            });
        };

        let slot = match key {
            "user" => &mut self.user,
            "group" => &mut self.group,
            "mode" => &mut self.mode,
            "dirmode" => &mut self.dirmode,
            "xattr" if settings.extended => &mut self.xattr,
            "dirxattr" if settings.extended => &mut self.dirxattr,
            _ => {
                return Err(Error::InvalidAttribute {
                    key: key.to_string(),
                });
            }
        };
        *slot = Some(value.to_string());
        Ok(())
    }

    /// ACL for regular files and symlinks.
    pub fn file_acl(&self, settings: AclSettings) -> Result<Acl> {
        self.resolve(self.mode.as_deref(), self.xattr.as_deref(), settings)
    }

    /// ACL for directories.
    pub fn dir_acl(&self, settings: AclSettings) -> Result<Acl> {
        self.resolve(self.dirmode.as_deref(), self.dirxattr.as_deref(), settings)
    }

    fn resolve(&self, mode: Option<&str>, xattr: Option<&str>, settings: AclSettings) -> Result<Acl> {
        let mode = mode.map(parse_mode).transpose()?;
        let entries = match xattr {
            Some(text) if settings.extended => Some(AclEntries::parse(text, mode.unwrap_or(0))?),
            _ => None,
        };
        Ok(Acl::from_components(
            self.user.clone(),
            self.group.clone(),
            mode,
            entries,
            settings,
        ))
    }
}

/// Parse an octal permission mode such as `0644` or `755`.
pub fn parse_mode(text: &str) -> Result<u32> {
    u32::from_str_radix(text, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| Error::InvalidMode(text.to_string()))
}
