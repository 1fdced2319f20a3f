//! POSIX.1e ACL entry lists.
//!
//! Entries are accepted in the short (`u:alice:rw-`) and long
//! (`user:alice:rw-`) text forms used by `getfacl`/`setfacl`, separated by
//! commas or newlines. Lists are kept in canonical order so two lists that
//! grant the same access compare equal regardless of how they were written.

use crate::error::{Error, Result};
use std::fmt;

/// Permission bits of a single entry (`r` = 4, `w` = 2, `x` = 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Perms(u8);

impl Perms {
    /// Create from the low three bits of `bits`.
    pub fn new(bits: u8) -> Self {
        Self(bits & 0o7)
    }

    /// Raw permission bits.
    pub fn bits(self) -> u8 {
        self.0
    }

    fn parse(text: &str) -> Option<Self> {
        if let Ok(digit) = u8::from_str_radix(text, 8) {
            return (digit <= 0o7).then_some(Self(digit));
        }

        let mut bits = 0;
        for c in text.chars() {
            bits |= match c {
                'r' => 4,
                'w' => 2,
                'x' => 1,
                '-' => 0,
                _ => return None,
            };
        }
        Some(Self(bits))
    }
}

impl fmt::Display for Perms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |bit: u8, c: char| if self.0 & bit != 0 { c } else { '-' };
        write!(f, "{}{}{}", flag(4, 'r'), flag(2, 'w'), flag(1, 'x'))
    }
}

/// Entry tag. Variant order is the canonical ACL ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    /// The owning user (`u::`)
    UserObj,
    /// A named user (`u:name:`)
    User(String),
    /// The owning group (`g::`)
    GroupObj,
    /// A named group (`g:name:`)
    Group(String),
    /// The mask entry (`m::`)
    Mask,
    /// Everyone else (`o::`)
    Other,
}

impl Tag {
    /// Whether this tag carries information beyond owner/group/other bits.
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::User(_) | Self::Group(_) | Self::Mask)
    }
}

/// A single ACL entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AclEntry {
    /// Who the entry applies to
    pub tag: Tag,
    /// What they may do
    pub perms: Perms,
}

impl AclEntry {
    fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidEntry(text.to_string());
        let parts: Vec<&str> = text.split(':').map(str::trim).collect();

        let (kind, qualifier, perms) = match parts.as_slice() {
            [kind, qualifier, perms] => (*kind, *qualifier, *perms),
            // mask and other may omit the empty qualifier
            [kind, perms] => (*kind, "", *perms),
            _ => return Err(invalid()),
        };

        let tag = match (kind, qualifier) {
            ("u" | "user", "") => Tag::UserObj,
            ("u" | "user", name) => Tag::User(name.to_string()),
            ("g" | "group", "") => Tag::GroupObj,
            ("g" | "group", name) => Tag::Group(name.to_string()),
            ("m" | "mask", "") => Tag::Mask,
            ("o" | "other", "") => Tag::Other,
            _ => return Err(invalid()),
        };

        if parts.len() == 2 && !matches!(tag, Tag::Mask | Tag::Other) {
            return Err(invalid());
        }

        let perms = Perms::parse(perms).ok_or_else(invalid)?;
        Ok(Self { tag, perms })
    }
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Tag::UserObj => write!(f, "u::{}", self.perms),
            Tag::User(name) => write!(f, "u:{name}:{}", self.perms),
            Tag::GroupObj => write!(f, "g::{}", self.perms),
            Tag::Group(name) => write!(f, "g:{name}:{}", self.perms),
            Tag::Mask => write!(f, "m::{}", self.perms),
            Tag::Other => write!(f, "o::{}", self.perms),
        }
    }
}

/// A complete, canonically ordered ACL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AclEntries(Vec<AclEntry>);

impl AclEntries {
    /// Parse an ACL text.
    ///
    /// Owner, group and other entries missing from `text` are filled in from
    /// `fallback_mode`. If named entries are present without a mask, the
    /// mask is computed as the union of the group-class permissions.
    /// `default:` entries and `#` comments (as printed by `getfacl`) are
    /// ignored.
    pub fn parse(text: &str, fallback_mode: u32) -> Result<Self> {
        let mut entries = Vec::new();

        for raw in text.split([',', '\n']) {
            let raw = raw.split('#').next().unwrap_or_default().trim();
            if raw.is_empty() || raw.starts_with("default:") || raw.starts_with("d:") {
                continue;
            }
            entries.push(AclEntry::parse(raw)?);
        }

        let mut acl = Self::from_vec(entries);
        acl.complete(fallback_mode);
        Ok(acl)
    }

    /// Minimal ACL equivalent to a permission mode.
    pub fn from_mode(mode: u32) -> Self {
        let mut acl = Self::default();
        acl.complete(mode);
        acl
    }

    fn from_vec(entries: Vec<AclEntry>) -> Self {
        // later entries for the same tag win
        let mut kept: Vec<AclEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            kept.retain(|e| e.tag != entry.tag);
            kept.push(entry);
        }
        kept.sort();
        Self(kept)
    }

    fn complete(&mut self, mode: u32) {
        let required = [
            (Tag::UserObj, (mode >> 6) as u8),
            (Tag::GroupObj, (mode >> 3) as u8),
            (Tag::Other, mode as u8),
        ];
        for (tag, bits) in required {
            if self.get(&tag).is_none() {
                self.0.push(AclEntry {
                    tag,
                    perms: Perms::new(bits),
                });
            }
        }

        let has_named = self.0.iter().any(|e| matches!(e.tag, Tag::User(_) | Tag::Group(_)));
        if has_named && self.get(&Tag::Mask).is_none() {
            let mask = self
                .0
                .iter()
                .filter(|e| matches!(e.tag, Tag::User(_) | Tag::GroupObj | Tag::Group(_)))
                .fold(0, |acc, e| acc | e.perms.bits());
            self.0.push(AclEntry {
                tag: Tag::Mask,
                perms: Perms::new(mask),
            });
        }

        self.0.sort();
    }

    /// Look up the entry for a tag.
    pub fn get(&self, tag: &Tag) -> Option<Perms> {
        self.0.iter().find(|e| &e.tag == tag).map(|e| e.perms)
    }

    /// Iterate over the entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &AclEntry> {
        self.0.iter()
    }

    /// True when the list carries nothing beyond owner/group/other bits.
    pub fn is_minimal(&self) -> bool {
        !self.0.iter().any(|e| e.tag.is_extended())
    }

    /// Permission mode equivalent to a minimal ACL, `None` otherwise.
    pub fn equiv_mode(&self) -> Option<u32> {
        if !self.is_minimal() {
            return None;
        }
        let bits = |tag| u32::from(self.get(&tag).map_or(0, Perms::bits));
        Some(bits(Tag::UserObj) << 6 | bits(Tag::GroupObj) << 3 | bits(Tag::Other))
    }
}

impl fmt::Display for AclEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", text.join(","))
    }
}
