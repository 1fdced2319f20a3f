//! Core types for RPM package management.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+)-(?P<version>\d[\w.~+]*)-(?P<release>[^-]+?)(?:\.rpm)?$")
        .expect("package specifier pattern is valid")
});

/// A package, either declared (from a specifier) or installed.
///
/// Identity is the name; two packages with the same name but different
/// versions describe the same package at different points in time.
/// Equality and ordering compare versions (see [`crate::version`]).
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name (e.g., "jsoncpp")
    pub name: String,
    /// Version, `None` for unversioned declarations
    pub version: Option<String>,
    /// Release, set whenever `version` is
    pub release: Option<String>,
    /// Where to install from: the declared specifier, or the
    /// `name-version-release` string for installed packages
    pub url: String,
}

impl Package {
    /// Parse a specifier such as `jsoncpp-0.6.0rc2-3.x86_64.rpm` or a URL
    /// ending in one.
    ///
    /// Anything that doesn't look like `name-version-release[.rpm]` becomes
    /// an unversioned package named after the whole file name.
    pub fn parse(spec: &str) -> Self {
        let file_name = spec.rsplit('/').next().unwrap_or(spec);

        match SPECIFIER.captures(file_name) {
            Some(caps) => Self {
                name: caps["name"].to_string(),
                version: Some(caps["version"].to_string()),
                release: Some(caps["release"].to_string()),
                url: spec.to_string(),
            },
            None => Self {
                name: file_name.to_string(),
                version: None,
                release: None,
                url: spec.to_string(),
            },
        }
    }

    /// An installed package as reported by the package database.
    pub fn installed(name: impl Into<String>, version: impl Into<String>, release: impl Into<String>) -> Self {
        let mut pkg = Self {
            name: name.into(),
            version: Some(version.into()),
            release: Some(release.into()),
            url: String::new(),
        };
        pkg.url = pkg.to_string();
        pkg
    }

    /// Whether a version was declared.
    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, &self.release) {
            (Some(version), Some(release)) => write!(f, "{}-{version}-{release}", self.name),
            (Some(version), None) => write!(f, "{}-{version}", self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// One `rpm -V` reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VerifyReason {
    /// `S`: file size differs
    Size,
    /// `M`: mode differs (permissions and file type)
    Mode,
    /// `5`: digest differs
    Digest,
    /// `D`: device major/minor mismatch
    Device,
    /// `L`: readlink path mismatch
    Link,
    /// `U`: user ownership differs
    User,
    /// `G`: group ownership differs
    Group,
    /// `T`: mtime differs
    Mtime,
    /// `P`: capabilities differ
    Capabilities,
    /// File is missing
    Missing,
}

impl VerifyReason {
    /// Every flag-column reason, in `rpm -V` column order.
    pub const FLAGS: [Self; 9] = [
        Self::Size,
        Self::Mode,
        Self::Digest,
        Self::Device,
        Self::Link,
        Self::User,
        Self::Group,
        Self::Mtime,
        Self::Capabilities,
    ];

    /// Parse a flag character.
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'S' => Self::Size,
            'M' => Self::Mode,
            '5' => Self::Digest,
            'D' => Self::Device,
            'L' => Self::Link,
            'U' => Self::User,
            'G' => Self::Group,
            'T' => Self::Mtime,
            'P' => Self::Capabilities,
            _ => return None,
        })
    }

    /// Human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Size => "File Size differs",
            Self::Mode => "Mode differs (includes permissions and file type)",
            Self::Digest => "Digest differs",
            Self::Device => "Device major/minor number mismatch",
            Self::Link => "ReadLink(2) path mismatch",
            Self::User => "User ownership differs",
            Self::Group => "Group ownership differs",
            Self::Mtime => "Mtime differs",
            Self::Capabilities => "Capabilities differ",
            Self::Missing => "File is missing",
        }
    }
}

/// A file that failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyIssue {
    /// Path of the file
    pub file: String,
    /// Why it failed
    pub reasons: Vec<VerifyReason>,
    /// Marked as a config file (`c`) in the package
    pub config: bool,
}

impl fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<&str> = self.reasons.iter().map(VerifyReason::description).collect();
        write!(f, "{}: {}", self.file, reasons.join(", "))
    }
}

/// Result of running a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Everything went through
    Success,
    /// The package manager refused or failed
    Failed {
        /// Combined output of the package manager
        log: String,
    },
}

impl TransactionOutcome {
    /// Whether the transaction succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
