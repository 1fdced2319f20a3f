//! Repository configuration (`config` at the repository root).
//!
//! One `key: value` per line; lines without a colon are ignored. Values may
//! use `%machine%` and `%short_machine%`, which expand to the host's full
//! and short name as known when the line is read.

use crate::error::ParseError;
use rpmkit::{VerifyPolicy, VerifyReason};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the repository configuration.
pub const CONFIG_FILE: &str = "config";

/// Parsed repository configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    values: BTreeMap<String, String>,
}

impl RepoConfig {
    /// Defaults for `host` before any file is read.
    pub fn defaults(host: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert("host".to_string(), host.to_string());
        values.insert("short_host".to_string(), short_name(host).to_string());
        values.insert("host_dir".to_string(), "hosts".to_string());
        values.insert("host_file".to_string(), host.to_string());
        values.insert("root".to_string(), format!("machines/{host}"));
        Self { values }
    }

    /// Parse configuration text on top of the defaults for `host`.
    pub fn parse(text: &str, host: &str) -> Self {
        let mut config = Self::defaults(host);
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = config.substitute(value.trim());
            config.values.insert(key.to_string(), value);
        }
        config
    }

    /// Load `<repo>/config`; a missing file leaves the defaults.
    pub fn load(repo: &Path, host: &str) -> Result<Self, ParseError> {
        let path = repo.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Self::parse(&text, host)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no {} in {}, using defaults", CONFIG_FILE, repo.display());
                Ok(Self::defaults(host))
            }
            Err(source) => Err(ParseError::Io { path, source }),
        }
    }

    /// Expand `%machine%` and `%short_machine%`.
    pub fn substitute(&self, text: &str) -> String {
        text.replace("%machine%", self.host())
            .replace("%short_machine%", self.short_host())
    }

    /// Raw value of any key, including ones this crate doesn't interpret.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a value verbatim.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Full host name.
    pub fn host(&self) -> &str {
        self.get("host").unwrap_or_default()
    }

    /// Host name up to the first dot.
    pub fn short_host(&self) -> &str {
        self.get("short_host").unwrap_or_default()
    }

    /// Directory holding host declaration files, relative to the repository.
    pub fn host_dir(&self) -> &str {
        self.get("host_dir").unwrap_or("hosts")
    }

    /// Path of the host declaration file, falling back to
    /// `default_host_file` when the host has none of its own.
    pub fn host_file_path(&self, repo: &Path) -> Result<PathBuf, ParseError> {
        let dir = repo.join(self.host_dir());
        let own = dir.join(self.get("host_file").unwrap_or(self.host()));
        if own.exists() {
            return Ok(own);
        }
        match self.get("default_host_file") {
            Some(default) if dir.join(default).exists() => {
                log::info!("{} not found, using {default}", own.display());
                Ok(dir.join(default))
            }
            _ => Err(ParseError::HostFileNotFound(own)),
        }
    }

    /// Resource root for this host, relative to the repository.
    pub fn root(&self) -> &str {
        self.get("root").unwrap_or_default()
    }

    /// Verify findings to ignore when looking for package drift.
    ///
    /// `rpm_verify_ignore` lists reason codes explicitly;
    /// `rpm_ignore_mtime: true` adds `T`.
    pub fn verify_policy(&self) -> rpmkit::Result<VerifyPolicy> {
        let mut policy = match self.get("rpm_verify_ignore") {
            Some(codes) => VerifyPolicy::from_codes(codes)?,
            None => VerifyPolicy::new(),
        };
        if self.get("rpm_ignore_mtime").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            policy = policy.ignoring(VerifyReason::Mtime);
        }
        Ok(policy)
    }
}

fn short_name(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}
