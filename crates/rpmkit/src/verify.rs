//! `rpm -V` output parsing and filtering.

use crate::error::{Error, Result};
use crate::types::{VerifyIssue, VerifyReason};
use std::collections::BTreeSet;

/// Parse the output of `rpm -V <name>`.
///
/// Lines look like `S.5....T.  c /etc/foo.conf` or `missing     /usr/bin/foo`.
/// The single-letter file attribute between flags and path is optional.
/// Anything else (dependency complaints, for one) is logged and skipped.
pub fn parse_output(output: &str) -> Result<Vec<VerifyIssue>> {
    let mut issues = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(flags) = parts.next() else { continue };
        let rest: Vec<&str> = parts.collect();

        let (config, file) = match rest.as_slice() {
            [attr, file @ ..] if attr.len() == 1 && !file.is_empty() => (*attr == "c", file.join(" ")),
            [] => {
                log::warn!("ignoring rpm -V line: {line}");
                continue;
            }
            file => (false, file.join(" ")),
        };

        let reasons = if flags == "missing" {
            vec![VerifyReason::Missing]
        } else if flags.len() == VerifyReason::FLAGS.len() {
            flags
                .chars()
                .filter_map(VerifyReason::from_code)
                .collect()
        } else {
            log::warn!("ignoring rpm -V line: {line}");
            continue;
        };

        if reasons.is_empty() {
            continue;
        }
        issues.push(VerifyIssue { file, reasons, config });
    }

    Ok(issues)
}

/// Which verify findings count as local drift.
///
/// Config files are always ignored: local edits to them are expected.
/// Additional reason codes can be ignored for every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyPolicy {
    ignore: BTreeSet<VerifyReason>,
}

impl VerifyPolicy {
    /// Ignore nothing beyond config files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also ignore `reason`.
    pub fn ignoring(mut self, reason: VerifyReason) -> Self {
        self.ignore.insert(reason);
        self
    }

    /// Parse a comma-separated list of flag codes such as `T,U`.
    pub fn from_codes(codes: &str) -> Result<Self> {
        let mut policy = Self::new();
        for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            let reason = match code {
                "missing" => VerifyReason::Missing,
                _ => {
                    let mut chars = code.chars();
                    match (chars.next().and_then(VerifyReason::from_code), chars.next()) {
                        (Some(reason), None) => reason,
                        _ => return Err(Error::UnknownReason(code.to_string())),
                    }
                }
            };
            policy.ignore.insert(reason);
        }
        Ok(policy)
    }

    /// Whether `reason` is ignored.
    pub fn ignores(&self, reason: VerifyReason) -> bool {
        self.ignore.contains(&reason)
    }

    /// Drop config files and ignored reasons; issues left with no reason go.
    pub fn filter(&self, issues: Vec<VerifyIssue>) -> Vec<VerifyIssue> {
        issues
            .into_iter()
            .filter(|issue| !issue.config)
            .filter_map(|mut issue| {
                issue.reasons.retain(|r| !self.ignores(*r));
                (!issue.reasons.is_empty()).then_some(issue)
            })
            .collect()
    }
}
