//! Ant-style include/exclude globbing.
//!
//! Patterns are `/`-separated. `**` matches any number of segments
//! (including none), `*` any run of characters within a segment and `?` a
//! single character. A pattern ending in `/` matches everything below that
//! directory.
//!
//! Traversal is depth-first and pre-order, with the entries of every
//! directory visited in lexical order, so results are reproducible. Each
//! pattern is consumed one segment per directory level; a name is accepted
//! when an include pattern is fully consumed at it and no exclude pattern
//! is. A directory is only entered while some include pattern can still
//! match below it.

use crate::error::ParseError;
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Patterns excluded unless the caller supplies its own list.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".gitignore"];

/// Traversal settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobOptions {
    /// Directory levels to descend below the start directory
    pub max_depth: usize,
    /// Yield matching directories
    pub dirs: bool,
    /// Yield matching files (and symlinks)
    pub files: bool,
    /// Match names case-insensitively
    pub ignore_case: bool,
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            max_depth: 25,
            dirs: false,
            files: true,
            ignore_case: false,
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    AnyDepth,
    Name(Regex),
}

impl Segment {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::AnyDepth => true,
            Self::Name(re) => re.is_match(name),
        }
    }
}

type Pattern = Vec<Segment>;

fn compile(pattern: &str, ignore_case: bool) -> Result<Pattern, ParseError> {
    let mut normalized = pattern.replace('\\', "/");
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    if normalized.ends_with('/') {
        normalized.push_str("**");
    }

    let mut segments = Vec::new();
    for part in normalized.split('/') {
        if part == "**" {
            // consecutive ** are equivalent to one
            if !matches!(segments.last(), Some(Segment::AnyDepth)) {
                segments.push(Segment::AnyDepth);
            }
            continue;
        }

        let mut re = String::from("^");
        let mut buf = [0u8; 4];
        for c in part.chars() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                other => re.push_str(&regex::escape(other.encode_utf8(&mut buf))),
            }
        }
        re.push('$');

        let compiled = RegexBuilder::new(&re)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| ParseError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        segments.push(Segment::Name(compiled));
    }
    Ok(segments)
}

/// Remaining pattern tails after consuming `name`.
fn advance<'a>(name: &str, patterns: &[&'a [Segment]]) -> Vec<&'a [Segment]> {
    let mut next = Vec::new();
    for pattern in patterns {
        match pattern.split_first() {
            None => {}
            Some((Segment::AnyDepth, rest)) => {
                next.push(*pattern);
                match rest.split_first() {
                    Some((segment, tail)) => {
                        if segment.matches(name) {
                            next.push(tail);
                        }
                    }
                    None => next.push(rest),
                }
            }
            Some((segment, rest)) => {
                if segment.matches(name) {
                    next.push(rest);
                }
            }
        }
    }
    next
}

#[derive(Debug, Clone)]
struct State<'a> {
    include: Vec<&'a [Segment]>,
    exclude: Vec<&'a [Segment]>,
}

impl<'a> State<'a> {
    fn step(&self, name: &str) -> Self {
        let exclude = advance(name, &self.exclude);
        let include = if exclude.iter().any(|p| p.is_empty()) {
            Vec::new()
        } else {
            advance(name, &self.include)
        };
        Self { include, exclude }
    }

    fn accepted(&self) -> bool {
        self.include.iter().any(|p| p.is_empty())
    }
}

/// A compiled set of include and exclude patterns.
#[derive(Debug, Clone)]
pub struct AntGlob {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    options: GlobOptions,
}

impl AntGlob {
    /// Compile include and exclude patterns.
    pub fn new<I, E>(include: I, exclude: E, options: GlobOptions) -> Result<Self, ParseError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let include = include
            .into_iter()
            .map(|p| compile(p.as_ref(), options.ignore_case))
            .collect::<Result<_, _>>()?;
        let exclude = exclude
            .into_iter()
            .map(|p| compile(p.as_ref(), options.ignore_case))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            include,
            exclude,
            options,
        })
    }

    /// Compile a single include pattern with [`DEFAULT_EXCLUDES`].
    pub fn pattern(include: &str, options: GlobOptions) -> Result<Self, ParseError> {
        Self::new([include], DEFAULT_EXCLUDES, options)
    }

    /// Lazily walk `root`, yielding the full path of every match.
    ///
    /// A missing or unreadable `root` yields nothing.
    pub fn walk(&self, root: &Path) -> Matches<'_> {
        let state = State {
            include: self.include.iter().map(Vec::as_slice).collect(),
            exclude: self.exclude.iter().map(Vec::as_slice).collect(),
        };
        let entries = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.options.max_depth + 1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        Matches {
            options: self.options,
            entries,
            states: vec![state],
        }
    }

    /// Walk `root` and collect the matches.
    pub fn matches(&self, root: &Path) -> Vec<PathBuf> {
        self.walk(root).collect()
    }
}

/// Iterator over the matches of an [`AntGlob`].
pub struct Matches<'a> {
    options: GlobOptions,
    entries: walkdir::IntoIter,
    /// Pattern state of each open directory, indexed by depth
    states: Vec<State<'a>>,
}

impl Iterator for Matches<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("skipping unreadable entry: {e}");
                    continue;
                }
            };

            let depth = entry.depth();
            self.states.truncate(depth);
            let Some(parent) = self.states.last() else {
                continue;
            };
            let state = parent.step(&entry.file_name().to_string_lossy());
            // symlinks to directories are leaves, never entered
            let is_dir = entry.file_type().is_dir();

            if state.include.is_empty() {
                if is_dir {
                    self.entries.skip_current_dir();
                }
                continue;
            }

            let accepted = state.accepted() && if is_dir { self.options.dirs } else { self.options.files };
            if is_dir {
                self.states.push(state);
            }

            if accepted {
                return Some(entry.into_path());
            }
        }
    }
}
