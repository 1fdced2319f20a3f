//! Resource declaration parser.
//!
//! A host file is a list of directives, one per line:
//!
//! ```text
//! root <path>
//! import <file>
//! defattr <key=value>... | default
//! crontab <user> <file>
//! rpm <package-spec>
//! include <pattern> [key=value]...
//! exclude <pattern>
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. `import` behaves
//! like textual inclusion: `root` and `defattr` set in an imported file
//! stay in effect after it returns.

use crate::config::RepoConfig;
use crate::error::{ParseError, Result};
use crate::glob::{AntGlob, GlobOptions};
use crate::hash::{ObjectHasher, hash_path};
use crate::resource::{CrontabResource, FileResource, ResourceSet};
use acl::{Acl, AclComponents, AclSettings};
use rpmkit::Package;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Parses the host file of a checkout into a [`ResourceSet`].
pub struct ConfigParser<'a> {
    repo: &'a Path,
    config: &'a RepoConfig,
    settings: AclSettings,
    hasher: &'a dyn ObjectHasher,
}

struct Included {
    source: PathBuf,
    is_dir: bool,
    acl: Acl,
    dir_acl: Option<Acl>,
}

struct State {
    root: PathBuf,
    defaults: Option<AclComponents>,
    stack: Vec<PathBuf>,
    files: BTreeMap<String, Included>,
    excludes: Vec<String>,
    crontabs: BTreeMap<String, Vec<PathBuf>>,
    packages: BTreeMap<String, Package>,
}

/// Position of the line being parsed, for error messages.
struct Line<'a> {
    file: &'a Path,
    number: usize,
}

impl Line<'_> {
    fn missing(&self, directive: &'static str, expected: &'static str) -> ParseError {
        ParseError::MissingArgument {
            file: self.file.to_path_buf(),
            line: self.number,
            directive,
            expected,
        }
    }

    fn attribute(&self, source: acl::Error) -> ParseError {
        ParseError::InvalidAttribute {
            file: self.file.to_path_buf(),
            line: self.number,
            source,
        }
    }
}

impl<'a> ConfigParser<'a> {
    pub fn new(
        repo: &'a Path,
        config: &'a RepoConfig,
        settings: AclSettings,
        hasher: &'a dyn ObjectHasher,
    ) -> Self {
        Self {
            repo,
            config,
            settings,
            hasher,
        }
    }

    /// Parse the host file named by the configuration.
    pub fn parse(&self) -> Result<ResourceSet> {
        let host_file = self.config.host_file_path(self.repo)?;
        self.parse_file(&host_file)
    }

    /// Parse a specific host file.
    pub fn parse_file(&self, host_file: &Path) -> Result<ResourceSet> {
        let mut state = State {
            root: self.repo.join(self.config.root()),
            defaults: None,
            stack: Vec::new(),
            files: BTreeMap::new(),
            excludes: Vec::new(),
            crontabs: BTreeMap::new(),
            packages: BTreeMap::new(),
        };
        self.read(host_file, &mut state)?;
        self.finish(state)
    }

    fn read(&self, file: &Path, state: &mut State) -> Result<()> {
        if state.stack.iter().any(|p| p == file) {
            return Err(ParseError::ImportCycle(file.to_path_buf()).into());
        }
        let text = fs::read_to_string(file).map_err(|source| ParseError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        log::debug!("parsing {}", file.display());

        state.stack.push(file.to_path_buf());
        for (index, raw) in text.lines().enumerate() {
            let line = Line {
                file,
                number: index + 1,
            };
            self.directive(raw.trim(), &line, state)?;
        }
        state.stack.pop();
        Ok(())
    }

    fn directive(&self, text: &str, line: &Line<'_>, state: &mut State) -> Result<()> {
        if text.is_empty() || text.starts_with('#') {
            return Ok(());
        }
        let (command, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let rest = rest.trim();

        match command {
            "root" => {
                if rest.is_empty() {
                    return Err(line.missing("root", "a path").into());
                }
                state.root = self.repo.join(self.config.substitute(rest));
            }
            "import" => {
                if rest.is_empty() {
                    return Err(line.missing("import", "a file").into());
                }
                let path = self.repo.join(self.config.host_dir()).join(rest);
                self.read(&path, state)?;
            }
            "defattr" => {
                let tokens: Vec<&str> = rest.split_whitespace().collect();
                match tokens.as_slice() {
                    [] => return Err(line.missing("defattr", "attributes or `default`").into()),
                    ["default"] => state.defaults = None,
                    _ => {
                        let components = AclComponents::from_tokens(tokens, self.settings)
                            .map_err(|e| line.attribute(e))?;
                        // Validate now so bad modes are reported at the defattr line.
                        components.file_acl(self.settings).map_err(|e| line.attribute(e))?;
                        components.dir_acl(self.settings).map_err(|e| line.attribute(e))?;
                        state.defaults = Some(components);
                    }
                }
            }
            "crontab" => {
                let mut args = rest.split_whitespace();
                let (Some(user), Some(file)) = (args.next(), args.next()) else {
                    return Err(line.missing("crontab", "a user and a file").into());
                };
                let path = state.root.join(file);
                if !path.exists() {
                    return Err(ParseError::MissingCrontabSource {
                        user: user.to_string(),
                        path,
                    }
                    .into());
                }
                state.crontabs.entry(user.to_string()).or_default().push(path);
            }
            "rpm" => {
                if rest.is_empty() {
                    return Err(line.missing("rpm", "a package").into());
                }
                let package = Package::parse(rest);
                state.packages.insert(package.name.clone(), package);
            }
            "include" => {
                let mut args = rest.split_whitespace();
                let Some(pattern) = args.next() else {
                    return Err(line.missing("include", "a pattern").into());
                };
                let mut components = state.defaults.clone().unwrap_or_default();
                components
                    .apply_all(args, self.settings)
                    .map_err(|e| line.attribute(e))?;
                let acl = components.file_acl(self.settings).map_err(|e| line.attribute(e))?;
                let dir_acl = components.dir_acl(self.settings).map_err(|e| line.attribute(e))?;
                let parent_acl = match &state.defaults {
                    Some(defaults) => Some(defaults.dir_acl(self.settings).map_err(|e| line.attribute(e))?),
                    None => None,
                };
                self.include(pattern, &acl, &dir_acl, parent_acl.as_ref(), state)?;
            }
            "exclude" => {
                if rest.is_empty() {
                    return Err(line.missing("exclude", "a pattern").into());
                }
                for path in self.expand(rest, &state.root)? {
                    if let Some(relative) = relative_to(&path, &state.root) {
                        state.excludes.push(relative);
                    }
                }
            }
            _ => {
                return Err(ParseError::UnknownDirective {
                    file: line.file.to_path_buf(),
                    line: line.number,
                    text: text.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn include(
        &self,
        pattern: &str,
        acl: &Acl,
        dir_acl: &Acl,
        parent_acl: Option<&Acl>,
        state: &mut State,
    ) -> Result<()> {
        let root = state.root.clone();
        for source in self.expand(pattern, &root)? {
            let Some(relative) = relative_to(&source, &root) else {
                continue;
            };
            // Symlinks to directories are deployed as links.
            let is_dir = fs::symlink_metadata(&source).is_ok_and(|m| m.is_dir());
            let acl = if is_dir { dir_acl.clone() } else { acl.clone() };
            state.files.insert(
                relative,
                Included {
                    source,
                    is_dir,
                    acl,
                    dir_acl: parent_acl.cloned(),
                },
            );
        }
        Ok(())
    }

    fn expand(&self, pattern: &str, root: &Path) -> Result<Vec<PathBuf>> {
        let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
        let glob = AntGlob::pattern(
            pattern,
            GlobOptions {
                dirs: true,
                ..GlobOptions::default()
            },
        )?;
        Ok(glob.matches(root))
    }

    fn finish(&self, state: State) -> Result<ResourceSet> {
        let State {
            mut files,
            excludes,
            crontabs,
            packages,
            ..
        } = state;

        for relative in &excludes {
            files.remove(relative);
        }

        let mut set = ResourceSet::empty();
        for (path, included) in files {
            let hash = if included.is_dir {
                None
            } else {
                hash_path(self.hasher, &included.source)?
            };
            let repo_path = relative_to(&included.source, self.repo).unwrap_or_default();
            set.files.insert(
                path.clone(),
                FileResource {
                    path,
                    source: included.source,
                    repo_path,
                    is_dir: included.is_dir,
                    hash,
                    acl: included.acl,
                    dir_acl: included.dir_acl,
                },
            );
        }

        for (user, sources) in crontabs {
            let crontab = CrontabResource::build(user.clone(), sources, self.repo, self.hasher)?;
            set.crontabs.insert(user, crontab);
        }
        set.packages = packages;

        log::debug!(
            "parsed {} file(s), {} crontab(s), {} package(s)",
            set.files.len(),
            set.crontabs.len(),
            set.packages.len()
        );
        Ok(set)
    }
}

/// `path` relative to `base` as a `/`-separated string without a leading `/`.
fn relative_to(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let text = relative.to_string_lossy();
    let text = text.trim_start_matches('/');
    if text.is_empty() { None } else { Some(text.to_string()) }
}
