//! Extended ACLs through the `getfacl`/`setfacl` command line tools.

use crate::backend::AclBackend;
use crate::entries::AclEntries;
use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Backend that shells out to the acl tools.
#[derive(Debug, Clone)]
pub struct GetfaclBackend {
    getfacl: String,
    setfacl: String,
}

impl Default for GetfaclBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GetfaclBackend {
    /// Use `getfacl`/`setfacl` from `PATH`.
    pub fn new() -> Self {
        Self {
            getfacl: "getfacl".to_string(),
            setfacl: "setfacl".to_string(),
        }
    }

    fn run(program: &str, command: &'static str, args: &[&str], path: &Path) -> Result<Output> {
        let output = Command::new(program)
            .args(args)
            .arg(path)
            .output()
            .map_err(|e| Error::io(path, e))?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command,
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl AclBackend for GetfaclBackend {
    fn is_available(&self) -> bool {
        Command::new(&self.getfacl)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn has_extended(&self, path: &Path) -> Result<bool> {
        // --skip-base prints nothing for files whose ACL is just a mode
        let output = Self::run(
            &self.getfacl,
            "getfacl",
            &["--skip-base", "--omit-header", "--absolute-names", "--"],
            path,
        )?;
        Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    fn read(&self, path: &Path) -> Result<AclEntries> {
        let output = Self::run(
            &self.getfacl,
            "getfacl",
            &["--omit-header", "--absolute-names", "--"],
            path,
        )?;
        AclEntries::parse(&String::from_utf8_lossy(&output.stdout), 0)
    }

    fn write(&self, path: &Path, entries: &AclEntries) -> Result<()> {
        let spec = entries.to_string();
        log::debug!("setfacl --set {spec} {}", path.display());
        Self::run(&self.setfacl, "setfacl", &["--set", &spec, "--"], path)?;
        Ok(())
    }
}
