//! Per-user crontabs through the `crontab` utility.

use anyhow::{Context, Result, bail};
use declarative::CrontabService;

use crate::runner;

pub struct CrontabCli {
    program: String,
}

impl Default for CrontabCli {
    fn default() -> Self {
        Self {
            program: "crontab".to_string(),
        }
    }
}

impl CrontabCli {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CrontabService for CrontabCli {
    fn export(&self, user: &str) -> Result<Option<String>> {
        let output = runner::run_output(&self.program, &["-l", "-u", user])?;
        match output.status.code() {
            Some(0) => Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned())),
            // "no crontab for <user>"
            Some(1) => Ok(None),
            _ => bail!(
                "crontab -l -u {user} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }

    fn install(&self, user: &str, content: &str) -> Result<()> {
        runner::run_with_input(&self.program, &["-u", user, "-"], content.as_bytes())
            .with_context(|| format!("Failed to install crontab for {user}"))?;
        Ok(())
    }

    fn remove(&self, user: &str) -> Result<()> {
        runner::run_capture(&self.program, &["-r", "-u", user])
            .with_context(|| format!("Failed to remove crontab for {user}"))?;
        Ok(())
    }
}
