use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn describe(cmd: &str, args: &[&str]) -> String {
    format!("{} {}", cmd, args.join(" "))
}

/// Run a command and return its raw output, whatever the exit status
pub fn run_output(cmd: &str, args: &[&str]) -> Result<Output> {
    log::debug!("running: {}", describe(cmd, args));
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute: {}", describe(cmd, args)))
}

/// Run a command and capture trimmed stdout
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = run_output(cmd, args)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}: {}", describe(cmd, args), stderr.trim())
    }
}

/// Run a command with `input` on stdin and capture trimmed stdout
pub fn run_with_input(cmd: &str, args: &[&str], input: &[u8]) -> Result<String> {
    log::debug!("running: {}", describe(cmd, args));
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute: {}", describe(cmd, args)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input)
            .with_context(|| format!("Failed to write to: {}", describe(cmd, args)))?;
    }
    let output = child.wait_with_output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}: {}", describe(cmd, args), stderr.trim())
    }
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
