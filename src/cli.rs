use clap::Parser;
use declarative::DiffMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gitman")]
#[command(version)]
#[command(about = "Deploy a host's configuration from a git repository", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the deployment report
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to the repository checkout (cloned from --origin if missing)
    #[arg(short = 'd', long)]
    pub repo_path: String,

    /// URL the checkout must be a clone of
    #[arg(long)]
    pub origin: Option<String>,

    /// Branch to deploy
    #[arg(long, default_value = "master")]
    pub branch: String,

    /// Apply the changes instead of only reporting them
    #[arg(short = 'D', long)]
    pub deploy: bool,

    /// Deploy despite holdups
    #[arg(short, long)]
    pub force: bool,

    /// Keep replaced and deleted files as <name>.gitman
    #[arg(short, long)]
    pub backup: bool,

    /// Show diffs for every content change
    #[arg(long)]
    pub diffs: bool,

    /// Show diffs for holdups only
    #[arg(long)]
    pub holdup_diffs: bool,

    /// List what would be added for MACHINE, using the current checkout
    #[arg(long, value_name = "MACHINE")]
    pub info: Option<String>,

    /// Deploy as if this were HOST
    #[arg(long, value_name = "HOST")]
    pub assume_host: Option<String>,

    /// Only manage owner, group and mode
    #[arg(long)]
    pub noacl: bool,

    /// Don't reinstall packages that fail verification
    #[arg(long)]
    pub no_reinstall_broken: bool,

    /// Directory the host tree is deployed under
    #[arg(long, default_value = "/")]
    pub target_root: PathBuf,
}

impl Cli {
    /// Reject flag combinations that make no sense together.
    pub fn validate(&self) -> Result<(), String> {
        if self.force && !self.deploy {
            return Err("Cannot use -f/--force without -D/--deploy".to_string());
        }
        if self.info.is_some()
            && (self.quiet || self.deploy || self.backup || self.diffs || self.holdup_diffs)
        {
            return Err("Cannot use -q/-D/-b/--diffs/--holdup-diffs with --info".to_string());
        }
        if self.diffs && self.holdup_diffs {
            return Err("--diffs and --holdup-diffs should not be used together".to_string());
        }
        Ok(())
    }

    pub fn diff_mode(&self) -> DiffMode {
        if self.diffs {
            DiffMode::All
        } else if self.holdup_diffs {
            DiffMode::HoldupsOnly
        } else {
            DiffMode::None
        }
    }

    /// Repository path with `~` and environment variables expanded.
    pub fn repo(&self) -> PathBuf {
        PathBuf::from(shellexpand::full(&self.repo_path).map_or_else(
            |_| self.repo_path.clone(),
            std::borrow::Cow::into_owned,
        ))
    }
}
