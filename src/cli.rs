use clap::Parser;
use std::path::PathBuf;

/// git-changelist: interactive list of changed files with staging
#[derive(Parser, Debug)]
#[command(
    name = "git-changelist",
    about,
    long_about = None,
    disable_version_flag = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// repository to show (can be anywhere within the working tree)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// select the first file whenever nothing is selected
    #[arg(long)]
    pub select_first: bool,

    /// disable rename detection
    #[arg(long)]
    pub no_renames: bool,

    /// seconds between automatic rescans (0 disables them)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// settings file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// print the change list once and exit
    #[arg(long)]
    pub once: bool,

    /// print diagnostics
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
