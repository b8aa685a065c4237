use crate::cli::Cli;
use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_POLL_INTERVAL_SECS};
use crate::poller::PollSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// values read from the settings file, all optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub select_first: bool,
    pub renames: bool,
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            select_first: false,
            renames: true,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl Settings {
    /// `<config dir>/git-changelist/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// load from the default location, defaults if there is no file
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid settings file: {}", path.display()))
    }
}

/// run-time options, command line flags layered over the settings file
#[derive(Debug, Clone)]
pub struct AppContext {
    /// where to look for the repository
    pub repo_path: PathBuf,

    /// select the first row when nothing is selected
    pub select_first: bool,

    /// scanning options, including the rescan interval
    pub poll: PollSettings,

    /// print the list once and exit
    pub once: bool,

    /// print diagnostics
    pub verbose: bool,
}

impl AppContext {
    pub fn new(cli: &Cli, settings: &Settings) -> Self {
        let interval = cli.interval.unwrap_or(settings.poll_interval_secs);
        Self {
            repo_path: cli.path.clone(),
            select_first: cli.select_first || settings.select_first,
            poll: PollSettings {
                renames: settings.renames && !cli.no_renames,
                interval: Duration::from_secs(interval),
            },
            once: cli.once,
            verbose: cli.verbose,
        }
    }

    /// how long to wait for input before rescanning, None disables rescans
    pub fn poll_timeout(&self) -> Option<Duration> {
        (!self.poll.interval.is_zero()).then_some(self.poll.interval)
    }
}
