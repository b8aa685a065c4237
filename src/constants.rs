// polling
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

// config
pub const CONFIG_DIR_NAME: &str = "git-changelist";
pub const CONFIG_FILE_NAME: &str = "config.json";

// ui
pub const SPINNER_TICK_MILLIS: u64 = 100;
