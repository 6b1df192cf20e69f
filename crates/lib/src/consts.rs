/// Application name used for default directories and config file names.
pub const APP_NAME: &str = "softdef";

/// Length of the truncated hash used to identify definitions.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// January 1, 1980 00:00:00 UTC (ZIP epoch), exported to every build step.
pub const SOURCE_DATE_EPOCH: &str = "315532800";

/// Directory under the install root holding build completion markers.
pub const STATE_DIR: &str = ".softdef";

/// Directory under the install root holding shipped license records.
pub const LICENSES_DIR: &str = "LICENSES";

/// License manifest written to the install root.
pub const LICENSE_MANIFEST: &str = "license.json";

/// Default per-command timeout, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 3600;

/// Name of the configuration file looked up in the config directory.
pub const CONFIG_FILE_NAME: &str = "softdef.toml";
