// src/constants.rs

/// The default name of a command-tree configuration file.
pub const CONFIG_FILENAME: &str = "flowmap.toml";

/// The directory under the system config dir holding the user's command tree.
pub const CONFIG_DIR_NAME: &str = "flowmap";

/// Environment variable that overrides the configuration path.
pub const CONFIG_ENV_VAR: &str = "FLOWMAP_CONFIG";

/// Separator between the segments of a command path (`db.connect`).
pub const CMD_PATH_SEP: char = '.';

/// Separator between the commands of a flow (`db.start : db.connect`).
pub const FLOW_SEP: &str = ":";

/// Separator between a name and its value in definitions and flows (`host=127.0.0.1`).
pub const KV_SEP: char = '=';

/// Separator between an argument name and its abbreviations (`host|h`).
pub const ABBRS_SEP: char = '|';

/// Separator of list values used by `[[*key]]` multiplication.
pub const LIST_SEP: char = ',';

/// Auto-map definition that adopts every reachable argument whose key nobody else provides.
pub const AUTO_MAP_NO_PROVIDER: &str = "*";

/// Auto-map definition that adopts every reachable argument.
pub const AUTO_MAP_ALL: &str = "**";

/// Bounds recursion while resolving argument default values and macros.
pub const MAX_STACK_DEPTH: usize = 32;

/// Value rendered for `[[RANDOM]]` during discovery walks.
pub const DISCOVER_RANDOM_PLACEHOLDER: &str = "<random>";

/// Text shown in place of sensitive environment values.
pub const MASKED_VALUE: &str = "***";
