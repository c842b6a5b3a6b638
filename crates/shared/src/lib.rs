// Level compiler - Shared Library
// Components used by both the compiler library and the command line front end

pub mod config;
pub mod log;
pub mod util;

/// Name used for log files and the default configuration file
pub const APP_NAME: &str = "levelc";

/// Default configuration file looked up next to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "levelc.conf";

/// Environment variable prefix overriding configuration keys (e.g. `Levelc_Compiler_GameVersion`)
pub const CONFIG_ENV_PREFIX: &str = "Levelc_";
