//! Fixed names used to locate configuration and data

/// Directory name under the platform config/data directories
pub const APP_DIR: &str = "imgaudit";

pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "integrity.sqlite";
pub const LOGS_DIR: &str = "logs";

pub const ENV_DB: &str = "IMGAUDIT_DB";
pub const ENV_HASH_ALGORITHM: &str = "IMGAUDIT_HASH_ALGORITHM";
pub const ENV_OPERATOR: &str = "IMGAUDIT_OPERATOR";
pub const ENV_COLOR: &str = "IMGAUDIT_COLOR";
pub const ENV_OUTPUT: &str = "IMGAUDIT_OUTPUT";

/// Extension the lab's imaging station writes
pub const DEFAULT_EXTENSION: &str = ".scn";

pub const DEFAULT_SOFTWARE: &str = "Image Lab";
