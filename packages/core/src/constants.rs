use std::env;
use std::path::PathBuf;

/// Current version of the record store format
pub const STORE_VERSION: &str = "1.0.0";

/// Get the path to the Stagegate data directory (~/.stagegate)
pub fn stagegate_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".stagegate")
    } else {
        // Fall back to dirs crate for normal usage
        dirs::home_dir()
            .expect("Unable to get home directory")
            .join(".stagegate")
    }
}
