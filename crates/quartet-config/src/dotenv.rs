//! `.env` loading for provider API keys.
//!
//! Variables already set in the process environment win over the file.

use std::path::PathBuf;

use quartet_utils::error::ConfigError;

/// Load the nearest `.env` (current directory, then its parents) into the
/// process environment.
///
/// Returns the loaded path, or `None` when there is no `.env`. Call it before
/// any threads are spawned.
///
/// # Errors
///
/// `ConfigError::InvalidFile` if the file exists but cannot be read or parsed.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    found_or_absent(dotenvy::dotenv())
}

fn found_or_absent<T>(result: dotenvy::Result<T>) -> Result<Option<T>, ConfigError> {
    match result {
        Ok(loaded) => Ok(Some(loaded)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::InvalidFile(format!(".env: {e}"))),
    }
}
