// src/utils/env.rs
use log::{info, warn};

/// Loads variables from a `.env` file in the working directory, if any.
/// Variables already present in the environment win.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {
            info!("No .env file found. Proceeding with system environment variables.")
        }
        Err(e) => warn!("Could not read .env file: {}. Proceeding with system environment variables.", e),
    }
}
