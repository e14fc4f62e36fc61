use std::env;

use crate::error::AppError;

/// Process configuration read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Shared secret gating the aggregate rollup endpoints.
    pub meta_secret: String,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let meta_secret = env::var("SECRET")
            .map_err(|_| AppError::Validation("SECRET is not set".to_string()))?;

        Ok(Self { meta_secret })
    }
}
