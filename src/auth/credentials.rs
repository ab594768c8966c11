use std::path::Path;

use log::info;

use crate::error::{ApiError, Result};

/// Session parameters for one Radius instance, as handed out with the web
/// services documentation.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Base URL of the instance, scheme included (e.g.
    /// `https://myschool.example.com`).
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Import credentials from `RADIUS_HOST`, `RADIUS_USERNAME` and
    /// `RADIUS_PASSWORD` environment variables. A `.env` file in the working
    /// directory is loaded first if present.
    pub fn from_env() -> Result<Credentials> {
        info!("Importing credentials from environment variables");
        dotenvy::dotenv().ok();

        Ok(Credentials {
            host: require_var("RADIUS_HOST")?,
            username: require_var("RADIUS_USERNAME")?,
            password: require_var("RADIUS_PASSWORD")?,
        })
    }

    /// Import credentials from a specific `.env` file.
    pub fn from_env_file(path: &str) -> Result<Credentials> {
        info!("Importing credentials from .env file: {}", path);

        if !Path::new(path).exists() {
            return Err(ApiError::Config(format!(
                "environment file not found: {}",
                path
            )));
        }
        dotenvy::from_path(path)
            .map_err(|e| ApiError::Config(format!("failed to load .env file '{}': {}", path, e)))?;

        Ok(Credentials {
            host: require_var("RADIUS_HOST")?,
            username: require_var("RADIUS_USERNAME")?,
            password: require_var("RADIUS_PASSWORD")?,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| ApiError::Config(format!("{} environment variable not set", name)))
}
