//! Runtime configuration.
//!
//! Values come from an optional TOML file layered under environment variables
//! prefixed with `BLOG_ADMIN_` (for example `BLOG_ADMIN_USE_MOCK_API=true`).
//! Every field has a default, so an empty environment is a valid
//! configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::SetupError;

pub const DEFAULT_CONFIG_FILE: &str = "blog-admin.toml";
pub const ENV_PREFIX: &str = "BLOG_ADMIN";

/// Where the site is deployed; decides the public base path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployTarget {
    #[default]
    Development,
    GithubPages,
    CustomDomain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Answer every operation locally instead of calling the API.
    pub use_mock_api: bool,
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub deploy_target: DeployTarget,
    pub custom_domain: Option<String>,
    /// File backing the key-value storage.
    pub storage_path: PathBuf,
    /// Simulate server delays in mock mode.
    pub mock_latency: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            use_mock_api: false,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            deploy_target: DeployTarget::Development,
            custom_domain: None,
            storage_path: PathBuf::from(".blog-admin/storage.json"),
            mock_latency: true,
        }
    }
}

impl AppConfig {
    /// Load from `blog-admin.toml` in the working directory (if present) and
    /// the environment.
    pub fn load() -> Result<Self, SetupError> {
        Self::load_from(None)
    }

    /// Like `load`, reading `path` instead of the default file. An explicit
    /// path must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self, SetupError> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path.to_path_buf())),
            None => settings.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        settings = settings.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config = settings
            .build()
            .map_err(|e| SetupError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| SetupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.request_timeout_ms == 0 {
            return Err(SetupError::Config("request_timeout_ms must be positive".to_string()));
        }
        if self.deploy_target == DeployTarget::CustomDomain
            && self.custom_domain.as_deref().map_or(true, str::is_empty)
        {
            return Err(SetupError::Config(
                "deploy_target custom_domain needs custom_domain".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Public base path of the site.
    pub fn base_path(&self) -> &'static str {
        match self.deploy_target {
            DeployTarget::GithubPages => "/BoKe/",
            DeployTarget::Development | DeployTarget::CustomDomain => "/",
        }
    }

    /// Strip the base path from a public path, keeping the leading slash.
    pub fn route_path<'a>(&self, public_path: &'a str) -> std::borrow::Cow<'a, str> {
        let base = self.base_path().trim_end_matches('/');
        match public_path.strip_prefix(base) {
            Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with(['/', '?', '#'])) => {
                if rest.starts_with('/') {
                    rest.into()
                } else {
                    format!("/{rest}").into()
                }
            }
            _ => public_path.into(),
        }
    }
}
