//! The object that owns everything one run of the application needs.
//!
//! # Design
//! `AppContext` is built once from `AppConfig`. That is the only place the
//! mock-versus-remote choice is made; everything downstream holds an
//! `Arc<dyn BlogBackend>`. There is no global state: callers receive the
//! context and borrow what they need from it.

use std::sync::Arc;

use tracing::info;

use crate::backend::{BlogBackend, MockBackend, MockLatency, RemoteBackend};
use crate::client::BlogApiClient;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::SetupError;
use crate::guard::NavigationGuard;
use crate::storage::{FileStore, KeyValueStore};
use crate::store::{AuthStore, BlogStore};
use crate::transport::{HttpClient, ReqwestTransport};

pub struct AppContext {
    config: AppConfig,
    storage: Arc<dyn KeyValueStore>,
    backend: Arc<dyn BlogBackend>,
    mock: Option<Arc<MockBackend>>,
    auth: Arc<AuthStore>,
    blog: BlogStore,
    guard: NavigationGuard,
}

impl AppContext {
    /// Open the file storage named by `config` and build on the system clock.
    pub async fn from_config(config: AppConfig) -> Result<Self, SetupError> {
        let storage = Arc::new(FileStore::open(&config.storage_path)?);
        Self::build(config, storage, Arc::new(SystemClock)).await
    }

    pub async fn build(
        config: AppConfig,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SetupError> {
        config.validate()?;

        let mut mock = None;
        let backend: Arc<dyn BlogBackend> = if config.use_mock_api {
            let latency = if config.mock_latency {
                MockLatency::realistic()
            } else {
                MockLatency::none()
            };
            let local = Arc::new(MockBackend::new(storage.clone(), clock.clone()).with_latency(latency));
            local.seed_defaults().await?;
            mock = Some(local.clone());
            local
        } else {
            let api = BlogApiClient::new(&config.api_base_url)?.with_timeout(config.request_timeout());
            let transport = Arc::new(ReqwestTransport::new()?);
            Arc::new(RemoteBackend::new(HttpClient::new(api, transport)))
        };
        info!(mode = backend.mode(), deploy_target = ?config.deploy_target, "application context ready");

        let auth = Arc::new(AuthStore::restore(backend.clone(), storage.clone(), clock).await);
        let blog = BlogStore::new(backend.clone());
        let guard = NavigationGuard::new(auth.clone());

        Ok(Self {
            config,
            storage,
            backend,
            mock,
            auth,
            blog,
            guard,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    pub fn backend(&self) -> &Arc<dyn BlogBackend> {
        &self.backend
    }

    /// The mock backend, when running in mock mode.
    pub fn mock(&self) -> Option<&MockBackend> {
        self.mock.as_deref()
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn blog(&self) -> &BlogStore {
        &self.blog
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }
}
