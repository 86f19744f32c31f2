//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{AnonClient, ServiceClient};
use crate::config::AdminConfig;
use crate::services::{AdminAllowList, AdminAuthService, ImageService, ProductService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Both backend handles are built once here and
/// handed to services by reference.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    service: ServiceClient,
    anon: AnonClient,
    allow_list: AdminAllowList,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig) -> Self {
        let service = ServiceClient::new(&config.backend);
        let anon = AnonClient::new(&config.backend);
        let allow_list = AdminAllowList::new(config.admin_emails.iter().cloned());

        tracing::info!(admins = allow_list.admin_count(), "admin allow-list loaded");

        Self {
            inner: Arc::new(AppStateInner {
                config,
                service,
                anon,
                allow_list,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Elevated backend client (service-role key).
    #[must_use]
    pub fn service_client(&self) -> &ServiceClient {
        &self.inner.service
    }

    /// Anonymous backend client.
    #[must_use]
    pub fn anon_client(&self) -> &AnonClient {
        &self.inner.anon
    }

    #[must_use]
    pub fn allow_list(&self) -> &AdminAllowList {
        &self.inner.allow_list
    }

    #[must_use]
    pub fn auth(&self) -> AdminAuthService<'_> {
        AdminAuthService::new(self.anon_client(), self.allow_list())
    }

    #[must_use]
    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self.service_client(), &self.config().backend.products_table)
    }

    #[must_use]
    pub fn images(&self) -> ImageService<'_> {
        ImageService::new(self.service_client(), &self.config().backend.storage_bucket)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.inner.service)
            .field("anon", &self.inner.anon)
            .field("admins", &self.inner.allow_list.admin_count())
            .finish_non_exhaustive()
    }
}
