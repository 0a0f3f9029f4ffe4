//! Server host for transport-agnostic API exposure
//!
//! `ServerHost` carries the state every exposure needs: configuration, the
//! catalog store and the auth provider. It knows nothing about HTTP.
//!
//! # Example
//!
//! ```rust,ignore
//! let host = Arc::new(ServerHost::new(config, store, Arc::new(NoAuthProvider)));
//! let graphql = GraphQLExposure::build_router(host.clone());
//! let health = RestExposure::build_router();
//! ```

use crate::config::ServerConfig;
use crate::core::{AuthProvider, CatalogStore};
use std::sync::Arc;

/// Host context shared by all request handlers
pub struct ServerHost {
    pub config: Arc<ServerConfig>,

    /// Shared catalog; requests wrap it in a per-request tracing decorator
    pub store: Arc<dyn CatalogStore>,

    /// Turns request headers into the viewer of a query
    pub auth: Arc<dyn AuthProvider>,
}

impl ServerHost {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn CatalogStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            auth,
        }
    }

    /// Whether the `__debug` root field is exposed
    pub fn debug_enabled(&self) -> bool {
        self.config.graphql.debug
    }
}
