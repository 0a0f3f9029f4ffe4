//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::{GraphQLExposure, RestExposure};
use super::host::ServerHost;
use crate::config::ServerConfig;
use crate::core::{AuthProvider, CatalogStore, NoAuthProvider};
use crate::storage::{CatalogSeed, InMemoryCatalog};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the catalog API server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(ServerConfig::from_yaml_file("config.yaml")?)
///     .with_store(InMemoryCatalog::from_seed(seed)?)
///     .with_auth_provider(TrustedHeaderAuthProvider)
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    store: Option<Arc<dyn CatalogStore>>,
    auth: Arc<dyn AuthProvider>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            store: None,
            auth: Arc::new(NoAuthProvider),
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the catalog store
    ///
    /// Required unless the configuration names a `catalog` seed file.
    pub fn with_store(mut self, store: impl CatalogStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the auth provider (defaults to [`NoAuthProvider`])
    pub fn with_auth_provider(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Add custom routes to the server
    ///
    /// # Example
    ///
    /// ```ignore
    /// let routes = Router::new().route("/version", get(version_handler));
    ///
    /// ServerBuilder::new()
    ///     .with_store(store)
    ///     .with_custom_routes(routes)
    ///     .build()?;
    /// ```
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    ///
    /// Without an explicit store, the `catalog` seed file of the
    /// configuration is loaded into an [`InMemoryCatalog`].
    pub fn build_host(&mut self) -> Result<ServerHost> {
        let store = match self.store.take() {
            Some(store) => store,
            None => {
                let path = self.config.catalog.as_deref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "CatalogStore is required. Call .with_store() or set `catalog` in the configuration"
                    )
                })?;
                tracing::info!(path, "Loading catalog seed");
                let seed = CatalogSeed::from_yaml_file(path)?;
                Arc::new(InMemoryCatalog::from_seed(seed)?) as Arc<dyn CatalogStore>
            }
        };

        Ok(ServerHost::new(self.config.clone(), store, self.auth.clone()))
    }

    /// Build the final router
    ///
    /// This generates:
    /// - Health check routes
    /// - GraphQL endpoint, schema and playground routes
    /// - Custom routes
    ///
    /// HTTP tracing is always on; CORS only when `server.cors` is set.
    pub fn build(mut self) -> Result<Router> {
        let host = Arc::new(self.build_host()?);
        let cors = host.config.server.cors;

        let mut app = RestExposure::build_router().merge(GraphQLExposure::build_router(host)?);
        for custom_router in std::mem::take(&mut self.custom_routes) {
            app = app.merge(custom_router);
        }

        let mut app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
        if cors {
            app = app.layer(CorsLayer::permissive());
        }
        Ok(app)
    }

    /// Serve the application on `server.bind` with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C).
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.bind.clone();
        let graphql_path = self.config.graphql.path.clone();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(%addr, graphql = %graphql_path, "Server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
