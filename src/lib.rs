//! # pontoon-api
//!
//! A read-only GraphQL API over a localization catalog: projects, locales,
//! the localizations pairing them, and project tags.
//!
//! ## Features
//!
//! - **Fragment-aware field flattening**: every root field is flattened into
//!   dotted paths ([`get_fields`](server::exposure::graphql::get_fields)) that
//!   drive prefetching and reject known-cyclic query shapes
//! - **Visibility rules**: private projects are only visible to viewers
//!   holding `base.can_manage_project`
//! - **Scope flags**: `includeDisabled` / `includeSystem` union disabled and
//!   system projects into listings
//! - **Prefetching**: selected relations are loaded in one store call
//! - **Pluggable storage**: any [`CatalogStore`](core::CatalogStore); an
//!   in-memory store seeded from YAML ships with the crate
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pontoon_api::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ServerConfig::from_yaml_file("config.yaml")?;
//!     config.logging.init()?;
//!
//!     let seed = CatalogSeed::from_yaml_file("catalog.yaml")?;
//!     ServerBuilder::new()
//!         .with_config(config)
//!         .with_store(InMemoryCatalog::from_seed(seed)?)
//!         .with_auth_provider(TrustedHeaderAuthProvider)
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AggregatedStats, ApiError, AuthContext, AuthProvider, CatalogStore, Direction, Locale,
        LocaleRecord, Localization, MANAGE_PROJECT_PERMISSION, NoAuthProvider, Prefetch, Project,
        ProjectRecord, ProjectScope, QueryError, Tag, TrustedHeaderAuthProvider, Visibility,
    };

    // === Storage ===
    pub use crate::storage::{CatalogSeed, InMemoryCatalog, StoreCall, TracedStore};

    // === Config ===
    pub use crate::config::{GraphQLConfig, HttpConfig, LoggingConfig, ServerConfig};

    // === Server ===
    pub use crate::server::exposure::graphql::{GraphQLExecutor, GraphQLRequest, get_fields};
    pub use crate::server::{GraphQLExposure, RestExposure, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::{Router, http::HeaderMap, routing::get};
}
