//! Core module containing the catalog model, the store seam and error types

pub mod auth;
pub mod error;
pub mod model;
pub mod store;

pub use auth::{
    AuthContext, AuthProvider, MANAGE_PROJECT_PERMISSION, NoAuthProvider,
    TrustedHeaderAuthProvider,
};
pub use error::{ApiError, QueryError};
pub use model::{AggregatedStats, Direction, Locale, Localization, Project, Tag, Visibility};
pub use store::{CatalogStore, LocaleRecord, Prefetch, ProjectRecord, ProjectScope};
