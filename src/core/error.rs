//! Typed error handling for the GraphQL API
//!
//! Every failure that can abort a request is an [`ApiError`]. Query-shape
//! problems (syntax, unknown fields, recursive fragments, forbidden cyclic
//! queries) live in [`QueryError`]; storage failures are carried through
//! unchanged from the `anyhow` seam of the store.
//!
//! # Example
//!
//! ```rust,ignore
//! match executor.execute(request, viewer).await {
//!     Ok(body) => Json(body),
//!     Err(ApiError::Query(QueryError::CyclicQuery { path })) => {
//!         tracing::warn!(%path, "rejected");
//!         ...
//!     }
//!     Err(e) => ...,
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// The main error type of the crate
#[derive(Debug, Error)]
pub enum ApiError {
    /// The query itself is malformed, invalid or forbidden
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A single-object lookup (`project(slug)`, `locale(code)`) matched nothing
    #[error("{kind} matching query does not exist.")]
    NotFound { kind: &'static str, key: String },

    /// The auth provider rejected the request headers
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// The catalog store failed
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    /// Invalid configuration detected at request time
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors caused by the shape of the incoming GraphQL request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Syntax Error: {message}")]
    Parse { message: String },

    #[error("Must provide a query string.")]
    MissingQuery,

    #[error("POST body sent invalid JSON: {message}")]
    InvalidBody { message: String },

    #[error("Variables are invalid JSON: {message}")]
    InvalidVariables { message: String },

    #[error("No operation found in query")]
    NoOperation,

    #[error("Unknown operation named \"{name}\".")]
    UnknownOperation { name: String },

    #[error("Must provide operation name if query contains multiple operations.")]
    AmbiguousOperation,

    #[error("{kind} operations are not supported")]
    UnsupportedOperation { kind: &'static str },

    #[error("Unknown fragment \"{name}\".")]
    UnknownFragment { name: String },

    #[error("Cannot spread fragment \"{name}\" within itself.")]
    FragmentCycle { name: String },

    #[error(
        "Fragment cannot be spread here as objects of type \"{parent}\" can never be of type \"{condition}\"."
    )]
    TypeConditionMismatch { parent: String, condition: String },

    #[error("Cannot query field \"{field}\" on type \"{type_name}\".")]
    UnknownField { field: String, type_name: String },

    #[error("Unknown argument \"{argument}\" on field \"{type_name}.{field}\".")]
    UnknownArgument {
        argument: String,
        field: String,
        type_name: String,
    },

    #[error("Field \"{field}\" argument \"{argument}\" of type \"{expected}\" is required, but it was not provided.")]
    MissingArgument {
        field: String,
        argument: String,
        expected: &'static str,
    },

    #[error("Argument \"{argument}\" has invalid value {value}: expected type \"{expected}\".")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: &'static str,
    },

    #[error("Variable \"${name}\" of required type \"{var_type}\" was not provided.")]
    MissingVariable { name: String, var_type: String },

    #[error("Variable \"${name}\" of non-null type \"{var_type}\" must not be null.")]
    NullVariable { name: String, var_type: String },

    #[error("Field \"{field}\" of type \"{type_name}\" must have a selection of subfields.")]
    MissingSelection { field: String, type_name: String },

    #[error("Fields \"{response_key}\" conflict because {reason}. Use different aliases on the fields to fetch both if this was intentional.")]
    FieldConflict {
        response_key: String,
        reason: &'static str,
    },

    #[error("Field \"{field}\" must not have a selection since type \"{type_name}\" has no subfields.")]
    UnexpectedSelection { field: String, type_name: String },

    #[error("Query is too complex: it expands to more than {limit} selections.")]
    QueryTooComplex { limit: usize },

    /// One of the fixed, known-cyclic relation paths was requested
    #[error("Cyclic queries are forbidden")]
    CyclicQuery { path: String },
}

impl QueryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::Parse { .. } => "GRAPHQL_PARSE_FAILED",
            QueryError::MissingQuery => "GRAPHQL_MISSING_QUERY",
            QueryError::InvalidBody { .. } => "GRAPHQL_INVALID_BODY",
            QueryError::InvalidVariables { .. } => "GRAPHQL_INVALID_VARIABLES",
            QueryError::NoOperation
            | QueryError::UnknownOperation { .. }
            | QueryError::AmbiguousOperation => "GRAPHQL_INVALID_OPERATION",
            QueryError::UnsupportedOperation { .. } => "GRAPHQL_UNSUPPORTED_OPERATION",
            QueryError::UnknownFragment { .. } => "UNKNOWN_FRAGMENT",
            QueryError::FragmentCycle { .. } => "FRAGMENT_CYCLE",
            QueryError::TypeConditionMismatch { .. } => "GRAPHQL_VALIDATION_FAILED",
            QueryError::UnknownField { .. } => "UNKNOWN_FIELD",
            QueryError::UnknownArgument { .. } => "UNKNOWN_ARGUMENT",
            QueryError::MissingArgument { .. } | QueryError::MissingVariable { .. } => {
                "MISSING_ARGUMENT"
            }
            QueryError::InvalidArgument { .. } | QueryError::NullVariable { .. } => {
                "INVALID_ARGUMENT"
            }
            QueryError::FieldConflict { .. }
            | QueryError::MissingSelection { .. }
            | QueryError::UnexpectedSelection { .. } => {
                "GRAPHQL_VALIDATION_FAILED"
            }
            QueryError::QueryTooComplex { .. } => "QUERY_TOO_COMPLEX",
            QueryError::CyclicQuery { .. } => "CYCLIC_QUERY",
        }
    }

    /// Request-shape failures are rejected before execution starts
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::Parse { .. }
            | QueryError::MissingQuery
            | QueryError::InvalidBody { .. }
            | QueryError::InvalidVariables { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::OK,
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Query(e) => e.status_code(),
            ApiError::NotFound { .. } => StatusCode::OK,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Storage(_) | ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Query(e) => e.error_code(),
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Render the error as a GraphQL response body
    ///
    /// Errors always abort the whole request, so `data` is `null`.
    pub fn to_graphql_response(&self) -> Value {
        let mut extensions = json!({ "code": self.error_code() });
        match self {
            ApiError::Query(QueryError::CyclicQuery { path }) => {
                extensions["path"] = json!(path);
            }
            ApiError::NotFound { kind, key } => {
                extensions["kind"] = json!(kind);
                extensions["key"] = json!(key);
            }
            _ => {}
        }

        json!({
            "data": null,
            "errors": [{
                "message": self.to_string(),
                "extensions": extensions,
            }]
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Storage(_) | ApiError::Config(_)) {
            tracing::error!(error = %self, "GraphQL request failed");
        }
        (self.status_code(), Json(self.to_graphql_response())).into_response()
    }
}
