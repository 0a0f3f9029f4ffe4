//! GraphQL API exposure
//!
//! Serves the read-only catalog schema over HTTP:
//! - `POST {path}` with a JSON body `{query, variables, operationName}`
//! - `GET {path}?query=...&variables=...&operationName=...`
//! - `GET {path}/playground` (when `graphql.playground` is enabled)
//! - `GET {path}/schema` for the SDL

mod executor;
mod schema;

pub use executor::{FragmentTable, GraphQLExecutor, GraphQLRequest, get_fields};
pub use schema::generate_sdl;

use crate::core::{ApiError, QueryError};
use crate::server::host::ServerHost;
use anyhow::Result;
use async_graphql::http::{GraphQLPlaygroundConfig, playground_source};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Query},
    http::{HeaderMap, header},
    response::{Html, IntoResponse},
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Query string of a GET request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLGetParams {
    query: Option<String>,
    /// JSON-encoded variables object
    variables: Option<String>,
    operation_name: Option<String>,
}

impl GraphQLGetParams {
    fn into_request(self) -> Result<GraphQLRequest, QueryError> {
        let variables = match self.variables.as_deref().map(serde_json::from_str::<Value>) {
            None => None,
            Some(Ok(Value::Object(map))) => Some(map),
            Some(Ok(Value::Null)) => None,
            Some(Ok(_)) => {
                return Err(QueryError::InvalidVariables {
                    message: "expected a JSON object".to_string(),
                });
            }
            Some(Err(e)) => {
                return Err(QueryError::InvalidVariables {
                    message: e.to_string(),
                });
            }
        };

        Ok(GraphQLRequest {
            query: self.query.unwrap_or_default(),
            variables,
            operation_name: self.operation_name,
        })
    }
}

/// GraphQL API exposure implementation
pub struct GraphQLExposure;

impl GraphQLExposure {
    /// Build the GraphQL router from a host
    ///
    /// Routes are mounted below `graphql.path` of the host configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let host = Arc::new(builder.build_host()?);
    /// let graphql_app = GraphQLExposure::build_router(host)?;
    /// ```
    pub fn build_router(host: Arc<ServerHost>) -> Result<Router> {
        let graphql = host.config.graphql.clone();
        if !graphql.path.starts_with('/') {
            anyhow::bail!(
                "graphql.path must start with '/', got '{}'",
                graphql.path
            );
        }

        let mut router = Router::new()
            .route(&graphql.path, get(graphql_get).post(graphql_post))
            .route(&graphql.schema_path(), get(graphql_schema));

        if graphql.playground {
            router = router.route(&graphql.playground_path(), get(graphql_playground));
        }

        tracing::debug!(
            path = %graphql.path,
            playground = graphql.playground,
            debug = graphql.debug,
            "GraphQL routes registered"
        );

        Ok(router.layer(Extension(host)))
    }
}

async fn graphql_post(
    Extension(host): Extension<Arc<ServerHost>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: GraphQLRequest =
        serde_json::from_slice(&body).map_err(|e| QueryError::InvalidBody {
            message: e.to_string(),
        })?;
    execute(&host, &headers, request).await
}

async fn graphql_get(
    Extension(host): Extension<Arc<ServerHost>>,
    headers: HeaderMap,
    Query(params): Query<GraphQLGetParams>,
) -> Result<Json<Value>, ApiError> {
    let request = params.into_request()?;
    execute(&host, &headers, request).await
}

async fn execute(
    host: &Arc<ServerHost>,
    headers: &HeaderMap,
    request: GraphQLRequest,
) -> Result<Json<Value>, ApiError> {
    let viewer = host
        .auth
        .extract_context(headers)
        .await
        .map_err(|e| ApiError::Unauthenticated(format!("{:#}", e)))?;

    tracing::debug!(
        viewer = viewer.username().unwrap_or("anonymous"),
        operation = request.operation_name.as_deref().unwrap_or("<anonymous>"),
        "Executing GraphQL request"
    );

    let executor = GraphQLExecutor::new(host.clone());
    let body = executor.execute(request, &viewer).await?;
    Ok(Json(body))
}

async fn graphql_playground(Extension(host): Extension<Arc<ServerHost>>) -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new(
        &host.config.graphql.path,
    )))
}

async fn graphql_schema(Extension(host): Extension<Arc<ServerHost>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        generate_sdl(host.debug_enabled()),
    )
}
