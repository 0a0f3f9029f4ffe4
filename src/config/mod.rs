//! Configuration loading and management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Address to bind, e.g. `127.0.0.1:8000`
    pub bind: String,

    /// Add a permissive CORS layer
    pub cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors: false,
        }
    }
}

/// GraphQL endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphQLConfig {
    /// Mount path of the endpoint; playground and SDL live below it
    pub path: String,

    /// Serve the GraphQL Playground page
    pub playground: bool,

    /// Expose the `__debug` root field
    pub debug: bool,

    /// Upper bound on selections visited while expanding one operation,
    /// fragment spreads included
    pub max_selections: usize,
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            path: "/graphql".to_string(),
            playground: true,
            debug: false,
            max_selections: 10_000,
        }
    }
}

impl GraphQLConfig {
    pub fn playground_path(&self) -> String {
        format!("{}/playground", self.path.trim_end_matches('/'))
    }

    pub fn schema_path(&self) -> String {
        format!("{}/schema", self.path.trim_end_matches('/'))
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber` filter directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=debug".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber
    pub fn init(&self) -> Result<()> {
        let filter =
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.filter))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub graphql: GraphQLConfig,
    pub logging: LoggingConfig,

    /// Optional path to a YAML catalog seed for the in-memory store
    pub catalog: Option<String>,
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.graphql.path.starts_with('/') {
            anyhow::bail!(
                "graphql.path must start with '/', got '{}'",
                self.graphql.path
            );
        }
        if self.graphql.max_selections == 0 {
            anyhow::bail!("graphql.max_selections must be greater than 0");
        }
        Ok(())
    }
}
