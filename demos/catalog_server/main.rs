//! Catalog server demo
//!
//! Serves the sample catalog over GraphQL:
//!
//! ```text
//! cargo run --example catalog_server
//! curl -s localhost:8000/graphql -H 'content-type: application/json' \
//!   -d '{"query": "{ projects { name localizations { locale { code } complete } } }"}'
//! ```
//!
//! Requests carrying `x-remote-user` / `x-remote-permissions` headers are
//! trusted; send `x-remote-permissions: base.can_manage_project` to see
//! private projects.

use pontoon_api::prelude::*;

const CONFIG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/catalog_server/config.yaml");
const CATALOG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/catalog_server/catalog.yaml");

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_yaml_file(CONFIG_PATH)?;
    config.logging.init()?;

    let seed = CatalogSeed::from_yaml_file(CATALOG_PATH)?;
    let store = InMemoryCatalog::from_seed(seed)?;

    println!("🌍 pontoon-api demo");
    println!("   GraphQL:    http://{}{}", config.server.bind, config.graphql.path);
    println!(
        "   Playground: http://{}{}",
        config.server.bind,
        config.graphql.playground_path()
    );
    println!(
        "   Schema:     http://{}{}",
        config.server.bind,
        config.graphql.schema_path()
    );

    ServerBuilder::new()
        .with_config(config)
        .with_store(store)
        .with_auth_provider(TrustedHeaderAuthProvider)
        .serve()
        .await
}
