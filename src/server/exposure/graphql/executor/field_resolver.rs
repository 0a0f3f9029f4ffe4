//! Field and relation resolution for catalog objects

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::selection::{FieldNode, TYPENAME_FIELD};
use super::utils;
use crate::core::{
    AggregatedStats, ApiError, AuthContext, CatalogStore, LocaleRecord, Localization,
    ProjectRecord, ProjectScope, QueryError, Tag,
};
use crate::server::exposure::graphql::schema::{self, FieldType};
use crate::storage::StoreCall;

/// Per-request state handed to every resolver
#[derive(Clone, Copy)]
pub struct ExecutionContext<'r> {
    pub store: &'r dyn CatalogStore,
    pub viewer: &'r AuthContext,
}

/// An object value the executor can select fields from
#[derive(Debug, Clone)]
pub enum GraphObject {
    Project(ProjectRecord),
    Locale(LocaleRecord),
    Localization(Localization),
    Tag(Tag),
    Debug(Vec<StoreCall>),
    StoreCall(StoreCall),
}

impl GraphObject {
    pub fn type_name(&self) -> &'static str {
        match self {
            GraphObject::Project(_) => "Project",
            GraphObject::Locale(_) => "Locale",
            GraphObject::Localization(_) => "ProjectLocale",
            GraphObject::Tag(_) => "Tag",
            GraphObject::Debug(_) => "DebugInfo",
            GraphObject::StoreCall(_) => "StoreCall",
        }
    }

    /// Scalar values keyed by snake_case model field name
    fn scalars(&self) -> Result<Map<String, Value>, ApiError> {
        let (value, stats) = match self {
            GraphObject::Project(record) => {
                (to_value(&record.project)?, Some(record.project.stats))
            }
            GraphObject::Locale(record) => (to_value(&record.locale)?, Some(record.locale.stats)),
            GraphObject::Localization(localization) => {
                (to_value(&localization.stats)?, Some(localization.stats))
            }
            GraphObject::Tag(tag) => (to_value(tag)?, None),
            GraphObject::StoreCall(call) => (to_value(call)?, None),
            GraphObject::Debug(_) => (Value::Object(Map::new()), None),
        };

        let mut scalars = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Some(stats) = stats {
            insert_computed(&mut scalars, &stats);
        }
        Ok(scalars)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Storage(e.into()))
}

fn insert_computed(scalars: &mut Map<String, Value>, stats: &AggregatedStats) {
    scalars.insert("missing_strings".to_string(), json!(stats.missing_strings()));
    scalars.insert("complete".to_string(), json!(stats.complete()));
}

/// Resolve a list of objects against the same selection
pub async fn resolve_list(
    ctx: ExecutionContext<'_>,
    objects: Vec<GraphObject>,
    fields: &[FieldNode],
) -> Result<Value, ApiError> {
    let mut resolved = Vec::with_capacity(objects.len());
    for object in objects {
        resolved.push(resolve_object(ctx, object, fields).await?);
    }
    Ok(Value::Array(resolved))
}

/// Resolve the selected fields of a single object
pub fn resolve_object<'r>(
    ctx: ExecutionContext<'r>,
    object: GraphObject,
    fields: &'r [FieldNode],
) -> BoxFuture<'r, Result<Value, ApiError>> {
    async move { resolve_object_impl(ctx, object, fields).await }.boxed()
}

async fn resolve_object_impl(
    ctx: ExecutionContext<'_>,
    object: GraphObject,
    fields: &[FieldNode],
) -> Result<Value, ApiError> {
    let type_name = object.type_name();
    let definition = schema::object(type_name)
        .ok_or_else(|| ApiError::Config(format!("No schema for object type {}", type_name)))?;
    let scalars = object.scalars()?;
    let mut result = Map::new();

    for node in fields {
        if node.name == TYPENAME_FIELD {
            result.insert(node.response_key.clone(), json!(type_name));
            continue;
        }

        let field = definition
            .field(&node.name)
            .ok_or_else(|| QueryError::UnknownField {
                field: node.name.clone(),
                type_name: type_name.to_string(),
            })?;

        let value = match field.ty {
            FieldType::Object(_) | FieldType::List(_) => {
                resolve_relation(ctx, &object, node).await?
            }
            FieldType::Enum(_) => scalars
                .get(&utils::camel_to_snake(&node.name))
                .and_then(Value::as_str)
                .map(|s| json!(s.to_uppercase()))
                .unwrap_or(Value::Null),
            FieldType::Scalar(_) => scalars
                .get(&utils::camel_to_snake(&node.name))
                .cloned()
                .unwrap_or(Value::Null),
        };
        result.insert(node.response_key.clone(), value);
    }

    Ok(Value::Object(result))
}

/// Resolve a relation field, from prefetched rows when available
async fn resolve_relation(
    ctx: ExecutionContext<'_>,
    object: &GraphObject,
    node: &FieldNode,
) -> Result<Value, ApiError> {
    match (object, node.name.as_str()) {
        (GraphObject::Project(record), "localizations") => {
            let localizations = match &record.localizations {
                Some(prefetched) => prefetched.clone(),
                None => ctx.store.project_localizations(&record.project.slug).await?,
            };
            let objects = localizations
                .into_iter()
                .map(GraphObject::Localization)
                .collect();
            resolve_list(ctx, objects, &node.children).await
        }
        (GraphObject::Project(record), "tags") => {
            let tags = match &record.tags {
                Some(prefetched) => prefetched.clone(),
                None => ctx.store.project_tags(&record.project.slug).await?,
            };
            let objects = tags.into_iter().map(GraphObject::Tag).collect();
            resolve_list(ctx, objects, &node.children).await
        }
        (GraphObject::Locale(record), "localizations") => {
            let scope = ProjectScope::new(
                node.bool_arg("includeDisabled")?,
                node.bool_arg("includeSystem")?,
            );
            let localizations = match &record.localizations {
                Some(prefetched) => scope.filter_localizations(ctx.viewer, prefetched),
                None => {
                    ctx.store
                        .locale_localizations(ctx.viewer, &record.locale.code, scope)
                        .await?
                }
            };
            let objects = localizations
                .into_iter()
                .map(GraphObject::Localization)
                .collect();
            resolve_list(ctx, objects, &node.children).await
        }
        (GraphObject::Localization(localization), "project") => {
            let project = GraphObject::Project(ProjectRecord::bare(localization.project.clone()));
            resolve_object(ctx, project, &node.children).await
        }
        (GraphObject::Localization(localization), "locale") => {
            let locale = GraphObject::Locale(LocaleRecord::bare(localization.locale.clone()));
            resolve_object(ctx, locale, &node.children).await
        }
        (GraphObject::Debug(calls), "storeCalls") => {
            let objects = calls.iter().cloned().map(GraphObject::StoreCall).collect();
            resolve_list(ctx, objects, &node.children).await
        }
        _ => Err(QueryError::UnknownField {
            field: node.name.clone(),
            type_name: object.type_name().to_string(),
        }
        .into()),
    }
}
