//! Root query fields
//!
//! Each root field is planned before anything is resolved: its arguments
//! are checked, its flattened field paths are tested against the known-cyclic
//! shape and turned into prefetch decisions. Only then does resolution touch
//! the store.

use serde_json::{Value, json};

use super::field_resolver::{self, ExecutionContext, GraphObject};
use super::selection::{FieldNode, TYPENAME_FIELD};
use crate::core::{ApiError, Prefetch, ProjectScope, QueryError};

/// How one root field loads its objects
struct RootFieldSpec {
    name: &'static str,
    /// Relation path that would recurse back into the root collection
    forbidden: &'static str,
    /// Relations loaded together with the root objects when their path is selected
    prefetch: &'static [(&'static str, Prefetch)],
}

const ROOT_FIELDS: &[RootFieldSpec] = &[
    RootFieldSpec {
        name: "projects",
        forbidden: "projects.localizations.locale.localizations",
        prefetch: &[
            ("projects.localizations", Prefetch::ProjectLocalizations),
            ("projects.tags", Prefetch::ProjectTags),
        ],
    },
    RootFieldSpec {
        name: "project",
        forbidden: "project.localizations.locale.localizations",
        prefetch: &[
            ("project.localizations", Prefetch::ProjectLocalizations),
            ("project.tags", Prefetch::ProjectTags),
        ],
    },
    RootFieldSpec {
        name: "locales",
        forbidden: "locales.localizations.project.localizations",
        prefetch: &[("locales.localizations", Prefetch::LocaleLocalizations)],
    },
    RootFieldSpec {
        name: "locale",
        forbidden: "locale.localizations.project.localizations",
        prefetch: &[("locale.localizations", Prefetch::LocaleLocalizations)],
    },
];

#[derive(Debug, Clone, PartialEq)]
pub enum RootKind {
    Projects(ProjectScope),
    Project { slug: String },
    Locales,
    Locale { code: String },
    Typename,
    /// `__debug`, resolved after every other root field
    Debug,
}

/// A validated root field, ready to be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RootPlan {
    pub node: FieldNode,
    pub kind: RootKind,
    pub prefetch: Vec<Prefetch>,
}

/// Validate a root field and decide what to prefetch
///
/// `paths` is the flattened field list of the root field. Fails with
/// [`QueryError::CyclicQuery`] when it contains the field's forbidden path.
pub fn plan_root_field(node: FieldNode, paths: &[String]) -> Result<RootPlan, QueryError> {
    let kind = match node.name.as_str() {
        TYPENAME_FIELD => RootKind::Typename,
        "__debug" => RootKind::Debug,
        "projects" => RootKind::Projects(ProjectScope::new(
            node.bool_arg("includeDisabled")?,
            node.bool_arg("includeSystem")?,
        )),
        "project" => RootKind::Project {
            slug: required_string(&node, "slug")?,
        },
        "locales" => RootKind::Locales,
        "locale" => RootKind::Locale {
            code: required_string(&node, "code")?,
        },
        other => {
            return Err(QueryError::UnknownField {
                field: other.to_string(),
                type_name: "Query".to_string(),
            });
        }
    };

    let mut prefetch = Vec::new();
    if let Some(spec) = ROOT_FIELDS.iter().find(|spec| spec.name == node.name) {
        if paths.iter().any(|path| path == spec.forbidden) {
            tracing::warn!(path = spec.forbidden, "Rejected cyclic query");
            return Err(QueryError::CyclicQuery {
                path: spec.forbidden.to_string(),
            });
        }

        prefetch = spec
            .prefetch
            .iter()
            .filter(|(path, _)| paths.iter().any(|p| p == path))
            .map(|(_, relation)| *relation)
            .collect();
        tracing::debug!(field = spec.name, ?prefetch, "Planned root field");
    }

    Ok(RootPlan {
        node,
        kind,
        prefetch,
    })
}

fn required_string(node: &FieldNode, argument: &str) -> Result<String, QueryError> {
    node.string_arg(argument)?
        .ok_or_else(|| QueryError::MissingArgument {
            field: node.name.clone(),
            argument: argument.to_string(),
            expected: "String",
        })
}

/// Resolve a planned root field
///
/// `__debug` is not resolved here; the executor fills it in last.
pub async fn resolve_root_field(
    ctx: ExecutionContext<'_>,
    plan: &RootPlan,
) -> Result<Value, ApiError> {
    let children = &plan.node.children;

    match &plan.kind {
        RootKind::Projects(scope) => {
            let records = ctx.store.projects(ctx.viewer, *scope, &plan.prefetch).await?;
            let objects = records.into_iter().map(GraphObject::Project).collect();
            field_resolver::resolve_list(ctx, objects, children).await
        }
        RootKind::Project { slug } => {
            let record = ctx
                .store
                .project(ctx.viewer, slug, &plan.prefetch)
                .await?
                .ok_or_else(|| ApiError::NotFound {
                    kind: "Project",
                    key: slug.clone(),
                })?;
            field_resolver::resolve_object(ctx, GraphObject::Project(record), children).await
        }
        RootKind::Locales => {
            let records = ctx.store.locales(&plan.prefetch).await?;
            let objects = records.into_iter().map(GraphObject::Locale).collect();
            field_resolver::resolve_list(ctx, objects, children).await
        }
        RootKind::Locale { code } => {
            let record = ctx
                .store
                .locale(code, &plan.prefetch)
                .await?
                .ok_or_else(|| ApiError::NotFound {
                    kind: "Locale",
                    key: code.clone(),
                })?;
            field_resolver::resolve_object(ctx, GraphObject::Locale(record), children).await
        }
        RootKind::Typename => Ok(json!("Query")),
        RootKind::Debug => Ok(Value::Null),
    }
}
