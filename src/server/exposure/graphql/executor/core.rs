//! Core GraphQL executor orchestration

use graphql_parser::query::{
    Definition, Document, OperationDefinition, Selection, VariableDefinition, parse_query,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::field_resolver::{ExecutionContext, GraphObject, resolve_object};
use super::fields::{FragmentTable, get_fields};
use super::query_executor::{self, RootKind, RootPlan};
use super::selection::SelectionBuilder;
use super::utils::{Variables, gql_value_to_json, type_to_string};
use crate::core::{ApiError, AuthContext, QueryError};
use crate::server::exposure::graphql::schema::QUERY;
use crate::server::host::ServerHost;
use crate::storage::TracedStore;

/// Body of a GraphQL request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        if let Value::Object(map) = variables {
            self.variables = Some(map);
        }
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// GraphQL executor for the read-only catalog schema
pub struct GraphQLExecutor {
    host: Arc<ServerHost>,
}

impl GraphQLExecutor {
    pub fn new(host: Arc<ServerHost>) -> Self {
        Self { host }
    }

    /// Execute a request on behalf of `viewer` and return `{"data": ...}`
    ///
    /// Any error aborts the whole request; no partial data is returned.
    pub async fn execute(
        &self,
        request: GraphQLRequest,
        viewer: &AuthContext,
    ) -> Result<Value, ApiError> {
        if request.query.trim().is_empty() {
            return Err(QueryError::MissingQuery.into());
        }

        let doc = parse_query::<String>(&request.query).map_err(|e| QueryError::Parse {
            message: e.to_string().trim().to_string(),
        })?;

        let data = self
            .execute_document(
                &doc,
                request.operation_name.as_deref(),
                request.variables.unwrap_or_default(),
                viewer,
            )
            .await?;

        Ok(json!({ "data": data }))
    }

    async fn execute_document(
        &self,
        doc: &Document<'_, String>,
        operation_name: Option<&str>,
        provided: Map<String, Value>,
        viewer: &AuthContext,
    ) -> Result<Value, ApiError> {
        let operation = select_operation(doc, operation_name)?;
        let (selections, definitions) = match operation {
            OperationDefinition::SelectionSet(set) => (&set.items, &[][..]),
            OperationDefinition::Query(query) => (
                &query.selection_set.items,
                query.variable_definitions.as_slice(),
            ),
            OperationDefinition::Mutation(_) => {
                return Err(QueryError::UnsupportedOperation { kind: "Mutation" }.into());
            }
            OperationDefinition::Subscription(_) => {
                return Err(QueryError::UnsupportedOperation {
                    kind: "Subscription",
                }
                .into());
            }
        };

        let variables = resolve_variables(definitions, provided)?;
        let plans = self.plan(doc, selections, &variables)?;

        let store = TracedStore::new(self.host.store.clone());
        let ctx = ExecutionContext {
            store: &store,
            viewer,
        };

        let mut data = Map::new();
        for plan in &plans {
            let value = query_executor::resolve_root_field(ctx, plan).await?;
            data.insert(plan.node.response_key.clone(), value);
        }

        // Debug info goes last so it sees every call made above
        for plan in plans.iter().filter(|plan| plan.kind == RootKind::Debug) {
            let debug = GraphObject::Debug(store.calls()?);
            let value = resolve_object(ctx, debug, &plan.node.children).await?;
            data.insert(plan.node.response_key.clone(), value);
        }

        tracing::debug!(
            operation = operation_name.unwrap_or("<anonymous>"),
            root_fields = plans.len(),
            store_calls = store.calls()?.len(),
            "Resolved GraphQL operation"
        );

        Ok(Value::Object(data))
    }

    /// Normalize and validate every root field before any store access
    fn plan<'d, 'a: 'd>(
        &self,
        doc: &'d Document<'a, String>,
        selections: &'d [Selection<'a, String>],
        variables: &Variables,
    ) -> Result<Vec<RootPlan>, QueryError> {
        let fragments = FragmentTable::from_document(doc)
            .with_selection_limit(self.host.config.graphql.max_selections);
        let builder = SelectionBuilder::new(&fragments, variables, self.host.debug_enabled());
        let groups = builder.group_root(selections)?;

        let mut plans = Vec::with_capacity(groups.len());
        for (response_key, pending) in &groups {
            let field_asts: Vec<_> = pending.iter().map(|p| p.field).collect();
            let paths = get_fields(&field_asts, &fragments)?;
            let node = builder.build(&QUERY, response_key, pending)?;
            plans.push(query_executor::plan_root_field(node, &paths)?);
        }
        Ok(plans)
    }
}

fn select_operation<'d, 'a>(
    doc: &'d Document<'a, String>,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition<'a, String>, QueryError> {
    let operations: Vec<&OperationDefinition<'a, String>> = doc
        .definitions
        .iter()
        .filter_map(|def| match def {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        })
        .collect();

    match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|op| operation_name_of(op) == Some(name))
            .ok_or_else(|| QueryError::UnknownOperation {
                name: name.to_string(),
            }),
        None => match operations.as_slice() {
            [] => Err(QueryError::NoOperation),
            [op] => Ok(*op),
            _ => Err(QueryError::AmbiguousOperation),
        },
    }
}

fn operation_name_of<'o>(operation: &'o OperationDefinition<'_, String>) -> Option<&'o str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}

/// Coerce provided variables against their definitions
///
/// Absent variables take their default. An explicit `null` is kept as is
/// and only rejected for non-null types.
fn resolve_variables(
    definitions: &[VariableDefinition<'_, String>],
    mut provided: Map<String, Value>,
) -> Result<Variables, QueryError> {
    let mut variables = Variables::new();

    for definition in definitions {
        let name = &definition.name;
        let non_null = matches!(
            definition.var_type,
            graphql_parser::query::Type::NonNullType(_)
        );

        match provided.remove(name) {
            Some(Value::Null) if non_null => {
                return Err(QueryError::NullVariable {
                    name: name.clone(),
                    var_type: type_to_string(&definition.var_type),
                });
            }
            Some(value) => {
                variables.insert(name.clone(), value);
            }
            None => {
                if let Some(default) = &definition.default_value {
                    variables.insert(name.clone(), gql_value_to_json(default, &Variables::new()));
                } else if non_null {
                    return Err(QueryError::MissingVariable {
                        name: name.clone(),
                        var_type: type_to_string(&definition.var_type),
                    });
                }
            }
        }
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::core::{
        AggregatedStats, Locale, MANAGE_PROJECT_PERMISSION, NoAuthProvider, Project, Tag,
        Visibility,
    };
    use crate::storage::InMemoryCatalog;

    fn stats(total: i64, approved: i64) -> AggregatedStats {
        AggregatedStats {
            total_strings: total,
            approved_strings: approved,
            ..AggregatedStats::default()
        }
    }

    fn project(slug: &str, visibility: Visibility) -> Project {
        Project {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            visibility,
            ..Project::default()
        }
    }

    fn locale(code: &str, name: &str) -> Locale {
        Locale {
            name: name.to_string(),
            code: code.to_string(),
            ..Locale::default()
        }
    }

    fn catalog() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        catalog.insert_locale(locale("fr", "French")).expect("fr");
        catalog.insert_locale(locale("de", "German")).expect("de");

        catalog
            .insert_project(project("firefox", Visibility::Public))
            .expect("firefox");
        catalog
            .insert_project(project("thunderbird", Visibility::Public))
            .expect("thunderbird");
        catalog
            .insert_project(project("secret", Visibility::Private))
            .expect("secret");
        catalog
            .insert_project(Project {
                disabled: true,
                ..project("legacy", Visibility::Public)
            })
            .expect("legacy");
        catalog
            .insert_project(Project {
                system_project: true,
                ..project("terminology", Visibility::Public)
            })
            .expect("terminology");

        for (project, locale, total, approved) in [
            ("firefox", "fr", 10, 5),
            ("firefox", "de", 10, 10),
            ("thunderbird", "fr", 6, 6),
            ("secret", "fr", 4, 1),
            ("legacy", "de", 2, 2),
            ("terminology", "fr", 3, 0),
        ] {
            catalog
                .insert_localization(project, locale, stats(total, approved))
                .expect("localization");
        }

        catalog
            .insert_tag(Tag {
                slug: "browser".to_string(),
                name: "Browser".to_string(),
                priority: Some(5),
                project: Some("firefox".to_string()),
            })
            .expect("tag");
        catalog
    }

    fn executor_with(debug: bool) -> GraphQLExecutor {
        let mut config = ServerConfig::default();
        config.graphql.debug = debug;
        executor_with_config(config)
    }

    fn executor_with_config(config: ServerConfig) -> GraphQLExecutor {
        let host = ServerHost::new(config, Arc::new(catalog()), Arc::new(NoAuthProvider));
        GraphQLExecutor::new(Arc::new(host))
    }

    fn executor() -> GraphQLExecutor {
        executor_with(false)
    }

    async fn run(executor: &GraphQLExecutor, query: &str) -> Result<Value, ApiError> {
        executor
            .execute(GraphQLRequest::new(query), &AuthContext::Anonymous)
            .await
    }

    fn slugs(value: &Value) -> Vec<String> {
        value
            .as_array()
            .expect("list")
            .iter()
            .map(|p| p["slug"].as_str().expect("slug").to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_projects_default_scope() {
        let body = run(&executor(), "{ projects { slug } }")
            .await
            .expect("should execute");
        assert_eq!(slugs(&body["data"]["projects"]), vec!["firefox", "thunderbird"]);
    }

    #[tokio::test]
    async fn test_projects_scope_flags_union() {
        let executor = executor();
        let body = run(&executor, "{ projects(includeDisabled: true) { slug } }")
            .await
            .expect("should execute");
        assert_eq!(
            slugs(&body["data"]["projects"]),
            vec!["firefox", "thunderbird", "legacy"]
        );

        let body = run(
            &executor,
            "{ projects(include_disabled: true, include_system: true) { slug } }",
        )
        .await
        .expect("should execute");
        assert_eq!(
            slugs(&body["data"]["projects"]),
            vec!["firefox", "thunderbird", "legacy", "terminology"]
        );
    }

    #[tokio::test]
    async fn test_manager_sees_private_projects() {
        let viewer = AuthContext::user("admin", &[MANAGE_PROJECT_PERMISSION]);
        let body = executor()
            .execute(GraphQLRequest::new("{ projects { slug } }"), &viewer)
            .await
            .expect("should execute");
        assert_eq!(
            slugs(&body["data"]["projects"]),
            vec!["firefox", "thunderbird", "secret"]
        );
    }

    #[tokio::test]
    async fn test_cyclic_query_is_rejected() {
        let err = run(
            &executor(),
            "{ projects { localizations { locale { localizations { totalStrings } } } } }",
        )
        .await
        .expect_err("cyclic");
        assert_eq!(err.to_string(), "Cyclic queries are forbidden");
    }

    #[tokio::test]
    async fn test_cyclic_query_through_fragments_is_rejected() {
        let err = run(
            &executor(),
            "{ locale(code: \"fr\") { ...l } } \
             fragment l on Locale { localizations { project { localizations { totalStrings } } } }",
        )
        .await
        .expect_err("cyclic");
        assert!(matches!(
            err,
            ApiError::Query(QueryError::CyclicQuery { ref path })
                if path == "locale.localizations.project.localizations"
        ));
    }

    #[tokio::test]
    async fn test_non_cyclic_nested_query_resolves() {
        let body = run(
            &executor(),
            "{ project(slug: \"firefox\") { name localizations { locale { name } totalStrings missingStrings complete } } }",
        )
        .await
        .expect("should execute");

        assert_eq!(
            body,
            json!({
                "data": {
                    "project": {
                        "name": "FIREFOX",
                        "localizations": [
                            {"locale": {"name": "French"}, "totalStrings": 10, "missingStrings": 5, "complete": false},
                            {"locale": {"name": "German"}, "totalStrings": 10, "missingStrings": 0, "complete": true},
                        ]
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_locale_localizations_are_filtered_and_scoped() {
        let executor = executor();
        let body = run(
            &executor,
            "{ locale(code: \"fr\") { localizations { project { slug } } } }",
        )
        .await
        .expect("should execute");
        let projects: Vec<&str> = body["data"]["locale"]["localizations"]
            .as_array()
            .expect("list")
            .iter()
            .map(|l| l["project"]["slug"].as_str().expect("slug"))
            .collect();
        assert_eq!(projects, vec!["firefox", "thunderbird"]);

        let body = run(
            &executor,
            "{ locales { code localizations(includeSystem: true) { project { slug } } } }",
        )
        .await
        .expect("should execute");
        let fr = &body["data"]["locales"][0];
        assert_eq!(fr["code"], "fr");
        assert_eq!(fr["localizations"].as_array().expect("list").len(), 3);
    }

    #[tokio::test]
    async fn test_project_lookup_not_found() {
        let err = run(&executor(), "{ project(slug: \"missing\") { name } }")
            .await
            .expect_err("not found");
        assert_eq!(err.to_string(), "Project matching query does not exist.");

        let err = run(&executor(), "{ project(slug: \"secret\") { name } }")
            .await
            .expect_err("private project is hidden");
        assert!(matches!(err, ApiError::NotFound { kind: "Project", .. }));

        let err = run(&executor(), "{ locale(code: \"xx\") { name } }")
            .await
            .expect_err("not found");
        assert_eq!(err.to_string(), "Locale matching query does not exist.");
    }

    #[tokio::test]
    async fn test_unknown_field_is_rejected() {
        let err = run(&executor(), "{ projects { id } }")
            .await
            .expect_err("unknown field");
        assert_eq!(
            err.to_string(),
            "Cannot query field \"id\" on type \"Project\"."
        );
    }

    #[tokio::test]
    async fn test_variables_defaults_and_required() {
        let executor = executor();
        let request = GraphQLRequest::new(
            "query Lookup($slug: String!) { project(slug: $slug) { slug } }",
        )
        .with_variables(json!({"slug": "thunderbird"}));
        let body = executor
            .execute(request, &AuthContext::Anonymous)
            .await
            .expect("should execute");
        assert_eq!(body["data"]["project"]["slug"], "thunderbird");

        let request = GraphQLRequest::new(
            "query Scoped($all: Boolean = true) { projects(includeSystem: $all) { slug } }",
        );
        let body = executor
            .execute(request, &AuthContext::Anonymous)
            .await
            .expect("should execute");
        assert_eq!(
            slugs(&body["data"]["projects"]),
            vec!["firefox", "thunderbird", "terminology"]
        );

        let err = executor
            .execute(
                GraphQLRequest::new("query ($code: String!) { locale(code: $code) { name } }"),
                &AuthContext::Anonymous,
            )
            .await
            .expect_err("missing variable");
        assert_eq!(
            err.to_string(),
            "Variable \"$code\" of required type \"String!\" was not provided."
        );
    }

    #[tokio::test]
    async fn test_explicit_null_variable_overrides_default() {
        let executor = executor();
        let query = "query Scoped($all: Boolean = true) { projects(includeSystem: $all) { slug } }";

        let body = executor
            .execute(
                GraphQLRequest::new(query).with_variables(json!({"all": null})),
                &AuthContext::Anonymous,
            )
            .await
            .expect("should execute");
        assert_eq!(slugs(&body["data"]["projects"]), vec!["firefox", "thunderbird"]);

        let err = executor
            .execute(
                GraphQLRequest::new("query ($code: String! = \"fr\") { locale(code: $code) { name } }")
                    .with_variables(json!({"code": null})),
                &AuthContext::Anonymous,
            )
            .await
            .expect_err("null for a non-null variable");
        assert_eq!(
            err.to_string(),
            "Variable \"$code\" of non-null type \"String!\" must not be null."
        );
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_doubling_fragment_chain_is_rejected_before_resolution() {
        let mut config = ServerConfig::default();
        config.graphql.max_selections = 500;
        let executor = executor_with_config(config);

        let mut query = String::from("{ projects { ...f0 } }");
        for i in 0..30 {
            query.push_str(&format!(
                " fragment f{i} on Project {{ ...f{next} ...f{next} }}",
                next = i + 1
            ));
        }
        query.push_str(" fragment f30 on Project { slug }");

        let err = run(&executor, &query).await.expect_err("too complex");
        assert!(
            matches!(
                err,
                ApiError::Query(QueryError::QueryTooComplex { limit: 500 })
            ),
            "{:?}",
            err
        );

        let body = run(&executor, "{ projects { ...a ...a } } fragment a on Project { slug }")
            .await
            .expect("small queries stay within the limit");
        assert_eq!(slugs(&body["data"]["projects"]), vec!["firefox", "thunderbird"]);
    }

    #[tokio::test]
    async fn test_operation_selection() {
        let executor = executor();
        let query = "query A { locales { code } } query B { projects { slug } }";

        let body = executor
            .execute(
                GraphQLRequest::new(query).with_operation_name("B"),
                &AuthContext::Anonymous,
            )
            .await
            .expect("should execute");
        assert!(body["data"].get("projects").is_some());
        assert!(body["data"].get("locales").is_none());

        let err = run(&executor, query).await.expect_err("ambiguous");
        assert!(matches!(
            err,
            ApiError::Query(QueryError::AmbiguousOperation)
        ));

        let err = executor
            .execute(
                GraphQLRequest::new(query).with_operation_name("C"),
                &AuthContext::Anonymous,
            )
            .await
            .expect_err("unknown operation");
        assert_eq!(err.to_string(), "Unknown operation named \"C\".");
    }

    #[tokio::test]
    async fn test_mutations_are_not_supported() {
        let err = run(&executor(), "mutation { projects { slug } }")
            .await
            .expect_err("mutation");
        assert_eq!(err.to_string(), "Mutation operations are not supported");
    }

    #[tokio::test]
    async fn test_parse_and_empty_query_errors() {
        let err = run(&executor(), "{ projects { slug }").await.expect_err("syntax");
        assert!(matches!(err, ApiError::Query(QueryError::Parse { .. })));

        let err = run(&executor(), "   ").await.expect_err("empty");
        assert!(matches!(err, ApiError::Query(QueryError::MissingQuery)));
    }

    #[tokio::test]
    async fn test_recursive_fragment_fails_fast() {
        let err = run(
            &executor(),
            "{ projects { ...p } } fragment p on Project { localizations { project { ...p } } }",
        )
        .await
        .expect_err("recursive fragment");
        assert!(matches!(
            err,
            ApiError::Query(QueryError::FragmentCycle { ref name }) if name == "p"
        ));
    }

    #[tokio::test]
    async fn test_typename_and_aliases() {
        let body = run(
            &executor(),
            "{ __typename fx: project(slug: \"firefox\") { kind: __typename title: name tags { slug priority } } }",
        )
        .await
        .expect("should execute");
        assert_eq!(
            body,
            json!({
                "data": {
                    "__typename": "Query",
                    "fx": {
                        "kind": "Project",
                        "title": "FIREFOX",
                        "tags": [{"slug": "browser", "priority": 5}],
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_prefetch_issues_one_call_for_all_projects() {
        let executor = executor_with(true);
        let body = run(
            &executor,
            "{ projects { slug localizations { totalStrings } } __debug { storeCalls { operation detail } } }",
        )
        .await
        .expect("should execute");

        let calls = body["data"]["__debug"]["storeCalls"]
            .as_array()
            .expect("calls");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["operation"], "projects");
        assert_eq!(
            calls[0]["detail"],
            "include_disabled=false include_system=false prefetch=[ProjectLocalizations]"
        );
    }

    #[tokio::test]
    async fn test_lazy_relations_cost_one_call_per_parent() {
        let executor = executor_with(true);
        let body = run(
            &executor,
            "{ locale(code: \"fr\") { localizations { project { slug tags { slug } } } } __debug { storeCalls { operation } } }",
        )
        .await
        .expect("should execute");

        let operations: Vec<&str> = body["data"]["__debug"]["storeCalls"]
            .as_array()
            .expect("calls")
            .iter()
            .map(|c| c["operation"].as_str().expect("operation"))
            .collect();
        assert_eq!(
            operations,
            vec!["locale", "project_tags", "project_tags"]
        );
    }

    #[tokio::test]
    async fn test_debug_field_is_hidden_unless_enabled() {
        let err = run(&executor(), "{ __debug { storeCalls { operation } } }")
            .await
            .expect_err("debug disabled");
        assert!(matches!(
            err,
            ApiError::Query(QueryError::UnknownField { ref field, .. }) if field == "__debug"
        ));
    }
}
