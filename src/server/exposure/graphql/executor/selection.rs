//! Selection normalization
//!
//! Turns the selection sets of an operation into an owned [`FieldNode`]
//! tree: fragments are inlined, repeated response keys are merged, argument
//! values have their variables substituted and every field is checked
//! against the schema allowlists. Resolvers only ever see this tree.

use graphql_parser::query::{Field, Selection, TypeCondition};
use indexmap::IndexMap;
use serde_json::Value;

use super::fields::{FragmentStack, FragmentTable};
use super::utils::{Variables, gql_value_to_json};
use crate::core::QueryError;
use crate::server::exposure::graphql::schema::{
    self, DEBUG_FIELD, FieldDef, FieldType, ObjectDef, QUERY,
};

pub const TYPENAME_FIELD: &str = "__typename";

const DIFFERENT_FIELDS: &str = "they select different fields";
const DIFFERENT_ARGUMENTS: &str = "they have differing arguments";

/// One selected field, ready for resolution
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    /// Alias if given, otherwise the field name
    pub response_key: String,
    /// Argument values keyed by their canonical (camelCase) name
    pub arguments: IndexMap<String, Value>,
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    /// Boolean argument; absent and `null` read as `false`
    pub fn bool_arg(&self, name: &str) -> Result<bool, QueryError> {
        match self.arguments.get(name) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(QueryError::InvalidArgument {
                argument: name.to_string(),
                value: other.to_string(),
                expected: "Boolean",
            }),
        }
    }

    pub fn string_arg(&self, name: &str) -> Result<Option<String>, QueryError> {
        match self.arguments.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(QueryError::InvalidArgument {
                argument: name.to_string(),
                value: other.to_string(),
                expected: "String",
            }),
        }
    }
}

/// A field AST found while grouping, with the fragments that led to it
pub struct PendingField<'d, 'a: 'd> {
    pub field: &'d Field<'a, String>,
    stack: FragmentStack<'d>,
}

/// Fields of one selection level grouped by response key, in query order
pub type FieldGroups<'d, 'a> = IndexMap<String, Vec<PendingField<'d, 'a>>>;

pub struct SelectionBuilder<'v, 'd, 'a: 'd> {
    fragments: &'v FragmentTable<'d, 'a>,
    variables: &'v Variables,
    debug: bool,
}

impl<'v, 'd, 'a: 'd> SelectionBuilder<'v, 'd, 'a> {
    /// `debug` exposes the `__debug` root field
    pub fn new(fragments: &'v FragmentTable<'d, 'a>, variables: &'v Variables, debug: bool) -> Self {
        Self {
            fragments,
            variables,
            debug,
        }
    }

    /// Group the root selections of an operation by response key
    pub fn group_root(
        &self,
        selections: &'d [Selection<'a, String>],
    ) -> Result<FieldGroups<'d, 'a>, QueryError> {
        let mut groups = FieldGroups::new();
        let mut stack = FragmentStack::default();
        for selection in selections {
            self.group(&QUERY, selection, &mut stack, &mut groups)?;
        }
        Ok(groups)
    }

    fn group(
        &self,
        parent: &'static ObjectDef,
        selection: &'d Selection<'a, String>,
        stack: &mut FragmentStack<'d>,
        groups: &mut FieldGroups<'d, 'a>,
    ) -> Result<(), QueryError> {
        self.fragments.visit()?;
        match selection {
            Selection::Field(field) => {
                let key = field.alias.as_ref().unwrap_or(&field.name).clone();
                groups.entry(key).or_default().push(PendingField {
                    field,
                    stack: stack.clone(),
                });
            }
            Selection::FragmentSpread(spread) => {
                let fragment = self.fragments.get(&spread.fragment_name)?;
                check_type_condition(parent, Some(&fragment.type_condition))?;
                stack.enter(spread.fragment_name.as_str())?;
                for selection in &fragment.selection_set.items {
                    self.group(parent, selection, stack, groups)?;
                }
                stack.leave();
            }
            Selection::InlineFragment(inline) => {
                check_type_condition(parent, inline.type_condition.as_ref())?;
                for selection in &inline.selection_set.items {
                    self.group(parent, selection, stack, groups)?;
                }
            }
        }
        Ok(())
    }

    /// Merge one response-key group into a [`FieldNode`]
    pub fn build(
        &self,
        parent: &'static ObjectDef,
        response_key: &str,
        pending: &[PendingField<'d, 'a>],
    ) -> Result<FieldNode, QueryError> {
        let Some(first) = pending.first() else {
            return Err(QueryError::FieldConflict {
                response_key: response_key.to_string(),
                reason: DIFFERENT_FIELDS,
            });
        };
        let name = first.field.name.as_str();
        if pending.iter().any(|p| p.field.name != name) {
            return Err(QueryError::FieldConflict {
                response_key: response_key.to_string(),
                reason: DIFFERENT_FIELDS,
            });
        }

        if name == TYPENAME_FIELD {
            return self.build_typename(parent, response_key, pending);
        }

        let definition = self
            .field_definition(parent, name)
            .ok_or_else(|| QueryError::UnknownField {
                field: name.to_string(),
                type_name: parent.name.to_string(),
            })?;

        let arguments = self.arguments(parent, response_key, definition, pending)?;
        let has_selection = pending
            .iter()
            .any(|p| !p.field.selection_set.items.is_empty());

        let children = if definition.ty.is_composite() {
            if !has_selection {
                return Err(QueryError::MissingSelection {
                    field: name.to_string(),
                    type_name: definition_type_label(definition),
                });
            }
            let child_type = child_object(definition)?;
            self.build_children(child_type, pending)?
        } else {
            if has_selection {
                return Err(QueryError::UnexpectedSelection {
                    field: name.to_string(),
                    type_name: definition_type_label(definition),
                });
            }
            Vec::new()
        };

        Ok(FieldNode {
            name: name.to_string(),
            response_key: response_key.to_string(),
            arguments,
            children,
        })
    }

    fn build_typename(
        &self,
        parent: &'static ObjectDef,
        response_key: &str,
        pending: &[PendingField<'d, 'a>],
    ) -> Result<FieldNode, QueryError> {
        for p in pending {
            if let Some((argument, _)) = p.field.arguments.first() {
                return Err(QueryError::UnknownArgument {
                    argument: argument.clone(),
                    field: TYPENAME_FIELD.to_string(),
                    type_name: parent.name.to_string(),
                });
            }
            if !p.field.selection_set.items.is_empty() {
                return Err(QueryError::UnexpectedSelection {
                    field: TYPENAME_FIELD.to_string(),
                    type_name: "String!".to_string(),
                });
            }
        }

        Ok(FieldNode {
            name: TYPENAME_FIELD.to_string(),
            response_key: response_key.to_string(),
            arguments: IndexMap::new(),
            children: Vec::new(),
        })
    }

    fn build_children(
        &self,
        child_type: &'static ObjectDef,
        pending: &[PendingField<'d, 'a>],
    ) -> Result<Vec<FieldNode>, QueryError> {
        let mut groups = FieldGroups::new();
        for p in pending {
            let mut stack = p.stack.clone();
            for selection in &p.field.selection_set.items {
                self.group(child_type, selection, &mut stack, &mut groups)?;
            }
        }

        groups
            .iter()
            .map(|(key, fields)| self.build(child_type, key, fields))
            .collect()
    }

    /// Arguments shared by every occurrence of a merged field
    ///
    /// Within one occurrence the first value given for an argument wins.
    fn arguments(
        &self,
        parent: &'static ObjectDef,
        response_key: &str,
        definition: &'static FieldDef,
        pending: &[PendingField<'d, 'a>],
    ) -> Result<IndexMap<String, Value>, QueryError> {
        let mut merged: Option<IndexMap<String, Value>> = None;
        for p in pending {
            let mut arguments = IndexMap::new();
            for (name, value) in &p.field.arguments {
                let argument =
                    definition
                        .argument(name)
                        .ok_or_else(|| QueryError::UnknownArgument {
                            argument: name.clone(),
                            field: definition.name.to_string(),
                            type_name: parent.name.to_string(),
                        })?;
                arguments
                    .entry(argument.name.to_string())
                    .or_insert_with(|| gql_value_to_json(value, self.variables));
            }

            match &merged {
                None => merged = Some(arguments),
                Some(first) if *first != arguments => {
                    return Err(QueryError::FieldConflict {
                        response_key: response_key.to_string(),
                        reason: DIFFERENT_ARGUMENTS,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(merged.unwrap_or_default())
    }

    fn field_definition(&self, parent: &'static ObjectDef, name: &str) -> Option<&'static FieldDef> {
        if self.debug && parent.name == QUERY.name && name == DEBUG_FIELD.name {
            return Some(&DEBUG_FIELD);
        }
        parent.field(name)
    }
}

fn check_type_condition(
    parent: &ObjectDef,
    condition: Option<&TypeCondition<'_, String>>,
) -> Result<(), QueryError> {
    match condition {
        Some(TypeCondition::On(name)) if name != parent.name => {
            Err(QueryError::TypeConditionMismatch {
                parent: parent.name.to_string(),
                condition: name.clone(),
            })
        }
        _ => Ok(()),
    }
}

fn child_object(definition: &FieldDef) -> Result<&'static ObjectDef, QueryError> {
    let type_name = match definition.ty {
        FieldType::Object(name) | FieldType::List(name) => name,
        FieldType::Scalar(name) | FieldType::Enum(name) => name,
    };
    schema::object(type_name).ok_or_else(|| QueryError::UnknownField {
        field: definition.name.to_string(),
        type_name: type_name.to_string(),
    })
}

fn definition_type_label(definition: &FieldDef) -> String {
    let base = match definition.ty {
        FieldType::List(name) => format!("[{}]", name),
        FieldType::Object(name) | FieldType::Scalar(name) | FieldType::Enum(name) => {
            name.to_string()
        }
    };
    if definition.non_null {
        format!("{}!", base)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_parser::query::{Definition, Document, OperationDefinition, parse_query};
    use serde_json::json;

    fn root_selections<'d, 'a>(doc: &'d Document<'a, String>) -> &'d [Selection<'a, String>] {
        doc.definitions
            .iter()
            .find_map(|def| match def {
                Definition::Operation(OperationDefinition::SelectionSet(set)) => {
                    Some(set.items.as_slice())
                }
                Definition::Operation(OperationDefinition::Query(query)) => {
                    Some(query.selection_set.items.as_slice())
                }
                _ => None,
            })
            .expect("query should have an operation")
    }

    fn normalize_with(
        query: &str,
        variables: &Variables,
        debug: bool,
    ) -> Result<Vec<FieldNode>, QueryError> {
        let doc = parse_query::<String>(query).expect("query should parse");
        let fragments = FragmentTable::from_document(&doc);
        let builder = SelectionBuilder::new(&fragments, variables, debug);
        let groups = builder.group_root(root_selections(&doc))?;
        groups
            .iter()
            .map(|(key, pending)| builder.build(&QUERY, key, pending))
            .collect()
    }

    fn normalize(query: &str) -> Result<Vec<FieldNode>, QueryError> {
        normalize_with(query, &Variables::new(), false)
    }

    fn keys(nodes: &[FieldNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.response_key.as_str()).collect()
    }

    #[test]
    fn test_fragments_and_repeated_fields_merge() {
        let nodes = normalize(
            "{ projects { name ...stats name localizations { totalStrings } localizations { complete } } } \
             fragment stats on Project { totalStrings missingStrings }",
        )
        .expect("should normalize");

        assert_eq!(nodes.len(), 1);
        let projects = &nodes[0];
        assert_eq!(
            keys(&projects.children),
            vec!["name", "totalStrings", "missingStrings", "localizations"]
        );
        let localizations = &projects.children[3];
        assert_eq!(
            keys(&localizations.children),
            vec!["totalStrings", "complete"]
        );
    }

    #[test]
    fn test_aliases_set_response_keys() {
        let nodes = normalize(
            "{ fx: project(slug: \"firefox\") { title: name } fr: locale(code: \"fr\") { code } }",
        )
        .expect("should normalize");

        assert_eq!(keys(&nodes), vec!["fx", "fr"]);
        assert_eq!(nodes[0].name, "project");
        assert_eq!(nodes[0].children[0].name, "name");
        assert_eq!(nodes[0].children[0].response_key, "title");
    }

    #[test]
    fn test_conflicting_fields_under_one_key_are_rejected() {
        let err = normalize("{ projects { x: name x: slug } }").expect_err("conflict");
        assert_eq!(
            err,
            QueryError::FieldConflict {
                response_key: "x".to_string(),
                reason: DIFFERENT_FIELDS,
            }
        );
    }

    #[test]
    fn test_differing_arguments_under_one_key_are_rejected() {
        let err = normalize("{ projects { slug } projects(includeDisabled: true) { slug } }")
            .expect_err("scopes differ");
        assert_eq!(
            err,
            QueryError::FieldConflict {
                response_key: "projects".to_string(),
                reason: DIFFERENT_ARGUMENTS,
            }
        );
        assert!(err.to_string().contains("differing arguments"));

        let err = normalize(
            "{ projects(includeDisabled: true) { slug } ...more } \
             fragment more on Query { projects(includeDisabled: false) { name } }",
        )
        .expect_err("conflict through a fragment");
        assert!(matches!(err, QueryError::FieldConflict { .. }));
    }

    #[test]
    fn test_identical_arguments_merge_in_any_spelling() {
        let nodes = normalize(
            "{ projects(includeDisabled: true, includeSystem: false) { slug } \
               projects(include_system: false, include_disabled: true) { name } }",
        )
        .expect("same arguments merge");
        assert_eq!(nodes.len(), 1);
        assert_eq!(keys(&nodes[0].children), vec!["slug", "name"]);
        assert!(nodes[0].bool_arg("includeDisabled").expect("bool"));
    }

    #[test]
    fn test_snake_case_arguments_are_canonicalized() {
        let nodes = normalize("{ projects(include_disabled: true) { slug } }")
            .expect("should normalize");
        assert_eq!(nodes[0].arguments.get("includeDisabled"), Some(&json!(true)));
        assert!(nodes[0].bool_arg("includeDisabled").expect("bool"));
        assert!(!nodes[0].bool_arg("includeSystem").expect("bool"));
    }

    #[test]
    fn test_variables_are_substituted_in_arguments() {
        let mut variables = Variables::new();
        variables.insert("code".to_string(), json!("de"));
        let nodes = normalize_with(
            "query Q($code: String!) { locale(code: $code) { name } }",
            &variables,
            false,
        )
        .expect("should normalize");
        assert_eq!(
            nodes[0].string_arg("code").expect("string"),
            Some("de".to_string())
        );
    }

    #[test]
    fn test_invalid_argument_type_is_reported() {
        let nodes = normalize("{ projects(includeSystem: \"yes\") { slug } }")
            .expect("should normalize");
        let err = nodes[0].bool_arg("includeSystem").expect_err("not a bool");
        assert_eq!(
            err,
            QueryError::InvalidArgument {
                argument: "includeSystem".to_string(),
                value: "\"yes\"".to_string(),
                expected: "Boolean",
            }
        );
    }

    #[test]
    fn test_unknown_field_and_argument() {
        let err = normalize("{ projects { id } }").expect_err("unknown field");
        assert_eq!(
            err,
            QueryError::UnknownField {
                field: "id".to_string(),
                type_name: "Project".to_string()
            }
        );

        let err = normalize("{ projects(limit: 3) { slug } }").expect_err("unknown argument");
        assert!(matches!(err, QueryError::UnknownArgument { ref argument, .. } if argument == "limit"));
    }

    #[test]
    fn test_selection_shape_is_checked() {
        let err = normalize("{ projects }").expect_err("missing selection");
        assert!(matches!(err, QueryError::MissingSelection { ref field, .. } if field == "projects"));

        let err = normalize("{ projects { name { x } } }").expect_err("unexpected selection");
        assert_eq!(
            err,
            QueryError::UnexpectedSelection {
                field: "name".to_string(),
                type_name: "String!".to_string()
            }
        );
    }

    #[test]
    fn test_type_condition_must_match_parent() {
        let err = normalize(
            "{ projects { ...loc } } fragment loc on Locale { code }",
        )
        .expect_err("mismatch");
        assert_eq!(
            err,
            QueryError::TypeConditionMismatch {
                parent: "Project".to_string(),
                condition: "Locale".to_string()
            }
        );

        let nodes = normalize("{ locales { ... on Locale { code } ... { name } } }")
            .expect("matching and untyped inline fragments are fine");
        assert_eq!(keys(&nodes[0].children), vec!["code", "name"]);
    }

    #[test]
    fn test_recursive_fragment_through_fields_fails_fast() {
        let err = normalize(
            "{ projects { ...loop } } \
             fragment loop on Project { localizations { project { ...loop } } }",
        )
        .expect_err("recursive fragment");
        assert_eq!(
            err,
            QueryError::FragmentCycle {
                name: "loop".to_string()
            }
        );
    }

    #[test]
    fn test_typename_is_available_everywhere() {
        let nodes = normalize("{ __typename projects { __typename tags { kind: __typename } } }")
            .expect("should normalize");
        assert_eq!(keys(&nodes), vec!["__typename", "projects"]);
        assert_eq!(nodes[1].children[1].children[0].response_key, "kind");
    }

    #[test]
    fn test_debug_field_requires_debug_mode() {
        let query = "{ __debug { storeCalls { operation detail } } }";
        let err = normalize(query).expect_err("hidden without debug");
        assert_eq!(
            err,
            QueryError::UnknownField {
                field: "__debug".to_string(),
                type_name: "Query".to_string()
            }
        );

        let nodes = normalize_with(query, &Variables::new(), true).expect("visible in debug");
        assert_eq!(keys(&nodes[0].children), vec!["storeCalls"]);
    }
}
