//! Dotted field paths of a query
//!
//! [`get_fields`] flattens the AST of one root field into the list of
//! dot-joined paths it selects, with fragments inlined where they are spread.
//! For example:
//!
//! ```graphql
//! {
//!   projects {
//!     name
//!     ...stats
//!   }
//! }
//!
//! fragment stats on Project {
//!   totalStrings
//!   missingStrings
//! }
//! ```
//!
//! flattens to
//! `["projects", "projects.name", "projects.totalStrings", "projects.missingStrings"]`.
//! Resolvers use the list to choose prefetches and to reject known-cyclic
//! shapes before touching the store.

use graphql_parser::query::{Definition, Document, Field, FragmentDefinition, Selection};
use std::cell::Cell;
use std::collections::HashMap;

use crate::core::QueryError;

/// Fragment definitions of a document, by name
///
/// The table also meters how many selections the traversals of one
/// operation visit. Spreading a fragment twice in each link of a chain
/// doubles the work per link without forming a cycle, so expansion stops
/// with [`QueryError::QueryTooComplex`] once the limit is reached.
pub struct FragmentTable<'d, 'a: 'd> {
    fragments: HashMap<&'d str, &'d FragmentDefinition<'a, String>>,
    limit: usize,
    visited: Cell<usize>,
}

impl<'d, 'a: 'd> FragmentTable<'d, 'a> {
    pub fn from_document(doc: &'d Document<'a, String>) -> Self {
        let fragments = doc
            .definitions
            .iter()
            .filter_map(|def| match def {
                Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
                Definition::Operation(_) => None,
            })
            .collect();

        Self {
            fragments,
            limit: usize::MAX,
            visited: Cell::new(0),
        }
    }

    pub fn with_selection_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Count one visited selection against the limit
    pub fn visit(&self) -> Result<(), QueryError> {
        let visited = self.visited.get() + 1;
        if visited > self.limit {
            return Err(QueryError::QueryTooComplex { limit: self.limit });
        }
        self.visited.set(visited);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&'d FragmentDefinition<'a, String>, QueryError> {
        self.fragments
            .get(name)
            .copied()
            .ok_or_else(|| QueryError::UnknownFragment {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Fragments currently being expanded along one branch of the traversal
///
/// Re-entering one of them means the fragment spreads itself, directly or
/// through other fragments.
#[derive(Debug, Clone, Default)]
pub struct FragmentStack<'d> {
    active: Vec<&'d str>,
}

impl<'d> FragmentStack<'d> {
    pub fn enter(&mut self, name: &'d str) -> Result<(), QueryError> {
        if self.active.contains(&name) {
            return Err(QueryError::FragmentCycle {
                name: name.to_string(),
            });
        }
        self.active.push(name);
        Ok(())
    }

    pub fn leave(&mut self) {
        self.active.pop();
    }
}

/// Flatten the AST nodes of one root field into dotted paths
///
/// Paths use field names, never aliases, and come out depth-first in
/// pre-order: a field precedes its descendants and siblings keep their
/// declaration order. Fragment spreads and inline fragments contribute no
/// path of their own; their selections are inlined at the spread's prefix.
pub fn get_fields<'d, 'a: 'd>(
    field_asts: &[&'d Field<'a, String>],
    fragments: &FragmentTable<'d, 'a>,
) -> Result<Vec<String>, QueryError> {
    let mut paths = Vec::new();
    let mut stack = FragmentStack::default();

    for field in field_asts {
        walk_field("", field, fragments, &mut stack, &mut paths)?;
    }

    Ok(paths)
}

fn walk_field<'d, 'a: 'd>(
    prefix: &str,
    field: &'d Field<'a, String>,
    fragments: &FragmentTable<'d, 'a>,
    stack: &mut FragmentStack<'d>,
    paths: &mut Vec<String>,
) -> Result<(), QueryError> {
    let path = format!("{}{}", prefix, field.name);
    let nested_prefix = format!("{}.", path);
    paths.push(path);

    for selection in &field.selection_set.items {
        walk_selection(&nested_prefix, selection, fragments, stack, paths)?;
    }
    Ok(())
}

fn walk_selection<'d, 'a: 'd>(
    prefix: &str,
    selection: &'d Selection<'a, String>,
    fragments: &FragmentTable<'d, 'a>,
    stack: &mut FragmentStack<'d>,
    paths: &mut Vec<String>,
) -> Result<(), QueryError> {
    fragments.visit()?;
    match selection {
        Selection::Field(field) => walk_field(prefix, field, fragments, stack, paths),
        Selection::FragmentSpread(spread) => {
            let fragment = fragments.get(&spread.fragment_name)?;
            stack.enter(spread.fragment_name.as_str())?;
            for selection in &fragment.selection_set.items {
                walk_selection(prefix, selection, fragments, stack, paths)?;
            }
            stack.leave();
            Ok(())
        }
        Selection::InlineFragment(inline) => {
            for selection in &inline.selection_set.items {
                walk_selection(prefix, selection, fragments, stack, paths)?;
            }
            Ok(())
        }
    }
}
