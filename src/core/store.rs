//! Data-access seam consumed by the GraphQL resolvers
//!
//! The store owns the `visible_for(viewer)` rule and prefetching. Resolvers
//! decide *what* to prefetch from the query's field paths; the store decides
//! how.

use anyhow::Result;
use async_trait::async_trait;

use super::auth::AuthContext;
use super::model::{Locale, Localization, Project, Tag};

/// Which non-default projects to union into a listing
///
/// The base set is every project that is neither disabled nor a system
/// project. The flags add the disabled and system sets on top; a project
/// that is both is admitted if either flag is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectScope {
    pub include_disabled: bool,
    pub include_system: bool,
}

impl ProjectScope {
    pub fn new(include_disabled: bool, include_system: bool) -> Self {
        Self {
            include_disabled,
            include_system,
        }
    }

    pub fn admits(&self, project: &Project) -> bool {
        (!project.disabled && !project.system_project)
            || (self.include_disabled && project.disabled)
            || (self.include_system && project.system_project)
    }

    /// Keep the localizations whose project is visible and in scope
    pub fn filter_localizations<'l>(
        &self,
        viewer: &AuthContext,
        localizations: impl IntoIterator<Item = &'l Localization>,
    ) -> Vec<Localization> {
        localizations
            .into_iter()
            .filter(|l| viewer.can_view(&l.project) && self.admits(&l.project))
            .cloned()
            .collect()
    }
}

/// Relations a store can load together with the parent rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefetch {
    /// `Project.localizations`, each joined with its locale
    ProjectLocalizations,
    /// `Project.tags`
    ProjectTags,
    /// `Locale.localizations`, each joined with its project (unfiltered)
    LocaleLocalizations,
}

/// A project row plus whatever relations were prefetched
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub project: Project,
    pub localizations: Option<Vec<Localization>>,
    pub tags: Option<Vec<Tag>>,
}

impl ProjectRecord {
    /// A record with nothing prefetched
    pub fn bare(project: Project) -> Self {
        Self {
            project,
            localizations: None,
            tags: None,
        }
    }
}

/// A locale row plus whatever relations were prefetched
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleRecord {
    pub locale: Locale,
    /// Every localization of the locale; visibility and scope are applied
    /// by the caller
    pub localizations: Option<Vec<Localization>>,
}

impl LocaleRecord {
    pub fn bare(locale: Locale) -> Self {
        Self {
            locale,
            localizations: None,
        }
    }
}

/// Read-only access to the localization catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Projects visible for `viewer`, restricted to `scope`
    async fn projects(
        &self,
        viewer: &AuthContext,
        scope: ProjectScope,
        prefetch: &[Prefetch],
    ) -> Result<Vec<ProjectRecord>>;

    /// A single project visible for `viewer`, regardless of scope
    async fn project(
        &self,
        viewer: &AuthContext,
        slug: &str,
        prefetch: &[Prefetch],
    ) -> Result<Option<ProjectRecord>>;

    async fn locales(&self, prefetch: &[Prefetch]) -> Result<Vec<LocaleRecord>>;

    async fn locale(&self, code: &str, prefetch: &[Prefetch]) -> Result<Option<LocaleRecord>>;

    /// Every localization of a project
    async fn project_localizations(&self, project_slug: &str) -> Result<Vec<Localization>>;

    async fn project_tags(&self, project_slug: &str) -> Result<Vec<Tag>>;

    /// Localizations of a locale whose project is visible and in scope
    async fn locale_localizations(
        &self,
        viewer: &AuthContext,
        locale_code: &str,
        scope: ProjectScope,
    ) -> Result<Vec<Localization>>;
}
