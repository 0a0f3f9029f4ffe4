//! In-memory implementation of CatalogStore for testing and development

use crate::core::{
    AggregatedStats, AuthContext, CatalogStore, Locale, LocaleRecord, Localization, Prefetch,
    Project, ProjectRecord, ProjectScope, Tag,
};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

use super::seed::CatalogSeed;

/// A `ProjectLocale` row, keyed by project slug and locale code
#[derive(Debug, Clone)]
struct LocalizationRow {
    project: String,
    locale: String,
    stats: AggregatedStats,
}

#[derive(Debug, Default)]
struct CatalogData {
    projects: IndexMap<String, Project>,
    locales: IndexMap<String, Locale>,
    localizations: Vec<LocalizationRow>,
    tags: Vec<Tag>,
}

impl CatalogData {
    fn join(&self, row: &LocalizationRow) -> Result<Localization> {
        let project = self
            .projects
            .get(&row.project)
            .ok_or_else(|| anyhow!("Localization references unknown project '{}'", row.project))?;
        let locale = self
            .locales
            .get(&row.locale)
            .ok_or_else(|| anyhow!("Localization references unknown locale '{}'", row.locale))?;

        Ok(Localization {
            project: project.clone(),
            locale: locale.clone(),
            stats: row.stats,
        })
    }

    fn localizations_of_project(&self, slug: &str) -> Result<Vec<Localization>> {
        self.localizations
            .iter()
            .filter(|row| row.project == slug)
            .map(|row| self.join(row))
            .collect()
    }

    fn localizations_of_locale(&self, code: &str) -> Result<Vec<Localization>> {
        self.localizations
            .iter()
            .filter(|row| row.locale == code)
            .map(|row| self.join(row))
            .collect()
    }

    fn tags_of_project(&self, slug: &str) -> Vec<Tag> {
        self.tags
            .iter()
            .filter(|tag| tag.project.as_deref() == Some(slug))
            .cloned()
            .collect()
    }

    fn project_record(&self, project: &Project, prefetch: &[Prefetch]) -> Result<ProjectRecord> {
        let mut record = ProjectRecord::bare(project.clone());
        if prefetch.contains(&Prefetch::ProjectLocalizations) {
            record.localizations = Some(self.localizations_of_project(&project.slug)?);
        }
        if prefetch.contains(&Prefetch::ProjectTags) {
            record.tags = Some(self.tags_of_project(&project.slug));
        }
        Ok(record)
    }

    fn locale_record(&self, locale: &Locale, prefetch: &[Prefetch]) -> Result<LocaleRecord> {
        let mut record = LocaleRecord::bare(locale.clone());
        if prefetch.contains(&Prefetch::LocaleLocalizations) {
            record.localizations = Some(self.localizations_of_locale(&locale.code)?);
        }
        Ok(record)
    }
}

/// In-memory catalog store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Projects and locales are returned in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    data: Arc<RwLock<CatalogData>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a validated seed
    pub fn from_seed(seed: CatalogSeed) -> Result<Self> {
        seed.validate()?;

        let catalog = Self::new();
        for locale in seed.locales {
            catalog.insert_locale(locale)?;
        }
        for project in seed.projects {
            catalog.insert_project(project)?;
        }
        for tag in seed.tags {
            catalog.insert_tag(tag)?;
        }
        for localization in seed.localizations {
            catalog.insert_localization(
                &localization.project,
                &localization.locale,
                localization.stats,
            )?;
        }

        {
            let data = catalog.read()?;
            tracing::info!(
                projects = data.projects.len(),
                locales = data.locales.len(),
                localizations = data.localizations.len(),
                "Catalog loaded from seed"
            );
        }
        Ok(catalog)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, CatalogData>> {
        self.data
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, CatalogData>> {
        self.data
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))
    }

    pub fn insert_project(&self, project: Project) -> Result<()> {
        let mut data = self.write()?;
        if data.projects.contains_key(&project.slug) {
            bail!("Project with slug '{}' already exists", project.slug);
        }
        data.projects.insert(project.slug.clone(), project);
        Ok(())
    }

    pub fn insert_locale(&self, locale: Locale) -> Result<()> {
        let mut data = self.write()?;
        if data.locales.contains_key(&locale.code) {
            bail!("Locale with code '{}' already exists", locale.code);
        }
        data.locales.insert(locale.code.clone(), locale);
        Ok(())
    }

    pub fn insert_tag(&self, tag: Tag) -> Result<()> {
        let mut data = self.write()?;
        if let Some(project) = &tag.project
            && !data.projects.contains_key(project)
        {
            bail!("Tag '{}' references unknown project '{}'", tag.slug, project);
        }
        data.tags.push(tag);
        Ok(())
    }

    /// Pair a project with a locale
    ///
    /// The localization's stats are added to both the project's and the
    /// locale's aggregated stats.
    pub fn insert_localization(
        &self,
        project_slug: &str,
        locale_code: &str,
        stats: AggregatedStats,
    ) -> Result<()> {
        let mut data = self.write()?;

        if data
            .localizations
            .iter()
            .any(|row| row.project == project_slug && row.locale == locale_code)
        {
            bail!(
                "Localization {}/{} already exists",
                project_slug,
                locale_code
            );
        }

        if !data.projects.contains_key(project_slug) {
            bail!("Unknown project '{}'", project_slug);
        }
        if !data.locales.contains_key(locale_code) {
            bail!("Unknown locale '{}'", locale_code);
        }

        if let Some(project) = data.projects.get_mut(project_slug) {
            project.stats += stats;
        }
        if let Some(locale) = data.locales.get_mut(locale_code) {
            locale.stats += stats;
        }

        data.localizations.push(LocalizationRow {
            project: project_slug.to_string(),
            locale: locale_code.to_string(),
            stats,
        });
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn projects(
        &self,
        viewer: &AuthContext,
        scope: ProjectScope,
        prefetch: &[Prefetch],
    ) -> Result<Vec<ProjectRecord>> {
        let data = self.read()?;

        data.projects
            .values()
            .filter(|project| viewer.can_view(project) && scope.admits(project))
            .map(|project| data.project_record(project, prefetch))
            .collect()
    }

    async fn project(
        &self,
        viewer: &AuthContext,
        slug: &str,
        prefetch: &[Prefetch],
    ) -> Result<Option<ProjectRecord>> {
        let data = self.read()?;

        data.projects
            .get(slug)
            .filter(|project| viewer.can_view(project))
            .map(|project| data.project_record(project, prefetch))
            .transpose()
    }

    async fn locales(&self, prefetch: &[Prefetch]) -> Result<Vec<LocaleRecord>> {
        let data = self.read()?;

        data.locales
            .values()
            .map(|locale| data.locale_record(locale, prefetch))
            .collect()
    }

    async fn locale(&self, code: &str, prefetch: &[Prefetch]) -> Result<Option<LocaleRecord>> {
        let data = self.read()?;

        data.locales
            .get(code)
            .map(|locale| data.locale_record(locale, prefetch))
            .transpose()
    }

    async fn project_localizations(&self, project_slug: &str) -> Result<Vec<Localization>> {
        self.read()?.localizations_of_project(project_slug)
    }

    async fn project_tags(&self, project_slug: &str) -> Result<Vec<Tag>> {
        Ok(self.read()?.tags_of_project(project_slug))
    }

    async fn locale_localizations(
        &self,
        viewer: &AuthContext,
        locale_code: &str,
        scope: ProjectScope,
    ) -> Result<Vec<Localization>> {
        let all = self.read()?.localizations_of_locale(locale_code)?;
        Ok(scope.filter_localizations(viewer, &all))
    }
}
