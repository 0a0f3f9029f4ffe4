//! Store decorator recording every call made while serving one request
//!
//! The GraphQL executor wraps the host's store in a [`TracedStore`] per
//! request. The recorded calls back the `__debug` root field and make
//! prefetching observable: a prefetched relation costs one call in total,
//! a lazily loaded one costs a call per parent object.

use crate::core::{
    AuthContext, CatalogStore, LocaleRecord, Localization, Prefetch, ProjectRecord, ProjectScope,
    Tag,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// One recorded store call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreCall {
    pub operation: &'static str,
    pub detail: String,
}

pub struct TracedStore {
    inner: Arc<dyn CatalogStore>,
    calls: Mutex<Vec<StoreCall>>,
}

impl TracedStore {
    pub fn new(inner: Arc<dyn CatalogStore>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls recorded so far, in order
    pub fn calls(&self) -> Result<Vec<StoreCall>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .map_err(|e| anyhow!("Failed to acquire call log lock: {}", e))
    }

    fn record(&self, operation: &'static str, detail: String) -> Result<()> {
        tracing::trace!(operation, %detail, "store call");
        self.calls
            .lock()
            .map_err(|e| anyhow!("Failed to acquire call log lock: {}", e))?
            .push(StoreCall { operation, detail });
        Ok(())
    }
}

fn describe_prefetch(prefetch: &[Prefetch]) -> String {
    if prefetch.is_empty() {
        return String::new();
    }
    let names: Vec<String> = prefetch.iter().map(|p| format!("{:?}", p)).collect();
    format!(" prefetch=[{}]", names.join(","))
}

#[async_trait]
impl CatalogStore for TracedStore {
    async fn projects(
        &self,
        viewer: &AuthContext,
        scope: ProjectScope,
        prefetch: &[Prefetch],
    ) -> Result<Vec<ProjectRecord>> {
        self.record(
            "projects",
            format!(
                "include_disabled={} include_system={}{}",
                scope.include_disabled,
                scope.include_system,
                describe_prefetch(prefetch)
            ),
        )?;
        self.inner.projects(viewer, scope, prefetch).await
    }

    async fn project(
        &self,
        viewer: &AuthContext,
        slug: &str,
        prefetch: &[Prefetch],
    ) -> Result<Option<ProjectRecord>> {
        self.record(
            "project",
            format!("slug={}{}", slug, describe_prefetch(prefetch)),
        )?;
        self.inner.project(viewer, slug, prefetch).await
    }

    async fn locales(&self, prefetch: &[Prefetch]) -> Result<Vec<LocaleRecord>> {
        self.record("locales", describe_prefetch(prefetch).trim().to_string())?;
        self.inner.locales(prefetch).await
    }

    async fn locale(&self, code: &str, prefetch: &[Prefetch]) -> Result<Option<LocaleRecord>> {
        self.record(
            "locale",
            format!("code={}{}", code, describe_prefetch(prefetch)),
        )?;
        self.inner.locale(code, prefetch).await
    }

    async fn project_localizations(&self, project_slug: &str) -> Result<Vec<Localization>> {
        self.record("project_localizations", format!("project={}", project_slug))?;
        self.inner.project_localizations(project_slug).await
    }

    async fn project_tags(&self, project_slug: &str) -> Result<Vec<Tag>> {
        self.record("project_tags", format!("project={}", project_slug))?;
        self.inner.project_tags(project_slug).await
    }

    async fn locale_localizations(
        &self,
        viewer: &AuthContext,
        locale_code: &str,
        scope: ProjectScope,
    ) -> Result<Vec<Localization>> {
        self.record(
            "locale_localizations",
            format!(
                "locale={} include_disabled={} include_system={}",
                locale_code, scope.include_disabled, scope.include_system
            ),
        )?;
        self.inner
            .locale_localizations(viewer, locale_code, scope)
            .await
    }
}
