//! YAML catalog seeds for the in-memory store
//!
//! ```yaml
//! locales:
//!   - code: fr
//!     name: French
//!     cldr_plurals: "1,5"
//! projects:
//!   - slug: firefox
//!     name: Firefox
//!     visibility: public
//! tags:
//!   - slug: browser
//!     name: Browser
//!     project: firefox
//! localizations:
//!   - project: firefox
//!     locale: fr
//!     total_strings: 120
//!     approved_strings: 100
//! ```

use crate::core::{AggregatedStats, Locale, Project, Tag};
use anyhow::{Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));

static LOCALE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]+)*$").expect("valid locale code regex")
});

/// One `ProjectLocale` row of a seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationSeed {
    pub project: String,
    pub locale: String,
    #[serde(flatten)]
    pub stats: AggregatedStats,
}

/// Complete content of a catalog seed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub locales: Vec<Locale>,
    pub projects: Vec<Project>,
    pub tags: Vec<Tag>,
    pub localizations: Vec<LocalizationSeed>,
}

impl CatalogSeed {
    /// Load a seed from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read catalog seed {}: {}", path, e))?;
        Self::from_yaml_str(&content)
    }

    /// Load a seed from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let seed: Self = serde_yaml::from_str(yaml)?;
        Ok(seed)
    }

    /// Check key formats, uniqueness and references
    pub fn validate(&self) -> Result<()> {
        let mut codes = HashSet::new();
        for locale in &self.locales {
            if !LOCALE_CODE.is_match(&locale.code) {
                bail!("Invalid locale code '{}'", locale.code);
            }
            if !codes.insert(locale.code.as_str()) {
                bail!("Duplicate locale code '{}'", locale.code);
            }
        }

        let mut slugs = HashSet::new();
        for project in &self.projects {
            if !SLUG.is_match(&project.slug) {
                bail!("Invalid project slug '{}'", project.slug);
            }
            if !slugs.insert(project.slug.as_str()) {
                bail!("Duplicate project slug '{}'", project.slug);
            }
        }

        for tag in &self.tags {
            if !SLUG.is_match(&tag.slug) {
                bail!("Invalid tag slug '{}'", tag.slug);
            }
            if let Some(project) = &tag.project
                && !slugs.contains(project.as_str())
            {
                bail!("Tag '{}' references unknown project '{}'", tag.slug, project);
            }
        }

        let mut pairs = HashSet::new();
        for localization in &self.localizations {
            if !slugs.contains(localization.project.as_str()) {
                bail!(
                    "Localization references unknown project '{}'",
                    localization.project
                );
            }
            if !codes.contains(localization.locale.as_str()) {
                bail!(
                    "Localization references unknown locale '{}'",
                    localization.locale
                );
            }
            if !pairs.insert((localization.project.as_str(), localization.locale.as_str())) {
                bail!(
                    "Duplicate localization {}/{}",
                    localization.project,
                    localization.locale
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Visibility;
    use std::io::Write;

    const SEED: &str = r#"
locales:
  - code: fr
    name: French
    cldr_plurals: "1,5"
  - code: pt-BR
    name: Portuguese
projects:
  - slug: firefox
    name: Firefox
    visibility: public
    deadline: 2026-12-01
  - slug: pontoon-intro
    name: Tutorial
    system_project: true
tags:
  - slug: browser
    name: Browser
    priority: 5
    project: firefox
localizations:
  - project: firefox
    locale: fr
    total_strings: 120
    approved_strings: 100
"#;

    #[test]
    fn test_parse_seed() {
        let seed = CatalogSeed::from_yaml_str(SEED).expect("should parse");
        assert_eq!(seed.locales.len(), 2);
        assert_eq!(seed.projects[0].visibility, Visibility::Public);
        assert_eq!(seed.projects[1].visibility, Visibility::Private);
        assert!(seed.projects[1].system_project);
        assert_eq!(seed.localizations[0].stats.total_strings, 120);
        assert_eq!(seed.localizations[0].stats.fuzzy_strings, 0);
        seed.validate().expect("seed should be valid");
    }

    #[test]
    fn test_load_seed_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SEED.as_bytes()).expect("write seed");
        let path = file.path().to_str().expect("utf-8 path");

        let seed = CatalogSeed::from_yaml_file(path).expect("should load");
        assert_eq!(seed.tags[0].project.as_deref(), Some("firefox"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = CatalogSeed::from_yaml_file("/nonexistent/catalog.yaml").expect_err("no file");
        assert!(err.to_string().contains("Failed to read catalog seed"));
    }

    #[test]
    fn test_invalid_slug_is_rejected() {
        let mut seed = CatalogSeed::from_yaml_str(SEED).expect("should parse");
        seed.projects[0].slug = "fire fox".to_string();
        let err = seed.validate().expect_err("invalid slug");
        assert!(err.to_string().contains("Invalid project slug"));
    }

    #[test]
    fn test_invalid_locale_code_is_rejected() {
        let mut seed = CatalogSeed::from_yaml_str(SEED).expect("should parse");
        seed.locales[0].code = "f".to_string();
        assert!(seed.validate().is_err());
    }

    #[test]
    fn test_duplicate_localization_is_rejected() {
        let mut seed = CatalogSeed::from_yaml_str(SEED).expect("should parse");
        let duplicate = seed.localizations[0].clone();
        seed.localizations.push(duplicate);
        let err = seed.validate().expect_err("duplicate pair");
        assert!(err.to_string().contains("Duplicate localization"));
    }

    #[test]
    fn test_dangling_locale_is_rejected() {
        let mut seed = CatalogSeed::from_yaml_str(SEED).expect("should parse");
        seed.localizations[0].locale = "de".to_string();
        let err = seed.validate().expect_err("unknown locale");
        assert!(err.to_string().contains("unknown locale 'de'"));
    }
}
