//! Catalog entities exposed through the GraphQL API
//!
//! Models serialize with snake_case keys; the GraphQL layer maps its
//! camelCase field names onto them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Translation-progress counters shared by projects, locales and localizations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatedStats {
    pub total_strings: i64,
    pub approved_strings: i64,
    pub fuzzy_strings: i64,
    pub strings_with_errors: i64,
    pub strings_with_warnings: i64,
    pub unreviewed_strings: i64,
}

impl AggregatedStats {
    /// Strings that have no usable translation yet
    pub fn missing_strings(&self) -> i64 {
        self.total_strings
            - self.approved_strings
            - self.fuzzy_strings
            - self.strings_with_errors
            - self.strings_with_warnings
    }

    /// Every string is approved or approved-with-warnings
    pub fn complete(&self) -> bool {
        self.total_strings == self.approved_strings + self.strings_with_warnings
    }
}

impl AddAssign for AggregatedStats {
    fn add_assign(&mut self, other: Self) {
        self.total_strings += other.total_strings;
        self.approved_strings += other.approved_strings;
        self.fuzzy_strings += other.fuzzy_strings;
        self.strings_with_errors += other.strings_with_errors;
        self.strings_with_warnings += other.strings_with_warnings;
        self.unreviewed_strings += other.unreviewed_strings;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// Text direction of a locale's script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub slug: String,
    pub disabled: bool,
    pub sync_disabled: bool,
    pub pretranslation_enabled: bool,
    pub visibility: Visibility,
    pub system_project: bool,
    pub info: String,
    pub deadline: Option<NaiveDate>,
    pub priority: i32,
    /// Display name of the project's contact person
    pub contact: Option<String>,
    #[serde(flatten)]
    pub stats: AggregatedStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    pub name: String,
    pub code: String,
    pub direction: Direction,
    /// Comma-separated CLDR plural category indexes, e.g. `"1,5"`
    pub cldr_plurals: String,
    pub plural_rule: String,
    pub script: String,
    pub population: i64,
    #[serde(flatten)]
    pub stats: AggregatedStats,
    pub google_translate_code: String,
    pub ms_translator_code: String,
    pub systran_translate_code: String,
    pub ms_terminology_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub slug: String,
    pub name: String,
    pub priority: Option<i32>,
    /// Slug of the owning project, if any
    pub project: Option<String>,
}

/// A project translated into a locale (a `ProjectLocale` in the API)
#[derive(Debug, Clone, PartialEq)]
pub struct Localization {
    pub project: Project,
    pub locale: Locale,
    pub stats: AggregatedStats,
}
