/*!
 * Model metadata: the shared model and its translation groups.
 *
 * A translatable model is described once, at startup, as data. The shared
 * model owns the language-independent fields; each translation group owns
 * a set of translated fields stored in its own table, one row per language.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::ConfigurationError;
use crate::fields::FieldSpec;

/// Name of the language column of every translation table
pub const LANGUAGE_CODE_FIELD: &str = "language_code";

/// Maximum length of a stored language code
pub const LANGUAGE_CODE_MAX_LENGTH: usize = 15;

/// Names that cannot be declared as model fields
const RESERVED_NAMES: [&str; 4] = ["id", "pk", "master_id", LANGUAGE_CODE_FIELD];

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid identifier regex"));

/// Check that a name can be used as an SQL identifier
pub fn validate_identifier(name: &str) -> Result<(), ConfigurationError> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidIdentifier(name.to_string()))
    }
}

/// A group of translated fields stored in one translation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationMeta {
    /// Relation name used to reach the translations from the shared model
    pub rel_name: String,

    /// Table name, derived from the shared table when omitted
    #[serde(default)]
    pub table: Option<String>,

    /// Translated fields
    pub fields: Vec<FieldSpec>,
}

impl TranslationMeta {
    pub fn new(rel_name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            rel_name: rel_name.into(),
            table: None,
            fields,
        }
    }

    /// Use an explicit table name
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Names of the translated fields, in declaration order
    pub fn get_translated_fields(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Look up a translated field
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// Description of a translatable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Model name, e.g. "Country"
    pub name: String,

    /// Shared table name, derived from the model name when omitted
    #[serde(default)]
    pub table: Option<String>,

    /// Language-independent fields
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Translation groups
    #[serde(default)]
    pub translations: Vec<TranslationMeta>,
}

impl ModelMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
            translations: Vec::new(),
        }
    }

    /// Use an explicit shared table name
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add a shared field
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Add a translation group
    pub fn translated(mut self, translation: TranslationMeta) -> Self {
        self.translations.push(translation);
        self
    }

    /// Validate the declaration and freeze it for sharing between serializers
    pub fn build(self) -> Result<Arc<Self>, ConfigurationError> {
        self.validate()?;
        Ok(Arc::new(self))
    }

    /// Check names, reserved words and duplicates
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.table_name())?;

        let mut seen = HashSet::new();
        let all_fields = self
            .fields
            .iter()
            .chain(self.translations.iter().flat_map(|t| t.fields.iter()));

        for field in all_fields {
            validate_identifier(&field.name)?;
            if RESERVED_NAMES.contains(&field.name.as_str()) {
                return Err(ConfigurationError::ReservedName(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigurationError::DuplicateField(field.name.clone()));
            }
        }

        let mut tables = HashSet::new();
        tables.insert(self.table_name());
        for translation in &self.translations {
            validate_identifier(&translation.rel_name)?;
            if seen.contains(translation.rel_name.as_str()) {
                return Err(ConfigurationError::DuplicateField(translation.rel_name.clone()));
            }
            let table = self.translation_table(translation);
            validate_identifier(&table)?;
            if !tables.insert(table.clone()) {
                return Err(ConfigurationError::DuplicateField(table));
            }
        }

        Ok(())
    }

    /// Name of the shared table
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    /// Name of the table backing a translation group
    ///
    /// The first group defaults to `<table>_translation`, later groups to
    /// `<table>_<rel_name>`.
    pub fn translation_table(&self, translation: &TranslationMeta) -> String {
        if let Some(table) = &translation.table {
            return table.clone();
        }
        let is_root = self
            .translations
            .first()
            .is_some_and(|root| root.rel_name == translation.rel_name);
        if is_root {
            format!("{}_translation", self.table_name())
        } else {
            format!("{}_{}", self.table_name(), translation.rel_name)
        }
    }

    /// Whether the model has at least one translation group
    pub fn is_translatable(&self) -> bool {
        !self.translations.is_empty()
    }

    /// The first translation group
    pub fn root(&self) -> Option<&TranslationMeta> {
        self.translations.first()
    }

    /// Look up a translation group by relation name
    pub fn translation(&self, rel_name: &str) -> Option<&TranslationMeta> {
        self.translations.iter().find(|t| t.rel_name == rel_name)
    }

    /// Names of all translated fields across groups
    pub fn get_all_fields(&self) -> Vec<&str> {
        self.translations
            .iter()
            .flat_map(|t| t.get_translated_fields())
            .collect()
    }

    /// Find the translation group owning a translated field
    pub fn get_model_by_field(&self, field: &str) -> Option<&TranslationMeta> {
        self.translations.iter().find(|t| t.has_field(field))
    }

    /// Look up a shared field
    pub fn shared_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}
