/*!
 * In-memory records of translatable models.
 *
 * A `TranslatableRecord` is the shared entity plus a cache of its
 * translation rows, grouped by relation name and keyed by language code.
 * Stores fill the cache when loading a record and persist the modified
 * entries from it when saving translations.
 */

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use super::meta::ModelMeta;
use crate::errors::ConfigurationError;

/// One translation row: the translated fields of a shared record in one language
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRecord {
    /// Database ID, `None` until saved
    pub id: Option<i64>,
    /// ID of the shared record, `None` until saved
    pub master_id: Option<i64>,
    /// Language of this row
    pub language_code: String,
    values: Map<String, Value>,
    modified: bool,
}

impl TranslationRecord {
    /// Create an unsaved translation for a language
    pub fn new(language_code: impl Into<String>) -> Self {
        Self {
            id: None,
            master_id: None,
            language_code: language_code.into(),
            values: Map::new(),
            modified: true,
        }
    }

    /// Rebuild a translation loaded from storage
    pub fn from_row(id: i64, master_id: i64, language_code: String, values: Map<String, Value>) -> Self {
        Self {
            id: Some(id),
            master_id: Some(master_id),
            language_code,
            values,
            modified: false,
        }
    }

    /// Get a translated value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a translated value, marking the row as modified when it changes
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        if self.values.get(&field) != Some(&value) {
            self.values.insert(field, value);
            self.modified = true;
        }
    }

    /// All translated values
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Whether the row needs to be written
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Record the identity assigned by the store
    pub fn mark_saved(&mut self, id: i64, master_id: i64) {
        self.id = Some(id);
        self.master_id = Some(master_id);
        self.modified = false;
    }
}

/// A shared record together with its cached translations
#[derive(Debug, Clone)]
pub struct TranslatableRecord {
    meta: Arc<ModelMeta>,
    id: Option<i64>,
    values: Map<String, Value>,
    current_language: String,
    fallback_language: Option<String>,
    translations: BTreeMap<String, BTreeMap<String, TranslationRecord>>,
    related: BTreeMap<String, Vec<TranslatableRecord>>,
}

impl TranslatableRecord {
    /// Create an unsaved record in the given language
    pub fn new(meta: Arc<ModelMeta>, language_code: impl Into<String>) -> Self {
        let language_code = language_code.into();
        Self {
            meta,
            id: None,
            values: Map::new(),
            fallback_language: Some(language_code.clone()),
            current_language: language_code,
            translations: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    pub fn meta(&self) -> &Arc<ModelMeta> {
        &self.meta
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Record the ID assigned by the store
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    /// Get a shared value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a shared value
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    /// All shared values
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get_current_language(&self) -> &str {
        &self.current_language
    }

    pub fn set_current_language(&mut self, language_code: impl Into<String>) {
        self.current_language = language_code.into();
    }

    pub fn fallback_language(&self) -> Option<&str> {
        self.fallback_language.as_deref()
    }

    /// Language used by `translated` when the current language has no row
    pub fn set_fallback_language(&mut self, language_code: Option<String>) {
        self.fallback_language = language_code;
    }

    /// Cached translations of a group, ordered by language code
    pub fn translations(&self, rel_name: &str) -> impl Iterator<Item = &TranslationRecord> {
        self.translations
            .get(rel_name)
            .into_iter()
            .flat_map(|by_language| by_language.values())
    }

    /// Language codes cached for a group
    pub fn translated_languages(&self, rel_name: &str) -> Vec<&str> {
        self.translations(rel_name)
            .map(|t| t.language_code.as_str())
            .collect()
    }

    /// Cached translation of a group in one language
    pub fn translation(&self, rel_name: &str, language_code: &str) -> Option<&TranslationRecord> {
        self.translations.get(rel_name)?.get(language_code)
    }

    pub fn translation_mut(&mut self, rel_name: &str, language_code: &str) -> Option<&mut TranslationRecord> {
        self.translations.get_mut(rel_name)?.get_mut(language_code)
    }

    /// Put a translation in the cache, replacing any previous entry for its language
    pub fn cache_translation(&mut self, rel_name: &str, translation: TranslationRecord) {
        self.translations
            .entry(rel_name.to_string())
            .or_default()
            .insert(translation.language_code.clone(), translation);
    }

    /// Cached translation of a group in one language, created with `create`
    /// on a cache miss
    ///
    /// `create` receives the record ID so it can look the row up in storage.
    pub fn get_or_insert_translation_with<E>(
        &mut self,
        rel_name: &str,
        language_code: &str,
        create: impl FnOnce(Option<i64>) -> Result<TranslationRecord, E>,
    ) -> Result<&mut TranslationRecord, E> {
        let id = self.id;
        let by_language = self.translations.entry(rel_name.to_string()).or_default();
        match by_language.entry(language_code.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(create(id)?)),
        }
    }

    /// All modified cached translations, with their relation name
    pub fn modified_translations_mut(&mut self) -> impl Iterator<Item = (&str, &mut TranslationRecord)> {
        self.translations.iter_mut().flat_map(|(rel_name, by_language)| {
            by_language
                .values_mut()
                .filter(|t| t.is_modified())
                .map(move |t| (rel_name.as_str(), t))
        })
    }

    /// Read a translated attribute in a given language, falling back to the
    /// fallback language when that language has no row
    pub fn translated_in(&self, field: &str, language_code: &str) -> Option<&Value> {
        let group = self.meta.get_model_by_field(field)?;
        let value = self
            .translation(&group.rel_name, language_code)
            .and_then(|t| t.get(field));
        if value.is_some() {
            return value;
        }
        let fallback = self.fallback_language.as_deref()?;
        if fallback == language_code {
            return None;
        }
        self.translation(&group.rel_name, fallback)
            .and_then(|t| t.get(field))
    }

    /// Read a translated attribute in the current language
    pub fn translated(&self, field: &str) -> Option<&Value> {
        self.translated_in(field, &self.current_language)
    }

    /// Write a translated attribute in the current language
    pub fn set_translated(&mut self, field: &str, value: Value) -> Result<(), ConfigurationError> {
        let rel_name = self
            .meta
            .get_model_by_field(field)
            .map(|group| group.rel_name.clone())
            .ok_or_else(|| ConfigurationError::UnknownField {
                model: self.meta.name.clone(),
                field: field.to_string(),
            })?;
        let language_code = self.current_language.clone();

        if self.translation(&rel_name, &language_code).is_none() {
            self.cache_translation(&rel_name, TranslationRecord::new(language_code.clone()));
        }
        if let Some(translation) = self.translation_mut(&rel_name, &language_code) {
            translation.set(field, value);
        }
        Ok(())
    }

    /// Attach related records, exposed by nested serializers
    pub fn attach_related(&mut self, name: impl Into<String>, records: Vec<TranslatableRecord>) {
        self.related.insert(name.into(), records);
    }

    pub fn related(&self, name: &str) -> &[TranslatableRecord] {
        self.related.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
