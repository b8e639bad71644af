/*!
 * Generic model serializer.
 *
 * A `ModelSerializer` exposes an ordered list of fields of one model:
 * the primary key, shared model fields, translated fields and nested
 * serializers. It validates input into a map of validated values and
 * performs the create-or-update of the shared record; translation-aware
 * saving is layered on top by `TranslatableSave`.
 */

use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Serializer, SerializerContext};
use crate::app_config::Config;
use crate::database::TranslationStore;
use crate::errors::{ConfigurationError, ErrorDetail, SaveError, SerializeError, ValidationErrors};
use crate::fields::schema::{NON_FIELD_ERRORS, invalid_data_message, json_type_name};
use crate::fields::spec::{NULL_MESSAGE, REQUIRED_MESSAGE};
use crate::fields::{
    BoundTranslatedField, BoundTranslatedFieldsField, FieldSpec, TranslatedField, TranslatedFieldsField,
};
use crate::models::meta::{LANGUAGE_CODE_FIELD, LANGUAGE_CODE_MAX_LENGTH};
use crate::models::{ModelMeta, TranslatableRecord};

/// Language used when neither the request nor the configuration sets one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Names accepted for the primary key
const PK_NAMES: [&str; 2] = ["pk", "id"];

/// An explicitly declared field, bound when the serializer is built
#[derive(Debug, Clone)]
pub enum DeclaredField {
    TranslatedFields(TranslatedFieldsField),
    Translated(TranslatedField),
    Nested { serializer: Arc<dyn Serializer>, many: bool },
}

impl From<TranslatedFieldsField> for DeclaredField {
    fn from(field: TranslatedFieldsField) -> Self {
        DeclaredField::TranslatedFields(field)
    }
}

impl From<TranslatedField> for DeclaredField {
    fn from(field: TranslatedField) -> Self {
        DeclaredField::Translated(field)
    }
}

/// A field of a built serializer
#[derive(Debug, Clone)]
pub enum BoundField {
    /// Read-only primary key
    Pk,
    /// Shared model field
    Model(FieldSpec),
    /// All translations of a group, keyed by language
    TranslatedFields(BoundTranslatedFieldsField),
    /// One translated attribute, keyed by language
    Translated(BoundTranslatedField),
    /// Related records serialized by another serializer
    Nested { serializer: Arc<dyn Serializer>, many: bool },
    /// Translated attribute in the active language
    FlatTranslated { rel_name: String, spec: FieldSpec },
    /// Active language
    LanguageCode(FieldSpec),
}

/// Builder for `ModelSerializer`
#[derive(Debug, Clone)]
pub struct ModelSerializerBuilder {
    meta: Arc<ModelMeta>,
    fields: Option<Vec<String>>,
    declared: Vec<(String, DeclaredField)>,
    default_language: String,
    language_choices: Vec<String>,
}

impl ModelSerializerBuilder {
    fn new(meta: Arc<ModelMeta>) -> Self {
        Self {
            meta,
            fields: None,
            declared: Vec::new(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            language_choices: Vec::new(),
        }
    }

    /// Exposed fields, in output order
    ///
    /// Without this call the serializer exposes the primary key, all shared
    /// fields and all declared fields.
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Declare a field explicitly
    pub fn declare(mut self, name: impl Into<String>, field: impl Into<DeclaredField>) -> Self {
        self.declared.push((name.into(), field.into()));
        self
    }

    /// Declare a nested serializer for related records
    pub fn nested(mut self, name: impl Into<String>, serializer: Arc<dyn Serializer>, many: bool) -> Self {
        self.declared
            .push((name.into(), DeclaredField::Nested { serializer, many }));
        self
    }

    /// Language used when the request has none
    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Accepted values of the `language_code` field
    pub fn language_choices(mut self, languages: Vec<String>) -> Self {
        self.language_choices = languages;
        self
    }

    /// Take the default language and language choices from the configuration
    pub fn config(self, config: &Config) -> Self {
        self.default_language(config.default_language.clone())
            .language_choices(config.languages.clone())
    }

    /// Build a serializer exposing translations per language
    pub fn build(self) -> Result<ModelSerializer, ConfigurationError> {
        self.resolve(false)
    }

    /// Build a serializer exposing translated attributes of one language
    pub(crate) fn build_flat(self) -> Result<ModelSerializer, ConfigurationError> {
        self.resolve(true)
    }

    fn resolve(self, flat: bool) -> Result<ModelSerializer, ConfigurationError> {
        let names = match &self.fields {
            Some(fields) => fields.clone(),
            None => self.default_field_names(flat),
        };

        let mut declared: BTreeMap<String, DeclaredField> = BTreeMap::new();
        for (name, field) in self.declared {
            if declared.insert(name.clone(), field).is_some() {
                return Err(ConfigurationError::DuplicateField(name));
            }
        }

        let mut fields: Vec<(String, BoundField)> = Vec::with_capacity(names.len());
        for name in names {
            if fields.iter().any(|(existing, _)| *existing == name) {
                return Err(ConfigurationError::DuplicateField(name));
            }

            let bound = match declared.remove(&name) {
                Some(DeclaredField::TranslatedFields(field)) => {
                    BoundField::TranslatedFields(field.bind(&name, &self.meta)?)
                }
                Some(DeclaredField::Translated(field)) => BoundField::Translated(field.bind(&name, &self.meta)?),
                Some(DeclaredField::Nested { serializer, many }) => BoundField::Nested { serializer, many },
                None => Self::build_field(&self.meta, &name, flat, &self.language_choices)?,
            };
            fields.push((name, bound));
        }

        // Declared but not listed
        if let Some(name) = declared.into_keys().next() {
            return Err(ConfigurationError::UnknownField {
                model: self.meta.name.clone(),
                field: name,
            });
        }

        Ok(ModelSerializer {
            meta: self.meta,
            fields,
            default_language: self.default_language,
        })
    }

    fn default_field_names(&self, flat: bool) -> Vec<String> {
        let mut names = vec!["pk".to_string()];
        names.extend(self.meta.fields.iter().map(|f| f.name.clone()));
        if flat {
            names.extend(self.meta.get_all_fields().into_iter().map(String::from));
            names.push(LANGUAGE_CODE_FIELD.to_string());
        }
        names.extend(self.declared.iter().map(|(name, _)| name.clone()));
        names
    }

    /// Build a field that was listed but not declared
    fn build_field(
        meta: &ModelMeta,
        name: &str,
        flat: bool,
        language_choices: &[String],
    ) -> Result<BoundField, ConfigurationError> {
        if PK_NAMES.contains(&name) {
            return Ok(BoundField::Pk);
        }
        if let Some(spec) = meta.shared_field(name) {
            return Ok(BoundField::Model(spec.clone()));
        }
        if flat {
            if name == LANGUAGE_CODE_FIELD {
                return Ok(BoundField::LanguageCode(language_code_field(language_choices)));
            }
            if let Some(group) = meta.get_model_by_field(name) {
                if let Some(spec) = group.field(name) {
                    return Ok(BoundField::FlatTranslated {
                        rel_name: group.rel_name.clone(),
                        spec: spec.clone(),
                    });
                }
            }
        }
        Err(ConfigurationError::UnknownField {
            model: meta.name.clone(),
            field: name.to_string(),
        })
    }
}

/// Optional `language_code` input, restricted to the configured languages
fn language_code_field(choices: &[String]) -> FieldSpec {
    if choices.is_empty() {
        FieldSpec::char(LANGUAGE_CODE_FIELD, LANGUAGE_CODE_MAX_LENGTH).blank()
    } else {
        FieldSpec::choice(LANGUAGE_CODE_FIELD, choices.to_vec()).blank()
    }
}

/// Serializer over the fields of one model
#[derive(Debug, Clone)]
pub struct ModelSerializer {
    meta: Arc<ModelMeta>,
    fields: Vec<(String, BoundField)>,
    default_language: String,
}

impl ModelSerializer {
    pub fn builder(meta: Arc<ModelMeta>) -> ModelSerializerBuilder {
        ModelSerializerBuilder::new(meta)
    }

    pub fn meta(&self) -> &Arc<ModelMeta> {
        &self.meta
    }

    /// Bound fields, in output order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &BoundField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Language of the request, or the default language
    pub fn active_language<'a>(&'a self, context: &'a SerializerContext) -> &'a str {
        context.language.as_deref().unwrap_or(&self.default_language)
    }

    /// Language a flat representation of the record is rendered in
    fn representation_language<'a>(&self, record: &'a TranslatableRecord, context: &'a SerializerContext) -> &'a str {
        context
            .language
            .as_deref()
            .unwrap_or_else(|| record.get_current_language())
    }

    /// Serialize a record
    pub fn to_representation(
        &self,
        record: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<Value, SerializeError> {
        let language = self.representation_language(record, context);

        let mut output = Map::new();
        for (name, field) in &self.fields {
            let value = match field {
                BoundField::Pk => record.id().map(Value::from).unwrap_or(Value::Null),
                BoundField::Model(spec) => record.get(&spec.name).cloned().unwrap_or(Value::Null),
                BoundField::TranslatedFields(field) => field.to_representation(record, context)?,
                BoundField::Translated(field) => field.to_representation(record),
                BoundField::Nested { serializer, many } => {
                    let related = record.related(name);
                    if *many {
                        let items = related
                            .iter()
                            .map(|item| serializer.to_representation(item, context))
                            .collect::<Result<Vec<_>, _>>()?;
                        Value::Array(items)
                    } else {
                        match related.first() {
                            Some(item) => serializer.to_representation(item, context)?,
                            None => Value::Null,
                        }
                    }
                }
                BoundField::FlatTranslated { spec, .. } => record
                    .translated_in(&spec.name, language)
                    .or_else(|| record.translated_in(&spec.name, &self.default_language))
                    .cloned()
                    .unwrap_or(Value::Null),
                BoundField::LanguageCode(_) => Value::String(language.to_string()),
            };
            output.insert(name.clone(), value);
        }
        Ok(Value::Object(output))
    }

    /// Validate input data
    ///
    /// Errors of all fields are collected. Validated values are keyed by
    /// field source: the relation name for `TranslatedFieldsField`, the
    /// attribute for `TranslatedField`, the field name otherwise.
    pub fn validate(
        &self,
        data: &Value,
        partial: bool,
        context: &SerializerContext,
    ) -> Result<Map<String, Value>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let Some(input) = data.as_object() else {
            errors.add_message(NON_FIELD_ERRORS, invalid_data_message(data));
            return Err(errors);
        };

        let mut validated = Map::new();
        for (name, field) in &self.fields {
            let value = input.get(name);
            match field {
                BoundField::Pk => {}
                BoundField::Model(spec) | BoundField::FlatTranslated { spec, .. } | BoundField::LanguageCode(spec) => {
                    match spec.validate(value, partial) {
                        Ok(Some(value)) => {
                            validated.insert(name.clone(), value);
                        }
                        Ok(None) => {}
                        Err(messages) => errors.add(name.clone(), ErrorDetail::Messages(messages)),
                    }
                }
                BoundField::TranslatedFields(field) => {
                    let Some(value) = check_presence(name, value, field.is_required(), partial, &mut errors) else {
                        continue;
                    };
                    match field.to_internal_value(value) {
                        Ok(Some(translations)) => {
                            validated.insert(field.source().to_string(), Value::Object(translations));
                        }
                        Ok(None) => {}
                        Err(error) => errors.add(name.clone(), error.into_detail()),
                    }
                }
                BoundField::Translated(field) => {
                    let Some(value) = check_presence(name, value, field.is_required(), partial, &mut errors) else {
                        continue;
                    };
                    match field.to_internal_value(value) {
                        Ok(Some(translations)) => {
                            validated.insert(field.attribute().to_string(), Value::Object(translations));
                        }
                        Ok(None) => {}
                        Err(error) => errors.add(name.clone(), error.into_detail()),
                    }
                }
                BoundField::Nested { serializer, many } => {
                    let Some(value) = check_presence(name, value, true, partial, &mut errors) else {
                        continue;
                    };
                    match validate_nested(serializer.as_ref(), *many, value, context) {
                        Ok(value) => {
                            validated.insert(name.clone(), value);
                        }
                        Err(detail) => errors.add(name.clone(), detail),
                    }
                }
            }
        }

        errors.into_result()?;
        debug!("Validated {} field(s) for {}", validated.len(), self.meta.name);
        Ok(validated)
    }

    /// Create or update the shared record from validated data
    ///
    /// With `instance` set the record is updated in place, otherwise a new
    /// record is created in the active language. Only shared values are
    /// accepted; translated payloads must have been removed beforehand.
    pub fn perform_save<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        instance: Option<TranslatableRecord>,
        validated: Map<String, Value>,
        context: &SerializerContext,
    ) -> Result<TranslatableRecord, SaveError> {
        let creating = instance.is_none();
        let mut record = match instance {
            Some(record) => record,
            None => {
                let mut record = TranslatableRecord::new(self.meta.clone(), self.active_language(context));
                for spec in &self.meta.fields {
                    record.set(spec.name.clone(), spec.empty_value());
                }
                record
            }
        };

        for (key, value) in validated {
            if let Some((name, BoundField::Nested { .. })) = self.fields.iter().find(|(name, _)| *name == key) {
                return Err(SaveError::WritableNested(name.clone()));
            }
            if self.meta.shared_field(&key).is_none() {
                return Err(SaveError::UnexpectedField {
                    model: self.meta.name.clone(),
                    field: key,
                });
            }
            record.set(key, value);
        }

        store.save(&mut record)?;
        if creating {
            info!("Created {} {}", self.meta.name, record.id().unwrap_or_default());
        } else {
            info!("Updated {} {}", self.meta.name, record.id().unwrap_or_default());
        }
        Ok(record)
    }
}

impl Serializer for ModelSerializer {
    fn meta(&self) -> &Arc<ModelMeta> {
        &self.meta
    }

    fn to_representation(
        &self,
        record: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<Value, SerializeError> {
        ModelSerializer::to_representation(self, record, context)
    }

    fn validate(
        &self,
        data: &Value,
        partial: bool,
        context: &SerializerContext,
    ) -> Result<Map<String, Value>, ValidationErrors> {
        ModelSerializer::validate(self, data, partial, context)
    }
}

/// Apply the required and null checks of a composite field
///
/// Returns the value to convert, or `None` when the field is skipped or
/// an error was recorded.
fn check_presence<'a>(
    name: &str,
    value: Option<&'a Value>,
    required: bool,
    partial: bool,
    errors: &mut ValidationErrors,
) -> Option<&'a Value> {
    match value {
        None => {
            if required && !partial {
                errors.add_message(name, REQUIRED_MESSAGE);
            }
            None
        }
        Some(Value::Null) => {
            errors.add_message(name, NULL_MESSAGE);
            None
        }
        Some(value) => Some(value),
    }
}

/// Validate the payload of a nested serializer
fn validate_nested(
    serializer: &dyn Serializer,
    many: bool,
    value: &Value,
    context: &SerializerContext,
) -> Result<Value, ErrorDetail> {
    if !many {
        return serializer
            .validate(value, false, context)
            .map(Value::Object)
            .map_err(ValidationErrors::into_detail);
    }

    let Value::Array(items) = value else {
        return Err(ErrorDetail::message(format!(
            "Expected a list of items but got type \"{}\".",
            json_type_name(value)
        )));
    };

    let mut validated = Vec::with_capacity(items.len());
    let mut item_errors = Vec::with_capacity(items.len());
    for item in items {
        match serializer.validate(item, false, context) {
            Ok(item) => {
                validated.push(Value::Object(item));
                item_errors.push(ErrorDetail::empty());
            }
            Err(errors) => item_errors.push(errors.into_detail()),
        }
    }

    let detail = ErrorDetail::Items(item_errors);
    if !detail.is_empty() {
        return Err(detail);
    }
    Ok(Value::Array(validated))
}
