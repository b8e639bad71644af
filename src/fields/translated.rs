/*!
 * Serializer fields for translated data.
 *
 * - `TranslatedFieldsField`: all translated fields of a group, nested per
 *   language: `{"en": {"name": ...}, "es": {"name": ...}}`
 * - `TranslatedField`: one translated attribute in every language:
 *   `{"en": "Spain", "es": "España"}`
 * - `TranslatedAbsoluteUrlField`: an absolute URL per translation, used
 *   inside a translation `Schema`
 *
 * Fields are declared unbound and bound to their parent model when the
 * serializer is built; all configuration errors surface at that point.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::schema::{Schema, SchemaTarget, create_translated_fields_serializer};
use super::spec::FieldSpec;
use crate::errors::{ConfigurationError, ErrorDetail, FieldError, SerializeError};
use crate::models::meta::LANGUAGE_CODE_FIELD;
use crate::models::{ModelMeta, TranslatableRecord, TranslationRecord};
use crate::serializers::SerializerContext;

/// Message for translation input that is not an object
pub const INVALID_DICT_MESSAGE: &str = "Input is not a valid dict";

/// Message for an empty translation object
pub const EMPTY_MESSAGE: &str = "This field may not be empty.";

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex"));

/// Exposes all translated fields of a translation group, keyed by language
#[derive(Debug, Clone)]
pub struct TranslatedFieldsField {
    serializer: Option<Schema>,
    shared_model: Option<Arc<ModelMeta>>,
    source: Option<String>,
    allow_empty: bool,
    required: bool,
}

impl Default for TranslatedFieldsField {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslatedFieldsField {
    pub fn new() -> Self {
        Self {
            serializer: None,
            shared_model: None,
            source: None,
            allow_empty: false,
            required: true,
        }
    }

    /// Use an explicit translation schema instead of synthesizing one
    pub fn with_serializer(mut self, schema: Schema) -> Self {
        self.serializer = Some(schema);
        self
    }

    /// Read the translation group from this model instead of the parent's
    pub fn shared_model(mut self, meta: Arc<ModelMeta>) -> Self {
        self.shared_model = Some(meta);
        self
    }

    /// Relation name, when it differs from the field name
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Accept `{}` as input
    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Bind the field to its name and parent model
    ///
    /// When no schema was given, one is created from the translated fields
    /// of the shared model's group named after the relation.
    pub fn bind(self, field_name: &str, parent: &ModelMeta) -> Result<BoundTranslatedFieldsField, ConfigurationError> {
        if !parent.is_translatable() {
            return Err(ConfigurationError::NotTranslatable {
                model: parent.name.clone(),
                field: field_name.to_string(),
            });
        }

        // Allow `source` as an alias of the relation name, not a dotted path
        let related_name = self.source.clone().unwrap_or_else(|| field_name.to_string());

        let schema = match self.serializer {
            Some(schema) => {
                let shared_model = self.shared_model.as_deref().unwrap_or(parent);
                match schema.target() {
                    SchemaTarget::Translation { model, rel_name }
                        if *model == shared_model.name && *rel_name == related_name => {}
                    SchemaTarget::Translation { model, rel_name } => {
                        return Err(ConfigurationError::SchemaMismatch {
                            field: field_name.to_string(),
                            expected: format!("{}.{}", shared_model.name, related_name),
                            found: format!("{}.{}", model, rel_name),
                        });
                    }
                    SchemaTarget::Shared { .. } => {
                        return Err(ConfigurationError::NotTranslationSchema(field_name.to_string()));
                    }
                }
                schema
            }
            None => {
                let shared_model = self.shared_model.as_deref().unwrap_or(parent);
                let group = shared_model.translation(&related_name).ok_or_else(|| {
                    ConfigurationError::UnknownTranslationGroup {
                        model: shared_model.name.clone(),
                        rel_name: related_name.clone(),
                    }
                })?;
                let fields = group.get_translated_fields();
                create_translated_fields_serializer(shared_model, &related_name, Some(&fields))?
            }
        };

        // The output is already split per language
        if schema.has_field(LANGUAGE_CODE_FIELD) {
            return Err(ConfigurationError::LanguageCodeField);
        }

        Ok(BoundTranslatedFieldsField {
            field_name: field_name.to_string(),
            source: related_name,
            schema,
            allow_empty: self.allow_empty,
            required: self.required,
        })
    }
}

/// A `TranslatedFieldsField` bound to a serializer
#[derive(Debug, Clone)]
pub struct BoundTranslatedFieldsField {
    field_name: String,
    source: String,
    schema: Schema,
    allow_empty: bool,
    required: bool,
}

impl BoundTranslatedFieldsField {
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Relation name the translations are read from and saved to
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Serialize the cached translations of a record
    ///
    /// Output languages can be restricted with `languages` in the context.
    pub fn to_representation(
        &self,
        record: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<Value, SerializeError> {
        let languages = context.languages.as_deref().filter(|l| !l.is_empty());

        let mut result = Map::new();
        for translation in record.translations(&self.source) {
            if let Some(languages) = languages {
                if !languages.iter().any(|l| *l == translation.language_code) {
                    continue;
                }
            }
            let value = self.schema.to_representation(translation, record, context)?;
            result.insert(translation.language_code.clone(), value);
        }
        Ok(Value::Object(result))
    }

    /// Validate the payload of every language independently
    ///
    /// `null` yields `None`. Errors of all languages are reported together
    /// and no partial result is returned.
    pub fn to_internal_value(&self, data: &Value) -> Result<Option<Map<String, Value>>, FieldError> {
        let input = match data {
            Value::Null => return Ok(None),
            Value::Object(input) => input,
            _ => return Err(FieldError::Invalid(INVALID_DICT_MESSAGE.to_string())),
        };
        if !self.allow_empty && input.is_empty() {
            return Err(FieldError::Empty(EMPTY_MESSAGE.to_string()));
        }

        let mut result = Map::new();
        let mut errors = BTreeMap::new();
        for (language_code, model_fields) in input {
            match self.schema.validate(model_fields) {
                Ok(validated) => {
                    result.insert(language_code.clone(), Value::Object(validated));
                }
                Err(language_errors) => {
                    debug!(
                        "Translation '{}' of field '{}' is invalid: {}",
                        language_code, self.field_name, language_errors
                    );
                    errors.insert(language_code.clone(), language_errors.into_detail());
                }
            }
        }

        if !errors.is_empty() {
            return Err(FieldError::Nested(ErrorDetail::Nested(errors)));
        }
        Ok(Some(result))
    }
}

/// Exposes a single translated attribute in all its languages
#[derive(Debug, Clone, Default)]
pub struct TranslatedField {
    source: Option<String>,
    required: bool,
}

impl TranslatedField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute name, when it differs from the field name
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Bind the field, resolving the translation group owning the attribute
    pub fn bind(self, field_name: &str, parent: &ModelMeta) -> Result<BoundTranslatedField, ConfigurationError> {
        let attribute = self.source.unwrap_or_else(|| field_name.to_string());
        let group = parent
            .get_model_by_field(&attribute)
            .ok_or_else(|| ConfigurationError::UnknownField {
                model: parent.name.clone(),
                field: attribute.clone(),
            })?;
        let spec = group
            .field(&attribute)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownField {
                model: parent.name.clone(),
                field: attribute.clone(),
            })?;

        Ok(BoundTranslatedField {
            field_name: field_name.to_string(),
            rel_name: group.rel_name.clone(),
            attribute,
            spec,
            required: self.required,
        })
    }
}

/// A `TranslatedField` bound to a serializer
#[derive(Debug, Clone)]
pub struct BoundTranslatedField {
    field_name: String,
    rel_name: String,
    attribute: String,
    spec: FieldSpec,
    required: bool,
}

impl BoundTranslatedField {
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Translated attribute the values are read from and saved to
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn rel_name(&self) -> &str {
        &self.rel_name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Combine the attribute of every cached translation into one object
    pub fn to_representation(&self, record: &TranslatableRecord) -> Value {
        let mut value = Map::new();
        for translation in record.translations(&self.rel_name) {
            if let Some(attribute) = translation.get(&self.attribute) {
                value.insert(translation.language_code.clone(), attribute.clone());
            }
        }
        Value::Object(value)
    }

    /// Validate `{"<lang>": value}` against the attribute's field spec
    pub fn to_internal_value(&self, data: &Value) -> Result<Option<Map<String, Value>>, FieldError> {
        let input = match data {
            Value::Null => return Ok(None),
            Value::Object(input) => input,
            _ => return Err(FieldError::Invalid(INVALID_DICT_MESSAGE.to_string())),
        };

        let mut result = Map::new();
        let mut errors = BTreeMap::new();
        for (language_code, value) in input {
            match self.spec.validate(Some(value), false) {
                Ok(Some(validated)) => {
                    result.insert(language_code.clone(), validated);
                }
                Ok(None) => {}
                Err(messages) => {
                    errors.insert(language_code.clone(), ErrorDetail::Messages(messages));
                }
            }
        }

        if !errors.is_empty() {
            return Err(FieldError::Nested(ErrorDetail::Nested(errors)));
        }
        Ok(Some(result))
    }
}

/// Absolute URL of the page of a translation
///
/// The path template may reference `{language_code}`, `{id}`, shared
/// fields and translated fields; it is joined onto the request base URL
/// from the serializer context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedAbsoluteUrlField {
    template: String,
}

impl TranslatedAbsoluteUrlField {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Check every placeholder names something the model can provide
    pub(crate) fn check_placeholders(&self, meta: &ModelMeta) -> Result<(), ConfigurationError> {
        for capture in PLACEHOLDER_REGEX.captures_iter(&self.template) {
            let name = &capture[1];
            let known = name == LANGUAGE_CODE_FIELD
                || name == "id"
                || name == "pk"
                || meta.shared_field(name).is_some()
                || meta.get_model_by_field(name).is_some();
            if !known {
                return Err(ConfigurationError::UnknownPlaceholder(name.to_string()));
            }
        }
        Ok(())
    }

    /// Build the absolute URL for one translation
    pub fn to_representation(
        &self,
        field_name: &str,
        translation: &TranslationRecord,
        master: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<String, SerializeError> {
        let base_url = context
            .base_url
            .as_ref()
            .ok_or_else(|| SerializeError::MissingRequest(field_name.to_string()))?;

        let path = PLACEHOLDER_REGEX.replace_all(&self.template, |capture: &regex::Captures<'_>| {
            let name = &capture[1];
            let value = match name {
                LANGUAGE_CODE_FIELD => Some(Value::String(translation.language_code.clone())),
                "id" | "pk" => master.id().map(Value::from),
                _ => translation
                    .get(name)
                    .or_else(|| master.get(name))
                    .cloned(),
            };
            match value {
                Some(Value::String(s)) => s,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        });

        base_url
            .join(&path)
            .map(|url| url.to_string())
            .map_err(|e| SerializeError::InvalidUrl {
                field: field_name.to_string(),
                message: e.to_string(),
            })
    }
}
