/*!
 * Flat serializer: translated attributes of one language at the top level.
 *
 * Output looks like `{"pk": 1, "country_code": "ES", "language_code": "es",
 * "name": "España"}`. On input the translated attributes are saved to the
 * language given by `language_code`, else the request language, else the
 * default language.
 */

use log::debug;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::base::{ModelSerializer, ModelSerializerBuilder};
use super::translatable::{TranslatableSave, TranslatedData};
use super::{Serializer, SerializerContext};
use crate::errors::{ConfigurationError, SerializeError, ValidationErrors};
use crate::models::meta::LANGUAGE_CODE_FIELD;
use crate::models::{ModelMeta, TranslatableRecord};

#[derive(Debug, Clone)]
pub struct TranslatableFlatModelSerializer {
    serializer: ModelSerializer,
}

impl TranslatableFlatModelSerializer {
    /// Build from a configured `ModelSerializer::builder`
    ///
    /// Listed translated attributes become plain fields and `language_code`
    /// becomes an optional choice over the configured languages.
    pub fn new(builder: ModelSerializerBuilder) -> Result<Self, ConfigurationError> {
        Ok(Self {
            serializer: builder.build_flat()?,
        })
    }

    pub fn serializer(&self) -> &ModelSerializer {
        &self.serializer
    }

    pub fn to_representation(
        &self,
        record: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<Value, SerializeError> {
        self.serializer.to_representation(record, context)
    }

    pub fn validate(
        &self,
        data: &Value,
        partial: bool,
        context: &SerializerContext,
    ) -> Result<Map<String, Value>, ValidationErrors> {
        self.serializer.validate(data, partial, context)
    }
}

impl TranslatableSave for TranslatableFlatModelSerializer {
    fn model_serializer(&self) -> &ModelSerializer {
        &self.serializer
    }

    /// Move the translated attributes into one payload per translation group
    fn pop_translated_data(&self, validated: &mut Map<String, Value>, context: &SerializerContext) -> TranslatedData {
        let language_code = match validated.remove(LANGUAGE_CODE_FIELD) {
            Some(Value::String(code)) if !code.is_empty() => code,
            _ => self.serializer.active_language(context).to_string(),
        };

        let meta = self.serializer.meta();
        let mut translated_data = TranslatedData::new();
        for group in &meta.translations {
            let mut fields = Map::new();
            for field in group.get_translated_fields() {
                if let Some(value) = validated.remove(field) {
                    fields.insert(field.to_string(), value);
                }
            }
            if fields.is_empty() {
                continue;
            }
            debug!(
                "Saving {} field(s) of '{}' in '{}'",
                fields.len(),
                group.rel_name,
                language_code
            );
            let mut translations = Map::new();
            translations.insert(language_code.clone(), Value::Object(fields));
            translated_data.insert(group.rel_name.clone(), translations);
        }
        translated_data
    }
}

impl Serializer for TranslatableFlatModelSerializer {
    fn meta(&self) -> &Arc<ModelMeta> {
        self.serializer.meta()
    }

    fn to_representation(
        &self,
        record: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<Value, SerializeError> {
        self.serializer.to_representation(record, context)
    }

    fn validate(
        &self,
        data: &Value,
        partial: bool,
        context: &SerializerContext,
    ) -> Result<Map<String, Value>, ValidationErrors> {
        self.serializer.validate(data, partial, context)
    }
}
