/*!
 * Saving translated data.
 *
 * `TranslatableSave` splits validated data into shared values and
 * translation payloads, lets the model serializer create or update the
 * shared record, then writes every payload into the translation row of its
 * language and persists the modified rows through the store.
 */

use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::base::{BoundField, ModelSerializer, ModelSerializerBuilder};
use super::{Serializer, SerializerContext};
use crate::database::TranslationStore;
use crate::errors::{ConfigurationError, SaveError, SerializeError, ValidationErrors};
use crate::models::{ModelMeta, TranslatableRecord};

/// Translation payloads popped from validated data
///
/// Keyed by relation name (payload: language code to field values) or by
/// translated attribute (payload: language code to value).
pub type TranslatedData = BTreeMap<String, Map<String, Value>>;

/// Save behaviour shared by translation-aware serializers
pub trait TranslatableSave {
    /// The serializer performing validation and the shared save
    fn model_serializer(&self) -> &ModelSerializer;

    /// Save validated data, then its translations
    ///
    /// The shared record is always written first so new translation rows
    /// can reference it.
    fn save<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        instance: Option<TranslatableRecord>,
        mut validated: Map<String, Value>,
        context: &SerializerContext,
    ) -> Result<TranslatableRecord, SaveError> {
        let translated_data = self.pop_translated_data(&mut validated, context);
        let mut instance = self
            .model_serializer()
            .perform_save(store, instance, validated, context)?;
        self.save_translations(store, &mut instance, translated_data)?;
        Ok(instance)
    }

    /// Remove the translation payloads from validated data
    fn pop_translated_data(&self, validated: &mut Map<String, Value>, _context: &SerializerContext) -> TranslatedData {
        let mut translated_data = TranslatedData::new();
        for (_, field) in self.model_serializer().fields() {
            let key = match field {
                BoundField::TranslatedFields(field) => field.source(),
                BoundField::Translated(field) => field.attribute(),
                _ => continue,
            };
            if let Some(Value::Object(translations)) = validated.remove(key) {
                if !translations.is_empty() {
                    translated_data.insert(key.to_string(), translations);
                }
            }
        }
        translated_data
    }

    /// Write translation payloads into the record's translation rows
    ///
    /// Rows are fetched or created per language and group, then all
    /// modified rows are persisted by the store's `save_translations`.
    fn save_translations<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        instance: &mut TranslatableRecord,
        translated_data: TranslatedData,
    ) -> Result<(), SaveError> {
        let meta = instance.meta().clone();

        for (key, translations) in translated_data {
            let (rel_name, attribute) = if meta.translation(&key).is_some() {
                (key.clone(), None)
            } else if let Some(group) = meta.get_model_by_field(&key) {
                (group.rel_name.clone(), Some(key.clone()))
            } else {
                return Err(SaveError::UnexpectedField {
                    model: meta.name.clone(),
                    field: key,
                });
            };

            for (language_code, payload) in translations {
                debug!(
                    "Writing '{}' translation of {} {} ({})",
                    language_code,
                    meta.name,
                    instance.id().unwrap_or_default(),
                    key
                );
                let translation = store.translated_model(instance, &rel_name, &language_code)?;
                match (&attribute, payload) {
                    (Some(attribute), value) => translation.set(attribute.clone(), value),
                    (None, Value::Object(values)) => {
                        for (field, value) in values {
                            if meta.translation(&rel_name).is_some_and(|g| g.has_field(&field)) {
                                translation.set(field, value);
                            } else {
                                return Err(SaveError::UnexpectedField {
                                    model: format!("{}.{}", meta.name, rel_name),
                                    field,
                                });
                            }
                        }
                    }
                    (None, _) => {}
                }
            }
        }

        // Always go through the store hook, never write rows directly
        store.save_translations(instance)?;
        info!(
            "Saved translations of {} {}",
            meta.name,
            instance.id().unwrap_or_default()
        );
        Ok(())
    }
}

/// Model serializer saving its translated fields automatically
#[derive(Debug, Clone)]
pub struct TranslatableModelSerializer {
    serializer: ModelSerializer,
}

impl TranslatableModelSerializer {
    /// Build from a configured `ModelSerializer::builder`
    pub fn new(builder: ModelSerializerBuilder) -> Result<Self, ConfigurationError> {
        Ok(Self {
            serializer: builder.build()?,
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

impl TranslatableSave for TranslatableModelSerializer {
    fn model_serializer(&self) -> &ModelSerializer {
        &self.serializer
    }
}

impl Serializer for TranslatableModelSerializer {
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
