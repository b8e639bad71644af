/*!
 * Translation schemas: the per-translation sub-serializer.
 *
 * A `Schema` serializes and validates a single translation row. It is
 * either declared explicitly (to expose a subset of the translated fields,
 * or to add a translated absolute URL) or synthesized from a model's
 * translation group by `create_translated_fields_serializer`.
 */

use serde_json::{Map, Value};

use super::spec::FieldSpec;
use super::translated::TranslatedAbsoluteUrlField;
use crate::errors::{ConfigurationError, SerializeError, ValidationErrors};
use crate::models::meta::{LANGUAGE_CODE_FIELD, LANGUAGE_CODE_MAX_LENGTH};
use crate::models::{ModelMeta, TranslatableRecord, TranslationRecord};
use crate::serializers::SerializerContext;

/// Key used for errors that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Model a schema was declared for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaTarget {
    /// A translation group of a shared model
    Translation { model: String, rel_name: String },
    /// The shared model itself
    Shared { model: String },
}

#[derive(Debug, Clone)]
enum SchemaField {
    Value(FieldSpec),
    AbsoluteUrl(String, TranslatedAbsoluteUrlField),
}

impl SchemaField {
    fn name(&self) -> &str {
        match self {
            SchemaField::Value(spec) => &spec.name,
            SchemaField::AbsoluteUrl(name, _) => name,
        }
    }
}

/// Serializer for the rows of one model
#[derive(Debug, Clone)]
pub struct Schema {
    target: SchemaTarget,
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Declare a schema over a translation group, exposing the given fields
    ///
    /// `language_code` may be listed; it is read from the row itself.
    pub fn for_translation(meta: &ModelMeta, rel_name: &str, fields: &[&str]) -> Result<Self, ConfigurationError> {
        let group = meta
            .translation(rel_name)
            .ok_or_else(|| ConfigurationError::UnknownTranslationGroup {
                model: meta.name.clone(),
                rel_name: rel_name.to_string(),
            })?;

        let mut schema = Self {
            target: SchemaTarget::Translation {
                model: meta.name.clone(),
                rel_name: rel_name.to_string(),
            },
            fields: Vec::with_capacity(fields.len()),
        };

        for name in fields {
            let spec = if *name == LANGUAGE_CODE_FIELD {
                FieldSpec::char(LANGUAGE_CODE_FIELD, LANGUAGE_CODE_MAX_LENGTH)
            } else {
                group
                    .field(name)
                    .cloned()
                    .ok_or_else(|| ConfigurationError::UnknownField {
                        model: format!("{}.{}", meta.name, rel_name),
                        field: name.to_string(),
                    })?
            };
            schema.push(SchemaField::Value(spec))?;
        }

        Ok(schema)
    }

    /// Declare a schema over the shared fields of a model
    pub fn for_shared(meta: &ModelMeta, fields: &[&str]) -> Result<Self, ConfigurationError> {
        let mut schema = Self {
            target: SchemaTarget::Shared {
                model: meta.name.clone(),
            },
            fields: Vec::with_capacity(fields.len()),
        };

        for name in fields {
            let spec = meta
                .shared_field(name)
                .cloned()
                .ok_or_else(|| ConfigurationError::UnknownField {
                    model: meta.name.clone(),
                    field: name.to_string(),
                })?;
            schema.push(SchemaField::Value(spec))?;
        }

        Ok(schema)
    }

    /// Add a read-only absolute URL field, checking its placeholders against the model
    pub fn with_absolute_url(
        mut self,
        meta: &ModelMeta,
        name: &str,
        field: TranslatedAbsoluteUrlField,
    ) -> Result<Self, ConfigurationError> {
        if !self.is_translation_schema() {
            return Err(ConfigurationError::NotTranslationSchema(name.to_string()));
        }
        field.check_placeholders(meta)?;
        self.push(SchemaField::AbsoluteUrl(name.to_string(), field))?;
        Ok(self)
    }

    fn push(&mut self, field: SchemaField) -> Result<(), ConfigurationError> {
        if self.has_field(field.name()) {
            return Err(ConfigurationError::DuplicateField(field.name().to_string()));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn target(&self) -> &SchemaTarget {
        &self.target
    }

    /// Whether the schema describes translation rows
    pub fn is_translation_schema(&self) -> bool {
        matches!(self.target, SchemaTarget::Translation { .. })
    }

    /// Relation name of the translation group, if any
    pub fn rel_name(&self) -> Option<&str> {
        match &self.target {
            SchemaTarget::Translation { rel_name, .. } => Some(rel_name),
            SchemaTarget::Shared { .. } => None,
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name() == name)
    }

    /// Names of the exposed fields, in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(SchemaField::name).collect()
    }

    /// Serialize one translation row
    pub fn to_representation(
        &self,
        translation: &TranslationRecord,
        master: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<Value, SerializeError> {
        let mut output = Map::new();
        for field in &self.fields {
            let value = match field {
                SchemaField::Value(spec) if spec.name == LANGUAGE_CODE_FIELD => {
                    Value::String(translation.language_code.clone())
                }
                SchemaField::Value(spec) => translation
                    .get(&spec.name)
                    .cloned()
                    .unwrap_or(Value::Null),
                SchemaField::AbsoluteUrl(name, url_field) => {
                    Value::String(url_field.to_representation(name, translation, master, context)?)
                }
            };
            output.insert(field.name().to_string(), value);
        }
        Ok(Value::Object(output))
    }

    /// Validate the payload of one translation row
    pub fn validate(&self, data: &Value) -> Result<Map<String, Value>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let Some(input) = data.as_object() else {
            errors.add_message(NON_FIELD_ERRORS, invalid_data_message(data));
            return Err(errors);
        };

        let mut validated = Map::new();
        for field in &self.fields {
            let SchemaField::Value(spec) = field else {
                continue;
            };
            match spec.validate(input.get(&spec.name), false) {
                Ok(Some(value)) => {
                    validated.insert(spec.name.clone(), value);
                }
                Ok(None) => {}
                Err(messages) => {
                    for message in messages {
                        errors.add_message(spec.name.clone(), message);
                    }
                }
            }
        }

        errors.into_result()?;
        Ok(validated)
    }
}

/// Build the schema of a translation group
///
/// With `fields` set to `None` every translated field is exposed, plus the
/// `language_code` column.
pub fn create_translated_fields_serializer(
    meta: &ModelMeta,
    rel_name: &str,
    fields: Option<&[&str]>,
) -> Result<Schema, ConfigurationError> {
    let group = meta
        .translation(rel_name)
        .ok_or_else(|| ConfigurationError::UnknownTranslationGroup {
            model: meta.name.clone(),
            rel_name: rel_name.to_string(),
        })?;

    match fields {
        Some(fields) => Schema::for_translation(meta, rel_name, fields),
        None => {
            let mut all_fields = group.get_translated_fields();
            all_fields.push(LANGUAGE_CODE_FIELD);
            Schema::for_translation(meta, rel_name, &all_fields)
        }
    }
}

/// Message for input that is not an object
pub fn invalid_data_message(data: &Value) -> String {
    format!(
        "Invalid data. Expected a dictionary, but got {}.",
        json_type_name(data)
    )
}

/// Name of a JSON value type, as shown in error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
