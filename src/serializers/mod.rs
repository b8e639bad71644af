/*!
 * Serializers for translatable models.
 *
 * - `base`: the generic model serializer (field declarations, validation,
 *   representation and the create-or-update step)
 * - `translatable`: the save mixin persisting translation payloads, and the
 *   serializer using it
 * - `flat`: a serializer exposing one language at the top level
 */

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::errors::{SerializeError, ValidationErrors};
use crate::models::{ModelMeta, TranslatableRecord};

pub mod base;
pub mod flat;
pub mod translatable;

pub use base::{BoundField, DeclaredField, ModelSerializer, ModelSerializerBuilder};
pub use flat::TranslatableFlatModelSerializer;
pub use translatable::{TranslatableModelSerializer, TranslatableSave, TranslatedData};

/// Request-scoped options passed to every serializer call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializerContext {
    /// Restrict translated output to these languages
    pub languages: Option<Vec<String>>,

    /// Active language of the request
    pub language: Option<String>,

    /// Base URL of the request, used to build absolute URLs
    pub base_url: Option<Url>,
}

impl SerializerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = Some(languages);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

/// Common interface of all model serializers, used for nesting
pub trait Serializer: fmt::Debug + Send + Sync {
    /// Model the serializer was built for
    fn meta(&self) -> &Arc<ModelMeta>;

    /// Serialize a record
    fn to_representation(
        &self,
        record: &TranslatableRecord,
        context: &SerializerContext,
    ) -> Result<Value, SerializeError>;

    /// Validate input data, returning the validated values keyed by source
    fn validate(
        &self,
        data: &Value,
        partial: bool,
        context: &SerializerContext,
    ) -> Result<Map<String, Value>, ValidationErrors>;
}
