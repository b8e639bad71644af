/*!
 * Error types for the linguarest library.
 *
 * This module contains custom error types for the different layers of the
 * library, using the thiserror crate for ergonomic error definitions.
 * Validation failures are structured (field name or language code to
 * messages) so they can be returned to API clients as JSON.
 */

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Structured detail of a validation failure
///
/// Mirrors the shape REST clients expect: a list of messages for a plain
/// field, a map for nested objects (for example one entry per language code),
/// or a list of details for a nested list of objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// Messages for a single field
    Messages(Vec<String>),
    /// Errors keyed by a nested field name or language code
    Nested(BTreeMap<String, ErrorDetail>),
    /// Errors of a list of nested objects, one slot per item
    Items(Vec<ErrorDetail>),
}

impl ErrorDetail {
    /// Create a detail holding a single message
    pub fn message(message: impl Into<String>) -> Self {
        Self::Messages(vec![message.into()])
    }

    /// An empty detail, used for valid items of a nested list
    pub fn empty() -> Self {
        Self::Nested(BTreeMap::new())
    }

    /// Whether the detail carries no error at all
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Messages(messages) => messages.is_empty(),
            Self::Nested(map) => map.is_empty(),
            Self::Items(items) => items.iter().all(ErrorDetail::is_empty),
        }
    }

    /// Get the messages of a leaf detail
    pub fn messages(&self) -> Option<&[String]> {
        match self {
            Self::Messages(messages) => Some(messages),
            _ => None,
        }
    }

    /// Get a nested detail by key
    pub fn get(&self, key: &str) -> Option<&ErrorDetail> {
        match self {
            Self::Nested(map) => map.get(key),
            _ => None,
        }
    }

    /// Keys of a nested detail, in sorted order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Nested(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// Aggregated validation errors keyed by field name
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
#[error("Validation failed: {}", serde_json::to_string(.0).unwrap_or_default())]
pub struct ValidationErrors(pub BTreeMap<String, ErrorDetail>);

impl ValidationErrors {
    /// Create an empty error collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a detail for a field, merging messages if the field already has some
    pub fn add(&mut self, field: impl Into<String>, detail: ErrorDetail) {
        let field = field.into();
        match (self.0.remove(&field), detail) {
            (Some(ErrorDetail::Messages(mut existing)), ErrorDetail::Messages(more)) => {
                existing.extend(more);
                self.0.insert(field, ErrorDetail::Messages(existing));
            }
            (_, detail) => {
                self.0.insert(field, detail);
            }
        }
    }

    /// Record a single message for a field
    pub fn add_message(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.add(field, ErrorDetail::message(message));
    }

    /// Whether no error was recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the detail for a field
    pub fn get(&self, field: &str) -> Option<&ErrorDetail> {
        self.0.get(field)
    }

    /// Whether the field has an error
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Convert into a nested detail, used when a whole object fails inside a parent
    pub fn into_detail(self) -> ErrorDetail {
        ErrorDetail::Nested(self.0)
    }

    /// Turn the collection into a `Result`
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Failure of a single field while converting input data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Input has the wrong shape, e.g. a string where an object is expected
    #[error("{0}")]
    Invalid(String),

    /// An empty object was supplied where at least one entry is required
    #[error("{0}")]
    Empty(String),

    /// Structured errors of the nested values
    #[error("{0}")]
    Nested(ErrorDetail),
}

impl FieldError {
    /// Convert into the detail stored under the field name
    pub fn into_detail(self) -> ErrorDetail {
        match self {
            Self::Invalid(message) | Self::Empty(message) => ErrorDetail::message(message),
            Self::Nested(detail) => detail,
        }
    }
}

/// Misconfiguration detected while declaring models or binding serializers
///
/// These are programming errors: they surface when a serializer is built,
/// never while handling data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The parent model has no translation groups
    #[error("Expected a translatable model for field '{field}', but '{model}' has no translations")]
    NotTranslatable { model: String, field: String },

    /// An explicit sub-serializer does not describe a translation model
    #[error("Expected a translation model schema for field '{0}'")]
    NotTranslationSchema(String),

    /// The translation sub-serializer exposes the language code
    #[error("Serializer may not have a 'language_code' field")]
    LanguageCodeField,

    /// An explicit sub-serializer was declared for another model or translation group
    #[error("Serializer of field '{field}' describes '{found}', expected '{expected}'")]
    SchemaMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// No translation group with the given relation name
    #[error("Model '{model}' has no translation group named '{rel_name}'")]
    UnknownTranslationGroup { model: String, rel_name: String },

    /// A declared field does not exist on the model
    #[error("Field '{field}' is not declared on model '{model}'")]
    UnknownField { model: String, field: String },

    /// A field was declared twice
    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    /// A reserved name was used for a model field
    #[error("'{0}' is a reserved field name")]
    ReservedName(String),

    /// A name cannot be used as an SQL identifier
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// A configured language code is not a valid ISO code
    #[error("Invalid language code: '{0}'")]
    InvalidLanguage(String),

    /// A path template references a placeholder that cannot be resolved
    #[error("Unknown placeholder '{{{0}}}' in URL template")]
    UnknownPlaceholder(String),
}

/// Errors raised by a translation store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error from the underlying database
    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),

    /// The shared record does not exist
    #[error("{model} with id {id} does not exist")]
    NotFound { model: String, id: i64 },

    /// The record must be saved before its translations
    #[error("{0} must be saved before its translations")]
    Unsaved(String),

    /// The model was never registered with the store
    #[error("Model '{0}' is not registered")]
    UnregisteredModel(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.into())
    }
}

/// Errors raised while producing a representation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// A field needs the request base URL but the context has none
    #[error("Field '{0}' requires a request base URL in the serializer context")]
    MissingRequest(String),

    /// A URL could not be built
    #[error("Cannot build URL for field '{field}': {message}")]
    InvalidUrl { field: String, message: String },
}

/// Errors raised while saving validated data
#[derive(Error, Debug)]
pub enum SaveError {
    /// Error from the store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validated data names a field the model does not have
    #[error("Unexpected field '{field}' for model '{model}'")]
    UnexpectedField { model: String, field: String },

    /// Nested payloads must be saved by the caller
    #[error("Writable nested field '{0}' is not supported, save nested records explicitly")]
    WritableNested(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Invalid input data
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// Error from the store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error while serializing
    #[error("Serialization error: {0}")]
    Serialize(#[from] SerializeError),

    /// Error while saving
    #[error("Save error: {0}")]
    Save(#[from] SaveError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
