/*!
 * # linguarest - REST serializers for translatable records
 *
 * A Rust library mapping multilingual database records to a nested JSON
 * representation keyed by language code, and back.
 *
 * ## Features
 *
 * - Serialize all translations of a record as `{"en": {...}, "es": {...}}`
 * - Validate translation payloads per language, reporting every failing
 *   language at once
 * - Save shared values first, then create or update one translation row
 *   per language
 * - Flat serializers exposing a single language at the top level
 * - SQLite storage with one table per translation group
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management (languages, models, database)
 * - `models`: Model declarations and in-memory records
 * - `fields`: Serializer fields:
 *   - `fields::spec`: Field declarations and value validation
 *   - `fields::schema`: The per-translation sub-serializer
 *   - `fields::translated`: Fields exposing translated data
 * - `serializers`: Model serializers:
 *   - `serializers::base`: Generic model serializer
 *   - `serializers::translatable`: Translation-aware saving
 *   - `serializers::flat`: Single-language serializer
 * - `database`: Storage contract and its SQLite implementation
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod fields;
pub mod language_utils;
pub mod models;
pub mod serializers;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{Repository, TranslationStore};
pub use errors::{AppError, ConfigurationError, ErrorDetail, SaveError, SerializeError, StoreError, ValidationErrors};
pub use fields::{
    FieldKind, FieldSpec, Schema, TranslatedAbsoluteUrlField, TranslatedField, TranslatedFieldsField,
    create_translated_fields_serializer,
};
pub use models::{ModelMeta, TranslatableRecord, TranslationMeta, TranslationRecord};
pub use serializers::{
    ModelSerializer, Serializer, SerializerContext, TranslatableFlatModelSerializer, TranslatableModelSerializer,
    TranslatableSave,
};
