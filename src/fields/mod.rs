/*!
 * Serializer fields.
 *
 * - `spec`: field declarations and value validation
 * - `schema`: the per-translation sub-serializer
 * - `translated`: fields exposing translated data on a shared model
 */

pub mod schema;
pub mod spec;
pub mod translated;

pub use schema::{NON_FIELD_ERRORS, Schema, SchemaTarget, create_translated_fields_serializer};
pub use spec::{FieldKind, FieldSpec};
pub use translated::{
    BoundTranslatedField, BoundTranslatedFieldsField, TranslatedAbsoluteUrlField, TranslatedField,
    TranslatedFieldsField,
};
