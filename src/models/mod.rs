/*!
 * Translatable model declarations and records.
 *
 * - `meta`: shared model and translation group descriptors
 * - `record`: in-memory shared records and their translation rows
 */

pub mod meta;
pub mod record;

pub use meta::{LANGUAGE_CODE_FIELD, ModelMeta, TranslationMeta};
pub use record::{TranslatableRecord, TranslationRecord};
