/*!
 * Storage contract for translatable records.
 */

use std::sync::Arc;

use crate::errors::StoreError;
use crate::models::{ModelMeta, TranslatableRecord, TranslationRecord};

/// Persistence of shared records and their translation rows
pub trait TranslationStore {
    /// Insert or update the shared row of a record, assigning its ID on insert
    fn save(&self, record: &mut TranslatableRecord) -> Result<(), StoreError>;

    /// Load a shared record with all its translations
    fn get(&self, meta: &Arc<ModelMeta>, id: i64) -> Result<TranslatableRecord, StoreError>;

    /// Load a single translation row
    fn load_translation(
        &self,
        meta: &ModelMeta,
        master_id: i64,
        rel_name: &str,
        language_code: &str,
    ) -> Result<Option<TranslationRecord>, StoreError>;

    /// Persist every modified translation of a saved record
    fn save_translations(&self, record: &mut TranslatableRecord) -> Result<(), StoreError>;

    /// Fetch or create the translation row of a group in one language
    ///
    /// Looks in the record cache first, then in storage, and finally
    /// creates an unsaved row. The row is cached on the record either way.
    fn translated_model<'a>(
        &self,
        record: &'a mut TranslatableRecord,
        rel_name: &str,
        language_code: &str,
    ) -> Result<&'a mut TranslationRecord, StoreError> {
        let meta = record.meta().clone();
        if meta.translation(rel_name).is_none() {
            return Err(StoreError::Database(anyhow::anyhow!(
                "Model {} has no translation group '{}'",
                meta.name,
                rel_name
            )));
        }

        record.get_or_insert_translation_with(rel_name, language_code, |id| {
            let loaded = match id {
                Some(id) => self.load_translation(&meta, id, rel_name, language_code)?,
                None => None,
            };
            Ok(loaded.unwrap_or_else(|| TranslationRecord::new(language_code)))
        })
    }

    /// Save the shared row, then the modified translations
    fn save_all(&self, record: &mut TranslatableRecord) -> Result<(), StoreError> {
        self.save(record)?;
        self.save_translations(record)
    }
}
