/*!
 * Repository layer for database operations.
 *
 * This module implements `TranslationStore` over SQLite, abstracting away
 * the SQL details. Every model has to be registered once, which creates
 * its tables and records its definition.
 */

use anyhow::{Context, anyhow};
use log::{debug, info, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Map;
use std::sync::Arc;

use super::columns::{from_sql, to_sql};
use super::connection::DatabaseConnection;
use super::schema::{create_model_tables, quote};
use super::store::TranslationStore;
use crate::errors::StoreError;
use crate::fields::FieldSpec;
use crate::models::{ModelMeta, TranslatableRecord, TranslationMeta, TranslationRecord};

/// Language new records are loaded in when none is configured
const DEFAULT_LANGUAGE: &str = "en";

/// Repository for database operations
#[derive(Debug, Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
    /// Current and fallback language of loaded records
    default_language: String,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> anyhow::Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> anyhow::Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Load records in this language, falling back to it for missing translations
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Model Registration
    // =========================================================================

    /// Create the tables of a model and record its definition
    ///
    /// Registering the same model again is a no-op. Existing tables are never
    /// altered; a changed definition is only reported.
    pub fn register(&self, meta: &ModelMeta) -> Result<(), StoreError> {
        let definition = serde_json::to_string(meta).context("Failed to serialize model definition")?;

        self.db.transaction(|tx| {
            create_model_tables(tx, meta)?;

            let stored: Option<String> = tx
                .query_row(
                    "SELECT definition FROM translatable_models WHERE name = ?1",
                    [&meta.name],
                    |row| row.get(0),
                )
                .optional()?;

            match stored {
                None => {
                    tx.execute(
                        "INSERT INTO translatable_models (name, definition, registered_at) VALUES (?1, ?2, ?3)",
                        params![meta.name, definition, chrono::Utc::now().to_rfc3339()],
                    )?;
                    info!("Registered model {}", meta.name);
                }
                Some(stored) if stored != definition => {
                    warn!(
                        "Model {} was registered with a different definition, existing tables are kept",
                        meta.name
                    );
                    tx.execute(
                        "UPDATE translatable_models SET definition = ?2, registered_at = ?3 WHERE name = ?1",
                        params![meta.name, definition, chrono::Utc::now().to_rfc3339()],
                    )?;
                }
                Some(_) => debug!("Model {} is already registered", meta.name),
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Names of all registered models
    pub fn registered_models(&self) -> Result<Vec<String>, StoreError> {
        let names = self.db.execute(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM translatable_models ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })?;
        Ok(names)
    }

    fn ensure_registered(&self, meta: &ModelMeta) -> Result<(), StoreError> {
        let registered = self.db.execute(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM translatable_models WHERE name = ?1",
                    [&meta.name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })?;

        if registered {
            Ok(())
        } else {
            Err(StoreError::UnregisteredModel(meta.name.clone()))
        }
    }

    // =========================================================================
    // Row Helpers
    // =========================================================================

    fn select_translations(
        conn: &Connection,
        table: &str,
        fields: &[FieldSpec],
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> anyhow::Result<Vec<TranslationRecord>> {
        let columns: Vec<String> = fields.iter().map(|f| quote(&f.name)).collect();
        let sql = format!(
            "SELECT id, master_id, language_code{}{} FROM {} WHERE {} ORDER BY language_code",
            if columns.is_empty() { "" } else { ", " },
            columns.join(", "),
            quote(table),
            filter
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params)?;
        let mut translations = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Map::new();
            for (i, field) in fields.iter().enumerate() {
                values.insert(field.name.clone(), from_sql(&field.kind, row.get_ref(i + 3)?)?);
            }
            translations.push(TranslationRecord::from_row(row.get(0)?, row.get(1)?, row.get(2)?, values));
        }
        Ok(translations)
    }

    fn translation_group<'m>(meta: &'m ModelMeta, rel_name: &str) -> anyhow::Result<&'m TranslationMeta> {
        meta.translation(rel_name)
            .ok_or_else(|| anyhow!("Model {} has no translation group '{}'", meta.name, rel_name))
    }
}

impl TranslationStore for Repository {
    fn save(&self, record: &mut TranslatableRecord) -> Result<(), StoreError> {
        let meta = record.meta().clone();
        self.ensure_registered(&meta)?;

        let table = quote(&meta.table_name());
        let values: Vec<SqlValue> = meta
            .fields
            .iter()
            .map(|f| record.get(&f.name).map(to_sql).unwrap_or(SqlValue::Null))
            .collect();

        match record.id() {
            None => {
                let id = self.db.execute(|conn| {
                    if meta.fields.is_empty() {
                        conn.execute(&format!("INSERT INTO {} DEFAULT VALUES", table), [])?;
                    } else {
                        let columns: Vec<String> = meta.fields.iter().map(|f| quote(&f.name)).collect();
                        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
                        conn.execute(
                            &format!(
                                "INSERT INTO {} ({}) VALUES ({})",
                                table,
                                columns.join(", "),
                                placeholders.join(", ")
                            ),
                            params_from_iter(values.iter()),
                        )?;
                    }
                    Ok(conn.last_insert_rowid())
                })?;
                record.set_id(id);
                debug!("Inserted {} {}", meta.name, id);
            }
            Some(id) => {
                if meta.fields.is_empty() {
                    return Ok(());
                }
                let assignments: Vec<String> = meta
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, f)| format!("{} = ?{}", quote(&f.name), i + 1))
                    .collect();
                let changed = self.db.execute(|conn| {
                    let mut params = values.clone();
                    params.push(SqlValue::Integer(id));
                    let changed = conn.execute(
                        &format!(
                            "UPDATE {} SET {} WHERE id = ?{}",
                            table,
                            assignments.join(", "),
                            params.len()
                        ),
                        params_from_iter(params.iter()),
                    )?;
                    Ok(changed)
                })?;
                if changed == 0 {
                    return Err(StoreError::NotFound {
                        model: meta.name.clone(),
                        id,
                    });
                }
                debug!("Updated {} {}", meta.name, id);
            }
        }
        Ok(())
    }

    fn get(&self, meta: &Arc<ModelMeta>, id: i64) -> Result<TranslatableRecord, StoreError> {
        self.ensure_registered(meta)?;

        let loaded = self.db.execute(|conn| {
            let columns: Vec<String> = meta.fields.iter().map(|f| quote(&f.name)).collect();
            let sql = format!(
                "SELECT id{}{} FROM {} WHERE id = ?1",
                if columns.is_empty() { "" } else { ", " },
                columns.join(", "),
                quote(&meta.table_name())
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([id])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let mut values = Map::new();
            for (i, field) in meta.fields.iter().enumerate() {
                values.insert(field.name.clone(), from_sql(&field.kind, row.get_ref(i + 1)?)?);
            }

            // Prefetch all translations of every group
            let mut translations = Vec::with_capacity(meta.translations.len());
            for group in &meta.translations {
                let rows = Self::select_translations(
                    conn,
                    &meta.translation_table(group),
                    &group.fields,
                    "master_id = ?1",
                    params![id],
                )?;
                translations.push((group.rel_name.clone(), rows));
            }
            Ok(Some((values, translations)))
        })?;

        let (values, translations) = loaded.ok_or_else(|| StoreError::NotFound {
            model: meta.name.clone(),
            id,
        })?;

        let mut record = TranslatableRecord::new(meta.clone(), self.default_language.clone());
        record.set_id(id);
        for (name, value) in values {
            record.set(name, value);
        }
        for (rel_name, rows) in translations {
            for translation in rows {
                record.cache_translation(&rel_name, translation);
            }
        }
        debug!(
            "Loaded {} {} with {} translation(s)",
            meta.name,
            id,
            meta.translations
                .iter()
                .map(|g| record.translated_languages(&g.rel_name).len())
                .sum::<usize>()
        );
        Ok(record)
    }

    fn load_translation(
        &self,
        meta: &ModelMeta,
        master_id: i64,
        rel_name: &str,
        language_code: &str,
    ) -> Result<Option<TranslationRecord>, StoreError> {
        self.ensure_registered(meta)?;

        let translation = self.db.execute(|conn| {
            let group = Self::translation_group(meta, rel_name)?;
            let rows = Self::select_translations(
                conn,
                &meta.translation_table(group),
                &group.fields,
                "master_id = ?1 AND language_code = ?2",
                params![master_id, language_code],
            )?;
            Ok(rows.into_iter().next())
        })?;
        Ok(translation)
    }

    fn save_translations(&self, record: &mut TranslatableRecord) -> Result<(), StoreError> {
        let meta = record.meta().clone();
        let master_id = record
            .id()
            .ok_or_else(|| StoreError::Unsaved(meta.name.clone()))?;
        self.ensure_registered(&meta)?;

        let mut pending: Vec<(&str, &mut TranslationRecord)> = record.modified_translations_mut().collect();
        if pending.is_empty() {
            debug!("No modified translations for {} {}", meta.name, master_id);
            return Ok(());
        }

        let ids = self.db.transaction(|tx| {
            let mut ids = Vec::with_capacity(pending.len());
            for (rel_name, translation) in &pending {
                let group = Self::translation_group(&meta, rel_name)?;
                let table = quote(&meta.translation_table(group));

                let mut columns = vec!["language_code".to_string(), "master_id".to_string()];
                let mut values = vec![
                    SqlValue::Text(translation.language_code.clone()),
                    SqlValue::Integer(master_id),
                ];
                for field in &group.fields {
                    columns.push(quote(&field.name));
                    values.push(
                        translation
                            .get(&field.name)
                            .map(to_sql)
                            .unwrap_or_else(|| to_sql(&field.empty_value())),
                    );
                }

                let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
                let on_conflict = if group.fields.is_empty() {
                    "DO NOTHING".to_string()
                } else {
                    let updates: Vec<String> = group
                        .fields
                        .iter()
                        .map(|f| format!("{0} = excluded.{0}", quote(&f.name)))
                        .collect();
                    format!("DO UPDATE SET {}", updates.join(", "))
                };

                tx.execute(
                    &format!(
                        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(language_code, master_id) {}",
                        table,
                        columns.join(", "),
                        placeholders.join(", "),
                        on_conflict
                    ),
                    params_from_iter(values.iter()),
                )?;

                let id: i64 = tx.query_row(
                    &format!(
                        "SELECT id FROM {} WHERE language_code = ?1 AND master_id = ?2",
                        table
                    ),
                    params![translation.language_code, master_id],
                    |row| row.get(0),
                )?;
                ids.push(id);
            }
            Ok(ids)
        })?;

        for ((_, translation), id) in pending.iter_mut().zip(ids) {
            translation.mark_saved(id, master_id);
        }
        info!(
            "Saved {} translation(s) of {} {}",
            pending.len(),
            meta.name,
            master_id
        );
        Ok(())
    }
}
