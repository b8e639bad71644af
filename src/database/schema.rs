/*!
 * Database schema definitions and migrations.
 *
 * The bookkeeping tables (schema version, registered models) are created
 * when a connection is opened. Model tables are created per registered
 * model: one shared table plus one table per translation group, each with
 * at most one row per (language_code, master_id).
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

use crate::fields::FieldKind;
use crate::models::ModelMeta;
use crate::models::meta::LANGUAGE_CODE_MAX_LENGTH;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Enforce the master_id references of translation tables
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_bookkeeping_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating database schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create the tables every database carries
fn create_bookkeeping_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS translatable_models (
            name TEXT PRIMARY KEY,
            definition TEXT NOT NULL,
            registered_at TEXT NOT NULL
        );
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}

/// Migrate the schema from one version to another
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    // v1 is the first released schema, so there are no steps yet
    if from_version < SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Unknown schema version: {}. Cannot migrate.",
            from_version
        ));
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}

/// Quote an identifier for use in SQL
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Column type of a field kind
pub fn column_type(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Char | FieldKind::Url | FieldKind::Choice(_) => "TEXT",
        FieldKind::Integer | FieldKind::Boolean => "INTEGER",
        FieldKind::Float => "REAL",
    }
}

/// Create the shared table and translation tables of a model
pub fn create_model_tables(conn: &Connection, meta: &ModelMeta) -> Result<()> {
    let shared_table = meta.table_name();

    let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for field in &meta.fields {
        let mut column = format!("{} {}", quote(&field.name), column_type(&field.kind));
        if field.unique {
            column.push_str(" UNIQUE");
        }
        columns.push(column);
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
        quote(&shared_table),
        columns.join(",\n    ")
    );

    for translation in &meta.translations {
        let table = meta.translation_table(translation);

        let mut columns = vec![
            "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            format!(
                "language_code TEXT NOT NULL CHECK (length(language_code) <= {})",
                LANGUAGE_CODE_MAX_LENGTH
            ),
            format!(
                "master_id INTEGER NOT NULL REFERENCES {}(id) ON DELETE CASCADE",
                quote(&shared_table)
            ),
        ];
        for field in &translation.fields {
            let mut column = format!("{} {}", quote(&field.name), column_type(&field.kind));
            if field.unique {
                column.push_str(" UNIQUE");
            }
            columns.push(column);
        }
        columns.push("UNIQUE(language_code, master_id)".to_string());

        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
            quote(&table),
            columns.join(",\n    ")
        ));
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}(master_id);\n",
            quote(&format!("idx_{}_master", table)),
            quote(&table)
        ));
    }

    debug!("Creating tables for {}:\n{}", meta.name, sql);
    conn.execute_batch(&sql)
        .with_context(|| format!("Failed to create tables for model {}", meta.name))?;
    Ok(())
}
