/*!
 * Database module for persistent storage of translatable records.
 *
 * This module provides:
 * - The `TranslationStore` contract used by the serializers
 * - A SQLite implementation (`Repository`) with per-model tables
 * - Schema bookkeeping and JSON/column value conversion
 */

pub mod columns;
pub mod connection;
pub mod repository;
pub mod schema;
pub mod store;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::Repository;
pub use store::TranslationStore;
