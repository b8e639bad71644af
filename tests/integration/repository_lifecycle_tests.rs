/*!
 * Integration tests for a file-backed repository
 */

use anyhow::Result;
use serde_json::json;

use linguarest::database::DatabaseConnection;
use linguarest::errors::StoreError;
use linguarest::{Repository, TranslatableRecord, TranslationStore};

use crate::common;

/// Test that records survive reopening the database file
#[test]
fn test_repository_reopen_shouldKeepRecordsAndRegistrations() -> Result<()> {
    common::init_logger();
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("data").join("linguarest.db");

    let id = {
        let repo = Repository::new(DatabaseConnection::new(&db_path)?);
        repo.register(&common::country_meta())?;
        common::create_spain(&repo)?.id().unwrap()
    };
    assert!(db_path.exists());

    let repo = Repository::new(DatabaseConnection::new(&db_path)?).with_default_language("es");
    assert_eq!(repo.registered_models()?, vec!["Country".to_string()]);

    let spain = repo.get(&common::country_meta(), id)?;
    assert_eq!(spain.get_current_language(), "es");
    assert_eq!(spain.translated("name"), Some(&json!("España")));

    let stats = repo.connection().stats()?;
    assert_eq!(stats.model_count, 1);
    assert!(stats.file_size_bytes > 0);
    Ok(())
}

/// Test that unregistered models are rejected
#[test]
fn test_repository_withUnregisteredModel_shouldFail() -> Result<()> {
    common::init_logger();
    let repo = Repository::new_in_memory()?;
    let mut record = TranslatableRecord::new(common::country_meta(), "en");
    record.set("country_code", json!("NL"));

    let result = repo.save(&mut record);
    assert!(matches!(result, Err(StoreError::UnregisteredModel(name)) if name == "Country"));
    Ok(())
}

/// Test that the shared unique constraint is enforced by the store
#[test]
fn test_repository_withDuplicateCountryCode_shouldFail() -> Result<()> {
    let repo = common::repository()?;
    common::create_spain(&repo)?;

    let mut duplicate = TranslatableRecord::new(common::country_meta(), "en");
    duplicate.set("country_code", json!("ES"));
    assert!(matches!(repo.save(&mut duplicate), Err(StoreError::Database(_))));
    Ok(())
}

/// Test that loading a missing record reports it
#[test]
fn test_repository_get_withUnknownId_shouldReportNotFound() -> Result<()> {
    let repo = common::repository()?;
    let result = repo.get(&common::country_meta(), 999);
    assert!(matches!(result, Err(StoreError::NotFound { id: 999, .. })));
    Ok(())
}
