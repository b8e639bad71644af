/*!
 * Common test utilities for the linguarest test suite
 */

use anyhow::Result;
use serde_json::json;
use std::sync::{Arc, Once};
use tempfile::TempDir;

use linguarest::{
    FieldSpec, ModelMeta, Repository, TranslatableRecord, TranslationMeta, TranslationStore,
};

static INIT_LOGGER: Once = Once::new();

/// Route library logs through the test harness
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Country with a code and a `translations` group holding name and url
pub fn country_meta() -> Arc<ModelMeta> {
    ModelMeta::new("Country")
        .field(FieldSpec::char("country_code", 2).unique())
        .translated(TranslationMeta::new(
            "translations",
            vec![FieldSpec::char("name", 200), FieldSpec::url("url", 200).blank()],
        ))
        .build()
        .expect("Country model should be valid")
}

/// Picture with a single translated caption
pub fn picture_meta() -> Arc<ModelMeta> {
    ModelMeta::new("Picture")
        .field(FieldSpec::integer("image_nr"))
        .translated(TranslationMeta::new("translations", vec![FieldSpec::char("caption", 50)]))
        .build()
        .expect("Picture model should be valid")
}

/// Continent without translations, used as the parent of nested countries
pub fn continent_meta() -> Arc<ModelMeta> {
    ModelMeta::new("Continent")
        .field(FieldSpec::char("continent", 50))
        .build()
        .expect("Continent model should be valid")
}

/// In-memory repository with the country and picture models registered
pub fn repository() -> Result<Repository> {
    init_logger();
    let repo = Repository::new_in_memory()?;
    repo.register(&country_meta())?;
    repo.register(&picture_meta())?;
    Ok(repo)
}

/// Store Spain with an English and a Spanish translation
pub fn create_spain(repo: &Repository) -> Result<TranslatableRecord> {
    let mut spain = TranslatableRecord::new(country_meta(), "en");
    spain.set("country_code", json!("ES"));
    spain.set_translated("name", json!("Spain"))?;
    spain.set_translated("url", json!("http://en.wikipedia.org/wiki/Spain"))?;

    spain.set_current_language("es");
    spain.set_translated("name", json!("España"))?;
    spain.set_translated("url", json!("http://es.wikipedia.org/wiki/España"))?;

    repo.save_all(&mut spain)?;
    let id = spain.id().expect("Saved record should have an ID");
    Ok(repo.get(&country_meta(), id)?)
}

/// Store a picture captioned in English and Spanish
pub fn create_picture(repo: &Repository) -> Result<TranslatableRecord> {
    let mut picture = TranslatableRecord::new(picture_meta(), "en");
    picture.set("image_nr", json!(1));
    picture.set_translated("caption", json!("Spain"))?;
    picture.set_current_language("es");
    picture.set_translated("caption", json!("España"))?;

    repo.save_all(&mut picture)?;
    let id = picture.id().expect("Saved record should have an ID");
    Ok(repo.get(&picture_meta(), id)?)
}
