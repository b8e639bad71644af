/*!
 * Integration tests for the single-language flat serializer
 */

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use linguarest::app_config::Config;
use linguarest::{
    ModelSerializer, Serializer, SerializerContext, TranslatableFlatModelSerializer, TranslatableSave,
    TranslationStore,
};

use crate::common;

fn config() -> Config {
    Config {
        languages: vec!["en".to_string(), "es".to_string()],
        ..Config::default()
    }
}

/// Flat serializer with `language_code` restricted to the configured languages
fn flat_serializer() -> TranslatableFlatModelSerializer {
    TranslatableFlatModelSerializer::new(
        ModelSerializer::builder(common::country_meta())
            .fields(&["pk", "country_code", "language_code", "name", "url"])
            .config(&config()),
    )
    .expect("Flat serializer should build")
}

/// Flat serializer without a `language_code` field
fn flat_serializer_without_language_code() -> TranslatableFlatModelSerializer {
    TranslatableFlatModelSerializer::new(
        ModelSerializer::builder(common::country_meta())
            .fields(&["pk", "country_code", "name", "url"])
            .config(&config()),
    )
    .expect("Flat serializer should build")
}

/// Flat serializer accepting French as well
fn flat_serializer_with_french() -> TranslatableFlatModelSerializer {
    TranslatableFlatModelSerializer::new(
        ModelSerializer::builder(common::country_meta())
            .fields(&["pk", "country_code", "language_code", "name", "url"])
            .language_choices(vec!["en".to_string(), "es".to_string(), "fr".to_string()]),
    )
    .expect("Flat serializer should build")
}

/// Test serialization in the record's current language
#[test]
fn test_toRepresentation_withCurrentLanguage_shouldFlattenTranslation() -> Result<()> {
    let repo = common::repository()?;
    let mut spain = common::create_spain(&repo)?;
    let serializer = flat_serializer();

    spain.set_current_language("en");
    assert_eq!(
        serializer.to_representation(&spain, &SerializerContext::default())?,
        json!({
            "pk": spain.id(),
            "country_code": "ES",
            "language_code": "en",
            "name": "Spain",
            "url": "http://en.wikipedia.org/wiki/Spain"
        })
    );

    spain.set_current_language("es");
    assert_eq!(
        serializer.to_representation(&spain, &SerializerContext::default())?,
        json!({
            "pk": spain.id(),
            "country_code": "ES",
            "language_code": "es",
            "name": "España",
            "url": "http://es.wikipedia.org/wiki/España"
        })
    );
    Ok(())
}

/// Test that the request language wins over the record language
#[test]
fn test_toRepresentation_withRequestLanguage_shouldUseIt() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;

    let context = SerializerContext::default().with_language("es");
    let data = flat_serializer().to_representation(&spain, &context)?;
    assert_eq!(data["language_code"], json!("es"));
    assert_eq!(data["name"], json!("España"));

    // Missing translations fall back to the default language
    let context = SerializerContext::default().with_language("fi");
    let data = flat_serializer().to_representation(&spain, &context)?;
    assert_eq!(data["name"], json!("Spain"));
    Ok(())
}

/// Test serialization without the language code field
#[test]
fn test_toRepresentation_withoutLanguageCode_shouldOmitIt() -> Result<()> {
    let repo = common::repository()?;
    let mut spain = common::create_spain(&repo)?;
    spain.set_current_language("es");

    let data = flat_serializer_without_language_code().to_representation(&spain, &SerializerContext::default())?;
    assert_eq!(
        data,
        json!({
            "pk": spain.id(),
            "country_code": "ES",
            "name": "España",
            "url": "http://es.wikipedia.org/wiki/España"
        })
    );
    Ok(())
}

/// Test language code validation against the configured languages
#[test]
fn test_validate_withLanguageCode_shouldCheckChoices() {
    let serializer = flat_serializer();
    let context = SerializerContext::default();

    let valid = json!({
        "country_code": "es",
        "language_code": "es",
        "name": "España",
        "url": "http://es.wikipedia.org/wiki/España"
    });
    assert!(serializer.validate(&valid, false, &context).is_ok());

    let invalid = json!({
        "country_code": "es",
        "language_code": "fr",
        "name": "Espagne",
        "url": "http://fr.wikipedia.org/wiki/Espagne"
    });
    let errors = serializer.validate(&invalid, false, &context).unwrap_err();
    assert_eq!(
        errors.get("language_code").and_then(|d| d.messages()).map(|m| m[0].as_str()),
        Some("\"fr\" is not a valid choice.")
    );
}

/// Test validation of the flattened translated fields
#[test]
fn test_validate_withInvalidTranslatedFields_shouldReportTopLevel() {
    let data = json!({
        "country_code": "FR",
        "language_code": "en",
        "url": "es.wikipedia.org/wiki/Francia"
    });
    let errors = flat_serializer()
        .validate(&data, false, &SerializerContext::default())
        .unwrap_err();
    assert_eq!(
        errors.get("name").and_then(|d| d.messages()).map(|m| m[0].as_str()),
        Some("This field is required.")
    );
    assert_eq!(
        errors.get("url").and_then(|d| d.messages()).map(|m| m[0].as_str()),
        Some("Enter a valid URL.")
    );
}

/// Test creating a record in the given language
#[test]
fn test_save_onCreate_shouldStoreGivenLanguage() -> Result<()> {
    let repo = common::repository()?;
    let serializer = flat_serializer();
    let context = SerializerContext::default();

    let data = json!({
        "country_code": "FR",
        "language_code": "es",
        "name": "Francia",
        "url": "http://es.wikipedia.org/wiki/Francia"
    });
    let validated = serializer.validate(&data, false, &context).unwrap();
    let saved = serializer.save(&repo, None, validated, &context)?;

    let instance = repo.get(&common::country_meta(), saved.id().unwrap())?;
    assert_eq!(instance.translated_languages("translations"), vec!["es"]);
    assert_eq!(instance.translated_in("name", "es"), Some(&json!("Francia")));
    assert_eq!(instance.translated_in("url", "es"), Some(&json!("http://es.wikipedia.org/wiki/Francia")));
    Ok(())
}

/// Test updating the shared record and one translation
#[test]
fn test_save_onUpdate_shouldUpdateSharedAndTranslatedValues() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;
    let serializer = flat_serializer();
    let context = SerializerContext::default();

    let data = json!({
        "country_code": "E",
        "language_code": "es",
        "name": "Hispania",
        "url": "http://es.wikipedia.org/wiki/Hispania"
    });
    let validated = serializer.validate(&data, false, &context).unwrap();
    let saved = serializer.save(&repo, Some(spain), validated, &context)?;

    let instance = repo.get(&common::country_meta(), saved.id().unwrap())?;
    assert_eq!(instance.get("country_code"), Some(&json!("E")));
    assert_eq!(instance.translated_in("name", "es"), Some(&json!("Hispania")));
    assert_eq!(instance.translated_in("url", "es"), Some(&json!("http://es.wikipedia.org/wiki/Hispania")));
    assert_eq!(instance.translated_in("name", "en"), Some(&json!("Spain")));
    Ok(())
}

/// Test adding a translation in a language the record does not have yet
#[test]
fn test_save_onUpdate_withNewLanguage_shouldCreateTranslation() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;
    let serializer = flat_serializer_with_french();
    let context = SerializerContext::default();

    let data = json!({
        "country_code": "ES",
        "language_code": "fr",
        "name": "Espagne",
        "url": "http://fr.wikipedia.org/wiki/Espagne"
    });
    let validated = serializer.validate(&data, false, &context).unwrap();
    let saved = serializer.save(&repo, Some(spain), validated, &context)?;

    let mut instance = repo.get(&common::country_meta(), saved.id().unwrap())?;
    instance.set_current_language("fr");
    assert_eq!(instance.translated("name"), Some(&json!("Espagne")));
    assert_eq!(instance.translated("url"), Some(&json!("http://fr.wikipedia.org/wiki/Espagne")));
    Ok(())
}

/// Test that the default language is used without a language code
#[test]
fn test_save_onCreate_withoutLanguageCode_shouldUseDefaultLanguage() -> Result<()> {
    let repo = common::repository()?;
    let serializer = flat_serializer_without_language_code();
    let context = SerializerContext::default();

    let data = json!({
        "country_code": "FR",
        "name": "French",
        "url": "http://en.wikipedia.org/wiki/French"
    });
    let validated = serializer.validate(&data, false, &context).unwrap();
    let saved = serializer.save(&repo, None, validated, &context)?;

    let mut instance = repo.get(&common::country_meta(), saved.id().unwrap())?;
    instance.set_current_language("en");
    assert_eq!(instance.translated("name"), Some(&json!("French")));
    assert_eq!(instance.translated("url"), Some(&json!("http://en.wikipedia.org/wiki/French")));
    Ok(())
}

/// Test a flat serializer nested in a list
#[test]
fn test_nestedFlatSerializer_shouldValidateItems() -> Result<()> {
    let countries: Arc<dyn Serializer> = Arc::new(flat_serializer());
    let serializer = ModelSerializer::builder(common::continent_meta())
        .fields(&["continent", "countries"])
        .nested("countries", countries, true)
        .build()?;

    let data = json!({
        "continent": "Europe",
        "countries": [{
            "country_code": "FR",
            "language_code": "en",
            "name": "France",
            "url": "http://en.wikipedia.org/wiki/France"
        }]
    });
    let validated = serializer
        .validate(&data, false, &SerializerContext::default())
        .unwrap();
    assert_eq!(validated["countries"][0], data["countries"][0]);
    Ok(())
}
