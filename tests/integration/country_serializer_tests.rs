/*!
 * Integration tests for serializers exposing all translations of a country
 */

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use url::Url;

use linguarest::errors::{ConfigurationError, ErrorDetail, SaveError, SerializeError};
use linguarest::{
    ModelSerializer, Schema, Serializer, SerializerContext, TranslatableModelSerializer, TranslatableSave,
    TranslatedAbsoluteUrlField, TranslatedFieldsField, TranslationStore, create_translated_fields_serializer,
};

use crate::common;

/// Translations declared with the shared model given explicitly
fn country_serializer() -> TranslatableModelSerializer {
    TranslatableModelSerializer::new(
        ModelSerializer::builder(common::country_meta())
            .fields(&["pk", "country_code", "translations"])
            .declare(
                "translations",
                TranslatedFieldsField::new().shared_model(common::country_meta()),
            ),
    )
    .expect("Country serializer should build")
}

/// Translations exposed as `trans`, limited to the name
fn explicit_country_serializer() -> TranslatableModelSerializer {
    let meta = common::country_meta();
    let schema = Schema::for_translation(&meta, "translations", &["name"]).expect("Schema should build");
    TranslatableModelSerializer::new(
        ModelSerializer::builder(meta)
            .fields(&["pk", "country_code", "trans"])
            .declare(
                "trans",
                TranslatedFieldsField::new().with_serializer(schema).source("translations"),
            ),
    )
    .expect("Explicit serializer should build")
}

fn france() -> serde_json::Value {
    json!({
        "country_code": "FR",
        "translations": {
            "en": {"name": "France", "url": "http://en.wikipedia.org/wiki/France"},
            "es": {"name": "Francia", "url": "http://es.wikipedia.org/wiki/Francia"}
        }
    })
}

/// Test serialization of every translation
#[test]
fn test_toRepresentation_withTwoLanguages_shouldNestPerLanguage() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;

    let data = country_serializer().to_representation(&spain, &SerializerContext::default())?;
    assert_eq!(
        data,
        json!({
            "pk": spain.id(),
            "country_code": "ES",
            "translations": {
                "en": {"name": "Spain", "url": "http://en.wikipedia.org/wiki/Spain"},
                "es": {"name": "España", "url": "http://es.wikipedia.org/wiki/España"}
            }
        })
    );
    Ok(())
}

/// Test that the shared model is deduced from the parent serializer
#[test]
fn test_toRepresentation_withDeducedSharedModel_shouldSerializeTranslations() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;

    let serializer = TranslatableModelSerializer::new(
        ModelSerializer::builder(common::country_meta())
            .fields(&["pk", "country_code", "translations"])
            .declare("translations", TranslatedFieldsField::new()),
    )?;
    let data = serializer.to_representation(&spain, &SerializerContext::default())?;
    assert_eq!(data["translations"]["es"]["name"], json!("España"));
    Ok(())
}

/// Test restricting the output languages through the context
#[test]
fn test_toRepresentation_withLanguagesInContext_shouldFilterTranslations() -> Result<()> {
    let repo = common::repository()?;
    let mut spain = common::create_spain(&repo)?;
    repo.translated_model(&mut spain, "translations", "fr")?
        .set("name", json!("Espagne"));
    repo.translated_model(&mut spain, "translations", "fr")?
        .set("url", json!("https://fr.wikipedia.org/wiki/Espagne"));
    repo.save_translations(&mut spain)?;

    let context = SerializerContext::default().with_languages(vec!["es".to_string(), "fr".to_string()]);
    let data = country_serializer().to_representation(&spain, &context)?;

    let translations = data["translations"].as_object().unwrap();
    assert_eq!(translations.keys().collect::<Vec<_>>(), vec!["es", "fr"]);
    assert_eq!(translations["fr"]["name"], json!("Espagne"));

    // An empty list means no filter
    let context = SerializerContext::default().with_languages(Vec::new());
    let data = country_serializer().to_representation(&spain, &context)?;
    assert_eq!(data["translations"].as_object().unwrap().len(), 3);
    Ok(())
}

/// Test validation of a complete payload
#[test]
fn test_validate_withValidTranslations_shouldKeepPayload() {
    let data = france();
    let validated = country_serializer()
        .validate(&data, false, &SerializerContext::default())
        .unwrap();
    assert_eq!(validated["translations"], data["translations"]);
    assert_eq!(validated["country_code"], json!("FR"));
}

/// Test that errors of every language are reported together
#[test]
fn test_validate_withInvalidTranslations_shouldReportEachLanguage() {
    let data = json!({
        "country_code": "FR",
        "translations": {
            "en": {"url": "http://en.wikipedia.org/wiki/France"},
            "es": {"name": "Francia", "url": "es.wikipedia.org/wiki/Francia"}
        }
    });
    let errors = country_serializer()
        .validate(&data, false, &SerializerContext::default())
        .unwrap_err();

    let translations = errors.get("translations").expect("Expected translation errors");
    assert_eq!(translations.keys(), vec!["en", "es"]);
    assert_eq!(
        translations.get("en").and_then(|d| d.get("name")),
        Some(&ErrorDetail::message("This field is required."))
    );
    assert_eq!(
        translations.get("es").and_then(|d| d.get("url")),
        Some(&ErrorDetail::message("Enter a valid URL."))
    );
}

/// Test that null, empty and non-object translations are rejected
#[test]
fn test_validate_withEmptyTranslations_shouldFail() {
    let serializer = country_serializer();
    let context = SerializerContext::default();

    let expected = [
        (json!(null), "This field may not be null."),
        (json!({}), "This field may not be empty."),
        (json!(""), "Input is not a valid dict"),
    ];
    for (empty_value, message) in expected {
        let errors = serializer
            .validate(&json!({"country_code": "FR", "translations": empty_value}), false, &context)
            .unwrap_err();
        assert_eq!(
            errors.get("translations").and_then(|d| d.messages()),
            Some(&[message.to_string()][..])
        );
    }
}

/// Test that wrong data types are rejected on partial updates too
#[test]
fn test_validate_withPartialInvalidType_shouldFail() {
    let errors = country_serializer()
        .validate(
            &json!({"translations": "this is not a dict"}),
            true,
            &SerializerContext::default(),
        )
        .unwrap_err();
    assert!(errors.contains("translations"));
}

/// Test that an empty object is accepted when allowed
#[test]
fn test_validate_withAllowEmpty_shouldAcceptEmptyObject() -> Result<()> {
    let serializer = TranslatableModelSerializer::new(
        ModelSerializer::builder(common::country_meta())
            .fields(&["country_code", "translations"])
            .declare("translations", TranslatedFieldsField::new().allow_empty(true)),
    )?;
    let validated = serializer
        .validate(
            &json!({"country_code": "FR", "translations": {}}),
            false,
            &SerializerContext::default(),
        )
        .unwrap();
    assert_eq!(validated["translations"], json!({}));
    Ok(())
}

/// Test creating a record with two translations
#[test]
fn test_save_onCreate_shouldStoreEveryLanguage() -> Result<()> {
    let repo = common::repository()?;
    let serializer = country_serializer();
    let context = SerializerContext::default();

    let validated = serializer.validate(&france(), false, &context).unwrap();
    let saved = serializer.save(&repo, None, validated, &context)?;

    let mut instance = repo.get(&common::country_meta(), saved.id().unwrap())?;
    assert_eq!(instance.get("country_code"), Some(&json!("FR")));
    instance.set_current_language("en");
    assert_eq!(instance.translated("name"), Some(&json!("France")));
    assert_eq!(instance.translated("url"), Some(&json!("http://en.wikipedia.org/wiki/France")));
    instance.set_current_language("es");
    assert_eq!(instance.translated("name"), Some(&json!("Francia")));
    assert_eq!(instance.translated("url"), Some(&json!("http://es.wikipedia.org/wiki/Francia")));
    Ok(())
}

/// Test updating existing translations and adding a new language
#[test]
fn test_save_onUpdate_shouldUpdateAndCreateTranslations() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;
    let serializer = country_serializer();
    let context = SerializerContext::default();

    let data = json!({
        "country_code": "ES",
        "translations": {
            "en": {"name": "Spain", "url": "http://en.wikipedia.org/wiki/Spain"},
            "es": {"name": "Hispania", "url": "http://es.wikipedia.org/wiki/Hispania"},
            "fr": {"name": "Espagne", "url": "http://fr.wikipedia.org/wiki/Espagne"}
        }
    });
    let validated = serializer.validate(&data, false, &context).unwrap();
    let saved = serializer.save(&repo, Some(spain), validated, &context)?;

    let mut instance = repo.get(&common::country_meta(), saved.id().unwrap())?;
    assert_eq!(instance.translated_languages("translations"), vec!["en", "es", "fr"]);
    instance.set_current_language("en");
    assert_eq!(instance.translated("name"), Some(&json!("Spain")));
    instance.set_current_language("es");
    assert_eq!(instance.translated("name"), Some(&json!("Hispania")));
    assert_eq!(instance.translated("url"), Some(&json!("http://es.wikipedia.org/wiki/Hispania")));
    instance.set_current_language("fr");
    assert_eq!(instance.translated("name"), Some(&json!("Espagne")));
    Ok(())
}

/// Test that saving the same payload twice keeps one row per language
#[test]
fn test_save_twice_shouldNotDuplicateRows() -> Result<()> {
    let repo = common::repository()?;
    let serializer = country_serializer();
    let context = SerializerContext::default();

    let validated = serializer.validate(&france(), false, &context).unwrap();
    let saved = serializer.save(&repo, None, validated, &context)?;
    let id = saved.id().unwrap();

    let instance = repo.get(&common::country_meta(), id)?;
    let validated = serializer.validate(&france(), false, &context).unwrap();
    serializer.save(&repo, Some(instance), validated, &context)?;

    let count: i64 = repo.connection().execute(|conn| {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM country_translation WHERE master_id = ?1",
            [id],
            |row| row.get(0),
        )?)
    })?;
    assert_eq!(count, 2);
    Ok(())
}

/// Test an explicit translation schema exposing only the name
#[test]
fn test_explicitSchema_shouldLimitFieldsAndSavePartialUpdate() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;
    let serializer = explicit_country_serializer();
    let context = SerializerContext::default();

    let data = serializer.to_representation(&spain, &context)?;
    assert_eq!(data["trans"]["en"], json!({"name": "Spain"}));
    assert_eq!(data["trans"]["es"], json!({"name": "España"}));

    let validated = serializer
        .validate(&json!({"trans": {"fi": {"name": "Espanja"}}}), true, &context)
        .unwrap();
    let mut instance = serializer.save(&repo, Some(spain), validated, &context)?;
    instance.set_current_language("en");
    assert_eq!(instance.translated("name"), Some(&json!("Spain")));
    instance.set_current_language("fi");
    assert_eq!(instance.translated("name"), Some(&json!("Espanja")));

    let reloaded = repo.get(&common::country_meta(), instance.id().unwrap())?;
    assert_eq!(reloaded.translated_in("name", "fi"), Some(&json!("Espanja")));
    assert_eq!(reloaded.translated_in("url", "fi"), Some(&json!("")));
    Ok(())
}

/// Test validation of translated data inside a nested list
#[test]
fn test_nestedSerializer_withTranslatedCountries_shouldValidate() -> Result<()> {
    let countries: Arc<dyn Serializer> = Arc::new(country_serializer());
    let serializer = ModelSerializer::builder(common::continent_meta())
        .fields(&["continent", "countries"])
        .nested("countries", countries, true)
        .build()?;

    let data = json!({
        "continent": "Europe",
        "countries": [{
            "country_code": "FR",
            "translations": {
                "en": {"name": "France", "url": "http://en.wikipedia.org/wiki/France"},
                "es": {"name": "Francia", "url": "http://es.wikipedia.org/wiki/Francia"}
            }
        }]
    });
    let validated = serializer
        .validate(&data, false, &SerializerContext::default())
        .unwrap();
    assert_eq!(validated["countries"][0], data["countries"][0]);

    // Nested payloads are not written implicitly
    let repo = common::repository()?;
    repo.register(&common::continent_meta())?;
    let result = serializer.perform_save(&repo, None, validated, &SerializerContext::default());
    assert!(matches!(result, Err(SaveError::WritableNested(name)) if name == "countries"));
    Ok(())
}

/// Test the generated translation schema of a model
#[test]
fn test_createTranslatedFieldsSerializer_withoutFields_shouldExposeAllFields() -> Result<()> {
    let meta = common::country_meta();
    let schema = create_translated_fields_serializer(&meta, "translations", None)?;
    assert_eq!(schema.field_names(), vec!["name", "url", "language_code"]);

    let schema = create_translated_fields_serializer(&meta, "translations", Some(&["url"][..]))?;
    assert_eq!(schema.field_names(), vec!["url"]);

    assert!(matches!(
        create_translated_fields_serializer(&meta, "trans", None),
        Err(ConfigurationError::UnknownTranslationGroup { .. })
    ));
    Ok(())
}

/// Test misconfigured translated fields
#[test]
fn test_translatedFieldsField_withInvalidConfiguration_shouldFailToBuild() -> Result<()> {
    let meta = common::country_meta();

    // Sub-serializer exposing the language code
    let schema = create_translated_fields_serializer(&meta, "translations", None)?;
    let result = ModelSerializer::builder(meta.clone())
        .fields(&["translations"])
        .declare("translations", TranslatedFieldsField::new().with_serializer(schema))
        .build();
    assert!(matches!(result, Err(ConfigurationError::LanguageCodeField)));

    // Sub-serializer over the shared model
    let schema = Schema::for_shared(&meta, &["country_code"])?;
    let result = ModelSerializer::builder(meta.clone())
        .fields(&["translations"])
        .declare("translations", TranslatedFieldsField::new().with_serializer(schema))
        .build();
    assert!(matches!(result, Err(ConfigurationError::NotTranslationSchema(_))));

    // Parent model without translations
    let result = ModelSerializer::builder(common::continent_meta())
        .fields(&["translations"])
        .declare("translations", TranslatedFieldsField::new())
        .build();
    assert!(matches!(result, Err(ConfigurationError::NotTranslatable { .. })));

    // Unknown relation name
    let result = ModelSerializer::builder(meta)
        .fields(&["trans"])
        .declare("trans", TranslatedFieldsField::new())
        .build();
    assert!(matches!(result, Err(ConfigurationError::UnknownTranslationGroup { .. })));
    Ok(())
}

/// Test that a schema of another model is rejected before any data is handled
#[test]
fn test_translatedFieldsField_withSchemaOfOtherModel_shouldFailToBuild() -> Result<()> {
    let picture = common::picture_meta();
    let schema = Schema::for_translation(&picture, "translations", &["caption"])?;
    let result = ModelSerializer::builder(common::country_meta())
        .fields(&["country_code", "translations"])
        .declare("translations", TranslatedFieldsField::new().with_serializer(schema))
        .build();
    assert!(matches!(
        result,
        Err(ConfigurationError::SchemaMismatch { expected, found, .. })
            if expected == "Country.translations" && found == "Picture.translations"
    ));
    Ok(())
}

/// Test that serialized translations validate back to the same values
#[test]
fn test_toRepresentation_thenValidate_shouldRoundTrip() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;
    let serializer = country_serializer();
    let context = SerializerContext::default();

    let data = serializer.to_representation(&spain, &context)?;
    let validated = serializer.validate(&data, false, &context).unwrap();

    assert_eq!(validated["translations"], data["translations"]);
    assert_eq!(validated["translations"]["en"]["name"], json!("Spain"));
    assert_eq!(validated["translations"]["es"]["url"], json!("http://es.wikipedia.org/wiki/España"));
    assert_eq!(validated["country_code"], data["country_code"]);
    Ok(())
}

/// Test per-translation absolute URLs built from the request base URL
#[test]
fn test_absoluteUrl_withBaseUrl_shouldResolvePlaceholders() -> Result<()> {
    let repo = common::repository()?;
    let spain = common::create_spain(&repo)?;
    let meta = common::country_meta();

    let schema = Schema::for_translation(&meta, "translations", &["name"])?.with_absolute_url(
        &meta,
        "absolute_url",
        TranslatedAbsoluteUrlField::new("/{language_code}/countries/{country_code}/"),
    )?;
    let serializer = TranslatableModelSerializer::new(
        ModelSerializer::builder(meta.clone())
            .fields(&["pk", "translations"])
            .declare("translations", TranslatedFieldsField::new().with_serializer(schema)),
    )?;

    let context = SerializerContext::default().with_base_url(Url::parse("http://testserver/api/")?);
    let data = serializer.to_representation(&spain, &context)?;
    assert_eq!(data["translations"]["en"]["absolute_url"], json!("http://testserver/en/countries/ES/"));
    assert_eq!(data["translations"]["es"]["absolute_url"], json!("http://testserver/es/countries/ES/"));

    let missing = serializer.to_representation(&spain, &SerializerContext::default());
    assert!(matches!(missing, Err(SerializeError::MissingRequest(name)) if name == "absolute_url"));

    let unknown = Schema::for_translation(&meta, "translations", &["name"])?.with_absolute_url(
        &meta,
        "absolute_url",
        TranslatedAbsoluteUrlField::new("/{slug}/"),
    );
    assert!(matches!(unknown, Err(ConfigurationError::UnknownPlaceholder(name)) if name == "slug"));
    Ok(())
}
