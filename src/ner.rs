use std::path::Path;

use itertools::Itertools;
use log::debug;

use crate::classifier::IntentClassifier;
use crate::errors::*;
use crate::language::Language;
use crate::models::SkillConfig;
use crate::ontology::Entity;
use crate::tokenizer::TokenizerClient;

/// Builtin entity kinds the main classifier activates at load time.
pub fn builtin_entities() -> &'static [&'static str] {
    &[
        "number",
        "ordinal",
        "percentage",
        "currency",
        "date",
        "time",
        "duration",
        "email",
        "phonenumber",
        "url",
        "hashtag",
    ]
}

/// Extracts entities for an utterance, scoped to a skill config. Failures
/// come back as `AriaNluError::Ner` so the dispatcher can pick the right
/// log channel and spoken error code.
pub fn extract_entities(
    classifier: &dyn IntentClassifier,
    lang: Language,
    config_path: &Path,
    utterance: &str,
) -> Result<Vec<Entity>> {
    let config = SkillConfig::from_path(config_path)
        .map_err(|err| AriaNluError::ner_warning("skill_config", err.to_string()))?;
    classifier
        .extract_entities(lang, utterance, &config)
        .map_err(|err| AriaNluError::ner_error("entity_extraction", err.to_string()).into())
}

/// Asks the tokenization service for auxiliary entities and registers
/// each resolved value as a synonym on the main classifier, so proper
/// nouns the model was never trained on still classify. Idempotent per
/// `(entity, value)` pair.
pub fn merge_spacy_entities(
    classifier: &dyn IntentClassifier,
    client: &mut dyn TokenizerClient,
    lang: Language,
    utterance: &str,
) -> Result<()> {
    let spacy_entities = client.spacy_entities(utterance)?;
    for spacy_entity in spacy_entities
        .into_iter()
        .unique_by(|e| (e.entity.clone(), e.resolution.value.clone()))
    {
        let value = spacy_entity.resolution.value;
        debug!("Merging spaCy entity '{}' ({})", value, spacy_entity.entity);
        let surface_forms = [title_case(&value)];
        classifier.register_synonym(lang, &spacy_entity.entity, &value, &surface_forms)?;
    }
    Ok(())
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::testutils::{MockedClassifier, MockedTokenizerClient};
    use crate::tokenizer::{SpacyEntity, SpacyResolution};

    #[test]
    fn test_title_case() {
        assert_eq!("Louis", title_case("louis"));
        assert_eq!("New York", title_case("new york"));
        assert_eq!("", title_case(""));
    }

    #[test]
    fn test_merge_spacy_entities_registers_synonyms() {
        // Given
        let classifier = MockedClassifier::default();
        let state = classifier.state();
        let mut client = MockedTokenizerClient::default();
        client.spacy_outputs.insert(
            "who is louis".to_string(),
            vec![SpacyEntity {
                entity: "PER".to_string(),
                resolution: SpacyResolution {
                    value: "louis".to_string(),
                },
            }],
        );

        // When
        merge_spacy_entities(&classifier, &mut client, Language::EN, "who is louis").unwrap();

        // Then
        let registered = &state.lock().unwrap().registered_synonyms;
        assert_eq!(1, registered.len());
        assert_eq!(
            (
                Language::EN,
                "PER".to_string(),
                "louis".to_string(),
                vec!["Louis".to_string()]
            ),
            registered[0]
        );
    }

    #[test]
    fn test_merge_spacy_entities_is_idempotent() {
        // Given
        let classifier = MockedClassifier::default();
        let state = classifier.state();
        let mut client = MockedTokenizerClient::default();
        let duplicated = SpacyEntity {
            entity: "LOC".to_string(),
            resolution: SpacyResolution {
                value: "paris".to_string(),
            },
        };
        client.spacy_outputs.insert(
            "fly to paris".to_string(),
            vec![duplicated.clone(), duplicated],
        );

        // When
        merge_spacy_entities(&classifier, &mut client, Language::EN, "fly to paris").unwrap();
        let after_first = state.lock().unwrap().registered_synonyms.clone();
        merge_spacy_entities(&classifier, &mut client, Language::EN, "fly to paris").unwrap();

        // Then
        assert_eq!(1, after_first.len());
        // Registration is append-only on the classifier side, so the
        // resulting synonym state is unchanged by the second merge.
        let after_second = &state.lock().unwrap().registered_synonyms;
        assert_eq!(
            after_first.iter().unique().collect::<Vec<_>>(),
            after_second.iter().unique().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_extract_entities_wraps_missing_config() {
        // Given
        let classifier = MockedClassifier::default();
        let missing = tempfile::tempdir().unwrap().path().join("en.json");

        // When
        let result = extract_entities(&classifier, Language::EN, &missing, "add milk");

        // Then
        let err = result.unwrap_err();
        let ner_err = err.downcast_ref::<AriaNluError>().unwrap();
        match ner_err {
            AriaNluError::Ner { code, .. } => assert_eq!(&"skill_config", code),
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extract_entities_scopes_to_config() {
        // Given
        let classifier = MockedClassifier::default();
        classifier.state().lock().unwrap().entity_outputs.insert(
            "add milk".to_string(),
            vec![Entity {
                entity: "product".to_string(),
                raw_value: "milk".to_string(),
                range: 4..8,
                resolution: None,
            }],
        );
        let config_dir = tempfile::tempdir().unwrap();
        let config_path = config_dir.path().join("en.json");
        fs::write(&config_path, r#"{"actions": {}}"#).unwrap();

        // When
        let entities =
            extract_entities(&classifier, Language::EN, &config_path, "add milk").unwrap();

        // Then
        assert_eq!(1, entities.len());
        assert_eq!("product", entities[0].entity);
    }
}
