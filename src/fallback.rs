use std::collections::HashSet;

use log::info;

use crate::models::FallbackRule;
use crate::ontology::{Classification, NluResult};

/// Deterministic keyword matcher used when the main classifier emits no
/// intent. A rule matches when every one of its words appears in the
/// lowercased utterance token set; rules are tried in declaration order.
/// The resulting classification carries confidence 1 and no entities.
pub fn match_fallback(utterance: &str, fallbacks: &[FallbackRule]) -> Option<NluResult> {
    let tokens: HashSet<String> = utterance
        .to_lowercase()
        .split_whitespace()
        .map(|token| token.to_string())
        .collect();

    for fallback in fallbacks {
        let matched = fallback
            .words
            .iter()
            .all(|word| tokens.contains(&word.to_lowercase()));
        if matched {
            info!(
                "Fallback found: {}.{}.{}",
                fallback.domain, fallback.skill, fallback.action
            );
            return Some(NluResult::from_classification(
                utterance,
                Classification {
                    domain: fallback.domain.clone(),
                    skill: fallback.skill.clone(),
                    action: fallback.action.clone(),
                    confidence: 1.0,
                },
            ));
        }
    }
    None
}
