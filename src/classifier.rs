use crate::errors::*;
use crate::language::Language;
use crate::models::SkillConfig;
use crate::ontology::{Entity, IntentName};

/// One scored classification candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentScore {
    pub intent: IntentName,
    pub score: f32,
}

/// What the classifier reports for one utterance. `intent` is the winning
/// `"{skill}.{action}"` (or `"None"`), `classifications` the full scored
/// candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOutput {
    pub locale: String,
    pub intent: IntentName,
    pub domain: String,
    pub score: f32,
    pub classifications: Vec<IntentScore>,
    pub answers: Vec<serde_json::Value>,
}

/// A slot the classifier declares mandatory for an intent, with the
/// questions the core may ask to fill it.
#[derive(Debug, Clone, PartialEq)]
pub struct MandatorySlot {
    pub name: String,
    pub expected_entity: String,
    pub questions: Vec<String>,
    pub suggestions: Vec<String>,
}

/// The opaque intent-classifier capability. One instance per loaded model
/// file; effectively read-only after load except for synonym
/// registration, which is append-only (duplicates are benign).
pub trait IntentClassifier: Send + Sync {
    fn process(&self, utterance: &str) -> Result<ClassifierOutput>;

    /// Registers surface forms for an entity value so the classifier can
    /// recognize proper nouns it was never trained on. Append-only.
    fn register_synonym(
        &self,
        lang: Language,
        entity: &str,
        value: &str,
        surface_forms: &[String],
    ) -> Result<()>;

    /// Domain owning the given `"{skill}.{action}"` intent.
    fn intent_domain(&self, lang: Language, intent: &str) -> Result<String>;

    fn mandatory_slots(&self, intent: &str) -> Result<Vec<MandatorySlot>>;

    /// Runs the classifier's NER over an utterance, scoped to a skill
    /// config (which may declare its own entities).
    fn extract_entities(
        &self,
        lang: Language,
        utterance: &str,
        config: &SkillConfig,
    ) -> Result<Vec<Entity>>;

    fn set_spell_check(&self, enabled: bool);

    /// Activates the named builtin entity kinds on the classifier's NER.
    fn activate_builtin_entities(&self, entities: &[&str]);
}
