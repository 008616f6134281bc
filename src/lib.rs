mod action_loop;
mod brain;
mod classifier;
mod conversation;
mod dispatcher;
pub mod errors;
mod fallback;
mod language;
mod model_loader;
pub mod models;
mod ner;
mod ontology;
mod slot_filling;
mod telemetry;
#[cfg(test)]
mod testutils;
mod tokenizer;

pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::brain::{Brain, ClientEmitter};
pub use crate::classifier::{ClassifierOutput, IntentClassifier, IntentScore, MandatorySlot};
pub use crate::conversation::{ActiveContext, ContextSlot, ConversationStore};
pub use crate::dispatcher::{CorePaths, Dispatcher};
pub use crate::errors::{AriaNluError, NerErrorLevel, Result};
pub use crate::fallback::match_fallback;
pub use crate::language::Language;
pub use crate::model_loader::{ClassifierLoader, ModelKind, ModelLoader, ModelSet};
pub use crate::ner::{builtin_entities, extract_entities, merge_spacy_entities};
pub use crate::ontology::{
    Classification, CoreDirectives, DispatchOutcome, Entity, EntityName, IntentName, NextAction,
    NluResult, ProcessedTurn, Resolver, SkillOutcome, SlotName, SlotValue,
};
pub use crate::tokenizer::{
    kill_process_tree, SpacyEntity, SpacyResolution, TcpTokenizerClient, TokenizerClient,
    TokenizerProcess,
};
