use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{ActionConfig, LoopConfig};

pub type IntentName = String;
pub type SlotName = String;
pub type EntityName = String;

/// An entity extracted from an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity kind, e.g. "product" or "number".
    pub entity: EntityName,
    /// Surface text as typed by the user.
    pub raw_value: String,
    /// Char range of the surface text within the utterance.
    pub range: Range<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<serde_json::Value>,
}

/// A discrete meaning label produced by a resolver classifier, e.g.
/// `{name: "answer", value: "denial"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolver {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotValue {
    pub entity: EntityName,
    pub value: Option<Entity>,
    pub is_filled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub domain: String,
    pub skill: String,
    pub action: String,
    pub confidence: f32,
}

impl Classification {
    pub fn intent(&self) -> IntentName {
        format!("{}.{}", self.skill, self.action)
    }

    /// Name under which the conversation remembers this classification.
    pub fn context_name(&self) -> String {
        format!("{}.{}", self.domain, self.skill)
    }
}

/// The artifact handed to the Brain executor and returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NluResult {
    pub utterance: String,
    /// Entities present in the just-received utterance.
    pub current_entities: Vec<Entity>,
    /// Entities inherited from the active context plus current ones.
    pub entities: Vec<Entity>,
    pub current_resolvers: Vec<Resolver>,
    pub resolvers: Vec<Resolver>,
    pub slots: HashMap<SlotName, SlotValue>,
    /// Path of the skill's per-language config file, opaque to the core.
    pub config_data_file_path: PathBuf,
    /// Lazy dialog answers produced by the classifier for dialog actions.
    pub answers: Vec<serde_json::Value>,
    pub classification: Classification,
}

impl NluResult {
    pub fn from_classification(utterance: &str, classification: Classification) -> NluResult {
        NluResult {
            utterance: utterance.to_string(),
            current_entities: vec![],
            entities: vec![],
            current_resolvers: vec![],
            resolvers: vec![],
            slots: HashMap::new(),
            config_data_file_path: PathBuf::new(),
            answers: vec![],
            classification,
        }
    }
}

/// Descriptor of the action a skill wants to run next, `{name, loop?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAction {
    pub name: String,
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub action_loop: Option<LoopConfig>,
}

/// Directives the skill process sends back to the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreDirectives {
    #[serde(default)]
    pub restart: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_in_action_loop: Option<bool>,
}

/// The Brain executor's reply for one executed action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillOutcome {
    /// Wall-clock time spent inside the skill, in milliseconds.
    #[serde(default)]
    pub execution_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Config of the executed action, as declared by the skill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
    #[serde(default)]
    pub core: CoreDirectives,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_data_file_path: Option<PathBuf>,
    #[serde(default)]
    pub slots: HashMap<SlotName, SlotValue>,
}

/// A fully processed turn, with latency attribution: `nlu_processing_time`
/// excludes the skill's own execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTurn {
    pub processing_time: Duration,
    pub nlu_processing_time: Duration,
    pub outcome: SkillOutcome,
}

impl ProcessedTurn {
    pub fn new(processing_time: Duration, outcome: SkillOutcome) -> ProcessedTurn {
        let execution_time = Duration::from_millis(outcome.execution_time);
        ProcessedTurn {
            processing_time,
            nlu_processing_time: processing_time
                .checked_sub(execution_time)
                .unwrap_or_default(),
            outcome,
        }
    }
}

/// Union of the values `process` can resolve with.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A skill action ran; full result attached.
    Processed(ProcessedTurn),
    /// A question was asked; the turn is consumed and the core awaits the
    /// next user input.
    AwaitingInput,
    /// No intent, and no fallback matched.
    IntentNotFound {
        processing_time: Duration,
        message: &'static str,
    },
    /// The turn was dropped: unsupported locale, failed language switch,
    /// off-topic abort or a silent action-loop failure.
    Abandoned,
}
