use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use failure::ResultExt;
use serde::{Deserialize, Serialize};

pub type ActionName = String;
pub type ResolverName = String;

/// Per-language configuration of a skill, read from
/// `{skills}/{domain}/{skill}/config/{lang}.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SkillConfig {
    #[serde(default)]
    pub actions: HashMap<ActionName, ActionConfig>,
    #[serde(default)]
    pub resolvers: HashMap<ResolverName, SkillResolverConfig>,
    /// Skill-specific entity definitions, opaque to the core and handed
    /// to the classifier's NER as-is.
    #[serde(default)]
    pub entities: HashMap<String, serde_json::Value>,
}

impl SkillConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::errors::Result<SkillConfig> {
        let config_file = File::open(path.as_ref())
            .with_context(|_| format!("Cannot open skill config file {:?}", path.as_ref()))?;
        let config = serde_json::from_reader(config_file)
            .with_context(|_| format!("Invalid skill config file {:?}", path.as_ref()))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<SlotConfig>,
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub action_loop: Option<LoopConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub name: String,
    pub expected_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picked_question: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub expected_item: ExpectedItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ExpectedItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedItemKind {
    Entity,
    GlobalResolver,
    SkillResolver,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillResolverConfig {
    pub intents: HashMap<String, ResolverIntent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverIntent {
    pub value: String,
}
