use std::path::PathBuf;

use log::debug;

use crate::language::Language;
use crate::ontology::{Entity, NextAction};

/// A slot the active context still needs, or already holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSlot {
    pub name: String,
    pub expected_entity: String,
    pub picked_question: String,
    pub suggestions: Vec<String>,
    pub is_filled: bool,
    pub value: Option<Entity>,
}

/// The conversation's short-term memory: one skill context linking
/// successive turns together.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveContext {
    /// `"{domain}.{skill}"`.
    pub name: String,
    pub lang: Language,
    /// `"{skill}.{action}"`.
    pub intent: String,
    pub domain: String,
    pub action_name: String,
    /// Utterance that first activated this context, replayed when the
    /// dialog cycle restarts.
    pub original_utterance: String,
    pub config_data_file_path: PathBuf,
    /// Slot ledger, in declaration order.
    pub slots: Vec<ContextSlot>,
    pub is_in_action_loop: bool,
    pub next_action: Option<NextAction>,
    pub entities: Vec<Entity>,
    pub current_entities: Vec<Entity>,
}

impl ActiveContext {
    pub fn skill(&self) -> &str {
        self.intent.split('.').next().unwrap_or_default()
    }
}

/// Holds at most one active context and enforces its lifecycle.
#[derive(Debug, Default)]
pub struct ConversationStore {
    active: Option<ActiveContext>,
}

impl ConversationStore {
    pub fn new() -> ConversationStore {
        ConversationStore::default()
    }

    pub fn has_active_context(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_context(&self) -> Option<&ActiveContext> {
        self.active.as_ref()
    }

    pub fn active_context_mut(&mut self) -> Option<&mut ActiveContext> {
        self.active.as_mut()
    }

    /// Activates a context. A different name discards the current one; the
    /// same name merges, updating slots and entities while preserving the
    /// original utterance. A non-loop context whose declared slots are all
    /// filled with no next action left is discharged right away.
    pub fn set_active_context(&mut self, context: ActiveContext) {
        match self.active.take() {
            Some(current) if current.name == context.name => {
                let mut merged = context;
                merged.original_utterance = current.original_utterance;
                if merged.slots.is_empty() {
                    merged.slots = current.slots;
                }
                let mut entities = current.entities;
                entities.extend(merged.current_entities.iter().cloned());
                merged.entities = entities;
                debug!("Active context merged ({})", merged.name);
                self.active = Some(merged);
            }
            _ => {
                debug!("Active context activated ({})", context.name);
                self.active = Some(context);
            }
        }

        let discharged = self.active.as_ref().map_or(false, |ctx| {
            !ctx.is_in_action_loop
                && !ctx.slots.is_empty()
                && ctx.slots.iter().all(|slot| slot.is_filled)
                && ctx.next_action.is_none()
        });
        if discharged {
            self.clean_active_context();
        }
    }

    pub fn clean_active_context(&mut self) {
        if let Some(context) = self.active.take() {
            debug!("Active context cleaned ({})", context.name);
        }
    }

    /// Records values for every slot whose expected entity shows up in
    /// the extracted entities, and marks those slots filled.
    pub fn set_slots(&mut self, entities: &[Entity]) {
        if let Some(context) = self.active.as_mut() {
            for slot in context.slots.iter_mut() {
                if let Some(entity) = entities
                    .iter()
                    .find(|entity| entity.entity == slot.expected_entity)
                {
                    slot.value = Some(entity.clone());
                    slot.is_filled = true;
                }
            }
        }
    }

    /// First unfilled slot, in declaration order.
    pub fn get_not_filled_slot(&self) -> Option<&ContextSlot> {
        self.active
            .as_ref()
            .and_then(|context| context.slots.iter().find(|slot| !slot.is_filled))
    }

    pub fn are_slots_all_filled(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |context| context.slots.iter().all(|slot| slot.is_filled))
    }
}
