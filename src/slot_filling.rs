use std::time::Instant;

use rand::seq::SliceRandom;

use crate::conversation::{ActiveContext, ContextSlot};
use crate::dispatcher::Dispatcher;
use crate::errors::*;
use crate::ner;
use crate::ontology::{
    Classification, DispatchOutcome, NextAction, NluResult, ProcessedTurn, SlotValue,
};

impl Dispatcher {
    /// Decides whether slot filling begins after a fresh classification:
    /// when the intent declares mandatory slots, the context is seeded
    /// with them and the first question is asked, short-circuiting the
    /// turn. Entities already present in the activation utterance are
    /// only picked up on the next turn.
    pub(crate) fn route_slot_filling(&mut self, nlu_result: &NluResult) -> Result<bool> {
        let main = self.loader.models()?.main.clone();
        let mandatory_slots = main.mandatory_slots(&nlu_result.classification.intent())?;
        if mandatory_slots.is_empty() {
            return Ok(false);
        }

        let mut rng = rand::thread_rng();
        let slots = mandatory_slots
            .into_iter()
            .map(|slot| ContextSlot {
                picked_question: slot
                    .questions
                    .choose(&mut rng)
                    .cloned()
                    .unwrap_or_default(),
                name: slot.name,
                expected_entity: slot.expected_entity,
                suggestions: slot.suggestions,
                is_filled: false,
                value: None,
            })
            .collect();

        let classification = &nlu_result.classification;
        self.conv.set_active_context(ActiveContext {
            name: classification.context_name(),
            lang: self.lang,
            intent: classification.intent(),
            domain: classification.domain.clone(),
            action_name: classification.action.clone(),
            original_utterance: nlu_result.utterance.clone(),
            config_data_file_path: nlu_result.config_data_file_path.clone(),
            slots,
            is_in_action_loop: false,
            next_action: Some(NextAction {
                name: classification.action.clone(),
                action_loop: None,
            }),
            entities: nlu_result.entities.clone(),
            current_entities: nlu_result.entities.clone(),
        });

        self.ask_for_next_slot();
        Ok(true)
    }

    /// One slot-filling turn: either a slot gets filled (and the next
    /// question is asked), or the user went off topic (context cleared),
    /// or everything is filled and the pending action finally runs with
    /// the activation utterance.
    pub(crate) fn handle_slot_filling(
        &mut self,
        utterance: &str,
        started: Instant,
    ) -> Result<DispatchOutcome> {
        let context = match self.conv.active_context() {
            Some(context) => context.clone(),
            None => {
                self.emitter.is_typing(false);
                return Ok(DispatchOutcome::Abandoned);
            }
        };
        if context.next_action.is_none() {
            // Nothing to fill for.
            self.emitter.is_typing(false);
            return Ok(DispatchOutcome::Abandoned);
        }

        let main = self.loader.models()?.main.clone();
        let entities = ner::extract_entities(
            &*main,
            self.lang,
            &context.config_data_file_path,
            utterance,
        )?;

        if let Some(slot) = self.conv.get_not_filled_slot() {
            let expected_entity = slot.expected_entity.clone();
            if entities
                .iter()
                .any(|entity| entity.entity == expected_entity)
            {
                self.conv.set_slots(&entities);
                if self.conv.get_not_filled_slot().is_some() {
                    self.ask_for_next_slot();
                    return Ok(DispatchOutcome::AwaitingInput);
                }
            }
        }

        if !self.conv.are_slots_all_filled() {
            self.talk_wernicke("random_context_out_of_topic", false);
            self.conv.clean_active_context();
            self.emitter.is_typing(false);
            return Ok(DispatchOutcome::Abandoned);
        }

        // All slots filled: run the pending action against the utterance
        // that activated the context.
        let context = self.conv.active_context().unwrap().clone();
        let next_action = context.next_action.clone().unwrap();
        let mut nlu_result = NluResult::from_classification(
            &context.original_utterance,
            Classification {
                domain: context.domain.clone(),
                skill: context.skill().to_string(),
                action: next_action.name,
                confidence: 1.0,
            },
        );
        nlu_result.config_data_file_path = context.config_data_file_path.clone();
        nlu_result.slots = context
            .slots
            .iter()
            .map(|slot| {
                (
                    slot.name.clone(),
                    SlotValue {
                        entity: slot.expected_entity.clone(),
                        value: slot.value.clone(),
                        is_filled: slot.is_filled,
                    },
                )
            })
            .collect();
        nlu_result.entities = context.entities.clone();
        nlu_result.current_entities = entities;
        self.conv.clean_active_context();

        let processed = self.execute_brain(&nlu_result)?;
        Ok(DispatchOutcome::Processed(ProcessedTurn::new(
            started.elapsed(),
            processed,
        )))
    }

    fn ask_for_next_slot(&mut self) {
        if let Some(slot) = self.conv.get_not_filled_slot() {
            let question = slot.picked_question.clone();
            let suggestions = slot.suggestions.clone();
            self.emitter.suggest(&suggestions);
            self.brain.talk(&question, true);
            self.emitter.is_typing(false);
        }
    }
}
