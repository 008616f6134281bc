use std::time::Instant;

use failure::format_err;
use log::{error, warn};

use crate::dispatcher::{Dispatcher, TurnFlow};
use crate::errors::*;
use crate::models::{global_resolver_path, ExpectedItemKind, GlobalResolverModel, SkillConfig};
use crate::ner;
use crate::ontology::{
    Classification, DispatchOutcome, NluResult, ProcessedTurn, Resolver, SlotValue,
};

impl Dispatcher {
    /// One action-loop turn: the looping action consumes the utterance as
    /// long as the expected item (entity or resolver) shows up, and the
    /// skill's reply decides whether the loop goes on, moves to the next
    /// action, restarts the cycle or ends.
    pub(crate) fn handle_action_loop(
        &mut self,
        utterance: &str,
        started: Instant,
    ) -> Result<TurnFlow> {
        let context = match self.conv.active_context() {
            Some(context) => context.clone(),
            None => return Ok(TurnFlow::Done(DispatchOutcome::Abandoned)),
        };

        let (main, global_resolvers, skills_resolvers) = {
            let models = self.loader.models()?;
            (
                models.main.clone(),
                models.global_resolvers.clone(),
                models.skills_resolvers.clone(),
            )
        };

        let mut nlu_result = NluResult::from_classification(
            utterance,
            Classification {
                domain: context.domain.clone(),
                skill: context.skill().to_string(),
                action: context.action_name.clone(),
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
        nlu_result.current_entities = ner::extract_entities(
            &*main,
            self.lang,
            &context.config_data_file_path,
            utterance,
        )?;

        let config = SkillConfig::from_path(&context.config_data_file_path)?;
        let expected_item = config
            .actions
            .get(&context.action_name)
            .and_then(|action| action.action_loop.as_ref())
            .map(|action_loop| action_loop.expected_item.clone())
            .ok_or_else(|| {
                format_err!(
                    "Action '{}' loops but declares no expected item",
                    context.action_name
                )
            })?;

        let mut matched = false;
        match expected_item.kind {
            ExpectedItemKind::Entity => {
                matched = nlu_result
                    .current_entities
                    .iter()
                    .any(|entity| entity.entity == expected_item.name);
            }
            ExpectedItemKind::GlobalResolver | ExpectedItemKind::SkillResolver => {
                let classifier = match expected_item.kind {
                    ExpectedItemKind::GlobalResolver => &global_resolvers,
                    _ => &skills_resolvers,
                };
                let output = classifier.process(utterance)?;
                let skill_prefix = format!("resolver.{}.", context.skill());
                let is_global = output.intent.starts_with("resolver.global.");
                if is_global || output.intent.starts_with(&skill_prefix) {
                    let leaf = output.intent.rsplit('.').next().unwrap_or_default();
                    let value = if is_global {
                        let path = global_resolver_path(
                            &self.paths.data_dir,
                            self.lang,
                            &expected_item.name,
                        );
                        GlobalResolverModel::from_path(&path)?
                            .intents
                            .get(leaf)
                            .map(|intent| intent.value.clone())
                    } else {
                        config
                            .resolvers
                            .get(&expected_item.name)
                            .and_then(|resolver| resolver.intents.get(leaf))
                            .map(|intent| intent.value.clone())
                    };
                    match value {
                        Some(value) => {
                            nlu_result.resolvers.push(Resolver {
                                name: expected_item.name.clone(),
                                value,
                            });
                            matched = true;
                        }
                        None => warn!(
                            "No resolver value for intent leaf '{}' ({})",
                            leaf, expected_item.name
                        ),
                    }
                }
            }
        }

        if !matched {
            self.talk_wernicke("random_context_out_of_topic", false);
            self.conv.clean_active_context();
            return Ok(TurnFlow::Redispatch(utterance.to_string()));
        }

        let processed = match self.brain.execute(&nlu_result) {
            Ok(processed) => processed,
            Err(err) => {
                // The loop aborts silently; the user re-drives it.
                error!("Skill executor failed during action loop: {}", err);
                self.emitter.is_typing(false);
                return Ok(TurnFlow::Done(DispatchOutcome::Abandoned));
            }
        };

        if processed.core.restart {
            self.conv.clean_active_context();
            return Ok(TurnFlow::Redispatch(context.original_utterance));
        }

        let config_next_action = processed
            .action
            .as_ref()
            .and_then(|action| action.next_action.clone());
        if config_next_action.is_none() && processed.core.is_in_action_loop == Some(false) {
            // The loop ends here.
            self.conv.clean_active_context();
        } else if processed.core.is_in_action_loop == Some(false) {
            if let Some(next_action) = processed.next_action.clone() {
                if let Some(active) = self.conv.active_context_mut() {
                    let skill = active.skill().to_string();
                    active.intent = format!("{}.{}", skill, next_action.name);
                    active.action_name = next_action.name;
                    active.is_in_action_loop = next_action.action_loop.is_some();
                }
            }
        }

        Ok(TurnFlow::Done(DispatchOutcome::Processed(
            ProcessedTurn::new(started.elapsed(), processed),
        )))
    }
}
