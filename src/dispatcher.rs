use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use failure::bail;
use log::{error, info, warn};

use crate::brain::{Brain, ClientEmitter};
use crate::conversation::{ActiveContext, ConversationStore};
use crate::errors::*;
use crate::fallback;
use crate::language::Language;
use crate::model_loader::{ClassifierLoader, ModelLoader};
use crate::models::{load_language_profiles, LanguageProfiles};
use crate::ner;
use crate::ontology::{
    Classification, DispatchOutcome, NluResult, ProcessedTurn, SkillOutcome,
};
use crate::telemetry;
use crate::tokenizer::{TokenizerClient, TokenizerProcess};

/// On-disk roots the dispatcher reads from.
#[derive(Debug, Clone)]
pub struct CorePaths {
    pub models_dir: PathBuf,
    pub data_dir: PathBuf,
    pub skills_dir: PathBuf,
}

impl CorePaths {
    pub fn skill_config_path(&self, domain: &str, skill: &str, lang: Language) -> PathBuf {
        self.skills_dir
            .join(domain)
            .join(skill)
            .join("config")
            .join(format!("{}.json", lang.code()))
    }
}

/// How one evaluated turn continues: either it produced the final
/// outcome, or dispatch must re-enter with another utterance. The source
/// pattern of calling back into `process` from the sub-state-machines is
/// flattened into this trampoline so the session stays single-threaded.
pub(crate) enum TurnFlow {
    Done(DispatchOutcome),
    Redispatch(String),
}

/// Top-level decision pipeline: composes the classifiers, the NER layer,
/// the conversation store and the Brain executor into one deterministic
/// per-turn decision. Single-session: `process` takes `&mut self`, so
/// concurrent turns on one session cannot be expressed.
pub struct Dispatcher {
    pub(crate) lang: Language,
    pub(crate) paths: CorePaths,
    pub(crate) loader: ModelLoader,
    pub(crate) conv: ConversationStore,
    pub(crate) profiles: LanguageProfiles,
    pub(crate) brain: Box<dyn Brain>,
    pub(crate) emitter: Box<dyn ClientEmitter>,
    pub(crate) tokenizer_client: Box<dyn TokenizerClient>,
    pub(crate) tokenizer_process: Option<TokenizerProcess>,
    pub(crate) tokenizer_binary: PathBuf,
    mute_spoken_errors: bool,
}

impl Dispatcher {
    pub fn new(
        lang: Language,
        paths: CorePaths,
        classifier_loader: Arc<dyn ClassifierLoader>,
        brain: Box<dyn Brain>,
        emitter: Box<dyn ClientEmitter>,
        tokenizer_client: Box<dyn TokenizerClient>,
        tokenizer_binary: PathBuf,
    ) -> Result<Dispatcher> {
        let profiles = load_language_profiles(&paths.data_dir)?;
        Ok(Dispatcher {
            lang,
            paths,
            loader: ModelLoader::new(classifier_loader),
            conv: ConversationStore::new(),
            profiles,
            brain,
            emitter,
            tokenizer_client,
            tokenizer_process: None,
            tokenizer_binary,
            mute_spoken_errors: false,
        })
    }

    pub fn lang(&self) -> Language {
        self.lang
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conv
    }

    pub fn is_ready(&self) -> bool {
        self.loader.is_ready()
    }

    /// Keeps NER failures out of the spoken channel; they are still
    /// logged.
    pub fn set_mute_spoken_errors(&mut self, muted: bool) {
        self.mute_spoken_errors = muted;
    }

    pub fn load_nlp_models(&mut self) -> Result<()> {
        let models_dir = self.paths.models_dir.clone();
        self.loader.load_all(&models_dir)
    }

    /// Spawns the tokenization service for the current language and
    /// connects the socket client.
    pub fn start_tokenizer(&mut self) -> Result<()> {
        let process = TokenizerProcess::spawn(&self.tokenizer_binary, self.lang)?;
        self.tokenizer_process = Some(process);
        self.tokenizer_client.connect()
    }

    /// Runs one user utterance through the decision pipeline, driving
    /// redispatches (out-of-topic restarts, language switches) to
    /// completion.
    pub fn process(&mut self, utterance: &str) -> Result<DispatchOutcome> {
        let mut current = utterance.to_string();
        loop {
            match self.dispatch(&current)? {
                TurnFlow::Done(outcome) => return Ok(outcome),
                TurnFlow::Redispatch(next) => current = next,
            }
        }
    }

    /// Recycles the tokenization service for a new locale and re-enters
    /// dispatch with the pending utterance once the client reconnected.
    pub fn switch_language(&mut self, utterance: &str, locale: Language) -> Result<DispatchOutcome> {
        match self.switch_language_flow(utterance, locale)? {
            TurnFlow::Done(outcome) => Ok(outcome),
            TurnFlow::Redispatch(next) => self.process(&next),
        }
    }

    fn dispatch(&mut self, utterance: &str) -> Result<TurnFlow> {
        let started = Instant::now();
        self.emitter.is_typing(true);

        if !self.loader.is_ready() {
            self.talk_wernicke("random_errors", false);
            self.emitter.is_typing(false);
            bail!(AriaNluError::NotReady);
        }

        let main = self.loader.models()?.main.clone();
        ner::merge_spacy_entities(&*main, &mut *self.tokenizer_client, self.lang, utterance)?;

        if let Some(context) = self.conv.active_context() {
            if context.is_in_action_loop {
                return self.handle_action_loop(utterance, started);
            }
            if !context.slots.is_empty() {
                return self
                    .handle_slot_filling(utterance, started)
                    .map(TurnFlow::Done);
            }
        }

        let output = main.process(utterance)?;
        let mut intent = output.intent.clone();
        let mut domain = output.domain.clone();
        let mut score = output.score;

        // Context-biased re-pick: a confident alternative that stays in
        // the active context beats the top-scoring classification.
        if let Some(context_name) = self.conv.active_context().map(|c| c.name.clone()) {
            for candidate in &output.classifications {
                if candidate.score <= 0.6 || candidate.intent == "None" {
                    continue;
                }
                let candidate_domain = match main.intent_domain(self.lang, &candidate.intent) {
                    Ok(candidate_domain) => candidate_domain,
                    Err(_) => continue,
                };
                let candidate_skill = skill_of(&candidate.intent);
                if format!("{}.{}", candidate_domain, candidate_skill) == context_name {
                    intent = candidate.intent.clone();
                    domain = candidate_domain;
                    score = candidate.score;
                }
            }
        }

        let locale = match Language::from_locale(&output.locale) {
            Ok(locale) => locale,
            Err(_) => {
                warn!("Locale '{}' is not supported", output.locale);
                self.talk_wernicke("random_language_not_supported", true);
                self.emitter.is_typing(false);
                return Ok(TurnFlow::Done(DispatchOutcome::Abandoned));
            }
        };
        if locale != self.lang {
            return self.switch_language_flow(utterance, locale);
        }

        let mut nlu_result = if intent == "None" {
            let fallbacks = self
                .profiles
                .get(&self.lang)
                .map(|profile| profile.fallbacks.as_slice())
                .unwrap_or(&[]);
            match fallback::match_fallback(utterance, fallbacks) {
                Some(found) => found,
                None => {
                    info!("Intent not found for \"{}\"", utterance);
                    self.talk_wernicke("random_unknown_intents", false);
                    self.emitter.is_typing(false);
                    return Ok(TurnFlow::Done(DispatchOutcome::IntentNotFound {
                        processing_time: started.elapsed(),
                        message: "Intent not found",
                    }));
                }
            }
        } else {
            let mut result = NluResult::from_classification(
                utterance,
                Classification {
                    domain: domain.clone(),
                    skill: skill_of(&intent).to_string(),
                    action: action_of(&intent).to_string(),
                    confidence: score,
                },
            );
            result.answers = output.answers.clone();
            result
        };

        info!(
            "Intent found: {} ({:.2})",
            nlu_result.classification.intent(),
            nlu_result.classification.confidence
        );
        telemetry::report_expression(utterance, self.lang, &nlu_result.classification);

        nlu_result.config_data_file_path = self.paths.skill_config_path(
            &nlu_result.classification.domain,
            &nlu_result.classification.skill,
            self.lang,
        );

        // A NER failure does not fail the turn; dispatch continues with
        // whatever entities were recovered.
        match ner::extract_entities(
            &*main,
            self.lang,
            &nlu_result.config_data_file_path,
            utterance,
        ) {
            Ok(entities) => nlu_result.entities = entities,
            Err(err) => self.report_ner_error(&err),
        }

        if self.route_slot_filling(&nlu_result)? {
            return Ok(TurnFlow::Done(DispatchOutcome::AwaitingInput));
        }

        if self
            .conv
            .active_context()
            .map_or(false, |context| context.slots.iter().any(|slot| slot.is_filled))
        {
            return self
                .handle_slot_filling(utterance, started)
                .map(TurnFlow::Done);
        }

        // Normal path: (re)activate the context and run the action.
        let context_name = nlu_result.classification.context_name();
        if self
            .conv
            .active_context()
            .map_or(false, |context| context.name != context_name)
        {
            self.conv.clean_active_context();
        }
        self.conv.set_active_context(ActiveContext {
            name: context_name,
            lang: self.lang,
            intent: nlu_result.classification.intent(),
            domain: nlu_result.classification.domain.clone(),
            action_name: nlu_result.classification.action.clone(),
            original_utterance: utterance.to_string(),
            config_data_file_path: nlu_result.config_data_file_path.clone(),
            slots: vec![],
            is_in_action_loop: false,
            next_action: None,
            entities: nlu_result.entities.clone(),
            current_entities: nlu_result.entities.clone(),
        });
        if let Some(context) = self.conv.active_context() {
            nlu_result.current_entities = context.current_entities.clone();
            nlu_result.entities = context.entities.clone();
        }

        let processed = self.execute_brain(&nlu_result)?;

        if let Some(next_action) = processed.next_action.clone() {
            if let Some(context) = self.conv.active_context_mut() {
                let skill = context.skill().to_string();
                context.intent = format!("{}.{}", skill, next_action.name);
                context.action_name = next_action.name;
                context.is_in_action_loop = next_action.action_loop.is_some();
                context.next_action = None;
            }
        }

        Ok(TurnFlow::Done(DispatchOutcome::Processed(
            ProcessedTurn::new(started.elapsed(), processed),
        )))
    }

    fn switch_language_flow(&mut self, utterance: &str, locale: Language) -> Result<TurnFlow> {
        info!("Switching language from {} to {}", self.lang, locale);
        self.talk_wernicke("random_language_switch", true);
        self.lang = locale;
        self.conv.clean_active_context();

        if let Some(mut process) = self.tokenizer_process.take() {
            if let Err(err) = process.kill_tree() {
                warn!("Could not stop the tokenization service: {}", err);
            }
        }

        let reconnected = TokenizerProcess::spawn(&self.tokenizer_binary, locale)
            .and_then(|process| {
                self.tokenizer_process = Some(process);
                self.tokenizer_client.connect()
            });
        match reconnected {
            // The pending utterance is re-dispatched exactly once, now
            // that the client is connected to the new service.
            Ok(()) => Ok(TurnFlow::Redispatch(utterance.to_string())),
            // Fire and forget: no respawn retry, the user re-drives.
            Err(err) => {
                warn!("Language switch failed: {}", err);
                self.emitter.is_typing(false);
                Ok(TurnFlow::Done(DispatchOutcome::Abandoned))
            }
        }
    }

    pub(crate) fn execute_brain(&mut self, nlu_result: &NluResult) -> Result<SkillOutcome> {
        match self.brain.execute(nlu_result) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!("Skill executor failed: {}", err);
                self.emitter.is_typing(false);
                Err(err
                    .context(AriaNluError::Executor {
                        action: nlu_result.classification.action.clone(),
                    })
                    .into())
            }
        }
    }

    pub(crate) fn talk_wernicke(&mut self, key: &str, preserve_typing: bool) {
        let phrase = self.brain.wernicke(key, None, &HashMap::new());
        self.brain.talk(&phrase, preserve_typing);
    }

    fn report_ner_error(&mut self, err: &failure::Error) {
        let (level, code) = match err.downcast_ref::<AriaNluError>() {
            Some(AriaNluError::Ner { level, code, .. }) => (*level, *code),
            _ => (NerErrorLevel::Error, "entity_extraction"),
        };
        match level {
            NerErrorLevel::Warning => warn!("{}", err),
            NerErrorLevel::Error => error!("{}", err),
        }
        if !self.mute_spoken_errors {
            self.talk_wernicke(code, true);
        }
    }
}

pub(crate) fn skill_of(intent: &str) -> &str {
    intent.split('.').next().unwrap_or_default()
}

pub(crate) fn action_of(intent: &str) -> &str {
    intent.split('.').nth(1).unwrap_or_default()
}
