use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use failure::bail;
use tempfile::TempDir;

use crate::brain::{Brain, ClientEmitter};
use crate::classifier::{ClassifierOutput, IntentClassifier, IntentScore, MandatorySlot};
use crate::dispatcher::{CorePaths, Dispatcher};
use crate::errors::*;
use crate::language::Language;
use crate::model_loader::{ClassifierLoader, ModelKind};
use crate::models::SkillConfig;
use crate::ontology::{Entity, NluResult, SkillOutcome};
use crate::tokenizer::{SpacyEntity, TokenizerClient};

#[derive(Default)]
pub struct ClassifierState {
    /// Scripted outputs per utterance; unscripted utterances classify as
    /// "None".
    pub outputs: HashMap<String, ClassifierOutput>,
    pub entity_outputs: HashMap<String, Vec<Entity>>,
    pub mandatory_slots: HashMap<String, Vec<MandatorySlot>>,
    pub intent_domains: HashMap<String, String>,
    pub registered_synonyms: Vec<(Language, String, String, Vec<String>)>,
    pub process_calls: Vec<String>,
    pub spell_check: bool,
    pub activated_builtin_entities: Vec<String>,
}

#[derive(Default, Clone)]
pub struct MockedClassifier {
    state: Arc<Mutex<ClassifierState>>,
}

impl MockedClassifier {
    pub fn state(&self) -> Arc<Mutex<ClassifierState>> {
        self.state.clone()
    }
}

impl IntentClassifier for MockedClassifier {
    fn process(&self, utterance: &str) -> Result<ClassifierOutput> {
        let mut state = self.state.lock().unwrap();
        state.process_calls.push(utterance.to_string());
        Ok(state
            .outputs
            .get(utterance)
            .cloned()
            .unwrap_or_else(|| ClassifierOutput {
                locale: "en-US".to_string(),
                intent: "None".to_string(),
                domain: "system".to_string(),
                score: 0.5,
                classifications: vec![],
                answers: vec![],
            }))
    }

    fn register_synonym(
        &self,
        lang: Language,
        entity: &str,
        value: &str,
        surface_forms: &[String],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let record = (
            lang,
            entity.to_string(),
            value.to_string(),
            surface_forms.to_vec(),
        );
        // Append-only, duplicates are benign.
        if !state.registered_synonyms.contains(&record) {
            state.registered_synonyms.push(record);
        }
        Ok(())
    }

    fn intent_domain(&self, _lang: Language, intent: &str) -> Result<String> {
        match self.state.lock().unwrap().intent_domains.get(intent) {
            Some(domain) => Ok(domain.clone()),
            None => bail!("Unknown intent '{}'", intent),
        }
    }

    fn mandatory_slots(&self, intent: &str) -> Result<Vec<MandatorySlot>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .mandatory_slots
            .get(intent)
            .cloned()
            .unwrap_or_default())
    }

    fn extract_entities(
        &self,
        _lang: Language,
        utterance: &str,
        _config: &SkillConfig,
    ) -> Result<Vec<Entity>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .entity_outputs
            .get(utterance)
            .cloned()
            .unwrap_or_default())
    }

    fn set_spell_check(&self, enabled: bool) {
        self.state.lock().unwrap().spell_check = enabled;
    }

    fn activate_builtin_entities(&self, entities: &[&str]) {
        self.state.lock().unwrap().activated_builtin_entities =
            entities.iter().map(|entity| entity.to_string()).collect();
    }
}

#[derive(Default)]
pub struct MockedClassifierLoader {
    global_resolvers: MockedClassifier,
    skills_resolvers: MockedClassifier,
    main: MockedClassifier,
}

impl MockedClassifierLoader {
    pub fn with_main(mut self, main: MockedClassifier) -> Self {
        self.main = main;
        self
    }

    pub fn with_global_resolvers(mut self, classifier: MockedClassifier) -> Self {
        self.global_resolvers = classifier;
        self
    }

    pub fn with_skills_resolvers(mut self, classifier: MockedClassifier) -> Self {
        self.skills_resolvers = classifier;
        self
    }
}

impl ClassifierLoader for MockedClassifierLoader {
    fn load(&self, kind: ModelKind, _path: &std::path::Path) -> Result<Box<dyn IntentClassifier>> {
        let classifier = match kind {
            ModelKind::GlobalResolvers => self.global_resolvers.clone(),
            ModelKind::SkillsResolvers => self.skills_resolvers.clone(),
            ModelKind::Main => self.main.clone(),
        };
        Ok(Box::new(classifier))
    }
}

#[derive(Default)]
pub struct BrainState {
    /// `(phrase, preserve_typing)` in speaking order.
    pub talks: Vec<(String, bool)>,
    pub executions: Vec<NluResult>,
    /// Scripted outcomes per action name.
    pub outcomes: HashMap<String, SkillOutcome>,
    pub failing_actions: Vec<String>,
}

#[derive(Default, Clone)]
pub struct MockedBrain {
    state: Arc<Mutex<BrainState>>,
}

impl MockedBrain {
    pub fn state(&self) -> Arc<Mutex<BrainState>> {
        self.state.clone()
    }
}

impl Brain for MockedBrain {
    fn execute(&mut self, nlu_result: &NluResult) -> Result<SkillOutcome> {
        let mut state = self.state.lock().unwrap();
        state.executions.push(nlu_result.clone());
        let action = &nlu_result.classification.action;
        if state.failing_actions.contains(action) {
            bail!("Skill '{}' crashed", action);
        }
        Ok(state.outcomes.get(action).cloned().unwrap_or_else(|| {
            SkillOutcome {
                execution_time: 5,
                ..SkillOutcome::default()
            }
        }))
    }

    fn talk(&mut self, phrase: &str, preserve_typing: bool) {
        self.state
            .lock()
            .unwrap()
            .talks
            .push((phrase.to_string(), preserve_typing));
    }

    fn wernicke(
        &self,
        key: &str,
        _subkey: Option<&str>,
        _vars: &HashMap<String, String>,
    ) -> String {
        key.to_string()
    }
}

#[derive(Default)]
pub struct EmitterState {
    pub typing_events: Vec<bool>,
    pub suggestions: Vec<Vec<String>>,
}

#[derive(Default, Clone)]
pub struct MockedEmitter {
    state: Arc<Mutex<EmitterState>>,
}

impl MockedEmitter {
    pub fn state(&self) -> Arc<Mutex<EmitterState>> {
        self.state.clone()
    }
}

impl ClientEmitter for MockedEmitter {
    fn is_typing(&mut self, on: bool) {
        self.state.lock().unwrap().typing_events.push(on);
    }

    fn suggest(&mut self, suggestions: &[String]) {
        self.state
            .lock()
            .unwrap()
            .suggestions
            .push(suggestions.to_vec());
    }
}

#[derive(Default)]
pub struct MockedTokenizerClient {
    pub spacy_outputs: HashMap<String, Vec<SpacyEntity>>,
    pub connects: Arc<Mutex<usize>>,
    pub fail_connect: Arc<Mutex<bool>>,
}

impl TokenizerClient for MockedTokenizerClient {
    fn connect(&mut self) -> Result<()> {
        *self.connects.lock().unwrap() += 1;
        if *self.fail_connect.lock().unwrap() {
            bail!("Tokenization service is unreachable");
        }
        Ok(())
    }

    fn spacy_entities(&mut self, utterance: &str) -> Result<Vec<SpacyEntity>> {
        Ok(self
            .spacy_outputs
            .get(utterance)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn classifier_output(
    locale: &str,
    intent: &str,
    domain: &str,
    score: f32,
) -> ClassifierOutput {
    ClassifierOutput {
        locale: locale.to_string(),
        intent: intent.to_string(),
        domain: domain.to_string(),
        score,
        classifications: vec![IntentScore {
            intent: intent.to_string(),
            score,
        }],
        answers: vec![],
    }
}

/// A dispatcher wired to mocked collaborators, with handles on their
/// recorded state.
pub struct TestHarness {
    pub dispatcher: Dispatcher,
    pub brain: Arc<Mutex<BrainState>>,
    pub emitter: Arc<Mutex<EmitterState>>,
    pub main: MockedClassifier,
    pub global_resolvers: MockedClassifier,
    pub skills_resolvers: MockedClassifier,
    pub connects: Arc<Mutex<usize>>,
    pub fail_connect: Arc<Mutex<bool>>,
    _models_dir: TempDir,
    data_dir: TempDir,
    skills_dir: TempDir,
}

impl TestHarness {
    pub fn write_skill_config(&self, domain: &str, skill: &str, json: &str) {
        let config_dir = self.skills_dir.path().join(domain).join(skill).join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("en.json"), json).unwrap();
    }

    pub fn skill_config_path(&self, domain: &str, skill: &str) -> PathBuf {
        self.skills_dir
            .path()
            .join(domain)
            .join(skill)
            .join("config")
            .join("en.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.path().to_path_buf()
    }

    #[cfg(unix)]
    pub fn use_sleeping_tokenizer(&mut self) {
        use std::os::unix::fs::PermissionsExt;

        let script_path = self.data_dir.path().join("tokenizer.sh");
        fs::write(&script_path, "#!/bin/sh\nsleep 30\n").unwrap();
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755)).unwrap();
        self.dispatcher.tokenizer_binary = script_path;
    }
}

#[cfg(unix)]
pub fn process_group_exists(pid: u32) -> bool {
    unsafe { libc::kill(-(pid as i32), 0) == 0 }
}

pub struct HarnessBuilder {
    lang: Language,
    fallbacks_json: Option<String>,
    skip_model_loading: bool,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        HarnessBuilder {
            lang: Language::EN,
            fallbacks_json: None,
            skip_model_loading: false,
        }
    }
}

impl HarnessBuilder {
    pub fn fallbacks(mut self, json: &str) -> Self {
        self.fallbacks_json = Some(json.to_string());
        self
    }

    pub fn skip_model_loading(mut self) -> Self {
        self.skip_model_loading = true;
        self
    }

    pub fn build(self) -> TestHarness {
        let models_dir = tempfile::tempdir().unwrap();
        for kind in ModelKind::all() {
            fs::write(models_dir.path().join(kind.file_name()), b"model").unwrap();
        }
        let data_dir = tempfile::tempdir().unwrap();
        if let Some(json) = self.fallbacks_json.as_ref() {
            fs::write(data_dir.path().join("langs.json"), json).unwrap();
        }
        let skills_dir = tempfile::tempdir().unwrap();

        let main = MockedClassifier::default();
        let global_resolvers = MockedClassifier::default();
        let skills_resolvers = MockedClassifier::default();
        let loader = MockedClassifierLoader::default()
            .with_main(main.clone())
            .with_global_resolvers(global_resolvers.clone())
            .with_skills_resolvers(skills_resolvers.clone());

        let brain = MockedBrain::default();
        let brain_state = brain.state();
        let emitter = MockedEmitter::default();
        let emitter_state = emitter.state();
        let client = MockedTokenizerClient::default();
        let connects = client.connects.clone();
        let fail_connect = client.fail_connect.clone();

        let paths = CorePaths {
            models_dir: models_dir.path().to_path_buf(),
            data_dir: data_dir.path().to_path_buf(),
            skills_dir: skills_dir.path().to_path_buf(),
        };
        let mut dispatcher = Dispatcher::new(
            self.lang,
            paths,
            Arc::new(loader),
            Box::new(brain),
            Box::new(emitter),
            Box::new(client),
            PathBuf::from("/bin/true"),
        )
        .unwrap();
        if !self.skip_model_loading {
            dispatcher.load_nlp_models().unwrap();
        }

        TestHarness {
            dispatcher,
            brain: brain_state,
            emitter: emitter_state,
            main,
            global_resolvers,
            skills_resolvers,
            connects,
            fail_connect,
            _models_dir: models_dir,
            data_dir,
            skills_dir,
        }
    }
}
