use std::path::Path;
use std::sync::Arc;
use std::thread;

use failure::{bail, format_err, ResultExt};
use log::info;

use crate::classifier::IntentClassifier;
use crate::errors::*;
use crate::ner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    GlobalResolvers,
    SkillsResolvers,
    Main,
}

impl ModelKind {
    pub fn all() -> &'static [ModelKind] {
        &[
            ModelKind::GlobalResolvers,
            ModelKind::SkillsResolvers,
            ModelKind::Main,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::GlobalResolvers => "global resolvers",
            ModelKind::SkillsResolvers => "skills resolvers",
            ModelKind::Main => "main",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::GlobalResolvers => "aria-global-resolvers-model.nlp",
            ModelKind::SkillsResolvers => "aria-skills-resolvers-model.nlp",
            ModelKind::Main => "aria-main-model.nlp",
        }
    }

    /// Command the operator must run when the model file is missing.
    pub fn train_command(self) -> &'static str {
        match self {
            ModelKind::GlobalResolvers => "aria train global-resolvers",
            ModelKind::SkillsResolvers => "aria train skills-resolvers",
            ModelKind::Main => "aria train main",
        }
    }
}

/// Loads one classifier model from disk. This is the opaque classifier
/// library's loading entry point.
pub trait ClassifierLoader: Send + Sync {
    fn load(&self, kind: ModelKind, path: &Path) -> Result<Box<dyn IntentClassifier>>;
}

/// The three classifiers the dispatcher works with, available once
/// loading succeeded for all of them.
pub struct ModelSet {
    pub global_resolvers: Arc<dyn IntentClassifier>,
    pub skills_resolvers: Arc<dyn IntentClassifier>,
    pub main: Arc<dyn IntentClassifier>,
}

pub struct ModelLoader {
    loader: Arc<dyn ClassifierLoader>,
    models: Option<ModelSet>,
}

impl ModelLoader {
    pub fn new(loader: Arc<dyn ClassifierLoader>) -> ModelLoader {
        ModelLoader {
            loader,
            models: None,
        }
    }

    /// Loads the three classifier models concurrently and joins. Any
    /// failure is fatal for the whole set: `is_ready()` stays false and
    /// the dispatcher keeps rejecting turns.
    pub fn load_all(&mut self, models_dir: &Path) -> Result<()> {
        let handles: Vec<_> = ModelKind::all()
            .iter()
            .map(|kind| {
                let kind = *kind;
                let loader = self.loader.clone();
                let path = models_dir.join(kind.file_name());
                thread::spawn(move || load_one(&*loader, kind, &path))
            })
            .collect();

        let mut loaded = Vec::with_capacity(handles.len());
        for handle in handles {
            let classifier = handle
                .join()
                .map_err(|_| format_err!("Model loading thread panicked"))??;
            loaded.push(classifier);
        }

        let main = loaded.pop().unwrap();
        let skills_resolvers = loaded.pop().unwrap();
        let global_resolvers = loaded.pop().unwrap();

        main.activate_builtin_entities(ner::builtin_entities());

        self.models = Some(ModelSet {
            global_resolvers: Arc::from(global_resolvers),
            skills_resolvers: Arc::from(skills_resolvers),
            main: Arc::from(main),
        });
        info!("NLP models loaded");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.models.is_some()
    }

    pub fn models(&self) -> Result<&ModelSet> {
        self.models
            .as_ref()
            .ok_or_else(|| AriaNluError::NotReady.into())
    }
}

fn load_one(
    loader: &dyn ClassifierLoader,
    kind: ModelKind,
    path: &Path,
) -> Result<Box<dyn IntentClassifier>> {
    if !path.exists() {
        bail!(AriaNluError::ModelMissing {
            model: kind.label(),
            path: path.to_string_lossy().to_string(),
            command: kind.train_command(),
        });
    }
    info!("Loading {} model ({:?}) ...", kind.label(), path);
    let classifier = loader
        .load(kind, path)
        .with_context(|_| AriaNluError::ModelLoad { model: kind.label() })?;
    classifier.set_spell_check(true);
    info!("{} model loaded", kind.label());
    Ok(classifier)
}
