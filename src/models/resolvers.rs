use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use failure::ResultExt;
use serde::Deserialize;

use crate::language::Language;
use crate::models::skill_config::ResolverIntent;

/// A shared resolver definition, read from
/// `{data_dir}/{lang}/global-resolvers/{name}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalResolverModel {
    #[serde(default)]
    pub name: Option<String>,
    pub intents: HashMap<String, ResolverIntent>,
}

impl GlobalResolverModel {
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::errors::Result<GlobalResolverModel> {
        let model_file = File::open(path.as_ref())
            .with_context(|_| format!("Cannot open global resolver file {:?}", path.as_ref()))?;
        let model = serde_json::from_reader(model_file)
            .with_context(|_| format!("Invalid global resolver file {:?}", path.as_ref()))?;
        Ok(model)
    }
}

pub fn global_resolver_path(data_dir: &Path, lang: Language, name: &str) -> PathBuf {
    data_dir
        .join(lang.code())
        .join("global-resolvers")
        .join(format!("{}.json", name))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_load_global_resolver() {
        // Given
        let data_dir = tempfile::tempdir().unwrap();
        let resolvers_dir = data_dir.path().join("en").join("global-resolvers");
        fs::create_dir_all(&resolvers_dir).unwrap();
        fs::write(
            resolvers_dir.join("answer.json"),
            r#"{"intents": {"denial": {"value": "denial"}, "affirmation": {"value": "affirmation"}}}"#,
        )
        .unwrap();

        // When
        let path = global_resolver_path(data_dir.path(), Language::EN, "answer");
        let model = GlobalResolverModel::from_path(&path).unwrap();

        // Then
        assert_eq!("denial", model.intents["denial"].value);
        assert_eq!("affirmation", model.intents["affirmation"].value);
    }
}
