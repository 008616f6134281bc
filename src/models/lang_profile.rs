use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use failure::ResultExt;
use log::warn;
use serde::Deserialize;

use crate::language::Language;

/// Per-language dispatch data that is not part of any skill, read from
/// `{data_dir}/langs.json` and keyed by locale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageProfile {
    #[serde(default)]
    pub fallbacks: Vec<FallbackRule>,
}

/// A deterministic keyword rule used when the main classifier emits no
/// intent. The rule matches when every word appears in the utterance.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackRule {
    pub words: Vec<String>,
    pub domain: String,
    pub skill: String,
    pub action: String,
}

pub type LanguageProfiles = HashMap<Language, LanguageProfile>;

/// Loads the language profiles; a missing file is not an error, the
/// dispatcher simply runs without fallback rules.
pub fn load_language_profiles(data_dir: &Path) -> crate::errors::Result<LanguageProfiles> {
    let profiles_path = data_dir.join("langs.json");
    if !profiles_path.exists() {
        warn!("No language profiles at {:?}, fallbacks disabled", profiles_path);
        return Ok(HashMap::new());
    }
    let profiles_file = File::open(&profiles_path)
        .with_context(|_| format!("Cannot open language profiles file {:?}", profiles_path))?;
    let raw: HashMap<String, LanguageProfile> = serde_json::from_reader(profiles_file)
        .with_context(|_| format!("Invalid language profiles file {:?}", profiles_path))?;

    let mut profiles = HashMap::new();
    for (locale, profile) in raw {
        match Language::from_locale(&locale) {
            Ok(language) => {
                profiles.insert(language, profile);
            }
            Err(_) => warn!("Skipping profile for unsupported locale '{}'", locale),
        }
    }
    Ok(profiles)
}
