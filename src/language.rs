use std::fmt;
use std::str::FromStr;

use failure::bail;

use crate::errors::*;

/// Languages the core can dispatch in. A locale reported by the main
/// classifier that does not map to one of these is answered with the
/// "language not supported" phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    EN,
    FR,
    ES,
    DE,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[Language::EN, Language::FR, Language::ES, Language::DE]
    }

    /// Full locale, as reported by the classifier and passed to the
    /// tokenization service.
    pub fn locale(self) -> &'static str {
        match self {
            Language::EN => "en-US",
            Language::FR => "fr-FR",
            Language::ES => "es-ES",
            Language::DE => "de-DE",
        }
    }

    /// Short code, used in on-disk data layouts.
    pub fn code(self) -> &'static str {
        match self {
            Language::EN => "en",
            Language::FR => "fr",
            Language::ES => "es",
            Language::DE => "de",
        }
    }

    pub fn from_locale(locale: &str) -> Result<Language> {
        for language in Language::all() {
            if language.locale() == locale || language.code() == locale {
                return Ok(*language);
            }
        }
        bail!(AriaNluError::UnsupportedLanguage(locale.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.locale())
    }
}

impl FromStr for Language {
    type Err = ::failure::Error;

    fn from_str(s: &str) -> Result<Language> {
        Language::from_locale(s)
    }
}
