use std::fmt;

use failure::Fail;

/// Severity of an entity-extraction failure, used to pick the log channel
/// and the register of the spoken phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerErrorLevel {
    Warning,
    Error,
}

impl fmt::Display for NerErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NerErrorLevel::Warning => write!(f, "warning"),
            NerErrorLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Fail)]
pub enum AriaNluError {
    #[fail(display = "NLP models are not loaded")]
    NotReady,
    #[fail(
        display = "Missing {} model at '{}', train it with `{}`",
        model, path, command
    )]
    ModelMissing {
        model: &'static str,
        path: String,
        command: &'static str,
    },
    #[fail(display = "Unable to load {} model", model)]
    ModelLoad { model: &'static str },
    #[fail(display = "Language '{}' is not supported", _0)]
    UnsupportedLanguage(String),
    #[fail(display = "NER {} [{}]: {}", level, code, data)]
    Ner {
        level: NerErrorLevel,
        code: &'static str,
        data: String,
    },
    #[fail(display = "Skill executor failed on action '{}'", action)]
    Executor { action: String },
}

impl AriaNluError {
    pub fn ner_warning(code: &'static str, data: String) -> Self {
        AriaNluError::Ner {
            level: NerErrorLevel::Warning,
            code,
            data,
        }
    }

    pub fn ner_error(code: &'static str, data: String) -> Self {
        AriaNluError::Ner {
            level: NerErrorLevel::Error,
            code,
            data,
        }
    }
}

pub type Result<T> = ::std::result::Result<T, ::failure::Error>;
