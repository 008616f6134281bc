use std::collections::HashMap;

use crate::errors::*;
use crate::ontology::{NluResult, SkillOutcome};

/// The external executor that runs a selected skill action and produces
/// the spoken reply.
pub trait Brain {
    fn execute(&mut self, nlu_result: &NluResult) -> Result<SkillOutcome>;

    /// Speaks a phrase to the user. When `preserve_typing` is set the
    /// typing indicator is left as-is, so chained announcements do not
    /// flicker it.
    fn talk(&mut self, phrase: &str, preserve_typing: bool);

    /// Phrase template lookup by key, opaque to the core.
    fn wernicke(&self, key: &str, subkey: Option<&str>, vars: &HashMap<String, String>)
        -> String;
}

/// Events streamed to the end user over the client socket.
pub trait ClientEmitter {
    fn is_typing(&mut self, on: bool);

    fn suggest(&mut self, suggestions: &[String]);
}
