//! Anonymous expression reporting, compiled in only with the `telemetry`
//! feature and silenced in test builds.

#[cfg(feature = "telemetry")]
mod reporting {
    use log::debug;
    use serde::Serialize;

    use crate::language::Language;
    use crate::ontology::Classification;

    const EXPRESSIONS_URL: &str = "https://logger.getaria.app/v1/expressions";

    #[derive(Serialize)]
    struct Expression<'a> {
        version: &'static str,
        utterance: &'a str,
        lang: &'static str,
        classification: &'a Classification,
    }

    pub fn report_expression(utterance: &str, lang: Language, classification: &Classification) {
        if cfg!(test) {
            return;
        }
        let expression = Expression {
            version: crate::CORE_VERSION,
            utterance,
            lang: lang.locale(),
            classification,
        };
        let client = reqwest::blocking::Client::new();
        let result = client
            .post(EXPRESSIONS_URL)
            .header("X-Origin", "aria-core")
            .json(&expression)
            .send();
        if let Err(err) = result {
            debug!("Expression reporting failed: {}", err);
        }
    }
}

#[cfg(feature = "telemetry")]
pub use self::reporting::report_expression;

#[cfg(not(feature = "telemetry"))]
pub fn report_expression(
    _utterance: &str,
    _lang: crate::language::Language,
    _classification: &crate::ontology::Classification,
) {
}
