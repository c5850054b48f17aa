use std::fmt;
use std::sync::Arc;

use crate::capability::provider::{CapabilityProvider, DetectorCapability};
use crate::capability::types::{CapabilityKind, DetectorOptions, LanguageCandidate};
use crate::errors::{TextLensError, TextLensResult};
use crate::locale::{name_or_tag, IsoLocaleNames, LocaleNames};
use crate::tasks::event_bus::EventBus;
use crate::tasks::gated::{CapabilityGatedTask, GatedOutcome};
use crate::tasks::state::TaskSettings;

/// The winning candidate, resolved to a display name.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub tag: String,
    pub name: String,
    pub confidence: f64,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sure that this is {}",
            format_confidence(self.confidence),
            self.name
        )
    }
}

/// `0.8734` → `"87.3%"`. Ties round up, so `0.0125` is `"1.3%"`.
pub fn format_confidence(confidence: f64) -> String {
    let tenths = (confidence.clamp(0.0, 1.0) * 1000.0).round();
    format!("{:.1}%", tenths / 10.0)
}

pub struct LanguageDetectionTask {
    gated: CapabilityGatedTask<DetectorCapability>,
    options: DetectorOptions,
    names: Arc<dyn LocaleNames>,
    display_locale: String,
}

impl LanguageDetectionTask {
    pub fn new(
        provider: Arc<dyn CapabilityProvider>,
        settings: TaskSettings,
        events: EventBus,
        display_locale: impl Into<String>,
    ) -> Self {
        Self {
            gated: CapabilityGatedTask::new(
                CapabilityKind::LanguageDetector,
                provider,
                |p: &dyn CapabilityProvider| p.language_detector(),
                settings,
                events,
            ),
            options: DetectorOptions::default(),
            names: Arc::new(IsoLocaleNames),
            display_locale: display_locale.into(),
        }
    }

    pub fn with_locale_names(mut self, names: Arc<dyn LocaleNames>) -> Self {
        self.names = names;
        self
    }

    pub fn with_options(mut self, options: DetectorOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(&self, text: &str) -> TextLensResult<GatedOutcome<Detection>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TextLensError::EmptyInput);
        }

        let candidates = match self.gated.run(&self.options, text.to_string()).await? {
            GatedOutcome::Completed(c) => c,
            GatedOutcome::Downloading => return Ok(GatedOutcome::Downloading),
        };
        let top = top_candidate(candidates)?;
        let name = name_or_tag(self.names.as_ref(), &top.tag, &self.display_locale);
        tracing::info!(tag = %top.tag, name = %name, confidence = top.confidence, "language detected");

        Ok(GatedOutcome::Completed(Detection {
            tag: top.tag,
            name,
            confidence: top.confidence,
        }))
    }
}

/// The detector ranks by descending confidence; the first entry wins.
fn top_candidate(candidates: Vec<LanguageCandidate>) -> TextLensResult<LanguageCandidate> {
    let top = candidates
        .into_iter()
        .next()
        .ok_or_else(|| TextLensError::InvocationFailed {
            kind: CapabilityKind::LanguageDetector,
            reason: "detector returned no candidates".into(),
        })?;
    if !top.confidence.is_finite() {
        return Err(TextLensError::InvocationFailed {
            kind: CapabilityKind::LanguageDetector,
            reason: format!("confidence {} is not a number", top.confidence),
        });
    }
    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::mock::{MockDetector, MockProvider};
    use crate::capability::types::Availability;

    fn candidates(list: &[(&str, f64)]) -> Vec<LanguageCandidate> {
        list.iter()
            .map(|(tag, confidence)| LanguageCandidate {
                tag: tag.to_string(),
                confidence: *confidence,
            })
            .collect()
    }

    fn task_with(detector: MockDetector) -> LanguageDetectionTask {
        let provider = MockProvider::empty("test").with_detector(detector);
        LanguageDetectionTask::new(
            Arc::new(provider),
            TaskSettings::default(),
            EventBus::new(),
            "en",
        )
    }

    #[test]
    fn confidence_has_one_decimal() {
        assert_eq!(format_confidence(0.8734), "87.3%");
        assert_eq!(format_confidence(0.95), "95.0%");
        assert_eq!(format_confidence(1.0), "100.0%");
        assert_eq!(format_confidence(0.0), "0.0%");
    }

    #[test]
    fn confidence_ties_round_up() {
        assert_eq!(format_confidence(0.0025), "0.3%");
        assert_eq!(format_confidence(0.0125), "1.3%");
        assert_eq!(format_confidence(0.5555), "55.6%");
    }

    #[tokio::test]
    async fn expected_languages_reach_the_detector() {
        let provider = MockProvider::empty("test").with_detector(MockDetector::ready(
            CapabilityKind::LanguageDetector,
            candidates(&[("fr", 0.7)]),
        ));
        let detector = provider.detector_mock().unwrap();
        let task = LanguageDetectionTask::new(
            Arc::new(provider),
            TaskSettings::default(),
            EventBus::new(),
            "en",
        )
        .with_options(DetectorOptions {
            expected_input_languages: vec!["fr".into(), "it".into()],
        });

        task.run("Bonjour").await.unwrap();

        let options = detector.last_options().unwrap();
        assert_eq!(options.expected_input_languages, vec!["fr", "it"]);
    }

    struct Shouting;

    impl LocaleNames for Shouting {
        fn display_name(&self, tag: &str, _display_locale: &str) -> TextLensResult<String> {
            Ok(tag.to_uppercase())
        }
    }

    #[tokio::test]
    async fn custom_locale_names_are_used() {
        let detector =
            MockDetector::ready(CapabilityKind::LanguageDetector, candidates(&[("fr", 0.5)]));
        let task = task_with(detector).with_locale_names(Arc::new(Shouting));

        let GatedOutcome::Completed(detection) = task.run("Salut").await.unwrap() else {
            panic!("expected a detection");
        };
        assert_eq!(detection.to_string(), "50.0% sure that this is FR");
    }

    #[tokio::test]
    async fn reports_the_first_ranked_candidate() {
        let detector = MockDetector::ready(
            CapabilityKind::LanguageDetector,
            candidates(&[("de", 0.8734), ("nl", 0.1), ("en", 0.02)]),
        );
        let calls = detector.calls();
        let task = task_with(detector);

        let GatedOutcome::Completed(detection) = task.run("  Guten Morgen  ").await.unwrap() else {
            panic!("expected a detection");
        };

        assert_eq!(detection.to_string(), "87.3% sure that this is German");
        assert_eq!(calls.inputs(), vec!["Guten Morgen".to_string()]);
        assert_eq!(calls.destroy(), 1);
    }

    #[tokio::test]
    async fn blank_input_never_reaches_the_detector() {
        let detector = MockDetector::ready(CapabilityKind::LanguageDetector, Vec::new());
        let calls = detector.calls();
        let task = task_with(detector);

        for blank in ["", "   ", "\n\t"] {
            assert!(matches!(task.run(blank).await, Err(TextLensError::EmptyInput)));
        }
        assert!(calls.untouched());
    }

    #[tokio::test]
    async fn unknown_tag_is_shown_raw() {
        let detector =
            MockDetector::ready(CapabilityKind::LanguageDetector, candidates(&[("zz", 0.5)]));
        let task = task_with(detector);

        let GatedOutcome::Completed(detection) = task.run("???").await.unwrap() else {
            panic!("expected a detection");
        };
        assert_eq!(detection.to_string(), "50.0% sure that this is zz");
    }

    #[tokio::test]
    async fn empty_candidate_list_is_a_failure_and_releases() {
        let detector = MockDetector::ready(CapabilityKind::LanguageDetector, Vec::new());
        let calls = detector.calls();
        let task = task_with(detector);

        let err = task.run("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "Language detection failed");
        assert_eq!(calls.destroy(), 1);
    }

    #[tokio::test]
    async fn unavailable_detector_is_never_created() {
        let detector = MockDetector::ready(CapabilityKind::LanguageDetector, Vec::new())
            .with_availability(Availability::Unavailable);
        let calls = detector.calls();
        let task = task_with(detector);

        let err = task.run("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "Language detection not supported");
        assert_eq!(calls.create(), 0);
        assert_eq!(calls.invoke(), 0);
    }

    #[tokio::test]
    async fn failed_invocation_is_released_once() {
        let detector = MockDetector::ready(CapabilityKind::LanguageDetector, Vec::new())
            .failing_invoke("model crashed");
        let calls = detector.calls();
        let task = task_with(detector);

        let err = task.run("hello").await.unwrap_err();
        assert!(matches!(err, TextLensError::InvocationFailed { .. }));
        assert_eq!(calls.invoke(), 1);
        assert_eq!(calls.destroy(), 1);
    }
}
