//! Panel scenarios driven end to end through mock capabilities.

use std::sync::Arc;
use std::time::Duration;

use textlens_lib::capability::mock::{MockDetector, MockProvider, MockSummarizer, MockTranslator};
use textlens_lib::capability::types::{Availability, CapabilityKind, LanguageCandidate};
use textlens_lib::config::AppConfig;
use textlens_lib::panel::{PanelSinks, TextPanel};
use textlens_lib::sink::MemorySink;
use textlens_lib::tasks::event_bus::{EventBus, TaskEvent};
use textlens_lib::tasks::state::TaskSettings;
use textlens_lib::tasks::summarize::{DisplayedText, SummarizationTask};

struct Sinks {
    detected: Arc<MemorySink>,
    output: Arc<MemorySink>,
    summary: Arc<MemorySink>,
    error: Arc<MemorySink>,
}

fn build(provider: Arc<MockProvider>) -> (TextPanel, Sinks) {
    let sinks = Sinks {
        detected: Arc::new(MemorySink::new()),
        output: Arc::new(MemorySink::new()),
        summary: Arc::new(MemorySink::new()),
        error: Arc::new(MemorySink::new()),
    };
    let panel = TextPanel::new(
        provider,
        &AppConfig::default(),
        PanelSinks {
            detected: sinks.detected.clone(),
            output: sinks.output.clone(),
            summary: sinks.summary.clone(),
            error: sinks.error.clone(),
        },
    );
    (panel, sinks)
}

fn candidate(tag: &str, confidence: f64) -> LanguageCandidate {
    LanguageCandidate {
        tag: tag.into(),
        confidence,
    }
}

#[tokio::test]
async fn detects_french() {
    let provider = Arc::new(MockProvider::empty("host").with_detector(MockDetector::ready(
        CapabilityKind::LanguageDetector,
        vec![candidate("fr", 0.95)],
    )));
    let (panel, sinks) = build(provider);

    panel.set_input("Bonjour le monde").await;
    panel.detect().await;

    assert_eq!(
        sinks.detected.entries(),
        vec!["95.0% sure that this is French"]
    );
    assert!(sinks.error.is_empty());
}

#[tokio::test]
async fn translates_and_clears_the_input() {
    let provider = Arc::new(
        MockProvider::empty("host")
            .with_detector(MockDetector::ready(
                CapabilityKind::LanguageDetector,
                vec![candidate("en", 0.9)],
            ))
            .with_translator(MockTranslator::ready(CapabilityKind::Translator, "Hola".into())),
    );
    let (panel, sinks) = build(provider.clone());

    panel.set_input("Hello").await;
    panel.translate("es").await;

    assert_eq!(sinks.output.entries(), vec!["Hola"]);
    assert_eq!(sinks.detected.last().as_deref(), Some("90.0% sure that this is English"));
    assert_eq!(panel.input().await, "");
    assert!(sinks.error.is_empty());

    let translator = provider.translator_mock().expect("translator");
    let options = translator.last_options().expect("created");
    assert_eq!(options.source_language, "en");
    assert_eq!(options.target_language, "es");
    assert_eq!(translator.calls().destroy(), 1);
}

#[tokio::test]
async fn ready_summarizer_writes_the_summary() {
    let provider = Arc::new(MockProvider::empty("host").with_summarizer(MockSummarizer::ready(
        CapabilityKind::Summarizer,
        "- The gist".into(),
    )));
    let (panel, sinks) = build(provider.clone());

    panel.set_input("A long article about nothing in particular.").await;
    panel.summarize().await;

    assert_eq!(sinks.summary.entries(), vec!["- The gist"]);
    let calls = provider.summarizer_mock().expect("summarizer").calls();
    assert_eq!(calls.create(), 1);
    assert_eq!(calls.invoke(), 1);
    assert_eq!(calls.destroy(), 1);
    assert_eq!(calls.monitored(), 0);
}

#[tokio::test]
async fn downloading_summarizer_reports_progress_only() {
    let provider = Arc::new(
        MockProvider::empty("host").with_summarizer(
            MockSummarizer::ready(CapabilityKind::Summarizer, "- unused".into())
                .with_availability(Availability::Downloadable)
                .with_download(vec![(10, 100)], true),
        ),
    );
    let (panel, sinks) = build(provider.clone());
    let mut rx = panel.events().subscribe();

    panel.set_input("Some text worth summarizing.").await;
    panel.summarize().await;

    assert!(sinks.summary.is_empty());
    assert!(sinks.error.is_empty());

    let mut progress = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let TaskEvent::DownloadProgress { loaded, total, .. } = event {
            progress.push((loaded, total));
        }
    }
    assert_eq!(progress, vec![(10, 100)]);

    let calls = provider.summarizer_mock().expect("summarizer").calls();
    assert_eq!(calls.monitored(), 1);
    assert_eq!(calls.invoke(), 0);
    assert_eq!(calls.destroy(), 1);
}

#[tokio::test]
async fn same_kind_invocations_run_one_at_a_time() {
    let provider = Arc::new(MockProvider::empty("host").with_summarizer(
        MockSummarizer::responding(CapabilityKind::Summarizer, |text, _| Ok(text.to_uppercase()))
            .with_delay(Duration::from_millis(20)),
    ));
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let task = SummarizationTask::new(
        provider.clone(),
        TaskSettings::default(),
        events,
        Default::default(),
    );

    let none = DisplayedText::Empty;
    let (first, second) = tokio::join!(task.run("first", &none), task.run("second", &none));
    assert!(first.is_ok());
    assert!(second.is_ok());

    let calls = provider.summarizer_mock().expect("summarizer").calls();
    assert_eq!(calls.inputs(), vec!["first", "second"]);

    // Every event of one invocation precedes every event of the next.
    let mut order = Vec::new();
    while let Ok(TaskEvent::StateChanged { invocation, .. }) = rx.try_recv() {
        if order.last() != Some(&invocation) {
            order.push(invocation);
        }
    }
    assert_eq!(order.len(), 2);
}

#[tokio::test]
async fn demo_provider_handles_the_whole_panel() {
    let (panel, sinks) = build(Arc::new(MockProvider::demo()));

    panel.set_input("Hello there. General Kenobi.").await;
    panel.display().await;
    panel.translate("fr").await;
    panel.summarize().await;

    assert_eq!(
        sinks.output.entries(),
        vec!["Hello there. General Kenobi.", "[fr] Hello there. General Kenobi."]
    );
    assert_eq!(sinks.detected.last().as_deref(), Some("50.0% sure that this is English"));
    // The input was cleared by the translation, so the displayed text is summarized.
    assert_eq!(sinks.summary.last().as_deref(), Some("- Hello there"));
    assert!(sinks.error.is_empty());
}
