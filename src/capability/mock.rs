//! Deterministic in-process capabilities.
//!
//! Used by the test suite and by the built-in `mock` provider so the panel
//! runs without any backend. Every call is counted in [`MockCalls`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::capability::monitor::DownloadMonitor;
use crate::capability::provider::{
    BoxSession, Capability, CapabilityProvider, CapabilitySession, DetectorCapability,
    SummarizerCapability, TranslatorCapability,
};
use crate::capability::types::{
    Availability, CapabilityKind, DetectorOptions, DownloadProgress, LanguageCandidate,
    SummarizerOptions, TranslatorOptions,
};
use crate::errors::{TextLensError, TextLensResult};

type Responder<Opt, Out> = Arc<dyn Fn(&str, &Opt) -> Result<Out, String> + Send + Sync>;

#[derive(Debug, Default)]
pub struct MockCalls {
    availability: AtomicUsize,
    create: AtomicUsize,
    monitored: AtomicUsize,
    invoke: AtomicUsize,
    destroy: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl MockCalls {
    pub fn availability(&self) -> usize {
        self.availability.load(Ordering::SeqCst)
    }

    pub fn create(&self) -> usize {
        self.create.load(Ordering::SeqCst)
    }

    /// Number of `create` calls that came with a download monitor attached.
    pub fn monitored(&self) -> usize {
        self.monitored.load(Ordering::SeqCst)
    }

    pub fn invoke(&self) -> usize {
        self.invoke.load(Ordering::SeqCst)
    }

    pub fn destroy(&self) -> usize {
        self.destroy.load(Ordering::SeqCst)
    }

    /// True when nothing at all was asked of the capability.
    pub fn untouched(&self) -> bool {
        self.availability() == 0 && self.create() == 0 && self.invoke() == 0
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

pub struct MockCapability<Opt, Out> {
    kind: CapabilityKind,
    availability: Availability,
    responder: Responder<Opt, Out>,
    create_error: Option<String>,
    download_steps: Vec<DownloadProgress>,
    download_completes: bool,
    invoke_delay: Option<Duration>,
    calls: Arc<MockCalls>,
    last_options: Mutex<Option<Opt>>,
    // Monitors of downloads that never finish stay open here.
    stalled: Mutex<Vec<DownloadMonitor>>,
}

impl<Opt, Out> MockCapability<Opt, Out>
where
    Opt: Clone + Send + Sync + 'static,
    Out: Clone + Send + Sync + 'static,
{
    /// A `Ready` capability that always answers with `output`.
    pub fn ready(kind: CapabilityKind, output: Out) -> Self {
        Self::responding(kind, move |_, _| Ok(output.clone()))
    }

    /// A `Ready` capability whose answer is computed from input and options.
    pub fn responding(
        kind: CapabilityKind,
        responder: impl Fn(&str, &Opt) -> Result<Out, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            availability: Availability::Ready,
            responder: Arc::new(responder),
            create_error: None,
            download_steps: Vec::new(),
            download_completes: true,
            invoke_delay: None,
            calls: Arc::new(MockCalls::default()),
            last_options: Mutex::new(None),
            stalled: Mutex::new(Vec::new()),
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Progress reported through the monitor during `create`. When
    /// `completes` is false the ready signal is never sent.
    pub fn with_download(mut self, steps: Vec<(u64, u64)>, completes: bool) -> Self {
        self.download_steps = steps
            .into_iter()
            .map(|(loaded, total)| DownloadProgress { loaded, total })
            .collect();
        self.download_completes = completes;
        self
    }

    pub fn failing_create(mut self, reason: impl Into<String>) -> Self {
        self.create_error = Some(reason.into());
        self
    }

    pub fn failing_invoke(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.responder = Arc::new(move |_, _| Err(reason.clone()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.invoke_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<MockCalls> {
        self.calls.clone()
    }

    pub fn last_options(&self) -> Option<Opt> {
        self.last_options.lock().ok().and_then(|o| o.clone())
    }
}

#[async_trait]
impl<Opt, Out> Capability for MockCapability<Opt, Out>
where
    Opt: Clone + Send + Sync + 'static,
    Out: Clone + Send + Sync + 'static,
{
    type Options = Opt;
    type Input = String;
    type Output = Out;

    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    async fn availability(&self) -> TextLensResult<Availability> {
        self.calls.availability.fetch_add(1, Ordering::SeqCst);
        Ok(self.availability)
    }

    async fn create(
        &self,
        options: &Opt,
        monitor: Option<DownloadMonitor>,
    ) -> TextLensResult<BoxSession<String, Out>> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_options.lock() {
            *last = Some(options.clone());
        }

        if let Some(monitor) = monitor {
            self.calls.monitored.fetch_add(1, Ordering::SeqCst);
            for step in &self.download_steps {
                monitor.progress(step.loaded, step.total);
            }
            if self.download_completes {
                monitor.ready();
            } else if let Ok(mut stalled) = self.stalled.lock() {
                stalled.push(monitor);
            }
        }

        if let Some(reason) = &self.create_error {
            return Err(TextLensError::Backend(reason.clone()));
        }

        Ok(Box::new(MockSession {
            options: options.clone(),
            responder: self.responder.clone(),
            invoke_delay: self.invoke_delay,
            calls: self.calls.clone(),
        }))
    }
}

struct MockSession<Opt, Out> {
    options: Opt,
    responder: Responder<Opt, Out>,
    invoke_delay: Option<Duration>,
    calls: Arc<MockCalls>,
}

#[async_trait]
impl<Opt, Out> CapabilitySession for MockSession<Opt, Out>
where
    Opt: Send + Sync + 'static,
    Out: Send + 'static,
{
    type Input = String;
    type Output = Out;

    async fn invoke(&mut self, input: String) -> TextLensResult<Out> {
        self.calls.invoke.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inputs) = self.calls.inputs.lock() {
            inputs.push(input.clone());
        }
        if let Some(delay) = self.invoke_delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&input, &self.options).map_err(TextLensError::Backend)
    }

    async fn destroy(&mut self) {
        self.calls.destroy.fetch_add(1, Ordering::SeqCst);
    }
}

pub type MockDetector = MockCapability<DetectorOptions, Vec<LanguageCandidate>>;
pub type MockTranslator = MockCapability<TranslatorOptions, String>;
pub type MockSummarizer = MockCapability<SummarizerOptions, String>;

/// A host whose features are individually present or absent.
pub struct MockProvider {
    name: String,
    detector: Option<Arc<MockDetector>>,
    translator: Option<Arc<MockTranslator>>,
    summarizer: Option<Arc<MockSummarizer>>,
}

impl MockProvider {
    /// A provider that exposes no capability at all.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detector: None,
            translator: None,
            summarizer: None,
        }
    }

    /// Canned behaviour for offline use of the console front end.
    pub fn demo() -> Self {
        Self::empty("mock")
            .with_detector(MockDetector::responding(
                CapabilityKind::LanguageDetector,
                |_, _| {
                    Ok(vec![
                        LanguageCandidate { tag: "en".into(), confidence: 0.5 },
                        LanguageCandidate { tag: "fr".into(), confidence: 0.25 },
                    ])
                },
            ))
            .with_translator(MockTranslator::responding(
                CapabilityKind::Translator,
                |text, opts| Ok(format!("[{}] {}", opts.target_language, text)),
            ))
            .with_summarizer(MockSummarizer::responding(
                CapabilityKind::Summarizer,
                |text, _| {
                    let first = text.split('.').next().unwrap_or(text).trim();
                    Ok(format!("- {first}"))
                },
            ))
    }

    pub fn with_detector(mut self, detector: MockDetector) -> Self {
        self.detector = Some(Arc::new(detector));
        self
    }

    pub fn with_translator(mut self, translator: MockTranslator) -> Self {
        self.translator = Some(Arc::new(translator));
        self
    }

    pub fn with_summarizer(mut self, summarizer: MockSummarizer) -> Self {
        self.summarizer = Some(Arc::new(summarizer));
        self
    }

    pub fn detector_mock(&self) -> Option<Arc<MockDetector>> {
        self.detector.clone()
    }

    pub fn translator_mock(&self) -> Option<Arc<MockTranslator>> {
        self.translator.clone()
    }

    pub fn summarizer_mock(&self) -> Option<Arc<MockSummarizer>> {
        self.summarizer.clone()
    }
}

impl CapabilityProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn language_detector(&self) -> Option<Arc<DetectorCapability>> {
        self.detector
            .clone()
            .map(|c| c as Arc<DetectorCapability>)
    }

    fn translator(&self) -> Option<Arc<TranslatorCapability>> {
        self.translator
            .clone()
            .map(|c| c as Arc<TranslatorCapability>)
    }

    fn summarizer(&self) -> Option<Arc<SummarizerCapability>> {
        self.summarizer
            .clone()
            .map(|c| c as Arc<SummarizerCapability>)
    }
}
