//! Headless page controller: an input buffer, the displayed-text stage and
//! four sinks, driven by the same triggers as the page's buttons.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::capability::provider::CapabilityProvider;
use crate::config::AppConfig;
use crate::errors::TextLensError;
use crate::sink::TextSink;
use crate::tasks::detect::LanguageDetectionTask;
use crate::tasks::event_bus::EventBus;
use crate::tasks::gated::GatedOutcome;
use crate::tasks::summarize::{DisplayedText, SummarizationTask};
use crate::tasks::translate::TranslationTask;

#[derive(Clone)]
pub struct PanelSinks {
    pub detected: Arc<dyn TextSink>,
    pub output: Arc<dyn TextSink>,
    pub summary: Arc<dyn TextSink>,
    pub error: Arc<dyn TextSink>,
}

pub struct TextPanel {
    detector: LanguageDetectionTask,
    translator: TranslationTask,
    summarizer: SummarizationTask,
    input: Mutex<String>,
    displayed: Mutex<DisplayedText>,
    sinks: PanelSinks,
    events: EventBus,
}

impl TextPanel {
    pub fn new(provider: Arc<dyn CapabilityProvider>, config: &AppConfig, sinks: PanelSinks) -> Self {
        let events = EventBus::new();
        tracing::info!(provider = provider.name(), "panel ready");
        Self {
            detector: LanguageDetectionTask::new(
                provider.clone(),
                config.tasks.settings(config.detector.download_policy),
                events.clone(),
                config.detector.display_locale.clone(),
            )
            .with_options(config.detector.options()),
            translator: TranslationTask::new(
                provider.clone(),
                config.tasks.settings(config.translator.download_policy),
                events.clone(),
                config.translator.source_language.clone(),
            ),
            summarizer: SummarizationTask::new(
                provider,
                config.tasks.settings(config.summarizer.download_policy),
                events.clone(),
                config.summarizer.options.clone(),
            ),
            input: Mutex::new(String::new()),
            displayed: Mutex::new(DisplayedText::Empty),
            sinks,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        *self.input.lock().await = text.into();
    }

    pub async fn input(&self) -> String {
        self.input.lock().await.clone()
    }

    pub async fn displayed(&self) -> DisplayedText {
        self.displayed.lock().await.clone()
    }

    /// Carries buffer state over when the panel is rebuilt for another provider.
    pub async fn restore(&self, input: String, displayed: DisplayedText) {
        *self.input.lock().await = input;
        *self.displayed.lock().await = displayed;
    }

    /// Detect button: writes the verdict to the detected sink.
    pub async fn detect(&self) {
        let message = self.input().await;
        if message.trim().is_empty() {
            self.sinks.detected.show("Not sure what you are saying");
            return;
        }
        self.detect_message(&message).await;
    }

    /// Translate button: detection and translation into `target` run side by
    /// side. Each reports to its own sink, so a failed or still-downloading
    /// detector does not hold the translation back.
    pub async fn translate(&self, target: &str) {
        let message = self.input().await;
        if message.trim().is_empty() {
            self.sinks.error.show("Please enter some text to translate");
            return;
        }

        tokio::join!(
            self.detect_message(&message),
            self.translate_message(&message, target)
        );
    }

    async fn translate_message(&self, message: &str, target: &str) {
        match self.translator.run(message, target).await {
            Ok(GatedOutcome::Completed(text)) => {
                self.sinks.output.show(&text);
                let mut input = self.input.lock().await;
                // Leave text typed while the translation was running alone.
                if *input == message {
                    input.clear();
                }
            }
            Ok(GatedOutcome::Downloading) => {
                tracing::info!(target_language = target, "translation model still downloading");
            }
            Err(e) => self.report(e),
        }
    }

    /// First stage of display-then-summarize: remember and show the input.
    pub async fn display(&self) {
        let shown = DisplayedText::from_input(&self.input().await);
        match shown.text() {
            Some(text) => self.sinks.output.show(text),
            None => {
                self.sinks.error.show("Please enter some text to display");
                return;
            }
        }
        *self.displayed.lock().await = shown;
    }

    /// Summarize button: the input, or the displayed text when the input is blank.
    pub async fn summarize(&self) {
        let message = self.input().await;
        let displayed = self.displayed().await;

        match self.summarizer.run(&message, &displayed).await {
            Ok(GatedOutcome::Completed(summary)) => self.sinks.summary.show(&summary),
            Ok(GatedOutcome::Downloading) => {
                tracing::info!("summarizer model downloading; trigger again once it is ready");
            }
            Err(TextLensError::EmptyInput) => {
                self.sinks.error.show("Please enter some text to summarize");
            }
            Err(e) => self.report(e),
        }
    }

    async fn detect_message(&self, message: &str) {
        match self.detector.run(message).await {
            Ok(GatedOutcome::Completed(detection)) => {
                self.sinks.detected.show(&detection.to_string());
            }
            Ok(GatedOutcome::Downloading) => {
                tracing::info!("language detector model still downloading");
            }
            Err(e) => self.report(e),
        }
    }

    fn report(&self, e: TextLensError) {
        tracing::error!(error = %e, reason = e.reason().unwrap_or_default(), "task failed");
        self.sinks.error.show(&e.to_string());
    }
}
