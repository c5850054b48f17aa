use std::sync::Arc;

use crate::capability::provider::{CapabilityProvider, SummarizerCapability};
use crate::capability::types::{CapabilityKind, SummarizerOptions};
use crate::errors::{TextLensError, TextLensResult};
use crate::tasks::event_bus::EventBus;
use crate::tasks::gated::{CapabilityGatedTask, GatedOutcome};
use crate::tasks::state::TaskSettings;

/// First stage of the display-then-summarize flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayedText {
    #[default]
    Empty,
    Displayed(String),
}

impl DisplayedText {
    /// Blank text leaves nothing displayed.
    pub fn from_input(text: &str) -> Self {
        match text.trim() {
            "" => DisplayedText::Empty,
            t => DisplayedText::Displayed(t.to_string()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DisplayedText::Empty => None,
            DisplayedText::Displayed(t) => Some(t),
        }
    }
}

pub struct SummarizationTask {
    gated: CapabilityGatedTask<SummarizerCapability>,
    options: SummarizerOptions,
}

impl SummarizationTask {
    pub fn new(
        provider: Arc<dyn CapabilityProvider>,
        settings: TaskSettings,
        events: EventBus,
        options: SummarizerOptions,
    ) -> Self {
        Self {
            gated: CapabilityGatedTask::new(
                CapabilityKind::Summarizer,
                provider,
                |p: &dyn CapabilityProvider| p.summarizer(),
                settings,
                events,
            ),
            options,
        }
    }

    /// Summarizes `text`, or the displayed text when `text` is blank.
    ///
    /// Returns [`GatedOutcome::Downloading`] without error when the model is
    /// not on the device yet and the task is configured not to wait for it.
    pub async fn run(
        &self,
        text: &str,
        displayed: &DisplayedText,
    ) -> TextLensResult<GatedOutcome<String>> {
        let source = select_source(text, displayed).ok_or(TextLensError::EmptyInput)?;
        tracing::debug!(
            chars = source.chars().count(),
            summary_type = ?self.options.summary_type,
            length = ?self.options.length,
            "summarizing"
        );
        self.gated.run(&self.options, source.to_string()).await
    }
}

fn select_source<'a>(text: &'a str, displayed: &'a DisplayedText) -> Option<&'a str> {
    match text.trim() {
        "" => displayed.text(),
        t => Some(t),
    }
}
