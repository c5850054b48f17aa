use std::sync::Arc;

use crate::capability::provider::{CapabilityProvider, TranslatorCapability};
use crate::capability::types::{CapabilityKind, TranslatorOptions};
use crate::errors::{TextLensError, TextLensResult};
use crate::tasks::event_bus::EventBus;
use crate::tasks::gated::{CapabilityGatedTask, GatedOutcome};
use crate::tasks::state::TaskSettings;

pub struct TranslationTask {
    gated: CapabilityGatedTask<TranslatorCapability>,
    source_language: String,
}

impl TranslationTask {
    pub fn new(
        provider: Arc<dyn CapabilityProvider>,
        settings: TaskSettings,
        events: EventBus,
        source_language: impl Into<String>,
    ) -> Self {
        Self {
            gated: CapabilityGatedTask::new(
                CapabilityKind::Translator,
                provider,
                |p: &dyn CapabilityProvider| p.translator(),
                settings,
                events,
            ),
            source_language: source_language.into(),
        }
    }

    /// Translates `text` into `target`. Session and invocation problems all
    /// surface as "Translation failed".
    pub async fn run(&self, text: &str, target: &str) -> TextLensResult<GatedOutcome<String>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TextLensError::EmptyInput);
        }
        let target = target.trim();
        if target.is_empty() {
            return Err(TextLensError::MissingTargetLanguage);
        }

        let options = TranslatorOptions {
            source_language: self.source_language.clone(),
            target_language: target.to_string(),
        };
        tracing::debug!(from = %options.source_language, to = %options.target_language, "translating");
        self.gated.run(&options, text.to_string()).await
    }
}
