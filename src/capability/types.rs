use std::fmt;

use serde::{Deserialize, Serialize};

/// The three optional features a host can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapabilityKind {
    LanguageDetector,
    Translator,
    Summarizer,
}

impl CapabilityKind {
    /// Identifier used by hosts and in logs (`languageDetector`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            CapabilityKind::LanguageDetector => "languageDetector",
            CapabilityKind::Translator => "translator",
            CapabilityKind::Summarizer => "summarizer",
        }
    }
}

/// Human-facing feature name, used in user messages.
impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CapabilityKind::LanguageDetector => "Language detection",
            CapabilityKind::Translator => "Translation",
            CapabilityKind::Summarizer => "Summarization",
        };
        f.write_str(label)
    }
}

/// Tri-state readiness reported by a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Unavailable,
    Downloadable,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub loaded: u64,
    pub total: u64,
}

/// One ranked result of language detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageCandidate {
    #[serde(alias = "detectedLanguage", alias = "language")]
    pub tag: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorOptions {
    /// Languages the caller expects; hosts may use it to narrow the model.
    #[serde(default)]
    pub expected_input_languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorOptions {
    pub source_language: String,
    pub target_language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryType {
    #[default]
    KeyPoints,
    Tldr,
    Teaser,
    Headline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryFormat {
    #[default]
    Markdown,
    PlainText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Missing fields take the values of [`SummarizerOptions::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerOptions {
    pub shared_context: String,
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    pub format: SummaryFormat,
    pub length: SummaryLength,
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self {
            shared_context: "This is a scientific article".into(),
            summary_type: SummaryType::KeyPoints,
            format: SummaryFormat::Markdown,
            length: SummaryLength::Medium,
        }
    }
}
