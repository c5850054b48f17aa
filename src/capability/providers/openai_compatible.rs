//! All three capabilities served by one OpenAI-compatible chat endpoint.
//!
//! The endpoint never downloads anything on the client, so availability is
//! either `Ready` (model listed under `/models`) or `Unavailable`.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;

use crate::capability::monitor::DownloadMonitor;
use crate::capability::provider::{
    BoxSession, Capability, CapabilityProvider, CapabilitySession, DetectorCapability,
    SummarizerCapability, TranslatorCapability,
};
use crate::capability::sse_parser::{self, SseChunk};
use crate::capability::types::{
    Availability, CapabilityKind, DetectorOptions, LanguageCandidate, SummarizerOptions,
    SummaryFormat, SummaryLength, SummaryType, TranslatorOptions,
};
use crate::config::ProviderEntry;
use crate::errors::{TextLensError, TextLensResult};

pub struct OpenAiCompatibleProvider {
    id: String,
    client: Arc<ChatClient>,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, entry: ProviderEntry, api_key: String) -> Self {
        Self {
            client: Arc::new(ChatClient {
                id: id.clone(),
                entry,
                api_key,
                http: reqwest::Client::new(),
            }),
            id,
        }
    }
}

impl CapabilityProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn language_detector(&self) -> Option<Arc<DetectorCapability>> {
        Some(Arc::new(RemoteCapability::<Detect>::new(self.client.clone())))
    }

    fn translator(&self) -> Option<Arc<TranslatorCapability>> {
        Some(Arc::new(RemoteCapability::<Translate>::new(self.client.clone())))
    }

    fn summarizer(&self) -> Option<Arc<SummarizerCapability>> {
        Some(Arc::new(RemoteCapability::<Summarize>::new(self.client.clone())))
    }
}

struct ChatClient {
    id: String,
    entry: ProviderEntry,
    api_key: String,
    http: reqwest::Client,
}

impl ChatClient {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.entry.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }

    async fn availability(&self) -> TextLensResult<Availability> {
        let response = self
            .authorized(self.http.get(self.url("models")))
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::warn!(provider = %self.id, status = %response.status(), "model listing refused");
            return Ok(Availability::Unavailable);
        }
        let json: serde_json::Value = response.json().await?;
        Ok(availability_from_models(&json, &self.entry.model))
    }

    async fn complete(&self, instructions: &str, text: &str) -> TextLensResult<String> {
        let body = serde_json::json!({
            "model": self.entry.model,
            "messages": [
                { "role": "system", "content": instructions },
                { "role": "user", "content": text },
            ],
            "stream": self.entry.stream,
            "temperature": self.entry.temperature,
        });

        tracing::debug!(
            provider = %self.id,
            model = %self.entry.model,
            stream = self.entry.stream,
            input_len = text.len(),
            "sending completion request"
        );

        let response = self
            .authorized(self.http.post(self.url("chat/completions")))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(TextLensError::Backend(format!("{}: {}", status, err_body)));
        }

        let content = if self.entry.stream {
            read_stream(response).await?
        } else {
            let json: serde_json::Value = response.json().await?;
            json["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| TextLensError::Backend("reply has no message content".into()))?
                .to_string()
        };

        tracing::info!(provider = %self.id, content_len = content.len(), "completion received");
        Ok(content)
    }
}

/// Accumulates streamed content until the done marker or end of body.
async fn read_stream(response: reqwest::Response) -> TextLensResult<String> {
    let mut byte_stream = response.bytes_stream();
    let mut lines = LineBuffer::default();
    let mut content = String::new();

    'stream: while let Some(result) = byte_stream.next().await {
        let bytes = result?;
        for line in lines.push(&bytes) {
            match sse_parser::parse_sse_line(&line) {
                Ok(Some(SseChunk::Content(part))) => content.push_str(&part),
                Ok(Some(SseChunk::Done)) => break 'stream,
                Ok(None) => {}
                Err(e) => tracing::debug!("SSE parse skipped: {e}"),
            }
        }
    }

    Ok(content)
}

/// Splits a byte stream into lines. Bytes are only decoded once a whole line
/// is in, so a character cut by a chunk boundary survives.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&raw).trim().to_string());
        }
        lines
    }
}

fn availability_from_models(json: &serde_json::Value, model: &str) -> Availability {
    match json["data"].as_array() {
        Some(models) if models.iter().any(|m| m["id"].as_str() == Some(model)) => {
            Availability::Ready
        }
        Some(_) => Availability::Unavailable,
        // Servers that do not list models are assumed to serve the configured one.
        None => Availability::Ready,
    }
}

/// How one capability phrases its request and reads the reply.
trait Prompt: Send + Sync + 'static {
    type Options: Send + Sync + 'static;
    type Output: Send + 'static;

    const KIND: CapabilityKind;
    /// The translator has no availability query; unsupported pairs fail later.
    const QUERIES_AVAILABILITY: bool = true;

    fn instructions(options: &Self::Options) -> String;

    fn parse(reply: String) -> TextLensResult<Self::Output>;
}

struct Detect;
struct Translate;
struct Summarize;

impl Prompt for Detect {
    type Options = DetectorOptions;
    type Output = Vec<LanguageCandidate>;

    const KIND: CapabilityKind = CapabilityKind::LanguageDetector;

    fn instructions(options: &DetectorOptions) -> String {
        let mut text = String::from(
            "Identify the language of the user's text. Reply only with a JSON array of \
             objects {\"tag\": <BCP 47 language tag>, \"confidence\": <number between 0 and 1>}, \
             most likely language first.",
        );
        if !options.expected_input_languages.is_empty() {
            text.push_str(&format!(
                " The text is expected to be one of: {}.",
                options.expected_input_languages.join(", ")
            ));
        }
        text
    }

    fn parse(reply: String) -> TextLensResult<Vec<LanguageCandidate>> {
        parse_candidates(&reply)
    }
}

impl Prompt for Translate {
    type Options = TranslatorOptions;
    type Output = String;

    const KIND: CapabilityKind = CapabilityKind::Translator;
    const QUERIES_AVAILABILITY: bool = false;

    fn instructions(options: &TranslatorOptions) -> String {
        format!(
            "Translate the user's text from language '{}' to language '{}'. \
             Reply with the translation only.",
            options.source_language, options.target_language
        )
    }

    fn parse(reply: String) -> TextLensResult<String> {
        Ok(reply.trim().to_string())
    }
}

impl Prompt for Summarize {
    type Options = SummarizerOptions;
    type Output = String;

    const KIND: CapabilityKind = CapabilityKind::Summarizer;

    fn instructions(options: &SummarizerOptions) -> String {
        let shape = match options.summary_type {
            SummaryType::KeyPoints => "the key points as a bulleted list",
            SummaryType::Tldr => "a quick overview",
            SummaryType::Teaser => "a teaser that makes the reader want more",
            SummaryType::Headline => "a single headline",
        };
        let length = match options.length {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        };
        let format = match options.format {
            SummaryFormat::Markdown => "Markdown",
            SummaryFormat::PlainText => "plain text without markup",
        };
        let mut text = format!(
            "Summarize the user's text as {shape}, {length} in length, formatted as {format}. \
             Reply with the summary only."
        );
        if !options.shared_context.is_empty() {
            text.push_str(&format!(" Context: {}", options.shared_context));
        }
        text
    }

    fn parse(reply: String) -> TextLensResult<String> {
        Ok(reply.trim().to_string())
    }
}

/// Pulls the JSON array out of a reply (models like to wrap it in fences)
/// and ranks it by descending confidence.
fn parse_candidates(reply: &str) -> TextLensResult<Vec<LanguageCandidate>> {
    let array = Regex::new(r"(?s)\[.*\]")
        .map_err(|e| TextLensError::Backend(e.to_string()))?
        .find(reply)
        .ok_or_else(|| TextLensError::Backend("reply contains no candidate list".into()))?;
    let mut candidates: Vec<LanguageCandidate> = serde_json::from_str(array.as_str())?;
    candidates.retain(|c| c.confidence.is_finite() && !c.tag.trim().is_empty());
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    Ok(candidates)
}

struct RemoteCapability<P> {
    client: Arc<ChatClient>,
    _prompt: PhantomData<P>,
}

impl<P: Prompt> RemoteCapability<P> {
    fn new(client: Arc<ChatClient>) -> Self {
        Self {
            client,
            _prompt: PhantomData,
        }
    }
}

#[async_trait]
impl<P: Prompt> Capability for RemoteCapability<P> {
    type Options = P::Options;
    type Input = String;
    type Output = P::Output;

    fn kind(&self) -> CapabilityKind {
        P::KIND
    }

    async fn availability(&self) -> TextLensResult<Availability> {
        if P::QUERIES_AVAILABILITY {
            self.client.availability().await
        } else {
            Ok(Availability::Ready)
        }
    }

    async fn create(
        &self,
        options: &P::Options,
        _monitor: Option<DownloadMonitor>,
    ) -> TextLensResult<BoxSession<String, P::Output>> {
        Ok(Box::new(RemoteSession::<P> {
            client: self.client.clone(),
            instructions: P::instructions(options),
            open: true,
            _prompt: PhantomData,
        }))
    }
}

struct RemoteSession<P> {
    client: Arc<ChatClient>,
    instructions: String,
    open: bool,
    _prompt: PhantomData<P>,
}

#[async_trait]
impl<P: Prompt> CapabilitySession for RemoteSession<P> {
    type Input = String;
    type Output = P::Output;

    async fn invoke(&mut self, input: String) -> TextLensResult<P::Output> {
        if !self.open {
            return Err(TextLensError::Backend("session already destroyed".into()));
        }
        let reply = self.client.complete(&self.instructions, &input).await?;
        P::parse(reply)
    }

    async fn destroy(&mut self) {
        self.open = false;
    }
}
