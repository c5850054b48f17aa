use std::sync::Arc;

use async_trait::async_trait;

use crate::capability::monitor::DownloadMonitor;
use crate::capability::types::{
    Availability, CapabilityKind, DetectorOptions, LanguageCandidate, SummarizerOptions,
    TranslatorOptions,
};
use crate::errors::TextLensResult;

/// A live handle obtained from a [`Capability`]. Must be destroyed after use.
#[async_trait]
pub trait CapabilitySession: Send {
    type Input: Send + 'static;
    type Output: Send + 'static;

    async fn invoke(&mut self, input: Self::Input) -> TextLensResult<Self::Output>;

    /// Releases whatever the host allocated for this session.
    async fn destroy(&mut self);
}

pub type BoxSession<I, O> = Box<dyn CapabilitySession<Input = I, Output = O>>;

/// An optional host feature that can be queried and turned into sessions.
#[async_trait]
pub trait Capability: Send + Sync {
    type Options: Send + Sync;
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn kind(&self) -> CapabilityKind;

    /// Capabilities without an explicit query (the translator) are `Ready`
    /// and report lack of support by failing `create`.
    async fn availability(&self) -> TextLensResult<Availability> {
        Ok(Availability::Ready)
    }

    /// `monitor` is `Some` only when the capability reported `Downloadable`.
    async fn create(
        &self,
        options: &Self::Options,
        monitor: Option<DownloadMonitor>,
    ) -> TextLensResult<BoxSession<Self::Input, Self::Output>>;
}

pub type DetectorCapability =
    dyn Capability<Options = DetectorOptions, Input = String, Output = Vec<LanguageCandidate>>;
pub type TranslatorCapability =
    dyn Capability<Options = TranslatorOptions, Input = String, Output = String>;
pub type SummarizerCapability =
    dyn Capability<Options = SummarizerOptions, Input = String, Output = String>;

/// The host surface: each getter returns `None` when the feature is absent.
/// Implementations register in [`crate::capability::registry::ProviderRegistry`].
pub trait CapabilityProvider: Send + Sync {
    /// Returns the provider's identifier (matches the config.toml key).
    fn name(&self) -> &str;

    fn language_detector(&self) -> Option<Arc<DetectorCapability>>;

    fn translator(&self) -> Option<Arc<TranslatorCapability>>;

    fn summarizer(&self) -> Option<Arc<SummarizerCapability>>;
}
