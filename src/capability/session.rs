use crate::capability::provider::BoxSession;
use crate::capability::types::CapabilityKind;
use crate::errors::TextLensResult;

/// Owns a session for exactly one task invocation.
///
/// `release` consumes the guard, so a destroyed session cannot be invoked
/// again. Dropping an unreleased guard is a bug in the caller and is logged.
pub struct SessionGuard<I: Send + 'static, O: Send + 'static> {
    kind: CapabilityKind,
    session: BoxSession<I, O>,
    released: bool,
}

impl<I: Send + 'static, O: Send + 'static> SessionGuard<I, O> {
    pub fn new(kind: CapabilityKind, session: BoxSession<I, O>) -> Self {
        Self {
            kind,
            session,
            released: false,
        }
    }

    pub async fn invoke(&mut self, input: I) -> TextLensResult<O> {
        self.session.invoke(input).await
    }

    pub async fn release(mut self) {
        self.session.destroy().await;
        self.released = true;
        tracing::debug!(capability = self.kind.name(), "session released");
    }
}

impl<I: Send + 'static, O: Send + 'static> Drop for SessionGuard<I, O> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                capability = self.kind.name(),
                "session dropped without release"
            );
        }
    }
}
