//! The capability-gated task: check availability, acquire a session, invoke
//! it, and release it on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::capability::monitor::{DownloadMonitor, DownloadReceiver, DownloadSignal};
use crate::capability::provider::{Capability, CapabilityProvider};
use crate::capability::session::SessionGuard;
use crate::capability::types::{Availability, CapabilityKind};
use crate::errors::{TextLensError, TextLensResult};
use crate::tasks::event_bus::{EventBus, TaskEvent};
use crate::tasks::state::{DownloadPolicy, TaskSettings, TaskState};

/// Looks a capability up on the host each time a task runs.
pub type Resolver<C> = fn(&dyn CapabilityProvider) -> Option<Arc<C>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatedOutcome<T> {
    Completed(T),
    /// The model is still downloading and the policy said not to wait.
    Downloading,
}

pub struct CapabilityGatedTask<C: Capability + ?Sized> {
    kind: CapabilityKind,
    provider: Arc<dyn CapabilityProvider>,
    resolve: Resolver<C>,
    settings: TaskSettings,
    events: EventBus,
    // Same-kind invocations queue here, first come first served.
    serial: Mutex<()>,
}

impl<C: Capability + ?Sized> CapabilityGatedTask<C> {
    pub fn new(
        kind: CapabilityKind,
        provider: Arc<dyn CapabilityProvider>,
        resolve: Resolver<C>,
        settings: TaskSettings,
        events: EventBus,
    ) -> Self {
        Self {
            kind,
            provider,
            resolve,
            settings,
            events,
            serial: Mutex::new(()),
        }
    }

    pub async fn run(
        &self,
        options: &C::Options,
        input: C::Input,
    ) -> TextLensResult<GatedOutcome<C::Output>> {
        let _turn = self.serial.lock().await;
        let mut tracker = Tracker::new(self.kind, self.events.clone());

        tracker.enter(TaskState::CheckingAvailability);
        let Some(capability) = (self.resolve)(self.provider.as_ref()) else {
            tracing::warn!(kind = self.kind.name(), provider = self.provider.name(), "capability absent");
            tracker.enter(TaskState::Unsupported);
            return Err(TextLensError::CapabilityUnsupported(self.kind));
        };
        if capability.kind() != self.kind {
            let reason = format!("host returned a {} capability", capability.kind().name());
            return Err(tracker.fail(TextLensError::SessionCreationFailed {
                kind: self.kind,
                reason,
            }));
        }

        let availability = match capability.availability().await {
            Ok(a) => a,
            Err(e) => return Err(tracker.fail(self.creation_error(e))),
        };
        tracing::debug!(kind = self.kind.name(), invocation = %tracker.id, ?availability, "availability checked");

        let mut guard = match availability {
            Availability::Unavailable => {
                tracker.enter(TaskState::Unsupported);
                return Err(TextLensError::CapabilityUnsupported(self.kind));
            }
            Availability::Ready => {
                let session = match capability.create(options, None).await {
                    Ok(s) => s,
                    Err(e) => return Err(tracker.fail(self.creation_error(e))),
                };
                SessionGuard::new(self.kind, session)
            }
            Availability::Downloadable => {
                tracker.enter(TaskState::AwaitingDownload);
                let (monitor, mut progress) = DownloadMonitor::channel();
                let session = match capability.create(options, Some(monitor)).await {
                    Ok(s) => s,
                    Err(e) => return Err(tracker.fail(self.creation_error(e))),
                };
                let guard = SessionGuard::new(self.kind, session);

                match self.settings.download_policy {
                    DownloadPolicy::ReturnEarly => {
                        while let Some(signal) = progress.try_next() {
                            if let DownloadSignal::Progress(p) = signal {
                                tracker.progress(p.loaded, p.total);
                            }
                        }
                        guard.release().await;
                        tracker.enter(TaskState::Deferred);
                        tracing::info!(kind = self.kind.name(), invocation = %tracker.id, "model downloading, returning without a result");
                        return Ok(GatedOutcome::Downloading);
                    }
                    DownloadPolicy::Await => {
                        if let Err(e) = self.wait_until_ready(&mut progress, &tracker).await {
                            guard.release().await;
                            return Err(tracker.fail(e));
                        }
                        guard
                    }
                }
            }
        };

        tracker.enter(TaskState::Ready);
        tracker.enter(TaskState::Invoking);
        let result = match self.settings.invocation_timeout {
            Some(limit) => match tokio::time::timeout(limit, guard.invoke(input)).await {
                Ok(r) => r,
                Err(_) => Err(TextLensError::InvocationFailed {
                    kind: self.kind,
                    reason: format!("timed out after {} ms", limit.as_millis()),
                }),
            },
            None => guard.invoke(input).await,
        };
        guard.release().await;

        match result {
            Ok(output) => {
                tracker.enter(TaskState::Succeeded);
                Ok(GatedOutcome::Completed(output))
            }
            Err(e) => Err(tracker.fail(self.invocation_error(e))),
        }
    }

    async fn wait_until_ready(
        &self,
        progress: &mut DownloadReceiver,
        tracker: &Tracker,
    ) -> TextLensResult<()> {
        let wait = async {
            loop {
                match progress.next().await {
                    Some(DownloadSignal::Progress(p)) => tracker.progress(p.loaded, p.total),
                    Some(DownloadSignal::Ready) => return Ok(()),
                    Some(DownloadSignal::Failed(reason)) => {
                        return Err(TextLensError::SessionCreationFailed {
                            kind: self.kind,
                            reason,
                        })
                    }
                    None => {
                        return Err(TextLensError::SessionCreationFailed {
                            kind: self.kind,
                            reason: "download ended without a ready signal".into(),
                        })
                    }
                }
            }
        };

        match self.settings.download_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .unwrap_or_else(|_| Err(self.download_timeout(limit))),
            None => wait.await,
        }
    }

    fn download_timeout(&self, limit: Duration) -> TextLensError {
        TextLensError::DownloadTimeout {
            kind: self.kind,
            timeout_ms: limit.as_millis() as u64,
        }
    }

    fn creation_error(&self, e: TextLensError) -> TextLensError {
        match e {
            e @ (TextLensError::CapabilityUnsupported(_)
            | TextLensError::SessionCreationFailed { .. }
            | TextLensError::DownloadTimeout { .. }) => e,
            other => TextLensError::SessionCreationFailed {
                kind: self.kind,
                reason: other.to_string(),
            },
        }
    }

    fn invocation_error(&self, e: TextLensError) -> TextLensError {
        match e {
            e @ TextLensError::InvocationFailed { .. } => e,
            other => TextLensError::InvocationFailed {
                kind: self.kind,
                reason: other.to_string(),
            },
        }
    }
}

/// Publishes state transitions and progress for one invocation.
struct Tracker {
    id: Uuid,
    kind: CapabilityKind,
    state: TaskState,
    events: EventBus,
}

impl Tracker {
    fn new(kind: CapabilityKind, events: EventBus) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: TaskState::Idle,
            events,
        }
    }

    fn enter(&mut self, state: TaskState) {
        tracing::debug!(kind = self.kind.name(), invocation = %self.id, from = ?self.state, to = ?state, "task state");
        self.state = state;
        if state.is_terminal() {
            tracing::debug!(kind = self.kind.name(), invocation = %self.id, ?state, "invocation finished");
        }
        self.events.publish(TaskEvent::StateChanged {
            invocation: self.id,
            kind: self.kind,
            state,
            at: chrono::Utc::now(),
        });
    }

    fn progress(&self, loaded: u64, total: u64) {
        tracing::info!(kind = self.kind.name(), invocation = %self.id, loaded, total, "download progress");
        self.events.publish(TaskEvent::DownloadProgress {
            invocation: self.id,
            kind: self.kind,
            loaded,
            total,
        });
    }

    fn fail(&mut self, e: TextLensError) -> TextLensError {
        tracing::error!(kind = self.kind.name(), invocation = %self.id, error = %e, reason = e.reason().unwrap_or_default(), "task failed");
        self.enter(TaskState::Failed);
        e
    }
}
