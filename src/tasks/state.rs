use std::time::Duration;

/// Lifecycle of one task invocation.
///
/// `Idle → CheckingAvailability → {Unsupported | AwaitingDownload → {Ready | Deferred} | Ready}
/// → Invoking → {Succeeded | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    Idle,
    CheckingAvailability,
    Unsupported,
    AwaitingDownload,
    /// The model is still downloading and the run ended without a result.
    Deferred,
    Ready,
    Invoking,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Unsupported | TaskState::Deferred | TaskState::Succeeded | TaskState::Failed
        )
    }
}

/// What to do when a capability first has to download its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadPolicy {
    /// Wait for the ready signal, then invoke.
    Await,
    /// Create the session, report progress seen so far, and return without a result.
    ReturnEarly,
}

#[derive(Debug, Clone)]
pub struct TaskSettings {
    pub download_policy: DownloadPolicy,
    pub download_timeout: Option<Duration>,
    pub invocation_timeout: Option<Duration>,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            download_policy: DownloadPolicy::Await,
            download_timeout: None,
            invocation_timeout: None,
        }
    }
}

impl TaskSettings {
    pub fn with_policy(mut self, policy: DownloadPolicy) -> Self {
        self.download_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_end_states_are_terminal() {
        let terminal: Vec<TaskState> = [
            TaskState::Idle,
            TaskState::CheckingAvailability,
            TaskState::Unsupported,
            TaskState::AwaitingDownload,
            TaskState::Deferred,
            TaskState::Ready,
            TaskState::Invoking,
            TaskState::Succeeded,
            TaskState::Failed,
        ]
        .into_iter()
        .filter(TaskState::is_terminal)
        .collect();

        assert_eq!(
            terminal,
            vec![
                TaskState::Unsupported,
                TaskState::Deferred,
                TaskState::Succeeded,
                TaskState::Failed
            ]
        );
    }
}
