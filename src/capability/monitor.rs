use tokio::sync::mpsc;

use crate::capability::types::DownloadProgress;

/// Notifications a capability sends while its model is being fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSignal {
    Progress(DownloadProgress),
    /// Download finished; the session may now be invoked.
    Ready,
    Failed(String),
}

/// Handed to a capability at session creation when it reported `downloadable`.
///
/// Capabilities report through it; the orchestrator holds the matching
/// [`DownloadReceiver`]. Sends after the receiver is gone are dropped silently.
#[derive(Debug, Clone)]
pub struct DownloadMonitor {
    tx: mpsc::UnboundedSender<DownloadSignal>,
}

impl DownloadMonitor {
    pub fn channel() -> (Self, DownloadReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, DownloadReceiver { rx })
    }

    pub fn progress(&self, loaded: u64, total: u64) {
        let _ = self
            .tx
            .send(DownloadSignal::Progress(DownloadProgress { loaded, total }));
    }

    pub fn ready(&self) {
        let _ = self.tx.send(DownloadSignal::Ready);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        let _ = self.tx.send(DownloadSignal::Failed(reason.into()));
    }
}

pub struct DownloadReceiver {
    rx: mpsc::UnboundedReceiver<DownloadSignal>,
}

impl DownloadReceiver {
    /// Waits for the next signal. `None` once every monitor clone is dropped.
    pub async fn next(&mut self) -> Option<DownloadSignal> {
        self.rx.recv().await
    }

    /// Returns a signal that has already arrived, without waiting.
    pub fn try_next(&mut self) -> Option<DownloadSignal> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signals_arrive_in_order() {
        let (monitor, mut rx) = DownloadMonitor::channel();
        monitor.progress(10, 100);
        monitor.progress(100, 100);
        monitor.ready();
        drop(monitor);

        assert_eq!(
            rx.next().await,
            Some(DownloadSignal::Progress(DownloadProgress { loaded: 10, total: 100 }))
        );
        assert_eq!(
            rx.try_next(),
            Some(DownloadSignal::Progress(DownloadProgress { loaded: 100, total: 100 }))
        );
        assert_eq!(rx.next().await, Some(DownloadSignal::Ready));
        assert_eq!(rx.next().await, None);
    }

    #[tokio::test]
    async fn failure_carries_its_reason() {
        let (monitor, mut rx) = DownloadMonitor::channel();
        monitor.failed("disk full");
        assert_eq!(rx.next().await, Some(DownloadSignal::Failed("disk full".into())));
        assert_eq!(rx.try_next(), None);
    }
}
