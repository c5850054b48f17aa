use std::sync::Mutex;

/// Anything that can show a line of text to the user.
pub trait TextSink: Send + Sync {
    fn show(&self, text: &str);
}

/// Keeps everything it was shown, for tests and headless callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.entries.lock().ok().and_then(|e| e.last().cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().map(|e| e.is_empty()).unwrap_or(true)
    }
}

impl TextSink for MemorySink {
    fn show(&self, text: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(text.to_string());
        }
    }
}

/// Prints with a label; errors go to stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    label: &'static str,
    to_stderr: bool,
}

impl ConsoleSink {
    pub fn stdout(label: &'static str) -> Self {
        Self {
            label,
            to_stderr: false,
        }
    }

    pub fn stderr(label: &'static str) -> Self {
        Self {
            label,
            to_stderr: true,
        }
    }
}

impl TextSink for ConsoleSink {
    fn show(&self, text: &str) {
        if self.to_stderr {
            eprintln!("[{}] {}", self.label, text);
        } else {
            println!("[{}] {}", self.label, text);
        }
    }
}
