use thiserror::Error;

use crate::capability::types::CapabilityKind;

#[derive(Debug, Error)]
pub enum TextLensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input is empty")]
    EmptyInput,

    #[error("Target language is missing")]
    MissingTargetLanguage,

    #[error("{0} not supported")]
    CapabilityUnsupported(CapabilityKind),

    /// Display is collapsed to "<kind> failed"; `reason` is kept for logs.
    #[error("{kind} failed")]
    SessionCreationFailed { kind: CapabilityKind, reason: String },

    #[error("{kind} failed")]
    InvocationFailed { kind: CapabilityKind, reason: String },

    #[error("{kind} download did not finish within {timeout_ms} ms")]
    DownloadTimeout { kind: CapabilityKind, timeout_ms: u64 },

    #[error("Could not resolve a display name for '{0}'")]
    LocaleResolutionFailed(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl TextLensError {
    /// Detailed cause behind a collapsed failure, for logging.
    pub fn reason(&self) -> Option<&str> {
        match self {
            TextLensError::SessionCreationFailed { reason, .. }
            | TextLensError::InvocationFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl serde::Serialize for TextLensError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type TextLensResult<T> = Result<T, TextLensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_collapse_to_one_message_per_kind() {
        let created = TextLensError::SessionCreationFailed {
            kind: CapabilityKind::Translator,
            reason: "unsupported language pair".into(),
        };
        let invoked = TextLensError::InvocationFailed {
            kind: CapabilityKind::Translator,
            reason: "backend hung up".into(),
        };
        assert_eq!(created.to_string(), "Translation failed");
        assert_eq!(invoked.to_string(), "Translation failed");
        assert_eq!(created.reason(), Some("unsupported language pair"));
    }

    #[test]
    fn unsupported_names_the_feature() {
        let err = TextLensError::CapabilityUnsupported(CapabilityKind::Summarizer);
        assert_eq!(err.to_string(), "Summarization not supported");
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            "\"Summarization not supported\""
        );
    }
}
