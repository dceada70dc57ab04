//! Typed error kinds shared across the crate.
//!
//! Three kinds matter to the user: [`UsageError`] (malformed or semantically
//! invalid input, always rendered with the command's usage grammar),
//! [`ClientError`] (transport failures and malformed server responses), and
//! [`ConfigError`] (problems with the local profile file).

use thiserror::Error;

/// Invalid user input. Always carries the verbatim usage grammar of the
/// command group so the rendered error doubles as help text.
#[derive(Debug, Error)]
pub struct UsageError {
    message: Option<String>,
    usage: String,
}

impl UsageError {
    /// Usage error without a specific message: the rendered text is exactly
    /// the usage grammar.
    pub fn new(usage: &str) -> Self {
        Self { message: None, usage: usage.to_string() }
    }

    /// Usage error for a violated business rule; the message is shown above
    /// the grammar.
    pub fn with_message(message: impl Into<String>, usage: &str) -> Self {
        Self { message: Some(message.into()), usage: usage.to_string() }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}\n{}", message, self.usage),
            None => write!(f, "{}", self.usage),
        }
    }
}

/// Failures talking to the Torque API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to send request to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API request failed: {status}")]
    Api { status: reqwest::StatusCode },

    #[error("failed to parse response JSON")]
    BadJson(#[from] serde_json::Error),

    /// Malformed server response: a required field is absent. The field name
    /// is part of the message so the logged detail is actionable.
    #[error("malformed response: missing field `{field}`")]
    Deserialize { field: String },

    /// Request rejected client-side before any network call.
    #[error("{0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn missing_field(field: &str) -> Self {
        Self::Deserialize { field: field.to_string() }
    }
}

/// Problems with the local profile file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file doesn't exist")]
    FileMissing,

    #[error("config file is malformed: {0}")]
    Malformed(String),

    #[error("profile '{0}' not found in config file")]
    UnknownProfile(String),

    #[error("profile '{profile}' is missing required setting `{key}`")]
    IncompleteProfile { profile: String, key: String },

    #[error("unable to write config file")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    const USAGE: &str = "usage:\n        torque demo list";

    #[test]
    fn plain_usage_error_renders_grammar_verbatim() {
        let err = UsageError::new(USAGE);
        assert_eq!(err.to_string(), USAGE);
    }

    #[test]
    fn message_is_shown_above_the_grammar() {
        let err = UsageError::with_message("Since commit is specified, branch is required", USAGE);
        let rendered = err.to_string();
        assert!(rendered.starts_with("Since commit is specified"));
        assert!(rendered.ends_with(USAGE));
    }

    #[test]
    fn deserialize_error_names_the_field() {
        let err = ClientError::missing_field("name");
        assert_eq!(err.to_string(), "malformed response: missing field `name`");
    }
}
