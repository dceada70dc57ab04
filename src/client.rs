//! HTTP client for the Torque REST API.
//!
//! Thin wrapper over reqwest: bearer auth, status checking, JSON parsing,
//! and sanitized logging. One request in flight at a time; managers in
//! [`crate::resources`] own the per-resource paths.

use reqwest::Client;
use serde_json::Value;

use crate::errors::ClientError;
use crate::session::Connection;

/// Default service host; override with `TORQUE_HOSTNAME`.
pub const DEFAULT_HOST: &str = "qtorque.io";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize a response body for logging: truncate and strip non-printable
/// characters.
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        // Back off to a char boundary; a multi-byte character may span the
        // cut point.
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Authenticated client bound to one space.
#[derive(Clone)]
pub struct TorqueClient {
    http: Client,
    base_url: String,
    host: String,
    space: String,
    token: String,
}

// The token never appears in debug output.
impl std::fmt::Debug for TorqueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorqueClient")
            .field("base_url", &self.base_url)
            .field("space", &self.space)
            .finish_non_exhaustive()
    }
}

impl TorqueClient {
    /// Client for the configured connection, targeting
    /// `https://<host>/api/`.
    pub fn new(connection: &Connection) -> Result<Self, ClientError> {
        let host = std::env::var("TORQUE_HOSTNAME").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let base_url = format!("https://{host}/api/");
        Self::with_base_url(&base_url, &connection.space, &connection.token)
    }

    /// Client against an explicit API base URL. Used for on-prem hosts and
    /// by the integration tests.
    pub fn with_base_url(base_url: &str, space: &str, token: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("torque-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Transport { url: base_url.to_string(), source })?;

        let host = base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .trim_end_matches("/api")
            .to_string();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
            space: space.to_string(),
            token: token.to_string(),
        })
    }

    /// Service host (no scheme), used for UI links.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    /// Build a space-scoped API URL: `<base>/spaces/<space>/<path>`.
    pub fn space_url(&self, path: &str) -> String {
        format!("{}/spaces/{}/{}", self.base_url, self.space, path)
    }

    /// GET a space-scoped path.
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.space_url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        Self::read_json(&url, response).await
    }

    /// POST a JSON body to a space-scoped path.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let url = self.space_url(path);
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        Self::read_json(&url, response).await
    }

    /// DELETE a space-scoped path.
    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.space_url(path);
        tracing::debug!("DELETE {}", url);

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        Self::read_json(&url, response).await
    }

    async fn read_json(url: &str, response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { url: url.to_string(), source })?;

        if !status.is_success() {
            // Only log the sanitized/truncated body; it may carry sensitive
            // server detail.
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ClientError::Api { status });
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Format an API error for display without exposing raw server detail.
pub fn format_api_error(error: &ClientError) -> String {
    if let ClientError::Api { status } = error {
        return match status.as_u16() {
            401 => "Authentication failed. Check your token or run 'torque configure set'.".to_string(),
            403 => "Permission denied. Check your space permissions.".to_string(),
            404 => "Resource not found.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => "Invalid request. Check your parameters.".to_string(),
            500 | 503 => "Torque service temporarily unavailable. Please try again.".to_string(),
            _ => format!("Request failed: {status}"),
        };
    }
    error.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TorqueClient {
        let connection = Connection {
            token: "t".to_string(),
            space: "my_space".to_string(),
            account: None,
        };
        TorqueClient::new(&connection).unwrap()
    }

    #[test]
    fn space_url_follows_api_pattern() {
        assert_eq!(
            client().space_url("sandboxes/blah"),
            "https://qtorque.io/api/spaces/my_space/sandboxes/blah"
        );
    }

    #[test]
    fn custom_base_url_is_respected() {
        let client = TorqueClient::with_base_url("http://127.0.0.1:9999/api/", "s", "t").unwrap();
        assert_eq!(client.space_url("blueprints"), "http://127.0.0.1:9999/api/spaces/s/blueprints");
        assert_eq!(client.host(), "127.0.0.1:9999");
    }

    #[test]
    fn sanitize_truncates_long_bodies() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.contains("truncated"));
        assert!(sanitized.len() < 300);
    }

    #[test]
    fn sanitize_never_cuts_inside_a_character() {
        // A two-byte character spanning the truncation index must not panic.
        let body = format!("{}é{}", "a".repeat(199), "x".repeat(50));
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
        assert!(sanitized.starts_with(&"a".repeat(199)));
    }

    #[test]
    fn api_errors_map_to_friendly_messages() {
        let err = ClientError::Api { status: reqwest::StatusCode::UNAUTHORIZED };
        assert!(format_api_error(&err).contains("torque configure set"));
    }
}
