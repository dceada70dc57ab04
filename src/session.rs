//! Connection resolution: CLI arguments, environment, then config profile.

use crate::config::{ConfigProvider, DEFAULT_PROFILE};
use crate::errors::UsageError;

/// Resolved credentials and target space for one invocation.
#[derive(Debug, Clone)]
pub struct Connection {
    pub token: String,
    pub space: String,
    pub account: Option<String>,
}

/// Raw connection inputs from the global argument surface.
#[derive(Debug, Default, Clone)]
pub struct SessionInput {
    pub token: Option<String>,
    pub space: Option<String>,
    pub account: Option<String>,
    pub profile: Option<String>,
}

impl SessionInput {
    /// Fill unset fields from the `TORQUE_*` environment variables. Called
    /// once at startup; resolution itself never reads the environment.
    pub fn merged_with_env(self) -> Self {
        Self {
            token: self.token.or_else(|| std::env::var("TORQUE_TOKEN").ok()),
            space: self.space.or_else(|| std::env::var("TORQUE_SPACE").ok()),
            account: self.account.or_else(|| std::env::var("TORQUE_ACCOUNT").ok()),
            profile: self.profile,
        }
    }

    fn profile(&self) -> String {
        self.profile.clone().unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }
}

/// Resolve the connection for one invocation. When token and space are both
/// present the config file is never touched; otherwise the named profile
/// fills the gaps. Config problems at this point are user-fixable, so they
/// surface as a [`UsageError`] pointing at `torque configure set`.
pub fn resolve_connection(
    input: &SessionInput,
    provider: &ConfigProvider,
    usage: &str,
) -> Result<Connection, UsageError> {
    if let (Some(token), Some(space)) = (input.token.clone(), input.space.clone()) {
        return Ok(Connection { token, space, account: input.account.clone() });
    }

    let profile = input.profile();
    let stored = provider.load_profile(&profile).map_err(|e| {
        tracing::debug!("unable to load profile '{}': {}", profile, e);
        UsageError::with_message(
            "Torque connection is not configured. Use 'torque configure set' to configure Torque CLI.",
            usage,
        )
    })?;

    Ok(Connection {
        token: input.token.clone().unwrap_or(stored.token),
        space: input.space.clone().unwrap_or(stored.space),
        account: input.account.clone().or(stored.account),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;

    const USAGE: &str = "usage:\n        torque <command> [<args>...]";

    fn missing_provider(dir: &tempfile::TempDir) -> ConfigProvider {
        ConfigProvider::new(dir.path().join("no-config.toml"))
    }

    #[test]
    fn explicit_inputs_bypass_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = SessionInput {
            token: Some("arg_token".to_string()),
            space: Some("arg_space".to_string()),
            ..Default::default()
        };

        // Would fail with a missing-config UsageError if the file were read.
        let connection = resolve_connection(&input, &missing_provider(&dir), USAGE).unwrap();
        assert_eq!(connection.token, "arg_token");
        assert_eq!(connection.space, "arg_space");
        assert_eq!(connection.account, None);
    }

    #[test]
    fn missing_everything_points_at_configure_set() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_connection(&SessionInput::default(), &missing_provider(&dir), USAGE)
            .unwrap_err();
        assert!(err.to_string().contains("torque configure set"));
    }

    #[test]
    fn profile_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ConfigProvider::new(dir.path().join("config.toml"));
        let stored = Profile {
            token: "stored_token".to_string(),
            space: "stored_space".to_string(),
            account: Some("stored_account".to_string()),
        };
        provider.save_profile(DEFAULT_PROFILE, &stored).unwrap();

        let input = SessionInput {
            space: Some("arg_space".to_string()),
            ..Default::default()
        };
        let connection = resolve_connection(&input, &provider, USAGE).unwrap();
        assert_eq!(connection.token, "stored_token");
        assert_eq!(connection.space, "arg_space");
        assert_eq!(connection.account.as_deref(), Some("stored_account"));
    }

    #[test]
    fn unknown_profile_points_at_configure_set() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ConfigProvider::new(dir.path().join("config.toml"));
        provider
            .save_profile("other", &Profile {
                token: "t".to_string(),
                space: "s".to_string(),
                account: None,
            })
            .unwrap();

        let input = SessionInput {
            profile: Some("missing".to_string()),
            ..Default::default()
        };
        let err = resolve_connection(&input, &provider, USAGE).unwrap_err();
        assert!(err.to_string().contains("torque configure set"));
    }
}
