//! `torque configure` command group: interactive profile management.

use std::sync::OnceLock;

use console::Term;
use serde_json::{json, Value};

use crate::config::{ConfigProvider, Profile, DEFAULT_PROFILE};
use crate::errors::{ConfigError, UsageError};
use crate::output::{mask_token, OutputFormatter, Payload};
use crate::resources::{ToJson, ToTableRow};
use crate::usage::{OptSpec, ParsedArgs, UsageGrammar};

use super::{dispatch, output_format, ActionResult};

pub const USAGE: &str = "usage:
        torque configure set
        torque configure list
        torque configure remove <profile>
        torque configure [--help|-h]";

/// Actions this group binds handlers for.
const ACTIONS: &[&str] = &["set", "list", "remove"];

const MISSING_CONFIG: &str =
    "Config file doesn't exist. Use 'torque configure set' to configure Torque CLI.";
const EMPTY_CONFIG: &str =
    "Config file is empty. Use 'torque configure set' to configure Torque CLI.";

fn grammar() -> &'static UsageGrammar {
    static GRAMMAR: OnceLock<UsageGrammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        UsageGrammar::compile(USAGE, vec![OptSpec::flag("help").short('h')])
    })
}

/// One row of `configure list` output; the token is always masked.
struct ProfileRow {
    name: String,
    profile: Profile,
}

impl ToTableRow for ProfileRow {
    fn table_row(&self) -> Vec<(String, String)> {
        vec![
            ("Profile Name".to_string(), self.name.clone()),
            (
                "Torque Account".to_string(),
                self.profile.account.clone().unwrap_or_default(),
            ),
            ("Space Name".to_string(), self.profile.space.clone()),
            ("Token".to_string(), mask_token(&self.profile.token)),
        ]
    }
}

impl ToJson for ProfileRow {
    fn to_json(&self) -> Value {
        json!({
            "profile": self.name,
            "account": self.profile.account,
            "space": self.profile.space,
            "token": mask_token(&self.profile.token),
        })
    }
}

#[derive(Debug)]
pub struct ConfigureCommand {
    args: ParsedArgs,
    provider: ConfigProvider,
    formatter: OutputFormatter,
}

impl ConfigureCommand {
    pub fn new(argv: &[String]) -> Result<Self, UsageError> {
        Self::with_provider(argv, ConfigProvider::from_default_location())
    }

    /// Command against an explicit provider, for tests and scripted setups.
    pub fn with_provider(argv: &[String], provider: ConfigProvider) -> Result<Self, UsageError> {
        let args = grammar().parse(argv)?;
        let formatter = OutputFormatter::new(output_format(&args));
        Ok(Self { args, provider, formatter })
    }

    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }

    pub fn execute(&self) -> Result<(bool, Payload), UsageError> {
        let Some(action) = self.args.action() else {
            return Err(UsageError::new(USAGE));
        };
        let result = match action {
            "set" => self.do_set(),
            "list" => self.do_list(),
            "remove" => self.do_remove(),
            other => {
                tracing::error!("no handler bound for action '{}'", other);
                Ok((false, Payload::Empty))
            }
        };
        dispatch(result)
    }

    fn do_list(&self) -> ActionResult {
        let profiles = match self.provider.load_all() {
            Ok(profiles) => profiles,
            Err(ConfigError::FileMissing) => {
                return Err(UsageError::with_message(MISSING_CONFIG, USAGE).into());
            }
            Err(e) => return Err(e.into()),
        };

        if profiles.is_empty() {
            return Ok((true, Payload::text(EMPTY_CONFIG)));
        }

        let rows: Vec<ProfileRow> = profiles
            .into_iter()
            .map(|(name, profile)| ProfileRow { name, profile })
            .collect();
        Ok((true, Payload::many(rows)))
    }

    fn do_remove(&self) -> ActionResult {
        let profile = self
            .args
            .value("profile")
            .ok_or_else(|| UsageError::new(USAGE))?;
        match self.provider.remove_profile(profile) {
            Ok(()) => Ok((true, Payload::Empty)),
            Err(ConfigError::FileMissing) => {
                Err(UsageError::with_message(MISSING_CONFIG, USAGE).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Interactive setup. Each prompt defaults to the current value of the
    /// chosen profile; the token is read without echo and shown masked.
    fn do_set(&self) -> ActionResult {
        let existing = self.provider.load_all().unwrap_or_default();
        let term = Term::stdout();

        let entered = prompt(&term, &format!("Profile Name [{DEFAULT_PROFILE}]: "))?;
        let profile_name = if entered.is_empty() {
            DEFAULT_PROFILE.to_string()
        } else {
            entered
        };
        let current = existing
            .iter()
            .find(|(name, _)| *name == profile_name)
            .map(|(_, profile)| profile);

        let current_account = current.and_then(|p| p.account.as_deref()).unwrap_or_default();
        let entered = prompt(&term, &format!("Torque Account (optional) [{current_account}]: "))?;
        let account = if entered.is_empty() {
            current.and_then(|p| p.account.clone())
        } else {
            Some(entered)
        };

        let current_space = current.map(|p| p.space.as_str()).unwrap_or_default();
        let entered = prompt(&term, &format!("Space Name [{current_space}]: "))?;
        let space = if entered.is_empty() {
            current_space.to_string()
        } else {
            entered
        };
        if space.is_empty() {
            return Ok((false, Payload::text("Space cannot be empty")));
        }

        let current_token = current.map(|p| p.token.as_str()).unwrap_or_default();
        term.write_str(&format!("Torque Token [{}]: ", mask_token(current_token)))?;
        let entered = term.read_secure_line()?.trim().to_string();
        let token = if entered.is_empty() {
            current_token.to_string()
        } else {
            entered
        };
        if token.is_empty() {
            return Ok((false, Payload::text("Token cannot be empty")));
        }

        self.provider
            .save_profile(&profile_name, &Profile { token, space, account })?;
        Ok((true, Payload::Empty))
    }
}

fn prompt(term: &Term, text: &str) -> std::io::Result<String> {
    term.write_str(text)?;
    Ok(term.read_line()?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputFormat, OutputFormatter};

    fn argv(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn provider(dir: &tempfile::TempDir) -> ConfigProvider {
        ConfigProvider::new(dir.path().join("config.toml"))
    }

    fn profile(token: &str, space: &str, account: Option<&str>) -> Profile {
        Profile {
            token: token.to_string(),
            space: space.to_string(),
            account: account.map(str::to_string),
        }
    }

    #[test]
    fn every_declared_action_has_a_handler() {
        assert_eq!(grammar().actions(), ACTIONS);
    }

    #[test]
    fn empty_argv_fails_with_verbatim_usage() {
        let err = ConfigureCommand::new(&[]).unwrap_err();
        assert_eq!(err.to_string(), USAGE);
    }

    #[test]
    fn list_without_config_file_points_at_configure_set() {
        let dir = tempfile::tempdir().unwrap();
        let command =
            ConfigureCommand::with_provider(&argv("configure list"), provider(&dir)).unwrap();

        let err = command.execute().unwrap_err();
        assert!(err.to_string().contains("torque configure set"));
    }

    #[test]
    fn list_with_empty_config_file_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let config = provider(&dir);
        std::fs::write(config.path(), "").unwrap();
        let command = ConfigureCommand::with_provider(&argv("configure list"), config).unwrap();

        let (success, payload) = command.execute().unwrap();
        assert!(success);
        assert!(matches!(payload, Payload::Text(ref text) if text == EMPTY_CONFIG));
    }

    #[test]
    fn list_renders_masked_tokens_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = provider(&dir);
        config.save_profile("default", &profile("token1", "space1", Some("account1"))).unwrap();
        config.save_profile("tester", &profile("token2", "space2", None)).unwrap();
        let command = ConfigureCommand::with_provider(&argv("configure list"), config).unwrap();

        let (success, payload) = command.execute().unwrap();
        assert!(success);

        let text = OutputFormatter::new(OutputFormat::Table)
            .format_payload(&payload)
            .unwrap();
        let expected = "\
Profile Name    Torque Account    Space Name    Token
--------------  ----------------  ------------  -------------
default         account1          space1        *********ken1
tester                            space2        *********ken2";
        assert_eq!(text, expected);
        assert!(!text.contains("token1"), "raw tokens must never be shown");
    }

    #[test]
    fn remove_without_config_file_points_at_configure_set() {
        let dir = tempfile::tempdir().unwrap();
        let command =
            ConfigureCommand::with_provider(&argv("configure remove default"), provider(&dir))
                .unwrap();

        let err = command.execute().unwrap_err();
        assert!(err.to_string().contains("torque configure set"));
    }

    #[test]
    fn remove_drops_the_profile() {
        let dir = tempfile::tempdir().unwrap();
        let config = provider(&dir);
        config.save_profile("default", &profile("t1", "s1", None)).unwrap();
        config.save_profile("tester", &profile("t2", "s2", None)).unwrap();

        let command =
            ConfigureCommand::with_provider(&argv("configure remove tester"), config).unwrap();
        let (success, payload) = command.execute().unwrap();
        assert!(success);
        assert!(matches!(payload, Payload::Empty));

        let names: Vec<String> = provider(&dir)
            .load_all()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["default"]);
    }
}
