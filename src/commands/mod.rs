//! Command groups and the dispatch boundary.
//!
//! Each group owns a usage grammar, a declared action list, and handler
//! methods returning a `(success, payload)` pair. Construction parses the
//! argument vector immediately, so a malformed invocation fails before any
//! work happens. [`dispatch`] is the single place where handler errors are
//! classified: usage errors propagate to the user with the grammar, anything
//! else is logged and degraded to a generic failure.

pub mod bp;
pub mod configure;
pub mod sb;

use std::collections::HashMap;

use crate::errors::{ClientError, ConfigError, UsageError};
use crate::output::{OutputFormat, Payload};
use crate::usage::ParsedArgs;

/// Error surface of an action handler.
pub(crate) enum CommandError {
    Usage(UsageError),
    Failed(anyhow::Error),
}

impl From<UsageError> for CommandError {
    fn from(err: UsageError) -> Self {
        Self::Usage(err)
    }
}

impl From<ClientError> for CommandError {
    fn from(err: ClientError) -> Self {
        match err {
            // Status errors get the friendly message; the raw detail was
            // already logged by the client.
            ClientError::Api { .. } => {
                Self::Failed(anyhow::anyhow!(crate::client::format_api_error(&err)))
            }
            other => Self::Failed(other.into()),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        Self::Failed(err.into())
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        Self::Failed(err.into())
    }
}

pub(crate) type ActionResult = Result<(bool, Payload), CommandError>;

/// Classify a handler outcome at the dispatcher boundary. A single command
/// invocation never crashes: unexpected errors are logged without a
/// backtrace and become a generic failure.
pub(crate) fn dispatch(result: ActionResult) -> Result<(bool, Payload), UsageError> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(CommandError::Usage(err)) => Err(err),
        Err(CommandError::Failed(err)) => {
            tracing::error!("{:#}", err);
            Ok((false, Payload::Empty))
        }
    }
}

/// JSON/table choice captured from the parsed arguments, once per
/// invocation.
pub(crate) fn output_format(args: &ParsedArgs) -> OutputFormat {
    if args.value("output") == Some("json") {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    }
}

/// Numeric option validation: absent is fine, anything that is not a
/// non-negative integer is a usage error with a specific message.
pub(crate) fn non_negative_int(
    args: &ParsedArgs,
    name: &str,
    usage: &str,
) -> Result<Option<i64>, UsageError> {
    let Some(raw) = args.value(name) else {
        return Ok(None);
    };
    match raw.parse::<i64>() {
        Ok(value) if value >= 0 => Ok(Some(value)),
        _ => Err(UsageError::with_message(
            format!("Parameter --{name} must be a non-negative integer"),
            usage,
        )),
    }
}

/// A commit pin only makes sense against an explicit branch.
pub(crate) fn ensure_branch_for_commit(
    branch: Option<&str>,
    commit: Option<&str>,
    usage: &str,
) -> Result<(), UsageError> {
    if commit.is_some() && branch.map_or(true, str::is_empty) {
        return Err(UsageError::with_message(
            "Since commit is specified, branch is required",
            usage,
        ));
    }
    Ok(())
}

/// Parse a comma-separated `key=value` list (`--inputs`, `--artifacts`).
pub(crate) fn parse_key_value_list(
    raw: Option<&str>,
    option: &str,
    usage: &str,
) -> Result<HashMap<String, String>, UsageError> {
    let mut map = HashMap::new();
    let Some(raw) = raw else {
        return Ok(map);
    };
    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            return Err(UsageError::with_message(
                format!("Parameter --{option} expects a comma-separated list of key=value pairs"),
                usage,
            ));
        };
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}
