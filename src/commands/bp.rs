//! `torque bp` / `torque blueprint` command group.

use std::sync::OnceLock;

use crate::client::TorqueClient;
use crate::errors::UsageError;
use crate::output::{OutputFormatter, Payload};
use crate::resources::blueprints::BlueprintsManager;
use crate::usage::{OptSpec, ParsedArgs, UsageGrammar};

use super::{dispatch, ensure_branch_for_commit, output_format, ActionResult};

pub const USAGE: &str = "usage:
        torque (bp | blueprint) list [--output=json | --output=json --detail]
        torque (bp | blueprint) validate <name> [--branch <branch>] [--commit <commitId>] [--output=json]
        torque (bp | blueprint) [--help]";

/// Actions this group binds handlers for.
const ACTIONS: &[&str] = &["list", "validate"];

fn grammar() -> &'static UsageGrammar {
    static GRAMMAR: OnceLock<UsageGrammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        UsageGrammar::compile(
            USAGE,
            vec![
                OptSpec::flag("help").short('h'),
                OptSpec::value("branch").short('b'),
                OptSpec::value("commit").short('c'),
                OptSpec::value("output"),
                OptSpec::flag("detail"),
            ],
        )
    })
}

#[derive(Debug)]
pub struct BlueprintsCommand {
    args: ParsedArgs,
    manager: BlueprintsManager,
    formatter: OutputFormatter,
}

impl BlueprintsCommand {
    /// Parse the group argument vector; a malformed invocation fails here,
    /// before any handler runs.
    pub fn new(argv: &[String], client: TorqueClient) -> Result<Self, UsageError> {
        let args = grammar().parse(argv)?;
        let formatter = OutputFormatter::new(output_format(&args));
        Ok(Self { args, manager: BlueprintsManager::new(client), formatter })
    }

    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }

    pub async fn execute(&self) -> Result<(bool, Payload), UsageError> {
        let Some(action) = self.args.action() else {
            return Err(UsageError::new(USAGE));
        };
        let result = match action {
            "list" => self.do_list().await,
            "validate" => self.do_validate().await,
            other => {
                tracing::error!("no handler bound for action '{}'", other);
                Ok((false, Payload::Empty))
            }
        };
        dispatch(result)
    }

    async fn do_list(&self) -> ActionResult {
        if self.args.flag("detail") {
            let raw = self.manager.list_detailed().await?;
            return Ok((true, Payload::Raw(raw)));
        }
        let blueprints = self.manager.list().await?;
        Ok((true, Payload::many(blueprints)))
    }

    async fn do_validate(&self) -> ActionResult {
        let name = self
            .args
            .value("name")
            .ok_or_else(|| UsageError::new(USAGE))?;
        let branch = self.args.value("branch");
        let commit = self.args.value("commit");
        ensure_branch_for_commit(branch, commit, USAGE)?;

        let result = self.manager.validate(name, branch, commit).await?;
        if result.is_valid() {
            Ok((true, Payload::text("Blueprint is valid")))
        } else {
            tracing::error!("Blueprint validation failed");
            Ok((false, Payload::many(result.issues)))
        }
    }
}
