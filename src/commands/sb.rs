//! `torque sb` / `torque sandbox` command group.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::client::TorqueClient;
use crate::errors::UsageError;
use crate::output::{OutputFormatter, Payload};
use crate::resources::sandboxes::{
    SandboxesManager, StartRequest, STATUS_ACTIVE, STATUS_ENDED, STATUS_LAUNCHING,
};
use crate::usage::{OptSpec, ParsedArgs, UsageGrammar};

use super::{
    dispatch, ensure_branch_for_commit, non_negative_int, output_format, parse_key_value_list,
    ActionResult,
};

pub const USAGE: &str = "usage:
        torque (sb | sandbox) start <blueprint_name> [options] [--output=json]
        torque (sb | sandbox) status <sandbox_id> [--output=json]
        torque (sb | sandbox) get <sandbox_id> [--output=json | --output=json --detail]
        torque (sb | sandbox) end <sandbox_id>
        torque (sb | sandbox) list [--filter={all|my|auto}] [--show-ended] [--count=<N>] [--output=json]
        torque (sb | sandbox) [--help]";

/// Actions this group binds handlers for.
const ACTIONS: &[&str] = &["start", "status", "get", "end", "list"];

const DEFAULT_DURATION_MINUTES: i64 = 120;
const DEFAULT_LIST_FILTER: &str = "my";
const DEFAULT_LIST_COUNT: i64 = 25;
const POLL_INTERVAL: Duration = Duration::from_secs(30);

fn grammar() -> &'static UsageGrammar {
    static GRAMMAR: OnceLock<UsageGrammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        UsageGrammar::compile(
            USAGE,
            vec![
                OptSpec::flag("help").short('h'),
                OptSpec::value("duration").short('d'),
                OptSpec::value("name").short('n'),
                OptSpec::value("inputs").short('i'),
                OptSpec::value("artifacts").short('a'),
                OptSpec::value("branch").short('b'),
                OptSpec::value("commit").short('c'),
                OptSpec::value("wait").short('w'),
                OptSpec::value("output"),
                OptSpec::flag("detail"),
                OptSpec::value("filter").choices(&["all", "my", "auto"]),
                OptSpec::flag("show-ended"),
                OptSpec::value("count"),
            ],
        )
    })
}

#[derive(Debug)]
pub struct SandboxesCommand {
    args: ParsedArgs,
    manager: SandboxesManager,
    formatter: OutputFormatter,
}

impl SandboxesCommand {
    /// Parse the group argument vector; a malformed invocation fails here,
    /// before any handler runs.
    pub fn new(argv: &[String], client: TorqueClient) -> Result<Self, UsageError> {
        let args = grammar().parse(argv)?;
        let formatter = OutputFormatter::new(output_format(&args));
        Ok(Self { args, manager: SandboxesManager::new(client), formatter })
    }

    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }

    pub async fn execute(&self) -> Result<(bool, Payload), UsageError> {
        let Some(action) = self.args.action() else {
            return Err(UsageError::new(USAGE));
        };
        let result = match action {
            "start" => self.do_start().await,
            "status" => self.do_status().await,
            "get" => self.do_get().await,
            "end" => self.do_end().await,
            "list" => self.do_list().await,
            other => {
                tracing::error!("no handler bound for action '{}'", other);
                Ok((false, Payload::Empty))
            }
        };
        dispatch(result)
    }

    async fn do_start(&self) -> ActionResult {
        let blueprint_name = self
            .args
            .value("blueprint_name")
            .ok_or_else(|| UsageError::new(USAGE))?;
        let branch = self.args.value("branch");
        let commit = self.args.value("commit");
        ensure_branch_for_commit(branch, commit, USAGE)?;

        let duration = non_negative_int(&self.args, "duration", USAGE)?
            .unwrap_or(DEFAULT_DURATION_MINUTES);
        let wait = non_negative_int(&self.args, "wait", USAGE)?;
        let inputs = parse_key_value_list(self.args.value("inputs"), "inputs", USAGE)?;
        let artifacts = parse_key_value_list(self.args.value("artifacts"), "artifacts", USAGE)?;

        let name = match self.args.value("name") {
            Some(name) => name.to_string(),
            None => default_sandbox_name(blueprint_name, branch),
        };

        self.formatter.announce("Starting sandbox");
        let request = StartRequest {
            name,
            blueprint_name: blueprint_name.to_string(),
            duration_minutes: Some(duration),
            branch: branch.map(str::to_string),
            commit: commit.map(str::to_string),
            inputs,
            artifacts,
        };
        let sandbox_id = self.manager.start(&request).await?;
        self.formatter.important_value("Id: ", &sandbox_id);
        self.formatter.link("URL: ", &self.manager.ui_link(&sandbox_id));

        match wait {
            Some(timeout_minutes) => self.wait_for_active(&sandbox_id, timeout_minutes).await,
            None => Ok((true, Payload::text("The Sandbox was created"))),
        }
    }

    /// Poll the sandbox until it leaves `Launching` or the timeout lapses.
    async fn wait_for_active(&self, sandbox_id: &str, timeout_minutes: i64) -> ActionResult {
        let deadline = Instant::now() + Duration::from_secs(timeout_minutes as u64 * 60);
        while Instant::now() < deadline {
            let sandbox = self.manager.get(sandbox_id).await?;
            match sandbox.status.as_str() {
                STATUS_ACTIVE => return Ok((true, Payload::text(sandbox_id))),
                STATUS_LAUNCHING => {
                    for (checkpoint, status) in &sandbox.launching_progress {
                        tracing::debug!("{}: {}", checkpoint, status);
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                other => {
                    return Ok((
                        false,
                        Payload::text(format!(
                            "The Sandbox {sandbox_id} has started. Current state is: {other}"
                        )),
                    ));
                }
            }
        }
        tracing::error!(
            "Sandbox {} did not become active within {} minutes",
            sandbox_id,
            timeout_minutes
        );
        Ok((false, Payload::Empty))
    }

    async fn do_status(&self) -> ActionResult {
        let sandbox_id = self
            .args
            .value("sandbox_id")
            .ok_or_else(|| UsageError::new(USAGE))?;
        let sandbox = self.manager.get(sandbox_id).await?;
        Ok((true, Payload::text(sandbox.status)))
    }

    async fn do_get(&self) -> ActionResult {
        let sandbox_id = self
            .args
            .value("sandbox_id")
            .ok_or_else(|| UsageError::new(USAGE))?;
        if self.args.flag("detail") {
            let raw = self.manager.get_detailed(sandbox_id).await?;
            return Ok((true, Payload::Raw(raw)));
        }
        let sandbox = self.manager.get(sandbox_id).await?;
        Ok((true, Payload::one(sandbox)))
    }

    async fn do_end(&self) -> ActionResult {
        let sandbox_id = self
            .args
            .value("sandbox_id")
            .ok_or_else(|| UsageError::new(USAGE))?;
        self.manager.end(sandbox_id).await?;
        Ok((true, Payload::text("End request has been sent")))
    }

    async fn do_list(&self) -> ActionResult {
        let filter = self.args.value("filter").unwrap_or(DEFAULT_LIST_FILTER);
        let count = non_negative_int(&self.args, "count", USAGE)?.unwrap_or(DEFAULT_LIST_COUNT);
        let show_ended = self.args.flag("show-ended");

        let mut sandboxes = self.manager.list(filter, count as u32).await?;
        if !show_ended {
            sandboxes.retain(|sandbox| sandbox.status != STATUS_ENDED);
        }
        Ok((true, Payload::many(sandboxes)))
    }
}

/// `<blueprint>-[<branch>-]<MonDD-HH:MM:SS>`, matching what the UI shows
/// when no name is given.
fn default_sandbox_name(blueprint: &str, branch: Option<&str>) -> String {
    let suffix = chrono::Local::now().format("%b%d-%H:%M:%S");
    match branch {
        Some(branch) => format!("{blueprint}-{branch}-{suffix}"),
        None => format!("{blueprint}-{suffix}"),
    }
}
