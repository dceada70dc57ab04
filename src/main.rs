//! Binary entrypoint: global argument surface, logging, and group dispatch.
//!
//! clap handles only the global surface (connection overrides, debug,
//! version check); everything after the group token is passed through
//! untouched so each command group can validate it against its own usage
//! grammar.

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use torque::commands::bp::BlueprintsCommand;
use torque::commands::configure::ConfigureCommand;
use torque::commands::sb::SandboxesCommand;
use torque::commands::{bp, sb};
use torque::client::TorqueClient;
use torque::config::ConfigProvider;
use torque::errors::UsageError;
use torque::session::{resolve_connection, SessionInput};
use torque::version::VersionCheckService;

const GLOBAL_USAGE: &str = "usage:
        torque [--space <space>] [--token <token>] [--account <account>] [--profile <profile>] [--debug] [--disable-version-check] <command> [<args>...]

commands:
        bp, blueprint    manage blueprints in the space catalog
        sb, sandbox      start, inspect, and end sandboxes
        configure        manage connection profiles";

/// CLI client for the Torque sandbox service
#[derive(Parser, Debug)]
#[command(name = "torque", version, about, long_about = None, disable_help_subcommand = true)]
struct GlobalArgs {
    /// Space to run the command against
    #[arg(long)]
    space: Option<String>,

    /// API token (overrides the configured profile)
    #[arg(long)]
    token: Option<String>,

    /// Torque account name
    #[arg(long)]
    account: Option<String>,

    /// Named profile from the config file
    #[arg(long)]
    profile: Option<String>,

    /// Verbose logging to stderr
    #[arg(long)]
    debug: bool,

    /// Skip the new-release check
    #[arg(long)]
    disable_version_check: bool,

    /// Command group: bp/blueprint, sb/sandbox, or configure
    command: Option<String>,

    /// Everything after the group token, validated by the group's grammar
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let args = GlobalArgs::parse();
    init_logging(args.debug);

    if !args.disable_version_check {
        VersionCheckService::new(torque::VERSION).check_for_newer_release().await;
    }

    let code = match run(&args).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(usage) => {
            eprintln!("{usage}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(args: &GlobalArgs) -> Result<bool, UsageError> {
    let Some(command) = args.command.as_deref() else {
        return Err(UsageError::new(GLOBAL_USAGE));
    };

    // The group grammar sees the full group argument vector, group token
    // included.
    let mut group_argv = vec![command.to_string()];
    group_argv.extend(args.args.iter().cloned());

    let session = SessionInput {
        token: args.token.clone(),
        space: args.space.clone(),
        account: args.account.clone(),
        profile: args.profile.clone(),
    }
    .merged_with_env();
    let provider = ConfigProvider::from_default_location();

    match command {
        "bp" | "blueprint" => {
            let connection = resolve_connection(&session, &provider, bp::USAGE)?;
            let Some(client) = client_for(&connection) else {
                return Ok(false);
            };
            let command = BlueprintsCommand::new(&group_argv, client)?;
            let (success, payload) = command.execute().await?;
            command.formatter().render(success, &payload);
            Ok(success)
        }
        "sb" | "sandbox" => {
            let connection = resolve_connection(&session, &provider, sb::USAGE)?;
            let Some(client) = client_for(&connection) else {
                return Ok(false);
            };
            let command = SandboxesCommand::new(&group_argv, client)?;
            let (success, payload) = command.execute().await?;
            command.formatter().render(success, &payload);
            Ok(success)
        }
        "configure" => {
            let command = ConfigureCommand::new(&group_argv)?;
            let (success, payload) = command.execute()?;
            command.formatter().render(success, &payload);
            Ok(success)
        }
        other => {
            tracing::debug!("unknown command group '{}'", other);
            Err(UsageError::new(GLOBAL_USAGE))
        }
    }
}

fn client_for(connection: &torque::session::Connection) -> Option<TorqueClient> {
    match TorqueClient::new(connection) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::error!("failed to initialize HTTP client: {:#}", e);
            None
        }
    }
}
