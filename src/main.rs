use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod caller;
mod cmd;
mod config;
mod error;
mod rcon;
mod registry;
mod utils;

use caller::CallerContext;
use cmd::format::StyleOptions;
use cmd::{CommandRouter, Console, TerminalSink};
use config::{ConfigArgs, Settings};
use rcon::{SessionPool, TcpRconClient};
use registry::StaticRegistry;

/// RCON Warden - tiered remote administration for game servers
///
/// Usage:
///   rcon-warden [FLAGS] <command> [args...] <server_name>
///   rcon-warden [FLAGS] batch "<command> ..." "<command> ..."
///   rcon-warden [FLAGS]                       (interactive console)
///
/// Tiers (each includes the ones below it):
///   Admin      listed in the server's `admins`
///   Moderator  holds role `Mod-<server>`
///   Captain    holds role `Captain-<server>`
///   Everyone   no check
///
/// Global flags / env:
///   -v / -vv            Increase verbosity
///   -q / --quiet        Errors only
///   -s / --servers      Registry file (or RCON_WARDEN_SERVERS, default servers.yaml)
///   -c / --caller       Caller identity (or RCON_WARDEN_CALLER)
///   -r / --role         Role label, repeatable (or RCON_WARDEN_ROLES, comma separated)
///   --timeout SECS      Per-exchange timeout (default 5)
///   --json              Machine readable output
///
/// Examples:
///   rcon-warden servers
///   rcon-warden -c 1234 serverinfo rush
///   rcon-warden -c 1234 -r Mod-rush kick https://steamcommunity.com/profiles/76561198000000001 rush
///   rcon-warden -c 1234 --json batch "rotatemap rush" "serverinfo rush"
#[derive(Parser, Debug)]
#[command(
    name = "rcon-warden",
    version,
    author,
    about = "RCON Warden - tiered remote administration for game servers",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print replies and batch reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,

    /// Command and its arguments; omit to start the console
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let settings = Settings::resolve(&cli.config)?;
    let registry = StaticRegistry::from_path(&settings.servers_path).with_context(|| {
        format!(
            "Failed to load server registry from {}",
            settings.servers_path.display()
        )
    })?;
    if registry.is_empty() {
        warn!("registry {} lists no servers", settings.servers_path.display());
    }
    info!(
        servers = registry.len(),
        caller = %settings.caller,
        "registry loaded"
    );

    let style = if std::io::stdout().is_terminal() {
        StyleOptions::detect()
    } else {
        StyleOptions::plain()
    };
    let sink = Arc::new(TerminalSink::new(cli.json, style));
    let caller = CallerContext::new(settings.caller.clone(), sink);

    let router = CommandRouter::new(
        Arc::new(registry),
        SessionPool::with_timeout(TcpRconClient, settings.timeout),
    );

    // Cooperative, single threaded: the pool never holds a lock across an await.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    rt.block_on(async {
        let console = Console::new(&router, caller);
        if cli.command.is_empty() {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            console.run(stdin, std::io::stdin().is_terminal()).await
        } else {
            console.invoke(&cli.command).await.map_err(anyhow::Error::from)
        }
    })
}
