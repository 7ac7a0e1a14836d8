//! Runtime settings: CLI flags with environment fallbacks.
//!
//! Precedence for each value is flag > environment > default.
//!   RCON_WARDEN_SERVERS  registry file (default `servers.yaml`)
//!   RCON_WARDEN_CALLER   caller identity (default `anonymous`)
//!   RCON_WARDEN_ROLES    comma separated role labels, e.g. `Mod-rush,Captain-snd`

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::caller::CallerIdentity;
use crate::rcon::RCON_TIMEOUT;

pub const ENV_SERVERS: &str = "RCON_WARDEN_SERVERS";
pub const ENV_CALLER: &str = "RCON_WARDEN_CALLER";
pub const ENV_ROLES: &str = "RCON_WARDEN_ROLES";
pub const DEFAULT_SERVERS_FILE: &str = "servers.yaml";
pub const ANONYMOUS_CALLER: &str = "anonymous";

#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Server registry file (YAML or JSON). Falls back to RCON_WARDEN_SERVERS.
    #[arg(short = 's', long = "servers", global = true, value_name = "PATH")]
    pub servers: Option<PathBuf>,

    /// Identity the command runs as. Falls back to RCON_WARDEN_CALLER.
    #[arg(short = 'c', long = "caller", global = true, value_name = "ID")]
    pub caller: Option<String>,

    /// Display name for audit lines
    #[arg(long = "caller-name", global = true, value_name = "NAME")]
    pub caller_name: Option<String>,

    /// Role held by the caller, e.g. Mod-rush (repeatable). Falls back to RCON_WARDEN_ROLES.
    #[arg(short = 'r', long = "role", global = true, value_name = "LABEL")]
    pub roles: Vec<String>,

    /// RCON exchange timeout in seconds
    #[arg(long = "timeout", global = true, value_name = "SECS")]
    pub timeout: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub servers_path: PathBuf,
    pub caller: CallerIdentity,
    pub timeout: Duration,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl Settings {
    pub fn resolve(args: &ConfigArgs) -> anyhow::Result<Self> {
        Self::resolve_with(args, env_non_empty)
    }

    fn resolve_with(
        args: &ConfigArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let servers_path = args
            .servers
            .clone()
            .or_else(|| env(ENV_SERVERS).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVERS_FILE));

        let id = args
            .caller
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| env(ENV_CALLER))
            .unwrap_or_else(|| ANONYMOUS_CALLER.to_string());
        let mut caller = CallerIdentity::new(id);
        if let Some(name) = &args.caller_name {
            caller = caller.with_name(name);
        }

        let roles: Vec<String> = if args.roles.is_empty() {
            env(ENV_ROLES)
                .map(|raw| raw.split(',').map(str::to_string).collect())
                .unwrap_or_default()
        } else {
            args.roles.clone()
        };
        for role in roles.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            caller = caller.with_role(role);
        }

        let timeout = match args.timeout {
            None => RCON_TIMEOUT,
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
            Some(secs) => anyhow::bail!("invalid --timeout {secs}: must be a positive number of seconds"),
        };

        Ok(Self {
            servers_path,
            caller,
            timeout,
        })
    }
}
