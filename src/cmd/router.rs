/*!
router.rs - command table and dispatch.

Each entry declares its required tier and positional parameters (the server
name always last). `handle` binds the arguments, resolves the server,
runs the tier check, performs exactly one remote exchange through the
`SessionPool` and builds the typed response. The execution mode decides
whether a denial notice is sent to the caller; the caller then renders the
response as a `Reply` (direct) or a compact value (batched).
*/

use std::fmt;
use std::sync::Arc;

use tracing::Level;

use super::auth::AuthorizationCascade;
use super::player::resolve_player_id;
use super::response::{
    AckCommand, CommandResponse, PlayerInfoView, ServerInfoView, player_list_from_payload,
};
use super::tier::PrivilegeTier;
use crate::caller::CallerContext;
use crate::error::{Result, WardenError};
use crate::rcon::{RemoteCommandClient, SessionPool};
use crate::registry::ServerRegistry;
use crate::utils::user_action_log;

/// Name of the meta-command that runs several commands in one go.
pub const BATCH_COMMAND: &str = "batch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Direct,
    Batched,
}

impl ExecutionMode {
    /// Batched runs never send denial notices of their own.
    pub fn silent(self) -> bool {
        matches!(self, ExecutionMode::Batched)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Answered from the registry, no server involved.
    Servers,
    /// Needs a server and one exchange with it.
    Remote(RemoteCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    ServerInfo,
    Players,
    PlayerInfo,
    Ack(AckCommand),
    Custom,
}

const fn remote(command: RemoteCommand) -> CommandKind {
    CommandKind::Remote(command)
}

const fn ack(command: AckCommand) -> CommandKind {
    CommandKind::Remote(RemoteCommand::Ack(command))
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tier: PrivilegeTier,
    /// Positional parameter names; `server_name` is always last when present.
    pub params: &'static [&'static str],
    pub kind: CommandKind,
    pub summary: &'static str,
}

impl CommandSpec {
    pub fn usage(&self) -> String {
        let mut usage = self.name.to_string();
        for p in self.params {
            usage.push_str(&format!(" <{p}>"));
        }
        usage
    }
}

const SERVER: &str = "server_name";
const PLAYER: &str = "player_id";

macro_rules! spec {
    ($name:literal, $tier:ident, [$($p:expr),*], $kind:expr, $summary:literal) => {
        CommandSpec {
            name: $name,
            tier: PrivilegeTier::$tier,
            params: &[$($p),*],
            kind: $kind,
            summary: $summary,
        }
    };
}

pub static COMMANDS: &[CommandSpec] = &[
    spec!("servers", Everyone, [], CommandKind::Servers, "Lists available servers"),
    spec!("serverinfo", Everyone, [SERVER], remote(RemoteCommand::ServerInfo), "Shows server status"),
    spec!("players", Everyone, [SERVER], remote(RemoteCommand::Players), "Lists active players"),
    spec!("playerinfo", Everyone, [PLAYER, SERVER], remote(RemoteCommand::PlayerInfo), "Inspects one player"),
    spec!("rotatemap", Moderator, [SERVER], ack(AckCommand::RotateMap), "Rotates to the next map"),
    spec!("ban", Moderator, [PLAYER, SERVER], ack(AckCommand::Ban), "Bans a player"),
    spec!("kick", Moderator, [PLAYER, SERVER], ack(AckCommand::Kick), "Kicks a player"),
    spec!("unban", Moderator, [PLAYER, SERVER], ack(AckCommand::Unban), "Unbans a player"),
    spec!("switchmap", Captain, ["map_name", "game_mode", SERVER], ack(AckCommand::SwitchMap), "Switches map and game mode"),
    spec!("resetsnd", Captain, [SERVER], ack(AckCommand::ResetSnd), "Resets a search and destroy round"),
    spec!("switchteam", Captain, [PLAYER, "team_id", SERVER], ack(AckCommand::SwitchTeam), "Moves a player to a team"),
    spec!("giveitem", Admin, [PLAYER, "item_id", SERVER], ack(AckCommand::GiveItem), "Gives an item to a player"),
    spec!("givecash", Admin, [PLAYER, "cash_amount", SERVER], ack(AckCommand::GiveCash), "Gives cash to a player"),
    spec!("giveteamcash", Admin, ["team_id", "cash_amount", SERVER], ack(AckCommand::GiveTeamCash), "Gives cash to a whole team"),
    spec!("setplayerskin", Admin, [PLAYER, "skin_id", SERVER], ack(AckCommand::SetPlayerSkin), "Sets a player's skin"),
    spec!("custom", Admin, ["rcon_command", SERVER], remote(RemoteCommand::Custom), "Sends a raw RCON command"),
];

/// Case-insensitive lookup in the command table.
pub fn resolve(name: &str) -> Option<&'static CommandSpec> {
    let name = name.trim();
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

#[derive(Clone)]
pub struct Invocation {
    pub command_name: String,
    pub args: Vec<String>,
    pub caller: CallerContext,
    pub mode: ExecutionMode,
}

impl Invocation {
    pub fn new(
        command_name: impl Into<String>,
        args: Vec<String>,
        caller: CallerContext,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            args,
            caller,
            mode,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command_name", &self.command_name)
            .field("args", &self.args)
            .field("caller", &self.caller.identity.id)
            .field("mode", &self.mode)
            .finish()
    }
}

pub struct CommandRouter<C: RemoteCommandClient> {
    registry: Arc<dyn ServerRegistry>,
    pool: SessionPool<C>,
    auth: AuthorizationCascade,
}

impl<C: RemoteCommandClient> CommandRouter<C> {
    pub fn new(registry: Arc<dyn ServerRegistry>, pool: SessionPool<C>) -> Self {
        Self {
            registry,
            pool,
            auth: AuthorizationCascade,
        }
    }

    pub fn pool(&self) -> &SessionPool<C> {
        &self.pool
    }

    /// Run the invocation and return the typed response.
    pub async fn handle(&self, invocation: &Invocation) -> Result<CommandResponse> {
        let spec = resolve(&invocation.command_name).ok_or_else(|| WardenError::CommandNotFound {
            name: invocation.command_name.clone(),
        })?;

        let prefix = match invocation.mode {
            ExecutionMode::Direct => "INVOKED",
            ExecutionMode::Batched => "BATCH INVOKED",
        };
        user_action_log(
            &invocation.caller.identity,
            format!(
                "{prefix} {:<10} args: {:?}",
                spec.name.to_ascii_uppercase(),
                invocation.args
            ),
            Level::INFO,
        );

        let args = bind_args(spec, &invocation.args)?;
        let command = match spec.kind {
            CommandKind::Servers => return Ok(CommandResponse::Servers(self.registry.list_names())),
            CommandKind::Remote(command) => command,
        };

        let (server_name, params) = args
            .split_last()
            .ok_or_else(|| missing(spec))?;
        let server = self.registry.lookup(server_name)?;
        self.auth.require(
            &invocation.caller,
            server,
            spec.tier,
            invocation.mode.silent(),
        )?;

        let params = convert_params(spec, params)?;
        match command {
            RemoteCommand::ServerInfo => {
                let payload = self.pool.exchange(server, "ServerInfo").await?;
                Ok(CommandResponse::ServerInfo {
                    server: server.name.clone(),
                    info: ServerInfoView::from_payload(&payload)?,
                })
            }
            RemoteCommand::Players => {
                let payload = self.pool.exchange(server, "RefreshList").await?;
                Ok(CommandResponse::Players {
                    server: server.name.clone(),
                    players: player_list_from_payload(&payload)?,
                })
            }
            RemoteCommand::PlayerInfo => {
                let player_id = params[0].clone();
                let payload = self
                    .pool
                    .exchange(server, &format!("InspectPlayer {player_id}"))
                    .await?;
                let raw = payload.get("PlayerInfo").cloned().unwrap_or_default();
                Ok(CommandResponse::PlayerInfo {
                    player_id,
                    info: PlayerInfoView::from_section(&raw),
                    raw,
                })
            }
            RemoteCommand::Ack(ack) => {
                let payload = self
                    .pool
                    .exchange(server, &ack.remote_line(&params))
                    .await?;
                Ok(CommandResponse::Ack {
                    command: ack,
                    value: payload
                        .get(ack.remote_name())
                        .cloned()
                        .unwrap_or_default(),
                    args: params,
                })
            }
            RemoteCommand::Custom => {
                let line = params[0].clone();
                let payload = self.pool.exchange(server, &line).await?;
                Ok(CommandResponse::Custom {
                    command: line,
                    payload,
                })
            }
        }
    }
}

fn missing(spec: &CommandSpec) -> WardenError {
    WardenError::MissingArgument {
        command: spec.name.to_string(),
        usage: spec.usage(),
    }
}

fn bind_args<'a>(spec: &CommandSpec, args: &'a [String]) -> Result<&'a [String]> {
    if args.len() < spec.params.len() {
        return Err(missing(spec));
    }
    if args.len() > spec.params.len() {
        return Err(WardenError::InvalidArgument(format!(
            "too many arguments for `{}` (usage: {})",
            spec.name,
            spec.usage()
        )));
    }
    if let Some(blank) = spec
        .params
        .iter()
        .zip(args)
        .find(|(_, value)| value.trim().is_empty())
    {
        return Err(WardenError::InvalidArgument(format!("`{}` is empty", blank.0)));
    }
    Ok(args)
}

/// Player ids may arrive as profile links; normalise them.
fn convert_params(spec: &CommandSpec, params: &[String]) -> Result<Vec<String>> {
    spec.params
        .iter()
        .zip(params)
        .map(|(name, value)| {
            if *name == PLAYER {
                resolve_player_id(value)
            } else {
                Ok(value.clone())
            }
        })
        .collect()
}
