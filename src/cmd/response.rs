/*!
response.rs - typed views over RCON replies and their two renderings.

Direct invocations get a `Reply` (title / description / fields / footer).
Batched invocations get a compact text value instead.
*/

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, WardenError};

/// Caller-facing message, shaped like a chat embed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ReplyField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
}

impl Reply {
    pub fn text(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/* ---- Payload helpers ---- */

/// Chat-style truthiness: null, false, 0, "" and empty containers are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Field text: strings unquoted, null as "None", everything else as JSON.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn reply_section<'a>(payload: &'a Value, key: &str, command: &str) -> Result<&'a Value> {
    payload
        .get(key)
        .ok_or_else(|| WardenError::HandlerExecutionFailed {
            command: command.to_string(),
            reason: format!("reply has no `{key}` section"),
        })
}

/* ---- Views ---- */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerInfoView {
    pub server_name: String,
    pub round_state: String,
    pub player_count: String,
    pub game_mode: String,
    pub map_label: String,
}

impl ServerInfoView {
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let info = reply_section(payload, "ServerInfo", "ServerInfo")?;
        Ok(Self {
            server_name: value_text(info.get("ServerName")),
            round_state: value_text(info.get("RoundState")),
            player_count: value_text(info.get("PlayerCount")),
            game_mode: value_text(info.get("GameMode")),
            map_label: value_text(info.get("MapLabel")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerEntry {
    pub username: String,
    pub unique_id: String,
}

pub fn player_list_from_payload(payload: &Value) -> Result<Vec<PlayerEntry>> {
    let list = reply_section(payload, "PlayerList", "RefreshList")?
        .as_array()
        .ok_or_else(|| WardenError::HandlerExecutionFailed {
            command: "RefreshList".into(),
            reason: "`PlayerList` is not a list".into(),
        })?;
    Ok(list
        .iter()
        .map(|p| PlayerEntry {
            username: p
                .get("Username")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            unique_id: value_text(p.get("UniqueId")),
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerInfoView {
    pub player_name: String,
    pub unique_id: String,
    pub kda: String,
    pub cash: String,
    pub team_id: String,
}

impl PlayerInfoView {
    /// `None` when the server knows no such player.
    pub fn from_section(info: &Value) -> Option<Self> {
        if !is_truthy(info) {
            return None;
        }
        Some(Self {
            player_name: value_text(info.get("PlayerName")),
            unique_id: value_text(info.get("UniqueId")),
            kda: value_text(info.get("KDA")),
            cash: value_text(info.get("Cash")),
            team_id: value_text(info.get("TeamId")),
        })
    }
}

/// Mutating commands whose reply carries one success flag under their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCommand {
    SwitchMap,
    ResetSnd,
    SwitchTeam,
    RotateMap,
    Ban,
    Kick,
    Unban,
    GiveItem,
    GiveCash,
    GiveTeamCash,
    SetPlayerSkin,
}

impl AckCommand {
    /// Remote command name; also the reply key.
    pub fn remote_name(self) -> &'static str {
        match self {
            AckCommand::SwitchMap => "SwitchMap",
            AckCommand::ResetSnd => "ResetSND",
            AckCommand::SwitchTeam => "SwitchTeam",
            AckCommand::RotateMap => "RotateMap",
            AckCommand::Ban => "Ban",
            AckCommand::Kick => "Kick",
            AckCommand::Unban => "Unban",
            AckCommand::GiveItem => "GiveItem",
            AckCommand::GiveCash => "GiveCash",
            AckCommand::GiveTeamCash => "GiveTeamCash",
            AckCommand::SetPlayerSkin => "SetPlayerSkin",
        }
    }

    /// Remote command line for the given positional args (server name excluded).
    pub fn remote_line(self, args: &[String]) -> String {
        std::iter::once(self.remote_name())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn message(self, args: &[String], ok: bool) -> String {
        let a = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();
        match (self, ok) {
            (AckCommand::SwitchMap, true) => {
                format!("Switched map to {} with game mode {}", a(0), a(1))
            }
            (AckCommand::SwitchMap, false) => format!(
                "**Failed** to switch map to {} with game mode {}",
                a(0),
                a(1)
            ),
            (AckCommand::ResetSnd, true) => "SND successfully reset".into(),
            (AckCommand::ResetSnd, false) => "**Failed** reset SND".into(),
            (AckCommand::SwitchTeam, true) => format!("<{}> switched to team {}", a(0), a(1)),
            (AckCommand::SwitchTeam, false) => {
                format!("**Failed** to switch <{}> to team {}", a(0), a(1))
            }
            (AckCommand::RotateMap, true) => "Rotated map successfully".into(),
            (AckCommand::RotateMap, false) => "**Failed** to rotate map".into(),
            (AckCommand::Ban, true) => format!("<{}> successfully banned", a(0)),
            (AckCommand::Ban, false) => format!("**Failed** to ban <{}>", a(0)),
            (AckCommand::Kick, true) => format!("<{}> successfully kicked", a(0)),
            (AckCommand::Kick, false) => format!("**Failed** to kick <{}>", a(0)),
            (AckCommand::Unban, true) => format!("<{}> successfully unbanned", a(0)),
            (AckCommand::Unban, false) => format!("**Failed** to unban <{}>", a(0)),
            (AckCommand::GiveItem, true) => format!("{} given to <{}>", a(1), a(0)),
            (AckCommand::GiveItem, false) => format!("**Failed** to give {} to <{}>", a(1), a(0)),
            (AckCommand::GiveCash | AckCommand::GiveTeamCash, true) => {
                format!("{} given to <{}>", a(1), a(0))
            }
            (AckCommand::GiveCash | AckCommand::GiveTeamCash, false) => {
                format!("**Failed** to give {} to <{}>", a(1), a(0))
            }
            (AckCommand::SetPlayerSkin, true) => format!("<{}>'s skin set to {}", a(0), a(1)),
            (AckCommand::SetPlayerSkin, false) => {
                format!("**Failed** to set <{}>'s skin to {}", a(0), a(1))
            }
        }
    }
}

/// Outcome of a handler, before it is rendered for a mode.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    Servers(Vec<String>),
    ServerInfo {
        server: String,
        info: ServerInfoView,
    },
    Players {
        server: String,
        players: Vec<PlayerEntry>,
    },
    PlayerInfo {
        player_id: String,
        info: Option<PlayerInfoView>,
        raw: Value,
    },
    Ack {
        command: AckCommand,
        args: Vec<String>,
        value: Value,
    },
    Custom {
        command: String,
        payload: Value,
    },
}

impl CommandResponse {
    fn players_text(server: &str, players: &[PlayerEntry]) -> String {
        if players.is_empty() {
            return format!("Currently no active players on `{server}`");
        }
        let mut text = format!("**Active players** on `{server}`:\n");
        for p in players {
            text.push_str(&format!("\n - {} <{}>", p.username, p.unique_id));
        }
        text
    }

    /// Raw payload, or the "No response" sentinel when the server said nothing.
    fn custom_text(payload: &Value) -> String {
        if is_truthy(payload) {
            value_text(Some(payload))
        } else {
            "No response".to_string()
        }
    }

    /// Rendering for direct invocations.
    pub fn to_reply(&self) -> Reply {
        match self {
            CommandResponse::Servers(names) => {
                let mut description = String::new();
                for name in names {
                    description.push_str("\n- ");
                    description.push_str(name);
                }
                Reply {
                    title: Some("Servers".into()),
                    description: Some(description),
                    ..Reply::default()
                }
            }
            CommandResponse::ServerInfo { server, info } => {
                Reply::text(format!("**ServerInfo** for `{server}`"))
                    .field("Server Name", &info.server_name)
                    .field("Round State", &info.round_state)
                    .field("Players", &info.player_count)
                    .field("Game Mode", &info.game_mode)
                    .field("Map Label", &info.map_label)
            }
            CommandResponse::Players { server, players } => {
                Reply::text(Self::players_text(server, players))
            }
            CommandResponse::PlayerInfo {
                player_id, info, ..
            } => match info {
                None => Reply::text(format!("Player <{player_id}> not found.")),
                Some(info) => Reply::text(format!("**Player info** for <{player_id}>"))
                    .field("Name", &info.player_name)
                    .field("UniqueId", &info.unique_id)
                    .field("KDA", &info.kda)
                    .field("Cash", &info.cash)
                    .field("TeamId", &info.team_id),
            },
            CommandResponse::Ack {
                command,
                args,
                value,
            } => Reply::text(command.message(args, is_truthy(value))),
            CommandResponse::Custom { command, payload } => {
                Reply::default().field(command, Self::custom_text(payload))
            }
        }
    }

    /// Compact rendering for batched invocations.
    pub fn batch_value(&self) -> String {
        match self {
            CommandResponse::Servers(names) => names.join(", "),
            CommandResponse::ServerInfo { info, .. } => format!(
                "```Server Name: {}\nRound State: {}\nPlayers:     {}\nGame Mode:   {}\nMap Label:   {}```",
                info.server_name, info.round_state, info.player_count, info.game_mode, info.map_label
            ),
            CommandResponse::Players { server, players } => Self::players_text(server, players),
            CommandResponse::PlayerInfo { raw, .. } => value_text(Some(raw)),
            CommandResponse::Ack { value, .. } => value_text(Some(value)),
            CommandResponse::Custom { payload, .. } => Self::custom_text(payload),
        }
    }
}
