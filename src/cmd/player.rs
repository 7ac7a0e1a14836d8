//! Player argument conversion.
//!
//! Accepts a raw unique id (`76561198000000001`) or a Steam community profile
//! URL (`https://steamcommunity.com/profiles/76561198000000001/`). Vanity
//! profile URLs need a Steam Web API lookup and are rejected.

use url::Url;

use crate::error::{Result, WardenError};

const STEAM_HOSTS: [&str; 2] = ["steamcommunity.com", "www.steamcommunity.com"];

/// Resolve a player argument to the unique id the game server understands.
pub fn resolve_player_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WardenError::InvalidArgument("player id is empty".into()));
    }

    let Ok(url) = Url::parse(trimmed) else {
        return Ok(trimmed.to_string());
    };
    if !matches!(url.scheme(), "http" | "https") {
        // Not a link (e.g. "steam:1234" style ids); pass through untouched.
        return Ok(trimmed.to_string());
    }

    let host = url.host_str().unwrap_or_default();
    if !STEAM_HOSTS.contains(&host) {
        return Err(WardenError::InvalidArgument(format!(
            "unsupported player link host: {host}"
        )));
    }

    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("profiles"), Some(id)) if id.chars().all(|c| c.is_ascii_digit()) => {
            Ok(id.to_string())
        }
        (Some("id"), Some(vanity)) => Err(WardenError::InvalidArgument(format!(
            "vanity profile `{vanity}` cannot be resolved; use the numeric profile link"
        ))),
        _ => Err(WardenError::InvalidArgument(format!(
            "not a Steam profile link: {trimmed}"
        ))),
    }
}
