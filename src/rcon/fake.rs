//! Scripted in-memory RCON client for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{RconSession, RemoteCommandClient};
use crate::error::{Result, WardenError};
use crate::registry::ServerConfig;

type Responder = dyn Fn(&str, &str) -> Result<Value> + Send + Sync;

pub struct FakeClient {
    responder: Arc<Responder>,
    opens: AtomicUsize,
    refuse: AtomicBool,
    log: Arc<Mutex<Vec<(String, String)>>>,
}

pub struct FakeSession {
    id: usize,
    server: String,
    responder: Arc<Responder>,
    log: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeSession {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl FakeClient {
    /// `responder(server_name, command)` produces each reply.
    pub fn new(responder: impl Fn(&str, &str) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            opens: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replies shaped like a live game server.
    pub fn canned() -> Self {
        Self::new(|_, command| Ok(canned_reply(command)))
    }

    pub fn refusing(self) -> Self {
        self.refuse.store(true, Ordering::SeqCst);
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Every `(server, command)` exchanged so far, in order.
    pub fn exchanged(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }
}

pub fn canned_reply(command: &str) -> Value {
    let name = command.split_whitespace().next().unwrap_or_default();
    match name {
        "ServerInfo" => json!({
            "Command": "ServerInfo",
            "ServerInfo": {
                "MapLabel": "UGC1668673877",
                "GameMode": "SND",
                "ServerName": "Rush | EU",
                "Teams": true,
                "Team0Score": "0",
                "Team1Score": "0",
                "Round": "0",
                "RoundState": "Started",
                "PlayerCount": "2/10"
            }
        }),
        "RefreshList" => json!({
            "Command": "RefreshList",
            "PlayerList": [
                {"Username": "alice", "UniqueId": "76561198000000001"},
                {"Username": "bob", "UniqueId": "76561198000000002"}
            ]
        }),
        "InspectPlayer" => json!({
            "Command": "InspectPlayer",
            "PlayerInfo": {
                "PlayerName": "alice",
                "UniqueId": "76561198000000001",
                "KDA": "3/1/0",
                "Cash": "4000",
                "TeamId": 0
            }
        }),
        other => json!({ "Command": other, other: true }),
    }
}

pub fn server(name: &str) -> ServerConfig {
    ServerConfig {
        name: name.to_string(),
        address: "127.0.0.1".into(),
        port: 9100,
        secret: "secret".into(),
        admin_identities: HashSet::new(),
    }
}

#[async_trait]
impl RemoteCommandClient for FakeClient {
    type Session = FakeSession;

    async fn open(&self, server: &ServerConfig, timeout: Duration) -> Result<FakeSession> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(WardenError::from_io(
                server.endpoint(),
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            ));
        }
        let _ = timeout;
        let id = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeSession {
            id,
            server: server.name.clone(),
            responder: Arc::clone(&self.responder),
            log: Arc::clone(&self.log),
        })
    }
}

#[async_trait]
impl RconSession for FakeSession {
    async fn exchange(&mut self, command: &str) -> Result<Value> {
        self.log
            .lock()
            .unwrap()
            .push((self.server.clone(), command.to_string()));
        (self.responder)(&self.server, command)
    }
}
