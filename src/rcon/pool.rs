//! Single-slot session cache: at most one idle session per server name.
//!
//! Acquire takes the cached session out of its slot (or opens a new one),
//! the caller runs exactly one exchange, and release puts the session back,
//! overwriting whatever another caller may have left there meanwhile. A
//! session is returned to its slot even when the exchange failed; the next
//! caller then sees that failure itself. No retry, no backoff.
//!
//! The slot lock is only held for the synchronous take/put, never across
//! an await.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::{RconSession, RemoteCommandClient};
use crate::error::Result;
use crate::registry::ServerConfig;

pub struct SessionPool<C: RemoteCommandClient> {
    client: C,
    timeout: Duration,
    slots: Mutex<HashMap<String, C::Session>>,
}

impl<C: RemoteCommandClient> SessionPool<C> {
    #[cfg(test)]
    pub fn new(client: C) -> Self {
        Self::with_timeout(client, super::RCON_TIMEOUT)
    }

    pub fn with_timeout(client: C, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run `f` against the session for `server`, then cache the session again.
    pub async fn with_session<T, F>(&self, server: &ServerConfig, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut C::Session) -> Result<T>,
    {
        let mut session = match self.checkout(&server.name) {
            Some(session) => {
                debug!(server = %server.name, "reusing cached RCON session");
                session
            }
            None => {
                debug!(server = %server.name, "no cached RCON session, opening one");
                self.client.open(server, self.timeout).await?
            }
        };
        let result = f(&mut session).await;
        self.checkin(&server.name, session);
        result
    }

    /// One request/response exchange through the cached session.
    pub async fn exchange(&self, server: &ServerConfig, command: &str) -> Result<Value> {
        self.with_session(server, async |session: &mut C::Session| {
            session.exchange(command).await
        })
        .await
    }

    /// Whether an idle session is cached for `server_name`.
    #[cfg(test)]
    pub fn is_cached(&self, server_name: &str) -> bool {
        self.lock().contains_key(server_name)
    }

    pub fn cached_count(&self) -> usize {
        self.lock().len()
    }

    fn checkout(&self, server_name: &str) -> Option<C::Session> {
        self.lock().remove(server_name)
    }

    fn checkin(&self, server_name: &str, session: C::Session) {
        self.lock().insert(server_name.to_string(), session);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, C::Session>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
