//! Remote command transport.
//!
//! `RemoteCommandClient::open` -> `RconSession` (one authenticated connection)
//! `RconSession::exchange`     -> one request/response pair, JSON reply
//!
//! `TcpRconClient` speaks the game's plain-TCP RCON: the server greets with
//! `Password: `, expects the hex MD5 of the secret, answers
//! `Authenticated=1`, then replies to each command with one JSON document.
//! `SessionPool` (see `pool`) keeps one session per server alive between calls.

use std::time::Duration;

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::{Result, WardenError};
use crate::registry::ServerConfig;

pub mod pool;
#[cfg(test)]
pub mod fake;

pub use pool::SessionPool;

/// Fixed per-exchange timeout unless overridden on the command line.
pub const RCON_TIMEOUT: Duration = Duration::from_secs(5);

const PASSWORD_PROMPT: &str = "Password:";
const AUTH_MARKER: &str = "Authenticated=";
const READ_CHUNK: usize = 4096;

#[async_trait]
pub trait RconSession: Send {
    /// Send `command` and wait for its structured reply.
    async fn exchange(&mut self, command: &str) -> Result<Value>;
}

#[async_trait]
pub trait RemoteCommandClient: Send + Sync {
    type Session: RconSession;

    async fn open(&self, server: &ServerConfig, timeout: Duration) -> Result<Self::Session>;
}

/* ---- TCP implementation ---- */

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpRconClient;

#[derive(Debug)]
pub struct TcpSession {
    endpoint: String,
    stream: TcpStream,
    timeout: Duration,
    buf: Vec<u8>,
}

#[async_trait]
impl RemoteCommandClient for TcpRconClient {
    type Session = TcpSession;

    async fn open(&self, server: &ServerConfig, timeout: Duration) -> Result<TcpSession> {
        let endpoint = server.endpoint();
        debug!(server = %server.name, %endpoint, "opening RCON session");
        let stream = tokio::time::timeout(
            timeout,
            TcpStream::connect((server.address.as_str(), server.port)),
        )
        .await
        .map_err(|_| WardenError::ExchangeTimeout {
            endpoint: endpoint.clone(),
            after: timeout,
        })?
        .map_err(|e| WardenError::from_io(endpoint.clone(), e))?;

        let mut session = TcpSession {
            endpoint,
            stream,
            timeout,
            buf: Vec::with_capacity(READ_CHUNK),
        };
        session.authenticate(&server.secret).await?;
        Ok(session)
    }
}

/// Lowercase hex MD5 of the shared secret, as the login step expects.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Md5::digest(secret.as_bytes()))
}

impl TcpSession {
    async fn authenticate(&mut self, secret: &str) -> Result<()> {
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;
        let fut = async {
            self.read_until_text(PASSWORD_PROMPT).await?;
            self.write(hash_secret(secret).as_bytes()).await?;
            if self.read_auth_flag().await? == '1' {
                Ok(())
            } else {
                Err(WardenError::RconAuthFailed {
                    endpoint: self.endpoint.clone(),
                })
            }
        };
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| WardenError::ExchangeTimeout {
                endpoint,
                after: timeout,
            })?
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(|e| WardenError::from_io(self.endpoint.clone(), e))
    }

    /// Read one chunk into the buffer; EOF is a transport failure.
    async fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self
            .stream
            .read(&mut chunk)
            .await
            .map_err(|e| WardenError::from_io(self.endpoint.clone(), e))?;
        if n == 0 {
            return Err(WardenError::from_io(
                self.endpoint.clone(),
                std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            ));
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }

    async fn read_until_text(&mut self, marker: &str) -> Result<()> {
        self.buf.clear();
        loop {
            self.fill().await?;
            if String::from_utf8_lossy(&self.buf).contains(marker) {
                self.buf.clear();
                return Ok(());
            }
        }
    }

    /// The character right after `Authenticated=`, which may arrive in a
    /// later segment than the marker itself.
    async fn read_auth_flag(&mut self) -> Result<char> {
        self.buf.clear();
        loop {
            self.fill().await?;
            let flag = {
                let text = String::from_utf8_lossy(&self.buf);
                text.find(AUTH_MARKER)
                    .and_then(|pos| text[pos + AUTH_MARKER.len()..].chars().next())
            };
            if let Some(flag) = flag {
                self.buf.clear();
                return Ok(flag);
            }
        }
    }

    /// Read JSON documents until one answers `command`. A reply left over
    /// from an earlier exchange that timed out is skipped.
    async fn read_json(&mut self, command: &str) -> Result<Value> {
        let expected = command.split_whitespace().next().unwrap_or_default();
        loop {
            self.fill().await?;
            loop {
                let (next, used) = {
                    let mut docs =
                        serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
                    let next = docs.next();
                    (next, docs.byte_offset())
                };
                let value = match next {
                    None => break,
                    Some(Ok(value)) => value,
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => {
                        self.buf.clear();
                        return Err(WardenError::HandlerExecutionFailed {
                            command: command.to_string(),
                            reason: format!("malformed reply: {e}"),
                        });
                    }
                };
                self.buf.drain(..used);
                if answers(&value, expected) {
                    self.buf.clear();
                    return Ok(value);
                }
                debug!(
                    endpoint = %self.endpoint,
                    expected,
                    got = value.get("Command").and_then(serde_json::Value::as_str).unwrap_or_default(),
                    "discarding stale RCON reply"
                );
            }
        }
    }
}

/// Replies name their command in `Command`; replies without it are accepted.
fn answers(reply: &Value, expected: &str) -> bool {
    match reply.get("Command").and_then(Value::as_str) {
        Some(name) => name.eq_ignore_ascii_case(expected),
        None => true,
    }
}

#[async_trait]
impl RconSession for TcpSession {
    async fn exchange(&mut self, command: &str) -> Result<Value> {
        trace!(endpoint = %self.endpoint, command, "rcon exchange");
        let timeout = self.timeout;
        let endpoint = self.endpoint.clone();
        let fut = async {
            self.write(command.as_bytes()).await?;
            self.read_json(command).await
        };
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| WardenError::ExchangeTimeout {
                endpoint,
                after: timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::net::TcpListener;

    fn config_for(port: u16, secret: &str) -> ServerConfig {
        ServerConfig {
            name: "local".into(),
            address: "127.0.0.1".into(),
            port,
            secret: secret.into(),
            admin_identities: HashSet::new(),
        }
    }

    /// Minimal RCON peer: greets, checks the hash, answers one command.
    async fn spawn_peer(secret: &'static str, reply: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"Password: ").await.unwrap();
            let mut buf = [0u8; 256];
            let n = sock.read(&mut buf).await.unwrap();
            let ok = std::str::from_utf8(&buf[..n]).unwrap() == hash_secret(secret);
            let answer: &[u8] = if ok { b"Authenticated=1" } else { b"Authenticated=0" };
            sock.write_all(answer).await.unwrap();
            if !ok {
                return;
            }
            let n = sock.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"ServerInfo");
            // Split the reply to exercise partial reads.
            let (head, tail) = reply.split_at(reply.len() / 2);
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            sock.write_all(tail.as_bytes()).await.unwrap();
            let _ = sock.read(&mut buf).await;
        });
        port
    }

    #[test]
    fn secret_hash_is_hex_md5() {
        assert_eq!(hash_secret("password"), "5f4dcc3b5aa765d61d8327deb882cf99");
    }

    #[tokio::test]
    async fn handshake_and_exchange() {
        let port = spawn_peer("hunter2", r#"{"ServerInfo":{"ServerName":"Rush"}}"#).await;
        let mut session = TcpRconClient
            .open(&config_for(port, "hunter2"), Duration::from_secs(2))
            .await
            .unwrap();
        let value = session.exchange("ServerInfo").await.unwrap();
        assert_eq!(value["ServerInfo"]["ServerName"], "Rush");
    }

    #[tokio::test]
    async fn auth_flag_in_a_later_segment_is_awaited() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"Password: ").await.unwrap();
            let mut buf = [0u8; 256];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(b"Authenticated=").await.unwrap();
            sock.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            sock.write_all(b"1\n").await.unwrap();
            let _ = sock.read(&mut buf).await;
        });
        TcpRconClient
            .open(&config_for(port, "hunter2"), Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn late_reply_from_timed_out_exchange_is_skipped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"Password: ").await.unwrap();
            let mut buf = [0u8; 256];
            let _ = sock.read(&mut buf).await.unwrap();
            sock.write_all(b"Authenticated=1").await.unwrap();
            let n = sock.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"ServerInfo");
            tokio::time::sleep(Duration::from_millis(400)).await;
            sock.write_all(br#"{"Command":"ServerInfo","ServerInfo":{"ServerName":"Rush"}}"#)
                .await
                .unwrap();
            let n = sock.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"RotateMap");
            sock.write_all(br#"{"Command":"RotateMap","RotateMap":true}"#)
                .await
                .unwrap();
            let _ = sock.read(&mut buf).await;
        });
        let mut session = TcpRconClient
            .open(&config_for(port, "hunter2"), Duration::from_millis(300))
            .await
            .unwrap();
        let err = session.exchange("ServerInfo").await.unwrap_err();
        assert!(matches!(err, WardenError::ExchangeTimeout { .. }));

        let value = session.exchange("RotateMap").await.unwrap();
        assert_eq!(value["RotateMap"], true);
        assert!(value.get("ServerInfo").is_none());
    }

    #[test]
    fn replies_are_matched_by_command_name() {
        assert!(answers(&serde_json::json!({"Command": "RotateMap"}), "RotateMap"));
        assert!(answers(&serde_json::json!({"Command": "ResetSND"}), "resetsnd"));
        assert!(!answers(&serde_json::json!({"Command": "ServerInfo"}), "RotateMap"));
        assert!(answers(&serde_json::json!({"RotateMap": true}), "RotateMap"));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let port = spawn_peer("hunter2", "{}").await;
        let err = TcpRconClient
            .open(&config_for(port, "nope"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::RconAuthFailed { .. }));
    }

    #[tokio::test]
    async fn closed_port_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let err = TcpRconClient
            .open(&config_for(port, "x"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::TransportRefused { .. }));
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let err = TcpRconClient
            .open(&config_for(port, "x"), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::ExchangeTimeout { .. }));
    }
}
