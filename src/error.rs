//! Error taxonomy shared by the registry, RCON transport, router and batch engine.
//!
//! `kind()` folds the variants into the few categories the top-level
//! translator renders a message for.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::cmd::tier::PrivilegeTier;

pub type Result<T, E = WardenError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("server `{server_name}` not found")]
    ServerNotFound { server_name: String },

    #[error("{tier} permissions required on server `{server}`")]
    AuthorizationDenied { tier: PrivilegeTier, server: String },

    #[error("connection refused by {endpoint}: {source}")]
    TransportRefused {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("{endpoint} unreachable: {source}")]
    TransportUnreachable {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("no reply from {endpoint} within {}s", after.as_secs_f32())]
    ExchangeTimeout { endpoint: String, after: Duration },

    #[error("RCON authentication rejected by {endpoint}")]
    RconAuthFailed { endpoint: String },

    #[error("command not found: {name}")]
    CommandNotFound { name: String },

    #[error("missing required arguments for `{command}` (usage: {usage})")]
    MissingArgument { command: String, usage: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{command} failed: {reason}")]
    HandlerExecutionFailed { command: String, reason: String },

    #[error("server registry: {0}")]
    Registry(String),
}

/// Coarse classification used when translating errors for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ServerNotFound,
    Denied,
    Connectivity,
    CommandNotFound,
    Usage,
    Other,
}

impl WardenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WardenError::ServerNotFound { .. } => ErrorKind::ServerNotFound,
            WardenError::AuthorizationDenied { .. } => ErrorKind::Denied,
            WardenError::TransportRefused { .. }
            | WardenError::TransportUnreachable { .. }
            | WardenError::ExchangeTimeout { .. } => ErrorKind::Connectivity,
            WardenError::CommandNotFound { .. } => ErrorKind::CommandNotFound,
            WardenError::MissingArgument { .. } => ErrorKind::Usage,
            WardenError::RconAuthFailed { .. }
            | WardenError::InvalidArgument(_)
            | WardenError::HandlerExecutionFailed { .. }
            | WardenError::Registry(_) => ErrorKind::Other,
        }
    }

    /// Map a socket error to the refused/unreachable split.
    pub fn from_io(endpoint: impl Into<String>, source: io::Error) -> Self {
        let endpoint = endpoint.into();
        if source.kind() == io::ErrorKind::ConnectionRefused {
            WardenError::TransportRefused { endpoint, source }
        } else {
            WardenError::TransportUnreachable { endpoint, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_socket_maps_to_refused() {
        let err = WardenError::from_io(
            "127.0.0.1:9100",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert!(matches!(err, WardenError::TransportRefused { .. }));
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn other_socket_errors_map_to_unreachable() {
        let err = WardenError::from_io("10.0.0.1:9100", io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, WardenError::TransportUnreachable { .. }));
    }

    #[test]
    fn denial_message_names_tier_and_server() {
        let err = WardenError::AuthorizationDenied {
            tier: PrivilegeTier::Moderator,
            server: "rush".into(),
        };
        assert_eq!(err.to_string(), "Moderator permissions required on server `rush`");
        assert_eq!(err.kind(), ErrorKind::Denied);
    }
}
