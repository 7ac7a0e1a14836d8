//! Who is invoking a command, which roles they hold, and where their replies go.
//!
//! The chat platform (or the CLI standing in for it) supplies a fresh
//! `CallerIdentity` per invocation; nothing here is cached.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::cmd::batch::BatchReport;
use crate::cmd::response::Reply;
use crate::cmd::tier::PrivilegeTier;

/// Opaque platform identity. Registry files carry these as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for IdentityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => IdentityId(n.to_string()),
            Raw::Text(s) => IdentityId::new(s),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub id: IdentityId,
    /// Display name for audit lines; falls back to the id.
    pub name: Option<String>,
    /// Role labels as the platform reports them, e.g. `Mod-rush`.
    pub role_memberships: HashSet<String>,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(id),
            name: None,
            role_memberships: HashSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, label: impl Into<String>) -> Self {
        self.role_memberships.insert(label.into());
        self
    }

    /// Whether the caller holds the role granting `tier` on `server`.
    pub fn holds_role(&self, tier: PrivilegeTier, server: &str) -> bool {
        tier.role_label(server)
            .is_some_and(|label| self.role_memberships.contains(&label))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.display_name(), self.id)
    }
}

/// Send-reply primitive provided by the platform.
pub trait ReplySink: Send + Sync {
    fn send(&self, reply: Reply);

    /// A finished batch is delivered as one reply unless the sink knows better.
    fn send_report(&self, report: &BatchReport) {
        self.send(report.to_reply());
    }
}

/// Caller plus the channel their replies are delivered on.
#[derive(Clone)]
pub struct CallerContext {
    pub identity: CallerIdentity,
    pub replies: Arc<dyn ReplySink>,
}

impl CallerContext {
    pub fn new(identity: CallerIdentity, replies: Arc<dyn ReplySink>) -> Self {
        Self { identity, replies }
    }

    pub fn send(&self, reply: Reply) {
        self.replies.send(reply);
    }
}

/// Sink that keeps every reply in memory, for inspecting what a caller was told.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    replies: std::sync::Mutex<Vec<Reply>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.replies.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }
}

#[cfg(test)]
impl ReplySink for RecordingSink {
    fn send(&self, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(reply);
    }
}
