/*!
PrivilegeTier: ordered privilege levels gating each command.

  Everyone < Captain < Moderator < Admin

Helpers:
  - CASCADE (evaluation order Admin -> Moderator -> Captain)
  - satisfying()   tiers that can satisfy a requirement, in cascade order
  - role_label()   server-scoped role name granting the tier
*/

use std::fmt;

/// Privilege required to run a command against a server.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum PrivilegeTier {
    Everyone,
    Captain,
    Moderator,
    Admin,
}

/// Order in which granting tiers are checked. First match wins.
pub const CASCADE: [PrivilegeTier; 3] = [
    PrivilegeTier::Admin,
    PrivilegeTier::Moderator,
    PrivilegeTier::Captain,
];

impl PrivilegeTier {
    /// Tiers that satisfy `self`, highest first.
    pub fn satisfying(self) -> impl Iterator<Item = PrivilegeTier> {
        CASCADE.into_iter().filter(move |t| *t >= self)
    }

    /// Role label that grants this tier on `server`. Admin comes from the
    /// registry instead of a role, Everyone needs nothing.
    pub fn role_label(self, server: &str) -> Option<String> {
        match self {
            PrivilegeTier::Moderator => Some(format!("Mod-{server}")),
            PrivilegeTier::Captain => Some(format!("Captain-{server}")),
            PrivilegeTier::Admin | PrivilegeTier::Everyone => None,
        }
    }

    /// Short tag used in audit lines ("MOD CHECK FAILED ...").
    pub fn audit_tag(self) -> &'static str {
        match self {
            PrivilegeTier::Everyone => "EVERYONE",
            PrivilegeTier::Captain => "CAPTAIN",
            PrivilegeTier::Moderator => "MOD",
            PrivilegeTier::Admin => "ADMIN",
        }
    }

    pub fn denial_notice(self) -> &'static str {
        match self {
            PrivilegeTier::Admin => "This command is only for Admins.",
            PrivilegeTier::Moderator => "This command is only for Moderators and above.",
            PrivilegeTier::Captain => "This command is only for Captains and above.",
            PrivilegeTier::Everyone => "This command is available to everyone.",
        }
    }
}

impl fmt::Display for PrivilegeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrivilegeTier::Everyone => "Everyone",
            PrivilegeTier::Captain => "Captain",
            PrivilegeTier::Moderator => "Moderator",
            PrivilegeTier::Admin => "Admin",
        };
        f.write_str(s)
    }
}

/* --------------------------------- Tests ---------------------------------- */
