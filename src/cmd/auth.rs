/*!
auth.rs - per-server privilege cascade.

A tier is granted when the caller is in the server's admin list (Admin,
satisfies everything) or holds the server-scoped role of a tier at or above
the requirement. Granting tiers are tried in `CASCADE` order and the first
match wins. A failed check writes one audit line and, unless silent, one
denial notice to the caller.
*/

use tracing::Level;

use super::response::Reply;
use super::tier::PrivilegeTier;
use crate::caller::CallerContext;
use crate::error::{Result, WardenError};
use crate::registry::ServerConfig;
use crate::utils::user_action_log;

#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizationCascade;

impl AuthorizationCascade {
    /// First tier in the cascade that the caller holds on `server`, if any
    /// satisfies `required`. Pure; no logging.
    pub fn granting_tier(
        &self,
        caller: &CallerContext,
        server: &ServerConfig,
        required: PrivilegeTier,
    ) -> Option<PrivilegeTier> {
        if required == PrivilegeTier::Everyone {
            return Some(PrivilegeTier::Everyone);
        }
        let identity = &caller.identity;
        required.satisfying().find(|tier| match tier {
            PrivilegeTier::Admin => server.is_admin(&identity.id),
            other => identity.holds_role(*other, &server.name),
        })
    }

    pub fn authorize(
        &self,
        caller: &CallerContext,
        server: &ServerConfig,
        required: PrivilegeTier,
        silent: bool,
    ) -> bool {
        if self.granting_tier(caller, server, required).is_some() {
            return true;
        }
        user_action_log(
            &caller.identity,
            format!("{} CHECK FAILED for server {}", required.audit_tag(), server.name),
            Level::WARN,
        );
        if !silent {
            caller.send(Reply::text(required.denial_notice()));
        }
        false
    }

    /// `authorize`, as a `Result` handlers can `?` on.
    pub fn require(
        &self,
        caller: &CallerContext,
        server: &ServerConfig,
        required: PrivilegeTier,
        silent: bool,
    ) -> Result<()> {
        if self.authorize(caller, server, required, silent) {
            Ok(())
        } else {
            Err(WardenError::AuthorizationDenied {
                tier: required,
                server: server.name.clone(),
            })
        }
    }
}
