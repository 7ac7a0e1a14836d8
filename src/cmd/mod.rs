/*!
Command layer: what a caller can run and how it reaches a game server.

Directory Layout:
  src/cmd/
    mod.rs          (this file)
    tier.rs         (PrivilegeTier + the Admin > Moderator > Captain cascade)
    auth.rs         (AuthorizationCascade: tier check + denial notice)
    player.rs       (profile link -> player id)
    response.rs     (typed RCON reply views, Reply, batch values)
    router.rs       (command table, argument binding, dispatch)
    batch.rs        (BatchExecutor + BatchReport)
    console.rs      (terminal sink, error translation, interactive console)
    format.rs       (ANSI / table rendering for human output)

Flow of one command:
  tokens -> router::resolve -> bind args -> registry lookup -> tier check
         -> SessionPool::exchange (exactly once) -> CommandResponse
         -> Reply (direct) or value (batched)

Conventions:
  - Handlers never talk to the socket directly; everything goes through
    the pool so sessions are shared per server.
  - Failures are `WardenError`; only the console decides which of them
    become caller-facing messages.
*/

pub mod auth;
pub mod batch;
pub mod console;
pub mod format;
pub mod player;
pub mod response;
pub mod router;
pub mod tier;

pub use console::{Console, TerminalSink};
pub use router::CommandRouter;
