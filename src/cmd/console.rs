/*!
console.rs - the caller-facing edge of the router.

  - TerminalSink      prints replies (styled text or one JSON document per reply)
  - translate(err)    turns expected failures into a message for the caller
  - Console::invoke   one command line: `batch`, `help` or a routed command
  - Console::run      line-oriented console over any async reader (stdin in main)

Sessions live in the router's pool, so every line of one console run reuses
the same connection per server.
*/

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{Level, debug, warn};

use super::batch::{BatchExecutor, BatchReport, tokenize};
use super::format::{StyleOptions, render_reply};
use super::response::Reply;
use super::router::{BATCH_COMMAND, COMMANDS, CommandRouter, ExecutionMode, Invocation};
use crate::caller::{CallerContext, ReplySink};
use crate::error::{ErrorKind, Result, WardenError};
use crate::rcon::RemoteCommandClient;
use crate::utils::user_action_log;

const HELP_COMMAND: &str = "help";
const PROMPT: &str = "rcon-warden> ";

/* -------------------------------------------------------------------------- */
/* Terminal output                                                            */
/* -------------------------------------------------------------------------- */

pub struct TerminalSink {
    json: bool,
    style: StyleOptions,
}

impl TerminalSink {
    pub fn new(json: bool, style: StyleOptions) -> Self {
        Self { json, style }
    }
}

impl ReplySink for TerminalSink {
    fn send(&self, reply: Reply) {
        if self.json {
            match serde_json::to_string(&reply) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("could not serialize reply: {e}"),
            }
        } else {
            println!("{}", render_reply(&reply, &self.style));
        }
    }

    fn send_report(&self, report: &BatchReport) {
        if self.json {
            println!("{}", report.to_json());
        } else {
            self.send(report.to_reply());
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Error translation                                                          */
/* -------------------------------------------------------------------------- */

/// Message for failures the caller is expected to hit; `Ok(None)` when the
/// caller was already told (denials). Anything unexpected is handed back.
pub fn translate(err: WardenError) -> Result<Option<String>> {
    match err.kind() {
        ErrorKind::Denied => Ok(None),
        ErrorKind::ServerNotFound => {
            let name = match &err {
                WardenError::ServerNotFound { server_name } => server_name.as_str(),
                _ => "",
            };
            Ok(Some(format!(
                "Server `{name}` not found. Please try again or use `servers` to list the available servers."
            )))
        }
        ErrorKind::Connectivity => Ok(Some(
            "Failed to establish connection to server, please try again later or contact an admin."
                .to_string(),
        )),
        ErrorKind::Usage => {
            let usage = match &err {
                WardenError::MissingArgument { usage, .. } => usage.as_str(),
                _ => "",
            };
            Ok(Some(format!(
                "Missing some required arguments.\nUsage: `{usage}`"
            )))
        }
        ErrorKind::CommandNotFound | ErrorKind::Other => Err(err),
    }
}

fn help_reply() -> Reply {
    let mut reply = Reply::titled("commands");
    for spec in COMMANDS {
        reply = reply.field(spec.usage(), format!("{} ({})", spec.summary, spec.tier));
    }
    reply
        .field(
            format!("{BATCH_COMMAND} <command>..."),
            "Runs several quoted commands and reports once (Everyone)",
        )
        .footer("Server names come last; `servers` lists them.")
}

/* -------------------------------------------------------------------------- */
/* Console                                                                    */
/* -------------------------------------------------------------------------- */

pub struct Console<'a, C: RemoteCommandClient> {
    router: &'a CommandRouter<C>,
    caller: CallerContext,
}

impl<'a, C: RemoteCommandClient> Console<'a, C> {
    pub fn new(router: &'a CommandRouter<C>, caller: CallerContext) -> Self {
        Self { router, caller }
    }

    /// Run one already tokenized command line. Translated failures are sent
    /// to the caller and count as handled.
    pub async fn invoke(&self, tokens: &[String]) -> Result<()> {
        let Some((name, args)) = tokens.split_first() else {
            return Ok(());
        };

        if name.eq_ignore_ascii_case(BATCH_COMMAND) {
            if args.is_empty() {
                return self.deliver_error(BATCH_COMMAND, WardenError::MissingArgument {
                    command: BATCH_COMMAND.to_string(),
                    usage: format!("{BATCH_COMMAND} <command>..."),
                });
            }
            let report = BatchExecutor::new(self.router).run(&self.caller, args).await;
            self.caller.replies.send_report(&report);
            return Ok(());
        }
        if name.eq_ignore_ascii_case(HELP_COMMAND) {
            self.caller.send(help_reply());
            return Ok(());
        }

        let invocation = Invocation::new(
            name.as_str(),
            args.to_vec(),
            self.caller.clone(),
            ExecutionMode::Direct,
        );
        match self.router.handle(&invocation).await {
            Ok(response) => {
                self.caller.send(response.to_reply());
                Ok(())
            }
            Err(err) => self.deliver_error(name, err),
        }
    }

    /// Audit the failure under the caller, then translate it. Denials were
    /// already audited by the tier check.
    fn deliver_error(&self, command: &str, err: WardenError) -> Result<()> {
        if err.kind() != ErrorKind::Denied {
            user_action_log(
                &self.caller.identity,
                format!("{} FAILED: {err}", command.to_ascii_uppercase()),
                Level::WARN,
            );
        }
        if let Some(message) = translate(err)? {
            self.caller.send(Reply::text(message));
        }
        Ok(())
    }

    /// Read command lines until `exit`, `quit` or end of input. Errors that
    /// survive translation are reported and the console keeps going.
    pub async fn run<R>(&self, input: R, prompt: bool) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            if prompt {
                print!("{PROMPT}");
                let _ = std::io::stdout().flush();
            }
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let tokens = tokenize(&line);
            match tokens.first().map(|t| t.to_ascii_lowercase()).as_deref() {
                None => continue,
                Some("exit" | "quit") => break,
                Some(_) => {}
            }
            if let Err(e) = self.invoke(&tokens).await {
                self.caller.send(Reply::text(format!("Error: {e}")));
            }
        }
        debug!(sessions = self.router.pool().cached_count(), "console closed");
        Ok(())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests                                                                       */
/* -------------------------------------------------------------------------- */
