/*!
batch.rs - run several sub-commands under one caller and report once.

Each raw sub-command is tokenized, resolved case-insensitively against the
command table and handled in `Batched` mode, strictly in input order.
Every failure stays inside its own entry: denials, unknown commands and
handler errors never stop the loop, and each one leaves an audit line with
the caller. The report always has one entry per
input, in input order, plus the total elapsed time.

JSON shape (--json):
{
  "status": "ok",
  "elapsed_ms": 12,
  "entries": [
    { "command": "rotatemap rush", "outcome": "denied" },
    { "command": "serverinfo rush", "outcome": "success", "value": "..." }
  ]
}
*/

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::{Level, info};

use super::response::Reply;
use super::router::{CommandRouter, ExecutionMode, Invocation, resolve};
use crate::caller::CallerContext;
use crate::error::WardenError;
use crate::rcon::RemoteCommandClient;
use crate::utils::user_action_log;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Success(String),
    Denied,
    NotFound,
    ExecutionFailed,
}

impl BatchOutcome {
    pub fn tag(&self) -> &'static str {
        match self {
            BatchOutcome::Success(_) => "success",
            BatchOutcome::Denied => "denied",
            BatchOutcome::NotFound => "not-found",
            BatchOutcome::ExecutionFailed => "execution-failed",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BatchOutcome::Success(value) => value,
            BatchOutcome::Denied => "Command failed due to lack of permissions.",
            BatchOutcome::NotFound => "execution failed - command not found",
            BatchOutcome::ExecutionFailed => "execution failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub command: String,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn to_reply(&self) -> Reply {
        let mut reply = Reply::titled("batch execute");
        for entry in &self.entries {
            reply = reply.field(&entry.command, entry.outcome.label());
        }
        reply.footer(format!("Execution time: {:?}", self.elapsed))
    }

    pub fn to_json(&self) -> Value {
        let entries: Vec<Value> = self
            .entries
            .iter()
            .map(|entry| {
                let mut obj = json!({
                    "command": entry.command,
                    "outcome": entry.outcome.tag(),
                });
                if let BatchOutcome::Success(value) = &entry.outcome {
                    obj["value"] = json!(value);
                }
                obj
            })
            .collect();
        json!({
            "status": "ok",
            "elapsed_ms": self.elapsed.as_millis() as u64,
            "entries": entries,
        })
    }
}

/// Split a sub-command with shell rules so quoted arguments survive;
/// unbalanced quotes fall back to plain whitespace splitting.
pub fn tokenize(raw: &str) -> Vec<String> {
    shell_words::split(raw)
        .unwrap_or_else(|_| raw.split_whitespace().map(String::from).collect())
}

pub struct BatchExecutor<'a, C: RemoteCommandClient> {
    router: &'a CommandRouter<C>,
}

impl<'a, C: RemoteCommandClient> BatchExecutor<'a, C> {
    pub fn new(router: &'a CommandRouter<C>) -> Self {
        Self { router }
    }

    pub async fn run(&self, caller: &CallerContext, raw_sub_commands: &[String]) -> BatchReport {
        let started = Instant::now();
        let mut entries = Vec::with_capacity(raw_sub_commands.len());
        for raw in raw_sub_commands {
            let outcome = self.run_one(caller, raw).await;
            entries.push(BatchEntry {
                command: raw.clone(),
                outcome,
            });
        }
        let report = BatchReport {
            entries,
            elapsed: started.elapsed(),
        };
        info!(
            caller = %caller.identity,
            commands = report.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch finished"
        );
        report
    }

    async fn run_one(&self, caller: &CallerContext, raw: &str) -> BatchOutcome {
        let mut tokens = tokenize(raw).into_iter();
        let Some(spec) = tokens.next().as_deref().and_then(resolve) else {
            user_action_log(
                &caller.identity,
                format!("BATCH: `{raw}` not found"),
                Level::WARN,
            );
            return BatchOutcome::NotFound;
        };

        let invocation = Invocation::new(
            spec.name,
            tokens.collect(),
            caller.clone(),
            ExecutionMode::Batched,
        );
        match self.router.handle(&invocation).await {
            Ok(response) => BatchOutcome::Success(response.batch_value()),
            Err(WardenError::AuthorizationDenied { .. }) => BatchOutcome::Denied,
            Err(e) => {
                user_action_log(
                    &caller.identity,
                    format!("BATCH: {} failed with {e}", spec.name),
                    Level::ERROR,
                );
                BatchOutcome::ExecutionFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::{CallerIdentity, IdentityId, RecordingSink};
    use crate::rcon::SessionPool;
    use crate::rcon::fake::{FakeClient, server};
    use crate::registry::StaticRegistry;
    use crate::utils::LogCapture;
    use std::sync::Arc;

    fn router(client: FakeClient) -> CommandRouter<FakeClient> {
        let mut rush = server("rush");
        rush.admin_identities.insert(IdentityId::new("1"));
        CommandRouter::new(
            Arc::new(StaticRegistry::new([rush])),
            SessionPool::new(client),
        )
    }

    fn caller(identity: CallerIdentity) -> (CallerContext, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (CallerContext::new(identity, sink.clone()), sink)
    }

    fn cmds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn mixed_batch_keeps_order_and_isolates_failures() {
        let router = router(FakeClient::canned());
        let (ctx, sink) = caller(CallerIdentity::new("9"));
        let report = BatchExecutor::new(&router)
            .run(&ctx, &cmds(&["rotatemap rush", "bogus", "serverinfo rush"]))
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.entries[0].command, "rotatemap rush");
        assert_eq!(report.entries[0].outcome, BatchOutcome::Denied);
        assert_eq!(report.entries[1].outcome, BatchOutcome::NotFound);
        assert!(matches!(report.entries[2].outcome, BatchOutcome::Success(ref v) if v.contains("Rush | EU")));
        assert!(sink.take().is_empty(), "batched denials send no notice");
    }

    #[tokio::test]
    async fn failing_exchange_only_fails_its_entry() {
        let client = FakeClient::new(|_, command| {
            if command == "RotateMap" {
                Err(WardenError::from_io(
                    "fake",
                    std::io::Error::from(std::io::ErrorKind::BrokenPipe),
                ))
            } else {
                Ok(crate::rcon::fake::canned_reply(command))
            }
        });
        let router = router(client);
        let (ctx, _) = caller(CallerIdentity::new("1"));
        let report = BatchExecutor::new(&router)
            .run(&ctx, &cmds(&["rotatemap rush", "resetsnd rush", "kick"]))
            .await;

        assert_eq!(
            report.entries.iter().map(|e| e.outcome.clone()).collect::<Vec<_>>(),
            vec![
                BatchOutcome::ExecutionFailed,
                BatchOutcome::Success("true".into()),
                BatchOutcome::ExecutionFailed,
            ]
        );
        assert_eq!(router.pool().client().opens(), 1, "session reused after failure");
    }

    #[tokio::test]
    async fn command_token_is_case_insensitive() {
        let router = router(FakeClient::canned());
        let (ctx, _) = caller(CallerIdentity::new("1"));
        let report = BatchExecutor::new(&router)
            .run(&ctx, &cmds(&["RotateMap rush", "rotatemap rush"]))
            .await;
        assert_eq!(report.entries[0].outcome, report.entries[1].outcome);
        assert_eq!(report.entries[0].outcome, BatchOutcome::Success("true".into()));
    }

    #[tokio::test]
    async fn unknown_server_is_execution_failure() {
        let router = router(FakeClient::canned());
        let (ctx, _) = caller(CallerIdentity::new("1"));
        let report = BatchExecutor::new(&router)
            .run(&ctx, &cmds(&["serverinfo koth", "", "batch serverinfo rush"]))
            .await;
        assert_eq!(
            report.entries.iter().map(|e| e.outcome.clone()).collect::<Vec<_>>(),
            vec![BatchOutcome::ExecutionFailed, BatchOutcome::NotFound, BatchOutcome::NotFound]
        );
    }

    #[tokio::test]
    async fn quoted_arguments_survive_tokenizing() {
        let router = router(FakeClient::canned());
        let (ctx, _) = caller(CallerIdentity::new("1"));
        BatchExecutor::new(&router)
            .run(&ctx, &cmds(&[r#"custom "GiveItem 76561198000000001 tazer" rush"#]))
            .await;
        assert_eq!(
            router.pool().client().exchanged(),
            vec![("rush".to_string(), "GiveItem 76561198000000001 tazer".to_string())]
        );
    }

    #[tokio::test]
    async fn every_failed_entry_is_audited_with_the_caller() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let router = router(FakeClient::canned());
        let (ctx, _) = caller(CallerIdentity::new("9").with_name("bob"));
        BatchExecutor::new(&router)
            .run(&ctx, &cmds(&["bogusxyz rush", "", "rotatemap rush", "serverinfo koth"]))
            .await;

        let out = logs.contents();
        assert!(out.contains("USER: bob <9> -- BATCH: `bogusxyz rush` not found"), "{out}");
        assert!(out.contains("USER: bob <9> -- BATCH: `` not found"), "{out}");
        assert!(out.contains("MOD CHECK FAILED for server rush"), "{out}");
        assert!(out.contains("USER: bob <9> -- BATCH: serverinfo failed with"), "{out}");
    }

    #[test]
    fn tokenize_falls_back_on_bad_quotes() {
        assert_eq!(tokenize(r#"kick "unterminated rush"#), vec!["kick", "\"unterminated", "rush"]);
        assert_eq!(tokenize("  serverinfo   rush "), vec!["serverinfo", "rush"]);
    }

    #[test]
    fn report_reply_has_one_field_per_entry() {
        let report = BatchReport {
            entries: vec![
                BatchEntry {
                    command: "rotatemap rush".into(),
                    outcome: BatchOutcome::Denied,
                },
                BatchEntry {
                    command: "bogus".into(),
                    outcome: BatchOutcome::NotFound,
                },
            ],
            elapsed: Duration::from_millis(12),
        };
        let reply = report.to_reply();
        assert_eq!(reply.fields.len(), 2);
        assert_eq!(reply.fields[0].value, "Command failed due to lack of permissions.");
        assert_eq!(reply.fields[1].value, "execution failed - command not found");
        assert_eq!(reply.footer.as_deref(), Some("Execution time: 12ms"));

        let json = report.to_json();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["elapsed_ms"], 12);
        assert_eq!(json["entries"][0]["outcome"], "denied");
        assert_eq!(json["entries"][0]["command"], "rotatemap rush");
    }
}
