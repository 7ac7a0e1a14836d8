//! Utilities: logging setup (dynamic level) and the audit line helper.
//!
//! Key items:
//!   init_logging / derive_level
//!   user_action_log

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::caller::CallerIdentity;

/// -q -> errors only, default -> info, -v -> debug, -vv -> trace.
pub fn derive_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber on stderr. `RUST_LOG` wins over the flag level.
pub fn init_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Audit line naming the acting user: `USER: name <id> -- message`.
pub fn user_action_log(caller: &CallerIdentity, message: impl AsRef<str>, level: Level) {
    let message = message.as_ref();
    let user = caller.display_name();
    let id = &caller.id;
    if level == Level::ERROR {
        tracing::error!(target: "audit", "USER: {user} <{id}> -- {message}");
    } else if level == Level::WARN {
        tracing::warn!(target: "audit", "USER: {user} <{id}> -- {message}");
    } else if level == Level::INFO {
        tracing::info!(target: "audit", "USER: {user} <{id}> -- {message}");
    } else {
        tracing::debug!(target: "audit", "USER: {user} <{id}> -- {message}");
    }
}

/// In-memory log sink for tests; `install` scopes it to the current thread.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
