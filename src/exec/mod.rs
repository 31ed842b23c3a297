//! Streaming code execution.
//!
//! An [`ExecutionClient`] turns a script into a stream of [`ExecEvent`]s.
//! The [`Executor`] drives one task per run, relays each event to the
//! session [`Terminal`] as a line, and keeps a count of runs whose stream
//! has not closed yet. Runs are independent: any number may overlap, and a
//! failing run only ends itself.

#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "local")]
pub use local::LocalRunner;

use crate::alert::{Alert, AlertSink};
use crate::error::{ExecutionError, ResetError};
use crate::terminal::{Terminal, TerminalWriter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Echo of the submitted script.
    Command,
    /// One line of process output.
    Output,
    /// Terminal failure; ends the run.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecEvent {
    pub kind: EventKind,
    pub data: String,
}

impl ExecEvent {
    pub fn command(data: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Command,
            data: data.into(),
        }
    }

    pub fn output(data: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Output,
            data: data.into(),
        }
    }

    pub fn error(data: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            data: data.into(),
        }
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<ExecEvent, ExecutionError>> + Send>>;

#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Opens one event stream for `code`. The stream ends when the run does.
    async fn run(&self, code: &str) -> Result<EventStream, ExecutionError>;

    /// Clears remote execution state.
    async fn reset(&self) -> Result<(), ResetError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Streaming,
    Completed,
    Failed(String),
    Cancelled,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed(_) | RunState::Cancelled
        )
    }
}

/// Observes and controls one run.
#[derive(Debug)]
pub struct RunHandle {
    state: watch::Receiver<RunState>,
    abort: AbortHandle,
}

impl RunHandle {
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// Waits for the run to finish. A run aborted before reporting an
    /// outcome resolves to [`RunState::Cancelled`].
    pub async fn wait(mut self) -> RunState {
        loop {
            let current = self.state.borrow_and_update().clone();
            if current.is_finished() {
                return current;
            }
            if self.state.changed().await.is_err() {
                let last = self.state.borrow().clone();
                return if last.is_finished() {
                    last
                } else {
                    RunState::Cancelled
                };
            }
        }
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }
}

/// Holds one slot of the in-flight count until dropped, so aborted runs
/// release their slot too.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Executor {
    client: Arc<dyn ExecutionClient>,
    terminal: Terminal,
    alerts: Arc<dyn AlertSink>,
    in_flight: Arc<AtomicUsize>,
    tasks: Mutex<Vec<AbortHandle>>,
}

impl Executor {
    pub fn new(
        client: Arc<dyn ExecutionClient>,
        terminal: Terminal,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            client,
            terminal,
            alerts,
            in_flight: Arc::new(AtomicUsize::new(0)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Runs whose stream has not closed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Shown next to the terminal while more than one run is active.
    pub fn status_line(&self) -> Option<String> {
        match self.in_flight() {
            0 | 1 => None,
            n => Some(format!("{n} processes running")),
        }
    }

    /// Starts running `code` and returns immediately. Must be called from
    /// within a Tokio runtime.
    pub fn run_code(&self, code: impl Into<String>) -> RunHandle {
        let code = code.into();
        self.terminal.reveal();
        let guard = InFlight::enter(&self.in_flight);
        info!(in_flight = self.in_flight(), bytes = code.len(), "run started");

        let (state_tx, state_rx) = watch::channel(RunState::Pending);
        let client = Arc::clone(&self.client);
        let alerts = Arc::clone(&self.alerts);
        let writer = self.terminal.writer();

        let task = tokio::spawn(async move {
            let outcome = relay(client.as_ref(), &code, &writer, &state_tx).await;
            drop(guard);
            match outcome {
                Ok(()) => {
                    debug!("run completed");
                    state_tx.send_replace(RunState::Completed);
                }
                Err(err) => {
                    warn!(error = %err, "run failed");
                    alerts.alert(Alert::error(err.to_string()));
                    state_tx.send_replace(RunState::Failed(err.to_string()));
                }
            }
        });

        let abort = task.abort_handle();
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(abort.clone());

        RunHandle {
            state: state_rx,
            abort,
        }
    }

    /// Writes `text` to `filename` by running a generated here-document.
    pub fn save_code(&self, text: &str, filename: &str) -> RunHandle {
        self.run_code(save_command(text, filename))
    }

    /// Clears the terminal once the runner confirms the reset. On failure the
    /// buffer keeps its lines and gains one warning line. The scrollback cap
    /// still applies to that line, so a full buffer drops its oldest line.
    pub async fn reset_terminal(&self) -> Result<(), ResetError> {
        match self.client.reset().await {
            Ok(()) => {
                info!("terminal reset");
                self.terminal.clear();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "terminal reset failed");
                self.terminal.append_line(format!("warning: {err}"));
                self.alerts.alert(Alert::warning(err.to_string()));
                Err(err)
            }
        }
    }

    /// Aborts every outstanding run and detaches their terminal writers.
    pub fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in &tasks {
            task.abort();
        }
        self.terminal.revoke_writers();
        debug!(aborted = tasks.len(), "executor shut down");
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn relay(
    client: &dyn ExecutionClient,
    code: &str,
    writer: &TerminalWriter,
    state: &watch::Sender<RunState>,
) -> Result<(), ExecutionError> {
    let mut stream = client.run(code).await?;
    state.send_replace(RunState::Streaming);
    while let Some(event) = stream.next().await {
        let event = event?;
        match event.kind {
            EventKind::Command | EventKind::Output => {
                if !writer.append_line(event.data) {
                    debug!("terminal detached, dropping run output");
                    return Ok(());
                }
            }
            EventKind::Error => return Err(ExecutionError::Remote(event.data)),
        }
    }
    Ok(())
}

/// Shell command that writes `text` to `filename` through a quoted
/// here-document, so the body is never expanded.
pub fn save_command(text: &str, filename: &str) -> String {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let mut marker = String::from("EOF");
    while body.lines().any(|line| line == marker) {
        marker.push('_');
    }
    format!(
        "cat > {} <<'{marker}'\n{body}\n{marker}",
        shell_quote(filename)
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_command() {
        assert_eq!(
            save_command("a: 1\n", "config.yaml"),
            "cat > 'config.yaml' <<'EOF'\na: 1\nEOF"
        );
    }

    #[test]
    fn test_save_command_marker_collision_and_quotes() {
        let command = save_command("EOF\n$HOME", "it's.txt");
        assert_eq!(command, "cat > 'it'\\''s.txt' <<'EOF_'\nEOF\n$HOME\nEOF_");
    }

    #[test]
    fn test_run_state_finished() {
        assert!(!RunState::Pending.is_finished());
        assert!(!RunState::Streaming.is_finished());
        assert!(RunState::Failed("x".into()).is_finished());
    }

    #[test]
    fn test_event_json() {
        let event: ExecEvent = serde_json::from_str(r#"{"kind":"output","data":"hi"}"#).unwrap();
        assert_eq!(event, ExecEvent::output("hi"));
    }
}
