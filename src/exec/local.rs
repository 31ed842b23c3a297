//! Runs scripts on the local machine with `<shell> -c`.

use super::{EventStream, ExecEvent, ExecutionClient};
use crate::error::{ExecutionError, ResetError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

pub const DEFAULT_SHELL: &str = "sh";

type EventSender = mpsc::Sender<Result<ExecEvent, ExecutionError>>;

#[derive(Debug, Clone)]
pub struct LocalRunner {
    dir: PathBuf,
    shell: String,
}

impl LocalRunner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            shell: DEFAULT_SHELL.to_string(),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Echo lines for `code`: the first line carries a `$ ` prompt.
fn echo(code: &str) -> Vec<Result<ExecEvent, ExecutionError>> {
    code.lines()
        .enumerate()
        .map(|(index, line)| {
            let line = if index == 0 {
                format!("$ {line}")
            } else {
                line.to_string()
            };
            Ok(ExecEvent::command(line))
        })
        .collect()
}

async fn pump<R>(reader: Option<R>, tx: EventSender)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(Ok(ExecEvent::output(line))).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(err) => {
                let _ = tx.send(Err(ExecutionError::Transport(err.to_string()))).await;
                return;
            }
        }
    }
}

#[async_trait]
impl ExecutionClient for LocalRunner {
    async fn run(&self, code: &str) -> Result<EventStream, ExecutionError> {
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(code)
            .current_dir(&self.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        debug!(shell = %self.shell, pid = ?child.id(), "spawned local run");

        let (tx, rx) = mpsc::channel(64);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        tokio::spawn(async move {
            tokio::join!(pump(stdout, tx.clone()), pump(stderr, tx.clone()));
            let status = tokio::select! {
                status = child.wait() => status,
                _ = tx.closed() => {
                    debug!("run stream dropped, killing child");
                    let _ = child.kill().await;
                    return;
                }
            };
            let event = match status {
                Ok(status) if status.success() => return,
                Ok(status) => match status.code() {
                    Some(code) => Ok(ExecEvent::output(format!("exit status {code}"))),
                    None => Ok(ExecEvent::output("terminated by signal")),
                },
                Err(err) => Err(ExecutionError::Spawn(err)),
            };
            let _ = tx.send(event).await;
        });

        let stream = tokio_stream::iter(echo(code)).chain(ReceiverStream::new(rx));
        Ok(Box::pin(stream))
    }

    async fn reset(&self) -> Result<(), ResetError> {
        Err(ResetError::Unsupported)
    }
}
