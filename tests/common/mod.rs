#![allow(dead_code)]

use async_trait::async_trait;
use md_playground::{
    DocEntry, EventStream, ExecEvent, ExecutionClient, ExecutionError, FileStore, LoadError,
    ResetError, SaveError, store::title_of,
};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// In-memory file store that records every save.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, String>>,
    saves: Mutex<Vec<(String, String)>>,
    reject_saves: bool,
}

impl MemoryStore {
    pub fn with_file(self, path: &str, text: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), text.to_string());
        self
    }

    pub fn rejecting_saves() -> Self {
        Self {
            reject_saves: true,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> Vec<(String, String)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn list(&self) -> Result<Vec<DocEntry>, LoadError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, text)| DocEntry {
                title: title_of(path, text),
                path: path.clone(),
            })
            .collect())
    }

    async fn load(&self, path: &str) -> Result<String, LoadError> {
        self.file(path)
            .ok_or_else(|| LoadError::NotFound(path.to_string()))
    }

    async fn save(&self, path: &str, text: &str) -> Result<(), SaveError> {
        if self.reject_saves {
            return Err(SaveError::Rejected("read-only backend".to_string()));
        }
        self.saves
            .lock()
            .unwrap()
            .push((path.to_string(), text.to_string()));
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), text.to_string());
        Ok(())
    }
}

/// Execution client that echoes each line of the submitted code as one
/// output event, waiting `delay` before each. A line `!error <msg>` sends an
/// error event and `!transport` breaks the stream.
pub struct ScriptedClient {
    delay: Duration,
    reset_error: Option<String>,
    codes: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            reset_error: None,
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_reset(mut self, message: &str) -> Self {
        self.reset_error = Some(message.to_string());
        self
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionClient for ScriptedClient {
    async fn run(&self, code: &str) -> Result<EventStream, ExecutionError> {
        self.codes.lock().unwrap().push(code.to_string());
        let lines: Vec<String> = code.lines().map(str::to_string).collect();
        let delay = self.delay;
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for line in lines {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let event = if let Some(message) = line.strip_prefix("!error ") {
                    Ok(ExecEvent::error(message))
                } else if line == "!transport" {
                    Err(ExecutionError::Transport("connection reset".to_string()))
                } else {
                    Ok(ExecEvent::output(line))
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn reset(&self) -> Result<(), ResetError> {
        match &self.reset_error {
            Some(message) => Err(ResetError::Rejected(message.clone())),
            None => Ok(()),
        }
    }
}
