//! One editor instance: a document, its terminal, and its collaborators.
//!
//! The session owns everything it drives. Nothing here is process-wide, so
//! several sessions can run side by side and [`EditorSession::close`] tears
//! one down deterministically.

use crate::alert::AlertSink;
use crate::autosave::Autosave;
use crate::config::Config;
use crate::detect::{DEFAULT_FILENAME, Detection, detect};
use crate::doc::{
    Block, BlockKind, EditError, EditorState, EquivalenceMode, Parser, Selection,
};
use crate::error::EditorError;
use crate::exec::{ExecutionClient, Executor, RunHandle};
use crate::history::History;
use crate::store::FileStore;
use crate::terminal::Terminal;
use std::sync::Arc;
use tracing::{debug, info};

pub struct EditorSession {
    config: Config,
    state: EditorState,
    history: History,
    path: Option<String>,
    store: Arc<dyn FileStore>,
    executor: Executor,
    autosave: Autosave,
    alerts: Arc<dyn AlertSink>,
}

impl EditorSession {
    pub fn new(
        config: Config,
        store: Arc<dyn FileStore>,
        client: Arc<dyn ExecutionClient>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let terminal = Terminal::new(config.scrollback_lines);
        let executor = Executor::new(client, terminal, Arc::clone(&alerts));
        let autosave = Autosave::new(
            Arc::clone(&store),
            Arc::clone(&alerts),
            config.quiet_period(),
        );
        Self {
            config,
            state: EditorState::empty(),
            history: History::default(),
            path: None,
            store,
            executor,
            autosave,
            alerts,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_read_only(&self) -> bool {
        !self.config.edit_enabled
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn terminal(&self) -> &Terminal {
        self.executor.terminal()
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn autosave(&self) -> &Autosave {
        &self.autosave
    }

    fn report(&self, err: EditorError) -> EditorError {
        self.alerts.alert(err.to_alert());
        err
    }

    /// Replaces the document with the one stored at `path`. On failure the
    /// current document stays open.
    pub async fn open(&mut self, path: &str) -> Result<(), EditorError> {
        let text = match self.store.load(path).await {
            Ok(text) => text,
            Err(err) => return Err(self.report(err.into())),
        };
        self.autosave.cancel();
        let decorators = self.state.decorators().clone();
        self.state = EditorState::new(Parser::parse(&text)).with_decorators(decorators);
        self.history.clear();
        self.path = Some(path.to_string());
        let markdown = self.markdown();
        self.autosave.baseline(markdown);
        info!(path, blocks = self.state.document().blocks().len(), "opened document");
        Ok(())
    }

    pub fn markdown(&self) -> String {
        self.state.document().serialize(EquivalenceMode::Exact)
    }

    /// Runs one edit against the current state. Returns whether the document
    /// content changed; only content changes enter the history and restart
    /// the autosave timer.
    pub fn apply<F>(&mut self, edit: F) -> Result<bool, EditorError>
    where
        F: FnOnce(&EditorState) -> Result<EditorState, EditError>,
    {
        if self.is_read_only() {
            return Err(self.report(EditorError::ReadOnly));
        }
        let next = match edit(&self.state) {
            Ok(next) => next,
            Err(err) => return Err(self.report(err.into())),
        };
        if next.document().content_eq(self.state.document()) {
            self.state = next;
            return Ok(false);
        }
        let previous = std::mem::replace(&mut self.state, next);
        self.history.record(previous);
        self.schedule_autosave();
        Ok(true)
    }

    /// Moves the cursor. Allowed in read-only sessions so any code block can
    /// still be run or saved; never touches history or autosave.
    pub fn select(&mut self, selection: Selection) -> Result<(), EditorError> {
        match self.state.with_selection(selection) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(err) => Err(self.report(err.into())),
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.is_read_only() {
            return false;
        }
        let current = self.state.clone();
        match self.history.undo(current) {
            Ok(previous) => {
                self.state = previous;
                self.schedule_autosave();
                true
            }
            Err(_) => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.is_read_only() {
            return false;
        }
        let current = self.state.clone();
        match self.history.redo(current) {
            Ok(next) => {
                self.state = next;
                self.schedule_autosave();
                true
            }
            Err(_) => false,
        }
    }

    fn schedule_autosave(&mut self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let markdown = self.markdown();
        if self.autosave.observe(&path, &markdown) {
            debug!(path = %path, "autosave scheduled");
        }
    }

    /// Saves immediately, replacing any pending autosave.
    pub async fn save(&mut self) -> Result<(), EditorError> {
        if self.is_read_only() {
            return Err(self.report(EditorError::ReadOnly));
        }
        let Some(path) = self.path.clone() else {
            return Err(self.report(EditorError::NoDocument));
        };
        self.autosave.cancel();
        let markdown = self.markdown();
        if let Err(err) = self.store.save(&path, &markdown).await {
            return Err(self.report(err.into()));
        }
        self.autosave.baseline(markdown);
        Ok(())
    }

    pub fn current_block(&self) -> Option<&Block> {
        self.state.current_block()
    }

    pub fn detection(&self) -> Detection {
        self.current_block().map(detect).unwrap_or_default()
    }

    fn current_code(&self) -> Result<&Block, EditorError> {
        match self.current_block() {
            Some(block) if block.kind == BlockKind::CodeBlock => Ok(block),
            _ => Err(self.report(EditorError::NoCodeBlock)),
        }
    }

    /// Runs the code block under the cursor. Must be called from within a
    /// Tokio runtime.
    pub fn run_current_block(&self) -> Result<RunHandle, EditorError> {
        let block = self.current_code()?;
        Ok(self.executor.run_code(block.text.clone()))
    }

    /// Writes the code block under the cursor to its annotated filename.
    pub fn save_current_block(&self) -> Result<RunHandle, EditorError> {
        let block = self.current_code()?;
        let detection = detect(block);
        let filename = detection.filename.as_deref().unwrap_or(DEFAULT_FILENAME);
        Ok(self.executor.save_code(&block.text, filename))
    }

    pub async fn reset_terminal(&self) -> Result<(), EditorError> {
        self.executor.reset_terminal().await.map_err(EditorError::from)
    }

    /// Cancels the pending autosave without running it and stops every run.
    pub fn close(&mut self) {
        self.autosave.cancel();
        self.executor.shutdown();
        if let Some(path) = self.path.take() {
            info!(path = %path, "closed document");
        }
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.close();
    }
}
