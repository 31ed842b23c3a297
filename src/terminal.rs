//! Append-only scrollback shared by every execution in a session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_SCROLLBACK: usize = 1000;

#[derive(Debug)]
struct Scrollback {
    lines: VecDeque<String>,
    capacity: usize,
    visible: bool,
    epoch: u64,
}

/// Cloneable handle to one line buffer. Clones share the buffer.
#[derive(Debug, Clone)]
pub struct Terminal {
    inner: Arc<Mutex<Scrollback>>,
}

impl Terminal {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Scrollback {
                lines: VecDeque::new(),
                capacity: capacity.max(1),
                visible: false,
                epoch: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Scrollback> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one line, dropping the oldest line when the buffer is full.
    pub fn append_line(&self, line: impl Into<String>) {
        let mut buffer = self.lock();
        if buffer.lines.len() == buffer.capacity {
            buffer.lines.pop_front();
        }
        buffer.lines.push_back(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().lines.is_empty()
    }

    pub fn clear(&self) {
        self.lock().lines.clear();
    }

    pub fn reveal(&self) {
        self.lock().visible = true;
    }

    pub fn hide(&self) {
        self.lock().visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    /// A writer bound to the current generation of this terminal.
    pub fn writer(&self) -> TerminalWriter {
        TerminalWriter {
            terminal: self.clone(),
            epoch: self.lock().epoch,
        }
    }

    /// Detaches every writer handed out so far; their later writes are
    /// dropped.
    pub fn revoke_writers(&self) {
        self.lock().epoch += 1;
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK)
    }
}

/// Write access for one execution. Stops writing once revoked.
#[derive(Debug, Clone)]
pub struct TerminalWriter {
    terminal: Terminal,
    epoch: u64,
}

impl TerminalWriter {
    /// Appends `line` unless this writer was revoked. Returns whether the
    /// line was written.
    pub fn append_line(&self, line: impl Into<String>) -> bool {
        let mut buffer = self.terminal.lock();
        if buffer.epoch != self.epoch {
            return false;
        }
        if buffer.lines.len() == buffer.capacity {
            buffer.lines.pop_front();
        }
        buffer.lines.push_back(line.into());
        true
    }

    pub fn is_revoked(&self) -> bool {
        self.terminal.lock().epoch != self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_clear() {
        let terminal = Terminal::default();
        terminal.append_line("one");
        terminal.append_line("two");
        assert_eq!(terminal.lines(), vec!["one", "two"]);
        terminal.clear();
        assert!(terminal.is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let terminal = Terminal::new(2);
        for line in ["a", "b", "c"] {
            terminal.append_line(line);
        }
        assert_eq!(terminal.lines(), vec!["b", "c"]);
    }

    #[test]
    fn test_clones_share_buffer() {
        let terminal = Terminal::default();
        let other = terminal.clone();
        other.append_line("shared");
        other.reveal();
        assert_eq!(terminal.len(), 1);
        assert!(terminal.is_visible());
        terminal.hide();
        assert!(!other.is_visible());
    }

    #[test]
    fn test_revoked_writer_is_silent() {
        let terminal = Terminal::default();
        let writer = terminal.writer();
        assert!(writer.append_line("before"));
        terminal.revoke_writers();
        assert!(writer.is_revoked());
        assert!(!writer.append_line("after"));
        assert_eq!(terminal.lines(), vec!["before"]);
        assert!(terminal.writer().append_line("fresh"));
    }
}
