//! md-playground: Markdown documents with runnable code blocks.
//!
//! This crate provides the editing core of a Markdown playground, where
//! prose and executable snippets live in the same file. It includes:
//!
//! - **Document model** - blocks, inline style ranges, link entities, and
//!   immutable editor snapshots with structural edit operations
//! - **Markdown codec** - parser and serializer with exact and structural
//!   equivalence modes
//! - **Annotation detection** - which code blocks run and which write files
//! - **Decorators** - syntax-highlight and link overlays for rendering
//! - **Execution** - streamed runs into a shared terminal, with a local
//!   process runner (optional)
//! - **Autosave** - debounced persistence through a file store
//!
//! # Quick Start
//!
//! ```rust
//! use md_playground::{EquivalenceMode, Parser, detect};
//!
//! let doc = Parser::parse("# Setup\n\n```bash\n# *install.sh\nmake install\n```");
//! let detection = detect(&doc.blocks()[1]);
//! assert!(detection.executable);
//!
//! let output = doc.serialize(EquivalenceMode::Structural);
//! assert!(output.starts_with("# Setup"));
//! ```
//!
//! # Features
//!
//! - `local` (default) - `LocalRunner` and `DirStore`, backed by the local
//!   shell and file system

// Offsets, ranges, and span rendering
pub mod core;

// Document model, editor state, and Markdown codec
pub mod doc;

pub mod alert;
pub mod autosave;
pub mod config;
pub mod decorate;
pub mod detect;
pub mod error;
pub mod exec;
pub mod history;
pub mod session;
pub mod store;
pub mod terminal;

// Re-export core types
pub use core::{EntityId, InlineStyle, Interval, RangeSet, Span, render_spans};

// Re-export doc types
pub use doc::{
    Block, BlockId, BlockKind, Document, EditError, EditorState, Entity, EntityKind, EntityMap,
    EquivalenceMode, IndentDirection, Parser, Position, Selection, SerializeConfig,
};

pub use alert::{Alert, AlertSink, MemoryAlerts, Severity, TracingAlerts};
pub use autosave::Autosave;
pub use config::Config;
pub use decorate::{Decoration, DecorationKind, Decorator, DecoratorSet, TokenClass, overlay};
pub use detect::{Detection, Language, detect};
pub use error::{ConfigError, EditorError, ExecutionError, LoadError, ResetError, SaveError};
pub use exec::{EventKind, EventStream, ExecEvent, ExecutionClient, Executor, RunHandle, RunState};
pub use history::History;
pub use session::EditorSession;
pub use store::{DocEntry, FileStore, is_document};
pub use terminal::Terminal;

// Re-export local backends (feature-gated)
#[cfg(feature = "local")]
pub use exec::LocalRunner;
#[cfg(feature = "local")]
pub use store::DirStore;
