//! Core primitives shared by the document model.
//!
//! - [`EntityId`] - Keys into the document-scoped entity table
//! - [`InlineStyle`] - Character styles that can be toggled over a range
//! - [`RangeSet`] and [`Interval`] - Normalized half-open offset intervals
//! - [`Span`] - Flattened runs of uniform formatting, used for rendering and serialization
//!
//! All offsets in this crate count Unicode scalar values (`char`s), not bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod range;

pub use range::{Interval, RangeSet, Span, render_spans};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InlineStyle {
    Bold,
    Italic,
}

impl InlineStyle {
    pub const ALL: [InlineStyle; 2] = [InlineStyle::Bold, InlineStyle::Italic];

    pub fn as_str(self) -> &'static str {
        match self {
            InlineStyle::Bold => "BOLD",
            InlineStyle::Italic => "ITALIC",
        }
    }
}

pub type StyleRange = Interval<InlineStyle>;
pub type EntityRange = Interval<EntityId>;

/// Number of chars in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the char at `offset`, or `None` past the end.
pub fn byte_offset(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte_index, _) in text.char_indices() {
        if count == offset {
            return Some(byte_index);
        }
        count += 1;
    }
    if count == offset {
        Some(text.len())
    } else {
        None
    }
}
