//! Immutable editor snapshots.
//!
//! Every operation borrows the current [`EditorState`] and returns a new one;
//! the receiver is never modified, so a caller can keep old snapshots around
//! for undo without copying anything up front.

use super::{
    Block, BlockId, BlockKind, Document, EditError, Entity, LANGUAGE_KEY, MAX_LIST_DEPTH,
    Position, SelectedRange, Selection, previous_grapheme,
};
use crate::core::{InlineStyle, char_len};
use crate::decorate::{Decoration, DecoratorSet};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone)]
pub struct EditorState {
    document: Document,
    selection: Selection,
    decorators: DecoratorSet,
    pending_styles: Option<BTreeSet<InlineStyle>>,
}

impl EditorState {
    /// Wraps `document`, adding an empty paragraph if it has no blocks, with
    /// the caret at the start of the first block.
    pub fn new(mut document: Document) -> Self {
        if document.is_empty() {
            let raw = document.raw_source().map(str::to_string);
            // An empty document cannot hold duplicate ids.
            let _ = document.push_block(Block::new(BlockKind::Unstyled, ""));
            if let Some(raw) = raw {
                document.set_raw_source(raw);
            }
        }
        let first = document.blocks()[0].id;
        Self {
            document,
            selection: Selection::collapsed(Position::new(first, 0)),
            decorators: DecoratorSet::default(),
            pending_styles: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Document::new())
    }

    pub fn with_decorators(mut self, decorators: DecoratorSet) -> Self {
        self.decorators = decorators;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn decorators(&self) -> &DecoratorSet {
        &self.decorators
    }

    pub fn with_selection(&self, selection: Selection) -> Result<Self, EditError> {
        self.document.resolve(&selection)?;
        let mut next = self.clone();
        next.selection = selection;
        next.pending_styles = None;
        Ok(next)
    }

    pub fn range(&self) -> Result<SelectedRange, EditError> {
        self.document.resolve(&self.selection)
    }

    /// The block holding the selection focus.
    pub fn current_block(&self) -> Option<&Block> {
        self.document.block(self.selection.focus.block)
    }

    /// Styles the next typed text would get: pending toggles when present,
    /// otherwise what the caret inherits, or what the whole selection shares.
    pub fn current_inline_style(&self) -> BTreeSet<InlineStyle> {
        if let Some(pending) = &self.pending_styles {
            return pending.clone();
        }
        let Ok(range) = self.range() else {
            return BTreeSet::new();
        };
        if range.is_collapsed() {
            return self
                .current_block()
                .map(|block| block.styles_at(self.selection.focus.offset))
                .unwrap_or_default();
        }
        let segments = non_empty_segments(&range, &self.document);
        InlineStyle::ALL
            .into_iter()
            .filter(|style| {
                !segments.is_empty()
                    && segments.iter().all(|(index, start, end)| {
                        self.document.blocks()[*index]
                            .styles
                            .covers(*style, *start, *end)
                    })
            })
            .collect()
    }

    /// Rendering overlays for one block from the active decorators.
    pub fn decorations(&self, block_id: BlockId) -> Vec<Decoration> {
        self.document
            .block(block_id)
            .map(|block| self.decorators.decorate(&self.document, block))
            .unwrap_or_default()
    }

    /// Sets every touched block to `kind`, or back to unstyled when the first
    /// touched block already has it. Code metadata is left in place.
    pub fn toggle_block_type(&self, kind: BlockKind) -> Result<Self, EditError> {
        let range = self.range()?;
        let current = self.document.blocks()[range.start_index].kind;
        let target = if current == kind {
            BlockKind::Unstyled
        } else {
            kind
        };

        let mut next = self.clone();
        for index in range.start_index..=range.end_index {
            if let Some(block) = next.document.block_mut(index) {
                block.kind = target;
                if !target.is_list_item() {
                    block.depth = 0;
                }
                block.settle_line_breaks();
            }
        }
        Ok(next)
    }

    pub fn toggle_inline_style(&self, style: InlineStyle) -> Result<Self, EditError> {
        let range = self.range()?;
        let mut next = self.clone();

        if range.is_collapsed() {
            let mut pending = self.current_inline_style();
            if !pending.remove(&style) {
                pending.insert(style);
            }
            next.pending_styles = Some(pending);
            return Ok(next);
        }

        let segments = non_empty_segments(&range, &self.document);
        let covered = segments.iter().all(|(index, start, end)| {
            self.document.blocks()[*index]
                .styles
                .covers(style, *start, *end)
        });
        for (index, start, end) in segments {
            if let Some(block) = next.document.block_mut(index) {
                if covered {
                    block.styles.remove(Some(style), start, end);
                } else {
                    block.styles.insert(style, start, end);
                }
            }
        }
        Ok(next)
    }

    /// Writes (or with `None`, removes) the language tag on touched blocks.
    pub fn set_language(&self, language: Option<&str>) -> Result<Self, EditError> {
        let range = self.range()?;
        let mut next = self.clone();
        for index in range.start_index..=range.end_index {
            if let Some(block) = next.document.block_mut(index) {
                match language {
                    Some(language) => {
                        block
                            .data
                            .insert(LANGUAGE_KEY.to_string(), language.to_string());
                    }
                    None => {
                        block.data.remove(LANGUAGE_KEY);
                    }
                }
            }
        }
        Ok(next)
    }

    pub fn change_indent(&self, direction: IndentDirection) -> Result<Self, EditError> {
        let is_list = self
            .current_block()
            .map(|block| block.kind.is_list_item())
            .unwrap_or(false);
        if !is_list {
            return Ok(self.clone());
        }

        let range = self.range()?;
        let mut next = self.clone();
        for index in range.start_index..=range.end_index {
            if let Some(block) = next.document.block_mut(index)
                && block.kind.is_list_item()
            {
                block.depth = match direction {
                    IndentDirection::Increase => (block.depth + 1).min(MAX_LIST_DEPTH),
                    IndentDirection::Decrease => block.depth.saturating_sub(1),
                };
            }
        }
        Ok(next)
    }

    /// Replaces the selection with `text` and puts the caret after it.
    pub fn insert_text(&self, text: &str) -> Result<Self, EditError> {
        let range = self.range()?;
        let mut next = self.clone();
        next.document.delete_range(range)?;
        let block_id = next.document.blocks()[range.start_index].id;
        let pending = next.pending_styles.take();
        next.document
            .insert_text(block_id, range.start_offset, text, pending.as_ref())?;
        next.selection = Selection::collapsed(Position::new(
            block_id,
            range.start_offset + char_len(text),
        ));
        Ok(next)
    }

    /// Inserts a literal newline when the caret is inside a code block;
    /// a no-op anywhere else.
    pub fn insert_newline_in_code_block(&self) -> Result<Self, EditError> {
        let in_code = self
            .current_block()
            .map(|block| block.kind == BlockKind::CodeBlock)
            .unwrap_or(false);
        if !in_code {
            return Ok(self.clone());
        }
        let range = self.range()?;
        let mut next = self.clone();
        next.document.delete_range(range)?;
        let block_id = next.document.blocks()[range.start_index].id;
        next.document
            .insert_text(block_id, range.start_offset, "\n", Some(&BTreeSet::new()))?;
        next.selection =
            Selection::collapsed(Position::new(block_id, range.start_offset + 1));
        next.pending_styles = None;
        Ok(next)
    }

    /// Handles the return key: code blocks get a literal newline, an empty
    /// list item turns into a paragraph, anything else splits in two.
    pub fn split_block(&self) -> Result<Self, EditError> {
        let Some(block) = self.current_block() else {
            return Err(EditError::BlockNotFound);
        };
        if block.kind == BlockKind::CodeBlock {
            return self.insert_newline_in_code_block();
        }
        if block.kind.is_list_item() && block.text.is_empty() && self.selection.is_collapsed() {
            return self.toggle_block_type(block.kind);
        }

        let range = self.range()?;
        let mut next = self.clone();
        next.document.delete_range(range)?;
        let block_id = next.document.blocks()[range.start_index].id;
        let tail = next
            .document
            .split_block(Position::new(block_id, range.start_offset))?;
        next.selection = Selection::collapsed(Position::new(tail, 0));
        next.pending_styles = None;
        Ok(next)
    }

    /// Deletes the selection, or the grapheme before the caret. At the start
    /// of a header or list item the block first reverts to a paragraph; at
    /// the start of a paragraph it merges into the previous block.
    pub fn delete_backward(&self) -> Result<Self, EditError> {
        let range = self.range()?;
        let mut next = self.clone();
        next.pending_styles = None;

        if !range.is_collapsed() {
            next.document.delete_range(range)?;
            let block_id = next.document.blocks()[range.start_index].id;
            next.selection =
                Selection::collapsed(Position::new(block_id, range.start_offset));
            return Ok(next);
        }

        let index = range.start_index;
        let offset = range.start_offset;
        let block = &self.document.blocks()[index];

        if offset > 0 {
            let previous = previous_grapheme(&block.text, offset);
            next.document.delete_range(SelectedRange {
                start_index: index,
                start_offset: previous,
                end_index: index,
                end_offset: offset,
            })?;
            next.selection = Selection::collapsed(Position::new(block.id, previous));
            return Ok(next);
        }

        if block.kind.is_list_item() || block.kind.is_header() {
            return self.toggle_block_type(block.kind);
        }

        if index == 0 {
            return Ok(self.clone());
        }
        let previous = &self.document.blocks()[index - 1];
        let join_at = previous.char_len();
        next.document.delete_range(SelectedRange {
            start_index: index - 1,
            start_offset: join_at,
            end_index: index,
            end_offset: 0,
        })?;
        next.selection = Selection::collapsed(Position::new(previous.id, join_at));
        Ok(next)
    }

    /// Links the selected text to a new entity for `url`, replacing any link
    /// already there.
    pub fn add_link(&self, url: &str) -> Result<Self, EditError> {
        if url.is_empty() || self.selection.is_collapsed() {
            return Ok(self.clone());
        }
        let range = self.range()?;
        let segments = non_empty_segments(&range, &self.document);
        if segments.is_empty() {
            return Ok(self.clone());
        }

        let mut next = self.clone();
        let id = next.document.create_entity(Entity::Link {
            url: url.to_string(),
        });
        for (index, start, end) in segments {
            if let Some(block) = next.document.block_mut(index) {
                block.entities.remove(None, start, end);
                block.entities.insert(id, start, end);
            }
        }
        Ok(next)
    }

    pub fn remove_link(&self) -> Result<Self, EditError> {
        if self.selection.is_collapsed() {
            return Ok(self.clone());
        }
        let range = self.range()?;
        let mut next = self.clone();
        for (index, start, end) in non_empty_segments(&range, &self.document) {
            if let Some(block) = next.document.block_mut(index) {
                block.entities.remove(None, start, end);
            }
        }
        Ok(next)
    }
}

fn non_empty_segments(range: &SelectedRange, document: &Document) -> Vec<(usize, usize, usize)> {
    range
        .segments(document)
        .into_iter()
        .filter(|(_, start, end)| start < end)
        .collect()
}
