//! Rich-text document model: blocks, entities, and selections.
//!
//! A [`Document`] is an ordered list of [`Block`]s plus a document-scoped,
//! append-only [`EntityMap`]. Blocks hold raw text; formatting lives in
//! offset ranges ([`RangeSet`]) and links are entity-id references into the
//! map, never copies of the entity data.

use crate::core::{EntityId, InlineStyle, RangeSet, byte_offset, char_len};
use std::collections::{BTreeMap, BTreeSet};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

pub mod markdown;
pub mod state;

pub use markdown::{EquivalenceMode, Parser, SerializeConfig};
pub use state::{EditorState, IndentDirection};

pub type BlockId = Uuid;

/// Metadata key holding a code block's language tag.
pub const LANGUAGE_KEY: &str = "language";

/// Deepest nesting level a list item can reach.
pub const MAX_LIST_DEPTH: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Unstyled,
    HeaderOne,
    HeaderTwo,
    HeaderThree,
    UnorderedListItem,
    OrderedListItem,
    CodeBlock,
}

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Unstyled,
        BlockKind::HeaderOne,
        BlockKind::HeaderTwo,
        BlockKind::HeaderThree,
        BlockKind::UnorderedListItem,
        BlockKind::OrderedListItem,
        BlockKind::CodeBlock,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Unstyled => "unstyled",
            BlockKind::HeaderOne => "header-1",
            BlockKind::HeaderTwo => "header-2",
            BlockKind::HeaderThree => "header-3",
            BlockKind::UnorderedListItem => "unordered-list-item",
            BlockKind::OrderedListItem => "ordered-list-item",
            BlockKind::CodeBlock => "code-block",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn is_list_item(self) -> bool {
        matches!(
            self,
            BlockKind::UnorderedListItem | BlockKind::OrderedListItem
        )
    }

    pub fn is_header(self) -> bool {
        matches!(
            self,
            BlockKind::HeaderOne | BlockKind::HeaderTwo | BlockKind::HeaderThree
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// List nesting depth; always zero for non-list blocks.
    pub depth: u8,
    pub text: String,
    pub styles: RangeSet<InlineStyle>,
    pub entities: RangeSet<EntityId>,
    pub data: BTreeMap<String, String>,
}

impl Block {
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            depth: 0,
            text: text.into(),
            styles: RangeSet::new(),
            entities: RangeSet::new(),
            data: BTreeMap::new(),
        }
    }

    pub fn code(language: Option<&str>, text: impl Into<String>) -> Self {
        let mut block = Self::new(BlockKind::CodeBlock, text);
        if let Some(language) = language {
            block.data.insert(LANGUAGE_KEY.to_string(), language.to_string());
        }
        block
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth.min(MAX_LIST_DEPTH);
        self
    }

    /// The stored language tag, regardless of block kind.
    pub fn language(&self) -> Option<&str> {
        self.data.get(LANGUAGE_KEY).map(String::as_str)
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    /// Styles of the char before `offset` (or of the first char at offset zero).
    pub fn styles_at(&self, offset: usize) -> BTreeSet<InlineStyle> {
        let before = offset.saturating_sub(1);
        self.styles.values_at(before).collect()
    }

    pub fn entity_at(&self, offset: usize) -> Option<EntityId> {
        self.entities.values_at(offset).next()
    }

    /// Turns line breaks Markdown cannot carry for this kind into spaces.
    /// Headers and list items are single lines. A paragraph may hold soft
    /// breaks but no blank line, and never starts or ends with a break.
    /// Code blocks are untouched. Char offsets do not move.
    pub fn settle_line_breaks(&mut self) {
        if self.kind == BlockKind::CodeBlock || !self.text.contains(['\n', '\r']) {
            return;
        }
        let mut chars: Vec<char> = self
            .text
            .chars()
            .map(|ch| if ch == '\r' { ' ' } else { ch })
            .collect();
        if self.kind != BlockKind::Unstyled {
            for ch in chars.iter_mut().filter(|ch| **ch == '\n') {
                *ch = ' ';
            }
        } else {
            let mut line_start = 0;
            for index in 0..chars.len() {
                if chars[index] != '\n' {
                    continue;
                }
                let next_end = chars[index + 1..]
                    .iter()
                    .position(|ch| *ch == '\n')
                    .map_or(chars.len(), |at| index + 1 + at);
                let blank_before = chars[line_start..index].iter().all(|ch| ch.is_whitespace());
                let blank_after = chars[index + 1..next_end].iter().all(|ch| ch.is_whitespace());
                if blank_before || blank_after {
                    chars[index] = ' ';
                } else {
                    line_start = index + 1;
                }
            }
        }
        self.text = chars.into_iter().collect();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Link { url: String },
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Link { .. } => EntityKind::Link,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Entity::Link { url } => Some(url),
        }
    }
}

/// Append-only entity table. Ids are never reused, so a range can never
/// end up pointing at a different entity than the one it was created for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMap {
    entries: BTreeMap<EntityId, Entity>,
    next: u64,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, entity: Entity) -> EntityId {
        self.next += 1;
        let id = EntityId(self.next);
        self.entries.insert(id, entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entries.iter().map(|(id, entity)| (*id, entity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub block: BlockId,
    pub offset: usize,
}

impl Position {
    pub fn new(block: BlockId, offset: usize) -> Self {
        Self { block, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn new(anchor: Position, focus: Position) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// A selection resolved against a document: block indices and offsets in
/// document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedRange {
    pub start_index: usize,
    pub start_offset: usize,
    pub end_index: usize,
    pub end_offset: usize,
}

impl SelectedRange {
    pub fn is_collapsed(&self) -> bool {
        self.start_index == self.end_index && self.start_offset == self.end_offset
    }

    /// `(block index, start, end)` for every block the range touches.
    pub fn segments(&self, doc: &Document) -> Vec<(usize, usize, usize)> {
        (self.start_index..=self.end_index)
            .filter_map(|index| {
                let block = doc.blocks.get(index)?;
                let start = if index == self.start_index {
                    self.start_offset
                } else {
                    0
                };
                let end = if index == self.end_index {
                    self.end_offset
                } else {
                    block.char_len()
                };
                Some((index, start, end))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("block not found")]
    BlockNotFound,
    #[error("duplicate block id {0}")]
    DuplicateBlock(BlockId),
    #[error("invalid offset")]
    InvalidOffset,
    #[error("invalid grapheme boundary")]
    InvalidGraphemeBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub frontmatter: Option<String>,
    blocks: Vec<Block>,
    entities: EntityMap,
    raw_source: Option<String>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            frontmatter: None,
            blocks: Vec::new(),
            entities: EntityMap::new(),
            raw_source: None,
        }
    }

    pub fn from_blocks(blocks: Vec<Block>, entities: EntityMap) -> Result<Self, EditError> {
        let mut doc = Self::new();
        doc.entities = entities;
        for block in blocks {
            doc.push_block(block)?;
        }
        Ok(doc)
    }

    pub fn set_raw_source(&mut self, source: String) {
        self.raw_source = Some(source);
    }

    pub fn clear_raw_source(&mut self) {
        self.raw_source = None;
    }

    pub fn raw_source(&self) -> Option<&str> {
        self.raw_source.as_deref()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    pub fn create_entity(&mut self, entity: Entity) -> EntityId {
        self.clear_raw_source();
        self.entities.create(entity)
    }

    /// Mutable access to the block at `index`. Any mutation invalidates the
    /// raw source kept for exact serialization.
    pub(crate) fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.raw_source = None;
        self.blocks.get_mut(index)
    }

    pub fn push_block(&mut self, block: Block) -> Result<(), EditError> {
        let index = self.blocks.len();
        self.insert_block(index, block)
    }

    pub fn insert_block(&mut self, index: usize, block: Block) -> Result<(), EditError> {
        if index > self.blocks.len() {
            return Err(EditError::InvalidOffset);
        }
        if self.index_of(block.id).is_some() {
            return Err(EditError::DuplicateBlock(block.id));
        }
        self.blocks.insert(index, block);
        self.clear_raw_source();
        Ok(())
    }

    pub fn remove_block(&mut self, id: BlockId) -> Result<Block, EditError> {
        let index = self.index_of(id).ok_or(EditError::BlockNotFound)?;
        self.clear_raw_source();
        Ok(self.blocks.remove(index))
    }

    /// Resolves a selection into document order, validating blocks and offsets.
    pub fn resolve(&self, selection: &Selection) -> Result<SelectedRange, EditError> {
        let anchor = self.resolve_position(&selection.anchor)?;
        let focus = self.resolve_position(&selection.focus)?;
        let (start, end) = if anchor <= focus {
            (anchor, focus)
        } else {
            (focus, anchor)
        };
        Ok(SelectedRange {
            start_index: start.0,
            start_offset: start.1,
            end_index: end.0,
            end_offset: end.1,
        })
    }

    fn resolve_position(&self, position: &Position) -> Result<(usize, usize), EditError> {
        let index = self
            .index_of(position.block)
            .ok_or(EditError::BlockNotFound)?;
        if position.offset > self.blocks[index].char_len() {
            return Err(EditError::InvalidOffset);
        }
        Ok((index, position.offset))
    }

    /// Inserts `text` at `offset` in block `block_id`. The inserted chars take
    /// `styles` when given, otherwise the styles of the preceding char. Links
    /// grow only when the insertion point is strictly inside them.
    pub fn insert_text(
        &mut self,
        block_id: BlockId,
        offset: usize,
        text: &str,
        styles: Option<&BTreeSet<InlineStyle>>,
    ) -> Result<(), EditError> {
        let index = self.index_of(block_id).ok_or(EditError::BlockNotFound)?;
        let block = &self.blocks[index];
        let byte_index = byte_offset(&block.text, offset).ok_or(EditError::InvalidOffset)?;
        if !is_grapheme_boundary(&block.text, byte_index) {
            return Err(EditError::InvalidGraphemeBoundary);
        }
        if text.is_empty() {
            return Ok(());
        }
        let inherited = styles.cloned().unwrap_or_else(|| {
            if offset == 0 {
                BTreeSet::new()
            } else {
                block.styles_at(offset)
            }
        });

        let inserted = char_len(text);
        let Some(block) = self.block_mut(index) else {
            return Err(EditError::BlockNotFound);
        };
        block.text.insert_str(byte_index, text);
        block.styles.shift_for_insert(offset, inserted);
        block.entities.shift_for_insert(offset, inserted);
        block.styles.remove(None, offset, offset + inserted);
        for style in inherited {
            block.styles.insert(style, offset, offset + inserted);
        }
        block.settle_line_breaks();
        Ok(())
    }

    /// Deletes the text between two positions, merging the blocks in between
    /// into the first one when the range spans several blocks.
    pub fn delete_range(&mut self, range: SelectedRange) -> Result<(), EditError> {
        if range.is_collapsed() {
            return Ok(());
        }
        if range.end_index >= self.blocks.len() || range.start_index > range.end_index {
            return Err(EditError::BlockNotFound);
        }

        if range.start_index == range.end_index {
            let Some(block) = self.block_mut(range.start_index) else {
                return Err(EditError::BlockNotFound);
            };
            let from = byte_offset(&block.text, range.start_offset).ok_or(EditError::InvalidOffset)?;
            let to = byte_offset(&block.text, range.end_offset).ok_or(EditError::InvalidOffset)?;
            block.text.replace_range(from..to, "");
            block.styles.shift_for_delete(range.start_offset, range.end_offset);
            block.entities.shift_for_delete(range.start_offset, range.end_offset);
            block.settle_line_breaks();
            return Ok(());
        }

        let mut last = self.blocks[range.end_index].clone();
        let tail_from = byte_offset(&last.text, range.end_offset).ok_or(EditError::InvalidOffset)?;
        let tail_text = last.text.split_off(tail_from);
        let tail_styles = last.styles.split_off(range.end_offset);
        let tail_entities = last.entities.split_off(range.end_offset);

        let Some(first) = self.block_mut(range.start_index) else {
            return Err(EditError::BlockNotFound);
        };
        let cut = byte_offset(&first.text, range.start_offset).ok_or(EditError::InvalidOffset)?;
        first.text.truncate(cut);
        first.styles.clamp(range.start_offset);
        first.entities.clamp(range.start_offset);
        first.text.push_str(&tail_text);
        first.styles.append_shifted(&tail_styles, range.start_offset);
        first.entities.append_shifted(&tail_entities, range.start_offset);
        first.settle_line_breaks();

        self.blocks.drain(range.start_index + 1..=range.end_index);
        Ok(())
    }

    /// Splits a block at `at`, returning the id of the new second half.
    /// Headers continue as unstyled paragraphs; list items keep kind and depth.
    pub fn split_block(&mut self, at: Position) -> Result<BlockId, EditError> {
        let index = self.index_of(at.block).ok_or(EditError::BlockNotFound)?;
        let Some(block) = self.block_mut(index) else {
            return Err(EditError::BlockNotFound);
        };
        let split = byte_offset(&block.text, at.offset).ok_or(EditError::InvalidOffset)?;

        let kind = if block.kind.is_header() {
            BlockKind::Unstyled
        } else {
            block.kind
        };
        let mut tail = Block::new(kind, block.text.split_off(split));
        tail.depth = block.depth;
        tail.styles = block.styles.split_off(at.offset);
        tail.entities = block.entities.split_off(at.offset);
        if kind == BlockKind::CodeBlock {
            tail.data = block.data.clone();
        }
        block.settle_line_breaks();
        tail.settle_line_breaks();
        let tail_id = tail.id;
        self.blocks.insert(index + 1, tail);
        Ok(tail_id)
    }

    /// Compares content while ignoring block ids and entity ids, which are
    /// reassigned whenever a document is parsed.
    pub fn content_eq(&self, other: &Document) -> bool {
        if self.frontmatter != other.frontmatter || self.blocks.len() != other.blocks.len() {
            return false;
        }
        self.blocks.iter().zip(&other.blocks).all(|(a, b)| {
            a.kind == b.kind
                && a.depth == b.depth
                && a.text == b.text
                && a.styles == b.styles
                && a.data == b.data
                && self.link_targets(a) == other.link_targets(b)
        })
    }

    fn link_targets<'a>(&'a self, block: &Block) -> Vec<(usize, usize, Option<&'a str>)> {
        let mut targets: Vec<_> = block
            .entities
            .iter()
            .map(|range| {
                let url = self.entities.get(range.value).and_then(Entity::url);
                (range.start, range.end, url)
            })
            .collect();
        targets.sort();
        targets
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn is_grapheme_boundary(text: &str, byte_offset: usize) -> bool {
    if byte_offset == 0 || byte_offset == text.len() {
        return true;
    }
    text.grapheme_indices(true)
        .any(|(index, _)| index == byte_offset)
}

/// Char offset of the grapheme boundary preceding `offset`.
pub(crate) fn previous_grapheme(text: &str, offset: usize) -> usize {
    let Some(limit) = byte_offset(text, offset) else {
        return offset.saturating_sub(1);
    };
    text[..limit]
        .grapheme_indices(true)
        .last()
        .map(|(byte_index, _)| char_len(&text[..byte_index]))
        .unwrap_or(0)
}
