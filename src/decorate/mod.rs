//! Rendering overlays derived from block content.
//!
//! Each [`Decorator`] is a pure function of a block and the document's
//! entity table. A [`DecoratorSet`] runs them in order and concatenates the
//! results; overlays from different decorators may overlap and are merged
//! with the block's inline styles by [`overlay`].

pub mod highlight;

pub use highlight::{TokenClass, highlight};

use crate::core::{EntityId, InlineStyle};
use crate::detect::detect;
use crate::doc::{Block, Document, Entity};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationKind {
    Token(TokenClass),
    Link { entity: EntityId, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub start: usize,
    pub end: usize,
    pub kind: DecorationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decorator {
    SyntaxHighlight,
    Link,
}

impl Decorator {
    pub fn decorate(self, document: &Document, block: &Block) -> Vec<Decoration> {
        match self {
            Decorator::SyntaxHighlight => {
                let Some(language) = detect(block).language else {
                    return Vec::new();
                };
                highlight(&block.text, language)
            }
            Decorator::Link => block
                .entities
                .iter()
                .filter_map(|range| match document.entities().get(range.value)? {
                    Entity::Link { url } => Some(Decoration {
                        start: range.start,
                        end: range.end,
                        kind: DecorationKind::Link {
                            entity: range.value,
                            url: url.clone(),
                        },
                    }),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorSet {
    decorators: Vec<Decorator>,
}

impl DecoratorSet {
    pub fn new(decorators: impl IntoIterator<Item = Decorator>) -> Self {
        let mut set = Self {
            decorators: Vec::new(),
        };
        for decorator in decorators {
            if !set.decorators.contains(&decorator) {
                set.decorators.push(decorator);
            }
        }
        set
    }

    pub fn none() -> Self {
        Self::new([])
    }

    pub fn contains(&self, decorator: Decorator) -> bool {
        self.decorators.contains(&decorator)
    }

    pub fn iter(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.decorators.iter().copied()
    }

    /// All overlays for `block`, ordered by start offset.
    pub fn decorate(&self, document: &Document, block: &Block) -> Vec<Decoration> {
        let mut decorations: Vec<Decoration> = self
            .decorators
            .iter()
            .flat_map(|decorator| decorator.decorate(document, block))
            .collect();
        decorations.sort_by_key(|d| (d.start, d.end));
        decorations
    }
}

impl Default for DecoratorSet {
    fn default() -> Self {
        Self::new([Decorator::SyntaxHighlight, Decorator::Link])
    }
}

/// One run of text with a uniform combination of styles and overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub styles: BTreeSet<InlineStyle>,
    pub token: Option<TokenClass>,
    pub link: Option<String>,
}

/// Splits `block` into maximal segments carrying its inline styles plus
/// every decoration that covers them. Later decorations win when two of the
/// same kind overlap.
pub fn overlay(block: &Block, decorations: &[Decoration]) -> Vec<Segment> {
    let len = block.char_len();
    let mut styles: Vec<BTreeSet<InlineStyle>> = vec![BTreeSet::new(); len];
    let mut tokens: Vec<Option<TokenClass>> = vec![None; len];
    let mut links: Vec<Option<&str>> = vec![None; len];

    for range in block.styles.iter() {
        for slot in styles.iter_mut().take(range.end.min(len)).skip(range.start) {
            slot.insert(range.value);
        }
    }
    for decoration in decorations {
        let end = decoration.end.min(len);
        for position in decoration.start.min(end)..end {
            match &decoration.kind {
                DecorationKind::Token(class) => tokens[position] = Some(*class),
                DecorationKind::Link { url, .. } => links[position] = Some(url.as_str()),
            }
        }
    }

    let mut segments: Vec<Segment> = Vec::new();
    for position in 0..len {
        if let Some(last) = segments.last_mut()
            && last.styles == styles[position]
            && last.token == tokens[position]
            && last.link.as_deref() == links[position]
        {
            last.end = position + 1;
            continue;
        }
        segments.push(Segment {
            start: position,
            end: position + 1,
            styles: styles[position].clone(),
            token: tokens[position],
            link: links[position].map(str::to_string),
        });
    }
    segments
}
