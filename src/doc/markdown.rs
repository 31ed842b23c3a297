//! Markdown codec for [`Document`].
//!
//! Supported subset: optional `---` front matter, `#`..`###` headers,
//! `-`/`*`/`+` and `1.` list items (two spaces per nesting level), fenced
//! code blocks whose info string is the block's language tag, and inline
//! `**bold**`, `*italic*` (or `_italic_`) and `[text](url)` links. Anything
//! else degrades to paragraph text; parsing never fails.

use super::{Block, BlockKind, Document, Entity, EntityMap, MAX_LIST_DEPTH};
use crate::core::{EntityId, InlineStyle, RangeSet, render_spans};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquivalenceMode {
    Exact,
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeConfig {
    pub equivalence: EquivalenceMode,
    pub prefer_raw_source: bool,
}

impl SerializeConfig {
    pub fn exact() -> Self {
        Self {
            equivalence: EquivalenceMode::Exact,
            prefer_raw_source: true,
        }
    }

    pub fn structural() -> Self {
        Self {
            equivalence: EquivalenceMode::Structural,
            prefer_raw_source: false,
        }
    }
}

impl Default for SerializeConfig {
    fn default() -> Self {
        Self::exact()
    }
}

impl Document {
    pub fn serialize(&self, mode: EquivalenceMode) -> String {
        let config = SerializeConfig {
            equivalence: mode,
            prefer_raw_source: true,
        };
        self.serialize_with_config(&config)
    }

    pub fn serialize_with_config(&self, config: &SerializeConfig) -> String {
        if let EquivalenceMode::Exact = config.equivalence
            && config.prefer_raw_source
            && let Some(raw) = self.raw_source()
        {
            return raw.to_string();
        }

        let mut output = String::new();
        if let Some(frontmatter) = &self.frontmatter {
            output.push_str("---\n");
            output.push_str(frontmatter);
            output.push_str("\n---\n\n");
        }

        let structural = config.equivalence == EquivalenceMode::Structural;
        let mut ordinals: Vec<usize> = Vec::new();
        let mut previous: Option<BlockKind> = None;
        for block in self.blocks() {
            if !block.kind.is_list_item() {
                ordinals.clear();
            }
            let mut text = self.serialize_block(block, &mut ordinals);
            // Fence contents are user code and always go out verbatim.
            if structural && block.kind != BlockKind::CodeBlock {
                text = normalize_structural(&text);
                if text.is_empty() {
                    continue;
                }
            }
            if let Some(previous) = previous {
                if previous.is_list_item() && block.kind.is_list_item() {
                    output.push('\n');
                } else {
                    output.push_str("\n\n");
                }
            }
            output.push_str(&text);
            previous = Some(block.kind);
        }

        if structural {
            output.truncate(output.trim_end_matches('\n').len());
        }
        output
    }

    fn serialize_block(&self, block: &Block, ordinals: &mut Vec<usize>) -> String {
        match block.kind {
            BlockKind::Unstyled => {
                let inline = self.serialize_inline(block);
                inline
                    .split('\n')
                    .map(escape_line_start)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            BlockKind::HeaderOne => format!("# {}", self.serialize_inline(block)),
            BlockKind::HeaderTwo => format!("## {}", self.serialize_inline(block)),
            BlockKind::HeaderThree => format!("### {}", self.serialize_inline(block)),
            BlockKind::UnorderedListItem | BlockKind::OrderedListItem => {
                let depth = usize::from(block.depth);
                ordinals.resize(depth + 1, 0);
                let marker = if block.kind == BlockKind::OrderedListItem {
                    ordinals[depth] += 1;
                    format!("{}.", ordinals[depth])
                } else {
                    ordinals[depth] = 0;
                    "-".to_string()
                };
                format!(
                    "{}{} {}",
                    "  ".repeat(depth),
                    marker,
                    self.serialize_inline(block)
                )
            }
            BlockKind::CodeBlock => {
                let fence = "`".repeat(fence_len(&block.text));
                let mut output = fence.clone();
                if let Some(language) = block.language() {
                    output.push_str(language);
                }
                output.push('\n');
                output.push_str(&block.text);
                output.push('\n');
                output.push_str(&fence);
                output
            }
        }
    }

    fn serialize_inline(&self, block: &Block) -> String {
        let chars: Vec<char> = block.text.chars().collect();
        let mut links = RangeSet::new();
        for range in block.entities.iter() {
            if let Some(Entity::Link { .. }) = self.entities().get(range.value) {
                links.insert(range.value, range.start, range.end);
            }
        }

        let mut output = String::with_capacity(block.text.len());
        let mut open: Vec<Marker> = Vec::new();
        for span in render_spans(chars.len(), &block.styles, &links) {
            let mut wanted = Vec::with_capacity(3);
            if let Some(entity) = span.entity {
                wanted.push(Marker::Link(entity));
            }
            if span.styles.contains(&InlineStyle::Bold) {
                wanted.push(Marker::Bold);
            }
            if span.styles.contains(&InlineStyle::Italic) {
                wanted.push(Marker::Italic);
            }

            // Markers pair per kind, not by nesting, so only markers that end
            // here are closed. Nothing is closed and reopened at one offset.
            for index in (0..open.len()).rev() {
                if !wanted.contains(&open[index]) {
                    let marker = open.remove(index);
                    self.close_marker(marker, &mut output);
                }
            }
            for marker in wanted {
                if !open.contains(&marker) {
                    output.push_str(marker.opener());
                    open.push(marker);
                }
            }
            for ch in &chars[span.start..span.end] {
                push_escaped(&mut output, *ch);
            }
        }
        while let Some(marker) = open.pop() {
            self.close_marker(marker, &mut output);
        }
        output
    }

    fn close_marker(&self, marker: Marker, output: &mut String) {
        match marker {
            Marker::Link(entity) => {
                output.push_str("](");
                let url = self
                    .entities()
                    .get(entity)
                    .and_then(Entity::url)
                    .unwrap_or_default();
                for ch in url.chars() {
                    if matches!(ch, '\\' | ')') {
                        output.push('\\');
                    }
                    output.push(ch);
                }
                output.push(')');
            }
            Marker::Bold => output.push_str("**"),
            Marker::Italic => output.push('*'),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Link(EntityId),
    Bold,
    Italic,
}

impl Marker {
    fn opener(self) -> &'static str {
        match self {
            Marker::Link(_) => "[",
            Marker::Bold => "**",
            Marker::Italic => "*",
        }
    }
}

fn push_escaped(output: &mut String, ch: char) {
    if matches!(ch, '\\' | '*' | '_' | '[' | ']') {
        output.push('\\');
    }
    output.push(ch);
}

/// Escapes a paragraph line whose first non-blank char would otherwise
/// start a header, list item, quote, or fence.
fn escape_line_start(line: &str) -> String {
    let indent = line.len() - line.trim_start().len();
    let (lead, rest) = line.split_at(indent);
    let Some(first) = rest.chars().next() else {
        return line.to_string();
    };
    if matches!(first, '#' | '>' | '-' | '+' | '`') {
        return format!("{lead}\\{rest}");
    }
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && rest[digits..].starts_with('.') {
        return format!("{lead}{}\\{}", &rest[..digits], &rest[digits..]);
    }
    line.to_string()
}

fn fence_len(text: &str) -> usize {
    let longest = text
        .lines()
        .map(|line| line.trim().chars().take_while(|ch| *ch == '`').count())
        .max()
        .unwrap_or(0);
    (longest + 1).max(3)
}

pub struct Parser;

impl Parser {
    pub fn parse(text: &str) -> Document {
        let lines: Vec<&str> = text.lines().collect();
        let mut frontmatter = None;
        let mut start_index = 0;

        if lines
            .first()
            .map(|line| line.trim() == "---")
            .unwrap_or(false)
        {
            let mut fm_lines: Vec<&str> = Vec::new();
            let mut index = 1;
            while index < lines.len() {
                if lines[index].trim() == "---" {
                    frontmatter = Some(fm_lines.join("\n"));
                    start_index = index + 1;
                    break;
                }
                fm_lines.push(lines[index]);
                index += 1;
            }
        }

        let mut entities = EntityMap::new();
        let mut blocks = Vec::new();
        parse_blocks(&lines[start_index..], &mut entities, &mut blocks);

        let mut doc = Document::new();
        doc.frontmatter = frontmatter;
        doc.entities = entities;
        doc.blocks = blocks;
        doc.set_raw_source(text.to_string());
        doc
    }
}

fn parse_blocks(lines: &[&str], entities: &mut EntityMap, out: &mut Vec<Block>) {
    let mut index = 0;
    while index < lines.len() {
        let line = lines[index];
        let trimmed = line.trim();
        if trimmed.is_empty() {
            index += 1;
            continue;
        }

        if let Some((fence, info)) = fence_open(trimmed) {
            let mut contents: Vec<&str> = Vec::new();
            let mut end_index = index + 1;
            while end_index < lines.len() {
                if is_fence_close(lines[end_index].trim(), fence) {
                    break;
                }
                contents.push(lines[end_index]);
                end_index += 1;
            }
            let language = if info.is_empty() { None } else { Some(info) };
            out.push(Block::code(language, contents.join("\n")));
            index = (end_index + 1).min(lines.len());
            continue;
        }

        if let Some((kind, rest)) = header(line) {
            out.push(inline_block(kind, rest, entities));
            index += 1;
            continue;
        }

        if let Some((kind, depth, rest)) = list_item(line) {
            out.push(inline_block(kind, rest, entities).with_depth(depth));
            index += 1;
            continue;
        }

        let mut paragraph_lines: Vec<&str> = Vec::new();
        let mut end_index = index;
        while end_index < lines.len() {
            let current = lines[end_index];
            let current_trimmed = current.trim();
            if current_trimmed.is_empty()
                || fence_open(current_trimmed).is_some()
                || header(current).is_some()
                || list_item(current).is_some()
            {
                break;
            }
            paragraph_lines.push(current);
            end_index += 1;
        }
        out.push(inline_block(
            BlockKind::Unstyled,
            &paragraph_lines.join("\n"),
            entities,
        ));
        index = end_index;
    }
}

fn inline_block(kind: BlockKind, source: &str, entities: &mut EntityMap) -> Block {
    let (text, styles, links) = parse_inline(source, entities);
    let mut block = Block::new(kind, text);
    block.styles = styles;
    block.entities = links;
    block
}

fn fence_open(trimmed: &str) -> Option<(usize, &str)> {
    let ticks = trimmed.chars().take_while(|ch| *ch == '`').count();
    if ticks < 3 {
        return None;
    }
    let info = trimmed[ticks..].trim();
    if info.contains('`') {
        return None;
    }
    Some((ticks, info))
}

fn is_fence_close(trimmed: &str, fence: usize) -> bool {
    trimmed.len() >= fence && trimmed.chars().all(|ch| ch == '`')
}

fn header(line: &str) -> Option<(BlockKind, &str)> {
    let hashes = line.chars().take_while(|ch| *ch == '#').count();
    let kind = match hashes {
        1 => BlockKind::HeaderOne,
        2 => BlockKind::HeaderTwo,
        3 => BlockKind::HeaderThree,
        _ => return None,
    };
    let rest = &line[hashes..];
    if rest.is_empty() {
        return Some((kind, rest));
    }
    rest.strip_prefix(' ').map(|text| (kind, text))
}

fn list_item(line: &str) -> Option<(BlockKind, u8, &str)> {
    let body = line.trim_start_matches(' ');
    let indent = line.len() - body.len();
    let depth = u8::try_from(indent / 2)
        .unwrap_or(MAX_LIST_DEPTH)
        .min(MAX_LIST_DEPTH);

    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = body.strip_prefix(bullet) {
            return Some((BlockKind::UnorderedListItem, depth, rest));
        }
    }
    if body == "-" {
        return Some((BlockKind::UnorderedListItem, depth, ""));
    }

    let digits = body.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after = &body[digits..];
    if after == "." {
        return Some((BlockKind::OrderedListItem, depth, ""));
    }
    after
        .strip_prefix(". ")
        .map(|rest| (BlockKind::OrderedListItem, depth, rest))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(char),
    Delim { style: InlineStyle, raw: &'static str },
    LinkOpen,
    LinkClose { url: String, raw: String },
}

fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut index = 0;
    while index < chars.len() {
        let ch = chars[index];
        let next = chars.get(index + 1).copied();
        match ch {
            '\\' if next.is_some_and(|n| n.is_ascii_punctuation()) => {
                tokens.push(Token::Text(next.unwrap_or(ch)));
                index += 2;
            }
            '*' | '_' => {
                let double = next == Some(ch);
                let width = if double { 2 } else { 1 };
                let before = index.checked_sub(1).map(|i| chars[i]);
                let after = chars.get(index + width).copied();
                let intraword = ch == '_'
                    && before.is_some_and(char::is_alphanumeric)
                    && after.is_some_and(char::is_alphanumeric);
                if intraword {
                    for _ in 0..width {
                        tokens.push(Token::Text(ch));
                    }
                } else {
                    let (style, raw) = match (ch, double) {
                        ('*', true) => (InlineStyle::Bold, "**"),
                        ('_', true) => (InlineStyle::Bold, "__"),
                        ('*', false) => (InlineStyle::Italic, "*"),
                        _ => (InlineStyle::Italic, "_"),
                    };
                    tokens.push(Token::Delim { style, raw });
                }
                index += width;
            }
            '[' => {
                tokens.push(Token::LinkOpen);
                index += 1;
            }
            ']' if next == Some('(') => match scan_url(&chars, index + 2) {
                Some((url, end)) => {
                    let raw: String = chars[index..end].iter().collect();
                    tokens.push(Token::LinkClose { url, raw });
                    index = end;
                }
                None => {
                    tokens.push(Token::Text(ch));
                    index += 1;
                }
            },
            _ => {
                tokens.push(Token::Text(ch));
                index += 1;
            }
        }
    }
    tokens
}

/// Reads a link destination starting at `start`, returning the unescaped
/// url and the index just past the closing paren.
fn scan_url(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut url = String::new();
    let mut index = start;
    while index < chars.len() {
        match chars[index] {
            '\\' if index + 1 < chars.len() => {
                url.push(chars[index + 1]);
                index += 2;
            }
            ')' => return Some((url, index + 1)),
            '\n' => return None,
            ch => {
                url.push(ch);
                index += 1;
            }
        }
    }
    None
}

/// Marks which delimiter and link tokens have a partner. Delimiters pair in
/// order within their own raw form; links pair innermost first.
fn match_tokens(tokens: &[Token]) -> Vec<bool> {
    let mut matched = vec![false; tokens.len()];
    let mut pending_delims: Vec<(&'static str, usize)> = Vec::new();
    let mut open_links: Vec<usize> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Delim { raw, .. } => {
                if let Some(pos) = pending_delims.iter().position(|(r, _)| r == raw) {
                    let (_, opener) = pending_delims.remove(pos);
                    matched[opener] = true;
                    matched[index] = true;
                } else {
                    pending_delims.push((raw, index));
                }
            }
            Token::LinkOpen => open_links.push(index),
            Token::LinkClose { .. } => {
                if let Some(opener) = open_links.pop() {
                    matched[opener] = true;
                    matched[index] = true;
                }
            }
            Token::Text(_) => {}
        }
    }
    matched
}

fn parse_inline(
    source: &str,
    entities: &mut EntityMap,
) -> (String, RangeSet<InlineStyle>, RangeSet<EntityId>) {
    let tokens = tokenize(source);
    let matched = match_tokens(&tokens);

    let mut text = String::with_capacity(source.len());
    let mut styles = RangeSet::new();
    let mut links = RangeSet::new();
    let mut position = 0usize;
    let mut open_delims: Vec<(&'static str, usize)> = Vec::new();
    let mut open_links: Vec<usize> = Vec::new();

    for (token, is_matched) in tokens.into_iter().zip(matched) {
        match token {
            Token::Text(ch) => {
                text.push(ch);
                position += 1;
            }
            Token::Delim { raw, .. } if !is_matched => {
                text.push_str(raw);
                position += raw.len();
            }
            Token::Delim { style, raw } => {
                if let Some(pos) = open_delims.iter().position(|(r, _)| *r == raw) {
                    let (_, start) = open_delims.remove(pos);
                    styles.insert(style, start, position);
                } else {
                    open_delims.push((raw, position));
                }
            }
            Token::LinkOpen if !is_matched => {
                text.push('[');
                position += 1;
            }
            Token::LinkOpen => open_links.push(position),
            Token::LinkClose { raw, .. } if !is_matched => {
                position += raw.chars().count();
                text.push_str(&raw);
            }
            Token::LinkClose { url, .. } => {
                let start = open_links.pop().unwrap_or(position);
                if start < position {
                    let id = entities.create(Entity::Link { url });
                    links.remove(None, start, position);
                    links.insert(id, start, position);
                }
            }
        }
    }
    (text, styles, links)
}

/// Trims trailing whitespace from each line of one rendered block and drops
/// blank lines, which the parser would read as a block break.
fn normalize_structural(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
