use md_playground::{
    Block, BlockKind, DecorationKind, EditError, EditorState, EquivalenceMode, IndentDirection,
    InlineStyle, Parser, Position, Selection,
};
use std::collections::BTreeSet;

fn open(markdown: &str) -> EditorState {
    EditorState::new(Parser::parse(markdown))
}

fn caret(state: &EditorState, block: usize, offset: usize) -> EditorState {
    let id = state.document().blocks()[block].id;
    state
        .with_selection(Selection::collapsed(Position::new(id, offset)))
        .unwrap()
}

fn select(state: &EditorState, from: (usize, usize), to: (usize, usize)) -> EditorState {
    let blocks = state.document().blocks();
    let anchor = Position::new(blocks[from.0].id, from.1);
    let focus = Position::new(blocks[to.0].id, to.1);
    state.with_selection(Selection::new(anchor, focus)).unwrap()
}

fn markdown(state: &EditorState) -> String {
    state.document().serialize(EquivalenceMode::Structural)
}

fn kinds(state: &EditorState) -> Vec<BlockKind> {
    state.document().blocks().iter().map(|block| block.kind).collect()
}

#[test]
fn bold_selection_then_unbold() {
    let state = select(&open("hello world"), (0, 0), (0, 5));
    let bold = state.toggle_inline_style(InlineStyle::Bold).unwrap();
    assert_eq!(markdown(&bold), "**hello** world");

    let plain = bold.toggle_inline_style(InlineStyle::Bold).unwrap();
    assert_eq!(markdown(&plain), "hello world");
}

#[test]
fn pending_style_applies_to_typed_text() {
    let state = caret(&open("hello world"), 0, 11);
    let state = state.toggle_inline_style(InlineStyle::Italic).unwrap();
    assert_eq!(
        state.current_inline_style(),
        BTreeSet::from([InlineStyle::Italic])
    );

    let state = state.insert_text("!").unwrap();
    assert_eq!(markdown(&state), "hello world*!*");
    assert_eq!(
        state.current_inline_style(),
        BTreeSet::from([InlineStyle::Italic])
    );
}

#[test]
fn typed_text_inherits_preceding_style() {
    let state = caret(&open("**bold** plain"), 0, 4);
    let state = state.insert_text("er").unwrap();
    assert_eq!(markdown(&state), "**bolder** plain");
}

#[test]
fn split_header_then_merge_back() {
    let state = caret(&open("# Title"), 0, 3);
    let split = state.split_block().unwrap();
    assert_eq!(kinds(&split), vec![BlockKind::HeaderOne, BlockKind::Unstyled]);
    assert_eq!(markdown(&split), "# Tit\n\nle");

    let merged = split.delete_backward().unwrap();
    assert_eq!(kinds(&merged), vec![BlockKind::HeaderOne]);
    assert_eq!(markdown(&merged), "# Title");
    let focus = merged.selection().focus;
    assert_eq!(focus.offset, 3);
}

#[test]
fn backspace_at_header_start_reverts_to_paragraph() {
    let state = caret(&open("## Notes"), 0, 0);
    let state = state.delete_backward().unwrap();
    assert_eq!(kinds(&state), vec![BlockKind::Unstyled]);
    assert_eq!(markdown(&state), "Notes");
}

#[test]
fn backspace_at_document_start_is_noop() {
    let state = caret(&open("plain"), 0, 0);
    let next = state.delete_backward().unwrap();
    assert!(next.document().content_eq(state.document()));
}

#[test]
fn enter_on_empty_list_item_leaves_list() {
    let state = caret(&open("- first"), 0, 5);
    let state = state.split_block().unwrap();
    assert_eq!(
        kinds(&state),
        vec![BlockKind::UnorderedListItem, BlockKind::UnorderedListItem]
    );

    let state = state.split_block().unwrap();
    assert_eq!(
        kinds(&state),
        vec![BlockKind::UnorderedListItem, BlockKind::Unstyled]
    );
}

#[test]
fn enter_in_code_block_inserts_newline() {
    let state = caret(&open("```bash\necho a\n```"), 0, 6);
    let state = state.split_block().unwrap();
    let state = state.insert_text("echo b").unwrap();
    assert_eq!(state.document().blocks().len(), 1);
    assert_eq!(markdown(&state), "```bash\necho a\necho b\n```");
}

#[test]
fn code_newline_outside_code_is_noop() {
    let state = caret(&open("text"), 0, 2);
    let next = state.insert_newline_in_code_block().unwrap();
    assert_eq!(markdown(&next), "text");
}

#[test]
fn indent_only_affects_list_items() {
    let state = caret(&open("- a\n- b"), 1, 1);
    let deeper = state.change_indent(IndentDirection::Increase).unwrap();
    assert_eq!(markdown(&deeper), "- a\n  - b");

    let back = deeper
        .change_indent(IndentDirection::Decrease)
        .unwrap()
        .change_indent(IndentDirection::Decrease)
        .unwrap();
    assert_eq!(markdown(&back), "- a\n- b");

    let paragraph = caret(&open("plain"), 0, 0);
    let same = paragraph.change_indent(IndentDirection::Increase).unwrap();
    assert_eq!(same.document().blocks()[0].depth, 0);
}

#[test]
fn indent_stops_at_max_depth() {
    let mut state = caret(&open("- a"), 0, 0);
    for _ in 0..10 {
        state = state.change_indent(IndentDirection::Increase).unwrap();
    }
    assert_eq!(state.document().blocks()[0].depth, 4);
}

#[test]
fn toggle_list_across_blocks() {
    let state = select(&open("one\n\ntwo"), (0, 1), (1, 1));
    let listed = state.toggle_block_type(BlockKind::OrderedListItem).unwrap();
    assert_eq!(markdown(&listed), "1. one\n2. two");

    let unlisted = listed.toggle_block_type(BlockKind::OrderedListItem).unwrap();
    assert_eq!(markdown(&unlisted), "one\n\ntwo");
}

#[test]
fn add_and_remove_link() {
    let state = select(&open("read the docs"), (0, 9), (0, 13));
    let linked = state.add_link("https://docs.rs").unwrap();
    assert_eq!(markdown(&linked), "read the [docs](https://docs.rs)");

    let id = linked.document().blocks()[0].id;
    let links: Vec<_> = linked
        .decorations(id)
        .into_iter()
        .filter_map(|decoration| match decoration.kind {
            DecorationKind::Link { url, .. } => Some((decoration.start, decoration.end, url)),
            DecorationKind::Token(_) => None,
        })
        .collect();
    assert_eq!(links, vec![(9, 13, "https://docs.rs".to_string())]);

    let unlinked = linked.remove_link().unwrap();
    assert_eq!(markdown(&unlinked), "read the docs");
}

#[test]
fn relinking_replaces_previous_target() {
    let state = select(&open("[docs](https://a.io)"), (0, 0), (0, 4));
    let state = state.add_link("https://b.io").unwrap();
    assert_eq!(markdown(&state), "[docs](https://b.io)");
}

#[test]
fn empty_url_or_collapsed_selection_adds_no_link() {
    let state = select(&open("text"), (0, 0), (0, 4));
    assert_eq!(markdown(&state.add_link("").unwrap()), "text");

    let collapsed = caret(&open("text"), 0, 2);
    assert_eq!(markdown(&collapsed.add_link("https://a.io").unwrap()), "text");
}

#[test]
fn delete_selection_across_blocks() {
    let state = select(&open("one\n\ntwo\n\nthree"), (0, 1), (2, 2));
    let state = state.delete_backward().unwrap();
    assert_eq!(state.document().blocks().len(), 1);
    assert_eq!(markdown(&state), "oree");
}

#[test]
fn backward_selection_is_normalized() {
    let state = select(&open("hello world"), (0, 5), (0, 0));
    let state = state.insert_text("bye").unwrap();
    assert_eq!(markdown(&state), "bye world");
}

#[test]
fn backspace_removes_whole_grapheme() {
    let state = caret(&open("cafe\u{301}"), 0, 5);
    let state = state.delete_backward().unwrap();
    assert_eq!(state.document().blocks()[0].text, "caf");
}

#[test]
fn insert_inside_grapheme_is_rejected() {
    let state = caret(&open("cafe\u{301}"), 0, 4);
    assert_eq!(
        state.insert_text("x").unwrap_err(),
        EditError::InvalidGraphemeBoundary
    );
}

#[test]
fn selection_on_unknown_block_is_rejected() {
    let state = open("text");
    let stranger = Block::new(BlockKind::Unstyled, "");
    let err = state
        .with_selection(Selection::collapsed(Position::new(stranger.id, 0)))
        .unwrap_err();
    assert_eq!(err, EditError::BlockNotFound);

    let past_end = state.document().blocks()[0].id;
    let err = state
        .with_selection(Selection::collapsed(Position::new(past_end, 99)))
        .unwrap_err();
    assert_eq!(err, EditError::InvalidOffset);
}

#[test]
fn language_can_be_set_and_cleared() {
    let state = caret(&open("```\nprint(1)\n```"), 0, 0);
    let tagged = state.set_language(Some("python")).unwrap();
    assert_eq!(markdown(&tagged), "```python\nprint(1)\n```");

    let cleared = tagged.set_language(None).unwrap();
    assert_eq!(markdown(&cleared), "```\nprint(1)\n```");
}

#[test]
fn snapshots_are_independent() {
    let before = caret(&open("abc"), 0, 3);
    let after = before.insert_text("d").unwrap();
    assert_eq!(before.document().blocks()[0].text, "abc");
    assert_eq!(after.document().blocks()[0].text, "abcd");
}

#[test]
fn pasted_line_breaks_survive_a_reload() {
    let state = caret(&open("hello world"), 0, 5);
    let pasted = state.insert_text("\n\nthere").unwrap();
    assert_eq!(pasted.document().blocks()[0].text, "hello \nthere world");

    let saved = pasted.document().serialize(EquivalenceMode::Exact);
    let reloaded = Parser::parse(&saved);
    assert_eq!(reloaded.blocks().len(), 1);
    assert!(reloaded.content_eq(pasted.document()));
}

#[test]
fn header_stays_one_line_after_paste() {
    let state = caret(&open("# Title"), 0, 0);
    let pasted = state.insert_text("x\ny").unwrap();
    assert_eq!(pasted.document().blocks()[0].text, "x yTitle");

    let reloaded = Parser::parse(&pasted.document().serialize(EquivalenceMode::Exact));
    assert_eq!(
        reloaded.blocks().iter().map(|block| block.kind).collect::<Vec<_>>(),
        vec![BlockKind::HeaderOne]
    );
    assert!(reloaded.content_eq(pasted.document()));
}

#[test]
fn code_turned_into_paragraph_keeps_one_block() {
    let state = open("```sh\necho a\n\n\necho b\n```");
    let paragraph = state.toggle_block_type(BlockKind::CodeBlock).unwrap();
    assert_eq!(kinds(&paragraph), vec![BlockKind::Unstyled]);
    assert_eq!(paragraph.document().blocks()[0].text, "echo a  \necho b");

    let reloaded = Parser::parse(&paragraph.document().serialize(EquivalenceMode::Exact));
    assert_eq!(reloaded.blocks().len(), 1);
    assert_eq!(reloaded.blocks()[0].text, "echo a  \necho b");
}
