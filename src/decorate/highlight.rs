//! Table-driven lexical highlighter.
//!
//! Good enough for coloring a code block while typing: it recognizes
//! comments, strings, numbers, keywords, literals and shell variables, and
//! never looks further than the current token.

use super::{Decoration, DecorationKind};
use crate::detect::Language;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Keyword,
    String,
    Comment,
    Number,
    Literal,
    Variable,
}

struct Syntax {
    keywords: &'static [&'static str],
    literals: &'static [&'static str],
    line_comments: &'static [&'static str],
    block_comment: Option<(&'static str, &'static str)>,
    quotes: &'static [char],
    variables: bool,
}

const C_BLOCK: Option<(&str, &str)> = Some(("/*", "*/"));

static BASH: Syntax = Syntax {
    keywords: &[
        "if", "then", "else", "elif", "fi", "for", "while", "until", "do", "done", "case",
        "esac", "in", "function", "return", "local", "export", "set", "unset", "source",
    ],
    literals: &["true", "false"],
    line_comments: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    variables: true,
};

static PYTHON: Syntax = Syntax {
    keywords: &[
        "def", "class", "if", "elif", "else", "for", "while", "return", "import", "from", "as",
        "with", "try", "except", "finally", "raise", "lambda", "pass", "break", "continue",
        "in", "not", "and", "or", "is", "yield", "async", "await", "global",
    ],
    literals: &["True", "False", "None"],
    line_comments: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    variables: false,
};

static JAVASCRIPT: Syntax = Syntax {
    keywords: &[
        "const", "let", "var", "function", "return", "if", "else", "for", "while", "do",
        "switch", "case", "break", "continue", "new", "class", "extends", "import", "export",
        "from", "default", "try", "catch", "finally", "throw", "typeof", "instanceof", "async",
        "await", "of", "in",
    ],
    literals: &["true", "false", "null", "undefined", "this"],
    line_comments: &["//"],
    block_comment: C_BLOCK,
    quotes: &['"', '\'', '`'],
    variables: false,
};

static TYPESCRIPT: Syntax = Syntax {
    keywords: &[
        "const", "let", "var", "function", "return", "if", "else", "for", "while", "do",
        "switch", "case", "break", "continue", "new", "class", "extends", "import", "export",
        "from", "default", "try", "catch", "finally", "throw", "typeof", "instanceof", "async",
        "await", "of", "in", "interface", "type", "enum", "implements", "readonly", "as",
    ],
    literals: &["true", "false", "null", "undefined", "this"],
    line_comments: &["//"],
    block_comment: C_BLOCK,
    quotes: &['"', '\'', '`'],
    variables: false,
};

static GO: Syntax = Syntax {
    keywords: &[
        "func", "package", "import", "var", "const", "type", "struct", "interface", "map",
        "chan", "go", "defer", "return", "if", "else", "for", "range", "switch", "case",
        "default", "select", "break", "continue",
    ],
    literals: &["true", "false", "nil", "iota"],
    line_comments: &["//"],
    block_comment: C_BLOCK,
    quotes: &['"', '`', '\''],
    variables: false,
};

static RUST: Syntax = Syntax {
    keywords: &[
        "fn", "let", "mut", "pub", "struct", "enum", "impl", "trait", "use", "mod", "match",
        "if", "else", "for", "while", "loop", "return", "async", "await", "move", "where",
        "crate", "self", "Self", "super", "const", "static", "type", "dyn", "ref", "unsafe",
        "in", "as",
    ],
    literals: &["true", "false", "None", "Some", "Ok", "Err"],
    line_comments: &["//"],
    block_comment: C_BLOCK,
    quotes: &['"'],
    variables: false,
};

static JAVA: Syntax = Syntax {
    keywords: &[
        "class", "public", "private", "protected", "static", "final", "void", "new", "return",
        "if", "else", "for", "while", "switch", "case", "break", "continue", "import",
        "package", "extends", "implements", "interface", "try", "catch", "finally", "throw",
        "throws", "int", "long", "boolean",
    ],
    literals: &["true", "false", "null", "this"],
    line_comments: &["//"],
    block_comment: C_BLOCK,
    quotes: &['"', '\''],
    variables: false,
};

static JSON: Syntax = Syntax {
    keywords: &[],
    literals: &["true", "false", "null"],
    line_comments: &[],
    block_comment: None,
    quotes: &['"'],
    variables: false,
};

static YAML: Syntax = Syntax {
    keywords: &[],
    literals: &["true", "false", "null", "yes", "no", "on", "off"],
    line_comments: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    variables: false,
};

static DOCKERFILE: Syntax = Syntax {
    keywords: &[
        "FROM", "RUN", "CMD", "COPY", "ADD", "ENV", "WORKDIR", "EXPOSE", "ENTRYPOINT", "ARG",
        "LABEL", "USER", "VOLUME", "AS",
    ],
    literals: &[],
    line_comments: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    variables: true,
};

fn syntax(language: Language) -> Option<&'static Syntax> {
    match language {
        Language::Bash => Some(&BASH),
        Language::Python => Some(&PYTHON),
        Language::JavaScript => Some(&JAVASCRIPT),
        Language::TypeScript => Some(&TYPESCRIPT),
        Language::Go => Some(&GO),
        Language::Rust => Some(&RUST),
        Language::Java => Some(&JAVA),
        Language::Json => Some(&JSON),
        Language::Yaml => Some(&YAML),
        Language::Dockerfile => Some(&DOCKERFILE),
        Language::Markdown => None,
    }
}

fn is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn starts_with(chars: &[char], at: usize, pattern: &str) -> bool {
    let mut index = at;
    for expected in pattern.chars() {
        if chars.get(index) != Some(&expected) {
            return false;
        }
        index += 1;
    }
    true
}

/// Token ranges for `text`, in char offsets. Languages without a table
/// produce nothing.
pub fn highlight(text: &str, language: Language) -> Vec<Decoration> {
    let Some(syntax) = syntax(language) else {
        return Vec::new();
    };
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    let mut push = |class: TokenClass, start: usize, end: usize| {
        if start < end {
            tokens.push(Decoration {
                start,
                end,
                kind: DecorationKind::Token(class),
            });
        }
    };

    while index < chars.len() {
        let ch = chars[index];
        let at_boundary = index == 0 || chars[index - 1].is_whitespace();

        if let Some(marker) = syntax
            .line_comments
            .iter()
            .find(|marker| starts_with(&chars, index, marker))
            && (*marker != "#" || at_boundary)
        {
            let end = chars[index..]
                .iter()
                .position(|c| *c == '\n')
                .map_or(chars.len(), |offset| index + offset);
            push(TokenClass::Comment, index, end);
            index = end;
            continue;
        }

        if let Some((open, close)) = syntax.block_comment
            && starts_with(&chars, index, open)
        {
            let mut end = index + open.chars().count();
            while end < chars.len() && !starts_with(&chars, end, close) {
                end += 1;
            }
            end = (end + close.chars().count()).min(chars.len());
            push(TokenClass::Comment, index, end);
            index = end;
            continue;
        }

        if syntax.quotes.contains(&ch) {
            let mut end = index + 1;
            while end < chars.len() {
                match chars[end] {
                    '\\' => end += 2,
                    '\n' if ch != '`' => break,
                    c if c == ch => {
                        end += 1;
                        break;
                    }
                    _ => end += 1,
                }
            }
            let end = end.min(chars.len());
            push(TokenClass::String, index, end);
            index = end;
            continue;
        }

        if syntax.variables && ch == '$' {
            let mut end = index + 1;
            if chars.get(end) == Some(&'{') {
                while end < chars.len() && chars[end] != '}' && chars[end] != '\n' {
                    end += 1;
                }
                if chars.get(end) == Some(&'}') {
                    end += 1;
                }
            } else {
                while end < chars.len() && is_word(chars[end]) {
                    end += 1;
                }
            }
            if end > index + 1 {
                push(TokenClass::Variable, index, end);
            }
            index = end.max(index + 1);
            continue;
        }

        let after_word = index > 0 && is_word(chars[index - 1]);
        if ch.is_ascii_digit() && !after_word {
            let mut end = index + 1;
            while end < chars.len()
                && (chars[end].is_ascii_alphanumeric() || chars[end] == '_' || chars[end] == '.')
            {
                end += 1;
            }
            push(TokenClass::Number, index, end);
            index = end;
            continue;
        }

        if is_word(ch) && !after_word {
            let mut end = index + 1;
            while end < chars.len() && is_word(chars[end]) {
                end += 1;
            }
            let word: String = chars[index..end].iter().collect();
            if syntax.keywords.contains(&word.as_str()) {
                push(TokenClass::Keyword, index, end);
            } else if syntax.literals.contains(&word.as_str()) {
                push(TokenClass::Literal, index, end);
            }
            index = end;
            continue;
        }

        index += 1;
    }
    tokens
}
