use crate::span::Span;

mod literal;
pub use literal::{parse_number, LiteralError};

/// Marks the start of a comment running to the end of the line.
const COMMENT: char = '#';
/// Suffix of a label declaration.
const LABEL_SUFFIX: char = ':';

/// A single whitespace-delimited word of a source line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Field<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// A source line with its comment removed and its label, if any, split off.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Line<'a> {
    /// 1-based line number
    pub number: usize,
    /// Covers the non-comment part of the line
    pub span: Span,
    pub label: Option<Field<'a>>,
    pub fields: Vec<Field<'a>>,
}

impl Line<'_> {
    /// Line only declares a label and emits nothing.
    pub fn is_label_only(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Iterate over every line of `src` that carries a label or at least one field.
pub fn lines(src: &str) -> impl Iterator<Item = Line<'_>> + '_ {
    let mut offs = 0;
    src.split_inclusive('\n')
        .enumerate()
        .filter_map(move |(i, raw)| {
            let line_offs = offs;
            offs += raw.len();
            tokenize_line(raw, line_offs, i + 1)
        })
}

/// Split a single raw line. Returns `None` for blank or comment-only lines.
pub fn tokenize_line(raw: &str, line_offs: usize, number: usize) -> Option<Line<'_>> {
    let code = match raw.find(COMMENT) {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    let mut fields = split_fields(code, line_offs);
    if fields.is_empty() {
        return None;
    }

    let span = fields[0].span.join(fields[fields.len() - 1].span);
    let first = fields[0].text;
    let label = match first.strip_suffix(LABEL_SUFFIX) {
        Some(name) => {
            let field = fields.remove(0);
            Some(Field {
                text: name,
                span: Span::new(field.span.offs(), name.len()),
            })
        }
        None => None,
    };

    Some(Line {
        number,
        span,
        label,
        fields,
    })
}

fn split_fields(code: &str, line_offs: usize) -> Vec<Field<'_>> {
    let mut fields = Vec::new();
    let mut start = None;
    for (idx, c) in code.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(begin)) => {
                fields.push(field(code, begin, idx, line_offs));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => (),
        }
    }
    if let Some(begin) = start {
        fields.push(field(code, begin, code.len(), line_offs));
    }
    fields
}

fn field(code: &str, begin: usize, end: usize, line_offs: usize) -> Field<'_> {
    Field {
        text: &code[begin..end],
        span: Span::new(line_offs + begin, end - begin),
    }
}
