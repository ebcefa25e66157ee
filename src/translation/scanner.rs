use std::ops::Range;

/// Lexical context of the byte under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Context {
    Code,
    /// Inside a `'...'` literal or `"..."` identifier; holds the quote byte.
    Quoted(u8),
    LineComment,
    /// Block comments nest, so the depth is tracked.
    BlockComment(u32),
    /// Inside `$tag$ ... $tag$`.
    DollarQuoted(String),
}

/// A piece of SQL as seen by placeholder translation. Spans are byte ranges into the
/// scanned text and always fall on char boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token<'a> {
    /// Text to copy through unchanged.
    Text(Range<usize>),
    /// A `?` marker in code, with its explicit number if one follows it.
    Marker {
        span: Range<usize>,
        number: Option<&'a str>,
    },
    /// A literal `%`, only reported when percent escaping was requested.
    Percent(usize),
}

impl Token<'_> {
    pub(super) fn span(&self) -> Range<usize> {
        match self {
            Token::Text(span) | Token::Marker { span, .. } => span.clone(),
            Token::Percent(at) => *at..*at + 1,
        }
    }
}

/// Splits SQL into [`Token`]s, tracking quotes, nested comments and dollar quotes
/// so markers inside them are left alone.
pub(super) struct Scanner<'a> {
    sql: &'a str,
    pos: usize,
    context: Context,
    report_percent: bool,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(sql: &'a str, report_percent: bool) -> Self {
        Self {
            sql,
            pos: 0,
            context: Context::Code,
            report_percent,
        }
    }

    fn is_marker(&self, b: u8) -> bool {
        b == b'?' && self.context == Context::Code
    }

    fn marker(&mut self) -> Token<'a> {
        let bytes = self.sql.as_bytes();
        let start = self.pos;
        let digits_end = bytes[start + 1..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map_or(bytes.len(), |n| start + 1 + n);
        self.pos = digits_end;
        let number = (digits_end > start + 1).then(|| &self.sql[start + 1..digits_end]);
        Token::Marker {
            span: start..digits_end,
            number,
        }
    }

    /// Consume the construct at the cursor, updating the context. Returns how many
    /// bytes it covered.
    fn advance(&mut self) -> usize {
        let bytes = self.sql.as_bytes();
        let idx = self.pos;
        let at = |offset: usize| bytes.get(idx + offset).copied();
        let width = match &self.context {
            Context::Code => match bytes[idx] {
                quote @ (b'\'' | b'"') => {
                    self.context = Context::Quoted(quote);
                    1
                }
                b'-' if at(1) == Some(b'-') => {
                    self.context = Context::LineComment;
                    2
                }
                b'/' if at(1) == Some(b'*') => {
                    self.context = Context::BlockComment(1);
                    2
                }
                b'$' => match dollar_tag(bytes, idx) {
                    Some(tag) => {
                        let width = tag.len() + 2;
                        self.context = Context::DollarQuoted(tag);
                        width
                    }
                    None => 1,
                },
                _ => 1,
            },
            Context::Quoted(quote) => {
                let quote = *quote;
                if bytes[idx] != quote {
                    1
                } else if at(1) == Some(quote) {
                    2
                } else {
                    self.context = Context::Code;
                    1
                }
            }
            Context::LineComment => {
                if bytes[idx] == b'\n' {
                    self.context = Context::Code;
                }
                1
            }
            Context::BlockComment(depth) => {
                let depth = *depth;
                match (bytes[idx], at(1)) {
                    (b'/', Some(b'*')) => {
                        self.context = Context::BlockComment(depth + 1);
                        2
                    }
                    (b'*', Some(b'/')) => {
                        self.context = if depth == 1 {
                            Context::Code
                        } else {
                            Context::BlockComment(depth - 1)
                        };
                        2
                    }
                    _ => 1,
                }
            }
            Context::DollarQuoted(tag) => {
                let closing = tag.len() + 2;
                if bytes[idx] == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    self.context = Context::Code;
                    closing
                } else {
                    1
                }
            }
        };
        self.pos += width;
        width
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.sql.as_bytes();
        let start = self.pos;
        let &first = bytes.get(start)?;
        if self.is_marker(first) {
            return Some(self.marker());
        }
        if self.report_percent && first == b'%' {
            self.pos += 1;
            return Some(Token::Percent(start));
        }
        while let Some(&b) = bytes.get(self.pos) {
            if self.pos > start && (self.is_marker(b) || (self.report_percent && b == b'%')) {
                break;
            }
            self.advance();
        }
        Some(Token::Text(start..self.pos))
    }
}

/// `$tag$` (or `$$`) starting at `start`.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<String> {
    let len = bytes[start + 1..]
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))?;
    if bytes[start + 1 + len] != b'$' {
        return None;
    }
    String::from_utf8(bytes[start + 1..start + 1 + len].to_vec()).ok()
}

fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}
