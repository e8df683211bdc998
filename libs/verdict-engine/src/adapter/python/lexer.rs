//! Indentation-aware tokenizer for Python source.
//!
//! Produces explicit `Newline`, `Indent` and `Dedent` tokens. Newlines inside
//! brackets and after a trailing backslash do not end a logical line, and
//! blank or comment-only lines never affect indentation.

use crate::adapter::lexer::decode_escape;
use crate::error::{AdapterError, AdapterResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    Name(String),
    Number(String),
    Str(String),
    /// Raw contents of an f-string, interpolations unparsed.
    FString(String),
    Op(String),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyToken {
    pub tok: Tok,
    pub line: usize,
}

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "!=", "==", "<=", ">=", "**", "//", "->", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "<<", ">>", ":=", "+", "-", "*", "/", "%", "<", ">", "=", "(",
    ")", "[", "]", "{", "}", ",", ":", ".", ";", "@", "&", "|", "^", "~",
];

const TAB_WIDTH: usize = 8;

pub fn tokenize(source: &str) -> AdapterResult<Vec<PyToken>> {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        indents: vec![0],
        brackets: 0,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    indents: Vec<usize>,
    brackets: usize,
    tokens: Vec<PyToken>,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn push(&mut self, tok: Tok, line: usize) {
        self.tokens.push(PyToken { tok, line });
    }

    fn run(mut self) -> AdapterResult<Vec<PyToken>> {
        let mut line_start = true;
        loop {
            if line_start {
                line_start = false;
                if !self.indentation()? {
                    break;
                }
            }
            let Some(c) = self.peek(0) else { break };
            let line = self.line;
            match c {
                '\n' => {
                    self.bump();
                    if self.brackets == 0 {
                        self.newline(line);
                        line_start = true;
                    }
                }
                ' ' | '\t' | '\r' | '\u{c}' => {
                    self.bump();
                }
                '#' => self.skip_comment(),
                '\\' if matches!(self.peek(1), Some('\n')) => {
                    self.bump();
                    self.bump();
                }
                '\\' if self.peek(1) == Some('\r') && self.peek(2) == Some('\n') => {
                    self.pos += 2;
                    self.bump();
                }
                c if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) => {
                    let text = self.number(line)?;
                    self.push(Tok::Number(text), line);
                }
                c if c.is_alphabetic() || c == '_' => {
                    if let Some(prefix) = self.string_prefix() {
                        let tok = self.string(prefix, line)?;
                        self.push(tok, line);
                    } else {
                        let name = self.name();
                        self.push(Tok::Name(name), line);
                    }
                }
                '"' | '\'' => {
                    let tok = self.string(String::new(), line)?;
                    self.push(tok, line);
                }
                _ => {
                    let op = self.operator(line)?;
                    match op.as_str() {
                        "(" | "[" | "{" => self.brackets += 1,
                        ")" | "]" | "}" => {
                            self.brackets = self
                                .brackets
                                .checked_sub(1)
                                .ok_or_else(|| AdapterError::syntax(line, format!("unmatched '{op}'")))?;
                        }
                        _ => {}
                    }
                    self.push(Tok::Op(op), line);
                }
            }
        }

        if self.brackets > 0 {
            return Err(AdapterError::syntax(self.line, "unexpected end of input inside brackets"));
        }
        let line = self.line;
        self.newline(line);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent, line);
        }
        self.push(Tok::Eof, line);
        Ok(self.tokens)
    }

    fn newline(&mut self, line: usize) {
        let ended_statement = self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.tok, Tok::Newline | Tok::Indent | Tok::Dedent));
        if ended_statement {
            self.push(Tok::Newline, line);
        }
    }

    /// Measure leading whitespace of the next non-blank line and emit
    /// indentation changes. Returns false at end of input.
    fn indentation(&mut self) -> AdapterResult<bool> {
        loop {
            let mut width = 0;
            while let Some(c) = self.peek(0) {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    '\r' | '\u{c}' => {}
                    _ => break,
                }
                self.bump();
            }
            match self.peek(0) {
                None => return Ok(false),
                Some('\n') => {
                    self.bump();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {}
            }

            let line = self.line;
            let current = self.indents.last().copied().unwrap_or(0);
            if width > current {
                self.indents.push(width);
                self.push(Tok::Indent, line);
            } else if width < current {
                while self.indents.last().is_some_and(|&level| level > width) {
                    self.indents.pop();
                    self.push(Tok::Dedent, line);
                }
                if self.indents.last().copied() != Some(width) {
                    return Err(AdapterError::syntax(
                        line,
                        "unindent does not match any outer indentation level",
                    ));
                }
            }
            return Ok(true);
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn number(&mut self, line: usize) -> AdapterResult<String> {
        let mut text = String::new();
        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')) {
            text.push('0');
            self.bump();
            text.push(self.bump().unwrap_or('x').to_ascii_lowercase());
            while let Some(c) = self.peek(0) {
                if c.is_ascii_hexdigit() {
                    text.push(c);
                } else if c != '_' {
                    break;
                }
                self.bump();
            }
        } else {
            while let Some(c) = self.peek(0) {
                let exponent_sign =
                    matches!(c, '+' | '-') && matches!(text.chars().last(), Some('e' | 'E'));
                if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                    text.push(c);
                } else if c != '_' {
                    break;
                }
                self.bump();
            }
        }
        if matches!(self.peek(0), Some('j' | 'J')) {
            return Err(AdapterError::unsupported(line, "complex number literal"));
        }
        // Python 2 style leading zeros are not valid octal in Python 3.
        if text.len() > 1 && text.starts_with('0') && text.chars().all(|c| c.is_ascii_digit()) {
            let trimmed = text.trim_start_matches('0');
            text = if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() };
        }
        Ok(text)
    }

    fn name(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    /// Consume a string prefix such as `r`, `f` or `rb` when a quote follows.
    fn string_prefix(&mut self) -> Option<String> {
        let mut len = 0;
        while len < 2 && self.peek(len).is_some_and(|c| "rRbBuUfF".contains(c)) {
            len += 1;
        }
        if len == 0 || !matches!(self.peek(len), Some('"' | '\'')) {
            return None;
        }
        let prefix: String = (0..len).filter_map(|_| self.bump()).collect();
        Some(prefix.to_ascii_lowercase())
    }

    fn string(&mut self, prefix: String, line: usize) -> AdapterResult<Tok> {
        let raw = prefix.contains('r');
        let formatted = prefix.contains('f');
        let quote = self.bump().unwrap_or('"');
        let triple = self.peek(0) == Some(quote) && self.peek(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(AdapterError::syntax(line, "unterminated string literal"));
            };
            if c == quote {
                if !triple {
                    break;
                }
                if self.peek(0) == Some(quote) && self.peek(1) == Some(quote) {
                    self.bump();
                    self.bump();
                    break;
                }
                value.push(c);
                continue;
            }
            match c {
                '\n' if !triple => {
                    return Err(AdapterError::syntax(line, "unterminated string literal"))
                }
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(AdapterError::syntax(line, "unterminated string literal"));
                    };
                    if raw || formatted {
                        // f-string escapes are decoded after interpolation is split out.
                        if escaped != '\n' || raw {
                            value.push('\\');
                            value.push(escaped);
                        }
                    } else if escaped == '\n' {
                        // Line continuation inside the literal.
                    } else if escaped == 'x' {
                        let digits = self.take_hex(2);
                        match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                            Some(decoded) => value.push(decoded),
                            None => return Err(AdapterError::syntax(line, "invalid \\x escape")),
                        }
                    } else {
                        value.push_str(&decode_escape(escaped, || self.take_hex(4)));
                    }
                }
                other => value.push(other),
            }
        }
        Ok(if formatted {
            Tok::FString(value)
        } else {
            Tok::Str(value)
        })
    }

    fn take_hex(&mut self, count: usize) -> String {
        let mut digits = String::new();
        for _ in 0..count {
            match self.peek(0) {
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c);
                    self.bump();
                }
                _ => break,
            }
        }
        digits
    }

    fn operator(&mut self, line: usize) -> AdapterResult<String> {
        for candidate in OPERATORS {
            let matches = candidate
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek(i) == Some(c));
            if matches {
                for _ in 0..candidate.len() {
                    self.bump();
                }
                return Ok(candidate.to_string());
            }
        }
        let c = self.peek(0).unwrap_or(' ');
        Err(AdapterError::syntax(line, format!("invalid character '{c}'")))
    }
}

/// Decode the escapes of a literal segment of an f-string.
pub fn decode_fstring_literal(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped) => out.push_str(&decode_escape(escaped, || {
                let mut digits = String::new();
                while digits.len() < 4 && chars.peek().is_some_and(|d| d.is_ascii_hexdigit()) {
                    digits.extend(chars.next());
                }
                digits
            })),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(source: &str) -> Vec<Tok> {
        tokenize(source).unwrap().into_iter().map(|t| t.tok).collect()
    }

    fn name(text: &str) -> Tok {
        Tok::Name(text.to_string())
    }

    fn op(text: &str) -> Tok {
        Tok::Op(text.to_string())
    }

    #[test]
    fn test_indent_and_dedent() {
        let source = "def f(x):\n    if x:\n        return 1\n    return 2\n";
        let tokens = toks(source);
        assert_eq!(tokens.iter().filter(|t| **t == Tok::Indent).count(), 2);
        assert_eq!(tokens.iter().filter(|t| **t == Tok::Dedent).count(), 2);
        assert_eq!(tokens.last(), Some(&Tok::Eof));
    }

    #[test]
    fn test_blank_and_comment_lines_do_not_indent() {
        let source = "def f():\n    x = 1\n\n  # stray comment\n    return x\n";
        let tokens = toks(source);
        assert_eq!(tokens.iter().filter(|t| **t == Tok::Indent).count(), 1);
    }

    #[test]
    fn test_brackets_join_lines() {
        let tokens = toks("x = [1,\n     2]\ny = 3\n");
        let newlines = tokens.iter().filter(|t| **t == Tok::Newline).count();
        assert_eq!(newlines, 2);
    }

    #[test]
    fn test_backslash_continuation() {
        let tokens = toks("x = 1 + \\\n    2\n");
        assert_eq!(
            tokens,
            vec![
                name("x"),
                op("="),
                Tok::Number("1".into()),
                op("+"),
                Tok::Number("2".into()),
                Tok::Newline,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_inconsistent_dedent() {
        let err = tokenize("if x:\n    a = 1\n  b = 2\n").unwrap_err();
        assert_eq!(
            err,
            AdapterError::syntax(3, "unindent does not match any outer indentation level")
        );
    }

    #[test]
    fn test_string_forms() {
        let tokens = toks("a = 'it\\'s'\nb = r'\\d+'\nc = \"\"\"multi\nline\"\"\"\nd = f'{x}!'\n");
        assert!(tokens.contains(&Tok::Str("it's".into())));
        assert!(tokens.contains(&Tok::Str("\\d+".into())));
        assert!(tokens.contains(&Tok::Str("multi\nline".into())));
        assert!(tokens.contains(&Tok::FString("{x}!".into())));
    }

    #[test]
    fn test_operators_longest_match() {
        let tokens = toks("a //= 2 ** 3\n");
        assert_eq!(tokens[1], op("//="));
        assert_eq!(tokens[3], op("**"));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = 1\ns = 'abc\n").unwrap_err();
        assert_eq!(err, AdapterError::syntax(2, "unterminated string literal"));
    }

    #[test]
    fn test_fstring_literal_escapes() {
        assert_eq!(decode_fstring_literal("a\\tb\\n"), "a\tb\n");
    }
}
