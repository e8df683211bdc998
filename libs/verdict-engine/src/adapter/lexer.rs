//! Tokenizer for brace-delimited languages (JavaScript, Java, C++).
//!
//! `>` is never merged into `>>`, `>>=` or `>>>`: the C-family parser needs
//! single closers for nested generic arguments and reassembles shifts from
//! adjacent tokens instead.

use crate::error::{AdapterError, AdapterResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifier/punctuator text, normalized number text, or the decoded
    /// value of a string or character literal.
    pub text: String,
    pub line: usize,
    /// No whitespace or comment between this token and the previous one.
    pub adjacent: bool,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.is(TokenKind::Punct, text)
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.is(TokenKind::Ident, text)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexOptions {
    /// `'x'` is a character literal rather than a string.
    pub char_literals: bool,
    /// Backtick template literals (contents are not interpolated).
    pub template_literals: bool,
    /// Lines starting with `#` are skipped.
    pub preprocessor: bool,
    /// `/.../flags` in operand position is a regular expression literal.
    pub regex_literals: bool,
}

impl LexOptions {
    pub fn javascript() -> Self {
        Self {
            template_literals: true,
            regex_literals: true,
            ..Self::default()
        }
    }

    pub fn java() -> Self {
        Self {
            char_literals: true,
            ..Self::default()
        }
    }

    pub fn cpp() -> Self {
        Self {
            char_literals: true,
            preprocessor: true,
            ..Self::default()
        }
    }
}

const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "<<=", "**=", "&&=", "||=", "::", "->", "=>", "==", "!=", "<=", ">=",
    "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", "**", "??",
    "?.",
];

pub fn tokenize(source: &str, options: LexOptions) -> AdapterResult<Vec<Token>> {
    Lexer::new(source, options).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    options: LexOptions,
    tokens: Vec<Token>,
    adjacent: bool,
    at_line_start: bool,
}

impl Lexer {
    fn new(source: &str, options: LexOptions) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            options,
            tokens: Vec::new(),
            adjacent: false,
            at_line_start: true,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.at_line_start = true;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, text: String, line: usize) {
        self.tokens.push(Token {
            kind,
            text,
            line,
            adjacent: self.adjacent,
        });
        self.adjacent = true;
        self.at_line_start = false;
    }

    fn run(mut self) -> AdapterResult<Vec<Token>> {
        while let Some(c) = self.peek(0) {
            if c.is_whitespace() {
                self.bump();
                self.adjacent = false;
                continue;
            }
            if c == '#' && self.options.preprocessor && self.at_line_start {
                self.skip_line();
                continue;
            }
            if c == '/' && self.peek(1) == Some('/') {
                self.skip_line();
                continue;
            }
            if c == '/' && self.peek(1) == Some('*') {
                self.skip_block_comment()?;
                continue;
            }

            let line = self.line;
            if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                let text = self.number();
                self.push(TokenKind::Number, text, line);
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                let text = self.identifier();
                self.push(TokenKind::Ident, text, line);
            } else if c == '"' {
                let text = self.quoted('"')?;
                self.push(TokenKind::Str, text, line);
            } else if c == '\'' {
                let text = self.quoted('\'')?;
                let kind = if self.options.char_literals {
                    TokenKind::Char
                } else {
                    TokenKind::Str
                };
                self.push(kind, text, line);
            } else if c == '/' && self.options.regex_literals && self.regex_allowed() {
                let text = self.regex()?;
                self.push(TokenKind::Str, text, line);
            } else if c == '`' && self.options.template_literals {
                let text = self.quoted('`')?;
                self.push(TokenKind::Str, text, line);
            } else {
                let text = self.punctuator();
                self.push(TokenKind::Punct, text, line);
            }
        }
        let line = self.line;
        self.push(TokenKind::Eof, String::new(), line);
        Ok(self.tokens)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        self.adjacent = false;
    }

    fn skip_block_comment(&mut self) -> AdapterResult<()> {
        let start = self.line;
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek(0) == Some('/') => {
                    self.bump();
                    self.adjacent = false;
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(AdapterError::syntax(start, "unterminated block comment")),
            }
        }
    }

    fn number(&mut self) -> String {
        let mut text = String::new();
        if self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X' | 'b' | 'B')) {
            text.push(self.bump().unwrap_or('0'));
            text.push(self.bump().unwrap_or('x'));
            while let Some(c) = self.peek(0) {
                if c.is_ascii_hexdigit() {
                    text.push(c);
                } else if c != '_' && c != '\'' {
                    break;
                }
                self.bump();
            }
        } else {
            while let Some(c) = self.peek(0) {
                let exponent_sign = matches!(c, '+' | '-')
                    && matches!(text.chars().last(), Some('e' | 'E'));
                if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                    text.push(c);
                } else if c != '_' && c != '\'' {
                    break;
                }
                self.bump();
            }
        }
        // Type suffixes carry no value in the common form.
        while let Some(c) = self.peek(0) {
            if matches!(c, 'l' | 'L' | 'u' | 'U' | 'f' | 'F' | 'd' | 'D' | 'n') {
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn quoted(&mut self, quote: char) -> AdapterResult<String> {
        let start = self.line;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(AdapterError::syntax(start, "unterminated literal")),
                Some('\n') if quote != '`' => {
                    return Err(AdapterError::syntax(start, "unterminated literal"))
                }
                Some(c) if c == quote => return Ok(value),
                Some('\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| AdapterError::syntax(start, "unterminated literal"))?;
                    value.push_str(&decode_escape(escaped, || self.take_hex(4)));
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// A slash starts a regex unless it follows something that ends an operand.
    fn regex_allowed(&self) -> bool {
        match self.tokens.last() {
            None => true,
            Some(t) => match t.kind {
                TokenKind::Punct => !matches!(t.text.as_str(), ")" | "]" | "}" | "++" | "--"),
                TokenKind::Ident => matches!(
                    t.text.as_str(),
                    "return"
                        | "typeof"
                        | "case"
                        | "do"
                        | "else"
                        | "in"
                        | "of"
                        | "new"
                        | "delete"
                        | "void"
                        | "throw"
                ),
                _ => false,
            },
        }
    }

    fn regex(&mut self) -> AdapterResult<String> {
        let start = self.line;
        let mut text = String::new();
        text.push(self.bump().unwrap_or('/'));
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(AdapterError::syntax(start, "unterminated regular expression"))
                }
                Some('\\') => {
                    text.push('\\');
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                Some(c) => {
                    text.push(c);
                    match c {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '/' if !in_class => break,
                        _ => {}
                    }
                }
            }
        }
        while let Some(c) = self.peek(0) {
            if !c.is_ascii_alphabetic() {
                break;
            }
            text.push(c);
            self.bump();
        }
        Ok(text)
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

    fn punctuator(&mut self) -> String {
        for candidate in PUNCTUATORS {
            let matches = candidate
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek(i) == Some(c));
            if matches {
                for _ in 0..candidate.chars().count() {
                    self.bump();
                }
                return candidate.to_string();
            }
        }
        self.bump().map(String::from).unwrap_or_default()
    }
}

/// Decode the character after a backslash. `hex` supplies the digits of a
/// `\u` escape when one is needed.
pub(crate) fn decode_escape(escaped: char, hex: impl FnOnce() -> String) -> String {
    match escaped {
        'n' => "\n".to_string(),
        't' => "\t".to_string(),
        'r' => "\r".to_string(),
        '0' => "\0".to_string(),
        'b' => "\u{8}".to_string(),
        'f' => "\u{c}".to_string(),
        'v' => "\u{b}".to_string(),
        'u' => {
            let digits = hex();
            u32::from_str_radix(&digits, 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| format!("u{digits}"))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str, options: LexOptions) -> Vec<String> {
        tokenize(source, options)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_skips_comments() {
        let source = "int a = 1; // trailing\n/* block\n comment */ int b;";
        assert_eq!(
            texts(source, LexOptions::java()),
            ["int", "a", "=", "1", ";", "int", "b", ";"]
        );
    }

    #[test]
    fn test_preprocessor_lines_only_in_cpp() {
        let source = "#include <vector>\nint x;";
        assert_eq!(texts(source, LexOptions::cpp()), ["int", "x", ";"]);
    }

    #[test]
    fn test_number_suffixes_and_separators() {
        assert_eq!(texts("10L 1_000 2.5f 1e-3", LexOptions::java()), ["10", "1000", "2.5", "1e-3"]);
        assert_eq!(texts("1'000'000", LexOptions::cpp()), ["1000000"]);
    }

    #[test]
    fn test_closing_angles_stay_split() {
        let tokens = tokenize("vector<vector<int>> v; a >> 2;", LexOptions::cpp()).unwrap();
        let closers: Vec<&Token> = tokens.iter().filter(|t| t.is_punct(">")).collect();
        assert_eq!(closers.len(), 4);
        assert!(closers[1].adjacent);
        assert!(closers[3].adjacent);
    }

    #[test]
    fn test_char_versus_string_quotes() {
        let java = tokenize("'a'", LexOptions::java()).unwrap();
        assert_eq!(java[0].kind, TokenKind::Char);
        let js = tokenize("'a'", LexOptions::javascript()).unwrap();
        assert_eq!(js[0].kind, TokenKind::Str);
    }

    #[test]
    fn test_escapes_are_decoded() {
        let tokens = tokenize(r#""a\n\"bA""#, LexOptions::java()).unwrap();
        assert_eq!(tokens[0].text, "a\n\"bA");
    }

    #[test]
    fn test_unterminated_string_reports_line() {
        let err = tokenize("int a;\nString s = \"oops;\n", LexOptions::java()).unwrap_err();
        assert_eq!(err, AdapterError::syntax(2, "unterminated literal"));
    }

    #[test]
    fn test_regex_literal_versus_division() {
        let tokens = tokenize("const re = /['\"]/g; x = a / b / c;", LexOptions::javascript()).unwrap();
        assert_eq!(tokens[3].kind, TokenKind::Str);
        assert_eq!(tokens[3].text, "/['\"]/g");
        assert_eq!(tokens.iter().filter(|t| t.is_punct("/")).count(), 2);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a\n\nb", LexOptions::javascript()).unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
    }
}
