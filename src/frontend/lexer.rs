//! Lexer for NESTML
//!
//! Converts model source into a stream of tokens. Newlines are not tokens;
//! the parser uses token positions to find statement boundaries.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, SourcePosition};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Current line (1-based)
    line: u32,
    /// Current column (1-based)
    column: u32,
    /// Line and column where the current token started
    start_line: u32,
    start_column: u32,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Position from the start of the current token to the current character
    fn make_pos(&self) -> SourcePosition {
        SourcePosition::new(
            self.start_line,
            self.start_column,
            self.line,
            self.column.saturating_sub(1).max(self.start_column),
        )
    }

    /// Create a token with the current position
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_pos())
    }

    /// Skip whitespace and comments, reporting whether a line break was crossed
    fn skip_whitespace(&mut self) -> bool {
        let mut line_break = false;
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    line_break = true;
                    self.advance();
                }
                // Line continuation
                '\\' if matches!(self.peek_next(), Some('\n') | Some('\r')) => {
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    }
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                }
                // Line comment
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment
                '/' if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        line_break
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let begin = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[begin..self.pos].iter().collect();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    /// Read a number literal (integer or float)
    fn read_number(&mut self) -> Result<Token> {
        let begin = self.pos;
        let mut is_float = false;

        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal point, but not the start of `...`
        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent only when digits follow, so `10ms` or `2 eV` stay a number + name
        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed = matches!(self.peek_next(), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                is_float = true;
                self.advance();
                if signed {
                    self.advance();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text: String = self.source[begin..self.pos].iter().collect();
        let kind = if is_float {
            text.parse().map(TokenKind::FloatLit).ok()
        } else {
            text.parse().map(TokenKind::IntLit).ok()
        };
        match kind {
            Some(kind) => Ok(self.make_token(kind)),
            None => Err(Error::InvalidNumber { text, pos: self.make_pos() }),
        }
    }

    /// Read a string literal
    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // consume opening quote

        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(c) => value.push(c),
                        None => return Err(Error::UnterminatedString { pos: self.make_pos() }),
                    }
                }
                Some('\n') | None => {
                    return Err(Error::UnterminatedString { pos: self.make_pos() });
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(self.make_token(TokenKind::StringLit(value)))
    }

    /// Consume `second` if it is next, choosing between two token kinds
    fn either(&mut self, second: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(second) {
            self.advance();
            matched
        } else {
            single
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        let at_start = self.pos == 0;
        let line_break = self.skip_whitespace() || at_start;
        let mut token = self.scan_token()?;
        token.first_on_line = line_break || token.kind == TokenKind::Eof;
        Ok(token)
    }

    fn scan_token(&mut self) -> Result<Token> {
        self.start_line = self.line;
        self.start_column = self.column;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::eof(self.make_pos())),
        };

        if c.is_alphabetic() || c == '_' {
            return Ok(self.read_identifier());
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == '"' {
            return self.read_string();
        }

        self.advance();
        let kind = match c {
            '+' => self.either('=', TokenKind::PlusEq, TokenKind::Plus),
            '-' => self.either('=', TokenKind::MinusEq, TokenKind::Minus),
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    TokenKind::StarStar
                } else {
                    self.either('=', TokenKind::StarEq, TokenKind::Star)
                }
            }
            '/' => self.either('=', TokenKind::SlashEq, TokenKind::Slash),
            '%' => TokenKind::Percent,
            '=' => self.either('=', TokenKind::EqEq, TokenKind::Eq),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    return Err(Error::UnexpectedChar { ch: c, pos: self.make_pos() });
                }
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    TokenKind::LtEq
                }
                Some('<') => {
                    self.advance();
                    TokenKind::Shl
                }
                Some('>') => {
                    self.advance();
                    TokenKind::LtGt
                }
                Some('-') => {
                    self.advance();
                    TokenKind::LeftArrow
                }
                _ => TokenKind::Lt,
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    TokenKind::GtEq
                }
                Some('>') => {
                    self.advance();
                    TokenKind::Shr
                }
                _ => TokenKind::Gt,
            },
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            '\'' => TokenKind::Prime,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' if self.peek() == Some('[') => {
                self.advance();
                TokenKind::LDoubleBracket
            }
            ']' if self.peek() == Some(']') => {
                self.advance();
                TokenKind::RDoubleBracket
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' if self.peek() == Some('.') && self.peek_next() == Some('.') => {
                self.advance();
                self.advance();
                TokenKind::Ellipsis
            }
            other => return Err(Error::UnexpectedChar { ch: other, pos: self.make_pos() }),
        };

        Ok(self.make_token(kind))
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}
