use anyhow::Result;
use thiserror::Error;

use crate::source::SourceFile;

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Lowercase-initial identifier, `self` included.
    ObjectId,
    /// Uppercase-initial identifier, `SELF_TYPE` included.
    TypeId,
    IntegerLiteral(i64),
    StringLiteral(String),
    BooleanLiteral(bool),
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Dot,
    At,
    Colon,
    Semicolon,
    Assign, // <-
    Plus,
    Minus,
    Star,
    Slash,
    Tilde,
    Less,
    LessEqual,
    Equal,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Inherits,
    If,
    Then,
    Else,
    Fi,
    While,
    Loop,
    Pool,
    Let,
    In,
    New,
    IsVoid,
    Not,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexerError {
    #[error("unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
    #[error("unterminated comment starting at line {line}, column {column}")]
    UnterminatedComment { line: usize, column: usize },
    #[error("integer literal '{lexeme}' out of range at line {line}, column {column}")]
    IntegerOverflow {
        lexeme: String,
        line: usize,
        column: usize,
    },
}

impl LexerError {
    pub fn line(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { line, .. }
            | LexerError::UnterminatedString { line, .. }
            | LexerError::UnterminatedComment { line, .. }
            | LexerError::IntegerOverflow { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexerError::UnexpectedCharacter { column, .. }
            | LexerError::UnterminatedString { column, .. }
            | LexerError::UnterminatedComment { column, .. }
            | LexerError::IntegerOverflow { column, .. } => *column,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self {
            input: &source.contents,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c' => {
                    self.advance_char();
                }
                '-' if self.peek_next_char() == Some('-') => self.skip_line_comment(),
                '(' if self.peek_next_char() == Some('*') => self.skip_block_comment()?,
                '"' => {
                    let token = self.lex_string()?;
                    tokens.push(token);
                }
                '0'..='9' => {
                    let token = self.lex_number()?;
                    tokens.push(token);
                }
                'a'..='z' | 'A'..='Z' => {
                    let token = self.lex_identifier_or_keyword();
                    tokens.push(token);
                }
                '(' => tokens.push(self.simple_token(TokenKind::LParen)),
                ')' => tokens.push(self.simple_token(TokenKind::RParen)),
                '{' => tokens.push(self.simple_token(TokenKind::LBrace)),
                '}' => tokens.push(self.simple_token(TokenKind::RBrace)),
                ',' => tokens.push(self.simple_token(TokenKind::Comma)),
                '.' => tokens.push(self.simple_token(TokenKind::Dot)),
                '@' => tokens.push(self.simple_token(TokenKind::At)),
                ':' => tokens.push(self.simple_token(TokenKind::Colon)),
                ';' => tokens.push(self.simple_token(TokenKind::Semicolon)),
                '+' => tokens.push(self.simple_token(TokenKind::Plus)),
                '-' => tokens.push(self.simple_token(TokenKind::Minus)),
                '*' => tokens.push(self.simple_token(TokenKind::Star)),
                '/' => tokens.push(self.simple_token(TokenKind::Slash)),
                '~' => tokens.push(self.simple_token(TokenKind::Tilde)),
                '=' => tokens.push(self.simple_token(TokenKind::Equal)),
                '<' => {
                    let token = self.lex_less_variants();
                    tokens.push(token);
                }
                other => {
                    return Err(LexerError::UnexpectedCharacter {
                        character: other,
                        line: self.line,
                        column: self.column,
                    }
                    .into());
                }
            }
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(tokens)
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume '('
        self.advance_char(); // consume '*'

        let mut depth = 1usize;
        while depth > 0 {
            match self.advance_char() {
                Some('(') if self.peek_char() == Some('*') => {
                    self.advance_char();
                    depth += 1;
                }
                Some('*') if self.peek_char() == Some(')') => {
                    self.advance_char();
                    depth -= 1;
                }
                Some(_) => {}
                None => {
                    return Err(LexerError::UnterminatedComment {
                        line: start_line,
                        column: start_column,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn lex_string(&mut self) -> Result<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char(); // consume opening quote

        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.advance_char(); // consume closing quote
                    let lexeme = self.slice(start, self.position);
                    return Ok(Token::new(
                        TokenKind::StringLiteral(value),
                        lexeme.to_string(),
                        start_line,
                        start_column,
                    ));
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self.peek_char().ok_or(LexerError::UnterminatedString {
                        line: start_line,
                        column: start_column,
                    })?;
                    let escaped_char = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'b' => '\x08',
                        'f' => '\x0c',
                        other => other,
                    };
                    value.push(escaped_char);
                    self.advance_char();
                }
                '\n' => break,
                _ => {
                    value.push(ch);
                    self.advance_char();
                }
            }
        }

        Err(LexerError::UnterminatedString {
            line: start_line,
            column: start_column,
        }
        .into())
    }

    fn lex_number(&mut self) -> Result<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        while let Some('0'..='9') = self.peek_char() {
            self.advance_char();
        }

        let lexeme = self.slice(start, self.position).to_string();
        let value = lexeme
            .parse::<i64>()
            .map_err(|_| LexerError::IntegerOverflow {
                lexeme: lexeme.clone(),
                line: start_line,
                column: start_column,
            })?;
        Ok(Token::new(
            TokenKind::IntegerLiteral(value),
            lexeme,
            start_line,
            start_column,
        ))
    }

    fn lex_identifier_or_keyword(&mut self) -> Token {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = if let Some(keyword) = keyword_from_lexeme(&lexeme) {
            TokenKind::Keyword(keyword)
        } else if lexeme.starts_with('t') && lexeme.eq_ignore_ascii_case("true") {
            TokenKind::BooleanLiteral(true)
        } else if lexeme.starts_with('f') && lexeme.eq_ignore_ascii_case("false") {
            TokenKind::BooleanLiteral(false)
        } else if lexeme.starts_with(|ch: char| ch.is_ascii_uppercase()) {
            TokenKind::TypeId
        } else {
            TokenKind::ObjectId
        };
        Token::new(kind, lexeme, start_line, start_column)
    }

    fn lex_less_variants(&mut self) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char(); // consume '<'

        let kind = match self.peek_char() {
            Some('=') => {
                self.advance_char();
                TokenKind::LessEqual
            }
            Some('-') => {
                self.advance_char();
                TokenKind::Assign
            }
            _ => TokenKind::Less,
        };
        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        )
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;
        self.advance_char();
        Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        )
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }
}

/// Keywords are case-insensitive; `true` and `false` are handled separately
/// because their first letter must be lowercase.
fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    match lexeme.to_ascii_lowercase().as_str() {
        "class" => Some(Keyword::Class),
        "inherits" => Some(Keyword::Inherits),
        "if" => Some(Keyword::If),
        "then" => Some(Keyword::Then),
        "else" => Some(Keyword::Else),
        "fi" => Some(Keyword::Fi),
        "while" => Some(Keyword::While),
        "loop" => Some(Keyword::Loop),
        "pool" => Some(Keyword::Pool),
        "let" => Some(Keyword::Let),
        "in" => Some(Keyword::In),
        "new" => Some(Keyword::New),
        "isvoid" => Some(Keyword::IsVoid),
        "not" => Some(Keyword::Not),
        _ => None,
    }
}
