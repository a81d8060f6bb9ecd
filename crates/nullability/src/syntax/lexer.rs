use crate::span::Span;
use crate::syntax::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    Float,
    String,
    Func,
    Let,
    Var,
    If,
    Else,
    Return,
    Import,
    Nil,
    True,
    False,
    Underscore,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Lt,
    Gt,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    Assign,
    EqEq,
    NotEq,
    Bang,
    Question,
    Minus,
    Eof,
}

impl TokenKind {
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Integer => "integer literal",
            TokenKind::Float => "floating-point literal",
            TokenKind::String => "string literal",
            TokenKind::Func => "'func'",
            TokenKind::Let => "'let'",
            TokenKind::Var => "'var'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::Return => "'return'",
            TokenKind::Import => "'import'",
            TokenKind::Nil => "'nil'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Underscore => "'_'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Arrow => "'->'",
            TokenKind::Assign => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Bang => "'!'",
            TokenKind::Question => "'?'",
            TokenKind::Minus => "'-'",
            TokenKind::Eof => "end of file",
        }
    }
}

fn keyword(text: &[u8]) -> Option<TokenKind> {
    Some(match text {
        b"func" => TokenKind::Func,
        b"let" => TokenKind::Let,
        b"var" => TokenKind::Var,
        b"if" => TokenKind::If,
        b"else" => TokenKind::Else,
        b"return" => TokenKind::Return,
        b"import" => TokenKind::Import,
        b"nil" => TokenKind::Nil,
        b"true" => TokenKind::True,
        b"false" => TokenKind::False,
        b"_" => TokenKind::Underscore,
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
    /// Whitespace or a comment separates this token from the previous one.
    pub space_before: bool,
}

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src [u8]) -> Self {
        Self {
            source,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn source(&self) -> &'src [u8] {
        self.source
    }

    /// Lex the whole buffer. The returned list always ends with `Eof`.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<ParseError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            tokens.push(token);
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        (tokens, self.errors)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    /// Skip whitespace and comments, reporting what was crossed.
    fn skip_trivia(&mut self) -> (bool, bool) {
        let mut newline = self.pos == 0;
        let mut space = false;
        while let Some(byte) = self.peek() {
            match byte {
                b'\n' => {
                    newline = true;
                    space = true;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => {
                    space = true;
                    self.pos += 1;
                }
                b'/' if self.peek_at(1) == Some(b'/') => {
                    space = true;
                    while self.peek().is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek_at(1) == Some(b'*') => {
                    space = true;
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match self.peek() {
                            None => {
                                self.errors.push(ParseError::new(
                                    Span::new(start, start + 2),
                                    "unterminated '/*' comment",
                                ));
                                break;
                            }
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(b'\n') => {
                                newline = true;
                                self.pos += 1;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                }
                _ => break,
            }
        }
        (newline, space)
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            let (newline_before, space_before) = self.skip_trivia();
            let start = self.pos;
            let Some(byte) = self.peek() else {
                return Token {
                    kind: TokenKind::Eof,
                    span: Span::point(start),
                    newline_before: true,
                    space_before,
                };
            };

            let kind = match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'_' | 0x80..=0xff => {
                    while self
                        .peek()
                        .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80)
                    {
                        self.pos += 1;
                    }
                    keyword(&self.source[start..self.pos]).unwrap_or(TokenKind::Identifier)
                }
                b'0'..=b'9' => self.number(),
                b'"' => self.string(start),
                _ => match self.punctuation(byte) {
                    Some(kind) => kind,
                    None => {
                        self.pos += 1;
                        self.errors.push(ParseError::new(
                            Span::new(start, self.pos),
                            format!("invalid character '{}' in source file", byte as char),
                        ));
                        continue;
                    }
                },
            };

            return Token {
                kind,
                span: Span::new(start, self.pos),
                newline_before,
                space_before,
            };
        }
    }

    fn number(&mut self) -> TokenKind {
        let digits = |lexer: &mut Self| {
            while lexer.peek().is_some_and(|b| b.is_ascii_digit() || b == b'_') {
                lexer.pos += 1;
            }
        };
        digits(self);
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            digits(self);
            return TokenKind::Float;
        }
        TokenKind::Integer
    }

    fn string(&mut self, start: usize) -> TokenKind {
        self.pos += 1;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.errors.push(ParseError::new(
                        Span::new(start, self.pos),
                        "unterminated string literal",
                    ));
                    break;
                }
                Some(b'\\') => self.pos += (self.source.len() - self.pos).min(2),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        TokenKind::String
    }

    fn punctuation(&mut self, byte: u8) -> Option<TokenKind> {
        let next = self.peek_at(1);
        let (kind, len) = match (byte, next) {
            (b'-', Some(b'>')) => (TokenKind::Arrow, 2),
            (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
            (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b'{', _) => (TokenKind::LBrace, 1),
            (b'}', _) => (TokenKind::RBrace, 1),
            (b'<', _) => (TokenKind::Lt, 1),
            (b'>', _) => (TokenKind::Gt, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b':', _) => (TokenKind::Colon, 1),
            (b';', _) => (TokenKind::Semicolon, 1),
            (b'.', _) => (TokenKind::Dot, 1),
            (b'=', _) => (TokenKind::Assign, 1),
            (b'!', _) => (TokenKind::Bang, 1),
            (b'?', _) => (TokenKind::Question, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            _ => return None,
        };
        self.pos += len;
        Some(kind)
    }
}
