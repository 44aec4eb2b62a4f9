/// Tril lexer: turns IL text into s-expression tokens.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    LParen,
    RParen,
    Equal,
    /// `@` introduces a reference to a labeled node.
    At,

    // Literals
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),

    EOF,
    Illegal(char),
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Line of the most recently returned token.
    pub line: usize,
    cursor_line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            cursor_line: 1,
        }
    }

    pub fn next_token(&mut self) -> Token {
        // Whitespace and `;` comments between tokens.
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == ';' {
                self.eat_while(|c| c != '\n');
            } else if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
        self.line = self.cursor_line;

        let Some(&(start, ch)) = self.chars.peek() else {
            return Token::EOF;
        };
        match ch {
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '=' => self.single(Token::Equal),
            '@' => self.single(Token::At),
            '"' => {
                self.bump();
                let text = self.eat_while(|c| c != '"').to_string();
                // Closing quote, if the input has one.
                self.bump();
                Token::String(text)
            }
            '-' if self.input[start + 1..].starts_with(|c: char| c.is_ascii_digit()) => self.number(start),
            c if c.is_ascii_digit() => self.number(start),
            c if is_letter(c) => Token::Identifier(self.eat_while(|c| is_letter(c) || c.is_ascii_digit()).to_string()),
            c => self.single(Token::Illegal(c)),
        }
    }

    /// `-`? digits, optionally followed by `.` digits.
    fn number(&mut self, start: usize) -> Token {
        if self.input[start..].starts_with('-') {
            self.bump();
        }
        self.eat_while(|c| c.is_ascii_digit());

        let rest = &self.input[self.offset()..];
        let fraction = rest.starts_with('.') && rest[1..].starts_with(|c: char| c.is_ascii_digit());
        if fraction {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }

        let text = &self.input[start..self.offset()];
        let parsed = if fraction {
            text.parse().ok().map(Token::Float)
        } else {
            text.parse().ok().map(Token::Integer)
        };
        // Out-of-range integers.
        parsed.unwrap_or_else(|| Token::Illegal(text.chars().next().unwrap_or('0')))
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn bump(&mut self) {
        if let Some((_, '\n')) = self.chars.next() {
            self.cursor_line += 1;
        }
    }

    fn eat_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.offset();
        while self.chars.peek().is_some_and(|&(_, c)| keep(c)) {
            self.bump();
        }
        &self.input[start..self.offset()]
    }

    /// Byte offset of the next unread character.
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
