use crate::ast::{Attribute, BlockForm, Form, MethodForm, Module, Value};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token};
use bumpalo::Bump;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: &'a Bump,
    cur_token: Token,
    peek_token: Token,
    cur_line: usize,
    peek_line: usize,
    pub errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>, arena: &'a Bump) -> Self {
        let mut p = Parser {
            lexer,
            arena,
            cur_token: Token::EOF,
            peek_token: Token::EOF,
            cur_line: 1,
            peek_line: 1,
            errors: vec![],
        };
        p.next_token();
        p.next_token();
        p
    }

    pub fn next_token(&mut self) {
        self.cur_token = std::mem::replace(&mut self.peek_token, Token::EOF);
        self.cur_line = self.peek_line;
        self.peek_token = self.lexer.next_token();
        self.peek_line = self.lexer.line;
    }

    /// Parse every `(method ...)` form in the input. Parsing stops at the
    /// first malformed method; the error is left in `errors`.
    pub fn parse_module(&mut self) -> Module<'a> {
        let mut module = Module::new();

        while self.cur_token != Token::EOF {
            if self.cur_token == Token::LParen && self.peek_is_keyword("method") {
                match self.parse_method() {
                    Some(method) => module.methods.push(method),
                    None => break,
                }
            } else {
                self.error_here("'(method'");
                break;
            }
            self.next_token();
        }
        module
    }

    fn parse_method(&mut self) -> Option<MethodForm<'a>> {
        let line = self.cur_line;
        self.next_token(); // consume (, now at `method`
        let mut attributes = vec![];
        let mut blocks = vec![];

        loop {
            self.next_token();
            match &self.cur_token {
                Token::Identifier(_) => attributes.push(self.parse_attribute()?),
                Token::LParen if self.peek_is_keyword("block") => blocks.push(self.parse_block()?),
                Token::RParen => break,
                _ => {
                    self.error_here("attribute, '(block' or ')'");
                    return None;
                }
            }
        }

        Some(MethodForm { attributes, blocks, line })
    }

    fn parse_block(&mut self) -> Option<BlockForm<'a>> {
        let line = self.cur_line;
        self.next_token(); // consume (, now at `block`
        let mut attributes = vec![];
        let mut treetops = vec![];

        loop {
            self.next_token();
            match &self.cur_token {
                Token::Identifier(_) => attributes.push(self.parse_attribute()?),
                Token::LParen | Token::At => {
                    let form = self.parse_form()?;
                    treetops.push(form);
                }
                Token::RParen => break,
                _ => {
                    self.error_here("attribute, node or ')'");
                    return None;
                }
            }
        }

        Some(BlockForm { attributes, treetops, line })
    }

    fn parse_form(&mut self) -> Option<&'a Form<'a>> {
        let line = self.cur_line;
        if self.cur_token == Token::At {
            let name = self.expect_identifier()?;
            return Some(self.arena.alloc(Form::Reference { name, line }));
        }

        let opcode = self.expect_identifier()?;
        let mut attributes = vec![];
        let mut children = vec![];

        loop {
            self.next_token();
            match &self.cur_token {
                Token::Identifier(_) => attributes.push(self.parse_attribute()?),
                Token::LParen | Token::At => children.push(self.parse_form()?),
                Token::RParen => break,
                _ => {
                    self.error_here("attribute, child node or ')'");
                    return None;
                }
            }
        }

        Some(self.arena.alloc(Form::Node { opcode, attributes, children, line }))
    }

    /// `name=value`, or a bare `name` which reads as `name=true`.
    fn parse_attribute(&mut self) -> Option<Attribute> {
        let line = self.cur_line;
        let name = match &self.cur_token {
            Token::Identifier(name) => name.clone(),
            _ => {
                self.error_here("attribute name");
                return None;
            }
        };

        if self.peek_token != Token::Equal {
            return Some(Attribute {
                name,
                value: Value::Identifier("true".to_string()),
                line,
            });
        }

        self.next_token(); // consume name, now at =
        self.next_token(); // consume =, now at the value
        let value = match &self.cur_token {
            Token::Identifier(s) => Value::Identifier(s.clone()),
            Token::Integer(n) => Value::Integer(*n),
            Token::Float(f) => Value::Float(*f),
            Token::String(s) => Value::String(s.clone()),
            _ => {
                self.error_here("attribute value");
                return None;
            }
        };
        Some(Attribute { name, value, line })
    }

    fn expect_identifier(&mut self) -> Option<String> {
        match &self.peek_token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.next_token();
                Some(name)
            }
            _ => {
                self.peek_error("identifier");
                None
            }
        }
    }

    fn peek_is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek_token, Token::Identifier(s) if s == keyword)
    }

    fn error_here(&mut self, expected: &str) {
        self.errors.push(ParseError::Unexpected {
            line: self.cur_line,
            expected: expected.to_string(),
            found: format!("{:?}", self.cur_token),
        });
    }

    fn peek_error(&mut self, expected: &str) {
        self.errors.push(ParseError::Unexpected {
            line: self.peek_line,
            expected: expected.to_string(),
            found: format!("{:?}", self.peek_token),
        });
    }
}
