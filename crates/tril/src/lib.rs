/// Tril - textual IL for the validator
/// Reads s-expression IL text into method IL the validator can walk.

pub mod ast;
pub mod error;
pub mod il;
pub mod lexer;
pub mod lower;
pub mod parser;

pub use error::ParseError;
pub use il::{MethodBuilder, MethodIl, NodeId, OpCode, TreeTopId};

use bumpalo::Bump;
use lexer::Lexer;
use parser::Parser;

/// Parse Tril text and lower every method it contains.
pub fn parse_methods(source: &str) -> Result<Vec<MethodIl>, Vec<ParseError>> {
    let arena = Bump::new();
    let mut p = Parser::new(Lexer::new(source), &arena);
    let module = p.parse_module();
    if !p.errors.is_empty() {
        return Err(p.errors);
    }

    let mut methods = Vec::with_capacity(module.methods.len());
    let mut errors = vec![];
    for form in &module.methods {
        match lower::lower_method(form) {
            Ok(il) => methods.push(il),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() { Ok(methods) } else { Err(errors) }
}
