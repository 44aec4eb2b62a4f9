/// Parse tree for Tril text. Nested forms live in the parser's bump arena.

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
    pub line: usize,
}

#[derive(Debug)]
pub enum Form<'a> {
    /// `(opcode attr=value ... child ...)`
    Node {
        opcode: String,
        attributes: Vec<Attribute>,
        children: Vec<&'a Form<'a>>,
        line: usize,
    },
    /// `@name`
    Reference {
        name: String,
        line: usize,
    },
}

impl<'a> Form<'a> {
    pub fn line(&self) -> usize {
        match self {
            Form::Node { line, .. } | Form::Reference { line, .. } => *line,
        }
    }
}

#[derive(Debug)]
pub struct BlockForm<'a> {
    pub attributes: Vec<Attribute>,
    pub treetops: Vec<&'a Form<'a>>,
    pub line: usize,
}

#[derive(Debug)]
pub struct MethodForm<'a> {
    pub attributes: Vec<Attribute>,
    pub blocks: Vec<BlockForm<'a>>,
    pub line: usize,
}

#[derive(Debug)]
pub struct Module<'a> {
    pub methods: Vec<MethodForm<'a>>,
}

impl<'a> Module<'a> {
    pub fn new() -> Self {
        Module { methods: vec![] }
    }
}

impl<'a> Default for Module<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Find an attribute by name.
pub fn attribute<'b>(attributes: &'b [Attribute], name: &str) -> Option<&'b Attribute> {
    attributes.iter().find(|a| a.name == name)
}
