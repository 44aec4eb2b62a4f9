/// Tril IL model.
///
/// A method's IL is an arena: nodes and treetops are addressed by dense
/// integer handles, children are non-owning references into the node arena
/// (a node may be the child of any number of parents), and treetops form a
/// doubly-linked list of statements. Nothing here assumes the IL is sound:
/// null children, dangling handles and broken back links are all
/// representable so that a validator can detect them.

pub mod builder;
pub mod datatype;
pub mod opcodes;

pub use builder::MethodBuilder;
pub use datatype::{ChildType, DataType};
pub use opcodes::OpCode;

use serde::{Serialize, Deserialize};
use std::collections::HashSet;
use std::fmt;

/// Dense global index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}n", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeTopId(pub u32);

impl TreeTopId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockNumber(pub u32);

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

/// Symbol referenced by a load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    Parm(u32),
    Temp(u32),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Parm(n) => write!(f, "parm={}", n),
            Symbol::Temp(n) => write!(f, "temp={}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    None,
    Int(i64),
    Float(f64),
    Symbol(Symbol),
    Block(BlockNumber),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub opcode: OpCode,
    /// `None` marks a missing child.
    pub children: Vec<Option<NodeId>>,
    /// Number of times this node is expected to be referenced as a child.
    pub reference_count: u32,
    pub payload: Payload,
    global_index: NodeId,
}

impl Node {
    pub fn global_index(&self) -> NodeId {
        self.global_index
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied().flatten()
    }

    pub fn data_type(&self) -> DataType {
        self.opcode.data_type()
    }

    /// Block this `BBStart`/`BBEnd` marks, if any.
    pub fn block(&self) -> Option<BlockNumber> {
        match self.payload {
            Payload::Block(b) => Some(b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeTop {
    pub node: Option<NodeId>,
    pub prev: Option<TreeTopId>,
    pub next: Option<TreeTopId>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub number: BlockNumber,
    /// Control falls into this block only from the previous one.
    pub is_extension_of_previous: bool,
    pub entry: TreeTopId,
    pub exit: TreeTopId,
}

/// The IL of one method.
#[derive(Debug, Clone)]
pub struct MethodIl {
    signature: String,
    nodes: Vec<Node>,
    treetops: Vec<TreeTop>,
    blocks: Vec<Block>,
    first: Option<TreeTopId>,
    stop: Option<TreeTopId>,
}

impl MethodIl {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            nodes: vec![],
            treetops: vec![],
            blocks: vec![],
            first: None,
            stop: None,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn first_treetop(&self) -> Option<TreeTopId> {
        self.first
    }

    /// Exclusive terminator of the treetop walk; `None` means "run to the end".
    pub fn stop_treetop(&self) -> Option<TreeTopId> {
        self.stop
    }

    pub fn set_first_treetop(&mut self, tt: Option<TreeTopId>) {
        self.first = tt;
    }

    pub fn set_stop_treetop(&mut self, tt: Option<TreeTopId>) {
        self.stop = tt;
    }

    /// One past the highest node index; the size for per-node side tables.
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_treetops(&self) -> usize {
        self.treetops.len()
    }

    /// Returns `None` for a handle that does not resolve (dangling).
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn treetop(&self, id: TreeTopId) -> Option<&TreeTop> {
        self.treetops.get(id.index())
    }

    pub fn treetop_mut(&mut self, id: TreeTopId) -> Option<&mut TreeTop> {
        self.treetops.get_mut(id.index())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, number: BlockNumber) -> Option<&Block> {
        // Builder-made methods number blocks densely in order.
        match self.blocks.get(number.0 as usize) {
            Some(b) if b.number == number => Some(b),
            _ => self.blocks.iter().find(|b| b.number == number),
        }
    }

    /// Add a node without touching any reference count.
    pub fn add_node(&mut self, opcode: OpCode, children: Vec<Option<NodeId>>, payload: Payload) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            opcode,
            children,
            reference_count: 0,
            payload,
            global_index: id,
        });
        id
    }

    /// Add an unlinked treetop.
    pub fn add_treetop(&mut self, node: Option<NodeId>) -> TreeTopId {
        let id = TreeTopId(self.treetops.len() as u32);
        self.treetops.push(TreeTop { node, prev: None, next: None });
        id
    }

    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Link `prev <-> next` in both directions.
    pub fn link(&mut self, prev: TreeTopId, next: TreeTopId) {
        if let Some(p) = self.treetops.get_mut(prev.index()) {
            p.next = Some(next);
        }
        if let Some(n) = self.treetops.get_mut(next.index()) {
            n.prev = Some(prev);
        }
    }

    pub fn set_reference_count(&mut self, id: NodeId, count: u32) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.reference_count = count;
        }
    }

    pub fn next_treetop(&self, tt: TreeTopId) -> Option<TreeTopId> {
        self.treetop(tt).and_then(|t| t.next)
    }

    pub fn treetop_node(&self, tt: TreeTopId) -> Option<&Node> {
        self.treetop(tt).and_then(|t| t.node).and_then(|n| self.node(n))
    }

    /// Whether the `BBStart` node `node` opens a block flagged as an
    /// extension of the previous block.
    pub fn is_extension_of_previous(&self, node: &Node) -> bool {
        node.block()
            .and_then(|b| self.block(b))
            .map(|b| b.is_extension_of_previous)
            .unwrap_or(false)
    }

    /// Treetops in list order from the first treetop up to (excluding) the
    /// stop treetop. Only meaningful for sound IL; the walk gives up after
    /// visiting every treetop once so a cyclic list cannot hang it.
    pub fn treetops(&self) -> TreeTopIter<'_> {
        TreeTopIter {
            il: self,
            current: self.first,
            remaining: self.treetops.len(),
        }
    }

    /// Last treetop of the extended block that `tt` begins: the `BBEnd` of
    /// the final block in the chain of blocks flagged as extensions.
    pub fn extended_block_exit(&self, tt: TreeTopId) -> TreeTopId {
        let mut current = tt;
        let mut remaining = self.treetops.len();
        loop {
            let is_bbend = self
                .treetop_node(current)
                .map(|n| n.opcode == OpCode::BBEnd)
                .unwrap_or(false);
            let next = match self.next_treetop(current) {
                Some(next) if Some(next) != self.stop && remaining > 0 => next,
                _ => return current,
            };
            remaining -= 1;
            if is_bbend {
                let extends = self
                    .treetop_node(next)
                    .map(|n| n.opcode == OpCode::BBStart && self.is_extension_of_previous(n))
                    .unwrap_or(false);
                if !extends {
                    return current;
                }
            }
            current = next;
        }
    }
}

pub struct TreeTopIter<'a> {
    il: &'a MethodIl,
    current: Option<TreeTopId>,
    remaining: usize,
}

impl<'a> Iterator for TreeTopIter<'a> {
    type Item = TreeTopId;

    fn next(&mut self) -> Option<TreeTopId> {
        let tt = self.current?;
        if Some(tt) == self.il.stop || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.current = self.il.next_treetop(tt);
        Some(tt)
    }
}

impl fmt::Display for MethodIl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "method {}", self.signature)?;
        let mut printed = HashSet::new();
        for tt in self.treetops() {
            match self.treetop(tt).and_then(|t| t.node) {
                Some(root) => self.fmt_tree(f, root, 0, &mut printed)?,
                None => writeln!(f, "{:<8}<null treetop>", "")?,
            }
        }
        Ok(())
    }
}

impl MethodIl {
    fn fmt_tree(
        &self,
        f: &mut fmt::Formatter<'_>,
        root: NodeId,
        depth: usize,
        printed: &mut HashSet<NodeId>,
    ) -> fmt::Result {
        // (node, depth) pairs, children pushed in reverse so they print in order.
        let mut stack = vec![(Some(root), depth)];
        while let Some((id, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            let id = match id {
                Some(id) => id,
                None => {
                    writeln!(f, "{:<8}{}<null>", "", indent)?;
                    continue;
                }
            };
            let node = match self.node(id) {
                Some(node) => node,
                None => {
                    writeln!(f, "{:<8}{}<dangling {}>", "", indent, id)?;
                    continue;
                }
            };
            if !printed.insert(id) {
                writeln!(f, "{:<8}{}==>{}", id.to_string(), indent, node.opcode)?;
                continue;
            }
            write!(f, "{:<8}{}{}", id.to_string(), indent, node.opcode)?;
            match node.payload {
                Payload::None => {}
                Payload::Int(v) => write!(f, " {}", v)?,
                Payload::Float(v) => write!(f, " {}", v)?,
                Payload::Symbol(s) => write!(f, " {}", s)?,
                Payload::Block(b) => write!(f, " <{}>", b)?,
            }
            if node.reference_count > 0 {
                write!(f, " (refcount {})", node.reference_count)?;
            }
            writeln!(f)?;
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blocks(second_is_extension: bool) -> MethodIl {
        let mut b = MethodBuilder::new("two_blocks");
        b.begin_block(false);
        let c = b.iconst(1);
        b.anchor(OpCode::IStore, &[c]);
        b.end_block();
        b.begin_block(second_is_extension);
        b.anchor(OpCode::Return, &[]);
        b.end_block();
        b.finish()
    }

    #[test]
    fn test_treetop_walk_order() {
        let il = two_blocks(false);
        let ops: Vec<OpCode> = il
            .treetops()
            .map(|tt| il.treetop_node(tt).unwrap().opcode)
            .collect();
        assert_eq!(
            ops,
            vec![
                OpCode::BBStart, OpCode::IStore, OpCode::BBEnd,
                OpCode::BBStart, OpCode::Return, OpCode::BBEnd,
            ]
        );
    }

    #[test]
    fn test_extended_block_exit_stops_at_plain_block() {
        let il = two_blocks(false);
        let first = il.first_treetop().unwrap();
        let exit = il.extended_block_exit(first);
        assert_eq!(il.treetop_node(exit).unwrap().opcode, OpCode::BBEnd);
        let next = il.next_treetop(exit).unwrap();
        assert_eq!(il.treetop_node(next).unwrap().opcode, OpCode::BBStart);
    }

    #[test]
    fn test_extended_block_exit_follows_extensions() {
        let il = two_blocks(true);
        let first = il.first_treetop().unwrap();
        let exit = il.extended_block_exit(first);
        assert_eq!(il.next_treetop(exit), None);
    }

    #[test]
    fn test_listing_marks_commoned_nodes() {
        let mut b = MethodBuilder::new("listing");
        b.begin_block(false);
        let c = b.iconst(7);
        let add = b.create(OpCode::IAdd, &[c, c]);
        b.anchor(OpCode::IReturn, &[add]);
        b.end_block();
        let il = b.finish();
        let text = il.to_string();
        assert!(text.contains("iconst 7 (refcount 2)"));
        assert!(text.contains("==>iconst"));
    }
}
