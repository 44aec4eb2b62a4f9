/// Builder for well-formed method IL.
///
/// Every `create` counts one reference on each child, so IL produced purely
/// through the builder always has exact reference counts. Tests that need
/// deliberately broken IL adjust the finished `MethodIl` through its raw
/// mutators.

use super::{Block, BlockNumber, MethodIl, NodeId, OpCode, Payload, Symbol, TreeTopId};

pub struct MethodBuilder {
    il: MethodIl,
    last: Option<TreeTopId>,
    open_block: Option<(BlockNumber, bool, TreeTopId)>,
    next_block: u32,
}

impl MethodBuilder {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            il: MethodIl::new(signature),
            last: None,
            open_block: None,
            next_block: 0,
        }
    }

    /// Open a new block, closing the current one if still open.
    pub fn begin_block(&mut self, is_extension_of_previous: bool) -> BlockNumber {
        if self.open_block.is_some() {
            self.end_block();
        }
        let number = BlockNumber(self.next_block);
        self.next_block += 1;
        let start = self.il.add_node(OpCode::BBStart, vec![], Payload::Block(number));
        let entry = self.append_treetop(start);
        self.open_block = Some((number, is_extension_of_previous, entry));
        number
    }

    pub fn end_block(&mut self) {
        let Some((number, is_extension_of_previous, entry)) = self.open_block.take() else {
            return;
        };
        let end = self.il.add_node(OpCode::BBEnd, vec![], Payload::Block(number));
        let exit = self.append_treetop(end);
        self.il.add_block(Block {
            number,
            is_extension_of_previous,
            entry,
            exit,
        });
    }

    /// Create a node and count one reference on each child.
    pub fn create(&mut self, opcode: OpCode, children: &[NodeId]) -> NodeId {
        self.create_with(opcode, children, Payload::None)
    }

    pub fn create_with(&mut self, opcode: OpCode, children: &[NodeId], payload: Payload) -> NodeId {
        for child in children {
            if let Some(node) = self.il.node_mut(*child) {
                node.reference_count += 1;
            }
        }
        self.il
            .add_node(opcode, children.iter().copied().map(Some).collect(), payload)
    }

    pub fn iconst(&mut self, value: i32) -> NodeId {
        self.create_with(OpCode::IConst, &[], Payload::Int(value as i64))
    }

    pub fn lconst(&mut self, value: i64) -> NodeId {
        self.create_with(OpCode::LConst, &[], Payload::Int(value))
    }

    pub fn dconst(&mut self, value: f64) -> NodeId {
        self.create_with(OpCode::DConst, &[], Payload::Float(value))
    }

    pub fn fconst(&mut self, value: f32) -> NodeId {
        self.create_with(OpCode::FConst, &[], Payload::Float(value as f64))
    }

    pub fn load(&mut self, opcode: OpCode, symbol: Symbol) -> NodeId {
        self.create_with(opcode, &[], Payload::Symbol(symbol))
    }

    /// Create a treetop-rooted node and append it as a statement.
    pub fn anchor(&mut self, opcode: OpCode, children: &[NodeId]) -> NodeId {
        let node = self.create(opcode, children);
        self.append_treetop(node);
        node
    }

    pub fn store(&mut self, opcode: OpCode, symbol: Symbol, value: NodeId) -> NodeId {
        let node = self.create_with(opcode, &[value], Payload::Symbol(symbol));
        self.append_treetop(node);
        node
    }

    /// Append an existing node as the root of a new treetop at the end of the list.
    pub fn append_treetop(&mut self, node: NodeId) -> TreeTopId {
        let tt = self.il.add_treetop(Some(node));
        match self.last {
            Some(prev) => self.il.link(prev, tt),
            None => self.il.set_first_treetop(Some(tt)),
        }
        self.last = Some(tt);
        tt
    }

    pub fn finish(mut self) -> MethodIl {
        self.end_block();
        self.il
    }
}
