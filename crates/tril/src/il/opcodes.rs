/// IL opcodes and their static property table.
///
/// Each opcode carries the shape the validator checks against: result type,
/// expected child count and per-position child types, and a handful of flags
/// (treetop-only, may carry a trailing `GlRegDeps`, commutative, ...).

use super::datatype::{ChildType, DataType};
use serde::{Serialize, Deserialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    // Block structure
    BBStart,
    BBEnd,
    /// Global register dependencies, carried as a trailing pseudo-child.
    GlRegDeps,
    /// Anchors a value-producing node as a statement.
    Treetop,
    PassThrough,

    // Constants
    BConst,
    SConst,
    IConst,
    LConst,
    FConst,
    DConst,
    AConst,
    /// Deprecated unsigned constant.
    IUConst,

    // Loads and stores
    BLoad,
    SLoad,
    ILoad,
    LLoad,
    FLoad,
    DLoad,
    ALoad,
    IStore,
    LStore,
    FStore,
    DStore,
    AStore,
    IRegLoad,
    LRegLoad,
    ARegLoad,

    // Arithmetic
    IAdd,
    ISub,
    IMul,
    IDiv,
    INeg,
    IAnd,
    IOr,
    IXor,
    /// Deprecated unsigned add.
    IUAdd,
    LAdd,
    LSub,
    LMul,
    FAdd,
    FMul,
    DAdd,
    DMul,

    // Address arithmetic
    AIAdd,
    AIUAdd,
    ALAdd,

    // Conversions
    I2L,
    L2I,
    I2F,
    F2I,
    I2D,
    D2I,
    B2I,
    S2I,
    I2B,
    I2S,

    // Comparisons
    ICmpEq,
    ICmpNe,
    ICmpLt,

    // Control flow
    IfICmpEq,
    IfICmpNe,
    IfICmpLt,
    Goto,
    Return,
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,

    // Calls and checks
    Call,
    ICall,
    LCall,
    DCall,
    ACall,
    NullChk,
}

/// Static properties of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpCodeProperties {
    pub name: &'static str,
    pub data_type: DataType,
    /// `None` when the opcode does not constrain its arity.
    pub child_count: Option<u8>,
    pub child_types: &'static [ChildType],
    pub is_treetop: bool,
    pub can_have_glregdeps: bool,
    pub is_commutative: bool,
    pub is_load_const: bool,
    pub is_deprecated: bool,
    pub has_symbol: bool,
}

const U: ChildType = ChildType::Unspecified;
const I8: ChildType = ChildType::Exactly(DataType::Int8);
const I16: ChildType = ChildType::Exactly(DataType::Int16);
const I32: ChildType = ChildType::Exactly(DataType::Int32);
const I64: ChildType = ChildType::Exactly(DataType::Int64);
const F32: ChildType = ChildType::Exactly(DataType::Float);
const F64: ChildType = ChildType::Exactly(DataType::Double);
const ADDR: ChildType = ChildType::Exactly(DataType::Address);

const fn base(name: &'static str, data_type: DataType) -> OpCodeProperties {
    OpCodeProperties {
        name,
        data_type,
        child_count: None,
        child_types: &[],
        is_treetop: false,
        can_have_glregdeps: false,
        is_commutative: false,
        is_load_const: false,
        is_deprecated: false,
        has_symbol: false,
    }
}

const fn children(mut p: OpCodeProperties, types: &'static [ChildType]) -> OpCodeProperties {
    p.child_count = Some(types.len() as u8);
    p.child_types = types;
    p
}

const fn leaf(p: OpCodeProperties) -> OpCodeProperties {
    children(p, &[])
}

const fn treetop(mut p: OpCodeProperties) -> OpCodeProperties {
    p.is_treetop = true;
    p
}

const fn glregdeps(mut p: OpCodeProperties) -> OpCodeProperties {
    p.can_have_glregdeps = true;
    p
}

const fn commutative(mut p: OpCodeProperties) -> OpCodeProperties {
    p.is_commutative = true;
    p
}

const fn constant(mut p: OpCodeProperties) -> OpCodeProperties {
    p.is_load_const = true;
    leaf(p)
}

const fn deprecated(mut p: OpCodeProperties) -> OpCodeProperties {
    p.is_deprecated = true;
    p
}

const fn symbol(mut p: OpCodeProperties) -> OpCodeProperties {
    p.has_symbol = true;
    p
}

impl OpCode {
    pub const ALL: &'static [OpCode] = &[
        OpCode::BBStart, OpCode::BBEnd, OpCode::GlRegDeps, OpCode::Treetop, OpCode::PassThrough,
        OpCode::BConst, OpCode::SConst, OpCode::IConst, OpCode::LConst, OpCode::FConst,
        OpCode::DConst, OpCode::AConst, OpCode::IUConst,
        OpCode::BLoad, OpCode::SLoad, OpCode::ILoad, OpCode::LLoad, OpCode::FLoad, OpCode::DLoad,
        OpCode::ALoad, OpCode::IStore, OpCode::LStore, OpCode::FStore, OpCode::DStore,
        OpCode::AStore, OpCode::IRegLoad, OpCode::LRegLoad, OpCode::ARegLoad,
        OpCode::IAdd, OpCode::ISub, OpCode::IMul, OpCode::IDiv, OpCode::INeg, OpCode::IAnd,
        OpCode::IOr, OpCode::IXor, OpCode::IUAdd, OpCode::LAdd, OpCode::LSub, OpCode::LMul,
        OpCode::FAdd, OpCode::FMul, OpCode::DAdd, OpCode::DMul,
        OpCode::AIAdd, OpCode::AIUAdd, OpCode::ALAdd,
        OpCode::I2L, OpCode::L2I, OpCode::I2F, OpCode::F2I, OpCode::I2D, OpCode::D2I,
        OpCode::B2I, OpCode::S2I, OpCode::I2B, OpCode::I2S,
        OpCode::ICmpEq, OpCode::ICmpNe, OpCode::ICmpLt,
        OpCode::IfICmpEq, OpCode::IfICmpNe, OpCode::IfICmpLt, OpCode::Goto,
        OpCode::Return, OpCode::IReturn, OpCode::LReturn, OpCode::FReturn, OpCode::DReturn,
        OpCode::AReturn,
        OpCode::Call, OpCode::ICall, OpCode::LCall, OpCode::DCall, OpCode::ACall, OpCode::NullChk,
    ];

    pub fn properties(self) -> OpCodeProperties {
        use DataType::*;
        match self {
            OpCode::BBStart => glregdeps(treetop(leaf(base("BBStart", NoType)))),
            OpCode::BBEnd => glregdeps(treetop(leaf(base("BBEnd", NoType)))),
            OpCode::GlRegDeps => base("GlRegDeps", NoType),
            OpCode::Treetop => treetop(children(base("treetop", NoType), &[U])),
            OpCode::PassThrough => children(base("PassThrough", NoType), &[U]),

            OpCode::BConst => constant(base("bconst", Int8)),
            OpCode::SConst => constant(base("sconst", Int16)),
            OpCode::IConst => constant(base("iconst", Int32)),
            OpCode::LConst => constant(base("lconst", Int64)),
            OpCode::FConst => constant(base("fconst", Float)),
            OpCode::DConst => constant(base("dconst", Double)),
            OpCode::AConst => constant(base("aconst", Address)),
            OpCode::IUConst => deprecated(constant(base("iuconst", Int32))),

            OpCode::BLoad => symbol(leaf(base("bload", Int8))),
            OpCode::SLoad => symbol(leaf(base("sload", Int16))),
            OpCode::ILoad => symbol(leaf(base("iload", Int32))),
            OpCode::LLoad => symbol(leaf(base("lload", Int64))),
            OpCode::FLoad => symbol(leaf(base("fload", Float))),
            OpCode::DLoad => symbol(leaf(base("dload", Double))),
            OpCode::ALoad => symbol(leaf(base("aload", Address))),
            OpCode::IStore => symbol(treetop(children(base("istore", NoType), &[I32]))),
            OpCode::LStore => symbol(treetop(children(base("lstore", NoType), &[I64]))),
            OpCode::FStore => symbol(treetop(children(base("fstore", NoType), &[F32]))),
            OpCode::DStore => symbol(treetop(children(base("dstore", NoType), &[F64]))),
            OpCode::AStore => symbol(treetop(children(base("astore", NoType), &[ADDR]))),
            OpCode::IRegLoad => leaf(base("iRegLoad", Int32)),
            OpCode::LRegLoad => leaf(base("lRegLoad", Int64)),
            OpCode::ARegLoad => leaf(base("aRegLoad", Address)),

            OpCode::IAdd => commutative(children(base("iadd", Int32), &[I32, I32])),
            OpCode::ISub => children(base("isub", Int32), &[I32, I32]),
            OpCode::IMul => commutative(children(base("imul", Int32), &[I32, I32])),
            OpCode::IDiv => children(base("idiv", Int32), &[I32, I32]),
            OpCode::INeg => children(base("ineg", Int32), &[I32]),
            OpCode::IAnd => commutative(children(base("iand", Int32), &[I32, I32])),
            OpCode::IOr => commutative(children(base("ior", Int32), &[I32, I32])),
            OpCode::IXor => commutative(children(base("ixor", Int32), &[I32, I32])),
            OpCode::IUAdd => deprecated(commutative(children(base("iuadd", Int32), &[I32, I32]))),
            OpCode::LAdd => commutative(children(base("ladd", Int64), &[I64, I64])),
            OpCode::LSub => children(base("lsub", Int64), &[I64, I64]),
            OpCode::LMul => commutative(children(base("lmul", Int64), &[I64, I64])),
            OpCode::FAdd => commutative(children(base("fadd", Float), &[F32, F32])),
            OpCode::FMul => commutative(children(base("fmul", Float), &[F32, F32])),
            OpCode::DAdd => commutative(children(base("dadd", Double), &[F64, F64])),
            OpCode::DMul => commutative(children(base("dmul", Double), &[F64, F64])),

            OpCode::AIAdd => children(base("aiadd", Address), &[ADDR, I32]),
            OpCode::AIUAdd => children(base("aiuadd", Address), &[ADDR, I32]),
            OpCode::ALAdd => children(base("aladd", Address), &[ADDR, I64]),

            OpCode::I2L => children(base("i2l", Int64), &[I32]),
            OpCode::L2I => children(base("l2i", Int32), &[I64]),
            OpCode::I2F => children(base("i2f", Float), &[I32]),
            OpCode::F2I => children(base("f2i", Int32), &[F32]),
            OpCode::I2D => children(base("i2d", Double), &[I32]),
            OpCode::D2I => children(base("d2i", Int32), &[F64]),
            OpCode::B2I => children(base("b2i", Int32), &[I8]),
            OpCode::S2I => children(base("s2i", Int32), &[I16]),
            OpCode::I2B => children(base("i2b", Int8), &[I32]),
            OpCode::I2S => children(base("i2s", Int16), &[I32]),

            OpCode::ICmpEq => commutative(children(base("icmpeq", Int32), &[I32, I32])),
            OpCode::ICmpNe => commutative(children(base("icmpne", Int32), &[I32, I32])),
            OpCode::ICmpLt => children(base("icmplt", Int32), &[I32, I32]),

            OpCode::IfICmpEq => glregdeps(treetop(children(base("ificmpeq", NoType), &[I32, I32]))),
            OpCode::IfICmpNe => glregdeps(treetop(children(base("ificmpne", NoType), &[I32, I32]))),
            OpCode::IfICmpLt => glregdeps(treetop(children(base("ificmplt", NoType), &[I32, I32]))),
            OpCode::Goto => glregdeps(treetop(leaf(base("goto", NoType)))),
            OpCode::Return => treetop(leaf(base("return", NoType))),
            // Narrow integer returns are checked by a dedicated rule.
            OpCode::IReturn => treetop(children(base("ireturn", NoType), &[U])),
            OpCode::LReturn => treetop(children(base("lreturn", NoType), &[I64])),
            OpCode::FReturn => treetop(children(base("freturn", NoType), &[F32])),
            OpCode::DReturn => treetop(children(base("dreturn", NoType), &[F64])),
            OpCode::AReturn => treetop(children(base("areturn", NoType), &[ADDR])),

            OpCode::Call => treetop(base("call", NoType)),
            OpCode::ICall => base("icall", Int32),
            OpCode::LCall => base("lcall", Int64),
            OpCode::DCall => base("dcall", Double),
            OpCode::ACall => base("acall", Address),
            OpCode::NullChk => treetop(children(base("NULLCHK", NoType), &[U])),
        }
    }

    pub fn name(self) -> &'static str {
        self.properties().name
    }

    pub fn data_type(self) -> DataType {
        self.properties().data_type
    }

    pub fn expected_child_count(self) -> Option<usize> {
        self.properties().child_count.map(usize::from)
    }

    /// Expected type of child `index`. Positions past the table are unconstrained.
    pub fn expected_child_type(self, index: usize) -> ChildType {
        self.properties()
            .child_types
            .get(index)
            .copied()
            .unwrap_or(ChildType::Unspecified)
    }

    pub fn is_treetop(self) -> bool {
        self.properties().is_treetop
    }

    pub fn can_have_glregdeps(self) -> bool {
        self.properties().can_have_glregdeps
    }

    pub fn is_commutative(self) -> bool {
        self.properties().is_commutative
    }

    pub fn is_load_const(self) -> bool {
        self.properties().is_load_const
    }

    pub fn is_deprecated(self) -> bool {
        self.properties().is_deprecated
    }

    pub fn has_symbol(self) -> bool {
        self.properties().has_symbol
    }

    /// Look up an opcode by its IL name (`iadd`, `BBStart`, ...).
    pub fn from_name(name: &str) -> Option<OpCode> {
        OpCode::ALL.iter().copied().find(|op| op.name() == name)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
