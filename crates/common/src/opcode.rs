//! Opcode definitions for the wordvm instruction set.
//!
//! Every instruction is one opcode byte, optionally followed by a 16-bit
//! little-endian immediate (the `*_imm` opcodes). Stack effects are written
//! Forth-style: `( before -- after )`, rightmost item on top.

/// Identifies the operation to perform.
///
/// The `#[repr(u8)]` discriminant is the byte value in the code stream.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation.
    Nop = 0,

    // Arithmetic: ( l r -- l OP r )
    /// Wrapping addition.
    Add = 1,
    /// Wrapping subtraction.
    Sub = 2,
    /// Wrapping multiplication.
    Mul = 3,
    /// Truncating division. A zero divisor traps.
    Div = 4,

    // Stack-addressed control flow
    /// `( test then else -- )` jump to `then` if test is non-zero, else `else`.
    If = 5,
    /// `( addr -- )` unconditional jump.
    Jump = 6,
    /// `( addr -- )` push the return address, jump.
    Call = 7,
    /// Return to the caller, or finish execution at top level.
    Return = 8,

    // Modules
    /// `( module fn -- ... )` call a system-module function.
    ExternCall = 9,

    // Memory
    /// `( addr -- word )` little-endian 16-bit load.
    LoadWord = 10,
    /// `( value addr -- )` little-endian 16-bit store.
    StoreWord = 11,
    /// `( -- imm )` push the 16-bit immediate.
    PushImm = 12,
    /// `( name_ptr -- module )` resolve a NUL-terminated module name.
    LoadModule = 13,
    /// `( addr -- byte )` zero-extended 8-bit load.
    LoadByte = 14,
    /// `( value addr -- )` stores the low byte of `value`.
    StoreByte = 15,

    // Immediate control flow
    /// Jump to the immediate.
    JumpImm = 16,
    /// Push the return address, jump to the immediate.
    CallImm = 17,

    // Stack shuffles
    /// `( a -- a a )`
    Dup = 18,
    /// `( a b -- b a )`
    Swap = 19,
    /// `( a -- )`
    Drop = 20,
    /// `( a b -- a b a )`
    Over = 21,
    /// `( a b c -- b c a )`
    Rot = 22,
    /// `( a b -- a b a b )`
    Dup2 = 23,
    /// `( a b c d -- c d a b )`
    Swap2 = 24,
    /// `( a b c d -- a b c d a b )`
    Over2 = 25,
    /// `( a b -- )`
    Drop2 = 26,

    // Conditional branches
    /// `( test addr -- )` jump if test is non-zero.
    BTrue = 27,
    /// `( test -- )` jump to the immediate if test is non-zero.
    BTrueImm = 28,
    /// `( test addr -- )` jump if test is zero.
    BFalse = 29,
    /// `( test -- )` jump to the immediate if test is zero.
    BFalseImm = 30,

    // Return stack
    /// `( a -- ) R: ( -- a )`
    RPush = 31,
    /// `( -- a ) R: ( a -- )`
    RPop = 32,
    /// `( -- a ) R: ( a -- a )`
    RCopy = 33,
    /// `( -- a b ) R: ( a b -- a b )`
    RCopy2 = 34,

    // Integer extras
    /// Wrapping remainder. A zero divisor traps.
    Mod = 35,
    /// Shift left.
    Shl = 36,
    /// Arithmetic shift right.
    Shr = 37,

    // Comparison: ( l r -- flag ), flag is 1 or 0
    /// `l > r`
    Gt = 38,
    /// `l < r`
    Lt = 39,
    /// `l >= r`
    Ge = 40,
    /// `l <= r`
    Le = 41,
    /// `l == r`
    Eq = 42,
    /// `l != r`
    Neq = 43,

    /// `( a -- a+1 )`
    Inc = 44,
}

/// All opcodes, in byte order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 45] = [
    Opcode::Nop,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::If,
    Opcode::Jump,
    Opcode::Call,
    Opcode::Return,
    Opcode::ExternCall,
    Opcode::LoadWord,
    Opcode::StoreWord,
    Opcode::PushImm,
    Opcode::LoadModule,
    Opcode::LoadByte,
    Opcode::StoreByte,
    Opcode::JumpImm,
    Opcode::CallImm,
    Opcode::Dup,
    Opcode::Swap,
    Opcode::Drop,
    Opcode::Over,
    Opcode::Rot,
    Opcode::Dup2,
    Opcode::Swap2,
    Opcode::Over2,
    Opcode::Drop2,
    Opcode::BTrue,
    Opcode::BTrueImm,
    Opcode::BFalse,
    Opcode::BFalseImm,
    Opcode::RPush,
    Opcode::RPop,
    Opcode::RCopy,
    Opcode::RCopy2,
    Opcode::Mod,
    Opcode::Shl,
    Opcode::Shr,
    Opcode::Gt,
    Opcode::Lt,
    Opcode::Ge,
    Opcode::Le,
    Opcode::Eq,
    Opcode::Neq,
    Opcode::Inc,
];

/// Byte value is not an opcode. Carries the offending byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAnOpcode(pub u8);

impl TryFrom<u8> for Opcode {
    type Error = NotAnOpcode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        // The discriminants are dense from 0, so the table is indexable.
        ALL_OPCODES
            .get(value as usize)
            .copied()
            .ok_or(NotAnOpcode(value))
    }
}

impl Opcode {
    /// Number of immediate bytes following the opcode byte.
    pub fn immediate_len(self) -> usize {
        if self.has_immediate() {
            2
        } else {
            0
        }
    }

    /// Whether the opcode is followed by a 16-bit immediate.
    pub fn has_immediate(self) -> bool {
        matches!(
            self,
            Opcode::PushImm
                | Opcode::JumpImm
                | Opcode::CallImm
                | Opcode::BTrueImm
                | Opcode::BFalseImm
        )
    }

    /// Canonical lowercase mnemonic used by the assembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::If => "if",
            Opcode::Jump => "jump",
            Opcode::Call => "call",
            Opcode::Return => "return",
            Opcode::ExternCall => "extern_call",
            Opcode::LoadWord => "load_word",
            Opcode::StoreWord => "store_word",
            Opcode::PushImm => "push_imm",
            Opcode::LoadModule => "load_module",
            Opcode::LoadByte => "load_byte",
            Opcode::StoreByte => "store_byte",
            Opcode::JumpImm => "jump_imm",
            Opcode::CallImm => "call_imm",
            Opcode::Dup => "dup",
            Opcode::Swap => "swap",
            Opcode::Drop => "drop",
            Opcode::Over => "over",
            Opcode::Rot => "rot",
            Opcode::Dup2 => "dup2",
            Opcode::Swap2 => "swap2",
            Opcode::Over2 => "over2",
            Opcode::Drop2 => "drop2",
            Opcode::BTrue => "btrue",
            Opcode::BTrueImm => "btrue_imm",
            Opcode::BFalse => "bfalse",
            Opcode::BFalseImm => "bfalse_imm",
            Opcode::RPush => "rpush",
            Opcode::RPop => "rpop",
            Opcode::RCopy => "rcopy",
            Opcode::RCopy2 => "rcopy2",
            Opcode::Mod => "mod",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Gt => "gt",
            Opcode::Lt => "lt",
            Opcode::Ge => "ge",
            Opcode::Le => "le",
            Opcode::Eq => "eq",
            Opcode::Neq => "neq",
            Opcode::Inc => "inc",
        }
    }

    /// Look up an opcode by mnemonic or Forth-style alias.
    ///
    /// Matching is case-insensitive for the canonical names.
    pub fn from_mnemonic(word: &str) -> Option<Opcode> {
        let alias = match word {
            "+" => Some(Opcode::Add),
            "-" => Some(Opcode::Sub),
            "*" => Some(Opcode::Mul),
            "/" => Some(Opcode::Div),
            "%" => Some(Opcode::Mod),
            "@" => Some(Opcode::LoadWord),
            "!" => Some(Opcode::StoreWord),
            "c@" => Some(Opcode::LoadByte),
            "c!" => Some(Opcode::StoreByte),
            ">r" => Some(Opcode::RPush),
            "r>" => Some(Opcode::RPop),
            "r@" => Some(Opcode::RCopy),
            "2r@" => Some(Opcode::RCopy2),
            _ => None,
        };
        if alias.is_some() {
            return alias;
        }

        let lower = word.to_ascii_lowercase();
        if lower == "push" {
            return Some(Opcode::PushImm);
        }
        ALL_OPCODES.iter().find(|op| op.mnemonic() == lower).copied()
    }
}
