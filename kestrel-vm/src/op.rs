//! Instruction table
//!
//! Each opcode has a fixed mnemonic and operand count; operands are raw words
//! which follow the opcode in memory.  In the table below, `a` is always the
//! first operand, and a `reg[a]` destination must be a register reference.
//!
//! ```text
//! op  name  argc  effect
//!  0  halt  0     stop execution
//!  1  set   2     reg[a] = b
//!  2  push  1     push a onto the stack
//!  3  pop   1     reg[a] = pop (fault if empty)
//!  4  eq    3     reg[a] = b == c
//!  5  gt    3     reg[a] = b > c
//!  6  jmp   1     jump to a
//!  7  jt    2     if a != 0, jump to b
//!  8  jf    2     if a == 0, jump to b
//!  9  add   3     reg[a] = (b + c) % 32768
//! 10  mult  3     reg[a] = (b * c) % 32768
//! 11  mod   3     reg[a] = b % c (fault if c == 0)
//! 12  and   3     reg[a] = b & c
//! 13  or    3     reg[a] = b | c
//! 14  not   2     reg[a] = !b (15-bit)
//! 15  rmem  2     reg[a] = mem[b]
//! 16  wmem  2     mem[a] = b
//! 17  call  1     push next address, jump to a
//! 18  ret   0     pop address and jump (halt if empty)
//! 19  out   1     write a as a byte
//! 20  in    1     reg[a] = next input byte
//! 21  noop  0     nothing
//! ```

/// Number of opcodes in the instruction set
pub const COUNT: usize = 22;

/// Mnemonics, indexed by opcode
pub const NAMES: [&str; COUNT] = [
    "halt", "set", "push", "pop", "eq", "gt", "jmp", "jt", "jf", "add", "mult",
    "mod", "and", "or", "not", "rmem", "wmem", "call", "ret", "out", "in",
    "noop",
];

/// Operand counts, indexed by opcode
const ARGC: [usize; COUNT] =
    [0, 2, 1, 1, 3, 3, 1, 2, 2, 3, 3, 3, 3, 3, 2, 2, 2, 1, 0, 1, 1, 0];

/// A single opcode
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Op {
    Halt = 0,
    Set,
    Push,
    Pop,
    Eq,
    Gt,
    Jmp,
    Jt,
    Jf,
    Add,
    Mult,
    Mod,
    And,
    Or,
    Not,
    Rmem,
    Wmem,
    Call,
    Ret,
    Out,
    In,
    Noop,
}

impl Op {
    /// Every opcode, in numerical order
    pub const ALL: [Op; COUNT] = [
        Op::Halt,
        Op::Set,
        Op::Push,
        Op::Pop,
        Op::Eq,
        Op::Gt,
        Op::Jmp,
        Op::Jt,
        Op::Jf,
        Op::Add,
        Op::Mult,
        Op::Mod,
        Op::And,
        Op::Or,
        Op::Not,
        Op::Rmem,
        Op::Wmem,
        Op::Call,
        Op::Ret,
        Op::Out,
        Op::In,
        Op::Noop,
    ];

    /// Looks up an opcode, returning `None` if `word >= 22`
    #[inline]
    pub fn decode(word: u16) -> Option<Self> {
        Self::ALL.get(usize::from(word)).copied()
    }

    /// Looks up an opcode by mnemonic
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES.iter().position(|n| *n == name).map(|i| Self::ALL[i])
    }

    /// Returns the mnemonic
    #[inline]
    pub fn name(self) -> &'static str {
        NAMES[self as usize]
    }

    /// Returns the number of operand words that follow the opcode
    #[inline]
    pub fn argc(self) -> usize {
        ARGC[self as usize]
    }

    /// Returns the opcode's numeric value
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Checks whether the first operand is a register destination
    #[inline]
    pub fn writes_register(self) -> bool {
        matches!(
            self,
            Op::Set
                | Op::Pop
                | Op::Eq
                | Op::Gt
                | Op::Add
                | Op::Mult
                | Op::Mod
                | Op::And
                | Op::Or
                | Op::Not
                | Op::Rmem
                | Op::In
        )
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}
