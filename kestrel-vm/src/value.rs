use crate::{MODULO, REGISTER_BASE, REGISTER_COUNT};

/// A decoded operand word
///
/// Words in `0..32768` are literals; `32768..32776` name one of the eight
/// registers.  Anything above that is not a valid operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A literal number in `0..32768`
    Literal(u16),
    /// A register index in `0..8`
    Register(u8),
}

impl Value {
    /// Decodes a raw word, returning `None` if it is out of range
    #[inline]
    pub fn decode(word: u16) -> Option<Self> {
        if word < REGISTER_BASE {
            Some(Value::Literal(word))
        } else if let Some(r) = register_index(word) {
            Some(Value::Register(r))
        } else {
            None
        }
    }

    /// Resolves the value against the given register file
    #[inline]
    pub fn get(self, registers: &[u16; REGISTER_COUNT]) -> u16 {
        match self {
            Value::Literal(v) => v,
            Value::Register(r) => registers[usize::from(r)],
        }
    }

    /// Returns the raw word which encodes this value
    #[inline]
    pub fn word(self) -> u16 {
        match self {
            Value::Literal(v) => v,
            Value::Register(r) => REGISTER_BASE + u16::from(r),
        }
    }
}

/// Resolves a raw operand word
///
/// Literals resolve to themselves and register references to the register's
/// current value.  Returns `None` for words above the last register.
#[inline]
pub fn resolve(word: u16, registers: &[u16; REGISTER_COUNT]) -> Option<u16> {
    Value::decode(word).map(|v| v.get(registers))
}

/// Returns the register named by `word`, if it is a register reference
#[inline]
pub fn register_index(word: u16) -> Option<u8> {
    word.checked_sub(REGISTER_BASE)
        .filter(|r| usize::from(*r) < REGISTER_COUNT)
        .map(|r| r as u8)
}

/// Wraps a value into the 15-bit number domain
#[inline]
pub fn wrap(v: u32) -> u16 {
    (v % u32::from(MODULO)) as u16
}
