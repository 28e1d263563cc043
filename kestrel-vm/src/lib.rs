//! Kestrel virtual machine
//!
//! A 16-bit word machine with 32K words of memory, eight registers, an
//! unbounded stack, and a 22-instruction ISA.  The complete machine state can
//! be written to (and restored from) a checkpoint file; see [`snapshot`].
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod disasm;
pub mod op;
pub mod snapshot;
mod stack;
pub mod value;
mod vm;

pub use op::Op;
pub use snapshot::SnapshotError;
pub use stack::{INITIAL_CAPACITY, MAX_CAPACITY, Resize, Stack};
pub use value::Value;
pub use vm::{Exit, Fault, LoadError, Signal, Vm};

/// Number of words of memory
pub const MEM_SIZE: usize = 32768;

/// Number of registers
pub const REGISTER_COUNT: usize = 8;

/// Operand word which refers to register 0
pub const REGISTER_BASE: u16 = 32768;

/// Modulus for arithmetic instructions
pub const MODULO: u16 = 32768;

/// Mask applied to every value stored into a register
pub const VALUE_MASK: u16 = 0x7FFF;

/// Result of reading a byte from a [`Device`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// A byte of input
    Byte(u8),
    /// The input stream is closed
    Eof,
    /// A checkpoint was requested while waiting for input
    Checkpoint,
}

/// Trait for the machine's I/O peripheral
pub trait Device {
    /// Reads a single byte, blocking until one is available
    fn read(&mut self) -> Input;

    /// Writes a single byte
    fn write(&mut self, byte: u8);

    /// Checks whether a checkpoint has been requested
    ///
    /// This is polled before every instruction.
    fn checkpoint_requested(&self) -> bool {
        false
    }
}

/// Device which does nothing, and whose input is always closed
pub struct EmptyDevice;
impl Device for EmptyDevice {
    fn read(&mut self) -> Input {
        Input::Eof
    }
    fn write(&mut self, _byte: u8) {
        // nothing to do here
    }
}

/// Device with scripted input and captured output
#[derive(Default)]
pub struct BufferDevice {
    /// Pending input bytes
    pub input: std::collections::VecDeque<u8>,
    /// Bytes written by the program
    pub output: Vec<u8>,
    /// Returns [`Input::Checkpoint`] once the input is exhausted
    pub checkpoint_on_eof: bool,
}

impl BufferDevice {
    /// Builds a new device with the given input
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Returns the output as a (lossy) string
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Device for BufferDevice {
    fn read(&mut self) -> Input {
        match self.input.pop_front() {
            Some(c) => Input::Byte(c),
            None if self.checkpoint_on_eof => Input::Checkpoint,
            None => Input::Eof,
        }
    }
    fn write(&mut self, byte: u8) {
        self.output.push(byte);
    }
}
