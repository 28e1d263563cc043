//! Checkpoint files
//!
//! A checkpoint is the complete machine state, stored as a flat sequence of
//! little-endian fields:
//!
//! ```text
//! memory          32768 × u16
//! registers           8 × u16
//! stack_used              u32
//! stack_capacity          u32
//! stack_data   stack_used × u16
//! pc                      u32
//! ```
use crate::{MAX_CAPACITY, MEM_SIZE, REGISTER_BASE, REGISTER_COUNT, Stack, Vm};
use log::{debug, warn};
use static_assertions::{const_assert, const_assert_eq};
use std::io::Write;
use std::path::Path;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    little_endian::{U16, U32},
};

/// Default file name used when a checkpoint is requested
pub const DEFAULT_PATH: &str = "latest.dump";

#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct StackHeader {
    used: U32,
    capacity: U32,
}
const_assert_eq!(std::mem::size_of::<StackHeader>(), 8);
const_assert_eq!(std::mem::size_of::<[U16; MEM_SIZE]>(), 65536);
const_assert!(MAX_CAPACITY <= u32::MAX as usize);
const_assert!(MEM_SIZE <= u32::MAX as usize);

/// Error when decoding a checkpoint
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The checkpoint file could not be read
    #[error("could not read checkpoint")]
    Io(#[from] std::io::Error),

    /// The input ended in the middle of the given field
    #[error("checkpoint is truncated in `{0}`")]
    Truncated(&'static str),

    /// The stack has more items than its capacity, or no capacity at all
    #[error("invalid stack: {used} items with capacity {capacity}")]
    InvalidStack {
        /// Number of saved items
        used: u32,
        /// Saved capacity
        capacity: u32,
    },

    /// The stack capacity is larger than the machine can allocate
    #[error("stack capacity {0} exceeds the maximum of {MAX_CAPACITY}")]
    StackTooLarge(u32),

    /// The program counter is past the end of memory
    #[error("program counter {0} is out of range")]
    InvalidPc(u32),

    /// A register holds a value outside of the 15-bit domain
    #[error("register {index} holds invalid value {value}")]
    InvalidRegister {
        /// Register index
        index: usize,
        /// Saved value
        value: u16,
    },
}

impl Vm {
    /// Writes a checkpoint of the complete machine state
    pub fn write_snapshot<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        w.write_all(&self.to_snapshot())
    }

    /// Returns a checkpoint of the complete machine state
    pub fn to_snapshot(&self) -> Vec<u8> {
        let items = self.stack.as_slice();
        // Stack sizes are at most MAX_CAPACITY and pc is at most a word
        let header = StackHeader {
            used: U32::new(items.len() as u32),
            capacity: U32::new(self.stack.capacity() as u32),
        };
        let pc = U32::new(self.pc as u32);

        let mut out = Vec::with_capacity(
            (MEM_SIZE + REGISTER_COUNT + items.len()) * 2 + 12,
        );
        for &v in self.memory.iter() {
            out.extend_from_slice(U16::new(v).as_bytes());
        }
        out.extend_from_slice(self.registers.map(U16::new).as_bytes());
        out.extend_from_slice(header.as_bytes());
        for &v in items {
            out.extend_from_slice(U16::new(v).as_bytes());
        }
        out.extend_from_slice(pc.as_bytes());
        out
    }

    /// Rebuilds a machine from a checkpoint
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (memory, rest) = <[U16; MEM_SIZE]>::ref_from_prefix(bytes)
            .map_err(|_| SnapshotError::Truncated("memory"))?;
        let (registers, rest) = <[U16; REGISTER_COUNT]>::read_from_prefix(rest)
            .map_err(|_| SnapshotError::Truncated("registers"))?;
        let (header, rest) = StackHeader::read_from_prefix(rest)
            .map_err(|_| SnapshotError::Truncated("stack header"))?;
        let used = header.used.get();
        let capacity = header.capacity.get();
        let (items, rest) =
            <[U16]>::ref_from_prefix_with_elems(rest, used as usize)
                .map_err(|_| SnapshotError::Truncated("stack data"))?;
        let (pc, rest) = U32::read_from_prefix(rest)
            .map_err(|_| SnapshotError::Truncated("program counter"))?;
        if !rest.is_empty() {
            warn!("ignoring {} trailing bytes in checkpoint", rest.len());
        }

        let mut vm = Vm::new();
        for (m, w) in vm.memory.iter_mut().zip(memory) {
            *m = w.get();
        }
        let regs = vm.registers.iter_mut().zip(registers);
        for (index, (r, w)) in regs.enumerate() {
            let value = w.get();
            if value >= REGISTER_BASE {
                return Err(SnapshotError::InvalidRegister { index, value });
            }
            *r = value;
        }
        if capacity as usize > MAX_CAPACITY {
            return Err(SnapshotError::StackTooLarge(capacity));
        }
        let items: Vec<u16> = items.iter().map(|w| w.get()).collect();
        vm.stack = Stack::from_parts(&items, capacity as usize)
            .ok_or(SnapshotError::InvalidStack { used, capacity })?;
        vm.pc = match pc.get() {
            p if p as usize <= MEM_SIZE => p as usize,
            p => return Err(SnapshotError::InvalidPc(p)),
        };
        Ok(vm)
    }
}

/// Writes a checkpoint to the given path
pub fn save(vm: &Vm, path: &Path) -> std::io::Result<()> {
    let f = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(f);
    vm.write_snapshot(&mut w)?;
    w.flush()?;
    debug!("saved checkpoint to {path:?} at address {}", vm.pc);
    Ok(())
}

/// Reads a checkpoint from the given path
pub fn load(path: &Path) -> Result<Vm, SnapshotError> {
    let data = std::fs::read(path)?;
    let vm = Vm::from_snapshot(&data)?;
    debug!("loaded checkpoint from {path:?} at address {}", vm.pc);
    Ok(vm)
}
