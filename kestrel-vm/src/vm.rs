use crate::{
    Device, Input, MEM_SIZE, REGISTER_COUNT, VALUE_MASK, op::Op, stack::Stack,
    value::{Value, resolve, wrap},
};
use log::warn;
use zerocopy::{FromBytes, little_endian::U16};

/// Runtime fault, which stops execution
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// The word at the instruction pointer is not a valid opcode
    #[error("invalid instruction {op} at address {addr}")]
    InvalidOpcode {
        /// Offending word
        op: u16,
        /// Address of the word
        addr: usize,
    },

    /// An operand is neither a literal nor a register reference
    #[error("invalid operand {value} for `{op}` at address {addr}")]
    InvalidValue {
        /// Instruction being executed
        op: Op,
        /// Offending operand word
        value: u16,
        /// Address of the instruction
        addr: usize,
    },

    /// A destination operand is a literal instead of a register
    #[error("`{op}` at address {addr} cannot write to literal {value}")]
    NotARegister {
        /// Instruction being executed
        op: Op,
        /// Offending operand word
        value: u16,
        /// Address of the instruction
        addr: usize,
    },

    /// The instruction's operands run past the end of memory
    #[error("`{op}` at address {addr} is truncated by the end of memory")]
    Truncated {
        /// Instruction being executed
        op: Op,
        /// Address of the instruction
        addr: usize,
    },

    /// A memory access is outside of memory
    #[error("`{op}` at address {addr} accesses invalid address {target}")]
    AddressOutOfRange {
        /// Instruction being executed
        op: Op,
        /// Address which was accessed
        target: usize,
        /// Address of the instruction
        addr: usize,
    },

    /// `pop` with an empty stack
    #[error("stack underflow at address {addr}")]
    StackUnderflow {
        /// Address of the instruction
        addr: usize,
    },

    /// `push` or `call` with a full stack buffer
    #[error("stack overflow at address {addr}")]
    StackOverflow {
        /// Address of the instruction
        addr: usize,
    },

    /// `mod` with a divisor of zero
    #[error("division by zero at address {addr}")]
    DivideByZero {
        /// Address of the instruction
        addr: usize,
    },

    /// The stack has more items than its capacity
    #[error("stack corrupt: {used} items with capacity {capacity}")]
    StackCorrupt {
        /// Number of items
        used: usize,
        /// Allocated capacity
        capacity: usize,
    },
}

/// Error when loading a program
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The program is not a whole number of words
    #[error("program length {0} is not a multiple of 2 bytes")]
    OddLength(usize),

    /// The program does not fit in memory
    #[error("program is {0} words, but memory is only {MEM_SIZE} words")]
    TooLarge(usize),
}

/// Completion signal from a single instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Keep running
    Continue,
    /// Stop normally
    Halt,
    /// Stop so that the machine state can be saved
    Checkpoint,
}

/// Reason that [`Vm::run`] returned without a fault
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    /// `halt`, `ret` with an empty stack, end of input, or end of memory
    Halted,
    /// A checkpoint was requested
    Checkpoint,
    /// The predicate passed to [`Vm::run_until`] returned `true`
    Paused,
}

/// Decoded instruction with raw operand words
#[derive(Copy, Clone, Debug)]
struct Instr {
    op: Op,
    addr: usize,
    args: [u16; 3],
}

/// The virtual machine itself
#[derive(Clone)]
pub struct Vm {
    pub(crate) memory: Box<[u16; MEM_SIZE]>,
    pub(crate) registers: [u16; REGISTER_COUNT],
    pub(crate) stack: Stack,
    /// Index of the next word to fetch, in `0..=MEM_SIZE`
    pub(crate) pc: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("registers", &self.registers)
            .field("stack", &self.stack)
            .field("pc", &self.pc)
            .finish_non_exhaustive()
    }
}

impl Vm {
    /// Builds a machine with zeroed memory and registers and an empty stack
    pub fn new() -> Self {
        Self {
            memory: Box::new([0u16; MEM_SIZE]),
            registers: [0; REGISTER_COUNT],
            stack: Stack::new(),
            pc: 0,
        }
    }

    /// Builds a machine from a program file's contents
    ///
    /// The program is a sequence of little-endian words, loaded at address 0.
    pub fn load(rom: &[u8]) -> Result<Self, LoadError> {
        let words = <[U16]>::ref_from_bytes(rom)
            .map_err(|_| LoadError::OddLength(rom.len()))?;
        let mut vm = Self::new();
        if words.len() > MEM_SIZE {
            return Err(LoadError::TooLarge(words.len()));
        }
        for (m, w) in vm.memory.iter_mut().zip(words) {
            *m = w.get();
        }
        Ok(vm)
    }

    /// Builds a machine with the given words loaded at address 0
    pub fn from_words(words: &[u16]) -> Result<Self, LoadError> {
        if words.len() > MEM_SIZE {
            return Err(LoadError::TooLarge(words.len()));
        }
        let mut vm = Self::new();
        vm.memory[..words.len()].copy_from_slice(words);
        Ok(vm)
    }

    /// Shared borrow of the entire memory array
    #[inline]
    pub fn memory(&self) -> &[u16; MEM_SIZE] {
        &self.memory
    }

    /// Mutably borrows the entire memory array
    #[inline]
    pub fn memory_mut(&mut self) -> &mut [u16; MEM_SIZE] {
        &mut self.memory
    }

    /// Returns the register file
    #[inline]
    pub fn registers(&self) -> &[u16; REGISTER_COUNT] {
        &self.registers
    }

    /// Sets a register, wrapping the value into the 15-bit domain
    ///
    /// # Panics
    /// If `r >= 8`
    #[inline]
    pub fn set_register(&mut self, r: usize, v: u16) {
        self.registers[r] = v & VALUE_MASK;
    }

    /// Shared borrow of the stack
    #[inline]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Mutable borrow of the stack
    #[inline]
    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Returns the instruction pointer
    #[inline]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Moves the instruction pointer
    ///
    /// # Panics
    /// If `pc` is past the end of memory
    #[inline]
    pub fn set_pc(&mut self, pc: usize) {
        assert!(pc <= MEM_SIZE, "pc {pc} is out of range");
        self.pc = pc;
    }

    /// Runs until the machine halts, faults, or is asked for a checkpoint
    pub fn run<D: Device + ?Sized>(
        &mut self,
        dev: &mut D,
    ) -> Result<Exit, Fault> {
        self.run_until(dev, |_, _| false)
    }

    /// Runs until the machine stops, or the predicate returns `true`
    ///
    /// The predicate is called before each instruction with the machine and
    /// the number of instructions executed so far.
    pub fn run_until<D, F>(
        &mut self,
        dev: &mut D,
        mut f: F,
    ) -> Result<Exit, Fault>
    where
        D: Device + ?Sized,
        F: FnMut(&Vm, usize) -> bool,
    {
        // A restored stack may be full; give it room before the first push
        self.stack.reconcile()?;
        let mut i = 0;
        loop {
            if dev.checkpoint_requested() {
                return Ok(Exit::Checkpoint);
            }
            if f(self, i) {
                return Ok(Exit::Paused);
            }
            match self.step(dev)? {
                Signal::Continue => (),
                Signal::Halt => return Ok(Exit::Halted),
                Signal::Checkpoint => return Ok(Exit::Checkpoint),
            }
            i += 1;
        }
    }

    /// Executes a single instruction
    ///
    /// Reaching the end of memory is a normal halt.
    pub fn step<D: Device + ?Sized>(
        &mut self,
        dev: &mut D,
    ) -> Result<Signal, Fault> {
        let addr = self.pc;
        let Some(&word) = self.memory.get(addr) else {
            return Ok(Signal::Halt);
        };
        let op =
            Op::decode(word).ok_or(Fault::InvalidOpcode { op: word, addr })?;

        let start = addr + 1;
        let end = start + op.argc();
        let words = self
            .memory
            .get(start..end)
            .ok_or(Fault::Truncated { op, addr })?;
        let mut args = [0u16; 3];
        args[..words.len()].copy_from_slice(words);

        // Advance past the operands before executing, so that `call` pushes
        // the address of the following instruction
        self.pc = end;
        let signal = self.execute(Instr { op, addr, args }, dev)?;
        self.stack.reconcile()?;
        Ok(signal)
    }

    /// Resolves operand `n` to a number
    #[inline]
    fn arg(&self, i: &Instr, n: usize) -> Result<u16, Fault> {
        let w = i.args[n];
        resolve(w, &self.registers).ok_or(Fault::InvalidValue {
            op: i.op,
            value: w,
            addr: i.addr,
        })
    }

    /// Returns the register index of the destination operand
    #[inline]
    fn dest(&self, i: &Instr) -> Result<usize, Fault> {
        let w = i.args[0];
        match Value::decode(w) {
            Some(Value::Register(r)) => Ok(usize::from(r)),
            Some(Value::Literal(_)) => Err(Fault::NotARegister {
                op: i.op,
                value: w,
                addr: i.addr,
            }),
            None => Err(Fault::InvalidValue {
                op: i.op,
                value: w,
                addr: i.addr,
            }),
        }
    }

    /// Applies a binary operator, storing the result in the destination
    #[inline]
    fn binary(
        &mut self,
        i: &Instr,
        f: fn(u16, u16) -> u16,
    ) -> Result<Signal, Fault> {
        let r = self.dest(i)?;
        let b = self.arg(i, 1)?;
        let c = self.arg(i, 2)?;
        self.set_register(r, f(b, c));
        Ok(Signal::Continue)
    }

    /// Checks that `target` is a valid memory address
    #[inline]
    fn address(&self, i: &Instr, target: u16) -> Result<usize, Fault> {
        let target = usize::from(target);
        if target < MEM_SIZE {
            Ok(target)
        } else {
            Err(Fault::AddressOutOfRange {
                op: i.op,
                target,
                addr: i.addr,
            })
        }
    }

    fn execute<D: Device + ?Sized>(
        &mut self,
        i: Instr,
        dev: &mut D,
    ) -> Result<Signal, Fault> {
        match i.op {
            Op::Halt => return Ok(Signal::Halt),
            Op::Set => {
                let r = self.dest(&i)?;
                let v = self.arg(&i, 1)?;
                self.set_register(r, v);
            }
            Op::Push => {
                let v = self.arg(&i, 0)?;
                if !self.stack.push(v) {
                    return Err(Fault::StackOverflow { addr: i.addr });
                }
            }
            Op::Pop => {
                let r = self.dest(&i)?;
                let v = self
                    .stack
                    .pop()
                    .ok_or(Fault::StackUnderflow { addr: i.addr })?;
                self.set_register(r, v);
            }
            Op::Eq => return self.binary(&i, |b, c| u16::from(b == c)),
            Op::Gt => return self.binary(&i, |b, c| u16::from(b > c)),
            Op::Jmp => {
                self.pc = usize::from(self.arg(&i, 0)?);
            }
            Op::Jt => {
                let cond = self.arg(&i, 0)?;
                let dst = self.arg(&i, 1)?;
                if cond != 0 {
                    self.pc = usize::from(dst);
                }
            }
            Op::Jf => {
                let cond = self.arg(&i, 0)?;
                let dst = self.arg(&i, 1)?;
                if cond == 0 {
                    self.pc = usize::from(dst);
                }
            }
            Op::Add => {
                return self
                    .binary(&i, |b, c| wrap(u32::from(b) + u32::from(c)));
            }
            Op::Mult => {
                return self
                    .binary(&i, |b, c| wrap(u32::from(b) * u32::from(c)));
            }
            Op::Mod => {
                let r = self.dest(&i)?;
                let b = self.arg(&i, 1)?;
                let c = self.arg(&i, 2)?;
                if c == 0 {
                    return Err(Fault::DivideByZero { addr: i.addr });
                }
                self.set_register(r, b % c);
            }
            Op::And => return self.binary(&i, |b, c| b & c),
            Op::Or => return self.binary(&i, |b, c| b | c),
            Op::Not => {
                let r = self.dest(&i)?;
                let v = self.arg(&i, 1)?;
                self.set_register(r, VALUE_MASK ^ v);
            }
            Op::Rmem => {
                let r = self.dest(&i)?;
                let src = self.arg(&i, 1)?;
                let src = self.address(&i, src)?;
                self.set_register(r, self.memory[src]);
            }
            Op::Wmem => {
                let dst = self.arg(&i, 0)?;
                let dst = self.address(&i, dst)?;
                let v = self.arg(&i, 1)?;
                self.memory[dst] = v;
            }
            Op::Call => {
                let dst = self.arg(&i, 0)?;
                // `pc` is at most MEM_SIZE here, which fits in a word
                if !self.stack.push(self.pc as u16) {
                    return Err(Fault::StackOverflow { addr: i.addr });
                }
                self.pc = usize::from(dst);
            }
            Op::Ret => match self.stack.pop() {
                Some(dst) => self.pc = usize::from(dst),
                None => return Ok(Signal::Halt),
            },
            Op::Out => {
                let v = self.arg(&i, 0)?;
                dev.write(v as u8);
            }
            Op::In => {
                let r = self.dest(&i)?;
                match dev.read() {
                    Input::Byte(c) => self.set_register(r, u16::from(c)),
                    Input::Eof => {
                        warn!("input closed at address {}", i.addr);
                        return Ok(Signal::Halt);
                    }
                    Input::Checkpoint => {
                        // Re-execute this `in` after the state is restored
                        self.pc = i.addr;
                        return Ok(Signal::Checkpoint);
                    }
                }
            }
            Op::Noop => (),
        }
        Ok(Signal::Continue)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{BufferDevice, EmptyDevice, INITIAL_CAPACITY, MAX_CAPACITY};

    const R0: u16 = 32768;
    const R1: u16 = 32769;
    const R2: u16 = 32770;

    fn run(words: &[u16]) -> (Vm, Result<Exit, Fault>, BufferDevice) {
        run_with_input(words, b"")
    }

    fn run_with_input(
        words: &[u16],
        input: &[u8],
    ) -> (Vm, Result<Exit, Fault>, BufferDevice) {
        let mut vm = Vm::from_words(words).unwrap();
        let mut dev = BufferDevice::new(input);
        let r = vm.run(&mut dev);
        (vm, r, dev)
    }

    #[test]
    fn add_then_out() {
        let (vm, r, dev) = run(&[9, R0, R1, 4, 19, R0, 0]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(dev.output, vec![4]);
        assert_eq!(vm.registers()[0], 4);
        assert_eq!(vm.pc(), 7);
    }

    #[test]
    fn hello() {
        let mut prog = vec![];
        for c in b"hi\n" {
            prog.extend([19, u16::from(*c)]);
        }
        prog.push(0);
        let (_, r, dev) = run(&prog);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(dev.output_str(), "hi\n");
    }

    #[test]
    fn arithmetic_wraps() {
        let (vm, r, _) = run(&[
            9, R0, 32767, 32767, // add r0 32767 32767
            10, R1, 32767, 32767, // mult r1 32767 32767
            11, R2, 32767, 10, // mod r2 32767 10
            0,
        ]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(vm.registers()[0], 32766);
        assert_eq!(vm.registers()[1], 1);
        assert_eq!(vm.registers()[2], 7);
    }

    #[test]
    fn bitwise() {
        let (vm, r, _) = run(&[
            12, R0, 0b1100, 0b1010, // and
            13, R1, 0b1100, 0b1010, // or
            14, R2, 0, // not
            0,
        ]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(vm.registers()[0], 0b1000);
        assert_eq!(vm.registers()[1], 0b1110);
        assert_eq!(vm.registers()[2], 0x7FFF);
    }

    #[test]
    fn comparisons() {
        let (vm, r, _) = run(&[
            4, R0, 5, 5, // eq
            4, R1, 5, 6, // eq
            5, R2, 6, 5, // gt
            5, 32771, 5, 6, // gt
            0,
        ]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(&vm.registers()[..4], &[1, 0, 1, 0]);
    }

    #[test]
    fn memory_access() {
        let (vm, r, _) = run(&[
            16, 100, 1234, // wmem 100 1234
            15, R0, 100, // rmem r0 100
            0,
        ]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(vm.memory()[100], 1234);
        assert_eq!(vm.registers()[0], 1234);
    }

    #[test]
    fn rmem_masks_invalid_words() {
        let (vm, r, _) = run(&[15, R0, 4, 0, 0xFFFF]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(vm.registers()[0], 0x7FFF);
    }

    #[test]
    fn jumps() {
        let (vm, r, _) = run(&[
            7, 1, 6, // 0: jt 1 6
            0, 0, 0, // 3: (skipped)
            8, 1, 0, // 6: jf 1 0 (not taken)
            8, 0, 15, // 9: jf 0 15
            0, 0, 0, // 12: (skipped)
            1, R0, 42, // 15: set r0 42
            6, 22, // 18: jmp 22
            0, 0, // 20: (skipped)
            0, // 22: halt
        ]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(vm.registers()[0], 42);
        assert_eq!(vm.pc(), 23);
    }

    #[test]
    fn call_ret_round_trip() {
        let (vm, r, dev) = run(&[
            17, 5, // 0: call 5
            19, 65, // 2: out 'A'
            0, // 4: halt
            1, R0, 7, // 5: set r0 7
            18, // 8: ret
        ]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(dev.output, b"A");
        assert_eq!(vm.registers()[0], 7);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn call_pushes_next_address() {
        let mut vm = Vm::from_words(&[21, 17, 10]).unwrap();
        assert_eq!(vm.step(&mut EmptyDevice), Ok(Signal::Continue));
        assert_eq!(vm.step(&mut EmptyDevice), Ok(Signal::Continue));
        assert_eq!(vm.stack().as_slice(), &[3]);
        assert_eq!(vm.pc(), 10);
    }

    #[test]
    fn ret_on_empty_stack_halts() {
        let (_, r, _) = run(&[18, 19, 65]);
        assert_eq!(r, Ok(Exit::Halted));
    }

    #[test]
    fn push_pop() {
        let (vm, r, _) = run(&[2, 123, 3, R1, 0]);
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(vm.registers()[1], 123);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn pop_empty_faults() {
        let (_, r, _) = run(&[21, 3, R0]);
        assert_eq!(r, Err(Fault::StackUnderflow { addr: 1 }));
    }

    #[test]
    fn invalid_opcode_faults() {
        let (_, r, _) = run(&[21, 21, 99]);
        assert_eq!(r, Err(Fault::InvalidOpcode { op: 99, addr: 2 }));
        assert_eq!(
            r.unwrap_err().to_string(),
            "invalid instruction 99 at address 2"
        );
    }

    #[test]
    fn divide_by_zero_faults() {
        let (_, r, _) = run(&[11, R0, 5, R1]);
        assert_eq!(r, Err(Fault::DivideByZero { addr: 0 }));
    }

    #[test]
    fn mod_checks_destination_first() {
        let (_, r, _) = run(&[11, 5, 5, 0]);
        assert_eq!(
            r,
            Err(Fault::NotARegister {
                op: Op::Mod,
                value: 5,
                addr: 0
            })
        );
        let (_, r, _) = run(&[11, R0, 32776, 0]);
        assert_eq!(
            r,
            Err(Fault::InvalidValue {
                op: Op::Mod,
                value: 32776,
                addr: 0
            })
        );
    }

    #[test]
    fn restored_full_stack_grows_before_push() {
        let mut vm = Vm::from_words(&[2, 1, 0]).unwrap();
        *vm.stack_mut() = Stack::from_parts(&[5; 32], 32).unwrap();
        assert_eq!(vm.run(&mut EmptyDevice), Ok(Exit::Halted));
        assert_eq!(vm.stack().capacity(), 64);
        assert_eq!(vm.stack().len(), 33);
        assert_eq!(vm.stack().peek(), Some(1));
    }

    #[test]
    fn push_onto_full_stack_overflows() {
        let mut vm = Vm::from_words(&[21, 17, 0]).unwrap();
        let items = vec![0; MAX_CAPACITY];
        *vm.stack_mut() = Stack::from_parts(&items, MAX_CAPACITY).unwrap();
        assert_eq!(
            vm.run(&mut EmptyDevice),
            Err(Fault::StackOverflow { addr: 1 })
        );
        assert_eq!(vm.stack().len(), MAX_CAPACITY);
    }

    #[test]
    fn invalid_operands_fault() {
        let (_, r, _) = run(&[1, R0, 32776]);
        assert_eq!(
            r,
            Err(Fault::InvalidValue {
                op: Op::Set,
                value: 32776,
                addr: 0
            })
        );
        let (_, r, _) = run(&[1, 5, 6]);
        assert_eq!(
            r,
            Err(Fault::NotARegister {
                op: Op::Set,
                value: 5,
                addr: 0
            })
        );
    }

    #[test]
    fn end_of_memory_halts() {
        let mut vm = Vm::new();
        for m in vm.memory_mut().iter_mut() {
            *m = Op::Noop.code();
        }
        assert_eq!(vm.run(&mut EmptyDevice), Ok(Exit::Halted));
        assert_eq!(vm.pc(), MEM_SIZE);
    }

    #[test]
    fn truncated_instruction_faults() {
        let mut vm = Vm::new();
        vm.memory_mut()[MEM_SIZE - 1] = Op::Out.code();
        vm.set_pc(MEM_SIZE - 1);
        assert_eq!(
            vm.run(&mut EmptyDevice),
            Err(Fault::Truncated {
                op: Op::Out,
                addr: MEM_SIZE - 1
            })
        );
    }

    #[test]
    fn input() {
        let (vm, r, _) = run_with_input(&[20, R0, 20, R1, 0], b"ab");
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(&vm.registers()[..2], &[97, 98]);
    }

    #[test]
    fn input_eof_halts() {
        let (vm, r, _) = run_with_input(&[20, R0, 19, 65], b"");
        assert_eq!(r, Ok(Exit::Halted));
        assert_eq!(vm.pc(), 2);
    }

    #[test]
    fn input_checkpoint_rewinds() {
        let mut vm = Vm::from_words(&[21, 20, R0, 0]).unwrap();
        let mut dev = BufferDevice::new(b"");
        dev.checkpoint_on_eof = true;
        assert_eq!(vm.run(&mut dev), Ok(Exit::Checkpoint));
        assert_eq!(vm.pc(), 1);

        // Resuming re-executes the `in`
        dev.input.push_back(b'x');
        assert_eq!(vm.run(&mut dev), Ok(Exit::Halted));
        assert_eq!(vm.registers()[0], u16::from(b'x'));
    }

    #[test]
    fn deep_recursion_grows_and_shrinks() {
        // Pushes 100 values, then pops them all
        let (vm, r, _) = run(&[
            1, R0, 100, // 0: set r0 100
            1, R2, 100, // 3: set r2 100
            2, R0, // 6: push r0
            9, R0, R0, 32767, // 8: add r0 r0 -1
            7, R0, 6, // 12: jt r0 6
            3, R1, // 15: pop r1
            9, R2, R2, 32767, // 17: add r2 r2 -1
            7, R2, 15, // 21: jt r2 15
            0, // 24: halt
        ]);
        assert_eq!(r, Ok(Exit::Halted));
        assert!(vm.stack().is_empty());
        assert_eq!(vm.stack().capacity(), INITIAL_CAPACITY);
        assert_eq!(vm.registers()[1], 100);
    }

    #[test]
    fn run_until_pauses() {
        let mut vm = Vm::from_words(&[6, 0]).unwrap();
        let r = vm.run_until(&mut EmptyDevice, |_, i| i >= 1000);
        assert_eq!(r, Ok(Exit::Paused));
    }

    #[test]
    fn load_program() {
        let vm = Vm::load(&[9, 0, 0, 128, 0xFF, 0xFF]).unwrap();
        assert_eq!(&vm.memory()[..4], &[9, R0, 0xFFFF, 0]);
        assert_eq!(Vm::load(&[1, 2, 3]).unwrap_err(), LoadError::OddLength(3));
        let big = vec![0u8; MEM_SIZE * 2 + 2];
        assert_eq!(
            Vm::load(&big).unwrap_err(),
            LoadError::TooLarge(MEM_SIZE + 1)
        );
    }
}
