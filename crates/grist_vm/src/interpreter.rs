use alloc::vec;
use alloc::vec::Vec;
use heapless::Vec as BoundedVec;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::config::{InterpreterConfig, MAX_REGISTER_COUNT};
use crate::encoder::{self, INT_LEN};
use crate::memory::{MemoryError, Region, VirtualMemory};
use crate::opcode::Opcode;
use crate::{Address, RegisterWord};

/// Window of stack offsets, relative to the stack top, captured by
/// [`Interpreter::dump`].
pub const STACK_SAMPLE_HIGHEST: i32 = 8;
pub const STACK_SAMPLE_LOWEST: i32 = -11;
pub const STACK_SAMPLE_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterpreterError {
    #[error("{opcode} at {address}: program ends before all operands were read")]
    TruncatedOperand { opcode: Opcode, address: Address },
    #[error("{opcode} at {address}: register {register} does not exist, the machine has {count}")]
    RegisterOutOfRange {
        opcode: Opcode,
        address: Address,
        register: u8,
        count: usize,
    },
    #[error("byte {opcode} at {address} is not an instruction")]
    InvalidOpcode { opcode: u8, address: Address },
    #[error("push of register {register} holding {value} failed: {cause}")]
    StackWrite {
        register: u8,
        value: RegisterWord,
        cause: MemoryError,
    },
    #[error("{0} registers requested, at most 256 are supported")]
    TooManyRegisters(usize),
    #[error("{0}")]
    Memory(MemoryError),
    #[error("instruction pointer left the address space")]
    AddressOverflow,
}

impl From<MemoryError> for InterpreterError {
    fn from(err: MemoryError) -> Self {
        InterpreterError::Memory(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// The instruction pointer ran past the end of the program.
    Halted,
}

impl Step {
    pub fn continues(self) -> bool {
        matches!(self, Step::Continue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Halted { steps: u64 },
    OutOfFuel,
}

/// One defined stack byte near the stack top.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackSample {
    /// Position relative to the stack top.
    pub offset: i32,
    pub address: Address,
    pub value: u8,
}

/// Read-only snapshot of an interpreter, produced by [`Interpreter::dump`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub instruction_pointer: Address,
    pub stack_base: Address,
    pub stack_top: Address,
    pub registers: Vec<RegisterWord>,
    /// Defined bytes from `stack_top + 8` down to `stack_top - 11`, highest
    /// address first.
    pub stack_sample: BoundedVec<StackSample, STACK_SAMPLE_LEN>,
}

/// Fetch-decode-execute engine for an assembled program.
///
/// The program is loaded at the start of the instruction region and the
/// instruction pointer starts there. Execution halts cleanly once the pointer
/// runs past the last program byte. An error leaves the machine exactly as it
/// was when the failing operand was consumed, so [`Interpreter::dump`] still
/// shows where it stopped.
///
/// No instruction transfers control today, so [`Interpreter::run`] always
/// terminates. Use [`Interpreter::run_with_fuel`] to bound execution
/// regardless.
pub struct Interpreter {
    memory: VirtualMemory,
    registers: Vec<RegisterWord>,
    instruction_pointer: Address,
    stack_top: Address,
}

impl Interpreter {
    pub fn new(program: &[u8]) -> Result<Self, InterpreterError> {
        Self::with_config(program, InterpreterConfig::default())
    }

    pub fn with_config(program: &[u8], config: InterpreterConfig) -> Result<Self, InterpreterError> {
        if config.register_count > MAX_REGISTER_COUNT {
            return Err(InterpreterError::TooManyRegisters(config.register_count));
        }
        let memory = VirtualMemory::new(program, &config)?;
        let layout = *memory.layout();
        debug!(
            "loaded {} bytes at {}, stack {} down to {}",
            program.len(),
            layout.instructions_start,
            layout.stack_base,
            layout.stack_limit,
        );
        Ok(Self {
            memory,
            registers: vec![0; config.register_count],
            instruction_pointer: layout.instructions_start,
            stack_top: layout.stack_base,
        })
    }

    /// Address the first program byte is loaded at.
    pub fn instruction_base(&self) -> Address {
        self.memory.layout().instructions_start
    }

    pub fn registers(&self) -> &[RegisterWord] {
        &self.registers
    }

    pub fn memory(&self) -> &VirtualMemory {
        &self.memory
    }

    /// True once there is no instruction left to fetch.
    pub fn is_halted(&self) -> bool {
        self.memory.region_of(self.instruction_pointer) != Region::Instructions
    }

    /// Executes a single instruction.
    pub fn step(&mut self) -> Result<Step, InterpreterError> {
        let address = self.instruction_pointer;
        let Some(byte) = self.consume_byte()? else {
            trace!("halted at {}", address);
            return Ok(Step::Halted);
        };
        match self.execute(byte, address) {
            Ok(()) => Ok(Step::Continue),
            Err(err) => {
                warn!("execution stopped: {}", err);
                Err(err)
            }
        }
    }

    /// Steps until the program halts or fails.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        while self.step()?.continues() {}
        Ok(())
    }

    /// Steps at most `max_steps` instructions.
    pub fn run_with_fuel(&mut self, max_steps: u64) -> Result<RunOutcome, InterpreterError> {
        let mut steps: u64 = 0;
        while steps < max_steps {
            if !self.step()?.continues() {
                return Ok(RunOutcome::Halted { steps });
            }
            steps = steps.saturating_add(1);
        }
        if self.is_halted() {
            Ok(RunOutcome::Halted { steps })
        } else {
            Ok(RunOutcome::OutOfFuel)
        }
    }

    /// Snapshot of the machine for debuggers. Never fails.
    pub fn dump(&self) -> MachineState {
        let mut stack_sample = BoundedVec::new();
        for offset in (STACK_SAMPLE_LOWEST..=STACK_SAMPLE_HIGHEST).rev() {
            let Some(address) = self.stack_top.checked_add(offset) else {
                continue;
            };
            if self.memory.region_of(address) != Region::Stack {
                continue;
            }
            if let Ok(value) = self.memory.read(address) {
                // The window never holds more than STACK_SAMPLE_LEN addresses.
                let _ = stack_sample.push(StackSample {
                    offset,
                    address,
                    value,
                });
            }
        }
        MachineState {
            instruction_pointer: self.instruction_pointer,
            stack_base: self.memory.layout().stack_base,
            stack_top: self.stack_top,
            registers: self.registers.clone(),
            stack_sample,
        }
    }

    fn execute(&mut self, byte: u8, address: Address) -> Result<(), InterpreterError> {
        let opcode = Opcode::try_from(byte)
            .map_err(|opcode| InterpreterError::InvalidOpcode { opcode, address })?;
        trace!("{} at {}", opcode, address);
        match opcode {
            Opcode::Noop => {}
            Opcode::SetReg => {
                let register = self.operand_byte(opcode, address)?;
                let value = self.operand_int(opcode, address)?;
                *self.register_mut(opcode, address, register)? = value;
            }
            Opcode::CopyReg => {
                let dest = self.operand_byte(opcode, address)?;
                let src = self.operand_byte(opcode, address)?;
                let value = self.register(opcode, address, src)?;
                *self.register_mut(opcode, address, dest)? = value;
            }
            Opcode::Xor => {
                let dest = self.operand_byte(opcode, address)?;
                let src = self.operand_byte(opcode, address)?;
                let value = self.register(opcode, address, src)?;
                *self.register_mut(opcode, address, dest)? ^= value;
            }
            Opcode::Push => {
                let register = self.operand_byte(opcode, address)?;
                let value = self.register(opcode, address, register)?;
                self.push(register, value)?;
            }
        }
        Ok(())
    }

    /// Next program byte, or `None` once the pointer has left the program.
    fn consume_byte(&mut self) -> Result<Option<u8>, InterpreterError> {
        if self.is_halted() {
            return Ok(None);
        }
        let byte = self.memory.read(self.instruction_pointer)?;
        self.instruction_pointer = self
            .instruction_pointer
            .checked_add(1)
            .ok_or(InterpreterError::AddressOverflow)?;
        Ok(Some(byte))
    }

    fn operand_byte(&mut self, opcode: Opcode, address: Address) -> Result<u8, InterpreterError> {
        self.consume_byte()?
            .ok_or(InterpreterError::TruncatedOperand { opcode, address })
    }

    fn operand_int(&mut self, opcode: Opcode, address: Address) -> Result<RegisterWord, InterpreterError> {
        let mut bytes = [0u8; INT_LEN];
        for slot in bytes.iter_mut() {
            *slot = self.operand_byte(opcode, address)?;
        }
        Ok(encoder::decode_int(bytes))
    }

    fn register(&self, opcode: Opcode, address: Address, register: u8) -> Result<RegisterWord, InterpreterError> {
        self.registers
            .get(usize::from(register))
            .copied()
            .ok_or(InterpreterError::RegisterOutOfRange {
                opcode,
                address,
                register,
                count: self.registers.len(),
            })
    }

    fn register_mut(
        &mut self,
        opcode: Opcode,
        address: Address,
        register: u8,
    ) -> Result<&mut RegisterWord, InterpreterError> {
        let count = self.registers.len();
        self.registers
            .get_mut(usize::from(register))
            .ok_or(InterpreterError::RegisterOutOfRange {
                opcode,
                address,
                register,
                count,
            })
    }

    /// Writes `value` least significant byte first, starting at the stack top
    /// and moving down one address per byte.
    fn push(&mut self, register: u8, value: RegisterWord) -> Result<(), InterpreterError> {
        for byte in encoder::int_to_bytes(value) {
            self.memory
                .write_stack(self.stack_top, byte)
                .map_err(|cause| InterpreterError::StackWrite {
                    register,
                    value,
                    cause,
                })?;
            self.stack_top = self
                .stack_top
                .checked_sub(1)
                .ok_or(InterpreterError::AddressOverflow)?;
        }
        Ok(())
    }
}
