use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use thiserror_no_std::Error;

use crate::config::InterpreterConfig;
use crate::Address;

/// Lowest address of the instruction region before the configured offset.
pub const INSTRUCTIONS_BASE: Address = 1024;
/// Highest stack address before the configured offset.
pub const STACK_START: Address = 2_147_482_623;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryError {
    #[error("address {address} is outside {lowest}..={highest}")]
    OutOfBounds {
        address: Address,
        lowest: Address,
        highest: Address,
    },
    #[error("address {0} has never been written")]
    Unmapped(Address),
    #[error("address {0} is in the read-only instruction region")]
    ReadOnly(Address),
    #[error("memory regions do not fit in the address space")]
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    Instructions,
    Heap,
    Stack,
    Unmapped,
}

/// Placement of the three regions in the 32-bit address space.
///
/// ```text
///  i32::MAX ┬──────────────────┐
///           │ stack_base       │ stack grows down to stack_limit
///           │ ...              │
///           │ stack_limit      │
///           │ ...              │ heap grows up
///           │ heap_start       │
///           │ (heap gap)       │
///           │ instructions     │ [instructions_start, instructions_end)
///         0 ┴──────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub instructions_start: Address,
    pub instructions_end: Address,
    pub heap_start: Address,
    pub stack_base: Address,
    /// Lowest writable stack address.
    pub stack_limit: Address,
}

impl Layout {
    pub fn new(program_len: usize, config: &InterpreterConfig) -> Result<Self, MemoryError> {
        let instructions_start = INSTRUCTIONS_BASE
            .checked_add(to_address(config.instruction_offset)?)
            .ok_or(MemoryError::Layout)?;
        let program_len = i32::try_from(program_len).map_err(|_| MemoryError::Layout)?;
        let instructions_end = instructions_start
            .checked_add(program_len)
            .ok_or(MemoryError::Layout)?;
        let heap_start = instructions_end
            .checked_add(to_address(config.heap_gap)?)
            .ok_or(MemoryError::Layout)?;
        let stack_base = STACK_START
            .checked_sub(to_address(config.stack_offset)?)
            .ok_or(MemoryError::Layout)?;
        let stack_limit = stack_base
            .checked_sub(to_address(config.stack_size)?)
            .ok_or(MemoryError::Layout)?;
        if heap_start > stack_limit {
            return Err(MemoryError::Layout);
        }
        Ok(Self {
            instructions_start,
            instructions_end,
            heap_start,
            stack_base,
            stack_limit,
        })
    }

    pub fn region_of(&self, address: Address) -> Region {
        if (self.instructions_start..self.instructions_end).contains(&address) {
            Region::Instructions
        } else if (self.stack_limit..=self.stack_base).contains(&address) {
            Region::Stack
        } else if (self.heap_start..self.stack_limit).contains(&address) {
            Region::Heap
        } else {
            Region::Unmapped
        }
    }
}

fn to_address(value: u32) -> Result<Address, MemoryError> {
    Address::try_from(value).map_err(|_| MemoryError::Layout)
}

/// Byte addressed memory backing one interpreter.
///
/// The program is held in one contiguous buffer, the stack in another
/// indexed downward from `stack_base`, and the heap in a sparse map. Bytes
/// that were never written read as [`MemoryError::Unmapped`], never as zero.
pub struct VirtualMemory {
    layout: Layout,
    instructions: Vec<u8>,
    heap: BTreeMap<Address, u8>,
    /// `stack[i]` holds address `stack_base - i`.
    stack: Vec<Option<u8>>,
}

impl VirtualMemory {
    pub fn new(program: &[u8], config: &InterpreterConfig) -> Result<Self, MemoryError> {
        let layout = Layout::new(program.len(), config)?;
        Ok(Self {
            layout,
            instructions: program.to_vec(),
            heap: BTreeMap::new(),
            stack: Vec::new(),
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn region_of(&self, address: Address) -> Region {
        self.layout.region_of(address)
    }

    pub fn read(&self, address: Address) -> Result<u8, MemoryError> {
        match self.layout.region_of(address) {
            Region::Instructions => {
                let index = offset_from(self.layout.instructions_start, address)?;
                self.instructions
                    .get(index)
                    .copied()
                    .ok_or(MemoryError::Unmapped(address))
            }
            Region::Heap => self
                .heap
                .get(&address)
                .copied()
                .ok_or(MemoryError::Unmapped(address)),
            Region::Stack => {
                let index = offset_from(address, self.layout.stack_base)?;
                self.stack
                    .get(index)
                    .copied()
                    .flatten()
                    .ok_or(MemoryError::Unmapped(address))
            }
            Region::Unmapped => Err(MemoryError::Unmapped(address)),
        }
    }

    /// Writes one byte inside `stack_limit..=stack_base`.
    pub fn write_stack(&mut self, address: Address, value: u8) -> Result<(), MemoryError> {
        if address > self.layout.stack_base || address < self.layout.stack_limit {
            return Err(MemoryError::OutOfBounds {
                address,
                lowest: self.layout.stack_limit,
                highest: self.layout.stack_base,
            });
        }
        let index = offset_from(address, self.layout.stack_base)?;
        let needed = index.checked_add(1).ok_or(MemoryError::Layout)?;
        if self.stack.len() < needed {
            self.stack.resize(needed, None);
        }
        let slot = self.stack.get_mut(index).ok_or(MemoryError::Layout)?;
        *slot = Some(value);
        Ok(())
    }

    pub fn write_heap(&mut self, address: Address, value: u8) -> Result<(), MemoryError> {
        match self.layout.region_of(address) {
            Region::Heap => {
                self.heap.insert(address, value);
                Ok(())
            }
            Region::Instructions => Err(MemoryError::ReadOnly(address)),
            Region::Stack | Region::Unmapped => Err(MemoryError::OutOfBounds {
                address,
                lowest: self.layout.heap_start,
                highest: self.layout.stack_limit.saturating_sub(1),
            }),
        }
    }

    /// Number of program bytes loaded at `instructions_start`.
    pub fn program_len(&self) -> usize {
        self.instructions.len()
    }
}

/// `high - low` as an index, for `low <= high`.
fn offset_from(low: Address, high: Address) -> Result<usize, MemoryError> {
    high.checked_sub(low)
        .and_then(|offset| usize::try_from(offset).ok())
        .ok_or(MemoryError::Layout)
}
