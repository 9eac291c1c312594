use serde::{Deserialize, Serialize};

pub const DEFAULT_REGISTER_COUNT: usize = 8;
pub const MAX_REGISTER_COUNT: usize = 256;
/// 1 MiB.
pub const DEFAULT_STACK_SIZE: u32 = 1_048_576;
pub const DEFAULT_HEAP_GAP: u32 = 100;

/// Construction parameters for an [`Interpreter`](crate::Interpreter).
///
/// The offsets move the instruction, heap and stack regions away from their
/// fixed anchors. Filling them with random values per run keeps programs
/// from depending on hard coded addresses; the interpreter itself never
/// randomises anything.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub register_count: usize,
    pub stack_size: u32,
    /// Added to the fixed instruction base.
    pub instruction_offset: u32,
    /// Bytes left unmapped between the end of the program and the heap.
    pub heap_gap: u32,
    /// Subtracted from the fixed stack start.
    pub stack_offset: u32,
}

impl InterpreterConfig {
    pub const fn new() -> Self {
        Self {
            register_count: DEFAULT_REGISTER_COUNT,
            stack_size: DEFAULT_STACK_SIZE,
            instruction_offset: 0,
            heap_gap: DEFAULT_HEAP_GAP,
            stack_offset: 0,
        }
    }

    pub const fn with_register_count(mut self, register_count: usize) -> Self {
        self.register_count = register_count;
        self
    }

    pub const fn with_stack_size(mut self, stack_size: u32) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub const fn with_instruction_offset(mut self, instruction_offset: u32) -> Self {
        self.instruction_offset = instruction_offset;
        self
    }

    pub const fn with_heap_gap(mut self, heap_gap: u32) -> Self {
        self.heap_gap = heap_gap;
        self
    }

    pub const fn with_stack_offset(mut self, stack_offset: u32) -> Self {
        self.stack_offset = stack_offset;
        self
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self::new()
    }
}
