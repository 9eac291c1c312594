#![no_std]

#![cfg_attr(
    not(test),
    deny(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing,
        clippy::string_slice,
        clippy::arithmetic_side_effects,
        clippy::panicking_unwrap,
        clippy::out_of_bounds_indexing,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
    )
)]
#![cfg_attr(not(test), warn(clippy::missing_panics_doc))]

//! Assembler and register-machine interpreter for the Grist virtual machine.
//!
//! Assembly text is turned into a flat byte stream by the [`Assembler`],
//! which the [`Interpreter`] loads at the bottom of a simulated 32-bit
//! address space and executes one instruction per [`Interpreter::step`].
//!
//! ```
//! use grist_vm::{assemble, Interpreter};
//!
//! let bytes = assemble("setreg 0 int 5  setreg 1 int 7  xor 0 1").unwrap();
//! let mut vm = Interpreter::new(&bytes).unwrap();
//! vm.run().unwrap();
//! assert_eq!(vm.dump().registers[0], 5 ^ 7);
//! ```

extern crate alloc;

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod assembler;
pub mod config;
pub mod encoder;
pub mod interpreter;
pub mod memory;
pub mod opcode;
pub mod tokenizer;

pub use assembler::{assemble, Assembler, AssemblerError, AssemblerErrorKind};
pub use config::InterpreterConfig;
pub use encoder::EncodingError;
pub use interpreter::{Interpreter, InterpreterError, MachineState, RunOutcome, StackSample, Step};
pub use memory::{MemoryError, Region, VirtualMemory};
pub use opcode::Opcode;
pub use tokenizer::{Token, Tokenizer};

/// A location in the virtual address space.
pub type Address = i32;
/// The value held by a single register.
pub type RegisterWord = i32;
