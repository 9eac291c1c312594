use core::fmt;

use variant_count::VariantCount;

/// Every instruction understood by the interpreter.
///
/// The discriminant is the byte written to the program stream, so the
/// assembler and the interpreter share this table as their binary contract.
#[repr(u8)]
#[derive(VariantCount, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    Noop = 0,
    SetReg = 1,
    CopyReg = 2,
    Xor = 3,
    Push = 8,
}

const OPCODES: [Opcode; Opcode::VARIANT_COUNT] = [
    Opcode::Noop,
    Opcode::SetReg,
    Opcode::CopyReg,
    Opcode::Xor,
    Opcode::Push,
];

impl Opcode {
    pub fn all() -> &'static [Opcode] {
        &OPCODES
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Noop => "noop",
            Opcode::SetReg => "setreg",
            Opcode::CopyReg => "copyreg",
            Opcode::Xor => "xor",
            Opcode::Push => "push",
        }
    }

    /// Case-insensitive lookup of a mnemonic.
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        OPCODES
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(text))
    }

    /// Number of operand bytes following the opcode byte.
    pub fn operand_len(self) -> usize {
        match self {
            Opcode::Noop => 0,
            // register index + 4 byte integer
            Opcode::SetReg => 5,
            Opcode::CopyReg | Opcode::Xor => 2,
            Opcode::Push => 1,
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        OPCODES
            .iter()
            .copied()
            .find(|op| u8::from(*op) == value)
            .ok_or(value)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
