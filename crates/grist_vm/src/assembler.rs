// Two-pass assembler for Grist assembly text.
//
// The first pass runs while source chunks are loaded: bytes are appended,
// labels are recorded against the current length of the code buffer and
// every `int <label>` leaves a four byte placeholder behind. The second pass
// (`resolve`, or implicitly `emit_bytes`) patches the placeholders once the
// caller has linked every chunk.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use thiserror_no_std::Error;

use crate::encoder::{self, EncodingError, INT_LEN};
use crate::tokenizer::{Token, Tokenizer};
use crate::Address;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("{0}")]
    Kind(AssemblerErrorKind),
    #[error("line {line}: {kind}")]
    WithLine { line: u32, kind: AssemblerErrorKind },
}

impl AssemblerError {
    fn with_line(self, line: u32) -> Self {
        match self {
            AssemblerError::WithLine { .. } => self,
            AssemblerError::Kind(kind) => AssemblerError::WithLine { line, kind },
        }
    }

    /// Line within the chunk passed to [`Assembler::load_code`], when known.
    pub fn line_number(&self) -> Option<u32> {
        match self {
            Self::Kind(_) => None,
            Self::WithLine { line, .. } => Some(*line),
        }
    }

    pub fn error_kind(&self) -> &AssemblerErrorKind {
        match self {
            Self::Kind(kind) => kind,
            Self::WithLine { kind, .. } => kind,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerErrorKind {
    #[error("{0}")]
    Encoding(EncodingError),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error("`{0}` directive is missing its operand")]
    MissingOperand(&'static str),
    #[error("label `{0}` is already defined")]
    DuplicateLabel(String),
    #[error("label `{name}` referenced in chunk {chunk} is not defined")]
    UndefinedLabel { name: String, chunk: u32 },
    #[error("program does not fit in the 32-bit address space")]
    AddressOverflow,
    #[error("assembly halted by an earlier error")]
    Halted,
}

impl From<EncodingError> for AssemblerError {
    fn from(err: EncodingError) -> Self {
        AssemblerError::Kind(AssemblerErrorKind::Encoding(err))
    }
}

impl From<AssemblerErrorKind> for AssemblerError {
    fn from(kind: AssemblerErrorKind) -> Self {
        AssemblerError::Kind(kind)
    }
}

/// What the next token is allowed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    ExpectLabelName,
    ExpectIntOperand,
    ExpectHexOperand,
}

impl State {
    fn directive(self) -> &'static str {
        match self {
            State::Normal => "",
            State::ExpectLabelName => "label",
            State::ExpectIntOperand => "int",
            State::ExpectHexOperand => "hex",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            State::Normal => "a mnemonic, directive or byte literal",
            State::ExpectLabelName => "a label name",
            State::ExpectIntOperand => "an integer or label name",
            State::ExpectHexOperand => "a hex sequence",
        }
    }
}

struct PendingReference {
    name: String,
    /// 1-based count of the `load_code` call that made the reference.
    chunk: u32,
    line: u32,
}

pub struct Assembler {
    code: Vec<u8>,
    labels: BTreeMap<String, u32>,
    /// Offset of each placeholder -> the label it refers to.
    pending: BTreeMap<u32, PendingReference>,
    base: Address,
    chunks: u32,
    halted: bool,
}

impl Assembler {
    /// Label references resolve to offsets from the start of the program.
    pub fn new() -> Self {
        Self::with_base(0)
    }

    /// Label references resolve to `base + offset`. Pass the interpreter's
    /// instruction base to get addresses that are valid at run time.
    pub fn with_base(base: Address) -> Self {
        Self {
            code: Vec::new(),
            labels: BTreeMap::new(),
            pending: BTreeMap::new(),
            base,
            chunks: 0,
            halted: false,
        }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Number of chunks passed to [`Assembler::load_code`] so far.
    pub fn chunk_count(&self) -> u32 {
        self.chunks
    }

    /// Offset of a defined label.
    pub fn label(&self, name: &str) -> Option<u32> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.labels
            .iter()
            .map(|(name, offset)| (name.as_str(), *offset))
    }

    /// Assembles one chunk of source, appending to the code already loaded.
    ///
    /// Labels are global across chunks, so chunks may reference labels that
    /// a later chunk defines. A failed chunk halts the assembler: every later
    /// call returns [`AssemblerErrorKind::Halted`].
    pub fn load_code(&mut self, source: &str) -> Result<(), AssemblerError> {
        if self.halted {
            return Err(AssemblerErrorKind::Halted.into());
        }
        self.chunks = self.chunks.saturating_add(1);
        let start_len = self.code.len();
        match self.assemble_chunk(source) {
            Ok(()) => {
                debug!(
                    "assembled chunk of {} bytes, {} labels, {} pending references",
                    self.code.len().saturating_sub(start_len),
                    self.labels.len(),
                    self.pending.len(),
                );
                Ok(())
            }
            Err(err) => {
                warn!("assembly halted at line {}", err.line_number().unwrap_or(0));
                self.halted = true;
                Err(err)
            }
        }
    }

    /// Patches every pending label reference.
    ///
    /// Call once all chunks are loaded. Nothing is patched unless every
    /// referenced label is defined.
    pub fn resolve(&mut self) -> Result<(), AssemblerError> {
        if self.halted {
            return Err(AssemblerErrorKind::Halted.into());
        }

        let mut patches = Vec::with_capacity(self.pending.len());
        for (at, reference) in self.pending.iter() {
            let Some(offset) = self.labels.get(&reference.name) else {
                return Err(AssemblerError::Kind(AssemblerErrorKind::UndefinedLabel {
                    name: reference.name.clone(),
                    chunk: reference.chunk,
                })
                .with_line(reference.line));
            };
            let address = i32::try_from(*offset)
                .ok()
                .and_then(|offset| self.base.checked_add(offset))
                .ok_or(AssemblerError::Kind(AssemblerErrorKind::AddressOverflow))?;
            patches.push((*at, address));
        }

        for (at, address) in patches {
            let start = usize::try_from(at)
                .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::AddressOverflow))?;
            let end = start
                .checked_add(INT_LEN)
                .ok_or(AssemblerError::Kind(AssemblerErrorKind::AddressOverflow))?;
            let slot = self
                .code
                .get_mut(start..end)
                .ok_or(AssemblerError::Kind(AssemblerErrorKind::AddressOverflow))?;
            slot.copy_from_slice(&encoder::int_to_bytes(address));
            trace!("patched reference at offset {} with address {}", at, address);
        }

        self.pending.clear();
        Ok(())
    }

    /// Resolves pending references and returns a copy of the program.
    pub fn emit_bytes(&mut self) -> Result<Vec<u8>, AssemblerError> {
        self.resolve()?;
        Ok(self.code.clone())
    }

    fn assemble_chunk(&mut self, source: &str) -> Result<(), AssemblerError> {
        let mut tokenizer = Tokenizer::new(source);
        let mut state = State::Normal;
        // Line of the directive still waiting for its operand.
        let mut directive_line = tokenizer.line();
        loop {
            let token = match state {
                State::Normal => tokenizer.next_token(),
                State::ExpectLabelName => tokenizer.next_identifier(),
                State::ExpectIntOperand => tokenizer.next_int(),
                State::ExpectHexOperand => tokenizer.next_hex(),
            };
            let line = tokenizer.line();

            if token == Token::EndOfInput {
                if state != State::Normal {
                    return Err(AssemblerError::Kind(AssemblerErrorKind::MissingOperand(
                        state.directive(),
                    ))
                    .with_line(directive_line));
                }
                return Ok(());
            }

            let next = self
                .accept(state, token, line)
                .map_err(|err| err.with_line(line))?;
            if state == State::Normal && next != State::Normal {
                directive_line = line;
            }
            state = next;
        }
    }

    fn accept(&mut self, state: State, token: Token<'_>, line: u32) -> Result<State, AssemblerError> {
        match (state, token) {
            (State::Normal, Token::Identifier(word)) => self.accept_word(word),
            (State::Normal, Token::ByteLiteral(text)) => {
                self.code.push(encoder::encode_byte(text)?);
                Ok(State::Normal)
            }
            (State::ExpectLabelName, Token::Identifier(name)) => {
                self.define_label(name)?;
                Ok(State::Normal)
            }
            (State::ExpectIntOperand, Token::IntLiteral(text)) => {
                self.code.extend_from_slice(&encoder::encode_int(text)?);
                Ok(State::Normal)
            }
            (State::ExpectIntOperand, Token::Identifier(name)) => {
                self.reference_label(name, line)?;
                Ok(State::Normal)
            }
            (State::ExpectHexOperand, Token::HexSequence(text)) => {
                self.code.extend(encoder::decode_hex(text)?);
                Ok(State::Normal)
            }
            (state, found) => Err(AssemblerError::Kind(AssemblerErrorKind::UnexpectedToken {
                expected: state.expected(),
                found: found.to_string(),
            })),
        }
    }

    fn accept_word(&mut self, word: &str) -> Result<State, AssemblerError> {
        if word.eq_ignore_ascii_case("label") {
            return Ok(State::ExpectLabelName);
        }
        if word.eq_ignore_ascii_case("int") {
            return Ok(State::ExpectIntOperand);
        }
        if word.eq_ignore_ascii_case("hex") {
            return Ok(State::ExpectHexOperand);
        }
        self.code.push(encoder::encode_mnemonic(word)?);
        Ok(State::Normal)
    }

    fn define_label(&mut self, name: &str) -> Result<(), AssemblerError> {
        if self.labels.contains_key(name) {
            return Err(AssemblerError::Kind(AssemblerErrorKind::DuplicateLabel(
                name.to_string(),
            )));
        }
        let offset = self.cursor()?;
        trace!("label {} at offset {}", name, offset);
        self.labels.insert(name.to_string(), offset);
        Ok(())
    }

    fn reference_label(&mut self, name: &str, line: u32) -> Result<(), AssemblerError> {
        let at = self.cursor()?;
        self.pending.insert(
            at,
            PendingReference {
                name: name.to_string(),
                chunk: self.chunks,
                line,
            },
        );
        self.code.extend_from_slice(&[0; INT_LEN]);
        Ok(())
    }

    fn cursor(&self) -> Result<u32, AssemblerError> {
        u32::try_from(self.code.len())
            .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::AddressOverflow))
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembles a single chunk of source into a finished program.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut assembler = Assembler::new();
    assembler.load_code(source)?;
    assembler.emit_bytes()
}
