use core::fmt;

/// A lexical token borrowed from the assembly source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// A bare run of decimal digits.
    ByteLiteral(&'a str),
    /// A mnemonic, directive or label name.
    Identifier(&'a str),
    /// An optionally negative decimal integer, only produced in integer context.
    IntLiteral(&'a str),
    /// A run of hex digits, only produced in hex context.
    HexSequence(&'a str),
    /// A single character no other rule accepted.
    Punctuation(char),
    EndOfInput,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::ByteLiteral(text) => write!(f, "byte literal `{text}`"),
            Token::Identifier(text) => write!(f, "identifier `{text}`"),
            Token::IntLiteral(text) => write!(f, "integer literal `{text}`"),
            Token::HexSequence(text) => write!(f, "hex sequence `{text}`"),
            Token::Punctuation(c) => write!(f, "character `{c}`"),
            Token::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// Which token shapes the caller is prepared to accept next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Generic,
    Int,
    Hex,
    Identifier,
}

enum State {
    Start,
    LineComment,
    Sign,
    Digits,
    Hex,
    Word,
}

/// Lazily splits assembly source into [`Token`]s.
///
/// The tokenizer only holds a cursor into the source. `#` and `//` start a
/// comment running to the end of the line. Callers that know the shape of
/// the next token (the operand of `int` or `hex`, or a label name) use the
/// constrained entry points instead of [`Tokenizer::next_token`].
pub struct Tokenizer<'a> {
    source: &'a str,
    index: usize,
    line: u32,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            index: 0,
            line: 1,
        }
    }

    /// Byte offset of the cursor.
    pub fn position(&self) -> usize {
        self.index
    }

    /// 1-based line of the cursor.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn next_token(&mut self) -> Token<'a> {
        self.scan(Context::Generic)
    }

    /// Next token read as a signed decimal integer. Identifiers are still
    /// recognised so that `int` can take a label reference.
    pub fn next_int(&mut self) -> Token<'a> {
        self.scan(Context::Int)
    }

    pub fn next_hex(&mut self) -> Token<'a> {
        self.scan(Context::Hex)
    }

    pub fn next_identifier(&mut self) -> Token<'a> {
        self.scan(Context::Identifier)
    }

    fn scan(&mut self, context: Context) -> Token<'a> {
        let mut state = State::Start;
        let mut start = self.index;
        loop {
            let current = self.peek();
            match state {
                State::Start => {
                    let Some(c) = current else {
                        return Token::EndOfInput;
                    };
                    if c.is_whitespace() {
                        self.bump(c);
                        continue;
                    }
                    if c == '#' {
                        self.bump(c);
                        state = State::LineComment;
                        continue;
                    }
                    if c == '/' {
                        self.bump(c);
                        if self.peek() == Some('/') {
                            self.bump('/');
                            state = State::LineComment;
                            continue;
                        }
                        return Token::Punctuation('/');
                    }

                    start = self.index;
                    state = match context {
                        Context::Int if c == '-' => State::Sign,
                        Context::Hex if c.is_ascii_hexdigit() => State::Hex,
                        _ if c.is_ascii_digit() => State::Digits,
                        _ if is_identifier_start(c) => State::Word,
                        _ => {
                            self.bump(c);
                            return Token::Punctuation(c);
                        }
                    };
                    self.bump(c);
                }
                State::LineComment => match current {
                    None => state = State::Start,
                    Some('\n') => {
                        self.bump('\n');
                        state = State::Start;
                    }
                    Some(c) => self.bump(c),
                },
                State::Sign => match current {
                    Some(c) if c.is_ascii_digit() => {
                        self.bump(c);
                        state = State::Digits;
                    }
                    _ => return Token::Punctuation('-'),
                },
                State::Digits => match current {
                    Some(c) if c.is_ascii_digit() => self.bump(c),
                    _ => {
                        let text = self.slice_from(start);
                        return match context {
                            Context::Int => Token::IntLiteral(text),
                            _ => Token::ByteLiteral(text),
                        };
                    }
                },
                State::Hex => match current {
                    Some(c) if c.is_ascii_hexdigit() => self.bump(c),
                    _ => return Token::HexSequence(self.slice_from(start)),
                },
                State::Word => match current {
                    Some(c) if is_identifier_continue(c) => self.bump(c),
                    _ => return Token::Identifier(self.slice_from(start)),
                },
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.index..)?.chars().next()
    }

    fn bump(&mut self, c: char) {
        self.index = self.index.saturating_add(c.len_utf8());
        if c == '\n' {
            self.line = self.line.saturating_add(1);
        }
    }

    fn slice_from(&self, start: usize) -> &'a str {
        self.source.get(start..self.index).unwrap_or_default()
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Token::EndOfInput => None,
            token => Some(token),
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

fn is_identifier_continue(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}
