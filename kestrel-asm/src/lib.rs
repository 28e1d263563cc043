//! Assembler for the Kestrel VM
//!
//! Source is line-oriented.  Each line holds any number of `label:`
//! definitions, followed by at most one instruction or directive:
//!
//! ```text
//! # prints a greeting, then halts
//! start:  set     $0 @msg
//! loop:   rmem    $1 $0
//!         jf      $1 @done
//!         out     $1
//!         add     $0 $0 1
//!         jmp     @loop
//! done:   halt
//! msg:    .word   "hello\n", 0
//! ```
//!
//! Operands are registers (`$0` through `$7`), label references (`@name`),
//! numbers (negative values wrap modulo 32768), and character literals
//! (`'a'`).  `out` also accepts a string literal, which expands to one `out`
//! per character.  The directives are `.word` (comma-separated values,
//! including strings), `.space n` (`n` zero words), and `.align n` (pad with
//! zeros to a multiple of `n`).
#![warn(missing_docs)]
use kestrel_vm::{MEM_SIZE, MODULO, Op, REGISTER_BASE, REGISTER_COUNT};
use lexer::{Spanned, Token};
use log::debug;
use std::collections::HashMap;

mod lexer;

/// Assembly error, tagged with a 1-based line number
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Unknown mnemonic
    #[error("line {line}: unknown instruction `{name}`")]
    UnknownInstruction {
        /// Line number
        line: usize,
        /// Mnemonic
        name: String,
    },

    /// Register number is not in `0..8`
    #[error("line {line}: invalid register `${reg}`")]
    InvalidRegister {
        /// Line number
        line: usize,
        /// Register number, as written
        reg: String,
    },

    /// Token is not valid in this position
    #[error("line {line}: unexpected `{text}`")]
    InvalidToken {
        /// Line number
        line: usize,
        /// Source text of the token
        text: String,
    },

    /// Label is defined twice
    #[error("line {line}: label `{label}` is already defined")]
    DuplicateLabel {
        /// Line number of the second definition
        line: usize,
        /// Label name
        label: String,
    },

    /// Label is referenced but never defined
    #[error("line {line}: unresolved label `{label}`")]
    UnresolvedLabel {
        /// Line number of the first reference
        line: usize,
        /// Label name
        label: String,
    },

    /// Wrong number of operands for an instruction
    #[error("line {line}: `{op}` expects {expected} operands, found {found}")]
    ArgCount {
        /// Line number
        line: usize,
        /// Instruction
        op: Op,
        /// Expected operand count
        expected: usize,
        /// Actual operand count
        found: usize,
    },

    /// Destination operand is not a register
    #[error("line {line}: `{op}` must write to a register")]
    NotARegister {
        /// Line number
        line: usize,
        /// Instruction
        op: Op,
    },

    /// String literal outside of `out` or `.word`
    #[error("line {line}: strings are only allowed in `out` and `.word`")]
    StringNotAllowed {
        /// Line number
        line: usize,
    },

    /// Unknown directive
    #[error("line {line}: unknown directive `.{name}`")]
    UnknownDirective {
        /// Line number
        line: usize,
        /// Directive name
        name: String,
    },

    /// Directive without a value
    #[error("line {line}: expected a value")]
    ExpectedValue {
        /// Line number
        line: usize,
    },

    /// Unknown escape sequence in a string or character
    #[error("line {line}: invalid escape in `{text}`")]
    InvalidEscape {
        /// Line number
        line: usize,
        /// Source text of the literal
        text: String,
    },

    /// Number or character doesn't fit in a word
    #[error("line {line}: `{text}` is out of range")]
    OutOfRange {
        /// Line number
        line: usize,
        /// Source text of the value
        text: String,
    },

    /// Program doesn't fit in memory
    #[error("program is {0} words, but memory is only {MEM_SIZE} words")]
    TooLarge(usize),
}

/// Result type for assembly
pub type Result<T> = std::result::Result<T, Error>;

/// Assembles source text into memory words
pub fn assemble(source: &str) -> Result<Vec<u16>> {
    let mut a = Assembler::new(source);
    for (line, tokens) in lexer::lines(source) {
        a.line(line, &tokens)?;
    }
    a.finish()
}

/// Converts words into the little-endian program file format
pub fn to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Operand or `.word` value
enum Item<'src> {
    Word(u16),
    Reference(&'src str),
}

struct Assembler<'src> {
    source: &'src str,
    out: Vec<u16>,
    labels: HashMap<&'src str, usize>,

    /// Words to patch with label addresses, as `(index, label, line)`
    pending: Vec<(usize, &'src str, usize)>,
}

impl<'src> Assembler<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            out: vec![],
            labels: HashMap::new(),
            pending: vec![],
        }
    }

    fn text(&self, span: &std::ops::Range<usize>) -> String {
        self.source[span.clone()].to_owned()
    }

    fn invalid(&self, line: usize, (_, span): &Spanned) -> Error {
        Error::InvalidToken {
            line,
            text: self.text(span),
        }
    }

    fn line(&mut self, line: usize, tokens: &[Spanned<'src>]) -> Result<()> {
        if let Some(t) = tokens.iter().find(|(t, _)| t.is_none()) {
            return Err(self.invalid(line, t));
        }
        let mut rest = tokens;
        while let [(Some(Token::Label(label)), _), tail @ ..] = rest {
            if self.labels.insert(*label, self.out.len()).is_some() {
                return Err(Error::DuplicateLabel {
                    line,
                    label: label.to_string(),
                });
            }
            rest = tail;
        }
        match rest {
            [] => Ok(()),
            [(Some(Token::Ident(name)), _), args @ ..] => {
                let op = Op::from_name(name).ok_or_else(|| {
                    Error::UnknownInstruction {
                        line,
                        name: name.to_string(),
                    }
                })?;
                self.instruction(line, op, args)
            }
            [(Some(Token::Directive(name)), _), args @ ..] => {
                self.directive(line, name, args)
            }
            [t, ..] => Err(self.invalid(line, t)),
        }
    }

    fn instruction(
        &mut self,
        line: usize,
        op: Op,
        args: &[Spanned<'src>],
    ) -> Result<()> {
        if let [t @ (Some(Token::Str(_)), _)] = args {
            if op != Op::Out {
                return Err(Error::StringNotAllowed { line });
            }
            for c in self.string(line, t)? {
                self.out.extend([op.code(), c]);
            }
            return Ok(());
        }
        if args.len() != op.argc() {
            return Err(Error::ArgCount {
                line,
                op,
                expected: op.argc(),
                found: args.len(),
            });
        }
        if op.writes_register()
            && !matches!(args.first(), Some((Some(Token::Register(_)), _)))
        {
            return Err(Error::NotARegister { line, op });
        }
        self.out.push(op.code());
        for t in args {
            match t {
                (Some(Token::Register(r)), _) => {
                    let reg = r
                        .parse::<usize>()
                        .ok()
                        .filter(|i| *i < REGISTER_COUNT)
                        .ok_or_else(|| Error::InvalidRegister {
                            line,
                            reg: r.to_string(),
                        })?;
                    self.out.push(REGISTER_BASE + reg as u16);
                }
                (Some(Token::Str(_)), _) => {
                    return Err(Error::StringNotAllowed { line });
                }
                t => self.emit(line, t)?,
            }
        }
        Ok(())
    }

    fn directive(
        &mut self,
        line: usize,
        name: &str,
        args: &[Spanned<'src>],
    ) -> Result<()> {
        match name {
            "word" => {
                if args.is_empty() {
                    return Err(Error::ExpectedValue { line });
                }
                for (i, t) in args.iter().enumerate() {
                    match t {
                        (Some(Token::Comma), _) if i % 2 == 1 => (),
                        _ if i % 2 == 1 => return Err(self.invalid(line, t)),
                        (Some(Token::Str(_)), _) => {
                            let s = self.string(line, t)?;
                            self.out.extend(s);
                        }
                        t => self.emit(line, t)?,
                    }
                }
                if args.len() % 2 == 0 {
                    // trailing comma
                    return Err(Error::ExpectedValue { line });
                }
            }
            "space" | "align" => {
                let (n, span) = match args {
                    [] => return Err(Error::ExpectedValue { line }),
                    [(Some(Token::Number(s)), span)] => {
                        (s.parse::<usize>().ok(), span)
                    }
                    [_, t, ..] | [t] => return Err(self.invalid(line, t)),
                };
                let out_of_range = || Error::OutOfRange {
                    line,
                    text: self.text(span),
                };
                let pad = match (name, n) {
                    (_, None) | ("align", Some(0)) => {
                        return Err(out_of_range());
                    }
                    ("space", Some(n)) => n,
                    (_, Some(n)) => (n - self.out.len() % n) % n,
                };
                let size = self.out.len().saturating_add(pad);
                if size > MEM_SIZE {
                    return Err(Error::TooLarge(size));
                }
                self.out.resize(size, 0);
            }
            _ => {
                return Err(Error::UnknownDirective {
                    line,
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Emits a single number, character, or label reference
    fn emit(&mut self, line: usize, t: &Spanned<'src>) -> Result<()> {
        match self.value(line, t)? {
            Item::Word(w) => self.out.push(w),
            Item::Reference(label) => {
                self.pending.push((self.out.len(), label, line));
                self.out.push(0);
            }
        }
        Ok(())
    }

    fn value(&self, line: usize, t: &Spanned<'src>) -> Result<Item<'src>> {
        let (tok, span) = t;
        let out_of_range = || Error::OutOfRange {
            line,
            text: self.text(span),
        };
        match tok {
            Some(Token::Number(s)) => {
                let v: i64 = s.parse().map_err(|_| out_of_range())?;
                let v = if v < 0 {
                    v.rem_euclid(i64::from(MODULO))
                } else {
                    v
                };
                u16::try_from(v).map(Item::Word).map_err(|_| out_of_range())
            }
            Some(Token::Char(_)) => match self.string(line, t)?[..] {
                [c] => Ok(Item::Word(c)),
                _ => Err(Error::InvalidEscape {
                    line,
                    text: self.text(span),
                }),
            },
            Some(Token::Reference(label)) => Ok(Item::Reference(*label)),
            _ => Err(self.invalid(line, t)),
        }
    }

    /// Decodes a string or character literal into words
    fn string(&self, line: usize, t: &Spanned<'src>) -> Result<Vec<u16>> {
        let (Some(Token::Str(s) | Token::Char(s)), span) = t else {
            return Err(self.invalid(line, t));
        };
        let chars = unescape(s).ok_or_else(|| Error::InvalidEscape {
            line,
            text: self.text(span),
        })?;
        chars
            .into_iter()
            .map(|c| u16::try_from(u32::from(c)).ok().filter(|v| *v < MODULO))
            .collect::<Option<Vec<u16>>>()
            .ok_or_else(|| Error::OutOfRange {
                line,
                text: self.text(span),
            })
    }

    fn finish(mut self) -> Result<Vec<u16>> {
        if self.out.len() > MEM_SIZE {
            return Err(Error::TooLarge(self.out.len()));
        }
        for (i, label, line) in std::mem::take(&mut self.pending) {
            let addr = self.labels.get(label).ok_or_else(|| {
                Error::UnresolvedLabel {
                    line,
                    label: label.to_owned(),
                }
            })?;
            // Labels are at most MEM_SIZE, which fits in a word
            self.out[i] = *addr as u16;
        }
        debug!(
            "assembled {} words with {} labels",
            self.out.len(),
            self.labels.len()
        );
        Ok(self.out)
    }
}

/// Decodes escape sequences, returning `None` if one is invalid
fn unescape(s: &str) -> Option<Vec<char>> {
    let mut out = vec![];
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        let c = match c {
            '\\' => match chars.next()? {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                c @ ('\\' | '\'' | '"') => c,
                _ => return None,
            },
            c => c,
        };
        out.push(c);
    }
    Some(out)
}
