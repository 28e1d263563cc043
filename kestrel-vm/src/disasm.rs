//! Disassembler
//!
//! The output uses the same syntax as the assembler, so a listing can be
//! edited and re-assembled.
use crate::{Op, value::register_index};
use std::fmt::Write;

/// A single item in a disassembly listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// An instruction with its raw operand words
    Instr(Op, Vec<u16>),
    /// A run of `out` instructions with printable literal operands
    Text(String),
    /// A word which can't be decoded as an instruction
    Word(u16),
}

/// A listing line, tagged with its address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Address of the first word
    pub addr: usize,
    /// Decoded item
    pub item: Item,
}

/// Disassembles a block of memory, starting at address 0
pub fn disassemble(words: &[u16]) -> Vec<Line> {
    let mut out = vec![];
    let mut text: Option<(usize, String)> = None;
    let mut addr = 0;
    while let Some(&w) = words.get(addr) {
        // Instructions which would write to a literal are shown as data
        let decoded = Op::decode(w)
            .and_then(|op| {
                words.get(addr + 1..addr + 1 + op.argc()).map(|a| (op, a))
            })
            .filter(|(op, a)| {
                !op.writes_register()
                    || a.first().copied().and_then(register_index).is_some()
            });
        let Some((op, args)) = decoded else {
            flush(&mut text, &mut out);
            out.push(Line {
                addr,
                item: Item::Word(w),
            });
            addr += 1;
            continue;
        };
        match (op, printable(args.first().copied())) {
            (Op::Out, Some(c)) => {
                let (_, s) = text.get_or_insert_with(|| (addr, String::new()));
                s.push(c);
                if c == '\n' {
                    flush(&mut text, &mut out);
                }
            }
            _ => {
                flush(&mut text, &mut out);
                out.push(Line {
                    addr,
                    item: Item::Instr(op, args.to_vec()),
                });
            }
        }
        addr += 1 + op.argc();
    }
    flush(&mut text, &mut out);
    out
}

/// Returns the prefix of `words` without trailing zeros
pub fn trim_zeros(words: &[u16]) -> &[u16] {
    let n = words.iter().rposition(|w| *w != 0).map_or(0, |i| i + 1);
    &words[..n]
}

fn flush(text: &mut Option<(usize, String)>, out: &mut Vec<Line>) {
    if let Some((addr, s)) = text.take() {
        out.push(Line {
            addr,
            item: Item::Text(s),
        });
    }
}

fn printable(w: Option<u16>) -> Option<char> {
    match w? {
        10 => Some('\n'),
        c @ 0x20..0x7f => Some(char::from(c as u8)),
        _ => None,
    }
}

fn escape(c: char, quote: char, out: &mut String) {
    match c {
        '\n' => out.push_str("\\n"),
        '\\' => out.push_str("\\\\"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c => out.push(c),
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::Instr(op, args) => {
                let mut s = format!("{op:<8}");
                for a in args {
                    match register_index(*a) {
                        Some(r) => write!(s, " ${r}")?,
                        None => write!(s, " {a}")?,
                    }
                }
                f.write_str(s.trim_end())
            }
            Item::Text(t) => {
                let quote = if t.chars().count() == 1 { '\'' } else { '"' };
                let mut s = String::new();
                for c in t.chars() {
                    escape(c, quote, &mut s);
                }
                write!(f, "{:<8} {quote}{s}{quote}", "out")
            }
            Item::Word(w) => write!(f, "{:<8} {w}", ".word"),
        }
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.item.fmt(f)
    }
}
