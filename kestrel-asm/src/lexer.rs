//! Tokens for assembly source
use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip(r"[ \t\r\f]+|#[^\n]*", allow_greedy = true))]
pub enum Token<'src> {
    #[token("\n")]
    Newline,

    #[token(",")]
    Comma,

    /// Label definition, without the trailing `:`
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:", |lex| {
        let s = lex.slice();
        &s[..s.len() - 1]
    })]
    Label(&'src str),

    /// Directive name, without the leading `.`
    #[regex(r"\.[A-Za-z_][A-Za-z0-9_]*", |lex| &lex.slice()[1..])]
    Directive(&'src str),

    /// Register number, without the leading `$`
    #[regex(r"\$[0-9]+", |lex| &lex.slice()[1..])]
    Register(&'src str),

    /// Label reference, without the leading `@`
    #[regex(r"@[A-Za-z0-9_]+", |lex| &lex.slice()[1..])]
    Reference(&'src str),

    /// String literal contents, still escaped
    #[regex(r#""(?:[^"\\\n]|\\.)+""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Str(&'src str),

    /// Character literal contents, still escaped
    #[regex(r"'(?:[^'\\\n]|\\.)'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Char(&'src str),

    #[regex(r"-?[0-9]+", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),
}

/// Lexed token with its source span; `None` marks unrecognized text
pub type Spanned<'src> = (Option<Token<'src>>, Range<usize>);

/// Splits source into lines of spanned tokens
///
/// Line numbers are 1-based; empty lines are skipped.
pub fn lines(source: &str) -> Vec<(usize, Vec<Spanned<'_>>)> {
    let mut out = vec![];
    let mut line = 1;
    let mut current = vec![];
    for (t, span) in Token::lexer(source).spanned() {
        match t {
            Ok(Token::Newline) => {
                if !current.is_empty() {
                    out.push((line, std::mem::take(&mut current)));
                }
                line += 1;
            }
            Ok(t) => current.push((Some(t), span)),
            Err(()) => current.push((None, span)),
        }
    }
    if !current.is_empty() {
        out.push((line, current));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokens(s: &str) -> Vec<Option<Token<'_>>> {
        lines(s)
            .into_iter()
            .flat_map(|(_, l)| l.into_iter().map(|(t, _)| t))
            .collect()
    }

    #[test]
    fn instruction_line() {
        assert_eq!(
            tokens("start: add $0 @end -5 # comment"),
            [
                Some(Token::Label("start")),
                Some(Token::Ident("add")),
                Some(Token::Register("0")),
                Some(Token::Reference("end")),
                Some(Token::Number("-5")),
            ]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            tokens(r#".word "a\"b", '\n', 'x'"#),
            [
                Some(Token::Directive("word")),
                Some(Token::Str(r#"a\"b"#)),
                Some(Token::Comma),
                Some(Token::Char(r"\n")),
                Some(Token::Comma),
                Some(Token::Char("x")),
            ]
        );
    }

    #[test]
    fn line_numbers() {
        let l = lines("halt\n\n# only a comment\n  noop\n");
        let numbers: Vec<usize> = l.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, [1, 4]);
    }

    #[test]
    fn errors() {
        assert_eq!(tokens("halt ~"), [Some(Token::Ident("halt")), None]);
    }
}
