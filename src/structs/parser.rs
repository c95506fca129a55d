// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # **Parser Module** - *Type and Signature Grammar*
//!
//! Recursive descent parser producing [`Ndt`] arenas.
//!
//! ```text
//! signature := types '->' types
//! types     := type (',' type)*
//! type      := '?' type
//!            | '!' fixed-run type            Fortran order
//!            | fixed-run type                `2 * 3 * T`, `fixed(shape=2, step=10) * T`
//!            | 'var' ['(' 'offsets' '=' ints ')'] '*' type
//!            | ('...' | 'var...' | Name '...') '*' type
//!            | Name '*' type                  symbolic dimension
//!            | Name '(' type ')'              constructor
//!            | Name                           dtype variable
//!            | '&' type | 'ref' '(' type ')'
//!            | '(' members ')' | '{' named-members '}'
//!            | dtype | 'string'
//! member    := type ['|' 'align' '=' int '|']
//! ```
//! Tuple and record members may be followed by `pack=n` or `align=n`.

use std::sync::Arc;

use crate::aliases::Result;
use crate::enums::dtype::DType;
use crate::enums::error::NdError;
use crate::structs::ndt::{Field, Ndt, NdtBuilder, NodeId, run_c_steps, run_f_steps};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Star,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Question,
    Bang,
    Amp,
    Bar,
    Equals,
    Colon,
    Ellipsis,
    Arrow,
    End,
}

struct Lexer<'a> {
    text: &'a str,
    toks: Vec<(Tok, usize)>,
}

impl<'a> Lexer<'a> {
    fn tokenize(text: &'a str) -> Result<Vec<(Tok, usize)>> {
        let mut lx = Lexer { text, toks: Vec::new() };
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            let start = i;
            let single = match c {
                b'*' => Some(Tok::Star),
                b',' => Some(Tok::Comma),
                b'(' => Some(Tok::LParen),
                b')' => Some(Tok::RParen),
                b'{' => Some(Tok::LBrace),
                b'}' => Some(Tok::RBrace),
                b'[' => Some(Tok::LBracket),
                b']' => Some(Tok::RBracket),
                b'?' => Some(Tok::Question),
                b'!' => Some(Tok::Bang),
                b'&' => Some(Tok::Amp),
                b'|' => Some(Tok::Bar),
                b'=' => Some(Tok::Equals),
                b':' => Some(Tok::Colon),
                _ => None,
            };
            if let Some(tok) = single {
                lx.toks.push((tok, start));
                i += 1;
                continue;
            }
            if c.is_ascii_whitespace() {
                i += 1;
            } else if text[i..].starts_with("...") {
                lx.toks.push((Tok::Ellipsis, start));
                i += 3;
            } else if text[i..].starts_with("->") {
                lx.toks.push((Tok::Arrow, start));
                i += 2;
            } else if c.is_ascii_digit() || (c == b'-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let n = text[start..i]
                    .parse::<i64>()
                    .map_err(|_| lx.error(start, "integer out of range"))?;
                lx.toks.push((Tok::Int(n), start));
            } else if c.is_ascii_alphabetic() || c == b'_' {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                lx.toks.push((Tok::Ident(text[start..i].to_string()), start));
            } else {
                return Err(lx.error(start, &format!("unexpected character '{}'", c as char)));
            }
        }
        lx.toks.push((Tok::End, text.len()));
        Ok(lx.toks)
    }

    fn error(&self, position: usize, message: &str) -> NdError {
        NdError::TypeSyntax {
            input: self.text.to_string(),
            position,
            message: message.to_string(),
        }
    }
}

struct Parser<'a> {
    text: &'a str,
    toks: Vec<(Tok, usize)>,
    pos: usize,
    b: NdtBuilder,
}

#[inline]
fn is_upper(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Result<Self> {
        Ok(Self {
            text,
            toks: Lexer::tokenize(text)?,
            pos: 0,
            b: NdtBuilder::new(),
        })
    }

    #[inline]
    fn peek(&self) -> &Tok {
        &self.toks[self.pos].0
    }

    #[inline]
    fn peek_at(&self, k: usize) -> &Tok {
        let i = (self.pos + k).min(self.toks.len() - 1);
        &self.toks[i].0
    }

    #[inline]
    fn offset(&self) -> usize {
        self.toks[self.pos].1
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.pos].0.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn error(&self, message: impl Into<String>) -> NdError {
        NdError::TypeSyntax {
            input: self.text.to_string(),
            position: self.offset(),
            message: message.into(),
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<()> {
        if *self.peek() == tok {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<()> {
        match self.peek() {
            Tok::Ident(w) if w == word => {
                self.bump();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{word}'"))),
        }
    }

    fn int(&mut self) -> Result<i64> {
        match self.peek() {
            Tok::Int(n) => {
                let n = *n;
                self.bump();
                Ok(n)
            }
            _ => Err(self.error("expected integer")),
        }
    }

    fn uint(&mut self) -> Result<usize> {
        let n = self.int()?;
        usize::try_from(n).map_err(|_| self.error("expected non-negative integer"))
    }

    fn parse_type(&mut self) -> Result<NodeId> {
        match self.peek().clone() {
            Tok::Question => {
                self.bump();
                let child = self.parse_type()?;
                Ok(self.b.optional(child))
            }
            Tok::Bang => {
                self.bump();
                self.parse_fixed_run(true)
            }
            Tok::Int(_) => self.parse_fixed_run(false),
            Tok::Ellipsis => {
                self.bump();
                self.expect(Tok::Star, "'*' after '...'")?;
                let child = self.parse_type()?;
                self.b.ellipsis(None, false, child)
            }
            Tok::Amp => {
                self.bump();
                let child = self.parse_type()?;
                Ok(self.b.reference(child))
            }
            Tok::LParen => self.parse_composite(false),
            Tok::LBrace => self.parse_composite(true),
            Tok::Ident(name) => self.parse_ident(name),
            _ => Err(self.error("expected a type")),
        }
    }

    fn parse_ident(&mut self, name: String) -> Result<NodeId> {
        match name.as_str() {
            "fixed" if *self.peek_at(1) == Tok::LParen => self.parse_fixed_run(false),
            "var" => {
                self.bump();
                self.parse_var()
            }
            "ref" if *self.peek_at(1) == Tok::LParen => {
                self.bump();
                self.bump();
                let child = self.parse_type()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(self.b.reference(child))
            }
            "string" => {
                self.bump();
                Ok(self.b.string())
            }
            _ if is_upper(&name) => {
                self.bump();
                match self.peek() {
                    Tok::Ellipsis => {
                        self.bump();
                        self.expect(Tok::Star, "'*' after ellipsis")?;
                        let child = self.parse_type()?;
                        self.b.ellipsis(Some(&name), false, child)
                    }
                    Tok::Star => {
                        self.bump();
                        let child = self.parse_type()?;
                        self.b.symbolic(&name, child)
                    }
                    Tok::LParen => {
                        self.bump();
                        let child = self.parse_type()?;
                        self.expect(Tok::RParen, "')'")?;
                        Ok(self.b.constr(&name, child))
                    }
                    _ => Ok(self.b.typevar(&name)),
                }
            }
            _ => match DType::from_name(&name) {
                Some(d) => {
                    self.bump();
                    Ok(self.b.scalar(d))
                }
                None => Err(self.error(format!("unknown dtype '{name}'"))),
            },
        }
    }

    fn parse_var(&mut self) -> Result<NodeId> {
        match self.peek() {
            Tok::Ellipsis => {
                self.bump();
                self.expect(Tok::Star, "'*' after 'var...'")?;
                let child = self.parse_type()?;
                self.b.ellipsis(None, true, child)
            }
            Tok::LParen => {
                self.bump();
                self.expect_keyword("offsets")?;
                self.expect(Tok::Equals, "'='")?;
                self.expect(Tok::LBracket, "'['")?;
                let mut offsets = Vec::new();
                if *self.peek() != Tok::RBracket {
                    offsets.push(self.uint()?);
                    while *self.peek() == Tok::Comma {
                        self.bump();
                        offsets.push(self.uint()?);
                    }
                }
                self.expect(Tok::RBracket, "']'")?;
                self.expect(Tok::RParen, "')'")?;
                self.expect(Tok::Star, "'*' after var dimension")?;
                let child = self.parse_type()?;
                self.b.var_dim(Some(Arc::from(offsets)), child)
            }
            _ => {
                self.expect(Tok::Star, "'*' after 'var'")?;
                let child = self.parse_type()?;
                self.b.var_dim(None, child)
            }
        }
    }

    /// Parses consecutive fixed dimensions, then assigns default steps to those
    /// without an explicit one.
    fn parse_fixed_run(&mut self, fortran: bool) -> Result<NodeId> {
        let mut run: Vec<(usize, Option<isize>)> = Vec::new();
        loop {
            match self.peek().clone() {
                Tok::Int(_) => {
                    let n = self.uint()?;
                    run.push((n, None));
                }
                Tok::Ident(w) if w == "fixed" && *self.peek_at(1) == Tok::LParen => {
                    self.bump();
                    self.bump();
                    self.expect_keyword("shape")?;
                    self.expect(Tok::Equals, "'='")?;
                    let n = self.uint()?;
                    let mut step = None;
                    if *self.peek() == Tok::Comma {
                        self.bump();
                        self.expect_keyword("step")?;
                        self.expect(Tok::Equals, "'='")?;
                        step = Some(self.int()? as isize);
                    }
                    self.expect(Tok::RParen, "')'")?;
                    run.push((n, step));
                }
                _ if run.is_empty() => return Err(self.error("expected a fixed dimension")),
                _ => break,
            }
            self.expect(Tok::Star, "'*' after dimension")?;
        }
        let shape: Vec<usize> = run.iter().map(|(n, _)| *n).collect();
        let defaults = if fortran { run_f_steps(&shape) } else { run_c_steps(&shape) };
        let mut node = self.parse_type()?;
        for ((n, step), default) in run.into_iter().zip(defaults).rev() {
            node = self.b.fixed_dim(n, step.unwrap_or(default), node)?;
        }
        Ok(node)
    }

    /// Optional `name=n` modifier at the current position.
    fn modifier(&mut self, word: &str) -> Result<Option<usize>> {
        match (self.peek(), self.peek_at(1)) {
            (Tok::Ident(w), Tok::Equals) if w == word => {
                self.bump();
                self.bump();
                Ok(Some(self.uint()?))
            }
            _ => Ok(None),
        }
    }

    fn parse_composite(&mut self, record: bool) -> Result<NodeId> {
        let close = if record { Tok::RBrace } else { Tok::RParen };
        self.bump();
        let mut fields = Vec::new();
        let mut pack = None;
        let mut align = None;
        while *self.peek() != close {
            if let Some(p) = self.modifier("pack")? {
                pack = Some(p);
            } else if let Some(a) = self.modifier("align")? {
                align = Some(a);
            } else {
                let name = if record {
                    let Tok::Ident(n) = self.bump() else {
                        return Err(self.error("expected field name"));
                    };
                    self.expect(Tok::Colon, "':' after field name")?;
                    Some(n)
                } else {
                    None
                };
                let ty = self.parse_type()?;
                let mut field_align = None;
                if *self.peek() == Tok::Bar {
                    self.bump();
                    field_align = self.modifier("align")?;
                    if field_align.is_none() {
                        return Err(self.error("expected 'align=' in field modifier"));
                    }
                    self.expect(Tok::Bar, "'|'")?;
                }
                fields.push(Field::new(name.as_deref(), ty, field_align));
            }
            if *self.peek() == Tok::Comma {
                self.bump();
            } else if *self.peek() != close {
                return Err(self.error("expected ',' or closing bracket"));
            }
        }
        self.bump();
        if record {
            self.b.record(fields, pack, align)
        } else {
            self.b.tuple(fields, pack, align)
        }
    }

    fn at_end(&self, what: &str) -> Result<()> {
        if *self.peek() == Tok::End {
            Ok(())
        } else {
            Err(self.error(format!("unexpected trailing input after {what}")))
        }
    }

    /// Parses one type from the current position into its own arena.
    fn standalone(&mut self) -> Result<Ndt> {
        let root = self.parse_type()?;
        let b = std::mem::take(&mut self.b);
        Ok(b.finish(root))
    }

    fn type_list(&mut self) -> Result<Vec<Ndt>> {
        let mut out = vec![self.standalone()?];
        while *self.peek() == Tok::Comma {
            self.bump();
            out.push(self.standalone()?);
        }
        Ok(out)
    }
}

/// Parses a single type.
pub fn parse_type(text: &str) -> Result<Ndt> {
    let mut p = Parser::new(text)?;
    let t = p.standalone()?;
    p.at_end("type")?;
    Ok(t)
}

/// Parses `inputs -> outputs` into two type lists.
pub fn parse_signature(text: &str) -> Result<(Vec<Ndt>, Vec<Ndt>)> {
    let mut p = Parser::new(text)?;
    let inputs = p.type_list()?;
    p.expect(Tok::Arrow, "'->'")?;
    let outputs = p.type_list()?;
    p.at_end("signature")?;
    Ok((inputs, outputs))
}
