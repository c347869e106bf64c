//! S-expression reader for terms.
//!
//! Syntax:
//! - `name` - bound variable if a binder of that name is in scope, constant otherwise
//! - `#n` - free variable `n` (counted from outside every binder of the term)
//! - `?x` / `?x[a b]` - named hole, declared on first use with the instance's length as arity
//! - `_` - fresh anonymous hole
//! - `Prop`, `Type`, `(Sort n)` - sorts
//! - `(fun (x T) (y U) body)`, `(forall (x T) body)` - binders; every item but the last is a binder
//! - `(let (x T v) body)`, `(cast t T)`
//! - `(match R s b ..)` - case with return predicate `R`, scrutinee `s`, branches
//! - `(fix i ((f T) ..) (body ..))` - mutual fixpoint, bodies see every `f`
//! - `(inst T)` - side obligation of type `T`
//! - `(f a ..)` - application

use crate::evar::{EvarKind, EvarMap};
use crate::subst::MAX_FREE_REL;
use crate::symbol::SymbolStore;
use crate::term::{Args, EvarId, TermId, TermStore};
use hashbrown::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

/// Reads terms, remembering named holes across calls so that `?x` means the
/// same hole in a pattern and in a later target.
#[derive(Debug, Default)]
pub struct TermReader {
    holes: HashMap<String, EvarId>,
}

impl TermReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hole `?name`, if it has been read.
    pub fn hole(&self, name: &str) -> Option<EvarId> {
        self.holes.get(name).copied()
    }

    /// Forget hole names; the holes themselves stay in their store.
    pub fn forget_holes(&mut self) {
        self.holes.clear();
    }

    /// Read one term; the whole input must be consumed.
    pub fn read(
        &mut self,
        input: &str,
        terms: &TermStore,
        symbols: &SymbolStore,
        evars: &mut EvarMap,
    ) -> Result<TermId, ParseError> {
        let mut cursor = Cursor {
            input,
            pos: 0,
            terms,
            symbols,
            evars,
            holes: &mut self.holes,
            scope: Vec::new(),
        };
        let t = cursor.term()?;
        cursor.skip_ws();
        if cursor.pos < input.len() {
            return Err(cursor.error("unexpected characters after term"));
        }
        Ok(t)
    }
}

struct Cursor<'r> {
    input: &'r str,
    pos: usize,
    terms: &'r TermStore,
    symbols: &'r SymbolStore,
    evars: &'r mut EvarMap,
    holes: &'r mut HashMap<String, EvarId>,
    /// Binder names, innermost last.
    scope: Vec<String>,
}

impl Cursor<'_> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else if c == b';' {
                // Comment to end of line
                while self.peek().is_some_and(|c| c != b'\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, c: u8) -> Result<(), ParseError> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", c as char)))
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, b'_' | b'\'' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn number(&mut self) -> Result<u32, ParseError> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| ParseError {
                message: "expected number".to_string(),
                position: start,
            })
    }

    /// Does the next item close the enclosing form? End of input counts as
    /// closing; the caller's `expect` then reports it.
    fn at_close(&mut self) -> bool {
        self.skip_ws();
        matches!(self.peek(), Some(b')') | None)
    }

    /// Position just after the next item, without interpreting it.
    fn item_end(&self) -> Result<usize, ParseError> {
        let bytes = self.input.as_bytes();
        let mut pos = self.pos;
        let mut depth = 0usize;
        loop {
            let Some(&c) = bytes.get(pos) else {
                return Err(ParseError {
                    message: "unclosed parenthesis".to_string(),
                    position: pos,
                });
            };
            match c {
                b'(' | b'[' => depth += 1,
                b')' | b']' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(pos + 1);
                    }
                }
                b')' | b']' => return Ok(pos),
                c if c.is_ascii_whitespace() && depth == 0 => return Ok(pos),
                _ => {}
            }
            pos += 1;
        }
    }

    fn term(&mut self) -> Result<TermId, ParseError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'(') => {
                self.pos += 1;
                let t = self.form()?;
                self.expect(b')')?;
                Ok(t)
            }
            Some(b'#') => {
                self.pos += 1;
                let n = self.number()?;
                match n.checked_add(self.scope.len() as u32) {
                    Some(i) if n <= MAX_FREE_REL => Ok(self.terms.rel(i)),
                    _ => Err(self.error(format!("free variable #{} is too large", n))),
                }
            }
            Some(b'?') => {
                self.pos += 1;
                let name = self.ident()?;
                self.named_hole(name)
            }
            Some(_) => {
                let name = self.ident()?;
                Ok(self.atom(&name))
            }
        }
    }

    fn atom(&mut self, name: &str) -> TermId {
        if let Some(i) = self.scope.iter().rev().position(|n| n == name) {
            return self.terms.rel(i as u32);
        }
        match name {
            "_" => {
                let k = self.evars.fresh(0, None, EvarKind::Hole);
                self.terms.evar(k, Args::new())
            }
            "Prop" => self.terms.sort(0),
            "Type" => self.terms.sort(1),
            _ => self.terms.constant(self.symbols.intern(name)),
        }
    }

    fn named_hole(&mut self, name: String) -> Result<TermId, ParseError> {
        let mut instance = Args::new();
        if self.peek() == Some(b'[') {
            self.pos += 1;
            loop {
                self.skip_ws();
                match self.peek() {
                    Some(b']') => break,
                    None => return Err(self.error("unclosed hole instance")),
                    Some(_) => instance.push(self.term()?),
                }
            }
            self.pos += 1;
        }
        let k = match self.holes.get(&name) {
            Some(&k) => {
                let arity = self.evars.decl(k).map(|d| d.arity as usize);
                if arity != Some(instance.len()) {
                    return Err(self.error(format!("hole ?{} used with a different arity", name)));
                }
                k
            }
            None => {
                let k = self.evars.fresh(instance.len() as u32, None, EvarKind::Hole);
                self.holes.insert(name, k);
                k
            }
        };
        Ok(self.terms.evar(k, instance))
    }

    /// Contents of a parenthesised form, after the opening parenthesis.
    fn form(&mut self) -> Result<TermId, ParseError> {
        self.skip_ws();
        if self.peek() == Some(b'(') || self.peek() == Some(b'#') || self.peek() == Some(b'?') {
            return self.application();
        }
        let save = self.pos;
        let word = self.ident()?;
        if self.scope.iter().any(|n| *n == word) {
            self.pos = save;
            return self.application();
        }
        match word.as_str() {
            "fun" | "forall" => self.binders(word == "fun"),
            "let" => {
                self.expect(b'(')?;
                let name = self.ident()?;
                let ty = self.term()?;
                let value = self.term()?;
                self.expect(b')')?;
                self.scope.push(name);
                let body = self.term();
                self.scope.pop();
                Ok(self.terms.let_in(value, ty, body?))
            }
            "cast" => {
                let t = self.term()?;
                let ty = self.term()?;
                Ok(self.terms.cast(t, ty))
            }
            "match" => {
                let ret = self.term()?;
                let scrutinee = self.term()?;
                let mut branches = Args::new();
                while !self.at_close() {
                    branches.push(self.term()?);
                }
                Ok(self.terms.case(ret, scrutinee, branches))
            }
            "fix" => self.fixpoint(),
            "Sort" => {
                let n = self.number()?;
                Ok(self.terms.sort(n))
            }
            "inst" => {
                let ty = self.term()?;
                let k = self.evars.fresh(0, Some(ty), EvarKind::Obligation);
                Ok(self.terms.evar(k, Args::new()))
            }
            _ => {
                self.pos = save;
                self.application()
            }
        }
    }

    fn application(&mut self) -> Result<TermId, ParseError> {
        let head = self.term()?;
        let mut args = Args::new();
        while !self.at_close() {
            args.push(self.term()?);
        }
        Ok(self.terms.app(head, args))
    }

    /// `(x T) .. body`: every item but the last is a binder.
    fn binders(&mut self, lambda: bool) -> Result<TermId, ParseError> {
        let mut domains: Vec<TermId> = Vec::new();
        let base = self.scope.len();
        let body = self.binder_items(&mut domains);
        self.scope.truncate(base);
        let mut t = body?;
        for &dom in domains.iter().rev() {
            t = if lambda {
                self.terms.lambda(dom, t)
            } else {
                self.terms.pi(dom, t)
            };
        }
        Ok(t)
    }

    fn binder_items(&mut self, domains: &mut Vec<TermId>) -> Result<TermId, ParseError> {
        loop {
            self.skip_ws();
            let mut after = self.item_end()?;
            let bytes = self.input.as_bytes();
            while bytes.get(after).is_some_and(|c| c.is_ascii_whitespace()) {
                after += 1;
            }
            if bytes.get(after) == Some(&b')') {
                break;
            }
            self.expect(b'(')?;
            let name = self.ident()?;
            let ty = self.term()?;
            self.expect(b')')?;
            domains.push(ty);
            self.scope.push(name);
        }
        if domains.is_empty() {
            return Err(self.error("binder form without binders"));
        }
        self.term()
    }

    fn fixpoint(&mut self) -> Result<TermId, ParseError> {
        let index = self.number()?;
        self.expect(b'(')?;
        let mut names = Vec::new();
        let mut types = Args::new();
        while !self.at_close() {
            self.expect(b'(')?;
            names.push(self.ident()?);
            types.push(self.term()?);
            self.expect(b')')?;
        }
        self.expect(b')')?;
        if index as usize >= types.len() {
            return Err(self.error("fixpoint index out of range"));
        }
        let base = self.scope.len();
        self.scope.extend(names);
        let bodies = self.term_list();
        self.scope.truncate(base);
        let bodies = bodies?;
        if bodies.len() != types.len() {
            return Err(self.error("fixpoint needs one body per type"));
        }
        Ok(self.terms.fix(index, types, bodies))
    }

    /// `(t ..)`
    fn term_list(&mut self) -> Result<Args, ParseError> {
        self.expect(b'(')?;
        let mut items = Args::new();
        while !self.at_close() {
            items.push(self.term()?);
        }
        self.expect(b')')?;
        Ok(items)
    }
}

#[cfg(test)]
#[path = "tests/parser.rs"]
mod tests;
