//! Repl - line-oriented command processor for the `occmatch` driver.
//!
//! Supports:
//! - `axiom`, `def`, `proj`, `canonical`, `instance` to build the environment
//! - `match [occ] P in T` to abstract occurrences of a pattern
//! - `rewrite [occ] rule | rule .. in T` to rewrite with the first applicable rule
//! - `config`, `metrics`, `help`, `quit`/`exit`

use crate::config::MatchConfig;
use crate::engine::{Direction, Engine, RewriteRule, RuleCandidate};
use crate::env::{Ctx, Env};
use crate::error::MatchError;
use crate::evar::EvarMap;
use crate::metrics::MetricsReport;
use crate::occurrence::{OccSpec, Polarity};
use crate::parser::TermReader;
use crate::subst::instantiate;
use crate::symbol::SymbolStore;
use crate::term::{format_term, TermId, TermStore};
use std::io::{self, BufRead, Write};

/// Name shown for the abstracted position of a context.
const HOLE_NAME: &str = "X";

/// REPL state: the stores and environment every command works against.
pub struct Repl {
    terms: TermStore,
    symbols: SymbolStore,
    env: Env,
    config: MatchConfig,
    evars: EvarMap,
    reader: TermReader,
    last_metrics: Option<MetricsReport>,
    prompt: String,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            terms: TermStore::new(),
            symbols: SymbolStore::new(),
            env: Env::new(),
            config: MatchConfig::default(),
            evars: EvarMap::new(),
            reader: TermReader::new(),
            last_metrics: None,
            prompt: "occmatch> ".to_string(),
        }
    }

    /// Run the read-eval-print loop until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> io::Result<()> {
        writeln!(output, "occmatch - keyed pattern matching. Type 'help' for commands.")?;
        loop {
            write!(output, "{}", self.prompt)?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                break;
            }
            match self.process_input(&line) {
                Ok(Some(msg)) => writeln!(output, "{}", msg)?,
                Ok(None) => {}
                Err(e) if e == "quit" => break,
                Err(e) => writeln!(output, "Error: {}", e)?,
            }
        }
        Ok(())
    }

    /// Process a single command line. `Err("quit")` asks the caller to stop.
    pub fn process_input(&mut self, input: &str) -> Result<Option<String>, String> {
        let line = input.trim();
        if line.is_empty() || line.starts_with(';') {
            return Ok(None);
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            "help" => Ok(Some(self.help_text())),
            "quit" | "exit" => Err("quit".to_string()),
            "axiom" => self.axiom(rest),
            "def" => self.define(rest),
            "proj" => self.projection(rest),
            "canonical" => self.canonical(rest),
            "instance" => self.instance(rest),
            "match" => self.run_match(rest),
            "rewrite" => self.run_rewrite(rest),
            "config" => self.configure(rest),
            "metrics" => Ok(Some(match &self.last_metrics {
                Some(report) => report.to_string(),
                None => "No match has run yet.".to_string(),
            })),
            _ => Err(format!("Unknown command '{}'. Type 'help' for commands.", command)),
        }
    }

    fn help_text(&self) -> String {
        r#"occmatch - keyed pattern matching and occurrence abstraction

Commands:
  axiom <name> <T>                   Declare a constant of type T
  def <name> [<T>] <body>            Define a constant
  proj <name> <nparams>              Mark a constant as a projection
  canonical <proj> <head> <inst> <n> Register <head> as canonical for <proj>
  instance <name> <T>                Declare an instance for side obligations
  match [occ] <P> in <T>             Abstract occurrences of P in T
  rewrite [occ] <rule> | .. in <T>   Rewrite T with the first applicable rule
  config [<json>]                    Show or update the match configuration
  metrics                            Counters of the last match
  help                               Show this help
  quit/exit                          Exit the REPL

Rules:    [<-] <L> = <R> [by <proof>]
Occ:      {1 3} selects occurrences 1 and 3, {-2} all but occurrence 2
Terms:    (f a b)  (fun (x T) body)  (forall (x T) body)  ?x  ?x[a]  _  #0
"#
        .to_string()
    }

    fn read(&mut self, text: &str) -> Result<TermId, String> {
        self.reader
            .read(text, &self.terms, &self.symbols, &mut self.evars)
            .map_err(|e| e.to_string())
    }

    fn render(&self, t: TermId) -> String {
        format_term(t, &self.terms, &self.symbols, &[])
    }

    fn render_context(&self, t: TermId) -> String {
        format_term(t, &self.terms, &self.symbols, &[HOLE_NAME.to_string()])
    }

    fn axiom(&mut self, rest: &str) -> Result<Option<String>, String> {
        let [name, ty] = split_items(rest)?[..] else {
            return Err("Usage: axiom <name> <type>".to_string());
        };
        let ty = self.read(ty)?;
        self.env.declare(self.symbols.intern(name), ty);
        Ok(Some(format!("Declared {}", name)))
    }

    fn define(&mut self, rest: &str) -> Result<Option<String>, String> {
        let (name, ty, body) = match split_items(rest)?[..] {
            [name, body] => (name, None, body),
            [name, ty, body] => (name, Some(ty), body),
            _ => return Err("Usage: def <name> [<type>] <body>".to_string()),
        };
        let ty = ty.map(|ty| self.read(ty)).transpose()?;
        let body = self.read(body)?;
        self.env.define(self.symbols.intern(name), body, ty);
        Ok(Some(format!("Defined {}", name)))
    }

    fn projection(&mut self, rest: &str) -> Result<Option<String>, String> {
        let [name, nparams] = split_items(rest)?[..] else {
            return Err("Usage: proj <name> <nparams>".to_string());
        };
        let nparams: usize = nparams
            .parse()
            .map_err(|_| format!("Invalid parameter count '{}'", nparams))?;
        self.env.register_projection(self.symbols.intern(name), nparams);
        Ok(Some(format!("Projection {} with {} parameter(s)", name, nparams)))
    }

    fn canonical(&mut self, rest: &str) -> Result<Option<String>, String> {
        let [proj, head, instance, extra] = split_items(rest)?[..] else {
            return Err("Usage: canonical <proj> <head> <instance> <extra>".to_string());
        };
        let extra: usize = extra
            .parse()
            .map_err(|_| format!("Invalid extra argument count '{}'", extra))?;
        let instance = self.read(instance)?;
        self.env.register_canonical(
            self.symbols.intern(proj),
            self.symbols.intern(head),
            instance,
            extra,
        );
        Ok(Some(format!("{} is canonical for {}", head, proj)))
    }

    fn instance(&mut self, rest: &str) -> Result<Option<String>, String> {
        let [name, ty] = split_items(rest)?[..] else {
            return Err("Usage: instance <name> <type>".to_string());
        };
        let ty = self.read(ty)?;
        let c = self.symbols.intern(name);
        self.env.declare(c, ty);
        self.env.add_instance(c, ty);
        Ok(Some(format!("Instance {}", name)))
    }

    fn configure(&mut self, rest: &str) -> Result<Option<String>, String> {
        if !rest.is_empty() {
            self.config = MatchConfig::from_json(rest).map_err(|e| e.to_string())?;
        }
        Ok(Some(self.config.to_json()))
    }

    fn run_match(&mut self, rest: &str) -> Result<Option<String>, String> {
        let items = split_items(rest)?;
        let (occ, items) = take_occurrences(&items)?;
        let Some(split) = items.iter().position(|&i| i == "in") else {
            return Err("Usage: match [occ] <pattern> in <term>".to_string());
        };
        let ([pattern], [target]) = (&items[..split], &items[split + 1..]) else {
            return Err("Usage: match [occ] <pattern> in <term>".to_string());
        };

        self.reader.forget_holes();
        let target = self.read(target)?;
        let scope = self.evars.checkpoint();
        let pattern = self.read(pattern)?;

        let cx = Ctx::new(&self.terms, &self.env, &self.config);
        let engine = Engine::new(cx);
        let result = engine.fill_any(&mut self.evars, scope, pattern, &occ, target);
        self.last_metrics = Some(engine.metrics());
        let filled = result.map_err(|e| e.to_string())?;

        Ok(Some(format!(
            "context: {}\nmatched: {}\noccurrences: {}",
            self.render_context(filled.context),
            self.render(filled.matched),
            filled.occurrences
        )))
    }

    fn run_rewrite(&mut self, rest: &str) -> Result<Option<String>, String> {
        let items = split_items(rest)?;
        let (occ, items) = take_occurrences(&items)?;
        let usage = "Usage: rewrite [occ] [<-] <lhs> = <rhs> [by <proof>] | .. in <term>";
        let Some(split) = items.iter().position(|&i| i == "in") else {
            return Err(usage.to_string());
        };
        let [target] = items[split + 1..] else {
            return Err(usage.to_string());
        };

        self.reader.forget_holes();
        let target = self.read(target)?;
        let scope = self.evars.checkpoint();
        let mut candidates = Vec::new();
        for rule in items[..split].split(|&i| i == "|") {
            self.reader.forget_holes();
            candidates.push(self.read_rule(rule).ok_or_else(|| usage.to_string())??);
        }
        if candidates.is_empty() {
            return Err(usage.to_string());
        }

        let cx = Ctx::new(&self.terms, &self.env, &self.config);
        let engine = Engine::new(cx);
        let result = engine.match_any_rule(&mut self.evars, scope, &candidates, &occ, target);
        let report = engine.metrics();
        let rejected = report.rejected_for_progress();
        self.last_metrics = Some(report);
        let rewrite = result.map_err(|e| match e {
            MatchError::NoMatch if rejected => {
                "no progress: every match rewrites the term to itself".to_string()
            }
            e => e.to_string(),
        })?;

        let rewritten = instantiate(&self.terms, rewrite.context, rewrite.replacement);
        let direction = match rewrite.direction {
            Direction::LeftToRight => "->",
            Direction::RightToLeft => "<-",
        };
        Ok(Some(format!(
            "rule {} ({})\ncontext: {}\nmatched: {}\nequation: {}\nresult: {}",
            rewrite.rule + 1,
            direction,
            self.render_context(rewrite.context),
            self.render(rewrite.matched),
            self.render(rewrite.equation),
            self.render(rewritten)
        )))
    }

    /// `[<-] lhs = rhs [by proof]`; `None` when the shape is wrong.
    fn read_rule(&mut self, items: &[&str]) -> Option<Result<RuleCandidate, String>> {
        let (direction, items) = match items {
            ["<-", rest @ ..] => (Direction::RightToLeft, rest),
            _ => (Direction::LeftToRight, items),
        };
        let (lhs, rhs, proof) = match *items {
            [lhs, "=", rhs] => (lhs, rhs, None),
            [lhs, "=", rhs, "by", proof] => (lhs, rhs, Some(proof)),
            _ => return None,
        };
        let read = |repl: &mut Self| -> Result<RuleCandidate, String> {
            let lhs = repl.read(lhs)?;
            let rhs = repl.read(rhs)?;
            let proof = proof.map(|p| repl.read(p)).transpose()?;
            Ok(RuleCandidate {
                rule: RewriteRule { lhs, rhs, proof },
                direction,
            })
        };
        Some(read(self))
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a command tail into top-level items: whitespace separated, with
/// parenthesised, bracketed and braced groups kept whole.
fn split_items(text: &str) -> Result<Vec<&str>, String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => {
                start.get_or_insert(i);
                depth += 1;
            }
            ')' | ']' | '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "Unbalanced parentheses".to_string())?;
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    items.push(&text[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if depth != 0 {
        return Err("Unbalanced parentheses".to_string());
    }
    if let Some(s) = start {
        items.push(&text[s..]);
    }
    Ok(items)
}

/// Strip a leading `{..}` occurrence list; no list means every occurrence.
fn take_occurrences<'i, 's>(items: &'i [&'s str]) -> Result<(OccSpec, &'i [&'s str]), String> {
    let Some(inner) = items
        .first()
        .and_then(|i| i.strip_prefix('{'))
        .and_then(|i| i.strip_suffix('}'))
    else {
        return Ok((OccSpec::all(), items));
    };
    let mut words = inner.split_whitespace().peekable();
    let polarity = match words.peek() {
        Some(w) if w.starts_with('-') => Polarity::Skip,
        _ => Polarity::Select,
    };
    let indices = words
        .map(|w| {
            w.trim_start_matches('-')
                .parse::<u32>()
                .map_err(|_| format!("Invalid occurrence '{}'", w))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let occ = OccSpec::new(polarity, indices).map_err(|e| e.to_string())?;
    Ok((occ, &items[1..]))
}

#[cfg(test)]
#[path = "tests/repl.rs"]
mod tests;
