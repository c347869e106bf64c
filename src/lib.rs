#![cfg_attr(not(feature = "tracing"), allow(unused_variables))]

pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod evar;
pub mod finish;
pub mod matching;
pub mod metrics;
pub mod occurrence;
pub mod parser;
pub mod pattern;
pub mod reduce;
pub mod repl;
pub mod subst;
pub mod symbol;
pub mod term;
pub mod trace;
pub mod traverse;
pub mod typing;
pub mod unify;

pub use config::MatchConfig;
pub use engine::{Direction, Engine, Filled, Rewrite, RewriteRule, RuleCandidate};
pub use env::{Ctx, Env};
pub use error::{MatchError, MatchResult};
pub use evar::{EvarMap, Scope};
pub use finish::{AnyProgress, MustChange, ProgressCheck};
pub use occurrence::OccSpec;
pub use term::{Term, TermId, TermStore};
pub use unify::{StandardUnifier, Unifier};

#[cfg(test)]
pub(crate) mod test_utils;
