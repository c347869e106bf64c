//! Global environment: the read-only lookup context threaded through every
//! matcher call. Nothing here is mutated while a match is running.

use crate::config::MatchConfig;
use crate::symbol::ConstId;
use crate::term::{TermId, TermStore};
use hashbrown::HashMap;

/// A delta-reducible constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    pub body: TermId,
    pub ty: Option<TermId>,
}

/// A canonical-structure fact: `proj params.. (instance extra_args..) x..`
/// is what an application `head extra_args.. x..` denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalEntry {
    /// Structure instance, applied to the head's first `extra` arguments
    /// to obtain the projection's structure argument.
    pub instance: TermId,
    /// Number of implicit arguments the head takes before the ones it
    /// shares with the projection.
    pub extra: usize,
}

/// A typeclass-style instance available to the side-obligation solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    pub name: ConstId,
    pub ty: TermId,
}

#[derive(Debug, Clone, Default)]
pub struct Env {
    types: HashMap<ConstId, TermId>,
    definitions: HashMap<ConstId, Definition>,
    /// Projection constant -> parameter count, the structure argument being the last one.
    projections: HashMap<ConstId, usize>,
    canonical: HashMap<(ConstId, ConstId), CanonicalEntry>,
    instances: Vec<Instance>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the type of a constant (axiom or parameter).
    pub fn declare(&mut self, c: ConstId, ty: TermId) {
        self.types.insert(c, ty);
    }

    /// Define a constant that delta-reduces to `body`.
    pub fn define(&mut self, c: ConstId, body: TermId, ty: Option<TermId>) {
        if let Some(ty) = ty {
            self.types.insert(c, ty);
        }
        self.definitions.insert(c, Definition { body, ty });
    }

    /// Mark `c` as a structure projection consuming `nparams` parameters
    /// (the structure argument included) before its own arguments.
    pub fn register_projection(&mut self, c: ConstId, nparams: usize) {
        self.projections.insert(c, nparams);
    }

    pub fn register_canonical(&mut self, proj: ConstId, head: ConstId, instance: TermId, extra: usize) {
        self.canonical.insert((proj, head), CanonicalEntry { instance, extra });
    }

    pub fn add_instance(&mut self, name: ConstId, ty: TermId) {
        self.instances.push(Instance { name, ty });
    }

    pub fn type_of(&self, c: ConstId) -> Option<TermId> {
        self.types.get(&c).copied()
    }

    pub fn definition(&self, c: ConstId) -> Option<&Definition> {
        self.definitions.get(&c)
    }

    /// Parameter count of a projection constant.
    pub fn projection(&self, c: ConstId) -> Option<usize> {
        self.projections.get(&c).copied()
    }

    /// Is `head` a canonical value for projection `proj`?
    pub fn lookup_canonical(&self, proj: ConstId, head: ConstId) -> Option<&CanonicalEntry> {
        self.canonical.get(&(proj, head))
    }

    /// Instances in registration order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }
}

/// Read-only collaborators of a matching session.
#[derive(Clone, Copy)]
pub struct Ctx<'a> {
    pub terms: &'a TermStore,
    pub env: &'a Env,
    pub config: &'a MatchConfig,
}

impl<'a> Ctx<'a> {
    pub fn new(terms: &'a TermStore, env: &'a Env, config: &'a MatchConfig) -> Self {
        Self { terms, env, config }
    }
}
