use crate::symbol::{ConstId, SymbolStore};
use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique identifier for a term in the term store.
/// Two ids are equal exactly when the terms are syntactically identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Identifier of a hole (existential variable) in an [`EvarMap`](crate::evar::EvarMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EvarId(pub u32);

/// Argument vectors: application spines, hole instances, case branches.
pub type Args = SmallVec<[TermId; 4]>;

/// A term of the calculus. Bound variables are de Bruijn indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Bound variable.
    Rel(u32),
    /// Universe `Sort(n)`; `Sort(0)` is `Prop`.
    Sort(u32),
    /// Global constant.
    Const(ConstId),
    /// Hole applied to its instance: inside the hole's value `Rel(i)` stands for `args[i]`.
    Evar(EvarId, Args),
    /// Application. The head is never itself an application and `args` is never empty.
    App(TermId, Args),
    /// Dependent function type: domain, codomain under one binder.
    Pi(TermId, TermId),
    /// Abstraction: domain, body under one binder.
    Lambda(TermId, TermId),
    /// `let x : ty := value in body`, stored as (value, ty, body).
    LetIn(TermId, TermId, TermId),
    /// Type ascription, stored as (term, ty).
    Cast(TermId, TermId),
    /// Case analysis: return predicate, scrutinee, branches.
    Case(TermId, TermId, Args),
    /// Mutual fixpoint: selected index, types, bodies (bodies see all fixpoints bound).
    Fix(u32, Args, Args),
}

impl Term {
    /// Coarse constructor class, used for keyed head comparison.
    pub fn shape(&self) -> Shape {
        match self {
            Term::Rel(_) => Shape::Rel,
            Term::Sort(_) => Shape::Sort,
            Term::Const(_) => Shape::Const,
            Term::Evar(_, _) => Shape::Evar,
            Term::App(_, _) => Shape::App,
            Term::Pi(_, _) => Shape::Pi,
            Term::Lambda(_, _) => Shape::Lambda,
            Term::LetIn(_, _, _) => Shape::LetIn,
            Term::Cast(_, _) => Shape::Cast,
            Term::Case(_, _, _) => Shape::Case,
            Term::Fix(_, _, _) => Shape::Fix,
        }
    }
}

/// Constructor class of a term, ignoring its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Rel,
    Sort,
    Const,
    Evar,
    App,
    Pi,
    Lambda,
    LetIn,
    Cast,
    Case,
    Fix,
}

/// Number of shards for hashcons maps (power of 2 for fast modulo).
const NUM_SHARDS: usize = 16;

/// Hash-consed term store.
///
/// Guarantees:
/// - Structurally equal terms get the same TermId
/// - Terms are never mutated or removed; ids stay valid for the store's lifetime
/// - Applications are kept in spine normal form (see [`TermStore::app`])
pub struct TermStore {
    /// Central storage of all terms, indexed by TermId.
    nodes: RwLock<Vec<Term>>,
    /// Sharded hashcons maps.
    shards: [RwLock<HashMap<Term, TermId>>; NUM_SHARDS],
    next_id: AtomicU32,
}

impl TermStore {
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| RwLock::new(HashMap::new()));
        Self {
            nodes: RwLock::new(Vec::new()),
            shards,
            next_id: AtomicU32::new(0),
        }
    }

    /// Intern a term, returning its TermId.
    fn intern(&self, term: Term) -> TermId {
        let shard = &self.shards[Self::shard_index(&term)];

        {
            let map = shard.read();
            if let Some(&id) = map.get(&term) {
                return id;
            }
        }

        let mut map = shard.write();
        if let Some(&id) = map.get(&term) {
            return id;
        }

        let id = TermId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut nodes = self.nodes.write();
            let idx = id.0 as usize;
            if nodes.len() <= idx {
                nodes.resize(idx + 1, Term::Rel(0));
            }
            nodes[idx] = term.clone();
        }
        map.insert(term, id);
        id
    }

    fn shard_index(term: &Term) -> usize {
        let mut hasher = FxHasher::default();
        term.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    /// Resolve a TermId to its term.
    /// Returns None if the TermId is invalid.
    pub fn resolve(&self, id: TermId) -> Option<Term> {
        self.nodes.read().get(id.0 as usize).cloned()
    }

    /// Resolve a TermId produced by this store.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this store.
    pub fn get(&self, id: TermId) -> Term {
        self.nodes.read()[id.0 as usize].clone()
    }

    /// Number of distinct terms interned so far.
    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rel(&self, index: u32) -> TermId {
        self.intern(Term::Rel(index))
    }

    pub fn sort(&self, level: u32) -> TermId {
        self.intern(Term::Sort(level))
    }

    pub fn constant(&self, c: ConstId) -> TermId {
        self.intern(Term::Const(c))
    }

    pub fn evar(&self, id: EvarId, instance: Args) -> TermId {
        self.intern(Term::Evar(id, instance))
    }

    /// Create an application in spine normal form.
    ///
    /// Nested applications are flattened (`App(App(f, a), b)` becomes
    /// `App(f, a ++ b)`) and an empty argument list yields the head itself.
    pub fn app(&self, head: TermId, args: Args) -> TermId {
        if args.is_empty() {
            return head;
        }
        match self.get(head) {
            Term::App(inner, mut inner_args) => {
                inner_args.extend(args);
                self.intern(Term::App(inner, inner_args))
            }
            _ => self.intern(Term::App(head, args)),
        }
    }

    /// Apply a head to a slice of arguments.
    pub fn app_slice(&self, head: TermId, args: &[TermId]) -> TermId {
        self.app(head, SmallVec::from_slice(args))
    }

    pub fn pi(&self, dom: TermId, body: TermId) -> TermId {
        self.intern(Term::Pi(dom, body))
    }

    pub fn lambda(&self, dom: TermId, body: TermId) -> TermId {
        self.intern(Term::Lambda(dom, body))
    }

    pub fn let_in(&self, value: TermId, ty: TermId, body: TermId) -> TermId {
        self.intern(Term::LetIn(value, ty, body))
    }

    pub fn cast(&self, term: TermId, ty: TermId) -> TermId {
        self.intern(Term::Cast(term, ty))
    }

    pub fn case(&self, ret: TermId, scrutinee: TermId, branches: Args) -> TermId {
        self.intern(Term::Case(ret, scrutinee, branches))
    }

    pub fn fix(&self, index: u32, types: Args, bodies: Args) -> TermId {
        self.intern(Term::Fix(index, types, bodies))
    }

    /// Syntactic spine: head and arguments, without any reduction.
    pub fn spine(&self, id: TermId) -> (TermId, Args) {
        match self.get(id) {
            Term::App(head, args) => (head, args),
            _ => (id, SmallVec::new()),
        }
    }

    /// The unassigned-or-not hole at the head of `id`, if any.
    pub fn head_evar(&self, id: TermId) -> Option<EvarId> {
        let (head, _) = self.spine(id);
        match self.get(head) {
            Term::Evar(k, _) => Some(k),
            _ => None,
        }
    }
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a term in the reader's s-expression syntax.
///
/// `names` lists the names of the binders enclosing `term`, innermost last.
/// Binders introduced inside the term get generated names `x<depth>`.
pub fn format_term(
    term: TermId,
    terms: &TermStore,
    symbols: &SymbolStore,
    names: &[String],
) -> String {
    let mut scope: Vec<String> = names.to_vec();
    let mut out = String::new();
    render(term, terms, symbols, &mut scope, &mut out);
    out
}

fn render(
    term: TermId,
    terms: &TermStore,
    symbols: &SymbolStore,
    scope: &mut Vec<String>,
    out: &mut String,
) {
    match terms.resolve(term) {
        None => out.push_str(&format!("<bad term {}>", term.raw())),
        Some(Term::Rel(i)) => {
            let depth = scope.len();
            if (i as usize) < depth {
                out.push_str(&scope[depth - 1 - i as usize]);
            } else {
                out.push_str(&format!("#{}", i as usize - depth));
            }
        }
        Some(Term::Sort(0)) => out.push_str("Prop"),
        Some(Term::Sort(1)) => out.push_str("Type"),
        Some(Term::Sort(n)) => out.push_str(&format!("(Sort {})", n)),
        Some(Term::Const(c)) => out.push_str(&symbols.display(c)),
        Some(Term::Evar(k, args)) => {
            out.push_str(&format!("?{}", k.0));
            if !args.is_empty() {
                out.push('[');
                render_list(&args, terms, symbols, scope, out);
                out.push(']');
            }
        }
        Some(Term::App(head, args)) => {
            out.push('(');
            render(head, terms, symbols, scope, out);
            out.push(' ');
            render_list(&args, terms, symbols, scope, out);
            out.push(')');
        }
        Some(Term::Pi(dom, body)) => render_binder("forall", dom, body, terms, symbols, scope, out),
        Some(Term::Lambda(dom, body)) => render_binder("fun", dom, body, terms, symbols, scope, out),
        Some(Term::LetIn(value, ty, body)) => {
            let name = format!("x{}", scope.len());
            out.push_str(&format!("(let ({} ", name));
            render(ty, terms, symbols, scope, out);
            out.push(' ');
            render(value, terms, symbols, scope, out);
            out.push_str(") ");
            scope.push(name);
            render(body, terms, symbols, scope, out);
            scope.pop();
            out.push(')');
        }
        Some(Term::Cast(t, ty)) => {
            out.push_str("(cast ");
            render(t, terms, symbols, scope, out);
            out.push(' ');
            render(ty, terms, symbols, scope, out);
            out.push(')');
        }
        Some(Term::Case(ret, scrutinee, branches)) => {
            out.push_str("(match ");
            render(ret, terms, symbols, scope, out);
            out.push(' ');
            render(scrutinee, terms, symbols, scope, out);
            for b in branches.iter() {
                out.push(' ');
                render(*b, terms, symbols, scope, out);
            }
            out.push(')');
        }
        Some(Term::Fix(index, types, bodies)) => {
            let base = scope.len();
            let fix_names: Vec<String> = (0..types.len()).map(|i| format!("f{}", base + i)).collect();
            out.push_str(&format!("(fix {} (", index));
            for (i, ty) in types.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&format!("({} ", fix_names[i]));
                render(*ty, terms, symbols, scope, out);
                out.push(')');
            }
            out.push_str(") (");
            scope.extend(fix_names);
            render_list(&bodies, terms, symbols, scope, out);
            scope.truncate(base);
            out.push_str("))");
        }
    }
}

fn render_binder(
    keyword: &str,
    dom: TermId,
    body: TermId,
    terms: &TermStore,
    symbols: &SymbolStore,
    scope: &mut Vec<String>,
    out: &mut String,
) {
    let name = format!("x{}", scope.len());
    out.push_str(&format!("({} ({} ", keyword, name));
    render(dom, terms, symbols, scope, out);
    out.push_str(") ");
    scope.push(name);
    render(body, terms, symbols, scope, out);
    scope.pop();
    out.push(')');
}

fn render_list(
    items: &[TermId],
    terms: &TermStore,
    symbols: &SymbolStore,
    scope: &mut Vec<String>,
    out: &mut String,
) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        render(*item, terms, symbols, scope, out);
    }
}

#[cfg(test)]
#[path = "tests/term.rs"]
mod tests;
