//! Pattern compilation: weak-head spine, head classification and the
//! first-order form used by the delta-free pass.

use crate::env::Ctx;
use crate::error::MatchError;
use crate::evar::{EvarKind, EvarMap, Scope};
use crate::finish::ProgressCheck;
use crate::reduce::{whnf, Reductions};
use crate::symbol::ConstId;
use crate::term::{Args, EvarId, Shape, Term, TermId};
use crate::traverse::replace;

/// Head class of a compiled pattern; decides which target heads are
/// candidates at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternClass {
    /// Constant or variable head, compared by identity.
    Fixed,
    /// Head is a hole owned by the caller; it behaves like a constant.
    HoleRef(EvarId),
    LetHead,
    /// Sort, product, abstraction, case or fixpoint head, compared by shape.
    Rigid(Shape),
    /// Head is a hole of the pattern applied to arguments.
    Flexible(EvarId),
    /// Head is a projection; the first `nparams` arguments are parameters.
    Projection { proj: ConstId, nparams: usize },
}

pub struct CompiledPattern<'p> {
    /// The pattern in weak-head normal form.
    pub term: TermId,
    pub class: PatternClass,
    pub head: TermId,
    pub args: Args,
    /// `term` with every new hole renamed to a placeholder.
    pub fo_form: TermId,
    /// `(placeholder, hole)` pairs: a placeholder's value is the hole's value.
    pub placeholders: Vec<(EvarId, EvarId)>,
    pub payload: TermId,
    pub progress: &'p dyn ProgressCheck,
}

impl std::fmt::Debug for CompiledPattern<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledPattern")
            .field("term", &self.term)
            .field("class", &self.class)
            .field("head", &self.head)
            .field("args", &self.args)
            .field("fo_form", &self.fo_form)
            .field("placeholders", &self.placeholders)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

impl CompiledPattern<'_> {
    /// Number of spine arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Arguments the pattern actually matches on: for a projection, the
    /// ones after its parameters.
    pub fn own_args(&self) -> &[TermId] {
        match self.class {
            PatternClass::Projection { nparams, .. } => &self.args[nparams..],
            _ => &self.args,
        }
    }

    /// Parameters of a projection pattern, empty otherwise.
    pub fn params(&self) -> &[TermId] {
        match self.class {
            PatternClass::Projection { nparams, .. } => &self.args[..nparams],
            _ => &[],
        }
    }
}

/// Compile `pattern` for matching.
///
/// Holes declared before `known` belong to the caller; later ones are the
/// pattern's own and are solved by matching. Placeholders for the
/// first-order form are declared in `evars`.
pub fn compile<'p>(
    cx: Ctx<'_>,
    evars: &mut EvarMap,
    known: Scope,
    pattern: TermId,
    payload: TermId,
    progress: &'p dyn ProgressCheck,
) -> Result<CompiledPattern<'p>, MatchError> {
    let terms = cx.terms;
    let term = whnf(cx, evars, pattern, Reductions::PATTERN);
    let (head, args) = terms.spine(term);
    let class = match terms.get(head) {
        Term::Const(c) => match cx.env.projection(c) {
            Some(nparams) if nparams > 0 && args.len() >= nparams => {
                PatternClass::Projection { proj: c, nparams }
            }
            _ => PatternClass::Fixed,
        },
        Term::Rel(_) => PatternClass::Fixed,
        Term::Evar(k, _) if known.contains(k) || !evars.is_assignable(k) => PatternClass::HoleRef(k),
        Term::Evar(k, _) => {
            if args.is_empty() {
                return Err(MatchError::UndefPat);
            }
            PatternClass::Flexible(k)
        }
        Term::LetIn(_, _, _) => PatternClass::LetHead,
        node => PatternClass::Rigid(node.shape()),
    };

    let mut placeholders: Vec<(EvarId, EvarId)> = Vec::new();
    let fo_form = replace(terms, term, 0, &mut |_, node, _| match node {
        Term::Evar(k, inst) if !known.contains(*k) && evars.is_assignable(*k) => {
            let p = match placeholders.iter().find(|(_, h)| h == k) {
                Some((p, _)) => *p,
                None => {
                    let arity = evars.decl(*k).map_or(inst.len() as u32, |d| d.arity);
                    let p = evars.fresh(arity, None, EvarKind::Placeholder);
                    placeholders.push((p, *k));
                    p
                }
            };
            Some(terms.evar(p, inst.clone()))
        }
        _ => None,
    });

    Ok(CompiledPattern {
        term,
        class,
        head,
        args,
        fo_form,
        placeholders,
        payload,
        progress,
    })
}

#[cfg(test)]
#[path = "tests/pattern.rs"]
mod tests;
