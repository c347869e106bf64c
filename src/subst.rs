//! De Bruijn index arithmetic: lifting, lowering and instantiation.
//!
//! All functions are pure; they return new (hash-consed) terms and leave
//! their inputs untouched.

use crate::term::{Term, TermId, TermStore};
use crate::traverse::{any_subterm, map_children, replace};

/// Largest free variable index the engine accepts. Lifting by a binder depth
/// or by the abstraction variable stays within `u32` below this bound.
pub const MAX_FREE_REL: u32 = i32::MAX as u32;

/// Shift every free variable `Rel(i)` with `i >= cutoff` by `amount`.
pub fn lift(terms: &TermStore, t: TermId, cutoff: u32, amount: u32) -> TermId {
    if amount == 0 || !has_loose_rel_from(terms, t, cutoff) {
        return t;
    }
    replace(terms, t, cutoff, &mut |_, node, depth| match node {
        Term::Rel(i) if *i >= depth => Some(terms.rel(i + amount)),
        _ => None,
    })
}

/// Inverse of [`lift`]: remove `amount` variables starting at `cutoff`.
///
/// Returns `None` if `t` mentions one of the removed variables
/// (`cutoff <= i < cutoff + amount`).
pub fn lower(terms: &TermStore, t: TermId, cutoff: u32, amount: u32) -> Option<TermId> {
    if amount == 0 || !has_loose_rel_from(terms, t, cutoff) {
        return Some(t);
    }
    let escapes = any_subterm(terms, t, cutoff, &mut |_, node, depth| match node {
        Term::Rel(i) => *i >= depth && *i < depth + amount,
        _ => false,
    });
    if escapes {
        return None;
    }
    Some(replace(terms, t, cutoff, &mut |_, node, depth| match node {
        Term::Rel(i) if *i >= depth + amount => Some(terms.rel(i - amount)),
        _ => None,
    }))
}

/// Substitute `values[i]` for `Rel(i)` in `t` (with `values[0]` the innermost
/// binder) and lower the remaining free variables by `values.len()`.
///
/// This is both beta-reduction of a multi-binder body and instantiation of a
/// hole's value with its instance.
pub fn instantiate_many(terms: &TermStore, t: TermId, values: &[TermId]) -> TermId {
    let n = values.len() as u32;
    if n == 0 || !has_loose_rel_from(terms, t, 0) {
        return t;
    }
    replace(terms, t, 0, &mut |_, node, depth| match node {
        Term::Rel(i) if *i >= depth => {
            let k = i - depth;
            if k < n {
                Some(lift(terms, values[k as usize], 0, depth))
            } else {
                Some(terms.rel(i - n))
            }
        }
        _ => None,
    })
}

/// Substitute `value` for the innermost bound variable of `body`.
pub fn instantiate(terms: &TermStore, body: TermId, value: TermId) -> TermId {
    instantiate_many(terms, body, &[value])
}

/// Does `t` contain a free variable `Rel(i)` with `i >= cutoff`
/// (counting from outside `t`)?
pub fn has_loose_rel_from(terms: &TermStore, t: TermId, cutoff: u32) -> bool {
    any_subterm(terms, t, 0, &mut |_, node, depth| match node {
        Term::Rel(i) => *i >= depth + cutoff,
        _ => false,
    })
}

/// The largest free variable of `t` (counting from outside `t`), if any.
pub fn max_free_rel(terms: &TermStore, t: TermId) -> Option<u32> {
    let mut max = None;
    any_subterm(terms, t, 0, &mut |_, node, depth| {
        if let Term::Rel(i) = node {
            if *i >= depth {
                max = max.max(Some(i - depth));
            }
        }
        false
    });
    max
}

/// Is `t` closed (no free de Bruijn variables)?
pub fn is_closed(terms: &TermStore, t: TermId) -> bool {
    !has_loose_rel_from(terms, t, 0)
}

/// Invert a distinct-variable instance: rewrite the free variables of `t`
/// so that `Rel(r)` becomes `Rel(i)` where `vars[i] == r`.
///
/// Returns `None` if `t` mentions a free variable that is not in `vars`.
/// This is how a value for `?k[Rel r0, .., Rel rn]` is computed from a
/// candidate solution.
pub fn abstract_rels(terms: &TermStore, t: TermId, vars: &[u32]) -> Option<TermId> {
    fn go(terms: &TermStore, t: TermId, depth: u32, vars: &[u32]) -> Option<TermId> {
        let node = terms.get(t);
        if let Term::Rel(i) = node {
            if i < depth {
                return Some(t);
            }
            let pos = vars.iter().position(|&r| r == i - depth)?;
            return Some(terms.rel(pos as u32 + depth));
        }
        map_children(terms, t, &node, depth, &mut |child, d| {
            go(terms, child, d, vars).ok_or(())
        })
        .ok()
    }
    go(terms, t, 0, vars)
}

/// Replace every subterm syntactically equal to `values[i]` (lifted to the
/// current depth) by `Rel(i)`; other free variables are shifted past the
/// `values.len()` new binders.
///
/// Used to imitate a solution for a hole whose instance is not a list of
/// distinct variables.
pub fn abstract_terms(terms: &TermStore, t: TermId, values: &[TermId]) -> TermId {
    let n = values.len() as u32;
    replace(terms, t, 0, &mut |id, node, depth| {
        for (i, &v) in values.iter().enumerate().rev() {
            if lift(terms, v, 0, depth) == id {
                return Some(terms.rel(depth + i as u32));
            }
        }
        match node {
            Term::Rel(i) if *i >= depth => Some(terms.rel(i + n)),
            _ => None,
        }
    })
}

#[cfg(test)]
#[path = "tests/subst.rs"]
mod tests;
