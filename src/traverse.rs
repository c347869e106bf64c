//! Left-to-right pre-order traversal over the immediate subterms of a node.
//!
//! Visiting order per constructor:
//! - `Evar`: instance arguments
//! - `App`: head, then arguments
//! - `Pi` / `Lambda`: domain, then body (one more binder)
//! - `LetIn`: type, value, then body (one more binder)
//! - `Cast`: type, then term
//! - `Case`: return predicate, scrutinee, then branches
//! - `Fix`: every type, then every body (one binder per fixpoint)
//!
//! Every fold in the crate that carries state through a traversal goes
//! through [`map_children`] or [`for_each_child`], so all of them agree on
//! this order.

use crate::term::{Args, Term, TermId, TermStore};
use smallvec::SmallVec;

/// Call `f(child, binders)` on each immediate subterm in visiting order,
/// where `binders` is the number of binders the child sits under relative
/// to the node.
pub fn for_each_child(node: &Term, mut f: impl FnMut(TermId, u32)) {
    match node {
        Term::Rel(_) | Term::Sort(_) | Term::Const(_) => {}
        Term::Evar(_, args) => args.iter().for_each(|&a| f(a, 0)),
        Term::App(head, args) => {
            f(*head, 0);
            args.iter().for_each(|&a| f(a, 0));
        }
        Term::Pi(dom, body) | Term::Lambda(dom, body) => {
            f(*dom, 0);
            f(*body, 1);
        }
        Term::LetIn(value, ty, body) => {
            f(*ty, 0);
            f(*value, 0);
            f(*body, 1);
        }
        Term::Cast(t, ty) => {
            f(*ty, 0);
            f(*t, 0);
        }
        Term::Case(ret, scrutinee, branches) => {
            f(*ret, 0);
            f(*scrutinee, 0);
            branches.iter().for_each(|&b| f(b, 0));
        }
        Term::Fix(_, types, bodies) => {
            let n = types.len() as u32;
            types.iter().for_each(|&t| f(t, 0));
            bodies.iter().for_each(|&b| f(b, n));
        }
    }
}

/// Rebuild `node` with every immediate subterm replaced by
/// `f(child, depth + binders)`, calling `f` in visiting order.
///
/// Returns `id` itself when no child changed.
pub fn map_children<E>(
    terms: &TermStore,
    id: TermId,
    node: &Term,
    depth: u32,
    f: &mut impl FnMut(TermId, u32) -> Result<TermId, E>,
) -> Result<TermId, E> {
    fn map_args<E>(
        args: &Args,
        d: u32,
        f: &mut impl FnMut(TermId, u32) -> Result<TermId, E>,
    ) -> Result<Args, E> {
        args.iter().map(|&a| f(a, d)).collect()
    }

    let rebuilt = match node {
        Term::Rel(_) | Term::Sort(_) | Term::Const(_) => return Ok(id),
        Term::Evar(k, args) => {
            let new_args = map_args(args, depth, f)?;
            if new_args == *args {
                return Ok(id);
            }
            terms.evar(*k, new_args)
        }
        Term::App(head, args) => {
            let new_head = f(*head, depth)?;
            let new_args = map_args(args, depth, f)?;
            if new_head == *head && new_args == *args {
                return Ok(id);
            }
            terms.app(new_head, new_args)
        }
        Term::Pi(dom, body) => {
            let d = f(*dom, depth)?;
            let b = f(*body, depth + 1)?;
            if d == *dom && b == *body {
                return Ok(id);
            }
            terms.pi(d, b)
        }
        Term::Lambda(dom, body) => {
            let d = f(*dom, depth)?;
            let b = f(*body, depth + 1)?;
            if d == *dom && b == *body {
                return Ok(id);
            }
            terms.lambda(d, b)
        }
        Term::LetIn(value, ty, body) => {
            let t = f(*ty, depth)?;
            let v = f(*value, depth)?;
            let b = f(*body, depth + 1)?;
            if t == *ty && v == *value && b == *body {
                return Ok(id);
            }
            terms.let_in(v, t, b)
        }
        Term::Cast(t, ty) => {
            let new_ty = f(*ty, depth)?;
            let new_t = f(*t, depth)?;
            if new_ty == *ty && new_t == *t {
                return Ok(id);
            }
            terms.cast(new_t, new_ty)
        }
        Term::Case(ret, scrutinee, branches) => {
            let r = f(*ret, depth)?;
            let s = f(*scrutinee, depth)?;
            let bs = map_args(branches, depth, f)?;
            if r == *ret && s == *scrutinee && bs == *branches {
                return Ok(id);
            }
            terms.case(r, s, bs)
        }
        Term::Fix(index, types, bodies) => {
            let n = types.len() as u32;
            let ts = map_args(types, depth, f)?;
            let bs = map_args(bodies, depth + n, f)?;
            if ts == *types && bs == *bodies {
                return Ok(id);
            }
            terms.fix(*index, ts, bs)
        }
    };
    Ok(rebuilt)
}

/// Top-down rewrite: `f(term, depth)` returning `Some` replaces the
/// subterm (without descending into it), `None` descends.
pub fn replace(
    terms: &TermStore,
    id: TermId,
    depth: u32,
    f: &mut impl FnMut(TermId, &Term, u32) -> Option<TermId>,
) -> TermId {
    let node = terms.get(id);
    if let Some(new) = f(id, &node, depth) {
        return new;
    }
    let result: Result<TermId, std::convert::Infallible> =
        map_children(terms, id, &node, depth, &mut |child, d| Ok(replace(terms, child, d, f)));
    match result {
        Ok(t) => t,
        Err(never) => match never {},
    }
}

/// Does any subterm (including `id` itself) satisfy `pred(term, depth)`?
/// Subterms are tested in visiting order and the search stops at the first hit.
pub fn any_subterm(
    terms: &TermStore,
    id: TermId,
    depth: u32,
    pred: &mut impl FnMut(TermId, &Term, u32) -> bool,
) -> bool {
    let mut stack: SmallVec<[(TermId, u32); 16]> = SmallVec::new();
    stack.push((id, depth));
    while let Some((t, d)) = stack.pop() {
        let node = terms.get(t);
        if pred(t, &node, d) {
            return true;
        }
        let mut children: SmallVec<[(TermId, u32); 8]> = SmallVec::new();
        for_each_child(&node, |c, shift| children.push((c, d + shift)));
        // Reverse so the leftmost child is popped first.
        stack.extend(children.into_iter().rev());
    }
    false
}

/// All subterms in pre-order, paired with their binder depth.
pub fn preorder(terms: &TermStore, id: TermId) -> Vec<(TermId, u32)> {
    let mut out = Vec::new();
    any_subterm(terms, id, 0, &mut |t, _, d| {
        out.push((t, d));
        false
    });
    out
}

#[cfg(test)]
#[path = "tests/traverse.rs"]
mod tests;
