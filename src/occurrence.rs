//! Occurrence specifications and the selecting abstraction traversal.
//!
//! Occurrences are numbered from 1 in pre-order (see [`crate::traverse`]).
//! The traversal decides nothing about matching itself: an
//! [`OccurrenceTest`] says whether a node is an occurrence, and is told
//! when one of its occurrences is selected.

use crate::error::MatchError;
use crate::metrics::MatchMetrics;
use crate::term::{Term, TermId, TermStore};
use crate::traverse::map_children;
use std::convert::Infallible;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Select exactly the listed occurrences.
    Select,
    /// Select every occurrence except the listed ones.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccSpec {
    polarity: Polarity,
    /// 1-based, sorted, deduplicated.
    indices: Vec<u32>,
}

impl OccSpec {
    /// Every occurrence.
    pub fn all() -> Self {
        Self {
            polarity: Polarity::Skip,
            indices: Vec::new(),
        }
    }

    /// No occurrence (the complement of `all`).
    pub fn none() -> Self {
        Self {
            polarity: Polarity::Select,
            indices: Vec::new(),
        }
    }

    pub fn only(indices: impl IntoIterator<Item = u32>) -> Result<Self, MatchError> {
        Self::new(Polarity::Select, indices)
    }

    pub fn all_but(indices: impl IntoIterator<Item = u32>) -> Result<Self, MatchError> {
        Self::new(Polarity::Skip, indices)
    }

    pub fn new(polarity: Polarity, indices: impl IntoIterator<Item = u32>) -> Result<Self, MatchError> {
        let mut indices: Vec<u32> = indices.into_iter().collect();
        if indices.contains(&0) {
            return Err(MatchError::InvalidOccurrence(0));
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(Self { polarity, indices })
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn is_all(&self) -> bool {
        self.polarity == Polarity::Skip && self.indices.is_empty()
    }

    /// Is occurrence number `ordinal` (1-based) selected?
    pub fn selects(&self, ordinal: usize) -> bool {
        let listed = u32::try_from(ordinal).is_ok_and(|o| self.indices.binary_search(&o).is_ok());
        match self.polarity {
            Polarity::Select => listed,
            Polarity::Skip => !listed,
        }
    }

    /// Highest explicitly listed index.
    pub fn max_requested(&self) -> Option<usize> {
        self.indices.last().map(|&i| i as usize)
    }

    /// `MissingOccs` if a listed index exceeds the number of occurrences found.
    pub fn check_found(&self, found: usize) -> Result<(), MatchError> {
        match self.max_requested() {
            Some(requested) if requested > found => Err(MatchError::missing(found, requested)),
            _ => Ok(()),
        }
    }
}

impl Default for OccSpec {
    fn default() -> Self {
        Self::all()
    }
}

/// Decides which nodes of a traversal are occurrences.
pub trait OccurrenceTest {
    /// If `node` (under `depth` binders) is an occurrence, the number of its
    /// spine arguments that the occurrence covers; `Some(0)` stands for a
    /// whole node that is not an application.
    fn occurrence_at(&mut self, node: TermId, depth: u32) -> Option<usize>;

    /// The occurrence last reported by `occurrence_at` was selected.
    fn select(&mut self);
}

/// Result of [`select_and_abstract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abstraction {
    /// The target with selected occurrences replaced by the new bound
    /// variable; read as the body of one binder.
    pub context: TermId,
    /// Occurrences counted.
    pub found: usize,
    /// Occurrences abstracted.
    pub selected: usize,
}

/// Walk `target` in pre-order, number the occurrences `test` reports and
/// abstract the ones `occ` selects.
///
/// Children of an unselected occurrence are visited; children inside a
/// selected occurrence are not, while the arguments after a selected
/// application prefix are.
pub fn select_and_abstract(
    terms: &TermStore,
    target: TermId,
    occ: &OccSpec,
    test: &mut dyn OccurrenceTest,
    metrics: &MatchMetrics,
) -> Abstraction {
    let mut selector = Selector {
        terms,
        occ,
        test,
        metrics,
        found: 0,
        selected: 0,
    };
    let context = selector.walk(target, 0);
    Abstraction {
        context,
        found: selector.found,
        selected: selector.selected,
    }
}

struct Selector<'a> {
    terms: &'a TermStore,
    occ: &'a OccSpec,
    test: &'a mut dyn OccurrenceTest,
    metrics: &'a MatchMetrics,
    found: usize,
    selected: usize,
}

impl Selector<'_> {
    fn walk(&mut self, t: TermId, depth: u32) -> TermId {
        let terms = self.terms;
        if let Some(covered) = self.test.occurrence_at(t, depth) {
            self.found += 1;
            let chosen = self.occ.selects(self.found);
            self.metrics.record_occurrence(chosen);
            if chosen {
                self.test.select();
                self.selected += 1;
                let (_, args) = terms.spine(t);
                let rest: Vec<TermId> = args
                    .iter()
                    .skip(covered)
                    .map(|&a| self.walk(a, depth))
                    .collect();
                return terms.app_slice(terms.rel(depth), &rest);
            }
        }
        let node = terms.get(t);
        if let Term::Rel(i) = node {
            return if i >= depth { terms.rel(i + 1) } else { t };
        }
        let rebuilt: Result<TermId, Infallible> =
            map_children(terms, t, &node, depth, &mut |child, d| Ok(self.walk(child, d)));
        match rebuilt {
            Ok(t) => t,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
#[path = "tests/occurrence.rs"]
mod tests;
