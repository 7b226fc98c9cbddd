//! Exactly-once bookkeeping for diagnostic passes.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::element::ElementId;

/// The result of a pass that did not visit every expected element exactly
/// once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "traversal invariant violated: {} missed, {} visited more than once",
    .missed.len(),
    .duplicated.len()
)]
pub struct TraversalInvariantViolation {
    /// Expected elements that were never visited.
    pub missed: Vec<ElementId>,
    /// Elements visited more than once, with their visit counts.
    pub duplicated: Vec<(ElementId, u32)>,
}

impl TraversalInvariantViolation {
    /// Lists the offending elements, one per line.
    pub fn details(&self) -> String {
        let missed = self.missed.iter().map(|e| format!("missed {e}"));
        let duplicated = self
            .duplicated
            .iter()
            .map(|(e, n)| format!("visited {e} {n} times"));
        missed.chain(duplicated).collect::<Vec<_>>().join("\n")
    }
}

/// Counts visits per element during one diagnostic pass.
///
/// Create one per top-level pass, register the elements the pass must
/// diagnose with [`expect`](Self::expect), call
/// [`before_visit`](Self::before_visit) every time the walker is about to
/// diagnose an element, and [`verify`](Self::verify) at the end.
#[derive(Default)]
pub struct TraversalGuard {
    counts: FxHashMap<ElementId, u32>,
    expected: FxHashSet<ElementId>,
}

impl TraversalGuard {
    /// Creates a guard with nothing expected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an element that must be visited exactly once.
    pub fn expect(&mut self, element: ElementId) {
        self.expected.insert(element);
    }

    /// Registers several elements.
    pub fn expect_all(&mut self, elements: impl IntoIterator<Item = ElementId>) {
        self.expected.extend(elements);
    }

    /// Records a visit and returns the element's new visit count.
    pub fn before_visit(&mut self, element: ElementId) -> u32 {
        let count = self.counts.entry(element).or_insert(0);
        *count += 1;
        *count
    }

    /// Returns how often `element` was visited.
    pub fn visit_count(&self, element: ElementId) -> u32 {
        self.counts.get(&element).copied().unwrap_or(0)
    }

    /// Returns the number of expected elements.
    pub fn expected_len(&self) -> usize {
        self.expected.len()
    }

    /// Checks that every expected element was visited exactly once and that
    /// no element was visited twice.
    pub fn verify(&self) -> Result<(), TraversalInvariantViolation> {
        let mut missed: Vec<ElementId> = self
            .expected
            .iter()
            .copied()
            .filter(|e| self.visit_count(*e) == 0)
            .collect();
        let mut duplicated: Vec<(ElementId, u32)> = self
            .counts
            .iter()
            .filter(|(_, n)| **n > 1)
            .map(|(e, n)| (*e, *n))
            .collect();
        if missed.is_empty() && duplicated.is_empty() {
            return Ok(());
        }
        missed.sort();
        duplicated.sort();
        Err(TraversalInvariantViolation { missed, duplicated })
    }

    /// Panics unless [`verify`](Self::verify) succeeds. Meant for tests.
    #[track_caller]
    pub fn assert_all_visited_exactly_once(&self) {
        if let Err(violation) = self.verify() {
            panic!("{violation}\n{}", violation.details());
        }
    }
}

impl fmt::Debug for TraversalGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalGuard")
            .field("expected", &self.expected.len())
            .field("visited", &self.counts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_resolve::DeclarationId;

    fn el(n: u32) -> ElementId {
        ElementId::Declaration(DeclarationId::from_raw(n))
    }

    #[test]
    fn clean_pass() {
        let mut guard = TraversalGuard::new();
        guard.expect_all([el(0), el(1)]);
        assert_eq!(guard.before_visit(el(0)), 1);
        assert_eq!(guard.before_visit(el(1)), 1);
        assert_eq!(guard.verify(), Ok(()));
        guard.assert_all_visited_exactly_once();
    }

    #[test]
    fn missed_and_duplicated_are_listed() {
        let mut guard = TraversalGuard::new();
        guard.expect_all([el(0), el(1), el(2)]);
        guard.before_visit(el(0));
        guard.before_visit(el(2));
        guard.before_visit(el(2));
        let violation = guard.verify().unwrap_err();
        assert_eq!(violation.missed, vec![el(1)]);
        assert_eq!(violation.duplicated, vec![(el(2), 2)]);
        assert_eq!(
            violation.to_string(),
            "traversal invariant violated: 1 missed, 1 visited more than once"
        );
        assert!(violation.details().contains("visited declaration #2 2 times"));
    }

    #[test]
    fn unexpected_single_visit_is_fine() {
        let mut guard = TraversalGuard::new();
        guard.before_visit(el(9));
        assert!(guard.verify().is_ok());
        assert_eq!(guard.visit_count(el(9)), 1);
        assert_eq!(guard.visit_count(el(3)), 0);
    }

    #[test]
    #[should_panic(expected = "traversal invariant violated")]
    fn oracle_panics() {
        let mut guard = TraversalGuard::new();
        guard.expect(el(0));
        guard.assert_all_visited_exactly_once();
    }
}
