//! Ranking and truncation of retrieved concepts.
//!
//! The prompt only has room for a bounded number of concepts, so the rows
//! most likely to appear on an exam go first: higher frequency weight, then
//! higher importance grade. Ties keep their retrieval order.

use gongbu_core::model::ConceptContext;
use std::cmp::Reverse;

/// Sort concepts in place, most exam-relevant first.
pub fn rank(contexts: &mut [ConceptContext]) {
    // `sort_by_key` is stable
    contexts.sort_by_key(|c| (Reverse(c.frequency_weight()), Reverse(c.concept.importance)));
}

/// Rank and keep at most `cap` concepts.
pub fn select(mut contexts: Vec<ConceptContext>, cap: usize) -> Vec<ConceptContext> {
    rank(&mut contexts);
    contexts.truncate(cap);
    contexts
}
