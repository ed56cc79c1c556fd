// 🔗 Join Engine - Attaches child records to exactly one parent
// Exact composite-key lookup first, then a reduced-key scan in canonical order.

use crate::aggregator::{Aggregator, CompositeKey};

// ============================================================================
// STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Only a full composite-key match attaches
    ExactOnly,

    /// On a miss, attach to the first parent (in key order) sharing the
    /// leading `reduced_len` key parts
    WithFallback { reduced_len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinMatch {
    Exact,
    /// Attached through the reduced key; carries the parent actually chosen
    Fallback(CompositeKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Attached {
        matched: JoinMatch,
        /// False when the collection already held an equal child
        inserted: bool,
    },
    Unmatched,
}

impl JoinOutcome {
    pub fn is_attached(&self) -> bool {
        matches!(self, JoinOutcome::Attached { .. })
    }
}

// ============================================================================
// JOIN ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct JoinEngine {
    strategy: JoinStrategy,
}

impl JoinEngine {
    pub fn exact() -> Self {
        JoinEngine {
            strategy: JoinStrategy::ExactOnly,
        }
    }

    pub fn with_fallback(reduced_len: usize) -> Self {
        JoinEngine {
            strategy: JoinStrategy::WithFallback { reduced_len },
        }
    }

    pub fn strategy(&self) -> JoinStrategy {
        self.strategy
    }

    /// Find the parent for `key` and hand it to `attach`, which returns
    /// whether the child was new to its collection.
    ///
    /// Fallback is first-match, not best-match: when several parents share
    /// the reduced key, the lowest in canonical order receives the child.
    pub fn attach<E, F>(&self, parents: &mut Aggregator<E>, key: &CompositeKey, attach: F) -> JoinOutcome
    where
        F: FnOnce(&mut E) -> bool,
    {
        if let Some(parent) = parents.get_mut(key) {
            return JoinOutcome::Attached {
                matched: JoinMatch::Exact,
                inserted: attach(parent),
            };
        }

        let reduced_len = match self.strategy {
            JoinStrategy::WithFallback { reduced_len } => reduced_len,
            JoinStrategy::ExactOnly => return JoinOutcome::Unmatched,
        };

        // Reduced key must be a strict, non-empty prefix
        if reduced_len == 0 || reduced_len >= key.len() {
            return JoinOutcome::Unmatched;
        }

        match parents.first_with_prefix_mut(key.prefix(reduced_len)) {
            Some((parent_key, parent)) => {
                let parent_key = parent_key.clone();
                tracing::trace!(child = %key, parent = %parent_key, "fallback join");
                JoinOutcome::Attached {
                    matched: JoinMatch::Fallback(parent_key),
                    inserted: attach(parent),
                }
            }
            None => JoinOutcome::Unmatched,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
