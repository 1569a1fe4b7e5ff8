//! Classification gate: turns ranked classifier output into a sort decision.
//!
//! ```text
//!  [(label, score), ...] ──best guess──▶ (label, score)
//!                                             │
//!     label ∌ "nonRecyclable" AND score > threshold ?
//!            │ yes                     │ no
//!            ▼                         ▼
//!     Recycle(label, score)    Reject("nonRecyclable", score)
//! ```
//!
//! The best guess is the highest finite score; ties go to the entry the
//! classifier listed first.  An empty list is an error, never a guess.

use serde::{Deserialize, Serialize};

use crate::config::ClassifierOptions;
use crate::error::ClassificationError;

/// Label fragment the model uses for everything that must not be recycled.
pub const NON_RECYCLABLE: &str = "nonRecyclable";

/// One ranked entry from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub score: f32,
}

impl Category {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Output of one classifier call.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassificationResult {
    pub categories: Vec<Category>,
}

impl ClassificationResult {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Apply the classifier's `score_threshold` and `max_results` options.
    ///
    /// Entries are ordered by descending score with a stable sort, so the
    /// first-listed of equal scores stays ahead.
    pub fn filtered(mut self, options: &ClassifierOptions) -> Self {
        self.categories
            .retain(|c| c.score.is_finite() && c.score >= options.score_threshold);
        self.categories
            .sort_by(|a, b| b.score.total_cmp(&a.score));
        self.categories.truncate(options.max_results);
        self
    }

    /// Highest-scoring entry; first-listed wins ties.  Non-finite scores
    /// are ignored.
    pub fn best_guess(&self) -> Option<&Category> {
        self.categories
            .iter()
            .filter(|c| c.score.is_finite())
            .fold(None, |best: Option<&Category>, c| match best {
                Some(b) if c.score <= b.score => Some(b),
                _ => Some(c),
            })
    }
}

/// Which choreography a decision calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    Recycle,
    Reject,
}

/// The controller's verdict for one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDecision {
    pub is_recyclable: bool,
    /// Best-guess label when recyclable, otherwise [`NON_RECYCLABLE`].
    pub category_name: String,
    pub score: f32,
    pub decided_at_ms: u64,
}

impl SortDecision {
    pub fn kind(&self) -> DecisionKind {
        if self.is_recyclable {
            DecisionKind::Recycle
        } else {
            DecisionKind::Reject
        }
    }

    /// Explicit fallback used when the classifier returned nothing.
    pub fn non_recyclable_fallback(decided_at_ms: u64) -> Self {
        Self {
            is_recyclable: false,
            category_name: NON_RECYCLABLE.into(),
            score: 0.0,
            decided_at_ms,
        }
    }
}

/// Decide how to sort an item.
///
/// Pure and deterministic: identical inputs always give identical output.
/// The threshold comparison is strict, so `score == threshold` rejects.
pub fn decide(
    result: &ClassificationResult,
    threshold: f32,
    now_ms: u64,
) -> Result<SortDecision, ClassificationError> {
    let best = result.best_guess().ok_or(ClassificationError::EmptyResult)?;

    let is_recyclable = !best.name.contains(NON_RECYCLABLE) && best.score > threshold;
    let category_name = if is_recyclable {
        best.name.clone()
    } else {
        NON_RECYCLABLE.into()
    };

    Ok(SortDecision {
        is_recyclable,
        category_name,
        score: best.score,
        decided_at_ms: now_ms,
    })
}
