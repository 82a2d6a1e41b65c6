//! Precomputed ranking data: per-term score upper bounds and per-document
//! normalized lengths.
//!
//! The MaxScore ranker prunes with `max_term_weight`; every ranked path
//! reads `norm_len` once per scored document. `RamWandData` derives both
//! from a `RamIndex` by a single pass over its postings.

use crate::index::{Index, RamIndex};
use crate::scorer::Scorer;
use crate::{DocId, Score, TermId};

/// Read-only view over precomputed ranking data.
pub trait WandData {
    /// Upper bound on `doc_term_weight` across `term`'s postings.
    fn max_term_weight(&self, term: TermId) -> Score;

    /// Document length of `doc` divided by the average document length.
    fn norm_len(&self, doc: DocId) -> Score;
}

/// In-memory wand data, indexed by term-id and doc-id.
#[derive(Debug, Clone)]
pub struct RamWandData {
    max_weights: Vec<Score>,
    norm_lens: Vec<Score>,
}

impl RamWandData {
    pub fn from_parts(max_weights: Vec<Score>, norm_lens: Vec<Score>) -> Self {
        Self {
            max_weights,
            norm_lens,
        }
    }

    /// Precompute wand data for `index` under scorer `S`.
    ///
    /// Document lengths are recovered from the postings themselves (the
    /// length of a document is the sum of its term frequencies), normalized
    /// by the collection average; each term's bound is the maximum
    /// document-side weight over its posting list.
    pub fn build<S: Scorer>(index: &RamIndex) -> Self {
        let num_docs = index.num_docs() as usize;
        let mut doc_lens = vec![0u64; num_docs];
        for term in 0..index.num_terms() {
            for (doc, freq) in index.postings(term) {
                doc_lens[doc as usize] += freq;
            }
        }

        let total: u64 = doc_lens.iter().sum();
        let avg = if num_docs > 0 {
            (total as f64 / num_docs as f64).max(1.0)
        } else {
            1.0
        };
        let norm_lens: Vec<Score> = doc_lens
            .iter()
            .map(|&len| (len as f64 / avg) as Score)
            .collect();

        let mut max_weights = Vec::with_capacity(index.num_terms() as usize);
        for term in 0..index.num_terms() {
            let mut max_weight = 0.0f32;
            for (doc, freq) in index.postings(term) {
                let w = S::doc_term_weight(freq, norm_lens[doc as usize]);
                if w > max_weight {
                    max_weight = w;
                }
            }
            max_weights.push(max_weight);
        }

        Self {
            max_weights,
            norm_lens,
        }
    }
}

impl WandData for RamWandData {
    #[inline]
    fn max_term_weight(&self, term: TermId) -> Score {
        self.max_weights.get(term as usize).copied().unwrap_or(0.0)
    }

    #[inline]
    fn norm_len(&self, doc: DocId) -> Score {
        self.norm_lens.get(doc as usize).copied().unwrap_or(1.0)
    }
}
