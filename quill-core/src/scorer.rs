//! BM25 scoring split into query-side and document-side factors.
//!
//! Evaluators consume the two halves separately: the query-side weight is
//! computed once per cursor at setup, the document-side weight once per
//! matching posting. Implementations must be pure so that the top-K
//! ordering guarantees hold.

use crate::{Score, TermFreq};

/// Term frequency saturation parameter
pub const BM25_K1: f32 = 1.2;
/// Length normalization parameter
pub const BM25_B: f32 = 0.75;

/// A ranking function decomposed into query-side and document-side weights.
///
/// The per-term contribution to a document's score is
/// `query_term_weight(qf, df, n) * doc_term_weight(tf, norm_len)`.
pub trait Scorer {
    /// Idf-like weight for a query term occurring `qf` times in the query,
    /// with document frequency `df` in a collection of `num_docs` documents.
    fn query_term_weight(qf: u64, df: u64, num_docs: u64) -> Score;

    /// Saturating document-side weight for term frequency `tf` in a document
    /// whose length, divided by the average length, is `norm_len`.
    fn doc_term_weight(tf: TermFreq, norm_len: Score) -> Score;
}

/// Okapi BM25 with a Lucene-style non-negative idf.
pub struct Bm25;

impl Scorer for Bm25 {
    #[inline]
    fn query_term_weight(qf: u64, df: u64, num_docs: u64) -> Score {
        let n = num_docs as f32;
        let df = df as f32;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        qf as f32 * idf
    }

    #[inline]
    fn doc_term_weight(tf: TermFreq, norm_len: Score) -> Score {
        let tf = tf as f32;
        tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * norm_len))
    }
}
