//! Quill - boolean and ranked query evaluation over an inverted index
//!
//! The core of a query server: given a parsed query (a flat conjunction, a
//! flat disjunction, or a CNF of terms) and an index exposing per-term
//! posting-list cursors, either count the matching documents or return the
//! top-K scored documents under a BM25-style ranker.
//!
//! - Multi-strategy evaluation: next-geq conjunction, frontier-walk
//!   disjunction, two CNF walkers (a basic one and one with group-level
//!   shortcuts), and a MaxScore top-K ranker with per-term upper bounds
//! - Query pipeline: scanner -> parser -> translator producing one of three
//!   expression shapes
//! - Fixed-capacity top-K heap with constant-time admission tests
//! - Pluggable scoring split into query-side and document-side weights

pub mod error;
pub mod eval;
pub mod index;
pub mod query;
pub mod scorer;
pub mod topk;
pub mod wand;

pub use error::{Error, Result};
pub use eval::{
    and_query, cnf_opt_query, cnf_query, evaluate, maxscore_query, normalize_cnf, normalize_terms,
    or_query, Algorithm, EvalOptions, Mode, Outcome,
};
pub use index::{Index, PostingCursor, RamIndex};
pub use query::{
    translate, QueryExpr, QueryParser, QueryTerm, Scanner, TermDictionary, Token, TranslatedQuery,
};
pub use scorer::{Bm25, Scorer, BM25_B, BM25_K1};
pub use topk::{DocIdScore, TopKQueue};
pub use wand::{RamWandData, WandData};

/// Document identifier. Doc-ids within a posting list are strictly increasing.
pub type DocId = u64;
/// Handle into the index's term dictionary.
pub type TermId = u32;
/// Occurrences of a term within one document.
pub type TermFreq = u64;
pub type Score = f32;

/// Sentinel doc-id marking an invalid top-K entry.
pub const NULL_DOC: DocId = u64::MAX;
