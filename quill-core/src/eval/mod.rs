//! Query evaluation: options, dispatch, and the five evaluation strategies.
//!
//! Every evaluator is a single strictly sequential computation over borrowed
//! posting cursors. Scratch state (cursor vectors, per-group minima, the
//! top-K heap) is scoped to one call; the query and relevance vectors are
//! normalized in place, so callers must not share them across concurrent
//! evaluations.

mod cnf;
mod cnf_opt;
mod conjunction;
mod disjunction;
mod maxscore;

pub use cnf::cnf_query;
pub use cnf_opt::cnf_opt_query;
pub use conjunction::and_query;
pub use disjunction::or_query;
pub use maxscore::maxscore_query;

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::index::Index;
use crate::query::TranslatedQuery;
use crate::scorer::Scorer;
use crate::topk::{DocIdScore, TopKQueue};
use crate::wand::WandData;
use crate::{DocId, TermId};

// ── Options and outcome ──────────────────────────────────────────────────

/// Evaluation strategy. `Cnf` and `CnfOpt` compute identical hit sets and
/// differ only in how much cursor work they do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    And,
    Or,
    Cnf,
    CnfOpt,
    MaxScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Count every matching document.
    Count,
    /// Keep the `k` best-scoring documents.
    Ranked { k: u32 },
}

#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Sort-dedup the query and order cursors by frequency before walking.
    pub normalize: bool,
    /// Force frequency decoding on the count path.
    pub with_freqs: bool,
    pub mode: Mode,
    /// Relevance doc-ids to intersect the result stream with.
    pub rel: Option<Vec<DocId>>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            with_freqs: true,
            mode: Mode::Count,
            rel: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Matching documents (count mode) or size of the final top-K (ranked).
    pub num_returned: u64,
    /// How many returned documents are relevant; `Some` iff `rel` was given.
    pub num_rel_returned: Option<u64>,
    /// The finalized top-K list (ranked mode only). Order is unspecified.
    pub top_docs: Vec<DocIdScore>,
}

// ── Dispatch ─────────────────────────────────────────────────────────────

/// Evaluate a translated query with the chosen strategy.
///
/// The query and the relevance vector are consumed; both are normalized in
/// place during evaluation. Flat algorithms (`And`, `Or`, `MaxScore`)
/// require a flat query, the CNF algorithms a CNF query.
pub fn evaluate<S: Scorer, I: Index>(
    index: &I,
    wand: Option<&dyn WandData>,
    algorithm: Algorithm,
    query: TranslatedQuery,
    options: EvalOptions,
) -> Result<Outcome> {
    log::debug!(
        "evaluating {algorithm:?} query ({} terms, mode {:?})",
        match &query {
            TranslatedQuery::Flat(terms) => terms.len(),
            TranslatedQuery::Cnf(groups) => groups.iter().map(|g| g.len()).sum(),
        },
        options.mode
    );
    match (algorithm, query) {
        (Algorithm::And, TranslatedQuery::Flat(terms)) => {
            and_query::<S, I>(index, wand, terms, options)
        }
        (Algorithm::Or, TranslatedQuery::Flat(terms)) => {
            or_query::<S, I>(index, wand, terms, options)
        }
        (Algorithm::MaxScore, TranslatedQuery::Flat(terms)) => {
            maxscore_query::<S, I>(index, wand, terms, options)
        }
        (Algorithm::Cnf, TranslatedQuery::Cnf(groups)) => {
            cnf_query::<S, I>(index, wand, groups, options)
        }
        (Algorithm::CnfOpt, TranslatedQuery::Cnf(groups)) => {
            cnf_opt_query::<S, I>(index, wand, groups, options)
        }
        (algorithm, _) => Err(Error::InvalidOption(format!(
            "query shape does not match the {algorithm:?} algorithm"
        ))),
    }
}

// ── Normalization ────────────────────────────────────────────────────────

/// Sort-dedup a flat term vector. Idempotent.
pub fn normalize_terms(terms: &mut Vec<TermId>) {
    terms.sort_unstable();
    terms.dedup();
}

/// Normalize a CNF: sort-dedup within each group, then drop duplicate
/// groups. Idempotent.
pub fn normalize_cnf(groups: &mut Vec<Vec<TermId>>) {
    for group in groups.iter_mut() {
        normalize_terms(group);
    }
    groups.sort_unstable();
    groups.dedup();
}

pub(crate) fn normalize_rel(rel: &mut Vec<DocId>) {
    rel.sort_unstable();
    rel.dedup();
}

// ── Shared evaluator plumbing ────────────────────────────────────────────

/// Reject option combinations the ranked paths cannot honor.
pub(crate) fn validate(options: &EvalOptions, has_wand: bool) -> Result<()> {
    if let Mode::Ranked { k } = options.mode {
        if k == 0 {
            return Err(Error::InvalidOption(
                "K must be greater than zero for ranked evaluation".into(),
            ));
        }
        if !has_wand {
            return Err(Error::InvalidOption(
                "wand data must be provided for ranked evaluation".into(),
            ));
        }
        if !options.with_freqs {
            return Err(Error::InvalidOption(
                "with_freqs must be enabled for ranked evaluation".into(),
            ));
        }
    }
    Ok(())
}

/// Outcome of a query with no evaluable terms.
pub(crate) fn empty_outcome(options: &EvalOptions) -> Outcome {
    Outcome {
        num_returned: 0,
        num_rel_returned: options.rel.as_ref().map(|_| 0),
        top_docs: Vec::new(),
    }
}

/// Walks a sorted relevance list alongside an increasing hit stream,
/// counting hits that are relevant.
pub(crate) struct RelWalker<'a> {
    rel: &'a [DocId],
    pos: usize,
    hits: u64,
}

impl<'a> RelWalker<'a> {
    pub(crate) fn new(rel: &'a [DocId]) -> Self {
        Self { rel, pos: 0, hits: 0 }
    }

    /// Observe the next hit. Hits must arrive in increasing doc-id order.
    #[inline]
    pub(crate) fn observe(&mut self, docid: DocId) {
        while self.pos < self.rel.len() && self.rel[self.pos] < docid {
            self.pos += 1;
        }
        if self.pos < self.rel.len() && self.rel[self.pos] == docid {
            self.hits += 1;
        }
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits
    }
}

/// Finalize a ranked evaluation: compact the heap and, when a relevance list
/// was supplied, count the relevant entries in the final top-K.
pub(crate) fn finish_ranked(mut top_k: TopKQueue, rel: Option<&[DocId]>) -> Outcome {
    top_k.finalize();
    let num_returned = top_k.list().len() as u64;
    let num_rel_returned = rel.map(|rel| {
        let rel_set: FxHashSet<DocId> = rel.iter().copied().collect();
        top_k
            .list()
            .iter()
            .filter(|entry| rel_set.contains(&entry.docid))
            .count() as u64
    });
    Outcome {
        num_returned,
        num_rel_returned,
        top_docs: top_k.into_list(),
    }
}

/// Finish a count-mode evaluation.
pub(crate) fn finish_count(results: u64, rel_walker: Option<RelWalker<'_>>) -> Outcome {
    Outcome {
        num_returned: results,
        num_rel_returned: rel_walker.map(|walker| walker.hits()),
        top_docs: Vec::new(),
    }
}
