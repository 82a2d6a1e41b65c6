//! Disjunction over N posting cursors by frontier walk.

use super::{
    empty_outcome, finish_count, finish_ranked, normalize_rel, normalize_terms, validate,
    EvalOptions, Mode, Outcome, RelWalker,
};
use crate::error::Result;
use crate::index::{Index, PostingCursor};
use crate::scorer::Scorer;
use crate::topk::TopKQueue;
use crate::wand::WandData;
use crate::{Score, TermId};

/// Count or rank the documents containing any term in `terms`.
///
/// The frontier is the minimum doc-id across cursors; each round scores and
/// advances every cursor sitting on it, then moves to the next minimum.
pub fn or_query<S: Scorer, I: Index>(
    index: &I,
    wand: Option<&dyn WandData>,
    mut terms: Vec<TermId>,
    mut options: EvalOptions,
) -> Result<Outcome> {
    validate(&options, wand.is_some())?;
    if let Some(rel) = options.rel.as_mut() {
        normalize_rel(rel);
    }
    if terms.is_empty() {
        return Ok(empty_outcome(&options));
    }
    if options.normalize {
        normalize_terms(&mut terms);
    }

    let num_docs = index.num_docs();
    let mut cursors: Vec<_> = terms.iter().map(|&t| index.cursor(t)).collect();

    let ranked = matches!(options.mode, Mode::Ranked { .. });
    let weights: Vec<Score> = if ranked {
        cursors
            .iter()
            .map(|c| S::query_term_weight(1, c.size(), num_docs))
            .collect()
    } else {
        Vec::new()
    };
    let mut top_k = match options.mode {
        Mode::Ranked { k } => Some(TopKQueue::new(k as usize)),
        Mode::Count => None,
    };

    let mut results = 0u64;
    let mut rel_walker = if ranked {
        None
    } else {
        options.rel.as_deref().map(RelWalker::new)
    };

    let mut cur = cursors.iter().map(|c| c.docid()).min().unwrap_or(num_docs);
    while cur < num_docs {
        let mut score = 0.0;
        let norm_len = match (ranked, wand) {
            (true, Some(wand)) => wand.norm_len(cur),
            _ => 0.0,
        };

        let mut next = num_docs;
        for (i, cursor) in cursors.iter_mut().enumerate() {
            if cursor.docid() == cur {
                if ranked {
                    score += weights[i] * S::doc_term_weight(cursor.freq(), norm_len);
                } else if options.with_freqs {
                    std::hint::black_box(cursor.freq());
                }
                cursor.next();
            }
            next = next.min(cursor.docid());
        }

        if let Some(top_k) = top_k.as_mut() {
            top_k.insert(cur, score);
        } else {
            results += 1;
            if let Some(walker) = rel_walker.as_mut() {
                walker.observe(cur);
            }
        }

        cur = next;
    }

    Ok(match top_k {
        Some(top_k) => finish_ranked(top_k, options.rel.as_deref()),
        None => finish_count(results, rel_walker),
    })
}
