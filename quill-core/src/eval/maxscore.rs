//! MaxScore: top-K disjunction with per-term upper-bound pruning.

use std::cmp::Ordering;

use super::{empty_outcome, finish_ranked, normalize_rel, EvalOptions, Mode, Outcome};
use crate::error::{Error, Result};
use crate::index::{Index, PostingCursor};
use crate::scorer::Scorer;
use crate::topk::TopKQueue;
use crate::wand::WandData;
use crate::{Score, TermId};

struct ScoredCursor<C> {
    cursor: C,
    q_weight: Score,
    max_weight: Score,
}

/// Rank the top K documents of a disjunction, skipping documents that
/// cannot enter the top-K.
///
/// Cursors are ordered by increasing `q_weight * max_term_weight`, with
/// prefix sums of those bounds. Cursors below the `non_essential` watermark
/// cannot lift any document into the top-K on their own: they are only
/// consulted, via `next_geq`, while the partial score plus their remaining
/// bound still clears the heap floor. Each admission that raises the floor
/// pushes the watermark further up.
///
/// Unlike the other flat evaluators, the query-side weight carries each
/// term's real occurrence count within the query, aggregated before the
/// cursors are built.
pub fn maxscore_query<S: Scorer, I: Index>(
    index: &I,
    wand: Option<&dyn WandData>,
    terms: Vec<TermId>,
    mut options: EvalOptions,
) -> Result<Outcome> {
    let k = match options.mode {
        Mode::Ranked { k } => k,
        Mode::Count => {
            return Err(Error::InvalidOption(
                "maxscore supports only ranked evaluation".into(),
            ))
        }
    };
    if k == 0 {
        return Err(Error::InvalidOption(
            "K must be greater than zero for ranked evaluation".into(),
        ));
    }
    if !options.normalize {
        return Err(Error::InvalidOption(
            "normalization cannot be disabled for maxscore".into(),
        ));
    }
    if !options.with_freqs {
        return Err(Error::InvalidOption(
            "with_freqs must be enabled for ranked evaluation".into(),
        ));
    }
    let wand = wand.ok_or_else(|| {
        Error::InvalidOption("wand data must be provided for ranked evaluation".into())
    })?;

    if let Some(rel) = options.rel.as_mut() {
        normalize_rel(rel);
    }
    if terms.is_empty() {
        return Ok(empty_outcome(&options));
    }

    let num_docs = index.num_docs();
    let mut cursors: Vec<ScoredCursor<I::Cursor<'_>>> = query_freqs(&terms)
        .into_iter()
        .map(|(term, qf)| {
            let cursor = index.cursor(term);
            let q_weight = S::query_term_weight(qf, cursor.size(), num_docs);
            let max_weight = q_weight * wand.max_term_weight(term);
            ScoredCursor {
                cursor,
                q_weight,
                max_weight,
            }
        })
        .collect();

    cursors.sort_by(|a, b| {
        a.max_weight
            .partial_cmp(&b.max_weight)
            .unwrap_or(Ordering::Equal)
    });

    let mut upper_bounds = Vec::with_capacity(cursors.len());
    let mut cumsum = 0.0f32;
    for scored in &cursors {
        cumsum += scored.max_weight;
        upper_bounds.push(cumsum);
    }
    log::debug!(
        "maxscore over {} cursors, k={k}, total upper bound {cumsum:.4}",
        cursors.len()
    );

    let mut non_essential = 0usize;
    let mut cur = cursors
        .iter()
        .map(|s| s.cursor.docid())
        .min()
        .unwrap_or(num_docs);
    let mut top_k = TopKQueue::new(k as usize);

    while non_essential < cursors.len() && cur < num_docs {
        let mut score = 0.0f32;
        let norm_len = wand.norm_len(cur);
        let mut next = num_docs;

        // essential pass: exact contributions, and the next frontier
        for scored in cursors[non_essential..].iter_mut() {
            if scored.cursor.docid() == cur {
                score += scored.q_weight * S::doc_term_weight(scored.cursor.freq(), norm_len);
                scored.cursor.next();
            }
            next = next.min(scored.cursor.docid());
        }

        // non-essential pass, highest bound first; stop as soon as the
        // remaining bound cannot reach the heap floor. Cursors stay put so
        // later candidates can reuse their position.
        for i in (0..non_essential).rev() {
            if !top_k.would_enter(score + upper_bounds[i]) {
                break;
            }
            let scored = &mut cursors[i];
            scored.cursor.next_geq(cur);
            if scored.cursor.docid() == cur {
                score += scored.q_weight * S::doc_term_weight(scored.cursor.freq(), norm_len);
            }
        }

        if top_k.insert(cur, score) {
            // the floor rose; more prefix tiers may have become non-essential
            while non_essential < cursors.len() && !top_k.would_enter(upper_bounds[non_essential])
            {
                non_essential += 1;
            }
        }

        cur = next;
    }

    Ok(finish_ranked(top_k, options.rel.as_deref()))
}

/// Aggregate a term vector into `(term, occurrences)` pairs, sorted by term.
fn query_freqs(terms: &[TermId]) -> Vec<(TermId, u64)> {
    let mut sorted = terms.to_vec();
    sorted.sort_unstable();
    let mut freqs: Vec<(TermId, u64)> = Vec::with_capacity(sorted.len());
    for term in sorted {
        match freqs.last_mut() {
            Some((last, count)) if *last == term => *count += 1,
            _ => freqs.push((term, 1)),
        }
    }
    freqs
}
